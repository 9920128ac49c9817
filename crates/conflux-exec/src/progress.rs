//! The ready/not-ready result of a pull-style call.
//!
//! Operations that would otherwise block return `ConfluxResult<Progress<T>>`:
//!
//! - `Ok(Progress::Ready(value))`: the call completed.
//! - `Ok(Progress::NotReady)`: upstream has nothing yet; call again later.
//! - `Err(error)`: the call failed.
//!
//! [`ready!`](crate::ready) unwraps a `Progress` and returns
//! `Ok(Progress::NotReady)` from the enclosing function when it is not ready.

/// Outcome of an operation that may have to be retried.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Progress<T> {
    /// The operation completed with a value.
    Ready(T),
    /// Upstream has no data yet. Not an error.
    NotReady,
}

impl<T> Progress<T> {
    /// Returns true if the value is available.
    #[inline]
    pub fn is_ready(&self) -> bool {
        matches!(self, Progress::Ready(_))
    }

    /// Returns true if the operation must be retried.
    #[inline]
    pub fn is_not_ready(&self) -> bool {
        matches!(self, Progress::NotReady)
    }

    /// Converts into an `Option`, discarding the not-ready signal.
    #[inline]
    pub fn ready(self) -> Option<T> {
        match self {
            Progress::Ready(value) => Some(value),
            Progress::NotReady => None,
        }
    }

    /// Maps the ready value.
    #[inline]
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Progress<U> {
        match self {
            Progress::Ready(value) => Progress::Ready(f(value)),
            Progress::NotReady => Progress::NotReady,
        }
    }
}

impl<T> From<T> for Progress<T> {
    fn from(value: T) -> Self {
        Progress::Ready(value)
    }
}

/// Extracts the value of a [`Progress`], returning `Ok(Progress::NotReady)`
/// from the enclosing function if it is not ready.
#[macro_export]
macro_rules! ready {
    ($e:expr $(,)?) => {
        match $e {
            $crate::Progress::Ready(value) => value,
            $crate::Progress::NotReady => return Ok($crate::Progress::NotReady),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use conflux_common::ConfluxResult;

    fn double(input: Progress<u32>) -> ConfluxResult<Progress<u32>> {
        let value = ready!(input);
        Ok(Progress::Ready(value * 2))
    }

    #[test]
    fn test_ready_macro() {
        assert_eq!(double(Progress::Ready(4)).unwrap(), Progress::Ready(8));
        assert_eq!(double(Progress::NotReady).unwrap(), Progress::NotReady);
    }

    #[test]
    fn test_accessors() {
        let p: Progress<u32> = 3.into();
        assert!(p.is_ready());
        assert_eq!(p.map(|v| v + 1).ready(), Some(4));
        assert!(Progress::<u32>::NotReady.is_not_ready());
        assert_eq!(Progress::<u32>::NotReady.ready(), None);
    }
}
