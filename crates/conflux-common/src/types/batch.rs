//! Tuple batches.
//!
//! A `TupleBatch` is the unit of transfer between a producer and its
//! consumers: an ordered slice of rows, the row number of the first row and a
//! flag marking the final batch of a stream.
//!
//! Row numbers are 1-based. A stream's batches are contiguous: the first
//! batch starts at row 1 and every following batch starts right after the
//! previous one's last row. Exactly one batch in a stream is terminal.

use std::fmt;

use super::Row;

/// An ordered, row-numbered slice of a result stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TupleBatch {
    /// Row number of the first row (1-based).
    begin_row: u64,
    /// The rows, in row-number order.
    rows: Vec<Row>,
    /// True if this is the last batch of the stream.
    terminal: bool,
}

impl TupleBatch {
    /// Creates a batch starting at `begin_row`.
    ///
    /// # Panics
    ///
    /// Panics if `begin_row` is zero; row numbers are 1-based.
    pub fn new(begin_row: u64, rows: Vec<Row>, terminal: bool) -> Self {
        assert!(begin_row >= 1, "row numbers are 1-based");
        Self {
            begin_row,
            rows,
            terminal,
        }
    }

    /// Creates an empty terminal batch positioned after `last_row`.
    pub fn terminal(last_row: u64) -> Self {
        Self::new(last_row + 1, Vec::new(), true)
    }

    /// Returns the row number of the first row.
    pub fn begin_row(&self) -> u64 {
        self.begin_row
    }

    /// Returns the row number of the last row.
    ///
    /// For an empty batch this is `begin_row - 1`.
    pub fn end_row(&self) -> u64 {
        self.begin_row + self.rows.len() as u64 - 1
    }

    /// Returns the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the batch holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns true if this is the final batch of its stream.
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Returns true if `row_number` falls inside this batch.
    pub fn contains(&self, row_number: u64) -> bool {
        row_number >= self.begin_row && row_number <= self.end_row()
    }

    /// Returns the row with the given row number.
    pub fn row(&self, row_number: u64) -> Option<&Row> {
        if !self.contains(row_number) {
            return None;
        }
        self.rows.get((row_number - self.begin_row) as usize)
    }

    /// Returns the rows.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Iterates over `(row_number, row)` pairs.
    pub fn numbered_rows(&self) -> impl Iterator<Item = (u64, &Row)> + '_ {
        self.rows
            .iter()
            .enumerate()
            .map(move |(i, row)| (self.begin_row + i as u64, row))
    }

    /// Consumes the batch and returns its rows.
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Returns true if this batch directly continues `previous`.
    pub fn follows(&self, previous: &TupleBatch) -> bool {
        !previous.terminal && self.begin_row == previous.end_row() + 1
    }
}

impl fmt::Display for TupleBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TupleBatch[{}..={}{}]",
            self.begin_row,
            self.end_row(),
            if self.terminal { ", terminal" } else { "" }
        )
    }
}
