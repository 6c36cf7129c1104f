//! Ledger backend trait definition.
//!
//! [`LedgerBackend`] is the durable half of the ledger: an ordered,
//! append-only table of [`LedgerRow`]s. Buffering lives one level up in
//! [`Ledger`](crate::Ledger).

use dvbench_types::{LedgerRow, RunId};

use crate::error;

/// Storage contract for durable ledger rows.
///
/// Implementations must be `Send + Sync` for use behind `Box<dyn LedgerBackend>`.
/// Rows are returned in the order they were appended, across process
/// restarts. Historical rows are never rewritten.
pub trait LedgerBackend: Send + Sync {
    /// Durably append `rows` after every row already stored. Returns the
    /// count written.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`](crate::error::LedgerError) on storage failure.
    fn append(&self, rows: &[LedgerRow]) -> error::Result<u64>;

    /// Every stored row in append order.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`](crate::error::LedgerError) on storage failure.
    fn read_all(&self) -> error::Result<Vec<LedgerRow>>;

    /// The last `n` stored rows, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`](crate::error::LedgerError) on storage failure.
    fn read_tail(&self, n: usize) -> error::Result<Vec<LedgerRow>> {
        let mut rows = self.read_all()?;
        let skip = rows.len().saturating_sub(n);
        Ok(rows.split_off(skip))
    }

    /// Every stored row belonging to `run`, in append order.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`](crate::error::LedgerError) on storage failure.
    fn read_run(&self, run: &RunId) -> error::Result<Vec<LedgerRow>> {
        let mut rows = self.read_all()?;
        rows.retain(|row| &row.run_id == run);
        Ok(rows)
    }

    /// Run id of the most recently appended row, if any.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`](crate::error::LedgerError) on storage failure.
    fn latest_run_id(&self) -> error::Result<Option<RunId>> {
        Ok(self.read_tail(1)?.pop().map(|row| row.run_id))
    }

    /// Human-readable location of the store, for logs.
    fn location(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Verify the trait is object-safe (can be used as `dyn LedgerBackend`).
    #[test]
    fn trait_is_object_safe() {
        fn _assert_object_safe(_: &dyn LedgerBackend) {}
    }
}
