//! Transaction state and per-transaction statement counters.

/// Whether a transaction is open, and how many statements it has prepared.
///
/// Counters reset when a transaction begins and stay readable after it ends
/// until the next one begins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionState {
    active: bool,
    sql_count: u64,
    cud_sql_count: u64,
}

impl TransactionState {
    /// Creates an idle state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a transaction open and resets the counters.
    pub fn begin(&mut self) {
        self.active = true;
        self.sql_count = 0;
        self.cud_sql_count = 0;
    }

    /// Marks the transaction closed.
    pub fn end(&mut self) {
        self.active = false;
    }

    /// Counts a statement if a transaction is open.
    pub fn record_statement(&mut self, sql: &str) {
        if !self.active {
            return;
        }
        self.sql_count += 1;
        if !is_select(sql) {
            self.cud_sql_count += 1;
        }
    }

    /// Returns true while a transaction is open.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Statements prepared in the latest transaction.
    pub fn sql_count(&self) -> u64 {
        self.sql_count
    }

    /// INSERT, UPDATE and DELETE statements prepared in the latest transaction.
    pub fn cud_sql_count(&self) -> u64 {
        self.cud_sql_count
    }
}

fn is_select(sql: &str) -> bool {
    sql.trim_start()
        .get(..6)
        .is_some_and(|p| p.eq_ignore_ascii_case("SELECT"))
}
