use thiserror::Error;

/// Failures surfaced at the ledger boundary. All of these are recoverable
/// and reported to the caller; nothing here aborts the process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("account '{0}' already exists")]
    DuplicateAccount(String),
    #[error("sender '{0}' does not exist")]
    UnknownSender(String),
    #[error("receiver '{0}' does not exist")]
    UnknownReceiver(String),
    #[error("account '{account}' has insufficient balance ({balance} available, {amount} requested)")]
    InsufficientBalance {
        account: String,
        balance: i64,
        amount: u64,
    },
    #[error("ledger has no blocks")]
    EmptyChain,
}
