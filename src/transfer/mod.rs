use chrono::{DateTime, Local};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::ledger::{format_coins, Amount, LedgerEntry, LedgerError, LedgerStore, PlayerIndex};
use crate::storage::KeyValueStore;

/// Transfers move whole multiples of this many coins.
pub const TRANSFER_UNIT: Amount = 1_000;

/// Renders like a US-locale `toLocaleString`, e.g. `10/16/2026, 3:04:05 PM`.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("Sender and receiver cannot be the same.")]
    SameParty,
    #[error("No player at position {index}.")]
    NotFound { index: PlayerIndex },
    #[error("Invalid amount entered.")]
    InvalidAmount { amount: i64 },
    #[error("Incorrect password.")]
    Unauthorized,
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Raw transfer input as collected by the front end.
///
/// `amount` is signed so that zero and negative input reach validation
/// instead of failing to parse.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferRequest {
    pub sender: PlayerIndex,
    pub receiver: PlayerIndex,
    pub amount: i64,
    pub credential: String,
}

/// Every credential check goes through here. Compares SHA-256 digests of
/// both sides without short-circuiting.
pub fn credential_matches(stored: &str, supplied: &str) -> bool {
    let stored: [u8; 32] = Sha256::digest(stored.as_bytes()).into();
    let supplied: [u8; 32] = Sha256::digest(supplied.as_bytes()).into();
    stored
        .iter()
        .zip(supplied.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

pub fn transfer_message(amount: Amount, sender: &str, receiver: &str) -> String {
    format!(
        "Transaction of {} coins from {} to {} completed.",
        format_coins(u128::from(amount)),
        sender,
        receiver
    )
}

/// Validates and applies transfers. Holds formatting settings only; all
/// ledger state stays in the store it is handed.
#[derive(Clone, Debug)]
pub struct TransactionProcessor {
    timestamp_format: String,
}

impl Default for TransactionProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_TIMESTAMP_FORMAT)
    }
}

impl TransactionProcessor {
    pub fn new(timestamp_format: impl Into<String>) -> Self {
        Self {
            timestamp_format: timestamp_format.into(),
        }
    }

    pub fn execute<S: KeyValueStore>(
        &self,
        store: &mut LedgerStore<S>,
        request: &TransferRequest,
    ) -> Result<LedgerEntry, TransferError> {
        self.execute_at(store, request, Local::now())
    }

    /// Same as [`execute`](Self::execute) with an explicit clock reading.
    pub fn execute_at<S: KeyValueStore>(
        &self,
        store: &mut LedgerStore<S>,
        request: &TransferRequest,
        now: DateTime<Local>,
    ) -> Result<LedgerEntry, TransferError> {
        let checked = match validate(store, request) {
            Ok(checked) => checked,
            Err(err) => {
                warn!(
                    sender = request.sender,
                    receiver = request.receiver,
                    amount = request.amount,
                    error = %err,
                    "transfer rejected"
                );
                return Err(err);
            }
        };
        let message = transfer_message(checked.amount, &checked.sender, &checked.receiver);
        let timestamp = now.format(&self.timestamp_format).to_string();
        let entry = LedgerEntry::new(&timestamp, &message);
        store.record_transfer(
            request.sender,
            request.receiver,
            checked.amount,
            entry.clone(),
        )?;
        info!(
            sender = %checked.sender,
            receiver = %checked.receiver,
            amount = checked.amount,
            "transfer completed"
        );
        Ok(entry)
    }
}

/// A request that passed every check.
struct CheckedTransfer {
    amount: Amount,
    sender: String,
    receiver: String,
}

/// Runs the checks in order.
fn validate<S: KeyValueStore>(
    store: &LedgerStore<S>,
    request: &TransferRequest,
) -> Result<CheckedTransfer, TransferError> {
    if request.sender == request.receiver {
        return Err(TransferError::SameParty);
    }
    let sender = store
        .player(request.sender)
        .map_err(|_| TransferError::NotFound {
            index: request.sender,
        })?;
    let receiver = store
        .player(request.receiver)
        .map_err(|_| TransferError::NotFound {
            index: request.receiver,
        })?;

    let invalid = TransferError::InvalidAmount {
        amount: request.amount,
    };
    let amount = match Amount::try_from(request.amount) {
        Ok(amount) if amount > 0 => amount,
        _ => return Err(invalid),
    };
    if amount % TRANSFER_UNIT != 0 || amount > sender.balance {
        return Err(invalid);
    }

    if !credential_matches(&sender.credential, &request.credential) {
        return Err(TransferError::Unauthorized);
    }
    Ok(CheckedTransfer {
        amount,
        sender: sender.name.clone(),
        receiver: receiver.name.clone(),
    })
}
