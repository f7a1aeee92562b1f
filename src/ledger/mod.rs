use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::storage::{KeyValueStore, StorageError, LOG_KEY, PLAYERS_KEY, THEME_KEY};

pub type PlayerIndex = usize;
pub type Amount = u64;

/// Balance every new player starts with, seeded or added.
pub const STARTING_BALANCE: Amount = 250_000;

const DEFAULT_ROSTER: [(&str, &str); 4] = [
    ("Player 1", "pass1"),
    ("Player 2", "pass2"),
    ("Player 3", "pass3"),
    ("Player 4", "pass4"),
];

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Please fill in all fields.")]
    Validation,
    #[error("no player at index {index}")]
    UnknownPlayer { index: PlayerIndex },
    #[error("insufficient funds for {name}")]
    InsufficientFunds { name: String },
    #[error("balance of {name} would overflow")]
    BalanceOverflow { name: String },
    #[error("persisted value under `{key}` is malformed: {source}")]
    Corrupt {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Player {
    pub name: String,
    #[serde(alias = "coins")]
    pub balance: Amount,
    #[serde(alias = "password")]
    pub credential: String,
}

impl Player {
    fn new(name: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            balance: STARTING_BALANCE,
            credential: credential.into(),
        }
    }
}

/// One rendered line of the transaction log.
///
/// Opaque once written; imported lines need not follow the transfer format.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct LedgerEntry(String);

impl LedgerEntry {
    pub fn new(timestamp: &str, message: &str) -> Self {
        Self(format!("{timestamp}: {message}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for LedgerEntry {
    fn from(line: String) -> Self {
        Self(line)
    }
}

impl std::fmt::Display for LedgerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Renders a coin amount with comma digit grouping, e.g. `250,000`.
pub fn format_coins(amount: u128) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Authoritative roster and transaction log, persisted through `S`.
pub struct LedgerStore<S: KeyValueStore> {
    players: Vec<Player>,
    log: Vec<LedgerEntry>,
    dark_theme: bool,
    backend: S,
}

impl<S: KeyValueStore> LedgerStore<S> {
    /// Loads state from `backend`, seeding the default roster on first run.
    pub fn open(mut backend: S) -> Result<Self, LedgerError> {
        let players = match backend.get(PLAYERS_KEY)? {
            Some(raw) => serde_json::from_str(&raw).map_err(|source| LedgerError::Corrupt {
                key: PLAYERS_KEY,
                source,
            })?,
            None => {
                let seeded: Vec<Player> = DEFAULT_ROSTER
                    .iter()
                    .map(|(name, credential)| Player::new(*name, *credential))
                    .collect();
                backend.set(PLAYERS_KEY, encode(PLAYERS_KEY, &seeded)?)?;
                info!(players = seeded.len(), "seeded default roster");
                seeded
            }
        };
        let log = match backend.get(LOG_KEY)? {
            Some(raw) => serde_json::from_str(&raw).map_err(|source| LedgerError::Corrupt {
                key: LOG_KEY,
                source,
            })?,
            None => Vec::new(),
        };
        let dark_theme = backend.get(THEME_KEY)?.as_deref() == Some("true");
        Ok(Self {
            players,
            log,
            dark_theme,
            backend,
        })
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, index: PlayerIndex) -> Result<&Player, LedgerError> {
        self.players
            .get(index)
            .ok_or(LedgerError::UnknownPlayer { index })
    }

    /// Sum of all balances; widened so any persisted roster fits.
    pub fn total_balance(&self) -> u128 {
        self.players.iter().map(|p| u128::from(p.balance)).sum()
    }

    pub fn add_player(&mut self, name: &str, credential: &str) -> Result<Player, LedgerError> {
        let name = name.trim();
        let credential = credential.trim();
        if name.is_empty() || credential.is_empty() {
            return Err(LedgerError::Validation);
        }
        let player = Player::new(name, credential);
        self.players.push(player.clone());
        if let Err(err) = self.save_players() {
            self.players.pop();
            return Err(err);
        }
        info!(name, "added player");
        Ok(player)
    }

    /// Moves `amount` from `sender` to `receiver` and persists the roster.
    ///
    /// Callers validate the request first; the checks here guard the balance
    /// bounds. On any error, including a failed write, memory is unchanged.
    pub(crate) fn apply_transfer(
        &mut self,
        sender: PlayerIndex,
        receiver: PlayerIndex,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let to = self.player(receiver)?;
        let credited = to
            .balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::BalanceOverflow {
                name: to.name.clone(),
            })?;
        let from = self.player(sender)?;
        let debited = from
            .balance
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::InsufficientFunds {
                name: from.name.clone(),
            })?;

        let before = (self.players[sender].balance, self.players[receiver].balance);
        self.players[sender].balance = debited;
        self.players[receiver].balance = credited;
        if let Err(err) = self.save_players() {
            self.players[sender].balance = before.0;
            self.players[receiver].balance = before.1;
            return Err(err);
        }
        Ok(())
    }

    pub(crate) fn append_log_entry(&mut self, entry: LedgerEntry) -> Result<(), LedgerError> {
        self.log.push(entry);
        if let Err(err) = self.save_log() {
            self.log.pop();
            return Err(err);
        }
        Ok(())
    }

    /// Applies a transfer and its log entry together. If the log write
    /// fails the balances are put back and the roster is rewritten.
    pub(crate) fn record_transfer(
        &mut self,
        sender: PlayerIndex,
        receiver: PlayerIndex,
        amount: Amount,
        entry: LedgerEntry,
    ) -> Result<(), LedgerError> {
        let before = (
            self.player(sender)?.balance,
            self.player(receiver)?.balance,
        );
        self.apply_transfer(sender, receiver, amount)?;
        if let Err(err) = self.append_log_entry(entry) {
            self.players[sender].balance = before.0;
            self.players[receiver].balance = before.1;
            if let Err(restore) = self.save_players() {
                warn!(error = %restore, "persisted roster left ahead of the log");
            }
            return Err(err);
        }
        Ok(())
    }

    pub fn log(&self) -> &[LedgerEntry] {
        &self.log
    }

    /// Overwrites the whole log; entries are not checked against the roster.
    pub fn replace_log(&mut self, entries: Vec<LedgerEntry>) -> Result<(), LedgerError> {
        let previous = std::mem::replace(&mut self.log, entries);
        if let Err(err) = self.save_log() {
            self.log = previous;
            return Err(err);
        }
        Ok(())
    }

    pub fn is_dark_theme(&self) -> bool {
        self.dark_theme
    }

    pub fn set_dark_theme(&mut self, dark: bool) -> Result<(), LedgerError> {
        self.backend.set(THEME_KEY, dark.to_string())?;
        self.dark_theme = dark;
        debug!(dark, "saved theme preference");
        Ok(())
    }

    pub fn toggle_theme(&mut self) -> Result<bool, LedgerError> {
        let dark = !self.dark_theme;
        self.set_dark_theme(dark)?;
        Ok(dark)
    }

    fn save_players(&mut self) -> Result<(), LedgerError> {
        let raw = encode(PLAYERS_KEY, &self.players)?;
        self.backend.set(PLAYERS_KEY, raw)?;
        debug!(players = self.players.len(), "saved roster");
        Ok(())
    }

    fn save_log(&mut self) -> Result<(), LedgerError> {
        let raw = encode(LOG_KEY, &self.log)?;
        self.backend.set(LOG_KEY, raw)?;
        debug!(entries = self.log.len(), "saved transaction log");
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn backend(&self) -> &S {
        &self.backend
    }
}

fn encode<T: Serialize + ?Sized>(key: &'static str, value: &T) -> Result<String, LedgerError> {
    serde_json::to_string(value).map_err(|source| LedgerError::Corrupt { key, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FailingStore, MemoryStore};

    #[test]
    fn fresh_store_seeds_four_default_players() {
        let store = LedgerStore::open(MemoryStore::new()).unwrap();
        let names: Vec<&str> = store.players().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Player 1", "Player 2", "Player 3", "Player 4"]);
        assert!(store.players().iter().all(|p| p.balance == STARTING_BALANCE));
        assert!(store.log().is_empty());
        assert!(!store.is_dark_theme());
        // seeding is persisted right away
        assert!(store.backend().get(PLAYERS_KEY).unwrap().is_some());
    }

    #[test]
    fn reopening_keeps_roster_and_log() {
        let mut store = LedgerStore::open(MemoryStore::new()).unwrap();
        store.add_player("Dana", "secret").unwrap();
        store
            .append_log_entry(LedgerEntry::from("line one".to_string()))
            .unwrap();
        store.set_dark_theme(true).unwrap();
        let backend = store.backend().clone();

        let reopened = LedgerStore::open(backend).unwrap();
        assert_eq!(reopened.players().len(), 5);
        assert_eq!(reopened.players()[4].name, "Dana");
        assert_eq!(reopened.log()[0].as_str(), "line one");
        assert!(reopened.is_dark_theme());
    }

    #[test]
    fn legacy_field_names_are_accepted() {
        let mut backend = MemoryStore::new();
        backend
            .set(
                PLAYERS_KEY,
                r#"[{"name":"Ann","coins":5000,"password":"pw"}]"#.into(),
            )
            .unwrap();
        let store = LedgerStore::open(backend).unwrap();
        assert_eq!(store.players()[0].balance, 5_000);
        assert_eq!(store.players()[0].credential, "pw");
    }

    #[test]
    fn blank_name_or_credential_is_rejected() {
        let mut store = LedgerStore::open(MemoryStore::new()).unwrap();
        assert!(matches!(
            store.add_player("   ", "pw"),
            Err(LedgerError::Validation)
        ));
        assert!(matches!(
            store.add_player("Eve", ""),
            Err(LedgerError::Validation)
        ));
        assert_eq!(store.players().len(), 4);
    }

    #[test]
    fn added_player_is_trimmed_and_funded() {
        let mut store = LedgerStore::open(MemoryStore::new()).unwrap();
        let player = store.add_player("  Eve ", " pw ").unwrap();
        assert_eq!(player.name, "Eve");
        assert_eq!(player.credential, "pw");
        assert_eq!(player.balance, STARTING_BALANCE);
    }

    #[test]
    fn apply_transfer_refuses_overdraft() {
        let mut store = LedgerStore::open(MemoryStore::new()).unwrap();
        let err = store.apply_transfer(0, 1, STARTING_BALANCE + 1).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
        assert_eq!(store.total_balance(), u128::from(4 * STARTING_BALANCE));
        assert!(matches!(
            store.apply_transfer(0, 9, 1),
            Err(LedgerError::UnknownPlayer { index: 9 })
        ));
    }

    #[test]
    fn failed_roster_write_leaves_memory_untouched() {
        let backend = FailingStore::default();
        let switch = backend.clone();
        let mut store = LedgerStore::open(backend).unwrap();
        switch.fail_on(PLAYERS_KEY);

        assert!(matches!(
            store.add_player("Zed", "pw"),
            Err(LedgerError::Storage(_))
        ));
        assert_eq!(store.players().len(), 4);

        assert!(store.apply_transfer(0, 1, 10_000).is_err());
        assert!(store.players().iter().all(|p| p.balance == STARTING_BALANCE));
    }

    #[test]
    fn failed_log_write_undoes_the_transfer() {
        let backend = FailingStore::default();
        let switch = backend.clone();
        let mut store = LedgerStore::open(backend).unwrap();
        switch.fail_on(LOG_KEY);

        let entry = LedgerEntry::from("t: moved".to_string());
        assert!(store.record_transfer(0, 1, 10_000, entry.clone()).is_err());
        assert!(store.players().iter().all(|p| p.balance == STARTING_BALANCE));
        assert!(store.log().is_empty());
        // the roster on disk was rewritten back as well
        let persisted: Vec<Player> =
            serde_json::from_str(&store.backend().get(PLAYERS_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(persisted, store.players());

        assert!(store.replace_log(vec![entry]).is_err());
        assert!(store.log().is_empty());
        assert!(store.set_dark_theme(true).is_ok());
        switch.fail_on(THEME_KEY);
        assert!(store.toggle_theme().is_err());
        assert!(store.is_dark_theme());
    }

    #[test]
    fn huge_persisted_balances_do_not_panic() {
        let mut backend = MemoryStore::new();
        let roster = vec![
            Player {
                name: "Rich".into(),
                balance: u64::MAX - 1_000,
                credential: "a".into(),
            },
            Player {
                name: "Poor".into(),
                balance: 5_000,
                credential: "b".into(),
            },
        ];
        backend
            .set(PLAYERS_KEY, serde_json::to_string(&roster).unwrap())
            .unwrap();
        let mut store = LedgerStore::open(backend).unwrap();

        assert_eq!(
            store.total_balance(),
            u128::from(u64::MAX - 1_000) + 5_000
        );
        assert!(matches!(
            store.apply_transfer(1, 0, 5_000),
            Err(LedgerError::BalanceOverflow { .. })
        ));
        assert_eq!(store.players()[0].balance, u64::MAX - 1_000);
        assert_eq!(store.players()[1].balance, 5_000);
    }

    #[test]
    fn malformed_persisted_values_are_corrupt() {
        let mut backend = MemoryStore::new();
        backend.set(PLAYERS_KEY, "not json".into()).unwrap();
        assert!(matches!(
            LedgerStore::open(backend),
            Err(LedgerError::Corrupt { key: "players", .. })
        ));

        let mut backend = MemoryStore::new();
        backend.set(LOG_KEY, "{\"oops\": 1}".into()).unwrap();
        assert!(matches!(
            LedgerStore::open(backend),
            Err(LedgerError::Corrupt { key: "transactionLog", .. })
        ));
    }

    #[test]
    fn theme_toggles_and_persists_as_string() {
        let mut store = LedgerStore::open(MemoryStore::new()).unwrap();
        assert!(store.toggle_theme().unwrap());
        assert_eq!(store.backend().get(THEME_KEY).unwrap().as_deref(), Some("true"));
        assert!(!store.toggle_theme().unwrap());
        assert_eq!(store.backend().get(THEME_KEY).unwrap().as_deref(), Some("false"));
    }

    #[test]
    fn coins_are_grouped_by_thousands() {
        assert_eq!(format_coins(0), "0");
        assert_eq!(format_coins(999), "999");
        assert_eq!(format_coins(1_000), "1,000");
        assert_eq!(format_coins(250_000), "250,000");
        assert_eq!(format_coins(1_234_567), "1,234,567");
    }
}
