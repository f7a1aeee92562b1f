//! Plain-text export and import of the transaction log.
//!
//! The exported file is the log entries joined by `\n`; import reads the
//! same shape back, dropping blank lines, and replaces the whole log.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::ledger::{LedgerEntry, LedgerError, LedgerStore};
use crate::storage::KeyValueStore;

pub const DEFAULT_EXPORT_FILE: &str = "transaction_log.txt";

#[derive(Debug, thiserror::Error)]
pub enum LogFileError {
    #[error("No transactions to download.")]
    EmptyLog,
    #[error("Please select a valid text file.")]
    UnsupportedFileType { path: PathBuf },
    #[error("log file i/o on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

pub fn render_log(entries: &[LedgerEntry]) -> String {
    entries
        .iter()
        .map(LedgerEntry::as_str)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn parse_log(contents: &str) -> Vec<LedgerEntry> {
    contents
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .map(|line| LedgerEntry::from(line.to_string()))
        .collect()
}

pub fn export_log<S: KeyValueStore>(
    store: &LedgerStore<S>,
    path: &Path,
) -> Result<usize, LogFileError> {
    if store.log().is_empty() {
        return Err(LogFileError::EmptyLog);
    }
    fs::write(path, render_log(store.log())).map_err(|source| LogFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), entries = store.log().len(), "exported transaction log");
    Ok(store.log().len())
}

pub fn import_log<S: KeyValueStore>(
    store: &mut LedgerStore<S>,
    path: &Path,
) -> Result<usize, LogFileError> {
    let is_txt = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"));
    if !is_txt {
        return Err(LogFileError::UnsupportedFileType {
            path: path.to_path_buf(),
        });
    }
    let bytes = fs::read(path).map_err(|source| LogFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let contents = String::from_utf8(bytes).map_err(|_| LogFileError::UnsupportedFileType {
        path: path.to_path_buf(),
    })?;
    let entries = parse_log(&contents);
    let count = entries.len();
    store.replace_log(entries)?;
    info!(path = %path.display(), entries = count, "imported transaction log");
    Ok(count)
}
