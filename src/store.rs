//! Recipient Set Store
//!
//! Durable record of which recipients have been paid (`sent`) and which are
//! awaiting retry (`pending`). Two newline-delimited text artifacts under the
//! data directory, replaced atomically on every write. The sole source of
//! truth across process restarts.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::StoreError;
use crate::types::Address;

const SENT_FILENAME: &str = "sent_addresses.txt";
const PENDING_FILENAME: &str = "pending_addresses.txt";

/// Which durable set an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetKind {
    /// Recipients with a confirmed transfer; appended to, never cleared
    Sent,
    /// Recipients awaiting retry; replaced wholesale once per run
    Pending,
}

/// File-backed recipient set store
pub struct RecipientStore {
    data_dir: PathBuf,
}

impl RecipientStore {
    /// Create a store rooted at the given data directory
    pub fn new(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
        }
    }

    fn path_for(&self, kind: SetKind) -> PathBuf {
        match kind {
            SetKind::Sent => self.data_dir.join(SENT_FILENAME),
            SetKind::Pending => self.data_dir.join(PENDING_FILENAME),
        }
    }

    /// Load a set from disk. A missing artifact is an empty set, not an error.
    pub fn load(&self, kind: SetKind) -> Result<BTreeSet<Address>, StoreError> {
        let path = self.path_for(kind);
        if !path.exists() {
            return Ok(BTreeSet::new());
        }

        let content = fs::read_to_string(&path).map_err(|e| StoreError::Io {
            path: path.clone(),
            source: e,
        })?;

        Ok(content.lines().filter_map(Address::parse).collect())
    }

    /// Atomically replace a set on disk (write to a sibling temp file, then
    /// rename). A crash mid-write never leaves a partial artifact.
    pub fn save(&self, kind: SetKind, set: &BTreeSet<Address>) -> Result<(), StoreError> {
        fs::create_dir_all(&self.data_dir).map_err(|e| StoreError::Io {
            path: self.data_dir.clone(),
            source: e,
        })?;

        let path = self.path_for(kind);
        let temp_path = path.with_extension("txt.tmp");

        let mut content = set
            .iter()
            .map(Address::as_str)
            .collect::<Vec<_>>()
            .join("\n");
        if !content.is_empty() {
            content.push('\n');
        }

        fs::write(&temp_path, content).map_err(|e| StoreError::Io {
            path: temp_path.clone(),
            source: e,
        })?;
        fs::rename(&temp_path, &path).map_err(|e| StoreError::Io {
            path: path.clone(),
            source: e,
        })?;

        debug!("Persisted {} addresses to {:?}", set.len(), path);
        Ok(())
    }

    /// Compute the candidate set for a run: fetched addresses not yet sent,
    /// plus anything explicitly pending retry. Pending wins over sent, so a
    /// recipient that failed after a partial success in an earlier run is
    /// retried. Fetched order is preserved.
    pub fn candidates(
        fetched: &[Address],
        sent: &BTreeSet<Address>,
        pending: &BTreeSet<Address>,
    ) -> Vec<Address> {
        fetched
            .iter()
            .filter(|addr| !sent.contains(addr) || pending.contains(addr))
            .cloned()
            .collect()
    }
}
