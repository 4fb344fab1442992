use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{CertificateRecord, RevocationReason};

pub mod counter;
pub mod file;

pub use counter::PersistedCounter;
pub use file::FileIndex;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no record matching {0}")]
    NotFound(String),

    #[error("serial {0} already present in the index")]
    DuplicateSerial(u64),

    #[error("serial {0} is already revoked")]
    AlreadyRevoked(u64),

    #[error("storage unavailable: {0}")]
    Unavailable(#[from] std::io::Error),

    #[error("corrupt state: {0}")]
    Corrupt(String),
}

/// The certificate database. Implementations must persist every mutation
/// fully before returning success; the index is the authority's record of
/// what it promised and what it revoked.
pub trait IndexStore {
    /// Append a new record. Serials are unique across the index's lifetime.
    fn insert(&mut self, record: CertificateRecord) -> Result<(), StoreError>;

    fn find(&self, serial: u64) -> Result<&CertificateRecord, StoreError>;

    /// Look a record up by its certificate artifact path. Revocation is
    /// usually invoked with a file path rather than a serial.
    fn find_by_path(&self, path: &Path) -> Result<&CertificateRecord, StoreError>;

    /// Transition Valid -> Revoked. Re-revoking is an error, not a no-op.
    fn revoke(
        &mut self,
        serial: u64,
        reason: RevocationReason,
        at: DateTime<Utc>,
    ) -> Result<CertificateRecord, StoreError>;

    /// Restartable iteration over the revoked set, stable for a snapshot.
    fn revoked(&self) -> Box<dyn Iterator<Item = &CertificateRecord> + '_>;

    fn records(&self) -> &[CertificateRecord];
}

/// Replace `path` through a temp file in the same directory so readers never
/// observe a half-written file and a crash leaves the old contents intact.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
