use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;

use super::{IndexStore, StoreError, write_atomic};
use crate::models::{CertStatus, CertificateRecord, RevocationReason};

/// JSON Lines certificate index: one serde-encoded record per line. The
/// whole index is held in memory and rewritten atomically on mutation,
/// which is plenty for a lab-scale authority and keeps every mutation
/// all-or-nothing on disk.
#[derive(Debug)]
pub struct FileIndex {
    path: PathBuf,
    records: Vec<CertificateRecord>,
}

impl FileIndex {
    /// Create an empty index file if none exists, then open it.
    pub fn create(path: PathBuf) -> Result<Self, StoreError> {
        if !path.exists() {
            write_atomic(&path, b"")?;
        }
        Self::open(path)
    }

    pub fn open(path: PathBuf) -> Result<Self, StoreError> {
        let text = fs::read_to_string(&path)?;

        let mut records = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: CertificateRecord = serde_json::from_str(line).map_err(|e| {
                StoreError::Corrupt(format!("{}:{}: {e}", path.display(), lineno + 1))
            })?;
            records.push(record);
        }

        debug!(index = %path.display(), records = records.len(), "opened certificate index");
        Ok(Self { path, records })
    }

    fn flush(&self) -> Result<(), StoreError> {
        let mut buf = String::new();
        for record in &self.records {
            let line = serde_json::to_string(record)
                .map_err(|e| StoreError::Corrupt(format!("unencodable record: {e}")))?;
            buf.push_str(&line);
            buf.push('\n');
        }
        write_atomic(&self.path, buf.as_bytes())?;
        Ok(())
    }
}

impl IndexStore for FileIndex {
    fn insert(&mut self, record: CertificateRecord) -> Result<(), StoreError> {
        if self.records.iter().any(|r| r.serial == record.serial) {
            return Err(StoreError::DuplicateSerial(record.serial));
        }

        self.records.push(record);
        if let Err(e) = self.flush() {
            self.records.pop();
            return Err(e);
        }
        Ok(())
    }

    fn find(&self, serial: u64) -> Result<&CertificateRecord, StoreError> {
        self.records
            .iter()
            .find(|r| r.serial == serial)
            .ok_or_else(|| StoreError::NotFound(format!("serial {serial}")))
    }

    fn find_by_path(&self, path: &Path) -> Result<&CertificateRecord, StoreError> {
        // Exact match first, canonicalized comparison as a fallback so that
        // relative and absolute spellings of the same artifact both resolve.
        if let Some(record) = self.records.iter().find(|r| r.cert_path == path) {
            return Ok(record);
        }
        if let Ok(canonical) = path.canonicalize() {
            if let Some(record) = self
                .records
                .iter()
                .find(|r| r.cert_path.canonicalize().is_ok_and(|p| p == canonical))
            {
                return Ok(record);
            }
        }
        Err(StoreError::NotFound(format!(
            "certificate file {}",
            path.display()
        )))
    }

    fn revoke(
        &mut self,
        serial: u64,
        reason: RevocationReason,
        at: DateTime<Utc>,
    ) -> Result<CertificateRecord, StoreError> {
        let position = self
            .records
            .iter()
            .position(|r| r.serial == serial)
            .ok_or_else(|| StoreError::NotFound(format!("serial {serial}")))?;

        if self.records[position].status == CertStatus::Revoked {
            return Err(StoreError::AlreadyRevoked(serial));
        }

        let previous = self.records[position].clone();
        let record = &mut self.records[position];
        record.status = CertStatus::Revoked;
        record.revoked_at = Some(at);
        record.revocation_reason = Some(reason);

        if let Err(e) = self.flush() {
            self.records[position] = previous;
            return Err(e);
        }
        Ok(self.records[position].clone())
    }

    fn revoked(&self) -> Box<dyn Iterator<Item = &CertificateRecord> + '_> {
        Box::new(
            self.records
                .iter()
                .filter(|r| r.status == CertStatus::Revoked),
        )
    }

    fn records(&self) -> &[CertificateRecord] {
        &self.records
    }
}
