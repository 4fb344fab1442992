use std::fs;
use std::path::PathBuf;

use super::{StoreError, write_atomic};

/// A persisted monotonic counter backed by a single decimal text file.
/// Used for both certificate serials and CRL sequence numbers.
#[derive(Debug)]
pub struct PersistedCounter {
    path: PathBuf,
}

impl PersistedCounter {
    /// Create the counter file with `start` if it does not exist yet.
    pub fn create(path: PathBuf, start: u64) -> Result<Self, StoreError> {
        if !path.exists() {
            write_atomic(&path, format!("{start}\n").as_bytes())?;
        }
        Ok(Self { path })
    }

    /// Open an existing counter, validating it is readable and well-formed.
    pub fn open(path: PathBuf) -> Result<Self, StoreError> {
        let counter = Self { path };
        counter.peek()?;
        Ok(counter)
    }

    /// The value the next `allocate` call will return.
    pub fn peek(&self) -> Result<u64, StoreError> {
        let text = fs::read_to_string(&self.path)?;
        text.trim().parse::<u64>().map_err(|e| {
            StoreError::Corrupt(format!("counter file {}: {e}", self.path.display()))
        })
    }

    /// Atomic read-modify-write: the incremented value is persisted before
    /// the allocated one is handed out, so a crash between allocation and
    /// use burns the value instead of reusing it.
    pub fn allocate(&mut self) -> Result<u64, StoreError> {
        let value = self.peek()?;
        let next = value
            .checked_add(1)
            .ok_or_else(|| StoreError::Corrupt(format!("counter overflow at {value}")))?;
        write_atomic(&self.path, format!("{next}\n").as_bytes())?;
        Ok(value)
    }
}
