// Persisted position record: identity tag plus both encoder counts.
//
// Encoder counts are volatile, so the record is what survives a power
// cycle. It is rewritten only on settle events, which bounds the write
// rate on flash-class storage: holding steady at a stable target never
// rewrites it.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

/// The 3-line text record: `<identity>\n<pos_a>\n<pos_b>`.
/// Round-trips exactly through [`PositionStore::save`] and
/// [`PositionStore::load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedRecord {
    pub identity: String,
    pub pos_a: i64,
    pub pos_b: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error on position record: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed position record: {0}")]
    Malformed(&'static str),
}

pub struct PositionStore {
    path: PathBuf,
}

impl PositionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the record written by an earlier run.
    pub fn load(&self) -> Result<PersistedRecord, StoreError> {
        let text = fs::read_to_string(&self.path)?;
        let mut lines = text.lines();
        let identity = lines
            .next()
            .ok_or(StoreError::Malformed("missing identity tag"))?
            .to_string();
        let pos_a = lines
            .next()
            .ok_or(StoreError::Malformed("missing actuator A position"))?
            .trim()
            .parse()
            .map_err(|_| StoreError::Malformed("actuator A position is not an integer"))?;
        let pos_b = lines
            .next()
            .ok_or(StoreError::Malformed("missing actuator B position"))?
            .trim()
            .parse()
            .map_err(|_| StoreError::Malformed("actuator B position is not an integer"))?;
        Ok(PersistedRecord {
            identity,
            pos_a,
            pos_b,
        })
    }

    /// Overwrite the record. Goes through a sibling temp file and a
    /// rename so a torn write cannot destroy the previous copy.
    pub fn save(&self, record: &PersistedRecord) -> Result<(), StoreError> {
        let tmp = self.path.with_extension("tmp");
        fs::write(
            &tmp,
            format!("{}\n{}\n{}\n", record.identity, record.pos_a, record.pos_b),
        )?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "position record written");
        Ok(())
    }
}
