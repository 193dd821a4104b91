//! Configuration data model
//!
//! A configuration is a named JSON document with an append-only history. The
//! head row carries the current payload; every write adds one immutable
//! [`VersionRecord`] and moves the head forward by exactly one.

use crate::error::{ConfigError, ConfigResult};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Version number of a configuration; the first version is 1
pub type Version = u32;

pub const FIRST_VERSION: Version = 1;

/// How the current head came to be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Provenance {
    /// Produced by create or update
    #[default]
    Plain,
    /// Produced by a rollback: `from` is the head that was superseded, `to`
    /// the historical version whose payload was copied forward
    RollbackOf { from: Version, to: Version },
}

impl Provenance {
    pub fn is_rollback(&self) -> bool {
        matches!(self, Provenance::RollbackOf { .. })
    }

    pub fn rollback_from(&self) -> Option<Version> {
        match self {
            Provenance::RollbackOf { from, .. } => Some(*from),
            Provenance::Plain => None,
        }
    }

    pub fn rollback_to(&self) -> Option<Version> {
        match self {
            Provenance::RollbackOf { to, .. } => Some(*to),
            Provenance::Plain => None,
        }
    }

    /// Rebuild from the nullable storage columns; a half-populated pair is
    /// treated as plain
    pub fn from_columns(from: Option<Version>, to: Option<Version>) -> Self {
        match (from, to) {
            (Some(from), Some(to)) => Provenance::RollbackOf { from, to },
            _ => Provenance::Plain,
        }
    }
}

/// A configuration as seen at one version
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub name: String,
    pub version: Version,
    pub data: Value,
    /// Set once at creation
    pub created_at: DateTime<Utc>,
    /// Refreshed on every write
    pub updated_at: DateTime<Utc>,
    pub provenance: Provenance,
}

impl Configuration {
    /// Version 1 of a new configuration
    pub fn new(name: impl Into<String>, data: Value, now: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            version: FIRST_VERSION,
            data,
            created_at: now,
            updated_at: now,
            provenance: Provenance::Plain,
        }
    }

    /// The head that follows this one after an update
    ///
    /// # Errors
    ///
    /// Fails with `Internal` if the version counter is exhausted.
    pub fn next_version(&self, data: Value, now: DateTime<Utc>) -> ConfigResult<Self> {
        Ok(Self {
            name: self.name.clone(),
            version: self.successor()?,
            data,
            created_at: self.created_at,
            updated_at: now,
            provenance: Provenance::Plain,
        })
    }

    /// The head that follows this one after rolling back to `target`, whose
    /// payload is `data`
    ///
    /// # Errors
    ///
    /// Fails with `Internal` if the version counter is exhausted.
    pub fn rolled_back(&self, target: Version, data: Value, now: DateTime<Utc>) -> ConfigResult<Self> {
        Ok(Self {
            name: self.name.clone(),
            version: self.successor()?,
            data,
            created_at: self.created_at,
            updated_at: now,
            provenance: Provenance::RollbackOf {
                from: self.version,
                to: target,
            },
        })
    }

    /// The immutable history entry this head writes
    pub fn to_version_record(&self) -> VersionRecord {
        VersionRecord {
            name: self.name.clone(),
            version: self.version,
            created_at: self.updated_at,
            is_rollback: self.provenance.is_rollback(),
            data: self.data.clone(),
        }
    }

    /// Historical view of `record`, keeping the configuration's creation time
    pub fn from_history(record: VersionRecord, created_at: DateTime<Utc>) -> Self {
        Self {
            name: record.name,
            version: record.version,
            data: record.data,
            created_at,
            updated_at: record.created_at,
            provenance: Provenance::Plain,
        }
    }

    fn successor(&self) -> ConfigResult<Version> {
        self.version.checked_add(1).ok_or_else(|| {
            ConfigError::Internal(format!(
                "version counter exhausted for configuration '{}'",
                self.name
            ))
        })
    }
}

/// One immutable entry of a configuration's history
#[derive(Debug, Clone, PartialEq)]
pub struct VersionRecord {
    pub name: String,
    pub version: Version,
    pub created_at: DateTime<Utc>,
    pub is_rollback: bool,
    pub data: Value,
}

/// Version metadata, as listed in a configuration's history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionInfo {
    pub version: Version,
    pub created_at: DateTime<Utc>,
    pub is_rollback: bool,
}

impl From<&VersionRecord> for VersionInfo {
    fn from(record: &VersionRecord) -> Self {
        Self {
            version: record.version,
            created_at: record.created_at,
            is_rollback: record.is_rollback,
        }
    }
}

/// Full history of a configuration, ascending by version
#[derive(Debug, Clone, PartialEq)]
pub struct VersionList {
    pub name: String,
    pub versions: Vec<VersionInfo>,
}
