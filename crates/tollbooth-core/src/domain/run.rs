//! Run record and lifecycle transitions.
//!
//! A Run is the single source of truth for one preview → unlock → process →
//! download flow. State transitions happen through methods, never by writing
//! fields directly, so the invariants below hold for every persisted record:
//!
//! - `paid_at` and `expires_at` are set together and never cleared.
//! - `expires_at == paid_at + lifetime`.
//! - `status` never moves backwards.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::errors::RunError;
use super::ids::RunId;
use super::state::{RunState, RunStatus};
use super::tool::ToolSlug;

/// Default time a paid run stays downloadable.
pub const DEFAULT_RUN_LIFETIME_HOURS: i64 = 24;

/// Uploaded file metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputMeta {
    pub filename: String,
    pub size: u64,
}

/// Preview statistics (e.g. `totalRows`, `uniqueRows`, `duplicates`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreviewMeta(BTreeMap<String, u64>);

impl PreviewMeta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: u64) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<u64> {
        self.0.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Persisted run record (one JSON document per run).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub id: RunId,
    pub tool_slug: ToolSlug,
    status: RunStatus,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,

    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    paid_at: Option<DateTime<Utc>>,

    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    expires_at: Option<DateTime<Utc>>,

    pub input_meta: InputMeta,
    pub preview_meta: PreviewMeta,

    /// Extension of the stored input artifact.
    pub input_ext: String,
    /// Extension of the output artifact (and of the download filename).
    pub output_ext: String,
}

impl Run {
    /// Create a run right after its preview was computed.
    pub fn preview(
        id: RunId,
        tool_slug: ToolSlug,
        created_at: DateTime<Utc>,
        input_meta: InputMeta,
        preview_meta: PreviewMeta,
        input_ext: impl Into<String>,
        output_ext: impl Into<String>,
    ) -> Self {
        Self {
            id,
            tool_slug,
            status: RunStatus::PreviewReady,
            created_at,
            paid_at: None,
            expires_at: None,
            input_meta,
            preview_meta,
            input_ext: input_ext.into(),
            output_ext: output_ext.into(),
        }
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Has the delivery window closed?
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|deadline| now > deadline)
    }

    /// Observed state at `now`.
    pub fn state(&self, now: DateTime<Utc>) -> RunState {
        if self.is_expired(now) {
            RunState::Expired
        } else {
            self.status.into()
        }
    }

    /// `preview_ready -> paid`. Returns `false` (no-op) for any other status.
    pub fn unlock(&mut self, now: DateTime<Utc>, lifetime: Duration) -> bool {
        if self.status != RunStatus::PreviewReady {
            return false;
        }
        self.status = RunStatus::Paid;
        self.paid_at = Some(now);
        self.expires_at = Some(now + lifetime);
        true
    }

    /// Can the paid transformation run now? Expiry is checked first.
    pub fn ensure_processable(&self, now: DateTime<Utc>) -> Result<(), RunError> {
        if self.is_expired(now) {
            return Err(RunError::Expired(self.id));
        }
        if !self.status.is_paid() {
            return Err(RunError::NotPaid(self.id));
        }
        Ok(())
    }

    /// `paid | ready -> ready`.
    pub fn mark_ready(&mut self) -> Result<(), RunError> {
        if !self.status.is_paid() {
            return Err(RunError::NotPaid(self.id));
        }
        self.status = RunStatus::Ready;
        Ok(())
    }

    /// Can the output be downloaded now? Expiry is checked first.
    pub fn ensure_downloadable(&self, now: DateTime<Utc>) -> Result<(), RunError> {
        if self.is_expired(now) {
            return Err(RunError::Expired(self.id));
        }
        if self.status != RunStatus::Ready {
            return Err(RunError::NotReady(self.id));
        }
        Ok(())
    }

    /// Filename offered on download: `<slug>-<run-id>.<ext>`.
    pub fn download_filename(&self) -> String {
        format!("{}-{}.{}", self.tool_slug, self.id, self.output_ext)
    }
}
