//! Import of team requests exported as a JSON array by the old file-based
//! backend (`data/requests.json`).

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Deserialize;
use thiserror::Error;

use crate::db::{RequestStore, StoreError};
use crate::models::{now_millis, truncate_millis, Member, TeamRequest};

pub const DEFAULT_SOURCE: &str = "data/requests.json";

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid request data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One entry of the legacy export. Timestamps are camelCase there.
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyRequest {
    pub id: String,
    #[serde(default)]
    pub user_personal_phone: Option<String>,
    pub user_name: String,
    #[serde(default)]
    pub user_gender: Option<String>,
    #[serde(default)]
    pub user_abstract: Option<String>,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(alias = "ownerFingerprint")]
    pub owner_fingerprint: String,
    #[serde(default, rename = "createdAt", alias = "created_at")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "updatedAt", alias = "updated_at")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl LegacyRequest {
    /// Missing timestamps become `now`.
    pub fn into_team_request(self, now: DateTime<Utc>) -> TeamRequest {
        let created_at = self.created_at.map(truncate_millis).unwrap_or(now);
        TeamRequest {
            id: self.id,
            user_personal_phone: self.user_personal_phone,
            user_name: self.user_name,
            user_gender: self.user_gender,
            user_abstract: self.user_abstract,
            members: self.members,
            owner_fingerprint: self.owner_fingerprint,
            created_at,
            updated_at: self.updated_at.map(truncate_millis).unwrap_or(now),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub found: usize,
    pub skipped: usize,
    pub inserted: usize,
}

#[derive(Debug, PartialEq, Eq)]
pub enum MigrationOutcome {
    MissingSource,
    Empty,
    /// Every record already existed; nothing written, no backup taken.
    UpToDate(MigrationReport),
    Completed {
        report: MigrationReport,
        backup: PathBuf,
    },
}

pub fn parse_legacy(raw: &str) -> Result<Vec<LegacyRequest>, MigrationError> {
    Ok(serde_json::from_str(raw)?)
}

/// Inserts every record whose id is not stored yet.
pub async fn import_requests(
    store: &dyn RequestStore,
    records: Vec<LegacyRequest>,
) -> Result<MigrationReport, MigrationError> {
    let now = now_millis();
    let mut report = MigrationReport {
        found: records.len(),
        ..MigrationReport::default()
    };

    for record in records {
        if store.get(&record.id).await?.is_some() {
            report.skipped += 1;
            continue;
        }
        match store.import(record.into_team_request(now)).await {
            Ok(()) => report.inserted += 1,
            Err(StoreError::Conflict(id)) => {
                warn!("Request {} appeared during migration, skipping", id);
                report.skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(report)
}

/// Copies `source` next to itself as `<name>.bak.<unix millis>`.
pub async fn backup(source: &Path) -> Result<PathBuf, MigrationError> {
    let mut name = source.as_os_str().to_owned();
    name.push(format!(".bak.{}", Utc::now().timestamp_millis()));
    let target = PathBuf::from(name);

    tokio::fs::copy(source, &target)
        .await
        .map_err(|source_err| MigrationError::Io {
            path: target.clone(),
            source: source_err,
        })?;
    Ok(target)
}

pub async fn run(store: &dyn RequestStore, source: &Path) -> Result<MigrationOutcome, MigrationError> {
    if !tokio::fs::try_exists(source).await.unwrap_or(false) {
        info!("No JSON file found at: {}", source.display());
        return Ok(MigrationOutcome::MissingSource);
    }

    info!("Reading data from: {}", source.display());
    let raw = tokio::fs::read_to_string(source)
        .await
        .map_err(|e| MigrationError::Io {
            path: source.to_path_buf(),
            source: e,
        })?;
    let records = parse_legacy(&raw)?;

    if records.is_empty() {
        info!("No data found in the JSON file");
        return Ok(MigrationOutcome::Empty);
    }
    info!("Found {} team requests to migrate", records.len());

    let report = import_requests(store, records).await?;
    if report.skipped > 0 {
        info!("{} requests already exist in MongoDB", report.skipped);
    }
    if report.inserted == 0 {
        info!("All documents already exist in MongoDB. Nothing to migrate.");
        return Ok(MigrationOutcome::UpToDate(report));
    }

    info!("Migrated {} requests", report.inserted);
    let backup = backup(source).await?;
    info!("Created backup of original data at: {}", backup.display());

    Ok(MigrationOutcome::Completed { report, backup })
}
