//! Audit trail sink contract and SQLite implementation.
//!
//! # Responsibility
//! - Record one audit entry per resolved core operation (success,
//!   expected failure, or unexpected exception).
//! - Keep the append path append-only; entries are never updated.
//!
//! # Invariants
//! - Sink failures never gate the operation that produced the entry;
//!   callers log and swallow them.
//! - `detail` is populated for exceptions only.

use crate::repo::{ensure_connection_ready, RepoResult};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, Row};
use std::error::Error;

const REQUIRED_TABLES: &[(&str, &[&str])] = &[(
    "process_log",
    &["logged_at", "level", "action", "message", "detail", "person_name"],
)];

/// Severity class of one audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditLevel {
    /// Operation completed.
    Info,
    /// Operation rejected for a caller-fixable reason.
    Error,
    /// Operation failed on infrastructure; `detail` carries diagnostics.
    Exception,
}

impl AuditLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Error => "error",
            Self::Exception => "exception",
        }
    }
}

/// One recorded audit event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub logged_at: DateTime<Utc>,
    pub level: AuditLevel,
    pub action: String,
    pub message: String,
    /// Diagnostic detail; exceptions only.
    pub detail: Option<String>,
    /// Person the operation was about, when one is known.
    pub person_name: Option<String>,
}

impl AuditEntry {
    fn now(
        level: AuditLevel,
        action: &str,
        message: &str,
        detail: Option<String>,
        person_name: Option<&str>,
    ) -> Self {
        Self {
            logged_at: Utc::now(),
            level,
            action: action.to_string(),
            message: message.to_string(),
            detail,
            person_name: person_name.map(str::to_string),
        }
    }
}

/// Sink receiving one entry per resolved core operation.
///
/// Invoked after the operation resolves; its result never influences the
/// operation's outcome.
pub trait AuditSink {
    /// Appends one entry to the trail.
    fn append(&self, entry: &AuditEntry) -> RepoResult<()>;

    /// Records a completed operation.
    fn record_success(
        &self,
        action: &str,
        message: &str,
        person_name: Option<&str>,
    ) -> RepoResult<()> {
        self.append(&AuditEntry::now(
            AuditLevel::Info,
            action,
            message,
            None,
            person_name,
        ))
    }

    /// Records a caller-fixable rejection.
    fn record_failure(
        &self,
        action: &str,
        message: &str,
        person_name: Option<&str>,
    ) -> RepoResult<()> {
        self.append(&AuditEntry::now(
            AuditLevel::Error,
            action,
            message,
            None,
            person_name,
        ))
    }

    /// Records an infrastructure fault with full diagnostic detail.
    fn record_exception(
        &self,
        action: &str,
        error: &(dyn Error + 'static),
        person_name: Option<&str>,
    ) -> RepoResult<()> {
        self.append(&AuditEntry::now(
            AuditLevel::Exception,
            action,
            &error.to_string(),
            Some(format!("{error:?}")),
            person_name,
        ))
    }
}

/// SQLite-backed audit trail over `process_log`.
pub struct SqliteAuditLog<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAuditLog<'conn> {
    /// Constructs a sink from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, REQUIRED_TABLES)?;
        Ok(Self { conn })
    }

    /// Returns the newest entries, most recent first.
    pub fn recent_entries(&self, limit: u32) -> RepoResult<Vec<AuditEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT logged_at, level, action, message, detail, person_name
             FROM process_log
             ORDER BY id DESC
             LIMIT ?1;",
        )?;

        let mut rows = stmt.query([limit])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_audit_row(row)?);
        }

        Ok(entries)
    }
}

impl AuditSink for SqliteAuditLog<'_> {
    fn append(&self, entry: &AuditEntry) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO process_log (logged_at, level, action, message, detail, person_name)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                entry.logged_at.to_rfc3339_opts(SecondsFormat::Millis, true),
                entry.level.as_str(),
                entry.action.as_str(),
                entry.message.as_str(),
                entry.detail.as_deref(),
                entry.person_name.as_deref(),
            ],
        )?;

        Ok(())
    }
}

fn parse_audit_row(row: &Row<'_>) -> RepoResult<AuditEntry> {
    let logged_at_text: String = row.get("logged_at")?;
    let logged_at = DateTime::parse_from_rfc3339(&logged_at_text)
        .map_err(|_| {
            crate::repo::RepoError::InvalidData(format!(
                "invalid timestamp `{logged_at_text}` in process_log.logged_at"
            ))
        })?
        .with_timezone(&Utc);

    let level_text: String = row.get("level")?;
    let level = match level_text.as_str() {
        "info" => AuditLevel::Info,
        "error" => AuditLevel::Error,
        "exception" => AuditLevel::Exception,
        other => {
            return Err(crate::repo::RepoError::InvalidData(format!(
                "invalid level `{other}` in process_log.level"
            )));
        }
    };

    Ok(AuditEntry {
        logged_at,
        level,
        action: row.get("action")?,
        message: row.get("message")?,
        detail: row.get("detail")?,
        person_name: row.get("person_name")?,
    })
}
