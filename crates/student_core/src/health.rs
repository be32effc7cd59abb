//! Health probes for the record store.
//!
//! # Responsibility
//! - Report whether the backing database is reachable and migrated.
//!
//! # Invariants
//! - Probes are read-only and never panic.

use crate::db::migrations::{current_user_version, latest_version};
use chrono::{NaiveDateTime, Utc};
use log::{info, warn};
use once_cell::sync::Lazy;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

pub const APPLICATION_NAME: &str = "Student Registry";

static STARTED_AT: Lazy<Instant> = Lazy::new(Instant::now);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Up,
    Down,
}

/// Database section of a health report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseHealth {
    pub status: HealthStatus,
    /// `healthy` or `failed`.
    pub connection: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_count: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp: NaiveDateTime,
    pub application: String,
    pub version: String,
    pub database: DatabaseHealth,
    /// Time since the registry started, e.g. `2h 15m 30s`.
    pub uptime: String,
}

impl HealthReport {
    /// Boundary status code: 200 when UP, 503 when DOWN.
    pub fn status_code(&self) -> u16 {
        match self.status {
            HealthStatus::Up => 200,
            HealthStatus::Down => 503,
        }
    }
}

/// Pins the uptime origin. Called when the first connection is opened.
pub fn mark_started() {
    Lazy::force(&STARTED_AT);
}

/// Probes `conn` and returns an overall health report.
pub fn check_health(conn: &Connection) -> HealthReport {
    let database = match probe_database(conn) {
        Ok(count) => DatabaseHealth {
            status: HealthStatus::Up,
            connection: "healthy".to_string(),
            error: None,
            student_count: Some(count),
        },
        Err(message) => DatabaseHealth {
            status: HealthStatus::Down,
            connection: "failed".to_string(),
            error: Some(message),
            student_count: None,
        },
    };

    match database.status {
        HealthStatus::Up => info!("event=health_check module=health status=ok"),
        HealthStatus::Down => warn!("event=health_check module=health status=error"),
    }

    HealthReport {
        status: database.status,
        timestamp: Utc::now().naive_utc(),
        application: APPLICATION_NAME.to_string(),
        version: crate::core_version().to_string(),
        database,
        uptime: format_uptime(STARTED_AT.elapsed()),
    }
}

fn format_uptime(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs();
    let minutes = seconds / 60;
    let hours = minutes / 60;

    if hours > 0 {
        format!("{hours}h {}m {}s", minutes % 60, seconds % 60)
    } else if minutes > 0 {
        format!("{minutes}m {}s", seconds % 60)
    } else {
        format!("{seconds}s")
    }
}

fn probe_database(conn: &Connection) -> Result<i64, String> {
    let version = current_user_version(conn).map_err(|err| err.to_string())?;
    let latest = latest_version();
    if version != latest {
        return Err(format!(
            "schema version {version} does not match expected {latest}"
        ));
    }

    conn.query_row("SELECT COUNT(*) FROM students;", [], |row| row.get(0))
        .map_err(|err| err.to_string())
}
