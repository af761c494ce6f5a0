use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, Statement};
use serde::Serialize;
use std::time::Instant;
use tracing::debug;

use crate::common::DatabaseError;

/// Run `SELECT 1` against the pool
pub async fn check_health(db: &DatabaseConnection) -> Result<(), DatabaseError> {
    let stmt = Statement::from_string(DatabaseBackend::Postgres, "SELECT 1".to_owned());
    db.query_one_raw(stmt)
        .await
        .map_err(|e| DatabaseError::HealthCheckFailed(e.to_string()))?;

    debug!("PostgreSQL health check passed");
    Ok(())
}

/// Health check outcome, as reported by status commands
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub response_time_ms: u64,
}

impl HealthStatus {
    pub fn healthy(response_time_ms: u64) -> Self {
        Self {
            healthy: true,
            message: None,
            response_time_ms,
        }
    }

    pub fn unhealthy(message: String, response_time_ms: u64) -> Self {
        Self {
            healthy: false,
            message: Some(message),
            response_time_ms,
        }
    }
}

/// Like [`check_health`], but never fails and records the round-trip time
pub async fn check_health_detailed(db: &DatabaseConnection) -> HealthStatus {
    let start = Instant::now();
    let result = check_health(db).await;
    let elapsed = start.elapsed().as_millis() as u64;

    match result {
        Ok(()) => HealthStatus::healthy(elapsed),
        Err(e) => HealthStatus::unhealthy(e.to_string(), elapsed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_status_constructors() {
        let ok = HealthStatus::healthy(4);
        assert!(ok.healthy);
        assert!(ok.message.is_none());

        let down = HealthStatus::unhealthy("connection refused".to_string(), 120);
        assert!(!down.healthy);
        assert_eq!(down.message.as_deref(), Some("connection refused"));
        assert_eq!(down.response_time_ms, 120);
    }

    #[test]
    fn test_health_status_serializes_without_empty_message() {
        let json = serde_json::to_value(HealthStatus::healthy(3)).unwrap();
        assert_eq!(json["healthy"], true);
        assert!(json.get("message").is_none());
    }
}
