//! Maintenance configuration.

use super::MaintenanceError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CHUNK_SIZE: usize = 50;
pub const DEFAULT_OLD_LOG_RETENTION_DAYS: u32 = 365;
pub const DEFAULT_SESSION_EXPIRY_HOURS: u32 = 24;

const MS_PER_HOUR: i64 = 60 * 60 * 1000;
const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

/// Tunables for bulk deletion. Missing JSON fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MaintenanceConfig {
    /// Items deleted per write-scope.
    pub chunk_size: usize,
    /// Workouts started more than this many days ago are "old".
    pub old_log_retention_days: u32,
    /// Unfinished workouts started more than this many hours ago are expired.
    pub session_expiry_hours: u32,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            old_log_retention_days: DEFAULT_OLD_LOG_RETENTION_DAYS,
            session_expiry_hours: DEFAULT_SESSION_EXPIRY_HOURS,
        }
    }
}

impl MaintenanceConfig {
    /// Parses and validates a JSON config object.
    pub fn from_json_str(json: &str) -> Result<Self, MaintenanceError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|err| MaintenanceError::InvalidConfig(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MaintenanceError> {
        if self.chunk_size == 0 {
            return Err(MaintenanceError::InvalidConfig(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        if self.old_log_retention_days == 0 {
            return Err(MaintenanceError::InvalidConfig(
                "old_log_retention_days must be greater than 0".to_string(),
            ));
        }
        if self.session_expiry_hours == 0 {
            return Err(MaintenanceError::InvalidConfig(
                "session_expiry_hours must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Start-time cutoff for `old_workout_logs` relative to `now_ms`.
    pub fn old_log_cutoff(&self, now_ms: i64) -> i64 {
        now_ms.saturating_sub(i64::from(self.old_log_retention_days) * MS_PER_DAY)
    }

    /// Start-time cutoff for `expired_sessions` relative to `now_ms`.
    pub fn session_cutoff(&self, now_ms: i64) -> i64 {
        now_ms.saturating_sub(i64::from(self.session_expiry_hours) * MS_PER_HOUR)
    }
}

#[cfg(test)]
mod tests {
    use super::{MaintenanceConfig, DEFAULT_CHUNK_SIZE};
    use crate::service::maintenance::MaintenanceError;

    #[test]
    fn missing_fields_take_defaults() {
        let config = MaintenanceConfig::from_json_str(r#"{"chunk_size": 10}"#).unwrap();
        assert_eq!(config.chunk_size, 10);
        assert_eq!(config.old_log_retention_days, 365);
        assert_eq!(config.session_expiry_hours, 24);
        assert_eq!(
            MaintenanceConfig::from_json_str("{}").unwrap().chunk_size,
            DEFAULT_CHUNK_SIZE
        );
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        assert!(matches!(
            MaintenanceConfig::from_json_str(r#"{"chunk_size": 0}"#),
            Err(MaintenanceError::InvalidConfig(_))
        ));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(matches!(
            MaintenanceConfig::from_json_str(r#"{"chunk": 5}"#),
            Err(MaintenanceError::InvalidConfig(_))
        ));
    }

    #[test]
    fn cutoffs_subtract_windows() {
        let config = MaintenanceConfig::default();
        let now = 400 * 24 * 60 * 60 * 1000_i64;
        assert_eq!(config.old_log_cutoff(now), 35 * 24 * 60 * 60 * 1000);
        assert_eq!(config.session_cutoff(now), now - 24 * 60 * 60 * 1000);
    }
}
