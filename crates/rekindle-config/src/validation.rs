// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as parseable window bounds, cadence ordering, and the
//! per-message scoring cap staying below the handoff threshold.

use chrono::NaiveTime;

use crate::diagnostic::ConfigError;
use crate::model::RekindleConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &RekindleConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    // Window bounds must parse as HH:MM and must differ.
    let open = parse_window(&config.compliance.window_open, "compliance.window_open", &mut errors);
    let close = parse_window(
        &config.compliance.window_close,
        "compliance.window_close",
        &mut errors,
    );
    if let (Some(open), Some(close)) = (open, close)
        && open >= close
    {
        errors.push(ConfigError::Validation {
            message: format!(
                "compliance.window_open ({open}) must be earlier than compliance.window_close ({close})"
            ),
        });
    }

    if config.compliance.max_sends_per_day == 0 {
        errors.push(ConfigError::Validation {
            message: "compliance.max_sends_per_day must be at least 1".to_string(),
        });
    }

    // Scoring weights must be non-negative and the cap must sit below the
    // handoff threshold so a single message cannot cross it on score alone.
    for (name, value) in [
        ("scoring.engagement_weight", config.scoring.engagement_weight),
        (
            "scoring.time_commitment_weight",
            config.scoring.time_commitment_weight,
        ),
        (
            "scoring.acknowledgment_weight",
            config.scoring.acknowledgment_weight,
        ),
        ("scoring.per_message_cap", config.scoring.per_message_cap),
    ] {
        if value < 0 {
            errors.push(ConfigError::Validation {
                message: format!("{name} must be non-negative, got {value}"),
            });
        }
    }

    if config.scoring.per_message_cap >= config.handoff.score_threshold {
        errors.push(ConfigError::Validation {
            message: format!(
                "scoring.per_message_cap ({}) must be below handoff.score_threshold ({})",
                config.scoring.per_message_cap, config.handoff.score_threshold
            ),
        });
    }

    if config.handoff.score_threshold <= 0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "handoff.score_threshold must be positive, got {}",
                config.handoff.score_threshold
            ),
        });
    }

    // Scheduler cadence and worker pool sanity.
    if config.scheduler.fast_poll_secs == 0 || config.scheduler.slow_poll_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "scheduler poll intervals must be at least 1 second".to_string(),
        });
    }

    if config.scheduler.fast_poll_secs > config.scheduler.slow_poll_secs {
        errors.push(ConfigError::Validation {
            message: format!(
                "scheduler.fast_poll_secs ({}) must not exceed scheduler.slow_poll_secs ({})",
                config.scheduler.fast_poll_secs, config.scheduler.slow_poll_secs
            ),
        });
    }

    if config.scheduler.worker_pool_size == 0 {
        errors.push(ConfigError::Validation {
            message: "scheduler.worker_pool_size must be at least 1".to_string(),
        });
    }

    if config.scheduler.max_send_attempts == 0 {
        errors.push(ConfigError::Validation {
            message: "scheduler.max_send_attempts must be at least 1".to_string(),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.sequence.dormancy_days == 0 {
        errors.push(ConfigError::Validation {
            message: "sequence.dormancy_days must be at least 1".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Parse an "HH:MM" window bound, collecting an error on failure.
fn parse_window(value: &str, key: &str, errors: &mut Vec<ConfigError>) -> Option<NaiveTime> {
    match NaiveTime::parse_from_str(value, "%H:%M") {
        Ok(t) => Some(t),
        Err(_) => {
            errors.push(ConfigError::Validation {
                message: format!("{key} must be \"HH:MM\", got `{value}`"),
            });
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = RekindleConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn rejects_unparseable_window() {
        let mut config = RekindleConfig::default();
        config.compliance.window_open = "8am".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(
            errors
                .iter()
                .any(|e| e.to_string().contains("compliance.window_open"))
        );
    }

    #[test]
    fn rejects_inverted_window() {
        let mut config = RekindleConfig::default();
        config.compliance.window_open = "20:00".to_string();
        config.compliance.window_close = "08:00".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_cap_at_or_above_threshold() {
        let mut config = RekindleConfig::default();
        config.scoring.per_message_cap = 60;
        let errors = validate_config(&config).unwrap_err();
        assert!(
            errors
                .iter()
                .any(|e| e.to_string().contains("per_message_cap"))
        );
    }

    #[test]
    fn rejects_fast_poll_slower_than_slow_poll() {
        let mut config = RekindleConfig::default();
        config.scheduler.fast_poll_secs = 1800;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn collects_multiple_errors() {
        let mut config = RekindleConfig::default();
        config.compliance.window_open = "noon".to_string();
        config.scheduler.worker_pool_size = 0;
        config.storage.database_path = "  ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.len() >= 3);
    }
}
