//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_strategies(config)?;
    validate_journal(config)?;
    validate_reconstruction(config)?;
    validate_evidence(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

fn require_name(field: &str, value: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        return Err(invalid(field, "must not be empty"));
    }
    Ok(())
}

fn validate_strategies(config: &Config) -> ConfigResult<()> {
    require_name("storage.default_strategy", &config.storage.default_strategy)?;
    require_name("journal.backup_strategy", &config.journal.backup_strategy)
}

fn validate_journal(config: &Config) -> ConfigResult<()> {
    for (i, rule) in config.journal.alerts.iter().enumerate() {
        let by_detail = rule.outcome_detail.is_some();
        let by_event = rule.event_type.is_some() && rule.outcome.is_some();
        if !by_detail && !by_event {
            return Err(invalid(
                format!("journal.alerts[{i}]"),
                "a rule needs either outcome_detail or both event_type and outcome",
            ));
        }
    }
    Ok(())
}

fn validate_reconstruction(config: &Config) -> ConfigResult<()> {
    if config.reconstruction.bulk_size == 0 {
        return Err(invalid("reconstruction.bulk_size", "bulk_size must be at least 1"));
    }
    Ok(())
}

fn validate_evidence(config: &Config) -> ConfigResult<()> {
    require_name("evidence.seal_event_type", &config.evidence.seal_event_type)?;
    require_name("evidence.seal_strategy", &config.evidence.seal_strategy)
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.logging.level.as_str()) {
        return Err(invalid(
            "logging.level",
            format!(
                "unsupported log level '{}'; expected one of: {}",
                config.logging.level,
                valid_levels.join(", ")
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use arkiv_journal::{AlertLevel, AlertRule};

    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_bulk_size() {
        let mut config = Config::default();
        config.reconstruction.bulk_size = 0;
        let err = validate(&config).unwrap_err();
        assert!(
            matches!(err, ConfigError::ValidationError { ref field, .. } if field == "reconstruction.bulk_size")
        );
    }

    #[test]
    fn test_empty_strategy() {
        let mut config = Config::default();
        config.evidence.seal_strategy = " ".to_owned();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "loud".to_owned();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_incomplete_alert_rule() {
        let mut config = Config::default();
        config.journal.alerts.push(AlertRule::on_outcome_detail("STP_X.KO", AlertLevel::Error));
        assert!(validate(&config).is_ok());

        config.journal.alerts.push(AlertRule {
            event_type: Some("STP_X".to_owned()),
            ..AlertRule::default()
        });
        let err = validate(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { ref field, .. } if field == "journal.alerts[1]"));
    }
}
