use crate::config::types::CrawlerConfig;
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_limits(config)?;
    validate_politeness(config)?;
    validate_outputs(config)?;
    Ok(())
}

/// Validates worker-pool and request limits
fn validate_limits(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.workers < 1 {
        return Err(ConfigError::Validation(format!(
            "workers must be >= 1, got {}",
            config.workers
        )));
    }

    if config.request_timeout == 0 {
        return Err(ConfigError::Validation(
            "request_timeout must be > 0".to_string(),
        ));
    }

    if config.max_connections < 1 {
        return Err(ConfigError::Validation(format!(
            "max_connections must be >= 1, got {}",
            config.max_connections
        )));
    }

    if config.max_content_size == 0 {
        return Err(ConfigError::Validation(
            "max_content_size must be > 0".to_string(),
        ));
    }

    Ok(())
}

/// Validates politeness and dedupe settings
fn validate_politeness(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.default_delay < 0.0 || !config.default_delay.is_finite() {
        return Err(ConfigError::Validation(format!(
            "default_delay must be a finite number >= 0, got {}",
            config.default_delay
        )));
    }

    for (domain, delay) in &config.rate_limits {
        if *delay < 0.0 || !delay.is_finite() {
            return Err(ConfigError::Validation(format!(
                "rate_limits entry for '{}' must be a finite number >= 0, got {}",
                domain, delay
            )));
        }
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.bloom_capacity == 0 {
        return Err(ConfigError::Validation(
            "bloom_capacity must be > 0".to_string(),
        ));
    }

    if config.bloom_error_rate <= 0.0 || config.bloom_error_rate >= 1.0 {
        return Err(ConfigError::Validation(format!(
            "bloom_error_rate must be in (0, 1), got {}",
            config.bloom_error_rate
        )));
    }

    if config.metrics_interval == 0 {
        return Err(ConfigError::Validation(
            "metrics_interval must be > 0".to_string(),
        ));
    }

    if config.idle_shutdown_threshold == 0 {
        return Err(ConfigError::Validation(
            "idle_shutdown_threshold must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates sink selection and endpoints
fn validate_outputs(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if !config.enable_bus_output && !config.enable_local_save {
        return Err(ConfigError::Validation(
            "at least one output must be enabled (enable_bus_output or enable_local_save)"
                .to_string(),
        ));
    }

    if config.enable_bus_output {
        if config.bus_brokers.trim().is_empty() {
            return Err(ConfigError::Validation(
                "enable_bus_output requires bus_brokers".to_string(),
            ));
        }
        if config.bus_topic.trim().is_empty() {
            return Err(ConfigError::Validation(
                "enable_bus_output requires bus_topic".to_string(),
            ));
        }
    }

    if config.enable_local_save && config.local_output_dir.trim().is_empty() {
        return Err(ConfigError::Validation(
            "enable_local_save requires local_output_dir".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = CrawlerConfig::default();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let config = CrawlerConfig {
            workers: 0,
            ..CrawlerConfig::default()
        };
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_both_outputs_disabled_rejected() {
        let config = CrawlerConfig {
            enable_bus_output: false,
            enable_local_save: false,
            ..CrawlerConfig::default()
        };
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_bus_output_without_brokers_rejected() {
        let config = CrawlerConfig {
            enable_bus_output: true,
            bus_brokers: String::new(),
            ..CrawlerConfig::default()
        };
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_local_save_without_dir_rejected() {
        let config = CrawlerConfig {
            local_output_dir: String::new(),
            ..CrawlerConfig::default()
        };
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_bloom_error_rate_bounds() {
        for rate in [0.0, 1.0, -0.1, 1.5] {
            let config = CrawlerConfig {
                bloom_error_rate: rate,
                ..CrawlerConfig::default()
            };
            assert!(validate(&config).is_err(), "rate {} should be rejected", rate);
        }

        let config = CrawlerConfig {
            bloom_error_rate: 0.01,
            ..CrawlerConfig::default()
        };
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_negative_delay_rejected() {
        let config = CrawlerConfig {
            default_delay: -1.0,
            ..CrawlerConfig::default()
        };
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_empty_user_agent_rejected() {
        let config = CrawlerConfig {
            user_agent: "  ".to_string(),
            ..CrawlerConfig::default()
        };
        assert!(validate(&config).is_err());
    }
}
