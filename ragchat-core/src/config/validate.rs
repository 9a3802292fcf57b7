//! Configuration validation rules.

use super::schema::Config;

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    if !is_http_url(&config.api.base_url) {
        errors.push("api.base_url must start with http:// or https://".to_string());
    }
    if !is_ws_url(&config.api.ws_url) {
        errors.push("api.ws_url must start with ws:// or wss://".to_string());
    }
    if config.api.timeout_secs == 0 {
        errors.push("api.timeout_secs must be > 0".to_string());
    }

    if config.reconnect.max_attempts == 0 {
        errors.push("reconnect.max_attempts must be > 0".to_string());
    }
    if config.reconnect.initial_delay_ms == 0 {
        errors.push("reconnect.initial_delay_ms must be > 0".to_string());
    }
    if config.reconnect.max_delay_ms < config.reconnect.initial_delay_ms {
        errors.push("reconnect.max_delay_ms must be >= reconnect.initial_delay_ms".to_string());
    }
    if !config.reconnect.multiplier.is_finite() || config.reconnect.multiplier < 1.0 {
        errors.push("reconnect.multiplier must be >= 1.0".to_string());
    }

    if config.pagination.domains_limit == 0 {
        errors.push("pagination.domains_limit must be > 0".to_string());
    }

    if config.logging.dir.trim().is_empty() {
        errors.push("logging.dir must not be empty".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Validation(errors.join("; ")))
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn is_ws_url(url: &str) -> bool {
    url.starts_with("ws://") || url.starts_with("wss://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_defaults() {
        validate_config(&Config::default()).unwrap();
    }

    #[test]
    fn test_validate_rejects_non_ws_url() {
        let mut config = Config::default();
        config.api.ws_url = "http://localhost:9000/ws".to_string();

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("api.ws_url"));
    }

    #[test]
    fn test_validate_aggregates_reconnect_errors() {
        let mut config = Config::default();
        config.reconnect.max_attempts = 0;
        config.reconnect.multiplier = 0.5;

        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("reconnect.max_attempts"));
        assert!(err.contains("reconnect.multiplier"));
    }
}
