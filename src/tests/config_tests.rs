#[cfg(test)]
mod tests {
    use crate::config::{self, AppConfig};
    use std::collections::HashMap;
    use std::fs;
    use tempfile::NamedTempFile;

    fn write_temp_config(content: &str) -> NamedTempFile {
        let temp_file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        fs::write(temp_file.path(), content).unwrap();
        temp_file
    }

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.server.body_limit_bytes, 10 * 1024 * 1024);
        assert_eq!(config.app.environment, "production");
        assert!(!config.is_development());
        assert!(config.api_key().is_none());
        assert_eq!(config.rate_limit.window_seconds, 900);
        assert_eq!(config.rate_limit.max_requests, 100);
        assert!(!config.rate_limit.trust_proxy_headers);
        assert_eq!(config.cors.origin, "http://localhost:3000");
        assert_eq!(config.downloads.dir, "public/downloads");
    }

    #[test]
    fn test_valid_config_does_not_error() {
        let result = config::load_from_vars(HashMap::new());
        assert!(result.is_ok());
    }

    #[test]
    fn test_legacy_variables() {
        let cfg = config::load_from_vars(vars(&[
            ("API_KEY", "s3cret"),
            ("PORT", "8088"),
            ("CORS_ORIGIN", "https://pay.example.com"),
            ("APP_ENV", "development"),
        ]))
        .unwrap();

        assert_eq!(cfg.api_key(), Some("s3cret"));
        assert_eq!(cfg.server.port, 8088);
        assert_eq!(cfg.cors.origin, "https://pay.example.com");
        assert!(cfg.is_development());
    }

    #[test]
    fn test_prefixed_variables() {
        let cfg = config::load_from_vars(vars(&[
            ("MOMO__RATE_LIMIT__MAX_REQUESTS", "5"),
            ("MOMO__RATE_LIMIT__WINDOW_SECONDS", "60"),
            ("MOMO__RATE_LIMIT__TRUST_PROXY_HEADERS", "true"),
        ]))
        .unwrap();

        assert_eq!(cfg.rate_limit.max_requests, 5);
        assert_eq!(cfg.rate_limit.window_seconds, 60);
        assert!(cfg.rate_limit.trust_proxy_headers);
    }

    #[test]
    fn test_legacy_variable_wins_over_prefixed() {
        let cfg = config::load_from_vars(vars(&[("MOMO__SERVER__PORT", "9000"), ("PORT", "9001")])).unwrap();
        assert_eq!(cfg.server.port, 9001);
    }

    #[test]
    fn test_empty_api_key_counts_as_unset() {
        let cfg = config::load_from_vars(vars(&[("API_KEY", "")])).unwrap();
        assert!(cfg.api_key().is_none());

        let mut cfg = AppConfig::default();
        cfg.auth.api_key = Some(String::new());
        assert!(cfg.api_key().is_none());
    }

    #[test]
    fn test_custom_config_file() {
        let file = write_temp_config(
            r#"
[app]
environment = "development"

[auth]
api_key = "from-file"

[rate_limit]
max_requests = 10
"#,
        );
        let path = file.path().to_str().unwrap().to_string();
        let cfg = config::load_from_vars(vars(&[("MOMO_GATEWAY_CONFIG", path.as_str())])).unwrap();

        assert!(cfg.is_development());
        assert_eq!(cfg.api_key(), Some("from-file"));
        assert_eq!(cfg.rate_limit.max_requests, 10);
        // Untouched keys keep their defaults
        assert_eq!(cfg.rate_limit.window_seconds, 900);
        assert_eq!(cfg.server.port, 3001);
    }

    #[test]
    fn test_environment_overrides_config_file() {
        let file = write_temp_config("[auth]\napi_key = \"from-file\"\n");
        let path = file.path().to_str().unwrap().to_string();
        let cfg = config::load_from_vars(vars(&[("MOMO_GATEWAY_CONFIG", path.as_str()), ("API_KEY", "from-env")])).unwrap();
        assert_eq!(cfg.api_key(), Some("from-env"));
    }

    #[test]
    fn test_invalid_server_port() {
        let result = config::load_from_vars(vars(&[("PORT", "0")]));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("invalid server.port"));
    }

    #[test]
    fn test_zero_rate_limit_values_rejected() {
        for (var, fragment) in [
            ("MOMO__RATE_LIMIT__MAX_REQUESTS", "rate_limit.max_requests"),
            ("MOMO__RATE_LIMIT__WINDOW_SECONDS", "rate_limit.window_seconds"),
            ("MOMO__RATE_LIMIT__CLEANUP_INTERVAL_SECONDS", "rate_limit.cleanup_interval_seconds"),
        ] {
            let err = config::load_from_vars(vars(&[(var, "0")])).unwrap_err();
            assert!(err.to_string().contains(fragment), "{}: {}", var, err);
        }
    }

    #[test]
    fn test_wildcard_cors_origin_rejected() {
        let err = config::load_from_vars(vars(&[("CORS_ORIGIN", "*")])).unwrap_err();
        assert!(err.to_string().contains("cors.origin"));
    }

    #[test]
    fn test_invalid_cors_origin_rejected() {
        let err = config::load_from_vars(vars(&[("CORS_ORIGIN", "http://bad\norigin")])).unwrap_err();
        assert!(err.to_string().contains("invalid cors.origin"));
    }

    #[test]
    fn test_auth_config_debug_redacts_key() {
        let mut cfg = AppConfig::default();
        cfg.auth.api_key = Some("super-secret-value".to_string());
        let dump = format!("{:?}", cfg);
        assert!(!dump.contains("super-secret-value"));
        assert!(dump.contains("[REDACTED]"));
    }
}
