//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::{default_routes, GatewayConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file.
///
/// A file that omits `[[routes]]` gets the standard route table; an empty
/// table would silently send every `/api` request to the admin fallback.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let mut config: GatewayConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    if config.routes.is_empty() {
        config.routes = default_routes();
    }

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load from a file when a path is given, otherwise start from defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => Ok(GatewayConfig::standard()),
    }
}

/// Resolve the port to bind: CLI flag, then `PORT` environment variable,
/// then the config file value.
///
/// Takes the environment value as a parameter so the precedence chain stays a
/// pure function; an unparsable value is reported and skipped rather than
/// aborting startup.
pub fn effective_port(
    cli_port: Option<u16>,
    env_port: Option<&str>,
    config: &GatewayConfig,
) -> u16 {
    if let Some(port) = cli_port {
        return port;
    }

    if let Some(raw) = env_port {
        match raw.parse::<u16>() {
            Ok(port) => return port,
            Err(_) => {
                tracing::warn!(value = %raw, "ignoring unparsable PORT environment variable");
            }
        }
    }

    config.listener.port
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp_config(contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "gateway-config-{}-{}.toml",
            std::process::id(),
            uuid::Uuid::new_v4()
        ));
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_minimal_file_and_fills_route_table() {
        let path = write_temp_config("[listener]\nport = 7000\n");
        let config = load_config(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(config.listener.port, 7000);
        assert_eq!(config.routes.len(), 3);
        assert_eq!(config.routes[0].name, "admin-api");
    }

    #[test]
    fn surfaces_parse_errors() {
        let path = write_temp_config("listener = \"not a table\"");
        let err = load_config(&path).unwrap_err();
        fs::remove_file(&path).ok();

        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn surfaces_validation_errors() {
        let path = write_temp_config("[upstreams.api]\nbase_url = \"not a url\"\n");
        let err = load_config(&path).unwrap_err();
        fs::remove_file(&path).ok();

        match err {
            ConfigError::Validation(errors) => assert!(!errors.is_empty()),
            other => panic!("expected validation error, got {}", other),
        }
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_config(Path::new("/nonexistent/gateway.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn no_path_falls_back_to_standard_config() {
        let config = load_or_default(None).unwrap();
        assert_eq!(config.listener.port, 5000);
        assert_eq!(config.routes.len(), 3);
    }

    #[test]
    fn port_precedence_is_cli_env_config() {
        let config = GatewayConfig::standard();

        assert_eq!(effective_port(Some(9000), Some("8000"), &config), 9000);
        assert_eq!(effective_port(None, Some("8000"), &config), 8000);
        assert_eq!(effective_port(None, None, &config), 5000);
    }

    #[test]
    fn unparsable_env_port_falls_through() {
        let config = GatewayConfig::standard();
        assert_eq!(effective_port(None, Some("not-a-port"), &config), 5000);
        assert_eq!(effective_port(None, Some("70000"), &config), 5000);
    }
}
