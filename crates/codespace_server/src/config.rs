use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host (default: 0.0.0.0)
    pub host: String,
    /// Server port (default: 5000)
    pub port: u16,
    /// Database file path (default: ./codespace.db)
    pub database_path: PathBuf,
    /// CORS allowed origins (comma-separated, `*` for any)
    pub cors_origins: Vec<String>,
    /// Terminal command configuration
    pub terminal: TerminalConfig,
}

/// Configuration for the terminal command runner
#[derive(Debug, Clone)]
pub struct TerminalConfig {
    /// Program names that may be launched (default: node, python)
    pub allowed_commands: Vec<String>,
    /// Maximum run time of a single command (default: 30 seconds)
    pub timeout: Duration,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            allowed_commands: vec!["node".to_string(), "python".to_string()],
            timeout: Duration::from_secs(30),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "5000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let database_path = PathBuf::from(
            env::var("DATABASE_PATH").unwrap_or_else(|_| "./codespace.db".to_string()),
        );

        let cors_origins = split_list(&env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string()));

        let defaults = TerminalConfig::default();
        let allowed_commands = match env::var("TERMINAL_ALLOWED_COMMANDS") {
            Ok(list) => split_list(&list),
            Err(_) => defaults.allowed_commands,
        };
        let timeout = match env::var("TERMINAL_TIMEOUT_SECS") {
            Ok(secs) => Duration::from_secs(
                secs.parse()
                    .map_err(|_| ConfigError::InvalidTerminalTimeout)?,
            ),
            Err(_) => defaults.timeout,
        };

        Ok(Config {
            host,
            port,
            database_path,
            cors_origins,
            terminal: TerminalConfig {
                allowed_commands,
                timeout,
            },
        })
    }

    /// Whether any origin may call the API
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.iter().any(|o| o == "*")
    }

    /// Get the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidTerminalTimeout,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "Invalid PORT environment variable"),
            ConfigError::InvalidTerminalTimeout => {
                write!(f, "Invalid TERMINAL_TIMEOUT_SECS environment variable")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list(" node, python ,,deno"),
            vec!["node", "python", "deno"]
        );
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_terminal_defaults() {
        let terminal = TerminalConfig::default();
        assert_eq!(terminal.allowed_commands, vec!["node", "python"]);
        assert_eq!(terminal.timeout, Duration::from_secs(30));
    }
}
