use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use teloxide::types::ChatId;

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// A field holds an unusable value, e.g. a malformed token or a zero `batch_size`.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::Validation(msg) => write!(f, "invalid tagbot config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    telegram_bot_token: String,
    /// Users allowed to run privileged commands in every chat.
    #[serde(default)]
    super_admin_ids: Vec<i64>,
    /// Participants mentioned per tag-all message.
    #[serde(default = "default_batch_size")]
    batch_size: usize,
    /// Pause between two tag-all messages, in milliseconds.
    #[serde(default = "default_batch_delay_ms")]
    batch_delay_ms: u64,
    /// Roast corpus, one line per roast. Relative paths resolve against data_dir.
    #[serde(default = "default_roast_file")]
    roast_file: String,
    #[serde(default = "default_command_prefix")]
    command_prefix: String,
    #[serde(default)]
    allowed_groups: Vec<i64>,
    #[serde(default)]
    dry_run: bool,
    /// Directory for state files (logs, roster). Defaults to current directory.
    data_dir: Option<String>,
}

fn default_batch_size() -> usize {
    5
}

fn default_batch_delay_ms() -> u64 {
    2000
}

fn default_roast_file() -> String {
    "roasts.txt".to_string()
}

fn default_command_prefix() -> String {
    "!".to_string()
}

/// Settings the command dispatcher needs. Fixed at startup.
#[derive(Debug, Clone)]
pub struct BotSettings {
    pub super_admins: HashSet<i64>,
    pub batch_size: NonZeroUsize,
    pub batch_delay: Duration,
    pub roast_file: PathBuf,
    pub command_prefix: String,
}

pub struct Config {
    pub telegram_bot_token: String,
    pub bot: BotSettings,
    pub allowed_groups: HashSet<ChatId>,
    pub dry_run: bool,
    /// Directory for state files (logs, roster).
    pub data_dir: PathBuf,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;

        if file.telegram_bot_token.is_empty() {
            return Err(ConfigError::Validation("telegram_bot_token is required".into()));
        }
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = file.telegram_bot_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "telegram_bot_token appears invalid (expected format: 123456789:ABCdefGHI...)".into()
            ));
        }

        let batch_size = NonZeroUsize::new(file.batch_size)
            .ok_or_else(|| ConfigError::Validation("batch_size must be greater than zero".into()))?;

        if file.command_prefix.is_empty() || file.command_prefix.chars().any(char::is_whitespace) {
            return Err(ConfigError::Validation(
                "command_prefix must be non-empty and contain no whitespace".into()
            ));
        }

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        let roast_file = PathBuf::from(&file.roast_file);
        let roast_file = if roast_file.is_relative() {
            data_dir.join(roast_file)
        } else {
            roast_file
        };

        Ok(Self {
            telegram_bot_token: file.telegram_bot_token,
            bot: BotSettings {
                super_admins: file.super_admin_ids.into_iter().collect(),
                batch_size,
                batch_delay: Duration::from_millis(file.batch_delay_ms),
                roast_file,
                command_prefix: file.command_prefix.to_lowercase(),
            },
            allowed_groups: file.allowed_groups.into_iter().map(ChatId).collect(),
            dry_run: file.dry_run,
            data_dir,
        })
    }

    pub fn is_allowed_group(&self, chat_id: ChatId) -> bool {
        self.allowed_groups.is_empty() || self.allowed_groups.contains(&chat_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn assert_err<T>(result: Result<T, ConfigError>) -> ConfigError {
        match result {
            Ok(_) => panic!("expected error, got Ok"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_valid_config_uses_defaults() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdefGHIjklMNOpqrsTUVwxyz"
        }"#);
        let config = Config::load(file.path()).expect("should load valid config");
        assert!(config.bot.super_admins.is_empty());
        assert_eq!(config.bot.batch_size.get(), 5);
        assert_eq!(config.bot.batch_delay, Duration::from_millis(2000));
        assert_eq!(config.bot.command_prefix, "!");
        assert_eq!(config.bot.roast_file, PathBuf::from("./roasts.txt"));
        assert!(!config.dry_run);
        assert!(config.is_allowed_group(ChatId(-100)));
    }

    #[test]
    fn test_full_config() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdef",
            "super_admin_ids": [42, 7],
            "batch_size": 3,
            "batch_delay_ms": 0,
            "roast_file": "/etc/tagbot/roasts.txt",
            "command_prefix": "/",
            "allowed_groups": [-1001],
            "dry_run": true,
            "data_dir": "/var/lib/tagbot"
        }"#);
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.bot.super_admins, HashSet::from([42, 7]));
        assert_eq!(config.bot.batch_size.get(), 3);
        assert_eq!(config.bot.batch_delay, Duration::ZERO);
        assert_eq!(config.bot.roast_file, PathBuf::from("/etc/tagbot/roasts.txt"));
        assert_eq!(config.bot.command_prefix, "/");
        assert!(config.is_allowed_group(ChatId(-1001)));
        assert!(!config.is_allowed_group(ChatId(-1002)));
        assert!(config.dry_run);
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/tagbot"));
    }

    #[test]
    fn test_relative_roast_file_resolves_against_data_dir() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdef",
            "roast_file": "corpus/roasts.txt",
            "data_dir": "/srv/bot"
        }"#);
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.bot.roast_file, PathBuf::from("/srv/bot/corpus/roasts.txt"));
    }

    #[test]
    fn test_zero_batch_size() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdef",
            "batch_size": 0
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert_eq!(err.to_string(), "invalid tagbot config: batch_size must be greater than zero");
    }

    #[test]
    fn test_blank_command_prefix() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdef",
            "command_prefix": " "
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(err.to_string().contains("command_prefix"));
    }

    #[test]
    fn test_empty_token() {
        let file = write_config(r#"{ "telegram_bot_token": "" }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("telegram_bot_token"));
    }

    #[test]
    fn test_invalid_token_format() {
        for token in ["invalid_token_no_colon", "notanumber:ABCdef", "123456789:"] {
            let file = write_config(&format!(r#"{{ "telegram_bot_token": "{token}" }}"#));
            let err = assert_err(Config::load(file.path()));
            assert!(matches!(err, ConfigError::Validation(_)), "token {token:?}");
        }
    }

    #[test]
    fn test_file_not_found() {
        let err = assert_err(Config::load("/nonexistent/path/config.json"));
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_invalid_json() {
        let file = write_config("{ invalid json }");
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::ParseJson { .. }));
    }
}
