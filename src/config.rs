//! Decoder configuration, optionally loaded from a TOML file.
//!
//! The config file is optional. A missing file yields `DecoderConfig::default()`.
//! Unknown keys are accepted but logged as a warning, since they are usually typos.
use serde::Deserialize;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use thiserror::Error;

use crate::feed::{FeedFormat, MarshalOptions, DEFAULT_MAX_DEPTH, DEFAULT_MAX_DOCUMENT_BYTES};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration Struct
// ============================================================================

/// Limits and policies for [`FeedDecoder`](crate::feed::FeedDecoder).
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Documents larger than this fail with `FeedError::TooLarge`.
    pub max_document_bytes: usize,

    /// Element nesting limit.
    pub max_depth: usize,

    /// Vocabularies to try, in order, after any declared or sniffed one.
    pub format_order: Vec<FeedFormat>,

    /// Keep entries with an unparseable date (undated) instead of dropping them.
    pub keep_undated_entries: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            max_depth: DEFAULT_MAX_DEPTH,
            format_order: FeedFormat::ALL.to_vec(),
            keep_undated_entries: false,
        }
    }
}

impl DecoderConfig {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 4] = [
        "max_document_bytes",
        "max_depth",
        "format_order",
        "keep_undated_entries",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing or blank file → `Ok(DecoderConfig::default())`
    /// - Invalid TOML or wrong value types → `Err(ConfigError::Parse)`
    /// - Out-of-range values → `Err(ConfigError::Invalid)`
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let Some(content) = read_config_file(path)? else {
            tracing::debug!(path = %path.display(), "No config file found, using defaults");
            return Ok(Self::default());
        };

        let config = Self::from_toml(&content)?;
        tracing::info!(
            path = %path.display(),
            max_document_bytes = config.max_document_bytes,
            max_depth = config.max_depth,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parses and validates TOML text. Blank text yields the defaults.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            tracing::debug!("Config is empty, using defaults");
            return Ok(Self::default());
        }

        // Parse as a raw table first to detect unknown keys
        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: DecoderConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_document_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_document_bytes must be greater than 0".to_string(),
            ));
        }
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid(
                "max_depth must be greater than 0".to_string(),
            ));
        }
        if self.format_order.is_empty() {
            return Err(ConfigError::Invalid(
                "format_order must name at least one format".to_string(),
            ));
        }
        for (i, format) in self.format_order.iter().enumerate() {
            if self.format_order[..i].contains(format) {
                return Err(ConfigError::Invalid(format!(
                    "format_order lists {format} more than once"
                )));
            }
        }
        Ok(())
    }

    pub fn marshal_options(&self) -> MarshalOptions {
        MarshalOptions {
            keep_undated_entries: self.keep_undated_entries,
        }
    }
}

/// Reads a config file of at most [`DecoderConfig::MAX_FILE_SIZE`] bytes.
///
/// `Ok(None)` when the file does not exist. The size is checked on the open handle
/// and the read is capped, so a file that grows after the check is still refused.
fn read_config_file(path: &Path) -> Result<Option<String>, ConfigError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(ConfigError::Io(e)),
    };

    let limit = DecoderConfig::MAX_FILE_SIZE;
    let too_large = |size: u64| {
        ConfigError::TooLarge(format!("Config file is {size} bytes (max {limit} bytes)"))
    };

    let size = file.metadata()?.len();
    if size > limit {
        return Err(too_large(size));
    }

    let mut content = String::new();
    file.take(limit + 1).read_to_string(&mut content)?;
    if content.len() as u64 > limit {
        return Err(too_large(content.len() as u64));
    }
    Ok(Some(content))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write_config(name: &str, content: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("feedcanon_config_test_{name}"));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn cleanup(path: &Path) {
        if let Some(dir) = path.parent() {
            std::fs::remove_dir_all(dir).ok();
        }
    }

    #[test]
    fn test_default_config() {
        let config = DecoderConfig::default();
        assert_eq!(config.max_document_bytes, 10 * 1024 * 1024);
        assert_eq!(config.max_depth, 64);
        assert_eq!(
            config.format_order,
            vec![FeedFormat::Rss2, FeedFormat::Atom, FeedFormat::Rss1]
        );
        assert!(!config.keep_undated_entries);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/feedcanon_test_nonexistent_config.toml");
        let config = DecoderConfig::load(path).unwrap();
        assert_eq!(config, DecoderConfig::default());
    }

    #[test]
    fn test_whitespace_only_file_returns_default() {
        let path = write_config("whitespace", "   \n  \n  ");
        let config = DecoderConfig::load(&path).unwrap();
        assert_eq!(config, DecoderConfig::default());
        cleanup(&path);
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let path = write_config("partial", "max_depth = 16\n");
        let config = DecoderConfig::load(&path).unwrap();
        assert_eq!(config.max_depth, 16);
        assert_eq!(config.max_document_bytes, DEFAULT_MAX_DOCUMENT_BYTES);
        assert_eq!(config.format_order, FeedFormat::ALL.to_vec());
        cleanup(&path);
    }

    #[test]
    fn test_full_config() {
        let content = r#"
max_document_bytes = 4096
max_depth = 32
format_order = ["Atom", "rss1", "RSS2"]
keep_undated_entries = true
"#;
        let path = write_config("full", content);
        let config = DecoderConfig::load(&path).unwrap();
        assert_eq!(
            config,
            DecoderConfig {
                max_document_bytes: 4096,
                max_depth: 32,
                format_order: vec![FeedFormat::Atom, FeedFormat::Rss1, FeedFormat::Rss2],
                keep_undated_entries: true,
            }
        );
        assert!(config.marshal_options().keep_undated_entries);
        cleanup(&path);
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let path = write_config("invalid", "this is not [valid toml");
        let err = DecoderConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
        cleanup(&path);
    }

    #[test]
    fn test_unknown_format_name_is_a_parse_error() {
        let err = DecoderConfig::from_toml("format_order = [\"JSONFeed\"]").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_wrong_type_returns_error() {
        let err = DecoderConfig::from_toml("max_depth = \"deep\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let config = DecoderConfig::from_toml("max_depth = 8\ntotally_fake_key = 1\n").unwrap();
        assert_eq!(config.max_depth, 8);
    }

    #[test]
    fn test_empty_format_order_rejected() {
        let err = DecoderConfig::from_toml("format_order = []").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_duplicate_format_rejected() {
        let err = DecoderConfig::from_toml("format_order = [\"RSS2\", \"rss2\"]").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid config value: format_order lists RSS2 more than once"
        );
    }

    #[test]
    fn test_zero_limits_rejected() {
        assert!(matches!(
            DecoderConfig::from_toml("max_depth = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            DecoderConfig::from_toml("max_document_bytes = 0"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_too_large_file_rejected() {
        let path = write_config("too_large", &"#".repeat(1_048_577));
        let err = DecoderConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        assert!(err.to_string().contains("too large"));
        cleanup(&path);
    }

    #[test]
    fn test_read_config_file() {
        let missing = Path::new("/tmp/feedcanon_test_nonexistent_config.toml");
        assert_eq!(read_config_file(missing).unwrap(), None);

        let path = write_config("read_helper", "max_depth = 4\n");
        assert_eq!(
            read_config_file(&path).unwrap().as_deref(),
            Some("max_depth = 4\n")
        );

        let at_limit = "#".repeat(1_048_576);
        std::fs::write(&path, &at_limit).unwrap();
        assert_eq!(read_config_file(&path).unwrap().map(|s| s.len()), Some(1_048_576));

        // A directory opens on Linux but cannot be read as text.
        let dir = path.parent().unwrap();
        assert!(matches!(read_config_file(dir), Err(ConfigError::Io(_))));
        cleanup(&path);
    }
}
