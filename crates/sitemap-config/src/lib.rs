//! Configuration management for sitemap tools.
//!
//! Parses `sitemap.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! ```toml
//! [source]
//! export = "data/production.ndjson"
//!
//! [sitemap]
//! document_type = "sitemap"
//! page_types = ["page", "landing"]
//! fields = ["excerpt"]
//! ```
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `source.export`
//! - `sitemap.document_type`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the dataset export file.
    pub export: Option<PathBuf>,
    /// Override the sitemap document type.
    pub document_type: Option<String>,
    /// Override the allowed page types.
    pub page_types: Option<Vec<String>>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "sitemap.toml";

/// Default dataset export filename, relative to the config directory.
const DEFAULT_EXPORT: &str = "export.ndjson";

/// Output keys every page record carries; not allowed as extra fields.
const RESERVED_FIELDS: [&str; 4] = ["id", "type", "slug", "title"];

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source configuration (paths are relative strings from TOML).
    source: SourceConfigRaw,
    /// Sitemap configuration.
    pub sitemap: SitemapConfig,

    /// Resolved source configuration (set after loading).
    #[serde(skip)]
    pub source_resolved: SourceConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Raw source configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct SourceConfigRaw {
    export: Option<String>,
}

/// Resolved source configuration with absolute paths.
#[derive(Debug, Default)]
pub struct SourceConfig {
    /// NDJSON dataset export to load documents from.
    pub export: PathBuf,
}

/// Sitemap configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SitemapConfig {
    /// Type of the sitemap root document.
    pub document_type: String,
    /// Content types allowed as explicit nodes. Empty allows any type.
    pub page_types: Vec<String>,
    /// Extra top-level fields to project into page records.
    pub fields: Vec<String>,
}

impl Default for SitemapConfig {
    fn default() -> Self {
        Self {
            document_type: "sitemap".to_owned(),
            page_types: Vec::new(),
            fields: Vec::new(),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`source.export`").
        field: String,
        /// Error message (e.g., "${`EXPORT_DIR`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a field name usable as a top-level projection.
fn require_identifier(value: &str, field: &str) -> Result<(), ConfigError> {
    let mut chars = value.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(ConfigError::Validation(format!(
            "{field} entry {value:?} is not a valid field name"
        )));
    }
    if RESERVED_FIELDS.contains(&value) {
        return Err(ConfigError::Validation(format!(
            "{field} entry {value:?} is always included"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `sitemap.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the result does not validate.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(export) = &settings.export {
            self.source_resolved.export.clone_from(export);
        }
        if let Some(document_type) = &settings.document_type {
            self.sitemap.document_type.clone_from(document_type);
        }
        if let Some(page_types) = &settings.page_types {
            self.sitemap.page_types.clone_from(page_types);
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        Self::discover_from(&current)
    }

    /// Search for config file in `start` and its parents.
    fn discover_from(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILENAME))
            .find(|candidate| candidate.exists())
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            source: SourceConfigRaw::default(),
            sitemap: SitemapConfig::default(),
            source_resolved: SourceConfig {
                export: base.join(DEFAULT_EXPORT),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.sitemap.document_type, "sitemap.document_type")?;
        for page_type in &self.sitemap.page_types {
            require_non_empty(page_type, "sitemap.page_types")?;
        }
        for field in &self.sitemap.fields {
            require_identifier(field, "sitemap.fields")?;
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref export) = self.source.export {
            self.source.export = Some(expand::expand_env(export, "source.export")?);
        }
        self.sitemap.document_type =
            expand::expand_env(&self.sitemap.document_type, "sitemap.document_type")?;
        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.source_resolved = SourceConfig {
            export: config_dir.join(self.source.export.as_deref().unwrap_or(DEFAULT_EXPORT)),
        };
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/test"));
        assert_eq!(config.sitemap.document_type, "sitemap");
        assert!(config.sitemap.page_types.is_empty());
        assert_eq!(
            config.source_resolved.export,
            PathBuf::from("/test/export.ndjson")
        );
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.sitemap.document_type, "sitemap");
        assert!(config.sitemap.fields.is_empty());
    }

    #[test]
    fn test_parse_sitemap_config() {
        let toml = r#"
[sitemap]
document_type = "navigation"
page_types = ["page", "landing"]
fields = ["excerpt"]
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.sitemap.document_type, "navigation");
        assert_eq!(config.sitemap.page_types, vec!["page", "landing"]);
        assert_eq!(config.sitemap.fields, vec!["excerpt"]);
    }

    #[test]
    fn test_resolve_paths() {
        let toml = r#"
[source]
export = "data/production.ndjson"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(
            config.source_resolved.export,
            PathBuf::from("/project/data/production.ndjson")
        );
    }

    #[test]
    fn test_absolute_export_path_is_kept() {
        let toml = r#"
[source]
export = "/exports/prod.ndjson"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(
            config.source_resolved.export,
            PathBuf::from("/exports/prod.ndjson")
        );
    }

    #[test]
    fn test_validate_rejects_reserved_field() {
        let toml = r#"
[sitemap]
fields = ["slug"]
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let err = config.validate().unwrap_err();

        assert!(
            matches!(err, ConfigError::Validation(_)),
            "Expected ConfigError::Validation, got {err:?}"
        );
        assert!(err.to_string().contains("slug"));
    }

    #[test]
    fn test_validate_rejects_bad_field_name() {
        let toml = r#"
[sitemap]
fields = ["author.name"]
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_empty_document_type() {
        let toml = r#"
[sitemap]
document_type = ""
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sitemap.document_type"));
    }

    #[test]
    fn test_apply_cli_settings() {
        let mut config = Config::default_with_base(Path::new("/test"));
        let overrides = CliSettings {
            export: Some(PathBuf::from("/custom/export.ndjson")),
            page_types: Some(vec!["article".to_owned()]),
            ..Default::default()
        };

        config.apply_cli_settings(&overrides);

        assert_eq!(
            config.source_resolved.export,
            PathBuf::from("/custom/export.ndjson")
        );
        assert_eq!(config.sitemap.page_types, vec!["article"]);
        assert_eq!(config.sitemap.document_type, "sitemap"); // Unchanged
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(
            &path,
            r#"
[source]
export = "prod.ndjson"

[sitemap]
page_types = ["page"]
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(config.source_resolved.export, dir.path().join("prod.ndjson"));
        assert_eq!(config.sitemap.page_types, vec!["page"]);
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_expands_env_vars() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(
            &path,
            r#"
[source]
export = "${SITEMAP_TEST_LOAD_EXPORT:-fallback.ndjson}"
"#,
        )
        .unwrap();
        // SAFETY: variable is unique to this test
        unsafe {
            std::env::remove_var("SITEMAP_TEST_LOAD_EXPORT");
        }

        let config = Config::load(Some(&path), None).unwrap();
        assert_eq!(
            config.source_resolved.export,
            dir.path().join("fallback.ndjson")
        );
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Some(Path::new("/nonexistent/sitemap.toml")), None);
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[sitemap\n").unwrap();

        assert!(matches!(
            Config::load(Some(&path), None),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_discover_in_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join(CONFIG_FILENAME), "").unwrap();

        assert_eq!(
            Config::discover_from(&nested),
            Some(dir.path().join(CONFIG_FILENAME))
        );
    }

    #[test]
    fn test_cli_settings_are_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "").unwrap();
        let overrides = CliSettings {
            document_type: Some(String::new()),
            ..Default::default()
        };

        let result = Config::load(Some(&path), Some(&overrides));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }
}
