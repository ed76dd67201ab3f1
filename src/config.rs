use crate::cli::{Cli, OutputFormat, ThemeChoice, VerbosityLevel};
use crate::overlay::{ColorScheme, FixedTheme, SystemTheme, ThemePolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Base name of configuration files and of the user config directory
pub const CONFIG_NAME: &str = "trdp-xml-validate";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub files: FileConfig,
    pub editor: EditorConfig,
    pub cache: CacheConfig,
    pub output: OutputConfig,
}

/// Documents loaded by the example actions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct FileConfig {
    /// Instance document (TRDP device configuration)
    pub instance: Option<PathBuf>,
    /// XSD the instance is validated against
    pub schema: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct EditorConfig {
    pub theme: ThemePreference,
}

/// Compiled schema cache
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of compiled schemas kept in memory
    pub max_parsed_schemas: u64,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format
    pub format: OutputFormatConfig,
    /// Verbose output
    pub verbose: bool,
    /// Quiet mode (errors only)
    pub quiet: bool,
}

impl OutputConfig {
    pub fn verbosity(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}

/// Output format configuration (serializable version of CLI OutputFormat)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormatConfig {
    #[default]
    Human,
    Json,
}

/// Marker color scheme selection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreference {
    /// Follow the environment, see [`SystemTheme`]
    #[default]
    Auto,
    Light,
    Dark,
}

impl ThemePreference {
    pub fn theme_policy(self) -> Arc<dyn ThemePolicy> {
        match self {
            ThemePreference::Auto => Arc::new(SystemTheme::new()),
            ThemePreference::Light => Arc::new(FixedTheme(ColorScheme::Light)),
            ThemePreference::Dark => Arc::new(FixedTheme(ColorScheme::Dark)),
        }
    }
}

impl FromStr for ThemePreference {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(ThemePreference::Auto),
            "light" => Ok(ThemePreference::Light),
            "dark" => Ok(ThemePreference::Dark),
            other => Err(format!("unknown theme '{}'", other)),
        }
    }
}

impl From<OutputFormat> for OutputFormatConfig {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Human => OutputFormatConfig::Human,
            OutputFormat::Json => OutputFormatConfig::Json,
        }
    }
}

impl From<OutputFormatConfig> for OutputFormat {
    fn from(format: OutputFormatConfig) -> Self {
        match format {
            OutputFormatConfig::Human => OutputFormat::Human,
            OutputFormatConfig::Json => OutputFormat::Json,
        }
    }
}

impl From<ThemeChoice> for ThemePreference {
    fn from(choice: ThemeChoice) -> Self {
        match choice {
            ThemeChoice::Auto => ThemePreference::Auto,
            ThemeChoice::Light => ThemePreference::Light,
            ThemeChoice::Dark => ThemePreference::Dark,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_parsed_schemas: crate::cache::DEFAULT_MAX_PARSED_SCHEMAS,
        }
    }
}

fn parse_env<T: FromStr>(env: &impl EnvProvider, key: &str) -> Result<Option<T>> {
    match env.get(key) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Environment(format!("Invalid {} value: {}", key, value))),
        None => Ok(None),
    }
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: file -> environment -> CLI
    pub async fn load_config(cli: &Cli) -> Result<Config> {
        Self::load_config_with(&SystemEnvProvider, cli).await
    }

    /// [`load_config`](Self::load_config) with a custom environment provider
    pub async fn load_config_with(env: &impl EnvProvider, cli: &Cli) -> Result<Config> {
        let mut config = Config::default();

        if let Some(config_path) = &cli.config {
            let file_config = Self::load_from_file(config_path).await?;
            config = Self::merge_configs(config, file_config);
        } else if let Some(found_config) = Self::find_config_file().await? {
            config = Self::merge_configs(config, found_config);
        }

        config = Self::apply_environment_overrides_with(env, config)?;

        // CLI has the highest precedence
        config = Self::merge_with_cli(config, cli);

        Self::validate_config(&config)?;

        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub async fn load_from_file(path: &Path) -> Result<Config> {
        let content = tokio::fs::read_to_string(path).await?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                // TOML first, then JSON
                if let Ok(config) = toml::from_str::<Config>(&content) {
                    Ok(config)
                } else {
                    Ok(serde_json::from_str(&content)?)
                }
            }
        }
    }

    /// Candidate file names, in lookup order
    pub fn config_file_names() -> [String; 4] {
        [
            format!("{}.toml", CONFIG_NAME),
            format!("{}.json", CONFIG_NAME),
            format!(".{}.toml", CONFIG_NAME),
            format!(".{}.json", CONFIG_NAME),
        ]
    }

    /// Find a configuration file in `dir`
    pub async fn find_config_in(dir: &Path) -> Result<Option<Config>> {
        for name in Self::config_file_names() {
            let path = dir.join(name);
            if tokio::fs::try_exists(&path).await? {
                return Ok(Some(Self::load_from_file(&path).await?));
            }
        }
        Ok(None)
    }

    /// Find configuration file in standard locations
    pub async fn find_config_file() -> Result<Option<Config>> {
        if let Some(config) = Self::find_config_in(Path::new(".")).await? {
            return Ok(Some(config));
        }

        if let Some(config_dir) = dirs::config_dir() {
            return Self::find_config_in(&config_dir.join(CONFIG_NAME)).await;
        }

        Ok(None)
    }

    /// Apply environment variable overrides using the system environment
    pub fn apply_environment_overrides(config: Config) -> Result<Config> {
        Self::apply_environment_overrides_with(&SystemEnvProvider, config)
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> Result<Config> {
        // File settings
        if let Some(instance) = env.get("TRDP_XML_INSTANCE") {
            config.files.instance = Some(PathBuf::from(instance));
        }
        if let Some(schema) = env.get("TRDP_XML_SCHEMA") {
            config.files.schema = Some(PathBuf::from(schema));
        }

        // Editor settings
        if let Some(theme) = parse_env(env, "TRDP_XML_THEME")? {
            config.editor.theme = theme;
        }

        // Cache settings
        if let Some(max) = parse_env(env, "TRDP_XML_MAX_SCHEMAS")? {
            config.cache.max_parsed_schemas = max;
        }

        // Output settings
        if let Some(verbose) = parse_env(env, "TRDP_XML_VERBOSE")? {
            config.output.verbose = verbose;
        }
        if let Some(quiet) = parse_env(env, "TRDP_XML_QUIET")? {
            config.output.quiet = quiet;
        }
        if let Some(format) = env.get("TRDP_XML_FORMAT") {
            config.output.format = match format.to_lowercase().as_str() {
                "human" => OutputFormatConfig::Human,
                "json" => OutputFormatConfig::Json,
                _ => {
                    return Err(ConfigError::Environment(format!(
                        "Invalid TRDP_XML_FORMAT value: {}",
                        format
                    )));
                }
            };
        }

        Ok(config)
    }

    /// Merge CLI arguments with configuration (CLI takes precedence)
    pub fn merge_with_cli(mut config: Config, cli: &Cli) -> Config {
        if let Some(instance) = &cli.instance {
            config.files.instance = Some(instance.clone());
        }
        if let Some(schema) = &cli.schema {
            config.files.schema = Some(schema.clone());
        }

        if let Some(theme) = cli.theme {
            config.editor.theme = theme.into();
        }

        if let Some(max) = cli.max_schemas {
            config.cache.max_parsed_schemas = max;
        }

        if let Some(format) = cli.output_format {
            config.output.format = format.into();
        }
        if cli.verbose {
            config.output.verbose = true;
            config.output.quiet = false;
        }
        if cli.quiet {
            config.output.quiet = true;
            config.output.verbose = false;
        }

        config
    }

    /// Merge two configurations (second takes precedence for set values)
    pub fn merge_configs(mut base: Config, override_config: Config) -> Config {
        if override_config.files.instance.is_some() {
            base.files.instance = override_config.files.instance;
        }
        if override_config.files.schema.is_some() {
            base.files.schema = override_config.files.schema;
        }

        base.editor = override_config.editor;
        base.cache = override_config.cache;
        base.output = override_config.output;

        base
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> Result<()> {
        if config.cache.max_parsed_schemas == 0 {
            return Err(ConfigError::Validation(
                "Schema cache capacity must be greater than 0".to_string(),
            ));
        }

        if config.output.verbose && config.output.quiet {
            return Err(ConfigError::Validation(
                "Cannot enable both verbose and quiet modes".to_string(),
            ));
        }

        Ok(())
    }
}
