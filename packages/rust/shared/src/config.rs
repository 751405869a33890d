//! Application configuration for tabledown.
//!
//! User config lives at `~/.tabledown/tabledown.toml`.
//! CLI arguments override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TabledownError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "tabledown.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".tabledown";

// ---------------------------------------------------------------------------
// Config structs (matching tabledown.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Encoding and delimiter sniffing.
    #[serde(default)]
    pub sniff: SniffConfig,

    /// Output document naming.
    #[serde(default)]
    pub output: OutputConfig,
}

/// `[sniff]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SniffConfig {
    /// Leading bytes inspected for encoding detection.
    #[serde(default = "default_encoding_sample_bytes")]
    pub encoding_sample_bytes: usize,

    /// Leading bytes inspected for delimiter detection.
    #[serde(default = "default_delimiter_sample_bytes")]
    pub delimiter_sample_bytes: usize,

    /// Delimiters the statistical sniff may choose from, in preference order.
    #[serde(default = "default_candidate_delimiters")]
    pub candidate_delimiters: Vec<String>,
}

impl Default for SniffConfig {
    fn default() -> Self {
        Self {
            encoding_sample_bytes: default_encoding_sample_bytes(),
            delimiter_sample_bytes: default_delimiter_sample_bytes(),
            candidate_delimiters: default_candidate_delimiters(),
        }
    }
}

fn default_encoding_sample_bytes() -> usize {
    64 * 1024
}
fn default_delimiter_sample_bytes() -> usize {
    4096
}
fn default_candidate_delimiters() -> Vec<String> {
    [",", "\t", ";", "|"].iter().map(|d| d.to_string()).collect()
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Suffix appended to derived filenames.
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Maximum filename length in characters, before the extension.
    #[serde(default = "default_max_filename_len")]
    pub max_filename_len: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            extension: default_extension(),
            max_filename_len: default_max_filename_len(),
        }
    }
}

fn default_extension() -> String {
    ".md".into()
}
fn default_max_filename_len() -> usize {
    120
}

// ---------------------------------------------------------------------------
// Pipeline config (runtime, merged from config + CLI arguments)
// ---------------------------------------------------------------------------

/// Runtime configuration for one conversion run.
///
/// Owned by a single run and dropped when it finishes.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Delimited text file to convert.
    pub input: PathBuf,
    /// Directory receiving one Markdown file per row.
    pub output_dir: PathBuf,
    /// Leading bytes inspected for encoding detection.
    pub encoding_sample_bytes: usize,
    /// Leading bytes inspected for delimiter detection.
    pub delimiter_sample_bytes: usize,
    /// Candidate delimiters as bytes, in preference order.
    pub candidate_delimiters: Vec<u8>,
    /// Document filename rules.
    pub naming: NamingConfig,
}

/// Filename derivation rules shared by every renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingConfig {
    /// Suffix appended unless already present (case-insensitive).
    pub extension: String,
    /// Maximum stem length in characters.
    pub max_len: usize,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self::from(&OutputConfig::default())
    }
}

impl From<&OutputConfig> for NamingConfig {
    fn from(output: &OutputConfig) -> Self {
        Self {
            extension: output.extension.clone(),
            max_len: output.max_filename_len,
        }
    }
}

impl PipelineConfig {
    /// Merge the loaded config with the two run paths, validating as we go.
    pub fn new(
        config: &AppConfig,
        input: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        validate_config(config)?;

        let candidate_delimiters = config
            .sniff
            .candidate_delimiters
            .iter()
            .map(|d| d.as_bytes()[0])
            .collect();

        Ok(Self {
            input: input.into(),
            output_dir: output_dir.into(),
            encoding_sample_bytes: config.sniff.encoding_sample_bytes,
            delimiter_sample_bytes: config.sniff.delimiter_sample_bytes,
            candidate_delimiters,
            naming: NamingConfig::from(&config.output),
        })
    }
}

/// Check the config for values the pipeline cannot work with.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.sniff.encoding_sample_bytes == 0 {
        return Err(TabledownError::config(
            "sniff.encoding_sample_bytes must be greater than zero",
        ));
    }
    if config.sniff.delimiter_sample_bytes == 0 {
        return Err(TabledownError::config(
            "sniff.delimiter_sample_bytes must be greater than zero",
        ));
    }
    if config.sniff.candidate_delimiters.is_empty() {
        return Err(TabledownError::config(
            "sniff.candidate_delimiters must not be empty",
        ));
    }
    for delim in &config.sniff.candidate_delimiters {
        if delim.len() != 1 || !delim.is_ascii() {
            return Err(TabledownError::config(format!(
                "delimiter {delim:?} must be a single ASCII character"
            )));
        }
    }
    if !config.output.extension.starts_with('.') {
        return Err(TabledownError::config(format!(
            "output.extension {:?} must start with '.'",
            config.output.extension
        )));
    }
    if config.output.max_filename_len == 0 {
        return Err(TabledownError::config(
            "output.max_filename_len must be greater than zero",
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.tabledown/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| TabledownError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.tabledown/tabledown.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| TabledownError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        TabledownError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| TabledownError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| TabledownError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| TabledownError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
