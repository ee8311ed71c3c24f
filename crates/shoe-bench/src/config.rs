use serde::Deserialize;
use shoe_core::engine::{ArrangeConfig, HarvestParams};
use shoe_core::model::deck::Composition;
use shoe_core::model::rank::Rank;
use shoe_core::model::suit::Suit;
use shoe_core::signal::{SignalConfig, SignalRule};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

const MAX_SHOES: usize = 100_000;
const RUN_ID_ALLOWED: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// Root run configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RunConfig {
    pub run_id: String,
    pub shoes: ShoeConfig,
    #[serde(default)]
    pub signal: SignalSection,
    #[serde(default)]
    pub harvest: HarvestParams,
    #[serde(default)]
    pub adjust: AdjustConfig,
    pub outputs: OutputsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RunConfig {
    /// Load configuration from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut cfg: RunConfig =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(cfg)
    }

    /// Validate the configuration without performing I/O.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        validate_run_id(&self.run_id)?;
        self.shoes.validate()?;
        self.signal.validate()?;
        validate_harvest(&self.harvest)?;
        self.outputs.validate(&self.run_id)?;
        self.logging.normalize();
        Ok(())
    }

    /// Resolve output templates (e.g., `{run_id}` placeholders) into concrete paths.
    pub fn resolved_outputs(&self) -> ResolvedOutputs {
        ResolvedOutputs {
            jsonl: resolve_template(&self.run_id, &self.outputs.jsonl),
            summary_md: resolve_template(&self.run_id, &self.outputs.summary_md),
            snapshots_dir: self
                .outputs
                .snapshots_dir
                .as_deref()
                .map(|template| resolve_template(&self.run_id, template)),
        }
    }

    /// Engine settings for every shoe of the run.
    pub fn arrange_config(&self) -> ArrangeConfig {
        ArrangeConfig {
            signal: self.signal.rule(),
            harvest: self.harvest,
            wrap: self.signal.wrap,
            s_forcing: self.adjust.s_forcing,
            t_pairing: self.adjust.t_pairing,
            color_pattern: self.adjust.color_pattern,
        }
    }
}

/// Shoe sampling block.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ShoeConfig {
    pub seed: Option<u64>,
    pub count: usize,
    #[serde(default)]
    pub composition: Composition,
}

impl ShoeConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.count == 0 {
            return Err(ValidationError::InvalidField {
                field: "shoes.count".to_string(),
                message: "number of shoes must be greater than zero".to_string(),
            });
        }

        if self.count > MAX_SHOES {
            return Err(ValidationError::InvalidField {
                field: "shoes.count".to_string(),
                message: format!("at most {MAX_SHOES} shoes per run"),
            });
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Configured,
    #[default]
    RedZero,
}

/// Signal rule selection. `suits` and `ranks` only apply to `configured`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SignalSection {
    #[serde(default)]
    pub rule: RuleKind,
    #[serde(default)]
    pub suits: Vec<String>,
    #[serde(default)]
    pub ranks: Vec<String>,
    #[serde(default)]
    pub wrap: bool,
}

impl SignalSection {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.rule != RuleKind::Configured {
            return Ok(());
        }

        if let Some(bad) = self.suits.iter().find(|s| Suit::from_label(s).is_none()) {
            return Err(ValidationError::InvalidField {
                field: "signal.suits".to_string(),
                message: format!("unknown suit '{bad}'"),
            });
        }

        if let Some(bad) = self.ranks.iter().find(|r| Rank::from_label(r).is_none()) {
            return Err(ValidationError::InvalidField {
                field: "signal.ranks".to_string(),
                message: format!("unknown rank '{bad}'"),
            });
        }

        Ok(())
    }

    pub fn rule(&self) -> SignalRule {
        match self.rule {
            RuleKind::RedZero => SignalRule::RedZero,
            RuleKind::Configured => SignalRule::Configured(SignalConfig::new(
                self.suits.iter().filter_map(|s| Suit::from_label(s)),
                self.ranks.iter().filter_map(|r| Rank::from_label(r)),
            )),
        }
    }
}

/// Toggles for the post-harvest adjustments.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct AdjustConfig {
    #[serde(default = "enabled")]
    pub s_forcing: bool,
    #[serde(default = "enabled")]
    pub t_pairing: bool,
    #[serde(default = "enabled")]
    pub color_pattern: bool,
}

impl Default for AdjustConfig {
    fn default() -> Self {
        Self {
            s_forcing: true,
            t_pairing: true,
            color_pattern: true,
        }
    }
}

fn enabled() -> bool {
    true
}

fn validate_harvest(params: &HarvestParams) -> Result<(), ValidationError> {
    if params.max_attempts == 0 {
        return Err(ValidationError::InvalidField {
            field: "harvest.max_attempts".to_string(),
            message: "at least one idle pass must be allowed".to_string(),
        });
    }
    Ok(())
}

/// Output artifact configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OutputsConfig {
    pub jsonl: String,
    pub summary_md: String,
    /// When set, one snapshot JSON per shoe is written here.
    #[serde(default)]
    pub snapshots_dir: Option<String>,
}

impl OutputsConfig {
    fn validate(&self, run_id: &str) -> Result<(), ValidationError> {
        let optional = self
            .snapshots_dir
            .as_ref()
            .map(|dir| ("outputs.snapshots_dir", dir));
        for (label, value) in [
            ("outputs.jsonl", &self.jsonl),
            ("outputs.summary_md", &self.summary_md),
        ]
        .into_iter()
        .chain(optional)
        {
            if value.trim().is_empty() {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "path must not be empty".to_string(),
                });
            }

            let resolved = resolve_template(run_id, value);
            if resolved.components().count() == 0 {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "resolved path is invalid".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Logging configuration defaults to disabled structured logs.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: default_tracing_level(),
        }
    }
}

impl LoggingConfig {
    fn normalize(&mut self) {
        if self.tracing_level.trim().is_empty() {
            self.tracing_level = default_tracing_level();
        }
    }

    pub fn level(&self) -> Option<Level> {
        match self.tracing_level.to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }
}

fn default_tracing_level() -> String {
    "info".to_string()
}

fn validate_run_id(run_id: &str) -> Result<(), ValidationError> {
    if run_id.trim().is_empty() {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id must not be empty".to_string(),
        });
    }

    if !run_id.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id may only contain alphanumeric characters, '.', '_' or '-'".to_string(),
        });
    }

    Ok(())
}

fn resolve_template(run_id: &str, template: &str) -> PathBuf {
    PathBuf::from(template.replace("{run_id}", run_id))
}

/// Fully resolved output paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub jsonl: PathBuf,
    pub summary_md: PathBuf,
    pub snapshots_dir: Option<PathBuf>,
}

/// Errors surfaced when loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid configuration in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => path.as_path(),
        }
    }
}

/// Validation failures captured with contextual metadata.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}
