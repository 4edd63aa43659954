//! Loader for quizmap configuration with YAML + environment overlays.
//!
//! Sources are merged in the order they are attached, with `QUIZMAP__`
//! environment variables layered on top (`QUIZMAP__RENDER__HIGHLIGHT_COLOR`
//! maps to `render.highlight_color`). String values may reference other
//! environment variables as `${VAR}`; those are expanded after merging.
//! Environment values are kept as text, so `QUIZMAP__RENDER__ROOT_LABEL=007`
//! stays `"007"`; flags accept `true`/`false` spelled as text.
use config::{Config, ConfigError, Environment, File};
use quizmap_common::observability::LogFormat;
use quizmap_common::{QuizmapError, RenderOptions, bool_or_text};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

const MAX_EXPANSION_DEPTH: usize = 8;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct QuizmapConfig {
    pub version: Option<String>,
    pub render: RenderOptions,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

impl QuizmapConfig {
    /// Checks the values the pipeline cannot recover from at render time.
    pub fn validate(&self) -> Result<(), QuizmapError> {
        self.render.validate()?;
        if self.output.filename.trim().is_empty() {
            return Err(QuizmapError::Config("output.filename is empty".into()));
        }
        Ok(())
    }
}

/// Where the finished map is written.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub filename: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            filename: "qc_freeplane.mm".into(),
        }
    }
}

impl OutputConfig {
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.filename)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: Option<PathBuf>,
    pub format: LogFormat,
    #[serde(deserialize_with = "bool_or_text")]
    pub emit_stderr: bool,
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            format: LogFormat::Text,
            emit_stderr: true,
            filter: "info".into(),
        }
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) if s.contains('$') => *s = expand_env_str(s),
        Value::Array(items) => items.iter_mut().for_each(expand_env_in_value),
        Value::Object(map) => map.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Expand `$VAR`/`${VAR}` until the text stops changing, at most
/// `MAX_EXPANSION_DEPTH` rounds. Unknown variables leave the text untouched.
fn expand_env_str(raw: &str) -> String {
    let mut current = raw.to_string();
    for _ in 0..MAX_EXPANSION_DEPTH {
        let Ok(next) = shellexpand::env(&current) else {
            break;
        };
        if next == current {
            break;
        }
        current = next.into_owned();
    }
    current
}

/// Layers config sources; see the module docs for precedence.
pub struct QuizmapConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for QuizmapConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl QuizmapConfigLoader {
    /// Start with defaults overlaid by `QUIZMAP__` env overrides.
    ///
    /// ```
    /// use quizmap_config::QuizmapConfigLoader;
    ///
    /// let config = QuizmapConfigLoader::new()
    ///     .with_yaml_str("version: '1'")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.version.as_deref(), Some("1"));
    /// assert!(config.render.highlight_wrong_answers);
    /// assert_eq!(config.output.filename, "qc_freeplane.mm");
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Required file. The format follows the extension (`.yaml`, `.toml`, `.json`).
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that may be absent, so runs can rely on env vars alone.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Inline YAML, merged like a file.
    ///
    /// ```
    /// use quizmap_common::DocumentVariant;
    /// use quizmap_config::QuizmapConfigLoader;
    ///
    /// let yaml = "render:\n  highlight_color: '#ffe0e0'\n  document_variant: modern-templated\n";
    /// let cfg = QuizmapConfigLoader::new().with_yaml_str(yaml).load().unwrap();
    ///
    /// assert_eq!(cfg.render.highlight_color, "#ffe0e0");
    /// assert_eq!(cfg.render.document_variant, DocumentVariant::ModernTemplated);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Merge everything, `QUIZMAP__` variables last, expand `${VAR}`
    /// placeholders and deserialize.
    pub fn load(self) -> Result<QuizmapConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("QUIZMAP")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let mut merged: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut merged);
        serde_json::from_value(merged).map_err(|e| ConfigError::Message(e.to_string()))
    }
}
