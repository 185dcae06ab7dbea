//! Configuration primitives and loader for the dashboard assembler.
//!
//! The loader resolves configuration using a precedence stack:
//! override flag → working directory → git root → built-in defaults.
//! Parsed settings are normalised into typed structures so the CLI and core
//! crates never touch raw TOML. Relative paths resolve against the file that
//! supplied them; built-in defaults resolve against the working directory.

use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

const CONFIG_FILE_NAME: &str = ".dashboard-assemble.toml";

const DEFAULT_MARKER: &str = "// [PART A: DATA INJECTION]";
const DEFAULT_SHELL: &str = "assets/dashboard_shell.html";
const DEFAULT_ENGINE: &str = "assets/dashboard_engine.txt";
const DEFAULT_OUTPUT: &str = "dashboard.html";
const DEFAULT_BANK_RULES: &str = "rules/bankRules.json";
const DEFAULT_INDENT: usize = 8;
const MAX_INDENT: usize = 32;

const DEFAULT_REQUIRED: &[&str] = &[
    "auditedYearsDetected",
    "historicalData",
    "companyFacilities",
    "directorFacilities",
];
const DEFAULT_NON_EMPTY: &[&str] = &["auditedYearsDetected"];

/// Complete configuration resolved from defaults and on-disk overrides.
#[derive(Clone, Debug)]
pub struct Config {
    pub assets: AssetSettings,
    pub inject: InjectSettings,
    pub output: OutputSettings,
    pub payload: PayloadSettings,
    pub sources: ConfigSources,
}

/// Locations of the immutable shell and engine assets.
#[derive(Clone, Debug)]
pub struct AssetSettings {
    pub shell: PathBuf,
    pub engine: PathBuf,
}

/// Settings that govern the injection block.
#[derive(Clone, Debug)]
pub struct InjectSettings {
    pub marker: String,
    pub indent: usize,
    pub keep_suffix: bool,
}

/// Output location and backup behaviour.
#[derive(Clone, Debug)]
pub struct OutputSettings {
    pub file: PathBuf,
    pub backup: bool,
}

/// Payload checks plus the optional fallback bank-rules document.
#[derive(Clone, Debug)]
pub struct PayloadSettings {
    pub required: Vec<String>,
    pub non_empty: Vec<String>,
    pub bank_rules: Option<PathBuf>,
}

/// Provenance information for resolved configuration.
#[derive(Clone, Debug)]
pub struct ConfigSources {
    pub working_directory: PathBuf,
    pub layers: Vec<ConfigSource>,
}

/// Specific layer of configuration (default/git/local/override).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConfigSource {
    pub kind: ConfigSourceKind,
    pub path: Option<PathBuf>,
    pub base_dir: PathBuf,
}

impl ConfigSource {
    fn default(base_dir: PathBuf) -> Self {
        ConfigSource {
            kind: ConfigSourceKind::Default,
            path: None,
            base_dir,
        }
    }

    fn for_file(kind: ConfigSourceKind, path: PathBuf) -> Self {
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        ConfigSource {
            kind,
            path: Some(path),
            base_dir,
        }
    }

    fn describe(&self) -> String {
        match (&self.kind, &self.path) {
            (ConfigSourceKind::Default, _) => "built-in defaults".to_owned(),
            (kind, Some(path)) => format!("{} at {}", kind, path.display()),
            (kind, None) => kind.to_string(),
        }
    }
}

/// Kinds of configuration sources, ordered from lowest to highest precedence.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConfigSourceKind {
    Default,
    GitRoot,
    Local,
    Override,
}

impl fmt::Display for ConfigSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConfigSourceKind::Default => "defaults",
            ConfigSourceKind::GitRoot => "git-root config",
            ConfigSourceKind::Local => "local config",
            ConfigSourceKind::Override => "override config",
        };
        f.write_str(label)
    }
}

/// Loader options, typically supplied by the CLI layer.
#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub override_path: Option<PathBuf>,
    pub working_dir: Option<PathBuf>,
}

impl LoadOptions {
    pub fn with_override_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.override_path = Some(path.into());
        self
    }

    pub fn with_working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(path.into());
        self
    }
}

/// Errors surfaced while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to resolve working directory {attempted}: {source}")]
    WorkingDirectory {
        attempted: PathBuf,
        source: io::Error,
    },
    #[error("override config {path} not found")]
    OverrideNotFound { path: PathBuf },
    #[error("failed to read config {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("configuration validation failed:\n{0}")]
    Validation(ConfigValidationErrors),
}

impl Config {
    /// Loads configuration using the precedence rules and returns typed
    /// settings.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let working_dir = resolve_working_dir(options.working_dir)?;
        let override_path = options
            .override_path
            .map(|path| make_absolute(&path, &working_dir));

        if let Some(path) = &override_path {
            if !path.exists() {
                return Err(ConfigError::OverrideNotFound { path: path.clone() });
            }
        }

        let default_source = ConfigSource::default(working_dir.clone());
        let mut merged = defaults_layer(default_source.clone());
        let mut source_layers = vec![default_source];

        let git_root = find_git_root(&working_dir);
        let git_config_path = git_root.as_ref().map(|root| root.join(CONFIG_FILE_NAME));
        let local_config_path = working_dir.join(CONFIG_FILE_NAME);

        if let Some(path) = git_config_path.as_ref() {
            if path.exists() && Some(path) != override_path.as_ref() && path != &local_config_path {
                let source = ConfigSource::for_file(ConfigSourceKind::GitRoot, path.clone());
                merged.merge(load_layer(path, source.clone())?);
                source_layers.push(source);
            }
        }

        if local_config_path.exists() && Some(&local_config_path) != override_path.as_ref() {
            let source = ConfigSource::for_file(ConfigSourceKind::Local, local_config_path.clone());
            merged.merge(load_layer(&local_config_path, source.clone())?);
            source_layers.push(source);
        }

        if let Some(path) = override_path {
            let source = ConfigSource::for_file(ConfigSourceKind::Override, path.clone());
            merged.merge(load_layer(&path, source.clone())?);
            source_layers.push(source);
        }

        let resolved = merged.finalize().map_err(ConfigError::Validation)?;
        Ok(Config {
            assets: resolved.assets,
            inject: resolved.inject,
            output: resolved.output,
            payload: resolved.payload,
            sources: ConfigSources {
                working_directory: working_dir,
                layers: source_layers,
            },
        })
    }
}

fn resolve_working_dir(override_dir: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
    match override_dir {
        Some(path) => fs::canonicalize(&path).map_err(|source| ConfigError::WorkingDirectory {
            attempted: path,
            source,
        }),
        None => env::current_dir().map_err(|source| ConfigError::WorkingDirectory {
            attempted: PathBuf::from("."),
            source,
        }),
    }
}

fn make_absolute(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn load_layer(path: &Path, source: ConfigSource) -> Result<PartialConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.into(),
        source,
    })?;
    let raw: RawConfig = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.into(),
        source,
    })?;
    Ok(raw.into_partial(source))
}

fn defaults_layer(source: ConfigSource) -> PartialConfig {
    PartialConfig {
        assets: AssetsPartial {
            shell: Some(Located::new(PathBuf::from(DEFAULT_SHELL), source.clone())),
            engine: Some(Located::new(PathBuf::from(DEFAULT_ENGINE), source.clone())),
        },
        inject: InjectPartial {
            marker: Some(Located::new(DEFAULT_MARKER.to_string(), source.clone())),
            indent: Some(Located::new(DEFAULT_INDENT, source.clone())),
            keep_suffix: Some(Located::new(false, source.clone())),
        },
        output: OutputPartial {
            file: Some(Located::new(PathBuf::from(DEFAULT_OUTPUT), source.clone())),
            backup: Some(Located::new(true, source.clone())),
        },
        payload: PayloadPartial {
            required: Some(Located::new(
                DEFAULT_REQUIRED.iter().map(|key| key.to_string()).collect(),
                source.clone(),
            )),
            non_empty: Some(Located::new(
                DEFAULT_NON_EMPTY.iter().map(|key| key.to_string()).collect(),
                source.clone(),
            )),
            bank_rules: Some(Located::new(
                Some(PathBuf::from(DEFAULT_BANK_RULES)),
                source,
            )),
        },
    }
}

fn find_git_root(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        if dir.join(".git").exists() {
            return Some(dir.to_path_buf());
        }
        current = dir.parent();
    }
    None
}

#[derive(Clone, Debug)]
struct Located<T> {
    value: T,
    source: ConfigSource,
}

impl<T> Located<T> {
    fn new(value: T, source: ConfigSource) -> Self {
        Located { value, source }
    }
}

#[derive(Clone, Debug, Default)]
struct PartialConfig {
    assets: AssetsPartial,
    inject: InjectPartial,
    output: OutputPartial,
    payload: PayloadPartial,
}

impl PartialConfig {
    fn merge(&mut self, other: PartialConfig) {
        self.assets.merge(other.assets);
        self.inject.merge(other.inject);
        self.output.merge(other.output);
        self.payload.merge(other.payload);
    }

    fn finalize(self) -> Result<ResolvedConfig, ConfigValidationErrors> {
        let mut errors = Vec::new();

        let shell = self.assets.shell.expect("defaults always set assets.shell");
        let engine = self
            .assets
            .engine
            .expect("defaults always set assets.engine");

        let marker = self.inject.marker.expect("defaults always set marker");
        if marker.value.trim().is_empty() {
            errors.push(ConfigValidationError::new(
                Some(marker.source.clone()),
                "inject.marker cannot be empty".into(),
            ));
        }

        let indent = self.inject.indent.expect("defaults always set indent");
        if indent.value > MAX_INDENT {
            errors.push(ConfigValidationError::new(
                Some(indent.source.clone()),
                format!(
                    "inject.indent must be at most {MAX_INDENT} (received {})",
                    indent.value
                ),
            ));
        }

        let keep_suffix = self
            .inject
            .keep_suffix
            .expect("defaults always set keep_suffix");

        let output_file = self.output.file.expect("defaults always set output.file");
        let backup = self.output.backup.expect("defaults always set backup");

        let required = self
            .payload
            .required
            .expect("defaults always set payload.required");
        check_key_list(&required, "payload.required", &mut errors);

        let non_empty = self
            .payload
            .non_empty
            .expect("defaults always set payload.non_empty");
        check_key_list(&non_empty, "payload.non_empty", &mut errors);

        let bank_rules = self
            .payload
            .bank_rules
            .expect("defaults always set payload.bank_rules");

        if !errors.is_empty() {
            return Err(ConfigValidationErrors(errors));
        }

        Ok(ResolvedConfig {
            assets: AssetSettings {
                shell: resolve_path(&shell),
                engine: resolve_path(&engine),
            },
            inject: InjectSettings {
                marker: marker.value,
                indent: indent.value,
                keep_suffix: keep_suffix.value,
            },
            output: OutputSettings {
                file: resolve_path(&output_file),
                backup: backup.value,
            },
            payload: PayloadSettings {
                required: required.value,
                non_empty: non_empty.value,
                bank_rules: bank_rules
                    .value
                    .as_ref()
                    .map(|path| make_absolute(path, &bank_rules.source.base_dir)),
            },
        })
    }
}

#[derive(Clone, Debug, Default)]
struct AssetsPartial {
    shell: Option<Located<PathBuf>>,
    engine: Option<Located<PathBuf>>,
}

impl AssetsPartial {
    fn merge(&mut self, other: AssetsPartial) {
        if other.shell.is_some() {
            self.shell = other.shell;
        }
        if other.engine.is_some() {
            self.engine = other.engine;
        }
    }
}

#[derive(Clone, Debug, Default)]
struct InjectPartial {
    marker: Option<Located<String>>,
    indent: Option<Located<usize>>,
    keep_suffix: Option<Located<bool>>,
}

impl InjectPartial {
    fn merge(&mut self, other: InjectPartial) {
        if other.marker.is_some() {
            self.marker = other.marker;
        }
        if other.indent.is_some() {
            self.indent = other.indent;
        }
        if other.keep_suffix.is_some() {
            self.keep_suffix = other.keep_suffix;
        }
    }
}

#[derive(Clone, Debug, Default)]
struct OutputPartial {
    file: Option<Located<PathBuf>>,
    backup: Option<Located<bool>>,
}

impl OutputPartial {
    fn merge(&mut self, other: OutputPartial) {
        if other.file.is_some() {
            self.file = other.file;
        }
        if other.backup.is_some() {
            self.backup = other.backup;
        }
    }
}

#[derive(Clone, Debug, Default)]
struct PayloadPartial {
    required: Option<Located<Vec<String>>>,
    non_empty: Option<Located<Vec<String>>>,
    bank_rules: Option<Located<Option<PathBuf>>>,
}

impl PayloadPartial {
    fn merge(&mut self, other: PayloadPartial) {
        if other.required.is_some() {
            self.required = other.required;
        }
        if other.non_empty.is_some() {
            self.non_empty = other.non_empty;
        }
        if other.bank_rules.is_some() {
            self.bank_rules = other.bank_rules;
        }
    }
}

#[derive(Clone, Debug)]
struct ResolvedConfig {
    assets: AssetSettings,
    inject: InjectSettings,
    output: OutputSettings,
    payload: PayloadSettings,
}

fn resolve_path(located: &Located<PathBuf>) -> PathBuf {
    make_absolute(&located.value, &located.source.base_dir)
}

fn check_key_list(
    located: &Located<Vec<String>>,
    context: &str,
    errors: &mut Vec<ConfigValidationError>,
) {
    for key in &located.value {
        if key.trim().is_empty() {
            errors.push(ConfigValidationError::new(
                Some(located.source.clone()),
                format!("{context} entries cannot be blank"),
            ));
        }
    }
}

/// Container for validation failures, formatted as a bullet list.
#[derive(Debug)]
pub struct ConfigValidationErrors(pub Vec<ConfigValidationError>);

impl fmt::Display for ConfigValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, err) in self.0.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "- {err}")?;
        }
        Ok(())
    }
}

impl ConfigValidationErrors {
    pub fn iter(&self) -> impl Iterator<Item = &ConfigValidationError> {
        self.0.iter()
    }
}

/// Validation failure with optional provenance.
#[derive(Clone, Debug)]
pub struct ConfigValidationError {
    pub source: Option<ConfigSource>,
    pub message: String,
}

impl ConfigValidationError {
    fn new(source: Option<ConfigSource>, message: String) -> Self {
        ConfigValidationError { source, message }
    }
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(source) = &self.source {
            write!(f, " ({})", source.describe())?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    assets: Option<RawAssets>,
    #[serde(default)]
    inject: Option<RawInject>,
    #[serde(default)]
    output: Option<RawOutput>,
    #[serde(default)]
    payload: Option<RawPayload>,
}

impl RawConfig {
    fn into_partial(self, source: ConfigSource) -> PartialConfig {
        PartialConfig {
            assets: self
                .assets
                .map(|assets| assets.into_partial(source.clone()))
                .unwrap_or_default(),
            inject: self
                .inject
                .map(|inject| inject.into_partial(source.clone()))
                .unwrap_or_default(),
            output: self
                .output
                .map(|output| output.into_partial(source.clone()))
                .unwrap_or_default(),
            payload: self
                .payload
                .map(|payload| payload.into_partial(source))
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawAssets {
    #[serde(default)]
    shell: Option<PathBuf>,
    #[serde(default)]
    engine: Option<PathBuf>,
}

impl RawAssets {
    fn into_partial(self, source: ConfigSource) -> AssetsPartial {
        AssetsPartial {
            shell: self.shell.map(|value| Located::new(value, source.clone())),
            engine: self.engine.map(|value| Located::new(value, source)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawInject {
    #[serde(default)]
    marker: Option<String>,
    #[serde(default)]
    indent: Option<usize>,
    #[serde(default)]
    keep_suffix: Option<bool>,
}

impl RawInject {
    fn into_partial(self, source: ConfigSource) -> InjectPartial {
        InjectPartial {
            marker: self.marker.map(|value| Located::new(value, source.clone())),
            indent: self.indent.map(|value| Located::new(value, source.clone())),
            keep_suffix: self
                .keep_suffix
                .map(|value| Located::new(value, source)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawOutput {
    #[serde(default)]
    file: Option<PathBuf>,
    #[serde(default)]
    backup: Option<bool>,
}

impl RawOutput {
    fn into_partial(self, source: ConfigSource) -> OutputPartial {
        OutputPartial {
            file: self.file.map(|value| Located::new(value, source.clone())),
            backup: self.backup.map(|value| Located::new(value, source)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawPayload {
    #[serde(default)]
    required: Option<Vec<String>>,
    #[serde(default)]
    non_empty: Option<Vec<String>>,
    #[serde(default)]
    bank_rules: Option<PathBuf>,
}

impl RawPayload {
    fn into_partial(self, source: ConfigSource) -> PayloadPartial {
        PayloadPartial {
            required: self
                .required
                .map(|value| Located::new(value, source.clone())),
            non_empty: self
                .non_empty
                .map(|value| Located::new(value, source.clone())),
            bank_rules: self
                .bank_rules
                .map(|value| Located::new(Some(value), source)),
        }
    }
}
