//! Loader for photopack configuration with YAML + environment overlays.
//!
//! Sources are merged in the order they are added, with `PHOTOPACK__`
//! environment variables applied first and later files winning over earlier
//! ones. Every section has defaults, so an empty configuration is valid:
//!
//! ```yaml
//! version: "1"
//! fetch:
//!   timeout_secs: 15
//!   retries: 1
//!   headers:
//!     referer: "https://listing.example.com/"
//! extract:
//!   mode: auto
//!   address_selector: "h6.addr_title"
//! logging:
//!   format: json
//! ```
//!
//! String values may reference `${VAR}` placeholders, which are expanded
//! (recursively, bounded) before deserialization.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
const ENV_PREFIX: &str = "PHOTOPACK";

/// Desktop Chrome user agent; image CDNs commonly reject default library agents.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";
pub const DEFAULT_ACCEPT: &str = "image/avif,image/webp,image/apng,image/*,*/*;q=0.8";
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "ko-KR,ko;q=0.9,en-US;q=0.8,en;q=0.7";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PhotopackConfig {
    pub version: Option<String>,
    pub fetch: FetchSettings,
    pub extract: ExtractSettings,
    pub logging: LoggingSettings,
}

impl PhotopackConfig {
    /// Reject values that would make a run hang or do nothing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch.timeout_secs == 0 {
            return Err(ConfigError::Message(
                "fetch.timeout_secs must be greater than zero".into(),
            ));
        }
        if self.fetch.connect_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "fetch.connect_timeout_secs must be greater than zero".into(),
            ));
        }
        if self.fetch.concurrency == 0 {
            return Err(ConfigError::Message(
                "fetch.concurrency must be at least 1".into(),
            ));
        }
        for (key, value) in [
            ("extract.address_selector", &self.extract.address_selector),
            ("extract.carousel_selector", &self.extract.carousel_selector),
            ("extract.slide_selector", &self.extract.slide_selector),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Message(format!("{key} must not be empty")));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Extra attempts for network errors, 429 and 5xx responses.
    pub retries: usize,
    /// Maximum in-flight image requests; 1 fetches sequentially.
    pub concurrency: usize,
    pub headers: HeaderSettings,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            connect_timeout_secs: 5,
            retries: 1,
            concurrency: 1,
            headers: HeaderSettings::default(),
        }
    }
}

/// Browser-like request headers sent with every image request.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HeaderSettings {
    pub user_agent: String,
    /// Falls back to the image URL's origin when unset.
    pub referer: Option<String>,
    /// Falls back to the image URL's origin when unset.
    pub origin: Option<String>,
    pub accept: String,
    pub accept_language: String,
}

impl Default for HeaderSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.into(),
            referer: None,
            origin: None,
            accept: DEFAULT_ACCEPT.into(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.into(),
        }
    }
}

/// Which reference strategies run against a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractMode {
    /// Style scan always; slide scan too when a carousel is present.
    #[default]
    Auto,
    Style,
    Slides,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractSettings {
    pub mode: ExtractMode,
    pub address_selector: String,
    pub carousel_selector: String,
    pub slide_selector: String,
}

impl Default for ExtractSettings {
    fn default() -> Self {
        Self {
            mode: ExtractMode::Auto,
            address_selector: "h6.addr_title".into(),
            carousel_selector: ".swiper-wrapper".into(),
            slide_selector: ".swiper-slide".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `text` or `json`.
    pub format: String,
    pub emit_stderr: bool,
    /// Default `EnvFilter` directive; `RUST_LOG` still wins.
    pub filter: String,
    pub dir: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            format: "text".into(),
            emit_stderr: false,
            filter: "info".into(),
            dir: None,
        }
    }
}

/// Expand `${VAR}` in one string until it stops changing, bounded so that
/// self-referencing variables terminate. Unknown variables are left verbatim.
fn expand_str(raw: String) -> String {
    let mut current = raw;
    for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
        let next = match shellexpand::env(&current) {
            Ok(expanded) if expanded != current => expanded.into_owned(),
            _ => break,
        };
        current = next;
    }
    current
}

fn expand_env_in_value(value: &mut Value) {
    match value {
        Value::String(s) if s.contains('$') => *s = expand_str(std::mem::take(s)),
        Value::Array(items) => items.iter_mut().for_each(expand_env_in_value),
        Value::Object(fields) => fields.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Layers YAML files, inline snippets and `PHOTOPACK__` env overrides.
pub struct PhotopackConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for PhotopackConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl PhotopackConfigLoader {
    /// Start with `PHOTOPACK__` env overrides only; everything else defaults.
    ///
    /// ```
    /// use photopack_config::PhotopackConfigLoader;
    ///
    /// let config = PhotopackConfigLoader::new()
    ///     .with_yaml_str("version: '1'")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.version.as_deref(), Some("1"));
    /// assert_eq!(config.fetch.timeout_secs, 15);
    /// assert_eq!(config.extract.address_selector, "h6.addr_title");
    /// ```
    pub fn new() -> Self {
        let builder = Config::builder().add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );
        Self { builder }
    }

    /// Required file; format is inferred from the extension.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Like [`Self::with_file`], but a missing file is not an error.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet over earlier sources.
    ///
    /// ```
    /// use photopack_config::{ExtractMode, PhotopackConfigLoader};
    ///
    /// let cfg = PhotopackConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// extract:
    ///   mode: slides
    ///   carousel_selector: "ul.gallery"
    /// fetch:
    ///   concurrency: 4
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.extract.mode, ExtractMode::Slides);
    /// assert_eq!(cfg.extract.carousel_selector, "ul.gallery");
    /// assert_eq!(cfg.extract.slide_selector, ".swiper-slide");
    /// assert_eq!(cfg.fetch.concurrency, 4);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Merge, expand `${VAR}` placeholders, deserialize and validate.
    pub fn load(self) -> Result<PhotopackConfig, ConfigError> {
        let mut merged: Value = self.builder.build()?.try_deserialize()?;
        expand_env_in_value(&mut merged);
        let config: PhotopackConfig = serde_json::from_value(merged)
            .map_err(|e| ConfigError::Message(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }
}
