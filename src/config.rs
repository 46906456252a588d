//! Configuration logic for the adapter.
//!
//! This module handles the deserialization of `hexo-adapter.toml` and provides
//! sane defaults for any missing fields. It is split into two sections
//! (`img_cdn` and `output`) so the file stays small and readable.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// File name looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "hexo-adapter.toml";

/// The root configuration schema.
///
/// Read once at startup and handed to [`crate::adapter::Adapter`] by value;
/// nothing mutates it afterwards.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Config {
    /// Image CDN rewriting. Accepts the legacy `imgCdn` key as well.
    #[serde(default, alias = "imgCdn")]
    pub img_cdn: ImgCdnSettings,

    /// Controls how the front matter and the final file are laid out.
    #[serde(default)]
    pub output: OutputSettings,
}

/// Settings for the image CDN rewriter.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ImgCdnSettings {
    /// Whether image URLs are rewritten before any other step runs.
    #[serde(default = "default_bool_false")]
    pub enabled: bool,

    /// Prefix that replaces the scheme and host of a matched image URL
    /// (e.g. "https://img.example.com/blog").
    #[serde(default)]
    pub base_url: String,

    /// Hosts whose images get moved to `base_url`.
    #[serde(default = "default_source_hosts")]
    pub source_hosts: Vec<String>,
}

/// Output layout settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct OutputSettings {
    /// `chrono` format string for every date written to the front matter.
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// UTC offset the dates are rendered in, e.g. "+08:00".
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Post template. `{% matter %}` receives the front matter block and
    /// `{% raw %}` the body.
    #[serde(default = "default_template")]
    pub template: String,
}

impl Default for ImgCdnSettings {
    fn default() -> Self {
        Self {
            enabled: default_bool_false(),
            base_url: String::new(),
            source_hosts: default_source_hosts(),
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            date_format: default_date_format(),
            timezone: default_timezone(),
            template: default_template(),
        }
    }
}

impl Config {
    /// Loads the configuration.
    ///
    /// An explicitly requested file must exist. Without one, the default file
    /// name is tried and its absence simply yields the defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(p) => p,
            None => {
                let p = Path::new(DEFAULT_CONFIG_FILE);
                if !p.exists() {
                    log::debug!("no {DEFAULT_CONFIG_FILE} found, using defaults");
                    return Ok(Self::default());
                }
                p
            }
        };

        let cfg_str = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml(&cfg_str).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_toml(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }
}

// --- Default value providers ---

fn default_bool_false() -> bool { false }
fn default_source_hosts() -> Vec<String> {
    vec!["cdn.nlark.com".to_string(), "cdn.yuque.com".to_string()]
}
fn default_date_format() -> String { "%Y-%m-%d %H:%M:%S".to_string() }
fn default_timezone() -> String { "+08:00".to_string() }
fn default_template() -> String { "---\n\n{% matter %}\n\n{% raw %}".to_string() }
