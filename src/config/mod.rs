// Configuration module

use std::collections::HashMap;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::spec::TransformSpec;

/// Default cache TTL: 30 days
const DEFAULT_CACHE_TTL_SECONDS: u64 = 3600 * 24 * 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Keystream secret; tokens from other deployments never validate here
    pub secret_key: String,

    /// Named preset → transform string
    #[serde(default = "default_presets")]
    pub presets: HashMap<String, String>,

    /// Output format name → URL extension
    #[serde(default = "default_format_extensions")]
    pub format_extensions: HashMap<String, String>,

    #[serde(default)]
    pub cache: CacheConfig,

    /// Seconds ahead of now for the Expires header the serving layer emits
    #[serde(default = "default_expire_header_seconds")]
    pub expire_header_seconds: u64,

    /// JPEG quality when the spec carries no quality argument
    #[serde(default = "default_jpeg_quality")]
    pub default_jpeg_quality: u8,

    /// Run the PNG optimize pass even without the optimize marker
    #[serde(default)]
    pub default_optimize_png: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    /// Backend name; only "memory" is built in
    #[serde(default = "default_cache_backend")]
    pub backend: String,

    #[serde(default = "default_cache_ttl_seconds")]
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            backend: default_cache_backend(),
            ttl_seconds: default_cache_ttl_seconds(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            presets: default_presets(),
            format_extensions: default_format_extensions(),
            cache: CacheConfig::default(),
            expire_header_seconds: default_expire_header_seconds(),
            default_jpeg_quality: default_jpeg_quality(),
            default_optimize_png: false,
        }
    }
}

fn default_presets() -> HashMap<String, String> {
    HashMap::from([
        ("thumbnail".to_string(), "80x80,C".to_string()),
        ("medium".to_string(), "320x240".to_string()),
    ])
}

fn default_format_extensions() -> HashMap<String, String> {
    HashMap::from([
        ("jpeg".to_string(), "jpg".to_string()),
        ("png".to_string(), "png".to_string()),
    ])
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_backend() -> String {
    "memory".to_string()
}

fn default_cache_ttl_seconds() -> u64 {
    DEFAULT_CACHE_TTL_SECONDS
}

fn default_expire_header_seconds() -> u64 {
    DEFAULT_CACHE_TTL_SECONDS
}

fn default_jpeg_quality() -> u8 {
    60
}

impl Config {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        // First, check that all referenced environment variables exist
        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            std::env::var(var_name).map_err(|_| {
                format!(
                    "Environment variable '{}' is referenced but not set",
                    var_name
                )
            })?;
        }

        // Now perform the substitution (we know all vars exist)
        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap() // Safe because we checked above
        });

        serde_yaml::from_str(&substituted).map_err(|e| e.to_string())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_yaml_with_env(&yaml)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.secret_key.is_empty() {
            return Err("secret_key cannot be empty".to_string());
        }

        if !(1..=100).contains(&self.default_jpeg_quality) {
            return Err(format!(
                "default_jpeg_quality must be 1-100, got {}",
                self.default_jpeg_quality
            ));
        }

        if self.cache.backend != "memory" {
            return Err(format!(
                "Unknown cache backend '{}'; only 'memory' is built in",
                self.cache.backend
            ));
        }

        // A preset that cannot build a spec would fail every request using it
        for (name, text) in &self.presets {
            TransformSpec::from_string(text)
                .map_err(|e| format!("Preset '{}' is not a valid spec: {}", name, e))?;
        }

        Ok(())
    }

    /// Resolve a preset name to its transform string; unknown names are
    /// treated as literal transform strings
    pub fn resolve_preset<'a>(&'a self, name_or_spec: &'a str) -> &'a str {
        match self.presets.get(name_or_spec) {
            Some(text) => text.as_str(),
            None => name_or_spec,
        }
    }
}
