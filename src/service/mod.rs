//! Image service: the producer and consumer ends of the token scheme
//!
//! The producer side ([`ImageService::signed_url`]) is what a template helper
//! calls: build a spec, bind it to the resource's current modification time,
//! and emit a `<basename>.<token>.<ext>` path segment. The consumer side
//! ([`ImageService::serve`]) reverses it: decode → decrypt → checksum-verify
//! → unpack → render (through the cache) → return bytes plus the freshness
//! values the HTTP layer needs for conditional GET and expiry headers.

pub mod url;

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use tracing::{debug, warn};

use crate::cache::{self, ImageCache};
use crate::cipher;
use crate::config::Config;
use crate::error::ServiceError;
use crate::pipeline::{self, PipelineConfig};
use crate::resolver::{FileResolver, Resource};
use crate::spec::TransformSpec;

/// A rendered image plus the per-resource values the HTTP layer needs
#[derive(Debug, Clone)]
pub struct ServedImage {
    pub data: Bytes,
    pub content_type: &'static str,
    /// Source modification time (unix seconds), for Last-Modified
    pub mtime: u64,
    /// Source byte size, for conditional-GET evaluation
    pub size: u64,
}

/// Ties the resolver, codec, cipher, cache, and pipeline together
pub struct ImageService {
    config: Config,
    resolver: FileResolver,
    cache: Box<dyn ImageCache>,
}

impl ImageService {
    /// Build a service; fails when the configuration does not validate
    pub fn new(config: Config, resolver: FileResolver) -> Result<Self, ServiceError> {
        config.validate().map_err(ServiceError::Config)?;
        let cache = cache::from_config(&config.cache);
        Ok(Self {
            config,
            resolver,
            cache,
        })
    }

    /// Producer: build the signed path segment for `source` under a preset
    /// name or literal transform string
    pub fn signed_url(&self, source: &str, spec_text: &str) -> Result<String, ServiceError> {
        let basename = source.trim_start_matches('/');
        let resource = self.resolver.resolve(basename)?;
        let spec = TransformSpec::from_string(self.config.resolve_preset(spec_text))?;
        let token = cipher::encode_token(
            spec.encoded(),
            basename,
            resource.mtime,
            self.config.secret_key.as_bytes(),
        );
        let ext = self.extension_for(&spec, basename);
        Ok(url::format_segment(basename, &token, &ext))
    }

    /// Consumer: decode and render a token against its resource
    pub fn serve(&self, basename: &str, token: &str) -> Result<ServedImage, ServiceError> {
        let resource = self.resolver.resolve(basename)?;
        let raw = cipher::decode_token(
            token,
            basename,
            resource.mtime,
            self.config.secret_key.as_bytes(),
        )?;
        let spec = match TransformSpec::from_bytes(&raw) {
            Ok(spec) => spec,
            Err(err) => {
                // Tampered, forged, or stale (resource-changed) token
                warn!(basename = %basename, "rejected token: {}", err);
                return Err(err.into());
            }
        };

        let content_type = content_type_for_ext(&self.extension_for(&spec, basename));
        let key = cache_key(basename, spec.encoded());

        if let Some(hit) = self.cache.get(&key) {
            debug!(key = %key, "serving from cache");
            return Ok(ServedImage {
                data: hit,
                content_type,
                mtime: resource.mtime,
                size: resource.size,
            });
        }

        let data = Bytes::from(self.render(&resource, &spec)?);
        self.cache.set(key, data.clone());

        Ok(ServedImage {
            data,
            content_type,
            mtime: resource.mtime,
            size: resource.size,
        })
    }

    /// Consumer entry point for a full `<basename>.<token>.<ext>` segment
    pub fn serve_segment(&self, segment: &str) -> Result<ServedImage, ServiceError> {
        let parsed = url::parse_segment(segment)
            .ok_or_else(|| ServiceError::Token("path segment does not parse".to_string()))?;
        self.serve(&parsed.basename, &parsed.token)
    }

    fn render(&self, resource: &Resource, spec: &TransformSpec) -> Result<Vec<u8>, ServiceError> {
        let source = self.resolver.read(resource)?;
        let pipeline_config = PipelineConfig {
            jpeg_quality: self.config.default_jpeg_quality,
            optimize_png: self.config.default_optimize_png,
        };
        let rendered = pipeline::process(&source, spec, &pipeline_config)?;
        debug!(
            width = rendered.width,
            height = rendered.height,
            format = rendered.format.as_str(),
            "rendered image"
        );
        Ok(rendered.data)
    }

    /// URL extension for a spec: the configured mapping for its output
    /// format, else the source's own extension
    fn extension_for(&self, spec: &TransformSpec, basename: &str) -> String {
        if let Some(format) = spec.output_format() {
            if let Some(ext) = self.config.format_extensions.get(format.as_str()) {
                return ext.clone();
            }
        }
        Path::new(basename)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_string()
    }

    /// The validated configuration this service runs with
    ///
    /// The serving layer reads `expire_header_seconds` from here when it
    /// builds response headers.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Cache statistics, for operational visibility
    pub fn cache_stats(&self) -> crate::cache::CacheStats {
        self.cache.stats()
    }
}

/// Cache key for one resource + spec combination
///
/// The spec bytes already encode everything the pipeline depends on, so the
/// key is stable across identical requests and distinct across variants.
pub fn cache_key(basename: &str, encoded_spec: &[u8]) -> String {
    format!("{}.{}", basename, STANDARD.encode(encoded_spec))
}

fn content_type_for_ext(ext: &str) -> &'static str {
    match ext {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}
