//! Resource resolver
//!
//! Maps a URL basename onto the filesystem and exposes the two values the
//! rest of the system needs per resource: byte size and modification time.
//! The modification time doubles as the token freshness value — touching a
//! file invalidates every token issued for it.

use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;

use tracing::debug;

/// Resolver failures
#[derive(Debug)]
pub enum ResolveError {
    /// No configured root contains the basename
    NotFound { basename: String },
    /// The file exists but could not be read
    Io(std::io::Error),
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::NotFound { basename } => {
                write!(f, "resource '{}' not found", basename)
            }
            ResolveError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResolveError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ResolveError {
    fn from(err: std::io::Error) -> Self {
        ResolveError::Io(err)
    }
}

/// A resolved resource: where it lives and how fresh it is
#[derive(Debug, Clone)]
pub struct Resource {
    pub path: PathBuf,
    /// Byte size, for conditional-GET handling upstream
    pub size: u64,
    /// Modification time in unix seconds — the token freshness value
    pub mtime: u64,
}

/// Resolves basenames against an ordered list of document roots
#[derive(Debug, Clone)]
pub struct FileResolver {
    roots: Vec<PathBuf>,
}

impl FileResolver {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    /// Find `basename` under the first root that contains it
    pub fn resolve(&self, basename: &str) -> Result<Resource, ResolveError> {
        let clean = basename.trim_start_matches('/');

        // A basename comes from the URL; never let it climb out of a root
        if Path::new(clean)
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(ResolveError::NotFound {
                basename: basename.to_string(),
            });
        }

        for root in &self.roots {
            let candidate = root.join(clean);
            let metadata = match fs::metadata(&candidate) {
                Ok(metadata) if metadata.is_file() => metadata,
                _ => continue,
            };

            let mtime = metadata
                .modified()?
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0);

            debug!(basename = %clean, path = %candidate.display(), "resolved resource");
            return Ok(Resource {
                path: candidate,
                size: metadata.len(),
                mtime,
            });
        }

        Err(ResolveError::NotFound {
            basename: basename.to_string(),
        })
    }

    /// Read a resolved resource's bytes
    pub fn read(&self, resource: &Resource) -> Result<Vec<u8>, ResolveError> {
        Ok(fs::read(&resource.path)?)
    }
}
