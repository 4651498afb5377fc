//! Content-addressed artifact store.
//!
//! A [`Scope`] is a directory named `{sanitized-hint}-{key}` holding one
//! markdown file per artifact. Scopes nest: module scopes live inside their
//! course scope. The store is the single source of truth for whether a stage
//! has already run.
//!
//! **Failure rules:**
//! - [`ArtifactStore::exists`] is all-or-nothing; a partial scope is a miss.
//! - [`ArtifactStore::read_all`] maps missing files to empty strings.
//! - [`ArtifactStore::read_complete`] is strict and reports `CacheRead`.
//! - [`ArtifactStore::write_all`] reports `CacheWrite`; callers decide whether to
//!   carry on uncached.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use courseforge_shared::{ArtifactSet, CacheKey, CourseForgeError, Result};
use tracing::{debug, warn};

/// Maximum length in bytes of the sanitized part of a scope name.
///
/// Leaves room for `-{key}` under the 255-byte file name limit even when the
/// title is made of multi-byte letters.
pub const MAX_SLUG_BYTES: usize = 80;

/// File extension for every artifact.
const ARTIFACT_EXT: &str = "md";

/// Distinguishes temp files of concurrent writers in one process.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// One store entry: a directory keyed by a sanitized name and a cache key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    dir: PathBuf,
}

impl Scope {
    /// Directory backing this scope.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding artifact `name`.
    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{ARTIFACT_EXT}"))
    }
}

// ---------------------------------------------------------------------------
// ArtifactStore
// ---------------------------------------------------------------------------

/// Local directory tree of content-addressed artifact sets.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Create a store rooted at `root`. Nothing is created until a scope is requested.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Derive (and create) the scope directory for `hint` + `key`.
    ///
    /// With `parent = None` the scope sits directly under the store root;
    /// otherwise it is nested inside `parent`.
    pub fn scope_path(
        &self,
        parent: Option<&Scope>,
        hint: &str,
        fallback: &str,
        key: &CacheKey,
    ) -> Result<Scope> {
        let base = parent.map(Scope::dir).unwrap_or(&self.root);
        let dir = base.join(format!("{}-{key}", sanitize_name(hint, fallback)));
        std::fs::create_dir_all(&dir).map_err(|e| CourseForgeError::io(&dir, e))?;
        debug!(path = %dir.display(), "scope ready");
        Ok(Scope { dir })
    }

    /// True iff every named artifact file exists in `scope`.
    pub fn exists(&self, scope: &Scope, names: &[&str]) -> bool {
        names.iter().all(|name| scope.artifact_path(name).is_file())
    }

    /// Read each named artifact; missing or unreadable files become `""`.
    pub fn read_all(&self, scope: &Scope, names: &[&str]) -> ArtifactSet {
        names
            .iter()
            .map(|name| {
                let content = std::fs::read_to_string(scope.artifact_path(name)).unwrap_or_default();
                (*name, content)
            })
            .collect()
    }

    /// Read each named artifact, failing on the first file that cannot be read.
    ///
    /// Used after [`exists`](Self::exists) has declared a hit, where an empty
    /// string must never stand in for generated output.
    pub fn read_complete(&self, scope: &Scope, names: &[&str]) -> Result<ArtifactSet> {
        let mut set = ArtifactSet::new();
        for name in names {
            let path = scope.artifact_path(name);
            let content =
                std::fs::read_to_string(&path).map_err(|e| CourseForgeError::CacheRead {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
            set.insert(*name, content);
        }
        Ok(set)
    }

    /// Write every artifact in `artifacts` to its own file.
    ///
    /// Each file is replaced atomically (temp file + rename). All artifacts are
    /// attempted even after a failure; the first failure is returned.
    pub fn write_all(&self, scope: &Scope, artifacts: &ArtifactSet) -> Result<()> {
        let mut first_error = None;

        for (name, content) in artifacts.iter() {
            let target = scope.artifact_path(name);
            if let Err(e) = write_atomic(&target, content) {
                warn!(path = %target.display(), error = %e, "artifact write failed");
                if first_error.is_none() {
                    first_error = Some(CourseForgeError::CacheWrite {
                        path: target,
                        message: e.to_string(),
                    });
                }
            } else {
                debug!(file = %name, size = content.len(), "wrote artifact");
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Reduce a title to a filesystem-safe slug.
///
/// Keeps alphanumerics, `-` and `_`; every other char becomes `-`; runs of `-`
/// collapse and leading/trailing `-` are dropped; the result is capped at
/// [`MAX_SLUG_BYTES`] on a char boundary. Returns `fallback` when nothing
/// survives.
pub fn sanitize_name(name: &str, fallback: &str) -> String {
    let replaced: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();

    let collapsed = replaced
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    let mut end = collapsed.len().min(MAX_SLUG_BYTES);
    while !collapsed.is_char_boundary(end) {
        end -= 1;
    }
    let truncated = collapsed[..end].trim_end_matches('-');
    if truncated.is_empty() {
        fallback.to_string()
    } else {
        truncated.to_string()
    }
}

fn write_atomic(target: &Path, content: &str) -> std::io::Result<()> {
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = target.with_file_name(format!(
        ".{file_name}.{}.{}.tmp",
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    std::fs::write(&temp, content)?;
    if let Err(e) = std::fs::rename(&temp, target) {
        let _ = std::fs::remove_file(&temp);
        return Err(e);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
