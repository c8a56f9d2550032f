//! Stable content digests over a Docker build context
//!
//! The digest covers the build file first, then every non-ignored file in
//! lexical walk order. Each file contributes one record:
//!
//! ```text
//! relative path NUL mode NUL blake3(content) NUL
//! ```
//!
//! and the final digest is the BLAKE3 hash of all records concatenated.
//! Directories contribute nothing on their own. Symlinks are never
//! traversed: a link to a regular file is read through once, any other
//! link contributes its target text.

use crate::error::{Error, Result};
use crate::ignore::PatternMatcher;
use blake3::Hasher;
use std::ffi::OsString;
use std::fs::{self, File, Metadata};
use std::io::{self, ErrorKind};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Ignore file name at the context root
pub const DOCKERIGNORE: &str = ".dockerignore";

/// Suffix of an ignore file colocated with the build file
pub const DOCKERIGNORE_SUFFIX: &str = ".dockerignore";

const SEPARATOR: u8 = 0;

/// Paths of the ignore files that apply to a build, in precedence order
///
/// `<context>/<dockerfile>.dockerignore` wins over `<context>/.dockerignore`.
pub fn ignore_file_candidates(context: &Path, dockerfile: &Path) -> [PathBuf; 2] {
    let mut colocated: OsString = context.join(dockerfile).into_os_string();
    colocated.push(DOCKERIGNORE_SUFFIX);
    [PathBuf::from(colocated), context.join(DOCKERIGNORE)]
}

/// Load the applicable ignore patterns, or an empty set when neither
/// ignore file exists
pub fn load_ignore_patterns(context: &Path, dockerfile: &Path) -> Result<PatternMatcher> {
    for candidate in ignore_file_candidates(context, dockerfile) {
        match fs::read_to_string(&candidate) {
            Ok(contents) => {
                log::debug!("Using ignore file {}", candidate.display());
                return PatternMatcher::parse(&contents);
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => {
                return Err(Error::ReadIgnoreFile {
                    path: candidate,
                    source,
                });
            }
        }
    }
    Ok(PatternMatcher::default())
}

/// Compute the hex digest of a build context
///
/// `dockerfile` is relative to `context`. Any unreadable file or traversal
/// error aborts the computation.
pub fn hash_context(context: &Path, dockerfile: &Path) -> Result<String> {
    if !context.is_dir() {
        return Err(Error::ContextNotFound(context.to_path_buf()));
    }

    let matcher = load_ignore_patterns(context, dockerfile)?;
    let mut hasher = Hasher::new();

    // The build file always participates, even when an ignore pattern
    // names it.
    let build_file = context.join(dockerfile);
    let build_relative = slash_path(dockerfile);
    let meta = fs::metadata(&build_file).map_err(|source| Error::ReadFile {
        path: build_file.clone(),
        source,
    })?;
    write_record(
        &mut hasher,
        &build_relative,
        &mode_string(&meta),
        &hash_file(&build_file)?,
    );

    let mut entries = 1usize;
    for entry in walk_context(context, &matcher) {
        let entry = entry?;
        if entry.excluded || entry.is_dir || entry.relative == build_relative {
            continue;
        }

        let (mode, content) = describe_entry(&entry.path)?;
        write_record(&mut hasher, &entry.relative, &mode, &content);
        entries += 1;
    }

    let digest = hasher.finalize().to_hex().to_string();
    log::debug!(
        "Hashed {} entries in {}: {}",
        entries,
        context.display(),
        digest
    );
    Ok(digest)
}

/// One entry reached while walking a build context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextEntry {
    pub path: PathBuf,
    /// `/`-separated path relative to the context root
    pub relative: String,
    pub is_dir: bool,
    /// Matched by the ignore rules
    pub excluded: bool,
}

/// Sorted walk over a build context that never follows links and never
/// descends into an excluded directory unless a negated pattern could
/// re-include something below it
pub struct ContextWalk<'a> {
    context: PathBuf,
    matcher: &'a PatternMatcher,
    walker: walkdir::IntoIter,
}

/// Walk `context`, reporting every entry reached, excluded or not
pub fn walk_context<'a>(context: &Path, matcher: &'a PatternMatcher) -> ContextWalk<'a> {
    ContextWalk {
        context: context.to_path_buf(),
        matcher,
        walker: WalkDir::new(context)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter(),
    }
}

impl Iterator for ContextWalk<'_> {
    type Item = Result<ContextEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(e.into())),
            };
            if entry.depth() == 0 {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(&self.context)
                .map(slash_path)
                .unwrap_or_else(|_| slash_path(entry.path()));
            let is_dir = entry.file_type().is_dir();
            let excluded = self.matcher.is_excluded(&relative);
            if excluded && is_dir && self.matcher.can_skip_dir(&relative) {
                self.walker.skip_current_dir();
            }

            return Some(Ok(ContextEntry {
                path: entry.into_path(),
                relative,
                is_dir,
                excluded,
            }));
        }
    }
}

/// Mode string and content hash for a non-directory entry
fn describe_entry(path: &Path) -> Result<(String, blake3::Hash)> {
    let meta = fs::symlink_metadata(path).map_err(|source| Error::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;

    if meta.file_type().is_symlink() {
        return match fs::metadata(path) {
            Ok(target) if target.is_file() => Ok((mode_string(&target), hash_file(path)?)),
            Ok(_) => Ok((mode_string(&meta), hash_link(path)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Ok((mode_string(&meta), hash_link(path)?))
            }
            Err(source) => Err(Error::ReadFile {
                path: path.to_path_buf(),
                source,
            }),
        };
    }

    if meta.is_file() {
        return Ok((mode_string(&meta), hash_file(path)?));
    }

    // fifos, sockets and devices are never opened
    Ok((mode_string(&meta), blake3::hash(&[])))
}

fn write_record(hasher: &mut Hasher, relative: &str, mode: &str, content: &blake3::Hash) {
    hasher.update(relative.as_bytes());
    hasher.update(&[SEPARATOR]);
    hasher.update(mode.as_bytes());
    hasher.update(&[SEPARATOR]);
    hasher.update(content.to_hex().as_bytes());
    hasher.update(&[SEPARATOR]);
}

/// Stream a file through BLAKE3
fn hash_file(path: &Path) -> Result<blake3::Hash> {
    let read_err = |source| Error::ReadFile {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(read_err)?;
    let mut hasher = Hasher::new();
    io::copy(&mut file, &mut hasher).map_err(read_err)?;
    Ok(hasher.finalize())
}

fn hash_link(path: &Path) -> Result<blake3::Hash> {
    let target = fs::read_link(path).map_err(|source| Error::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(blake3::hash(target.as_os_str().as_encoded_bytes()))
}

/// Render a relative path with `/` separators regardless of platform
fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(unix)]
fn mode_string(meta: &Metadata) -> String {
    use std::os::unix::fs::PermissionsExt;
    format!("{:o}", meta.permissions().mode())
}

#[cfg(not(unix))]
fn mode_string(meta: &Metadata) -> String {
    if meta.permissions().readonly() {
        "r".to_string()
    } else {
        "rw".to_string()
    }
}
