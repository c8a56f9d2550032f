//! # Buildcontext
//!
//! Change detection for Docker build contexts.
//!
//! This crate provides functionality to:
//! - Parse `.dockerignore` files and match context-relative paths against them
//! - Compute a stable BLAKE3 digest over a build context and its build file
//!
//! The digest only depends on the build file, the ignore rules, and the
//! relative paths, modes and contents of the files that survive them, so it
//! can decide whether an image needs rebuilding without building it.
//!
//! ## Example
//!
//! ```no_run
//! use buildcontext::hash_context;
//! use std::path::Path;
//!
//! let digest = hash_context(Path::new("./app"), Path::new("Dockerfile"))?;
//! println!("context digest: {digest}");
//! # Ok::<(), buildcontext::Error>(())
//! ```

mod digest;
mod error;
mod ignore;

pub use digest::{
    ContextEntry, ContextWalk, DOCKERIGNORE, DOCKERIGNORE_SUFFIX, hash_context,
    ignore_file_candidates, load_ignore_patterns, walk_context,
};
pub use error::{Error, Result};
pub use ignore::{Pattern, PatternMatcher, read_patterns};
