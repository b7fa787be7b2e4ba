//! Include directive substitution for text documents.
//!
//! This crate replaces directives such as `{! docs/intro.md !}` with the
//! content of local files or remote URLs:
//! - [`Includer`] drives the substitution, including recursion into fetched
//!   content, cycle detection and per-origin caching
//! - [`DirectiveSyntax`] recognizes directives built from configurable tokens
//! - [`LineSlice`] and [`strip_indent`] select and reshape included lines
//! - [`ContentSource`] abstracts reading files and downloading URLs
//!
//! # Example
//!
//! ```no_run
//! use splice_config::IncludeConfig;
//! use splice_engine::Includer;
//!
//! let includer = Includer::new(IncludeConfig::default())?;
//! let lines = includer.run(&["# Guide", "{! docs/intro.md [ln:1-10] !}"]);
//! # Ok::<(), splice_engine::IncludeError>(())
//! ```
//!
//! # Features
//!
//! - `mock`: exposes [`MockSource`], an in-memory content source for tests

mod consts;
mod encoding;
mod engine;
mod error;
mod fetch;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod slice;
mod syntax;

pub use encoding::{encoding_exists, lookup_encoding};
pub use engine::Includer;
pub use error::IncludeError;
pub use fetch::{ContentSource, DefaultSource, FetchError};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockSource;
pub use slice::{LineSlice, SliceError, strip_indent};
pub use splice_cache::{ContentCache, ContentCaches, Origin};
pub use splice_config::{ConfigError, IncludeConfig, RecursionPolicy};
pub use syntax::{Directive, DirectiveSyntax};
