//! Recursive include substitution.
//!
//! [`Includer`] scans text for directives, fetches each target (from the
//! cache when possible), slices and strips the content as requested, and
//! splices the result back in place of the directive. Fetched content is
//! scanned again according to the origin's [`RecursionPolicy`] and the
//! directive's own override.
//!
//! Recursion is depth-first and tracks the chain of targets being expanded.
//! A target already on the chain is emitted unexpanded unless circular
//! inclusion is allowed, and no chain grows past `max_depth` levels, so every
//! call terminates. It does not bound the total amount of work: with circular
//! inclusion allowed, a file including itself twice doubles the output at
//! every level up to `max_depth`. Keeping such content out, or the depth low,
//! is the caller's job.
//!
//! A slow remote fetch blocks the whole pass until the HTTP timeout fires.

use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};

use encoding_rs::Encoding;
use splice_cache::{ContentCache, ContentCaches, Origin};
use splice_config::{ConfigError, IncludeConfig, RecursionPolicy};
use url::Url;

use crate::encoding::{lookup_encoding, resolve_encoding};
use crate::error::IncludeError;
use crate::fetch::{ContentSource, DefaultSource};
use crate::slice::{LineSlice, strip_indent};
use crate::syntax::{Directive, DirectiveSyntax};

/// Where relative targets are resolved.
#[derive(Debug, Clone)]
enum Base {
    Dir(PathBuf),
    Url(Url),
}

/// State of one recursion level.
struct Frame {
    base: Base,
    depth: usize,
}

/// A directive target after path/URL resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Local(PathBuf),
    Remote(Url),
}

impl Target {
    fn origin(&self) -> Origin {
        match self {
            Self::Local(_) => Origin::Local,
            Self::Remote(_) => Origin::Remote,
        }
    }

    /// Identifier used for caching and cycle detection.
    fn key(&self) -> String {
        match self {
            Self::Local(path) => path.to_string_lossy().into_owned(),
            Self::Remote(url) => {
                let url = url.as_str();
                url.strip_suffix('/').unwrap_or(url).to_owned()
            }
        }
    }
}

/// Lexically normalize a path: drop `.` and fold `..` into its parent.
///
/// Symlinks are not resolved and case is preserved.
fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }
    if normalized.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        normalized
    }
}

/// Include directive processor.
///
/// Configuration is fixed at construction. The two content caches live as
/// long as the engine (or any handle obtained from [`caches`](Self::caches))
/// and persist across documents unless cleared.
///
/// Included content is spliced in verbatim, trailing newline included, unless
/// the directive slices or strips it.
///
/// With `allow_circular_inclusion` enabled, output grows exponentially in
/// `max_depth` for content that includes itself more than once.
///
/// # Example
///
/// ```no_run
/// use splice_config::IncludeConfig;
/// use splice_engine::Includer;
///
/// let includer = Includer::new(IncludeConfig::default())?;
/// let output = includer.process("Intro: {! docs/intro.md !}\n");
/// # Ok::<(), splice_engine::IncludeError>(())
/// ```
pub struct Includer {
    config: IncludeConfig,
    syntax: DirectiveSyntax,
    default_encoding: &'static Encoding,
    caches: ContentCaches,
    source: Box<dyn ContentSource>,
}

impl Includer {
    /// Create an engine reading from the filesystem and over HTTP.
    ///
    /// # Errors
    ///
    /// Returns `IncludeError::Config` if the configuration is invalid or its
    /// default encoding is not supported.
    pub fn new(config: IncludeConfig) -> Result<Self, IncludeError> {
        config.validate()?;
        let default_encoding = lookup_encoding(&config.encoding).ok_or_else(|| {
            ConfigError::Validation(format!("unsupported encoding '{}'", config.encoding))
        })?;
        let syntax = DirectiveSyntax::new(&config)?;
        let source = Box::new(DefaultSource::new(config.remote_timeout()));

        Ok(Self {
            config,
            syntax,
            default_encoding,
            caches: ContentCaches::new(),
            source,
        })
    }

    /// Replace the content source.
    #[must_use]
    pub fn with_source(mut self, source: impl ContentSource + 'static) -> Self {
        self.source = Box::new(source);
        self
    }

    /// Use an existing pair of caches, e.g. one shared with another engine.
    #[must_use]
    pub fn with_caches(mut self, caches: ContentCaches) -> Self {
        self.caches = caches;
        self
    }

    /// The configuration this engine was built with.
    #[must_use]
    pub fn config(&self) -> &IncludeConfig {
        &self.config
    }

    /// Both cache namespaces.
    #[must_use]
    pub fn caches(&self) -> &ContentCaches {
        &self.caches
    }

    /// Live cache of local file content.
    #[must_use]
    pub fn local_cache(&self) -> &ContentCache {
        self.caches.local()
    }

    /// Live cache of remote content.
    #[must_use]
    pub fn remote_cache(&self) -> &ContentCache {
        self.caches.remote()
    }

    /// Empty the local cache.
    pub fn clear_local_cache(&self) {
        self.caches.local().clear();
    }

    /// Empty the remote cache.
    pub fn clear_remote_cache(&self) {
        self.caches.remote().clear();
    }

    /// Process a document given as lines.
    ///
    /// Each input line is scanned on its own; a line whose includes bring in
    /// newlines becomes several output lines. Lines without directives are
    /// returned unchanged. Afterwards the caches configured for post-pass
    /// cleaning are cleared.
    pub fn run<S: AsRef<str>>(&self, lines: &[S]) -> Vec<String> {
        let root = Frame {
            base: Base::Dir(self.config.base_path.clone()),
            depth: 0,
        };

        let mut output = Vec::with_capacity(lines.len());
        for line in lines {
            let mut stack = Vec::new();
            match self.substitute(line.as_ref(), &root, &mut stack) {
                Cow::Borrowed(unchanged) => output.push(unchanged.to_owned()),
                Cow::Owned(changed) => output.extend(changed.split('\n').map(str::to_owned)),
            }
        }

        self.clean_caches();
        output
    }

    /// Process a whole document, preserving a trailing newline.
    pub fn process(&self, document: &str) -> String {
        let lines: Vec<&str> = document.lines().collect();
        let mut output = self.run(&lines).join("\n");
        if document.ends_with('\n') {
            output.push('\n');
        }
        output
    }

    /// Replace every directive in `text`.
    fn substitute<'t>(&self, text: &'t str, frame: &Frame, stack: &mut Vec<String>) -> Cow<'t, str> {
        let mut directives = self.syntax.find_iter(text).peekable();
        if directives.peek().is_none() {
            return Cow::Borrowed(text);
        }

        let mut output = String::with_capacity(text.len());
        let mut last = 0;
        for directive in directives {
            output.push_str(&text[last..directive.span.start]);
            output.push_str(&self.resolve(&directive, frame, stack));
            last = directive.span.end;
        }
        output.push_str(&text[last..]);
        Cow::Owned(output)
    }

    /// Text replacing one directive.
    fn resolve<'t>(
        &self,
        directive: &Directive<'t>,
        frame: &Frame,
        stack: &mut Vec<String>,
    ) -> Cow<'t, str> {
        if directive.escaped {
            return Cow::Borrowed(directive.literal());
        }
        match self.include(directive, frame, stack) {
            Some(text) => Cow::Owned(text),
            None if self.config.truncate_on_failure => Cow::Borrowed(""),
            None => Cow::Borrowed(directive.text),
        }
    }

    /// Fetch, slice and possibly expand a directive's target.
    ///
    /// Returns `None` when the directive cannot be resolved.
    fn include(
        &self,
        directive: &Directive<'_>,
        frame: &Frame,
        stack: &mut Vec<String>,
    ) -> Option<String> {
        if directive.target.is_empty() {
            tracing::warn!(directive = directive.text, "Include directive has no target");
            return None;
        }

        let target = self.resolve_target(directive.target, &frame.base);
        let origin = target.origin();
        if !self.allows(origin) {
            tracing::debug!(%origin, include = directive.target, "Inclusion disabled for origin");
            return None;
        }

        let key = target.key();
        let encoding = resolve_encoding(directive.encoding, self.default_encoding);
        let content = self.fetch(&target, &key, encoding)?;
        let text = self.select(content, directive)?;

        if !self.policy(origin).should_recurse(directive.recurse) {
            return Some(text);
        }
        Some(self.expand(text, &target, key, frame, stack))
    }

    /// Resolve a raw target against the current base.
    fn resolve_target(&self, raw: &str, base: &Base) -> Target {
        if let Ok(url) = Url::parse(raw)
            && url.has_host()
        {
            return Target::Remote(url);
        }

        let expanded = shellexpand::tilde(raw);
        let path = Path::new(expanded.as_ref());
        if path.is_absolute() {
            return Target::Local(normalize_path(path));
        }

        match base {
            Base::Dir(dir) => Target::Local(normalize_path(&dir.join(path))),
            Base::Url(parent) => match parent.join(raw) {
                Ok(url) => Target::Remote(url),
                Err(_) => Target::Local(normalize_path(&self.config.base_path.join(path))),
            },
        }
    }

    /// Content of `target`, from the cache when enabled.
    fn fetch(&self, target: &Target, key: &str, encoding: &'static Encoding) -> Option<String> {
        let origin = target.origin();
        let use_cache = self.caching(origin);
        let cache = self.caches.namespace(origin);

        if use_cache && let Some(text) = cache.get(key) {
            tracing::debug!(%origin, include = key, "Include served from cache");
            return Some(text);
        }

        let fetched = match target {
            Target::Local(path) => self.source.fetch_local(path, encoding),
            Target::Remote(url) => self.source.fetch_remote(url, encoding),
        };

        match fetched {
            Ok(text) => {
                if use_cache {
                    cache.put(key, text.clone());
                }
                Some(text)
            }
            Err(e) => {
                tracing::warn!(%origin, error = %e, "Failed to include");
                None
            }
        }
    }

    /// Apply the directive's slice and indent stripping.
    ///
    /// Content without either is returned untouched.
    fn select(&self, content: String, directive: &Directive<'_>) -> Option<String> {
        if directive.slice.is_none() && !directive.strip_indent {
            return Some(content);
        }

        let lines: Vec<&str> = content.lines().collect();
        let mut selected = match directive.slice {
            Some(spec) => match LineSlice::parse(spec) {
                Ok(slice) => slice.apply(&lines, &self.config.line_slice_separator),
                Err(e) => {
                    tracing::warn!(directive = directive.text, error = %e, "Invalid line slice");
                    return None;
                }
            },
            None => lines.iter().map(|&line| line.to_owned()).collect(),
        };

        if directive.strip_indent {
            selected = strip_indent(selected);
        }
        Some(selected.join("\n"))
    }

    /// Substitute directives inside fetched text one level deeper.
    fn expand(
        &self,
        text: String,
        target: &Target,
        key: String,
        frame: &Frame,
        stack: &mut Vec<String>,
    ) -> String {
        if !self.config.allow_circular_inclusion && stack.contains(&key) {
            tracing::warn!(include = %key, "Circular inclusion, content left unexpanded");
            return text;
        }
        if frame.depth >= self.config.max_depth {
            tracing::warn!(
                include = %key,
                max_depth = self.config.max_depth,
                "Include depth exceeded, content left unexpanded"
            );
            return text;
        }

        let child = Frame {
            base: self.child_base(target),
            depth: frame.depth + 1,
        };

        stack.push(key);
        let expanded = match self.substitute(&text, &child, stack) {
            Cow::Owned(expanded) => Some(expanded),
            Cow::Borrowed(_) => None,
        };
        stack.pop();

        expanded.unwrap_or(text)
    }

    /// Base for targets found inside `target`'s content.
    fn child_base(&self, target: &Target) -> Base {
        if !self.config.recursive_relative_path {
            return Base::Dir(self.config.base_path.clone());
        }
        match target {
            Target::Local(path) => Base::Dir(
                path.parent()
                    .map_or_else(|| PathBuf::from("."), Path::to_path_buf),
            ),
            Target::Remote(url) => Base::Url(url.clone()),
        }
    }

    fn allows(&self, origin: Origin) -> bool {
        match origin {
            Origin::Local => self.config.allow_local,
            Origin::Remote => self.config.allow_remote,
        }
    }

    fn policy(&self, origin: Origin) -> RecursionPolicy {
        match origin {
            Origin::Local => self.config.recurs_local,
            Origin::Remote => self.config.recurs_remote,
        }
    }

    fn caching(&self, origin: Origin) -> bool {
        match origin {
            Origin::Local => self.config.content_cache_local,
            Origin::Remote => self.config.content_cache_remote,
        }
    }

    /// Post-pass cache cleaning.
    fn clean_caches(&self) {
        if self.config.content_cache_clean_local {
            self.clear_local_cache();
        }
        if self.config.content_cache_clean_remote {
            self.clear_remote_cache();
        }
    }
}
