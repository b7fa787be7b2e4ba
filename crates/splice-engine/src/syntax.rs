//! Include directive grammar.
//!
//! With the default tokens a directive looks like:
//!
//! ```text
//! {! path !}                      include path
//! {! path | latin1 !}             include with an explicit encoding
//! {!+ path !}  {!- path !}        force recursion on / off
//! {!< path [ln:3-8] !}            strip common indent of lines 3 to 8
//! \{! path !}                     literal, never resolved
//! ```
//!
//! All tokens come from [`IncludeConfig`] and are matched literally. The
//! grammar is compiled once into a [`DirectiveSyntax`]; interpreting the
//! slice spec is left to [`LineSlice`](crate::LineSlice).

use std::ops::Range;

use regex::{Captures, Regex};
use splice_config::IncludeConfig;

use crate::consts::{ESCAPE_MARKER, SLICE_PREFIX};

/// One directive found in a piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive<'t> {
    /// Byte range of the whole match, escape marker included.
    pub span: Range<usize>,
    /// The matched text.
    pub text: &'t str,
    /// Preceded by the escape marker.
    pub escaped: bool,
    /// Explicit recursion override: `Some(true)` on, `Some(false)` off.
    pub recurse: Option<bool>,
    /// Strip common indentation from the included lines.
    pub strip_indent: bool,
    /// Path or URL, whitespace-trimmed. May be empty.
    pub target: &'t str,
    /// Slice spec including its `ln:` prefix.
    pub slice: Option<&'t str>,
    /// Encoding override, whitespace-trimmed.
    pub encoding: Option<&'t str>,
}

impl<'t> Directive<'t> {
    /// Text to emit for an escaped directive: the match minus one escape marker.
    #[must_use]
    pub fn literal(&self) -> &'t str {
        if self.escaped {
            &self.text[ESCAPE_MARKER.len()..]
        } else {
            self.text
        }
    }
}

/// Compiled matcher for include directives.
#[derive(Debug, Clone)]
pub struct DirectiveSyntax {
    pattern: Regex,
}

impl DirectiveSyntax {
    /// Compile the grammar from the configured tokens.
    pub fn new(config: &IncludeConfig) -> Result<Self, regex::Error> {
        let pattern = format!(
            concat!(
                r"(?P<escape>{escape})?",
                r"{left}(?:(?P<on>{on})|(?P<off>{off}))?(?P<strip>{strip})?",
                r"[ \t]*(?P<target>.+?)[ \t]*",
                r"(?:\[(?P<slice>{slice}[^\]]*)\][ \t]*)?",
                r"(?:{delim}[ \t]*(?P<encoding>.+?)[ \t]*)?",
                r"{right}"
            ),
            escape = regex::escape(ESCAPE_MARKER),
            left = regex::escape(&config.syntax_left),
            on = regex::escape(&config.syntax_recurs_on),
            off = regex::escape(&config.syntax_recurs_off),
            strip = regex::escape(&config.syntax_strip_indent),
            slice = regex::escape(SLICE_PREFIX),
            delim = regex::escape(&config.syntax_delim),
            right = regex::escape(&config.syntax_right),
        );
        Ok(Self {
            pattern: Regex::new(&pattern)?,
        })
    }

    /// Iterate over non-overlapping directives in `text`, left to right.
    ///
    /// Directives never span a newline, so multi-line text behaves like its
    /// lines scanned one after another.
    pub fn find_iter<'t>(&self, text: &'t str) -> impl Iterator<Item = Directive<'t>> {
        self.pattern
            .captures_iter(text)
            .filter_map(|caps| directive_from(&caps))
    }
}

fn directive_from<'t>(caps: &Captures<'t>) -> Option<Directive<'t>> {
    let whole = caps.get(0)?;
    let recurse = if caps.name("on").is_some() {
        Some(true)
    } else if caps.name("off").is_some() {
        Some(false)
    } else {
        None
    };

    Some(Directive {
        span: whole.range(),
        text: whole.as_str(),
        escaped: caps.name("escape").is_some(),
        recurse,
        strip_indent: caps.name("strip").is_some(),
        target: caps.name("target").map_or("", |m| m.as_str().trim()),
        slice: caps.name("slice").map(|m| m.as_str().trim()),
        encoding: caps.name("encoding").map(|m| m.as_str().trim()),
    })
}
