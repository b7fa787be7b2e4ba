//! Line slicing of included content.
//!
//! A slice spec selects parts of the fetched text:
//!
//! ```text
//! ln:2-4              lines 2 to 4
//! ln:6-8,1-2          lines 6 to 8, then lines 1 to 2
//! ln:1.2-2.13         line 1 from column 2 through line 2 column 13
//! ln:.14-.14          column 14 of line 1
//! ln:5                line 5 only
//! ln:3-               line 3 to the end
//! ```
//!
//! Lines and columns are 1-based and inclusive; columns count characters.
//! A position without a line takes line 1 at the start of a range and the
//! start line at the end of a range (or the last line if the end has no
//! column either). Out-of-range positions are clamped. A range whose start
//! lies after its end selects nothing.

use crate::consts::SLICE_PREFIX;

/// Error parsing a slice spec.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SliceError {
    /// The spec does not start with `ln:`.
    #[error("slice spec '{0}' must start with '{SLICE_PREFIX}'")]
    MissingPrefix(String),
    /// A line or column is not a number.
    #[error("invalid position '{0}' in slice spec")]
    InvalidPosition(String),
}

/// One endpoint of a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Position {
    line: Option<usize>,
    column: Option<usize>,
}

impl Position {
    fn parse(s: &str) -> Result<Self, SliceError> {
        let s = s.trim();
        let (line, column) = match s.split_once('.') {
            Some((line, column)) => (line, Some(column)),
            None => (s, None),
        };
        Ok(Self {
            line: parse_number(line, s)?,
            column: column.map(|c| parse_number(c, s)).transpose()?.flatten(),
        })
    }
}

fn parse_number(part: &str, position: &str) -> Result<Option<usize>, SliceError> {
    let part = part.trim();
    if part.is_empty() {
        return Ok(None);
    }
    part.parse()
        .map(Some)
        .map_err(|_| SliceError::InvalidPosition(position.to_owned()))
}

/// A start/end pair of a slice spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LineRange {
    start: Position,
    end: Position,
}

impl LineRange {
    fn parse(s: &str) -> Result<Self, SliceError> {
        match s.split_once('-') {
            Some((start, end)) => Ok(Self {
                start: Position::parse(start)?,
                end: Position::parse(end)?,
            }),
            None => {
                let single = Position::parse(s)?;
                Ok(Self {
                    start: single,
                    end: single,
                })
            }
        }
    }

    /// Extract this range from `lines`.
    fn extract(&self, lines: &[&str]) -> Vec<String> {
        let count = lines.len();
        if count == 0 {
            return Vec::new();
        }

        let start_line = self.start.line.unwrap_or(1).clamp(1, count);
        let end_line = match (self.end.line, self.end.column) {
            (Some(line), _) => line.clamp(1, count),
            (None, Some(_)) => start_line,
            (None, None) => count,
        };
        let start_column = self.start.column.unwrap_or(1).max(1);
        let end_column = self.end.column.unwrap_or(usize::MAX);

        if (start_line, start_column) > (end_line, end_column) {
            return Vec::new();
        }

        (start_line..=end_line)
            .map(|number| {
                let line = lines[number - 1];
                let from = if number == start_line { start_column - 1 } else { 0 };
                let to = if number == end_line { end_column } else { usize::MAX };
                line.chars().skip(from).take(to.saturating_sub(from)).collect()
            })
            .collect()
    }
}

/// Parsed slice spec: ranges in the order written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSlice {
    ranges: Vec<LineRange>,
}

impl LineSlice {
    /// Parse a spec such as `ln:1-3,7-9`.
    pub fn parse(spec: &str) -> Result<Self, SliceError> {
        let body = spec
            .trim()
            .strip_prefix(SLICE_PREFIX)
            .ok_or_else(|| SliceError::MissingPrefix(spec.to_owned()))?;

        let ranges = body
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(LineRange::parse)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { ranges })
    }

    /// Number of ranges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Whether the spec has no ranges.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Select the ranges from `lines`, concatenated in spec order.
    ///
    /// `separator` lines are inserted between consecutive ranges. A spec with
    /// no ranges selects everything.
    #[must_use]
    pub fn apply(&self, lines: &[&str], separator: &[String]) -> Vec<String> {
        if self.ranges.is_empty() {
            return lines.iter().map(|&line| line.to_owned()).collect();
        }

        let mut selected = Vec::new();
        for (index, range) in self.ranges.iter().enumerate() {
            if index > 0 {
                selected.extend(separator.iter().cloned());
            }
            selected.extend(range.extract(lines));
        }
        selected
    }
}

/// Remove the indentation shared by all non-blank lines.
///
/// Whitespace-only lines do not take part in computing the common indent and
/// lose at most that many leading whitespace characters.
#[must_use]
pub fn strip_indent(lines: Vec<String>) -> Vec<String> {
    let indent = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.chars().take_while(|c| c.is_whitespace()).count())
        .min()
        .unwrap_or(0);

    if indent == 0 {
        return lines;
    }

    lines
        .into_iter()
        .map(|line| strip_leading_whitespace(&line, indent).to_owned())
        .collect()
}

/// Strip up to `count` leading whitespace characters.
fn strip_leading_whitespace(line: &str, count: usize) -> &str {
    let mut rest = line;
    for _ in 0..count {
        let mut chars = rest.chars();
        match chars.next() {
            Some(c) if c.is_whitespace() => rest = chars.as_str(),
            _ => break,
        }
    }
    rest
}
