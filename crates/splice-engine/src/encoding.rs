//! Text encoding lookup.
//!
//! Encoding names are matched against the WHATWG label table provided by
//! `encoding_rs`, case-insensitively. Hyphens and underscores are
//! interchangeable, so `utf_8` and `UTF-8` name the same encoding.

use encoding_rs::Encoding;

/// Look up an encoding by name.
///
/// Returns `None` for an empty or unrecognized name.
#[must_use]
pub fn lookup_encoding(name: &str) -> Option<&'static Encoding> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Encoding::for_label(name.as_bytes())
        .or_else(|| Encoding::for_label(name.replace('_', "-").as_bytes()))
}

/// Whether `name` is present and names a supported encoding.
#[must_use]
pub fn encoding_exists(name: Option<&str>) -> bool {
    name.and_then(lookup_encoding).is_some()
}

/// Pick the encoding for one directive, falling back to `default`.
///
/// A warning is logged only when a name was actually supplied.
pub(crate) fn resolve_encoding(
    requested: Option<&str>,
    default: &'static Encoding,
) -> &'static Encoding {
    let Some(name) = requested else {
        return default;
    };
    lookup_encoding(name).unwrap_or_else(|| {
        tracing::warn!(
            encoding = name,
            fallback = default.name(),
            "Unsupported encoding, using default"
        );
        default
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{UTF_8, UTF_16LE, WINDOWS_1252};

    #[test]
    fn test_known_encodings() {
        assert!(encoding_exists(Some("utf-8")));
        assert!(encoding_exists(Some("UTF-8")));
        assert!(encoding_exists(Some("latin1")));
        assert!(encoding_exists(Some("utf-16le")));
    }

    #[test]
    fn test_underscore_alias() {
        assert_eq!(lookup_encoding("utf_8"), Some(UTF_8));
        assert_eq!(lookup_encoding("utf_16le"), Some(UTF_16LE));
    }

    #[test]
    fn test_missing_or_unknown_encoding() {
        assert!(!encoding_exists(None));
        assert!(!encoding_exists(Some("")));
        assert!(!encoding_exists(Some("   ")));
        assert!(!encoding_exists(Some("Invalid")));
    }

    #[test]
    fn test_resolve_encoding_fallback() {
        assert_eq!(resolve_encoding(None, UTF_8), UTF_8);
        assert_eq!(resolve_encoding(Some("Invalid"), UTF_8), UTF_8);
        assert_eq!(resolve_encoding(Some("latin1"), UTF_8), WINDOWS_1252);
    }
}
