//! Tri-state recursion policy.

use serde::de::{self, Deserialize, Deserializer};

/// Whether fetched content is scanned again for include directives.
///
/// In configuration files the policy is written as a boolean or as one of the
/// strings `"on"`, `"off"`, `"neutral"` (`"none"` and `"unset"` are accepted
/// as aliases for `"neutral"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecursionPolicy {
    /// Recurse unless the directive explicitly opts out.
    On,
    /// Never recurse, whatever the directive asks for.
    Off,
    /// Recurse only when the directive explicitly opts in.
    #[default]
    Neutral,
}

impl RecursionPolicy {
    /// Combine the policy with a directive's explicit override.
    ///
    /// `explicit` is `Some(true)` for the recurse-on marker, `Some(false)` for
    /// the recurse-off marker and `None` when the directive carries neither.
    #[must_use]
    pub fn should_recurse(self, explicit: Option<bool>) -> bool {
        match self {
            Self::On => explicit != Some(false),
            Self::Off => false,
            Self::Neutral => explicit == Some(true),
        }
    }
}

impl From<bool> for RecursionPolicy {
    fn from(value: bool) -> Self {
        if value { Self::On } else { Self::Off }
    }
}

impl From<Option<bool>> for RecursionPolicy {
    fn from(value: Option<bool>) -> Self {
        value.map_or(Self::Neutral, Self::from)
    }
}

impl<'de> Deserialize<'de> for RecursionPolicy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Flag(bool),
            Name(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Flag(flag) => Ok(Self::from(flag)),
            Repr::Name(name) => match name.as_str() {
                "on" => Ok(Self::On),
                "off" => Ok(Self::Off),
                "neutral" | "none" | "unset" => Ok(Self::Neutral),
                other => Err(de::Error::custom(format!(
                    "invalid recursion policy '{other}' (valid: true, false, \"on\", \"off\", \"neutral\")"
                ))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Deserialize)]
    struct Wrapper {
        policy: RecursionPolicy,
    }

    fn parse(value: &str) -> Result<RecursionPolicy, toml::de::Error> {
        toml::from_str::<Wrapper>(&format!("policy = {value}")).map(|w| w.policy)
    }

    #[test]
    fn test_on_recurses_unless_forced_off() {
        assert!(RecursionPolicy::On.should_recurse(None));
        assert!(RecursionPolicy::On.should_recurse(Some(true)));
        assert!(!RecursionPolicy::On.should_recurse(Some(false)));
    }

    #[test]
    fn test_off_never_recurses() {
        assert!(!RecursionPolicy::Off.should_recurse(None));
        assert!(!RecursionPolicy::Off.should_recurse(Some(true)));
        assert!(!RecursionPolicy::Off.should_recurse(Some(false)));
    }

    #[test]
    fn test_neutral_recurses_only_when_forced_on() {
        assert!(!RecursionPolicy::Neutral.should_recurse(None));
        assert!(RecursionPolicy::Neutral.should_recurse(Some(true)));
        assert!(!RecursionPolicy::Neutral.should_recurse(Some(false)));
    }

    #[test]
    fn test_from_option_bool() {
        assert_eq!(RecursionPolicy::from(Some(true)), RecursionPolicy::On);
        assert_eq!(RecursionPolicy::from(Some(false)), RecursionPolicy::Off);
        assert_eq!(RecursionPolicy::from(None), RecursionPolicy::Neutral);
    }

    #[test]
    fn test_deserialize_booleans_and_names() {
        assert_eq!(parse("true").unwrap(), RecursionPolicy::On);
        assert_eq!(parse("false").unwrap(), RecursionPolicy::Off);
        assert_eq!(parse("\"neutral\"").unwrap(), RecursionPolicy::Neutral);
        assert_eq!(parse("\"none\"").unwrap(), RecursionPolicy::Neutral);
        assert_eq!(parse("\"on\"").unwrap(), RecursionPolicy::On);
    }

    #[test]
    fn test_deserialize_rejects_other_values() {
        assert!(parse("\"sometimes\"").is_err());
        assert!(parse("3").is_err());
    }
}
