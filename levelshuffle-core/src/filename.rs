use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Extension carried by every level file the shuffler handles.
pub const LEVEL_EXTENSION: &str = ".rton";

static LEVEL_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z]+)([0-9]+)(?:_.*)?$").expect("valid level name regex")
});

/// `(world, number)` key pulled out of a level filename.
///
/// Both halves are present or both are absent; there is no partial parse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParsedName(Option<(String, u64)>);

impl ParsedName {
    pub fn unparsed() -> Self {
        Self(None)
    }

    pub fn world(&self) -> Option<&str> {
        self.0.as_ref().map(|(world, _)| world.as_str())
    }

    pub fn number(&self) -> Option<u64> {
        self.0.as_ref().map(|(_, number)| *number)
    }

    pub fn key(&self) -> Option<(&str, u64)> {
        self.0.as_ref().map(|(world, number)| (world.as_str(), *number))
    }

    pub fn is_parsed(&self) -> bool {
        self.0.is_some()
    }
}

/// Parse names like `beach12.rton` or `egypt4_hard.rton`.
///
/// The world is lower-cased and leading zeros vanish in the number. Anything
/// else (including digit runs too long for a `u64`) comes back unparsed.
pub fn parse_level_filename(name: &str) -> ParsedName {
    let base = name.strip_suffix(LEVEL_EXTENSION).unwrap_or(name);

    let Some(caps) = LEVEL_NAME_RE.captures(base) else {
        return ParsedName::unparsed();
    };

    let world = caps[1].to_ascii_lowercase();
    match caps[2].parse::<u64>() {
        Ok(number) => ParsedName(Some((world, number))),
        Err(_) => ParsedName::unparsed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(world: &str, number: u64) -> ParsedName {
        ParsedName(Some((world.to_string(), number)))
    }

    #[test]
    fn parses_plain_world_and_number() {
        assert_eq!(parse_level_filename("world123"), parsed("world", 123));
    }

    #[test]
    fn ignores_underscore_suffix() {
        assert_eq!(parse_level_filename("world123_suffix"), parsed("world", 123));
        assert_eq!(parse_level_filename("beach4_.rton"), parsed("beach", 4));
    }

    #[test]
    fn strips_extension_and_normalises() {
        assert_eq!(parse_level_filename("WORLD007.rton"), parsed("world", 7));
    }

    #[test]
    fn extension_match_is_case_sensitive() {
        assert!(!parse_level_filename("beach1.RTON").is_parsed());
    }

    #[test]
    fn rejects_names_without_the_pattern() {
        assert!(!parse_level_filename("random").is_parsed());
        assert!(!parse_level_filename("abc12def").is_parsed());
        assert!(!parse_level_filename("12beach").is_parsed());
        assert!(!parse_level_filename("").is_parsed());
        assert!(!parse_level_filename(".rton").is_parsed());
    }

    #[test]
    fn rejects_non_ascii_digits_and_overflow() {
        assert!(!parse_level_filename("beach١٢").is_parsed());
        assert!(!parse_level_filename("beach99999999999999999999999").is_parsed());
    }

    #[test]
    fn world_and_number_are_both_present_or_both_absent() {
        for name in ["pirate3", "x", "tutorial_1", "dino10_boss.rton", "a1b", "Z0"] {
            let parsed = parse_level_filename(name);
            assert_eq!(parsed.world().is_some(), parsed.number().is_some(), "{name}");
        }
    }
}
