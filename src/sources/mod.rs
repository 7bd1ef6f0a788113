//! Source adapters, one per exporting application
//!
//! Each adapter knows where its export lives, which files to read, how to turn
//! them into tables and which landing schema to write. The shared mechanics
//! (confirmation, schema bootstrap, batching) live in [`crate::pipeline`].

pub mod apple_health;
pub mod bolt;
pub mod generic;
pub mod linkedin;
pub mod spotify;
pub mod substack;
pub mod telegram;

use std::path::{Path, PathBuf};

use crate::config::SourcesSection;
use crate::pipeline::SourceAdapter;

/// The applications the loader has adapters for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    AppleHealth,
    Bolt,
    Linkedin,
    Spotify,
    Substack,
    Telegram,
}

impl SourceKind {
    pub const ALL: [SourceKind; 6] = [
        SourceKind::AppleHealth,
        SourceKind::Bolt,
        SourceKind::Linkedin,
        SourceKind::Spotify,
        SourceKind::Substack,
        SourceKind::Telegram,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::AppleHealth => "apple_health",
            SourceKind::Bolt => "bolt",
            SourceKind::Linkedin => "linkedin",
            SourceKind::Spotify => "spotify",
            SourceKind::Substack => "substack",
            SourceKind::Telegram => "telegram",
        }
    }

    /// Landing schema, `s_<name>`
    pub fn schema(&self) -> &'static str {
        match self {
            SourceKind::AppleHealth => apple_health::SCHEMA,
            SourceKind::Bolt => bolt::SCHEMA,
            SourceKind::Linkedin => linkedin::SCHEMA,
            SourceKind::Spotify => spotify::SCHEMA,
            SourceKind::Substack => substack::SCHEMA,
            SourceKind::Telegram => telegram::SCHEMA,
        }
    }

    /// Input location from configuration
    pub fn configured_path<'a>(&self, sources: &'a SourcesSection) -> &'a Path {
        match self {
            SourceKind::AppleHealth => &sources.apple_health,
            SourceKind::Bolt => &sources.bolt,
            SourceKind::Linkedin => &sources.linkedin,
            SourceKind::Spotify => &sources.spotify,
            SourceKind::Substack => &sources.substack,
            SourceKind::Telegram => &sources.telegram,
        }
    }

    /// Build the adapter reading from `root`
    pub fn adapter(&self, root: PathBuf) -> Box<dyn SourceAdapter> {
        match self {
            SourceKind::AppleHealth => Box::new(apple_health::AppleHealthSource::new(root)),
            SourceKind::Bolt => Box::new(bolt::BoltSource::new(root)),
            SourceKind::Linkedin => Box::new(linkedin::LinkedinSource::new(root)),
            SourceKind::Spotify => Box::new(spotify::SpotifySource::new(root)),
            SourceKind::Substack => Box::new(substack::SubstackSource::new(root)),
            SourceKind::Telegram => Box::new(telegram::TelegramSource::new(root)),
        }
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "apple_health" | "health" => Ok(SourceKind::AppleHealth),
            "bolt" => Ok(SourceKind::Bolt),
            "linkedin" => Ok(SourceKind::Linkedin),
            "spotify" => Ok(SourceKind::Spotify),
            "substack" => Ok(SourceKind::Substack),
            "telegram" => Ok(SourceKind::Telegram),
            _ => Err(format!(
                "Unknown source: {}. Use one of: {}",
                s,
                SourceKind::ALL
                    .iter()
                    .map(|k| k.name())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_source_kind_round_trip() {
        for kind in SourceKind::ALL {
            assert_eq!(SourceKind::from_str(kind.name()).unwrap(), kind);
        }
        assert_eq!(
            SourceKind::from_str("Apple-Health").unwrap(),
            SourceKind::AppleHealth
        );
        assert!(SourceKind::from_str("myspace").is_err());
    }

    #[test]
    fn test_schemas_are_prefixed() {
        for kind in SourceKind::ALL {
            assert_eq!(kind.schema(), format!("s_{}", kind.name()));
        }
    }

    #[test]
    fn test_adapter_matches_kind() {
        let sources = SourcesSection::default();
        for kind in SourceKind::ALL {
            let adapter = kind.adapter(kind.configured_path(&sources).to_path_buf());
            assert_eq!(adapter.name(), kind.name());
            assert_eq!(adapter.schema(), kind.schema());
        }
    }
}
