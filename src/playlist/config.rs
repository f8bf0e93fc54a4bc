use super::mood::Mood;
use anyhow::Context;
use crate::error::PreferencesError;
use crate::models::{Artist, Track};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Genre seeds the catalog accepts in `genre:"..."` searches
pub const AVAILABLE_GENRES: &[&str] = &[
    "acoustic", "afrobeat", "alt-rock", "alternative", "ambient",
    "anime", "black-metal", "bluegrass", "blues", "bossanova",
    "brazil", "breakbeat", "british", "cantopop", "celtic", "chicago-house",
    "children", "chill", "classical", "club", "comedy",
    "country", "dance", "dancehall", "death-metal", "deep-house",
    "detroit-techno", "disco", "disney", "drum-and-bass", "dub",
    "dubstep", "edm", "electro", "electronic", "emo",
    "folk", "forro", "french", "funk", "garage",
    "german", "gospel", "goth", "grindcore", "groove",
    "grunge", "guitar", "happy", "hard-rock", "hardcore",
    "hardstyle", "heavy-metal", "hip-hop", "house", "idm",
    "indian", "indie", "indie-pop", "industrial", "iranian",
    "j-dance", "j-idol", "j-pop", "j-rock", "jazz",
    "k-pop", "kids", "latin", "latino", "malay",
    "mandopop", "metal", "metal-misc", "metalcore", "minimal-techno",
    "movies", "mpb", "new-age", "new-release", "opera",
    "pagode", "party", "philippines-opm", "piano", "pop",
    "pop-film", "post-dubstep", "power-pop", "progressive-house", "psych-rock",
    "punk", "punk-rock", "r-n-b", "rainy-day", "reggae",
    "reggaeton", "road-trip", "rock", "rock-n-roll", "rockabilly",
    "romance", "sad", "salsa", "samba", "sertanejo",
    "show-tunes", "singer-songwriter", "ska", "sleep", "songwriter",
    "soul", "soundtracks", "spanish", "study", "summer",
    "swedish", "synth-pop", "tango", "techno", "trance",
    "trip-hop", "turkish", "work-out", "world-music",
];

/// What the caller wants the generated playlist to look like.
///
/// Every field is optional in JSON: lists default to empty, the popularity
/// range to the full `[0, 100]`, the mood to none. An absent market is
/// filled from configuration by the caller, or else normalized to `US`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub artists: Vec<Artist>,
    /// Pinned seed tracks; never filtered and always listed first
    pub tracks: Vec<Track>,
    pub genres: Vec<String>,
    /// Decade markers such as "1990"
    pub decades: Vec<String>,
    pub popularity: PopularityRange,
    pub market: Option<String>,
    pub mood: Option<Mood>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            artists: Vec::new(),
            tracks: Vec::new(),
            genres: Vec::new(),
            decades: Vec::new(),
            popularity: PopularityRange::default(),
            market: None,
            mood: None,
        }
    }
}

/// Closed popularity interval within [0, 100]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopularityRange {
    pub min: u8,
    pub max: u8,
}

impl Default for PopularityRange {
    fn default() -> Self {
        Self { min: 0, max: 100 }
    }
}

impl PopularityRange {
    /// A range that still admits every track
    pub fn is_unrestricted(&self) -> bool {
        self.min == 0 && self.max >= 100
    }

    pub fn contains(&self, popularity: u8) -> bool {
        popularity >= self.min && popularity <= self.max
    }

    /// Parse "MIN-MAX" as given on the command line
    pub fn parse(raw: &str) -> Result<Self, PreferencesError> {
        let invalid = || PreferencesError::MalformedPopularity(raw.to_string());
        let (min, max) = raw.split_once('-').ok_or_else(invalid)?;
        let range = Self {
            min: min.trim().parse().map_err(|_| invalid())?,
            max: max.trim().parse().map_err(|_| invalid())?,
        };
        range.validate()?;
        Ok(range)
    }

    fn validate(&self) -> Result<(), PreferencesError> {
        if self.min > self.max || self.max > 100 {
            return Err(PreferencesError::InvalidPopularity {
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// Half-open ten-year window starting at a decade marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decade {
    pub start: i32,
}

impl Decade {
    pub fn parse(marker: &str) -> Result<Self, PreferencesError> {
        let trimmed = marker.trim();
        if trimmed.len() != 4 || !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Err(PreferencesError::InvalidDecade(marker.to_string()));
        }
        trimmed
            .parse()
            .map(|start| Decade { start })
            .map_err(|_| PreferencesError::InvalidDecade(marker.to_string()))
    }

    pub fn contains(&self, year: i32) -> bool {
        year >= self.start && year < self.start + 10
    }
}

/// Preferences after validation, ready to drive the pipeline
#[derive(Debug, Clone)]
pub struct NormalizedPreferences {
    pub artists: Vec<Artist>,
    pub tracks: Vec<Track>,
    pub genres: Vec<String>,
    pub decades: Vec<Decade>,
    pub popularity: PopularityRange,
    pub market: String,
    pub mood: Option<Mood>,
}

impl NormalizedPreferences {
    /// Nothing that could seed discovery or the pinned set
    pub fn is_empty_query(&self) -> bool {
        self.tracks.is_empty() && self.artists.is_empty() && self.genres.is_empty()
    }
}

impl Preferences {
    /// Validate and normalize.
    ///
    /// Genres are trimmed, lowercased and checked against the vocabulary;
    /// blank entries are dropped and duplicates (genres, artists and pinned
    /// tracks by id, decades) keep their first occurrence. Pinned tracks
    /// without an id cannot be deduplicated or appended and are dropped.
    pub fn normalized(&self) -> Result<NormalizedPreferences, PreferencesError> {
        let mut genres = Vec::new();
        for raw in &self.genres {
            let genre = raw.trim().to_lowercase();
            if genre.is_empty() || genres.contains(&genre) {
                continue;
            }
            if !AVAILABLE_GENRES.contains(&genre.as_str()) {
                return Err(PreferencesError::UnknownGenre(raw.clone()));
            }
            genres.push(genre);
        }

        let mut decades = Vec::new();
        for marker in self.decades.iter().filter(|d| !d.trim().is_empty()) {
            let decade = Decade::parse(marker)?;
            if !decades.contains(&decade) {
                decades.push(decade);
            }
        }

        self.popularity.validate()?;

        let mut seen_artists = HashSet::new();
        let artists = self
            .artists
            .iter()
            .filter(|a| !a.id.trim().is_empty() && seen_artists.insert(a.id.clone()))
            .cloned()
            .collect();

        let mut seen_tracks = HashSet::new();
        let tracks = self
            .tracks
            .iter()
            .filter(|t| !t.id.is_empty() && seen_tracks.insert(t.id.clone()))
            .cloned()
            .collect();

        let market = match self.market.as_deref().unwrap_or_default().trim() {
            "" => "US".to_string(),
            code => code.to_uppercase(),
        };

        Ok(NormalizedPreferences {
            artists,
            tracks,
            genres,
            decades,
            popularity: self.popularity,
            market,
            mood: self.mood.clone(),
        })
    }

    /// Use `fallback` as the market unless one was given
    pub fn fill_market(&mut self, fallback: &str) {
        if self.market.as_deref().is_none_or(|m| m.trim().is_empty()) {
            self.market = Some(fallback.to_string());
        }
    }

    /// Load preferences from a JSON file
    pub fn load_from_file(path: &str) -> anyhow::Result<Preferences> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read preferences file {path}"))?;
        let preferences: Preferences = serde_json::from_str(&content)
            .with_context(|| format!("Invalid preferences JSON in {path}"))?;
        Ok(preferences)
    }
}

/// Tunable constants of the generation pipeline.
///
/// The relaxation floor and the mood tolerance are empirical; they are kept
/// here rather than inlined so callers and tests can adjust them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    /// A soft filter is applied only if the pool keeps at least this many tracks
    pub relaxation_floor: usize,
    /// Widening applied to both edges of every mood band
    pub mood_tolerance: f32,
    pub max_tracks: usize,
    pub genre_search_limit: u32,
    /// Fallback search runs when discovery leaves fewer tracks than this
    pub fallback_threshold: usize,
    pub fallback_search_limit: u32,
    pub audio_feature_batch: usize,
    /// Ask the catalog for measured features before estimating
    pub use_audio_features: bool,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            relaxation_floor: 5,
            mood_tolerance: 0.2,
            max_tracks: 30,
            genre_search_limit: 20,
            fallback_threshold: 5,
            fallback_search_limit: 30,
            audio_feature_batch: 100,
            use_audio_features: true,
        }
    }
}
