use crate::error::PreferencesError;
use crate::models::{AudioFeatures, Track};
use serde::{Deserialize, Serialize};

/// Requested mood, either a preset or custom per-axis targets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mood", rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Sad,
    Energetic,
    Calm,
    Custom(CustomMood),
}

/// Custom targets; an absent axis is unconstrained
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomMood {
    pub energy: Option<BandValue>,
    pub valence: Option<BandValue>,
    pub danceability: Option<BandValue>,
    pub acousticness: Option<BandValue>,
}

/// A single target value or an explicit `[lo, hi]` range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BandValue {
    Point(f32),
    Range([f32; 2]),
}

impl BandValue {
    pub fn band(&self) -> Band {
        match *self {
            BandValue::Point(v) => Band::new(v, v),
            BandValue::Range([a, b]) => Band::new(a, b),
        }
    }
}

/// Closed interval over a [0, 1] audio attribute
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub lo: f32,
    pub hi: f32,
}

impl Band {
    pub fn new(a: f32, b: f32) -> Self {
        Self {
            lo: a.min(b),
            hi: a.max(b),
        }
    }

    /// `value` within the band widened by `tolerance` on both edges
    pub fn admits(&self, value: f32, tolerance: f32) -> bool {
        value >= self.lo - tolerance && value <= self.hi + tolerance
    }
}

/// Bands a track must satisfy; `None` means the axis is not checked
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MoodTargets {
    pub energy: Option<Band>,
    pub valence: Option<Band>,
    pub danceability: Option<Band>,
    pub acousticness: Option<Band>,
}

impl MoodTargets {
    pub fn is_empty(&self) -> bool {
        self.energy.is_none()
            && self.valence.is_none()
            && self.danceability.is_none()
            && self.acousticness.is_none()
    }

    /// Every requested band holds; trivially true when none is requested
    pub fn matches(&self, features: &AudioFeatures, tolerance: f32) -> bool {
        let checks = [
            (self.energy, features.energy),
            (self.valence, features.valence),
            (self.danceability, features.danceability),
            (self.acousticness, features.acousticness),
        ];
        checks
            .iter()
            .all(|(band, value)| band.is_none_or(|b| b.admits(*value, tolerance)))
    }
}

impl Mood {
    pub fn targets(&self) -> MoodTargets {
        let preset = |energy: (f32, f32), valence: (f32, f32), danceability: (f32, f32)| MoodTargets {
            energy: Some(Band::new(energy.0, energy.1)),
            valence: Some(Band::new(valence.0, valence.1)),
            danceability: Some(Band::new(danceability.0, danceability.1)),
            acousticness: None,
        };

        match self {
            Mood::Happy => preset((0.5, 1.0), (0.6, 1.0), (0.5, 1.0)),
            Mood::Sad => preset((0.0, 0.5), (0.0, 0.4), (0.0, 0.6)),
            Mood::Energetic => preset((0.7, 1.0), (0.4, 1.0), (0.6, 1.0)),
            Mood::Calm => preset((0.0, 0.4), (0.3, 0.7), (0.0, 0.5)),
            Mood::Custom(custom) => MoodTargets {
                energy: custom.energy.map(|v| v.band()),
                valence: custom.valence.map(|v| v.band()),
                danceability: custom.danceability.map(|v| v.band()),
                acousticness: custom.acousticness.map(|v| v.band()),
            },
        }
    }

    /// Parse a preset name, or custom axes as "energy=0.8,valence=0.2-0.6"
    pub fn parse(raw: &str) -> Result<Mood, PreferencesError> {
        let unknown = || PreferencesError::UnknownMood(raw.to_string());
        match raw.trim().to_lowercase().as_str() {
            "happy" => return Ok(Mood::Happy),
            "sad" => return Ok(Mood::Sad),
            "energetic" => return Ok(Mood::Energetic),
            "calm" => return Ok(Mood::Calm),
            _ => {}
        }

        let mut custom = CustomMood::default();
        for part in raw.split(',').filter(|p| !p.trim().is_empty()) {
            let (axis, value) = part.split_once('=').ok_or_else(unknown)?;
            let parse_unit = |s: &str| -> Result<f32, PreferencesError> {
                let v: f32 = s.trim().parse().map_err(|_| unknown())?;
                if (0.0..=1.0).contains(&v) { Ok(v) } else { Err(unknown()) }
            };
            let band = match value.split_once('-') {
                Some((lo, hi)) => BandValue::Range([parse_unit(lo)?, parse_unit(hi)?]),
                None => BandValue::Point(parse_unit(value)?),
            };
            match axis.trim().to_lowercase().as_str() {
                "energy" => custom.energy = Some(band),
                "valence" => custom.valence = Some(band),
                "danceability" => custom.danceability = Some(band),
                "acousticness" => custom.acousticness = Some(band),
                _ => return Err(unknown()),
            }
        }

        if custom == CustomMood::default() {
            return Err(unknown());
        }
        Ok(Mood::Custom(custom))
    }
}

/// Metadata-only guess at a track's audio features.
///
/// This is a heuristic, not a measurement: it maps popularity, duration and
/// release year onto the four mood axes so that mood filtering still does
/// something when the catalog supplies no features. Tracks without a usable
/// release date are treated as released in `current_year`.
pub fn estimate_features(track: &Track, current_year: i32) -> AudioFeatures {
    let popularity = f32::from(track.popularity.min(100)) / 100.0;
    let duration = track.duration_ms.min(300_000) as f32 / 300_000.0;
    let year = track.release_year().unwrap_or(current_year);

    AudioFeatures {
        energy: 0.7 * popularity + 0.3 * duration,
        danceability: popularity,
        valence: 0.6 * ((year - 1990) as f32 / 34.0).clamp(0.0, 1.0) + 0.4 * popularity,
        acousticness: 0.7 * (1.0 - popularity).max(0.0)
            + 0.3 * ((current_year - year) as f32 / 100.0).max(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Album;
    use approx::assert_relative_eq;

    fn track(popularity: u8, duration_ms: u64, release_date: &str) -> Track {
        Track {
            id: "t".to_string(),
            popularity,
            duration_ms,
            album: Album {
                release_date: release_date.to_string(),
                ..Album::default()
            },
            ..Track::default()
        }
    }

    #[test]
    fn test_estimate_matches_formulas() {
        let features = estimate_features(&track(80, 240_000, "2007-03-01"), 2024);
        assert_relative_eq!(features.energy, 0.7 * 0.8 + 0.3 * 0.8, epsilon = 1e-5);
        assert_relative_eq!(features.danceability, 0.8, epsilon = 1e-5);
        assert_relative_eq!(features.valence, 0.6 * (17.0 / 34.0) + 0.4 * 0.8, epsilon = 1e-5);
        assert_relative_eq!(features.acousticness, 0.7 * 0.2 + 0.3 * 0.17, epsilon = 1e-5);
    }

    #[test]
    fn test_estimate_clamps_duration_and_year() {
        let long_old = estimate_features(&track(0, 900_000, "1960"), 2024);
        assert_relative_eq!(long_old.energy, 0.3, epsilon = 1e-5);
        assert_relative_eq!(long_old.valence, 0.0, epsilon = 1e-5);
        assert_relative_eq!(long_old.acousticness, 0.7 + 0.3 * 0.64, epsilon = 1e-5);

        let future = estimate_features(&track(100, 0, "2030"), 2024);
        assert_relative_eq!(future.valence, 1.0, epsilon = 1e-5);
        assert_relative_eq!(future.acousticness, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_estimate_without_release_date_uses_current_year() {
        let features = estimate_features(&track(50, 150_000, ""), 2024);
        assert_relative_eq!(features.valence, 0.6 + 0.2, epsilon = 1e-5);
        assert_relative_eq!(features.acousticness, 0.35, epsilon = 1e-5);
    }

    #[test]
    fn test_band_tolerance_edges() {
        let band = Band::new(0.5, 1.0);
        assert!(band.admits(0.31, 0.2));
        assert!(!band.admits(0.29, 0.2));
        assert!(!band.admits(0.45, 0.0));
        // reversed inputs are normalized
        assert_eq!(Band::new(0.9, 0.1), Band::new(0.1, 0.9));
    }

    #[test]
    fn test_presets_leave_acousticness_unconstrained() {
        for mood in [Mood::Happy, Mood::Sad, Mood::Energetic, Mood::Calm] {
            let targets = mood.targets();
            assert!(targets.acousticness.is_none());
            assert!(targets.energy.is_some());
        }
    }

    #[test]
    fn test_empty_custom_mood_matches_everything() {
        let targets = Mood::Custom(CustomMood::default()).targets();
        assert!(targets.is_empty());
        let features = AudioFeatures {
            energy: 0.0,
            valence: 1.0,
            danceability: 0.0,
            acousticness: 1.0,
        };
        assert!(targets.matches(&features, 0.0));
    }

    #[test]
    fn test_matches_requires_every_band() {
        let targets = Mood::Happy.targets();
        let upbeat = AudioFeatures {
            energy: 0.8,
            valence: 0.7,
            danceability: 0.9,
            acousticness: 0.1,
        };
        let gloomy = AudioFeatures { valence: 0.1, ..upbeat };
        assert!(targets.matches(&upbeat, 0.2));
        assert!(!targets.matches(&gloomy, 0.2));
    }

    #[test]
    fn test_mood_json_shapes() {
        let preset: Mood = serde_json::from_str(r#"{"mood": "calm"}"#).unwrap();
        assert_eq!(preset, Mood::Calm);

        let custom: Mood = serde_json::from_str(
            r#"{"mood": "custom", "energy": 0.8, "valence": [0.2, 0.6]}"#,
        )
        .unwrap();
        let targets = custom.targets();
        assert_eq!(targets.energy, Some(Band::new(0.8, 0.8)));
        assert_eq!(targets.valence, Some(Band::new(0.2, 0.6)));
        assert!(targets.danceability.is_none());
    }

    #[test]
    fn test_parse_cli_moods() {
        assert_eq!(Mood::parse("Energetic").unwrap(), Mood::Energetic);
        let custom = Mood::parse("energy=0.8,acousticness=0.1-0.3").unwrap();
        let targets = custom.targets();
        assert_eq!(targets.energy, Some(Band::new(0.8, 0.8)));
        assert_eq!(targets.acousticness, Some(Band::new(0.1, 0.3)));
        assert!(Mood::parse("grumpy").is_err());
        assert!(Mood::parse("energy=1.5").is_err());
        assert!(Mood::parse("tempo=0.5").is_err());
    }
}
