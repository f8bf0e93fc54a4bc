// Filter stage examples
// Each stage is run on its own, the way the generator calls it

use crate::models::{Album, AudioFeatures, Track};
use crate::playlist::filters::TrackFilters;
use crate::playlist::{Decade, Mood, PopularityRange};
use std::collections::HashSet;

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_track(id: &str, popularity: u8, release_date: &str) -> Track {
        Track {
            id: id.to_string(),
            name: format!("Song {id}"),
            artists: Vec::new(),
            album: Album {
                release_date: release_date.to_string(),
                ..Album::default()
            },
            popularity,
            duration_ms: 200_000,
            audio_features: None,
        }
    }

    fn pinned(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    fn ids(tracks: &[Track]) -> Vec<&str> {
        tracks.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn test_decade_filter() {
        let pool = vec![
            create_test_track("80s", 50, "1985-04-01"),
            create_test_track("90s", 50, "1994"),
            create_test_track("00s", 50, "2000-01-01"),
            create_test_track("undated", 50, ""),
        ];
        let decades = [Decade::parse("1990").unwrap(), Decade::parse("1980").unwrap()];

        let kept = TrackFilters::by_decade(&pool, &pinned(&[]), &decades);
        assert_eq!(ids(&kept), vec!["80s", "90s"]);
    }

    #[test]
    fn test_decade_filter_spares_pinned() {
        let pool = vec![
            create_test_track("seed", 50, "1965"),
            create_test_track("other", 50, "1965"),
        ];
        let decades = [Decade::parse("2010").unwrap()];

        let kept = TrackFilters::by_decade(&pool, &pinned(&["seed"]), &decades);
        assert_eq!(ids(&kept), vec!["seed"]);
    }

    #[test]
    fn test_popularity_filter_is_inclusive() {
        let pool = vec![
            create_test_track("low", 19, "2000"),
            create_test_track("edge-low", 20, "2000"),
            create_test_track("edge-high", 60, "2000"),
            create_test_track("high", 61, "2000"),
        ];
        let kept = TrackFilters::by_popularity(&pool, &pinned(&[]), PopularityRange { min: 20, max: 60 });
        assert_eq!(ids(&kept), vec!["edge-low", "edge-high"]);
    }

    #[test]
    fn test_mood_filter_prefers_attached_features() {
        let mut measured = create_test_track("measured", 5, "2020");
        measured.audio_features = Some(AudioFeatures {
            energy: 0.9,
            valence: 0.9,
            danceability: 0.9,
            acousticness: 0.0,
        });
        // low popularity would estimate as far from happy
        let estimated = create_test_track("estimated", 5, "2020");

        let targets = Mood::Happy.targets();
        let kept = TrackFilters::by_mood(&[measured, estimated], &pinned(&[]), &targets, 0.2, 2024);
        assert_eq!(ids(&kept), vec!["measured"]);
    }

    #[test]
    fn test_mood_tolerance_widens_bands() {
        let pool = vec![create_test_track("mid", 45, "2015")];
        let targets = Mood::Happy.targets();

        assert!(TrackFilters::by_mood(&pool, &pinned(&[]), &targets, 0.0, 2024).is_empty());
        assert_eq!(TrackFilters::by_mood(&pool, &pinned(&[]), &targets, 0.2, 2024).len(), 1);
    }

    #[test]
    fn test_relax_keeps_previous_pool_below_floor() {
        let before: Vec<Track> = (0..6).map(|i| create_test_track(&i.to_string(), 50, "2000")).collect();
        let filtered = before[..4].to_vec();

        let (pool, applied) = TrackFilters::relax(before.clone(), filtered.clone(), 5);
        assert!(!applied);
        assert_eq!(pool, before);

        let (pool, applied) = TrackFilters::relax(before, filtered.clone(), 4);
        assert!(applied);
        assert_eq!(pool, filtered);
    }

    #[test]
    fn test_relax_counts_duplicates_once() {
        let before: Vec<Track> = (0..9).map(|i| create_test_track(&i.to_string(), 50, "2000")).collect();
        // six entries but only three distinct tracks
        let filtered: Vec<Track> = before[..3].iter().chain(&before[..3]).cloned().collect();
        assert_eq!(TrackFilters::distinct_count(&filtered), 3);

        let (pool, applied) = TrackFilters::relax(before.clone(), filtered, 5);
        assert!(!applied);
        assert_eq!(pool, before);
    }
}
