use super::config::{Decade, PopularityRange};
use super::mood::{MoodTargets, estimate_features};
use crate::models::Track;
use std::collections::HashSet;

/// Soft filter stages over the candidate pool.
///
/// Each stage is a pure `(pool, pinned, criterion) -> pool'`. Pinned tracks
/// always pass. Whether a stage's result is kept is decided by the caller
/// through [`TrackFilters::relax`].
pub struct TrackFilters;

impl TrackFilters {
    /// Keep tracks released inside at least one of the requested decades
    pub fn by_decade(pool: &[Track], pinned: &HashSet<String>, decades: &[Decade]) -> Vec<Track> {
        Self::retain(pool, pinned, |track| {
            track
                .release_year()
                .is_some_and(|year| decades.iter().any(|decade| decade.contains(year)))
        })
    }

    /// Keep tracks whose popularity falls in the closed range
    pub fn by_popularity(pool: &[Track], pinned: &HashSet<String>, range: PopularityRange) -> Vec<Track> {
        Self::retain(pool, pinned, |track| range.contains(track.popularity))
    }

    /// Keep tracks whose measured (or else estimated) features satisfy every band
    pub fn by_mood(
        pool: &[Track],
        pinned: &HashSet<String>,
        targets: &MoodTargets,
        tolerance: f32,
        current_year: i32,
    ) -> Vec<Track> {
        Self::retain(pool, pinned, |track| {
            let features = track
                .audio_features
                .unwrap_or_else(|| estimate_features(track, current_year));
            targets.matches(&features, tolerance)
        })
    }

    /// Relaxation rule: accept `filtered` only if it keeps at least `floor`
    /// distinct tracks. Duplicates from overlapping sources count once.
    pub fn relax(before: Vec<Track>, filtered: Vec<Track>, floor: usize) -> (Vec<Track>, bool) {
        if Self::distinct_count(&filtered) >= floor {
            (filtered, true)
        } else {
            (before, false)
        }
    }

    pub fn distinct_count(pool: &[Track]) -> usize {
        pool.iter().map(|track| track.id.as_str()).collect::<HashSet<_>>().len()
    }

    fn retain(pool: &[Track], pinned: &HashSet<String>, keep: impl Fn(&Track) -> bool) -> Vec<Track> {
        pool.iter()
            .filter(|track| pinned.contains(&track.id) || keep(track))
            .cloned()
            .collect()
    }
}
