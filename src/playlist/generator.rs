use super::filters::TrackFilters;
use super::{GeneratorSettings, Preferences};
use crate::client::CatalogClient;
use crate::error::{CatalogError, GenerationError};
use crate::models::{AudioFeatures, Track};
use chrono::Datelike;
use std::collections::{HashMap, HashSet};

/// Main playlist generator
pub struct PlaylistGenerator<'a, C: CatalogClient + ?Sized> {
    client: &'a C,
    settings: GeneratorSettings,
    current_year: i32,
}

impl<'a, C: CatalogClient + ?Sized> PlaylistGenerator<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self::with_settings(client, GeneratorSettings::default())
    }

    pub fn with_settings(client: &'a C, settings: GeneratorSettings) -> Self {
        Self {
            client,
            settings,
            current_year: chrono::Local::now().year(),
        }
    }

    /// Pin the year the mood estimator measures track age against
    pub fn with_current_year(mut self, year: i32) -> Self {
        self.current_year = year;
        self
    }

    /// Assemble a playlist for the given preferences.
    ///
    /// Candidates come from the pinned tracks, each artist's top tracks, a
    /// search per genre and, if those yield too little, one generic search.
    /// Decade, popularity and mood filters are then applied in that order,
    /// each one dropped again if it would leave fewer than
    /// `relaxation_floor` distinct tracks. Pinned tracks pass every filter
    /// and lead the result.
    pub fn generate(&self, preferences: &Preferences) -> Result<Vec<Track>, GenerationError> {
        let preferences = preferences.normalized()?;
        if preferences.is_empty_query() {
            return Err(GenerationError::EmptyQuery);
        }

        let pinned: HashSet<String> = preferences.tracks.iter().map(|t| t.id.clone()).collect();
        let mut pool: Vec<Track> = preferences.tracks.clone();

        for artist in &preferences.artists {
            let outcome = self
                .client
                .artist_top_tracks(&artist.id, &preferences.market);
            self.collect(&mut pool, &format!("artist {}", artist.id), outcome)?;
        }

        for genre in &preferences.genres {
            let outcome = self
                .client
                .search_tracks(&format!("genre:\"{genre}\""), self.settings.genre_search_limit);
            self.collect(&mut pool, &format!("genre {genre}"), outcome)?;
        }

        let requested_discovery = !preferences.genres.is_empty() || !preferences.artists.is_empty();
        if pool.len() < self.settings.fallback_threshold && requested_discovery {
            let query = preferences
                .genres
                .first()
                .map(String::as_str)
                .unwrap_or("popular");
            log::info!(
                "[Generator] Only {} candidates, running fallback search '{}'",
                pool.len(),
                query
            );
            let outcome = self
                .client
                .search_tracks(query, self.settings.fallback_search_limit);
            self.collect(&mut pool, "fallback search", outcome)?;
        }

        if !preferences.decades.is_empty() {
            let filtered = TrackFilters::by_decade(&pool, &pinned, &preferences.decades);
            pool = self.apply_soft_filter("decade", pool, filtered);
        }

        if !preferences.popularity.is_unrestricted() {
            let filtered = TrackFilters::by_popularity(&pool, &pinned, preferences.popularity);
            pool = self.apply_soft_filter("popularity", pool, filtered);
        }

        if let Some(mood) = &preferences.mood {
            let targets = mood.targets();
            if targets.is_empty() {
                log::debug!("[Generator] Mood has no populated axis, nothing to filter");
            } else {
                if self.settings.use_audio_features {
                    self.attach_audio_features(&mut pool, &pinned)?;
                }
                let filtered = TrackFilters::by_mood(
                    &pool,
                    &pinned,
                    &targets,
                    self.settings.mood_tolerance,
                    self.current_year,
                );
                pool = self.apply_soft_filter("mood", pool, filtered);
            }
        }

        let playlist = self.dedupe_and_truncate(&preferences.tracks, pool);
        if playlist.is_empty() {
            return Err(GenerationError::NoResults);
        }

        log::info!(
            "[Generator] Generated {} tracks ({} pinned)",
            playlist.len(),
            pinned.len()
        );
        Ok(playlist)
    }

    /// Append one discovery call's tracks, or log and skip it.
    /// Only credential failures abort the run.
    fn collect(
        &self,
        pool: &mut Vec<Track>,
        source: &str,
        outcome: Result<Vec<Track>, CatalogError>,
    ) -> Result<(), GenerationError> {
        match outcome {
            Ok(tracks) => {
                let before = pool.len();
                // Tracks without an id cannot be deduplicated or saved
                pool.extend(tracks.into_iter().filter(|t| !t.id.is_empty()));
                log::debug!("[Generator] {} added {} candidates", source, pool.len() - before);
                Ok(())
            }
            Err(CatalogError::Auth(e)) => Err(GenerationError::AuthFailure(e)),
            Err(e) => {
                log::warn!("[Generator] Skipping {}: {}", source, e);
                Ok(())
            }
        }
    }

    fn apply_soft_filter(&self, name: &str, before: Vec<Track>, filtered: Vec<Track>) -> Vec<Track> {
        let before_len = TrackFilters::distinct_count(&before);
        let filtered_len = TrackFilters::distinct_count(&filtered);
        let (pool, applied) = TrackFilters::relax(before, filtered, self.settings.relaxation_floor);
        if applied {
            log::info!(
                "[Generator] {} filter kept {}/{} candidates",
                name,
                filtered_len,
                before_len
            );
        } else {
            log::info!(
                "[Generator] {} filter too restrictive ({}/{} candidates), ignoring it",
                name,
                filtered_len,
                before_len
            );
        }
        pool
    }

    /// Fetch measured features for unpinned tracks that lack them.
    ///
    /// A failed batch stops further fetching; the tracks left without
    /// features are judged by the metadata estimate instead.
    fn attach_audio_features(&self, pool: &mut [Track], pinned: &HashSet<String>) -> Result<(), GenerationError> {
        let mut seen = HashSet::new();
        let ids: Vec<String> = pool
            .iter()
            .filter(|t| t.audio_features.is_none() && !pinned.contains(&t.id))
            .filter(|t| seen.insert(t.id.clone()))
            .map(|t| t.id.clone())
            .collect();

        let mut found: HashMap<String, AudioFeatures> = HashMap::new();
        for batch in ids.chunks(self.settings.audio_feature_batch.max(1)) {
            match self.client.audio_features(batch) {
                Ok(features) => {
                    for (id, entry) in batch.iter().zip(features) {
                        if let Some(features) = entry {
                            found.insert(id.clone(), features);
                        }
                    }
                }
                Err(CatalogError::Auth(e)) => return Err(GenerationError::AuthFailure(e)),
                Err(e) => {
                    log::warn!(
                        "[Generator] Audio features unavailable ({}), estimating from metadata",
                        e
                    );
                    break;
                }
            }
        }

        log::debug!(
            "[Generator] Measured features for {}/{} candidates",
            found.len(),
            ids.len()
        );
        for track in pool.iter_mut() {
            if let Some(features) = found.get(&track.id) {
                track.audio_features = Some(*features);
            }
        }
        Ok(())
    }

    /// Pinned tracks first, then the pool in discovery order, unique by id
    fn dedupe_and_truncate(&self, pinned_tracks: &[Track], pool: Vec<Track>) -> Vec<Track> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut playlist = Vec::with_capacity(self.settings.max_tracks);

        for track in pinned_tracks.iter().cloned().chain(pool) {
            if playlist.len() >= self.settings.max_tracks {
                break;
            }
            if seen.insert(track.id.clone()) {
                playlist.push(track);
            }
        }
        playlist
    }
}
