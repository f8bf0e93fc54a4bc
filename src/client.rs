use crate::auth::CredentialProvider;
use crate::config::Config;
use crate::error::CatalogError;
use crate::models::{
    AddTracksRequest, Artist, AudioFeatures, AudioFeaturesResponse, CreatePlaylistRequest,
    CurrentUser, PlaylistRef, SearchResponse, SeveralTracksResponse, SnapshotResponse,
    TopTracksResponse, Track,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use ureq::Agent;
use urlencoding::encode;

/// Most URIs the playlist endpoint accepts per request
pub const MAX_URIS_PER_APPEND: usize = 100;

/// Most ids the several-tracks endpoint accepts per request
const MAX_IDS_PER_TRACK_LOOKUP: usize = 50;

/// The catalog operations the playlist generator depends on
#[cfg_attr(test, mockall::automock)]
pub trait CatalogClient {
    /// Top tracks of an artist in the given market
    fn artist_top_tracks(&self, artist_id: &str, market: &str) -> Result<Vec<Track>, CatalogError>;

    /// Free-text track search, at most `limit` results
    fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<Track>, CatalogError>;

    /// Audio features matched by position to `track_ids`; `None` where unavailable
    fn audio_features(&self, track_ids: &[String]) -> Result<Vec<Option<AudioFeatures>>, CatalogError>;

    /// Create a private playlist in the current account holding `track_uris`
    fn create_playlist(&self, name: &str, track_uris: &[String]) -> Result<PlaylistRef, CatalogError>;
}

/// A blocking Spotify Web API client using bearer credentials
pub struct SpotifyClient {
    agent: Agent,
    base_url: String,
    credentials: Box<dyn CredentialProvider>,
}

impl SpotifyClient {
    pub fn new(agent: Agent, base_url: String, credentials: Box<dyn CredentialProvider>) -> Self {
        SpotifyClient {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    /// Build the shared HTTP agent with the configured timeout
    pub fn agent_for(config: &Config) -> Agent {
        ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, CatalogError> {
        self.send(path, |agent, url, token| {
            agent
                .get(url)
                .set("Authorization", &format!("Bearer {token}"))
                .call()
        })
    }

    fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, CatalogError> {
        let payload =
            serde_json::to_value(body).map_err(|e| CatalogError::Parse(e.to_string()))?;
        self.send(path, |agent, url, token| {
            agent
                .post(url)
                .set("Authorization", &format!("Bearer {token}"))
                .send_json(payload.clone())
        })
    }

    /// Issue a request, retrying once with a fresh token after a 401
    fn send<T, F>(&self, path: &str, request: F) -> Result<T, CatalogError>
    where
        T: DeserializeOwned,
        F: Fn(&Agent, &str, &str) -> Result<ureq::Response, ureq::Error>,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut retried = false;

        loop {
            let token = self.credentials.bearer_token()?;
            match request(&self.agent, &url, &token) {
                Ok(response) => {
                    return response
                        .into_json::<T>()
                        .map_err(|e| CatalogError::Parse(format!("{path}: {e}")));
                }
                Err(ureq::Error::Status(401, _)) if !retried => {
                    log::debug!("Catalog rejected token for {path}, refreshing");
                    self.credentials.invalidate();
                    retried = true;
                }
                Err(ureq::Error::Status(status, response)) => {
                    let body = response.into_string().unwrap_or_default();
                    return Err(CatalogError::Status { status, body });
                }
                Err(e) => return Err(CatalogError::Transport(e.to_string())),
            }
        }
    }

    /// Search artists by name, used to resolve pinned artists
    pub fn search_artists(&self, query: &str, limit: u32) -> Result<Vec<Artist>, CatalogError> {
        let response: SearchResponse = self.get(&format!(
            "/search?q={}&type=artist&limit={}",
            encode(query),
            limit
        ))?;
        Ok(response.artists.map(|page| page.items).unwrap_or_default())
    }

    /// Look up full tracks by id, skipping ids the catalog does not know
    pub fn tracks(&self, ids: &[String]) -> Result<Vec<Track>, CatalogError> {
        let mut found = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(MAX_IDS_PER_TRACK_LOOKUP) {
            let response: SeveralTracksResponse =
                self.get(&format!("/tracks?ids={}", encode(&chunk.join(","))))?;
            found.extend(response.tracks.into_iter().flatten());
        }
        Ok(found)
    }

    fn current_user(&self) -> Result<CurrentUser, CatalogError> {
        self.get("/me")
    }
}

impl CatalogClient for SpotifyClient {
    fn artist_top_tracks(&self, artist_id: &str, market: &str) -> Result<Vec<Track>, CatalogError> {
        let response: TopTracksResponse = self.get(&format!(
            "/artists/{}/top-tracks?market={}",
            encode(artist_id),
            encode(market)
        ))?;
        Ok(response.tracks)
    }

    fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<Track>, CatalogError> {
        let response: SearchResponse = self.get(&format!(
            "/search?q={}&type=track&limit={}",
            encode(query),
            limit
        ))?;
        Ok(response.tracks.map(|page| page.items).unwrap_or_default())
    }

    fn audio_features(&self, track_ids: &[String]) -> Result<Vec<Option<AudioFeatures>>, CatalogError> {
        if track_ids.is_empty() {
            return Ok(Vec::new());
        }
        let response: AudioFeaturesResponse =
            self.get(&format!("/audio-features?ids={}", encode(&track_ids.join(","))))?;
        Ok(match_features_to_ids(track_ids, response))
    }

    fn create_playlist(&self, name: &str, track_uris: &[String]) -> Result<PlaylistRef, CatalogError> {
        let user = self.current_user()?;
        log::info!(
            "Creating playlist '{}' for user {} with {} tracks",
            name,
            user.display_name.as_deref().unwrap_or(&user.id),
            track_uris.len()
        );

        let playlist: PlaylistRef = self.post(
            &format!("/users/{}/playlists", encode(&user.id)),
            &CreatePlaylistRequest {
                name: name.to_string(),
                description: "Generated by playlist-curator".to_string(),
                public: false,
            },
        )?;

        for (index, chunk) in append_batches(track_uris).enumerate() {
            let snapshot: SnapshotResponse = self.post(
                &format!("/playlists/{}/tracks", encode(&playlist.id)),
                &AddTracksRequest { uris: chunk.to_vec() },
            )?;
            log::debug!(
                "Appended batch {} ({} tracks) to playlist {}, snapshot {}",
                index + 1,
                chunk.len(),
                playlist.id,
                snapshot.snapshot_id
            );
        }

        Ok(playlist)
    }
}

/// Split URIs into appends the playlist endpoint accepts
pub fn append_batches(track_uris: &[String]) -> std::slice::Chunks<'_, String> {
    track_uris.chunks(MAX_URIS_PER_APPEND)
}

/// Line features up with the requested ids; unmatched or null entries become `None`
fn match_features_to_ids(
    track_ids: &[String],
    response: AudioFeaturesResponse,
) -> Vec<Option<AudioFeatures>> {
    let entries: Vec<_> = response.audio_features.into_iter().flatten().collect();
    track_ids
        .iter()
        .map(|id| {
            entries
                .iter()
                .find(|entry| &entry.id == id)
                .map(|entry| entry.features)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_batches_respect_endpoint_limit() {
        let uris: Vec<String> = (0..250).map(|i| format!("spotify:track:{i}")).collect();
        let sizes: Vec<usize> = append_batches(&uris).map(|chunk| chunk.len()).collect();
        assert_eq!(sizes, vec![100, 100, 50]);
        assert_eq!(append_batches(&[]).count(), 0);
    }

    #[test]
    fn test_features_matched_by_id_with_nulls() {
        let response: AudioFeaturesResponse = serde_json::from_str(
            r#"{"audio_features": [
                {"id": "b", "energy": 0.9, "valence": 0.1, "danceability": 0.3, "acousticness": 0.2},
                null
            ]}"#,
        )
        .unwrap();
        let ids = vec!["a".to_string(), "b".to_string()];
        let matched = match_features_to_ids(&ids, response);
        assert_eq!(matched.len(), 2);
        assert!(matched[0].is_none());
        assert_eq!(matched[1].map(|f| f.energy), Some(0.9));
    }

    #[test]
    fn test_auth_failure_surfaces_before_network() {
        struct NoSession;
        impl CredentialProvider for NoSession {
            fn bearer_token(&self) -> Result<String, crate::error::AuthError> {
                Err(crate::error::AuthError::NoSession("logged out".to_string()))
            }
        }

        let client = SpotifyClient::new(
            Agent::new(),
            "http://127.0.0.1:9/v1/".to_string(),
            Box::new(NoSession),
        );
        let err = client.search_tracks("genre:\"jazz\"", 20).unwrap_err();
        assert!(matches!(err, CatalogError::Auth(_)));
    }
}
