use thiserror::Error;

/// Failures raised by a credential provider
#[derive(Debug, Error)]
pub enum AuthError {
    /// No access token and nothing to refresh it with
    #[error("no valid session: {0}")]
    NoSession(String),

    #[error("token refresh failed: {0}")]
    RefreshFailed(String),
}

/// Failures raised by a single catalog call
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The credential provider could not supply a bearer token
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("catalog returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("catalog request failed: {0}")]
    Transport(String),

    #[error("failed to parse catalog response: {0}")]
    Parse(String),
}

/// Invalid preference input rejected before generation starts
#[derive(Debug, Error, PartialEq)]
pub enum PreferencesError {
    #[error("invalid decade marker '{0}', expected a 4-digit year such as \"1990\"")]
    InvalidDecade(String),

    #[error("invalid popularity range {min}-{max}, expected 0 <= min <= max <= 100")]
    InvalidPopularity { min: u8, max: u8 },

    #[error("invalid popularity range '{0}', expected MIN-MAX")]
    MalformedPopularity(String),

    #[error("unknown genre '{0}'")]
    UnknownGenre(String),

    #[error("unknown mood '{0}'")]
    UnknownMood(String),
}

/// Errors surfaced by `PlaylistGenerator::generate`
#[derive(Debug, Error)]
pub enum GenerationError {
    /// No pinned tracks, artists or genres to drive discovery
    #[error("select at least one genre, artist or track")]
    EmptyQuery,

    #[error("no tracks matched the given preferences")]
    NoResults,

    #[error("authentication failed: {0}")]
    AuthFailure(#[from] AuthError),

    #[error(transparent)]
    InvalidPreferences(#[from] PreferencesError),
}

/// Errors from the favorites / history store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
