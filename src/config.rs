use anyhow::{Context, Result};

const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub token_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub market: String,
    pub store_path: String,
    pub http_timeout_secs: u64,
}

/// Load configuration from `.env` and environment
pub fn load_config() -> Result<Config> {
    // Load `.env` file if present
    dotenv::dotenv().ok();
    from_lookup(|key| std::env::var(key).ok())
}

fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config> {
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let http_timeout_secs = match non_empty("CURATOR_HTTP_TIMEOUT_SECS") {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("CURATOR_HTTP_TIMEOUT_SECS is not a number: {raw}"))?,
        None => 15,
    };

    Ok(Config {
        api_url: non_empty("SPOTIFY_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        token_url: non_empty("SPOTIFY_TOKEN_URL").unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
        client_id: non_empty("SPOTIFY_CLIENT_ID"),
        client_secret: non_empty("SPOTIFY_CLIENT_SECRET"),
        access_token: non_empty("SPOTIFY_ACCESS_TOKEN"),
        refresh_token: non_empty("SPOTIFY_REFRESH_TOKEN"),
        market: non_empty("SPOTIFY_MARKET").unwrap_or_else(|| "US".to_string()),
        store_path: non_empty("CURATOR_STORE").unwrap_or_else(|| "curator.json".to_string()),
        http_timeout_secs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.token_url, DEFAULT_TOKEN_URL);
        assert_eq!(config.market, "US");
        assert_eq!(config.store_path, "curator.json");
        assert_eq!(config.http_timeout_secs, 15);
        assert!(config.access_token.is_none());
    }

    #[test]
    fn test_blank_values_are_treated_as_unset() {
        let config = from_lookup(lookup_from(&[
            ("SPOTIFY_ACCESS_TOKEN", "  "),
            ("SPOTIFY_MARKET", "ES"),
        ]))
        .unwrap();
        assert!(config.access_token.is_none());
        assert_eq!(config.market, "ES");
    }

    #[test]
    fn test_invalid_timeout_is_rejected() {
        let result = from_lookup(lookup_from(&[("CURATOR_HTTP_TIMEOUT_SECS", "soon")]));
        assert!(result.is_err());
    }
}
