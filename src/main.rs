use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

mod auth;
mod client;
mod config;
mod error;
mod models;
mod playlist;
mod store;

#[cfg(test)]
mod playlist_tests;

use crate::client::{CatalogClient, SpotifyClient};
use crate::config::{Config, load_config};
use crate::models::{Artist, Track};
use crate::playlist::{
    AVAILABLE_GENRES, GeneratorSettings, Mood, PlaylistGenerator, PopularityRange, Preferences,
};
use crate::store::Store;

#[derive(Parser)]
#[command(name = "playlist-curator")]
#[command(about = "Build Spotify playlists from seed artists, tracks, genres and filters")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Quiet mode - only log warnings and errors
    #[arg(short = 'q', long = "quiet", global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a playlist and optionally save it to the account
    Generate(GenerateArgs),
    /// Search the catalog
    Search {
        #[arg(value_enum)]
        kind: SearchKind,
        query: String,
        #[arg(short = 'l', long = "limit", default_value_t = 10)]
        limit: u32,
    },
    /// List the genres accepted by --genre
    Genres,
    /// Manage favorite tracks
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },
    /// Inspect saved playlists
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
}

#[derive(clap::Args)]
struct GenerateArgs {
    /// Preferences JSON file; flags below are added on top of it
    #[arg(short = 'p', long = "preferences")]
    preferences: Option<String>,

    /// Seed artist id (repeatable)
    #[arg(long = "artist")]
    artists: Vec<String>,

    /// Pinned track id (repeatable)
    #[arg(long = "track")]
    tracks: Vec<String>,

    /// Genre to search (repeatable)
    #[arg(long = "genre")]
    genres: Vec<String>,

    /// Decade start year such as 1990 (repeatable)
    #[arg(long = "decade")]
    decades: Vec<String>,

    /// Inclusive popularity window, e.g. 20-80
    #[arg(long = "popularity")]
    popularity: Option<String>,

    /// Mood preset (happy, sad, energetic, calm) or targets like "energy=0.8,valence=0.2-0.6"
    #[arg(long = "mood")]
    mood: Option<String>,

    /// Market code for artist top tracks
    #[arg(long = "market")]
    market: Option<String>,

    /// Skip the audio-features lookup and estimate mood from metadata only
    #[arg(long = "no-audio-features")]
    no_audio_features: bool,

    /// Save the result as a private playlist with this name
    #[arg(short = 's', long = "save")]
    save: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum SearchKind {
    Tracks,
    Artists,
}

#[derive(Subcommand)]
enum FavoritesAction {
    List,
    /// Toggle a track in the favorites
    Add { track_id: String },
    Remove { track_id: String },
}

#[derive(Subcommand)]
enum HistoryAction {
    List,
    /// Print the tracks of a saved playlist
    Show { entry_id: String },
    Remove { entry_id: String },
    /// Drop one track from a saved playlist
    RemoveTrack { entry_id: String, track_id: String },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let config = load_config()?;
    let store = Store::new(&config.store_path);

    match args.command {
        Command::Generate(generate) => run_generate(&config, &store, generate),
        Command::Search { kind, query, limit } => {
            let client = connect(&config)?;
            match kind {
                SearchKind::Tracks => {
                    let tracks = client.search_tracks(&query, limit)?;
                    print_tracks(&tracks);
                }
                SearchKind::Artists => {
                    for artist in client.search_artists(&query, limit)? {
                        let genres = if artist.genres.is_empty() {
                            String::new()
                        } else {
                            format!(" | {}", artist.genres.join(", "))
                        };
                        println!("{}  {}{}", artist.id, artist.name, genres);
                    }
                }
            }
            Ok(())
        }
        Command::Genres => {
            for genre in AVAILABLE_GENRES {
                println!("{genre}");
            }
            Ok(())
        }
        Command::Favorites { action } => run_favorites(&config, &store, action),
        Command::History { action } => run_history(&store, action),
    }
}

fn connect(config: &Config) -> Result<SpotifyClient> {
    let agent = SpotifyClient::agent_for(config);
    let credentials = auth::provider_from_config(config, agent.clone())
        .context("No usable Spotify credentials; set SPOTIFY_ACCESS_TOKEN or client credentials")?;
    Ok(SpotifyClient::new(agent, config.api_url.clone(), credentials))
}

fn run_generate(config: &Config, store: &Store, args: GenerateArgs) -> Result<()> {
    let mut preferences = match &args.preferences {
        Some(path) => Preferences::load_from_file(path)?,
        None => Preferences::default(),
    };

    if let Some(market) = args.market {
        preferences.market = Some(market);
    }
    preferences.fill_market(&config.market);
    preferences
        .artists
        .extend(args.artists.into_iter().map(|id| Artist {
            id,
            name: String::new(),
            genres: Vec::new(),
            popularity: None,
        }));
    preferences.genres.extend(args.genres);
    preferences.decades.extend(args.decades);
    if let Some(raw) = &args.popularity {
        preferences.popularity = PopularityRange::parse(raw)?;
    }
    if let Some(raw) = &args.mood {
        preferences.mood = Some(Mood::parse(raw)?);
    }

    let client = connect(config)?;

    if !args.tracks.is_empty() {
        let resolved = client
            .tracks(&args.tracks)
            .context("Failed to look up pinned tracks")?;
        for id in &args.tracks {
            if !resolved.iter().any(|t| &t.id == id) {
                log::warn!("[Generate] Pinned track {id} was not found in the catalog");
            }
        }
        preferences.tracks.extend(resolved);
    }

    let settings = GeneratorSettings {
        use_audio_features: !args.no_audio_features,
        ..GeneratorSettings::default()
    };
    let generator = PlaylistGenerator::with_settings(&client, settings);
    let tracks = generator.generate(&preferences)?;

    println!("\n=== GENERATED PLAYLIST ({} tracks) ===", tracks.len());
    print_tracks(&tracks);

    if let Some(name) = args.save {
        let uris: Vec<String> = tracks.iter().map(Track::uri).collect();
        println!("\nSaving playlist '{name}'...");
        let playlist = client
            .create_playlist(&name, &uris)
            .with_context(|| format!("Failed to create playlist '{name}'"))?;
        let url = playlist.external_urls.spotify.as_deref().unwrap_or(&playlist.uri);
        println!("✓ Created '{}' ({}): {url}", playlist.name, playlist.id);

        let entry = store.record_playlist(&name, &tracks, Some(&playlist))?;
        log::info!("[History] Recorded entry {} in {}", entry.id, store.path().display());
    }

    Ok(())
}

fn run_favorites(config: &Config, store: &Store, action: FavoritesAction) -> Result<()> {
    match action {
        FavoritesAction::List => {
            let library = store.load()?;
            if library.favorites.is_empty() {
                println!("No favorites yet.");
            }
            print_tracks(&library.favorites);
        }
        FavoritesAction::Add { track_id } => {
            let client = connect(config)?;
            let track = client
                .tracks(std::slice::from_ref(&track_id))?
                .into_iter()
                .next()
                .with_context(|| format!("Track {track_id} not found"))?;
            let name = track.name.clone();
            if store.toggle_favorite(track)? {
                println!("★ Added \"{name}\" to favorites");
            } else {
                println!("☆ Removed \"{name}\" from favorites");
            }
        }
        FavoritesAction::Remove { track_id } => {
            if store.remove_favorite(&track_id)? {
                println!("Removed {track_id} from favorites");
            } else {
                println!("{track_id} is not a favorite");
            }
        }
    }
    Ok(())
}

fn run_history(store: &Store, action: HistoryAction) -> Result<()> {
    match action {
        HistoryAction::List => {
            let library = store.load()?;
            if library.history.is_empty() {
                println!("No saved playlists yet.");
            }
            for entry in library.history.iter().rev() {
                println!(
                    "{}  {} | {} tracks | {}",
                    entry.id,
                    entry.name,
                    entry.tracks.len(),
                    entry.created_at.format("%Y-%m-%d %H:%M")
                );
                if let Some(url) = &entry.playlist_url {
                    println!("     {url}");
                }
            }
        }
        HistoryAction::Show { entry_id } => {
            let entry = store
                .history_entry(&entry_id)?
                .with_context(|| format!("No history entry {entry_id}"))?;
            println!(
                "\n=== {} ({} tracks, saved {}) ===",
                entry.name,
                entry.tracks.len(),
                entry.created_at.format("%Y-%m-%d %H:%M")
            );
            if let Some(url) = &entry.playlist_url {
                println!("{url}");
            }
            print_tracks(&entry.tracks);
        }
        HistoryAction::RemoveTrack { entry_id, track_id } => {
            match store.remove_history_track(&entry_id, &track_id)? {
                Some(true) => println!("Removed {track_id} from history entry {entry_id}"),
                Some(false) => println!("{track_id} is not in history entry {entry_id}"),
                None => println!("No history entry {entry_id}"),
            }
        }
        HistoryAction::Remove { entry_id } => {
            if store.remove_history(&entry_id)? {
                println!("Removed history entry {entry_id}");
            } else {
                println!("No history entry {entry_id}");
            }
        }
    }
    Ok(())
}

fn print_tracks(tracks: &[Track]) {
    for (i, track) in tracks.iter().enumerate() {
        let year_display = track
            .release_year()
            .map(|y| format!(" [{y}]"))
            .unwrap_or_default();
        let seconds = track.duration_ms / 1000;
        println!(
            "  {:>2}. \"{}\" by {}{} {}:{:02} (pop {})",
            i + 1,
            track.name,
            track.artist_names().join(", "),
            year_display,
            seconds / 60,
            seconds % 60,
            track.popularity
        );
        match track.cover_url() {
            Some(cover) => println!("      {} | {}", track.uri(), cover),
            None => println!("      {}", track.uri()),
        }
    }
}
