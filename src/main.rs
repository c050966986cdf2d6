use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use spotify2youtube::converter::preview::{PREVIEW_DELAY, PREVIEW_TRACKS};
use spotify2youtube::converter::report::{self, RESULTS_DIR};
use spotify2youtube::converter::{ConversionEvent, RunState, preview_matches};
use spotify2youtube::spotify::parse_playlist_id;
use spotify2youtube::{
    Config, ConversionOrchestrator, Credential, CredentialStore, Platform, SpotifyClient,
    TrackMatcher, YouTubeClient,
};

#[derive(Parser)]
#[command(name = "spotify2youtube")]
#[command(about = "Convert Spotify playlists into YouTube playlists")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store an access token obtained from a platform's OAuth flow
    Login {
        /// Platform the token belongs to
        #[arg(value_enum)]
        platform: Platform,

        /// OAuth access token
        #[arg(long)]
        access_token: String,

        /// OAuth refresh token, used to renew expired YouTube tokens
        #[arg(long)]
        refresh_token: Option<String>,

        /// Seconds until the access token expires
        #[arg(long)]
        expires_in: Option<u64>,
    },

    /// Forget the stored token for a platform
    Logout {
        #[arg(value_enum)]
        platform: Platform,
    },

    /// Show which platforms are connected and test the YouTube token
    Status,

    /// List your Spotify playlists
    ListPlaylists,

    /// Search YouTube for the first few tracks of a playlist without creating anything
    Preview {
        /// Spotify playlist URL, URI or ID
        playlist: String,
    },

    /// Convert a Spotify playlist into a new private YouTube playlist
    Convert {
        /// Spotify playlist URL, URI or ID
        playlist: String,

        /// Name to use instead of the Spotify playlist name
        #[arg(long)]
        name: Option<String>,

        /// Do not write the results file
        #[arg(long)]
        no_save: bool,
    },

    /// Show setup guide
    Setup,
}

fn setup_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose);

    match cli.command {
        Commands::Login {
            platform,
            access_token,
            refresh_token,
            expires_in,
        } => {
            login(platform, access_token, refresh_token, expires_in)?;
        }
        Commands::Logout { platform } => {
            logout(platform)?;
        }
        Commands::Status => {
            status().await?;
        }
        Commands::ListPlaylists => {
            list_playlists().await?;
        }
        Commands::Preview { playlist } => {
            preview(&playlist).await?;
        }
        Commands::Convert {
            playlist,
            name,
            no_save,
        } => {
            convert(&playlist, name, !no_save).await?;
        }
        Commands::Setup => {
            show_setup_guide();
        }
    }

    Ok(())
}

fn load_config() -> Result<Config> {
    Config::from_env().context("Failed to load configuration")
}

fn open_store(config: &Config) -> Result<CredentialStore> {
    CredentialStore::with_cache_file(&config.credentials_path).with_context(|| {
        format!(
            "Failed to open credential cache {}",
            config.credentials_path.display()
        )
    })
}

fn require_youtube_config(config: &Config) {
    let missing = config.get_missing_config();
    if !missing.is_empty() {
        println!("{}", "Missing configuration:".red());
        for item in &missing {
            println!("   - {}", item);
        }
        println!(
            "\n{}",
            "Please copy .env.example to .env and fill in your credentials.".yellow()
        );
        std::process::exit(1);
    }
}

fn require_login(store: &CredentialStore, platform: Platform) {
    if !store.is_authenticated(platform) {
        println!("{}", format!("Not connected to {}", platform).red());
        println!(
            "Run: spotify2youtube login {} --access-token <TOKEN>",
            platform.to_string().to_lowercase()
        );
        std::process::exit(1);
    }
}

fn login(
    platform: Platform,
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
) -> Result<()> {
    if access_token.trim().is_empty() {
        bail!("Access token must not be empty");
    }

    let config = load_config()?;
    let store = open_store(&config)?;

    store.set(
        platform,
        Credential::from_grant(access_token.trim(), refresh_token, expires_in),
    );

    println!("{}", format!("Connected to {}", platform).green());
    Ok(())
}

fn logout(platform: Platform) -> Result<()> {
    let config = load_config()?;
    let store = open_store(&config)?;

    store.clear(platform);

    println!("{}", format!("Disconnected from {}", platform).yellow());
    Ok(())
}

async fn status() -> Result<()> {
    println!("{}", "Connection Status".cyan().bold());
    println!("{}", "=".repeat(50));

    let config = load_config()?;
    let store = open_store(&config)?;

    for platform in [Platform::Spotify, Platform::YouTube] {
        match store.get(platform) {
            Some(credential) if store.is_authenticated(platform) => {
                let expiry = match credential.expires_at {
                    Some(_) if credential.is_expired() => "token expired".yellow().to_string(),
                    Some(at) => format!("expires {}", at.format("%Y-%m-%d %H:%M UTC")),
                    None => "no expiry recorded".to_string(),
                };
                println!("{}: {} ({})", platform, "connected".green(), expiry);
            }
            _ => println!("{}: {}", platform, "not connected".red()),
        }
    }

    if store.is_authenticated(Platform::YouTube) {
        let youtube = YouTubeClient::from_config(&config, store.clone());
        match youtube.check_token().await {
            Ok(channel) => println!(
                "\n{} {}",
                "YouTube token is valid for channel:".green(),
                channel.title
            ),
            Err(e) => println!("\n{} {}", "YouTube token error:".red(), e),
        }
    }

    Ok(())
}

async fn list_playlists() -> Result<()> {
    println!("{}", "Your Spotify Playlists".cyan().bold());
    println!("{}", "=".repeat(50));

    let config = load_config()?;
    let store = open_store(&config)?;
    require_login(&store, Platform::Spotify);

    let spotify_client = SpotifyClient::new(&store).context("Failed to connect to Spotify")?;

    let playlists = spotify_client
        .user_playlists()
        .await
        .context("Failed to fetch playlists")?;

    if playlists.is_empty() {
        println!("{}", "No playlists found".yellow());
        return Ok(());
    }

    for (i, playlist) in playlists.iter().enumerate() {
        println!(
            "{:2}. {} ({} tracks, by {})",
            i + 1,
            playlist.name.green(),
            playlist.total_tracks,
            playlist.owner
        );
        println!("     {}", playlist.id.cyan());
    }

    println!("\n{}", format!("Total: {} playlists", playlists.len()).cyan());

    Ok(())
}

async fn preview(playlist_ref: &str) -> Result<()> {
    println!("{}", "YouTube Search Preview".cyan().bold());
    println!("{}", "=".repeat(50));

    let config = load_config()?;
    let store = open_store(&config)?;
    require_login(&store, Platform::Spotify);
    require_login(&store, Platform::YouTube);

    let playlist_id = parse_playlist_id(playlist_ref)?;
    let spotify_client = SpotifyClient::new(&store).context("Failed to connect to Spotify")?;
    let playlist = spotify_client
        .playlist(&playlist_id)
        .await
        .context("Failed to fetch playlist")?;

    let matcher = TrackMatcher::new(YouTubeClient::from_config(&config, store.clone()));
    let results =
        preview_matches(&matcher, &playlist.tracks, PREVIEW_TRACKS, PREVIEW_DELAY).await;

    for result in &results {
        println!("Original: {}", result.original);
        match &result.found {
            Some(title) => println!("Found:    {}", title.green()),
            None => println!("Found:    {}", "Not found".red()),
        }
        println!();
    }

    Ok(())
}

async fn convert(playlist_ref: &str, name: Option<String>, save: bool) -> Result<()> {
    println!("{}", "Spotify to YouTube Playlist Converter".cyan().bold());
    println!("{}", "=".repeat(50));

    let config = load_config()?;
    require_youtube_config(&config);

    let store = open_store(&config)?;
    require_login(&store, Platform::Spotify);
    require_login(&store, Platform::YouTube);

    let playlist_id = parse_playlist_id(playlist_ref)?;
    let spotify_client = SpotifyClient::new(&store).context("Failed to connect to Spotify")?;
    let mut playlist = spotify_client
        .playlist(&playlist_id)
        .await
        .context("Failed to fetch playlist")?;

    if let Some(name) = name {
        playlist.name = name;
    }

    println!("Converting: {}", playlist.name.green());
    println!("Found {} tracks\n", playlist.tracks.len());

    let youtube = YouTubeClient::from_config(&config, store.clone());
    let orchestrator = ConversionOrchestrator::new(youtube, config.conversion_policy());

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_cancel.cancel();
        }
    });

    let renderer = tokio::spawn(render_progress(orchestrator.subscribe()));

    let run = match orchestrator.convert(&playlist, &cancel).await {
        Ok(run) => {
            renderer.await.ok();
            run
        }
        Err(e) => {
            renderer.abort();
            return Err(e).context("Could not start conversion");
        }
    };

    report::print_summary(&run);

    if save {
        report::save_run(&run, Path::new(RESULTS_DIR)).context("Failed to save results")?;
        println!(
            "\n{}",
            format!("Results saved to {}/", RESULTS_DIR).yellow()
        );
    }

    if run.state == RunState::Aborted {
        bail!("Conversion did not complete");
    }

    println!("\n{}", "Conversion completed!".green());
    Ok(())
}

async fn render_progress(mut events: broadcast::Receiver<ConversionEvent>) {
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    loop {
        match events.recv().await {
            Ok(ConversionEvent::Started { source_name, .. }) => {
                pb.set_message(format!("Creating playlist for {}", source_name));
            }
            Ok(ConversionEvent::PlaylistCreated { playlist_id }) => {
                pb.println(format!(
                    "Created playlist: {}",
                    report::playlist_url(&playlist_id)
                ));
            }
            Ok(ConversionEvent::TrackFinished {
                outcome,
                progress_percent,
                ..
            }) => {
                pb.set_position(u64::from(progress_percent));
                pb.set_message(format!("{} ({})", outcome.source_query, outcome.status));
            }
            Ok(ConversionEvent::Completed) => {
                pb.finish_with_message("Conversion complete");
                break;
            }
            Ok(ConversionEvent::Aborted { error }) => {
                pb.abandon_with_message(error);
                break;
            }
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => {
                pb.finish_and_clear();
                break;
            }
        }
    }
}

fn show_setup_guide() {
    println!("{}", "Spotify to YouTube Converter Setup Guide".cyan().bold());
    println!("{}", "=".repeat(50));

    println!("\n{}", "1. Spotify Access".yellow());
    println!("   - Go to https://developer.spotify.com/dashboard/ and create an app");
    println!("   - Authorize with scopes playlist-read-private and playlist-read-collaborative");
    println!("   - Store the access token: spotify2youtube login spotify --access-token <TOKEN>");

    println!("\n{}", "2. YouTube Access".yellow());
    println!("   - Go to https://console.cloud.google.com/ and enable the YouTube Data API v3");
    println!("   - Create an OAuth client and authorize the https://www.googleapis.com/auth/youtube scope");
    println!("   - Store the tokens:");
    println!("     spotify2youtube login youtube --access-token <TOKEN> --refresh-token <REFRESH> --expires-in 3599");

    println!("\n{}", "3. Configuration".yellow());
    println!("   - Create a .env file with:");
    println!("     YOUTUBE_CLIENT_ID=your_google_client_id");
    println!("     YOUTUBE_CLIENT_SECRET=your_google_client_secret");
    println!("     YOUTUBE_API_KEY=optional_api_key");
    println!("     CONVERSION_TRACK_DELAY_MS=500");

    println!("\n{}", "4. Usage".yellow());
    println!("   - spotify2youtube status                  (check connections)");
    println!("   - spotify2youtube list-playlists          (to see your playlists)");
    println!("   - spotify2youtube preview <PLAYLIST>      (test search on 3 tracks)");
    println!("   - spotify2youtube convert <PLAYLIST>      (to perform conversion)");

    println!("\n{}", "Ready to start converting!".green());
}
