/*
    spotify-features-rs | Rust CLI tool to build analytical track and artist tables.
    Copyright (C) 2025  Israel Alberto Roldan Vega

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use dotenvy::dotenv;
use features_core::config::DEFAULT_DATA_DIR;
use features_core::models::CollectSummary;
use features_core::{
    get_spotify_client, load_catalog, run, Collector, DataPaths, MarketCountMode,
    PipelineOptions, PipelineReport, SpotifyCredentials, SpotifySource,
};
use log::info;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "spotify-features")]
#[command(about = "Builds analysis-ready track and artist tables from raw Spotify catalog data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs the feature-engineering pipeline and writes artists.json, tracks.json and report.json
    Build {
        #[command(flatten)]
        data: DataArgs,

        /// Directory for the output tables (default: <data-dir>/output)
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// How the number of available markets is counted
        #[arg(long, value_enum, default_value_t = MarketCountArg::Tokens)]
        market_count: MarketCountArg,
    },
    /// Downloads the raw playlist, artist and audio-feature collections for the given playlists
    Collect {
        /// Spotify IDs of the chart playlists to collect
        #[arg(value_name = "PLAYLIST_ID", required = true)]
        playlist_ids: Vec<String>,

        /// Cap on playlists, artists and tracks fetched
        #[arg(long)]
        limit: Option<usize>,

        #[command(flatten)]
        data: DataArgs,
    },
}

#[derive(Args, Debug, Clone)]
struct DataArgs {
    /// Directory holding the raw collections
    #[arg(long, env = "FEATURES_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// Audio features file (default: <data-dir>/spotify_audio_features.json)
    #[arg(long, env = "FEATURES_AUDIO_PATH")]
    audio_features: Option<PathBuf>,

    /// Artists file (default: <data-dir>/spotify_artists.json)
    #[arg(long, env = "FEATURES_ARTISTS_PATH")]
    artists: Option<PathBuf>,

    /// Playlist tracks file (default: <data-dir>/spotify_top_50_playlists.json)
    #[arg(long, env = "FEATURES_PLAYLISTS_PATH")]
    playlists: Option<PathBuf>,

    /// Genre lookup file (default: <data-dir>/genre_lookup.json)
    #[arg(long, env = "FEATURES_GENRE_LOOKUP_PATH")]
    genre_lookup: Option<PathBuf>,
}

impl DataArgs {
    fn paths(&self) -> DataPaths {
        let mut paths =
            DataPaths::in_dir(&self.data_dir).with_genre_lookup(self.genre_lookup.clone());
        if let Some(path) = &self.audio_features {
            paths.audio_features = path.clone();
        }
        if let Some(path) = &self.artists {
            paths.artists = path.clone();
        }
        if let Some(path) = &self.playlists {
            paths.playlists = path.clone();
        }
        paths
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MarketCountArg {
    /// Comma-token count of the market list; an empty list counts as 1
    Tokens,
    /// Number of markets in the list
    Length,
}

impl From<MarketCountArg> for MarketCountMode {
    fn from(arg: MarketCountArg) -> Self {
        match arg {
            MarketCountArg::Tokens => MarketCountMode::Tokens,
            MarketCountArg::Length => MarketCountMode::Length,
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    // A missing .env file is fine.
    dotenv().ok();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Build {
            data,
            out_dir,
            market_count,
        } => {
            handle_build(data, out_dir.as_deref(), *market_count);
        }
        Commands::Collect {
            playlist_ids,
            limit,
            data,
        } => {
            handle_collect(playlist_ids, *limit, data).await;
        }
    }
}

fn handle_build(data: &DataArgs, out_dir: Option<&Path>, market_count: MarketCountArg) {
    let paths = data.paths();
    let out_dir = out_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| data.data_dir.join("output"));

    println!("Loading raw catalog from {} ...", data.data_dir.display());
    let catalog = match load_catalog(&paths) {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!();
            eprintln!("[ERROR] Failed to load catalog: {}", e);
            process::exit(1);
        }
    };

    let options = PipelineOptions {
        market_count: market_count.into(),
    };
    let output = run(&catalog, &options);

    print_report(&output.report);

    let written = write_json(&out_dir.join("artists.json"), &output.artists)
        .and_then(|_| write_json(&out_dir.join("tracks.json"), &output.tracks))
        .and_then(|_| write_json(&out_dir.join("report.json"), &output.report));
    match written {
        Ok(()) => {
            println!();
            println!("[SAVED] Tables written to: {}", out_dir.display());
        }
        Err(e) => {
            eprintln!();
            eprintln!("[ERROR] Failed to write tables: {:#}", e);
            process::exit(1);
        }
    }
}

fn print_report(report: &PipelineReport) {
    println!();
    println!("---------------------------------------------------");
    println!("PIPELINE REPORT");
    println!("---------------------------------------------------");
    println!("Playlist Rows In:      {}", report.input.playlist_rows);
    println!("Artists In:            {}", report.input.artists);
    println!("Audio Features In:     {}", report.input.audio_features);
    println!("Genre Lookup Rows In:  {}", report.input.genre_lookup);
    println!("Markets:               {}", report.markets);
    println!("---------------------------------------------------");
    println!("Artists Out:           {}", report.artists_out);
    println!("  without genre match: {}", report.artists_without_genre);
    println!("Tracks Out:            {}", report.tracks_out);
    println!("---------------------------------------------------");

    if report.warnings.is_empty() {
        println!();
        println!("No join degeneracies found. Clean!");
    } else {
        println!();
        println!("Warnings ({}):", report.warnings.len());
        for (i, warning) in report.warnings.iter().enumerate() {
            println!("{}. {}", i + 1, warning);
        }
    }
}

async fn handle_collect(playlist_ids: &[String], limit: Option<usize>, data: &DataArgs) {
    let paths = data.paths();

    let credentials = match SpotifyCredentials::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error reading Spotify credentials: {}", e);
            process::exit(1);
        }
    };
    let spotify = match get_spotify_client(credentials).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error initializing Spotify client: {}", e);
            process::exit(1);
        }
    };
    let collector = Collector::new(SpotifySource::new(spotify));

    println!("Collecting {} playlist(s)...", playlist_ids.len());
    let (catalog, summary) = match collector.collect(playlist_ids, limit).await {
        Ok(result) => result,
        Err(e) => {
            eprintln!();
            eprintln!("[ERROR] Collection failed: {}", e);
            process::exit(1);
        }
    };

    print_collect_summary(&summary);

    let written = write_json(&paths.playlists, &catalog.playlists)
        .and_then(|_| write_json(&paths.artists, &catalog.artists))
        .and_then(|_| write_json(&paths.audio_features, &catalog.audio_features));
    match written {
        Ok(()) => {
            println!();
            println!("[SAVED] Raw collections written to: {}", data.data_dir.display());
        }
        Err(e) => {
            eprintln!();
            eprintln!("[ERROR] Failed to write collections: {:#}", e);
            process::exit(1);
        }
    }
}

fn print_collect_summary(summary: &CollectSummary) {
    println!();
    println!("---------------------------------------------------");
    println!("COLLECTION COMPLETE");
    println!("---------------------------------------------------");
    println!("Playlists Fetched:      {}", summary.playlists_fetched);
    println!("Playlist Rows:          {}", summary.playlist_rows);
    println!("Skipped Items:          {}", summary.skipped_items);
    println!(
        "Artists Fetched:        {} / {}",
        summary.artists_fetched, summary.artists_requested
    );
    println!(
        "Audio Features Fetched: {} / {}",
        summary.audio_features_fetched, summary.tracks_requested
    );
    println!("API Requests:           {}", summary.requests);
    println!("---------------------------------------------------");
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory '{}'", parent.display()))?;
    }

    let file = File::create(path)
        .with_context(|| format!("Failed to create file '{}'", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("Failed to serialize '{}'", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("Failed to write '{}'", path.display()))?;

    info!("Wrote {}", path.display());
    Ok(())
}
