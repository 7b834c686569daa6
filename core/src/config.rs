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

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_DATA_DIR: &str = "data";
pub const AUDIO_FEATURES_FILE: &str = "spotify_audio_features.json";
pub const ARTISTS_FILE: &str = "spotify_artists.json";
pub const PLAYLISTS_FILE: &str = "spotify_top_50_playlists.json";
pub const GENRE_LOOKUP_FILE: &str = "genre_lookup.json";

/// How `num_avail_markets` is derived from a track's market list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketCountMode {
    /// Counts comma-separated tokens of the rendered list, so an empty list
    /// still counts as one market. Matches the historical tables.
    #[default]
    Tokens,
    /// Counts list elements; an empty list counts as zero.
    Length,
}

/// Locations of the raw collections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub audio_features: PathBuf,
    pub artists: PathBuf,
    pub playlists: PathBuf,
    pub genre_lookup: PathBuf,
}

impl DataPaths {
    /// Conventional file names under `data_dir`.
    pub fn in_dir(data_dir: impl AsRef<Path>) -> Self {
        let dir = data_dir.as_ref();
        Self {
            audio_features: dir.join(AUDIO_FEATURES_FILE),
            artists: dir.join(ARTISTS_FILE),
            playlists: dir.join(PLAYLISTS_FILE),
            genre_lookup: dir.join(GENRE_LOOKUP_FILE),
        }
    }

    pub fn with_genre_lookup(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.genre_lookup = path;
        }
        self
    }
}

impl Default for DataPaths {
    fn default() -> Self {
        Self::in_dir(DEFAULT_DATA_DIR)
    }
}

/// Tunables of the transformation itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    pub market_count: MarketCountMode,
}
