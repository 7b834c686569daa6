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

use crate::config::MarketCountMode;
use crate::models::{ArtistRef, PlaylistRow, RawPlaylistTrack};
use log::info;
use std::collections::HashMap;

/// Prefix the platform puts in front of every per-market chart playlist.
pub const MARKET_PLAYLIST_PREFIX: &str = "Top Songs - ";

/// Derives the market identifier from a chart playlist name.
///
/// "Top Songs - United  States" becomes "united_states". Names without the prefix
/// are only whitespace- and case-normalized. Leading and trailing whitespace is
/// dropped rather than turned into underscores. Distinct names may collide.
pub fn market_id(playlist_name: &str) -> String {
    let name = playlist_name
        .strip_prefix(MARKET_PLAYLIST_PREFIX)
        .unwrap_or(playlist_name);

    name.split_whitespace()
        .collect::<Vec<&str>>()
        .join("_")
        .to_lowercase()
}

/// Number of markets a track is available in.
///
/// In `Tokens` mode the count is the number of comma-separated tokens of the rendered
/// list (`['US', 'GB']` gives 2), which makes an empty list count as 1. `Length` counts
/// list elements.
pub fn count_available_markets(markets: &[String], mode: MarketCountMode) -> usize {
    match mode {
        MarketCountMode::Tokens => {
            let embedded_commas: usize = markets.iter().map(|m| m.matches(',').count()).sum();
            markets.len().saturating_sub(1) + embedded_commas + 1
        }
        MarketCountMode::Length => markets.len(),
    }
}

/// Number of artist entries that actually carry an id.
pub fn count_artists(artist_ids: &[ArtistRef]) -> usize {
    artist_ids.iter().filter(|a| a.id.is_some()).count()
}

/// Builds the normalized playlist table.
///
/// `playlist_rank` restarts at 1 for every market and follows input order.
pub fn normalize_playlists(rows: &[RawPlaylistTrack], mode: MarketCountMode) -> Vec<PlaylistRow> {
    let mut next_rank: HashMap<String, usize> = HashMap::new();

    let normalized: Vec<PlaylistRow> = rows
        .iter()
        .map(|row| {
            let market_id = market_id(&row.playlist_name);
            let rank = next_rank.entry(market_id.clone()).or_insert(0);
            *rank += 1;

            PlaylistRow {
                track_id: row.track_id.clone(),
                playlist_id: row.playlist_id.clone(),
                playlist_rank: *rank,
                market_id,
                album_type: row.album_type.clone(),
                album_id: row.album_id.clone(),
                artist_ids: row.artist_ids.clone(),
                explicit: row.explicit,
                track_popularity: row.popularity,
                num_avail_markets: count_available_markets(&row.available_markets, mode),
                num_artists: count_artists(&row.artist_ids),
            }
        })
        .collect();

    info!(
        "Normalized {} playlist rows across {} markets",
        normalized.len(),
        next_rank.len()
    );
    normalized
}
