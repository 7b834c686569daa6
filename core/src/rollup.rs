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

use crate::models::{
    PipelineWarning, PlaylistRow, RawArtist, RolledUpPlaylistRow, TrackArtistStats,
};
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Artist table keyed by `artist_id`.
#[derive(Debug, Default)]
pub struct ArtistIndex<'a> {
    by_id: HashMap<&'a str, &'a RawArtist>,
}

impl<'a> ArtistIndex<'a> {
    /// Indexes the artist table. When an id repeats, the first record wins and a
    /// warning is returned for each repeat.
    pub fn build(artists: &'a [RawArtist]) -> (Self, Vec<PipelineWarning>) {
        let mut by_id = HashMap::with_capacity(artists.len());
        let mut warnings = Vec::new();

        for artist in artists {
            if by_id.contains_key(artist.artist_id.as_str()) {
                warn!("Duplicate artist id {}, keeping the first record", artist.artist_id);
                warnings.push(PipelineWarning::DuplicateRecord {
                    collection: "artists".to_string(),
                    id: artist.artist_id.clone(),
                });
            } else {
                by_id.insert(artist.artist_id.as_str(), artist);
            }
        }

        (Self { by_id }, warnings)
    }

    pub fn get(&self, artist_id: &str) -> Option<&'a RawArtist> {
        self.by_id.get(artist_id).copied()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// One row per distinct (track, artist) pair, in first-seen order.
///
/// A track listed in several playlists, or listing the same artist twice, yields the
/// pair once. Entries without an id are skipped.
pub fn explode_artist_pairs(rows: &[PlaylistRow]) -> Vec<(String, String)> {
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    let mut pairs = Vec::new();

    for row in rows {
        for artist_id in row.artist_ids.iter().filter_map(|a| a.id.as_deref()) {
            if seen.insert((row.track_id.as_str(), artist_id)) {
                pairs.push((row.track_id.clone(), artist_id.to_string()));
            }
        }
    }
    pairs
}

/// Follower sum and unweighted mean popularity per track, over the artists present
/// in `artists`. Tracks with no resolvable artist get no row. Sorted by track id.
pub fn track_artist_stats(
    pairs: &[(String, String)],
    artists: &ArtistIndex<'_>,
) -> Vec<TrackArtistStats> {
    // track_id -> (follower sum, popularity sum, artist count)
    let mut groups: BTreeMap<&str, (u128, u128, u64)> = BTreeMap::new();

    for (track_id, artist_id) in pairs {
        let Some(artist) = artists.get(artist_id) else {
            debug!("Track {}: artist {} not in artist table", track_id, artist_id);
            continue;
        };
        let group = groups.entry(track_id.as_str()).or_insert((0, 0, 0));
        group.0 += u128::from(artist.followers);
        group.1 += u128::from(artist.popularity);
        group.2 += 1;
    }

    groups
        .into_iter()
        .map(|(track_id, (followers, popularity, count))| TrackArtistStats {
            track_id: track_id.to_string(),
            tot_artist_followers: followers,
            avg_artist_popularity: popularity as f64 / count as f64,
        })
        .collect()
}

/// Inner-joins the rollup onto the playlist table by `track_id`, keeping playlist order.
pub fn attach_rollup(
    rows: &[PlaylistRow],
    stats: &[TrackArtistStats],
) -> Vec<RolledUpPlaylistRow> {
    let by_track: HashMap<&str, &TrackArtistStats> =
        stats.iter().map(|s| (s.track_id.as_str(), s)).collect();

    rows.iter()
        .filter_map(|row| {
            by_track.get(row.track_id.as_str()).map(|s| RolledUpPlaylistRow {
                playlist: row.clone(),
                tot_artist_followers: s.tot_artist_followers,
                avg_artist_popularity: s.avg_artist_popularity,
            })
        })
        .collect()
}

/// Result of the rollup stage.
#[derive(Debug, Default)]
pub struct RollupOutcome {
    pub rows: Vec<RolledUpPlaylistRow>,
    pub stats: Vec<TrackArtistStats>,
    pub warnings: Vec<PipelineWarning>,
}

/// Runs the whole rollup stage: explode, aggregate, merge back.
///
/// Tracks none of whose artists resolve are dropped and reported once each.
pub fn rollup_artists(rows: &[PlaylistRow], artists: &ArtistIndex<'_>) -> RollupOutcome {
    let pairs = explode_artist_pairs(rows);
    let stats = track_artist_stats(&pairs, artists);

    let resolved: HashSet<&str> = stats.iter().map(|s| s.track_id.as_str()).collect();
    let mut unresolved: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for (track_id, artist_id) in &pairs {
        if !resolved.contains(track_id.as_str()) {
            unresolved
                .entry(track_id.as_str())
                .or_default()
                .push(artist_id.clone());
        }
    }

    let warnings: Vec<PipelineWarning> = unresolved
        .into_iter()
        .map(|(track_id, artist_ids)| {
            warn!(
                "Track {} has no resolvable artists ({}), dropping it",
                track_id,
                artist_ids.join(", ")
            );
            PipelineWarning::UnresolvedArtists {
                track_id: track_id.to_string(),
                artist_ids,
            }
        })
        .collect();

    let merged = attach_rollup(rows, &stats);
    info!(
        "Artist rollup: {} track/artist pairs, {} tracks with stats, {} of {} playlist rows kept",
        pairs.len(),
        stats.len(),
        merged.len(),
        rows.len()
    );

    RollupOutcome {
        rows: merged,
        stats,
        warnings,
    }
}
