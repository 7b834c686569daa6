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
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Audio descriptors of a single track, as served by the audio-features endpoint.
///
/// The endpoint names the identifier `id`; files produced by the collector use `track_id`.
/// Both spellings are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    #[serde(alias = "id")]
    pub track_id: String,
    pub danceability: f64,
    pub energy: f64,
    pub key: i32,
    pub loudness: f64,
    pub mode: i32,
    pub speechiness: f64,
    pub acousticness: f64,
    pub instrumentalness: f64,
    pub liveness: f64,
    pub valence: f64,
    pub tempo: f64,
    pub duration_ms: u64,
    pub time_signature: i32,
}

/// Artist metadata as collected from the artists endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawArtist {
    pub artist_id: String,
    #[serde(alias = "artist_name")]
    pub name: String,
    pub followers: u64,
    pub popularity: u32,
    #[serde(default)]
    pub genres: Vec<String>,
}

/// One entry of a track's `artist_ids` list. Entries without an id are tolerated
/// but never counted or joined.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistRef {
    #[serde(default)]
    pub id: Option<String>,
}

impl ArtistRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: Some(id.into()) }
    }
}

/// A track as it appeared in one playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPlaylistTrack {
    pub track_id: String,
    pub playlist_id: String,
    pub playlist_name: String,
    pub album_type: Option<String>,
    pub album_id: Option<String>,
    pub artist_ids: Vec<ArtistRef>,
    pub explicit: bool,
    pub popularity: u32,
    pub available_markets: Vec<String>,
}

/// A row of the external genre taxonomy. Every column other than `sub_genre`
/// is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreLookupRow {
    pub sub_genre: String,
    #[serde(flatten)]
    pub columns: BTreeMap<String, Value>,
}

/// The four raw collections, fully materialized.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawCatalog {
    pub audio_features: Vec<AudioFeatures>,
    pub artists: Vec<RawArtist>,
    pub playlists: Vec<RawPlaylistTrack>,
    pub genre_lookup: Vec<GenreLookupRow>,
}

/// A playlist row after market derivation and column pruning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistRow {
    pub track_id: String,
    pub playlist_id: String,
    pub market_id: String,
    pub album_type: Option<String>,
    pub album_id: Option<String>,
    pub artist_ids: Vec<ArtistRef>,
    pub explicit: bool,
    pub track_popularity: u32,
    pub num_avail_markets: usize,
    pub num_artists: usize,
    pub playlist_rank: usize,
}

/// Per-track rollup over the track's resolvable artists. The follower sum is
/// widened so that any set of `u64` follower counts adds up exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackArtistStats {
    pub track_id: String,
    pub tot_artist_followers: u128,
    pub avg_artist_popularity: f64,
}

/// A playlist row with its artist rollup merged in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolledUpPlaylistRow {
    #[serde(flatten)]
    pub playlist: PlaylistRow,
    pub tot_artist_followers: u128,
    pub avg_artist_popularity: f64,
}

/// Final artist record: raw columns, the first listed genre, and the matched
/// genre-classification columns (null when the lookup had no match).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistRow {
    pub artist_id: String,
    pub name: String,
    pub followers: u64,
    pub genres: Vec<String>,
    pub artist_popularity: u32,
    pub sub_genre: Option<String>,
    #[serde(flatten)]
    pub genre_columns: BTreeMap<String, Value>,
}

/// Final track record, one per playlist appearance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRow {
    pub track_id: String,
    pub playlist_id: String,
    pub market_id: String,
    pub album_type: Option<String>,
    pub album_id: Option<String>,
    pub artist_ids: Vec<ArtistRef>,
    pub explicit: bool,
    pub track_popularity: u32,
    pub num_avail_markets: usize,
    pub num_artists: usize,
    pub playlist_rank: usize,
    pub tot_artist_followers: u128,
    pub avg_artist_popularity: f64,
    pub danceability: f64,
    pub energy: f64,
    pub key: i32,
    pub loudness: f64,
    pub mode: i32,
    pub speechiness: f64,
    pub acousticness: f64,
    pub instrumentalness: f64,
    pub liveness: f64,
    pub valence: f64,
    pub tempo: f64,
    pub duration_ms: u64,
    pub time_signature: i32,
}

impl TrackRow {
    pub fn new(row: RolledUpPlaylistRow, features: &AudioFeatures) -> Self {
        let playlist = row.playlist;
        Self {
            track_id: playlist.track_id,
            playlist_id: playlist.playlist_id,
            market_id: playlist.market_id,
            album_type: playlist.album_type,
            album_id: playlist.album_id,
            artist_ids: playlist.artist_ids,
            explicit: playlist.explicit,
            track_popularity: playlist.track_popularity,
            num_avail_markets: playlist.num_avail_markets,
            num_artists: playlist.num_artists,
            playlist_rank: playlist.playlist_rank,
            tot_artist_followers: row.tot_artist_followers,
            avg_artist_popularity: row.avg_artist_popularity,
            danceability: features.danceability,
            energy: features.energy,
            key: features.key,
            loudness: features.loudness,
            mode: features.mode,
            speechiness: features.speechiness,
            acousticness: features.acousticness,
            instrumentalness: features.instrumentalness,
            liveness: features.liveness,
            valence: features.valence,
            tempo: features.tempo,
            duration_ms: features.duration_ms,
            time_signature: features.time_signature,
        }
    }
}

/// A degenerate condition met during a run. None of these abort the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineWarning {
    /// Several genre-lookup rows share a canonical key; only the first is used.
    AmbiguousJoinKey { key: String, rows: usize },
    /// A genre-lookup row whose key canonicalizes to nothing.
    EmptyLookupKey { index: usize },
    /// A lookup column shares its name with an artist column and was renamed.
    RenamedLookupColumn { column: String, renamed_to: String },
    /// None of the track's artists exist in the artist table.
    UnresolvedArtists {
        track_id: String,
        artist_ids: Vec<String>,
    },
    /// The track has no audio-feature vector.
    MissingAudioFeatures { track_id: String },
    /// An identifier that should be unique appeared more than once; the first record wins.
    DuplicateRecord { collection: String, id: String },
}

impl fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineWarning::AmbiguousJoinKey { key, rows } => write!(
                f,
                "[AMBIGUOUS KEY] genre lookup key '{}' matches {} rows, keeping the first",
                key, rows
            ),
            PipelineWarning::EmptyLookupKey { index } => write!(
                f,
                "[EMPTY KEY] genre lookup row {} has no usable sub-genre",
                index
            ),
            PipelineWarning::RenamedLookupColumn { column, renamed_to } => write!(
                f,
                "[RENAMED] genre lookup column '{}' written as '{}'",
                column, renamed_to
            ),
            PipelineWarning::UnresolvedArtists {
                track_id,
                artist_ids,
            } => write!(
                f,
                "[UNRESOLVED] track {} dropped, unknown artists: {}",
                track_id,
                artist_ids.join(", ")
            ),
            PipelineWarning::MissingAudioFeatures { track_id } => write!(
                f,
                "[NO FEATURES] track {} dropped, no audio features",
                track_id
            ),
            PipelineWarning::DuplicateRecord { collection, id } => write!(
                f,
                "[DUPLICATE] {} id {} seen more than once, keeping the first",
                collection, id
            ),
        }
    }
}

/// Row counts for each raw collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputCounts {
    pub audio_features: usize,
    pub artists: usize,
    pub playlist_rows: usize,
    pub genre_lookup: usize,
}

impl From<&RawCatalog> for InputCounts {
    fn from(catalog: &RawCatalog) -> Self {
        Self {
            audio_features: catalog.audio_features.len(),
            artists: catalog.artists.len(),
            playlist_rows: catalog.playlists.len(),
            genre_lookup: catalog.genre_lookup.len(),
        }
    }
}

/// Summary of a pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub input: InputCounts,
    pub markets: usize,
    pub artists_out: usize,
    pub tracks_out: usize,
    pub artists_without_genre: usize,
    pub warnings: Vec<PipelineWarning>,
}

impl PipelineReport {
    pub fn new(input: InputCounts) -> Self {
        Self {
            input,
            ..Default::default()
        }
    }

    pub fn add_warning(&mut self, warning: PipelineWarning) {
        self.warnings.push(warning);
    }

    pub fn extend_warnings(&mut self, warnings: impl IntoIterator<Item = PipelineWarning>) {
        self.warnings.extend(warnings);
    }
}

/// Summary of a collection run against the remote catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectSummary {
    pub playlists_fetched: usize,
    pub playlist_rows: usize,
    pub skipped_items: usize,
    pub artists_requested: usize,
    pub artists_fetched: usize,
    pub tracks_requested: usize,
    pub audio_features_fetched: usize,
    pub requests: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_features_accept_api_id_field() {
        let json = r#"{
            "id": "t1", "danceability": 0.5, "energy": 0.7, "key": 5, "loudness": -6.1,
            "mode": 1, "speechiness": 0.04, "acousticness": 0.2, "instrumentalness": 0.0,
            "liveness": 0.1, "valence": 0.6, "tempo": 120.0, "duration_ms": 200000,
            "time_signature": 4, "type": "audio_features", "uri": "spotify:track:t1"
        }"#;

        let features: AudioFeatures = serde_json::from_str(json).unwrap();
        assert_eq!(features.track_id, "t1");
        assert_eq!(features.duration_ms, 200000);
    }

    #[test]
    fn test_raw_artist_accepts_artist_name() {
        let json = r#"{"artist_id": "a1", "artist_name": "Singer", "followers": 10, "popularity": 50}"#;

        let artist: RawArtist = serde_json::from_str(json).unwrap();
        assert_eq!(artist.name, "Singer");
        assert!(artist.genres.is_empty());
    }

    #[test]
    fn test_genre_lookup_keeps_extra_columns() {
        let json = r#"{"sub_genre": "dance pop", "genre": "pop", "family": "mainstream"}"#;

        let row: GenreLookupRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.sub_genre, "dance pop");
        assert_eq!(row.columns.len(), 2);
        assert_eq!(row.columns["genre"], Value::from("pop"));
    }

    #[test]
    fn test_artist_row_flattens_genre_columns() {
        let mut genre_columns = BTreeMap::new();
        genre_columns.insert("genre".to_string(), Value::Null);

        let row = ArtistRow {
            artist_id: "a1".to_string(),
            name: "Singer".to_string(),
            followers: 3,
            genres: vec![],
            artist_popularity: 40,
            sub_genre: None,
            genre_columns,
        };

        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["genre"], Value::Null);
        assert_eq!(value["artist_popularity"], Value::from(40));
    }

    #[test]
    fn test_warning_display() {
        let warning = PipelineWarning::AmbiguousJoinKey {
            key: "dance_pop".to_string(),
            rows: 2,
        };

        let display = format!("{}", warning);
        assert!(display.contains("AMBIGUOUS KEY"));
        assert!(display.contains("dance_pop"));
    }

    #[test]
    fn test_report_collects_warnings() {
        let mut report = PipelineReport::new(InputCounts::default());
        assert!(report.warnings.is_empty());

        report.add_warning(PipelineWarning::MissingAudioFeatures {
            track_id: "t9".to_string(),
        });
        report.extend_warnings(vec![PipelineWarning::EmptyLookupKey { index: 0 }]);

        assert_eq!(report.warnings.len(), 2);
    }
}
