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

use features_core::models::{
    ArtistRef, AudioFeatures, GenreLookupRow, RawArtist, RawCatalog, RawPlaylistTrack,
};
use features_core::{run, MarketCountMode, PipelineOptions, PipelineWarning};
use serde_json::Value;
use std::collections::BTreeMap;

fn track(
    track_id: &str,
    playlist_name: &str,
    artists: &[&str],
    markets: &[&str],
) -> RawPlaylistTrack {
    RawPlaylistTrack {
        track_id: track_id.to_string(),
        playlist_id: format!("pl-{}", playlist_name.to_lowercase()),
        playlist_name: playlist_name.to_string(),
        album_type: Some("album".to_string()),
        album_id: Some(format!("al-{}", track_id)),
        artist_ids: artists.iter().map(|a| ArtistRef::new(*a)).collect(),
        explicit: false,
        popularity: 70,
        available_markets: markets.iter().map(|m| m.to_string()).collect(),
    }
}

fn artist(id: &str, followers: u64, popularity: u32, genres: &[&str]) -> RawArtist {
    RawArtist {
        artist_id: id.to_string(),
        name: format!("Artist {}", id),
        followers,
        popularity,
        genres: genres.iter().map(|g| g.to_string()).collect(),
    }
}

fn features(track_id: &str) -> AudioFeatures {
    AudioFeatures {
        track_id: track_id.to_string(),
        danceability: 0.7,
        energy: 0.8,
        key: 2,
        loudness: -5.5,
        mode: 1,
        speechiness: 0.06,
        acousticness: 0.15,
        instrumentalness: 0.0,
        liveness: 0.12,
        valence: 0.55,
        tempo: 118.0,
        duration_ms: 201_000,
        time_signature: 4,
    }
}

fn lookup(sub_genre: &str, genre: &str) -> GenreLookupRow {
    let mut columns = BTreeMap::new();
    columns.insert("genre".to_string(), Value::from(genre));
    GenreLookupRow {
        sub_genre: sub_genre.to_string(),
        columns,
    }
}

fn catalog() -> RawCatalog {
    RawCatalog {
        playlists: vec![
            track("t1", "Top Songs - Global", &["a1", "a2", "a3"], &["US", "GB"]),
            track("t2", "Top Songs - Global", &["a1", "a1"], &[]),
            track("t3", "Top Songs - global", &["ghost"], &["US"]),
            track("t4", "Top Songs - United  States", &["a2"], &["US"]),
            track("t1", "Top Songs - United  States", &["a1", "a2", "a3"], &["US", "GB"]),
        ],
        artists: vec![
            artist("a1", 100, 50, &["Hip-Hop  & Rap!"]),
            artist("a2", 20, 70, &["dance pop", "pop"]),
            artist("a3", 3, 90, &[]),
        ],
        audio_features: vec![features("t1"), features("t2"), features("t3")],
        genre_lookup: vec![
            lookup("HipHop Rap", "hip hop"),
            lookup("dance pop", "pop"),
            lookup("dance   pop", "pop duplicate"),
        ],
    }
}

#[test]
fn test_tracks_table() {
    let output = run(&catalog(), &PipelineOptions::default());

    let ids: Vec<(&str, &str, usize)> = output
        .tracks
        .iter()
        .map(|t| (t.track_id.as_str(), t.market_id.as_str(), t.playlist_rank))
        .collect();
    // t3 has no resolvable artist, t4 has no audio features.
    assert_eq!(
        ids,
        vec![("t1", "global", 1), ("t2", "global", 2), ("t1", "united_states", 2)]
    );

    let t1 = &output.tracks[0];
    assert_eq!(t1.tot_artist_followers, 123);
    assert_eq!(t1.avg_artist_popularity, 70.0);
    assert_eq!(t1.num_artists, 3);
    assert_eq!(t1.num_avail_markets, 2);
    assert_eq!(t1.tempo, 118.0);

    let t2 = &output.tracks[1];
    assert_eq!(t2.tot_artist_followers, 100);
    assert_eq!(t2.avg_artist_popularity, 50.0);
    assert_eq!(t2.num_avail_markets, 1);
}

#[test]
fn test_length_market_count() {
    let options = PipelineOptions {
        market_count: MarketCountMode::Length,
    };
    let output = run(&catalog(), &options);

    let t2 = output.tracks.iter().find(|t| t.track_id == "t2").unwrap();
    assert_eq!(t2.num_avail_markets, 0);
}

#[test]
fn test_artists_table() {
    let output = run(&catalog(), &PipelineOptions::default());

    assert_eq!(output.artists.len(), 3);
    let genres: Vec<&Value> = output
        .artists
        .iter()
        .map(|a| &a.genre_columns["genre"])
        .collect();
    assert_eq!(
        genres,
        vec![&Value::from("hip hop"), &Value::from("pop"), &Value::Null]
    );
    assert_eq!(output.artists[1].artist_popularity, 70);
    assert_eq!(output.artists[2].sub_genre, None);
    assert_eq!(output.report.artists_without_genre, 1);
}

#[test]
fn test_report_lists_degeneracies() {
    let output = run(&catalog(), &PipelineOptions::default());
    let report = &output.report;

    assert_eq!(report.input.playlist_rows, 5);
    assert_eq!(report.markets, 2);
    assert_eq!(report.tracks_out, 3);
    assert_eq!(report.artists_out, 3);
    assert!(report.warnings.contains(&PipelineWarning::UnresolvedArtists {
        track_id: "t3".to_string(),
        artist_ids: vec!["ghost".to_string()],
    }));
    assert!(report.warnings.contains(&PipelineWarning::MissingAudioFeatures {
        track_id: "t4".to_string(),
    }));
    assert!(report.warnings.contains(&PipelineWarning::AmbiguousJoinKey {
        key: "dance_pop".to_string(),
        rows: 2,
    }));
}

#[test]
fn test_input_catalog_is_not_modified() {
    let input = catalog();
    let _ = run(&input, &PipelineOptions::default());

    assert_eq!(input.playlists, catalog().playlists);
    assert_eq!(input.artists, catalog().artists);
}

#[test]
fn test_tables_serialize_as_flat_records() {
    let output = run(&catalog(), &PipelineOptions::default());

    let track = serde_json::to_value(&output.tracks[0]).unwrap();
    assert_eq!(track["market_id"], Value::from("global"));
    assert_eq!(track["danceability"], Value::from(0.7));
    assert!(track.get("playlist_name").is_none());
    assert!(track.get("available_markets").is_none());

    let artist = serde_json::to_value(&output.artists[2]).unwrap();
    assert_eq!(artist["genre"], Value::Null);
    assert!(artist.get("popularity").is_none());
}
