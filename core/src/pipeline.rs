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

use crate::assemble::{assemble_tracks, FeatureIndex};
use crate::config::PipelineOptions;
use crate::genre::{resolve_genres, GenreIndex};
use crate::models::{ArtistRow, InputCounts, PipelineReport, RawCatalog, TrackRow};
use crate::playlists::normalize_playlists;
use crate::rollup::{rollup_artists, ArtistIndex};
use log::info;
use std::collections::HashSet;

/// The two analysis tables plus a summary of how they were produced.
#[derive(Debug, Default)]
pub struct PipelineOutput {
    pub artists: Vec<ArtistRow>,
    pub tracks: Vec<TrackRow>,
    pub report: PipelineReport,
}

/// Turns the raw catalog into the `artists` and `tracks` tables.
///
/// Each stage reads the previous stage's table and returns a new one; `catalog` is
/// never modified. Degenerate joins are recorded in the report, never raised.
pub fn run(catalog: &RawCatalog, options: &PipelineOptions) -> PipelineOutput {
    let mut report = PipelineReport::new(InputCounts::from(catalog));

    let playlists = normalize_playlists(&catalog.playlists, options.market_count);
    report.markets = playlists
        .iter()
        .map(|row| row.market_id.as_str())
        .collect::<HashSet<_>>()
        .len();

    let (artist_index, warnings) = ArtistIndex::build(&catalog.artists);
    report.extend_warnings(warnings);
    let rollup = rollup_artists(&playlists, &artist_index);
    report.extend_warnings(rollup.warnings);

    let (genre_index, warnings) = GenreIndex::build(&catalog.genre_lookup);
    report.extend_warnings(warnings);
    let genres = resolve_genres(&catalog.artists, &genre_index);
    report.artists_without_genre = genres.unmatched;

    let (feature_index, warnings) = FeatureIndex::build(&catalog.audio_features);
    report.extend_warnings(warnings);
    let assembled = assemble_tracks(&rollup.rows, &feature_index);
    report.extend_warnings(assembled.warnings);

    report.artists_out = genres.rows.len();
    report.tracks_out = assembled.tracks.len();
    info!(
        "Pipeline finished: {} artists, {} tracks, {} warnings",
        report.artists_out,
        report.tracks_out,
        report.warnings.len()
    );

    PipelineOutput {
        artists: genres.rows,
        tracks: assembled.tracks,
        report,
    }
}
