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

use crate::models::{AudioFeatures, PipelineWarning, RolledUpPlaylistRow, TrackRow};
use log::{info, warn};
use std::collections::{HashMap, HashSet};

/// Audio features keyed by `track_id`. The first vector for a track wins.
#[derive(Debug, Default)]
pub struct FeatureIndex<'a> {
    by_track: HashMap<&'a str, &'a AudioFeatures>,
}

impl<'a> FeatureIndex<'a> {
    pub fn build(features: &'a [AudioFeatures]) -> (Self, Vec<PipelineWarning>) {
        let mut by_track = HashMap::with_capacity(features.len());
        let mut warnings = Vec::new();

        for f in features {
            if by_track.contains_key(f.track_id.as_str()) {
                warn!("Duplicate audio features for track {}, keeping the first", f.track_id);
                warnings.push(PipelineWarning::DuplicateRecord {
                    collection: "audio_features".to_string(),
                    id: f.track_id.clone(),
                });
            } else {
                by_track.insert(f.track_id.as_str(), f);
            }
        }

        (Self { by_track }, warnings)
    }

    pub fn get(&self, track_id: &str) -> Option<&'a AudioFeatures> {
        self.by_track.get(track_id).copied()
    }
}

#[derive(Debug, Default)]
pub struct AssembleOutcome {
    pub tracks: Vec<TrackRow>,
    pub warnings: Vec<PipelineWarning>,
}

/// Inner-joins the rolled-up playlist rows with their audio features.
pub fn assemble_tracks(
    rows: &[RolledUpPlaylistRow],
    features: &FeatureIndex<'_>,
) -> AssembleOutcome {
    let mut tracks = Vec::with_capacity(rows.len());
    let mut reported: HashSet<&str> = HashSet::new();
    let mut warnings = Vec::new();

    for row in rows {
        let track_id = row.playlist.track_id.as_str();
        match features.get(track_id) {
            Some(f) => tracks.push(TrackRow::new(row.clone(), f)),
            None => {
                if reported.insert(track_id) {
                    warn!("Track {} has no audio features, dropping it", track_id);
                    warnings.push(PipelineWarning::MissingAudioFeatures {
                        track_id: track_id.to_string(),
                    });
                }
            }
        }
    }

    info!("Assembled {} track rows from {} candidates", tracks.len(), rows.len());
    AssembleOutcome { tracks, warnings }
}
