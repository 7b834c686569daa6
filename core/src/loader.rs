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

use crate::config::DataPaths;
use crate::models::{AudioFeatures, GenreLookupRow, RawArtist, RawCatalog, RawPlaylistTrack};
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to open '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON in '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Schema error in {collection} record #{index} ({record}): {message}")]
    Schema {
        collection: &'static str,
        index: usize,
        record: String,
        message: String,
    },
}

/// A raw collection whose records are validated when they enter the pipeline.
pub trait Record: DeserializeOwned {
    const COLLECTION: &'static str;
    /// Fields tried, in order, to name an offending record in errors.
    const ID_FIELDS: &'static [&'static str];

    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

impl Record for AudioFeatures {
    const COLLECTION: &'static str = "audio_features";
    const ID_FIELDS: &'static [&'static str] = &["track_id", "id"];

    fn validate(&self) -> Result<(), String> {
        require_id("track_id", &self.track_id)?;

        let unit_fields = [
            ("danceability", self.danceability),
            ("energy", self.energy),
            ("speechiness", self.speechiness),
            ("acousticness", self.acousticness),
            ("instrumentalness", self.instrumentalness),
            ("liveness", self.liveness),
            ("valence", self.valence),
        ];
        for (name, value) in unit_fields {
            if !(0.0..=1.0).contains(&value) {
                warn!(
                    "Track {}: {} = {} is outside [0, 1]",
                    self.track_id, name, value
                );
            }
        }
        Ok(())
    }
}

impl Record for RawArtist {
    const COLLECTION: &'static str = "artists";
    const ID_FIELDS: &'static [&'static str] = &["artist_id", "id"];

    fn validate(&self) -> Result<(), String> {
        require_id("artist_id", &self.artist_id)?;
        if self.popularity > 100 {
            warn!(
                "Artist {}: popularity {} is above 100",
                self.artist_id, self.popularity
            );
        }
        Ok(())
    }
}

impl Record for RawPlaylistTrack {
    const COLLECTION: &'static str = "playlists";
    const ID_FIELDS: &'static [&'static str] = &["track_id"];

    fn validate(&self) -> Result<(), String> {
        require_id("track_id", &self.track_id)?;
        if self.artist_ids.is_empty() {
            return Err("artist_ids must list at least one artist".to_string());
        }
        for (i, artist) in self.artist_ids.iter().enumerate() {
            if let Some(id) = &artist.id {
                require_id(&format!("artist_ids[{}].id", i), id)?;
            }
        }
        Ok(())
    }
}

impl Record for GenreLookupRow {
    const COLLECTION: &'static str = "genre_lookup";
    const ID_FIELDS: &'static [&'static str] = &["sub_genre"];
}

fn require_id(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{} must not be empty", field))
    } else {
        Ok(())
    }
}

fn record_label<T: Record>(item: &Value) -> String {
    T::ID_FIELDS
        .iter()
        .find_map(|field| match item.get(field) {
            Some(Value::String(id)) => Some(format!("{}={}", field, id)),
            _ => None,
        })
        .unwrap_or_else(|| "no identifier".to_string())
}

/// Decodes a JSON array of records, failing on the first record that does not fit its schema.
pub fn decode_records<T: Record>(document: Value) -> Result<Vec<T>, LoadError> {
    let items = match document {
        Value::Array(items) => items,
        other => {
            return Err(LoadError::Schema {
                collection: T::COLLECTION,
                index: 0,
                record: "document".to_string(),
                message: format!("expected an array of records, found {}", json_kind(&other)),
            })
        }
    };

    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let record = record_label::<T>(&item);
        let decoded: T = serde_json::from_value(item).map_err(|e| LoadError::Schema {
            collection: T::COLLECTION,
            index,
            record: record.clone(),
            message: e.to_string(),
        })?;
        decoded.validate().map_err(|message| LoadError::Schema {
            collection: T::COLLECTION,
            index,
            record,
            message,
        })?;
        records.push(decoded);
    }
    Ok(records)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Reads one collection file.
pub fn read_records<T: Record>(path: &Path) -> Result<Vec<T>, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let document: Value =
        serde_json::from_reader(BufReader::new(file)).map_err(|source| LoadError::Json {
            path: path.to_path_buf(),
            source,
        })?;

    let records = decode_records::<T>(document)?;
    debug!(
        "Read {} {} records from {}",
        records.len(),
        T::COLLECTION,
        path.display()
    );
    Ok(records)
}

/// Loads all four raw collections.
pub fn load_catalog(paths: &DataPaths) -> Result<RawCatalog, LoadError> {
    let catalog = RawCatalog {
        audio_features: read_records(&paths.audio_features)?,
        artists: read_records(&paths.artists)?,
        playlists: read_records(&paths.playlists)?,
        genre_lookup: read_records(&paths.genre_lookup)?,
    };

    info!(
        "Loaded catalog: {} audio feature rows, {} artists, {} playlist rows, {} genre lookup rows",
        catalog.audio_features.len(),
        catalog.artists.len(),
        catalog.playlists.len(),
        catalog.genre_lookup.len()
    );
    Ok(catalog)
}
