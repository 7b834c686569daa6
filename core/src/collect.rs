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
    ArtistRef, AudioFeatures, CollectSummary, RawArtist, RawCatalog, RawPlaylistTrack,
};
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use log::{debug, info};
use rspotify::{
    model::{
        ArtistId, AudioFeatures as SpotifyAudioFeatures, FullArtist, FullTrack, PlayableItem,
        PlaylistId, TrackId,
    },
    prelude::*,
    AuthCodeSpotify,
};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// The artists endpoint accepts at most 50 ids per request.
pub const ARTIST_BATCH_SIZE: usize = 50;
/// The audio-features endpoint accepts at most 100 ids per request.
pub const AUDIO_FEATURES_BATCH_SIZE: usize = 100;

#[derive(Error, Debug)]
pub enum CollectError {
    #[error("Spotify API error: {0}")]
    Spotify(#[from] rspotify::ClientError),
    #[error("Invalid Playlist ID: {0}")]
    InvalidId(String),
    #[error("Invalid Artist ID: {0}")]
    InvalidArtistId(String),
    #[error("Invalid Track ID: {0}")]
    InvalidTrackId(String),
}

/// A playlist's name and its tracks, already converted to raw rows.
#[derive(Debug, Clone, Default)]
pub struct FetchedPlaylist {
    pub name: String,
    pub rows: Vec<RawPlaylistTrack>,
    /// Items that were not usable tracks (episodes, local files, tracks without artists).
    pub skipped: usize,
}

/// Remote reads the collector needs.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn playlist(&self, playlist_id: &str) -> Result<FetchedPlaylist, CollectError>;
    async fn artists(&self, artist_ids: &[String]) -> Result<Vec<RawArtist>, CollectError>;
    async fn audio_features(
        &self,
        track_ids: &[String],
    ) -> Result<Vec<AudioFeatures>, CollectError>;
}

/// Gathers the playlist, artist and audio-feature collections for a set of playlists.
pub struct Collector<S> {
    source: S,
}

impl<S: CatalogSource> Collector<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Fetches every playlist, then the distinct artists and tracks they reference.
    ///
    /// `limit` caps how many playlists, artists and tracks are fetched. The returned
    /// catalog has no genre lookup; that table comes from elsewhere.
    pub async fn collect(
        &self,
        playlist_ids: &[String],
        limit: Option<usize>,
    ) -> Result<(RawCatalog, CollectSummary), CollectError> {
        let cap = limit.unwrap_or(usize::MAX);
        let mut summary = CollectSummary::default();
        let mut playlists = Vec::new();

        for playlist_id in playlist_ids.iter().take(cap) {
            let fetched = self.source.playlist(playlist_id).await?;
            summary.requests += 1;
            info!(
                "Processing playlist: {} ({} tracks)",
                fetched.name,
                fetched.rows.len()
            );
            summary.playlists_fetched += 1;
            summary.skipped_items += fetched.skipped;
            playlists.extend(fetched.rows);
        }
        summary.playlist_rows = playlists.len();

        let artist_ids: Vec<String> = distinct(
            playlists
                .iter()
                .flat_map(|row| row.artist_ids.iter().filter_map(|a| a.id.as_deref())),
        )
        .into_iter()
        .take(cap)
        .collect();
        summary.artists_requested = artist_ids.len();

        let mut artists = Vec::with_capacity(artist_ids.len());
        for chunk in artist_ids.chunks(ARTIST_BATCH_SIZE) {
            debug!("Requesting {} artists", chunk.len());
            artists.extend(self.source.artists(chunk).await?);
            summary.requests += 1;
        }
        summary.artists_fetched = artists.len();

        let track_ids: Vec<String> = distinct(playlists.iter().map(|row| row.track_id.as_str()))
            .into_iter()
            .take(cap)
            .collect();
        summary.tracks_requested = track_ids.len();

        let mut audio_features = Vec::with_capacity(track_ids.len());
        for chunk in track_ids.chunks(AUDIO_FEATURES_BATCH_SIZE) {
            debug!("Requesting audio features for {} tracks", chunk.len());
            audio_features.extend(self.source.audio_features(chunk).await?);
            summary.requests += 1;
        }
        summary.audio_features_fetched = audio_features.len();

        let catalog = RawCatalog {
            audio_features,
            artists,
            playlists,
            genre_lookup: Vec::new(),
        };
        Ok((catalog, summary))
    }
}

/// Distinct values in first-seen order.
fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .filter(|v| seen.insert(*v))
        .map(str::to_string)
        .collect()
}

/// Converts a playlist track into a raw row. Tracks without an id or without
/// artists are not usable downstream and yield `None`.
pub fn playlist_track_row(
    track: &FullTrack,
    playlist_id: &str,
    playlist_name: &str,
) -> Option<RawPlaylistTrack> {
    let track_id = track.id.as_ref()?.id().to_string();
    if track.artists.is_empty() {
        return None;
    }

    Some(RawPlaylistTrack {
        track_id,
        playlist_id: playlist_id.to_string(),
        playlist_name: playlist_name.to_string(),
        album_type: track.album.album_type.clone(),
        album_id: track.album.id.as_ref().map(|id| id.id().to_string()),
        artist_ids: track
            .artists
            .iter()
            .map(|a| ArtistRef {
                id: a.id.as_ref().map(|id| id.id().to_string()),
            })
            .collect(),
        explicit: track.explicit,
        popularity: track.popularity,
        available_markets: track.available_markets.clone(),
    })
}

fn raw_artist(artist: FullArtist) -> RawArtist {
    RawArtist {
        artist_id: artist.id.id().to_string(),
        name: artist.name,
        followers: artist.followers.total as u64,
        popularity: artist.popularity,
        genres: artist.genres,
    }
}

fn raw_audio_features(features: SpotifyAudioFeatures) -> AudioFeatures {
    AudioFeatures {
        track_id: features.id.id().to_string(),
        danceability: f64::from(features.danceability),
        energy: f64::from(features.energy),
        key: features.key as i32,
        loudness: f64::from(features.loudness),
        mode: features.mode as i32,
        speechiness: f64::from(features.speechiness),
        acousticness: f64::from(features.acousticness),
        instrumentalness: f64::from(features.instrumentalness),
        liveness: f64::from(features.liveness),
        valence: f64::from(features.valence),
        tempo: f64::from(features.tempo),
        duration_ms: features.duration.num_milliseconds().max(0) as u64,
        time_signature: features.time_signature as i32,
    }
}

/// [`CatalogSource`] backed by an authenticated Spotify session.
pub struct SpotifySource {
    spotify: Arc<AuthCodeSpotify>,
}

impl SpotifySource {
    pub fn new(spotify: AuthCodeSpotify) -> Self {
        Self {
            spotify: Arc::new(spotify),
        }
    }
}

#[async_trait]
impl CatalogSource for SpotifySource {
    async fn playlist(&self, playlist_id: &str) -> Result<FetchedPlaylist, CollectError> {
        let id = PlaylistId::from_id(playlist_id)
            .map_err(|_| CollectError::InvalidId(playlist_id.to_string()))?;

        let playlist = self.spotify.playlist(id.clone(), None, None).await?;
        let mut fetched = FetchedPlaylist {
            name: playlist.name,
            ..Default::default()
        };

        let mut stream = self.spotify.playlist_items(id, None, None);
        while let Some(item) = stream.try_next().await? {
            let row = match item.track {
                Some(PlayableItem::Track(track)) => {
                    playlist_track_row(&track, playlist_id, &fetched.name)
                }
                _ => None,
            };
            match row {
                Some(row) => fetched.rows.push(row),
                None => fetched.skipped += 1,
            }
        }

        Ok(fetched)
    }

    async fn artists(&self, artist_ids: &[String]) -> Result<Vec<RawArtist>, CollectError> {
        let ids = artist_ids
            .iter()
            .map(|id| {
                ArtistId::from_id(id.as_str())
                    .map_err(|_| CollectError::InvalidArtistId(id.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let artists = self.spotify.artists(ids).await?;
        Ok(artists.into_iter().map(raw_artist).collect())
    }

    async fn audio_features(
        &self,
        track_ids: &[String],
    ) -> Result<Vec<AudioFeatures>, CollectError> {
        let ids = track_ids
            .iter()
            .map(|id| {
                TrackId::from_id(id.as_str()).map_err(|_| CollectError::InvalidTrackId(id.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        // A `null` response body yields no rows; a null entry inside the array fails to decode.
        let features = self.spotify.tracks_features(ids).await?.unwrap_or_default();
        Ok(features.into_iter().map(raw_audio_features).collect())
    }
}
