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

use rspotify::{prelude::*, scopes, AuthCodeSpotify, Config, Credentials, OAuth};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Failed to initialize Spotify client: {0}")]
    ClientConfig(String),
    #[error("Spotify authentication failed: {0}")]
    Spotify(#[from] rspotify::ClientError),
}

/// Everything needed to open a Spotify session. Built once by the caller and
/// handed to [`get_spotify_client`]; nothing is read from global state afterwards.
#[derive(Debug, Clone)]
pub struct SpotifyCredentials {
    pub creds: Credentials,
    pub oauth: OAuth,
}

impl SpotifyCredentials {
    pub fn new(creds: Credentials, oauth: OAuth) -> Self {
        Self { creds, oauth }
    }

    /// Reads `RSPOTIFY_CLIENT_ID`, `RSPOTIFY_CLIENT_SECRET` and `RSPOTIFY_REDIRECT_URI`.
    ///
    /// Only public and followed playlists are read, so the scopes are read-only.
    pub fn from_env() -> Result<Self, AuthError> {
        let creds = Credentials::from_env().ok_or_else(|| {
            AuthError::ClientConfig(
                "Missing RSPOTIFY_CLIENT_ID or RSPOTIFY_CLIENT_SECRET".to_string(),
            )
        })?;

        let scopes = scopes!("playlist-read-private", "playlist-read-collaborative");
        let oauth = OAuth::from_env(scopes)
            .ok_or_else(|| AuthError::ClientConfig("Missing RSPOTIFY_REDIRECT_URI".to_string()))?;

        Ok(Self::new(creds, oauth))
    }
}

/// Authenticates with the Authorization Code Flow and returns the session.
///
/// A cached token is reused and refreshed when possible; otherwise the user is asked
/// (via stdout) to open the authorization URL.
pub async fn get_spotify_client(
    credentials: SpotifyCredentials,
) -> Result<AuthCodeSpotify, AuthError> {
    // Token is cached in .spotify_token_cache.json.
    let config = Config {
        token_cached: true,
        token_refreshing: true,
        ..Default::default()
    };

    let spotify = AuthCodeSpotify::with_config(credentials.creds, credentials.oauth, config);

    let url = spotify.get_authorize_url(false)?;
    spotify.prompt_for_token(&url).await?;

    Ok(spotify)
}
