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

use crate::models::{ArtistRow, GenreLookupRow, PipelineWarning, RawArtist};
use log::{info, warn};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Canonical join-key form of a genre label.
///
/// Keeps ASCII letters, digits, underscores and whitespace, then trims and joins the
/// remaining words with a single underscore. Case is preserved. `None` maps to "".
///
/// `to_key_form(Some("Hip-Hop  & Rap!"))` is `"HipHop_Rap"`.
pub fn to_key_form(label: Option<&str>) -> String {
    let Some(label) = label else {
        return String::new();
    };

    let kept: String = label
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();

    kept.split_whitespace().collect::<Vec<&str>>().join("_")
}

/// First listed genre of an artist, if any.
pub fn sub_genre(artist: &RawArtist) -> Option<&str> {
    artist.genres.first().map(String::as_str)
}

/// Columns of [`ArtistRow`] that come from the artist itself. Lookup columns with
/// these names are renamed with [`LOOKUP_SUFFIX`] so they cannot shadow them.
pub const ARTIST_COLUMNS: [&str; 6] = [
    "artist_id",
    "name",
    "followers",
    "genres",
    "artist_popularity",
    "sub_genre",
];

pub const LOOKUP_SUFFIX: &str = "_lookup";

/// Genre lookup keyed by canonical sub-genre.
#[derive(Debug, Default)]
pub struct GenreIndex<'a> {
    by_key: HashMap<String, &'a GenreLookupRow>,
    /// Output column name -> lookup column name.
    columns: BTreeMap<String, String>,
}

impl<'a> GenreIndex<'a> {
    /// Indexes the lookup table. A key shared by several rows resolves to the first
    /// of them and is reported as ambiguous; rows with an empty key are skipped.
    pub fn build(rows: &'a [GenreLookupRow]) -> (Self, Vec<PipelineWarning>) {
        let mut by_key: HashMap<String, &'a GenreLookupRow> = HashMap::new();
        let mut source_columns = BTreeSet::new();
        let mut repeats: Vec<(String, usize)> = Vec::new();
        let mut warnings = Vec::new();

        for (index, row) in rows.iter().enumerate() {
            source_columns.extend(row.columns.keys().cloned());

            let key = to_key_form(Some(row.sub_genre.as_str()));
            if key.is_empty() {
                warn!(
                    "Genre lookup row {} ('{}') has an empty key, skipping",
                    index, row.sub_genre
                );
                warnings.push(PipelineWarning::EmptyLookupKey { index });
                continue;
            }

            if by_key.contains_key(&key) {
                match repeats.iter().position(|(k, _)| *k == key) {
                    Some(i) => repeats[i].1 += 1,
                    None => repeats.push((key, 2)),
                }
            } else {
                by_key.insert(key, row);
            }
        }

        for (key, rows) in repeats {
            warn!(
                "Genre lookup key '{}' is shared by {} rows, using the first",
                key, rows
            );
            warnings.push(PipelineWarning::AmbiguousJoinKey { key, rows });
        }

        let mut columns = BTreeMap::new();
        for column in &source_columns {
            if !ARTIST_COLUMNS.contains(&column.as_str()) {
                columns.insert(column.clone(), column.clone());
            }
        }
        for column in source_columns
            .iter()
            .filter(|c| ARTIST_COLUMNS.contains(&c.as_str()))
        {
            let mut renamed = format!("{}{}", column, LOOKUP_SUFFIX);
            while columns.contains_key(&renamed) || ARTIST_COLUMNS.contains(&renamed.as_str()) {
                renamed.push_str(LOOKUP_SUFFIX);
            }
            warn!(
                "Genre lookup column '{}' clashes with an artist column, renamed to '{}'",
                column, renamed
            );
            warnings.push(PipelineWarning::RenamedLookupColumn {
                column: column.clone(),
                renamed_to: renamed.clone(),
            });
            columns.insert(renamed, column.clone());
        }

        (Self { by_key, columns }, warnings)
    }

    pub fn get(&self, key: &str) -> Option<&'a GenreLookupRow> {
        self.by_key.get(key).copied()
    }

    /// Output names of every classification column seen in the lookup table.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Classification columns for `key`, all null when it has no match.
    fn classification(&self, key: &str) -> (BTreeMap<String, Value>, bool) {
        let matched = if key.is_empty() { None } else { self.get(key) };

        let columns = self
            .columns
            .iter()
            .map(|(output, source)| {
                let value = matched
                    .and_then(|row| row.columns.get(source))
                    .cloned()
                    .unwrap_or(Value::Null);
                (output.clone(), value)
            })
            .collect();

        (columns, matched.is_some())
    }
}

/// Result of the genre stage.
#[derive(Debug, Default)]
pub struct GenreOutcome {
    pub rows: Vec<ArtistRow>,
    pub unmatched: usize,
}

/// Left-joins every artist onto the genre lookup by canonical sub-genre.
pub fn resolve_genres(artists: &[RawArtist], index: &GenreIndex<'_>) -> GenreOutcome {
    let mut unmatched = 0;

    let rows: Vec<ArtistRow> = artists
        .iter()
        .map(|artist| {
            let sub_genre = sub_genre(artist);
            let (genre_columns, matched) = index.classification(&to_key_form(sub_genre));
            if !matched {
                unmatched += 1;
            }

            ArtistRow {
                artist_id: artist.artist_id.clone(),
                name: artist.name.clone(),
                followers: artist.followers,
                genres: artist.genres.clone(),
                artist_popularity: artist.popularity,
                sub_genre: sub_genre.map(str::to_string),
                genre_columns,
            }
        })
        .collect();

    info!(
        "Resolved genres for {} artists ({} without a lookup match)",
        rows.len(),
        unmatched
    );
    GenreOutcome { rows, unmatched }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(sub_genre: &str, genre: &str) -> GenreLookupRow {
        let mut columns = BTreeMap::new();
        columns.insert("genre".to_string(), Value::from(genre));
        GenreLookupRow {
            sub_genre: sub_genre.to_string(),
            columns,
        }
    }

    fn artist(id: &str, genres: &[&str]) -> RawArtist {
        RawArtist {
            artist_id: id.to_string(),
            name: id.to_uppercase(),
            followers: 10,
            popularity: 55,
            genres: genres.iter().map(|g| g.to_string()).collect(),
        }
    }

    #[test]
    fn test_key_form_strips_punctuation_and_keeps_case() {
        assert_eq!(to_key_form(Some("Hip-Hop  & Rap!")), "HipHop_Rap");
        assert_eq!(to_key_form(Some("  dance pop ")), "dance_pop");
        assert_eq!(to_key_form(Some("R&B")), "RB");
    }

    #[test]
    fn test_key_form_of_nothing_is_empty() {
        assert_eq!(to_key_form(None), "");
        assert_eq!(to_key_form(Some("")), "");
        assert_eq!(to_key_form(Some("?!")), "");
    }

    #[test]
    fn test_key_form_drops_non_ascii_letters() {
        assert_eq!(to_key_form(Some("música mexicana")), "msica_mexicana");
    }

    #[test]
    fn test_key_form_is_idempotent() {
        for label in ["Hip-Hop  & Rap!", "k-pop boy group", "lo_fi beats", "  ", "A\tB\nC"] {
            let once = to_key_form(Some(label));
            assert_eq!(to_key_form(Some(once.as_str())), once);
        }
    }

    #[test]
    fn test_sub_genre_is_first_listed() {
        assert_eq!(sub_genre(&artist("a1", &["pop", "dance pop"])), Some("pop"));
        assert_eq!(sub_genre(&artist("a2", &[])), None);
    }

    #[test]
    fn test_lookup_keys_use_same_normalization() {
        let rows = vec![lookup("Hip Hop!", "hip hop")];
        let (index, warnings) = GenreIndex::build(&rows);

        assert!(warnings.is_empty());
        let artists = vec![artist("a1", &["hip-hop"]), artist("a2", &["Hip  Hop"])];
        let outcome = resolve_genres(&artists, &index);

        assert_eq!(outcome.rows[0].genre_columns["genre"], Value::Null);
        assert_eq!(outcome.rows[1].genre_columns["genre"], Value::from("hip hop"));
        assert_eq!(outcome.unmatched, 1);
    }

    #[test]
    fn test_unmatched_artist_is_kept_with_null_columns() {
        let rows = vec![lookup("pop", "pop")];
        let (index, _) = GenreIndex::build(&rows);
        let artists = vec![artist("a1", &["polka"]), artist("a2", &[])];

        let outcome = resolve_genres(&artists, &index);

        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(outcome.unmatched, 2);
        let first = &outcome.rows[0];
        assert_eq!(first.artist_id, "a1");
        assert_eq!(first.name, "A1");
        assert_eq!(first.followers, 10);
        assert_eq!(first.artist_popularity, 55);
        assert_eq!(first.sub_genre.as_deref(), Some("polka"));
        assert_eq!(first.genre_columns["genre"], Value::Null);
        assert_eq!(outcome.rows[1].sub_genre, None);
    }

    #[test]
    fn test_ambiguous_key_does_not_fan_out() {
        let rows = vec![
            lookup("dance pop", "pop"),
            lookup("Dance-Pop", "edm"),
            lookup("dance  pop", "other"),
        ];
        let (index, warnings) = GenreIndex::build(&rows);

        assert_eq!(
            warnings,
            vec![PipelineWarning::AmbiguousJoinKey {
                key: "dance_pop".to_string(),
                rows: 2,
            }]
        );

        let outcome = resolve_genres(&[artist("a1", &["dance pop"])], &index);
        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.rows[0].genre_columns["genre"], Value::from("pop"));
    }

    #[test]
    fn test_empty_lookup_key_never_matches_genreless_artists() {
        let rows = vec![lookup("???", "mystery")];
        let (index, warnings) = GenreIndex::build(&rows);

        assert_eq!(warnings, vec![PipelineWarning::EmptyLookupKey { index: 0 }]);

        let outcome = resolve_genres(&[artist("a1", &[])], &index);
        assert_eq!(outcome.rows[0].genre_columns["genre"], Value::Null);
    }

    #[test]
    fn test_columns_are_union_of_lookup_rows() {
        let mut wide = lookup("rock", "rock");
        wide.columns.insert("decade".to_string(), Value::from("70s"));
        let rows = vec![lookup("pop", "pop"), wide];
        let (index, _) = GenreIndex::build(&rows);

        assert_eq!(index.columns().collect::<Vec<_>>(), vec!["decade", "genre"]);

        let outcome = resolve_genres(&[artist("a1", &["pop"])], &index);
        assert_eq!(outcome.rows[0].genre_columns["decade"], Value::Null);
        assert_eq!(outcome.rows[0].genre_columns["genre"], Value::from("pop"));
    }

    #[test]
    fn test_clashing_lookup_columns_do_not_shadow_artist_columns() {
        let mut row = lookup("pop", "pop");
        row.columns.insert("name".to_string(), Value::from("Pop Music"));
        row.columns.insert("followers".to_string(), Value::from(0));
        let rows = vec![row];
        let (index, warnings) = GenreIndex::build(&rows);

        assert!(warnings.contains(&PipelineWarning::RenamedLookupColumn {
            column: "name".to_string(),
            renamed_to: "name_lookup".to_string(),
        }));
        assert!(warnings.contains(&PipelineWarning::RenamedLookupColumn {
            column: "followers".to_string(),
            renamed_to: "followers_lookup".to_string(),
        }));

        let mut real = artist("a1", &["pop"]);
        real.name = "Real Artist".to_string();
        real.followers = 500;
        let outcome = resolve_genres(&[real], &index);

        let value = serde_json::to_value(&outcome.rows[0]).unwrap();
        assert_eq!(value["name"], Value::from("Real Artist"));
        assert_eq!(value["followers"], Value::from(500));
        assert_eq!(value["name_lookup"], Value::from("Pop Music"));
        assert_eq!(value["followers_lookup"], Value::from(0));
        assert_eq!(value["genre"], Value::from("pop"));
    }

    #[test]
    fn test_renamed_column_skips_names_already_taken() {
        let mut row = lookup("pop", "pop");
        row.columns.insert("genres".to_string(), Value::from("a"));
        row.columns.insert("genres_lookup".to_string(), Value::from("b"));
        let rows = vec![row];
        let (index, _) = GenreIndex::build(&rows);

        assert_eq!(
            index.columns().collect::<Vec<_>>(),
            vec!["genre", "genres_lookup", "genres_lookup_lookup"]
        );
    }

    #[test]
    fn test_artist_columns_match_artist_row_fields() {
        let row = ArtistRow {
            artist_id: "a1".to_string(),
            name: "A".to_string(),
            followers: 1,
            genres: vec![],
            artist_popularity: 1,
            sub_genre: None,
            genre_columns: BTreeMap::new(),
        };

        let value = serde_json::to_value(&row).unwrap();
        let mut fields: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        let mut expected = ARTIST_COLUMNS.to_vec();
        fields.sort();
        expected.sort();
        assert_eq!(fields, expected);
    }
}
