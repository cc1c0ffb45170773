use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, de};

use crate::entities::{director, genre, movie};

/// Public representation of a movie. Related records are referenced by id
/// only, never embedded.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MovieView {
    pub id: i32,
    pub title: Option<String>,
    pub description: Option<String>,
    pub trailer: Option<String>,
    pub year: Option<i32>,
    pub rating: Option<f64>,
    pub genre_id: Option<i32>,
    pub director_id: Option<i32>,
}

impl From<movie::Model> for MovieView {
    fn from(m: movie::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
            description: m.description,
            trailer: m.trailer,
            year: m.year,
            rating: m.rating,
            genre_id: m.genre_id,
            director_id: m.director_id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DirectorView {
    pub id: i32,
    pub name: String,
}

impl From<director::Model> for DirectorView {
    fn from(m: director::Model) -> Self {
        Self { id: m.id, name: m.name }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GenreView {
    pub id: i32,
    pub name: String,
}

impl From<genre::Model> for GenreView {
    fn from(m: genre::Model) -> Self {
        Self { id: m.id, name: m.name }
    }
}

/// Body of POST and PUT on directors and genres.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NameInput {
    pub name: String,
}

/// Body of PATCH on directors and genres.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NamePatch {
    #[serde(default)]
    pub name: Option<String>,
}

impl NamePatch {
    /// The replacement name, if one was supplied and is non-empty.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct MovieFilter {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub genre_id: Option<i32>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub director_id: Option<i32>,
}

fn empty_string_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(de::Error::custom),
    }
}
