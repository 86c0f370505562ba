use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A catalog song and the chords needed to play it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    /// Duplicates collapse and order is irrelevant
    #[serde(alias = "chords")]
    pub required_chords: BTreeSet<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub difficulty: Option<u8>,
    /// Free-form labels such as `genre:rock` or `decade:1990`
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Song {
    pub fn new<I, S>(id: impl Into<String>, required_chords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            title: String::new(),
            artist: String::new(),
            required_chords: required_chords.into_iter().map(Into::into).collect(),
            genre: None,
            difficulty: None,
            tags: Vec::new(),
        }
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    pub fn with_difficulty(mut self, difficulty: u8) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Declared difficulty, or one derived from how many distinct chords the song uses
    pub fn effective_difficulty(&self) -> u8 {
        self.difficulty
            .unwrap_or(match self.required_chords.len() {
                0..=4 => 1,
                5..=6 => 2,
                _ => 3,
            })
    }

    /// Genre carried in the tags, for songs that have no `genre` field
    ///
    /// A `genre:` tag wins; otherwise the first tag without a `name:` prefix
    /// is used.
    pub fn genre_from_tags(&self) -> Option<String> {
        let tags = || self.tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty());

        tags()
            .find_map(|t| t.strip_prefix("genre:"))
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .or_else(|| tags().find(|t| !t.contains(':')))
            .map(str::to_string)
    }
}
