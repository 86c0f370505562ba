use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::models::{ChordSet, Song};

/// Case-insensitive set of genres
#[derive(Debug, Clone, PartialEq)]
pub struct GenreFilter {
    genres: HashSet<String>,
}

impl GenreFilter {
    /// Builds a filter, or `None` when no genre is given
    pub fn from_genres<I, S>(genres: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let genres: HashSet<String> = genres
            .into_iter()
            .map(|g| g.as_ref().trim().to_lowercase())
            .filter(|g| !g.is_empty())
            .collect();

        if genres.is_empty() {
            None
        } else {
            Some(Self { genres })
        }
    }

    pub fn matches(&self, song: &Song) -> bool {
        song.genre
            .as_deref()
            .map(|genre| self.genres.contains(&genre.trim().to_lowercase()))
            .unwrap_or(false)
    }
}

/// Deterministic orderings for song lists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SongOrder {
    /// As listed in the catalog
    #[default]
    Catalog,
    /// Ascending effective difficulty, then catalog order
    Difficulty,
    /// Case-insensitive title, then catalog order
    Title,
}

/// True iff every chord the song requires is known
pub fn is_playable(song: &Song, known: &ChordSet) -> bool {
    song.required_chords.iter().all(|chord| known.contains(chord))
}

/// Songs playable with `known`, in catalog order, optionally restricted by genre
pub fn playable_songs<'a>(
    known: &ChordSet,
    songs: &'a [Song],
    genre_filter: Option<&GenreFilter>,
) -> Vec<&'a Song> {
    songs
        .iter()
        .filter(|song| is_playable(song, known))
        .filter(|song| genre_filter.map_or(true, |filter| filter.matches(song)))
        .collect()
}

pub fn playable_count(known: &ChordSet, songs: &[Song]) -> usize {
    songs.iter().filter(|song| is_playable(song, known)).count()
}

/// Reorders a catalog-ordered list. Sorting is stable, so ties keep catalog order.
pub fn sort_songs(songs: &mut [&Song], order: SongOrder) {
    match order {
        SongOrder::Catalog => {}
        SongOrder::Difficulty => songs.sort_by_key(|song| song.effective_difficulty()),
        SongOrder::Title => songs.sort_by_cached_key(|song| song.title.to_lowercase()),
    }
}
