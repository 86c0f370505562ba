use serde::Serialize;
use std::cmp::Reverse;
use std::collections::BTreeSet;

use crate::{
    catalog::CatalogSnapshot,
    error::{AppError, AppResult},
    models::{ChordSet, Song},
    services::playability::{playable_songs, GenreFilter},
};

/// The next chord to learn and what it opens up
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChordRecommendation {
    pub chord: String,
    pub unlocked_count: usize,
    /// Ids of the newly playable songs, in catalog order
    pub unlocked_songs: Vec<String>,
}

/// One chord in a learning path
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LearningStep {
    pub chord: String,
    pub difficulty: Option<u8>,
    /// Catalog songs that use this chord at all
    pub songs_using_chord: usize,
    /// Songs that become playable once this step is learned
    pub unlocks: Vec<String>,
}

/// Whether a song needs only `chord` on top of `known`
fn unlocked_with(song: &Song, known: &ChordSet, chord: &str) -> bool {
    song.required_chords
        .iter()
        .all(|required| required == chord || known.contains(required))
}

/// Number of songs that become playable when `chord` is added to `known`
///
/// Only songs requiring `chord` can change state, so this walks the
/// inverted index instead of the whole catalog.
pub fn unlock_count(known: &ChordSet, chord: &str, catalog: &CatalogSnapshot) -> usize {
    if known.contains(chord) {
        return 0;
    }
    catalog
        .songs_requiring(chord)
        .filter(|song| unlocked_with(song, known, chord))
        .count()
}

/// Songs playable with `known ∪ {chord}` but not with `known`, in catalog order
pub fn songs_unlocked_by<'a>(
    known: &ChordSet,
    chord: &str,
    catalog: &'a CatalogSnapshot,
) -> Vec<&'a Song> {
    if known.contains(chord) {
        return Vec::new();
    }
    catalog
        .songs_requiring(chord)
        .filter(|song| unlocked_with(song, known, chord))
        .collect()
}

/// Picks the unknown chord that unlocks the most songs
///
/// Candidates are `all_chords \ known`. Ties go to the lexicographically
/// smallest chord id (byte order), so identical input always yields the same
/// chord.
pub fn recommend_chord(
    known: &ChordSet,
    all_chords: &BTreeSet<String>,
    catalog: &CatalogSnapshot,
) -> AppResult<ChordRecommendation> {
    let mut best: Option<(&str, usize)> = None;
    let mut candidates = 0usize;

    for chord in all_chords.iter().filter(|chord| !known.contains(*chord)) {
        candidates += 1;
        let count = unlock_count(known, chord, catalog);
        // Strictly greater: on ties the earlier, smaller id stays
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((chord.as_str(), count));
        }
    }

    let (chord, unlocked_count) = best.ok_or_else(|| {
        AppError::NoCandidateAvailable("Every chord in the catalog is already known".to_string())
    })?;

    let unlocked_songs = songs_unlocked_by(known, chord, catalog)
        .into_iter()
        .map(|song| song.id.clone())
        .collect();

    tracing::debug!(
        known = known.len(),
        candidates = candidates,
        chord = %chord,
        unlocked = unlocked_count,
        "Chord recommendation computed"
    );

    Ok(ChordRecommendation {
        chord: chord.to_string(),
        unlocked_count,
        unlocked_songs,
    })
}

/// Playable songs ranked for a learner
///
/// Songs in a preferred genre come first. Within each group songs are ordered
/// by ascending effective difficulty, then catalog order.
pub fn personalized_songs<'a>(
    known: &ChordSet,
    genre_preferences: Option<&GenreFilter>,
    songs: &'a [Song],
) -> AppResult<Vec<&'a Song>> {
    if known.is_empty() {
        return Err(AppError::InsufficientInventory(
            "At least one known chord is required for song recommendations".to_string(),
        ));
    }

    let mut ranked = playable_songs(known, songs, None);
    ranked.sort_by_key(|song| {
        let preferred = genre_preferences.map_or(false, |filter| filter.matches(song));
        (!preferred, song.effective_difficulty())
    });

    Ok(ranked)
}

/// Orders the chords still missing for `target` into a learning sequence
///
/// Greedy: each step takes the missing chord that
/// 1. unlocks the most catalog songs given everything learned so far,
/// 2. is used by the most catalog songs,
/// 3. has the lowest chord difficulty (chords without one go last),
/// 4. has the smallest id.
pub fn learning_path(
    known: &ChordSet,
    target: &Song,
    catalog: &CatalogSnapshot,
) -> AppResult<Vec<LearningStep>> {
    let mut remaining: BTreeSet<&str> = target
        .required_chords
        .iter()
        .filter(|chord| !known.contains(*chord))
        .map(String::as_str)
        .collect();

    if remaining.is_empty() {
        return Err(AppError::PreconditionFailed(format!(
            "Song '{}' is already playable",
            target.id
        )));
    }

    let mut learned = known.clone();
    let mut path = Vec::with_capacity(remaining.len());

    while let Some(next) = remaining.iter().copied().min_by_key(|chord| {
        let difficulty = catalog.chord(chord).and_then(|c| c.difficulty);
        (
            Reverse(unlock_count(&learned, chord, catalog)),
            Reverse(catalog.song_positions_requiring(chord).len()),
            difficulty.is_none(),
            difficulty,
            *chord,
        )
    }) {
        let unlocks = songs_unlocked_by(&learned, next, catalog)
            .into_iter()
            .map(|song| song.id.clone())
            .collect();

        path.push(LearningStep {
            chord: next.to_string(),
            difficulty: catalog.chord(next).and_then(|c| c.difficulty),
            songs_using_chord: catalog.song_positions_requiring(next).len(),
            unlocks,
        });

        learned.insert(next.to_string());
        remaining.remove(next);
    }

    tracing::debug!(
        target = %target.id,
        steps = path.len(),
        "Learning path computed"
    );

    Ok(path)
}
