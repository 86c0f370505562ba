use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::models::{normalize_chord_symbol, Chord, Song};

/// Catalog document as delivered by a catalog collaborator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogPayload {
    #[serde(default)]
    pub chords: Vec<Chord>,
    #[serde(default)]
    pub songs: Vec<Song>,
}

/// Accepted catalog document shapes: the full payload, or a bare song list
/// as produced by the song import scripts
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CatalogDocument {
    Full(CatalogPayload),
    SongsOnly(Vec<Song>),
}

impl From<CatalogDocument> for CatalogPayload {
    fn from(document: CatalogDocument) -> Self {
        match document {
            CatalogDocument::Full(payload) => payload,
            CatalogDocument::SongsOnly(songs) => CatalogPayload {
                chords: Vec::new(),
                songs,
            },
        }
    }
}

/// A validated catalog: normalized chord symbols, unique ids, and every chord
/// a song requires present in the chord list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    pub chords: Vec<Chord>,
    pub songs: Vec<Song>,
}

impl Catalog {
    /// Validates a payload, dropping entries that cannot be used
    ///
    /// Chords with invalid symbols and songs that reference one are skipped.
    /// Duplicate ids keep their first occurrence. Chords referenced only by
    /// songs are added without notes.
    pub fn from_payload(payload: CatalogPayload) -> Self {
        let mut chords = Vec::with_capacity(payload.chords.len());
        let mut chord_ids = HashSet::new();

        for mut chord in payload.chords {
            match normalize_chord_symbol(&chord.id) {
                Ok(id) if chord_ids.insert(id.clone()) => {
                    chord.id = id;
                    chords.push(chord);
                }
                Ok(id) => {
                    tracing::debug!(chord = %id, "Duplicate chord in catalog, keeping first");
                }
                Err(e) => {
                    tracing::warn!(chord = %chord.id, error = %e, "Skipping invalid catalog chord");
                }
            }
        }

        let mut songs = Vec::with_capacity(payload.songs.len());
        let mut song_ids = HashSet::new();
        let mut skipped = 0usize;

        for mut song in payload.songs {
            let required: Result<BTreeSet<String>, _> = song
                .required_chords
                .iter()
                .map(|c| normalize_chord_symbol(c))
                .collect();

            let required = match required {
                Ok(required) => required,
                Err(e) => {
                    tracing::warn!(song_id = %song.id, error = %e, "Skipping song with invalid chord");
                    skipped += 1;
                    continue;
                }
            };

            if !song_ids.insert(song.id.clone()) {
                tracing::warn!(song_id = %song.id, "Duplicate song id in catalog, keeping first");
                skipped += 1;
                continue;
            }

            for chord in &required {
                if chord_ids.insert(chord.clone()) {
                    chords.push(Chord::bare(chord.clone()));
                }
            }

            song.required_chords = required;
            if song.genre.is_none() {
                song.genre = song.genre_from_tags();
            }
            songs.push(song);
        }

        if skipped > 0 {
            tracing::warn!(skipped = skipped, "Songs dropped while loading catalog");
        }

        Self { chords, songs }
    }
}

impl From<CatalogDocument> for Catalog {
    fn from(document: CatalogDocument) -> Self {
        Self::from_payload(document.into())
    }
}

/// Immutable, timestamped catalog with lookup indexes built once per refresh
#[derive(Debug)]
pub struct CatalogSnapshot {
    chords: Vec<Chord>,
    songs: Vec<Song>,
    fetched_at: DateTime<Utc>,
    chord_ids: BTreeSet<String>,
    chord_positions: HashMap<String, usize>,
    song_positions: HashMap<String, usize>,
    /// chord id -> positions of the songs requiring it, in catalog order
    songs_by_chord: HashMap<String, Vec<usize>>,
}

impl CatalogSnapshot {
    pub fn new(catalog: Catalog) -> Self {
        let Catalog { chords, songs } = catalog;

        let chord_positions: HashMap<String, usize> = chords
            .iter()
            .enumerate()
            .map(|(i, chord)| (chord.id.clone(), i))
            .collect();

        let chord_ids: BTreeSet<String> = chord_positions.keys().cloned().collect();

        let mut song_positions = HashMap::with_capacity(songs.len());
        let mut songs_by_chord: HashMap<String, Vec<usize>> = HashMap::new();

        for (i, song) in songs.iter().enumerate() {
            song_positions.entry(song.id.clone()).or_insert(i);
            for chord in &song.required_chords {
                songs_by_chord.entry(chord.clone()).or_default().push(i);
            }
        }

        Self {
            chords,
            songs,
            fetched_at: Utc::now(),
            chord_ids,
            chord_positions,
            song_positions,
            songs_by_chord,
        }
    }

    pub fn chords(&self) -> &[Chord] {
        &self.chords
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Every chord id in the catalog, sorted
    pub fn chord_ids(&self) -> &BTreeSet<String> {
        &self.chord_ids
    }

    pub fn chord(&self, id: &str) -> Option<&Chord> {
        self.chord_positions.get(id).map(|&i| &self.chords[i])
    }

    pub fn song(&self, id: &str) -> Option<&Song> {
        self.song_positions.get(id).map(|&i| &self.songs[i])
    }

    /// Catalog positions of the songs that require `chord`, ascending
    pub fn song_positions_requiring(&self, chord: &str) -> &[usize] {
        self.songs_by_chord
            .get(chord)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn songs_requiring<'a>(&'a self, chord: &str) -> impl Iterator<Item = &'a Song> + 'a {
        self.song_positions_requiring(chord)
            .iter()
            .map(move |&i| &self.songs[i])
    }
}

impl From<Catalog> for CatalogSnapshot {
    fn from(catalog: Catalog) -> Self {
        Self::new(catalog)
    }
}
