use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::chord::{normalize_chord_symbol, ChordSet};
use crate::error::AppResult;

/// How far along a user is with a chord
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mastery {
    #[serde(alias = "in progress", alias = "in_progress")]
    InProgress,
    Mastered,
}

/// Which inventory entries count as known when testing playability
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnownChordPolicy {
    /// Any entry, whatever its mastery
    #[default]
    Any,
    /// Only mastered chords
    Mastered,
}

/// Snapshot of one user's chord inventory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChordInventory {
    entries: HashMap<String, Mastery>,
}

impl ChordInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or updates a chord, normalizing its symbol
    pub fn insert(&mut self, chord: &str, mastery: Mastery) -> AppResult<()> {
        let chord = normalize_chord_symbol(chord)?;
        self.entries.insert(chord, mastery);
        Ok(())
    }

    pub fn with(mut self, chord: &str, mastery: Mastery) -> AppResult<Self> {
        self.insert(chord, mastery)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The chords that count as known under `policy`
    pub fn known_chords(&self, policy: KnownChordPolicy) -> ChordSet {
        self.entries
            .iter()
            .filter(|(_, mastery)| match policy {
                KnownChordPolicy::Any => true,
                KnownChordPolicy::Mastered => **mastery == Mastery::Mastered,
            })
            .map(|(chord, _)| chord.clone())
            .collect()
    }
}
