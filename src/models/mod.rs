pub mod chord;
pub mod inventory;
pub mod song;

pub use chord::{normalize_chord_symbol, parse_chord_set, Chord, ChordSet};
pub use inventory::{ChordInventory, KnownChordPolicy, Mastery};
pub use song::Song;
