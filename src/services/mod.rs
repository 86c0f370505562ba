pub mod group;
pub mod inventory;
pub mod playability;
pub mod recommendations;
pub mod recommender;

pub use group::{overlapping_chords, playable_songs_for_group, UnreachableMemberPolicy};
#[cfg(test)]
pub use inventory::MockInventorySource;
pub use inventory::{fetch_inventories, InventorySource, StaticInventorySource};
pub use playability::{is_playable, playable_songs, GenreFilter, SongOrder};
pub use recommendations::{ChordRecommendation, LearningStep};
pub use recommender::{GroupRepertoire, KnownChords, Recommender};
