use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::{
    catalog::{CacheStatus, CatalogCache},
    error::{AppError, AppResult},
    models::{parse_chord_set, ChordInventory, ChordSet, KnownChordPolicy, Song},
    services::{
        group::{self, UnreachableMemberPolicy},
        inventory::{fetch_inventories, InventorySource},
        playability::{self, GenreFilter, SongOrder},
        recommendations::{self, ChordRecommendation, LearningStep},
    },
};

/// A learner's chords, either as a plain list or as a full inventory
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum KnownChords {
    Chords(Vec<String>),
    Inventory(ChordInventory),
}

impl Default for KnownChords {
    fn default() -> Self {
        Self::Chords(Vec::new())
    }
}

impl From<Vec<String>> for KnownChords {
    fn from(chords: Vec<String>) -> Self {
        Self::Chords(chords)
    }
}

impl From<ChordInventory> for KnownChords {
    fn from(inventory: ChordInventory) -> Self {
        Self::Inventory(inventory)
    }
}

/// What a group can play together
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GroupRepertoire {
    pub chords: BTreeSet<String>,
    pub songs: Vec<Song>,
}

/// Entry point for callers: binds the pure evaluators to the catalog cache
///
/// Every operation reads one snapshot and computes over it, so a refresh in
/// the middle of a call never mixes two catalog versions.
pub struct Recommender {
    cache: Arc<CatalogCache>,
    known_chord_policy: KnownChordPolicy,
    unreachable_member_policy: UnreachableMemberPolicy,
}

impl Recommender {
    pub fn new(cache: Arc<CatalogCache>) -> Self {
        Self {
            cache,
            known_chord_policy: KnownChordPolicy::default(),
            unreachable_member_policy: UnreachableMemberPolicy::default(),
        }
    }

    pub fn with_known_chord_policy(mut self, policy: KnownChordPolicy) -> Self {
        self.known_chord_policy = policy;
        self
    }

    pub fn with_unreachable_member_policy(mut self, policy: UnreachableMemberPolicy) -> Self {
        self.unreachable_member_policy = policy;
        self
    }

    /// Normalizes caller input into the set used by the evaluators
    pub fn resolve_known(&self, known: &KnownChords) -> AppResult<ChordSet> {
        match known {
            KnownChords::Chords(chords) => parse_chord_set(chords),
            KnownChords::Inventory(inventory) => {
                parse_chord_set(inventory.known_chords(self.known_chord_policy))
            }
        }
    }

    pub async fn playable_songs(
        &self,
        known: &KnownChords,
        genres: &[String],
        order: SongOrder,
    ) -> AppResult<Vec<Song>> {
        let known = self.resolve_known(known)?;
        let genre_filter = GenreFilter::from_genres(genres);
        let snapshot = self.cache.get_snapshot().await?;

        let mut songs = playability::playable_songs(&known, snapshot.songs(), genre_filter.as_ref());
        playability::sort_songs(&mut songs, order);

        tracing::info!(
            known = known.len(),
            genres = genres.len(),
            playable = songs.len(),
            "Playable songs evaluated"
        );

        Ok(songs.into_iter().cloned().collect())
    }

    /// Best next chord; candidates default to every chord in the catalog
    pub async fn recommend_chord(
        &self,
        known: &KnownChords,
        all_chords: Option<&[String]>,
    ) -> AppResult<ChordRecommendation> {
        let known = self.resolve_known(known)?;
        let snapshot = self.cache.get_snapshot().await?;

        match all_chords {
            Some(chords) => {
                let all: BTreeSet<String> = parse_chord_set(chords)?.into_iter().collect();
                recommendations::recommend_chord(&known, &all, &snapshot)
            }
            None => recommendations::recommend_chord(&known, snapshot.chord_ids(), &snapshot),
        }
    }

    pub async fn songs_unlocked_by(
        &self,
        known: &KnownChords,
        chord: &str,
    ) -> AppResult<Vec<Song>> {
        let known = self.resolve_known(known)?;
        let chord = parse_chord_set([chord])?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::InvalidInput("A chord is required".to_string()))?;
        let snapshot = self.cache.get_snapshot().await?;

        let unlocked = recommendations::songs_unlocked_by(&known, &chord, &snapshot);
        tracing::info!(chord = %chord, unlocked = unlocked.len(), "Unlocked songs computed");

        Ok(unlocked.into_iter().cloned().collect())
    }

    pub async fn personalized_songs(
        &self,
        known: &KnownChords,
        genre_preferences: &[String],
    ) -> AppResult<Vec<Song>> {
        let known = self.resolve_known(known)?;
        let preferences = GenreFilter::from_genres(genre_preferences);
        let snapshot = self.cache.get_snapshot().await?;

        let ranked =
            recommendations::personalized_songs(&known, preferences.as_ref(), snapshot.songs())?;
        tracing::info!(
            known = known.len(),
            preferred_genres = genre_preferences.len(),
            ranked = ranked.len(),
            "Personalized songs ranked"
        );

        Ok(ranked.into_iter().cloned().collect())
    }

    pub async fn learning_path(
        &self,
        known: &KnownChords,
        target_song_id: &str,
    ) -> AppResult<Vec<LearningStep>> {
        let known = self.resolve_known(known)?;
        let snapshot = self.cache.get_snapshot().await?;

        let target = snapshot
            .song(target_song_id)
            .ok_or_else(|| AppError::NotFound(format!("Song {} not found", target_song_id)))?;

        let path = recommendations::learning_path(&known, target, &snapshot)?;
        tracing::info!(song = %target.id, steps = path.len(), "Learning path built");

        Ok(path)
    }

    /// Chords every member knows, sorted
    pub fn overlapping_chords(&self, members: &[KnownChords]) -> AppResult<BTreeSet<String>> {
        let sets = self.resolve_members(members)?;
        Ok(group::overlapping_chords(&sets).into_iter().collect())
    }

    pub async fn group_playable_songs(&self, members: &[KnownChords]) -> AppResult<GroupRepertoire> {
        let sets = self.resolve_members(members)?;
        let snapshot = self.cache.get_snapshot().await?;
        Ok(Self::repertoire(&sets, snapshot.songs()))
    }

    /// Fetches every member's inventory and computes what the group can play
    pub async fn group_repertoire(
        &self,
        inventories: Arc<dyn InventorySource>,
        user_ids: Vec<String>,
    ) -> AppResult<GroupRepertoire> {
        let members = user_ids.len();
        let policy = self.known_chord_policy;

        let fetched = fetch_inventories(inventories, user_ids).await;
        let sets = group::resolve_member_sets(fetched, self.unreachable_member_policy)?
            .iter()
            .map(|inventory| parse_chord_set(inventory.known_chords(policy)))
            .collect::<AppResult<Vec<ChordSet>>>()?;
        let snapshot = self.cache.get_snapshot().await?;
        let repertoire = Self::repertoire(&sets, snapshot.songs());

        tracing::info!(
            members = members,
            chords = repertoire.chords.len(),
            songs = repertoire.songs.len(),
            "Group repertoire computed"
        );

        Ok(repertoire)
    }

    pub async fn catalog_status(&self) -> CacheStatus {
        self.cache.status().await
    }

    pub async fn invalidate_catalog(&self) {
        self.cache.invalidate().await
    }

    fn resolve_members(&self, members: &[KnownChords]) -> AppResult<Vec<ChordSet>> {
        members.iter().map(|m| self.resolve_known(m)).collect()
    }

    fn repertoire(sets: &[ChordSet], songs: &[Song]) -> GroupRepertoire {
        GroupRepertoire {
            chords: group::overlapping_chords(sets).into_iter().collect(),
            songs: group::playable_songs_for_group(sets, songs)
                .into_iter()
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, MockCatalogSource, StaticCatalogSource};
    use crate::models::{Chord, Mastery};
    use crate::services::inventory::StaticInventorySource;
    use std::collections::HashMap;
    use std::time::Duration;

    fn catalog() -> Catalog {
        Catalog {
            chords: vec![
                Chord::bare("Am"),
                Chord::bare("C"),
                Chord::bare("D"),
                Chord::bare("F"),
                Chord::bare("G"),
            ],
            songs: vec![
                Song::new("song-a", ["C", "G"]).with_genre("folk"),
                Song::new("song-b", ["C", "G", "Am", "F"]).with_genre("pop"),
                Song::new("song-c", ["C", "G", "Am"]).with_genre("pop"),
                Song::new("song-d", ["G", "D"]).with_genre("rock"),
            ],
        }
    }

    fn recommender() -> Recommender {
        let source = Arc::new(StaticCatalogSource::new(catalog()));
        Recommender::new(Arc::new(CatalogCache::with_default_ttl(source)))
    }

    fn chords(ids: &[&str]) -> KnownChords {
        KnownChords::Chords(ids.iter().map(|c| c.to_string()).collect())
    }

    fn ids(songs: &[Song]) -> Vec<&str> {
        songs.iter().map(|s| s.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_playable_songs_normalizes_input() {
        let songs = recommender()
            .playable_songs(&chords(&[" C ", "G"]), &[], SongOrder::Catalog)
            .await
            .unwrap();
        assert_eq!(ids(&songs), vec!["song-a"]);
    }

    #[tokio::test]
    async fn test_playable_songs_rejects_invalid_chord() {
        let err = recommender()
            .playable_songs(&chords(&["C", "N"]), &[], SongOrder::Catalog)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_recommend_chord_uses_catalog_chords_by_default() {
        let rec = recommender()
            .recommend_chord(&chords(&["C", "G"]), None)
            .await
            .unwrap();
        assert_eq!(rec.chord, "Am");
        assert_eq!(rec.unlocked_songs, vec!["song-c".to_string()]);
    }

    #[tokio::test]
    async fn test_recommend_chord_with_explicit_candidates() {
        let all: Vec<String> = ["C", "G", "D"].iter().map(|c| c.to_string()).collect();
        let rec = recommender()
            .recommend_chord(&chords(&["C", "G"]), Some(&all))
            .await
            .unwrap();
        assert_eq!(rec.chord, "D");
        assert_eq!(rec.unlocked_count, 1);
    }

    #[tokio::test]
    async fn test_recommend_chord_without_candidates() {
        let err = recommender()
            .recommend_chord(&chords(&["Am", "C", "D", "F", "G"]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NoCandidateAvailable(_)));
    }

    #[tokio::test]
    async fn test_songs_unlocked_by() {
        let songs = recommender()
            .songs_unlocked_by(&chords(&["C", "G", "F"]), "Amin")
            .await
            .unwrap();
        assert_eq!(ids(&songs), vec!["song-b", "song-c"]);
    }

    #[tokio::test]
    async fn test_personalized_songs_prefers_genre() {
        let songs = recommender()
            .personalized_songs(&chords(&["C", "G", "Am", "D"]), &["pop".to_string()])
            .await
            .unwrap();
        assert_eq!(ids(&songs), vec!["song-c", "song-a", "song-d"]);
    }

    #[tokio::test]
    async fn test_learning_path_unknown_song() {
        let err = recommender()
            .learning_path(&chords(&["C"]), "missing")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_learning_path_for_catalog_song() {
        let path = recommender()
            .learning_path(&chords(&["C", "G"]), "song-b")
            .await
            .unwrap();
        let order: Vec<&str> = path.iter().map(|s| s.chord.as_str()).collect();
        assert_eq!(order, vec!["Am", "F"]);
    }

    #[tokio::test]
    async fn test_inventory_input_respects_known_chord_policy() {
        let inventory = ChordInventory::new()
            .with("C", Mastery::Mastered)
            .and_then(|i| i.with("G", Mastery::InProgress))
            .unwrap();
        let known = KnownChords::Inventory(inventory);

        let any = recommender()
            .playable_songs(&known, &[], SongOrder::Catalog)
            .await
            .unwrap();
        assert_eq!(ids(&any), vec!["song-a"]);

        let mastered_only = recommender()
            .with_known_chord_policy(KnownChordPolicy::Mastered)
            .playable_songs(&known, &[], SongOrder::Catalog)
            .await
            .unwrap();
        assert!(mastered_only.is_empty());
    }

    #[test]
    fn test_overlapping_chords_is_sorted() {
        let overlap = recommender()
            .overlapping_chords(&[chords(&["G", "C", "D"]), chords(&["D", "G", "Am"])])
            .unwrap();
        assert_eq!(overlap.into_iter().collect::<Vec<_>>(), vec!["D", "G"]);
    }

    #[tokio::test]
    async fn test_group_playable_songs() {
        let repertoire = recommender()
            .group_playable_songs(&[chords(&["C", "G", "D"]), chords(&["G", "D", "Am"])])
            .await
            .unwrap();
        assert_eq!(ids(&repertoire.songs), vec!["song-d"]);
    }

    #[tokio::test]
    async fn test_group_repertoire_treats_missing_member_as_empty() {
        let mut inventories = HashMap::new();
        inventories.insert(
            "alice".to_string(),
            ChordInventory::new().with("C", Mastery::Mastered).unwrap(),
        );
        let source: Arc<dyn InventorySource> = Arc::new(StaticInventorySource::new(inventories));

        let repertoire = recommender()
            .group_repertoire(source, vec!["alice".to_string(), "ghost".to_string()])
            .await
            .unwrap();
        assert!(repertoire.chords.is_empty());
        assert!(repertoire.songs.is_empty());
    }

    #[tokio::test]
    async fn test_group_repertoire_fail_policy() {
        let source: Arc<dyn InventorySource> = Arc::new(StaticInventorySource::default());

        let err = recommender()
            .with_unreachable_member_policy(UnreachableMemberPolicy::Fail)
            .group_repertoire(source, vec!["ghost".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::CatalogUnavailable(_)));
    }

    #[tokio::test]
    async fn test_group_repertoire_bad_inventory_data_is_invalid_input() {
        let bad: ChordInventory =
            serde_json::from_value(serde_json::json!({ "C": "mastered", "N": "mastered" }))
                .unwrap();
        let good = ChordInventory::new().with("C", Mastery::Mastered).unwrap();

        for policy in [UnreachableMemberPolicy::TreatAsEmpty, UnreachableMemberPolicy::Fail] {
            let mut inventories = HashMap::new();
            inventories.insert("alice".to_string(), bad.clone());
            inventories.insert("bob".to_string(), good.clone());
            let source: Arc<dyn InventorySource> =
                Arc::new(StaticInventorySource::new(inventories));

            let err = recommender()
                .with_unreachable_member_policy(policy)
                .group_repertoire(source, vec!["alice".to_string(), "bob".to_string()])
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::InvalidInput(_)), "{:?}: {:?}", policy, err);
            assert!(!err.is_retryable());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_refetch_after_ttl_expiry() {
        let mut source = MockCatalogSource::new();
        source
            .expect_fetch_catalog()
            .times(2)
            .returning(|| Ok(catalog()));
        source.expect_name().return_const("mock");

        let cache = Arc::new(CatalogCache::new(Arc::new(source), Duration::from_secs(60)));
        let recommender = Recommender::new(cache);
        let known = chords(&["C", "G"]);

        for _ in 0..3 {
            recommender
                .playable_songs(&known, &[], SongOrder::Catalog)
                .await
                .unwrap();
        }

        tokio::time::advance(Duration::from_secs(61)).await;

        for _ in 0..3 {
            recommender
                .playable_songs(&known, &[], SongOrder::Catalog)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_catalog_unavailable_propagates() {
        let mut source = MockCatalogSource::new();
        source
            .expect_fetch_catalog()
            .returning(|| Err(AppError::ExternalApi("down".to_string())));
        source.expect_name().return_const("mock");

        let recommender = Recommender::new(Arc::new(CatalogCache::with_default_ttl(Arc::new(source))));
        let err = recommender
            .playable_songs(&chords(&["C"]), &[], SongOrder::Catalog)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::CatalogUnavailable(_)));
        assert!(err.is_retryable());
    }
}
