use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::{ChordSet, Song},
    services::playability::playable_songs,
};

/// What to do with a group member whose inventory could not be read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnreachableMemberPolicy {
    /// Count the member as knowing no chords, which empties the overlap
    #[default]
    TreatAsEmpty,
    /// Fail the whole group computation
    Fail,
}

/// Chords every member knows
///
/// One member yields that member's set unchanged; no members yield an empty
/// set. The result does not depend on member order.
pub fn overlapping_chords(members: &[ChordSet]) -> ChordSet {
    let Some(smallest) = members.iter().min_by_key(|m| m.len()) else {
        return ChordSet::new();
    };

    smallest
        .iter()
        .filter(|chord| members.iter().all(|m| m.contains(*chord)))
        .cloned()
        .collect()
}

/// Songs the whole group can play together, in catalog order
pub fn playable_songs_for_group<'a>(members: &[ChordSet], songs: &'a [Song]) -> Vec<&'a Song> {
    let overlap = overlapping_chords(members);
    playable_songs(&overlap, songs, None)
}

/// Applies `policy` to per-member fetch results
///
/// Only fetch failures belong here; an unreachable member becomes
/// `T::default()`, which is the empty inventory or chord set.
pub fn resolve_member_sets<T: Default>(
    results: Vec<(String, AppResult<T>)>,
    policy: UnreachableMemberPolicy,
) -> AppResult<Vec<T>> {
    let mut members = Vec::with_capacity(results.len());

    for (member, result) in results {
        match (result, policy) {
            (Ok(member_data), _) => members.push(member_data),
            (Err(e), UnreachableMemberPolicy::TreatAsEmpty) => {
                tracing::warn!(
                    member = %member,
                    error = %e,
                    "Group member inventory unavailable, treating as empty"
                );
                members.push(T::default());
            }
            (Err(e), UnreachableMemberPolicy::Fail) => {
                tracing::error!(member = %member, error = %e, "Group member inventory unavailable");
                return Err(AppError::CatalogUnavailable(format!(
                    "Inventory for group member {} is unavailable: {}",
                    member, e
                )));
            }
        }
    }

    Ok(members)
}
