//! Inventory collaborator abstraction
//!
//! Chord inventories are created and mutated elsewhere; this core only reads
//! snapshots of them.

use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::ChordInventory,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait InventorySource: Send + Sync {
    /// Fetch the current chord inventory of one user
    async fn fetch_inventory(&self, user_id: &str) -> AppResult<ChordInventory>;
}

/// Fetches several users' inventories in parallel
///
/// Results keep the order of `user_ids`; a failed fetch is returned in place
/// rather than failing the batch.
pub async fn fetch_inventories(
    source: Arc<dyn InventorySource>,
    user_ids: Vec<String>,
) -> Vec<(String, AppResult<ChordInventory>)> {
    let mut tasks = Vec::with_capacity(user_ids.len());

    for user_id in user_ids {
        let source = source.clone();
        let task = tokio::spawn(async move {
            let result = source.fetch_inventory(&user_id).await;
            (user_id, result)
        });
        tasks.push(task);
    }

    let mut results = Vec::with_capacity(tasks.len());
    for task in tasks {
        match task.await {
            Ok(result) => results.push(result),
            Err(e) => {
                tracing::error!(error = %e, "Inventory fetch task failed");
                results.push((
                    String::from("<unknown>"),
                    Err(AppError::Internal(e.to_string())),
                ));
            }
        }
    }

    let failed = results.iter().filter(|(_, r)| r.is_err()).count();
    if failed > 0 {
        tracing::warn!(
            success_count = results.len() - failed,
            error_count = failed,
            "Partial inventory fetch failure"
        );
    }

    results
}

/// Serves inventories from memory
#[derive(Debug, Clone, Default)]
pub struct StaticInventorySource {
    inventories: HashMap<String, ChordInventory>,
}

impl StaticInventorySource {
    pub fn new(inventories: HashMap<String, ChordInventory>) -> Self {
        Self { inventories }
    }
}

#[async_trait::async_trait]
impl InventorySource for StaticInventorySource {
    async fn fetch_inventory(&self, user_id: &str) -> AppResult<ChordInventory> {
        self.inventories
            .get(user_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("No inventory for user {}", user_id)))
    }
}
