use std::sync::Arc;

use crate::services::Recommender;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<Recommender>,
    /// Page size for list endpoints when the caller gives none
    pub default_page_size: usize,
}

impl AppState {
    pub fn new(recommender: Arc<Recommender>, default_page_size: usize) -> Self {
        Self {
            recommender,
            default_page_size,
        }
    }
}
