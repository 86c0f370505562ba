use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeSet;

use crate::{
    catalog::CacheStatus,
    error::{AppError, AppResult},
    models::Song,
    services::{ChordRecommendation, GroupRepertoire, KnownChords, LearningStep, SongOrder},
};

use super::AppState;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct PlayableSongsRequest {
    pub known_chords: KnownChords,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub order: SongOrder,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ChordRecommendationRequest {
    pub known_chords: KnownChords,
    /// Candidate universe; the catalog's chords when absent
    pub all_chords: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct UnlockRequest {
    pub known_chords: KnownChords,
    pub chord: String,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PersonalizedSongsRequest {
    pub known_chords: KnownChords,
    #[serde(default)]
    pub genre_preferences: Vec<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct LearningPathRequest {
    pub known_chords: KnownChords,
    pub song_id: String,
}

#[derive(Debug, Deserialize)]
pub struct GroupRequest {
    pub members: Vec<KnownChords>,
}

#[derive(Debug, Serialize)]
pub struct SongPage {
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
    pub songs: Vec<Song>,
}

#[derive(Debug, Serialize)]
pub struct LearningPathResponse {
    pub song_id: String,
    pub steps: Vec<LearningStep>,
}

#[derive(Debug, Serialize)]
pub struct OverlapResponse {
    pub chords: BTreeSet<String>,
}

fn paginate(
    songs: Vec<Song>,
    limit: Option<usize>,
    offset: Option<usize>,
    default_limit: usize,
) -> AppResult<SongPage> {
    let limit = limit.unwrap_or(default_limit);
    if limit == 0 {
        return Err(AppError::InvalidInput("limit must be greater than 0".to_string()));
    }
    let offset = offset.unwrap_or(0);
    let total = songs.len();

    Ok(SongPage {
        total,
        offset,
        limit,
        songs: songs.into_iter().skip(offset).take(limit).collect(),
    })
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

pub async fn playable_songs(
    State(state): State<AppState>,
    Json(request): Json<PlayableSongsRequest>,
) -> AppResult<Json<SongPage>> {
    let songs = state
        .recommender
        .playable_songs(&request.known_chords, &request.genres, request.order)
        .await?;
    let page = paginate(songs, request.limit, request.offset, state.default_page_size)?;
    Ok(Json(page))
}

pub async fn recommend_chord(
    State(state): State<AppState>,
    Json(request): Json<ChordRecommendationRequest>,
) -> AppResult<Json<ChordRecommendation>> {
    let recommendation = state
        .recommender
        .recommend_chord(&request.known_chords, request.all_chords.as_deref())
        .await?;
    Ok(Json(recommendation))
}

/// Songs that adding one chord would make playable
pub async fn unlocked_songs(
    State(state): State<AppState>,
    Json(request): Json<UnlockRequest>,
) -> AppResult<Json<SongPage>> {
    let songs = state
        .recommender
        .songs_unlocked_by(&request.known_chords, &request.chord)
        .await?;
    let page = paginate(songs, request.limit, request.offset, state.default_page_size)?;
    Ok(Json(page))
}

pub async fn personalized_songs(
    State(state): State<AppState>,
    Json(request): Json<PersonalizedSongsRequest>,
) -> AppResult<Json<SongPage>> {
    let songs = state
        .recommender
        .personalized_songs(&request.known_chords, &request.genre_preferences)
        .await?;
    let page = paginate(songs, request.limit, request.offset, state.default_page_size)?;
    Ok(Json(page))
}

pub async fn learning_path(
    State(state): State<AppState>,
    Json(request): Json<LearningPathRequest>,
) -> AppResult<Json<LearningPathResponse>> {
    let steps = state
        .recommender
        .learning_path(&request.known_chords, &request.song_id)
        .await?;
    Ok(Json(LearningPathResponse {
        song_id: request.song_id,
        steps,
    }))
}

pub async fn group_overlap(
    State(state): State<AppState>,
    Json(request): Json<GroupRequest>,
) -> AppResult<Json<OverlapResponse>> {
    let chords = state.recommender.overlapping_chords(&request.members)?;
    Ok(Json(OverlapResponse { chords }))
}

pub async fn group_songs(
    State(state): State<AppState>,
    Json(request): Json<GroupRequest>,
) -> AppResult<Json<GroupRepertoire>> {
    let repertoire = state
        .recommender
        .group_playable_songs(&request.members)
        .await?;
    Ok(Json(repertoire))
}

pub async fn catalog_status(State(state): State<AppState>) -> Json<CacheStatus> {
    Json(state.recommender.catalog_status().await)
}

/// Forces the next request to refetch the catalog
pub async fn invalidate_catalog(State(state): State<AppState>) -> StatusCode {
    state.recommender.invalidate_catalog().await;
    StatusCode::NO_CONTENT
}
