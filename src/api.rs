// Character API - REST routes over the character store
// Every write that sets a house passes the validation gate first

use crate::db::{self, Character, PER_PAGE};
use crate::error::ApiError;
use crate::houses::ValidationGate;
use crate::schema::{validate_store, validate_update, CharacterPayload};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub gate: ValidationGate,
}

impl AppState {
    pub fn new(conn: Connection, gate: ValidationGate) -> Self {
        AppState {
            db: Arc::new(Mutex::new(conn)),
            gate,
        }
    }

    /// Never hold the guard across an `.await`
    fn conn(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.db
            .lock()
            .map_err(|_| ApiError::Internal(anyhow::anyhow!("database lock poisoned")))
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Single character envelope: `{"data": {...}}`
#[derive(Serialize)]
pub struct CharacterResource {
    pub data: CharacterResponse,
}

/// Paginated envelope: `{"data": [...], "meta": {...}}`
#[derive(Serialize)]
pub struct CharacterCollection {
    pub data: Vec<CharacterResponse>,
    pub meta: PageMeta,
}

#[derive(Serialize)]
pub struct PageMeta {
    pub current_page: u32,
    pub last_page: u32,
    pub per_page: u32,
    pub total: i64,
}

/// Character as returned to clients
#[derive(Serialize, Deserialize)]
pub struct CharacterResponse {
    pub id: String,
    pub name: String,
    pub role: String,
    pub school: String,
    pub house: String,
    pub patronus: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Character> for CharacterResponse {
    fn from(c: Character) -> Self {
        Self {
            id: c.id,
            name: c.name,
            role: c.role,
            school: c.school,
            house: c.house,
            patronus: c.patronus,
            created_at: c.created_at.to_rfc3339(),
            updated_at: c.updated_at.to_rfc3339(),
        }
    }
}

impl From<Character> for CharacterResource {
    fn from(c: Character) -> Self {
        Self { data: c.into() }
    }
}

#[derive(Debug, Deserialize)]
pub struct IndexQuery {
    /// Kept raw so junk like `-1` or `abc` falls back to page 1 instead of a 400
    pub page: Option<String>,
    pub house: Option<String>,
}

/// Requested page number; missing, non-numeric or below 1 means 1
pub fn page_number(raw: Option<&str>) -> u32 {
    raw.and_then(|p| p.trim().parse::<i64>().ok())
        .map(|p| p.clamp(1, u32::MAX as i64) as u32)
        .unwrap_or(1)
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/v1/characters - Paginated listing, optionally filtered by house
async fn index(
    State(state): State<AppState>,
    Query(query): Query<IndexQuery>,
) -> Result<Json<CharacterCollection>, ApiError> {
    let conn = state.conn()?;
    let house = query.house.as_deref().map(str::trim).filter(|h| !h.is_empty());
    let page_no = page_number(query.page.as_deref());
    let page = db::list_characters(&conn, house, page_no, PER_PAGE)?;

    Ok(Json(CharacterCollection {
        data: page.items.into_iter().map(Into::into).collect(),
        meta: PageMeta {
            current_page: page.current_page,
            last_page: page.last_page,
            per_page: page.per_page,
            total: page.total,
        },
    }))
}

/// POST /api/v1/characters - Create after shape check and house gate
async fn store(
    State(state): State<AppState>,
    payload: Result<Json<CharacterPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<CharacterResource>), ApiError> {
    let Json(payload) = payload?;
    let new = validate_store(&payload)?;

    state.gate.enforce(&new.house).await?;

    let conn = state.conn()?;
    let character = db::insert_character(&conn, &new)?;
    tracing::info!(id = %character.id, house = %character.house, "character created");

    Ok((StatusCode::CREATED, Json(character.into())))
}

/// GET /api/v1/characters/:id
async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CharacterResource>, ApiError> {
    let conn = state.conn()?;
    let character = db::get_character(&conn, &id)?.ok_or(ApiError::NotFound(id))?;

    Ok(Json(character.into()))
}

/// PUT /api/v1/characters/:id - Partial update; house changes go through the gate
async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<CharacterPayload>, JsonRejection>,
) -> Result<Json<CharacterResource>, ApiError> {
    let Json(payload) = payload?;
    let changes = validate_update(&payload)?;

    {
        let conn = state.conn()?;
        if db::get_character(&conn, &id)?.is_none() {
            return Err(ApiError::NotFound(id));
        }
    }

    if let Some(house) = &changes.house {
        state.gate.enforce(house).await?;
    }

    let conn = state.conn()?;
    let character = db::update_character(&conn, &id, &changes)?
        .ok_or_else(|| ApiError::NotFound(id.clone()))?;
    tracing::info!(id = %character.id, "character updated");

    Ok(Json(character.into()))
}

/// DELETE /api/v1/characters/:id - No house re-validation on delete
async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CharacterResource>, ApiError> {
    let conn = state.conn()?;
    let character = db::delete_character(&conn, &id)?.ok_or(ApiError::NotFound(id))?;
    tracing::info!(id = %character.id, "character deleted");

    Ok(Json(character.into()))
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    let characters = Router::new()
        .route("/characters", get(index).post(store))
        .route("/characters/:id", get(show).put(update).delete(destroy));

    Router::new()
        .route("/api/health", get(health_check))
        .nest("/api/v1", characters)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
