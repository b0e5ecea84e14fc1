use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use concord_core::persist::{open_or_create, save_snapshot, SnapshotPaths};
use concord_core::{
    Appearance, AppearanceFilters, BookStats, BookSummary, ConcordError, ErrorKind, GeneralStats, Library, PhraseReference,
    WordFilters, DEFAULT_CONTEXT_RADIUS,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub library: Arc<Library>,
    /// Snapshot directory; `None` keeps everything in memory.
    pub data_dir: Option<PathBuf>,
}

impl AppState {
    fn persist(&self) -> Result<(), ApiError> {
        if let Some(dir) = &self.data_dir {
            save_snapshot(&SnapshotPaths::new(dir), &self.library)?;
        }
        Ok(())
    }
}

pub enum ApiError {
    Core(ConcordError),
    Internal(anyhow::Error),
}

impl From<ConcordError> for ApiError {
    fn from(e: ConcordError) -> Self {
        ApiError::Core(e)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Internal(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            ApiError::Core(e) => {
                let status = match e.kind() {
                    ErrorKind::Validation | ErrorKind::Parse => StatusCode::BAD_REQUEST,
                    ErrorKind::Duplicate => StatusCode::CONFLICT,
                    ErrorKind::NotFound => StatusCode::NOT_FOUND,
                    ErrorKind::AlreadyIndexed => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.kind().as_str(), e.to_string())
            }
            ApiError::Internal(e) => {
                tracing::error!(error = %e, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", e.to_string())
            }
        };
        (status, Json(serde_json::json!({ "error": message, "kind": kind }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

#[derive(Deserialize)]
pub struct AddBookRequest {
    pub name: String,
    pub division: String,
    pub text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedRequest<F> {
    #[serde(default)]
    pub filters: F,
    pub page_index: usize,
    pub page_size: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddGroupRequest {
    pub group_name: String,
}

#[derive(Deserialize)]
pub struct AddWordRequest {
    pub word: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPhraseRequest {
    pub phrase_text: String,
}

#[derive(Deserialize)]
pub struct WindowParams {
    pub radius: Option<u32>,
}

#[derive(Serialize)]
pub struct WordsResponse {
    pub words: Vec<String>,
    pub total: usize,
}

#[derive(Serialize)]
pub struct AppearancesResponse {
    pub appearances: Vec<Appearance>,
    pub total: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddBookResponse {
    pub name: String,
    pub num_chapters: usize,
    pub num_words: usize,
}

#[derive(Serialize)]
pub struct Message {
    pub message: String,
}

fn message(text: impl Into<String>) -> Json<Message> {
    Json(Message { message: text.into() })
}

pub fn build_app(data_dir: String) -> Result<Router> {
    // Load the snapshot (or start empty) at startup
    let data_dir = PathBuf::from(data_dir);
    let library = open_or_create(&SnapshotPaths::new(&data_dir))?;
    Ok(router(AppState { library: Arc::new(library), data_dir: Some(data_dir) }))
}

pub fn router(state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/books", get(list_books).post(add_book))
        .route("/api/book_names", get(list_book_names))
        .route("/api/books/:name", delete(remove_book))
        .route("/api/books/:name/content", get(book_content))
        .route("/api/books/:name/num_chapters", get(count_chapters))
        .route("/api/books/:name/chapters/:chapter/num_verses", get(count_verses))
        .route("/api/books/:name/chapters/:chapter/verses/:verse/num_words", get(count_words))
        .route("/api/text_context/:book/:chapter/:verse", get(text_context))
        .route("/api/verse_window/:book/:chapter/:verse", get(verse_window))
        .route("/api/words", post(filter_words))
        .route("/api/words/:word", post(word_appearances))
        .route("/api/groups", get(list_groups).post(add_group))
        .route("/api/groups/:name", delete(remove_group))
        .route("/api/groups/:name/words", get(group_words).post(add_word_to_group))
        .route("/api/groups/:name/appearances", get(group_appearances))
        .route("/api/phrases", get(list_phrases).post(add_phrase))
        .route("/api/phrases/:text", delete(remove_phrase))
        .route("/api/phrases/:text/references", get(phrase_references))
        .route("/api/stats", get(general_stats))
        .route("/api/stats/books", get(corpus_stats))
        .route("/api/stats/books/:name", get(book_stats))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

// --- books ---

pub async fn add_book(State(state): State<AppState>, Json(req): Json<AddBookRequest>) -> ApiResult<AddBookResponse> {
    let doc = state.library.add_book(&req.text, &req.name, &req.division)?;
    state.persist()?;
    Ok(Json(AddBookResponse { num_chapters: doc.chapters.len(), num_words: doc.num_words(), name: doc.name }))
}

pub async fn list_books(State(state): State<AppState>) -> Json<Vec<BookSummary>> {
    Json(state.library.list_books())
}

pub async fn list_book_names(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.library.list_book_names())
}

pub async fn remove_book(State(state): State<AppState>, Path(name): Path<String>) -> ApiResult<Message> {
    state.library.remove_book(&name)?;
    state.persist()?;
    Ok(message(format!("book {name} removed")))
}

pub async fn book_content(State(state): State<AppState>, Path(name): Path<String>) -> std::result::Result<String, ApiError> {
    Ok(state.library.get_book_content(&name)?)
}

pub async fn count_chapters(State(state): State<AppState>, Path(name): Path<String>) -> ApiResult<usize> {
    Ok(Json(state.library.count_chapters(&name)?))
}

pub async fn count_verses(State(state): State<AppState>, Path((name, chapter)): Path<(String, u32)>) -> ApiResult<usize> {
    Ok(Json(state.library.count_verses(&name, chapter)?))
}

pub async fn count_words(
    State(state): State<AppState>,
    Path((name, chapter, verse)): Path<(String, u32, u32)>,
) -> ApiResult<usize> {
    Ok(Json(state.library.count_words(&name, chapter, verse)?))
}

pub async fn text_context(
    State(state): State<AppState>,
    Path((book, chapter, verse)): Path<(String, u32, u32)>,
) -> std::result::Result<String, ApiError> {
    Ok(state.library.get_text_context(&book, chapter, verse)?)
}

pub async fn verse_window(
    State(state): State<AppState>,
    Path((book, chapter, verse)): Path<(String, u32, u32)>,
    Query(params): Query<WindowParams>,
) -> std::result::Result<String, ApiError> {
    let radius = params.radius.unwrap_or(DEFAULT_CONTEXT_RADIUS);
    Ok(state.library.get_verse_window(&book, chapter, verse, radius)?)
}

// --- words ---

pub async fn filter_words(
    State(state): State<AppState>,
    Json(req): Json<PagedRequest<WordFilters>>,
) -> ApiResult<WordsResponse> {
    let page = state.library.filter_words(&req.filters, req.page_index, req.page_size)?;
    Ok(Json(WordsResponse { words: page.items, total: page.total }))
}

pub async fn word_appearances(
    State(state): State<AppState>,
    Path(word): Path<String>,
    Json(req): Json<PagedRequest<AppearanceFilters>>,
) -> ApiResult<AppearancesResponse> {
    let start = std::time::Instant::now();
    let page = state.library.get_word_appearances(&word, &req.filters, req.page_index, req.page_size)?;
    tracing::debug!(%word, total = page.total, took_s = start.elapsed().as_secs_f64(), "word appearances");
    Ok(Json(AppearancesResponse { appearances: page.items, total: page.total }))
}

// --- groups ---

pub async fn add_group(State(state): State<AppState>, Json(req): Json<AddGroupRequest>) -> ApiResult<Message> {
    state.library.add_group(&req.group_name)?;
    state.persist()?;
    Ok(message(format!("group {} added", req.group_name.trim().to_lowercase())))
}

pub async fn list_groups(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.library.list_groups())
}

pub async fn remove_group(State(state): State<AppState>, Path(name): Path<String>) -> ApiResult<Message> {
    state.library.remove_group(&name)?;
    state.persist()?;
    Ok(message(format!("group {name} removed")))
}

pub async fn add_word_to_group(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<AddWordRequest>,
) -> ApiResult<Message> {
    let added = state.library.add_word_to_group(&name, &req.word)?;
    if added {
        state.persist()?;
        Ok(message(format!("word {} added to group {name}", req.word)))
    } else {
        Ok(message(format!("group {name} already has word {}", req.word)))
    }
}

pub async fn group_words(State(state): State<AppState>, Path(name): Path<String>) -> ApiResult<Vec<String>> {
    Ok(Json(state.library.get_group_words(&name)?))
}

pub async fn group_appearances(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<BTreeMap<String, Vec<Appearance>>> {
    Ok(Json(state.library.get_group_appearances(&name)?))
}

// --- phrases ---

pub async fn add_phrase(State(state): State<AppState>, Json(req): Json<AddPhraseRequest>) -> ApiResult<Message> {
    let text = state.library.add_phrase(&req.phrase_text)?;
    state.persist()?;
    Ok(message(format!("phrase {text} added")))
}

pub async fn list_phrases(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.library.list_phrases())
}

pub async fn remove_phrase(State(state): State<AppState>, Path(text): Path<String>) -> ApiResult<Message> {
    state.library.remove_phrase(&text)?;
    state.persist()?;
    Ok(message(format!("phrase {text} removed")))
}

pub async fn phrase_references(
    State(state): State<AppState>,
    Path(text): Path<String>,
) -> ApiResult<Vec<PhraseReference>> {
    let refs = state.library.get_phrase_references(&text)?;
    Ok(Json(refs.to_vec()))
}

// --- stats ---

pub async fn general_stats(State(state): State<AppState>) -> Json<GeneralStats> {
    Json(state.library.get_general_stats())
}

pub async fn corpus_stats(State(state): State<AppState>) -> ApiResult<BookStats> {
    Ok(Json(state.library.get_book_stats(None)?))
}

pub async fn book_stats(State(state): State<AppState>, Path(name): Path<String>) -> ApiResult<BookStats> {
    Ok(Json(state.library.get_book_stats(Some(&name))?))
}
