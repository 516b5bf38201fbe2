use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use uuid::Uuid;

use ecoswap_core::models::{
    Alternative, Equivalences, Evaluation, FinalizedRecipe, IngredientRecord, Projection,
    RankedCandidate, Recipe, RecipeLine, Suggestion,
};
use ecoswap_core::{EngineError, FootprintService};

const BODY_LIMIT: usize = 1024 * 1024; // 1 MB
/// Live sessions kept in memory before new ones are refused.
const MAX_SESSIONS: usize = 1000;

#[derive(Clone)]
struct AppState {
    svc: Arc<FootprintService>,
    sessions: Arc<Mutex<HashMap<Uuid, Recipe>>>,
    max_sessions: usize,
}

impl AppState {
    fn new(svc: FootprintService) -> Self {
        Self::with_session_limit(svc, MAX_SESSIONS)
    }

    fn with_session_limit(svc: FootprintService, max_sessions: usize) -> Self {
        Self {
            svc: Arc::new(svc),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            max_sessions,
        }
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<Uuid, Recipe>> {
        self.sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct AddLineRequest {
    #[serde(default)]
    category: String,
    description: String,
    amount: f64,
    #[serde(default = "default_unit")]
    unit: String,
}

fn default_unit() -> String {
    "g".to_string()
}

#[derive(Deserialize)]
struct RemoveLinesRequest {
    indices: Vec<usize>,
}

#[derive(Deserialize)]
struct SubstituteRequest {
    description: String,
    amount: f64,
    #[serde(default = "default_unit")]
    unit: String,
}

#[derive(Deserialize)]
struct SuggestionQuery {
    category: Option<String>,
    #[serde(default)]
    attempt: usize,
}

#[derive(Deserialize)]
struct DescriptionQuery {
    description: String,
}

#[derive(Deserialize)]
struct AlternativeQuery {
    category: String,
    description: String,
    #[serde(default)]
    attempt: usize,
}

#[derive(Deserialize)]
struct EquivalenceQuery {
    kg: f64,
}

#[derive(Deserialize)]
struct ProjectionQuery {
    current: f64,
    new: f64,
    #[serde(default = "default_meals_per_week")]
    meals_per_week: u32,
    #[serde(default = "default_weeks")]
    weeks: u32,
}

fn default_meals_per_week() -> u32 {
    7
}

fn default_weeks() -> u32 {
    52
}

#[derive(Deserialize)]
struct IngredientQuery {
    q: Option<String>,
    group: Option<String>,
}

#[derive(Serialize)]
struct SessionView {
    id: Uuid,
    recipe: Recipe,
    evaluation: Evaluation,
}

#[derive(Serialize)]
struct RemovedResponse {
    removed: usize,
    remaining: usize,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unprocessable(String),
    Unavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            Self::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let message = err.to_string();
        match err {
            EngineError::UnknownUnit(_)
            | EngineError::InvalidAmount(_)
            | EngineError::InvalidProjection(_) => Self::BadRequest(message),
            EngineError::LineOutOfRange { .. } => Self::NotFound(message),
            EngineError::SubstitutionNotImproving { .. }
            | EngineError::MissingEmissionFactor(_) => Self::Unprocessable(message),
            other if other.is_not_found() => Self::NotFound(message),
            _ => Self::Unprocessable(message),
        }
    }
}

fn session_not_found(id: Uuid) -> ApiError {
    ApiError::NotFound(format!("Session {id} not found"))
}

// --- Middleware ---

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Session handlers ---

async fn create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionView>), ApiError> {
    let id = Uuid::new_v4();
    let recipe = Recipe::new();
    let evaluation = state.svc.evaluate_recipe(&recipe);
    {
        let mut sessions = state.sessions();
        if sessions.len() >= state.max_sessions {
            tracing::warn!(live = sessions.len(), "session limit reached");
            return Err(ApiError::Unavailable(format!(
                "Too many open sessions (limit {}); delete one and retry",
                state.max_sessions
            )));
        }
        sessions.insert(id, recipe.clone());
    }
    tracing::debug!(%id, "session created");
    Ok((
        StatusCode::CREATED,
        Json(SessionView {
            id,
            recipe,
            evaluation,
        }),
    ))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let sessions = state.sessions();
    let recipe = sessions.get(&id).ok_or_else(|| session_not_found(id))?;
    Ok(Json(SessionView {
        id,
        recipe: recipe.clone(),
        evaluation: state.svc.evaluate_recipe(recipe),
    }))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let removed = state.sessions().remove(&id);
    removed
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| session_not_found(id))
}

async fn reset_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let mut sessions = state.sessions();
    let recipe = sessions.get_mut(&id).ok_or_else(|| session_not_found(id))?;
    state.svc.reset_recipe(recipe);
    Ok(Json(SessionView {
        id,
        recipe: recipe.clone(),
        evaluation: state.svc.evaluate_recipe(recipe),
    }))
}

async fn add_line(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AddLineRequest>,
) -> Result<(StatusCode, Json<RecipeLine>), ApiError> {
    let mut sessions = state.sessions();
    let recipe = sessions.get_mut(&id).ok_or_else(|| session_not_found(id))?;
    let line = state
        .svc
        .add_line(recipe, &req.category, &req.description, req.amount, &req.unit)?;
    Ok((StatusCode::CREATED, Json(line)))
}

async fn remove_lines(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<RemoveLinesRequest>,
) -> Result<Json<RemovedResponse>, ApiError> {
    let mut sessions = state.sessions();
    let recipe = sessions.get_mut(&id).ok_or_else(|| session_not_found(id))?;
    let removed = state.svc.remove_lines(recipe, &req.indices)?;
    Ok(Json(RemovedResponse {
        removed,
        remaining: recipe.len(),
    }))
}

async fn substitute_line(
    State(state): State<AppState>,
    Path((id, line)): Path<(Uuid, usize)>,
    Json(req): Json<SubstituteRequest>,
) -> Result<Json<RecipeLine>, ApiError> {
    let mut sessions = state.sessions();
    let recipe = sessions.get_mut(&id).ok_or_else(|| session_not_found(id))?;
    let new_line = state
        .svc
        .apply_substitution(recipe, line, &req.description, req.amount, &req.unit)?;
    Ok(Json(new_line))
}

async fn get_suggestion(
    State(state): State<AppState>,
    Path((id, line)): Path<(Uuid, usize)>,
    Query(query): Query<SuggestionQuery>,
) -> Result<Json<Suggestion>, ApiError> {
    let sessions = state.sessions();
    let recipe = sessions.get(&id).ok_or_else(|| session_not_found(id))?;
    let suggestion = state.svc.suggest_for_line(
        recipe,
        line,
        query.category.as_deref(),
        query.attempt,
    )?;
    Ok(Json(suggestion))
}

async fn get_evaluation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Evaluation>, ApiError> {
    let sessions = state.sessions();
    let recipe = sessions.get(&id).ok_or_else(|| session_not_found(id))?;
    Ok(Json(state.svc.evaluate_recipe(recipe)))
}

async fn finalize_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FinalizedRecipe>, ApiError> {
    let sessions = state.sessions();
    let recipe = sessions.get(&id).ok_or_else(|| session_not_found(id))?;
    if recipe.is_empty() {
        return Err(ApiError::Unprocessable(
            "Recipe is empty; nothing to finalize".to_string(),
        ));
    }
    Ok(Json(state.svc.finalize(recipe)))
}

// --- Stateless handlers ---

async fn get_eligibility(
    State(state): State<AppState>,
    Query(query): Query<DescriptionQuery>,
) -> Json<Vec<String>> {
    Json(state.svc.eligible_categories(&query.description))
}

async fn get_alternative(
    State(state): State<AppState>,
    Query(query): Query<AlternativeQuery>,
) -> Result<Json<Alternative>, ApiError> {
    let alt = state
        .svc
        .closest_alternative(&query.category, &query.description, query.attempt)?;
    Ok(Json(alt))
}

async fn get_candidates(
    State(state): State<AppState>,
    Query(query): Query<AlternativeQuery>,
) -> Result<Json<Vec<RankedCandidate>>, ApiError> {
    let ranked = state
        .svc
        .ranked_candidates(&query.category, &query.description)?;
    Ok(Json(ranked))
}

async fn get_equivalences(
    State(state): State<AppState>,
    Query(query): Query<EquivalenceQuery>,
) -> Result<Json<Equivalences>, ApiError> {
    if !query.kg.is_finite() {
        return Err(ApiError::BadRequest("kg must be a finite number".to_string()));
    }
    Ok(Json(state.svc.equivalences(query.kg)))
}

async fn get_projection(
    State(state): State<AppState>,
    Query(query): Query<ProjectionQuery>,
) -> Result<Json<Projection>, ApiError> {
    let projection = state.svc.project_savings(
        query.current,
        query.new,
        query.meals_per_week,
        query.weeks,
    )?;
    Ok(Json(projection))
}

async fn search_ingredients(
    State(state): State<AppState>,
    Query(query): Query<IngredientQuery>,
) -> Json<Vec<IngredientRecord>> {
    let found = state
        .svc
        .data()
        .search_ingredients(query.q.as_deref(), query.group.as_deref())
        .into_iter()
        .cloned()
        .collect();
    Json(found)
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/sessions", post(create_session))
        .route(
            "/api/sessions/{id}",
            get(get_session).delete(delete_session),
        )
        .route("/api/sessions/{id}/reset", post(reset_session))
        .route("/api/sessions/{id}/lines", post(add_line))
        .route("/api/sessions/{id}/lines/remove", post(remove_lines))
        .route("/api/sessions/{id}/lines/{line}", put(substitute_line))
        .route(
            "/api/sessions/{id}/lines/{line}/suggestion",
            get(get_suggestion),
        )
        .route("/api/sessions/{id}/evaluation", get(get_evaluation))
        .route("/api/sessions/{id}/finalize", post(finalize_session))
        .route("/api/eligibility", get(get_eligibility))
        .route("/api/alternatives", get(get_alternative))
        .route("/api/alternatives/ranked", get(get_candidates))
        .route("/api/equivalences", get(get_equivalences))
        .route("/api/projection", get(get_projection))
        .route("/api/ingredients", get(search_ingredients))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

// --- Server startup ---

pub async fn start_server(svc: FootprintService, port: u16, bind: &str) -> anyhow::Result<()> {
    let ingredients = svc.data().ingredients().len();
    let app = build_router(AppState::new(svc));

    if bind != "127.0.0.1" && bind != "localhost" {
        eprintln!(
            "Warning: Listening on {bind} with no authentication. Any device on your network can access this API."
        );
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}")).await?;
    tracing::info!(ingredients, "reference data ready");
    eprintln!("Listening on http://{bind}:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}
