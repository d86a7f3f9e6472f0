//! HTTP API over the model.
//!
//! Every model operation is a stateless JSON POST endpoint. The only shared
//! state is the active calibration, which can be swapped at runtime when the
//! calibration file changes; WebSocket clients are told when that happens.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, broadcast};
use tower_http::services::ServeDir;

use crate::analysis::{
    AuditReport, ProgramEntry, ProgramRequest, ProgramRow, analyze_program, generate_program,
};
use crate::calibration::Calibration;
use crate::domain::{BoutSpec, DamageClass, LengthProfile, Muscle, MuscleProfile};
use crate::error::ModelError;
use crate::progression::{ProgressionResult, progress};
use crate::recovery::scaled_recovery_hours;
use crate::solver::{SolverResult, solve_best_volume};
use crate::stimulus::{StimulusScore, stimulus};
use crate::watcher::WatcherConfig;
use crate::wns::{WnsBreakdown, wns_breakdown};

/// Message types for WebSocket broadcast.
#[derive(Clone, Debug)]
pub enum WsMessage {
    /// The calibration has been reloaded.
    CalibrationUpdated,
    /// A reload failed; the previous calibration stays active.
    Error(String),
}

/// The calibration in use and where it came from.
pub struct LoadedCalibration {
    pub calibration: Calibration,
    pub loaded_at: DateTime<Utc>,
}

impl LoadedCalibration {
    pub fn new(calibration: Calibration) -> Self {
        Self {
            calibration,
            loaded_at: Utc::now(),
        }
    }
}

/// Shared application state.
pub struct AppState {
    pub calibration: RwLock<LoadedCalibration>,
    /// Calibration file to reload from, if any.
    pub calibration_path: Option<PathBuf>,
    pub ws_broadcast: broadcast::Sender<WsMessage>,
}

impl AppState {
    pub fn new(calibration: Calibration, calibration_path: Option<PathBuf>) -> Self {
        let (ws_broadcast, _) = broadcast::channel(16);
        Self {
            calibration: RwLock::new(LoadedCalibration::new(calibration)),
            calibration_path,
            ws_broadcast,
        }
    }
}

// === Error Response ===

/// A failed request, rendered as `{"error": "..."}`.
///
/// Model precondition violations are the caller's fault (400); a search task
/// that dies is ours (500).
pub enum ApiError {
    Model(ModelError),
    Internal(String),
}

impl From<ModelError> for ApiError {
    fn from(e: ModelError) -> Self {
        Self::Model(e)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::Model(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::Internal(msg) => {
                log::error!("Request failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

/// Copies the active calibration so no lock is held during a computation.
async fn snapshot(state: &AppState) -> Calibration {
    state.calibration.read().await.calibration.clone()
}

/// Runs a CPU-bound model call on the blocking pool.
async fn run_blocking<T, F>(work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ModelError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(format!("model task failed: {}", e)))?
        .map_err(ApiError::from)
}

// === JSON Request/Response Types ===

/// Muscle characteristics given either by name or explicitly.
///
/// Explicit fields override the named muscle; anything left unset comes from
/// the neutral profile.
#[derive(Debug, Default, Deserialize)]
pub struct MuscleSelector {
    pub muscle: Option<String>,
    pub damage: Option<DamageClass>,
    pub length: Option<LengthProfile>,
}

impl MuscleSelector {
    pub fn profile(&self) -> MuscleProfile {
        let base = self
            .muscle
            .as_deref()
            .map(MuscleProfile::for_name)
            .unwrap_or_default();
        MuscleProfile {
            damage: self.damage.unwrap_or(base.damage),
            length: self.length.unwrap_or(base.length),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RecoveryRequest {
    pub sets: u32,
    pub reps: u32,
    pub rir: f64,
    #[serde(flatten)]
    pub muscle: MuscleSelector,
    #[serde(default = "default_capacity")]
    pub recovery_capacity: f64,
}

#[derive(Debug, Serialize)]
pub struct RecoveryResponse {
    pub recovery_hours: f64,
    pub muscle: MuscleProfile,
}

#[derive(Debug, Deserialize)]
pub struct StimulusRequest {
    pub sets: u32,
    pub reps: u32,
    pub rir: f64,
}

#[derive(Debug, Deserialize)]
pub struct WnsRequest {
    pub frequency: u32,
    pub gross_stimulus: f64,
    pub recovery_hours: f64,
}

#[derive(Debug, Deserialize)]
pub struct ProgressRequest {
    pub last_weight: f64,
    pub reps_performed: u32,
    pub target_min: u32,
    pub target_max: u32,
}

#[derive(Debug, Deserialize)]
pub struct SolveRequest {
    #[serde(flatten)]
    pub muscle: MuscleSelector,
    pub frequency: u32,
    pub session_minutes: u32,
    #[serde(default)]
    pub is_priority: bool,
    #[serde(default = "default_capacity")]
    pub recovery_capacity: f64,
}

fn default_capacity() -> f64 {
    1.0
}

#[derive(Serialize)]
pub struct MuscleSummary {
    pub id: Muscle,
    pub name: String,
    pub profile: MuscleProfile,
    pub exercises: Vec<String>,
}

#[derive(Serialize)]
pub struct CalibrationResponse {
    pub source: Option<String>,
    pub loaded_at: DateTime<Utc>,
    pub calibration: Calibration,
}

// === Router Setup ===

/// Creates the application router.
///
/// When `static_dir` is set, unknown paths are served from it.
pub fn create_router(state: Arc<AppState>, static_dir: Option<PathBuf>) -> Router {
    let mut router = Router::new()
        .route("/api/muscles", get(get_muscles))
        .route("/api/calibration", get(get_calibration))
        .route("/api/recovery", post(post_recovery))
        .route("/api/stimulus", post(post_stimulus))
        .route("/api/wns", post(post_wns))
        .route("/api/progress", post(post_progress))
        .route("/api/solve", post(post_solve))
        .route("/api/program/generate", post(post_generate))
        .route("/api/program/analyze", post(post_analyze))
        .route("/ws", get(ws_handler));

    if let Some(dir) = static_dir {
        router = router.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true));
    }

    router.with_state(state)
}

/// Runs the web server.
pub async fn run_server(
    state: Arc<AppState>,
    port: u16,
    static_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let app = create_router(state, static_dir);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    log::info!("Server running at http://localhost:{}", port);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// === Calibration Reload ===

/// Reloads the calibration file with retries, then notifies WebSocket clients.
///
/// On failure the previous calibration stays active.
pub async fn reload_calibration(state: &AppState, config: &WatcherConfig) {
    let Some(path) = state.calibration_path.as_ref() else {
        return;
    };

    let mut last_error = None;

    for attempt in 0..config.retry_attempts {
        match Calibration::load(path) {
            Ok(calibration) => {
                *state.calibration.write().await = LoadedCalibration::new(calibration);
                log::info!("Calibration reloaded from {}", path.display());
                let _ = state.ws_broadcast.send(WsMessage::CalibrationUpdated);
                return;
            }
            Err(e) => {
                log::warn!("Reload attempt {} failed: {}", attempt + 1, e);
                last_error = Some(e);
                tokio::time::sleep(config.retry_delay).await;
            }
        }
    }

    if let Some(e) = last_error {
        log::error!(
            "Failed to reload calibration after {} attempts: {}",
            config.retry_attempts,
            e
        );
        let _ = state
            .ws_broadcast
            .send(WsMessage::Error(format!("calibration reload failed: {}", e)));
    }
}

// === WebSocket Handler ===

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws_connection(socket, state))
}

async fn handle_ws_connection(mut socket: WebSocket, state: Arc<AppState>) {
    log::info!("WebSocket client connected");

    let mut rx = state.ws_broadcast.subscribe();

    loop {
        tokio::select! {
            msg = rx.recv() => {
                let text = match msg {
                    Ok(WsMessage::CalibrationUpdated) => "reload".to_string(),
                    Ok(WsMessage::Error(err)) => format!("error:{}", err),
                    // Missed some messages; a reload covers them all
                    Err(broadcast::error::RecvError::Lagged(_)) => "reload".to_string(),
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
        }
    }

    log::info!("WebSocket client disconnected");
}

// === API Handlers ===

/// GET /api/muscles - Reference profiles and exercises.
async fn get_muscles() -> Json<Vec<MuscleSummary>> {
    let summaries = Muscle::all()
        .iter()
        .map(|m| MuscleSummary {
            id: *m,
            name: m.display_name().to_string(),
            profile: m.profile(),
            exercises: m.exercises().iter().map(|e| e.to_string()).collect(),
        })
        .collect();

    Json(summaries)
}

/// GET /api/calibration - Active calibration.
async fn get_calibration(State(state): State<Arc<AppState>>) -> Json<CalibrationResponse> {
    let loaded = state.calibration.read().await;

    Json(CalibrationResponse {
        source: state
            .calibration_path
            .as_ref()
            .map(|p| p.display().to_string()),
        loaded_at: loaded.loaded_at,
        calibration: loaded.calibration.clone(),
    })
}

/// POST /api/recovery - Recovery hours for one bout.
async fn post_recovery(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RecoveryRequest>,
) -> Result<Json<RecoveryResponse>, ApiError> {
    let profile = req.muscle.profile();
    let bout = BoutSpec::new(req.sets, req.reps, req.rir, profile)?;
    let loaded = state.calibration.read().await;
    let hours = scaled_recovery_hours(&loaded.calibration, &bout, req.recovery_capacity)?;

    Ok(Json(RecoveryResponse {
        recovery_hours: hours,
        muscle: profile,
    }))
}

/// POST /api/stimulus - Effective sets and gross stimulus.
async fn post_stimulus(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StimulusRequest>,
) -> Result<Json<StimulusScore>, ApiError> {
    let bout = BoutSpec::new(req.sets, req.reps, req.rir, MuscleProfile::NEUTRAL)?;
    let loaded = state.calibration.read().await;
    Ok(Json(stimulus(&loaded.calibration, &bout)))
}

/// POST /api/wns - Weekly net stimulus with its intermediate terms.
async fn post_wns(
    State(state): State<Arc<AppState>>,
    Json(req): Json<WnsRequest>,
) -> Result<Json<WnsBreakdown>, ApiError> {
    let loaded = state.calibration.read().await;
    let breakdown = wns_breakdown(
        &loaded.calibration,
        req.frequency,
        req.gross_stimulus,
        req.recovery_hours,
    )?;
    Ok(Json(breakdown))
}

/// POST /api/progress - Next load from the last session.
async fn post_progress(Json(req): Json<ProgressRequest>) -> Result<Json<ProgressionResult>, ApiError> {
    let result = progress(
        req.last_weight,
        req.reps_performed,
        req.target_min,
        req.target_max,
    )?;
    Ok(Json(result))
}

/// POST /api/solve - Best sets/reps/RIR for one muscle.
async fn post_solve(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SolveRequest>,
) -> Result<Json<SolverResult>, ApiError> {
    let calibration = snapshot(&state).await;
    let profile = req.muscle.profile();
    let result = run_blocking(move || {
        solve_best_volume(
            &calibration,
            profile,
            req.frequency,
            req.session_minutes,
            req.is_priority,
            req.recovery_capacity,
        )
    })
    .await?;
    Ok(Json(result))
}

/// POST /api/program/generate - Plan a full program.
async fn post_generate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProgramRequest>,
) -> Result<Json<Vec<ProgramEntry>>, ApiError> {
    let calibration = snapshot(&state).await;
    let program = run_blocking(move || generate_program(&calibration, &req)).await?;
    Ok(Json(program))
}

/// POST /api/program/analyze - Audit a user program.
async fn post_analyze(
    State(state): State<Arc<AppState>>,
    Json(rows): Json<Vec<ProgramRow>>,
) -> Result<Json<AuditReport>, ApiError> {
    let calibration = snapshot(&state).await;
    let report = run_blocking(move || analyze_program(&calibration, &rows)).await?;
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn test_router() -> Router {
        let state = Arc::new(AppState::new(Calibration::default(), None));
        create_router(state, None)
    }

    async fn post_json(router: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_recovery_endpoint_anchor() {
        let (status, body) = post_json(
            test_router(),
            "/api/recovery",
            json!({"sets": 1, "reps": 10, "rir": 0.0, "damage": "middle", "length": "even"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["recovery_hours"], 22.5);
    }

    #[tokio::test]
    async fn test_recovery_endpoint_by_muscle_name() {
        let (status, body) = post_json(
            test_router(),
            "/api/recovery",
            json!({"sets": 1, "reps": 10, "rir": 0.0, "muscle": "Quads"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["muscle"]["damage"], "easily_damaged");
        assert_eq!(body["muscle"]["length"], "lengthened");
    }

    #[tokio::test]
    async fn test_stimulus_endpoint() {
        let (status, body) = post_json(
            test_router(),
            "/api/stimulus",
            json!({"sets": 1, "reps": 10, "rir": 0.0}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["effective_sets"], 1.0);
        assert_eq!(body["gross_stimulus"], 1.0);
    }

    #[tokio::test]
    async fn test_wns_rejects_zero_frequency() {
        let (status, body) = post_json(
            test_router(),
            "/api/wns",
            json!({"frequency": 0, "gross_stimulus": 1.0, "recovery_hours": 20.0}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("frequency"));
    }

    #[tokio::test]
    async fn test_progress_endpoint() {
        let (status, body) = post_json(
            test_router(),
            "/api/progress",
            json!({"last_weight": 100.0, "reps_performed": 12, "target_min": 6, "target_max": 10}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["action"], "increase_weight");
        assert_eq!(body["new_weight"], 117.5);
    }

    #[tokio::test]
    async fn test_solve_endpoint() {
        let (status, body) = post_json(
            test_router(),
            "/api/solve",
            json!({"damage": "middle", "length": "even", "frequency": 2, "session_minutes": 75}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sets"], 5);
        assert_eq!(body["reps"], 6);
    }

    #[tokio::test]
    async fn test_analyze_endpoint() {
        let (status, body) = post_json(
            test_router(),
            "/api/program/analyze",
            json!([
                {"muscle": "Chest", "exercise": "Bench Press", "sets": 4, "reps": 8, "rir": 1.0, "frequency": 2},
                {"muscle": "Quads", "exercise": "Squat", "sets": 5, "reps": 6, "rir": 0.0, "frequency": 2}
            ]),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["scores"].as_array().unwrap().len(), 2);
        assert!(
            body["findings"]
                .as_array()
                .unwrap()
                .iter()
                .any(|f| f["kind"] == "recovery_debt")
        );
    }

    #[tokio::test]
    async fn test_generate_endpoint() {
        let (status, body) = post_json(
            test_router(),
            "/api/program/generate",
            json!({"muscles": ["chest", "back"], "session_minutes": 75,
                   "frequency": {"mode": "fixed", "frequency": 3}}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let entries = body.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["frequency"], 3);
    }

    #[tokio::test]
    async fn test_generate_accepts_same_names_as_analyze() {
        let (status, body) = post_json(
            test_router(),
            "/api/program/generate",
            json!({"muscles": ["Chest", "Quads"], "session_minutes": 60,
                   "frequency": {"mode": "fixed", "frequency": 2}}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["muscle"], "chest");
        assert_eq!(body[1]["muscle"], "quads");
    }

    #[tokio::test]
    async fn test_muscles_endpoint() {
        let request = Request::builder()
            .uri("/api/muscles")
            .body(Body::empty())
            .unwrap();
        let response = test_router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.as_array().unwrap().len(), Muscle::all().len());
    }

    #[tokio::test]
    async fn test_search_does_not_hold_calibration_lock() {
        let state = Arc::new(AppState::new(Calibration::default(), None));
        let calibration = snapshot(&state).await;

        // A reload can take the write lock while a search runs on its copy
        let search = tokio::spawn(run_blocking(move || {
            solve_best_volume(&calibration, MuscleProfile::NEUTRAL, 2, 75, false, 1.0)
        }));
        state.calibration.write().await.calibration.base_hours_per_set = 30.0;

        let result = search.await.unwrap().ok().unwrap();
        assert_eq!((result.sets, result.reps), (5, 6));
    }

    #[tokio::test]
    async fn test_failed_task_is_internal_error() {
        let result: Result<(), ApiError> = run_blocking(|| panic!("boom")).await;
        let response = result.err().unwrap().into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_calibration_endpoint() {
        let request = Request::builder()
            .uri("/api/calibration")
            .body(Body::empty())
            .unwrap();
        let response = test_router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["calibration"]["base_hours_per_set"], 22.5);
        assert!(body["source"].is_null());
        assert!(body["loaded_at"].is_string());
    }

    #[tokio::test]
    async fn test_reload_swaps_calibration() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), r#"{"base_hours_per_set": 30.0}"#).unwrap();

        let state = AppState::new(Calibration::default(), Some(file.path().to_path_buf()));
        let mut rx = state.ws_broadcast.subscribe();

        reload_calibration(&state, &WatcherConfig::default()).await;

        assert_eq!(state.calibration.read().await.calibration.base_hours_per_set, 30.0);
        assert!(matches!(rx.try_recv(), Ok(WsMessage::CalibrationUpdated)));
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "not json").unwrap();

        let state = AppState::new(Calibration::default(), Some(file.path().to_path_buf()));
        let mut rx = state.ws_broadcast.subscribe();
        let config = WatcherConfig {
            retry_delay: std::time::Duration::from_millis(1),
            ..WatcherConfig::default()
        };

        reload_calibration(&state, &config).await;

        assert_eq!(state.calibration.read().await.calibration, Calibration::default());
        assert!(matches!(rx.try_recv(), Ok(WsMessage::Error(_))));
    }
}
