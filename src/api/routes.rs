use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::db::games::GameRepository;
use crate::db::rankings::RankingsRepository;
use crate::engine::predictor::SpreadPredictor;
use crate::error::AppError;
use crate::types::{PredictionRequest, PredictionResult, TeamSeasonAggregate};

#[derive(Clone)]
pub struct ApiState {
    pub pool: sqlx::SqlitePool,
    pub predictor: Arc<SpreadPredictor>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/predict", post(post_predict))
        .route("/health", get(get_health))
        .route("/teams", get(get_teams))
        .route("/rankings/:season", get(get_rankings))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub games: i64,
}

#[derive(Serialize)]
pub struct TeamsResponse {
    pub count: usize,
    pub teams: Vec<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn post_predict(
    State(state): State<ApiState>,
    Json(request): Json<PredictionRequest>,
) -> Result<Json<PredictionResult>, AppError> {
    let result = state.predictor.predict(&request).await?;
    Ok(Json(result))
}

async fn get_health(State(state): State<ApiState>) -> Result<Json<HealthResponse>, AppError> {
    let games = GameRepository::new(state.pool.clone()).game_count().await?;
    Ok(Json(HealthResponse { status: "healthy", games }))
}

async fn get_teams(State(state): State<ApiState>) -> Result<Json<TeamsResponse>, AppError> {
    let teams = GameRepository::new(state.pool.clone()).team_codes().await?;
    Ok(Json(TeamsResponse { count: teams.len(), teams }))
}

async fn get_rankings(
    State(state): State<ApiState>,
    Path(season): Path<i32>,
) -> Result<Json<Vec<TeamSeasonAggregate>>, AppError> {
    let rows = RankingsRepository::new(state.pool.clone())
        .rankings_for_season(season)
        .await?;
    Ok(Json(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::{Config, PolicyKind, SignalWeights};
    use crate::db::history::HistoryReader;
    use crate::db::test_pool;
    use crate::types::CompletedGame;

    async fn test_router(pool: sqlx::SqlitePool) -> Router {
        let cfg = Config {
            db_path: ":memory:".to_string(),
            api_port: 0,
            log_level: "info".to_string(),
            policy: PolicyKind::BaselineAnchored,
            weights: SignalWeights::baseline(),
            default_seasons: vec![2024],
            signal_timeout_ms: 2000,
            db_max_connections: 1,
        };
        let predictor = Arc::new(SpreadPredictor::new(HistoryReader::new(pool.clone()), &cfg));
        router(ApiState { pool, predictor })
    }

    async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn seeded_game(id: &str, week: i32, home: &str, away: &str, home_score: i32) -> CompletedGame {
        CompletedGame {
            game_id: id.to_string(),
            season: 2024,
            game_type: "REG".to_string(),
            week,
            gameday: format!("2024-09-{week:02}"),
            weekday: None,
            gametime: None,
            away_team: away.to_string(),
            away_score: 20,
            home_team: home.to_string(),
            home_score,
            location: None,
            away_moneyline: None,
            home_moneyline: None,
            spread_line: Some(3.0),
            total_line: None,
            div_game: false,
        }
    }

    #[tokio::test]
    async fn predict_is_symmetric_through_the_router() {
        let pool = test_pool().await;
        let repo = GameRepository::new(pool.clone());
        repo.upsert(&seeded_game("2024_01_DEN_KC", 1, "KC", "DEN", 30)).await.unwrap();
        repo.upsert(&seeded_game("2024_02_LV_KC", 2, "KC", "LV", 27)).await.unwrap();
        repo.upsert(&seeded_game("2024_03_GB_CHI", 3, "CHI", "GB", 17)).await.unwrap();
        let app = test_router(pool).await;

        // KC favored by 2.5 on the road at CHI, phrased both ways.
        let body_a = json!({
            "team_a": "KC", "team_b": "CHI", "spread": -2.5,
            "team_a_home": false, "seasons": [2024]
        });
        let body_b = json!({
            "team_a": "CHI", "team_b": "KC", "spread": 2.5,
            "team_a_home": true, "seasons": [2024]
        });
        let (status_a, a) = post_json(&app, "/predict", body_a).await;
        let (status_b, b) = post_json(&app, "/predict", body_b).await;

        assert_eq!(status_a, StatusCode::OK);
        assert_eq!(status_b, StatusCode::OK);
        assert_eq!(a, b);
        assert_eq!(a["favored_team"], "KC");
        assert_eq!(a["matchup"], "KC @ CHI");
        assert_eq!(a["spread_line"], "KC -2.5");
        let fav = a["prediction"]["favored_cover_probability"].as_f64().unwrap();
        let und = a["prediction"]["underdog_cover_probability"].as_f64().unwrap();
        assert!((fav + und - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn invalid_requests_get_a_json_error_body() {
        let app = test_router(test_pool().await).await;

        let body = json!({
            "team_a": "KC", "team_b": "kc", "spread": -2.5, "team_a_home": true
        });
        let (status, error) = post_json(&app, "/predict", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error["error"].as_str().unwrap().contains("same team"));

        let body = json!({
            "team_a": "KC", "team_b": "BUF", "spread": 0.0, "team_a_home": true
        });
        let (status, error) = post_json(&app, "/predict", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error["error"].as_str().unwrap().contains("zero spread"));
    }

    #[tokio::test]
    async fn health_reports_game_count() {
        let pool = test_pool().await;
        let repo = GameRepository::new(pool.clone());
        repo.upsert(&seeded_game("2024_01_DEN_KC", 1, "KC", "DEN", 30)).await.unwrap();
        let app = test_router(pool).await;

        let (status, body) = get_json(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["games"], 1);
    }
}
