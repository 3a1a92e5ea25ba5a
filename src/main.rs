use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use spread_engine::api::routes::{router, ApiState};
use spread_engine::config::Config;
use spread_engine::db;
use spread_engine::db::history::HistoryReader;
use spread_engine::engine::predictor::SpreadPredictor;
use spread_engine::error::Result;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    let pool = db::connect(&cfg.db_path, cfg.db_max_connections).await?;
    info!("Database ready at {}", cfg.db_path);

    let predictor = Arc::new(SpreadPredictor::new(HistoryReader::new(pool.clone()), &cfg));
    info!(
        "Prediction policy: {:?} | default seasons: {:?} | signal budget: {}ms",
        cfg.policy, cfg.default_seasons, cfg.signal_timeout_ms
    );

    let state = ApiState { pool, predictor };
    let app = router(state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
