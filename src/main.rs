use std::sync::Arc;

use petra::{app_state::AppState, routes::make_router, tracing::setup_tracing};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let _guard = setup_tracing();

    let state = Arc::new(AppState::from_env());
    let app = make_router().with_state(state);

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    tracing::info!("listening on http://{addr}");

    axum::serve(listener, app).await.unwrap();
}
