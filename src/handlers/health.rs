use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Health {
    pub ok: bool,
}

/// Always healthy while the process is serving requests.
pub async fn health() -> Json<Health> {
    Json(Health { ok: true })
}
