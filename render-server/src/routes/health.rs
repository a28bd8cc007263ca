//! Health check endpoint

use actix_web::{get, HttpResponse, Responder};
use render_common::HealthResponse;

/// Liveness only; does not probe the container engine or storage.
#[get("/health")]
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse::default())
}
