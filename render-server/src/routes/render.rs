//! Render endpoint
//!
//! POST /api/render (also POST /generate)
//! Validates the body, runs the job to completion and reports where the
//! artifact was stored.

use crate::error::ApiError;
use crate::AppState;
use actix_web::{routes, web, HttpRequest, HttpResponse};
use render_common::{RenderRequest, RenderResponse};

#[routes]
#[post("/api/render")]
#[post("/generate")]
pub async fn render(
    state: web::Data<AppState>,
    body: web::Json<RenderRequest>,
) -> Result<HttpResponse, ApiError> {
    // Nothing touches the disk or the engine before this succeeds.
    let request = body.into_inner().into_job_request()?;

    let outcome = state.service.render(request).await?;

    Ok(HttpResponse::Ok().json(RenderResponse::success(
        outcome.reference.key,
        outcome.reference.uri,
        outcome.job_id,
    )))
}

/// JSON extractor settings: size cap, and malformed bodies answered with the
/// same 400 shape as validation failures.
pub fn json_config(max_body_bytes: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(max_body_bytes)
        .error_handler(|err, _req: &HttpRequest| ApiError::InvalidBody(err.to_string()).into())
}
