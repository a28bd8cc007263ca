//! Render server - HTTP intake for sandboxed render jobs

mod config;
mod error;
pub mod routes;
pub mod telemetry;

pub use config::{ServerConfig, DEFAULT_MAX_BODY_BYTES};
pub use error::{status_for, ApiError};

use actix_web::{middleware, web, App, HttpServer};
use render_sandbox::RenderService;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub service: RenderService,
}

/// Register routes and extractor settings on an app.
pub fn configure(max_body_bytes: usize) -> impl Fn(&mut web::ServiceConfig) + Clone {
    move |cfg: &mut web::ServiceConfig| {
        cfg.app_data(routes::render::json_config(max_body_bytes))
            .service(routes::render::render)
            .service(routes::health::health_check);
    }
}

/// Serve until shutdown.
pub async fn run_server(config: ServerConfig, service: RenderService) -> std::io::Result<()> {
    let bind_addr = config.bind_addr();
    let max_body_bytes = config.max_body_bytes;
    let state = AppState { service };

    info!(
        runtime = state.service.runtime_name(),
        jobs_root = %state.service.jobs_root().display(),
        "Starting server on {}",
        bind_addr
    );

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(middleware::Logger::default())
            .configure(configure(max_body_bytes))
    })
    .bind(&bind_addr)?
    .run()
    .await
}
