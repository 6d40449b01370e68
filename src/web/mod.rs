//! Web front-end.
//!
//! A few static pages describing the bot, rendered with askama templates
//! that share one layout and navigation bar.

mod routes;
mod templates;

use std::future::Future;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{error, info};

pub use routes::router;
pub use templates::{NavLink, nav_links};

/// Web front-end errors.
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    #[error("Template render failed: {0}")]
    Render(#[from] askama::Error),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        error!("Web request failed: {}", self);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}

/// Serves the front-end on `addr` until `shutdown` resolves.
pub async fn serve<F>(addr: &str, shutdown: F) -> Result<(), WebError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Web front-end listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router())
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Web front-end stopped");
    Ok(())
}
