use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use super::pages;
use crate::chart::ChartError;

/// Failure while building a page. Always rendered as a 500.
#[derive(Debug, Error)]
pub enum PageError {
    /// Tracker failure with its full context chain.
    #[error("{0}")]
    Tracker(String),

    #[error(transparent)]
    Chart(#[from] ChartError),

    #[error("failed to render page: {0}")]
    Render(#[from] askama::Error),
}

impl From<anyhow::Error> for PageError {
    fn from(err: anyhow::Error) -> Self {
        PageError::Tracker(format!("{err:#}"))
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        tracing::error!(error = %message, "page request failed");
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        match pages::error_page(&status.to_string(), &message) {
            Ok(page) => (status, Html(page)).into_response(),
            Err(err) => {
                tracing::error!(error = %err, "error page failed to render");
                (status, message).into_response()
            }
        }
    }
}
