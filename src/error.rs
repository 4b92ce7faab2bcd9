use axum::{
	body::Body,
	extract::rejection,
	http::{Response, StatusCode},
	response::IntoResponse,
	Json,
};
use serde::Serialize;

use crate::route::{admin, auth, listings};

/// Error type for the application.
///
/// The Display trait is not sent to the client, so it can show
/// sensitive information. Store errors are translated here before they
/// reach a client; a failed read is reported as `query_failed` so it can
/// never be mistaken for an empty result set.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("validation error: {0}")]
	Validation(#[from] validator::ValidationErrors),
	#[error("json error: {0}")]
	Json(#[from] rejection::JsonRejection),
	#[error("query string error: {0}")]
	QueryString(#[from] rejection::QueryRejection),
	#[error("auth error: {0}")]
	Auth(#[from] auth::Error),
	#[error("listing error: {0}")]
	Listing(#[from] listings::Error),
	#[error("review error: {0}")]
	Admin(#[from] admin::Error),
	#[error("rate limited: {0}")]
	RateLimited(#[from] tower_governor::GovernorError),
	#[error("listing query failed: {0}")]
	QueryFailed(sqlx::Error),
	#[error("listing insert failed: {0}")]
	SubmissionFailed(sqlx::Error),
}

// Reads are the overwhelmingly common store access; submission routes
// re-map their insert errors explicitly.
impl From<sqlx::Error> for Error {
	fn from(error: sqlx::Error) -> Self {
		Self::QueryFailed(error)
	}
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
	pub success: bool,
	pub errors: Vec<String>,
}

fn respond(status: StatusCode, errors: Vec<String>) -> Response<Body> {
	(status, Json(ErrorResponse { success: false, errors })).into_response()
}

impl IntoResponse for Error {
	fn into_response(self) -> Response<Body> {
		match self {
			Error::Validation(errors) => respond(
				StatusCode::BAD_REQUEST,
				errors
					.field_errors()
					.into_iter()
					.flat_map(|(field, errors)| {
						errors
							.iter()
							.map(move |error| format!("{field}: {error}"))
							.collect::<Vec<_>>()
					})
					.collect(),
			),
			Error::Json(error) => respond(StatusCode::BAD_REQUEST, vec![error.to_string()]),
			Error::QueryString(error) => respond(StatusCode::BAD_REQUEST, vec![error.to_string()]),
			Error::Auth(error) => respond(error.status(), vec![error.to_string()]),
			Error::Listing(error) => respond(error.status(), vec![error.to_string()]),
			Error::Admin(error) => respond(error.status(), vec![error.to_string()]),
			Error::RateLimited(..) => {
				respond(StatusCode::TOO_MANY_REQUESTS, vec!["rate_limited".into()])
			}
			Error::QueryFailed(error) => {
				tracing::error!(%error, "listing query failed");

				respond(StatusCode::BAD_GATEWAY, vec!["query_failed".into()])
			}
			Error::SubmissionFailed(error) => {
				tracing::error!(%error, "listing insert failed");

				respond(StatusCode::BAD_GATEWAY, vec!["submission_failed".into()])
			}
		}
	}
}
