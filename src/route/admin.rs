use axum::{
	body::Body,
	extract::{Path, State},
	http::{Response, StatusCode},
	response::IntoResponse,
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
	extract::{Json, Query, Session},
	model::{ApprovalStatus, ListingRow, ServiceType},
	AppState, Database,
};

pub fn routes() -> axum::Router<AppState> {
	axum::Router::new()
		.route("/pending", get(pending_listings))
		.route("/listings/:id/status", post(review_listing))
		.route("/review/:token", post(review_by_token))
}

/// An error that can occur while reviewing a submission.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("unknown listing {0}")]
	UnknownListing(Uuid),
	#[error("listing {0} has already been reviewed")]
	AlreadyReviewed(Uuid),
	#[error("unknown review token")]
	UnknownToken,
	#[error("a review must approve or reject")]
	InvalidAction,
}

impl Error {
	#[must_use]
	pub fn status(&self) -> StatusCode {
		match self {
			Self::UnknownListing(..) | Self::UnknownToken => StatusCode::NOT_FOUND,
			Self::AlreadyReviewed(..) => StatusCode::CONFLICT,
			Self::InvalidAction => StatusCode::BAD_REQUEST,
		}
	}
}

impl IntoResponse for Error {
	fn into_response(self) -> Response<Body> {
		crate::Error::from(self).into_response()
	}
}

fn one() -> i64 {
	1
}

fn fifty() -> i64 {
	50
}

#[derive(Deserialize, Validate)]
pub struct Paginate {
	#[validate(range(min = 1, max = 10_000))]
	#[serde(default = "one")]
	pub page: i64,
	#[validate(range(min = 1, max = 100))]
	#[serde(default = "fifty")]
	pub size: i64,
}

/// One row of the review queue. Unlike the public shape this includes
/// the submitter's contact details, which a reviewer needs.
#[derive(Debug, Serialize)]
pub struct PendingListing {
	pub id: Uuid,
	pub service_type: ServiceType,
	pub title: String,
	pub organization: Option<String>,
	pub contact_name: String,
	pub contact_email: String,
	pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<ListingRow> for PendingListing {
	fn from(row: ListingRow) -> Self {
		let organization = match row.service_type {
			ServiceType::Job => row.company_name,
			ServiceType::Guidance => row.mentor_name,
			ServiceType::Training => row.trainer_name,
		};

		Self {
			id: row.id,
			service_type: row.service_type,
			title: row.title,
			organization,
			contact_name: row.contact_name,
			contact_email: row.contact_email,
			created_at: row.created_at,
		}
	}
}

/// Returns the review queue, oldest submission first.
async fn pending_listings(
	State(database): State<Database>,
	_session: Session,
	Query(paginate): Query<Paginate>,
) -> Result<impl IntoResponse, crate::Error> {
	let rows = sqlx::query_as::<_, ListingRow>(
		r#"
			SELECT * FROM listing
			WHERE status = 'pending'
			ORDER BY created_at ASC, id ASC
			LIMIT $1 OFFSET $2
		"#,
	)
	.bind(paginate.size)
	.bind(paginate.size * (paginate.page - 1))
	.fetch_all(&database)
	.await?;

	Ok(Json(
		rows.into_iter().map(PendingListing::from).collect::<Vec<_>>(),
	))
}

#[derive(Deserialize, Validate)]
pub struct ReviewInput {
	pub status: ApprovalStatus,
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
	pub id: Uuid,
	pub status: ApprovalStatus,
}

/// Transitions one pending listing to `approved` or `rejected`. Both
/// outcomes are terminal: a second review of the same listing conflicts
/// instead of silently overwriting the first.
async fn apply_review(
	database: &Database,
	input: &ReviewInput,
	by_id: Option<Uuid>,
	by_token: Option<Uuid>,
) -> Result<ReviewResponse, crate::Error> {
	if input.status == ApprovalStatus::Pending {
		return Err(Error::InvalidAction.into());
	}

	let reviewed = sqlx::query_scalar::<_, Uuid>(
		r#"
			UPDATE listing SET status = $1
			WHERE status = 'pending'
				AND ($2::uuid IS NULL OR id = $2)
				AND ($3::uuid IS NULL OR review_token = $3)
			RETURNING id
		"#,
	)
	.bind(input.status)
	.bind(by_id)
	.bind(by_token)
	.fetch_optional(database)
	.await?;

	if let Some(id) = reviewed {
		return Ok(ReviewResponse {
			id,
			status: input.status,
		});
	}

	// Distinguish "never existed" from "already reviewed."
	if let Some(id) = by_id {
		let exists = sqlx::query_scalar::<_, Uuid>("SELECT id FROM listing WHERE id = $1")
			.bind(id)
			.fetch_optional(database)
			.await?;

		match exists {
			Some(id) => Err(Error::AlreadyReviewed(id).into()),
			None => Err(Error::UnknownListing(id).into()),
		}
	} else {
		let exists =
			sqlx::query_scalar::<_, Uuid>("SELECT id FROM listing WHERE review_token = $1")
				.bind(by_token)
				.fetch_optional(database)
				.await?;

		match exists {
			Some(id) => Err(Error::AlreadyReviewed(id).into()),
			None => Err(Error::UnknownToken.into()),
		}
	}
}

/// Reviews a pending listing from the moderation queue.
async fn review_listing(
	State(database): State<Database>,
	_session: Session,
	Path(id): Path<Uuid>,
	Json(input): Json<ReviewInput>,
) -> Result<Json<ReviewResponse>, crate::Error> {
	apply_review(&database, &input, Some(id), None).await.map(Json)
}

/// Reviews a pending listing via the one-shot token embedded in the
/// moderation alert email, without a volunteer session.
async fn review_by_token(
	State(database): State<Database>,
	Path(token): Path<Uuid>,
	Json(input): Json<ReviewInput>,
) -> Result<Json<ReviewResponse>, crate::Error> {
	apply_review(&database, &input, None, Some(token)).await.map(Json)
}
