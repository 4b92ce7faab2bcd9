use std::collections::BTreeMap;

use axum::{
	body::Body,
	extract::{Path, State},
	http::{Response, StatusCode},
	response::IntoResponse,
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
	extract::Json,
	model::{ApprovalStatus, Listing, ListingRow, ServiceType},
	presenter::{ListResponse, ListingView},
	query::{self, FilterState},
	AppState, Database,
};

pub fn routes() -> axum::Router<AppState> {
	axum::Router::new()
		.route("/", post(submit_listing))
		.route("/:service_type", get(browse_listings))
		.route("/:service_type/:id", get(get_listing))
		.route("/:service_type/:id/apply", post(apply_to_listing))
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("unknown listing {0}")]
	UnknownListing(Uuid),
}

impl Error {
	#[must_use]
	pub fn status(&self) -> StatusCode {
		match self {
			Self::UnknownListing(..) => StatusCode::NOT_FOUND,
		}
	}
}

impl IntoResponse for Error {
	fn into_response(self) -> Response<Body> {
		crate::Error::from(self).into_response()
	}
}

/// Returns one page of approved listings for a tab, driven entirely by
/// the query string: `q`, `page`, `size`, and any registered facet.
async fn browse_listings(
	State(database): State<Database>,
	Path(service_type): Path<ServiceType>,
	axum::extract::Query(params): axum::extract::Query<BTreeMap<String, String>>,
) -> Result<Json<ListResponse>, crate::Error> {
	let filter = FilterState::from_params(service_type, &params);
	let page = query::run(&database, &filter).await?;

	Ok(Json(ListResponse::new(page, &filter)))
}

/// Returns a single approved listing by its unique id.
async fn get_listing(
	State(database): State<Database>,
	Path((service_type, id)): Path<(ServiceType, Uuid)>,
) -> Result<Json<ListingView>, crate::Error> {
	let row = sqlx::query_as::<_, ListingRow>(
		"SELECT * FROM listing WHERE id = $1 AND service_type = $2 AND status = 'approved'",
	)
	.bind(id)
	.bind(service_type)
	.fetch_optional(&database)
	.await?;

	let row = row.ok_or(Error::UnknownListing(id))?;

	Ok(Json(ListingView::from(Listing::from(row))))
}

/// The submission payload: the common fields plus whichever field group
/// matches `service_type`. Fields from the other groups are accepted but
/// never stored.
#[derive(Deserialize, Validate)]
#[validate(schema(function = "validate_group"))]
pub struct SubmitListingInput {
	pub service_type: ServiceType,
	#[validate(length(min = 3, max = 160))]
	pub title: String,
	pub description: Option<String>,
	pub location: Option<String>,
	pub end_date: Option<chrono::NaiveDate>,

	#[validate(length(min = 2, max = 80))]
	pub contact_name: String,
	#[validate(email)]
	pub contact_email: String,
	#[validate(length(max = 20))]
	pub contact_phone: Option<String>,

	pub company_name: Option<String>,
	pub experience: Option<String>,
	pub company_type: Option<String>,
	pub industry: Option<String>,
	pub job_type: Option<String>,
	pub work_mode: Option<String>,
	pub hr_name: Option<String>,
	#[validate(email)]
	pub hr_email: Option<String>,
	#[serde(default)]
	pub skills: Vec<String>,

	pub guidance_type: Option<String>,
	pub guidance_slot: Option<String>,
	pub guidance_period: Option<String>,
	pub guidance_mode: Option<String>,
	pub mentor_name: Option<String>,
	#[validate(email)]
	pub mentor_email: Option<String>,

	pub training_type: Option<String>,
	pub training_mode: Option<String>,
	pub training_duration: Option<String>,
	pub training_topic: Option<String>,
	pub training_certification: Option<String>,
	pub trainer_name: Option<String>,
}

fn validate_group(input: &SubmitListingInput) -> Result<(), ValidationError> {
	let missing = match input.service_type {
		ServiceType::Job => clean(&input.company_name).is_none().then_some("company_name"),
		ServiceType::Guidance => clean(&input.mentor_name).is_none().then_some("mentor_name"),
		ServiceType::Training => clean(&input.trainer_name).is_none().then_some("trainer_name"),
	};

	match missing {
		Some(field) => {
			let mut error = ValidationError::new("required_for_service_type");
			error.add_param("field".into(), &field);
			Err(error)
		}
		None => Ok(()),
	}
}

/// Trims a free-text field, mapping blank input to NULL.
fn clean(value: &Option<String>) -> Option<String> {
	value
		.as_deref()
		.map(str::trim)
		.filter(|value| !value.is_empty())
		.map(str::to_owned)
}

fn clean_if(applicable: bool, value: &Option<String>) -> Option<String> {
	if applicable {
		clean(value)
	} else {
		None
	}
}

/// De-duplicates skill tags while preserving their insertion order.
fn normalize_skills(skills: &[String]) -> Vec<String> {
	let mut out: Vec<String> = Vec::with_capacity(skills.len());

	for skill in skills {
		let skill = skill.trim();

		if !skill.is_empty() && !out.iter().any(|seen| seen == skill) {
			out.push(skill.to_owned());
		}
	}

	out
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
	pub id: Uuid,
	pub status: ApprovalStatus,
}

/// Accepts a new listing for review.
///
/// The record is stored as `pending` and stays invisible to the public
/// listing queries until a reviewer approves it. The moderation alert is
/// dispatched after the insert and cannot fail the submission.
async fn submit_listing(
	State(state): State<AppState>,
	Json(input): Json<SubmitListingInput>,
) -> Result<impl IntoResponse, crate::Error> {
	let job = input.service_type == ServiceType::Job;
	let guidance = input.service_type == ServiceType::Guidance;
	let training = input.service_type == ServiceType::Training;

	let row = sqlx::query_as::<_, ListingRow>(
		r#"
			INSERT INTO listing (
				service_type, title, description, location, end_date,
				contact_name, contact_email, contact_phone,
				company_name, experience, company_type, industry, job_type,
				work_mode, hr_name, hr_email, skills,
				guidance_type, guidance_slot, guidance_period, guidance_mode,
				mentor_name, mentor_email,
				training_type, training_mode, training_duration, training_topic,
				training_certification, trainer_name
			)
			VALUES (
				$1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
				$15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26,
				$27, $28, $29
			)
			RETURNING *
		"#,
	)
	.bind(input.service_type)
	.bind(input.title.trim())
	.bind(clean(&input.description))
	.bind(clean(&input.location))
	.bind(input.end_date)
	.bind(input.contact_name.trim())
	.bind(input.contact_email.trim())
	.bind(clean(&input.contact_phone))
	.bind(clean_if(job, &input.company_name))
	.bind(clean_if(job, &input.experience))
	.bind(clean_if(job, &input.company_type))
	.bind(clean_if(job, &input.industry))
	.bind(clean_if(job, &input.job_type))
	.bind(clean_if(job, &input.work_mode))
	.bind(clean_if(job, &input.hr_name))
	.bind(clean_if(job, &input.hr_email))
	.bind(if job { normalize_skills(&input.skills) } else { Vec::new() })
	.bind(clean_if(guidance, &input.guidance_type))
	.bind(clean_if(guidance, &input.guidance_slot))
	.bind(clean_if(guidance, &input.guidance_period))
	.bind(clean_if(guidance, &input.guidance_mode))
	.bind(clean_if(guidance, &input.mentor_name))
	.bind(clean_if(guidance, &input.mentor_email))
	.bind(clean_if(training, &input.training_type))
	.bind(clean_if(training, &input.training_mode))
	.bind(clean_if(training, &input.training_duration))
	.bind(clean_if(training, &input.training_topic))
	.bind(clean_if(training, &input.training_certification))
	.bind(clean_if(training, &input.trainer_name))
	.fetch_one(&state.database)
	.await
	.map_err(crate::Error::SubmissionFailed)?;

	let organization = match row.service_type {
		ServiceType::Job => row.company_name.as_deref(),
		ServiceType::Guidance => row.mentor_name.as_deref(),
		ServiceType::Training => row.trainer_name.as_deref(),
	};

	state.notifier.notify_new_submission(json!({
		"listing_id": row.id,
		"service_type": row.service_type.as_str(),
		"title": row.title,
		"organization": organization,
		"contact_email": row.contact_email,
		"review_token": row.review_token,
	}));

	Ok((
		StatusCode::CREATED,
		Json(SubmitResponse {
			id: row.id,
			status: row.status,
		}),
	))
}

#[derive(Deserialize, Validate)]
pub struct ApplyInput {
	#[validate(length(min = 2, max = 80))]
	pub applicant_name: String,
	#[validate(email)]
	pub applicant_email: String,
}

#[derive(Debug, Serialize)]
pub struct ApplyResponse {
	pub applied: bool,
	/// `false` when the relay to the listing's contact could not be
	/// dispatched; the application itself still went through.
	pub notification_sent: bool,
}

/// Relays an application to the contact behind an approved listing.
async fn apply_to_listing(
	State(state): State<AppState>,
	Path((service_type, id)): Path<(ServiceType, Uuid)>,
	Json(input): Json<ApplyInput>,
) -> Result<Json<ApplyResponse>, crate::Error> {
	let row = sqlx::query_as::<_, ListingRow>(
		"SELECT * FROM listing WHERE id = $1 AND service_type = $2 AND status = 'approved'",
	)
	.bind(id)
	.bind(service_type)
	.fetch_optional(&state.database)
	.await?;

	let row = row.ok_or(Error::UnknownListing(id))?;

	let payload = json!({
		"listing_id": row.id,
		"title": row.title,
		"recipient": row.apply_recipient(),
		"applicant_name": input.applicant_name,
		"applicant_email": input.applicant_email,
	});

	let notification_sent = match state.notifier.notify_applicant(payload).await {
		Ok(()) => true,
		Err(error) => {
			tracing::warn!(%error, listing = %row.id, "application relay failed");
			false
		}
	};

	Ok(Json(ApplyResponse {
		applied: true,
		notification_sent,
	}))
}

#[cfg(test)]
mod test {
	use super::normalize_skills;
	use crate::test::*;

	#[test]
	fn skills_are_trimmed_and_deduplicated_in_order() {
		let skills = ["sql", "rust", "sql", " rust ", "  ", "python"].map(str::to_owned);

		assert_eq!(normalize_skills(&skills), ["sql", "rust", "python"]);
	}

	#[sqlx::test]
	async fn test_search_is_narrowing_and_newest_first(pool: Database) {
		seed_listing(
			&pool,
			SeedListing {
				title: "Software Engineer",
				company_name: Some("Acme"),
				age_days: 2,
				..SeedListing::default()
			},
		)
		.await;
		seed_listing(
			&pool,
			SeedListing {
				title: "Platform Lead",
				company_name: Some("Engineering Corp"),
				age_days: 1,
				..SeedListing::default()
			},
		)
		.await;
		seed_listing(
			&pool,
			SeedListing {
				title: "Baker",
				company_name: Some("Breadco"),
				..SeedListing::default()
			},
		)
		.await;
		seed_listing(
			&pool,
			SeedListing {
				title: "Engineer II",
				company_name: Some("Acme"),
				status: ApprovalStatus::Pending,
				..SeedListing::default()
			},
		)
		.await;

		let app = app(pool);

		let all = app.get("/listings/job").await;
		assert_eq!(all.status_code(), 200);

		let all = all.json::<serde_json::Value>();
		assert_eq!(all["total_count"], 3);

		// Case-insensitive match over title and company; the pending
		// record never appears; newest match first.
		let response = app.get("/listings/job").add_query_param("q", "ENGINEER").await;
		assert_eq!(response.status_code(), 200);

		let body = response.json::<serde_json::Value>();
		assert_eq!(body["total_count"], 2);
		assert_eq!(body["outcome"], "ok");
		assert_eq!(body["items"][0]["title"], "Platform Lead");
		assert_eq!(body["items"][1]["title"], "Software Engineer");
	}

	#[sqlx::test]
	async fn test_facet_union_within_and_intersection_across(pool: Database) {
		seed_listing(
			&pool,
			SeedListing {
				title: "A",
				company_type: Some("Startup"),
				industry: Some("Insurance"),
				..SeedListing::default()
			},
		)
		.await;
		seed_listing(
			&pool,
			SeedListing {
				title: "B",
				company_type: Some("Corporate"),
				industry: Some("Marketing"),
				..SeedListing::default()
			},
		)
		.await;
		seed_listing(
			&pool,
			SeedListing {
				title: "C",
				company_type: Some("Others"),
				industry: Some("Insurance"),
				..SeedListing::default()
			},
		)
		.await;

		let app = app(pool);

		// OR within the facet.
		let response = app
			.get("/listings/job")
			.add_query_param("company_type", "Startup,Corporate")
			.await;

		let body = response.json::<serde_json::Value>();
		assert_eq!(body["total_count"], 2);

		// AND across facets narrows further, never widens.
		let response = app
			.get("/listings/job")
			.add_query_param("company_type", "Startup,Corporate")
			.add_query_param("industry", "Insurance")
			.await;

		let body = response.json::<serde_json::Value>();
		assert_eq!(body["total_count"], 1);
		assert_eq!(body["items"][0]["title"], "A");
	}

	#[sqlx::test]
	async fn test_page_beyond_last_is_empty_not_an_error(pool: Database) {
		for title in ["A", "B", "C"] {
			seed_listing(&pool, SeedListing { title, ..SeedListing::default() }).await;
		}

		let app = app(pool);

		let response = app
			.get("/listings/job")
			.add_query_param("page", "5")
			.add_query_param("size", "2")
			.await;

		assert_eq!(response.status_code(), 200);

		let body = response.json::<serde_json::Value>();
		assert_eq!(body["items"].as_array().unwrap().len(), 0);
		assert_eq!(body["total_count"], 3);
		assert_eq!(body["last_page"], 2);
		assert_eq!(body["can_go_next"], false);
		assert_eq!(body["can_go_prev"], true);
	}

	#[sqlx::test]
	async fn test_pattern_characters_match_literally(pool: Database) {
		seed_listing(
			&pool,
			SeedListing { title: "100% Remote Analyst", ..SeedListing::default() },
		)
		.await;
		// Would match a raw `%100%%` pattern, but not the literal text.
		seed_listing(
			&pool,
			SeedListing { title: "1000 Things To Do", ..SeedListing::default() },
		)
		.await;

		let app = app(pool);

		let response = app.get("/listings/job").add_query_param("q", "100%").await;

		let body = response.json::<serde_json::Value>();
		assert_eq!(body["total_count"], 1);
		assert_eq!(body["items"][0]["title"], "100% Remote Analyst");
	}

	#[sqlx::test]
	async fn test_empty_states_are_distinct(pool: Database) {
		let app = app(pool.clone());

		let response = app.get("/listings/job").await;
		assert_eq!(response.json::<serde_json::Value>()["outcome"], "empty");

		let response = app.get("/listings/job").add_query_param("q", "anything").await;
		assert_eq!(response.json::<serde_json::Value>()["outcome"], "no_matches");

		seed_listing(&pool, SeedListing::default()).await;

		let response = app.get("/listings/job").await;
		assert_eq!(response.json::<serde_json::Value>()["outcome"], "ok");
	}

	#[sqlx::test]
	async fn test_foreign_facets_are_ignored(pool: Database) {
		seed_listing(
			&pool,
			SeedListing {
				service_type: ServiceType::Guidance,
				title: "Interview Prep",
				mentor_name: Some("Meera"),
				guidance_slot: Some("Morning"),
				..SeedListing::default()
			},
		)
		.await;
		seed_listing(
			&pool,
			SeedListing {
				service_type: ServiceType::Guidance,
				title: "Resume Review",
				mentor_name: Some("Arjun"),
				guidance_slot: Some("Evening"),
				..SeedListing::default()
			},
		)
		.await;
		seed_listing(&pool, SeedListing { title: "Job Row", ..SeedListing::default() }).await;

		let app = app(pool);

		// Guidance honors its single-select slot facet.
		let response = app.get("/listings/guidance").add_query_param("slot", "Morning").await;

		let body = response.json::<serde_json::Value>();
		assert_eq!(body["total_count"], 1);
		assert_eq!(body["items"][0]["title"], "Interview Prep");

		// The job tab does not register `slot`; stale state from the
		// guidance tab must not constrain (or break) the query.
		let response = app
			.get("/listings/job")
			.add_query_param("slot", "Morning")
			.add_query_param("bogus", "x")
			.await;

		assert_eq!(response.status_code(), 200);
		assert_eq!(response.json::<serde_json::Value>()["total_count"], 1);
	}

	#[sqlx::test]
	async fn test_submission_is_pending_until_reviewed(pool: Database) {
		let app = app(pool);

		let response = app
			.post("/listings")
			.json(&json!({
				"service_type": "job",
				"title": "Junior Developer",
				"contact_name": "Poster",
				"contact_email": "poster@example.com",
				"company_name": "Acme",
				"skills": ["sql", "rust", "sql", " rust "],
			}))
			.await;

		assert_eq!(response.status_code(), 201);

		let body = response.json::<serde_json::Value>();
		assert_eq!(body["status"], "pending");

		let id = body["id"].as_str().unwrap().to_owned();

		// Invisible to the public until approved.
		let response = app.get("/listings/job").await;
		assert_eq!(response.json::<serde_json::Value>()["total_count"], 0);

		let response = app.get(&format!("/listings/job/{id}")).await;
		assert_eq!(response.status_code(), 404);
	}

	#[sqlx::test]
	async fn test_submission_requires_group_anchor_field(pool: Database) {
		let app = app(pool);

		// A job submission without a company name fails validation and
		// stores nothing.
		let response = app
			.post("/listings")
			.json(&json!({
				"service_type": "job",
				"title": "Junior Developer",
				"contact_name": "Poster",
				"contact_email": "poster@example.com",
			}))
			.await;

		assert_eq!(response.status_code(), 400);
	}

	#[sqlx::test]
	async fn test_apply_succeeds_with_soft_notification_warning(pool: Database) {
		let id = seed_listing(
			&pool,
			SeedListing {
				title: "Software Engineer",
				company_name: Some("Acme"),
				hr_email: Some("hr@acme.example"),
				..SeedListing::default()
			},
		)
		.await;

		let app = app(pool);

		let response = app
			.post(&format!("/listings/job/{id}/apply"))
			.json(&json!({
				"applicant_name": "Asha",
				"applicant_email": "asha@example.com",
			}))
			.await;

		assert_eq!(response.status_code(), 200);

		// The test notifier is disabled, so the relay is reported as a
		// soft warning while the apply itself succeeds.
		let body = response.json::<serde_json::Value>();
		assert_eq!(body["applied"], true);
		assert_eq!(body["notification_sent"], false);
	}

	#[sqlx::test]
	async fn test_store_failure_is_not_an_empty_result(pool: Database) {
		let app = app(pool.clone());

		// A healthy pool with no rows is the `empty` outcome...
		let response = app.get("/listings/job").await;
		assert_eq!(response.status_code(), 200);
		assert_eq!(response.json::<serde_json::Value>()["outcome"], "empty");

		pool.close().await;

		// ...but an unreachable store is an error, never an empty page.
		let response = app.get("/listings/job").await;
		assert_eq!(response.status_code(), 502);

		let body = response.json::<serde_json::Value>();
		assert_eq!(body["success"], false);
		assert_eq!(body["errors"][0], "query_failed");
		assert!(body.get("outcome").is_none());
	}

	#[sqlx::test]
	async fn test_repeat_queries_are_idempotent(pool: Database) {
		for title in ["A", "B", "C", "D"] {
			seed_listing(&pool, SeedListing { title, ..SeedListing::default() }).await;
		}

		let app = app(pool);

		let first = app
			.get("/listings/job")
			.add_query_param("size", "2")
			.await
			.json::<serde_json::Value>();
		let second = app
			.get("/listings/job")
			.add_query_param("size", "2")
			.await
			.json::<serde_json::Value>();

		assert_eq!(first, second);
	}
}
