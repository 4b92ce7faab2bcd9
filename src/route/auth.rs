use argon2::Argon2;
use axum::{
	body::Body,
	extract::State,
	http::{header, Response, StatusCode},
	response::IntoResponse,
	routing::{get, post},
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
	extract::{Json, Session},
	model, session, AppState, Database,
};

pub const KEY_LENGTH: usize = 32;

pub fn routes() -> axum::Router<AppState> {
	axum::Router::new()
		.route("/login", post(login))
		.route("/signup", post(signup))
		.route("/logout", get(logout))
		.route("/me", get(me))
}

/// An error that can occur during authentication.
///
/// Note that the messages are presented to the client, so they should not contain
/// sensitive information.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("invalid email or password")]
	InvalidCredentials,
	#[error("password validation error")]
	Argon(#[from] argon2::Error),
	#[error("no session cookie")]
	NoSessionCookie,
	#[error("invalid session cookie")]
	InvalidSessionCookie,
	#[error("email already registered")]
	EmailAlreadyRegistered,
}

impl Error {
	#[must_use]
	pub fn status(&self) -> StatusCode {
		match self {
			Self::InvalidCredentials | Self::NoSessionCookie | Self::InvalidSessionCookie => {
				StatusCode::UNAUTHORIZED
			}
			Self::Argon(..) => StatusCode::INTERNAL_SERVER_ERROR,
			Self::EmailAlreadyRegistered => StatusCode::CONFLICT,
		}
	}
}

impl IntoResponse for Error {
	fn into_response(self) -> Response<Body> {
		crate::Error::from(self).into_response()
	}
}

#[derive(Deserialize, Validate)]
pub struct LoginInput {
	#[validate(email)]
	pub email: String,
	#[validate(length(min = 8, max = 128))]
	pub password: String,
}

#[derive(Deserialize, Validate)]
pub struct SignupInput {
	#[validate(length(min = 2, max = 80))]
	pub name: String,
	#[validate(email)]
	pub email: String,
	#[validate(length(min = 8, max = 128))]
	pub password: String,
}

/// Hashes a password with Argon2, using the volunteer's id as a salt.
/// Since this is only used for logging in and creating a new password,
/// the scope of this function can remain in here with no issues.
fn hash_password(
	hasher: &Argon2,
	password: &str,
	id: &Uuid,
) -> Result<[u8; KEY_LENGTH], argon2::Error> {
	let mut hash = [0; KEY_LENGTH];

	hasher.hash_password_into(password.as_bytes(), id.as_bytes(), &mut hash)?;
	Ok(hash)
}

/// Returns the authenticated volunteer.
async fn me(session: Session) -> impl IntoResponse {
	Json(session.volunteer)
}

/// Returns a session cookie, assuming the credentials are valid.
async fn login(
	State(state): State<AppState>,
	Json(auth): Json<LoginInput>,
) -> Result<impl IntoResponse, crate::Error> {
	let volunteer =
		sqlx::query_as::<_, model::Volunteer>("SELECT * FROM volunteer WHERE email = $1")
			.bind(&auth.email)
			.fetch_optional(&state.database)
			.await?;

	let Some(volunteer) = volunteer else {
		return Err(Error::InvalidCredentials.into());
	};

	let hashed =
		hash_password(&state.hasher, &auth.password, &volunteer.id).map_err(Error::Argon)?;

	if volunteer.password != hashed {
		return Err(Error::InvalidCredentials.into());
	}

	let session_id =
		sqlx::query_scalar::<_, Uuid>("INSERT INTO session (volunteer_id) VALUES ($1) RETURNING id")
			.bind(volunteer.id)
			.fetch_one(&state.database)
			.await?;

	let cookie = session::create_cookie(session_id);

	Ok(([(header::SET_COOKIE, cookie.to_string())], Json(volunteer)))
}

/// Logs out of the authenticated account.
async fn logout(
	State(database): State<Database>,
	session: Session,
) -> Result<impl IntoResponse, crate::Error> {
	sqlx::query("DELETE FROM session WHERE id = $1")
		.bind(session.id)
		.execute(&database)
		.await?;

	// Clear the session cookie
	Ok([(header::SET_COOKIE, session::clear_cookie().to_string())])
}

/// Registers a new volunteer account, returning an associated session cookie.
async fn signup(
	State(state): State<AppState>,
	Json(auth): Json<SignupInput>,
) -> Result<impl IntoResponse, crate::Error> {
	let volunteer_id = Uuid::new_v4();
	let hashed =
		hash_password(&state.hasher, &auth.password, &volunteer_id).map_err(Error::Argon)?;

	let mut tx = state.database.begin().await?;

	let volunteer = sqlx::query_as::<_, model::Volunteer>(
		"INSERT INTO volunteer (id, email, name, password) VALUES ($1, $2, $3, $4) RETURNING *",
	)
	.bind(volunteer_id)
	.bind(&auth.email)
	.bind(&auth.name)
	.bind(hashed.to_vec())
	.fetch_one(&mut *tx)
	.await
	.map_err(|e| match e {
		sqlx::Error::Database(ref d) if d.constraint() == Some("volunteer_email_key") => {
			Error::EmailAlreadyRegistered.into()
		}
		e => crate::Error::from(e),
	})?;

	let session_id =
		sqlx::query_scalar::<_, Uuid>("INSERT INTO session (volunteer_id) VALUES ($1) RETURNING id")
			.bind(volunteer_id)
			.fetch_one(&mut *tx)
			.await?;

	tx.commit().await?;

	let cookie = session::create_cookie(session_id);

	Ok((
		StatusCode::CREATED,
		[(header::SET_COOKIE, cookie.to_string())],
		Json(volunteer),
	))
}
