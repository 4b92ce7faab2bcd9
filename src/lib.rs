#![warn(clippy::pedantic)]

pub mod browse;
mod error;
mod extract;
pub mod model;
pub mod notify;
pub mod presenter;
pub mod query;
pub mod ratelimit;
pub mod route;
pub mod session;

use argon2::Argon2;
use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use error::Error;

pub type Database = sqlx::Pool<sqlx::Postgres>;
pub type AppState = State;

/// The shared application state.
///
/// This should contain all shared dependencies that handlers need to access,
/// such as a database connection pool, a hash configuration (if it's expensive
/// to create), or the notification dispatcher.
#[derive(Clone, axum::extract::FromRef)]
pub struct State {
	pub database: Database,
	pub hasher: Argon2<'static>,
	pub notifier: notify::Notifier,
}

/// Builds the application router. Rate limiting is layered on top by the
/// binary, since it keys on the peer address.
pub fn router(state: State) -> Router {
	Router::new()
		.nest("/auth", route::auth::routes())
		.nest("/listings", route::listings::routes())
		.nest("/admin", route::admin::routes())
		.layer(TraceLayer::new_for_http())
		.layer(CorsLayer::permissive())
		.with_state(state)
}
