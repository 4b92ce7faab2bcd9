#![warn(clippy::pedantic)]

use std::net::SocketAddr;

use argon2::Argon2;
use tower_governor::GovernorLayer;
use upadhi_vedhika::{notify::Notifier, ratelimit, Database, State};

#[tokio::main]
async fn main() {
	tracing_subscriber::fmt::init();
	dotenvy::dotenv().ok();

	let database = Database::connect(
		&std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
	)
	.await
	.expect("failed to connect to database");

	sqlx::migrate!()
		.run(&database)
		.await
		.expect("failed to run migrations");

	let state = State {
		database,
		hasher: Argon2::default(),
		notifier: Notifier::from_env(),
	};

	let limit = ratelimit::default();
	ratelimit::cleanup_old_limits(&[&limit]);

	let app = upadhi_vedhika::router(state).layer(GovernorLayer { config: limit });

	let port = std::env::var("PORT").map_or_else(
		|_| 3000,
		|port| port.parse().expect("PORT must be a number"),
	);

	let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
		.await
		.expect("failed to bind to port");

	tracing::info!("listening on port {}", port);

	axum::serve(
		listener,
		app.into_make_service_with_connect_info::<SocketAddr>(),
	)
	.await
	.unwrap();
}
