//! Outbound notification dispatch.
//!
//! Submissions and applications post small JSON events to a configured
//! webhook (the moderation inbox relay). Dispatch is best-effort: a
//! submission alert is fired and forgotten, and an application relay
//! failure is reported to the caller as a soft warning rather than
//! failing the primary action.

use serde_json::{json, Value};

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("notification dispatch is not configured")]
	Disabled,
	#[error("notification request failed: {0}")]
	Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct Notifier {
	client: reqwest::Client,
	webhook_url: Option<String>,
}

impl Notifier {
	/// Reads `NOTIFY_WEBHOOK_URL`; without it, dispatch is disabled and
	/// every event is dropped with a log line.
	#[must_use]
	pub fn from_env() -> Self {
		let webhook_url = std::env::var("NOTIFY_WEBHOOK_URL").ok();

		if webhook_url.is_none() {
			tracing::info!("NOTIFY_WEBHOOK_URL not set, notification dispatch disabled");
		}

		Self {
			client: reqwest::Client::new(),
			webhook_url,
		}
	}

	#[must_use]
	pub fn disabled() -> Self {
		Self {
			client: reqwest::Client::new(),
			webhook_url: None,
		}
	}

	async fn dispatch(&self, event: &str, payload: Value) -> Result<(), Error> {
		let Some(url) = &self.webhook_url else {
			return Err(Error::Disabled);
		};

		self.client
			.post(url)
			.json(&json!({ "event": event, "payload": payload }))
			.send()
			.await?
			.error_for_status()?;

		Ok(())
	}

	/// Alerts the moderation inbox about a fresh submission. Fire and
	/// forget: a dispatch failure is logged and never fails the insert.
	pub fn notify_new_submission(&self, payload: Value) {
		let notifier = self.clone();

		tokio::spawn(async move {
			match notifier.dispatch("listing.submitted", payload).await {
				Ok(()) => {}
				Err(Error::Disabled) => {}
				Err(error) => tracing::warn!(%error, "submission alert dispatch failed"),
			}
		});
	}

	/// Relays an application to the listing's contact. The caller treats a
	/// failure as a soft warning on an otherwise successful apply.
	pub async fn notify_applicant(&self, payload: Value) -> Result<(), Error> {
		self.dispatch("listing.application", payload).await
	}
}
