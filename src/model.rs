use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Partition key for listings. Exactly one type-specific field group is
/// meaningful per record; see [`ServiceDetails`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "service_type", rename_all = "lowercase")]
pub enum ServiceType {
	Job,
	Guidance,
	Training,
}

impl ServiceType {
	#[must_use]
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Job => "job",
			Self::Guidance => "guidance",
			Self::Training => "training",
		}
	}
}

/// Moderation state gating public visibility. Listings are created as
/// `pending` and transition exactly once to `approved` or `rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "approval_status", rename_all = "lowercase")]
pub enum ApprovalStatus {
	Pending,
	Approved,
	Rejected,
}

/// A model representing a single volunteer account.
///
/// Use this when fetching from the database and returning to the client.
/// The `email` and `password` fields are not serialized to the client.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Volunteer {
	pub id: Uuid,
	#[serde(skip_serializing)]
	pub email: String,
	/// argon2, salted with `id`
	#[serde(skip_serializing)]
	pub password: Vec<u8>,
	pub name: String,
	pub created_at: chrono::DateTime<chrono::Utc>,
}

/// The raw `listing` row, with every type-specific column nullable.
///
/// This shape never reaches a client; it is narrowed into [`Listing`],
/// which keeps only the field group of the row's own service type.
#[derive(Debug, sqlx::FromRow)]
pub struct ListingRow {
	pub id: Uuid,
	pub service_type: ServiceType,
	pub status: ApprovalStatus,
	pub review_token: Uuid,

	pub title: String,
	pub description: Option<String>,
	pub location: Option<String>,
	pub end_date: Option<chrono::NaiveDate>,

	pub contact_name: String,
	pub contact_email: String,
	pub contact_phone: Option<String>,

	pub company_name: Option<String>,
	pub experience: Option<String>,
	pub company_type: Option<String>,
	pub industry: Option<String>,
	pub job_type: Option<String>,
	pub work_mode: Option<String>,
	pub hr_name: Option<String>,
	pub hr_email: Option<String>,
	pub skills: Vec<String>,

	pub guidance_type: Option<String>,
	pub guidance_slot: Option<String>,
	pub guidance_period: Option<String>,
	pub guidance_mode: Option<String>,
	pub mentor_name: Option<String>,
	pub mentor_email: Option<String>,

	pub training_type: Option<String>,
	pub training_mode: Option<String>,
	pub training_duration: Option<String>,
	pub training_topic: Option<String>,
	pub training_certification: Option<String>,
	pub trainer_name: Option<String>,

	pub created_at: chrono::DateTime<chrono::Utc>,
}

impl ListingRow {
	/// The mailbox an application should be relayed to. Falls back to the
	/// submitter's contact address when the group has no dedicated one.
	#[must_use]
	pub fn apply_recipient(&self) -> &str {
		match self.service_type {
			ServiceType::Job => self.hr_email.as_deref(),
			ServiceType::Guidance => self.mentor_email.as_deref(),
			ServiceType::Training => None,
		}
		.unwrap_or(&self.contact_email)
	}
}

/// The service-type-specific field group of a listing.
///
/// Tagged by `service_type` so a record can never carry fields from a
/// group that does not apply to it. Recruiter and mentor mailboxes stay
/// server-side and are not part of this public shape.
#[derive(Debug, Serialize)]
#[serde(tag = "service_type", rename_all = "lowercase")]
pub enum ServiceDetails {
	Job {
		company_name: Option<String>,
		experience: Option<String>,
		company_type: Option<String>,
		industry: Option<String>,
		job_type: Option<String>,
		work_mode: Option<String>,
		hr_name: Option<String>,
		skills: Vec<String>,
	},
	Guidance {
		guidance_type: Option<String>,
		guidance_slot: Option<String>,
		guidance_period: Option<String>,
		guidance_mode: Option<String>,
		mentor_name: Option<String>,
	},
	Training {
		training_type: Option<String>,
		training_mode: Option<String>,
		training_duration: Option<String>,
		training_topic: Option<String>,
		training_certification: Option<String>,
		trainer_name: Option<String>,
	},
}

/// A single published listing, as returned to clients.
#[derive(Debug, Serialize)]
pub struct Listing {
	pub id: Uuid,
	pub title: String,
	pub description: Option<String>,
	pub location: Option<String>,
	pub end_date: Option<chrono::NaiveDate>,
	pub status: ApprovalStatus,
	pub created_at: chrono::DateTime<chrono::Utc>,
	#[serde(flatten)]
	pub details: ServiceDetails,
}

impl Listing {
	#[must_use]
	pub fn service_type(&self) -> ServiceType {
		match self.details {
			ServiceDetails::Job { .. } => ServiceType::Job,
			ServiceDetails::Guidance { .. } => ServiceType::Guidance,
			ServiceDetails::Training { .. } => ServiceType::Training,
		}
	}

	/// The company, mentor or trainer name, depending on the service type.
	#[must_use]
	pub fn organization_name(&self) -> Option<&str> {
		match &self.details {
			ServiceDetails::Job { company_name, .. } => company_name.as_deref(),
			ServiceDetails::Guidance { mentor_name, .. } => mentor_name.as_deref(),
			ServiceDetails::Training { trainer_name, .. } => trainer_name.as_deref(),
		}
	}
}

impl From<ListingRow> for Listing {
	fn from(row: ListingRow) -> Self {
		// Columns from the other field groups are dropped here, even if a
		// row happens to carry stale values in them.
		let details = match row.service_type {
			ServiceType::Job => ServiceDetails::Job {
				company_name: row.company_name,
				experience: row.experience,
				company_type: row.company_type,
				industry: row.industry,
				job_type: row.job_type,
				work_mode: row.work_mode,
				hr_name: row.hr_name,
				skills: row.skills,
			},
			ServiceType::Guidance => ServiceDetails::Guidance {
				guidance_type: row.guidance_type,
				guidance_slot: row.guidance_slot,
				guidance_period: row.guidance_period,
				guidance_mode: row.guidance_mode,
				mentor_name: row.mentor_name,
			},
			ServiceType::Training => ServiceDetails::Training {
				training_type: row.training_type,
				training_mode: row.training_mode,
				training_duration: row.training_duration,
				training_topic: row.training_topic,
				training_certification: row.training_certification,
				trainer_name: row.trainer_name,
			},
		};

		Self {
			id: row.id,
			title: row.title,
			description: row.description,
			location: row.location,
			end_date: row.end_date,
			status: row.status,
			created_at: row.created_at,
			details,
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn row(service_type: ServiceType) -> ListingRow {
		ListingRow {
			id: Uuid::new_v4(),
			service_type,
			status: ApprovalStatus::Approved,
			review_token: Uuid::new_v4(),
			title: "Listing".into(),
			description: None,
			location: None,
			end_date: None,
			contact_name: "Poster".into(),
			contact_email: "poster@example.com".into(),
			contact_phone: None,
			company_name: Some("Acme".into()),
			experience: None,
			company_type: None,
			industry: None,
			job_type: None,
			work_mode: None,
			hr_name: None,
			hr_email: Some("hr@acme.example".into()),
			skills: vec!["sql".into()],
			guidance_type: None,
			guidance_slot: None,
			guidance_period: None,
			guidance_mode: None,
			mentor_name: Some("Meera".into()),
			mentor_email: Some("meera@example.com".into()),
			training_type: None,
			training_mode: None,
			training_duration: None,
			training_topic: None,
			training_certification: None,
			trainer_name: None,
			created_at: chrono::Utc::now(),
		}
	}

	#[test]
	fn narrowing_drops_foreign_groups() {
		// The row carries both job and guidance values; only the group of
		// its own service type survives the conversion.
		let listing = Listing::from(row(ServiceType::Guidance));

		assert_eq!(listing.service_type(), ServiceType::Guidance);
		assert_eq!(listing.organization_name(), Some("Meera"));

		let json = serde_json::to_value(&listing).unwrap();
		assert_eq!(json["service_type"], "guidance");
		assert!(json.get("company_name").is_none());
		assert!(json.get("mentor_email").is_none());
	}

	#[test]
	fn recipient_falls_back_to_contact() {
		let mut job = row(ServiceType::Job);
		assert_eq!(job.apply_recipient(), "hr@acme.example");

		job.hr_email = None;
		assert_eq!(job.apply_recipient(), "poster@example.com");

		let training = row(ServiceType::Training);
		assert_eq!(training.apply_recipient(), "poster@example.com");
	}
}
