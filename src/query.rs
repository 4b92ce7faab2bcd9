//! Translates the client's filter state into listing queries.
//!
//! The contract: `status = 'approved' AND service_type = <tab>`, an OR of
//! case-insensitive substring matches for the search box, one AND-ed
//! predicate per active facet (OR within a multi-select facet), sorted
//! newest first, windowed by page. The total count is computed with the
//! same predicates, before the window is applied.

use std::collections::BTreeMap;

use sqlx::{Postgres, QueryBuilder};

use crate::{
	model::{ApprovalStatus, Listing, ListingRow, ServiceType},
	Database,
};

pub const DEFAULT_PAGE_SIZE: u32 = 9;
pub const MAX_PAGE_SIZE: u32 = 100;

/// How a facet combines multiple selected values.
///
/// Multi-select facets match any of the selected values; single-select
/// facets are a strict equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacetKind {
	Single,
	Multi,
}

struct FacetDef {
	name: &'static str,
	column: &'static str,
	kind: FacetKind,
}

const JOB_FACETS: &[FacetDef] = &[
	FacetDef { name: "company_type", column: "company_type", kind: FacetKind::Multi },
	FacetDef { name: "industry", column: "industry", kind: FacetKind::Multi },
	FacetDef { name: "job_type", column: "job_type", kind: FacetKind::Multi },
	FacetDef { name: "work_mode", column: "work_mode", kind: FacetKind::Multi },
	FacetDef { name: "location", column: "location", kind: FacetKind::Single },
];

const GUIDANCE_FACETS: &[FacetDef] = &[
	FacetDef { name: "mode", column: "guidance_mode", kind: FacetKind::Single },
	FacetDef { name: "slot", column: "guidance_slot", kind: FacetKind::Single },
	FacetDef { name: "period", column: "guidance_period", kind: FacetKind::Single },
	FacetDef { name: "mentor_name", column: "mentor_name", kind: FacetKind::Single },
];

const TRAINING_FACETS: &[FacetDef] = &[
	FacetDef { name: "duration", column: "training_duration", kind: FacetKind::Single },
	FacetDef { name: "topic", column: "training_topic", kind: FacetKind::Single },
	FacetDef { name: "certification", column: "training_certification", kind: FacetKind::Single },
	FacetDef { name: "trainer_name", column: "trainer_name", kind: FacetKind::Single },
];

fn facets_for(service_type: ServiceType) -> &'static [FacetDef] {
	match service_type {
		ServiceType::Job => JOB_FACETS,
		ServiceType::Guidance => GUIDANCE_FACETS,
		ServiceType::Training => TRAINING_FACETS,
	}
}

/// Looks a facet up in the registry of the given service type. Facet names
/// not registered for it resolve to `None` and are dropped by the caller,
/// never forwarded into a query.
fn resolve_facet(service_type: ServiceType, name: &str) -> Option<&'static FacetDef> {
	facets_for(service_type).iter().find(|facet| facet.name == name)
}

/// Columns the free-text search matches against. Only columns that apply
/// to the service type are included; `location` is job-only.
fn search_columns(service_type: ServiceType) -> &'static [&'static str] {
	match service_type {
		ServiceType::Job => &["title", "company_name", "location"],
		ServiceType::Guidance => &["title", "mentor_name"],
		ServiceType::Training => &["title", "trainer_name"],
	}
}

/// Escapes `%`, `_` and `\` so user text is matched literally by `ILIKE`
/// instead of being interpreted as pattern syntax.
#[must_use]
pub fn escape_like(term: &str) -> String {
	let mut out = String::with_capacity(term.len());

	for c in term.chars() {
		if matches!(c, '%' | '_' | '\\') {
			out.push('\\');
		}

		out.push(c);
	}

	out
}

/// One facet's selected value(s).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FacetSelection {
	One(String),
	Many(Vec<String>),
}

impl FacetSelection {
	fn is_empty(&self) -> bool {
		match self {
			Self::One(value) => value.is_empty(),
			Self::Many(values) => values.is_empty(),
		}
	}
}

/// Transient, client-held filter state for one listing tab.
///
/// Mutating the search term or a facet resets `page` to 1 so a stale page
/// is never shown for a new query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
	service_type: ServiceType,
	search_term: String,
	facets: BTreeMap<String, FacetSelection>,
	page: u32,
	page_size: u32,
}

impl FilterState {
	#[must_use]
	pub fn new(service_type: ServiceType) -> Self {
		Self {
			service_type,
			search_term: String::new(),
			facets: BTreeMap::new(),
			page: 1,
			page_size: DEFAULT_PAGE_SIZE,
		}
	}

	/// Builds a filter state from raw query-string parameters.
	///
	/// `q`, `page` and `size` are reserved; every other key is treated as a
	/// facet name and silently dropped unless the active service type
	/// registers it. Multi-select facet values are comma-separated.
	#[must_use]
	pub fn from_params(service_type: ServiceType, params: &BTreeMap<String, String>) -> Self {
		let mut filter = Self::new(service_type);

		for (key, value) in params {
			match key.as_str() {
				"q" => filter.search_term = value.clone(),
				"page" => filter.page = value.parse().unwrap_or(1).max(1),
				"size" => {
					filter.page_size = value
						.parse()
						.unwrap_or(DEFAULT_PAGE_SIZE)
						.clamp(1, MAX_PAGE_SIZE);
				}
				name => {
					let Some(facet) = resolve_facet(service_type, name) else {
						continue;
					};

					let selection = match facet.kind {
						FacetKind::Single => FacetSelection::One(value.trim().to_owned()),
						FacetKind::Multi => FacetSelection::Many(
							value
								.split(',')
								.map(str::trim)
								.filter(|part| !part.is_empty())
								.map(str::to_owned)
								.collect(),
						),
					};

					if !selection.is_empty() {
						filter.facets.insert(facet.name.to_owned(), selection);
					}
				}
			}
		}

		filter
	}

	#[must_use]
	pub fn service_type(&self) -> ServiceType {
		self.service_type
	}

	#[must_use]
	pub fn search_term(&self) -> &str {
		&self.search_term
	}

	#[must_use]
	pub fn page(&self) -> u32 {
		self.page
	}

	#[must_use]
	pub fn page_size(&self) -> u32 {
		self.page_size
	}

	#[must_use]
	pub fn facet(&self, name: &str) -> Option<&FacetSelection> {
		self.facets.get(name)
	}

	/// Whether any search text or facet narrows the result set. Used to
	/// tell "no matches" apart from "no listings exist yet."
	#[must_use]
	pub fn is_constrained(&self) -> bool {
		!self.search_term.trim().is_empty() || !self.facets.is_empty()
	}

	pub fn set_search_term(&mut self, term: impl Into<String>) {
		self.search_term = term.into();
		self.page = 1;
	}

	/// Stores a facet selection, dropping it if the active service type
	/// does not register the facet (stale state from another tab).
	pub fn set_facet(&mut self, name: &str, selection: FacetSelection) {
		let Some(facet) = resolve_facet(self.service_type, name) else {
			return;
		};

		if selection.is_empty() {
			self.facets.remove(facet.name);
		} else {
			self.facets.insert(facet.name.to_owned(), selection);
		}

		self.page = 1;
	}

	pub fn clear_facets(&mut self) {
		self.facets.clear();
		self.page = 1;
	}

	pub fn set_page(&mut self, page: u32) {
		self.page = page.max(1);
	}

	fn offset(&self) -> i64 {
		i64::from(self.page - 1) * i64::from(self.page_size)
	}

	/// The `ILIKE` pattern for the search box, or `None` when the trimmed
	/// term is empty.
	fn search_pattern(&self) -> Option<String> {
		let term = self.search_term.trim();

		if term.is_empty() {
			None
		} else {
			Some(format!("%{}%", escape_like(term)))
		}
	}
}

/// One page of query results, with the exact total before pagination.
#[derive(Debug)]
pub struct Page<T> {
	pub items: Vec<T>,
	pub total_count: u64,
}

fn push_predicates(builder: &mut QueryBuilder<'_, Postgres>, filter: &FilterState) {
	builder.push(" WHERE status = ");
	builder.push_bind(ApprovalStatus::Approved);
	builder.push(" AND service_type = ");
	builder.push_bind(filter.service_type);

	if let Some(pattern) = filter.search_pattern() {
		builder.push(" AND (");

		let mut any = builder.separated(" OR ");

		for column in search_columns(filter.service_type) {
			any.push(format!("{column} ILIKE "));
			any.push_bind_unseparated(pattern.clone());
		}

		builder.push(")");
	}

	for (name, selection) in &filter.facets {
		// Column names come from the static registry, never from input.
		let Some(facet) = resolve_facet(filter.service_type, name) else {
			continue;
		};

		match selection {
			FacetSelection::One(value) => {
				builder.push(format!(" AND {} = ", facet.column));
				builder.push_bind(value.clone());
			}
			FacetSelection::Many(values) => {
				if values.is_empty() {
					continue;
				}

				builder.push(format!(" AND {} = ANY(", facet.column));
				builder.push_bind(values.clone());
				builder.push(")");
			}
		}
	}
}

/// Runs the listing query: an exact count of every matching record, then
/// the requested page, newest first with ids breaking timestamp ties.
///
/// A page past the end returns empty `items` with the true `total_count`.
pub async fn run(database: &Database, filter: &FilterState) -> Result<Page<Listing>, sqlx::Error> {
	let mut count = QueryBuilder::new("SELECT COUNT(*) FROM listing");
	push_predicates(&mut count, filter);

	let total: i64 = count.build_query_scalar().fetch_one(database).await?;

	let mut select = QueryBuilder::new("SELECT * FROM listing");
	push_predicates(&mut select, filter);
	select.push(" ORDER BY created_at DESC, id ASC LIMIT ");
	select.push_bind(i64::from(filter.page_size));
	select.push(" OFFSET ");
	select.push_bind(filter.offset());

	let rows: Vec<ListingRow> = select.build_query_as().fetch_all(database).await?;

	Ok(Page {
		items: rows.into_iter().map(Listing::from).collect(),
		total_count: u64::try_from(total).unwrap_or(0),
	})
}
