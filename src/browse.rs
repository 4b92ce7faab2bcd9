//! Headless browse-session model for a listing tab.
//!
//! Front ends embed this to get the two client-side invariants for free:
//! editing the search text or a facet resets the window to page 1, and a
//! slow in-flight response can never overwrite the result of a query
//! issued after it (last-write-wins by issue order, not arrival order).

use crate::{
	model::{Listing, ServiceType},
	query::{FacetSelection, FilterState, Page},
};

/// Identifies one issued query. Only the most recently issued ticket may
/// apply its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryTicket(u64);

/// One tab's browse session: the current filter state, the newest issued
/// query ticket, and the last applied page of results.
#[derive(Debug)]
pub struct Browse {
	filter: FilterState,
	issued: u64,
	current: Option<Page<Listing>>,
}

impl Browse {
	#[must_use]
	pub fn new(service_type: ServiceType) -> Self {
		Self {
			filter: FilterState::new(service_type),
			issued: 0,
			current: None,
		}
	}

	#[must_use]
	pub fn filter(&self) -> &FilterState {
		&self.filter
	}

	#[must_use]
	pub fn current(&self) -> Option<&Page<Listing>> {
		self.current.as_ref()
	}

	/// Edits the search text and issues a fresh query.
	pub fn set_search_term(&mut self, term: impl Into<String>) -> QueryTicket {
		self.filter.set_search_term(term);
		self.issue()
	}

	/// Edits one facet selection and issues a fresh query.
	pub fn set_facet(&mut self, name: &str, selection: FacetSelection) -> QueryTicket {
		self.filter.set_facet(name, selection);
		self.issue()
	}

	pub fn clear_facets(&mut self) -> QueryTicket {
		self.filter.clear_facets();
		self.issue()
	}

	pub fn set_page(&mut self, page: u32) -> QueryTicket {
		self.filter.set_page(page);
		self.issue()
	}

	/// Re-runs the current filter state unchanged, e.g. for a manual retry
	/// after a failed query.
	pub fn refresh(&mut self) -> QueryTicket {
		self.issue()
	}

	fn issue(&mut self) -> QueryTicket {
		self.issued += 1;
		QueryTicket(self.issued)
	}

	/// Applies a finished query's result. Returns `false` (and leaves the
	/// visible state untouched) when a newer query was issued after this
	/// ticket — the stale result must be discarded.
	pub fn apply(&mut self, ticket: QueryTicket, page: Page<Listing>) -> bool {
		if ticket.0 != self.issued {
			return false;
		}

		self.current = Some(page);
		true
	}
}
