//! Derived presentation values for a page of query results.
//!
//! Everything here is a pure function of the query output and the filter
//! state that produced it; nothing holds state of its own.

use serde::Serialize;

use crate::{
	model::Listing,
	query::{FilterState, Page},
};

/// The last reachable page: `max(1, ceil(total / size))`. An empty result
/// set still has one (empty) page.
#[must_use]
pub fn last_page(total_count: u64, page_size: u32) -> u32 {
	if page_size == 0 {
		return 1;
	}

	let pages = total_count.div_ceil(u64::from(page_size));

	u32::try_from(pages.max(1)).unwrap_or(u32::MAX)
}

#[must_use]
pub fn can_go_prev(page: u32) -> bool {
	page > 1
}

#[must_use]
pub fn can_go_next(page: u32, last_page: u32) -> bool {
	page < last_page
}

/// Why a list response looks the way it does. A failed query never maps
/// onto any of these; it is reported as an error response instead, so
/// "no results" and "query failed" stay distinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListOutcome {
	/// At least one listing matched.
	Ok,
	/// Nothing matched the active search/filter combination.
	NoMatches,
	/// No approved listings exist for this tab at all.
	Empty,
}

#[must_use]
pub fn classify(total_count: u64, constrained: bool) -> ListOutcome {
	match (total_count, constrained) {
		(0, true) => ListOutcome::NoMatches,
		(0, false) => ListOutcome::Empty,
		_ => ListOutcome::Ok,
	}
}

/// Renders an optional date in the short locale form used on cards, e.g.
/// `14 Jan 2026`. A missing date renders as an em-dash placeholder, never
/// as an empty string.
#[must_use]
pub fn format_short_date(date: Option<chrono::NaiveDate>) -> String {
	date.map_or_else(|| "—".to_owned(), |date| date.format("%-d %b %Y").to_string())
}

/// A listing plus its display-ready deadline.
#[derive(Debug, Serialize)]
pub struct ListingView {
	#[serde(flatten)]
	pub listing: Listing,
	pub deadline: String,
}

impl From<Listing> for ListingView {
	fn from(listing: Listing) -> Self {
		let deadline = format_short_date(listing.end_date);

		Self { listing, deadline }
	}
}

/// The body of a successful listing query.
#[derive(Debug, Serialize)]
pub struct ListResponse {
	pub outcome: ListOutcome,
	pub items: Vec<ListingView>,
	pub total_count: u64,
	pub page: u32,
	pub page_size: u32,
	pub last_page: u32,
	pub can_go_prev: bool,
	pub can_go_next: bool,
}

impl ListResponse {
	#[must_use]
	pub fn new(page: Page<Listing>, filter: &FilterState) -> Self {
		let last_page = last_page(page.total_count, filter.page_size());

		Self {
			outcome: classify(page.total_count, filter.is_constrained()),
			items: page.items.into_iter().map(ListingView::from).collect(),
			total_count: page.total_count,
			page: filter.page(),
			page_size: filter.page_size(),
			last_page,
			can_go_prev: can_go_prev(filter.page()),
			can_go_next: can_go_next(filter.page(), last_page),
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn last_page_bounds() {
		// ceil(total / size), floored at one page.
		for total in 0..200u64 {
			for size in 1..20u32 {
				let last = last_page(total, size);

				assert!(u64::from(last) * u64::from(size) >= total);
				assert!(u64::from(last - 1) * u64::from(size) < total.max(1));
				assert!(last >= 1);
			}
		}
	}

	#[test]
	fn last_page_examples() {
		assert_eq!(last_page(0, 9), 1);
		assert_eq!(last_page(9, 9), 1);
		assert_eq!(last_page(10, 9), 2);
		assert_eq!(last_page(18, 9), 2);
	}

	#[test]
	fn navigation_flags() {
		assert!(!can_go_prev(1));
		assert!(can_go_prev(2));
		assert!(can_go_next(1, 3));
		assert!(!can_go_next(3, 3));
	}

	#[test]
	fn empty_states_are_distinguishable() {
		assert_eq!(classify(0, true), ListOutcome::NoMatches);
		assert_eq!(classify(0, false), ListOutcome::Empty);
		assert_eq!(classify(4, true), ListOutcome::Ok);
	}

	#[test]
	fn short_date_rendering() {
		let date = chrono::NaiveDate::from_ymd_opt(2026, 1, 14);

		assert_eq!(format_short_date(date), "14 Jan 2026");
		assert_eq!(format_short_date(None), "—");
	}
}
