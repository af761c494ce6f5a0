//! Decides which store answers a list request and with which query shape.
//!
//! Precedence: an explicit sort wins over everything, a name search wins over
//! structured filters, and structured filters fall back combination by
//! combination down to a plain listing.

use chrono::NaiveDate;

use crate::models::{ShopFilter, ShopQuery, SortKey};
use crate::search::ShopSearchQuery;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryPlan {
    /// Primary store, every shop, ordered
    Sorted(SortKey),
    /// Search index
    Search(ShopSearchQuery),
    /// Primary store, filtered, ordered by id
    Filtered(ShopFilter),
}

/// Lower bound of the search window when `created_after` is absent
pub fn search_window_start() -> NaiveDate {
    NaiveDate::default()
}

/// Upper bound of the search window when `created_before` is absent
pub fn search_window_end() -> NaiveDate {
    NaiveDate::from_ymd_opt(2060, 1, 1).unwrap_or(NaiveDate::MAX)
}

pub fn route(query: &ShopQuery) -> QueryPlan {
    if let Some(sort_by) = &query.sort_by {
        return QueryPlan::Sorted(SortKey::parse(sort_by));
    }

    if let Some(name) = &query.name {
        return QueryPlan::Search(ShopSearchQuery {
            name: name.clone(),
            created_after: query.created_after.unwrap_or_else(search_window_start),
            created_before: query.created_before.unwrap_or_else(search_window_end),
            in_vacations: query.in_vacations.unwrap_or(false),
        });
    }

    let filter = match (query.in_vacations, query.created_after, query.created_before) {
        (Some(in_vacations), Some(after), Some(before)) => ShopFilter::VacationCreatedBetween {
            in_vacations,
            after,
            before,
        },
        (Some(in_vacations), None, Some(before)) => ShopFilter::VacationCreatedBefore {
            in_vacations,
            before,
        },
        (Some(in_vacations), Some(after), None) => ShopFilter::VacationCreatedAfter {
            in_vacations,
            after,
        },
        (Some(in_vacations), None, None) => ShopFilter::Vacation(in_vacations),
        (None, Some(after), Some(before)) => ShopFilter::CreatedBetween { after, before },
        (None, None, Some(before)) => ShopFilter::CreatedBefore(before),
        (None, Some(after), None) => ShopFilter::CreatedAfter(after),
        (None, None, None) => ShopFilter::All,
    };

    QueryPlan::Filtered(filter)
}
