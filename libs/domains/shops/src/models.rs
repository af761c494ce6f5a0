use chrono::{NaiveDate, NaiveTime};
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::Display;
use validator::Validate;

use crate::error::ValidationError;

/// Day of the week an opening-hours slot applies to.
///
/// Variant order is Monday..Sunday; `Ord` follows it.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "weekday")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Weekday {
    #[sea_orm(string_value = "monday")]
    Monday,
    #[sea_orm(string_value = "tuesday")]
    Tuesday,
    #[sea_orm(string_value = "wednesday")]
    Wednesday,
    #[sea_orm(string_value = "thursday")]
    Thursday,
    #[sea_orm(string_value = "friday")]
    Friday,
    #[sea_orm(string_value = "saturday")]
    Saturday,
    #[sea_orm(string_value = "sunday")]
    Sunday,
}

impl FromStr for Weekday {
    type Err = strum::ParseError;

    /// Case-insensitive day name
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let day = match value.trim().to_ascii_lowercase().as_str() {
            "monday" => Weekday::Monday,
            "tuesday" => Weekday::Tuesday,
            "wednesday" => Weekday::Wednesday,
            "thursday" => Weekday::Thursday,
            "friday" => Weekday::Friday,
            "saturday" => Weekday::Saturday,
            "sunday" => Weekday::Sunday,
            _ => return Err(strum::ParseError::VariantNotFound),
        };
        Ok(day)
    }
}

/// One opening slot of a shop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningHours {
    pub day: Weekday,
    pub open_at: NaiveTime,
    pub close_at: NaiveTime,
}

impl OpeningHours {
    pub fn new(day: Weekday, open_at: NaiveTime, close_at: NaiveTime) -> Self {
        Self {
            day,
            open_at,
            close_at,
        }
    }
}

impl fmt::Display for OpeningHours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.open_at.format("%H:%M"),
            self.close_at.format("%H:%M")
        )
    }
}

/// Shop as stored in the primary database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shop {
    pub id: i64,
    pub name: String,
    /// Assigned by the database on insert, never changed afterwards
    pub created_at: NaiveDate,
    pub in_vacations: bool,
    /// Number of products referencing this shop, computed on read
    pub nb_products: i64,
    pub opening_hours: Vec<OpeningHours>,
}

/// Client-supplied shop fields, used for both create and full replace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ShopInput {
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: String,

    pub in_vacations: bool,

    #[serde(default)]
    pub opening_hours: Vec<OpeningHours>,
}

impl ShopInput {
    pub fn new(name: impl Into<String>, in_vacations: bool) -> Self {
        Self {
            name: name.into(),
            in_vacations,
            opening_hours: Vec::new(),
        }
    }

    pub fn with_opening_hours(mut self, opening_hours: Vec<OpeningHours>) -> Self {
        self.opening_hours = opening_hours;
        self
    }
}

impl From<&Shop> for ShopInput {
    fn from(shop: &Shop) -> Self {
        Self {
            name: shop.name.clone(),
            in_vacations: shop.in_vacations,
            opening_hours: shop.opening_hours.clone(),
        }
    }
}

/// Zero-based page request. `size` is never zero, however it was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawPageRequest")]
pub struct PageRequest {
    page: u64,
    size: u64,
}

#[derive(Deserialize)]
struct RawPageRequest {
    #[serde(default)]
    page: u64,
    #[serde(default = "default_page_size")]
    size: u64,
}

fn default_page_size() -> u64 {
    PageRequest::DEFAULT_SIZE
}

impl From<RawPageRequest> for PageRequest {
    fn from(raw: RawPageRequest) -> Self {
        Self::new(raw.page, raw.size)
    }
}

impl PageRequest {
    pub const DEFAULT_SIZE: u64 = 20;

    /// A zero `size` is bumped to 1
    pub fn new(page: u64, size: u64) -> Self {
        Self {
            page,
            size: size.max(1),
        }
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_mul(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, Self::DEFAULT_SIZE)
    }
}

/// One page of results plus the totals needed to navigate the rest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub size: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total_items: u64) -> Self {
        Self {
            items,
            page: request.page,
            size: request.size,
            total_items,
            total_pages: total_items.div_ceil(request.size),
        }
    }

    /// Cut the requested page out of a fully materialized, already ordered list
    pub fn from_vec(all: Vec<T>, request: PageRequest) -> Self {
        let total_items = all.len() as u64;
        let items = all
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.size as usize)
            .collect();

        Self::new(items, request, total_items)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_items: self.total_items,
            total_pages: self.total_pages,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Ordering used when a caller asks for a sorted listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Name,
    CreatedAt,
    NbProducts,
}

impl SortKey {
    /// `"name"` and `"createdAt"` select their column; anything else sorts by
    /// product count.
    pub fn parse(value: &str) -> Self {
        match value {
            "name" => SortKey::Name,
            "createdAt" => SortKey::CreatedAt,
            _ => SortKey::NbProducts,
        }
    }
}

/// Structured primary-store filter, one variant per supported combination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShopFilter {
    VacationCreatedBetween {
        in_vacations: bool,
        after: NaiveDate,
        before: NaiveDate,
    },
    VacationCreatedBefore {
        in_vacations: bool,
        before: NaiveDate,
    },
    VacationCreatedAfter {
        in_vacations: bool,
        after: NaiveDate,
    },
    Vacation(bool),
    /// Inclusive on both ends
    CreatedBetween {
        after: NaiveDate,
        before: NaiveDate,
    },
    CreatedBefore(NaiveDate),
    CreatedAfter(NaiveDate),
    All,
}

impl ShopFilter {
    pub fn matches(&self, shop: &Shop) -> bool {
        let created = shop.created_at;
        match *self {
            ShopFilter::VacationCreatedBetween {
                in_vacations,
                after,
                before,
            } => shop.in_vacations == in_vacations && created > after && created < before,
            ShopFilter::VacationCreatedBefore {
                in_vacations,
                before,
            } => shop.in_vacations == in_vacations && created < before,
            ShopFilter::VacationCreatedAfter {
                in_vacations,
                after,
            } => shop.in_vacations == in_vacations && created > after,
            ShopFilter::Vacation(in_vacations) => shop.in_vacations == in_vacations,
            ShopFilter::CreatedBetween { after, before } => created >= after && created <= before,
            ShopFilter::CreatedBefore(before) => created < before,
            ShopFilter::CreatedAfter(after) => created > after,
            ShopFilter::All => true,
        }
    }
}

/// Typed list request: every parameter optional
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShopQuery {
    pub sort_by: Option<String>,
    pub name: Option<String>,
    pub in_vacations: Option<bool>,
    pub created_after: Option<NaiveDate>,
    pub created_before: Option<NaiveDate>,
}

/// Raw list parameters as they arrive from a query string.
///
/// Blank values count as absent; dates use `YYYY-MM-DD`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopListParams {
    pub sort_by: Option<String>,
    pub name: Option<String>,
    pub in_vacations: Option<bool>,
    pub created_after: Option<String>,
    pub created_before: Option<String>,
}

impl TryFrom<ShopListParams> for ShopQuery {
    type Error = ValidationError;

    fn try_from(params: ShopListParams) -> Result<Self, Self::Error> {
        Ok(Self {
            sort_by: non_blank(params.sort_by),
            name: non_blank(params.name),
            in_vacations: params.in_vacations,
            created_after: parse_date("createdAfter", params.created_after)?,
            created_before: parse_date("createdBefore", params.created_before)?,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_date(field: &'static str, value: Option<String>) -> Result<Option<NaiveDate>, ValidationError> {
    match non_blank(value) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<NaiveDate>()
            .map(Some)
            .map_err(|_| ValidationError::InvalidDate { field, value: raw }),
    }
}
