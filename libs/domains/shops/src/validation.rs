//! Opening-hours overlap check and full input validation

use std::collections::BTreeMap;
use validator::Validate;

use crate::error::ValidationError;
use crate::models::{OpeningHours, ShopInput, Weekday};

/// Reject the first pair of same-day slots that overlap.
///
/// Days are visited Monday..Sunday and each day's slots are ordered by opening
/// time. Two consecutive slots overlap unless the first closes strictly before
/// the second opens, so `09:00-12:00` and `12:00-15:00` collide.
pub fn check_opening_hours(entries: &[OpeningHours]) -> Result<(), ValidationError> {
    let mut by_day: BTreeMap<Weekday, Vec<&OpeningHours>> = BTreeMap::new();
    for entry in entries {
        by_day.entry(entry.day).or_default().push(entry);
    }

    for (day, mut slots) in by_day {
        slots.sort_by_key(|slot| slot.open_at);

        for pair in slots.windows(2) {
            let (first, second) = (pair[0], pair[1]);
            if first.close_at >= second.open_at {
                return Err(ValidationError::OverlappingHours {
                    day,
                    first: *first,
                    second: *second,
                });
            }
        }
    }

    Ok(())
}

/// Field constraints first, then the overlap check
pub fn validate_shop(input: &ShopInput) -> Result<(), ValidationError> {
    input.validate()?;
    check_opening_hours(&input.opening_hours)
}
