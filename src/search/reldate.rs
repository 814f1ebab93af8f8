use chrono::{Days, Months, NaiveDate};

use crate::search::FilterError;

/// Resolve a relative-date expression like `"1 year"` or `"90 days"`
/// to the absolute date that far before `today`.
///
/// Exactly two tokens: an integer quantity and a unit word matched by
/// first letter (y/m/d, case-insensitive). The shift is calendar-aware,
/// so one month before 2024-03-01 is 2024-02-01, not 30 days.
pub fn resolve_relative(value: &str, today: NaiveDate) -> Result<NaiveDate, FilterError> {
    let tokens: Vec<&str> = value.split_whitespace().collect();
    let [qty, unit] = tokens.as_slice() else {
        return Err(FilterError::BadRelativeDate(value.to_string()));
    };

    let qty: i64 = qty
        .parse()
        .map_err(|_| FilterError::BadRelativeDate(value.to_string()))?;
    let n = qty.unsigned_abs();

    let initial = unit
        .chars()
        .next()
        .map(|c| c.to_ascii_lowercase())
        .ok_or_else(|| FilterError::BadRelativeDate(value.to_string()))?;

    // A negative quantity flips the shift forward in time.
    let shifted = match initial {
        'y' | 'm' => {
            let months = if initial == 'y' {
                n.checked_mul(12)
                    .ok_or_else(|| FilterError::BadRelativeDate(value.to_string()))?
            } else {
                n
            };
            let months = u32::try_from(months)
                .ok()
                .map(Months::new)
                .ok_or_else(|| FilterError::BadRelativeDate(value.to_string()))?;
            if qty >= 0 {
                today.checked_sub_months(months)
            } else {
                today.checked_add_months(months)
            }
        }
        'd' => {
            if qty >= 0 {
                today.checked_sub_days(Days::new(n))
            } else {
                today.checked_add_days(Days::new(n))
            }
        }
        _ => return Err(FilterError::BadRelativeDate(value.to_string())),
    };

    shifted.ok_or_else(|| FilterError::BadRelativeDate(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_one_year_back() {
        let resolved = resolve_relative("1 year", date(2024, 3, 15)).unwrap();
        assert_eq!(resolved, date(2023, 3, 15));
    }

    #[test]
    fn test_one_month_back_is_calendar_aware() {
        let resolved = resolve_relative("1 month", date(2024, 3, 1)).unwrap();
        assert_eq!(resolved, date(2024, 2, 1));
    }

    #[test]
    fn test_days_back() {
        let resolved = resolve_relative("10 days", date(2024, 1, 5)).unwrap();
        assert_eq!(resolved, date(2023, 12, 26));
    }

    #[test]
    fn test_month_end_clamps() {
        // 1 month before March 31 lands on the last day of February.
        let resolved = resolve_relative("1 month", date(2024, 3, 31)).unwrap();
        assert_eq!(resolved, date(2024, 2, 29));
    }

    #[test]
    fn test_unit_matched_by_first_letter_case_insensitive() {
        let today = date(2024, 6, 1);
        assert_eq!(
            resolve_relative("2 Years", today).unwrap(),
            date(2022, 6, 1)
        );
        assert_eq!(resolve_relative("3 m", today).unwrap(), date(2024, 3, 1));
        assert_eq!(resolve_relative("1 D", today).unwrap(), date(2024, 5, 31));
    }

    #[test]
    fn test_negative_quantity_shifts_forward() {
        let resolved = resolve_relative("-1 year", date(2024, 3, 15)).unwrap();
        assert_eq!(resolved, date(2025, 3, 15));
    }

    #[test]
    fn test_malformed_expressions_fail() {
        let today = date(2024, 1, 1);
        for raw in ["year", "1", "one year", "1 fortnight", "1 year ago", ""] {
            assert!(resolve_relative(raw, today).is_err(), "should fail: {raw:?}");
        }
    }
}
