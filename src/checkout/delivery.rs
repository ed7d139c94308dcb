//! Advisory delivery window by destination city.
//!
//! Display data only: the estimate never feeds pricing or the order
//! lifecycle.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Estimated delivery window for checkout display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeliveryEstimate {
    pub label: String,
    pub range_start: NaiveDate,
    pub range_end: NaiveDate,
    pub is_local: bool,
}

/// Trim, casefold, and strip internal whitespace so "Quezon City",
/// "quezoncity" and " QUEZON  CITY " all compare equal.
fn normalize_city(city: &str) -> String {
    city.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Maps a destination city to a delivery window relative to
/// `reference`. Deliveries within the local hub city arrive today or
/// tomorrow; everywhere else gets a 3-4 business day window.
pub fn estimate(city: &str, hub_city: &str, reference: DateTime<Utc>) -> DeliveryEstimate {
    let today = reference.date_naive();
    let is_local = normalize_city(city) == normalize_city(hub_city);

    if is_local {
        DeliveryEstimate {
            label: "Today or Tomorrow".to_string(),
            range_start: today,
            range_end: today + Duration::days(1),
            is_local: true,
        }
    } else {
        DeliveryEstimate {
            label: "3-4 Business Days".to_string(),
            range_start: today + Duration::days(3),
            range_end: today + Duration::days(4),
            is_local: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 9, 30, 0).unwrap()
    }

    #[test]
    fn local_city_delivers_today_or_tomorrow() {
        let est = estimate("Quezon City", "Quezon City", reference());
        assert!(est.is_local);
        assert_eq!(est.label, "Today or Tomorrow");
        assert_eq!(est.range_start, NaiveDate::from_ymd_opt(2025, 6, 2).unwrap());
        assert_eq!(est.range_end, NaiveDate::from_ymd_opt(2025, 6, 3).unwrap());
    }

    #[test]
    fn city_comparison_ignores_case_and_whitespace() {
        let est = estimate("  qUeZoN   cItY ", "Quezon City", reference());
        assert!(est.is_local);
        assert!(estimate("quezoncity", "Quezon City", reference()).is_local);
    }

    #[test]
    fn remote_city_gets_three_to_four_days() {
        let est = estimate("Davao", "Quezon City", reference());
        assert!(!est.is_local);
        assert_eq!(est.label, "3-4 Business Days");
        assert_eq!(est.range_start, NaiveDate::from_ymd_opt(2025, 6, 5).unwrap());
        assert_eq!(est.range_end, NaiveDate::from_ymd_opt(2025, 6, 6).unwrap());
    }
}
