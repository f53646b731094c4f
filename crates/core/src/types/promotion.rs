//! Promotion discount types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How a promotion's `discountValue` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    /// `discountValue` is a percentage of the price (0-100].
    #[default]
    Percentage,
    /// `discountValue` is an absolute amount off.
    Fixed,
}

/// Errors produced when validating a discount.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiscountError {
    #[error("discount value must be greater than zero")]
    NotPositive,
    #[error("percentage discount cannot exceed 100")]
    PercentageTooLarge,
}

impl DiscountType {
    /// Check a `discountValue` against this type.
    ///
    /// # Errors
    ///
    /// Returns [`DiscountError`] if the value is not positive, or a
    /// percentage above 100.
    pub fn validate(self, value: Decimal) -> Result<(), DiscountError> {
        if value <= Decimal::ZERO {
            return Err(DiscountError::NotPositive);
        }
        if self == Self::Percentage && value > Decimal::ONE_HUNDRED {
            return Err(DiscountError::PercentageTooLarge);
        }
        Ok(())
    }
}

/// Whether a promotion is live at `now`: flagged active and inside its
/// inclusive date range.
#[must_use]
pub fn is_live(active: bool, start: DateTime<Utc>, end: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    active && start <= now && now <= end
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_discount_validation() {
        assert_eq!(
            DiscountType::Fixed.validate(Decimal::ZERO),
            Err(DiscountError::NotPositive)
        );
        assert_eq!(
            DiscountType::Percentage.validate(Decimal::new(1005, 1)),
            Err(DiscountError::PercentageTooLarge)
        );
        assert!(DiscountType::Percentage.validate(Decimal::ONE_HUNDRED).is_ok());
        assert!(DiscountType::Fixed.validate(Decimal::from(250)).is_ok());
    }

    #[test]
    fn test_is_live_inclusive_range() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let end = start + Duration::days(7);
        assert!(is_live(true, start, end, start));
        assert!(is_live(true, start, end, end));
        assert!(!is_live(true, start, end, end + Duration::seconds(1)));
        assert!(!is_live(false, start, end, start + Duration::days(1)));
    }

    #[test]
    fn test_discount_type_serde() {
        assert_eq!(
            serde_json::to_string(&DiscountType::Percentage).unwrap(),
            "\"percentage\""
        );
        assert_eq!(
            serde_json::from_str::<DiscountType>("\"fixed\"").unwrap(),
            DiscountType::Fixed
        );
    }
}
