use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CoreError;

/// An external store whose product pages are tracked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub store_id: Uuid,
    pub name: String,
    pub url: String,
}

/// Currencies a tracked product can be priced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Pen,
    Usd,
}

impl Currency {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Currency::Pen => "PEN",
            Currency::Usd => "USD",
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Currency {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PEN" => Ok(Currency::Pen),
            "USD" => Ok(Currency::Usd),
            other => Err(CoreError::InvalidCurrency(other.to_string())),
        }
    }
}

/// A tracked product together with its cached pricing fields.
///
/// `current_price`, `price_change_percentage`, and `last_updated` mirror the
/// newest [`PriceHistory`] row for the product and are only ever written in
/// the same transaction as that row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: Uuid,
    pub store_id: Uuid,
    pub name: String,
    pub url: String,
    pub currency: Currency,
    pub current_price: Option<Decimal>,
    pub price_change_percentage: Option<Decimal>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// One observed price for a product. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceHistory {
    pub price_history_id: Uuid,
    pub product_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
}

/// Largest price accepted anywhere in the pipeline (one trillion).
pub const MAX_PRICE: Decimal = Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0);

/// Whether `price` may be recorded: strictly positive and at most [`MAX_PRICE`].
#[must_use]
pub fn is_recordable_price(price: Decimal) -> bool {
    price > Decimal::ZERO && price <= MAX_PRICE
}

/// Percent change between the product's prior cached price and a newly
/// observed one.
///
/// A missing or non-positive prior price yields `0`: the first observation of
/// a product is never reported as a change.
///
/// # Errors
///
/// Returns [`CoreError::PriceChangeOverflow`] when the change does not fit in
/// a [`Decimal`] (a tiny prior price followed by a huge new one).
pub fn price_change_percentage(
    prior: Option<Decimal>,
    new_price: Decimal,
) -> Result<Decimal, CoreError> {
    match prior {
        Some(prior) if prior > Decimal::ZERO => new_price
            .checked_sub(prior)
            .and_then(|delta| delta.checked_div(prior))
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .ok_or(CoreError::PriceChangeOverflow { prior, new_price }),
        _ => Ok(Decimal::ZERO),
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn no_prior_price_is_zero_change() {
        assert_eq!(
            price_change_percentage(None, dec("19.99")).unwrap(),
            Decimal::ZERO
        );
    }

    #[test]
    fn non_positive_prior_price_is_zero_change() {
        assert_eq!(
            price_change_percentage(Some(Decimal::ZERO), dec("10")).unwrap(),
            Decimal::ZERO
        );
        assert_eq!(
            price_change_percentage(Some(dec("-4")), dec("10")).unwrap(),
            Decimal::ZERO
        );
    }

    #[test]
    fn price_increase_is_positive_percentage() {
        assert_eq!(
            price_change_percentage(Some(dec("100")), dec("150")).unwrap(),
            dec("50")
        );
    }

    #[test]
    fn price_decrease_is_negative_percentage() {
        assert_eq!(
            price_change_percentage(Some(dec("200")), dec("150")).unwrap(),
            dec("-25")
        );
    }

    #[test]
    fn unchanged_price_is_zero_change() {
        assert_eq!(
            price_change_percentage(Some(dec("299.99")), dec("299.99")).unwrap(),
            Decimal::ZERO
        );
    }

    #[test]
    fn overflowing_change_is_an_error_not_a_panic() {
        let result = price_change_percentage(Some(dec("0.01")), dec("1000000000000000000000000000"));
        assert!(matches!(
            result,
            Err(CoreError::PriceChangeOverflow { prior, .. }) if prior == dec("0.01")
        ));
    }

    #[test]
    fn tiny_prior_price_with_bounded_new_price_still_errors_cleanly() {
        let result = price_change_percentage(Some(dec("0.0000000000000000000001")), MAX_PRICE);
        assert!(result.is_err());
    }

    #[test]
    fn largest_change_within_bounds_is_computed() {
        assert_eq!(
            price_change_percentage(Some(dec("0.01")), MAX_PRICE).unwrap(),
            dec("9999999999999900")
        );
    }

    #[test]
    fn max_price_is_one_trillion() {
        assert_eq!(MAX_PRICE, Decimal::from(1_000_000_000_000_i64));
    }

    #[test]
    fn recordable_prices_are_positive_and_bounded() {
        assert!(is_recordable_price(dec("0.01")));
        assert!(is_recordable_price(MAX_PRICE));
        assert!(!is_recordable_price(Decimal::ZERO));
        assert!(!is_recordable_price(dec("-5")));
        assert!(!is_recordable_price(MAX_PRICE + Decimal::ONE));
    }

    #[test]
    fn currency_round_trips_through_str() {
        assert_eq!(Currency::from_str("PEN").unwrap(), Currency::Pen);
        assert_eq!(Currency::Usd.to_string(), "USD");
        assert!(matches!(
            Currency::from_str("EUR"),
            Err(CoreError::InvalidCurrency(ref c)) if c == "EUR"
        ));
    }

    #[test]
    fn currency_serializes_uppercase() {
        let json = serde_json::to_string(&Currency::Pen).unwrap();
        assert_eq!(json, "\"PEN\"");
    }
}
