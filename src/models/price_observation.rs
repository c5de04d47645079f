//! Price observations as read from and appended to the price store

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// A scraped or listed price.
///
/// The store keeps prices as text because the collection step records
/// markers such as `N/A` or `Price not found`. Those become `Invalid` and
/// never take part in ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Price {
    Valid(Decimal),
    Invalid(String),
}

impl Price {
    /// Build a price from an amount, rejecting negatives
    pub fn from_amount(amount: Decimal) -> Self {
        if amount.is_sign_negative() && !amount.is_zero() {
            Price::Invalid(format!("negative price: {}", amount))
        } else {
            Price::Valid(amount)
        }
    }

    /// Parse a price in the canonical stored form (`"689.99"`)
    pub fn parse(raw: &str) -> Self {
        let cleaned = strip_currency(raw);
        if cleaned.is_empty() {
            return Price::Invalid(raw.trim().to_string());
        }

        match Decimal::from_str(&cleaned) {
            Ok(amount) => Self::from_amount(amount),
            Err(_) => Price::Invalid(raw.trim().to_string()),
        }
    }

    /// Parse scraped price text that may use German formatting
    /// (`"1.234,56 €"`, `"EUR 99,00"`, `"689,99 inkl. Versand"`).
    ///
    /// A comma marks the decimal separator and dots are then thousands
    /// separators. Without a comma, dots only count as thousands separators
    /// when every group after the first has exactly three digits.
    pub fn parse_localized(raw: &str) -> Self {
        let cleaned = strip_currency(raw);
        if cleaned.is_empty() {
            return Price::Invalid(raw.trim().to_string());
        }

        let canonical = if cleaned.contains(',') {
            cleaned.replace('.', "").replace(',', ".")
        } else if is_thousands_grouped(&cleaned) {
            cleaned.replace('.', "")
        } else {
            cleaned
        };

        match Decimal::from_str(&canonical) {
            Ok(amount) => Self::from_amount(amount),
            Err(_) => Price::Invalid(raw.trim().to_string()),
        }
    }

    /// The amount if the price is valid
    pub fn amount(&self) -> Option<Decimal> {
        match self {
            Price::Valid(amount) => Some(*amount),
            Price::Invalid(_) => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Price::Valid(_))
    }

    /// Add a fixed surcharge to a valid price; invalid prices pass through.
    ///
    /// A sum outside the decimal range turns the price invalid.
    pub fn with_surcharge(self, surcharge: Decimal) -> Self {
        match self {
            Price::Valid(amount) => match amount.checked_add(surcharge) {
                Some(total) => Price::Valid(total),
                None => Price::Invalid(amount.to_string()),
            },
            invalid => invalid,
        }
    }

    /// Text written to the price column
    pub fn to_stored(&self) -> String {
        match self {
            Price::Valid(amount) => format!("{:.2}", amount.round_dp(2)),
            Price::Invalid(reason) if reason.is_empty() => "N/A".to_string(),
            Price::Invalid(reason) => reason.clone(),
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_stored())
    }
}

fn strip_currency(raw: &str) -> String {
    raw.replace('\u{a0}', " ")
        .replace("inkl. Versand", "")
        .replace("EUR", "")
        .replace('€', "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

fn is_thousands_grouped(s: &str) -> bool {
    let mut groups = s.split('.');
    let head = match groups.next() {
        Some(head) if !head.is_empty() && head.len() <= 3 => head,
        _ => return false,
    };
    let rest: Vec<&str> = groups.collect();
    !rest.is_empty()
        && head.chars().all(|c| c.is_ascii_digit())
        && rest
            .iter()
            .all(|g| g.len() == 3 && g.chars().all(|c| c.is_ascii_digit()))
}

/// Where an observation was collected
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    Ebay,
    Amazon,
    Idealo,
    OurCompany,
    Other(String),
}

impl Source {
    /// Convert from database string
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "ebay" => Source::Ebay,
            "amazon" => Source::Amazon,
            "idealo" => Source::Idealo,
            "our company" => Source::OurCompany,
            _ => Source::Other(s.trim().to_string()),
        }
    }

    /// Convert to database string
    pub fn as_str(&self) -> &str {
        match self {
            Source::Ebay => "eBay",
            Source::Amazon => "Amazon",
            Source::Idealo => "Idealo",
            Source::OurCompany => "Our company",
            Source::Other(name) => name,
        }
    }

    /// Delivery charge added to listed prices so they compare with
    /// shipping-inclusive offers
    pub fn delivery_surcharge(&self) -> Decimal {
        match self {
            Source::Ebay => Decimal::new(549, 2),
            Source::Amazon => Decimal::new(500, 2),
            _ => Decimal::ZERO,
        }
    }
}

impl From<String> for Source {
    fn from(s: String) -> Self {
        Self::from_str(&s)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One seller's price for one product on one day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub product_id: String,
    pub product_name: String,
    pub seller: String,
    pub price: Price,
    pub observed_date: NaiveDate,
    pub source: Source,
}

impl PriceObservation {
    pub fn new(
        product_id: impl Into<String>,
        product_name: impl Into<String>,
        seller: impl Into<String>,
        price: Price,
        observed_date: NaiveDate,
        source: Source,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            product_name: product_name.into(),
            seller: seller.into(),
            price,
            observed_date,
            source,
        }
    }
}

/// Row shape of `price_observations`
#[derive(Debug, Clone, FromRow)]
pub struct PriceRow {
    pub id: i64,
    pub product_id: String,
    pub product_name: String,
    pub seller: String,
    pub price: String,
    pub source: String,
    pub observed_date: NaiveDate,
}

impl From<PriceRow> for PriceObservation {
    fn from(row: PriceRow) -> Self {
        Self {
            product_id: row.product_id,
            product_name: row.product_name,
            seller: row.seller,
            price: Price::parse(&row.price),
            observed_date: row.observed_date,
            source: Source::from(row.source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical() {
        assert_eq!(Price::parse("689.99"), Price::Valid(Decimal::new(68999, 2)));
        assert_eq!(Price::parse(" 50 "), Price::Valid(Decimal::new(50, 0)));
        assert_eq!(Price::parse("0"), Price::Valid(Decimal::ZERO));
    }

    #[test]
    fn test_parse_markers_are_invalid() {
        assert_eq!(Price::parse("N/A"), Price::Invalid("N/A".to_string()));
        assert_eq!(
            Price::parse("Price not found"),
            Price::Invalid("Price not found".to_string())
        );
        assert!(!Price::parse("").is_valid());
        assert!(!Price::parse("-3.00").is_valid());
    }

    #[test]
    fn test_parse_localized() {
        assert_eq!(
            Price::parse_localized("1.234,56 €"),
            Price::Valid(Decimal::new(123456, 2))
        );
        assert_eq!(
            Price::parse_localized("EUR 99,00"),
            Price::Valid(Decimal::new(9900, 2))
        );
        assert_eq!(
            Price::parse_localized("689,99\u{a0}€ inkl. Versand"),
            Price::Valid(Decimal::new(68999, 2))
        );
        assert_eq!(
            Price::parse_localized("1.299"),
            Price::Valid(Decimal::new(1299, 0))
        );
        assert_eq!(
            Price::parse_localized("239.99"),
            Price::Valid(Decimal::new(23999, 2))
        );
        assert!(!Price::parse_localized("ab 12 Angebote").is_valid());
    }

    #[test]
    fn test_surcharge_and_stored_form() {
        let price = Price::parse("100").with_surcharge(Source::Ebay.delivery_surcharge());
        assert_eq!(price.to_stored(), "105.49");

        let invalid = Price::Invalid("N/A".to_string()).with_surcharge(Decimal::ONE);
        assert_eq!(invalid.to_stored(), "N/A");
        assert_eq!(Price::Invalid(String::new()).to_stored(), "N/A");
    }

    #[test]
    fn test_surcharge_overflow_is_invalid() {
        let huge = Price::parse_localized("79228162514264337593543950335");
        assert!(huge.is_valid());

        let priced = huge.with_surcharge(Source::Ebay.delivery_surcharge());
        assert_eq!(priced, Price::Invalid("79228162514264337593543950335".to_string()));
    }

    #[test]
    fn test_source_round_trip() {
        for source in [Source::Ebay, Source::Amazon, Source::Idealo, Source::OurCompany] {
            assert_eq!(Source::from_str(source.as_str()), source);
        }
        assert_eq!(Source::from_str("Kaufland"), Source::Other("Kaufland".to_string()));
        assert_eq!(Source::Idealo.delivery_surcharge(), Decimal::ZERO);
    }
}
