//! Monetary amounts with an explicit currency.

use serde::{Deserialize, Serialize};

/// Supported settlement currencies, identified by ISO 4217 code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// United States dollar.
    #[default]
    Usd,

    /// Euro.
    Eur,

    /// Pound sterling.
    Gbp,
}

impl Currency {
    /// Returns the ISO 4217 currency code.
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
        }
    }

    /// Parses a currency from its ISO 4217 code.
    pub fn parse(code: &str) -> Option<Self> {
        match code.to_ascii_uppercase().as_str() {
            "USD" => Some(Currency::Usd),
            "EUR" => Some(Currency::Eur),
            "GBP" => Some(Currency::Gbp),
            _ => None,
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Money amount in integer cents to avoid floating point issues.
///
/// Arithmetic keeps the left-hand currency; callers are expected to check
/// [`Money::currency`] before mixing amounts. The aggregates do exactly that
/// and surface a currency mismatch as a domain error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Money {
    /// Amount in cents (e.g., 1000 = 10.00).
    cents: i64,

    /// The currency the amount is denominated in.
    currency: Currency,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64, currency: Currency) -> Self {
        Self { cents, currency }
    }

    /// Returns zero in the given currency.
    pub fn zero(currency: Currency) -> Self {
        Self { cents: 0, currency }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the currency.
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Returns the major-unit portion (whole number).
    pub fn units(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the minor-unit portion (remainder after major units).
    pub fn subunits(&self) -> i64 {
        self.cents.abs() % 100
    }

    /// Returns true if the amount is positive.
    pub fn is_positive(&self) -> bool {
        self.cents > 0
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Returns true if both amounts carry the same currency.
    pub fn same_currency(&self, other: &Money) -> bool {
        self.currency == other.currency
    }

    /// Adds another money amount.
    pub fn add(&self, other: Money) -> Money {
        Money {
            cents: self.cents + other.cents,
            currency: self.currency,
        }
    }

    /// Subtracts another money amount.
    pub fn subtract(&self, other: Money) -> Money {
        Money {
            cents: self.cents - other.cents,
            currency: self.currency,
        }
    }

    /// Multiplies by a quantity.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money {
            cents: self.cents * quantity as i64,
            currency: self.currency,
        }
    }

    /// Returns the given fraction of this amount, expressed in basis points.
    ///
    /// 100 basis points = 1%. Rounds toward zero.
    pub fn basis_points(&self, bp: u32) -> Money {
        Money {
            cents: self.cents * bp as i64 / 10_000,
            currency: self.currency,
        }
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cents < 0 {
            write!(
                f,
                "{} -{}.{:02}",
                self.currency.code(),
                self.units().abs(),
                self.subunits()
            )
        } else {
            write!(
                f,
                "{} {}.{:02}",
                self.currency.code(),
                self.units(),
                self.subunits()
            )
        }
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents + rhs.cents,
            currency: self.currency,
        }
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents - rhs.cents,
            currency: self.currency,
        }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.cents += rhs.cents;
    }
}

impl std::ops::SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.cents -= rhs.cents;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_codes() {
        assert_eq!(Currency::Usd.code(), "USD");
        assert_eq!(Currency::Eur.code(), "EUR");
        assert_eq!(Currency::Gbp.code(), "GBP");
    }

    #[test]
    fn test_currency_parse() {
        assert_eq!(Currency::parse("usd"), Some(Currency::Usd));
        assert_eq!(Currency::parse("EUR"), Some(Currency::Eur));
        assert_eq!(Currency::parse("JPY"), None);
    }

    #[test]
    fn test_money_from_cents() {
        let money = Money::from_cents(1234, Currency::Usd);
        assert_eq!(money.cents(), 1234);
        assert_eq!(money.units(), 12);
        assert_eq!(money.subunits(), 34);
        assert_eq!(money.currency(), Currency::Usd);
    }

    #[test]
    fn test_money_display() {
        assert_eq!(
            Money::from_cents(1234, Currency::Usd).to_string(),
            "USD 12.34"
        );
        assert_eq!(Money::from_cents(5, Currency::Eur).to_string(), "EUR 0.05");
        assert_eq!(
            Money::from_cents(-1234, Currency::Gbp).to_string(),
            "GBP -12.34"
        );
    }

    #[test]
    fn test_money_arithmetic() {
        let a = Money::from_cents(1000, Currency::Usd);
        let b = Money::from_cents(500, Currency::Usd);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!(a.multiply(3).cents(), 3000);
    }

    #[test]
    fn test_money_comparison() {
        assert!(Money::from_cents(100, Currency::Usd).is_positive());
        assert!(Money::zero(Currency::Usd).is_zero());
        assert!(Money::from_cents(-100, Currency::Usd).is_negative());
    }

    #[test]
    fn test_same_currency() {
        let usd = Money::from_cents(100, Currency::Usd);
        let eur = Money::from_cents(100, Currency::Eur);
        assert!(usd.same_currency(&usd));
        assert!(!usd.same_currency(&eur));
    }

    #[test]
    fn test_basis_points() {
        let amount = Money::from_cents(10_000, Currency::Usd);
        // 8.25% of $100.00
        assert_eq!(amount.basis_points(825).cents(), 825);
        assert_eq!(amount.basis_points(0).cents(), 0);
    }

    #[test]
    fn test_add_assign_and_sub_assign() {
        let mut money = Money::from_cents(100, Currency::Usd);
        money += Money::from_cents(50, Currency::Usd);
        assert_eq!(money.cents(), 150);
        money -= Money::from_cents(30, Currency::Usd);
        assert_eq!(money.cents(), 120);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let money = Money::from_cents(4599, Currency::Eur);
        let json = serde_json::to_string(&money).unwrap();
        assert!(json.contains("\"EUR\""));
        let deserialized: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(money, deserialized);
    }
}
