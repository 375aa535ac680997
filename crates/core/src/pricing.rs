//! Localized currency formatting for minor-unit amounts.
//!
//! Output matches what the browser's `Intl.NumberFormat` produces in
//! `style: "currency"` mode for the supported locales, including the
//! no-break spaces it inserts.

use std::{fmt, str::FromStr};

/// No-break space, used between symbol and number
const NBSP: char = '\u{a0}';
/// Narrow no-break space, the French group separator
const NNBSP: char = '\u{202f}';

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PricingError {
    #[error("Unsupported locale '{0}' (supported: pt-BR, en-US, de-DE, fr-FR, es-ES)")]
    UnsupportedLocale(String),
    #[error("Invalid currency code '{0}': expected three ASCII letters")]
    InvalidCurrency(String),
}

/// Locales the storefront can format prices for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locale {
    PtBr,
    EnUs,
    DeDe,
    FrFr,
    EsEs,
}

struct LocaleRules {
    group: char,
    decimal: char,
    symbol_first: bool,
    /// Smallest integer-part length that gets grouped
    min_grouping_digits: usize,
}

impl Locale {
    fn rules(self) -> LocaleRules {
        match self {
            Locale::PtBr => LocaleRules {
                group: '.',
                decimal: ',',
                symbol_first: true,
                min_grouping_digits: 4,
            },
            Locale::EnUs => LocaleRules {
                group: ',',
                decimal: '.',
                symbol_first: true,
                min_grouping_digits: 4,
            },
            Locale::DeDe => LocaleRules {
                group: '.',
                decimal: ',',
                symbol_first: false,
                min_grouping_digits: 4,
            },
            Locale::FrFr => LocaleRules {
                group: NNBSP,
                decimal: ',',
                symbol_first: false,
                min_grouping_digits: 4,
            },
            Locale::EsEs => LocaleRules {
                group: '.',
                decimal: ',',
                symbol_first: false,
                min_grouping_digits: 5,
            },
        }
    }

    fn symbol(self, currency: &str) -> String {
        match (self, currency) {
            (Locale::PtBr, "USD") => "US$".to_string(),
            (_, "BRL") => "R$".to_string(),
            (_, "USD") => "$".to_string(),
            (_, "EUR") => "€".to_string(),
            (_, "GBP") => "£".to_string(),
            (_, other) => other.to_string(),
        }
    }
}

impl FromStr for Locale {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.replace('_', "-").to_ascii_lowercase().as_str() {
            "pt-br" => Ok(Locale::PtBr),
            "en-us" => Ok(Locale::EnUs),
            "de-de" => Ok(Locale::DeDe),
            "fr-fr" => Ok(Locale::FrFr),
            "es-es" => Ok(Locale::EsEs),
            _ => Err(PricingError::UnsupportedLocale(s.to_string())),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Locale::PtBr => "pt-BR",
            Locale::EnUs => "en-US",
            Locale::DeDe => "de-DE",
            Locale::FrFr => "fr-FR",
            Locale::EsEs => "es-ES",
        };
        f.write_str(tag)
    }
}

/// A locale and currency pairing applied to every price on the site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyFormat {
    locale: Locale,
    currency: String,
}

impl Default for CurrencyFormat {
    fn default() -> Self {
        Self {
            locale: Locale::PtBr,
            currency: "BRL".to_string(),
        }
    }
}

impl CurrencyFormat {
    pub fn new(locale: &str, currency: &str) -> Result<Self, PricingError> {
        let locale = locale.parse()?;
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(PricingError::InvalidCurrency(currency.to_string()));
        }
        Ok(Self {
            locale,
            currency: currency.to_ascii_uppercase(),
        })
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Upper-case ISO code
    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Format `unit_amount / 100` with two fraction digits
    pub fn format(&self, unit_amount: i64) -> String {
        let rules = self.locale.rules();
        let symbol = self.locale.symbol(&self.currency);

        let abs = unit_amount.unsigned_abs();
        let whole = (abs / 100).to_string();
        let cents = abs % 100;

        let mut number = group_digits(&whole, rules.group, rules.min_grouping_digits);
        number.push(rules.decimal);
        number.push_str(&format!("{:02}", cents));

        let sign = if unit_amount < 0 { "-" } else { "" };

        if rules.symbol_first {
            // en-US only spaces bare ISO codes
            let spaced = match self.locale {
                Locale::EnUs => symbol.chars().all(|c| c.is_ascii_alphabetic()),
                _ => true,
            };
            if spaced {
                format!("{sign}{symbol}{NBSP}{number}")
            } else {
                format!("{sign}{symbol}{number}")
            }
        } else {
            format!("{sign}{number}{NBSP}{symbol}")
        }
    }
}

/// Shorthand for `format.format(unit_amount)`
pub fn format_price(unit_amount: i64, format: &CurrencyFormat) -> String {
    format.format(unit_amount)
}

fn group_digits(digits: &str, separator: char, min_grouping_digits: usize) -> String {
    if digits.len() < min_grouping_digits {
        return digits.to_string();
    }
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(separator);
        }
        grouped.push(digit);
    }
    grouped
}
