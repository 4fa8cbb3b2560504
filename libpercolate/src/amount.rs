use crate::line::{LineParser, Rule};
use crate::{JournalError, Result};
use pest::iterators::Pair;
use pest::Parser;
use rust_decimal::prelude::Signed;
use rust_decimal::Decimal;

use std::fmt;
use std::str::FromStr;

/// A price annotation: always a plain, non-negative quantity of some currency.
#[derive(Clone, Debug, PartialEq)]
pub struct Price {
    pub quantity: Decimal,
    pub currency: String,
}

impl Price {
    pub fn new(quantity: Decimal, currency: &str) -> Self {
        Self {
            quantity: quantity.abs(),
            currency: currency.to_string(),
        }
    }

    fn magnitude(mut self) -> Self {
        self.quantity = self.quantity.abs();
        self
    }
}

/// A present amount: quantity and currency, optionally priced.
///
/// `total_price` and `per_unit_price` are set together; either can be derived from
/// the other and the quantity.
#[derive(Clone, Debug, PartialEq)]
pub struct Money {
    pub quantity: Decimal,
    pub currency: String,
    pub total_price: Option<Price>,
    pub per_unit_price: Option<Price>,
}

impl Money {
    pub fn new(quantity: Decimal, currency: &str) -> Self {
        Self {
            quantity,
            currency: currency.trim().to_string(),
            total_price: None,
            per_unit_price: None,
        }
    }

    /// `@ price`
    pub fn with_unit_price(mut self, price: &Money) -> Result<Self> {
        let unit = price.quantity.abs();
        let total = checked_mul(unit, self.quantity)?;
        self.total_price = Some(Price::new(total, &price.currency));
        self.per_unit_price = Some(Price::new(unit, &price.currency));
        Ok(self)
    }

    /// `@@ price`
    pub fn with_total_price(mut self, price: &Money) -> Result<Self> {
        let total = price.quantity.abs();
        // a zero quantity has no meaningful unit price, keep the total there
        let unit = if self.quantity.is_zero() {
            total
        } else {
            total
                .checked_div(self.quantity)
                .ok_or_else(|| JournalError::Overflow(format!("{} / {}", total, self.quantity)))?
        };
        self.total_price = Some(Price::new(total, &price.currency));
        self.per_unit_price = Some(Price::new(unit, &price.currency));
        Ok(self)
    }

    fn unit_price(&self) -> Option<Price> {
        self.per_unit_price.clone().or_else(|| {
            self.total_price.as_ref().map(|total| {
                Price::new(
                    total.quantity.checked_div(self.quantity).unwrap_or(total.quantity),
                    &total.currency,
                )
            })
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum Amount {
    /// The posting left its amount out.
    #[default]
    Missing,
    Present(Money),
}

impl Amount {
    pub fn new(quantity: Decimal, currency: &str) -> Self {
        Amount::Present(Money::new(quantity, currency))
    }

    /// Build an amount from the pieces of a single amount occurrence: currency
    /// written before the number, the number, and currency written after it.
    pub fn from_tokens(
        before: Option<&str>,
        numeral: Option<&str>,
        after: Option<&str>,
    ) -> Result<Amount> {
        let currency = before.or(after);
        let numeral = match (numeral, currency) {
            (None, None) => return Ok(Amount::Missing),
            (None, Some(currency)) => {
                return Err(JournalError::TypeMismatch {
                    expected: "numeral",
                    found: currency.to_string(),
                })
            }
            (Some(numeral), _) => numeral,
        };
        Ok(Amount::new(parse_numeral(numeral)?, currency.unwrap_or("")))
    }

    /// Parse an `amount` token, or an `amount_clause` with its trailing `@`/`@@` price.
    pub fn parse(token: Pair<Rule>) -> Result<Amount> {
        match token.as_rule() {
            Rule::amount => {
                let (mut before, mut numeral, mut after) = (None, None, None);
                for part in token.into_inner() {
                    match part.as_rule() {
                        Rule::currency_pre => before = Some(part.as_str()),
                        Rule::numeral => numeral = Some(part.as_str()),
                        Rule::currency_post => after = Some(part.as_str()),
                        _ => {}
                    }
                }
                Amount::from_tokens(before, numeral, after)
            }
            Rule::amount_clause => {
                let mut amount = Amount::Missing;
                for part in token.into_inner() {
                    match part.as_rule() {
                        Rule::amount => amount = Amount::parse(part)?,
                        Rule::price => amount = amount.priced(part)?,
                        _ => {}
                    }
                }
                Ok(amount)
            }
            _ => Err(JournalError::TypeMismatch {
                expected: "amount",
                found: token.as_str().to_string(),
            }),
        }
    }

    /// Apply a `price` token (`@ amount` or `@@ amount`) to this amount.
    pub(crate) fn priced(self, token: Pair<Rule>) -> Result<Amount> {
        let mut parts = token.into_inner();
        let op = parts.next().map(|p| p.as_str()).unwrap_or("@");
        let price = match parts.next() {
            Some(price) => Amount::parse(price)?,
            None => Amount::Missing,
        };

        Ok(match (self, price) {
            (Amount::Present(money), Amount::Present(price)) if op == "@@" => {
                Amount::Present(money.with_total_price(&price)?)
            }
            (Amount::Present(money), Amount::Present(price)) => {
                Amount::Present(money.with_unit_price(&price)?)
            }
            (amount, _) => amount,
        })
    }

    pub fn money(&self) -> Option<&Money> {
        match self {
            Amount::Missing => None,
            Amount::Present(money) => Some(money),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Amount::Missing)
    }

    pub fn quantity(&self) -> Decimal {
        self.money().map(|m| m.quantity).unwrap_or(Decimal::ZERO)
    }

    pub fn currency(&self) -> &str {
        self.money().map(|m| m.currency.as_str()).unwrap_or("")
    }

    /// Combine two amounts booked to the same account.
    ///
    /// A missing or zero amount on either side yields the other one unchanged.
    /// Otherwise the currencies must agree, and prices are carried along: the
    /// total price follows the summed quantity and the unit price is recomputed
    /// from it.
    pub fn try_add(&self, other: &Amount) -> Result<Amount> {
        let b = match other {
            Amount::Missing => return Ok(self.clone()),
            Amount::Present(b) => b,
        };
        let a = match self {
            Amount::Present(a) if !a.quantity.is_zero() => a,
            _ => return Ok(other.clone()),
        };
        if b.quantity.is_zero() {
            return Ok(self.clone());
        }
        if a.currency != b.currency {
            return Err(JournalError::CurrencyMismatch {
                left: a.currency.clone(),
                right: b.currency.clone(),
            });
        }

        let mut sum = a.clone();
        let quantity = checked_add(a.quantity, b.quantity)?;

        match (&a.total_price, &b.total_price) {
            (None, None) => {}
            (None, Some(b_total)) => {
                let unit = b
                    .unit_price()
                    .unwrap_or_else(|| Price::new(Decimal::ZERO, &b_total.currency));
                let total = checked_mul(unit.quantity, quantity)?;
                sum.total_price = Some(Price::new(total, &b_total.currency));
                sum.per_unit_price = Some(unit.magnitude());
            }
            (Some(a_total), None) => {
                let unit = a
                    .unit_price()
                    .unwrap_or_else(|| Price::new(Decimal::ZERO, &a_total.currency));
                let total = checked_mul(unit.quantity, quantity)?;
                sum.total_price = Some(Price::new(total, &a_total.currency));
                sum.per_unit_price = Some(unit.magnitude());
            }
            (Some(a_total), Some(b_total)) => {
                if a_total.currency != b_total.currency {
                    return Err(JournalError::CurrencyMismatch {
                        left: a_total.currency.clone(),
                        right: b_total.currency.clone(),
                    });
                }
                let total = checked_add(
                    a_total.quantity,
                    checked_mul(b.quantity.signum(), b_total.quantity)?,
                )?;
                let unit = match total.checked_div(quantity) {
                    Some(unit) => unit,
                    None => {
                        let a_unit = a.unit_price().map(|p| p.quantity).unwrap_or_default();
                        let b_unit = b.unit_price().map(|p| p.quantity).unwrap_or_default();
                        checked_add(a_unit, b_unit)? / Decimal::TWO
                    }
                };
                sum.total_price = Some(Price::new(total, &a_total.currency));
                sum.per_unit_price = Some(Price::new(unit, &a_total.currency));
            }
        }

        sum.quantity = quantity;
        Ok(Amount::Present(sum))
    }
}

/// Turn a numeral as written in a journal into a decimal.
///
/// When both `,` and `.` occur, whichever shows up later is the decimal point and
/// the other one is a thousands separator. A lone `,` is a decimal point.
pub fn parse_numeral(raw: &str) -> Result<Decimal> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let canonical = match (compact.find(','), compact.find('.')) {
        (Some(comma), Some(dot)) if dot > comma => compact.replace(',', ""),
        (Some(_), Some(_)) => compact.replace('.', "").replace(',', "."),
        (Some(_), None) => compact.replace(',', "."),
        _ => compact,
    };

    let (negative, digits) = match canonical.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, canonical.strip_prefix('+').unwrap_or(&canonical)),
    };
    let digits = digits.trim_end_matches('.');
    let digits = if digits.starts_with('.') {
        format!("0{}", digits)
    } else {
        digits.to_string()
    };

    let quantity =
        Decimal::from_str(&digits).map_err(|_| JournalError::InvalidNumber(raw.to_string()))?;
    Ok(if negative { -quantity } else { quantity })
}

/// Exact, trailing zeros dropped.
pub(crate) fn format_quantity(quantity: Decimal) -> String {
    let normalized = quantity.normalize();
    if normalized.is_zero() {
        return "0".to_string();
    }
    normalized.to_string()
}

fn checked_mul(left: Decimal, right: Decimal) -> Result<Decimal> {
    left.checked_mul(right)
        .ok_or_else(|| JournalError::Overflow(format!("{} * {}", left, right)))
}

fn checked_add(left: Decimal, right: Decimal) -> Result<Decimal> {
    left.checked_add(right)
        .ok_or_else(|| JournalError::Overflow(format!("{} + {}", left, right)))
}

impl FromStr for Amount {
    type Err = JournalError;

    fn from_str(s: &str) -> Result<Self> {
        let mut tokens =
            LineParser::parse(Rule::amount_clause, s).map_err(|_| JournalError::TypeMismatch {
                expected: "amount",
                found: s.to_string(),
            })?;
        match tokens.next() {
            Some(token) => Amount::parse(token),
            None => Ok(Amount::Missing),
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            format!("{} {}", format_quantity(self.quantity), self.currency).trim_end()
        )
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = format!("{} {}", format_quantity(self.quantity), self.currency);
        write!(f, "{}", base.trim_end())?;
        match (&self.total_price, &self.per_unit_price) {
            (Some(_), Some(unit)) if self.quantity.is_zero() => write!(f, " @ {}", unit),
            (Some(total), _) => write!(f, " @@ {}", total),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Amount::Missing => Ok(()),
            Amount::Present(money) => write!(f, "{}", money),
        }
    }
}
