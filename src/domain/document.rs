use crate::domain::counter::{DocumentCode, DocumentKind};
use crate::domain::errors::CodeError;
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const MONEY_DP: u32 = 2;

/// One product line on a quote or order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub sku: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    /// Fraction, e.g. `0.21` for 21% VAT
    pub tax_rate: Decimal,
}

impl LineItem {
    pub fn new(sku: impl Into<String>, quantity: u32, unit_price: Decimal, tax_rate: Decimal) -> Self {
        Self {
            sku: sku.into(),
            quantity,
            unit_price,
            tax_rate,
        }
    }

    pub fn totals(&self) -> Totals {
        let subtotal = self.unit_price * Decimal::from(self.quantity);
        let tax = subtotal * self.tax_rate;
        Totals {
            subtotal,
            tax,
            total: subtotal + tax,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl Totals {
    /// Sums line totals and rounds the result to cents, midpoint away from zero.
    pub fn of(lines: &[LineItem]) -> Self {
        let sum = lines.iter().map(LineItem::totals).fold(Totals::default(), |acc, t| Totals {
            subtotal: acc.subtotal + t.subtotal,
            tax: acc.tax + t.tax,
            total: acc.total + t.total,
        });

        Totals {
            subtotal: round_money(sum.subtotal),
            tax: round_money(sum.tax),
            total: round_money(sum.total),
        }
    }
}

fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// A quote or order record.
///
/// `code` is `None` only for legacy rows imported before codes existed;
/// every document created through `DocumentService` carries one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub kind: DocumentKind,
    pub code: Option<DocumentCode>,
    pub customer: String,
    pub lines: Vec<LineItem>,
    pub totals: Totals,
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// Validates the lines and computes totals. The code is attached separately.
    pub fn draft(kind: DocumentKind, customer: impl Into<String>, lines: Vec<LineItem>) -> Result<Self, CodeError> {
        validate_lines(&lines)?;
        let customer = customer.into();
        if customer.trim().is_empty() {
            return Err(CodeError::InvalidDocument {
                reason: "customer is required".to_string(),
            });
        }

        Ok(Self {
            id: Uuid::new_v4(),
            kind,
            code: None,
            customer,
            totals: Totals::of(&lines),
            lines,
            created_at: Utc::now(),
        })
    }
}

fn validate_lines(lines: &[LineItem]) -> Result<(), CodeError> {
    if lines.is_empty() {
        return Err(CodeError::InvalidDocument {
            reason: "at least one line is required".to_string(),
        });
    }
    for line in lines {
        if line.quantity == 0 {
            return Err(CodeError::InvalidDocument {
                reason: format!("line {} has zero quantity", line.sku),
            });
        }
        if line.unit_price.is_sign_negative() || line.tax_rate.is_sign_negative() {
            return Err(CodeError::InvalidDocument {
                reason: format!("line {} has a negative price or tax rate", line.sku),
            });
        }
    }
    Ok(())
}
