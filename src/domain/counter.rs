//! Named counters and the human-readable codes derived from them.
//!
//! A counter is a persisted integer keyed by name. Each kind of storefront
//! document owns one counter and one prefix:
//!
//! | Kind    | Counter   | Code      |
//! |---------|-----------|-----------|
//! | Quote   | `quote`   | `COT-<n>` |
//! | Order   | `order`   | `ORD-<n>` |

use crate::domain::errors::CodeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const MAX_COUNTER_NAME_LEN: usize = 64;

/// Validated counter name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CounterName(String);

impl CounterName {
    pub fn new(name: impl Into<String>) -> Result<Self, CodeError> {
        let name = name.into();
        let invalid = |reason: &str| CodeError::InvalidCounterName {
            name: name.clone(),
            reason: reason.to_string(),
        };

        if name.trim().is_empty() {
            return Err(invalid("must not be empty"));
        }
        if name.len() > MAX_COUNTER_NAME_LEN {
            return Err(invalid("must be at most 64 bytes"));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        {
            return Err(invalid("only ASCII letters, digits, '_', '-' and '.' are allowed"));
        }

        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CounterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CounterName {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for CounterName {
    type Error = CodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CounterName> for String {
    fn from(name: CounterName) -> Self {
        name.0
    }
}

/// Snapshot of a persisted counter row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counter {
    pub name: CounterName,
    /// Last number handed out
    pub value: u64,
}

/// Storefront document kinds that carry a sequential code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentKind {
    Quote,
    Order,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 2] = [DocumentKind::Quote, DocumentKind::Order];

    pub fn prefix(&self) -> &'static str {
        match self {
            DocumentKind::Quote => "COT",
            DocumentKind::Order => "ORD",
        }
    }

    pub fn counter_key(&self) -> &'static str {
        match self {
            DocumentKind::Quote => "quote",
            DocumentKind::Order => "order",
        }
    }

    pub fn counter_name(&self) -> CounterName {
        CounterName(self.counter_key().to_string())
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.prefix() == prefix)
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Quote => write!(f, "QUOTE"),
            DocumentKind::Order => write!(f, "ORDER"),
        }
    }
}

impl FromStr for DocumentKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "QUOTE" => Ok(DocumentKind::Quote),
            "ORDER" => Ok(DocumentKind::Order),
            _ => anyhow::bail!("Invalid document kind: {}. Must be 'quote' or 'order'", s),
        }
    }
}

/// A permanent document code such as `COT-12` or `ORD-3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentCode {
    pub kind: DocumentKind,
    pub number: u64,
}

impl DocumentCode {
    pub fn new(kind: DocumentKind, number: u64) -> Self {
        debug_assert!(number >= 1, "sequence numbers start at 1");
        Self { kind, number }
    }
}

impl fmt::Display for DocumentCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind.prefix(), self.number)
    }
}

impl FromStr for DocumentCode {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CodeError::InvalidCode {
            input: s.to_string(),
        };

        let (prefix, digits) = s.split_once('-').ok_or_else(invalid)?;
        let kind = DocumentKind::from_prefix(prefix).ok_or_else(invalid)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let number = digits.parse::<u64>().map_err(|_| invalid())?;
        if number == 0 {
            return Err(invalid());
        }

        Ok(Self { kind, number })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_name_rejects_empty_and_blank() {
        assert!(CounterName::new("").is_err());
        assert!(CounterName::new("   ").is_err());
    }

    #[test]
    fn test_counter_name_rejects_whitespace_and_symbols() {
        assert!(CounterName::new("order count").is_err());
        assert!(CounterName::new("order;drop").is_err());
        assert!(CounterName::new("x".repeat(65)).is_err());
    }

    #[test]
    fn test_counter_name_accepts_simple_names() {
        for name in ["quote", "order", "invoice-2024", "credit_note", "a.b"] {
            let parsed = CounterName::new(name).unwrap();
            assert_eq!(parsed.as_str(), name);
        }
    }

    #[test]
    fn test_kind_counter_names_are_valid() {
        for kind in DocumentKind::ALL {
            let name = kind.counter_name();
            assert_eq!(CounterName::new(name.as_str()).unwrap(), name);
        }
    }

    #[test]
    fn test_code_display() {
        assert_eq!(DocumentCode::new(DocumentKind::Quote, 1).to_string(), "COT-1");
        assert_eq!(DocumentCode::new(DocumentKind::Order, 38).to_string(), "ORD-38");
    }

    #[test]
    fn test_code_parse() {
        let code: DocumentCode = "ORD-120".parse().unwrap();
        assert_eq!(code.kind, DocumentKind::Order);
        assert_eq!(code.number, 120);

        let code: DocumentCode = "COT-7".parse().unwrap();
        assert_eq!(code, DocumentCode::new(DocumentKind::Quote, 7));
    }

    #[test]
    fn test_code_parse_rejects_garbage() {
        for input in ["", "ORD", "ORD-", "ORD-0", "ORD--1", "ORD-1a", "INV-3", "ord-3", "ORD-+4"] {
            assert!(
                input.parse::<DocumentCode>().is_err(),
                "{input:?} should not parse"
            );
        }
    }

    #[test]
    fn test_document_kind_from_str() {
        assert_eq!("quote".parse::<DocumentKind>().unwrap(), DocumentKind::Quote);
        assert_eq!("ORDER".parse::<DocumentKind>().unwrap(), DocumentKind::Order);
        assert!("invoice".parse::<DocumentKind>().is_err());
    }
}
