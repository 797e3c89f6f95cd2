//! Query filters over documents.

use std::cmp::Ordering;

use boxstore_proto::Value;

use super::document::{Document, ID_FIELD};

/// A filter selecting documents in a collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Every document.
    All,
    /// Documents whose field equals the value. A missing field equals `Null`.
    Eq { field: String, value: Value },
    /// Documents whose field lies in `[gte, lte]`. Missing bounds are open.
    /// Values of a different type than the bounds never match.
    Range {
        field: String,
        gte: Option<Value>,
        lte: Option<Value>,
    },
}

impl Filter {
    /// Equality on a field.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Equality on the primary key.
    pub fn by_id(id: i64) -> Self {
        Self::eq(ID_FIELD, id)
    }

    /// Inclusive range on a field.
    pub fn between(field: impl Into<String>, gte: impl Into<Value>, lte: impl Into<Value>) -> Self {
        Filter::Range {
            field: field.into(),
            gte: Some(gte.into()),
            lte: Some(lte.into()),
        }
    }

    /// The primary key this filter pins, if it is an equality on `_id`.
    pub fn target_id(&self) -> Option<i64> {
        match self {
            Filter::Eq { field, value } if field == ID_FIELD => value.as_i64(),
            _ => None,
        }
    }

    /// The field this filter inspects.
    pub fn field(&self) -> Option<&str> {
        match self {
            Filter::All => None,
            Filter::Eq { field, .. } | Filter::Range { field, .. } => Some(field.as_str()),
        }
    }

    /// Check whether a document matches.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq { field, value } => doc.get_or_null(field) == value,
            Filter::Range { field, gte, lte } => {
                let actual = doc.get_or_null(field);
                if actual.is_null() {
                    return false;
                }
                let above = match gte {
                    Some(lo) => matches!(
                        compare(actual, lo),
                        Some(Ordering::Greater | Ordering::Equal)
                    ),
                    None => true,
                };
                let below = match lte {
                    Some(hi) => matches!(
                        compare(actual, hi),
                        Some(Ordering::Less | Ordering::Equal)
                    ),
                    None => true,
                };
                above && below
            }
        }
    }
}

/// Compare two values of the same type. Values of different types are
/// incomparable.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Int64(x), Value::Int64(y)) => Some(x.cmp(y)),
        (Value::Timestamp(x), Value::Timestamp(y)) => Some(x.cmp(y)),
        (Value::Float64(x), Value::Float64(y)) => x.partial_cmp(y),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bytes(x), Value::Bytes(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
