use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::types::{Result, RoleError};

/// Attribute mapping attached to nodes and links.
pub type Attrs = BTreeMap<String, AttrValue>;

/// Tagged attribute value.
///
/// Numeric aggregation only accepts [`AttrValue::Num`]; any other variant
/// surfaces as [`RoleError::TypeMismatch`] instead of being coerced.
#[derive(Clone)]
pub enum AttrValue {
    /// Floating point number.
    Num(f64),
    /// Owned string.
    Text(String),
    /// Caller-owned payload compared by identity.
    Opaque(Arc<dyn Any + Send + Sync>),
}

impl AttrValue {
    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            AttrValue::Num(_) => "number",
            AttrValue::Text(_) => "text",
            AttrValue::Opaque(_) => "opaque",
        }
    }

    /// Returns the numeric payload, failing for non-numeric variants.
    pub fn as_number(&self, attr: &str) -> Result<f64> {
        match self {
            AttrValue::Num(v) => Ok(*v),
            other => Err(RoleError::TypeMismatch {
                attr: attr.to_string(),
                found: other.kind(),
            }),
        }
    }

    pub(crate) fn index_key(&self) -> IndexKey {
        match self {
            // -0.0 and 0.0 compare equal, so they must share a bucket.
            AttrValue::Num(v) if *v == 0.0 => IndexKey::Num(0f64.to_bits()),
            AttrValue::Num(v) if v.is_nan() => IndexKey::Num(f64::NAN.to_bits()),
            AttrValue::Num(v) => IndexKey::Num(v.to_bits()),
            AttrValue::Text(s) => IndexKey::Text(s.clone()),
            AttrValue::Opaque(p) => IndexKey::Opaque(Arc::as_ptr(p) as *const () as usize),
        }
    }
}

/// Reads a numeric attribute, treating an absent entry as zero.
pub fn number_or_zero(attrs: &Attrs, name: &str) -> Result<f64> {
    match attrs.get(name) {
        Some(value) => value.as_number(name),
        None => Ok(0.0),
    }
}

/// Every NaN equals every other NaN here, so scans, indices and edge
/// filters all match NaN attributes the same way.
impl PartialEq for AttrValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AttrValue::Num(a), AttrValue::Num(b)) => a == b || (a.is_nan() && b.is_nan()),
            (AttrValue::Text(a), AttrValue::Text(b)) => a == b,
            (AttrValue::Opaque(a), AttrValue::Opaque(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Num(v) => f.debug_tuple("Num").field(v).finish(),
            AttrValue::Text(s) => f.debug_tuple("Text").field(s).finish(),
            AttrValue::Opaque(p) => write!(f, "Opaque({:p})", Arc::as_ptr(p)),
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Num(v) => write!(f, "{v}"),
            AttrValue::Text(s) => write!(f, "{s}"),
            AttrValue::Opaque(_) => write!(f, "opaque"),
        }
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Num(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Num(value as f64)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

/// Hashable projection of an [`AttrValue`] used as an index bucket key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum IndexKey {
    Num(u64),
    Text(String),
    Opaque(usize),
}
