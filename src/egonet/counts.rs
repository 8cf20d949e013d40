use std::collections::BTreeMap;

use serde::Serialize;

/// Number of nodes in the egonet.
pub const WN: &str = "wn";
/// Distinct (neighbor, node) pairs with both ends inside.
pub const WEU: &str = "weu";
/// Links with both ends inside, parallel links counted.
pub const WET: &str = "wet";
/// Distinct pairs leaving the egonet.
pub const XESU: &str = "xesu";
/// Links leaving the egonet.
pub const XEST: &str = "xest";
/// Distinct pairs entering the egonet.
pub const XEDU: &str = "xedu";
/// Links entering the egonet.
pub const XEDT: &str = "xedt";
/// `xesu + xedu`.
pub const XEU: &str = "xeu";
/// `xest + xedt`.
pub const XET: &str = "xet";

const BASE_CODES: [&str; 9] = [WN, WEU, WET, XESU, XEST, XEDU, XEDT, XEU, XET];

/// Attribute sum over internal links, `wea-<attr>`.
pub fn within_attr(attr: &str) -> String {
    format!("wea-{attr}")
}

/// Attribute sum over leaving links, `xesa-<attr>`.
pub fn source_attr(attr: &str) -> String {
    format!("xesa-{attr}")
}

/// Attribute sum over entering links, `xeda-<attr>`.
pub fn dest_attr(attr: &str) -> String {
    format!("xeda-{attr}")
}

/// Attribute sum over all boundary links, `xea-<attr>`.
pub fn external_attr(attr: &str) -> String {
    format!("xea-{attr}")
}

/// Aggregate counts of one egonet, keyed by property code.
///
/// Every base code and every per-attribute code requested is present;
/// codes that were never incremented hold zero.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EgonetCounts {
    values: BTreeMap<String, f64>,
}

impl EgonetCounts {
    pub(crate) fn zeroed(attrs: &[&str]) -> Self {
        let mut values: BTreeMap<String, f64> =
            BASE_CODES.iter().map(|code| (code.to_string(), 0.0)).collect();
        for attr in attrs {
            for code in [
                within_attr(attr),
                source_attr(attr),
                dest_attr(attr),
                external_attr(attr),
            ] {
                values.insert(code, 0.0);
            }
        }
        Self { values }
    }

    pub(crate) fn set(&mut self, code: &str, value: f64) {
        self.values.insert(code.to_string(), value);
    }

    /// Derives the directionless sums from their directed parts.
    pub(crate) fn finish(&mut self, attrs: &[&str]) {
        self.set(XEU, self.get(XESU) + self.get(XEDU));
        self.set(XET, self.get(XEST) + self.get(XEDT));
        for attr in attrs {
            let sum = self.get(&source_attr(attr)) + self.get(&dest_attr(attr));
            self.set(&external_attr(attr), sum);
        }
    }

    /// Value for `code`, zero when absent.
    pub fn get(&self, code: &str) -> f64 {
        self.values.get(code).copied().unwrap_or(0.0)
    }

    /// Whether `code` was produced.
    pub fn contains(&self, code: &str) -> bool {
        self.values.contains_key(code)
    }

    /// Codes and values in code order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of codes.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no code was produced.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
