use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct RangeFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl RangeFilter {
    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    fn set(&mut self, bound: RangeBound, value: Option<f64>) {
        match bound {
            RangeBound::Min => self.min = value,
            RangeBound::Max => self.max = value,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RangeBound {
    Min,
    Max,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum FilterValue {
    Single(String),
    Multi(Vec<String>),
    Range(RangeFilter),
}

/// Discrete filter-change event coming from the sidebar.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FilterChange {
    Single {
        key: String,
        value: String,
    },
    Multi {
        key: String,
        value: String,
        included: bool,
    },
    Range {
        key: String,
        bound: RangeBound,
        raw: String,
    },
    ClearAll,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum TransportValue {
    Text(String),
    Range(RangeFilter),
}

/// Active filter selections of a listing view.
///
/// Every key present carries at least one real constraint: an emptied list,
/// a range with no bounds or a deselected single value removes the key.
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
#[serde(transparent)]
pub struct ActiveFilters(BTreeMap<String, FilterValue>);

impl ActiveFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FilterValue)> {
        self.0.iter()
    }

    /// Whether `value` is currently selected for `key`.
    pub fn is_selected(&self, key: &str, value: &str) -> bool {
        match self.0.get(key) {
            Some(FilterValue::Single(v)) => v == value,
            Some(FilterValue::Multi(values)) => values.iter().any(|v| v == value),
            _ => false,
        }
    }

    pub fn range(&self, key: &str) -> RangeFilter {
        match self.0.get(key) {
            Some(FilterValue::Range(r)) => *r,
            _ => RangeFilter::default(),
        }
    }

    /// Selects `value`, or deselects it when it is already the current value.
    pub fn set_single(&mut self, key: &str, value: &str) -> bool {
        let value = value.trim();
        let before = self.0.get(key).cloned();
        match &before {
            _ if value.is_empty() => {
                self.0.remove(key);
            }
            Some(FilterValue::Single(current)) if current == value => {
                self.0.remove(key);
            }
            _ => {
                self.0
                    .insert(key.to_string(), FilterValue::Single(value.to_string()));
            }
        }
        before.as_ref() != self.0.get(key)
    }

    pub fn set_multi(&mut self, key: &str, value: &str, included: bool) -> bool {
        let value = value.trim();
        let before = self.0.get(key).cloned();
        let mut values = match &before {
            Some(FilterValue::Multi(values)) => values.clone(),
            _ => vec![],
        };
        if included {
            if !value.is_empty() && !values.iter().any(|v| v == value) {
                values.push(value.to_string());
            }
        } else {
            values.retain(|v| v != value);
        }
        if values.is_empty() {
            self.0.remove(key);
        } else {
            self.0.insert(key.to_string(), FilterValue::Multi(values));
        }
        before.as_ref() != self.0.get(key)
    }

    /// Sets one bound of a numeric range. Unparsable input clears the bound.
    pub fn set_range(&mut self, key: &str, bound: RangeBound, raw: &str) -> bool {
        let before = self.0.get(key).cloned();
        let mut range = match &before {
            Some(FilterValue::Range(range)) => *range,
            _ => RangeFilter::default(),
        };
        range.set(bound, parse_bound(raw));
        if range.is_empty() {
            self.0.remove(key);
        } else {
            self.0.insert(key.to_string(), FilterValue::Range(range));
        }
        before.as_ref() != self.0.get(key)
    }

    pub fn clear_all(&mut self) -> bool {
        let changed = !self.0.is_empty();
        self.0.clear();
        changed
    }

    pub fn apply(&mut self, change: &FilterChange) -> bool {
        match change {
            FilterChange::Single { key, value } => self.set_single(key, value),
            FilterChange::Multi {
                key,
                value,
                included,
            } => self.set_multi(key, value, *included),
            FilterChange::Range { key, bound, raw } => self.set_range(key, *bound, raw),
            FilterChange::ClearAll => self.clear_all(),
        }
    }

    /// Lists become comma-joined strings, singles pass through, ranges stay structured.
    pub fn serialize_for_transport(&self) -> BTreeMap<String, TransportValue> {
        self.0
            .iter()
            .map(|(k, v)| {
                let v = match v {
                    FilterValue::Single(s) => TransportValue::Text(s.clone()),
                    FilterValue::Multi(values) => TransportValue::Text(values.iter().join(",")),
                    FilterValue::Range(r) => TransportValue::Range(*r),
                };
                (k.clone(), v)
            })
            .collect()
    }
}

fn parse_bound(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    raw.replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Query entries for the search endpoint: `attrs[key]=a,b` and
/// `attrs[key][min]=..` / `attrs[key][max]=..`.
pub fn to_query_pairs(attrs: &BTreeMap<String, TransportValue>) -> Vec<(String, String)> {
    attrs
        .iter()
        .flat_map(|(key, value)| match value {
            TransportValue::Text(text) => vec![(format!("attrs[{key}]"), text.clone())],
            TransportValue::Range(range) => [
                range.min.map(|v| (format!("attrs[{key}][min]"), v.to_string())),
                range.max.map(|v| (format!("attrs[{key}][max]"), v.to_string())),
            ]
            .into_iter()
            .flatten()
            .collect(),
        })
        .collect()
}
