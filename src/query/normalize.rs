//! Reshapes engine-native rows into fixed canonical rows.
//!
//! Each canonical field lists the raw keys that may carry it, in priority
//! order. A dotted key (`stats.minutes_played`) addresses a nested
//! sub-object. The first present, non-null, non-empty value wins; a field
//! with no match is `null`. An integral floating-point value becomes an
//! integer, so `4.0` from one engine equals `4` from the other.

use serde_json::Value;

use crate::models::structs::{CanonicalRow, RawRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub synonyms: &'static [&'static str],
}

impl FieldSpec {
    /// Field read only from its own name.
    pub const fn plain(name: &'static str) -> Self {
        Self {
            name,
            synonyms: &[],
        }
    }

    /// Field resolved through `synonyms` in order. The canonical name is not
    /// implied; list it where it belongs in the priority order.
    pub const fn with_synonyms(name: &'static str, synonyms: &'static [&'static str]) -> Self {
        Self { name, synonyms }
    }

    /// Raw keys tried for this field, in priority order.
    pub fn keys(&self) -> &[&'static str] {
        if self.synonyms.is_empty() {
            std::slice::from_ref(&self.name)
        } else {
            self.synonyms
        }
    }

    pub fn resolve(&self, raw: &RawRow) -> Value {
        self.keys()
            .iter()
            .filter_map(|key| lookup(raw, key))
            .find(|v| is_present(v))
            .map(canonical_number)
            .unwrap_or(Value::Null)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct CanonicalShape {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
}

impl CanonicalShape {
    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }

    pub fn normalize_row(&self, raw: &RawRow) -> CanonicalRow {
        let mut row = CanonicalRow::with_capacity(self.fields.len());
        for field in self.fields {
            row.push(field.name, field.resolve(raw));
        }
        row
    }

    pub fn normalize(&self, rows: &[RawRow]) -> Vec<CanonicalRow> {
        rows.iter().map(|r| self.normalize_row(r)).collect()
    }
}

fn lookup<'a>(raw: &'a RawRow, key: &str) -> Option<&'a Value> {
    if let Some(v) = raw.get(key) {
        return Some(v);
    }
    let mut parts = key.split('.');
    let mut current = raw.get(parts.next()?)?;
    let mut nested = false;
    for part in parts {
        current = current.as_object()?.get(part)?;
        nested = true;
    }
    nested.then_some(current)
}

// Beyond 2^53 a double no longer holds every integer exactly.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

fn canonical_number(v: &Value) -> Value {
    if let Value::Number(n) = v
        && n.is_f64()
        && let Some(f) = n.as_f64()
        && f.fract() == 0.0
        && f.abs() <= MAX_EXACT_INTEGER
    {
        return Value::from(f as i64);
    }
    v.clone()
}

fn is_present(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}
