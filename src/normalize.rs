//! Pre-reconciliation normalization of the Mindat extract.
//!
//! Mindat encodes absence inconsistently: zero in numeric columns and the
//! empty string in text columns, with discovery years kept as free text.
//! The diff compares values strictly, so these coercions run once on the
//! source snapshot before any entity reconciles against it. Every function
//! returns a new snapshot; inputs are never mutated.

use reconcile_core::{Snapshot, Value};

/// Formula provenance ids in `mineral_formula.source_id`.
pub const FORMULA_SOURCE_MINDAT: i64 = 2;
pub const FORMULA_SOURCE_IMA: i64 = 3;

/// Context ids in `data_context_list`.
pub const DATA_CONTEXT_PHYSICAL: i64 = 1;
pub const DATA_CONTEXT_OPTICAL: i64 = 2;

/// Text columns where Mindat uses the empty string for absence.
const EMPTY_AS_NULL: &[&str] = &["description", "ima_symbol", "formula", "imaformula", "note"];

/// Normalize the raw minerals extract.
///
/// Numeric zeros become null across the whole snapshot (zero is Mindat's
/// not-measured marker, and a zero density or hardness is meaningless),
/// the listed text columns map empty strings to null, and
/// `discovery_year` coerces to an integer year or null.
pub fn prepare_minerals(minerals: &Snapshot) -> Snapshot {
    let empty_as_null: Vec<usize> = EMPTY_AS_NULL
        .iter()
        .filter_map(|c| minerals.column_index(c))
        .collect();
    let discovery_year = minerals.column_index("discovery_year");

    let rows = minerals
        .rows()
        .iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(i, value)| {
                    if Some(i) == discovery_year {
                        coerce_year(value)
                    } else if empty_as_null.contains(&i) {
                        match value {
                            Value::Text(s) if s.is_empty() => Value::Null,
                            other => zero_to_null(other),
                        }
                    } else {
                        zero_to_null(value)
                    }
                })
                .collect()
        })
        .collect();

    Snapshot::new(minerals.entity(), minerals.columns().to_vec(), rows)
}

fn zero_to_null(value: &Value) -> Value {
    match value {
        Value::Int(0) => Value::Null,
        Value::Float(f) if *f == 0.0 => Value::Null,
        Value::Decimal(d) if d.is_zero() => Value::Null,
        other => other.clone(),
    }
}

/// Coerce a free-text year to an integer year, null when unparseable.
fn coerce_year(value: &Value) -> Value {
    match value {
        Value::Int(0) => Value::Null,
        Value::Int(y) => Value::Int(*y),
        Value::Float(f) if *f == 0.0 => Value::Null,
        Value::Float(f) if f.is_finite() => Value::Int(*f as i64),
        Value::Decimal(d) if d.is_zero() => Value::Null,
        Value::Text(s) => match s.trim().parse::<i64>() {
            Ok(0) => Value::Null,
            Ok(y) => Value::Int(y),
            Err(_) => Value::Null,
        },
        _ => Value::Null,
    }
}

/// Build the formula snapshot reconciled against `mineral_formula`.
///
/// Every mineral contributes its display formula as source 2; minerals with
/// an IMA formula contribute a second row as source 3. Rows where both
/// formula and note are null carry nothing and are dropped.
pub fn prepare_minerals_formula(minerals: &Snapshot) -> Snapshot {
    let columns = vec![
        "name".to_string(),
        "formula".to_string(),
        "note".to_string(),
        "source_id".to_string(),
    ];

    let (Some(name), Some(formula), Some(imaformula), Some(note)) = (
        minerals.column_index("name"),
        minerals.column_index("formula"),
        minerals.column_index("imaformula"),
        minerals.column_index("note"),
    ) else {
        return Snapshot::new("minerals_formula", columns, Vec::new());
    };

    let mut rows = Vec::new();
    for row in minerals.rows() {
        if !row[formula].is_null() || !row[note].is_null() {
            rows.push(vec![
                row[name].clone(),
                row[formula].clone(),
                row[note].clone(),
                Value::Int(FORMULA_SOURCE_MINDAT),
            ]);
        }
    }
    // IMA rows appended after the display rows
    for row in minerals.rows() {
        if !row[imaformula].is_null() {
            rows.push(vec![
                row[name].clone(),
                row[imaformula].clone(),
                row[note].clone(),
                Value::Int(FORMULA_SOURCE_IMA),
            ]);
        }
    }

    Snapshot::new("minerals_formula", columns, rows)
}

/// Build the context snapshot reconciled against `mineral_context`.
///
/// The minerals extract flattens contextual properties into prefixed
/// columns (`physical_color`, `optical_sign`, …); each prefix group folds
/// back into one JSON blob per mineral. Minerals with no value in a group
/// contribute no row for that context.
pub fn prepare_mineral_contexts(minerals: &Snapshot) -> Snapshot {
    let columns = vec![
        "name".to_string(),
        "data".to_string(),
        "context_id".to_string(),
    ];

    let Some(name) = minerals.column_index("name") else {
        return Snapshot::new("minerals_context", columns, Vec::new());
    };

    let groups = [
        ("physical_", DATA_CONTEXT_PHYSICAL),
        ("optical_", DATA_CONTEXT_OPTICAL),
    ];

    let mut rows = Vec::new();
    for row in minerals.rows() {
        for (prefix, context_id) in groups {
            let mut data = serde_json::Map::new();
            for (i, column) in minerals.columns().iter().enumerate() {
                let Some(field) = column.strip_prefix(prefix) else {
                    continue;
                };
                if let Some(json) = value_to_json(&row[i]) {
                    data.insert(field.to_string(), json);
                }
            }
            if !data.is_empty() {
                rows.push(vec![
                    row[name].clone(),
                    Value::Json(serde_json::Value::Object(data)),
                    Value::Int(context_id),
                ]);
            }
        }
    }

    Snapshot::new("minerals_context", columns, rows)
}

/// JSON form of one non-null cell; decimals keep their textual precision.
fn value_to_json(value: &Value) -> Option<serde_json::Value> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(serde_json::Value::Bool(*b)),
        Value::Int(i) => Some(serde_json::Value::Number((*i).into())),
        Value::Float(f) => serde_json::Number::from_f64(*f).map(serde_json::Value::Number),
        Value::Decimal(d) => Some(serde_json::Value::String(d.to_string())),
        Value::Text(s) => Some(serde_json::Value::String(s.clone())),
        Value::Timestamp(ts) => Some(serde_json::Value::String(ts.to_rfc3339())),
        Value::Uuid(u) => Some(serde_json::Value::String(u.to_string())),
        Value::Json(j) => Some(j.clone()),
    }
}
