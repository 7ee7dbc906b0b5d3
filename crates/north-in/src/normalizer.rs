//! Input normalization
//!
//! Turns loosely-typed caller input into a [`ChangeRequest`]. Normalization
//! never fails: a missing or malformed field degrades to its documented
//! default.
//!
//! - field aliases (`env`/`environment`, `actionType`/`action`, ...)
//! - boolean and number coercion from strings
//! - three blast radius shapes unified on one 0..10 scale
//! - unrecognized fields preserved in `extra`

use crate::request::{
    AssetCriticality, BlastRadius, ChangeRequest, ChangeWindow, Environment, PrivilegeLevel,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

lazy_static! {
    /// Runs of whitespace
    static ref MULTI_SPACE: Regex = Regex::new(r"\s+").unwrap();
}

const ENVIRONMENT_KEYS: &[&str] = &["environment", "env"];
const ACTION_KEYS: &[&str] = &[
    "actionCategory",
    "action_category",
    "actionType",
    "action_type",
    "action",
];
const REVERSIBLE_KEYS: &[&str] = &["reversible"];
const IRREVERSIBLE_KEYS: &[&str] = &["irreversible"];
const BLAST_RADIUS_KEYS: &[&str] = &["blastRadius", "blast_radius"];
const GOVERNANCE_KEYS: &[&str] = &["governanceMissing", "governance_missing"];
const ASSET_CRITICALITY_KEYS: &[&str] = &["assetCriticality", "asset_criticality"];
const CHANGE_WINDOW_KEYS: &[&str] = &["changeWindow", "change_window"];
const PRIVILEGE_LEVEL_KEYS: &[&str] = &["privilegeLevel", "privilege_level"];

/// Placeholder control recorded when the caller only says "something is missing"
pub const UNSPECIFIED_GOVERNANCE: &str = "unspecified";

fn known_key(key: &str) -> bool {
    [
        ENVIRONMENT_KEYS,
        ACTION_KEYS,
        REVERSIBLE_KEYS,
        IRREVERSIBLE_KEYS,
        BLAST_RADIUS_KEYS,
        GOVERNANCE_KEYS,
        ASSET_CRITICALITY_KEYS,
        CHANGE_WINDOW_KEYS,
        PRIVILEGE_LEVEL_KEYS,
    ]
    .iter()
    .any(|keys| keys.contains(&key))
}

/// Normalize arbitrary JSON into a canonical change request
pub fn normalize(raw: &Value) -> ChangeRequest {
    match raw {
        Value::Object(map) => normalize_map(map),
        _ => ChangeRequest::default(),
    }
}

/// Normalize a key-value map into a canonical change request
pub fn normalize_map(map: &Map<String, Value>) -> ChangeRequest {
    let environment = first_present(map, ENVIRONMENT_KEYS)
        .and_then(Value::as_str)
        .map(Environment::parse)
        .unwrap_or_default();

    let action_category = first_present(map, ACTION_KEYS)
        .and_then(Value::as_str)
        .map(normalize_token)
        .unwrap_or_default();

    let extra: BTreeMap<String, Value> = map
        .iter()
        .filter(|(key, _)| !known_key(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    ChangeRequest {
        environment,
        action_category,
        reversible: reversible_from(map),
        blast_radius: first_present(map, BLAST_RADIUS_KEYS)
            .map(blast_radius_from)
            .unwrap_or_default(),
        governance_missing: first_present(map, GOVERNANCE_KEYS)
            .map(governance_from)
            .unwrap_or_default(),
        asset_criticality: first_present(map, ASSET_CRITICALITY_KEYS)
            .map(|v| v.as_str().map_or(AssetCriticality::Unknown, AssetCriticality::parse)),
        change_window: first_present(map, CHANGE_WINDOW_KEYS)
            .map(|v| v.as_str().map_or(ChangeWindow::Unknown, ChangeWindow::parse)),
        privilege_level: first_present(map, PRIVILEGE_LEVEL_KEYS)
            .map(|v| v.as_str().map_or(PrivilegeLevel::Unknown, PrivilegeLevel::parse)),
        extra,
    }
}

/// Trim, lower-case and collapse internal whitespace
pub fn normalize_token(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    MULTI_SPACE.replace_all(&lowered, " ").into_owned()
}

/// Native booleans pass through; "true"/"false" strings coerce
pub fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Finite numbers pass through; numeric strings parse
pub fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

/// First alias that is present and not null
fn first_present<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find(|value| !value.is_null())
}

/// `reversible` wins when present; `irreversible` is consulted only when it
/// is absent. Unknown reversibility counts as irreversible.
fn reversible_from(map: &Map<String, Value>) -> bool {
    if let Some(value) = first_present(map, REVERSIBLE_KEYS) {
        return coerce_bool(value).unwrap_or(false);
    }
    first_present(map, IRREVERSIBLE_KEYS)
        .and_then(coerce_bool)
        .map(|irreversible| !irreversible)
        .unwrap_or(false)
}

fn blast_radius_from(value: &Value) -> BlastRadius {
    if let Some(number) = coerce_number(value) {
        return BlastRadius::numeric(number);
    }

    match value.as_str().map(normalize_token) {
        Some(text) if text.is_empty() => BlastRadius::missing(),
        Some(text) => {
            BlastRadius::categorical(&text).unwrap_or_else(|| BlastRadius::descriptive(&text))
        }
        None => BlastRadius::missing(),
    }
}

fn governance_from(value: &Value) -> BTreeSet<String> {
    if let Some(flag) = coerce_bool(value) {
        return if flag {
            BTreeSet::from([UNSPECIFIED_GOVERNANCE.to_string()])
        } else {
            BTreeSet::new()
        };
    }

    let items: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Value::String(s) => s.split(',').map(str::to_string).collect(),
        _ => Vec::new(),
    };

    items
        .iter()
        .map(|item| normalize_token(item))
        .filter(|item| !item.is_empty())
        .collect()
}
