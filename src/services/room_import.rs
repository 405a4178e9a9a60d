//! Normalization of scraped room listings
//!
//! Listings arrive as JSON objects keyed in Korean (`매물ID`, `제목`, ...).
//! Known keys are mapped onto [`RoomInput`] fields, unknown keys are dropped
//! and loosely typed values (`"1,200"`, `35`, `"35.5"`) are coerced.

use crate::models::{RoomImportRecord, RoomInput};
use serde_json::{Map, Value};

/// Source key to field name
pub const KOREAN_KEY_MAP: &[(&str, &str)] = &[
    ("매물ID", "external_id"),
    ("제목", "title"),
    ("방종류", "room_type"),
    ("월세", "monthly_fee"),
    ("보증금", "deposit"),
    ("관리비", "maintenance_cost"),
    ("공급면적", "supply_area"),
    ("전용면적", "real_area"),
    ("층수", "floor"),
    ("계약형태", "contract_type"),
    ("주소", "address"),
    ("위도", "latitude"),
    ("경도", "longitude"),
    ("이미지URL", "images"),
];

/// Keys under which an object payload may carry the listing array
const LIST_KEYS: &[&str] = &["items", "data", "results"];

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ImportError {
    #[error("JSON must be a list or contain an items/data/results list")]
    InvalidPayload,

    #[error("Record {index}: {message}")]
    InvalidRecord { index: usize, message: String },
}

/// Extract the listing array from a payload
pub fn extract_items(payload: &Value) -> Result<&Vec<Value>, ImportError> {
    match payload {
        Value::Array(items) => Ok(items),
        Value::Object(map) => LIST_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array))
            .ok_or(ImportError::InvalidPayload),
        _ => Err(ImportError::InvalidPayload),
    }
}

/// Normalize every listing of a payload, failing on the first bad record
pub fn parse_payload(payload: &Value) -> Result<Vec<RoomImportRecord>, ImportError> {
    extract_items(payload)?
        .iter()
        .enumerate()
        .map(|(index, item)| {
            normalize_item(item).map_err(|message| ImportError::InvalidRecord { index, message })
        })
        .collect()
}

fn normalize_item(item: &Value) -> Result<RoomImportRecord, String> {
    let obj = item.as_object().ok_or_else(|| "expected a JSON object".to_string())?;
    let fields = map_keys(obj);
    let get = |name: &str| fields.iter().find(|(k, _)| *k == name).map(|(_, v)| *v);

    let title = text_field(get("title"), "title")?
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| "title is required".to_string())?;

    let room = RoomInput {
        title,
        room_type: text_field(get("room_type"), "room_type")?,
        deposit: int_field(get("deposit"), "deposit")?,
        monthly_fee: int_field(get("monthly_fee"), "monthly_fee")?,
        maintenance_cost: int_field(get("maintenance_cost"), "maintenance_cost")?,
        supply_area: float_field(get("supply_area"), "supply_area")?,
        real_area: float_field(get("real_area"), "real_area")?,
        floor: text_field(get("floor"), "floor")?,
        contract_type: text_field(get("contract_type"), "contract_type")?,
        address: text_field(get("address"), "address")?,
        latitude: float_field(get("latitude"), "latitude")?,
        longitude: float_field(get("longitude"), "longitude")?,
        external_id: int_field(get("external_id"), "external_id")?,
    };

    let carried = fields
        .iter()
        .map(|(name, _)| *name)
        .filter(|name| *name != "images")
        .collect();

    Ok(RoomImportRecord {
        room,
        images: image_list(get("images"))?,
        fields: carried,
    })
}

fn map_keys(obj: &Map<String, Value>) -> Vec<(&'static str, &Value)> {
    obj.iter()
        .filter_map(|(key, value)| {
            KOREAN_KEY_MAP
                .iter()
                .find(|(source, _)| source == key)
                .map(|(_, field)| (*field, value))
        })
        .collect()
}

fn text_field(value: Option<&Value>, name: &str) -> Result<Option<String>, String> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string()).filter(|s| !s.is_empty())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(format!("{} must be text, got {}", name, other)),
    }
}

fn int_field(value: Option<&Value>, name: &str) -> Result<Option<i64>, String> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                Ok(Some(i))
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 => Ok(Some(f as i64)),
                    _ => Err(format!("{} must be an integer, got {}", name, n)),
                }
            }
        }
        Some(Value::String(s)) => {
            let cleaned = strip_number(s);
            if cleaned.is_empty() {
                return Ok(None);
            }
            cleaned
                .parse::<i64>()
                .map(Some)
                .map_err(|_| format!("{} must be an integer, got {:?}", name, s))
        }
        Some(other) => Err(format!("{} must be an integer, got {}", name, other)),
    }
}

fn float_field(value: Option<&Value>, name: &str) -> Result<Option<f64>, String> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| format!("{} must be a number, got {}", name, n)),
        Some(Value::String(s)) => {
            let cleaned = strip_number(s);
            if cleaned.is_empty() {
                return Ok(None);
            }
            cleaned
                .parse::<f64>()
                .map(Some)
                .map_err(|_| format!("{} must be a number, got {:?}", name, s))
        }
        Some(other) => Err(format!("{} must be a number, got {}", name, other)),
    }
}

/// Drop thousands separators and surrounding whitespace
fn strip_number(s: &str) -> String {
    s.trim().chars().filter(|c| *c != ',').collect()
}

fn image_list(value: Option<&Value>) -> Result<Vec<String>, String> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(url)) => Ok(vec![url.clone()]),
        Some(Value::Array(urls)) => urls
            .iter()
            .map(|url| match url {
                Value::String(s) => Ok(s.clone()),
                Value::Null => Ok(String::new()),
                other => Err(format!("images must be URL strings, got {}", other)),
            })
            .collect(),
        Some(other) => Err(format!("images must be a list, got {}", other)),
    }
}
