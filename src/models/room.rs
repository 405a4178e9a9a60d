//! Room listing model
//!
//! Prices (`deposit`, `monthly_fee`, `maintenance_cost`) are stored as the
//! integer amounts published by the listing source; every descriptive field
//! except `title` is optional because imported listings are often partial.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Room listing entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: i64,
    pub title: String,
    pub room_type: Option<String>,
    pub deposit: Option<i64>,
    pub monthly_fee: Option<i64>,
    pub maintenance_cost: Option<i64>,
    pub supply_area: Option<f64>,
    pub real_area: Option<f64>,
    pub floor: Option<String>,
    pub contract_type: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Identifier of the listing at its source site, used by the importer
    pub external_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Image attached to a room, shown in `(ordering, id)` order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomImage {
    pub id: i64,
    pub room_id: i64,
    pub image_url: String,
    pub ordering: Option<i64>,
}

/// Writable room fields, used for create and full replace
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomInput {
    pub title: String,
    #[serde(default)]
    pub room_type: Option<String>,
    #[serde(default)]
    pub deposit: Option<i64>,
    #[serde(default)]
    pub monthly_fee: Option<i64>,
    #[serde(default)]
    pub maintenance_cost: Option<i64>,
    #[serde(default)]
    pub supply_area: Option<f64>,
    #[serde(default)]
    pub real_area: Option<f64>,
    #[serde(default)]
    pub floor: Option<String>,
    #[serde(default)]
    pub contract_type: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub external_id: Option<i64>,
}

/// Partial room update; absent fields keep their stored value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoomPatch {
    pub title: Option<String>,
    pub room_type: Option<String>,
    pub deposit: Option<i64>,
    pub monthly_fee: Option<i64>,
    pub maintenance_cost: Option<i64>,
    pub supply_area: Option<f64>,
    pub real_area: Option<f64>,
    pub floor: Option<String>,
    pub contract_type: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub external_id: Option<i64>,
}

impl RoomInput {
    /// Start from the current state of a room
    pub fn from_room(room: &Room) -> Self {
        Self {
            title: room.title.clone(),
            room_type: room.room_type.clone(),
            deposit: room.deposit,
            monthly_fee: room.monthly_fee,
            maintenance_cost: room.maintenance_cost,
            supply_area: room.supply_area,
            real_area: room.real_area,
            floor: room.floor.clone(),
            contract_type: room.contract_type.clone(),
            address: room.address.clone(),
            latitude: room.latitude,
            longitude: room.longitude,
            external_id: room.external_id,
        }
    }

    /// Overlay the fields present in a patch
    pub fn apply(mut self, patch: RoomPatch) -> Self {
        if let Some(v) = patch.title {
            self.title = v;
        }
        if patch.room_type.is_some() {
            self.room_type = patch.room_type;
        }
        if patch.deposit.is_some() {
            self.deposit = patch.deposit;
        }
        if patch.monthly_fee.is_some() {
            self.monthly_fee = patch.monthly_fee;
        }
        if patch.maintenance_cost.is_some() {
            self.maintenance_cost = patch.maintenance_cost;
        }
        if patch.supply_area.is_some() {
            self.supply_area = patch.supply_area;
        }
        if patch.real_area.is_some() {
            self.real_area = patch.real_area;
        }
        if patch.floor.is_some() {
            self.floor = patch.floor;
        }
        if patch.contract_type.is_some() {
            self.contract_type = patch.contract_type;
        }
        if patch.address.is_some() {
            self.address = patch.address;
        }
        if patch.latitude.is_some() {
            self.latitude = patch.latitude;
        }
        if patch.longitude.is_some() {
            self.longitude = patch.longitude;
        }
        if patch.external_id.is_some() {
            self.external_id = patch.external_id;
        }
        self
    }
}

/// Names of the writable room fields, in column order
pub const ROOM_FIELDS: [&str; 13] = [
    "title",
    "room_type",
    "deposit",
    "monthly_fee",
    "maintenance_cost",
    "supply_area",
    "real_area",
    "floor",
    "contract_type",
    "address",
    "latitude",
    "longitude",
    "external_id",
];

/// One normalized listing from an import payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoomImportRecord {
    pub room: RoomInput,
    /// Image URLs in source order; blank entries are skipped on insert
    pub images: Vec<String>,
    /// Room fields the source item carried; only these overwrite an existing row
    pub fields: Vec<&'static str>,
}

impl RoomImportRecord {
    /// Record that carries every room field
    pub fn complete(room: RoomInput, images: Vec<String>) -> Self {
        Self {
            room,
            images,
            fields: ROOM_FIELDS.to_vec(),
        }
    }

    /// Overlay the carried fields onto an existing room's values.
    ///
    /// A carried field that is `None` clears the stored value.
    pub fn merge_onto(&self, mut base: RoomInput) -> RoomInput {
        let room = &self.room;
        for field in &self.fields {
            match *field {
                "title" => base.title = room.title.clone(),
                "room_type" => base.room_type = room.room_type.clone(),
                "deposit" => base.deposit = room.deposit,
                "monthly_fee" => base.monthly_fee = room.monthly_fee,
                "maintenance_cost" => base.maintenance_cost = room.maintenance_cost,
                "supply_area" => base.supply_area = room.supply_area,
                "real_area" => base.real_area = room.real_area,
                "floor" => base.floor = room.floor.clone(),
                "contract_type" => base.contract_type = room.contract_type.clone(),
                "address" => base.address = room.address.clone(),
                "latitude" => base.latitude = room.latitude,
                "longitude" => base.longitude = room.longitude,
                "external_id" => base.external_id = room.external_id,
                _ => {}
            }
        }
        base
    }
}

/// Result of an import batch
#[derive(Debug, Clone, Serialize)]
pub struct RoomImportSummary {
    pub created: usize,
    pub updated: usize,
    pub rooms: Vec<Room>,
}

/// Search filters for the room search endpoint
#[derive(Debug, Clone, Default)]
pub struct RoomSearch {
    /// Case-insensitive substring of title or address
    pub query: Option<String>,
    /// Exact room type
    pub room_type: Option<String>,
}

/// Count of rooms per room type; `room_type` is `None` for untyped rooms
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomTypeCount {
    pub room_type: Option<String>,
    pub count: i64,
}

/// Count of distinct addresses per region (first word of the address)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionCount {
    pub region: String,
    pub count: i64,
}

/// Compact room representation used by bookmark lists and comparisons
#[derive(Debug, Clone, Serialize)]
pub struct RoomCard {
    pub id: i64,
    pub title: String,
    pub address: Option<String>,
    pub deposit: Option<i64>,
    pub monthly_fee: Option<i64>,
    pub maintenance_cost: Option<i64>,
    pub price_label: Option<String>,
    pub maintenance_label: Option<String>,
    pub thumbnail_url: Option<String>,
}

impl RoomCard {
    pub fn new(room: &Room, thumbnail_url: Option<String>) -> Self {
        Self {
            id: room.id,
            title: room.title.clone(),
            address: room.address.clone(),
            deposit: room.deposit,
            monthly_fee: room.monthly_fee,
            maintenance_cost: room.maintenance_cost,
            price_label: price_label(room.deposit, room.monthly_fee),
            maintenance_label: room.maintenance_cost.map(format_thousands),
            thumbnail_url,
        }
    }
}

/// Format an integer with `,` thousands separators (`1234567` -> `1,234,567`)
pub fn format_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// `deposit/monthly` label, or whichever of the two is known
pub fn price_label(deposit: Option<i64>, monthly_fee: Option<i64>) -> Option<String> {
    match (deposit, monthly_fee) {
        (Some(dep), Some(mon)) => Some(format!(
            "{}/{}",
            format_thousands(dep),
            format_thousands(mon)
        )),
        (Some(v), None) | (None, Some(v)) => Some(format_thousands(v)),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_room() -> Room {
        let now = Utc::now();
        Room {
            id: 7,
            title: "역세권 원룸".to_string(),
            room_type: Some("원룸".to_string()),
            deposit: Some(10_000_000),
            monthly_fee: Some(500_000),
            maintenance_cost: Some(70_000),
            supply_area: Some(33.1),
            real_area: Some(23.5),
            floor: Some("3층".to_string()),
            contract_type: Some("월세".to_string()),
            address: Some("서울특별시 관악구 신림동".to_string()),
            latitude: Some(37.48),
            longitude: Some(126.93),
            external_id: Some(42),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1000), "1,000");
        assert_eq!(format_thousands(1234567), "1,234,567");
        assert_eq!(format_thousands(-45000), "-45,000");
    }

    #[test]
    fn test_price_label_variants() {
        assert_eq!(price_label(Some(1000), Some(50)), Some("1,000/50".to_string()));
        assert_eq!(price_label(Some(5000), None), Some("5,000".to_string()));
        assert_eq!(price_label(None, Some(450000)), Some("450,000".to_string()));
        assert_eq!(price_label(None, None), None);
    }

    #[test]
    fn test_room_card_labels() {
        let room = sample_room();
        let card = RoomCard::new(&room, Some("https://img/1.jpg".to_string()));

        assert_eq!(card.price_label.as_deref(), Some("10,000,000/500,000"));
        assert_eq!(card.maintenance_label.as_deref(), Some("70,000"));
        assert_eq!(card.thumbnail_url.as_deref(), Some("https://img/1.jpg"));
    }

    #[test]
    fn test_patch_keeps_absent_fields() {
        let room = sample_room();
        let patch = RoomPatch {
            monthly_fee: Some(550_000),
            floor: Some("4층".to_string()),
            ..RoomPatch::default()
        };

        let input = RoomInput::from_room(&room).apply(patch);

        assert_eq!(input.title, room.title);
        assert_eq!(input.monthly_fee, Some(550_000));
        assert_eq!(input.floor.as_deref(), Some("4층"));
        assert_eq!(input.deposit, room.deposit);
        assert_eq!(input.external_id, room.external_id);
    }

    #[test]
    fn test_import_merge_only_touches_carried_fields() {
        let room = sample_room();
        let record = RoomImportRecord {
            room: RoomInput {
                title: "새 제목".to_string(),
                monthly_fee: None,
                address: Some("무시됨".to_string()),
                ..RoomInput::default()
            },
            images: Vec::new(),
            fields: vec!["title", "monthly_fee"],
        };

        let merged = record.merge_onto(RoomInput::from_room(&room));

        assert_eq!(merged.title, "새 제목");
        assert_eq!(merged.monthly_fee, None);
        assert_eq!(merged.address, room.address);
        assert_eq!(merged.deposit, room.deposit);
        assert_eq!(merged.external_id, room.external_id);
    }

    #[test]
    fn test_complete_record_replaces_everything() {
        let room = sample_room();
        let record = RoomImportRecord::complete(
            RoomInput {
                title: "전체 교체".to_string(),
                ..RoomInput::default()
            },
            Vec::new(),
        );

        let merged = record.merge_onto(RoomInput::from_room(&room));

        assert_eq!(merged, record.room);
    }

    proptest! {
        #[test]
        fn format_thousands_strips_back_to_number(n in any::<i64>()) {
            let formatted = format_thousands(n);
            let parsed: i128 = formatted.replace(',', "").parse().unwrap();
            prop_assert_eq!(parsed, n as i128);
        }

        #[test]
        fn format_thousands_groups_of_three(n in 0i64..i64::MAX) {
            let formatted = format_thousands(n);
            let groups: Vec<&str> = formatted.split(',').collect();
            prop_assert!(groups[0].len() >= 1 && groups[0].len() <= 3);
            for group in &groups[1..] {
                prop_assert_eq!(group.len(), 3);
            }
        }
    }
}
