//! Room service
//!
//! Listing CRUD, search, aggregate statistics and the JSON import.

use crate::db::repositories::{ReviewRepository, RoomRepository};
use crate::models::{
    ListParams, PagedResult, RatingSummary, RegionCount, Room, RoomCard, RoomImage,
    RoomImportSummary, RoomInput, RoomPatch, RoomSearch, RoomTypeCount,
};
use crate::services::room_import::{self, ImportError};
use anyhow::Context;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum RoomServiceError {
    #[error("Room not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Room with its images and review summary
#[derive(Debug, Clone, Serialize)]
pub struct RoomDetail {
    #[serde(flatten)]
    pub room: Room,
    pub images: Vec<RoomImage>,
    pub rating_summary: RatingSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchOptions {
    pub room_types: Vec<String>,
    pub regions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomStats {
    pub total_rooms: i64,
    pub room_type_stats: Vec<RoomTypeCount>,
    pub region_stats: Vec<RegionCount>,
    pub search_options: SearchOptions,
}

pub struct RoomService {
    room_repo: Arc<dyn RoomRepository>,
    review_repo: Arc<dyn ReviewRepository>,
}

impl RoomService {
    pub fn new(room_repo: Arc<dyn RoomRepository>, review_repo: Arc<dyn ReviewRepository>) -> Self {
        Self {
            room_repo,
            review_repo,
        }
    }

    pub async fn list(&self, params: &ListParams) -> Result<PagedResult<Room>, RoomServiceError> {
        Ok(self.room_repo.list(params).await?)
    }

    pub async fn get(&self, id: i64) -> Result<Room, RoomServiceError> {
        self.room_repo
            .get_by_id(id)
            .await?
            .ok_or(RoomServiceError::NotFound)
    }

    pub async fn exists(&self, id: i64) -> Result<bool, RoomServiceError> {
        Ok(self.room_repo.get_by_id(id).await?.is_some())
    }

    pub async fn detail(&self, id: i64) -> Result<RoomDetail, RoomServiceError> {
        let room = self.get(id).await?;
        let images = self.room_repo.images(id).await?;
        let averages = self
            .review_repo
            .averages(id)
            .await
            .context("Failed to aggregate ratings")?;

        Ok(RoomDetail {
            room,
            images,
            rating_summary: averages.into(),
        })
    }

    pub async fn card(&self, id: i64) -> Result<RoomCard, RoomServiceError> {
        let room = self.get(id).await?;
        let thumbnail = self.room_repo.thumbnail(id).await?;
        Ok(RoomCard::new(&room, thumbnail))
    }

    pub async fn create(&self, input: RoomInput) -> Result<Room, RoomServiceError> {
        validate_room(&input)?;
        let room = self.room_repo.create(&input).await?;
        tracing::info!("Created room {}", room.id);
        Ok(room)
    }

    /// Full replace (PUT)
    pub async fn replace(&self, id: i64, input: RoomInput) -> Result<Room, RoomServiceError> {
        validate_room(&input)?;
        self.room_repo
            .update(id, &input)
            .await?
            .ok_or(RoomServiceError::NotFound)
    }

    /// Partial update (PATCH)
    pub async fn patch(&self, id: i64, patch: RoomPatch) -> Result<Room, RoomServiceError> {
        let current = self.get(id).await?;
        let input = RoomInput::from_room(&current).apply(patch);
        self.replace(id, input).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), RoomServiceError> {
        if !self.room_repo.delete(id).await? {
            return Err(RoomServiceError::NotFound);
        }
        tracing::info!("Deleted room {}", id);
        Ok(())
    }

    pub async fn search(&self, search: &RoomSearch, params: &ListParams) -> Result<PagedResult<Room>, RoomServiceError> {
        Ok(self.room_repo.search(search, params).await?)
    }

    pub async fn stats(&self) -> Result<RoomStats, RoomServiceError> {
        let total_rooms = self.room_repo.count().await?;
        let room_type_stats = self.room_repo.room_type_counts().await?;
        let addresses = self.room_repo.distinct_addresses().await?;
        let region_stats = region_counts(&addresses);

        let search_options = SearchOptions {
            room_types: room_type_stats
                .iter()
                .filter_map(|s| s.room_type.clone())
                .collect(),
            regions: region_stats.iter().map(|r| r.region.clone()).collect(),
        };

        Ok(RoomStats {
            total_rooms,
            room_type_stats,
            region_stats,
            search_options,
        })
    }

    /// Normalize and upsert an import payload in one transaction
    pub async fn import(&self, payload: &Value) -> Result<RoomImportSummary, RoomServiceError> {
        let records = room_import::parse_payload(payload)?;
        for (index, record) in records.iter().enumerate() {
            validate_room(&record.room).map_err(|e| match e {
                RoomServiceError::ValidationError(message) => {
                    RoomServiceError::Import(ImportError::InvalidRecord { index, message })
                }
                other => other,
            })?;
        }
        let summary = self.room_repo.import(&records).await?;
        tracing::info!(
            "Room import finished: created={}, updated={}",
            summary.created,
            summary.updated
        );
        Ok(summary)
    }
}

fn validate_room(input: &RoomInput) -> Result<(), RoomServiceError> {
    if input.title.trim().is_empty() {
        return Err(RoomServiceError::ValidationError("Title is required".to_string()));
    }
    if input.title.chars().count() > 255 {
        return Err(RoomServiceError::ValidationError(
            "Title must be 255 characters or fewer".to_string(),
        ));
    }
    for (name, value) in [
        ("deposit", input.deposit),
        ("monthly_fee", input.monthly_fee),
        ("maintenance_cost", input.maintenance_cost),
    ] {
        if value.is_some_and(|v| v < 0) {
            return Err(RoomServiceError::ValidationError(format!(
                "{} must not be negative",
                name
            )));
        }
    }
    Ok(())
}

/// Count addresses per region (first whitespace-separated token).
///
/// Ordered by count descending, then region name.
pub fn region_counts(addresses: &[String]) -> Vec<RegionCount> {
    let mut counts: HashMap<&str, i64> = HashMap::new();
    for address in addresses {
        if let Some(region) = address.split_whitespace().next() {
            *counts.entry(region).or_default() += 1;
        }
    }

    let mut regions: Vec<RegionCount> = counts
        .into_iter()
        .map(|(region, count)| RegionCount {
            region: region.to_string(),
            count,
        })
        .collect();
    regions.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.region.cmp(&b.region)));
    regions
}
