//! Room repository
//!
//! Rooms, their images and the aggregate queries behind the stats endpoint.
//! The import batch runs in a single transaction.

use super::like_pattern;
use crate::models::{
    ListParams, PagedResult, Room, RoomImage, RoomImportRecord, RoomImportSummary, RoomInput,
    RoomSearch, RoomTypeCount,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Row, Sqlite, SqliteConnection, SqlitePool};
use std::sync::Arc;

pub(crate) const ROOM_COLUMNS: &str = "r.id, r.title, r.room_type, r.deposit, r.monthly_fee, \
    r.maintenance_cost, r.supply_area, r.real_area, r.floor, r.contract_type, r.address, \
    r.latitude, r.longitude, r.external_id, r.created_at, r.updated_at";

/// First image of a room, usable as a correlated subquery on alias `r`
pub(crate) const THUMBNAIL_SUBQUERY: &str = "(SELECT i.image_url FROM room_images i \
    WHERE i.room_id = r.id ORDER BY i.ordering, i.id LIMIT 1)";

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// Newest rooms first
    async fn list(&self, params: &ListParams) -> Result<PagedResult<Room>>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Room>>;

    /// Images of a room in display order
    async fn images(&self, room_id: i64) -> Result<Vec<RoomImage>>;

    async fn thumbnail(&self, room_id: i64) -> Result<Option<String>>;

    async fn create(&self, input: &RoomInput) -> Result<Room>;

    /// Replace every writable field; `None` when the room does not exist
    async fn update(&self, id: i64, input: &RoomInput) -> Result<Option<Room>>;

    async fn delete(&self, id: i64) -> Result<bool>;

    /// Filtered search ordered by `-id`
    async fn search(&self, search: &RoomSearch, params: &ListParams) -> Result<PagedResult<Room>>;

    async fn count(&self) -> Result<i64>;

    /// Room counts grouped by type, most common first
    async fn room_type_counts(&self) -> Result<Vec<RoomTypeCount>>;

    /// Every distinct non-empty address
    async fn distinct_addresses(&self) -> Result<Vec<String>>;

    /// Upsert a batch of imported listings atomically
    async fn import(&self, records: &[RoomImportRecord]) -> Result<RoomImportSummary>;
}

pub struct SqlxRoomRepository {
    pool: SqlitePool,
}

impl SqlxRoomRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: SqlitePool) -> Arc<dyn RoomRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl RoomRepository for SqlxRoomRepository {
    async fn list(&self, params: &ListParams) -> Result<PagedResult<Room>> {
        list_rooms(&self.pool, &RoomSearch::default(), params).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Room>> {
        let sql = format!("SELECT {} FROM rooms r WHERE r.id = ?", ROOM_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get room by ID")?;

        Ok(row.as_ref().map(row_to_room))
    }

    async fn images(&self, room_id: i64) -> Result<Vec<RoomImage>> {
        let rows = sqlx::query(
            "SELECT id, room_id, image_url, ordering FROM room_images WHERE room_id = ? ORDER BY ordering, id",
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list room images")?;

        Ok(rows
            .iter()
            .map(|row| RoomImage {
                id: row.get("id"),
                room_id: row.get("room_id"),
                image_url: row.get("image_url"),
                ordering: row.get("ordering"),
            })
            .collect())
    }

    async fn thumbnail(&self, room_id: i64) -> Result<Option<String>> {
        let row = sqlx::query(
            "SELECT image_url FROM room_images WHERE room_id = ? ORDER BY ordering, id LIMIT 1",
        )
        .bind(room_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get room thumbnail")?;

        Ok(row.map(|row| row.get("image_url")))
    }

    async fn create(&self, input: &RoomInput) -> Result<Room> {
        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        let id = insert_room(&mut conn, input, Utc::now()).await?;
        drop(conn);

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Room {} missing after insert", id))
    }

    async fn update(&self, id: i64, input: &RoomInput) -> Result<Option<Room>> {
        let mut conn = self.pool.acquire().await.context("Failed to acquire connection")?;
        let affected = update_room(&mut conn, id, input, Utc::now()).await?;
        drop(conn);

        if affected == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM rooms WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete room")?;
        Ok(result.rows_affected() > 0)
    }

    async fn search(&self, search: &RoomSearch, params: &ListParams) -> Result<PagedResult<Room>> {
        list_rooms(&self.pool, search, params).await
    }

    async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM rooms")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count rooms")?;
        Ok(row.get("count"))
    }

    async fn room_type_counts(&self) -> Result<Vec<RoomTypeCount>> {
        let rows = sqlx::query(
            r#"
            SELECT room_type, COUNT(*) AS count
            FROM rooms
            GROUP BY room_type
            ORDER BY count DESC, room_type ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to count rooms by type")?;

        Ok(rows
            .iter()
            .map(|row| RoomTypeCount {
                room_type: row.get("room_type"),
                count: row.get("count"),
            })
            .collect())
    }

    async fn distinct_addresses(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT DISTINCT address FROM rooms WHERE address IS NOT NULL AND trim(address) != ''",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list room addresses")?;

        Ok(rows.iter().map(|row| row.get("address")).collect())
    }

    async fn import(&self, records: &[RoomImportRecord]) -> Result<RoomImportSummary> {
        import_rooms(&self.pool, records).await
    }
}

async fn list_rooms(pool: &SqlitePool, search: &RoomSearch, params: &ListParams) -> Result<PagedResult<Room>> {
    let mut conditions: Vec<&str> = Vec::new();
    let pattern = search.query.as_deref().map(like_pattern);
    if pattern.is_some() {
        conditions.push("(r.title LIKE ? ESCAPE '\\' OR r.address LIKE ? ESCAPE '\\')");
    }
    if search.room_type.is_some() {
        conditions.push("r.room_type = ?");
    }
    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let count_sql = format!("SELECT COUNT(*) AS count FROM rooms r {}", where_clause);
    let mut count_query = sqlx::query(&count_sql);
    if let Some(p) = &pattern {
        count_query = count_query.bind(p).bind(p);
    }
    if let Some(t) = &search.room_type {
        count_query = count_query.bind(t);
    }
    let total: i64 = count_query
        .fetch_one(pool)
        .await
        .context("Failed to count rooms")?
        .get("count");

    let sql = format!(
        "SELECT {} FROM rooms r {} ORDER BY r.id DESC LIMIT ? OFFSET ?",
        ROOM_COLUMNS, where_clause
    );
    let mut query = sqlx::query(&sql);
    if let Some(p) = &pattern {
        query = query.bind(p).bind(p);
    }
    if let Some(t) = &search.room_type {
        query = query.bind(t);
    }
    let rows = query
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list rooms")?;

    let rooms = rows.iter().map(row_to_room).collect();
    Ok(PagedResult::new(rooms, total, params))
}

fn bind_room_fields<'q>(query: SqliteQuery<'q>, input: &'q RoomInput) -> SqliteQuery<'q> {
    query
        .bind(input.title.as_str())
        .bind(input.room_type.as_deref())
        .bind(input.deposit)
        .bind(input.monthly_fee)
        .bind(input.maintenance_cost)
        .bind(input.supply_area)
        .bind(input.real_area)
        .bind(input.floor.as_deref())
        .bind(input.contract_type.as_deref())
        .bind(input.address.as_deref())
        .bind(input.latitude)
        .bind(input.longitude)
        .bind(input.external_id)
}

async fn insert_room(conn: &mut SqliteConnection, input: &RoomInput, now: DateTime<Utc>) -> Result<i64> {
    let query = sqlx::query(
        r#"
        INSERT INTO rooms (title, room_type, deposit, monthly_fee, maintenance_cost, supply_area,
            real_area, floor, contract_type, address, latitude, longitude, external_id,
            created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    );
    let result = bind_room_fields(query, input)
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await
        .context("Failed to create room")?;

    Ok(result.last_insert_rowid())
}

async fn update_room(conn: &mut SqliteConnection, id: i64, input: &RoomInput, now: DateTime<Utc>) -> Result<u64> {
    let query = sqlx::query(
        r#"
        UPDATE rooms SET title = ?, room_type = ?, deposit = ?, monthly_fee = ?,
            maintenance_cost = ?, supply_area = ?, real_area = ?, floor = ?, contract_type = ?,
            address = ?, latitude = ?, longitude = ?, external_id = ?, updated_at = ?
        WHERE id = ?
        "#,
    );
    let result = bind_room_fields(query, input)
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("Failed to update room {}", id))?;

    Ok(result.rows_affected())
}

async fn import_rooms(pool: &SqlitePool, records: &[RoomImportRecord]) -> Result<RoomImportSummary> {
    let mut tx = pool.begin().await.context("Failed to begin import transaction")?;
    let now = Utc::now();
    let mut created = 0;
    let mut updated = 0;
    let mut touched = Vec::with_capacity(records.len());

    for record in records {
        let existing: Option<i64> = match record.room.external_id {
            Some(external_id) => sqlx::query("SELECT id FROM rooms WHERE external_id = ?")
                .bind(external_id)
                .fetch_optional(&mut *tx)
                .await
                .context("Failed to look up room by external id")?
                .map(|row| row.get("id")),
            None => None,
        };

        let room_id = match existing {
            Some(id) => {
                let sql = format!("SELECT {} FROM rooms r WHERE r.id = ?", ROOM_COLUMNS);
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_one(&mut *tx)
                    .await
                    .with_context(|| format!("Failed to load room {} for import", id))?;
                let merged = record.merge_onto(RoomInput::from_room(&row_to_room(&row)));
                update_room(&mut *tx, id, &merged, now).await?;
                updated += 1;
                id
            }
            None => {
                created += 1;
                insert_room(&mut *tx, &record.room, now).await?
            }
        };

        sqlx::query("DELETE FROM room_images WHERE room_id = ?")
            .bind(room_id)
            .execute(&mut *tx)
            .await
            .context("Failed to clear room images")?;

        for (index, url) in record.images.iter().enumerate() {
            let url = url.trim();
            if url.is_empty() {
                continue;
            }
            sqlx::query("INSERT INTO room_images (room_id, image_url, ordering) VALUES (?, ?, ?)")
                .bind(room_id)
                .bind(url)
                .bind(index as i64)
                .execute(&mut *tx)
                .await
                .context("Failed to insert room image")?;
        }

        touched.push(room_id);
    }

    let sql = format!("SELECT {} FROM rooms r WHERE r.id = ?", ROOM_COLUMNS);
    let mut rooms = Vec::with_capacity(touched.len());
    for id in touched {
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .context("Failed to reload imported room")?;
        rooms.push(row_to_room(&row));
    }

    tx.commit().await.context("Failed to commit room import")?;

    Ok(RoomImportSummary {
        created,
        updated,
        rooms,
    })
}

pub(crate) fn row_to_room(row: &SqliteRow) -> Room {
    Room {
        id: row.get("id"),
        title: row.get("title"),
        room_type: row.get("room_type"),
        deposit: row.get("deposit"),
        monthly_fee: row.get("monthly_fee"),
        maintenance_cost: row.get("maintenance_cost"),
        supply_area: row.get("supply_area"),
        real_area: row.get("real_area"),
        floor: row.get("floor"),
        contract_type: row.get("contract_type"),
        address: row.get("address"),
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
        external_id: row.get("external_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
