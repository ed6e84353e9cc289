use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{timed, EventOrder, EventQuery, EventStore};
use crate::{
    dto::UpdateEventDto,
    errors::StoreError,
    models::{Event, FeeTier, Location, NewEvent},
    PGPool,
};

const EVENT_COLUMNS: &str = "id, title, category, date, location_name, location_city, organizer, \
    contact, duration_minutes, description, image_url, is_free, fee_structure, status, created_at";

#[derive(Debug, FromRow)]
struct EventRow {
    id: Uuid,
    title: String,
    category: String,
    date: DateTime<Utc>,
    location_name: String,
    location_city: Option<String>,
    organizer: String,
    contact: String,
    duration_minutes: i32,
    description: String,
    image_url: String,
    is_free: bool,
    fee_structure: Json<Vec<FeeTier>>,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = StoreError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(Event {
            id: row.id,
            title: row.title,
            category: row.category.parse().map_err(StoreError::Corrupt)?,
            date: row.date,
            location: Location {
                name: row.location_name,
                city: row.location_city,
            },
            organizer: row.organizer,
            contact: row.contact,
            duration_minutes: u32::try_from(row.duration_minutes)
                .map_err(|_| StoreError::Corrupt(format!("negative duration on {}", row.id)))?,
            description: row.description,
            image_url: row.image_url,
            is_free: row.is_free,
            fee_structure: row.fee_structure.0,
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            created_at: row.created_at,
        })
    }
}

pub struct PgEventStore {
    pool: PGPool,
    timeout: Duration,
}

impl PgEventStore {
    pub fn new(pool: PGPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

fn push_conditions<'a>(query_builder: &mut QueryBuilder<'a, Postgres>, query: &'a EventQuery) {
    query_builder.push(" WHERE TRUE");
    if let Some(category) = query.category {
        query_builder.push(" AND category = ").push_bind(category.as_str());
    }
    if let Some(status) = query.status {
        query_builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(contact) = &query.contact {
        query_builder.push(" AND contact = ").push_bind(contact.as_str());
    }
    if let Some(id) = query.exclude_id {
        query_builder.push(" AND id <> ").push_bind(id);
    }
    if let Some(after) = query.starts_after {
        query_builder.push(" AND date >= ").push_bind(after);
    }
}

fn order_clause(order: EventOrder) -> &'static str {
    match order {
        EventOrder::Inserted => " ORDER BY seq ASC",
        EventOrder::NewestFirst => " ORDER BY created_at DESC, seq DESC",
        EventOrder::DateAscending => " ORDER BY date ASC, seq ASC",
        EventOrder::DateDescending => " ORDER BY date DESC, seq DESC",
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn create(&self, event: NewEvent) -> Result<Event, StoreError> {
        let event = event.into_event(Uuid::new_v4());
        let duration = i32::try_from(event.duration_minutes)
            .map_err(|_| StoreError::Corrupt("duration out of range".to_string()))?;
        let query = sqlx::query(
            "INSERT INTO events (id, title, category, date, location_name, location_city, organizer, \
            contact, duration_minutes, description, image_url, is_free, fee_structure, status, created_at) \
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(event.category.as_str())
        .bind(event.date)
        .bind(&event.location.name)
        .bind(&event.location.city)
        .bind(&event.organizer)
        .bind(&event.contact)
        .bind(duration)
        .bind(&event.description)
        .bind(&event.image_url)
        .bind(event.is_free)
        .bind(Json(&event.fee_structure))
        .bind(event.status.as_str())
        .bind(event.created_at)
        .execute(&self.pool);
        timed(self.timeout, query).await?;
        Ok(event)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1");
        let row = timed(
            self.timeout,
            sqlx::query_as::<_, EventRow>(&sql).bind(id).fetch_optional(&self.pool),
        )
        .await?;
        row.map(Event::try_from).transpose()
    }

    async fn update(&self, id: Uuid, fields: &UpdateEventDto) -> Result<u64, StoreError> {
        if fields.is_empty() {
            return Ok(0);
        }
        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE events SET ");
        let mut separated = query_builder.separated(", ");
        if let Some(status) = fields.status {
            separated.push("status = ").push_bind_unseparated(status.as_str());
        }
        if let Some(title) = &fields.title {
            separated.push("title = ").push_bind_unseparated(title);
        }
        if let Some(description) = &fields.description {
            separated.push("description = ").push_bind_unseparated(description);
        }
        if let Some(date) = fields.date {
            separated.push("date = ").push_bind_unseparated(date);
        }
        if let Some(location) = &fields.location {
            separated.push("location_name = ").push_bind_unseparated(&location.name);
            separated.push("location_city = ").push_bind_unseparated(&location.city);
        }
        if let Some(duration) = fields.duration_minutes {
            let duration = i32::try_from(duration)
                .map_err(|_| StoreError::Corrupt("duration out of range".to_string()))?;
            separated.push("duration_minutes = ").push_bind_unseparated(duration);
        }
        if let Some(image_url) = &fields.image_url {
            separated.push("image_url = ").push_bind_unseparated(image_url);
        }
        query_builder.push(" WHERE id = ").push_bind(id);

        let res = timed(self.timeout, query_builder.build().execute(&self.pool)).await?;
        Ok(res.rows_affected())
    }

    async fn delete(&self, id: Uuid) -> Result<u64, StoreError> {
        let res = timed(
            self.timeout,
            sqlx::query("DELETE FROM events WHERE id = $1").bind(id).execute(&self.pool),
        )
        .await?;
        Ok(res.rows_affected())
    }

    async fn count(&self, query: &EventQuery) -> Result<u64, StoreError> {
        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM events");
        push_conditions(&mut query_builder, query);
        let total: i64 = timed(
            self.timeout,
            query_builder.build_query_scalar().fetch_one(&self.pool),
        )
        .await?;
        Ok(total.max(0) as u64)
    }

    async fn find(&self, query: &EventQuery) -> Result<Vec<Event>, StoreError> {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {EVENT_COLUMNS} FROM events"));
        push_conditions(&mut query_builder, query);
        query_builder.push(order_clause(query.order));
        if let Some(limit) = query.limit {
            query_builder.push(" LIMIT ").push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        if let Some(offset) = query.offset {
            query_builder.push(" OFFSET ").push_bind(i64::try_from(offset).unwrap_or(i64::MAX));
        }
        let rows = timed(
            self.timeout,
            query_builder.build_query_as::<EventRow>().fetch_all(&self.pool),
        )
        .await?;
        rows.into_iter().map(Event::try_from).collect()
    }
}
