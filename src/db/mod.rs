pub mod event;
pub mod memory;
pub mod seed;
pub mod user;

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{info, warn};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use crate::{
    dto::{UpdateEventDto, UpdateUserDto},
    errors::StoreError,
    models::{Category, Event, EventStatus, NewEvent, NewUser, User},
    PGPool,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventOrder {
    /// insertion order
    #[default]
    Inserted,
    NewestFirst,
    DateAscending,
    DateDescending,
}

/// Conditions and paging for event reads. Unset fields do not constrain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventQuery {
    pub category: Option<Category>,
    pub status: Option<EventStatus>,
    pub contact: Option<String>,
    pub exclude_id: Option<Uuid>,
    pub starts_after: Option<DateTime<Utc>>,
    pub order: EventOrder,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

impl EventQuery {
    pub fn with_status(status: EventStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn matches(&self, event: &Event) -> bool {
        self.category.map_or(true, |c| event.category == c)
            && self.status.map_or(true, |s| event.status == s)
            && self.contact.as_ref().map_or(true, |c| &event.contact == c)
            && self.exclude_id.map_or(true, |id| event.id != id)
            && self.starts_after.map_or(true, |t| event.date >= t)
    }
}

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Assigns a fresh id, stores the event as `pending` and returns it.
    async fn create(&self, event: NewEvent) -> Result<Event, StoreError>;
    async fn get(&self, id: Uuid) -> Result<Option<Event>, StoreError>;
    /// Returns the number of records touched; a missing id touches none.
    async fn update(&self, id: Uuid, fields: &UpdateEventDto) -> Result<u64, StoreError>;
    /// Returns the number of records removed; deleting a missing id is not an error.
    async fn delete(&self, id: Uuid) -> Result<u64, StoreError>;
    async fn count(&self, query: &EventQuery) -> Result<u64, StoreError>;
    async fn find(&self, query: &EventQuery) -> Result<Vec<Event>, StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `StoreError::DuplicateKey` when the email is taken.
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;
    async fn get(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn get_all(&self) -> Result<Vec<User>, StoreError>;
    async fn count(&self) -> Result<u64, StoreError>;
    async fn update(&self, id: Uuid, fields: &UpdateUserDto) -> Result<u64, StoreError>;
    async fn delete(&self, id: Uuid) -> Result<u64, StoreError>;
}

/// Bounds a store call; a hung connection surfaces as `StoreError::Timeout`.
pub async fn timed<T, F>(limit: Duration, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(res) => res.map_err(StoreError::from),
        Err(_) => {
            warn!("store call exceeded {:?}", limit);
            Err(StoreError::Timeout)
        }
    }
}

pub async fn init_db_pool(db_url: &str, max_connections: u32) -> Result<PGPool, sqlx::Error> {
    let pool: PGPool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(db_url)
        .await?;
    info!("{}", "Connect with postgresql".to_string());
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("migrations applied");
    Ok(pool)
}
