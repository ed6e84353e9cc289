use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{EventOrder, EventQuery, EventStore, UserStore};
use crate::{
    dto::{UpdateEventDto, UpdateUserDto},
    errors::StoreError,
    models::{Event, NewEvent, NewUser, User},
};

/// Process-local store backing the `memory` backend and the test suite.
/// Records are kept in insertion order.
#[derive(Default)]
pub struct MemoryStore {
    events: RwLock<Vec<Event>>,
    users: RwLock<Vec<User>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call fail with `StoreError::Unavailable` until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store switched off".to_string()))
        } else {
            Ok(())
        }
    }
}

fn sort_events(events: &mut [(usize, Event)], order: EventOrder) {
    match order {
        EventOrder::Inserted => events.sort_by_key(|(seq, _)| *seq),
        EventOrder::NewestFirst => {
            events.sort_by(|(sa, a), (sb, b)| b.created_at.cmp(&a.created_at).then(sb.cmp(sa)))
        }
        EventOrder::DateAscending => events.sort_by(|(sa, a), (sb, b)| a.date.cmp(&b.date).then(sa.cmp(sb))),
        EventOrder::DateDescending => events.sort_by(|(sa, a), (sb, b)| b.date.cmp(&a.date).then(sb.cmp(sa))),
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn create(&self, event: NewEvent) -> Result<Event, StoreError> {
        self.check()?;
        let event = event.into_event(Uuid::new_v4());
        self.events.write().await.push(event.clone());
        Ok(event)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        self.check()?;
        Ok(self.events.read().await.iter().find(|e| e.id == id).cloned())
    }

    async fn update(&self, id: Uuid, fields: &UpdateEventDto) -> Result<u64, StoreError> {
        self.check()?;
        let mut events = self.events.write().await;
        match events.iter_mut().find(|e| e.id == id) {
            Some(event) => {
                fields.apply(event);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<u64, StoreError> {
        self.check()?;
        let mut events = self.events.write().await;
        let before = events.len();
        events.retain(|e| e.id != id);
        Ok((before - events.len()) as u64)
    }

    async fn count(&self, query: &EventQuery) -> Result<u64, StoreError> {
        self.check()?;
        Ok(self.events.read().await.iter().filter(|e| query.matches(e)).count() as u64)
    }

    async fn find(&self, query: &EventQuery) -> Result<Vec<Event>, StoreError> {
        self.check()?;
        let mut matched: Vec<(usize, Event)> = self
            .events
            .read()
            .await
            .iter()
            .enumerate()
            .filter(|(_, e)| query.matches(e))
            .map(|(seq, e)| (seq, e.clone()))
            .collect();
        sort_events(&mut matched, query.order);
        let offset = usize::try_from(query.offset.unwrap_or(0)).unwrap_or(usize::MAX);
        let limit = query.limit.map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        Ok(matched.into_iter().skip(offset).take(limit).map(|(_, e)| e).collect())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        self.check()?;
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateKey);
        }
        let user = user.into_user(Uuid::new_v4());
        users.push(user.clone());
        Ok(user)
    }

    async fn get(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.check()?;
        Ok(self.users.read().await.iter().find(|u| u.id == id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.check()?;
        Ok(self.users.read().await.iter().find(|u| u.email == email).cloned())
    }

    async fn get_all(&self) -> Result<Vec<User>, StoreError> {
        self.check()?;
        Ok(self.users.read().await.clone())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.check()?;
        Ok(self.users.read().await.len() as u64)
    }

    async fn update(&self, id: Uuid, fields: &UpdateUserDto) -> Result<u64, StoreError> {
        self.check()?;
        let mut users = self.users.write().await;
        if let Some(email) = &fields.email {
            if users.iter().any(|u| u.id != id && &u.email == email) {
                return Err(StoreError::DuplicateKey);
            }
        }
        match users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                if let Some(name) = &fields.name {
                    user.name = name.clone();
                }
                if let Some(email) = &fields.email {
                    user.email = email.clone();
                }
                if let Some(role) = fields.role {
                    user.role = role;
                }
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<u64, StoreError> {
        self.check()?;
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|u| u.id != id);
        Ok((before - users.len()) as u64)
    }
}
