use std::{collections::HashMap, str::FromStr};

use chrono::{DateTime, Utc};
use futures::try_join;
use log::{error, info};
use uuid::Uuid;

use crate::{
   db::{EventOrder, EventQuery, EventStore},
   dto::{EventStats, NewEventForm, Page, UpdateEventDto, UserEventStats},
   errors::{AppError, Outcome, StoreError},
   models::{Category, Event, EventStatus},
   service::validation,
};

pub const SIMILAR_EVENTS_LIMIT: u64 = 3;
pub const ADMIN_PAGE_SIZE: u64 = 10;
pub const LISTING_PAGE_SIZE: u64 = 12;
pub const UPCOMING_LIMIT: u64 = 8;
pub const RECENT_LIMIT: u64 = 5;
pub const FAVORITE_CATEGORIES: usize = 3;

/// Rejects malformed identifiers before any store call.
pub fn parse_id(raw: &str) -> Result<Uuid, AppError> {
   Uuid::parse_str(raw.trim()).map_err(|_| AppError::InvalidId)
}

/// `page` query value; anything below 1 or unparsable reads as 1.
pub fn parse_page(raw: Option<&str>) -> u64 {
   raw.and_then(|p| p.trim().parse::<u64>().ok())
      .filter(|p| *p >= 1)
      .unwrap_or(1)
}

fn total_pages(total: u64, page_size: u64) -> u64 {
   total.div_ceil(page_size)
}

/// Validates a submission and stores it as `pending`.
pub async fn submit(form: &NewEventForm, store: &dyn EventStore) -> Result<Event, AppError> {
   let new_event = validation::admit_event(form, Utc::now()).map_err(AppError::Validation)?;
   let event = store.create(new_event).await?;
   info!("event {} submitted by {} ({})", event.id, event.organizer, event.category);
   Ok(event)
}

pub async fn get_by_id(id: &str, store: &dyn EventStore) -> Result<Event, AppError> {
   let id = parse_id(id)?;
   store.get(id).await?.ok_or(AppError::NotFound)
}

/// Detail lookup for public pages; anything not approved is not found.
pub async fn get_public(id: &str, store: &dyn EventStore) -> Result<Event, AppError> {
   let event = get_by_id(id, store).await?;
   if event.status == EventStatus::Approved {
      Ok(event)
   } else {
      Err(AppError::NotFound)
   }
}

/// Every record, any status, for the moderation table.
pub async fn list_all(page: u64, store: &dyn EventStore) -> Result<Page<Event>, AppError> {
   let all = EventQuery::default();
   let total = store.count(&all).await?;
   let items = store
      .find(&EventQuery {
         offset: Some(page.saturating_sub(1).saturating_mul(ADMIN_PAGE_SIZE)),
         limit: Some(ADMIN_PAGE_SIZE),
         ..all
      })
      .await?;
   Ok(Page {
      items,
      page,
      total_pages: total_pages(total, ADMIN_PAGE_SIZE),
      total,
   })
}

/// Approved events in `category`, insertion order, optionally excluding one id
/// and capped at `limit`.
pub async fn list_by_category(
   category: Category,
   exclude_id: Option<Uuid>,
   limit: Option<u64>,
   store: &dyn EventStore,
) -> Result<Vec<Event>, AppError> {
   let query = EventQuery {
      category: Some(category),
      status: Some(EventStatus::Approved),
      exclude_id,
      limit,
      ..Default::default()
   };
   Ok(store.find(&query).await?)
}

pub async fn similar_events(event: &Event, store: &dyn EventStore) -> Result<Vec<Event>, AppError> {
   list_by_category(event.category, Some(event.id), Some(SIMILAR_EVENTS_LIMIT), store).await
}

pub async fn list_approved(store: &dyn EventStore) -> Result<Vec<Event>, AppError> {
   Ok(store.find(&EventQuery::with_status(EventStatus::Approved)).await?)
}

/// Every event whose contact is `contact_email`, any status, newest first.
pub async fn list_by_organizer(contact_email: &str, store: &dyn EventStore) -> Result<Vec<Event>, AppError> {
   Ok(organizer_events(contact_email, store).await?)
}

pub async fn upcoming(now: DateTime<Utc>, store: &dyn EventStore) -> Result<Vec<Event>, AppError> {
   let query = EventQuery {
      status: Some(EventStatus::Approved),
      starts_after: Some(now),
      order: EventOrder::DateAscending,
      limit: Some(UPCOMING_LIMIT),
      ..Default::default()
   };
   Ok(store.find(&query).await?)
}

pub async fn recent(store: &dyn EventStore) -> Result<Vec<Event>, AppError> {
   let query = EventQuery {
      order: EventOrder::DateDescending,
      limit: Some(RECENT_LIMIT),
      ..Default::default()
   };
   Ok(store.find(&query).await?)
}

fn degrade<T: Default>(what: &str, res: Result<T, StoreError>) -> Outcome<T> {
   match res {
      Ok(value) => Outcome::Complete(value),
      Err(err) => {
         error!("{what} unavailable, serving zero values: {err}");
         Outcome::Degraded(T::default(), err.to_string())
      }
   }
}

/// Counts per status, each from its own count call.
pub async fn get_stats(store: &dyn EventStore) -> Outcome<EventStats> {
   let all = EventQuery::default();
   let approved = EventQuery::with_status(EventStatus::Approved);
   let pending = EventQuery::with_status(EventStatus::Pending);
   let rejected = EventQuery::with_status(EventStatus::Rejected);
   let res = try_join!(
      store.count(&all),
      store.count(&approved),
      store.count(&pending),
      store.count(&rejected)
   )
   .map(|(total, approved, pending, rejected)| EventStats {
      total,
      approved,
      pending,
      rejected,
   });
   degrade("event stats", res)
}

pub fn summarize_organizer(events: &[Event]) -> UserEventStats {
   let with_status = |s: EventStatus| events.iter().filter(|e| e.status == s).count() as u64;
   UserEventStats {
      events_created: events.len() as u64,
      approved_events: with_status(EventStatus::Approved),
      pending_events: with_status(EventStatus::Pending),
      rejected_events: with_status(EventStatus::Rejected),
   }
}

/// Top categories by frequency; ties keep the order in which categories were first seen.
pub fn favorite_categories(events: &[Event]) -> Vec<Category> {
   let mut counts: Vec<(Category, usize)> = Vec::new();
   let mut index: HashMap<Category, usize> = HashMap::new();
   for event in events {
      match index.get(&event.category) {
         Some(&i) => counts[i].1 += 1,
         None => {
            index.insert(event.category, counts.len());
            counts.push((event.category, 1));
         }
      }
   }
   counts.sort_by(|a, b| b.1.cmp(&a.1));
   counts.into_iter().take(FAVORITE_CATEGORIES).map(|(c, _)| c).collect()
}

async fn organizer_events(organizer_email: &str, store: &dyn EventStore) -> Result<Vec<Event>, StoreError> {
   store
      .find(&EventQuery {
         contact: Some(organizer_email.to_string()),
         order: EventOrder::NewestFirst,
         ..Default::default()
      })
      .await
}

pub async fn get_user_stats(organizer_email: &str, store: &dyn EventStore) -> Outcome<UserEventStats> {
   let res = organizer_events(organizer_email, store)
      .await
      .map(|events| summarize_organizer(&events));
   degrade("organizer stats", res)
}

pub async fn get_favorite_categories(organizer_email: &str, store: &dyn EventStore) -> Outcome<Vec<Category>> {
   let res = organizer_events(organizer_email, store)
      .await
      .map(|events| favorite_categories(&events));
   degrade("favorite categories", res)
}

/// Approved listings per category, for the report page.
pub async fn approved_per_category(store: &dyn EventStore) -> Outcome<Vec<(Category, u64)>> {
   let mut counts = Vec::with_capacity(Category::ALL.len());
   for category in Category::ALL {
      let query = EventQuery {
         category: Some(category),
         status: Some(EventStatus::Approved),
         ..Default::default()
      };
      match store.count(&query).await {
         Ok(n) => counts.push((category, n)),
         Err(err) => return degrade("category counts", Err(err)),
      }
   }
   Outcome::Complete(counts)
}

/// Admin edit of an event's descriptive fields.
pub async fn update(id: &str, fields: UpdateEventDto, store: &dyn EventStore) -> Result<u64, AppError> {
   let id = parse_id(id)?;
   if let Some(image_url) = &fields.image_url {
      if reqwest::Url::parse(image_url).is_err() {
         return Err(AppError::Validation(vec![validation::IMAGE_URL_ERROR.to_string()]));
      }
   }
   if fields.duration_minutes == Some(0) {
      return Err(AppError::Validation(vec![
         "durationMinutes must be a positive whole number".to_string(),
      ]));
   }
   let fields = UpdateEventDto { status: None, ..fields };
   Ok(store.update(id, &fields).await?)
}

pub mod moderation {
   use super::*;

   #[derive(Debug, Clone, Copy, PartialEq, Eq)]
   pub enum ModerationAction {
      Approve,
      Reject,
      Delete,
   }

   impl FromStr for ModerationAction {
      type Err = AppError;

      fn from_str(s: &str) -> Result<Self, Self::Err> {
         match s {
            "approve" => Ok(ModerationAction::Approve),
            "reject" => Ok(ModerationAction::Reject),
            "delete" => Ok(ModerationAction::Delete),
            _ => Err(AppError::BadClientData),
         }
      }
   }

   /// Splits an `<action>-<id>` token. The id itself contains dashes, so only the
   /// first one separates.
   pub fn parse_token<A: FromStr<Err = AppError>>(token: &str) -> Result<(A, Uuid), AppError> {
      let (action, id) = token.split_once('-').ok_or(AppError::BadClientData)?;
      Ok((action.parse()?, parse_id(id)?))
   }

   /// Every transition is a single write, valid from any state and idempotent.
   /// Concurrent actions on the same id resolve last-write-wins.
   pub async fn apply(action: ModerationAction, id: Uuid, store: &dyn EventStore) -> Result<(), AppError> {
      let touched = match action {
         ModerationAction::Approve => store.update(id, &UpdateEventDto::status(EventStatus::Approved)).await?,
         ModerationAction::Reject => store.update(id, &UpdateEventDto::status(EventStatus::Rejected)).await?,
         ModerationAction::Delete => store.delete(id).await?,
      };
      if touched == 0 {
         info!("moderation {:?} on {} matched no event", action, id);
      } else {
         info!("moderation {:?} applied to event {}", action, id);
      }
      Ok(())
   }

   pub async fn approve(id: Uuid, store: &dyn EventStore) -> Result<(), AppError> {
      apply(ModerationAction::Approve, id, store).await
   }

   pub async fn reject(id: Uuid, store: &dyn EventStore) -> Result<(), AppError> {
      apply(ModerationAction::Reject, id, store).await
   }

   pub async fn delete(id: Uuid, store: &dyn EventStore) -> Result<(), AppError> {
      apply(ModerationAction::Delete, id, store).await
   }
}

#[cfg(test)]
mod tests {
   use super::moderation::{self, ModerationAction};
   use super::*;
   use crate::db::memory::MemoryStore;
   use crate::service::testing::{approved_event, event_form, new_event, new_event_for};
   use chrono::Duration;

   #[actix_rt::test]
   async fn reject_then_approve() {
      let store = MemoryStore::new();
      let event = store.create(new_event("Jazz Night", Category::ConcertsNightlife)).await.unwrap();
      assert_eq!(event.status, EventStatus::Pending);

      moderation::reject(event.id, &store).await.unwrap();
      let id = event.id.to_string();
      assert_eq!(get_by_id(&id, &store).await.unwrap().status, EventStatus::Rejected);

      moderation::approve(event.id, &store).await.unwrap();
      assert_eq!(get_by_id(&id, &store).await.unwrap().status, EventStatus::Approved);
   }

   #[actix_rt::test]
   async fn approving_twice_equals_approving_once() {
      let store = MemoryStore::new();
      let event = store.create(new_event("Derby", Category::Sports)).await.unwrap();
      moderation::approve(event.id, &store).await.unwrap();
      let once = store.get(event.id).await.unwrap();
      moderation::approve(event.id, &store).await.unwrap();
      assert_eq!(store.get(event.id).await.unwrap(), once);
   }

   #[actix_rt::test]
   async fn deleted_event_is_gone_and_delete_is_idempotent() {
      let store = MemoryStore::new();
      let event = store.create(new_event("Derby", Category::Sports)).await.unwrap();
      moderation::delete(event.id, &store).await.unwrap();
      assert!(matches!(
         get_by_id(&event.id.to_string(), &store).await,
         Err(AppError::NotFound)
      ));
      moderation::delete(event.id, &store).await.unwrap();
      moderation::approve(event.id, &store).await.unwrap();
      assert!(store.get(event.id).await.unwrap().is_none());
   }

   #[actix_rt::test]
   async fn malformed_id_is_rejected_before_lookup() {
      let store = MemoryStore::new();
      store.set_unavailable(true);
      assert!(matches!(get_by_id("abc123", &store).await, Err(AppError::InvalidId)));
   }

   #[actix_rt::test]
   async fn category_listing_only_returns_approved() {
      let store = MemoryStore::new();
      let approved = approved_event(&store, "Derby", Category::Sports).await;
      store.create(new_event("Trials", Category::Sports)).await.unwrap();
      approved_event(&store, "Gala", Category::CharityCommunity).await;

      let listed = list_by_category(Category::Sports, None, None, &store).await.unwrap();
      assert_eq!(listed, vec![approved]);
   }

   #[actix_rt::test]
   async fn similar_events_exclude_the_event_and_cap_at_three() {
      let store = MemoryStore::new();
      let main = approved_event(&store, "Main", Category::Sports).await;
      for title in ["a", "b", "c", "d"] {
         approved_event(&store, title, Category::Sports).await;
      }
      let similar = similar_events(&main, &store).await.unwrap();
      let titles: Vec<&str> = similar.iter().map(|e| e.title.as_str()).collect();
      assert_eq!(titles, vec!["a", "b", "c"]);
   }

   #[actix_rt::test]
   async fn organizer_listing_is_newest_first_across_statuses() {
      let store = MemoryStore::new();
      let base = Utc::now();
      for (i, title) in ["old", "mid", "new"].iter().enumerate() {
         let mut event = new_event_for(title, Category::Sports, "org@example.com");
         event.created_at = base + Duration::minutes(i as i64);
         store.create(event).await.unwrap();
      }
      store
         .create(new_event_for("other", Category::Sports, "else@example.com"))
         .await
         .unwrap();
      let titles: Vec<String> = list_by_organizer("org@example.com", &store)
         .await
         .unwrap()
         .into_iter()
         .map(|e| e.title)
         .collect();
      assert_eq!(titles, vec!["new", "mid", "old"]);
   }

   #[actix_rt::test]
   async fn stats_count_each_status() {
      let store = MemoryStore::new();
      let a = store.create(new_event("a", Category::Sports)).await.unwrap();
      let b = store.create(new_event("b", Category::Sports)).await.unwrap();
      store.create(new_event("c", Category::Sports)).await.unwrap();
      moderation::approve(a.id, &store).await.unwrap();
      moderation::reject(b.id, &store).await.unwrap();

      let stats = get_stats(&store).await;
      assert_eq!(
         stats,
         Outcome::Complete(EventStats {
            total: 3,
            approved: 1,
            pending: 1,
            rejected: 1
         })
      );
   }

   #[actix_rt::test]
   async fn stats_degrade_instead_of_failing() {
      let store = MemoryStore::new();
      store.set_unavailable(true);
      let stats = get_stats(&store).await;
      assert!(stats.is_degraded());
      assert_eq!(*stats.value(), EventStats::default());
      assert!(get_user_stats("org@example.com", &store).await.is_degraded());
      assert!(get_favorite_categories("org@example.com", &store).await.is_degraded());
   }

   #[actix_rt::test]
   async fn organizer_stats_count_in_memory() {
      let store = MemoryStore::new();
      let a = store
         .create(new_event_for("a", Category::Sports, "org@example.com"))
         .await
         .unwrap();
      store
         .create(new_event_for("b", Category::Sports, "org@example.com"))
         .await
         .unwrap();
      moderation::approve(a.id, &store).await.unwrap();
      let stats = get_user_stats("org@example.com", &store).await.into_value();
      assert_eq!(
         stats,
         UserEventStats {
            events_created: 2,
            approved_events: 1,
            pending_events: 1,
            rejected_events: 0
         }
      );
   }

   #[test]
   fn favorite_ties_keep_first_seen_order() {
      let store_events: Vec<Event> = [
         Category::WellnessFitness,
         Category::Sports,
         Category::ConcertsNightlife,
         Category::Sports,
         Category::AdventureTravel,
         Category::ConcertsNightlife,
      ]
      .iter()
      .map(|c| new_event("x", *c).into_event(Uuid::new_v4()))
      .collect();
      assert_eq!(
         favorite_categories(&store_events),
         vec![Category::Sports, Category::ConcertsNightlife, Category::WellnessFitness]
      );
   }

   #[test]
   fn action_tokens_split_on_the_first_dash() {
      let id = Uuid::new_v4();
      let (action, parsed) = moderation::parse_token::<ModerationAction>(&format!("approve-{id}")).unwrap();
      assert_eq!(action, ModerationAction::Approve);
      assert_eq!(parsed, id);
      assert!(matches!(
         moderation::parse_token::<ModerationAction>("publish-x"),
         Err(AppError::BadClientData)
      ));
      assert!(matches!(
         moderation::parse_token::<ModerationAction>("delete-42"),
         Err(AppError::InvalidId)
      ));
   }

   #[actix_rt::test]
   async fn writes_fail_visibly_when_the_store_is_down() {
      let store = MemoryStore::new();
      let event = submit(&event_form("Derby"), &store).await.unwrap();
      assert_eq!(event.status, EventStatus::Pending);

      store.set_unavailable(true);
      assert!(matches!(
         submit(&event_form("Trials"), &store).await,
         Err(AppError::Storage(StoreError::Unavailable(_)))
      ));
      for action in [ModerationAction::Approve, ModerationAction::Reject, ModerationAction::Delete] {
         assert!(matches!(
            moderation::apply(action, event.id, &store).await,
            Err(AppError::Storage(_))
         ));
      }

      store.set_unavailable(false);
      assert_eq!(store.get(event.id).await.unwrap().map(|e| e.status), Some(EventStatus::Pending));
      assert_eq!(EventStore::count(&store, &EventQuery::default()).await.unwrap(), 1);
   }

   #[actix_rt::test]
   async fn far_pages_are_empty() {
      let store = MemoryStore::new();
      store.create(new_event("Derby", Category::Sports)).await.unwrap();
      let page = list_all(u64::MAX, &store).await.unwrap();
      assert!(page.items.is_empty());
      assert_eq!(page.total, 1);
      assert_eq!(page.page, u64::MAX);
   }

   #[test]
   fn page_parameter_defaults_to_one() {
      assert_eq!(parse_page(None), 1);
      assert_eq!(parse_page(Some("0")), 1);
      assert_eq!(parse_page(Some("abc")), 1);
      assert_eq!(parse_page(Some("3")), 3);
      assert_eq!(total_pages(21, ADMIN_PAGE_SIZE), 3);
      assert_eq!(total_pages(0, ADMIN_PAGE_SIZE), 0);
   }
}
