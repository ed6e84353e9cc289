use chrono::{self, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Category, Event, EventStatus, Location, Role};

/// Raw add-event form. Every field is optional so the validator can report each
/// missing one instead of failing deserialization on the first.
#[derive(Debug, Default, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewEventForm {
    pub title: Option<String>,
    pub category: Option<String>,
    pub date: Option<String>,
    pub location_name: Option<String>,
    pub location_city: Option<String>,
    pub organizer: Option<String>,
    pub contact: Option<String>,
    pub duration_minutes: Option<String>,
    pub description: Option<String>,
    pub is_free: Option<String>,
    pub ticket_price: Option<String>,
    pub image_url: Option<String>,
}

impl NewEventForm {
    /// Looks a field up by its form name.
    pub fn field(&self, name: &str) -> Option<&str> {
        let value = match name {
            "title" => &self.title,
            "category" => &self.category,
            "date" => &self.date,
            "locationName" => &self.location_name,
            "locationCity" => &self.location_city,
            "organizer" => &self.organizer,
            "contact" => &self.contact,
            "durationMinutes" => &self.duration_minutes,
            "description" => &self.description,
            "isFree" => &self.is_free,
            "ticketPrice" => &self.ticket_price,
            "imageUrl" => &self.image_url,
            _ => return None,
        };
        value.as_deref()
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SignupForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoginForm {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProfileForm {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ActionForm {
    #[serde(rename = "_action")]
    pub action: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CheckoutForm {
    #[serde(rename = "priceId")]
    pub price_id: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ContactForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ListingQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct PageQuery {
    pub page: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventDto {
    pub status: Option<EventStatus>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<chrono::DateTime<Utc>>,
    pub location: Option<Location>,
    pub duration_minutes: Option<u32>,
    pub image_url: Option<String>,
}

impl UpdateEventDto {
    pub fn status(status: EventStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == UpdateEventDto::default()
    }

    /// Merges the set fields into `event`.
    pub fn apply(&self, event: &mut Event) {
        if let Some(v) = self.status {
            event.status = v;
        }
        if let Some(v) = &self.title {
            event.title = v.clone();
        }
        if let Some(v) = &self.description {
            event.description = v.clone();
        }
        if let Some(v) = self.date {
            event.date = v;
        }
        if let Some(v) = &self.location {
            event.location = v.clone();
        }
        if let Some(v) = self.duration_minutes {
            event.duration_minutes = v;
        }
        if let Some(v) = &self.image_url {
            event.image_url = v.clone();
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct UpdateUserDto {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

impl UpdateUserDto {
    pub fn role(role: Role) -> Self {
        Self {
            role: Some(role),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == UpdateUserDto::default()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EventStats {
    pub total: u64,
    pub approved: u64,
    pub pending: u64,
    pub rejected: u64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEventStats {
    pub events_created: u64,
    pub approved_events: u64,
    pub pending_events: u64,
    pub rejected_events: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub total_pages: u64,
    pub total: u64,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CategoryLink {
    pub name: Category,
    pub slug: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DateDisplay {
    pub date: String,
    pub time: String,
    pub badge_day: String,
    pub badge_month: String,
}

/// Event as shown on listing pages.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EventCard {
    #[serde(flatten)]
    pub event: Event,
    pub fee_label: String,
    pub summary: String,
    pub when: DateDisplay,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RevenueInput {
    pub ticket_price: Option<String>,
    pub attendees: Option<String>,
    pub expenses: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReachInput {
    pub duration: Option<String>,
    pub category: Option<String>,
    pub budget: Option<String>,
}
