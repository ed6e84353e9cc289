use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::service::auth::Permissions;

/// The closed set of listing categories. Navigation, filters, the submission
/// validator and the demo data all go through this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Concerts & Nightlife")]
    ConcertsNightlife,
    #[serde(rename = "Charity & Community")]
    CharityCommunity,
    #[serde(rename = "Wellness & Fitness")]
    WellnessFitness,
    #[serde(rename = "Education & Skills")]
    EducationSkills,
    #[serde(rename = "Student & Campus")]
    StudentCampus,
    #[serde(rename = "Adventure & Travel")]
    AdventureTravel,
    #[serde(rename = "Offers & Discounts")]
    OffersDiscounts,
    #[serde(rename = "Sports")]
    Sports,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::ConcertsNightlife,
        Category::CharityCommunity,
        Category::WellnessFitness,
        Category::EducationSkills,
        Category::StudentCampus,
        Category::AdventureTravel,
        Category::OffersDiscounts,
        Category::Sports,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::ConcertsNightlife => "Concerts & Nightlife",
            Category::CharityCommunity => "Charity & Community",
            Category::WellnessFitness => "Wellness & Fitness",
            Category::EducationSkills => "Education & Skills",
            Category::StudentCampus => "Student & Campus",
            Category::AdventureTravel => "Adventure & Travel",
            Category::OffersDiscounts => "Offers & Discounts",
            Category::Sports => "Sports",
        }
    }

    /// url segment used by `/events/category/{slug}`, e.g. `concerts-nightlife`
    pub fn slug(&self) -> String {
        slugify(self.as_str())
    }

    pub fn from_slug(slug: &str) -> Option<Category> {
        Category::ALL.into_iter().find(|c| c.slug() == slug)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown category '{s}'"))
    }
}

pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase().replace(" & ", "-");
    let mut slug = String::with_capacity(lowered.len());
    for ch in lowered.chars() {
        if ch.is_whitespace() {
            slug.push('-');
        } else if ch.is_ascii_alphanumeric() || ch == '-' {
            slug.push(ch);
        }
    }
    slug
}

/// Category selector of the listing filter. `All` disables the category check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl FromStr for CategoryFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s == "All" {
            return Ok(CategoryFilter::All);
        }
        s.parse::<Category>()
            .ok()
            .or_else(|| Category::from_slug(s))
            .map(CategoryFilter::Only)
            .ok_or_else(|| format!("unknown category '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Pending,
    Approved,
    Rejected,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Pending => "pending",
            EventStatus::Approved => "approved",
            EventStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(EventStatus::Pending),
            "approved" => Ok(EventStatus::Approved),
            "rejected" => Ok(EventStatus::Rejected),
            other => Err(format!("unknown event status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeeType {
    Ticket,
    Free,
    Offer,
    Optional,
    Donation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeTier {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(rename = "type")]
    pub fee_type: FeeType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub city: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub category: Category,
    pub date: DateTime<Utc>,
    pub location: Location,
    pub organizer: String,
    pub contact: String,
    pub duration_minutes: u32,
    pub description: String,
    pub image_url: String,
    pub is_free: bool,
    pub fee_structure: Vec<FeeTier>,
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
}

/// An admitted submission that has not been given an id yet. The store assigns
/// the id and the initial `pending` status.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub title: String,
    pub category: Category,
    pub date: DateTime<Utc>,
    pub location: Location,
    pub organizer: String,
    pub contact: String,
    pub duration_minutes: u32,
    pub description: String,
    pub image_url: String,
    pub is_free: bool,
    pub fee_structure: Vec<FeeTier>,
    pub created_at: DateTime<Utc>,
}

impl NewEvent {
    pub fn into_event(self, id: Uuid) -> Event {
        Event {
            id,
            title: self.title,
            category: self.category,
            date: self.date,
            location: self.location,
            organizer: self.organizer,
            contact: self.contact,
            duration_minutes: self.duration_minutes,
            description: self.description,
            image_url: self.image_url,
            is_free: self.is_free,
            fee_structure: self.fee_structure,
            status: EventStatus::Pending,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn permissions(&self) -> Permissions {
        match self {
            Role::User => Permissions::SUBMIT_EVENTS | Permissions::VIEW_PROFILE,
            Role::Admin => Permissions::all(),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    /// already salted and hashed
    pub password: String,
    pub created_at: DateTime<Utc>,
}

impl NewUser {
    pub fn into_user(self, id: Uuid) -> User {
        User {
            id,
            name: self.name,
            email: self.email,
            password: self.password,
            role: Role::User,
            created_at: self.created_at,
        }
    }
}
