//! Field checks for event submissions and account forms.
//!
//! Submission checks run to completion and return every problem at once; an
//! empty list admits the submission.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;

use crate::{
    dto::NewEventForm,
    models::{Category, FeeTier, FeeType, Location, NewEvent},
};

pub const REQUIRED_EVENT_FIELDS: [&str; 11] = [
    "title",
    "category",
    "date",
    "locationName",
    "locationCity",
    "organizer",
    "contact",
    "durationMinutes",
    "description",
    "isFree",
    "imageUrl",
];

pub const TICKET_PRICE_ERROR: &str = "Ticket price must be provided and greater than 0 for paid events";
pub const IMAGE_URL_ERROR: &str = "Please enter a valid image URL";
pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+@\S+\.\S+").expect("valid email regex"));
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(07|01)\d{8}$").expect("valid phone regex"));

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn parse_price(raw: Option<&str>) -> Option<f64> {
    present(raw)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|p| p.is_finite() && *p > 0.0)
}

/// Accepts RFC 3339 or the `datetime-local` form value (`2025-12-05T22:00`), read as UTC.
pub fn parse_event_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

pub fn validate_event(form: &NewEventForm) -> Vec<String> {
    let mut errors = Vec::new();

    for field in REQUIRED_EVENT_FIELDS {
        if present(form.field(field)).is_none() {
            errors.push(format!("{field} is required"));
        }
    }

    let is_free = form.field("isFree") == Some("true");
    if !is_free && parse_price(form.field("ticketPrice")).is_none() {
        errors.push(TICKET_PRICE_ERROR.to_string());
    }

    if let Some(image_url) = present(form.field("imageUrl")) {
        if Url::parse(image_url).is_err() {
            errors.push(IMAGE_URL_ERROR.to_string());
        }
    }

    // present but unusable values; absent ones were reported above
    if let Some(category) = present(form.field("category")) {
        if category.parse::<Category>().is_err() {
            errors.push(format!("category must be one of: {}", category_names()));
        }
    }
    if let Some(date) = present(form.field("date")) {
        if parse_event_date(date).is_none() {
            errors.push("date must be a valid date and time".to_string());
        }
    }
    if let Some(duration) = present(form.field("durationMinutes")) {
        if !matches!(duration.trim().parse::<u32>(), Ok(d) if d > 0) {
            errors.push("durationMinutes must be a positive whole number".to_string());
        }
    }

    errors
}

fn category_names() -> String {
    Category::ALL.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(", ")
}

/// Validates `form` and, when admissible, builds the record handed to the store.
pub fn admit_event(form: &NewEventForm, now: DateTime<Utc>) -> Result<NewEvent, Vec<String>> {
    let errors = validate_event(form);
    if !errors.is_empty() {
        return Err(errors);
    }
    build_event(form, now).ok_or_else(|| vec!["submission could not be read".to_string()])
}

fn build_event(form: &NewEventForm, now: DateTime<Utc>) -> Option<NewEvent> {
    let text = |name: &str| form.field(name).map(str::to_string);
    let is_free = form.field("isFree") == Some("true");
    let fee_structure = if is_free {
        Vec::new()
    } else {
        vec![FeeTier {
            name: "Standard".to_string(),
            price: Some(parse_price(form.field("ticketPrice"))?),
            fee_type: FeeType::Ticket,
        }]
    };
    Some(NewEvent {
        title: text("title")?,
        category: form.field("category")?.parse().ok()?,
        date: parse_event_date(form.field("date")?)?,
        location: Location {
            name: text("locationName")?,
            city: text("locationCity"),
        },
        organizer: text("organizer")?,
        contact: text("contact")?,
        duration_minutes: form.field("durationMinutes")?.trim().parse().ok()?,
        description: text("description")?,
        image_url: text("imageUrl")?,
        is_free,
        fee_structure,
        created_at: now,
    })
}

pub fn validate_text(value: Option<&str>) -> Option<String> {
    match value {
        Some(v) if v.trim().chars().count() >= 2 => None,
        _ => Some("Must be at least 2 characters".to_string()),
    }
}

pub fn validate_email(email: Option<&str>) -> Option<String> {
    match present(email) {
        None => Some("Email is required.".to_string()),
        Some(e) if !EMAIL_RE.is_match(e) => Some("Email is invalid.".to_string()),
        Some(_) => None,
    }
}

pub fn validate_password(password: Option<&str>) -> Option<String> {
    match password {
        Some(p) if p.chars().count() >= MIN_PASSWORD_LEN => None,
        _ => Some(format!("Password must be at least {MIN_PASSWORD_LEN} characters")),
    }
}

pub fn validate_confirm_password(password: Option<&str>, confirm: Option<&str>) -> Option<String> {
    if password.unwrap_or_default() != confirm.unwrap_or_default() {
        return Some("Passwords do not match".to_string());
    }
    if present(confirm).is_none() {
        return Some("Confirm password is required".to_string());
    }
    None
}

pub fn validate_phone(phone: Option<&str>) -> Option<String> {
    match present(phone) {
        None => Some("Phone number is required".to_string()),
        Some(p) if !PHONE_RE.is_match(p) => {
            Some("Phone number must start with 07 or 01 and be 10 digits long".to_string())
        }
        Some(_) => None,
    }
}

pub fn validate_message(message: Option<&str>) -> Option<String> {
    match message.map(str::trim) {
        Some(m) if !m.is_empty() => None,
        _ => Some("Message cannot be empty.".to_string()),
    }
}
