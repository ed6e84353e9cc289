use chrono::{DateTime, Utc};
use log::info;

use super::{EventStore, UserStore};
use crate::{
    dto::{UpdateEventDto, UpdateUserDto},
    errors::AppError,
    models::{Category, EventStatus, FeeTier, FeeType, Location, NewEvent, NewUser, Role},
    service::crypto,
};

pub const DEMO_ADMIN_EMAIL: &str = "admin@vibelink.local";

struct DemoEvent {
    title: &'static str,
    category: Category,
    date: &'static str,
    venue: &'static str,
    organizer: &'static str,
    contact: &'static str,
    duration_minutes: u32,
    description: &'static str,
    image_url: &'static str,
    fees: &'static [(&'static str, Option<f64>, FeeType)],
}

const DEMO_EVENTS: &[DemoEvent] = &[
    DemoEvent {
        title: "Neon Dance Floor Takeover",
        category: Category::ConcertsNightlife,
        date: "2025-12-05T22:00:00Z",
        venue: "The Warehouse Club",
        organizer: "Global Beats Events",
        contact: "tickets@globalbeats.com",
        duration_minutes: 300,
        description: "High-energy EDM and pop event featuring three international DJs. Dress in neon and prepare to dance all night!",
        image_url: "https://images.example.com/neon-dance.jpg",
        fees: &[
            ("Early Bird Ticket", Some(1000.0), FeeType::Ticket),
            ("At The Door", Some(1500.0), FeeType::Ticket),
        ],
    },
    DemoEvent {
        title: "Weekend Park Clean-Up Drive",
        category: Category::CharityCommunity,
        date: "2025-11-23T09:00:00Z",
        venue: "Riverside Park",
        organizer: "Green Meru",
        contact: "greenmeru.volunteer@gmail.com",
        duration_minutes: 180,
        description: "Volunteer to help keep our local parks clean and beautiful. Gloves and bags will be provided.",
        image_url: "https://images.example.com/park-cleanup.jpg",
        fees: &[("Free Registration", None, FeeType::Free)],
    },
    DemoEvent {
        title: "Free Outdoor Zumba Session",
        category: Category::WellnessFitness,
        date: "2025-11-27T18:00:00Z",
        venue: "Town Square",
        organizer: "Zumba Meru",
        contact: "zumba.meru@gmail.com",
        duration_minutes: 60,
        description: "Dance your stress away with a fun, free Zumba session open to all.",
        image_url: "https://images.example.com/zumba.jpg",
        fees: &[("Free Entry", None, FeeType::Free)],
    },
    DemoEvent {
        title: "Advanced Excel Workshop",
        category: Category::EducationSkills,
        date: "2025-11-18T18:30:00Z",
        venue: "Chamber of Commerce Hall",
        organizer: "Meru Business School",
        contact: "merubusiness.school@outlook.com",
        duration_minutes: 120,
        description: "Master pivot tables, VLOOKUP, and advanced data analysis in this hands-on workshop.",
        image_url: "https://images.example.com/excel.jpg",
        fees: &[("Standard Fee", Some(1000.0), FeeType::Ticket)],
    },
    DemoEvent {
        title: "Freshers Welcome Bash",
        category: Category::StudentCampus,
        date: "2026-01-15T16:00:00Z",
        venue: "University Main Hall",
        organizer: "Student Council",
        contact: "council@students.example.com",
        duration_minutes: 240,
        description: "Kick off the semester with music, games and food stalls run by campus clubs.",
        image_url: "https://images.example.com/freshers.jpg",
        fees: &[("Student Ticket", Some(300.0), FeeType::Ticket)],
    },
    DemoEvent {
        title: "Mount Kenya Day Hike",
        category: Category::AdventureTravel,
        date: "2026-02-07T05:30:00Z",
        venue: "Chogoria Gate",
        organizer: "Trail Seekers",
        contact: "hike@trailseekers.example.com",
        duration_minutes: 600,
        description: "A guided day hike through the Chogoria route with transport from town included.",
        image_url: "https://images.example.com/hike.jpg",
        fees: &[("Hike Package", Some(4500.0), FeeType::Ticket)],
    },
    DemoEvent {
        title: "Holiday Market Discounts",
        category: Category::OffersDiscounts,
        date: "2025-12-20T10:00:00Z",
        venue: "Meru Mall",
        organizer: "Meru Mall Traders",
        contact: "offers@merumall.example.com",
        duration_minutes: 480,
        description: "Up to half off at participating stores for one day only.",
        image_url: "https://images.example.com/market.jpg",
        fees: &[("Shopper Pass", None, FeeType::Offer)],
    },
    DemoEvent {
        title: "County Football Derby",
        category: Category::Sports,
        date: "2025-12-13T15:00:00Z",
        venue: "Kinoru Stadium",
        organizer: "Meru Football Association",
        contact: "tickets@merufa.example.com",
        duration_minutes: 120,
        description: "The season's biggest local derby. Gates open two hours before kick-off.",
        image_url: "https://images.example.com/derby.jpg",
        fees: &[("Terraces", Some(200.0), FeeType::Ticket), ("VIP", Some(1000.0), FeeType::Ticket)],
    },
];

fn demo_date(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Fills an empty store with one approved listing per category and an admin account.
pub async fn seed_demo_data(
    events: &dyn EventStore,
    users: &dyn UserStore,
    admin_password: &str,
) -> Result<(), AppError> {
    for demo in DEMO_EVENTS {
        let fee_structure: Vec<FeeTier> = demo
            .fees
            .iter()
            .map(|(name, price, fee_type)| FeeTier {
                name: name.to_string(),
                price: *price,
                fee_type: *fee_type,
            })
            .collect();
        let is_free = fee_structure.iter().all(|f| f.price.is_none());
        let created = events
            .create(NewEvent {
                title: demo.title.to_string(),
                category: demo.category,
                date: demo_date(demo.date),
                location: Location {
                    name: demo.venue.to_string(),
                    city: Some("Meru".to_string()),
                },
                organizer: demo.organizer.to_string(),
                contact: demo.contact.to_string(),
                duration_minutes: demo.duration_minutes,
                description: demo.description.to_string(),
                image_url: demo.image_url.to_string(),
                is_free,
                fee_structure,
                created_at: Utc::now(),
            })
            .await?;
        events
            .update(created.id, &UpdateEventDto::status(EventStatus::Approved))
            .await?;
    }

    let password = crypto::hash_password(admin_password).await?;
    let admin = users
        .create(NewUser {
            name: "VibeLink Admin".to_string(),
            email: DEMO_ADMIN_EMAIL.to_string(),
            password,
            created_at: Utc::now(),
        })
        .await?;
    users.update(admin.id, &UpdateUserDto::role(Role::Admin)).await?;
    info!("seeded {} demo events and admin {}", DEMO_EVENTS.len(), DEMO_ADMIN_EMAIL);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{memory::MemoryStore, EventQuery};

    #[actix_rt::test]
    async fn seeds_one_approved_event_per_category() {
        let store = MemoryStore::new();
        seed_demo_data(&store, &store, "changeme").await.unwrap();
        for category in Category::ALL {
            let query = EventQuery {
                category: Some(category),
                status: Some(EventStatus::Approved),
                ..Default::default()
            };
            assert_eq!(EventStore::count(&store, &query).await.unwrap(), 1, "{category}");
        }
        let admin = store.get_by_email(DEMO_ADMIN_EMAIL).await.unwrap().unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert!(crypto::verify_password("changeme", &admin.password).await.unwrap());
    }
}
