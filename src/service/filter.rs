//! Listing-side helpers: narrowing an approved set by search term and category,
//! and the labels shown on event cards.

use chrono::{DateTime, Utc};

use crate::{
    dto::{CategoryLink, DateDisplay, EventCard, Page},
    models::{Category, CategoryFilter, Event},
};

pub const SUMMARY_LIMIT: usize = 85;

/// Keeps events matching `category` and containing `term` (case-insensitive
/// substring) in the title, description, category or venue name. Input order is kept.
pub fn filter_events(events: &[Event], term: &str, category: CategoryFilter) -> Vec<Event> {
    let needle = term.to_lowercase();
    events
        .iter()
        .filter(|event| match category {
            CategoryFilter::All => true,
            CategoryFilter::Only(c) => event.category == c,
        })
        .filter(|event| {
            needle.is_empty()
                || event.title.to_lowercase().contains(&needle)
                || event.description.to_lowercase().contains(&needle)
                || event.category.as_str().to_lowercase().contains(&needle)
                || event.location.name.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}

pub fn paginate<T: Clone>(items: &[T], page: u64, page_size: u64) -> Page<T> {
    let total = items.len() as u64;
    let start = page.saturating_sub(1).saturating_mul(page_size).min(total) as usize;
    let end = (start as u64 + page_size).min(total) as usize;
    Page {
        items: items[start..end].to_vec(),
        page,
        total_pages: total.div_ceil(page_size),
        total,
    }
}

pub fn fee_label(event: &Event) -> String {
    if event.is_free {
        return "FREE ENTRY".to_string();
    }
    let min_price = event
        .fee_structure
        .iter()
        .filter_map(|f| f.price)
        .filter(|p| *p > 0.0)
        .fold(None, |min: Option<f64>, p| Some(min.map_or(p, |m| m.min(p))));
    match min_price {
        Some(price) => format!("Ksh {}+", group_thousands(price)),
        None => "Ticketed".to_string(),
    }
}

/// `1500` -> `1,500`, `1234.5` -> `1,234.5`
pub fn group_thousands(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    let whole = rounded.trunc() as u64;
    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let cents = ((rounded - rounded.trunc()) * 100.0).round() as u64;
    if cents == 0 {
        grouped
    } else {
        let fraction = format!("{cents:02}");
        format!("{grouped}.{}", fraction.trim_end_matches('0'))
    }
}

/// Cuts at `limit` characters, then back to the last space so no word is split.
pub fn truncate_description(description: &str, limit: usize) -> String {
    if description.chars().count() <= limit {
        return description.to_string();
    }
    let cut: String = description.chars().take(limit).collect();
    match cut.rfind(' ') {
        Some(idx) => cut[..idx].to_string(),
        None => cut,
    }
}

pub fn format_date_time(date: &DateTime<Utc>) -> DateDisplay {
    let badge_day = date.format("%-d").to_string();
    let badge_month = date.format("%b").to_string();
    DateDisplay {
        date: format!("{badge_month} {badge_day}"),
        time: date.format("%I:%M %p").to_string(),
        badge_day,
        badge_month,
    }
}

pub fn event_card(event: Event) -> EventCard {
    EventCard {
        fee_label: fee_label(&event),
        summary: truncate_description(&event.description, SUMMARY_LIMIT),
        when: format_date_time(&event.date),
        event,
    }
}

pub fn category_links() -> Vec<CategoryLink> {
    Category::ALL
        .into_iter()
        .map(|c| CategoryLink { name: c, slug: c.slug() })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FeeTier, FeeType};
    use crate::service::testing::new_event;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn sample() -> Vec<Event> {
        let mut zumba = new_event("Free Outdoor Zumba Session", Category::WellnessFitness).into_event(Uuid::new_v4());
        zumba.description = "Dance your stress away.".to_string();
        let mut run = new_event("Sunrise 5K Fun Run", Category::WellnessFitness).into_event(Uuid::new_v4());
        run.description = "Warm-up led by the ZUMBA crew".to_string();
        let mut gala = new_event("Fundraiser Gala", Category::CharityCommunity).into_event(Uuid::new_v4());
        gala.location.name = "Zumbani Hall".to_string();
        let derby = new_event("County Derby", Category::Sports).into_event(Uuid::new_v4());
        vec![zumba, run, gala, derby]
    }

    #[test]
    fn search_matches_any_field_case_insensitively() {
        let events = sample();
        let titles: Vec<String> = filter_events(&events, "zumba", CategoryFilter::All)
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(
            titles,
            vec!["Free Outdoor Zumba Session", "Sunrise 5K Fun Run", "Fundraiser Gala"]
        );
    }

    #[test]
    fn category_and_term_compose() {
        let events = sample();
        let hits = filter_events(&events, "ZUMBA", CategoryFilter::Only(Category::WellnessFitness));
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|e| e.category == Category::WellnessFitness));
        assert!(filter_events(&events, "zumba", CategoryFilter::Only(Category::Sports)).is_empty());
        let by_category = filter_events(&events, "", CategoryFilter::Only(Category::Sports));
        assert_eq!(by_category, vec![events[3].clone()]);
    }

    #[test]
    fn no_filters_returns_input_unchanged() {
        let events = sample();
        assert_eq!(filter_events(&events, "", CategoryFilter::All), events);
    }

    #[test]
    fn category_text_is_searchable() {
        let events = sample();
        assert_eq!(filter_events(&events, "charity", CategoryFilter::All).len(), 1);
    }

    #[test]
    fn fee_labels() {
        let mut event = new_event("x", Category::Sports).into_event(Uuid::new_v4());
        event.is_free = true;
        assert_eq!(fee_label(&event), "FREE ENTRY");

        event.is_free = false;
        event.fee_structure = vec![
            FeeTier { name: "At The Door".into(), price: Some(1500.0), fee_type: FeeType::Ticket },
            FeeTier { name: "Donation".into(), price: None, fee_type: FeeType::Donation },
            FeeTier { name: "Early Bird".into(), price: Some(1000.0), fee_type: FeeType::Ticket },
        ];
        assert_eq!(fee_label(&event), "Ksh 1,000+");

        event.fee_structure = vec![FeeTier { name: "Toy".into(), price: None, fee_type: FeeType::Donation }];
        assert_eq!(fee_label(&event), "Ticketed");
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(800.0), "800");
        assert_eq!(group_thousands(7500.0), "7,500");
        assert_eq!(group_thousands(1234567.5), "1,234,567.5");
    }

    #[test]
    fn truncation_stops_at_a_word_boundary() {
        let text = "Learn the basics of budgeting, saving, and investing to secure your financial future. Free materials provided.";
        let summary = truncate_description(text, SUMMARY_LIMIT);
        assert!(summary.len() <= SUMMARY_LIMIT);
        assert!(text.starts_with(&summary));
        assert!(!summary.ends_with(' '));
        assert_eq!(truncate_description("short", SUMMARY_LIMIT), "short");
    }

    #[test]
    fn date_display() {
        let date = Utc.with_ymd_and_hms(2025, 12, 5, 22, 0, 0).unwrap();
        let shown = format_date_time(&date);
        assert_eq!(shown.date, "Dec 5");
        assert_eq!(shown.time, "10:00 PM");
        assert_eq!(shown.badge_day, "5");
        assert_eq!(shown.badge_month, "Dec");
    }

    #[test]
    fn pages_past_the_end_are_empty() {
        let items: Vec<u32> = (1..=25).collect();
        let second = paginate(&items, 2, 12);
        assert_eq!(second.items, (13..=24).collect::<Vec<_>>());
        assert_eq!(second.total_pages, 3);
        assert!(paginate(&items, 9, 12).items.is_empty());
    }
}
