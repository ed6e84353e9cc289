//! Organizer planning tools. Pure functions; the calculation history lives with
//! the caller and is passed back in for the performance summary.

use serde::{Deserialize, Serialize};

use crate::{
    dto::{ReachInput, RevenueInput},
    errors::AppError,
    models::Category,
};

pub const INVALID_INPUT: &str = "Invalid input";
pub const FILL_ALL_FIELDS: &str = "Fill all fields";
pub const MAX_REACH_SCORE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueRecord {
    pub revenue: f64,
    pub profit: f64,
    pub attendees: i64,
    pub price: f64,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReachAnalysis {
    pub score: u32,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryPerformance {
    pub name: String,
    pub revenue: f64,
    pub count: usize,
}

fn number(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|v| v.trim().parse::<f64>().ok()).filter(|v| v.is_finite())
}

fn whole_number(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
}

pub fn calculate_revenue(input: &RevenueInput) -> Result<RevenueRecord, AppError> {
    let invalid = || AppError::Validation(vec![INVALID_INPUT.to_string()]);
    let price = number(input.ticket_price.as_deref()).ok_or_else(invalid)?;
    let attendees = whole_number(input.attendees.as_deref()).ok_or_else(invalid)?;
    let expenses = number(input.expenses.as_deref()).unwrap_or(0.0);

    let revenue = price * attendees as f64;
    Ok(RevenueRecord {
        revenue,
        profit: revenue - expenses,
        attendees,
        price,
        category: input
            .category
            .clone()
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| "Uncategorized".to_string()),
    })
}

pub fn analyze_reach(input: &ReachInput) -> Result<ReachAnalysis, AppError> {
    let duration = whole_number(input.duration.as_deref()).filter(|d| *d != 0);
    let category = input.category.as_deref().filter(|c| !c.is_empty());
    let (Some(duration), Some(category)) = (duration, category) else {
        return Err(AppError::Validation(vec![FILL_ALL_FIELDS.to_string()]));
    };
    let budget = number(input.budget.as_deref()).unwrap_or(0.0);

    let mut score = 50;
    score += match duration {
        d if d > 180 => 20,
        d if d > 90 => 15,
        _ => 10,
    };

    let (bonus, recommendations): (u32, &[&str]) = if category.contains("Concert") {
        (
            25,
            &[
                "Promote on social media 2-3 weeks in advance",
                "Consider VIP packages for premium experience",
            ],
        )
    } else if category.contains("Charity") {
        (
            15,
            &[
                "Leverage community partnerships",
                "Focus on emotional storytelling in marketing",
            ],
        )
    } else if category.contains("Wellness") {
        (
            20,
            &[
                "Offer early-bird pricing",
                "Partner with local wellness influencers",
            ],
        )
    } else {
        (18, &[])
    };
    score += bonus;

    score += if budget > 50000.0 {
        15
    } else if budget > 20000.0 {
        10
    } else {
        5
    };

    Ok(ReachAnalysis {
        score: score.min(MAX_REACH_SCORE),
        recommendations: recommendations.iter().map(|r| r.to_string()).collect(),
    })
}

/// Average revenue and count per category, in category order, skipping
/// categories with no history. Names are shortened to the part before "&".
pub fn category_performance(history: &[RevenueRecord]) -> Vec<CategoryPerformance> {
    Category::ALL
        .iter()
        .filter_map(|category| {
            let revenues: Vec<f64> = history
                .iter()
                .filter(|r| r.category == category.as_str())
                .map(|r| r.revenue)
                .collect();
            if revenues.is_empty() {
                return None;
            }
            let name = category.as_str().split('&').next().unwrap_or_default().trim();
            Some(CategoryPerformance {
                name: name.to_string(),
                revenue: revenues.iter().sum::<f64>() / revenues.len() as f64,
                count: revenues.len(),
            })
        })
        .collect()
}
