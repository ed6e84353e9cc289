use actix_web::{post, web, HttpResponse};

use crate::{
    dto::{ReachInput, RevenueInput},
    errors::AppError,
    service::tools::{self, RevenueRecord},
};

#[post("/tools/revenue")]
pub async fn revenue(input: web::Form<RevenueInput>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(tools::calculate_revenue(&input)?))
}

#[post("/tools/reach")]
pub async fn reach(input: web::Form<ReachInput>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(tools::analyze_reach(&input)?))
}

/// The calculation history is kept by the client and sent back whole.
#[post("/tools/performance")]
pub async fn performance(history: web::Json<Vec<RevenueRecord>>) -> HttpResponse {
    HttpResponse::Ok().json(tools::category_performance(&history))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(revenue).service(reach).service(performance);
}
