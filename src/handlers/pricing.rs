use actix_web::{get, post, web, HttpRequest, HttpResponse};
use log::warn;
use serde_json::json;

use crate::{
    dto::CheckoutForm,
    errors::AppError,
    handlers::{redirect, render},
    AppState,
};

pub const CHECKOUT_FAILED: &str = "/pricing/error";

/// Starts a hosted checkout for the chosen plan. Any failure lands on the
/// pricing error page rather than surfacing the gateway error.
#[post("/pricing")]
pub async fn checkout(
    req: HttpRequest,
    form: web::Form<CheckoutForm>,
    state: web::Data<AppState>,
) -> HttpResponse {
    let Some(price_id) = form.price_id.as_deref().filter(|p| !p.is_empty()) else {
        warn!("checkout requested without a priceId");
        return redirect(CHECKOUT_FAILED);
    };
    let origin = {
        let info = req.connection_info();
        format!("{}://{}", info.scheme(), info.host())
    };
    match state.checkout.create_session(price_id, &origin).await {
        Ok(url) => redirect(&url),
        Err(err) => {
            warn!("checkout for {price_id} failed: {err}");
            redirect(CHECKOUT_FAILED)
        }
    }
}

#[get("/pricing/{outcome}")]
pub async fn pricing_outcome(
    req: HttpRequest,
    outcome: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    match outcome.as_str() {
        "success" | "cancel" | "error" => render(&req, &state, json!({ "outcome": outcome.as_str() })),
        _ => Err(AppError::NotFound),
    }
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(checkout).service(pricing_outcome);
}
