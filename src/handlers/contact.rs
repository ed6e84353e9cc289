use actix_web::{post, web, HttpResponse};
use serde_json::json;

use crate::{dto::ContactForm, errors::AppError, service::contact::validate_contact, AppState};

pub const MESSAGE_SENT: &str = "Message sent successfully!";

#[post("/contact")]
pub async fn send_message(form: web::Form<ContactForm>, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let message = validate_contact(&form)?;
    state.relay.send(&message).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": MESSAGE_SENT })))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(send_message);
}
