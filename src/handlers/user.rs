use actix_web::{get, post, web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use futures::join;
use log::warn;
use serde::Serialize;

use crate::{
    dto::{EventCard, ProfileForm, UserEventStats},
    errors::AppError,
    handlers::{auth::end_session, load_session, redirect_with, render},
    models::Category,
    service::{
        self,
        auth::{current_user, session::FlashKind, AuthMiddleware, Permissions, SessionUser},
        filter::event_card,
    },
    AppState,
};

pub const PROFILE_UPDATED: &str = "Profile updated";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileView {
    events: Vec<EventCard>,
    stats: UserEventStats,
    favorite_categories: Vec<Category>,
    member_since: DateTime<Utc>,
    unavailable: Vec<String>,
}

/// The organizer's own listings in every status, with their counts.
#[get("")]
pub async fn profile_page(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let me = current_user(&req)?;
    let account = match state.users.get(me.id).await? {
        Some(account) => account,
        None => {
            warn!("session for {} points at a missing account", me.email);
            return Ok(end_session());
        }
    };

    let store = state.events.as_ref();
    let (listings, stats, favorites) = join!(
        service::event::list_by_organizer(&account.email, store),
        service::event::get_user_stats(&account.email, store),
        service::event::get_favorite_categories(&account.email, store)
    );
    let mut unavailable: Vec<String> = [stats.cause(), favorites.cause()]
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect();
    let listings = listings.unwrap_or_else(|e| {
        unavailable.push(e.to_string());
        Vec::new()
    });

    render(
        &req,
        &state,
        ProfileView {
            events: listings.into_iter().map(event_card).collect(),
            stats: stats.into_value(),
            favorite_categories: favorites.into_value(),
            member_since: account.created_at,
            unavailable,
        },
    )
}

#[post("")]
pub async fn update_profile(
    req: HttpRequest,
    form: web::Form<ProfileForm>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let me = current_user(&req)?;
    let account = service::user::update_profile(me.id, &form, state.users.as_ref()).await?;

    let mut session = load_session(&req, &state);
    session.set_user(SessionUser {
        id: account.id,
        name: account.name,
        email: account.email,
        role: account.role,
    });
    session.set_flash(FlashKind::Success, PROFILE_UPDATED);
    redirect_with("/profile", &session, &state)
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/profile")
            .wrap(AuthMiddleware {
                required: Permissions::VIEW_PROFILE,
            })
            .service(profile_page)
            .service(update_profile),
    );
}
