pub mod admin;
pub mod auth;
pub mod contact;
pub mod event;
pub mod pricing;
pub mod tools;
pub mod user;

use actix_web::{http::header, web, HttpRequest, HttpResponse};
use log::error;
use serde::Serialize;

use crate::{
    errors::AppError,
    service::auth::{
        session::{Flash, Session},
        SessionUser,
    },
    AppState,
};

/// Body of every page response: who is logged in, the pending flash (consumed
/// here) and the page data.
#[derive(Serialize)]
pub struct PageView<T: Serialize> {
    pub user: Option<SessionUser>,
    pub flash: Option<Flash>,
    #[serde(flatten)]
    pub data: T,
}

pub fn load_session(req: &HttpRequest, state: &AppState) -> Session {
    Session::load(req, &state.sessions)
}

/// Renders `data` and drops the flash from the cookie once it has been shown.
pub fn render<T: Serialize>(req: &HttpRequest, state: &AppState, data: T) -> Result<HttpResponse, AppError> {
    let mut session = load_session(req, state);
    let flash = session.take_flash();
    let mut res = HttpResponse::Ok();
    if flash.is_some() {
        res.cookie(commit(&session, state)?);
    }
    Ok(res.json(PageView {
        user: session.user,
        flash,
        data,
    }))
}

pub fn commit(session: &Session, state: &AppState) -> Result<actix_web::cookie::Cookie<'static>, AppError> {
    session.commit(&state.sessions).map_err(|e| {
        error!("could not sign session cookie: {e}");
        AppError::InternalError
    })
}

/// 303 to `location`, writing `session` back.
pub fn redirect_with(location: &str, session: &Session, state: &AppState) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .cookie(commit(session, state)?)
        .finish())
}

pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.configure(auth::init_routes)
        .configure(admin::init_routes)
        .configure(user::init_routes)
        .configure(pricing::init_routes)
        .configure(contact::init_routes)
        .configure(tools::init_routes)
        .configure(event::init_routes);
}
