use std::collections::BTreeMap;

use actix_web::{get, post, web, HttpRequest, HttpResponse};
use log::info;
use serde_json::json;

use crate::{
    dto::{LoginForm, SignupForm},
    errors::AppError,
    handlers::{load_session, redirect, redirect_with, render},
    models::Role,
    service::{
        self,
        auth::{
            session::{FlashKind, Session},
            SessionUser,
        },
        validation,
    },
    AppState,
};

pub const INVALID_CREDENTIALS: &str = "Invalid credentials. Try again.";
pub const LOGGED_OUT: &str = "Logged out successfully!";

/// Current user and pending flash, for the page shell.
#[get("/session")]
pub async fn current_session(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    render(&req, &state, json!({}))
}

#[get("/login")]
pub async fn login_page(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    render(&req, &state, json!({}))
}

#[get("/signup")]
pub async fn signup_page(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    render(&req, &state, json!({}))
}

#[post("/signup")]
pub async fn signup(form: web::Form<SignupForm>, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    service::user::signup(&form, state.users.as_ref()).await?;
    Ok(redirect("/login"))
}

#[post("/login")]
pub async fn login(
    req: HttpRequest,
    form: web::Form<LoginForm>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let mut errors = BTreeMap::new();
    if let Some(e) = validation::validate_text(form.email.as_deref()) {
        errors.insert("email", e);
    }
    if let Some(e) = validation::validate_password(form.password.as_deref()) {
        errors.insert("password", e);
    }
    if !errors.is_empty() {
        return Err(AppError::FieldErrors(errors));
    }

    let mut session = load_session(&req, &state);
    match service::user::login(&form, state.users.as_ref()).await {
        Ok(user) => {
            session.set_flash(FlashKind::Success, format!("Welcome back, {}!", user.name));
            let target = if user.role == Role::Admin { "/admin" } else { "/" };
            info!("{} logged in", user.email);
            session.set_user(SessionUser {
                id: user.id,
                name: user.name,
                email: user.email,
                role: user.role,
            });
            redirect_with(target, &session, &state)
        }
        Err(AppError::Unauthorized) => {
            session.set_flash(FlashKind::Error, INVALID_CREDENTIALS);
            redirect_with("/login", &session, &state)
        }
        Err(err) => Err(err),
    }
}

pub async fn logout(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let mut session = load_session(&req, &state);
    session.clear_user();
    session.set_flash(FlashKind::Success, LOGGED_OUT);
    redirect_with("/", &session, &state)
}

/// Drops the cookie entirely; used when the session points at a deleted account.
pub fn end_session() -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((actix_web::http::header::LOCATION, "/login"))
        .cookie(Session::destroy())
        .finish()
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(current_session)
        .service(login_page)
        .service(signup_page)
        .service(signup)
        .service(login)
        .service(
            web::resource("/logout")
                .route(web::get().to(logout))
                .route(web::post().to(logout)),
        );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testing::{session_from, test_app_state, user_cookie};
    use actix_web::{http::header, http::StatusCode, test, App};
    use serde_json::Value;

    fn signup_form(email: &str) -> Vec<(&'static str, String)> {
        vec![
            ("name", "Ada".to_string()),
            ("email", email.to_string()),
            ("password", "secret1".to_string()),
            ("confirmPassword", "secret1".to_string()),
        ]
    }

    #[actix_web::test]
    async fn signup_login_logout() {
        let state = test_app_state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(init_routes)).await;

        let req = test::TestRequest::post()
            .uri("/signup")
            .set_form(signup_form("ada@example.com"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers().get(header::LOCATION).unwrap(), "/login");

        let req = test::TestRequest::post()
            .uri("/login")
            .set_form([("email", "ada@example.com"), ("password", "secret1")])
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.headers().get(header::LOCATION).unwrap(), "/");
        let session = session_from(&res, &state);
        assert_eq!(session.user.as_ref().map(|u| u.email.as_str()), Some("ada@example.com"));
        assert_eq!(
            session.flash.as_ref().map(|f| f.message.as_str()),
            Some("Welcome back, Ada!")
        );

        let cookie = session.commit(&state.sessions).unwrap();
        let res = test::call_service(&app, test::TestRequest::get().uri("/logout").cookie(cookie).to_request()).await;
        let after = session_from(&res, &state);
        assert!(after.user.is_none());
        assert_eq!(after.flash.map(|f| f.message), Some(LOGGED_OUT.to_string()));
    }

    #[actix_web::test]
    async fn duplicate_signup_reports_email_in_use() {
        let state = test_app_state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(init_routes)).await;
        let req = test::TestRequest::post()
            .uri("/signup")
            .set_form(signup_form("ada@example.com"))
            .to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::post()
            .uri("/signup")
            .set_form(signup_form("ADA@example.com"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["errors"]["email"], "Email already in use");
        assert_eq!(state.users.count().await.unwrap(), 1);
    }

    #[actix_web::test]
    async fn wrong_password_flashes_an_error() {
        let state = test_app_state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(init_routes)).await;
        let req = test::TestRequest::post()
            .uri("/login")
            .set_form([("email", "ghost@example.com"), ("password", "secret1")])
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers().get(header::LOCATION).unwrap(), "/login");
        let session = session_from(&res, &state);
        assert!(session.user.is_none());
        let cookie = session.commit(&state.sessions).unwrap();

        // shown once, then gone
        let res = test::call_service(&app, test::TestRequest::get().uri("/login").cookie(cookie).to_request()).await;
        let cleared = session_from(&res, &state);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["flash"]["message"], INVALID_CREDENTIALS);
        assert_eq!(body["flash"]["type"], "error");
        assert!(cleared.flash.is_none());
    }

    #[actix_web::test]
    async fn session_endpoint_reports_the_user() {
        let state = test_app_state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(init_routes)).await;
        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/session").cookie(user_cookie(&state).await).to_request(),
        )
        .await;
        assert_eq!(body["user"]["email"], "user@example.com");
        assert!(body["flash"].is_null());
    }
}
