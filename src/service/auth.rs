use std::future::{ready, Ready};
use std::rc::Rc;

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    HttpMessage, HttpResponse,
};
use bitflags::bitflags;
use futures_util::future::LocalBoxFuture;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{errors::AppError, models::Role, AppState};

use self::session::Session;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Permissions: u8 {
        const SUBMIT_EVENTS = 1;
        const VIEW_PROFILE = 1 << 1;
        const MODERATE_EVENTS = 1 << 2;
        const MANAGE_USERS = 1 << 3;
    }
}

/// The logged-in account as carried in the session cookie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl SessionUser {
    pub fn can(&self, required: Permissions) -> bool {
        self.role.permissions().contains(required)
    }
}

/// Pulls the user the guard placed in the request extensions.
pub fn current_user(req: &actix_web::HttpRequest) -> Result<SessionUser, AppError> {
    req.extensions()
        .get::<SessionUser>()
        .cloned()
        .ok_or(AppError::Unauthorized)
}

/// Guards a scope: anonymous visitors are sent to `/login`, users lacking
/// `required` get 403.
pub struct AuthMiddleware {
    pub required: Permissions,
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = actix_web::Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
            required: self.required,
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
    required: Permissions,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let required = self.required;

        Box::pin(async move {
            let Some(state) = req.app_data::<actix_web::web::Data<AppState>>().cloned() else {
                return Ok(req.into_response(to_login()).map_into_right_body());
            };
            let Some(claimed) = Session::load(req.request(), &state.sessions).user else {
                return Ok(req.into_response(to_login()).map_into_right_body());
            };

            // role comes from the stored account, not the cookie
            let account = match state.users.get(claimed.id).await {
                Ok(account) => account,
                Err(e) => {
                    warn!("guard could not load account {}: {e}", claimed.id);
                    return Err(AppError::from(e).into());
                }
            };
            let Some(account) = account else {
                warn!("session for {} points at a missing account", claimed.email);
                let mut res = to_login();
                res.add_cookie(&Session::destroy())?;
                return Ok(req.into_response(res).map_into_right_body());
            };

            let user = SessionUser {
                id: account.id,
                name: account.name,
                email: account.email,
                role: account.role,
            };
            if !user.can(required) {
                warn!("{} denied {} {}", user.email, req.method(), req.path());
                let res = req.into_response(HttpResponse::Forbidden().body("forbidden"));
                return Ok(res.map_into_right_body());
            }

            debug!("{} ({}) passed guard {:?}", user.email, user.role.as_str(), required);
            req.extensions_mut().insert(user);
            let res = service.call(req).await?;
            Ok(res.map_into_left_body())
        })
    }
}

fn to_login() -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, "/login"))
        .finish()
}

pub mod session {
    use actix_web::{
        cookie::{time, Cookie, SameSite},
        HttpRequest,
    };
    use chrono::Utc;
    use jsonwebtoken::{decode, encode, errors::Error, Algorithm, DecodingKey, EncodingKey, Header, Validation};
    use serde::{Deserialize, Serialize};

    use super::SessionUser;

    pub const SESSION_COOKIE: &str = "__session";
    pub const SESSION_MAX_AGE_SECS: i64 = 60 * 60 * 24;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum FlashKind {
        Success,
        Error,
    }

    /// One-shot toast message, shown on the next page and then dropped.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Flash {
        #[serde(rename = "type")]
        pub kind: FlashKind,
        pub message: String,
    }

    #[derive(Clone)]
    pub struct SessionKeys {
        encoding: EncodingKey,
        decoding: DecodingKey,
        secure: bool,
    }

    impl SessionKeys {
        pub fn new(secret: &str, secure: bool) -> Self {
            Self {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
                secure,
            }
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Claims {
        user: Option<SessionUser>,
        flash: Option<Flash>,
        exp: usize,
    }

    /// Request-scoped session state. Loaded from the cookie, changed by the
    /// handler, and written back with `commit`.
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Session {
        pub user: Option<SessionUser>,
        pub flash: Option<Flash>,
    }

    impl Session {
        /// A missing, tampered or expired cookie yields an empty session.
        pub fn load(req: &HttpRequest, keys: &SessionKeys) -> Session {
            req.cookie(SESSION_COOKIE)
                .and_then(|cookie| Session::decode(cookie.value(), keys).ok())
                .unwrap_or_default()
        }

        pub fn current_user(&self) -> Option<&SessionUser> {
            self.user.as_ref()
        }

        pub fn set_user(&mut self, user: SessionUser) {
            self.user = Some(user);
        }

        pub fn clear_user(&mut self) {
            self.user = None;
        }

        pub fn set_flash(&mut self, kind: FlashKind, message: impl Into<String>) {
            self.flash = Some(Flash {
                kind,
                message: message.into(),
            });
        }

        pub fn take_flash(&mut self) -> Option<Flash> {
            self.flash.take()
        }

        pub fn encode(&self, keys: &SessionKeys) -> Result<String, Error> {
            let claims = Claims {
                user: self.user.clone(),
                flash: self.flash.clone(),
                exp: (Utc::now().timestamp() + SESSION_MAX_AGE_SECS) as usize,
            };
            encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
        }

        pub fn decode(token: &str, keys: &SessionKeys) -> Result<Session, Error> {
            let data = decode::<Claims>(token, &keys.decoding, &Validation::new(Algorithm::HS256))?;
            Ok(Session {
                user: data.claims.user,
                flash: data.claims.flash,
            })
        }

        /// Cookie to attach to the response.
        pub fn commit(&self, keys: &SessionKeys) -> Result<Cookie<'static>, Error> {
            let token = self.encode(keys)?;
            Ok(Cookie::build(SESSION_COOKIE, token)
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .secure(keys.secure)
                .max_age(time::Duration::seconds(SESSION_MAX_AGE_SECS))
                .finish())
        }

        /// Cookie that removes the session on the client.
        pub fn destroy() -> Cookie<'static> {
            let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
            cookie.make_removal();
            cookie
        }
    }
}

#[cfg(test)]
mod tests {
    use super::session::*;

    #[test]
    fn session_cookie_rejects_a_different_secret() {
        let keys = SessionKeys::new("first-secret", false);
        let mut session = Session::default();
        session.set_flash(FlashKind::Success, "Welcome back, Ada!");
        let token = session.encode(&keys).unwrap();

        assert_eq!(Session::decode(&token, &keys).unwrap(), session);
        let other = SessionKeys::new("second-secret", false);
        assert!(Session::decode(&token, &other).is_err());
    }

    #[test]
    fn flash_is_read_once() {
        let mut session = Session::default();
        session.set_flash(FlashKind::Error, "Invalid credentials. Try again.");
        assert_eq!(session.take_flash().map(|f| f.kind), Some(FlashKind::Error));
        assert!(session.take_flash().is_none());
    }
}

#[cfg(test)]
mod guard_tests {
    use super::session::SESSION_COOKIE;
    use super::*;
    use crate::dto::UpdateUserDto;
    use crate::service::testing::{admin_cookie, cookie_for, new_user, session_user, test_app_state, user_cookie};
    use actix_web::{http::StatusCode, test, web, App};

    async fn whoami(req: actix_web::HttpRequest) -> Result<HttpResponse, AppError> {
        let user = current_user(&req)?;
        Ok(HttpResponse::Ok().body(user.email))
    }

    macro_rules! guarded_app {
        ($state:expr) => {
            test::init_service(
                App::new().app_data($state.clone()).service(
                    web::scope("/admin")
                        .wrap(AuthMiddleware {
                            required: Permissions::MODERATE_EVENTS,
                        })
                        .route("", web::get().to(whoami)),
                ),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn guard_redirects_anonymous_and_forbids_plain_users() {
        let state = test_app_state();
        let app = guarded_app!(state);

        let res = test::call_service(&app, test::TestRequest::get().uri("/admin").to_request()).await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers().get(header::LOCATION).unwrap(), "/login");

        let req = test::TestRequest::get()
            .uri("/admin")
            .cookie(user_cookie(&state).await)
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::get()
            .uri("/admin")
            .cookie(admin_cookie(&state).await)
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "admin@example.com");
    }

    #[actix_web::test]
    async fn role_changes_apply_to_live_sessions() {
        let state = test_app_state();
        let account = state.users.create(new_user("mod@example.com")).await.unwrap();
        state.users.update(account.id, &UpdateUserDto::role(Role::Admin)).await.unwrap();
        let promoted = state.users.get(account.id).await.unwrap().unwrap();
        let cookie = cookie_for(&state, session_user(&promoted));
        let app = guarded_app!(state);

        let req = test::TestRequest::get().uri("/admin").cookie(cookie.clone()).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        state.users.update(account.id, &UpdateUserDto::role(Role::User)).await.unwrap();
        let req = test::TestRequest::get().uri("/admin").cookie(cookie.clone()).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        state.users.delete(account.id).await.unwrap();
        let req = test::TestRequest::get().uri("/admin").cookie(cookie).to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers().get(header::LOCATION).unwrap(), "/login");
        let removal = res.response().cookies().find(|c| c.name() == SESSION_COOKIE).unwrap();
        assert_eq!(removal.value(), "");
    }
}
