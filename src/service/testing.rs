//! Builders and fakes shared by the test modules.

use std::sync::{Arc, Mutex};

use actix_web::{cookie::Cookie, web};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use once_cell::sync::Lazy;

use crate::{
    db::{memory::MemoryStore, EventStore},
    dto::{NewEventForm, UpdateEventDto, UpdateUserDto},
    errors::AppError,
    models::{Category, Event, EventStatus, Location, NewEvent, NewUser, Role, User},
    service::{
        auth::{
            session::{Session, SessionKeys},
            SessionUser,
        },
        checkout::CheckoutGateway,
        contact::{ContactMessage, EmailRelay, RELAY_FAILED},
    },
    AppState,
};

pub const TEST_SECRET: &str = "test-session-secret";
/// Hash of the password "secret1", computed once for every fixture account.
static SECRET1_HASH: Lazy<String> = Lazy::new(|| crate::service::crypto::hash_encoded("secret1").unwrap());

pub const CHECKOUT_URL: &str = "https://checkout.example.com/c/session_1";

pub fn new_event(title: &str, category: Category) -> NewEvent {
    new_event_for(title, category, "organizer@example.com")
}

pub fn new_event_for(title: &str, category: Category, contact: &str) -> NewEvent {
    NewEvent {
        title: title.to_string(),
        category,
        date: Utc::now() + Duration::days(7),
        location: Location {
            name: "Uhuru Gardens".to_string(),
            city: Some("Nairobi".to_string()),
        },
        organizer: "Test Organizer".to_string(),
        contact: contact.to_string(),
        duration_minutes: 120,
        description: format!("{title} description"),
        image_url: "https://images.example.com/event.jpg".to_string(),
        is_free: true,
        fee_structure: Vec::new(),
        created_at: Utc::now(),
    }
}

/// A submission the validator admits.
pub fn event_form(title: &str) -> NewEventForm {
    NewEventForm {
        title: Some(title.to_string()),
        category: Some("Sports".to_string()),
        date: Some("2030-06-01T15:00".to_string()),
        location_name: Some("Kasarani Stadium".to_string()),
        location_city: Some("Nairobi".to_string()),
        organizer: Some("Test Organizer".to_string()),
        contact: Some("organizer@example.com".to_string()),
        duration_minutes: Some("120".to_string()),
        description: Some(format!("{title} description")),
        is_free: Some("true".to_string()),
        ticket_price: None,
        image_url: Some("https://images.example.com/event.jpg".to_string()),
    }
}

pub fn new_user(email: &str) -> NewUser {
    NewUser {
        name: "Test User".to_string(),
        email: email.to_string(),
        password: SECRET1_HASH.clone(),
        created_at: Utc::now(),
    }
}

pub async fn approved_event(store: &dyn EventStore, title: &str, category: Category) -> Event {
    let event = store.create(new_event(title, category)).await.unwrap();
    store
        .update(event.id, &UpdateEventDto::status(EventStatus::Approved))
        .await
        .unwrap();
    store.get(event.id).await.unwrap().unwrap()
}

#[derive(Default)]
pub struct FakeCheckout {
    pub fail: bool,
    pub requests: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl CheckoutGateway for FakeCheckout {
    async fn create_session(&self, price_id: &str, origin: &str) -> Result<String, AppError> {
        self.requests
            .lock()
            .unwrap()
            .push((price_id.to_string(), origin.to_string()));
        if self.fail {
            Err(AppError::Gateway("checkout session failed".to_string()))
        } else {
            Ok(CHECKOUT_URL.to_string())
        }
    }
}

#[derive(Default)]
pub struct FakeRelay {
    pub fail: bool,
    pub sent: Mutex<Vec<ContactMessage>>,
}

#[async_trait]
impl EmailRelay for FakeRelay {
    async fn send(&self, message: &ContactMessage) -> Result<(), AppError> {
        if self.fail {
            return Err(AppError::Gateway(RELAY_FAILED.to_string()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

pub fn test_app_state() -> web::Data<AppState> {
    test_app_state_with(Arc::new(FakeCheckout::default()), Arc::new(FakeRelay::default()))
}

pub fn test_app_state_with(checkout: Arc<dyn CheckoutGateway>, relay: Arc<dyn EmailRelay>) -> web::Data<AppState> {
    let store = Arc::new(MemoryStore::new());
    web::Data::new(AppState {
        events: store.clone(),
        users: store,
        sessions: SessionKeys::new(TEST_SECRET, false),
        checkout,
        relay,
    })
}

pub fn session_user(user: &User) -> SessionUser {
    SessionUser {
        id: user.id,
        name: user.name.clone(),
        email: user.email.clone(),
        role: user.role,
    }
}

pub fn cookie_for(state: &AppState, user: SessionUser) -> Cookie<'static> {
    let mut session = Session::default();
    session.set_user(user);
    session.commit(&state.sessions).unwrap()
}

/// Session cookie for a stored account with `role`, created on first use.
pub async fn account_cookie(state: &AppState, email: &str, role: Role) -> Cookie<'static> {
    let account = match state.users.get_by_email(email).await.unwrap() {
        Some(account) => account,
        None => state.users.create(new_user(email)).await.unwrap(),
    };
    if account.role != role {
        state.users.update(account.id, &UpdateUserDto::role(role)).await.unwrap();
    }
    cookie_for(state, SessionUser { role, ..session_user(&account) })
}

pub async fn user_cookie(state: &AppState) -> Cookie<'static> {
    account_cookie(state, "user@example.com", Role::User).await
}

pub async fn admin_cookie(state: &AppState) -> Cookie<'static> {
    account_cookie(state, "admin@example.com", Role::Admin).await
}

/// Reads the session a response set, if any.
pub fn session_from(res: &actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>, state: &AppState) -> Session {
    res.response()
        .cookies()
        .find(|c| c.name() == crate::service::auth::session::SESSION_COOKIE)
        .and_then(|c| Session::decode(c.value(), &state.sessions).ok())
        .unwrap_or_default()
}
