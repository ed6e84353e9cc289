use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::Utc;
use log::{info, warn};
use uuid::Uuid;

use crate::{
    db::UserStore,
    dto::{LoginForm, ProfileForm, SignupForm, UpdateUserDto},
    errors::{AppError, StoreError},
    models::{NewUser, Role, User},
    service::{event::parse_id, validation},
};

use super::crypto;

pub const EMAIL_IN_USE: &str = "Email already in use";

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn email_taken() -> AppError {
    AppError::FieldErrors(BTreeMap::from([("email", EMAIL_IN_USE.to_string())]))
}

/// Creates a `user` account. Field problems come back keyed by form field name.
pub async fn signup(form: &SignupForm, store: &dyn UserStore) -> Result<User, AppError> {
    let mut errors = BTreeMap::new();
    if let Some(e) = validation::validate_text(form.name.as_deref()) {
        errors.insert("name", e);
    }
    if let Some(e) = validation::validate_email(form.email.as_deref()) {
        errors.insert("email", e);
    }
    if let Some(e) = validation::validate_password(form.password.as_deref()) {
        errors.insert("password", e);
    }
    if let Some(e) = validation::validate_confirm_password(form.password.as_deref(), form.confirm_password.as_deref()) {
        errors.insert("confirmPassword", e);
    }
    if !errors.is_empty() {
        return Err(AppError::FieldErrors(errors));
    }

    let email = normalize_email(form.email.as_deref().unwrap_or_default());
    if store.get_by_email(&email).await?.is_some() {
        return Err(email_taken());
    }
    let password = crypto::hash_password(form.password.as_deref().unwrap_or_default()).await?;
    let new_user = NewUser {
        name: form.name.as_deref().unwrap_or_default().trim().to_string(),
        email,
        password,
        created_at: Utc::now(),
    };
    // two signups racing past the lookup still collide on the unique email
    match store.create(new_user).await {
        Ok(user) => {
            info!("account {} created", user.email);
            Ok(user)
        }
        Err(StoreError::DuplicateKey) => Err(email_taken()),
        Err(err) => Err(err.into()),
    }
}

pub async fn login(form: &LoginForm, store: &dyn UserStore) -> Result<User, AppError> {
    let (Some(email), Some(password)) = (form.email.as_deref(), form.password.as_deref()) else {
        return Err(AppError::Unauthorized);
    };
    let user = store
        .get_by_email(&normalize_email(email))
        .await?
        .ok_or(AppError::Unauthorized)?;
    if !crypto::verify_password(password, &user.password).await? {
        warn!("failed login for {}", user.email);
        return Err(AppError::Unauthorized);
    }
    Ok(user)
}

pub async fn get_all(store: &dyn UserStore) -> Result<Vec<User>, AppError> {
    Ok(store.get_all().await?)
}

pub async fn get_by_id(id: &str, store: &dyn UserStore) -> Result<User, AppError> {
    let id = parse_id(id)?;
    store.get(id).await?.ok_or(AppError::NotFound)
}

pub async fn count(store: &dyn UserStore) -> Result<u64, AppError> {
    Ok(store.count().await?)
}

/// Saves a new name and email for the account and returns the stored record.
pub async fn update_profile(id: Uuid, form: &ProfileForm, store: &dyn UserStore) -> Result<User, AppError> {
    let mut errors = BTreeMap::new();
    if let Some(e) = validation::validate_text(form.name.as_deref()) {
        errors.insert("name", e);
    }
    if let Some(e) = validation::validate_email(form.email.as_deref()) {
        errors.insert("email", e);
    }
    if !errors.is_empty() {
        return Err(AppError::FieldErrors(errors));
    }
    let fields = UpdateUserDto {
        name: form.name.as_deref().map(|n| n.trim().to_string()),
        email: form.email.as_deref().map(normalize_email),
        role: None,
    };
    match store.update(id, &fields).await {
        Ok(0) => Err(AppError::NotFound),
        Ok(_) => store.get(id).await?.ok_or(AppError::NotFound),
        Err(StoreError::DuplicateKey) => Err(email_taken()),
        Err(err) => Err(err.into()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    Promote,
    Demote,
    Delete,
}

impl FromStr for UserAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "promote" => Ok(UserAction::Promote),
            "demote" => Ok(UserAction::Demote),
            "delete" => Ok(UserAction::Delete),
            _ => Err(AppError::BadClientData),
        }
    }
}

/// Role changes and deletions from the user administration pages.
pub async fn apply(action: UserAction, id: Uuid, store: &dyn UserStore) -> Result<(), AppError> {
    let touched = match action {
        UserAction::Promote => store.update(id, &UpdateUserDto::role(Role::Admin)).await?,
        UserAction::Demote => store.update(id, &UpdateUserDto::role(Role::User)).await?,
        UserAction::Delete => store.delete(id).await?,
    };
    if touched == 0 {
        info!("user {:?} on {} matched no account", action, id);
    } else {
        info!("user {:?} applied to account {}", action, id);
    }
    Ok(())
}
