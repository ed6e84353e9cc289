use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use log::{error, info};
use serde::Serialize;

use crate::{
    dto::ContactForm,
    errors::AppError,
    service::validation::{validate_email, validate_message, validate_text},
};

const EMAILJS_SEND_URL: &str = "https://api.emailjs.com/api/v1.0/email/send";
pub const RELAY_FAILED: &str = "Failed to send message.";

/// A contact message that passed validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

/// Delivers contact-form messages to the site operators.
#[async_trait]
pub trait EmailRelay: Send + Sync {
    async fn send(&self, message: &ContactMessage) -> Result<(), AppError>;
}

pub fn validate_contact(form: &ContactForm) -> Result<ContactMessage, AppError> {
    let mut errors = BTreeMap::new();
    if let Some(e) = validate_text(form.name.as_deref()) {
        errors.insert("name", e);
    }
    if let Some(e) = validate_email(form.email.as_deref()) {
        errors.insert("email", e);
    }
    if let Some(e) = validate_message(form.message.as_deref()) {
        errors.insert("message", e);
    }
    if !errors.is_empty() {
        return Err(AppError::FieldErrors(errors));
    }
    Ok(ContactMessage {
        name: form.name.clone().unwrap_or_default().trim().to_string(),
        email: form.email.clone().unwrap_or_default().trim().to_string(),
        subject: form.subject.clone().unwrap_or_default(),
        message: form.message.clone().unwrap_or_default(),
    })
}

pub struct EmailJsRelay {
    service_id: String,
    template_id: String,
    public_key: String,
    client: reqwest::Client,
}

impl EmailJsRelay {
    pub fn new(service_id: String, template_id: String, public_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            service_id,
            template_id,
            public_key,
            client,
        }
    }
}

#[derive(Serialize)]
struct EmailJsRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    template_params: &'a ContactMessage,
}

#[async_trait]
impl EmailRelay for EmailJsRelay {
    async fn send(&self, message: &ContactMessage) -> Result<(), AppError> {
        let body = EmailJsRequest {
            service_id: &self.service_id,
            template_id: &self.template_id,
            user_id: &self.public_key,
            template_params: message,
        };
        self.client
            .post(EMAILJS_SEND_URL)
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                error!("emailjs relay failed: {e}");
                AppError::Gateway(RELAY_FAILED.to_string())
            })?;
        info!("contact message from {} relayed", message.email);
        Ok(())
    }
}

pub struct DisabledRelay;

#[async_trait]
impl EmailRelay for DisabledRelay {
    async fn send(&self, _message: &ContactMessage) -> Result<(), AppError> {
        Err(AppError::Gateway(RELAY_FAILED.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: &str, email: &str, message: &str) -> ContactForm {
        ContactForm {
            name: Some(name.into()),
            email: Some(email.into()),
            subject: Some("Hello".into()),
            message: Some(message.into()),
        }
    }

    #[test]
    fn valid_form_becomes_a_message() {
        let msg = validate_contact(&form(" Ada ", "ada@example.com", "Hi there")).unwrap();
        assert_eq!(msg.name, "Ada");
        assert_eq!(msg.subject, "Hello");
    }

    #[test]
    fn every_bad_field_is_reported() {
        match validate_contact(&form("A", "nope", "  ")) {
            Err(AppError::FieldErrors(errors)) => {
                assert_eq!(errors.keys().copied().collect::<Vec<_>>(), vec!["email", "message", "name"]);
            }
            other => panic!("expected field errors, got {other:?}"),
        }
    }

    #[actix_rt::test]
    async fn disabled_relay_reports_the_failure_message() {
        let msg = validate_contact(&form("Ada", "ada@example.com", "Hi")).unwrap();
        match DisabledRelay.send(&msg).await {
            Err(AppError::Gateway(m)) => assert_eq!(m, RELAY_FAILED),
            other => panic!("unexpected {other:?}"),
        }
    }
}
