pub mod auth;
pub mod checkout;
pub mod contact;
pub mod crypto;
pub mod event;
pub mod filter;
pub mod log;
pub mod tools;
pub mod user;
pub mod validation;

#[cfg(test)]
pub mod testing;
