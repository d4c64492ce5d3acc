//! sea-orm entities backing the credential store.

pub mod access_token;
pub mod authorization_code;
pub mod client;
pub mod email_token;
pub mod refresh_token;
pub mod role;
pub mod scope;
pub mod user;
