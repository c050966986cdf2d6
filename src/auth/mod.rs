pub mod models;
pub mod store;

pub use models::{AuthEvent, Credential, Platform};
pub use store::CredentialStore;
