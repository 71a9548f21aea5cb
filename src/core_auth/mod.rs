pub mod authenticator;
pub mod error;
pub mod permissions;

pub use authenticator::Authenticator;
pub use error::AuthError;
pub use permissions::{check_permission, Permission};
