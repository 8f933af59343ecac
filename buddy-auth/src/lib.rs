//! # buddy-auth
//!
//! User accounts for Research Buddy: signup, login by username or email,
//! profile edits and password changes, stored in SQLite through `sqlx`.
//!
//! Passwords are kept as unsalted SHA-256 hex digests.

pub mod error;
pub mod store;
pub mod user;

pub use error::{AuthError, Result};
pub use store::UserStore;
pub use user::{NewUser, ProfileUpdate, User, UserExists, hash_password, is_valid_email};
