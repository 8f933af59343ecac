//! Account data types and credential helpers.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

static EMAIL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").ok());

/// A stored account, without its password hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// UUID v4.
    pub user_id: String,
    /// Unique login name.
    pub username: String,
    /// Unique email address.
    pub email: String,
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
    /// Path of the uploaded profile picture.
    pub profile_path: Option<String>,
}

/// Signup payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    /// Requested username.
    #[serde(default)]
    pub username: String,
    /// Email address.
    #[serde(default)]
    pub email: String,
    /// Plain-text password; only its digest is stored.
    #[serde(default)]
    pub password: String,
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
}

/// Profile fields to change. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    /// New given name.
    pub first_name: Option<String>,
    /// New family name.
    pub last_name: Option<String>,
    /// New profile picture path.
    pub profile_path: Option<String>,
}

/// Result of [`UserStore::check_user_exists`](crate::UserStore::check_user_exists).
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct UserExists {
    /// The username is taken.
    pub username_exists: bool,
    /// The email is taken.
    pub email_exists: bool,
}

/// Whether `identifier` looks like an email address rather than a username.
pub fn is_valid_email(identifier: &str) -> bool {
    EMAIL_PATTERN.as_ref().is_some_and(|pattern| pattern.is_match(identifier))
}

/// Lower-case hex SHA-256 digest of `password`.
pub fn hash_password(password: &str) -> String {
    Sha256::digest(password.as_bytes()).iter().map(|b| format!("{b:02x}")).collect()
}
