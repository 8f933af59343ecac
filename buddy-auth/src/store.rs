//! SQLite-backed account store.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{AuthError, Result};
use crate::user::{NewUser, ProfileUpdate, User, UserExists, hash_password, is_valid_email};

const USER_COLUMNS: &str = "user_id, username, email, hash_passwd, f_name, l_name, profile_path";

#[derive(sqlx::FromRow)]
struct UserRow {
    user_id: String,
    username: String,
    email: String,
    hash_passwd: String,
    f_name: Option<String>,
    l_name: Option<String>,
    profile_path: Option<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            user_id: row.user_id,
            username: row.username,
            email: row.email,
            first_name: row.f_name,
            last_name: row.l_name,
            profile_path: row.profile_path,
        }
    }
}

/// Account CRUD over a SQLite pool.
///
/// # Example
///
/// ```rust,ignore
/// use buddy_auth::{NewUser, UserStore};
///
/// let store = UserStore::connect("sqlite://users.db").await?;
/// let user_id = store.create_user(new_user).await?;
/// let user = store.verify_user("ada@example.com", "secret").await?;
/// ```
#[derive(Debug, Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

impl UserStore {
    /// Open (creating if needed) the database at `database_url` and run
    /// migrations.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().max_connections(5).connect_with(options).await?;
        let store = Self { pool };
        store.migrate().await?;
        info!(database_url, "user store ready");
        Ok(store)
    }

    /// A private in-memory database, mainly for tests.
    pub async fn in_memory() -> Result<Self> {
        // Each SQLite connection gets its own in-memory database, so the pool
        // must hold exactly one connection for its whole life.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Wrap an existing pool. Call [`migrate`](Self::migrate) before use.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the `users` table if it does not exist.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                user_id TEXT PRIMARY KEY,
                username TEXT UNIQUE NOT NULL,
                email TEXT UNIQUE NOT NULL,
                hash_passwd TEXT NOT NULL,
                f_name TEXT,
                l_name TEXT,
                profile_path TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Register a new account and return its id.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Validation`] if username, email or password is blank
    /// - [`AuthError::UsernameTaken`] / [`AuthError::EmailTaken`] on duplicates
    pub async fn create_user(&self, new_user: NewUser) -> Result<String> {
        let username = new_user.username.trim();
        let email = new_user.email.trim();
        if username.is_empty() || email.is_empty() || new_user.password.is_empty() {
            return Err(AuthError::Validation("Missing required fields".to_string()));
        }

        let existing = self.check_user_exists(Some(username), Some(email)).await?;
        if existing.username_exists {
            return Err(AuthError::UsernameTaken);
        }
        if existing.email_exists {
            return Err(AuthError::EmailTaken);
        }

        let user_id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO users (user_id, username, email, hash_passwd, f_name, l_name) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&user_id)
        .bind(username)
        .bind(email)
        .bind(hash_password(&new_user.password))
        .bind(new_user.first_name.as_deref())
        .bind(new_user.last_name.as_deref())
        .execute(&self.pool)
        .await
        .map_err(duplicate_to_taken)?;

        info!(user_id = %user_id, username, "created user");
        Ok(user_id)
    }

    /// Report whether `username` and/or `email` are already registered.
    pub async fn check_user_exists(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<UserExists> {
        let mut exists = UserExists::default();
        if let Some(username) = username {
            exists.username_exists = sqlx::query("SELECT 1 FROM users WHERE username = ? LIMIT 1")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?
                .is_some();
        }
        if let Some(email) = email {
            exists.email_exists = sqlx::query("SELECT 1 FROM users WHERE email = ? LIMIT 1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?
                .is_some();
        }
        Ok(exists)
    }

    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<UserRow>> {
        let column = if is_valid_email(identifier) { "email" } else { "username" };
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {column} = ? LIMIT 1"
        ))
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Check a password for the account named by `identifier`, which is an
    /// email if it looks like one and a username otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for an unknown account or a
    /// wrong password.
    pub async fn verify_user(&self, identifier: &str, password: &str) -> Result<User> {
        match self.find_by_identifier(identifier.trim()).await? {
            Some(row) if row.hash_passwd == hash_password(password) => {
                debug!(user_id = %row.user_id, "login succeeded");
                Ok(row.into())
            }
            _ => {
                warn!("login failed");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// Fetch an account by id.
    pub async fn get_user(&self, user_id: &str) -> Result<User> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::from)
            .ok_or_else(|| AuthError::NotFound(user_id.to_string()))
    }

    /// Change the given profile fields and return the updated account.
    pub async fn update_profile(&self, user_id: &str, update: ProfileUpdate) -> Result<User> {
        let result = sqlx::query(
            "UPDATE users SET \
                f_name = COALESCE(?, f_name), \
                l_name = COALESCE(?, l_name), \
                profile_path = COALESCE(?, profile_path) \
             WHERE user_id = ?",
        )
        .bind(update.first_name.as_deref())
        .bind(update.last_name.as_deref())
        .bind(update.profile_path.as_deref())
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AuthError::NotFound(user_id.to_string()));
        }
        debug!(user_id, "updated profile");
        self.get_user(user_id).await
    }

    /// Replace the password after checking the current one.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Validation`] if `new_password` is empty
    /// - [`AuthError::InvalidCredentials`] if `current_password` is wrong
    pub async fn update_password(
        &self,
        identifier: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<User> {
        if new_password.is_empty() {
            return Err(AuthError::Validation("New password must not be empty".to_string()));
        }
        let user = self.verify_user(identifier, current_password).await?;
        sqlx::query("UPDATE users SET hash_passwd = ? WHERE user_id = ?")
            .bind(hash_password(new_password))
            .bind(&user.user_id)
            .execute(&self.pool)
            .await?;
        info!(user_id = %user.user_id, "password updated");
        Ok(user)
    }
}

/// Map a UNIQUE constraint race to the matching domain error.
fn duplicate_to_taken(e: sqlx::Error) -> AuthError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return if db.message().contains("username") {
                AuthError::UsernameTaken
            } else {
                AuthError::EmailTaken
            };
        }
    }
    AuthError::Database(e)
}
