//! Local session persistence.
//!
//! The device holds at most one authenticated session, keyed by the
//! signed-in email. Whatever the platform provides for durable
//! key/value storage sits behind the [`SessionStore`] trait; the core
//! only ever saves, reads, and removes string fields by name.
//!
//! The persisted email is the sole authority for "is logged in" at
//! process start; no token expiry is checked locally. Cached profile
//! fields (full name, avatar, edited-name override) ride alongside and
//! are independent of authentication validity.

mod memory;
mod sqlite;

pub use memory::MemorySessionStore;
pub use sqlite::SqliteSessionStore;

use async_trait::async_trait;
use std::sync::Arc;

/// Well-known session store keys. Names are load-bearing: they match
/// the shipped client's storage, so an upgraded app keeps its session.
pub mod keys {
    /// The signed-in email; its presence means "logged in".
    pub const USERNAME: &str = "Username";
    /// Full name captured at signup.
    pub const USER_FULL_NAME: &str = "UserFullName";
    /// Avatar image reference (device URI).
    pub const PROFILE_IMAGE: &str = "ProfileImage";
    /// Locally-edited display name, overrides the signup name.
    pub const EDITED_NAME: &str = "newName";
}

/// Durable key/value persistence for the authenticated session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save(&self, key: &str, value: &str) -> anyhow::Result<()>;
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn remove(&self, key: &str) -> anyhow::Result<()>;
}

/// Typed view over a [`SessionStore`] for the fields this crate owns.
///
/// Read failures degrade to `None` and write failures are logged, the
/// same way the original client swallowed storage errors: a flaky
/// key/value store must never break an auth flow mid-transition.
#[derive(Clone)]
pub struct SessionFields {
    store: Arc<dyn SessionStore>,
}

impl SessionFields {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// The signed-in email, if a session is persisted.
    pub async fn signed_in_email(&self) -> Option<String> {
        self.read(keys::USERNAME).await
    }

    /// Persist the signed-in email. Logged, not fatal, on failure.
    pub async fn save_email(&self, email: &str) {
        self.write(keys::USERNAME, email).await;
    }

    /// Cache the full name captured at signup.
    pub async fn save_full_name(&self, full_name: &str) {
        self.write(keys::USER_FULL_NAME, full_name).await;
    }

    /// Cache an avatar reference.
    pub async fn save_avatar(&self, avatar_ref: &str) {
        self.write(keys::PROFILE_IMAGE, avatar_ref).await;
    }

    pub async fn avatar(&self) -> Option<String> {
        self.read(keys::PROFILE_IMAGE).await
    }

    /// Resolve the name to show on the profile screen. Precedence:
    /// locally-edited name, then signup full name, then the email.
    pub async fn display_name(&self) -> Option<String> {
        if let Some(name) = self.read(keys::EDITED_NAME).await {
            return Some(name);
        }
        if let Some(name) = self.read(keys::USER_FULL_NAME).await {
            return Some(name);
        }
        self.read(keys::USERNAME).await
    }

    /// Remove every field this crate owns. Each removal is attempted
    /// even if an earlier one fails; logout must always complete.
    pub async fn clear_all(&self) {
        for key in [
            keys::USERNAME,
            keys::USER_FULL_NAME,
            keys::PROFILE_IMAGE,
            keys::EDITED_NAME,
        ] {
            if let Err(err) = self.store.remove(key).await {
                tracing::warn!(key, error = %err, "Failed to remove session field");
            }
        }
    }

    async fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key).await {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(key, error = %err, "Failed to read session field");
                None
            }
        }
    }

    async fn write(&self, key: &str, value: &str) {
        if let Err(err) = self.store.save(key, value).await {
            tracing::warn!(key, error = %err, "Failed to save session field");
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> SessionFields {
        SessionFields::new(Arc::new(MemorySessionStore::new()))
    }

    #[tokio::test]
    async fn email_is_the_login_authority() {
        let session = fields();
        assert!(session.signed_in_email().await.is_none());

        session.save_email("user@x.com").await;
        assert_eq!(session.signed_in_email().await.as_deref(), Some("user@x.com"));
    }

    #[tokio::test]
    async fn display_name_prefers_edited_then_full_then_email() {
        let session = fields();
        session.save_email("user@x.com").await;
        assert_eq!(session.display_name().await.as_deref(), Some("user@x.com"));

        session.save_full_name("Rohit S").await;
        assert_eq!(session.display_name().await.as_deref(), Some("Rohit S"));

        session.write(keys::EDITED_NAME, "Ro").await;
        assert_eq!(session.display_name().await.as_deref(), Some("Ro"));
    }

    #[tokio::test]
    async fn clear_all_removes_every_field() {
        let session = fields();
        session.save_email("user@x.com").await;
        session.save_full_name("Rohit S").await;
        session.save_avatar("file:///avatar.jpg").await;
        session.write(keys::EDITED_NAME, "Ro").await;

        session.clear_all().await;

        assert!(session.signed_in_email().await.is_none());
        assert!(session.display_name().await.is_none());
        assert!(session.avatar().await.is_none());
    }

    struct FailingStore;

    #[async_trait]
    impl SessionStore for FailingStore {
        async fn save(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }

        async fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
            anyhow::bail!("disk full")
        }

        async fn remove(&self, _key: &str) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
    }

    #[tokio::test]
    async fn store_failures_degrade_instead_of_panicking() {
        let session = SessionFields::new(Arc::new(FailingStore));
        session.save_email("user@x.com").await;
        assert!(session.signed_in_email().await.is_none());
        session.clear_all().await;
    }
}
