//! Device push-token binding.
//!
//! The remote token registry maps account emails to push-notification
//! device tokens. This module binds and unbinds the current device's
//! token around login, signup, logout, and token refresh.
//!
//! ## Design
//! - Binding is a convenience, never a precondition for being logged
//!   in: every failure here is logged at warning level and swallowed by
//!   the callers
//! - Registering an already-registered `(email, token)` pair is
//!   success: the registry de-duplicates, and treating the repeat as
//!   an error would make every app reinstall log a spurious failure
//! - `rebind` is best-effort, not transactional: a failed unbind never
//!   stops the bind half, and there is no rollback

mod http;

pub use http::HttpTokenRegistry;

use crate::error::TokenError;
use async_trait::async_trait;
use std::sync::Arc;

/// Remote registry surface (`/add-token`, `/remove-token`).
#[async_trait]
pub trait TokenRegistry: Send + Sync {
    /// Register `token` for `email`. Implementations must report an
    /// already-registered pair as success.
    async fn add_token(&self, email: &str, token: &str) -> Result<(), TokenError>;

    /// Remove the binding for `email`. With `None` the registry drops
    /// whatever token it holds for the email.
    async fn remove_token(&self, email: &str, token: Option<&str>) -> Result<(), TokenError>;
}

/// Where the device's current push token comes from (the messaging
/// SDK). `None` when the platform hasn't issued one yet or notification
/// permission was denied.
#[async_trait]
pub trait PushTokenSource: Send + Sync {
    async fn current_token(&self) -> Option<String>;
}

/// Binds and unbinds the device's push token for an account.
#[derive(Clone)]
pub struct TokenRegistrar {
    registry: Arc<dyn TokenRegistry>,
    source: Arc<dyn PushTokenSource>,
}

impl TokenRegistrar {
    pub fn new(registry: Arc<dyn TokenRegistry>, source: Arc<dyn PushTokenSource>) -> Self {
        Self { registry, source }
    }

    /// Bind an explicit token value.
    pub async fn bind(&self, email: &str, token: &str) -> Result<(), TokenError> {
        self.registry.add_token(email, token).await?;
        tracing::info!(email = %email, "Push token bound");
        Ok(())
    }

    /// Resolve the device's current token and bind it. Returns the
    /// token that was bound, or `None` when the device has no token.
    /// A missing token is not an error: a signup on a device that
    /// declined notifications still completes.
    pub async fn bind_device(&self, email: &str) -> Result<Option<String>, TokenError> {
        let Some(token) = self.source.current_token().await else {
            tracing::warn!(email = %email, "No push token available, skipping bind");
            return Ok(None);
        };
        self.bind(email, &token).await?;
        Ok(Some(token))
    }

    /// Remove the binding. With `token: None` the device's current
    /// token is resolved first; if none is available the registry is
    /// asked to drop the email's binding wholesale.
    pub async fn unbind(&self, email: &str, token: Option<&str>) -> Result<(), TokenError> {
        let resolved = match token {
            Some(value) => Some(value.to_string()),
            None => self.source.current_token().await,
        };
        self.registry
            .remove_token(email, resolved.as_deref())
            .await?;
        tracing::info!(email = %email, "Push token unbound");
        Ok(())
    }

    /// Replace `old_token` with `new_token` for `email`. The unbind
    /// half is best-effort; the bind half always runs. A transient
    /// double-bind between the halves is tolerated, a permanent one is
    /// not, hence old-before-new.
    pub async fn rebind(
        &self,
        email: &str,
        old_token: Option<&str>,
        new_token: &str,
    ) -> Result<(), TokenError> {
        if let Some(old) = old_token {
            if old != new_token {
                if let Err(err) = self.unbind(email, Some(old)).await {
                    tracing::warn!(email = %email, error = %err, "Failed to unbind old push token");
                }
            }
        }
        self.bind(email, new_token).await
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingRegistry {
        added: Mutex<Vec<(String, String)>>,
        removed: Mutex<Vec<(String, Option<String>)>>,
        remove_fails: bool,
        add_fails: bool,
    }

    #[async_trait]
    impl TokenRegistry for RecordingRegistry {
        async fn add_token(&self, email: &str, token: &str) -> Result<(), TokenError> {
            if self.add_fails {
                return Err(TokenError::Network("connection refused".into()));
            }
            self.added.lock().push((email.into(), token.into()));
            Ok(())
        }

        async fn remove_token(&self, email: &str, token: Option<&str>) -> Result<(), TokenError> {
            if self.remove_fails {
                return Err(TokenError::Network("connection refused".into()));
            }
            self.removed
                .lock()
                .push((email.into(), token.map(str::to_string)));
            Ok(())
        }
    }

    struct FixedSource {
        token: Option<String>,
        resolutions: AtomicUsize,
    }

    impl FixedSource {
        fn some(token: &str) -> Self {
            Self {
                token: Some(token.into()),
                resolutions: AtomicUsize::new(0),
            }
        }

        fn none() -> Self {
            Self {
                token: None,
                resolutions: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PushTokenSource for FixedSource {
        async fn current_token(&self) -> Option<String> {
            self.resolutions.fetch_add(1, Ordering::SeqCst);
            self.token.clone()
        }
    }

    fn registrar(
        registry: RecordingRegistry,
        source: FixedSource,
    ) -> (TokenRegistrar, Arc<RecordingRegistry>, Arc<FixedSource>) {
        let registry = Arc::new(registry);
        let source = Arc::new(source);
        (
            TokenRegistrar::new(Arc::clone(&registry) as _, Arc::clone(&source) as _),
            registry,
            source,
        )
    }

    #[tokio::test]
    async fn bind_device_resolves_and_reports_the_token() {
        let (registrar, registry, _) =
            registrar(RecordingRegistry::default(), FixedSource::some("fcm-abc"));

        let bound = registrar.bind_device("user@x.com").await.unwrap();
        assert_eq!(bound.as_deref(), Some("fcm-abc"));
        assert_eq!(
            registry.added.lock().as_slice(),
            &[("user@x.com".to_string(), "fcm-abc".to_string())]
        );
    }

    #[tokio::test]
    async fn bind_device_without_a_token_is_not_an_error() {
        let (registrar, registry, _) =
            registrar(RecordingRegistry::default(), FixedSource::none());

        let bound = registrar.bind_device("user@x.com").await.unwrap();
        assert_eq!(bound, None);
        assert!(registry.added.lock().is_empty());
    }

    #[tokio::test]
    async fn unbind_resolves_the_token_when_omitted() {
        let (registrar, registry, source) =
            registrar(RecordingRegistry::default(), FixedSource::some("fcm-abc"));

        registrar.unbind("user@x.com", None).await.unwrap();
        assert_eq!(source.resolutions.load(Ordering::SeqCst), 1);
        assert_eq!(
            registry.removed.lock().as_slice(),
            &[("user@x.com".to_string(), Some("fcm-abc".to_string()))]
        );
    }

    #[tokio::test]
    async fn unbind_with_no_resolvable_token_drops_by_email() {
        let (registrar, registry, _) =
            registrar(RecordingRegistry::default(), FixedSource::none());

        registrar.unbind("user@x.com", None).await.unwrap();
        assert_eq!(
            registry.removed.lock().as_slice(),
            &[("user@x.com".to_string(), None)]
        );
    }

    #[tokio::test]
    async fn rebind_unbinds_old_then_binds_new() {
        let (registrar, registry, _) =
            registrar(RecordingRegistry::default(), FixedSource::some("fcm-new"));

        registrar
            .rebind("user@x.com", Some("fcm-old"), "fcm-new")
            .await
            .unwrap();

        assert_eq!(
            registry.removed.lock().as_slice(),
            &[("user@x.com".to_string(), Some("fcm-old".to_string()))]
        );
        assert_eq!(
            registry.added.lock().as_slice(),
            &[("user@x.com".to_string(), "fcm-new".to_string())]
        );
    }

    #[tokio::test]
    async fn rebind_without_old_token_degrades_to_plain_bind() {
        let (registrar, registry, _) =
            registrar(RecordingRegistry::default(), FixedSource::some("fcm-new"));

        registrar.rebind("user@x.com", None, "fcm-new").await.unwrap();
        assert!(registry.removed.lock().is_empty());
        assert_eq!(registry.added.lock().len(), 1);
    }

    #[tokio::test]
    async fn rebind_survives_a_failed_unbind() {
        let registry = RecordingRegistry {
            remove_fails: true,
            ..RecordingRegistry::default()
        };
        let (registrar, registry, _) = registrar(registry, FixedSource::some("fcm-new"));

        registrar
            .rebind("user@x.com", Some("fcm-old"), "fcm-new")
            .await
            .unwrap();
        assert_eq!(registry.added.lock().len(), 1, "bind half must still run");
    }

    #[tokio::test]
    async fn rebind_with_unchanged_token_skips_the_unbind() {
        let (registrar, registry, _) =
            registrar(RecordingRegistry::default(), FixedSource::some("fcm-abc"));

        registrar
            .rebind("user@x.com", Some("fcm-abc"), "fcm-abc")
            .await
            .unwrap();
        assert!(registry.removed.lock().is_empty());
        assert_eq!(registry.added.lock().len(), 1);
    }
}
