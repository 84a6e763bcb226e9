//! Session resolution
//!
//! Obtains the durable analysis session for a (user, source connection)
//! pair. The backend upserts on that key, so resolving twice with the same
//! key yields the same session.

use std::sync::Arc;

use mm_client::{MigrationBackend, SessionRequest};
use mm_types::{ConnectionDescriptor, SessionId, SessionKey, UserId};
use serde::Serialize;

use crate::error::{MigrationError, MigrationResult};

/// Session handed to downstream components
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedSession {
    pub session_id: SessionId,
    pub is_existing: bool,
    pub has_analysis: bool,
    pub has_migration_plan: bool,
    pub last_analyzed_at: Option<String>,
}

/// Creates or resumes analysis sessions
pub struct SessionResolver<B: ?Sized> {
    backend: Arc<B>,
}

impl<B: MigrationBackend + ?Sized> SessionResolver<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Create or resume the session for `user` and `connection`
    ///
    /// # Errors
    /// `NotAuthenticated` without a user (no call is made); backend failures otherwise.
    pub async fn resolve(
        &self,
        user: Option<&UserId>,
        connection: &ConnectionDescriptor,
    ) -> MigrationResult<ResolvedSession> {
        let Some(user) = user else {
            tracing::warn!("session resolution blocked: no authenticated user");
            return Err(MigrationError::NotAuthenticated);
        };

        let connection = connection.resolved();
        let key = SessionKey::new(user.clone(), &connection);
        tracing::debug!(fingerprint = %key.fingerprint(), "resolving session");

        let response = self
            .backend
            .get_or_create_session(&SessionRequest::new(user.clone(), &connection))
            .await?;

        tracing::info!(
            session_id = %response.session_id,
            existing = response.is_existing,
            has_analysis = response.has_analysis,
            "session resolved"
        );

        Ok(ResolvedSession {
            session_id: response.session_id,
            is_existing: response.is_existing,
            has_analysis: response.has_analysis,
            has_migration_plan: response.has_migration_plan,
            last_analyzed_at: response.last_analyzed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mm_test_utils::{sample_connection, sample_session_key, sample_user, Endpoint, MockBackend};

    #[tokio::test]
    async fn missing_user_blocks_without_a_call() {
        let backend = Arc::new(MockBackend::new());
        let resolver = SessionResolver::new(Arc::clone(&backend));
        let err = resolver.resolve(None, &sample_connection()).await.unwrap_err();
        assert_eq!(err, MigrationError::NotAuthenticated);
        assert_eq!(backend.call_count(Endpoint::Session), 0);
    }

    #[tokio::test]
    async fn fresh_session_has_no_analysis() {
        let backend = Arc::new(MockBackend::new());
        let resolved = SessionResolver::new(backend)
            .resolve(Some(&sample_user()), &sample_connection())
            .await
            .unwrap();
        assert!(!resolved.is_existing);
        assert!(!resolved.has_analysis);
        assert!(!resolved.has_migration_plan);
    }

    #[tokio::test]
    async fn resumes_previous_session() {
        let backend = Arc::new(MockBackend::new());
        let seeded = backend.seed_session(&sample_session_key(), true);
        let resolved = SessionResolver::new(backend)
            .resolve(Some(&sample_user()), &sample_connection())
            .await
            .unwrap();
        assert_eq!(resolved.session_id, seeded);
        assert!(resolved.is_existing);
        assert!(resolved.has_analysis);
        assert!(resolved.last_analyzed_at.is_some());
    }
}
