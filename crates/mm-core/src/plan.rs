//! Plan generation

use std::sync::Arc;

use mm_client::MigrationBackend;
use mm_types::{MigrationPlan, SessionId};

use crate::analysis::Artifacts;
use crate::error::{MigrationError, MigrationResult};

/// Synthesizes the relational plan from the discovered schema
pub struct PlanGenerator<B: ?Sized> {
    backend: Arc<B>,
}

impl<B: MigrationBackend + ?Sized> PlanGenerator<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Generation needs at least one loaded schema collection
    #[inline]
    pub fn is_enabled(artifacts: &Artifacts) -> bool {
        !artifacts.schema.is_empty()
    }

    /// Generate the plan and replace the stored one.
    ///
    /// # Errors
    /// `PlanPrerequisite` without a loaded schema (no call is made); the
    /// backend error otherwise. The stored plan is untouched on failure.
    pub async fn generate(
        &self,
        session_id: &SessionId,
        artifacts: &mut Artifacts,
    ) -> MigrationResult<MigrationPlan> {
        if !Self::is_enabled(artifacts) {
            return Err(MigrationError::PlanPrerequisite);
        }

        tracing::info!(%session_id, "generating migration plan");
        let plan = self.backend.generate_plan(session_id).await.map_err(|err| {
            tracing::info!(%session_id, "plan generation failed: {err}");
            MigrationError::from(err)
        })?;

        tracing::info!(
            %session_id,
            tables = plan.table_mappings.len(),
            steps = plan.migration_steps.len(),
            "migration plan generated"
        );
        artifacts.plan = Some(plan.clone());
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mm_client::ClientError;
    use mm_test_utils::{sample_fields, sample_plan, sample_session_key, Endpoint, MockBackend};

    fn loaded() -> Artifacts {
        Artifacts {
            schema: sample_fields().into_iter().collect(),
            ..Artifacts::default()
        }
    }

    #[tokio::test]
    async fn requires_loaded_schema() {
        let backend = Arc::new(MockBackend::seeded());
        let id = backend.seed_session(&sample_session_key(), true);
        let mut artifacts = Artifacts::default();
        let err = PlanGenerator::new(Arc::clone(&backend))
            .generate(&id, &mut artifacts)
            .await
            .unwrap_err();
        assert_eq!(err, MigrationError::PlanPrerequisite);
        assert_eq!(backend.call_count(Endpoint::GeneratePlan), 0);
    }

    #[tokio::test]
    async fn regeneration_replaces_plan() {
        let backend = Arc::new(MockBackend::seeded());
        let id = backend.seed_session(&sample_session_key(), true);
        let generator = PlanGenerator::new(Arc::clone(&backend));
        let mut artifacts = loaded();

        generator.generate(&id, &mut artifacts).await.unwrap();
        generator.generate(&id, &mut artifacts).await.unwrap();
        assert_eq!(artifacts.plan, Some(sample_plan()));
        assert_eq!(backend.call_count(Endpoint::GeneratePlan), 2);
    }

    #[tokio::test]
    async fn failure_keeps_displayed_plan() {
        let backend = Arc::new(MockBackend::seeded());
        let id = backend.seed_session(&sample_session_key(), true);
        let mut artifacts = loaded();
        artifacts.plan = Some(MigrationPlan::default());

        backend.fail(
            Endpoint::GeneratePlan,
            ClientError::Rejected("Schema not found. Run analysis first.".into()),
        );
        let err = PlanGenerator::new(backend)
            .generate(&id, &mut artifacts)
            .await
            .unwrap_err();
        assert_eq!(err.operator_message(), "Schema not found. Run analysis first.");
        assert_eq!(artifacts.plan, Some(MigrationPlan::default()));
    }
}
