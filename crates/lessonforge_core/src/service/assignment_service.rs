//! Assignment use-case service.
//!
//! # Responsibility
//! - Deploy published templates as independent assignment instances.
//! - Maintain per-instance visibility windows.
//!
//! # Invariants
//! - Visibility windows are validated before any store call.
//! - Deployment always reads the template fresh from the store; instance
//!   rows are written header, then parts, then activities.
//! - When a content insert fails the instance header is deleted, so no
//!   empty instance is left behind.
//! - Instance operations never read or write template rows.

use crate::budget::DeploymentBudget;
use crate::eligibility::eligible_targets;
use crate::error::{EngineError, EngineResult};
use crate::identity::{require_user, IdentityProvider};
use crate::materializer::materialize;
use crate::model::instance::{AssignmentInstance, DeploymentTarget, InstanceId};
use crate::model::template::{TemplateId, UserId};
use crate::repo::{load_document, load_instance, StoreError, StoreResult, TemplateStore};
use crate::visibility::VisibilityWindow;
use log::{error, info, warn};
use std::time::Instant;

/// Successful deployment: the stored instance and the budget after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub instance: AssignmentInstance,
    pub budget: DeploymentBudget,
}

/// Assignment facade over a template store and identity provider.
pub struct AssignmentService<'s, S: TemplateStore + ?Sized, I: IdentityProvider + ?Sized> {
    store: &'s S,
    identity: &'s I,
}

impl<'s, S: TemplateStore + ?Sized, I: IdentityProvider + ?Sized> AssignmentService<'s, S, I> {
    pub fn new(store: &'s S, identity: &'s I) -> Self {
        Self { store, identity }
    }

    /// Filters `candidates` to those the stored template may be deployed to.
    pub fn eligible_targets<'a>(
        &self,
        template_id: TemplateId,
        candidates: &'a [DeploymentTarget],
    ) -> EngineResult<Vec<&'a DeploymentTarget>> {
        let template = self
            .store
            .read_template(template_id)?
            .ok_or(EngineError::TemplateNotFound(template_id))?;
        Ok(eligible_targets(&template, candidates))
    }

    /// Deploys a published template to one target.
    ///
    /// # Errors
    /// - `Visibility` before any store call when `window` is inconsistent.
    /// - `BudgetExhausted` when `budget` has nothing left.
    /// - `Unauthenticated` when nobody is signed in.
    /// - `TemplateNotFound`, `NotPublished`, `TargetInvalid` from the fresh read.
    /// - `Store` from the first failing insert; later inserts are skipped and
    ///   an already inserted header is deleted again.
    pub fn deploy(
        &self,
        template_id: TemplateId,
        target: &DeploymentTarget,
        window: Option<VisibilityWindow>,
        budget: DeploymentBudget,
    ) -> EngineResult<Deployment> {
        if let Some(window) = &window {
            window.validate()?;
        }
        budget.ensure_available()?;
        let assigned_by = require_user(self.identity)?;

        let started_at = Instant::now();
        info!(
            "event=assignment_deploy module=assignment status=start template_id={} schedule_id={}",
            template_id, target.schedule_id
        );

        match self.materialize_and_insert(template_id, target, window, assigned_by) {
            Ok(instance) => {
                let budget = budget.consume()?;
                info!(
                    "event=assignment_deploy module=assignment status=ok template_id={} instance_id={} parts={} duration_ms={}",
                    template_id,
                    instance.id(),
                    instance.parts.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(Deployment { instance, budget })
            }
            Err(err) => {
                error!(
                    "event=assignment_deploy module=assignment status=error template_id={} error_kind={} error={}",
                    template_id,
                    err.kind(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Loads one instance with its copied content.
    pub fn load_instance(&self, instance_id: InstanceId) -> EngineResult<AssignmentInstance> {
        load_instance(self.store, instance_id)?.ok_or(EngineError::InstanceNotFound(instance_id))
    }

    /// Replaces an instance's visibility window.
    pub fn update_visibility(
        &self,
        instance_id: InstanceId,
        window: VisibilityWindow,
    ) -> EngineResult<()> {
        window.validate()?;
        self.store
            .update_instance_visibility(instance_id, &window)
            .map_err(|err| not_found_as_instance(err, instance_id))?;
        info!(
            "event=assignment_visibility module=assignment status=ok instance_id={} mode={}",
            instance_id,
            window.mode.as_str()
        );
        Ok(())
    }

    /// Deletes one instance. Its originating template is untouched.
    pub fn delete_instance(&self, instance_id: InstanceId) -> EngineResult<()> {
        self.store
            .delete_instance(instance_id)
            .map_err(|err| not_found_as_instance(err, instance_id))?;
        info!(
            "event=assignment_delete module=assignment status=ok instance_id={}",
            instance_id
        );
        Ok(())
    }

    fn materialize_and_insert(
        &self,
        template_id: TemplateId,
        target: &DeploymentTarget,
        window: Option<VisibilityWindow>,
        assigned_by: UserId,
    ) -> EngineResult<AssignmentInstance> {
        let document = load_document(self.store, template_id)?
            .ok_or(EngineError::TemplateNotFound(template_id))?;
        let mut instance = materialize(&document, target, window)?;
        instance.header.assigned_by = Some(assigned_by);

        self.store.insert_instance(&instance.header)?;
        if let Err(err) = self.insert_content(&instance) {
            self.discard_partial_instance(instance.id(), &err);
            return Err(err.into());
        }
        Ok(instance)
    }

    fn insert_content(&self, instance: &AssignmentInstance) -> StoreResult<()> {
        let parts: Vec<_> = instance.parts.iter().map(|block| block.part.clone()).collect();
        self.store.insert_instance_parts(&parts)?;
        let activities: Vec<_> = instance
            .parts
            .iter()
            .flat_map(|block| block.activities.iter().cloned())
            .collect();
        self.store.insert_instance_activities(&activities)
    }

    /// Deletes an instance whose content inserts failed. Child rows cascade.
    /// The insert error is what the caller sees, whether or not this succeeds.
    fn discard_partial_instance(&self, instance_id: InstanceId, cause: &StoreError) {
        match self.store.delete_instance(instance_id) {
            Ok(()) => warn!(
                "event=assignment_deploy module=assignment status=rolled_back instance_id={} cause={}",
                instance_id, cause
            ),
            Err(err) => error!(
                "event=assignment_deploy module=assignment status=rollback_failed instance_id={} cause={} error={}",
                instance_id, cause, err
            ),
        }
    }
}

fn not_found_as_instance(err: StoreError, instance_id: InstanceId) -> EngineError {
    match err {
        StoreError::NotFound { .. } => EngineError::InstanceNotFound(instance_id),
        other => EngineError::Store(other),
    }
}
