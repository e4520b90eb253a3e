//! Deployment budget value object.
//!
//! The budget is passed into a deployment and returned updated; nothing in
//! the crate keeps a process-wide counter.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeploymentBudget {
    /// `None` means unlimited.
    limit: Option<u32>,
    used: u32,
}

impl DeploymentBudget {
    pub fn unlimited() -> Self {
        Self {
            limit: None,
            used: 0,
        }
    }

    pub fn limited(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            used: 0,
        }
    }

    /// Builds a budget from an optional configured quota.
    pub fn from_quota(quota: Option<u32>) -> Self {
        quota.map_or_else(Self::unlimited, Self::limited)
    }

    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    /// Remaining deployments; `None` when unlimited.
    pub fn remaining(&self) -> Option<u32> {
        self.limit.map(|limit| limit.saturating_sub(self.used))
    }

    /// Checks that one more deployment fits, without consuming it.
    pub fn ensure_available(&self) -> EngineResult<()> {
        match self.limit {
            Some(limit) if self.used >= limit => Err(EngineError::BudgetExhausted { limit }),
            _ => Ok(()),
        }
    }

    /// Returns the budget with one deployment consumed.
    pub fn consume(self) -> EngineResult<Self> {
        self.ensure_available()?;
        Ok(Self {
            used: self.used.saturating_add(1),
            ..self
        })
    }
}
