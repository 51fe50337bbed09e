// src/plan/cache.rs

//! Side table of plans, keyed by the sorted key-set of the input data.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::errors::Result;
use crate::plan::FlowPlan;

type PlanMap = HashMap<Vec<String>, Arc<FlowPlan>>;

/// Shared between clones of a flow; a modified flow starts a fresh cache.
#[derive(Clone, Default)]
pub struct PlanCache {
    plans: Arc<Mutex<PlanMap>>,
}

impl PlanCache {
    /// Return the cached plan for `key`, building it on first use.
    ///
    /// Build failures are not cached.
    pub fn get_or_build<F>(&self, key: Vec<String>, build: F) -> Result<Arc<FlowPlan>>
    where
        F: FnOnce() -> Result<FlowPlan>,
    {
        if let Some(plan) = self.lock().get(&key) {
            debug!(keys = ?key, "plan cache hit");
            return Ok(Arc::clone(plan));
        }

        let plan = Arc::new(build()?);
        debug!(keys = ?key, tasks = plan.tasks.len(), "plan built");
        Ok(Arc::clone(self.lock().entry(key).or_insert(plan)))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PlanMap> {
        // A panic while holding the lock cannot leave a half-written entry.
        self.plans.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for PlanCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanCache")
            .field("plans", &self.len())
            .finish()
    }
}
