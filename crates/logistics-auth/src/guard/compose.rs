use std::sync::Arc;

use async_trait::async_trait;

use super::{Guard, GuardContext, GuardOutcome};

/// Guards evaluated in order, stopping at the first non-allow outcome
pub struct ComposedGuard {
    guards: Vec<Arc<dyn Guard>>,
}

impl std::fmt::Debug for ComposedGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComposedGuard")
            .field("guards", &self.guards.len())
            .finish()
    }
}

pub fn compose_guards<I>(guards: I) -> ComposedGuard
where
    I: IntoIterator<Item = Arc<dyn Guard>>,
{
    ComposedGuard {
        guards: guards.into_iter().collect(),
    }
}

#[async_trait]
impl Guard for ComposedGuard {
    async fn check(&self, ctx: &GuardContext) -> GuardOutcome {
        for guard in &self.guards {
            let outcome = guard.check(ctx).await;
            if !outcome.is_allowed() {
                return outcome;
            }
        }
        GuardOutcome::Allow
    }
}
