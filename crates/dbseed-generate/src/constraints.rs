use tracing::{info, warn};

use dbseed_core::{GeneratedValue, Result};

use crate::target::{RowBatch, SeedTarget};

/// Where a run is in the suspend / populate / restore protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintState {
    Idle,
    Suspended,
    Restored,
}

/// Brackets population with schema-wide constraint suspension.
///
/// Suspension and restoration each happen once per manager; every table
/// insert in between runs in its own transaction on the target.
pub struct ConstraintManager<'t, T: SeedTarget + ?Sized> {
    target: &'t mut T,
    tables: Vec<String>,
    state: ConstraintState,
    suspended: bool,
}

impl<'t, T: SeedTarget + ?Sized> ConstraintManager<'t, T> {
    pub fn new(target: &'t mut T, tables: Vec<String>) -> Self {
        Self {
            target,
            tables,
            state: ConstraintState::Idle,
            suspended: false,
        }
    }

    pub fn state(&self) -> ConstraintState {
        self.state
    }

    /// Whether the suspend statement succeeded.
    pub fn was_suspended(&self) -> bool {
        self.suspended
    }

    pub fn target(&mut self) -> &mut T {
        &mut *self.target
    }

    /// Disable enforcement for every table. A failure is logged and the run
    /// proceeds with constraints active.
    pub async fn suspend(&mut self) {
        if self.state != ConstraintState::Idle {
            return;
        }
        match self.target.suspend_constraints(&self.tables).await {
            Ok(()) => {
                self.suspended = true;
                info!(event = "constraints_suspended", tables = self.tables.len());
            }
            Err(err) => warn!(event = "constraints_suspend_failed", error = %err),
        }
        self.state = ConstraintState::Suspended;
    }

    /// Insert one table's batch in its own transaction.
    pub async fn populate(&mut self, batch: &RowBatch) -> Result<Vec<GeneratedValue>> {
        self.target.insert_rows(batch).await
    }

    /// Re-enable enforcement. Only the first call reaches the target.
    pub async fn restore(&mut self) -> Result<()> {
        if self.state == ConstraintState::Restored {
            return Ok(());
        }
        self.state = ConstraintState::Restored;
        let result = self.target.restore_constraints(&self.tables).await;
        match &result {
            Ok(()) => info!(event = "constraints_restored", tables = self.tables.len()),
            Err(err) => warn!(
                event = "constraints_restore_failed",
                error = %err,
                "verify trigger state manually"
            ),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTarget;

    #[tokio::test]
    async fn restore_reaches_target_once() {
        let mut target = MemoryTarget::new();
        {
            let mut manager = ConstraintManager::new(&mut target, vec!["a".into(), "b".into()]);
            assert_eq!(manager.state(), ConstraintState::Idle);
            manager.suspend().await;
            manager.suspend().await;
            assert_eq!(manager.state(), ConstraintState::Suspended);
            assert!(manager.was_suspended());
            manager.restore().await.unwrap();
            manager.restore().await.unwrap();
            assert_eq!(manager.state(), ConstraintState::Restored);
        }
        assert_eq!(target.suspend_calls(), 1);
        assert_eq!(target.restore_calls(), 1);
    }

    #[tokio::test]
    async fn failed_suspend_still_moves_on() {
        let mut target = MemoryTarget::new().fail_suspend();
        let mut manager = ConstraintManager::new(&mut target, vec!["a".into()]);
        manager.suspend().await;
        assert_eq!(manager.state(), ConstraintState::Suspended);
        assert!(!manager.was_suspended());
        manager.restore().await.unwrap();
    }
}
