// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Dedup Executor
//!
//! Deletes duplicates inside a single transaction and proves the result
//! before committing.
//!
//! ```text
//! Idle ──(0 duplicates)──────────────────────────────► NoOp
//!   │
//!   └─► InTransaction ──(delete ok)──► Verifying ──(clean)──► Committing ─► Success
//!             │                            │
//!             └──(error / cancel)──┐       └──(duplicates left)──┐
//!                                  ▼                             ▼
//!                              RollingBack ─────────────────► Failure
//! ```
//!
//! The table is either left untouched (rollback) or left with no duplicates
//! under the key columns (commit). Nothing in between is ever committed.

use crate::domain::entities::{CancelFlag, DedupOutcome, DedupPlan, DuplicateReport};
use crate::domain::errors::{DedupError, Result};
use crate::ports::dedup_store_port::{DedupStorePort, DedupTransaction};
use log::{debug, error, info, warn};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExecutorState {
    Idle,
    InTransaction,
    Verifying,
    Committing,
    RollingBack,
}

impl fmt::Display for ExecutorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExecutorState::Idle => "Idle",
            ExecutorState::InTransaction => "InTransaction",
            ExecutorState::Verifying => "Verifying",
            ExecutorState::Committing => "Committing",
            ExecutorState::RollingBack => "RollingBack",
        };
        write!(f, "{}", name)
    }
}

pub struct DedupExecutor {
    store: Arc<dyn DedupStorePort>,
}

impl DedupExecutor {
    pub fn new(store: Arc<dyn DedupStorePort>) -> Self {
        Self { store }
    }

    /// Runs the delete-and-verify protocol.
    ///
    /// Errors are returned only after the transaction has been rolled back:
    /// `ExecutionError` when a statement fails, `IntegrityViolation` when
    /// verification still sees duplicates and `Cancelled` when `cancel` was
    /// set or the store interrupted a call.
    pub fn execute(
        &self,
        plan: &DedupPlan,
        report: &DuplicateReport,
        cancel: &CancelFlag,
    ) -> Result<DedupOutcome> {
        let mut state = ExecutorState::Idle;
        if report.total_duplicate_rows == 0 {
            info!("No duplicates in {}, nothing to do", plan.target);
            return Ok(DedupOutcome::NoOp { pending: 0 });
        }
        ensure_not_cancelled(cancel)?;

        let mut tx = self.store.begin(plan).map_err(as_delete_failure)?;
        transition(&mut state, ExecutorState::InTransaction);

        match self.delete_and_verify(tx.as_mut(), report, cancel, &mut state) {
            Ok(deleted) => {
                transition(&mut state, ExecutorState::Committing);
                tx.commit().map_err(as_delete_failure)?;
                info!("Committed: {} duplicate rows removed from {}", deleted, plan.target);
                Ok(DedupOutcome::Success { deleted })
            }
            Err(e) => {
                transition(&mut state, ExecutorState::RollingBack);
                warn!("Rolling back dedup of {}: {}", plan.target, e);
                if let Err(rb) = tx.rollback() {
                    error!("Rollback failed: {}", rb);
                }
                Err(e)
            }
        }
    }

    fn delete_and_verify(
        &self,
        tx: &mut dyn DedupTransaction,
        report: &DuplicateReport,
        cancel: &CancelFlag,
        state: &mut ExecutorState,
    ) -> Result<u64> {
        let deleted = tx.delete_duplicates().map_err(as_delete_failure)?;
        if deleted != report.total_duplicate_rows {
            warn!(
                "Probe counted {} duplicates but {} rows were deleted",
                report.total_duplicate_rows, deleted
            );
        }
        ensure_not_cancelled(cancel)?;

        transition(state, ExecutorState::Verifying);
        let remaining = tx.count_duplicates().map_err(as_delete_failure)?;
        if remaining > 0 {
            return Err(DedupError::IntegrityViolation { remaining });
        }
        ensure_not_cancelled(cancel)?;

        Ok(deleted)
    }
}

fn transition(state: &mut ExecutorState, next: ExecutorState) {
    debug!("Executor {} -> {}", state, next);
    *state = next;
}

fn ensure_not_cancelled(cancel: &CancelFlag) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(DedupError::Cancelled);
    }
    Ok(())
}

/// Store failures inside the executor are reported as failed deletes.
fn as_delete_failure(e: DedupError) -> DedupError {
    match e {
        DedupError::Cancelled => DedupError::Cancelled,
        other => DedupError::ExecutionError(format!("unable to delete records: {}", other)),
    }
}
