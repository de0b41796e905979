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

//! # Domain Entities
//!
//! The "Nouns" of the engine: which table to work on, which columns define a
//! duplicate, what the probe found and how the run ended.
//!
//! Everything here is transient. It is created inside a single orchestrator
//! call and dropped when that call returns.

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The raw arguments of a `Deduplicate` call, before defaults are applied.
#[derive(Debug, Clone, Default)]
pub struct DedupRequest {
    pub database: Option<String>,
    pub schema: Option<String>,
    pub table: Option<String>,
    /// Delimited list of column names, e.g. `"DeviceName, RAM, Price"`.
    pub columns: String,
}

/// Session defaults used when the request omits database or schema.
///
/// These are passed into the orchestrator explicitly instead of being read
/// from connection state at call time.
#[derive(Debug, Clone)]
pub struct SessionDefaults {
    pub database: String,
    pub schema: String,
}

/// Identifies the table to deduplicate once defaults have been resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetRef {
    pub database: String,
    pub schema: String,
    pub table: String,
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.database, self.schema, self.table)
    }
}

/// Column names that have been checked against the table's column registry.
///
/// Names are stored in the registry's own spelling and in the order the
/// caller requested them. Only the column set validator can build one, so
/// adapters that interpolate these names into statement text never see an
/// unchecked name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedColumns(Vec<String>);

impl ValidatedColumns {
    pub(crate) fn new(names: Vec<String>) -> Self {
        Self(names)
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ValidatedColumns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(", "))
    }
}

/// Outcome of checking a requested column list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid(ValidatedColumns),
    Invalid {
        reason: String,
        offending: Vec<String>,
    },
}

/// Everything an adapter needs to probe or delete duplicates.
#[derive(Debug, Clone)]
pub struct DedupPlan {
    pub target: TargetRef,
    pub columns: ValidatedColumns,
}

/// Result of the read-only duplicate probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DuplicateReport {
    /// Rows that are not the surviving first occurrence of their partition.
    pub total_duplicate_rows: u64,
}

/// The value handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DedupOutcome {
    Success { deleted: u64 },
    /// Nothing was deleted. `pending` is non-zero only for dry runs, where
    /// duplicates were found but deliberately left in place.
    NoOp { pending: u64 },
    Failure { reason: String },
}

impl DedupOutcome {
    pub fn failure(reason: impl Into<String>) -> Self {
        DedupOutcome::Failure {
            reason: reason.into(),
        }
    }

    /// 0 for success or no-op, 1 for any failure.
    pub fn status_code(&self) -> i32 {
        match self {
            DedupOutcome::Success { .. } | DedupOutcome::NoOp { .. } => 0,
            DedupOutcome::Failure { .. } => 1,
        }
    }

    pub fn message(&self) -> String {
        match self {
            DedupOutcome::Success { deleted } => {
                format!("Deleted {} duplicate rows", deleted)
            }
            DedupOutcome::NoOp { pending: 0 } => "No duplicate rows found".to_string(),
            DedupOutcome::NoOp { pending } => {
                format!("Dry run: {} duplicate rows found, nothing deleted", pending)
            }
            DedupOutcome::Failure { reason } => reason.clone(),
        }
    }

    /// Converts the outcome into the `(status_code, message)` return contract.
    pub fn into_status(self) -> (i32, String) {
        (self.status_code(), self.message())
    }
}

/// A cancellation handle that can be shared with another thread.
///
/// The executor polls it between statements; once set, the open transaction
/// is rolled back and the run reports `cancelled`.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
