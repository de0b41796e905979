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

//! Read-only duplicate probe.

use crate::domain::entities::{DedupPlan, DuplicateReport};
use crate::domain::errors::Result;
use crate::ports::dedup_store_port::DedupStorePort;
use log::info;
use std::sync::Arc;

/// Counts the rows that would be removed, without touching the table.
pub struct DuplicateDetector {
    store: Arc<dyn DedupStorePort>,
}

impl DuplicateDetector {
    pub fn new(store: Arc<dyn DedupStorePort>) -> Self {
        Self { store }
    }

    pub fn detect(&self, plan: &DedupPlan) -> Result<DuplicateReport> {
        let total_duplicate_rows = self.store.count_duplicates(plan)?;
        info!(
            "{} duplicate rows found in {} on ({})",
            total_duplicate_rows, plan.target, plan.columns
        );
        Ok(DuplicateReport {
            total_duplicate_rows,
        })
    }
}
