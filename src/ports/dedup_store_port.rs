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

//! # Dedup Store Port
//!
//! This Port defines the contract for the query execution engine: a
//! read-only duplicate probe, and an atomic transaction in which duplicates
//! are deleted and the result is verified before commit.
//!
//! Both operations rank the rows of each partition the same way: rows equal
//! on every key column share a partition, and within it the row with the
//! smallest physical row identifier ranks first and survives.

use crate::domain::entities::DedupPlan;
use crate::domain::errors::Result;

pub trait DedupStorePort: Send + Sync {
    /// Counts rows whose rank within their partition is greater than one.
    ///
    /// Must not mutate the table.
    fn count_duplicates(&self, plan: &DedupPlan) -> Result<u64>;

    /// Opens a transaction on the target table.
    ///
    /// The returned transaction already holds a lock strong enough to keep
    /// other writers out of the table until commit or rollback.
    fn begin<'a>(&'a self, plan: &DedupPlan) -> Result<Box<dyn DedupTransaction + 'a>>;
}

/// A single open transaction against the target table.
///
/// Dropping a transaction without calling `commit` rolls it back.
pub trait DedupTransaction {
    /// Deletes every row ranked greater than one. Returns rows deleted.
    fn delete_duplicates(&mut self) -> Result<u64>;

    /// The same probe as `DedupStorePort::count_duplicates`, issued inside
    /// this transaction so it sees its uncommitted deletes.
    fn count_duplicates(&mut self) -> Result<u64>;

    fn commit(self: Box<Self>) -> Result<()>;

    fn rollback(self: Box<Self>) -> Result<()>;
}
