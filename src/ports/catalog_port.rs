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

//! # Catalog Port
//!
//! In Hexagonal Architecture, a **Port** is a "Slot" or a "Contract".
//!
//! This Port defines what it means to "inspect the catalog": answering
//! whether a database, schema or table exists and which columns a table has.
//! It doesn't care IF the catalog is Oracle's data dictionary or an
//! in-memory registry used in tests.

use crate::domain::errors::Result;

/// `CatalogPort` is the read-only Catalog Inspector.
///
/// Every lookup names its target database explicitly. Implementations must
/// not assume the target is the database the connection is attached to.
///
/// Any failure to reach the catalog is reported as
/// `DedupError::CatalogUnavailable`.
pub trait CatalogPort: Send + Sync {
    /// Name of the database the session is attached to.
    fn current_database(&self) -> Result<String>;

    /// The store's default schema for this session (`dbo` on SQL Server,
    /// the login schema on Oracle).
    fn current_schema(&self) -> Result<String>;

    /// Applies the store's identifier folding rule to a caller-supplied name.
    ///
    /// The default keeps names exactly as given.
    fn normalize_identifier(&self, name: &str) -> String {
        name.to_string()
    }

    fn database_exists(&self, name: &str) -> Result<bool>;

    fn schema_exists(&self, database: &str, name: &str) -> Result<bool>;

    /// True only for base tables. Views must not match.
    fn table_exists(&self, database: &str, schema: &str, name: &str) -> Result<bool>;

    fn list_columns(&self, database: &str, schema: &str, table: &str) -> Result<Vec<String>>;
}
