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

//! Utility functions for generating Oracle SQL for the dedup statements.
//!
//! Column and table names cannot be bound as parameters, so they are
//! interpolated here. Callers only pass names that the catalog has already
//! confirmed, and every identifier is double-quoted with embedded quotes
//! doubled.

use crate::domain::entities::{DedupPlan, ValidatedColumns};
use crate::domain::errors::{DedupError, Result};

/// Alias of the ranking column in generated statements.
const RANK_ALIAS: &str = "dedup_rank";
const ROWID_ALIAS: &str = "dedup_rowid";

/// Quotes an Oracle identifier: `Price` becomes `"Price"`, `a"b` becomes `"a""b"`.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Database link names are interpolated unquoted after `@`, so they are
/// restricted to the characters Oracle allows in an unquoted link name.
pub fn is_valid_db_link(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '#' | '.' | '@'))
}

/// Builds the `@LINK` suffix for dictionary views and tables.
///
/// Empty when the target database is the one the session is attached to.
pub fn remote_suffix(database: &str, local_database: &str) -> Result<String> {
    if database.eq_ignore_ascii_case(local_database) {
        return Ok(String::new());
    }
    if !is_valid_db_link(database) {
        return Err(DedupError::ConfigError(format!(
            "'{}' is not a usable database link name",
            database
        )));
    }
    Ok(format!("@{}", database))
}

/// `"SCHEMA"."TABLE"@LINK`
pub fn qualified_table(plan: &DedupPlan, suffix: &str) -> String {
    format!(
        "{}.{}{}",
        quote_identifier(&plan.target.schema),
        quote_identifier(&plan.target.table),
        suffix
    )
}

/// `ROW_NUMBER() OVER (PARTITION BY .. ORDER BY .., ROWID)`.
///
/// Ordering by the key columns first keeps the clause equivalent to a
/// ranking on the key alone; `ROWID` makes the survivor deterministic.
pub fn rank_expression(columns: &ValidatedColumns) -> String {
    let quoted: Vec<String> = columns.names().iter().map(|c| quote_identifier(c)).collect();
    let key = quoted.join(", ");
    format!(
        "ROW_NUMBER() OVER (PARTITION BY {} ORDER BY {}, ROWID)",
        key, key
    )
}

/// The statements one dedup run issues, rendered once per plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupStatements {
    pub probe: String,
    pub lock: String,
    pub delete: String,
}

impl DedupStatements {
    pub fn build(plan: &DedupPlan, suffix: &str) -> Self {
        let table = qualified_table(plan, suffix);
        let rank = rank_expression(&plan.columns);

        let probe = format!(
            "SELECT COUNT(*) FROM (SELECT {} AS {} FROM {}) WHERE {} > 1",
            rank, RANK_ALIAS, table, RANK_ALIAS
        );
        let lock = format!("LOCK TABLE {} IN EXCLUSIVE MODE", table);
        let delete = format!(
            "DELETE FROM {table} WHERE ROWID IN (SELECT {rid} FROM (SELECT ROWID AS {rid}, {rank} AS {alias} FROM {table}) WHERE {alias} > 1)",
            table = table,
            rid = ROWID_ALIAS,
            rank = rank,
            alias = RANK_ALIAS,
        );

        Self {
            probe,
            lock,
            delete,
        }
    }
}
