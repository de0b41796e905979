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

//! Infrastructure adapter answering catalog questions from Oracle's data
//! dictionary.
//!
//! A "database" is either the one the session is attached to or a database
//! link. Lookups against a link read the remote dictionary through
//! `ALL_*@LINK`, so cross-database access is always explicit.

use crate::domain::errors::Result;
use crate::infrastructure::oracle::catalog_error;
use crate::infrastructure::oracle::connection_manager::OracleConnectionManager;
use crate::infrastructure::oracle::sql_utils::remote_suffix;
use crate::ports::catalog_port::CatalogPort;
use log::debug;
use oracle::sql_type::ToSql;
use oracle::Connection;
use r2d2::{Pool, PooledConnection};
use std::sync::Arc;

const SQL_CURRENT_DATABASE: &str = "SELECT SYS_CONTEXT('USERENV', 'DB_NAME') FROM dual";
const SQL_CURRENT_SCHEMA: &str = "SELECT SYS_CONTEXT('USERENV', 'CURRENT_SCHEMA') FROM dual";
const SQL_DATABASE_EXISTS: &str = "
    SELECT COUNT(*) FROM (
        SELECT SYS_CONTEXT('USERENV', 'DB_NAME') AS name FROM dual
        UNION ALL
        SELECT db_link FROM all_db_links
    )
    WHERE UPPER(name) = UPPER(:1)
";

fn sql_schema_exists(suffix: &str) -> String {
    format!(
        "SELECT COUNT(*) FROM all_users{} WHERE username = :1",
        suffix
    )
}

// ALL_TABLES never lists views.
fn sql_table_exists(suffix: &str) -> String {
    format!(
        "SELECT COUNT(*) FROM all_tables{} WHERE owner = :1 AND table_name = :2 AND dropped = 'NO'",
        suffix
    )
}

fn sql_list_columns(suffix: &str) -> String {
    format!(
        "SELECT column_name FROM all_tab_columns{} WHERE owner = :1 AND table_name = :2 ORDER BY column_id",
        suffix
    )
}

/// Concrete implementation of `CatalogPort` for Oracle databases.
pub struct OracleCatalogAdapter {
    pool: Arc<Pool<OracleConnectionManager>>,
}

impl OracleCatalogAdapter {
    pub fn new(pool: Arc<Pool<OracleConnectionManager>>) -> Self {
        Self { pool }
    }

    fn get_conn(&self) -> Result<PooledConnection<OracleConnectionManager>> {
        self.pool.get().map_err(catalog_error)
    }

    fn query_string(conn: &Connection, sql: &str) -> Result<String> {
        let row = conn.query_row(sql, &[]).map_err(catalog_error)?;
        let value: Option<String> = row.get(0).map_err(catalog_error)?;
        Ok(value.unwrap_or_default())
    }

    fn query_count(conn: &Connection, sql: &str, params: &[&dyn ToSql]) -> Result<u64> {
        let row = conn.query_row(sql, params).map_err(catalog_error)?;
        row.get::<usize, u64>(0).map_err(catalog_error)
    }

    /// `@LINK` for remote databases, empty for the local one.
    fn suffix_for(conn: &Connection, database: &str) -> Result<String> {
        let local = Self::query_string(conn, SQL_CURRENT_DATABASE)?;
        remote_suffix(database, &local)
    }
}

impl CatalogPort for OracleCatalogAdapter {
    fn current_database(&self) -> Result<String> {
        let conn = self.get_conn()?;
        Self::query_string(&conn, SQL_CURRENT_DATABASE)
    }

    fn current_schema(&self) -> Result<String> {
        let conn = self.get_conn()?;
        Self::query_string(&conn, SQL_CURRENT_SCHEMA)
    }

    /// Oracle folds unquoted identifiers to upper case. A name wrapped in
    /// double quotes is taken literally.
    fn normalize_identifier(&self, name: &str) -> String {
        let trimmed = name.trim();
        if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
            trimmed[1..trimmed.len() - 1].to_string()
        } else {
            trimmed.to_uppercase()
        }
    }

    fn database_exists(&self, name: &str) -> Result<bool> {
        debug!("Checking database {}", name);
        let conn = self.get_conn()?;
        Ok(Self::query_count(&conn, SQL_DATABASE_EXISTS, &[&name])? > 0)
    }

    fn schema_exists(&self, database: &str, name: &str) -> Result<bool> {
        debug!("Checking schema {}.{}", database, name);
        let conn = self.get_conn()?;
        let suffix = Self::suffix_for(&conn, database)?;
        Ok(Self::query_count(&conn, &sql_schema_exists(&suffix), &[&name])? > 0)
    }

    fn table_exists(&self, database: &str, schema: &str, name: &str) -> Result<bool> {
        debug!("Checking table {}.{}.{}", database, schema, name);
        let conn = self.get_conn()?;
        let suffix = Self::suffix_for(&conn, database)?;
        Ok(Self::query_count(&conn, &sql_table_exists(&suffix), &[&schema, &name])? > 0)
    }

    fn list_columns(&self, database: &str, schema: &str, table: &str) -> Result<Vec<String>> {
        debug!("Fetching columns for {}.{}.{}", database, schema, table);
        let conn = self.get_conn()?;
        let suffix = Self::suffix_for(&conn, database)?;
        let rows = conn
            .query(&sql_list_columns(&suffix), &[&schema, &table])
            .map_err(catalog_error)?;
        let mut columns = Vec::new();
        for row_result in rows {
            let row = row_result.map_err(catalog_error)?;
            columns.push(row.get::<usize, String>(0).map_err(catalog_error)?);
        }
        Ok(columns)
    }
}
