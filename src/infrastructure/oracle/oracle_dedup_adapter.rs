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

//! Infrastructure adapter that probes and deletes duplicate rows in Oracle.
//!
//! The transaction pins one pooled connection from `begin` until commit or
//! rollback. Oracle connections do not autocommit, so the lock, the delete
//! and the verification probe all belong to the same transaction.

use crate::domain::entities::DedupPlan;
use crate::domain::errors::Result;
use crate::infrastructure::oracle::connection_manager::OracleConnectionManager;
use crate::infrastructure::oracle::sql_utils::{remote_suffix, DedupStatements};
use crate::infrastructure::oracle::store_error;
use crate::ports::dedup_store_port::{DedupStorePort, DedupTransaction};
use log::{debug, warn};
use oracle::Connection;
use r2d2::{Pool, PooledConnection};
use std::sync::Arc;

const SQL_CURRENT_DATABASE: &str = "SELECT SYS_CONTEXT('USERENV', 'DB_NAME') FROM dual";

/// Concrete implementation of `DedupStorePort` for Oracle databases.
pub struct OracleDedupAdapter {
    pool: Arc<Pool<OracleConnectionManager>>,
}

impl OracleDedupAdapter {
    pub fn new(pool: Arc<Pool<OracleConnectionManager>>) -> Self {
        Self { pool }
    }

    fn get_conn(&self) -> Result<PooledConnection<OracleConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| store_error("unable to obtain a connection", e))
    }

    fn statements(conn: &Connection, plan: &DedupPlan) -> Result<DedupStatements> {
        let local: Option<String> = conn
            .query_row(SQL_CURRENT_DATABASE, &[])
            .and_then(|row| row.get(0))
            .map_err(|e| store_error("unable to resolve the session database", e))?;
        let suffix = remote_suffix(&plan.target.database, &local.unwrap_or_default())?;
        let stmts = DedupStatements::build(plan, &suffix);
        debug!("Probe SQL: {}", stmts.probe);
        debug!("Delete SQL: {}", stmts.delete);
        Ok(stmts)
    }

    fn probe(conn: &Connection, sql: &str) -> Result<u64> {
        conn.query_row(sql, &[])
            .and_then(|row| row.get::<usize, u64>(0))
            .map_err(|e| store_error("duplicate probe failed", e))
    }
}

impl DedupStorePort for OracleDedupAdapter {
    fn count_duplicates(&self, plan: &DedupPlan) -> Result<u64> {
        let conn = self.get_conn()?;
        let stmts = Self::statements(&conn, plan)?;
        Self::probe(&conn, &stmts.probe)
    }

    fn begin<'a>(&'a self, plan: &DedupPlan) -> Result<Box<dyn DedupTransaction + 'a>> {
        let conn = self.get_conn()?;
        let stmts = Self::statements(&conn, plan)?;

        // The exclusive lock keeps other sessions from inserting a new
        // duplicate between our delete and the verification probe.
        conn.execute(&stmts.lock, &[])
            .map_err(|e| store_error("unable to lock the table", e))?;

        Ok(Box::new(OracleDedupTransaction {
            conn,
            stmts,
            finished: false,
        }))
    }
}

/// One open Oracle transaction on the target table.
struct OracleDedupTransaction {
    conn: PooledConnection<OracleConnectionManager>,
    stmts: DedupStatements,
    finished: bool,
}

impl DedupTransaction for OracleDedupTransaction {
    fn delete_duplicates(&mut self) -> Result<u64> {
        let stmt = self
            .conn
            .execute(&self.stmts.delete, &[])
            .map_err(|e| store_error("delete failed", e))?;
        stmt.row_count()
            .map_err(|e| store_error("unable to read the deleted row count", e))
    }

    fn count_duplicates(&mut self) -> Result<u64> {
        OracleDedupAdapter::probe(&self.conn, &self.stmts.probe)
    }

    fn commit(mut self: Box<Self>) -> Result<()> {
        self.finished = true;
        if let Err(e) = self.conn.commit() {
            // Oracle keeps the transaction open when COMMIT fails.
            if let Err(rb) = self.conn.rollback() {
                warn!("Rollback after failed commit also failed: {}", rb);
            }
            return Err(store_error("commit failed", e));
        }
        Ok(())
    }

    fn rollback(mut self: Box<Self>) -> Result<()> {
        self.finished = true;
        self.conn
            .rollback()
            .map_err(|e| store_error("rollback failed", e))
    }
}

impl Drop for OracleDedupTransaction {
    fn drop(&mut self) {
        // Never hand a connection with an open transaction back to the pool.
        if !self.finished {
            if let Err(e) = self.conn.rollback() {
                warn!("Rollback of abandoned transaction failed: {}", e);
            }
        }
    }
}
