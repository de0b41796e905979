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

//! In-process adapter implementing both `CatalogPort` and `DedupStorePort`.
//!
//! Rows live in memory and carry a monotonically increasing row id, which
//! plays the role of Oracle's `ROWID` when choosing the surviving row.
//!
//! Transactions work on a private copy of the table's rows and only publish
//! it on commit, so a rollback leaves the table exactly as it was. Faults can
//! be injected to exercise the failure paths of the engine.

use crate::domain::entities::{CancelFlag, DedupPlan};
use crate::domain::errors::{DedupError, Result};
use crate::ports::catalog_port::CatalogPort;
use crate::ports::dedup_store_port::{DedupStorePort, DedupTransaction};
use log::debug;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

/// A cell value. `None` is SQL NULL.
pub type Cell = Option<String>;

/// Failures the store can be told to simulate.
#[derive(Debug, Clone)]
pub enum Fault {
    /// Every catalog lookup fails.
    CatalogDown,
    /// The delete statement fails inside the transaction.
    FailDelete,
    /// Another writer re-inserts a copy of a surviving row right after the
    /// delete, so verification finds a duplicate.
    ConcurrentInsert,
    /// The given flag is set while the delete runs.
    CancelDuringDelete(CancelFlag),
    /// Commit fails.
    FailCommit,
}

#[derive(Debug, Clone)]
pub struct MemoryRow {
    pub id: u64,
    pub values: Vec<Cell>,
}

#[derive(Debug, Clone, Default)]
struct MemoryTable {
    columns: Vec<String>,
    rows: Vec<MemoryRow>,
    is_view: bool,
}

#[derive(Debug, Default)]
struct MemoryState {
    // database -> schema -> table
    databases: BTreeMap<String, BTreeMap<String, BTreeMap<String, MemoryTable>>>,
    next_row_id: u64,
    faults: Vec<Fault>,
    catalog_calls: Vec<String>,
}

/// In-memory relational store.
pub struct MemoryStore {
    current_database: String,
    current_schema: String,
    state: Mutex<MemoryState>,
}

type TableKey = (String, String, String);

impl MemoryStore {
    /// Creates a store containing one empty database with one empty schema.
    pub fn new(current_database: &str, current_schema: &str) -> Self {
        let store = Self {
            current_database: current_database.to_string(),
            current_schema: current_schema.to_string(),
            state: Mutex::new(MemoryState::default()),
        };
        store.create_schema(current_database, current_schema);
        store
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A panic while holding the lock only happens in a failing test.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn create_schema(&self, database: &str, schema: &str) {
        self.lock()
            .databases
            .entry(database.to_string())
            .or_default()
            .entry(schema.to_string())
            .or_default();
    }

    pub fn create_table(&self, database: &str, schema: &str, table: &str, columns: &[&str]) {
        self.insert_object(database, schema, table, columns, false);
    }

    pub fn create_view(&self, database: &str, schema: &str, view: &str, columns: &[&str]) {
        self.insert_object(database, schema, view, columns, true);
    }

    fn insert_object(
        &self,
        database: &str,
        schema: &str,
        name: &str,
        columns: &[&str],
        is_view: bool,
    ) {
        let mut state = self.lock();
        state
            .databases
            .entry(database.to_string())
            .or_default()
            .entry(schema.to_string())
            .or_default()
            .insert(
                name.to_string(),
                MemoryTable {
                    columns: columns.iter().map(|c| c.to_string()).collect(),
                    rows: Vec::new(),
                    is_view,
                },
            );
    }

    /// Appends a row; values are given in column order.
    pub fn insert(&self, database: &str, schema: &str, table: &str, values: &[Cell]) {
        let mut state = self.lock();
        state.next_row_id += 1;
        let id = state.next_row_id;
        if let Some(t) = table_mut(&mut state, database, schema, table) {
            t.rows.push(MemoryRow {
                id,
                values: values.to_vec(),
            });
        }
    }

    /// Convenience wrapper over `insert` for rows without NULLs.
    pub fn insert_text(&self, database: &str, schema: &str, table: &str, values: &[&str]) {
        let cells: Vec<Cell> = values.iter().map(|v| Some(v.to_string())).collect();
        self.insert(database, schema, table, &cells);
    }

    /// Snapshot of the committed rows of a table.
    pub fn rows(&self, database: &str, schema: &str, table: &str) -> Vec<MemoryRow> {
        let mut state = self.lock();
        table_mut(&mut state, database, schema, table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    pub fn inject(&self, fault: Fault) {
        self.lock().faults.push(fault);
    }

    /// Catalog lookups in the order they were issued, e.g. `schema_exists:DB.S`.
    pub fn catalog_calls(&self) -> Vec<String> {
        self.lock().catalog_calls.clone()
    }

    fn record_catalog_call(&self, call: String) -> Result<MutexGuard<'_, MemoryState>> {
        let mut state = self.lock();
        state.catalog_calls.push(call);
        if state.faults.iter().any(|f| matches!(f, Fault::CatalogDown)) {
            return Err(DedupError::CatalogUnavailable(
                "in-memory catalog is down".to_string(),
            ));
        }
        Ok(state)
    }

    fn has_fault(&self, probe: impl Fn(&Fault) -> bool) -> bool {
        self.lock().faults.iter().any(probe)
    }

    fn plan_key(plan: &DedupPlan) -> TableKey {
        (
            plan.target.database.clone(),
            plan.target.schema.clone(),
            plan.target.table.clone(),
        )
    }

    /// Row snapshot plus the positions of the key columns.
    fn load(&self, plan: &DedupPlan) -> Result<(Vec<MemoryRow>, Vec<usize>)> {
        let (db, schema, table) = Self::plan_key(plan);
        let mut state = self.lock();
        let t = table_mut(&mut state, &db, &schema, &table).ok_or_else(|| {
            DedupError::ExecutionError(format!("table {} does not exist", plan.target))
        })?;
        let mut key_idx = Vec::with_capacity(plan.columns.len());
        for name in plan.columns.names() {
            let idx = t.columns.iter().position(|c| c == name).ok_or_else(|| {
                DedupError::ExecutionError(format!("invalid column name '{}'", name))
            })?;
            key_idx.push(idx);
        }
        Ok((t.rows.clone(), key_idx))
    }
}

fn table_mut<'s>(
    state: &'s mut MemoryState,
    database: &str,
    schema: &str,
    table: &str,
) -> Option<&'s mut MemoryTable> {
    state
        .databases
        .get_mut(database)?
        .get_mut(schema)?
        .get_mut(table)
}

/// Ids of the rows ranked greater than one within their partition.
///
/// The partition key includes NULLs, and the lowest row id survives.
fn duplicate_ids(rows: &[MemoryRow], key_idx: &[usize]) -> Vec<u64> {
    let mut survivors: HashMap<Vec<&Cell>, u64> = HashMap::new();
    for row in rows {
        let key: Vec<&Cell> = key_idx.iter().map(|&i| &row.values[i]).collect();
        survivors
            .entry(key)
            .and_modify(|min| *min = (*min).min(row.id))
            .or_insert(row.id);
    }
    rows.iter()
        .filter(|row| {
            let key: Vec<&Cell> = key_idx.iter().map(|&i| &row.values[i]).collect();
            survivors.get(&key) != Some(&row.id)
        })
        .map(|row| row.id)
        .collect()
}

impl CatalogPort for MemoryStore {
    fn current_database(&self) -> Result<String> {
        Ok(self.current_database.clone())
    }

    fn current_schema(&self) -> Result<String> {
        Ok(self.current_schema.clone())
    }

    fn database_exists(&self, name: &str) -> Result<bool> {
        let state = self.record_catalog_call(format!("database_exists:{}", name))?;
        Ok(state.databases.contains_key(name))
    }

    fn schema_exists(&self, database: &str, name: &str) -> Result<bool> {
        let state = self.record_catalog_call(format!("schema_exists:{}.{}", database, name))?;
        Ok(state
            .databases
            .get(database)
            .is_some_and(|schemas| schemas.contains_key(name)))
    }

    fn table_exists(&self, database: &str, schema: &str, name: &str) -> Result<bool> {
        let state =
            self.record_catalog_call(format!("table_exists:{}.{}.{}", database, schema, name))?;
        Ok(state
            .databases
            .get(database)
            .and_then(|schemas| schemas.get(schema))
            .and_then(|tables| tables.get(name))
            .is_some_and(|t| !t.is_view))
    }

    fn list_columns(&self, database: &str, schema: &str, table: &str) -> Result<Vec<String>> {
        let state =
            self.record_catalog_call(format!("list_columns:{}.{}.{}", database, schema, table))?;
        Ok(state
            .databases
            .get(database)
            .and_then(|schemas| schemas.get(schema))
            .and_then(|tables| tables.get(table))
            .map(|t| t.columns.clone())
            .unwrap_or_default())
    }
}

impl DedupStorePort for MemoryStore {
    fn count_duplicates(&self, plan: &DedupPlan) -> Result<u64> {
        let (rows, key_idx) = self.load(plan)?;
        Ok(duplicate_ids(&rows, &key_idx).len() as u64)
    }

    fn begin<'a>(&'a self, plan: &DedupPlan) -> Result<Box<dyn DedupTransaction + 'a>> {
        let (rows, key_idx) = self.load(plan)?;
        debug!("Opened in-memory transaction on {}", plan.target);
        Ok(Box::new(MemoryTransaction {
            store: self,
            key: Self::plan_key(plan),
            key_idx,
            working: rows,
        }))
    }
}

/// Transaction over a private copy of one table's rows.
struct MemoryTransaction<'a> {
    store: &'a MemoryStore,
    key: TableKey,
    key_idx: Vec<usize>,
    working: Vec<MemoryRow>,
}

impl DedupTransaction for MemoryTransaction<'_> {
    fn delete_duplicates(&mut self) -> Result<u64> {
        if self.store.has_fault(|f| matches!(f, Fault::FailDelete)) {
            return Err(DedupError::ExecutionError(
                "integrity constraint violated - child record found".to_string(),
            ));
        }

        let doomed = duplicate_ids(&self.working, &self.key_idx);
        self.working.retain(|row| !doomed.contains(&row.id));

        let faults = self.store.lock().faults.clone();
        for fault in faults {
            match fault {
                Fault::CancelDuringDelete(flag) => flag.cancel(),
                Fault::ConcurrentInsert => {
                    if let Some(first) = self.working.first().cloned() {
                        let mut state = self.store.lock();
                        state.next_row_id += 1;
                        self.working.push(MemoryRow {
                            id: state.next_row_id,
                            values: first.values,
                        });
                    }
                }
                _ => {}
            }
        }
        Ok(doomed.len() as u64)
    }

    fn count_duplicates(&mut self) -> Result<u64> {
        Ok(duplicate_ids(&self.working, &self.key_idx).len() as u64)
    }

    fn commit(self: Box<Self>) -> Result<()> {
        if self.store.has_fault(|f| matches!(f, Fault::FailCommit)) {
            return Err(DedupError::ExecutionError(
                "commit failed: connection lost".to_string(),
            ));
        }
        let MemoryTransaction {
            store,
            key: (db, schema, table),
            working,
            ..
        } = *self;
        let mut state = store.lock();
        if let Some(t) = table_mut(&mut state, &db, &schema, &table) {
            t.rows = working;
        }
        Ok(())
    }

    fn rollback(self: Box<Self>) -> Result<()> {
        debug!("Discarding in-memory transaction");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{TargetRef, ValidatedColumns};

    fn plan(columns: &[&str]) -> DedupPlan {
        DedupPlan {
            target: TargetRef {
                database: "SHOP".to_string(),
                schema: "dbo".to_string(),
                table: "Cities".to_string(),
            },
            columns: ValidatedColumns::new(columns.iter().map(|c| c.to_string()).collect()),
        }
    }

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new("SHOP", "dbo");
        store.create_table("SHOP", "dbo", "Cities", &["City", "Zip"]);
        store.insert_text("SHOP", "dbo", "Cities", &["Oslo", "0150"]);
        store.insert_text("SHOP", "dbo", "Cities", &["Oslo", "0150"]);
        store.insert_text("SHOP", "dbo", "Cities", &["Oslo", "0151"]);
        store.insert_text("SHOP", "dbo", "Cities", &["Bergen", "5003"]);
        store
    }

    #[test]
    fn test_count_depends_on_key_columns() {
        let store = seeded();
        assert_eq!(store.count_duplicates(&plan(&["City", "Zip"])).unwrap(), 1);
        assert_eq!(store.count_duplicates(&plan(&["City"])).unwrap(), 2);
        assert_eq!(store.count_duplicates(&plan(&["Zip", "City"])).unwrap(), 1);
    }

    #[test]
    fn test_nulls_share_a_partition() {
        let store = MemoryStore::new("SHOP", "dbo");
        store.create_table("SHOP", "dbo", "Cities", &["City", "Zip"]);
        store.insert("SHOP", "dbo", "Cities", &[Some("Oslo".into()), None]);
        store.insert("SHOP", "dbo", "Cities", &[Some("Oslo".into()), None]);
        assert_eq!(store.count_duplicates(&plan(&["City", "Zip"])).unwrap(), 1);
    }

    #[test]
    fn test_lowest_row_id_survives() {
        let store = seeded();
        let p = plan(&["City"]);
        let mut tx = store.begin(&p).unwrap();
        assert_eq!(tx.delete_duplicates().unwrap(), 2);
        tx.commit().unwrap();

        let ids: Vec<u64> = store
            .rows("SHOP", "dbo", "Cities")
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![1, 4]);
    }

    #[test]
    fn test_rollback_and_drop_leave_table_untouched() {
        let store = seeded();
        let p = plan(&["City"]);

        let mut tx = store.begin(&p).unwrap();
        tx.delete_duplicates().unwrap();
        tx.rollback().unwrap();
        assert_eq!(store.rows("SHOP", "dbo", "Cities").len(), 4);

        {
            let mut tx = store.begin(&p).unwrap();
            tx.delete_duplicates().unwrap();
        }
        assert_eq!(store.rows("SHOP", "dbo", "Cities").len(), 4);
    }

    #[test]
    fn test_views_are_not_tables() {
        let store = seeded();
        store.create_view("SHOP", "dbo", "CityView", &["City"]);
        assert!(store.table_exists("SHOP", "dbo", "Cities").unwrap());
        assert!(!store.table_exists("SHOP", "dbo", "CityView").unwrap());
    }

    #[test]
    fn test_catalog_down() {
        let store = seeded();
        store.inject(Fault::CatalogDown);
        assert!(matches!(
            store.database_exists("SHOP"),
            Err(DedupError::CatalogUnavailable(_))
        ));
    }
}
