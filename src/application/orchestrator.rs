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

//! The public entry point of the engine.
//!
//! The orchestrator validates the target (database, then schema, then table,
//! then columns), probes for duplicates and hands off to the executor. The
//! first failing step ends the run; later checks never execute because their
//! queries presume the earlier objects exist.
//!
//! Every error is converted into a `DedupOutcome` here. Nothing propagates
//! past `deduplicate` as an unhandled fault.

use crate::application::dedup_executor::DedupExecutor;
use crate::application::duplicate_detector::DuplicateDetector;
use crate::domain::column_set::{parse_columns, validate_columns, DEFAULT_DELIMITER};
use crate::domain::entities::{
    CancelFlag, DedupOutcome, DedupPlan, DedupRequest, DuplicateReport, SessionDefaults, TargetRef,
};
use crate::domain::errors::{DedupError, ObjectKind, Result};
use crate::ports::catalog_port::CatalogPort;
use crate::ports::dedup_store_port::DedupStorePort;
use log::{error, info, warn};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Knobs that change how a run behaves, independent of its target.
#[derive(Debug, Clone)]
pub struct DedupOptions {
    pub delimiter: String,
    /// Probe only; never open a transaction.
    pub dry_run: bool,
    /// Directory for the JSON outcome report. No report when `None`.
    pub report_dir: Option<PathBuf>,
}

impl Default for DedupOptions {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
            dry_run: false,
            report_dir: None,
        }
    }
}

/// What a run learned before it ended, for the outcome report.
#[derive(Debug, Default)]
struct RunTrace {
    target: Option<TargetRef>,
    columns: Vec<String>,
    report: Option<DuplicateReport>,
}

/// Sequences validation, detection and execution for one table.
pub struct Orchestrator {
    catalog: Arc<dyn CatalogPort>,
    detector: DuplicateDetector,
    executor: DedupExecutor,
    defaults: SessionDefaults,
    options: DedupOptions,
}

impl Orchestrator {
    pub fn new(
        catalog: Arc<dyn CatalogPort>,
        store: Arc<dyn DedupStorePort>,
        defaults: SessionDefaults,
        options: DedupOptions,
    ) -> Self {
        Self {
            catalog,
            detector: DuplicateDetector::new(store.clone()),
            executor: DedupExecutor::new(store),
            defaults,
            options,
        }
    }

    /// `Deduplicate(database?, schema?, table, columns)`.
    ///
    /// Always returns an outcome; use `DedupOutcome::into_status` for the
    /// `(status_code, message)` form.
    pub fn deduplicate(&self, request: &DedupRequest, cancel: &CancelFlag) -> DedupOutcome {
        let start_time = Instant::now();
        let mut trace = RunTrace::default();

        let outcome = match self.run(request, cancel, &mut trace) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Deduplication failed: {}", e);
                DedupOutcome::failure(e.to_string())
            }
        };

        // Single exit path: the report is written whichever step ended the run.
        if let Some(dir) = &self.options.report_dir {
            if let Err(e) = self.generate_report(dir, &trace, &outcome, start_time) {
                warn!("Failed to write outcome report: {}", e);
            }
        }
        outcome
    }

    fn run(
        &self,
        request: &DedupRequest,
        cancel: &CancelFlag,
        trace: &mut RunTrace,
    ) -> Result<DedupOutcome> {
        let table = request
            .table
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| DedupError::ConfigError("table name is required".to_string()))?;
        if parse_columns(&request.columns, &self.options.delimiter).is_empty() {
            return Err(DedupError::ConfigError("no columns specified".to_string()));
        }

        let target = self.resolve_target(request, table);
        trace.target = Some(target.clone());
        info!("Validating {}", target);

        if !self.catalog.database_exists(&target.database)? {
            return Err(not_found(ObjectKind::Database, &target.database));
        }
        if !self.catalog.schema_exists(&target.database, &target.schema)? {
            return Err(not_found(ObjectKind::Schema, &target.schema));
        }
        if !self
            .catalog
            .table_exists(&target.database, &target.schema, &target.table)?
        {
            return Err(not_found(ObjectKind::Table, &target.table));
        }

        let actual = self
            .catalog
            .list_columns(&target.database, &target.schema, &target.table)?;
        let columns =
            validate_columns(&request.columns, &self.options.delimiter, &actual).into_result()?;
        trace.columns = columns.names().to_vec();
        info!("Validation passed for {} on ({})", target, columns);

        let plan = DedupPlan { target, columns };
        if cancel.is_cancelled() {
            return Err(DedupError::Cancelled);
        }
        let report = self.detector.detect(&plan)?;
        trace.report = Some(report);

        if self.options.dry_run {
            info!("Dry run: leaving {} unchanged", plan.target);
            return Ok(DedupOutcome::NoOp {
                pending: report.total_duplicate_rows,
            });
        }

        self.executor.execute(&plan, &report, cancel)
    }

    fn resolve_target(&self, request: &DedupRequest, table: &str) -> TargetRef {
        let pick = |given: &Option<String>, default: &str| {
            given
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| self.catalog.normalize_identifier(s))
                .unwrap_or_else(|| default.to_string())
        };
        TargetRef {
            database: pick(&request.database, &self.defaults.database),
            schema: pick(&request.schema, &self.defaults.schema),
            table: self.catalog.normalize_identifier(table),
        }
    }

    fn generate_report(
        &self,
        dir: &Path,
        trace: &RunTrace,
        outcome: &DedupOutcome,
        start_time: Instant,
    ) -> Result<()> {
        let report = json!({
            "target": trace.target,
            "columns": trace.columns,
            "duplicates_found": trace.report.map(|r| r.total_duplicate_rows),
            "dry_run": self.options.dry_run,
            "result": outcome,
            "status_code": outcome.status_code(),
            "message": outcome.message(),
            "duration_seconds": start_time.elapsed().as_secs_f64(),
        });

        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("dedup_report_{}.json", timestamp));
        let file = std::fs::File::create(&path)?;
        serde_json::to_writer_pretty(file, &report)
            .map_err(|e| DedupError::IoError(e.into()))?;
        info!("Outcome report written to {}", path.display());
        Ok(())
    }
}

fn not_found(kind: ObjectKind, name: &str) -> DedupError {
    DedupError::NotFound {
        kind,
        name: name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory::memory_store::{Fault, MemoryStore};
    use crate::ports::dedup_store_port::DedupTransaction;

    const DB: &str = "SHOP";
    const SCHEMA: &str = "dbo";

    fn defaults() -> SessionDefaults {
        SessionDefaults {
            database: DB.to_string(),
            schema: SCHEMA.to_string(),
        }
    }

    fn orchestrator(store: &Arc<MemoryStore>) -> Orchestrator {
        Orchestrator::new(
            store.clone(),
            store.clone(),
            defaults(),
            DedupOptions::default(),
        )
    }

    fn request(table: &str, columns: &str) -> DedupRequest {
        DedupRequest {
            database: None,
            schema: None,
            table: Some(table.to_string()),
            columns: columns.to_string(),
        }
    }

    /// 5 unique phones, then 13 repeats of 4 of them plus a new pair of
    /// iPhone 12 rows: 20 rows over 6 distinct combinations.
    fn phone_models() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new(DB, SCHEMA));
        store.create_table(DB, SCHEMA, "PhoneModels", &["DeviceName", "RAM", "Price"]);
        let originals = [
            ["Galaxy S21", "8", "799"],
            ["Pixel 6", "8", "599"],
            ["iPhone 13", "4", "829"],
            ["OnePlus 9", "12", "729"],
            ["Xperia 5", "8", "949"],
        ];
        for phone in &originals {
            store.insert_text(DB, SCHEMA, "PhoneModels", phone);
        }
        for (i, repeats) in [4, 4, 4, 1].iter().enumerate() {
            for _ in 0..*repeats {
                store.insert_text(DB, SCHEMA, "PhoneModels", &originals[i]);
            }
        }
        store.insert_text(DB, SCHEMA, "PhoneModels", &["iPhone 12", "64", "799"]);
        store.insert_text(DB, SCHEMA, "PhoneModels", &["iPhone 12", "64", "799"]);
        assert_eq!(store.rows(DB, SCHEMA, "PhoneModels").len(), 20);
        store
    }

    fn distinct_keys(store: &MemoryStore, table: &str) -> usize {
        let mut keys: Vec<_> = store
            .rows(DB, SCHEMA, table)
            .into_iter()
            .map(|r| r.values)
            .collect();
        keys.sort();
        keys.dedup();
        keys.len()
    }

    #[test]
    fn test_phone_models_scenario() {
        let store = phone_models();
        let outcome = orchestrator(&store).deduplicate(
            &request("PhoneModels", "DeviceName,RAM,Price"),
            &CancelFlag::new(),
        );

        assert_eq!(outcome, DedupOutcome::Success { deleted: 14 });
        assert_eq!(outcome.status_code(), 0);
        let rows = store.rows(DB, SCHEMA, "PhoneModels");
        assert_eq!(rows.len(), 6);
        assert_eq!(distinct_keys(&store, "PhoneModels"), 6);
    }

    #[test]
    fn test_quoted_case_variant_column_is_the_key() {
        let store = Arc::new(MemoryStore::new(DB, SCHEMA));
        store.create_table(DB, SCHEMA, "Prices", &["Price", "PRICE"]);
        store.insert_text(DB, SCHEMA, "Prices", &["10", "1"]);
        store.insert_text(DB, SCHEMA, "Prices", &["10", "2"]);
        store.insert_text(DB, SCHEMA, "Prices", &["20", "2"]);

        let outcome = orchestrator(&store)
            .deduplicate(&request("Prices", "Price"), &CancelFlag::new());
        assert_eq!(outcome, DedupOutcome::Success { deleted: 1 });
        let survivors: Vec<_> = store
            .rows(DB, SCHEMA, "Prices")
            .into_iter()
            .map(|r| r.values)
            .collect();
        assert_eq!(
            survivors,
            vec![
                vec![Some("10".to_string()), Some("1".to_string())],
                vec![Some("20".to_string()), Some("2".to_string())],
            ]
        );

        let outcome = orchestrator(&store)
            .deduplicate(&request("Prices", "price"), &CancelFlag::new());
        assert_eq!(outcome.status_code(), 1);
        assert_eq!(store.rows(DB, SCHEMA, "Prices").len(), 2);
    }

    #[test]
    fn test_deleted_count_matches_row_arithmetic() {
        let store = phone_models();
        let before = store.rows(DB, SCHEMA, "PhoneModels").len();
        let distinct_before = distinct_keys(&store, "PhoneModels");

        let outcome = orchestrator(&store).deduplicate(
            &request("PhoneModels", " Price , DeviceName, RAM "),
            &CancelFlag::new(),
        );
        assert_eq!(
            outcome,
            DedupOutcome::Success {
                deleted: (before - distinct_before) as u64
            }
        );
    }

    #[test]
    fn test_partial_key_keeps_one_row_per_value() {
        let store = phone_models();
        let outcome = orchestrator(&store)
            .deduplicate(&request("PhoneModels", "RAM"), &CancelFlag::new());

        // RAM values: 8, 4, 12, 64
        assert_eq!(outcome, DedupOutcome::Success { deleted: 16 });
        let mut ram: Vec<_> = store
            .rows(DB, SCHEMA, "PhoneModels")
            .into_iter()
            .map(|r| r.values[1].clone())
            .collect();
        ram.sort();
        ram.dedup();
        assert_eq!(ram.len(), 4);
    }

    #[test]
    fn test_second_run_is_a_no_op() {
        let store = phone_models();
        let orch = orchestrator(&store);
        let req = request("PhoneModels", "DeviceName,RAM,Price");
        orch.deduplicate(&req, &CancelFlag::new());

        let outcome = orch.deduplicate(&req, &CancelFlag::new());
        assert_eq!(
            outcome.into_status(),
            (0, "No duplicate rows found".to_string())
        );
        assert_eq!(store.rows(DB, SCHEMA, "PhoneModels").len(), 6);
    }

    #[test]
    fn test_failed_delete_leaves_table_identical() {
        let store = phone_models();
        let before: Vec<_> = store
            .rows(DB, SCHEMA, "PhoneModels")
            .into_iter()
            .map(|r| (r.id, r.values))
            .collect();
        store.inject(Fault::FailDelete);

        let (code, message) = orchestrator(&store)
            .deduplicate(
                &request("PhoneModels", "DeviceName,RAM,Price"),
                &CancelFlag::new(),
            )
            .into_status();

        assert_eq!(code, 1);
        assert!(message.starts_with("unable to delete records"));
        let after: Vec<_> = store
            .rows(DB, SCHEMA, "PhoneModels")
            .into_iter()
            .map(|r| (r.id, r.values))
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_missing_database_short_circuits() {
        let store = phone_models();
        let mut req = request("PhoneModels", "DeviceName");
        req.database = Some("NOPE".to_string());

        let (code, message) = orchestrator(&store)
            .deduplicate(&req, &CancelFlag::new())
            .into_status();

        assert_eq!(code, 1);
        assert_eq!(message, "Database 'NOPE' does not exist");
        assert_eq!(store.catalog_calls(), vec!["database_exists:NOPE"]);
    }

    #[test]
    fn test_missing_schema_and_table_are_named() {
        let store = phone_models();

        let mut req = request("PhoneModels", "DeviceName");
        req.schema = Some("sales".to_string());
        let outcome = orchestrator(&store).deduplicate(&req, &CancelFlag::new());
        assert_eq!(outcome.message(), "Schema 'sales' does not exist");

        let outcome = orchestrator(&store)
            .deduplicate(&request("Tablets", "DeviceName"), &CancelFlag::new());
        assert_eq!(outcome.message(), "Table 'Tablets' does not exist");

        assert_eq!(
            store.catalog_calls(),
            vec![
                "database_exists:SHOP",
                "schema_exists:SHOP.sales",
                "database_exists:SHOP",
                "schema_exists:SHOP.dbo",
                "table_exists:SHOP.dbo.Tablets",
            ]
        );
    }

    #[test]
    fn test_views_are_rejected() {
        let store = phone_models();
        store.create_view(DB, SCHEMA, "PhoneView", &["DeviceName"]);
        let outcome = orchestrator(&store)
            .deduplicate(&request("PhoneView", "DeviceName"), &CancelFlag::new());
        assert_eq!(outcome.message(), "Table 'PhoneView' does not exist");
    }

    #[test]
    fn test_unknown_columns_are_listed() {
        let store = Arc::new(MemoryStore::new(DB, SCHEMA));
        store.create_table(DB, SCHEMA, "Cities", &["City"]);

        let outcome = orchestrator(&store)
            .deduplicate(&request("Cities", "City,FakeCol"), &CancelFlag::new());
        assert_eq!(
            outcome.into_status(),
            (1, "Columns do not exist in the table: FakeCol".to_string())
        );
    }

    #[test]
    fn test_missing_inputs_never_touch_the_store() {
        let store = phone_models();

        let mut req = request("PhoneModels", "DeviceName");
        req.table = None;
        let outcome = orchestrator(&store).deduplicate(&req, &CancelFlag::new());
        assert_eq!(
            outcome.message(),
            "Configuration error: table name is required"
        );

        let outcome =
            orchestrator(&store).deduplicate(&request("PhoneModels", " , "), &CancelFlag::new());
        assert_eq!(outcome.message(), "Configuration error: no columns specified");

        assert!(store.catalog_calls().is_empty());
    }

    #[test]
    fn test_catalog_unavailable_is_fatal() {
        let store = phone_models();
        store.inject(Fault::CatalogDown);
        let outcome = orchestrator(&store)
            .deduplicate(&request("PhoneModels", "DeviceName"), &CancelFlag::new());
        assert_eq!(outcome.status_code(), 1);
        assert!(outcome.message().starts_with("Catalog unavailable"));
        assert_eq!(store.catalog_calls().len(), 1);
    }

    #[test]
    fn test_integrity_violation_rolls_back() {
        let store = phone_models();
        store.inject(Fault::ConcurrentInsert);
        let outcome = orchestrator(&store).deduplicate(
            &request("PhoneModels", "DeviceName,RAM,Price"),
            &CancelFlag::new(),
        );
        assert!(outcome
            .message()
            .starts_with("duplicates remain after deletion"));
        assert_eq!(store.rows(DB, SCHEMA, "PhoneModels").len(), 20);
    }

    #[test]
    fn test_cancelled_run_reports_cancelled() {
        let store = phone_models();
        let cancel = CancelFlag::new();
        store.inject(Fault::CancelDuringDelete(cancel.clone()));
        let outcome = orchestrator(&store).deduplicate(
            &request("PhoneModels", "DeviceName,RAM,Price"),
            &cancel,
        );
        assert_eq!(outcome.into_status(), (1, "cancelled".to_string()));
        assert_eq!(store.rows(DB, SCHEMA, "PhoneModels").len(), 20);
    }

    #[test]
    fn test_dry_run_reports_without_deleting() {
        let store = phone_models();
        let orch = Orchestrator::new(
            store.clone(),
            store.clone(),
            defaults(),
            DedupOptions {
                dry_run: true,
                ..DedupOptions::default()
            },
        );
        let outcome = orch.deduplicate(
            &request("PhoneModels", "DeviceName,RAM,Price"),
            &CancelFlag::new(),
        );
        assert_eq!(outcome, DedupOutcome::NoOp { pending: 14 });
        assert_eq!(store.rows(DB, SCHEMA, "PhoneModels").len(), 20);
    }

    #[test]
    fn test_explicit_database_and_schema() {
        let store = phone_models();
        store.create_schema("ARCHIVE", "hist");
        store.create_table("ARCHIVE", "hist", "Orders", &["OrderNo"]);
        store.insert_text("ARCHIVE", "hist", "Orders", &["1"]);
        store.insert_text("ARCHIVE", "hist", "Orders", &["1"]);

        let req = DedupRequest {
            database: Some("ARCHIVE".to_string()),
            schema: Some("hist".to_string()),
            table: Some("Orders".to_string()),
            columns: "OrderNo".to_string(),
        };
        let outcome = orchestrator(&store).deduplicate(&req, &CancelFlag::new());
        assert_eq!(outcome, DedupOutcome::Success { deleted: 1 });
        assert_eq!(store.rows("ARCHIVE", "hist", "Orders").len(), 1);
    }

    #[test]
    fn test_report_is_written() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = phone_models();
        let orch = Orchestrator::new(
            store.clone(),
            store.clone(),
            defaults(),
            DedupOptions {
                report_dir: Some(temp_dir.path().to_path_buf()),
                ..DedupOptions::default()
            },
        );
        orch.deduplicate(
            &request("PhoneModels", "DeviceName,RAM,Price"),
            &CancelFlag::new(),
        );

        let entry = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .find(|p| {
                let name = p.file_name().unwrap().to_string_lossy().to_string();
                name.starts_with("dedup_report_") && name.ends_with(".json")
            })
            .expect("report file");
        let report: serde_json::Value =
            serde_json::from_reader(std::fs::File::open(entry).unwrap()).unwrap();
        assert_eq!(report["duplicates_found"], 14);
        assert_eq!(report["result"]["outcome"], "SUCCESS");
        assert_eq!(report["status_code"], 0);
        assert_eq!(report["target"]["table"], "PhoneModels");
    }

    #[test]
    fn test_probe_failure_skips_executor() {
        struct BrokenStore;
        impl DedupStorePort for BrokenStore {
            fn count_duplicates(&self, _plan: &DedupPlan) -> Result<u64> {
                Err(DedupError::ExecutionError(
                    "duplicate probe failed: ORA-03113".to_string(),
                ))
            }
            fn begin<'a>(&'a self, _plan: &DedupPlan) -> Result<Box<dyn DedupTransaction + 'a>> {
                unreachable!()
            }
        }

        let catalog = phone_models();
        let orch = Orchestrator::new(
            catalog,
            Arc::new(BrokenStore),
            defaults(),
            DedupOptions::default(),
        );
        let outcome = orch.deduplicate(&request("PhoneModels", "RAM"), &CancelFlag::new());
        assert_eq!(
            outcome.into_status(),
            (1, "duplicate probe failed: ORA-03113".to_string())
        );
    }
}
