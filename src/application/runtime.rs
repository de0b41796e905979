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

//! # Runtime Context
//!
//! Sets up the resources a run needs: the Oracle connection pool, the two
//! adapters sharing it, and the session defaults read once at startup.

use crate::application::orchestrator::Orchestrator;
use crate::config::AppConfig;
use crate::domain::entities::SessionDefaults;
use crate::domain::errors::{DedupError, Result};
use crate::infrastructure::oracle::connection_manager::OracleConnectionManager;
use crate::infrastructure::oracle::oracle_catalog_adapter::OracleCatalogAdapter;
use crate::infrastructure::oracle::oracle_dedup_adapter::OracleDedupAdapter;
use crate::ports::catalog_port::CatalogPort;
use log::info;
use r2d2::Pool;
use std::sync::Arc;
use std::time::Duration;

/// The engine issues one statement at a time, so two connections cover a
/// catalog lookup alongside an open transaction.
const DEFAULT_POOL_SIZE: u32 = 2;

/// `RuntimeContext` holds the shared resources for the life of the process.
pub struct RuntimeContext {
    pub pool: Arc<Pool<OracleConnectionManager>>,
    pub catalog: Arc<OracleCatalogAdapter>,
    pub store: Arc<OracleDedupAdapter>,
}

impl RuntimeContext {
    /// Initializes the Oracle connection pool and the adapters.
    pub fn init(config: &AppConfig) -> Result<Self> {
        let conn_str = config.database.get_connection_string();

        // Password from the config file first, then the environment.
        let password = config
            .database
            .password
            .clone()
            .or_else(|| std::env::var("ORACLE_PASSWORD").ok())
            .unwrap_or_default();

        let call_timeout = config.database.call_timeout_secs.map(Duration::from_secs);
        info!("Initializing connection pool for {}...", conn_str);

        let manager = OracleConnectionManager::new(
            &config.database.username,
            &password,
            &conn_str,
            call_timeout,
        );
        let pool = Pool::builder()
            .max_size(config.database.pool_size.unwrap_or(DEFAULT_POOL_SIZE))
            .build(manager)
            .map_err(|e| {
                DedupError::CatalogUnavailable(format!("Failed to create connection pool: {}", e))
            })?;
        let pool = Arc::new(pool);

        Ok(Self {
            catalog: Arc::new(OracleCatalogAdapter::new(pool.clone())),
            store: Arc::new(OracleDedupAdapter::new(pool.clone())),
            pool,
        })
    }

    /// Resolves the database and schema used when a request omits them.
    pub fn session_defaults(&self, config: &AppConfig) -> Result<SessionDefaults> {
        let database = self.catalog.current_database()?;
        let schema = match &config.dedup.default_schema {
            Some(s) => self.catalog.normalize_identifier(s),
            None => self.catalog.current_schema()?,
        };
        info!("Session defaults: database {}, schema {}", database, schema);
        Ok(SessionDefaults { database, schema })
    }

    pub fn orchestrator(&self, config: &AppConfig) -> Result<Orchestrator> {
        let defaults = self.session_defaults(config)?;
        Ok(Orchestrator::new(
            self.catalog.clone(),
            self.store.clone(),
            defaults,
            config.dedup.to_options(),
        ))
    }
}
