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

//! Application configuration.
//!
//! Settings come from a YAML or JSON file and can be overridden on the
//! command line. Table and columns are not checked here: a
//! missing table or empty column list is reported by the orchestrator as a
//! regular failed run.

use crate::application::orchestrator::DedupOptions;
use crate::domain::column_set::DEFAULT_DELIMITER;
use crate::domain::entities::DedupRequest;
use crate::domain::errors::{DedupError, Result};
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub dedup: DedupConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub username: String,
    pub password: Option<String>,
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub service: String,
    /// Full Oracle connect string. Takes precedence over host/port/service.
    pub connection_string: Option<String>,
    /// Client-side limit for any single database call.
    pub call_timeout_secs: Option<u64>,
    pub pool_size: Option<u32>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DedupConfig {
    /// Target database. Defaults to the connected database.
    pub database: Option<String>,
    /// Target schema. Defaults to `default_schema`.
    pub schema: Option<String>,
    /// Schema used when none is given. Defaults to the session's current schema.
    pub default_schema: Option<String>,
    pub table: Option<String>,
    pub columns: Option<String>,
    pub delimiter: Option<String>,
    pub dry_run: Option<bool>,
    pub report_dir: Option<String>,
}

fn default_port() -> u16 {
    1521
}

#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Remove duplicate rows from a table", long_about = None)]
pub struct CliArgs {
    /// Path to configuration file (YAML or JSON)
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(long)]
    pub username: Option<String>,
    #[arg(long)]
    pub password: Option<String>,
    #[arg(long)]
    pub host: Option<String>,
    #[arg(long)]
    pub port: Option<u16>,
    #[arg(long)]
    pub service: Option<String>,

    /// Target database (local database name or database link)
    #[arg(long)]
    pub database: Option<String>,
    #[arg(long)]
    pub schema: Option<String>,
    #[arg(short, long)]
    pub table: Option<String>,
    /// Columns that define a duplicate, e.g. "DeviceName,RAM,Price"
    #[arg(long)]
    pub columns: Option<String>,
    #[arg(long)]
    pub delimiter: Option<String>,
    /// Count duplicates without deleting them
    #[arg(long)]
    pub dry_run: bool,
    /// Directory for the JSON outcome report
    #[arg(long)]
    pub report_dir: Option<String>,
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = if path.ends_with(".json") {
            serde_json::from_str(&contents).map_err(|e| DedupError::ConfigError(e.to_string()))?
        } else {
            serde_yaml::from_str(&contents).map_err(|e| DedupError::ConfigError(e.to_string()))?
        };
        Ok(config)
    }

    /// Builds a configuration from command line arguments alone.
    pub fn from_cli(args: &CliArgs) -> Self {
        Self {
            database: DatabaseConfig {
                username: args.username.clone().unwrap_or_default(),
                password: args.password.clone(),
                host: args.host.clone().unwrap_or_default(),
                port: args.port.unwrap_or_else(default_port),
                service: args.service.clone().unwrap_or_default(),
                connection_string: None,
                call_timeout_secs: None,
                pool_size: None,
            },
            dedup: DedupConfig::default(),
        }
    }

    pub fn merge_cli(&mut self, args: &CliArgs) {
        if let Some(u) = &args.username { self.database.username = u.clone(); }
        if let Some(p) = &args.password { self.database.password = Some(p.clone()); }
        if let Some(h) = &args.host { self.database.host = h.clone(); }
        if let Some(p) = args.port { self.database.port = p; }
        if let Some(s) = &args.service { self.database.service = s.clone(); }
        if let Some(d) = &args.database { self.dedup.database = Some(d.clone()); }
        if let Some(s) = &args.schema { self.dedup.schema = Some(s.clone()); }
        if let Some(t) = &args.table { self.dedup.table = Some(t.clone()); }
        if let Some(c) = &args.columns { self.dedup.columns = Some(c.clone()); }
        if let Some(d) = &args.delimiter { self.dedup.delimiter = Some(d.clone()); }
        if args.dry_run { self.dedup.dry_run = Some(true); }
        if let Some(r) = &args.report_dir { self.dedup.report_dir = Some(r.clone()); }
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.username.trim().is_empty() {
            return Err(DedupError::ConfigError("database username is required".into()));
        }
        if self.database.connection_string.is_none()
            && (self.database.host.trim().is_empty() || self.database.service.trim().is_empty())
        {
            return Err(DedupError::ConfigError(
                "either connection_string or host and service must be set".into(),
            ));
        }
        if self.database.pool_size == Some(0) {
            return Err(DedupError::ConfigError("pool_size must be at least 1".into()));
        }
        if self.dedup.delimiter.as_deref() == Some("") {
            return Err(DedupError::ConfigError("delimiter must not be empty".into()));
        }
        Ok(())
    }
}

impl DatabaseConfig {
    pub fn get_connection_string(&self) -> String {
        self.connection_string
            .clone()
            .unwrap_or_else(|| format!("//{}:{}/{}", self.host, self.port, self.service))
    }
}

impl DedupConfig {
    pub fn to_request(&self) -> DedupRequest {
        DedupRequest {
            database: self.database.clone(),
            schema: self.schema.clone(),
            table: self.table.clone(),
            columns: self.columns.clone().unwrap_or_default(),
        }
    }

    pub fn to_options(&self) -> DedupOptions {
        DedupOptions {
            delimiter: self
                .delimiter
                .clone()
                .unwrap_or_else(|| DEFAULT_DELIMITER.to_string()),
            dry_run: self.dry_run.unwrap_or(false),
            report_dir: self.report_dir.as_ref().map(PathBuf::from),
        }
    }
}
