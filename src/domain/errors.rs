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

//! Core error definitions for the deduplication engine.
//!
//! This module provides a centralized `DedupError` enum and a `Result` type
//! used throughout the engine. Every variant is eventually converted into a
//! `(status_code, message)` pair by the orchestrator, so the display text of
//! each variant is the message the caller sees.

use std::fmt;
use thiserror::Error;

/// The kind of catalog object a `NotFound` error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Database,
    Schema,
    Table,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Database => write!(f, "Database"),
            ObjectKind::Schema => write!(f, "Schema"),
            ObjectKind::Table => write!(f, "Table"),
        }
    }
}

/// Error types encountered while validating or deduplicating a table.
#[derive(Error, Debug)]
pub enum DedupError {
    /// Required input is missing or malformed. No store access is made for it.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("{kind} '{name}' does not exist")]
    NotFound { kind: ObjectKind, name: String },

    /// One or more requested columns are not part of the target table.
    /// The list is sorted so the message is reproducible.
    #[error("Columns do not exist in the table: {}", .columns.join(", "))]
    SchemaMismatch { columns: Vec<String> },

    /// A statement against the store failed. The message is already phrased
    /// by the component that issued the statement.
    #[error("{0}")]
    ExecutionError(String),

    /// Post-delete verification still found duplicate rows.
    #[error("duplicates remain after deletion ({remaining} rows)")]
    IntegrityViolation { remaining: u64 },

    /// The metadata catalog could not be queried. Never retried within a call.
    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DedupError {
    /// Every failure maps to status code 1 at the public entry point.
    pub fn status_code(&self) -> i32 {
        1
    }
}

/// A specialized Result type for the deduplication engine.
pub type Result<T> = std::result::Result<T, DedupError>;
