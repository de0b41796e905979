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

//! Oracle adapters for the catalog and dedup store ports.

pub mod connection_manager;
pub mod oracle_catalog_adapter;
pub mod oracle_dedup_adapter;
pub mod sql_utils;

use crate::domain::errors::DedupError;

/// Client-side call timeout exceeded, or the call was interrupted with
/// `Connection::break_execution`.
const CANCEL_CODES: [&str; 2] = ["DPI-1067", "ORA-01013"];

fn is_cancellation(message: &str) -> bool {
    CANCEL_CODES.iter().any(|code| message.contains(code))
}

/// Maps a dictionary lookup failure onto `CatalogUnavailable`.
pub(crate) fn catalog_error(e: impl std::fmt::Display) -> DedupError {
    DedupError::CatalogUnavailable(e.to_string())
}

/// Maps a failed statement onto `ExecutionError`, or `Cancelled` when the
/// call was timed out or interrupted.
pub(crate) fn store_error(context: &str, e: impl std::fmt::Display) -> DedupError {
    let message = e.to_string();
    if is_cancellation(&message) {
        DedupError::Cancelled
    } else {
        DedupError::ExecutionError(format!("{}: {}", context, message))
    }
}
