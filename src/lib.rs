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

//! # Table Deduplication Engine
//!
//! Removes duplicate rows from a table, where "duplicate" means equal on a
//! caller-supplied list of columns. One row per group survives.
//!
//! The run validates the target object graph before touching data, builds
//! the ranking and delete statements from whitelisted column names, and
//! deletes inside a single transaction that is verified before it commits.
//!
//! This crate follows the **Hexagonal Architecture** (Ports and Adapters):
//! the application layer talks to the catalog and the store only through
//! the traits in `ports`.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ports;
