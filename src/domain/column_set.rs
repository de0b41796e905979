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

//! # Column Set Validator
//!
//! Turns the caller's delimited column list into a `ValidatedColumns` value.
//!
//! This is the whitelist step for dynamic SQL: column names cannot be bound
//! as parameters, so only names proven to exist in the table's column
//! registry are allowed through to the statement builders.
//!
//! A requested name that matches a registry name exactly resolves to it.
//! Otherwise matching is case-insensitive as long as exactly one registry
//! name folds to the same upper-case form, so `devicename` resolves to
//! `DEVICENAME` on Oracle while `Price` never silently becomes `PRICE` when
//! both columns exist.

use crate::domain::entities::{ValidatedColumns, ValidationResult};
use crate::domain::errors::{DedupError, Result};
use std::collections::{BTreeSet, HashSet};

pub const DEFAULT_DELIMITER: &str = ",";

const NO_COLUMNS: &str = "no columns specified";
const MISSING_COLUMNS: &str = "columns do not exist";
const AMBIGUOUS_COLUMNS: &str = "column names match more than one column";

/// Splits, trims and de-duplicates a raw column list, keeping first-seen order.
///
/// Only identical tokens are repeats. `Price` and `PRICE` may name two
/// different quoted columns, so both are kept here.
pub fn parse_columns(raw: &str, delimiter: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.split(delimiter)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter(|token| seen.insert(*token))
        .map(str::to_string)
        .collect()
}

enum Resolution<'a> {
    Found(&'a String),
    Missing,
    Ambiguous,
}

fn resolve<'a>(name: &str, actual: &'a [String]) -> Resolution<'a> {
    if let Some(exact) = actual.iter().find(|c| c.as_str() == name) {
        return Resolution::Found(exact);
    }
    let folded = name.to_uppercase();
    let mut candidates = actual.iter().filter(|c| c.to_uppercase() == folded);
    match (candidates.next(), candidates.next()) {
        (Some(only), None) => Resolution::Found(only),
        (Some(_), Some(_)) => Resolution::Ambiguous,
        (None, _) => Resolution::Missing,
    }
}

/// Checks a raw column list against the table's actual columns.
///
/// Pure function: no store access, no side effects.
pub fn validate_columns(raw: &str, delimiter: &str, actual: &[String]) -> ValidationResult {
    let requested = parse_columns(raw, delimiter);
    if requested.is_empty() {
        return ValidationResult::Invalid {
            reason: NO_COLUMNS.to_string(),
            offending: vec![],
        };
    }

    // BTreeSet keeps the reports sorted and free of repeats.
    let mut missing = BTreeSet::new();
    let mut ambiguous = BTreeSet::new();
    let mut seen = HashSet::new();
    let mut resolved = Vec::with_capacity(requested.len());
    for name in &requested {
        match resolve(name, actual) {
            Resolution::Found(canonical) => {
                // `city` and `CITY` both resolving to `CITY` is one key column.
                if seen.insert(canonical) {
                    resolved.push(canonical.clone());
                }
            }
            Resolution::Missing => {
                missing.insert(name.clone());
            }
            Resolution::Ambiguous => {
                ambiguous.insert(name.clone());
            }
        }
    }

    if !missing.is_empty() {
        return ValidationResult::Invalid {
            reason: MISSING_COLUMNS.to_string(),
            offending: missing.into_iter().collect(),
        };
    }
    if !ambiguous.is_empty() {
        return ValidationResult::Invalid {
            reason: AMBIGUOUS_COLUMNS.to_string(),
            offending: ambiguous.into_iter().collect(),
        };
    }

    ValidationResult::Valid(ValidatedColumns::new(resolved))
}

impl ValidationResult {
    /// Maps an `Invalid` result onto the engine's error taxonomy.
    pub fn into_result(self) -> Result<ValidatedColumns> {
        match self {
            ValidationResult::Valid(columns) => Ok(columns),
            ValidationResult::Invalid { reason, offending } if reason == MISSING_COLUMNS => {
                Err(DedupError::SchemaMismatch { columns: offending })
            }
            ValidationResult::Invalid { reason, offending } if offending.is_empty() => {
                Err(DedupError::ConfigError(reason))
            }
            ValidationResult::Invalid { reason, offending } => Err(DedupError::ConfigError(
                format!("{}: {}", reason, offending.join(", ")),
            )),
        }
    }
}
