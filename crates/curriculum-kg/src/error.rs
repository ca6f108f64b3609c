// Curriculum KG - Curriculum Knowledge Graph Migration
//
// Copyright (c) 2025 Dweve IP B.V. and individual contributors.
//
// SPDX-License-Identifier: Apache-2.0
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository or at: http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error types for the migration engine.
//!
//! Only [`MigrationError::Configuration`] and [`MigrationError::Connection`]
//! abort a run. Mapping and coercion problems are recovered where they occur
//! (the row is skipped, or the value falls back to a string) and batch
//! failures are collected into the [`ImportResult`](crate::ImportResult).

use thiserror::Error;

/// Error type for migration operations.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Malformed or incomplete mapping configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A row could not be resolved into a graph record.
    #[error("mapping error in '{mapping}': {message}")]
    Mapping {
        /// The node or relationship mapping being materialized.
        mapping: String,
        /// What went wrong.
        message: String,
    },

    /// A value could not be converted to its target type.
    #[error("cannot convert {value} to {target}")]
    Coercion {
        /// The raw value, rendered for display.
        value: String,
        /// The requested target type.
        target: String,
    },

    /// A single batch write failed against the graph store.
    #[error("{group} batch {batch_index} failed: {message}")]
    BatchExecution {
        /// Label or relationship type of the batch.
        group: String,
        /// 1-based index of the batch within its group.
        batch_index: usize,
        /// Store-provided failure cause.
        message: String,
    },

    /// The graph store could not be reached, or the destructive clear failed.
    #[error("connection error: {0}")]
    Connection(String),

    /// I/O failure while reading input or writing output files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reading or writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON parsing or serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MigrationError {
    /// Shorthand for a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        MigrationError::Configuration(message.into())
    }

    /// Whether this error aborts a run (as opposed to being recovered locally).
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            MigrationError::Mapping { .. }
                | MigrationError::Coercion { .. }
                | MigrationError::BatchExecution { .. }
        )
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_execution_message_names_group_and_index() {
        let err = MigrationError::BatchExecution {
            group: "Lesson".to_string(),
            batch_index: 2,
            message: "constraint violation".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Lesson batch 2 failed: constraint violation"
        );
    }

    #[test]
    fn test_mapping_error_display() {
        let err = MigrationError::Mapping {
            mapping: "Unit".to_string(),
            message: "unparseable array".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Unit"));
        assert!(msg.contains("unparseable array"));
    }

    #[test]
    fn test_fatality() {
        assert!(MigrationError::config("bad").is_fatal());
        assert!(MigrationError::Connection("down".to_string()).is_fatal());
        assert!(!MigrationError::Coercion {
            value: "abc".to_string(),
            target: "int".to_string(),
        }
        .is_fatal());
    }

    #[test]
    fn test_error_from_json_error() {
        let json_err: serde_json::Error = serde_json::from_str::<i32>("invalid").unwrap_err();
        let err: MigrationError = json_err.into();
        assert!(matches!(err, MigrationError::Json(_)));
    }
}
