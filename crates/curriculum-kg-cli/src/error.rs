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

//! Structured error types for the CLI.

use curriculum_kg::MigrationError;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors reported by CLI commands.
#[derive(Error, Debug)]
pub enum CliError {
    /// Reading or writing a file failed.
    #[error("I/O error for '{path}': {message}")]
    Io {
        /// The file involved
        path: PathBuf,
        /// The error message
        message: String,
    },

    /// The configuration document is invalid.
    #[error("invalid configuration '{path}': {source}")]
    Config {
        /// The configuration file
        path: PathBuf,
        /// What was wrong with it
        #[source]
        source: MigrationError,
    },

    /// The source table could not be read.
    #[error("cannot read table '{path}': {source}")]
    Table {
        /// The table file
        path: PathBuf,
        /// The underlying failure
        #[source]
        source: MigrationError,
    },

    /// Materialization, planning, or export failed.
    #[error(transparent)]
    Migration(#[from] MigrationError),

    /// The run finished with recorded errors.
    #[error("{failed} of {attempted} batches failed")]
    ImportFailed {
        /// Failed batches
        failed: usize,
        /// Attempted batches
        attempted: usize,
    },
}

impl CliError {
    /// An I/O error with path context.
    pub fn io_error(path: impl AsRef<Path>, err: std::io::Error) -> Self {
        CliError::Io {
            path: path.as_ref().to_path_buf(),
            message: err.to_string(),
        }
    }

    /// A configuration error with path context.
    pub fn config(path: impl AsRef<Path>, source: MigrationError) -> Self {
        CliError::Config {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// A table error with path context.
    pub fn table(path: impl AsRef<Path>, source: MigrationError) -> Self {
        CliError::Table {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_names_path() {
        let err = CliError::config("mapping.json", MigrationError::config("no nodes"));
        let msg = err.to_string();
        assert!(msg.contains("mapping.json"));
        assert!(msg.contains("no nodes"));
    }

    #[test]
    fn test_import_failed_display() {
        let err = CliError::ImportFailed {
            failed: 1,
            attempted: 3,
        };
        assert_eq!(err.to_string(), "1 of 3 batches failed");
    }
}
