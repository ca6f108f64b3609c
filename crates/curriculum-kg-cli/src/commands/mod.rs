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

//! CLI command implementations

mod cypher;
mod export;
mod plan;
mod validate;

pub use cypher::cypher;
pub use export::export_csv;
pub use plan::plan;
pub use validate::validate;

use crate::cli::LoadArgs;
use crate::error::CliError;
use curriculum_kg::{read_rows, Migration, PipelineConfig, Row};
use std::path::Path;

/// Load a configuration document and apply command-line overrides.
pub fn load_pipeline(path: &Path, load: &LoadArgs) -> Result<PipelineConfig, CliError> {
    let mut pipeline = PipelineConfig::from_path(path).map_err(|e| CliError::config(path, e))?;
    load.apply(&mut pipeline);
    pipeline
        .load
        .validate()
        .map_err(|e| CliError::config(path, e))?;
    Ok(pipeline)
}

/// Build a migration from a configuration file.
pub fn load_migration(path: &Path, load: &LoadArgs) -> Result<Migration, CliError> {
    let pipeline = load_pipeline(path, load)?;
    Migration::from_pipeline(pipeline).map_err(|e| CliError::config(path, e))
}

/// Read the source table.
pub fn read_table(path: &Path) -> Result<Vec<Row>, CliError> {
    read_rows(path).map_err(|e| CliError::table(path, e))
}
