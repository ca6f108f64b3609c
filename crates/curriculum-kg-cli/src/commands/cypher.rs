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

//! Cypher command - render an import as a script

use super::{load_migration, read_table};
use crate::cli::LoadArgs;
use crate::error::CliError;
use curriculum_kg::ScriptStore;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Render the full import of `table` as a Cypher script, to `output` or
/// stdout.
pub fn cypher(
    config: &Path,
    table: &Path,
    output: Option<&Path>,
    load: &LoadArgs,
) -> Result<(), CliError> {
    let migration = load_migration(config, load)?;
    let rows = read_table(table)?;

    let mut store = ScriptStore::new();
    let report = migration.run(rows, &mut store)?;
    if !report.success() {
        return Err(CliError::ImportFailed {
            failed: report.import.failed_batches(),
            attempted: report.import.batches_attempted,
        });
    }
    let script = store.render();

    match output {
        Some(path) => {
            fs::write(path, &script).map_err(|e| CliError::io_error(path, e))?;
            tracing::info!(
                path = %path.display(),
                statements = store.script().len(),
                "wrote cypher script"
            );
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(script.as_bytes())
                .and_then(|_| stdout.flush())
                .map_err(|e| CliError::io_error("<stdout>", e))?;
        }
    }
    Ok(())
}
