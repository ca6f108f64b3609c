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

//! Export command - bulk-import CSV files

use super::{load_migration, read_table};
use crate::cli::LoadArgs;
use crate::error::CliError;
use colored::Colorize;
use curriculum_kg::export_bulk_files;
use std::path::Path;

/// Materialize `table` and write bulk-import CSV files under `out`.
pub fn export_csv(config: &Path, table: &Path, out: &Path, load: &LoadArgs) -> Result<(), CliError> {
    let migration = load_migration(config, load)?;
    let rows = migration.prepare(read_table(table)?);
    let graph = migration.materialize(&rows)?;
    let files = export_bulk_files(out, migration.config(), &graph)?;

    for path in files.all() {
        println!("{} {}", "✓".green().bold(), path.display());
    }
    println!(
        "  {} nodes, {} relationships in {} files",
        graph.node_count(),
        graph.relationship_count(),
        files.all().count()
    );
    Ok(())
}
