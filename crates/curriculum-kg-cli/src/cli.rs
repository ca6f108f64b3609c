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

//! CLI command definitions and argument parsing.

use crate::commands;
use crate::error::CliError;
use clap::{Args, Subcommand};
use curriculum_kg::PipelineConfig;
use std::path::PathBuf;

/// Overrides for the load settings in the configuration document.
#[derive(Args, Debug, Clone, Default)]
pub struct LoadArgs {
    /// Records per write batch
    #[arg(long, value_name = "N")]
    pub batch_size: Option<usize>,

    /// Records per shard
    #[arg(long, value_name = "N")]
    pub shard_size: Option<usize>,

    /// Delete every node and relationship before importing
    #[arg(long)]
    pub clear: bool,

    /// Create uniqueness constraints on identity properties
    #[arg(long)]
    pub constraints: bool,
}

impl LoadArgs {
    /// Apply the overrides to a parsed pipeline document.
    pub fn apply(&self, pipeline: &mut PipelineConfig) {
        if let Some(size) = self.batch_size {
            pipeline.load.batch_size = size;
        }
        if let Some(size) = self.shard_size {
            pipeline.load.shard_size = size;
        }
        if self.clear {
            pipeline.load.clear_before_import = true;
        }
        if self.constraints {
            pipeline.load.create_constraints = true;
        }
    }
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a mapping or pipeline configuration
    Validate {
        /// Configuration file
        #[arg(value_name = "CONFIG")]
        config: PathBuf,
    },

    /// Write bulk-import CSV files
    ///
    /// One file per node mapping and one per relationship mapping, in the
    /// header format of the offline importer.
    ExportCsv {
        /// Configuration file
        #[arg(value_name = "CONFIG")]
        config: PathBuf,

        /// Source table (.csv or JSON array of objects)
        #[arg(value_name = "TABLE")]
        table: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR", default_value = "output")]
        out: PathBuf,

        #[command(flatten)]
        load: LoadArgs,
    },

    /// Render the import as a Cypher script
    ///
    /// Every batch becomes one statement with its parameters inlined.
    Cypher {
        /// Configuration file
        #[arg(value_name = "CONFIG")]
        config: PathBuf,

        /// Source table (.csv or JSON array of objects)
        #[arg(value_name = "TABLE")]
        table: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        load: LoadArgs,
    },

    /// Show the batches an import would run
    Plan {
        /// Configuration file
        #[arg(value_name = "CONFIG")]
        config: PathBuf,

        /// Source table (.csv or JSON array of objects)
        #[arg(value_name = "TABLE")]
        table: PathBuf,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        load: LoadArgs,
    },
}

impl Commands {
    /// Execute the command.
    pub fn execute(self) -> Result<(), CliError> {
        match self {
            Commands::Validate { config } => commands::validate(&config),
            Commands::ExportCsv {
                config,
                table,
                out,
                load,
            } => commands::export_csv(&config, &table, &out, &load),
            Commands::Cypher {
                config,
                table,
                output,
                load,
            } => commands::cypher(&config, &table, output.as_deref(), &load),
            Commands::Plan {
                config,
                table,
                json,
                load,
            } => commands::plan(&config, &table, &load, json),
        }
    }
}
