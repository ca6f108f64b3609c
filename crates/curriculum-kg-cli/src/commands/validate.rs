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

//! Validate command - configuration checks without reading data

use super::load_pipeline;
use crate::cli::LoadArgs;
use crate::error::CliError;
use colored::Colorize;
use curriculum_kg::IdFieldSpec;
use std::path::Path;

/// Validate a mapping or pipeline configuration and summarize it.
///
/// Prints one line per node and relationship mapping. Fails with the
/// first configuration error found.
pub fn validate(path: &Path) -> Result<(), CliError> {
    let pipeline = match load_pipeline(path, &LoadArgs::default()) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            println!("{} {}", "✗".red().bold(), path.display());
            return Err(e);
        }
    };
    let mapping = &pipeline.mapping;

    println!("{} {}", "✓".green().bold(), path.display());
    println!("  Nodes: {}", mapping.nodes.len());
    for node in &mapping.nodes {
        let source = match &node.id_field {
            IdFieldSpec::SourceField { column } => format!("column {}", column),
            IdFieldSpec::StaticSynthetic { value } => format!("static {:?}", value),
            IdFieldSpec::TemplatedSynthetic { template } => {
                format!("template {:?}", template.as_str())
            }
            IdFieldSpec::ArrayExpansion {
                source_column,
                id_key,
            } => format!("array {}[].{}", source_column, id_key),
        };
        println!(
            "    {} ({}: {}) <- {}, {} properties",
            node.label,
            node.id_property,
            node.id_type,
            source,
            node.properties.len()
        );
    }
    println!("  Relationships: {}", mapping.relationships.len());
    for rel in &mapping.relationships {
        println!(
            "    ({})-[{}]->({})",
            rel.start_node_type, rel.relationship_type, rel.end_node_type
        );
    }
    if !pipeline.filters.is_empty() {
        println!("  Filters: {}", pipeline.filters.len());
    }
    Ok(())
}
