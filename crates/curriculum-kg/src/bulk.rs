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

//! Bulk-import CSV export.
//!
//! Writes one file per node mapping and one per relationship mapping in
//! the header convention of the graph database's offline importer:
//!
//! ```text
//! lessonSlug:ID(Lesson),title:string,order:int
//! :START_ID(Unit),:END_ID(Lesson),:TYPE,order:int
//! ```
//!
//! Non-numeric fields are quoted. Cells a record does not carry are
//! written as the zero value of their declared type.

use crate::config::{
    MappingConfig, NodeMapping, PropertySpec, PropertySpecs, RelationshipMapping, TargetType,
};
use crate::cypher::CypherValue;
use crate::error::Result;
use crate::materialize::{MaterializedGraph, NodeRecord, RelationshipRecord};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Paths written by [`export_bulk_files`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkFiles {
    /// Node files, in mapping order.
    pub node_files: Vec<PathBuf>,
    /// Relationship files, in mapping order.
    pub relationship_files: Vec<PathBuf>,
}

impl BulkFiles {
    /// Every written path, nodes first.
    pub fn all(&self) -> impl Iterator<Item = &PathBuf> {
        self.node_files.iter().chain(&self.relationship_files)
    }
}

/// File name for a node mapping.
pub fn node_file_name(mapping: &NodeMapping) -> String {
    format!("{}_nodes.csv", mapping.label.to_lowercase())
}

/// File name for a relationship mapping.
pub fn relationship_file_name(mapping: &RelationshipMapping) -> String {
    format!("{}_relationships.csv", mapping.key.to_lowercase())
}

/// Header row for a node file.
pub fn node_header(mapping: &NodeMapping) -> Vec<String> {
    let mut header = vec![format!("{}:ID({})", mapping.id_property, mapping.label)];
    header.extend(
        data_properties(&mapping.properties, Some(&mapping.id_property))
            .map(|(name, spec)| typed_column(name, spec.target_type)),
    );
    header
}

/// Header row for a relationship file. Endpoint id spaces are named after
/// the endpoint labels.
pub fn relationship_header(
    mapping: &RelationshipMapping,
    start_label: &str,
    end_label: &str,
) -> Vec<String> {
    let mut header = vec![
        format!(":START_ID({})", start_label),
        format!(":END_ID({})", end_label),
        ":TYPE".to_string(),
    ];
    header.extend(
        data_properties(&mapping.properties, None)
            .map(|(name, spec)| typed_column(name, spec.target_type)),
    );
    header
}

/// Write node records with a header row. Returns the number of records.
pub fn write_nodes<W: Write>(
    writer: W,
    mapping: &NodeMapping,
    records: &[NodeRecord],
) -> Result<usize> {
    let mut wtr = csv_writer(writer);
    wtr.write_record(node_header(mapping))?;

    for record in records {
        let mut fields = vec![record.generated_id.to_text()];
        fields.extend(
            data_properties(&mapping.properties, Some(&mapping.id_property))
                .map(|(name, spec)| cell(record.properties.get(name), spec.target_type)),
        );
        wtr.write_record(&fields)?;
    }
    wtr.flush()?;
    Ok(records.len())
}

/// Write relationship records with a header row. Returns the number of
/// records.
pub fn write_relationships<W: Write>(
    writer: W,
    mapping: &RelationshipMapping,
    start_label: &str,
    end_label: &str,
    records: &[RelationshipRecord],
) -> Result<usize> {
    let mut wtr = csv_writer(writer);
    wtr.write_record(relationship_header(mapping, start_label, end_label))?;

    for record in records {
        let mut fields = vec![
            record.start_id.to_text(),
            record.end_id.to_text(),
            record.relationship_type.clone(),
        ];
        fields.extend(
            data_properties(&mapping.properties, None)
                .map(|(name, spec)| cell(record.properties.get(name), spec.target_type)),
        );
        wtr.write_record(&fields)?;
    }
    wtr.flush()?;
    Ok(records.len())
}

/// Write every non-empty mapping of `graph` under `dir`, creating the
/// directory if needed.
pub fn export_bulk_files(
    dir: impl AsRef<Path>,
    config: &MappingConfig,
    graph: &MaterializedGraph,
) -> Result<BulkFiles> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let mut files = BulkFiles::default();

    for mapping in &config.nodes {
        let records = graph.nodes_for(&mapping.key);
        if records.is_empty() {
            continue;
        }
        let path = dir.join(node_file_name(mapping));
        let written = write_nodes(fs::File::create(&path)?, mapping, records)?;
        tracing::info!(path = %path.display(), nodes = written, "wrote node file");
        files.node_files.push(path);
    }

    for mapping in &config.relationships {
        let records = graph.relationships_for(&mapping.key);
        if records.is_empty() {
            continue;
        }
        let start_label = endpoint_label(config, &mapping.start_node_type);
        let end_label = endpoint_label(config, &mapping.end_node_type);
        let path = dir.join(relationship_file_name(mapping));
        let written = write_relationships(
            fs::File::create(&path)?,
            mapping,
            start_label,
            end_label,
            records,
        )?;
        tracing::info!(path = %path.display(), relationships = written, "wrote relationship file");
        files.relationship_files.push(path);
    }

    Ok(files)
}

fn csv_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::NonNumeric)
        .from_writer(writer)
}

fn endpoint_label<'c>(config: &'c MappingConfig, node_type: &'c str) -> &'c str {
    config
        .node_mapping(node_type)
        .map(|m| m.label.as_str())
        .unwrap_or(node_type)
}

fn data_properties<'m>(
    properties: &'m PropertySpecs,
    skip: Option<&'m String>,
) -> impl Iterator<Item = (&'m String, &'m PropertySpec)> {
    properties.iter().filter(move |(name, _)| Some(*name) != skip)
}

fn typed_column(name: &str, target_type: TargetType) -> String {
    format!("{}:{}", name, target_type)
}

fn cell(value: Option<&CypherValue>, target_type: TargetType) -> String {
    match value {
        Some(value) if !value.is_null() => value.to_text(),
        _ => match target_type {
            TargetType::Int => "0".to_string(),
            TargetType::Float => "0.0".to_string(),
            TargetType::Boolean => "false".to_string(),
            TargetType::String | TargetType::Datetime | TargetType::List => String::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IdFieldSpec, PropertySpec};
    use crate::materialize::{fixed_clock, NodeMaterializer, RelationshipMaterializer};
    use crate::table::Row;

    fn config() -> MappingConfig {
        let lesson = NodeMapping::from_column("Lesson", "lesson_slug")
            .with_identity("lessonSlug", TargetType::String)
            .with_property("title", PropertySpec::column("lesson_title", TargetType::String))
            .with_property("order", PropertySpec::column("lesson_order", TargetType::Int));
        let unit = NodeMapping::from_column("Unit", "unit_slug").with_identity("unitSlug", TargetType::String);
        let has_lesson = RelationshipMapping::new("HAS_LESSON", "Unit", "unit_slug", "Lesson", "lesson_slug")
            .with_property("position", PropertySpec::column("lesson_order", TargetType::Int));
        MappingConfig::new(vec![lesson, unit], vec![has_lesson]).unwrap()
    }

    fn graph(config: &MappingConfig, rows: &[Row]) -> MaterializedGraph {
        let mut nodes = NodeMaterializer::new().with_clock(fixed_clock("t"));
        let mut graph = MaterializedGraph::default();
        for mapping in &config.nodes {
            let records = nodes.materialize(rows, mapping);
            graph.nodes.push((mapping.key.clone(), records));
        }
        let mut rels = RelationshipMaterializer::new(config, nodes.registry());
        for mapping in &config.relationships {
            let records = rels.materialize(rows, mapping).unwrap();
            graph.relationships.push((mapping.key.clone(), records));
        }
        graph
    }

    #[test]
    fn test_node_header() {
        let config = config();
        assert_eq!(
            node_header(&config.nodes[0]),
            vec!["lessonSlug:ID(Lesson)", "title:string", "order:int"]
        );
    }

    #[test]
    fn test_node_header_follows_document_order() {
        let config = MappingConfig::from_json_str(
            r#"{
                "nodes": {
                    "Lesson": {
                        "id_field": {"hasura_col": "lesson_slug", "property_name": "lessonSlug"},
                        "properties": {
                            "title": {"hasura_col": "lesson_title", "type": "string"},
                            "order": {"hasura_col": "lesson_order", "type": "int"},
                            "archived": {"hasura_col": "is_archived", "type": "boolean"}
                        }
                    }
                }
            }"#,
        )
        .unwrap();
        assert_eq!(
            node_header(&config.nodes[0]),
            vec![
                "lessonSlug:ID(Lesson)",
                "title:string",
                "order:int",
                "archived:boolean"
            ]
        );
    }

    #[test]
    fn test_relationship_header() {
        let config = config();
        assert_eq!(
            relationship_header(&config.relationships[0], "Unit", "Lesson"),
            vec![":START_ID(Unit)", ":END_ID(Lesson)", ":TYPE", "position:int"]
        );
    }

    #[test]
    fn test_missing_cells_get_zero_defaults() {
        let config = config();
        let rows = vec![Row::new().with("lesson_slug", "intro").with("unit_slug", "u1")];
        let graph = graph(&config, &rows);

        let mut out = Vec::new();
        write_nodes(&mut out, &config.nodes[0], graph.nodes_for("Lesson")).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some(r#""lessonSlug:ID(Lesson)","title:string","order:int""#)
        );
        assert_eq!(lines.next(), Some(r#""intro","",0"#));
    }

    #[test]
    fn test_numbers_are_not_quoted() {
        let config = config();
        let rows = vec![Row::new()
            .with("lesson_slug", "intro")
            .with("unit_slug", "u1")
            .with("lesson_order", "3")];
        let graph = graph(&config, &rows);

        let mut out = Vec::new();
        write_relationships(
            &mut out,
            &config.relationships[0],
            "Unit",
            "Lesson",
            graph.relationships_for("HAS_LESSON"),
        )
        .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().nth(1), Some(r#""u1","intro","HAS_LESSON",3"#));
    }

    #[test]
    fn test_export_writes_named_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = config();
        let rows = vec![
            Row::new().with("lesson_slug", "a").with("unit_slug", "u1"),
            Row::new().with("lesson_slug", "b").with("unit_slug", "u1"),
        ];
        let graph = graph(&config, &rows);

        let files = export_bulk_files(dir.path(), &config, &graph).unwrap();
        let names: Vec<_> = files
            .all()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec!["lesson_nodes.csv", "unit_nodes.csv", "has_lesson_relationships.csv"]
        );

        let units = fs::read_to_string(dir.path().join("unit_nodes.csv")).unwrap();
        assert_eq!(units.lines().count(), 2);
        let rels = fs::read_to_string(dir.path().join("has_lesson_relationships.csv")).unwrap();
        assert_eq!(rels.lines().count(), 3);
    }

    #[test]
    fn test_empty_mappings_write_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let static_node = NodeMapping::from_column("Phase", "unused").with_id_field(IdFieldSpec::StaticSynthetic {
            value: "secondary".to_string(),
        });
        let config = MappingConfig::new(vec![config().nodes[0].clone(), static_node], Vec::new()).unwrap();
        let graph = graph(&config, &[]);

        let files = export_bulk_files(dir.path(), &config, &graph).unwrap();
        assert_eq!(files.node_files, vec![dir.path().join("phase_nodes.csv")]);
        assert!(files.relationship_files.is_empty());
    }
}
