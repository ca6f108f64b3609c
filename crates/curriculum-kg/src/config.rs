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

//! Mapping configuration.
//!
//! The mapping document is read with serde into loose document structs and
//! then validated, once, into the tagged types the materializers work with.
//! Nothing downstream re-inspects the raw document.
//!
//! # Document shape
//!
//! ```json
//! {
//!   "nodes": {
//!     "Lesson": {
//!       "id_field": {"hasura_col": "lesson_id", "property_name": "lessonId", "type": "int"},
//!       "properties": {"title": {"hasura_col": "lesson_title", "type": "string"}}
//!     }
//!   },
//!   "relationships": {
//!     "HAS_LESSON": {
//!       "start_node_type": "Unit", "end_node_type": "Lesson",
//!       "start_csv_field": "unit_id", "end_csv_field": "lesson_id"
//!     }
//!   }
//! }
//! ```
//!
//! The same mapping may also sit under a `schema_mapping` key of a pipeline
//! document, see [`PipelineConfig`].

use crate::cypher::validate_name;
use crate::error::{MigrationError, Result};
use crate::prepare::RowFilter;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Default number of records per write batch.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Default number of records per shard.
pub const DEFAULT_SHARD_SIZE: usize = 10_000;

/// Default identity property name.
pub const DEFAULT_ID_PROPERTY: &str = "id";

/// Source column marker that resolves to the materialization timestamp.
pub const CURRENT_TIMESTAMP_MARKER: &str = "current_timestamp";

// ============================================================================
// Target types
// ============================================================================

/// Target type of an identity or property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    /// Text (the default).
    #[default]
    String,
    /// 64-bit integer.
    Int,
    /// 64-bit float.
    Float,
    /// Boolean.
    Boolean,
    /// List of values, stored as a JSON string.
    List,
    /// Date/time text, passed through trimmed.
    Datetime,
}

impl TargetType {
    /// The name used in documents and bulk-import headers.
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::String => "string",
            TargetType::Int => "int",
            TargetType::Float => "float",
            TargetType::Boolean => "boolean",
            TargetType::List => "list",
            TargetType::Datetime => "datetime",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetType {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "string" => Ok(TargetType::String),
            "int" => Ok(TargetType::Int),
            "float" => Ok(TargetType::Float),
            "boolean" => Ok(TargetType::Boolean),
            "list" => Ok(TargetType::List),
            "datetime" => Ok(TargetType::Datetime),
            other => Err(MigrationError::config(format!(
                "unknown target type '{}'",
                other
            ))),
        }
    }
}

fn parse_type(raw: Option<&str>) -> Result<TargetType> {
    raw.map(TargetType::from_str)
        .transpose()
        .map(Option::unwrap_or_default)
}

// ============================================================================
// Identity templates
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Column(String),
}

/// A business-key template such as `"{unit_id}-{lesson_id}"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    raw: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Parse a template. Placeholders are `{column}`; an unclosed brace or an
    /// empty placeholder is a configuration error.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut rest = raw;
        while let Some(open) = rest.find('{') {
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(|| {
                MigrationError::config(format!("unclosed placeholder in template '{}'", raw))
            })?;
            let column = &after[..close];
            if column.is_empty() {
                return Err(MigrationError::config(format!(
                    "empty placeholder in template '{}'",
                    raw
                )));
            }
            segments.push(Segment::Column(column.to_string()));
            rest = &after[close + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The template text as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Columns referenced by placeholders, in order of appearance.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Column(c) => Some(c.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Render with `lookup` supplying each placeholder's text. Returns `None`
    /// as soon as any placeholder cannot be resolved.
    pub fn render<F>(&self, mut lookup: F) -> Option<String>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut out = String::with_capacity(self.raw.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Column(column) => out.push_str(&lookup(column)?),
            }
        }
        Some(out)
    }
}

fn looks_templated(value: &str) -> bool {
    value.contains('{') && value.contains('}')
}

// ============================================================================
// Validated mapping types
// ============================================================================

/// How a node mapping obtains its business key.
#[derive(Debug, Clone, PartialEq)]
pub enum IdFieldSpec {
    /// The key is read from a source column.
    SourceField {
        /// Column holding the key.
        column: String,
    },
    /// A single configuration-defined node.
    StaticSynthetic {
        /// The literal key.
        value: String,
    },
    /// The key is rendered from row columns.
    TemplatedSynthetic {
        /// The key template.
        template: Template,
    },
    /// One node per distinct object key inside an array-valued column.
    ArrayExpansion {
        /// Column holding the array.
        source_column: String,
        /// Object key holding each element's business key.
        id_key: String,
    },
}

impl IdFieldSpec {
    /// Short name of the strategy, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            IdFieldSpec::SourceField { .. } => "source_field",
            IdFieldSpec::StaticSynthetic { .. } => "static_synthetic",
            IdFieldSpec::TemplatedSynthetic { .. } => "templated_synthetic",
            IdFieldSpec::ArrayExpansion { .. } => "array_expansion",
        }
    }
}

/// Where a property value comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertySource {
    /// A value fixed in configuration.
    Synthetic(Value),
    /// The materialization timestamp.
    CurrentTimestamp,
    /// A source column (or, for array-expanded nodes, an object key).
    Column(String),
}

/// A validated property mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySpec {
    /// Value source.
    pub source: PropertySource,
    /// Target type.
    pub target_type: TargetType,
}

impl PropertySpec {
    /// A column-backed property.
    pub fn column(column: impl Into<String>, target_type: TargetType) -> Self {
        Self {
            source: PropertySource::Column(column.into()),
            target_type,
        }
    }

    /// A timestamp-backed property.
    pub fn timestamp(target_type: TargetType) -> Self {
        Self {
            source: PropertySource::CurrentTimestamp,
            target_type,
        }
    }

    /// A configuration-defined property.
    pub fn synthetic(value: impl Into<Value>, target_type: TargetType) -> Self {
        Self {
            source: PropertySource::Synthetic(value.into()),
            target_type,
        }
    }
}

/// Property mappings in declaration order.
pub type PropertySpecs = IndexMap<String, PropertySpec>;

/// Validated node mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeMapping {
    /// Key of the entry in the document.
    pub key: String,
    /// Node label.
    pub label: String,
    /// Name of the identity property.
    pub id_property: String,
    /// Target type of the identity value.
    pub id_type: TargetType,
    /// Business-key strategy.
    pub id_field: IdFieldSpec,
    /// Replace business keys with generated UUIDs.
    pub generate_surrogate_key: bool,
    /// Property mappings by property name.
    pub properties: PropertySpecs,
}

impl NodeMapping {
    /// A node keyed by a source column, with default identity settings.
    pub fn from_column(label: impl Into<String>, column: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            key: label.clone(),
            label,
            id_property: DEFAULT_ID_PROPERTY.to_string(),
            id_type: TargetType::String,
            id_field: IdFieldSpec::SourceField {
                column: column.into(),
            },
            generate_surrogate_key: false,
            properties: PropertySpecs::new(),
        }
    }

    /// Replace the business-key strategy.
    pub fn with_id_field(mut self, id_field: IdFieldSpec) -> Self {
        self.id_field = id_field;
        self
    }

    /// Set the identity property name and type.
    pub fn with_identity(mut self, property: impl Into<String>, id_type: TargetType) -> Self {
        self.id_property = property.into();
        self.id_type = id_type;
        self
    }

    /// Add a property mapping.
    pub fn with_property(mut self, name: impl Into<String>, spec: PropertySpec) -> Self {
        self.properties.insert(name.into(), spec);
        self
    }

    /// Use generated UUIDs instead of business keys.
    pub fn with_surrogate_keys(mut self) -> Self {
        self.generate_surrogate_key = true;
        self
    }

    /// Whether this node type is array-expanded.
    pub fn is_array_expanded(&self) -> bool {
        matches!(self.id_field, IdFieldSpec::ArrayExpansion { .. })
    }
}

/// Validated relationship mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipMapping {
    /// Key of the entry in the document; names the bulk-export file.
    pub key: String,
    /// Relationship type.
    pub relationship_type: String,
    /// Key or label of the start node mapping.
    pub start_node_type: String,
    /// Key or label of the end node mapping.
    pub end_node_type: String,
    /// Column holding the start node's key.
    pub start_field: String,
    /// Column holding the end node's key.
    pub end_field: String,
    /// Property mappings by property name.
    pub properties: PropertySpecs,
}

impl RelationshipMapping {
    /// A relationship between two declared node types.
    pub fn new(
        relationship_type: impl Into<String>,
        start_node_type: impl Into<String>,
        start_field: impl Into<String>,
        end_node_type: impl Into<String>,
        end_field: impl Into<String>,
    ) -> Self {
        let relationship_type = relationship_type.into();
        Self {
            key: relationship_type.clone(),
            relationship_type,
            start_node_type: start_node_type.into(),
            end_node_type: end_node_type.into(),
            start_field: start_field.into(),
            end_field: end_field.into(),
            properties: PropertySpecs::new(),
        }
    }

    /// Add a property mapping.
    pub fn with_property(mut self, name: impl Into<String>, spec: PropertySpec) -> Self {
        self.properties.insert(name.into(), spec);
        self
    }
}

/// The complete, validated mapping. Mappings keep document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingConfig {
    /// Node mappings in declaration order.
    pub nodes: Vec<NodeMapping>,
    /// Relationship mappings in declaration order.
    pub relationships: Vec<RelationshipMapping>,
}

impl MappingConfig {
    /// Build and validate a mapping from already-constructed parts.
    pub fn new(nodes: Vec<NodeMapping>, relationships: Vec<RelationshipMapping>) -> Result<Self> {
        let config = Self {
            nodes,
            relationships,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a mapping document (bare, or wrapped in `schema_mapping`).
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(PipelineConfig::from_json_str(json)?.mapping)
    }

    /// Read and parse a mapping document from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Ok(PipelineConfig::from_path(path)?.mapping)
    }

    /// Look up a node mapping by document key, then by label.
    pub fn node_mapping(&self, node_type: &str) -> Option<&NodeMapping> {
        self.nodes
            .iter()
            .find(|n| n.key == node_type)
            .or_else(|| self.nodes.iter().find(|n| n.label == node_type))
    }

    /// Check cross-references and names.
    pub fn validate(&self) -> Result<()> {
        for node in &self.nodes {
            validate_name("label", &node.label)?;
            validate_name("identity property", &node.id_property)?;
            for name in node.properties.keys() {
                validate_name("property", name)?;
            }
            match &node.id_field {
                IdFieldSpec::SourceField { column } if column.trim().is_empty() => {
                    return Err(MigrationError::config(format!(
                        "node '{}' has an empty id column",
                        node.key
                    )));
                }
                IdFieldSpec::ArrayExpansion { id_key, .. } if id_key.trim().is_empty() => {
                    return Err(MigrationError::config(format!(
                        "node '{}' expands a list without an id_key",
                        node.key
                    )));
                }
                _ => {}
            }
        }

        for rel in &self.relationships {
            validate_name("relationship type", &rel.relationship_type)?;
            for name in rel.properties.keys() {
                validate_name("property", name)?;
            }
            for endpoint in [&rel.start_node_type, &rel.end_node_type] {
                if self.node_mapping(endpoint).is_none() {
                    return Err(MigrationError::config(format!(
                        "relationship '{}' references undeclared node type '{}'",
                        rel.key, endpoint
                    )));
                }
            }
            if rel.start_field.trim().is_empty() || rel.end_field.trim().is_empty() {
                return Err(MigrationError::config(format!(
                    "relationship '{}' is missing a start or end field",
                    rel.key
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Load tunables
// ============================================================================

/// Tunables for planning and loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadConfig {
    /// Maximum records per write batch (default: 1000).
    pub batch_size: usize,
    /// Maximum records per shard (default: 10000).
    pub shard_size: usize,
    /// Delete every node and relationship before loading (default: false).
    pub clear_before_import: bool,
    /// Create a uniqueness constraint per label on its identity property
    /// before the node batches (default: false).
    pub create_constraints: bool,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            shard_size: DEFAULT_SHARD_SIZE,
            clear_before_import: false,
            create_constraints: false,
        }
    }
}

/// Builder for [`LoadConfig`].
#[derive(Debug, Default)]
pub struct LoadConfigBuilder {
    batch_size: Option<usize>,
    shard_size: Option<usize>,
    clear_before_import: Option<bool>,
    create_constraints: Option<bool>,
}

impl LoadConfigBuilder {
    /// Create a new builder with no values set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the batch size.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }

    /// Set the shard size.
    pub fn shard_size(mut self, size: usize) -> Self {
        self.shard_size = Some(size);
        self
    }

    /// Set whether to clear the store first.
    pub fn clear_before_import(mut self, clear: bool) -> Self {
        self.clear_before_import = Some(clear);
        self
    }

    /// Set whether to create uniqueness constraints.
    pub fn create_constraints(mut self, create: bool) -> Self {
        self.create_constraints = Some(create);
        self
    }

    /// Build the LoadConfig. Unset fields use their defaults.
    pub fn build(self) -> LoadConfig {
        let defaults = LoadConfig::default();
        LoadConfig {
            batch_size: self.batch_size.unwrap_or(defaults.batch_size),
            shard_size: self.shard_size.unwrap_or(defaults.shard_size),
            clear_before_import: self
                .clear_before_import
                .unwrap_or(defaults.clear_before_import),
            create_constraints: self
                .create_constraints
                .unwrap_or(defaults.create_constraints),
        }
    }
}

impl LoadConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder.
    ///
    /// ```
    /// # use curriculum_kg::LoadConfig;
    /// let config = LoadConfig::builder().batch_size(500).build();
    /// assert_eq!(config.batch_size, 500);
    /// assert_eq!(config.shard_size, 10_000);
    /// ```
    pub fn builder() -> LoadConfigBuilder {
        LoadConfigBuilder::default()
    }

    /// Set the batch size.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Set the shard size.
    pub fn with_shard_size(mut self, size: usize) -> Self {
        self.shard_size = size;
        self
    }

    /// Clear the store before loading.
    pub fn with_clear(mut self) -> Self {
        self.clear_before_import = true;
        self
    }

    /// Create uniqueness constraints before loading.
    pub fn with_constraints(mut self) -> Self {
        self.create_constraints = true;
        self
    }

    /// Reject zero sizes.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(MigrationError::config("batch size must be greater than zero"));
        }
        if self.shard_size == 0 {
            return Err(MigrationError::config("shard size must be greater than zero"));
        }
        Ok(())
    }
}

// ============================================================================
// Pipeline document
// ============================================================================

/// A full pipeline document: mapping, load tunables, and row filters.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// The validated mapping.
    pub mapping: MappingConfig,
    /// Planning and loading tunables.
    pub load: LoadConfig,
    /// Row filters applied during preparation.
    pub filters: Vec<RowFilter>,
}

impl PipelineConfig {
    /// Parse a pipeline document or a bare mapping document.
    ///
    /// Whole-string `${VAR}` values are replaced from the environment first.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut document: Value = serde_json::from_str(json)?;
        substitute_env_vars(&mut document)?;
        Self::from_document(document)
    }

    /// Read and parse a pipeline document from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            MigrationError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&text)
    }

    fn from_document(document: Value) -> Result<Self> {
        let Value::Object(mut top) = document else {
            return Err(MigrationError::config("configuration must be a JSON object"));
        };

        let mapping_doc = match top.remove("schema_mapping") {
            Some(Value::Object(inner)) => inner,
            Some(_) => return Err(MigrationError::config("schema_mapping must be an object")),
            None if top.contains_key("nodes") || top.contains_key("relationships") => top.clone(),
            None => {
                return Err(MigrationError::config(
                    "configuration must contain 'schema_mapping' or 'nodes'",
                ))
            }
        };
        let mapping = parse_mapping(mapping_doc)?;

        let settings: RawPipelineSettings = serde_json::from_value(Value::Object(top))
            .map_err(|e| MigrationError::config(format!("invalid pipeline settings: {}", e)))?;
        let defaults = LoadConfig::default();
        let load = LoadConfig {
            batch_size: settings.batch_size.unwrap_or(defaults.batch_size),
            shard_size: settings.shard_size.unwrap_or(defaults.shard_size),
            clear_before_import: settings.clear_database_before_import,
            create_constraints: settings.create_constraints,
        };
        load.validate()?;

        let filters = settings
            .filters
            .into_iter()
            .map(|(column, value)| match value {
                Value::Array(values) => RowFilter::one_of(column, values),
                other => RowFilter::equals(column, other),
            })
            .collect();

        Ok(Self {
            mapping,
            load,
            filters,
        })
    }
}

/// Replace every whole-string `${VAR}` value in the document with the value
/// of the environment variable `VAR`. An unset variable is an error.
pub fn substitute_env_vars(value: &mut Value) -> Result<()> {
    match value {
        Value::String(s) if s.len() > 3 && s.starts_with("${") && s.ends_with('}') => {
            let name = &s[2..s.len() - 1];
            let resolved = std::env::var(name).map_err(|_| {
                MigrationError::config(format!("environment variable {} is not set", name))
            })?;
            *s = resolved;
        }
        Value::Array(items) => {
            for item in items {
                substitute_env_vars(item)?;
            }
        }
        Value::Object(map) => {
            for (_, item) in map.iter_mut() {
                substitute_env_vars(item)?;
            }
        }
        _ => {}
    }
    Ok(())
}

// ============================================================================
// Raw document structs
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPipelineSettings {
    clear_database_before_import: bool,
    create_constraints: bool,
    batch_size: Option<usize>,
    shard_size: Option<usize>,
    filters: serde_json::Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawNodeMapping {
    label: Option<String>,
    id_field: Option<RawIdFieldEntry>,
    properties: serde_json::Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawIdFieldEntry {
    Column(String),
    Spec(RawIdField),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawIdField {
    hasura_col: Option<String>,
    property_name: Option<String>,
    #[serde(rename = "type")]
    id_type: Option<String>,
    synthetic_value: Option<Value>,
    expand_list: bool,
    id_key: Option<String>,
    generate_uuid: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPropertySpec {
    hasura_col: Option<String>,
    #[serde(rename = "type")]
    target_type: Option<String>,
    synthetic_value: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRelationshipMapping {
    relationship_type: Option<String>,
    start_node_type: Option<String>,
    end_node_type: Option<String>,
    #[serde(alias = "start_node_field")]
    start_csv_field: Option<String>,
    #[serde(alias = "end_node_field")]
    end_csv_field: Option<String>,
    properties: serde_json::Map<String, Value>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// A synthetic value counts only when it is neither null nor an empty string.
fn present_synthetic(value: Option<Value>) -> Option<Value> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        other => other,
    }
}

fn parse_mapping(doc: serde_json::Map<String, Value>) -> Result<MappingConfig> {
    let mut nodes = Vec::new();
    if let Some(raw_nodes) = doc.get("nodes") {
        let raw_nodes = raw_nodes
            .as_object()
            .ok_or_else(|| MigrationError::config("'nodes' must be an object"))?;
        for (key, raw) in raw_nodes {
            let raw: RawNodeMapping = serde_json::from_value(raw.clone()).map_err(|e| {
                MigrationError::config(format!("invalid node mapping '{}': {}", key, e))
            })?;
            nodes.push(build_node(key, raw)?);
        }
    }

    let mut relationships = Vec::new();
    if let Some(raw_rels) = doc.get("relationships") {
        let raw_rels = raw_rels
            .as_object()
            .ok_or_else(|| MigrationError::config("'relationships' must be an object"))?;
        for (key, raw) in raw_rels {
            let raw: RawRelationshipMapping = serde_json::from_value(raw.clone()).map_err(|e| {
                MigrationError::config(format!("invalid relationship mapping '{}': {}", key, e))
            })?;
            relationships.push(build_relationship(key, raw)?);
        }
    }

    MappingConfig::new(nodes, relationships)
}

fn build_node(key: &str, raw: RawNodeMapping) -> Result<NodeMapping> {
    let label = non_empty(raw.label).unwrap_or_else(|| key.to_string());
    let id = match raw.id_field {
        Some(RawIdFieldEntry::Column(column)) => RawIdField {
            hasura_col: Some(column),
            ..RawIdField::default()
        },
        Some(RawIdFieldEntry::Spec(spec)) => spec,
        None => {
            return Err(MigrationError::config(format!(
                "node '{}' has no id_field",
                key
            )))
        }
    };

    let hasura_col = non_empty(id.hasura_col);
    let synthetic = present_synthetic(id.synthetic_value).map(|v| match v {
        Value::String(s) => s,
        other => other.to_string(),
    });

    let id_field = if id.expand_list {
        let source_column = hasura_col.ok_or_else(|| {
            MigrationError::config(format!("node '{}' expands a list without hasura_col", key))
        })?;
        let id_key = non_empty(id.id_key).ok_or_else(|| {
            MigrationError::config(format!("node '{}' expands a list without an id_key", key))
        })?;
        IdFieldSpec::ArrayExpansion {
            source_column,
            id_key,
        }
    } else if let Some(column) = hasura_col {
        IdFieldSpec::SourceField { column }
    } else if let Some(value) = synthetic {
        if looks_templated(&value) {
            IdFieldSpec::TemplatedSynthetic {
                template: Template::parse(&value)?,
            }
        } else {
            IdFieldSpec::StaticSynthetic { value }
        }
    } else {
        return Err(MigrationError::config(format!(
            "node '{}' has no id source (hasura_col or synthetic_value)",
            key
        )));
    };

    Ok(NodeMapping {
        key: key.to_string(),
        label,
        id_property: non_empty(id.property_name)
            .unwrap_or_else(|| DEFAULT_ID_PROPERTY.to_string()),
        id_type: parse_type(id.id_type.as_deref())?,
        id_field,
        generate_surrogate_key: id.generate_uuid,
        properties: build_properties(key, raw.properties)?,
    })
}

fn build_relationship(key: &str, raw: RawRelationshipMapping) -> Result<RelationshipMapping> {
    let missing = |what: &str| {
        MigrationError::config(format!("relationship '{}' is missing {}", key, what))
    };
    Ok(RelationshipMapping {
        key: key.to_string(),
        relationship_type: non_empty(raw.relationship_type).unwrap_or_else(|| key.to_string()),
        start_node_type: non_empty(raw.start_node_type).ok_or_else(|| missing("start_node_type"))?,
        end_node_type: non_empty(raw.end_node_type).ok_or_else(|| missing("end_node_type"))?,
        start_field: non_empty(raw.start_csv_field).ok_or_else(|| missing("start_csv_field"))?,
        end_field: non_empty(raw.end_csv_field).ok_or_else(|| missing("end_csv_field"))?,
        properties: build_properties(key, raw.properties)?,
    })
}

fn build_properties(
    owner: &str,
    raw: serde_json::Map<String, Value>,
) -> Result<PropertySpecs> {
    let mut properties = PropertySpecs::new();
    for (name, value) in raw {
        let spec = match value {
            // Legacy form: property name mapped straight to a column.
            Value::String(column) => PropertySpec::column(column, TargetType::String),
            Value::Object(_) => {
                let raw: RawPropertySpec = serde_json::from_value(value).map_err(|e| {
                    MigrationError::config(format!(
                        "invalid property '{}' in '{}': {}",
                        name, owner, e
                    ))
                })?;
                let target_type = parse_type(raw.target_type.as_deref())?;
                let column = non_empty(raw.hasura_col);
                let source = if let Some(value) = present_synthetic(raw.synthetic_value) {
                    PropertySource::Synthetic(value)
                } else if column.as_deref() == Some(CURRENT_TIMESTAMP_MARKER) {
                    PropertySource::CurrentTimestamp
                } else if let Some(column) = column {
                    PropertySource::Column(column)
                } else {
                    return Err(MigrationError::config(format!(
                        "property '{}' in '{}' has no source",
                        name, owner
                    )));
                };
                PropertySpec {
                    source,
                    target_type,
                }
            }
            _ => {
                return Err(MigrationError::config(format!(
                    "property '{}' in '{}' must be a column name or an object",
                    name, owner
                )))
            }
        };
        properties.insert(name, spec);
    }
    Ok(properties)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CURRICULUM: &str = r#"{
        "nodes": {
            "Programme": {
                "id_field": {"synthetic_value": "national-curriculum", "property_name": "programmeId"},
                "properties": {
                    "title": {"synthetic_value": "National Curriculum"},
                    "lastUpdated": {"hasura_col": "current_timestamp", "type": "datetime"}
                }
            },
            "Unit": {
                "id_field": {"hasura_col": "unit_id", "property_name": "unitId", "type": "int"},
                "properties": {"title": {"hasura_col": "unit_title"}, "slug": "unit_slug"}
            },
            "UnitVariant": {
                "id_field": {"synthetic_value": "{unit_id}-{tier}", "property_name": "variantId"}
            },
            "Thread": {
                "id_field": {"hasura_col": "threads", "expand_list": true, "id_key": "slug", "property_name": "threadSlug"}
            }
        },
        "relationships": {
            "HAS_UNIT": {
                "start_node_type": "Programme", "end_node_type": "Unit",
                "start_csv_field": "programmeId", "end_csv_field": "unit_id"
            },
            "unit_threads": {
                "relationship_type": "BELONGS_TO_THREAD",
                "start_node_type": "Unit", "end_node_type": "Thread",
                "start_node_field": "unit_id", "end_node_field": "threadSlug"
            }
        }
    }"#;

    #[test]
    fn test_parse_id_strategies() {
        let config = MappingConfig::from_json_str(CURRICULUM).unwrap();
        let names: Vec<_> = config.nodes.iter().map(|n| n.key.as_str()).collect();
        assert_eq!(names, vec!["Programme", "Unit", "UnitVariant", "Thread"]);

        assert_eq!(
            config.nodes[0].id_field,
            IdFieldSpec::StaticSynthetic {
                value: "national-curriculum".to_string()
            }
        );
        assert_eq!(config.nodes[1].id_type, TargetType::Int);
        assert!(matches!(
            config.nodes[2].id_field,
            IdFieldSpec::TemplatedSynthetic { .. }
        ));
        assert!(config.nodes[3].is_array_expanded());
    }

    #[test]
    fn test_property_sources() {
        let config = MappingConfig::from_json_str(CURRICULUM).unwrap();
        let programme = &config.nodes[0];
        assert_eq!(
            programme.properties["title"].source,
            PropertySource::Synthetic(Value::String("National Curriculum".into()))
        );
        assert_eq!(
            programme.properties["lastUpdated"].source,
            PropertySource::CurrentTimestamp
        );
        let unit = &config.nodes[1];
        assert_eq!(
            unit.properties["slug"],
            PropertySpec::column("unit_slug", TargetType::String)
        );
    }

    #[test]
    fn test_relationship_defaults_and_aliases() {
        let config = MappingConfig::from_json_str(CURRICULUM).unwrap();
        assert_eq!(config.relationships[0].relationship_type, "HAS_UNIT");
        let threads = &config.relationships[1];
        assert_eq!(threads.key, "unit_threads");
        assert_eq!(threads.relationship_type, "BELONGS_TO_THREAD");
        assert_eq!(threads.start_field, "unit_id");
        assert_eq!(threads.end_field, "threadSlug");
    }

    #[test]
    fn test_undeclared_node_type_is_rejected() {
        let json = r#"{
            "nodes": {"Unit": {"id_field": {"hasura_col": "unit_id"}}},
            "relationships": {"R": {"start_node_type": "Unit", "end_node_type": "Lesson",
                                    "start_csv_field": "a", "end_csv_field": "b"}}
        }"#;
        let err = MappingConfig::from_json_str(json).unwrap_err();
        assert!(matches!(err, MigrationError::Configuration(_)));
        assert!(err.to_string().contains("Lesson"));
    }

    #[test]
    fn test_missing_id_source_is_rejected() {
        let json = r#"{"nodes": {"Unit": {"id_field": {"property_name": "unitId"}}}}"#;
        assert!(MappingConfig::from_json_str(json).is_err());
    }

    #[test]
    fn test_expand_list_requires_id_key() {
        let json = r#"{"nodes": {"T": {"id_field": {"hasura_col": "threads", "expand_list": true}}}}"#;
        let err = MappingConfig::from_json_str(json).unwrap_err();
        assert!(err.to_string().contains("id_key"));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let json = r#"{"nodes": {"U": {"id_field": {"hasura_col": "u", "type": "decimal"}}}}"#;
        assert!(MappingConfig::from_json_str(json).is_err());
    }

    #[test]
    fn test_schema_mapping_wrapper_and_settings() {
        let json = r#"{
            "clear_database_before_import": true,
            "batch_size": 250,
            "filters": {"subject": "maths", "key_stage": ["ks3", "ks4"]},
            "schema_mapping": {"nodes": {"U": {"id_field": "unit_id"}}}
        }"#;
        let pipeline = PipelineConfig::from_json_str(json).unwrap();
        assert!(pipeline.load.clear_before_import);
        assert_eq!(pipeline.load.batch_size, 250);
        assert_eq!(pipeline.load.shard_size, DEFAULT_SHARD_SIZE);
        assert_eq!(pipeline.filters.len(), 2);
        assert_eq!(pipeline.mapping.nodes[0].label, "U");
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let json = r#"{"batch_size": 0, "schema_mapping": {"nodes": {}}}"#;
        assert!(PipelineConfig::from_json_str(json).is_err());
        assert!(LoadConfig::new().with_shard_size(0).validate().is_err());
    }

    #[test]
    fn test_env_substitution() {
        std::env::set_var("CKG_TEST_LABEL_COLUMN", "lesson_id");
        let mut doc = serde_json::json!({"a": ["${CKG_TEST_LABEL_COLUMN}", "x${NOT}"]});
        substitute_env_vars(&mut doc).unwrap();
        assert_eq!(doc["a"][0], "lesson_id");
        assert_eq!(doc["a"][1], "x${NOT}");

        let mut missing = serde_json::json!("${CKG_TEST_SURELY_UNSET_VAR}");
        assert!(substitute_env_vars(&mut missing).is_err());
    }

    #[test]
    fn test_template_render() {
        let template = Template::parse("{unit_id}-{tier}").unwrap();
        assert_eq!(template.columns().collect::<Vec<_>>(), vec!["unit_id", "tier"]);
        let rendered = template.render(|c| match c {
            "unit_id" => Some("12".to_string()),
            "tier" => Some("higher".to_string()),
            _ => None,
        });
        assert_eq!(rendered.as_deref(), Some("12-higher"));
        assert_eq!(template.render(|_| None), None);
        assert!(Template::parse("{unit_id").is_err());
    }

    #[test]
    fn test_builder_defaults() {
        let config = LoadConfig::builder().clear_before_import(true).build();
        assert!(config.clear_before_import);
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert!(!config.create_constraints);
    }
}
