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

//! Command-line interface for curriculum graph migrations.
//!
//! - **validate**: check a mapping or pipeline configuration
//! - **export-csv**: write bulk-import CSV files
//! - **cypher**: render the import as a Cypher script
//! - **plan**: show the write batches an import would run
//!
//! Every command except `validate` takes a configuration file and a source
//! table (`.csv`, or a JSON array of objects), and accepts `--batch-size`,
//! `--shard-size`, `--clear` and `--constraints` overrides.

pub mod cli;
pub mod commands;
pub mod error;
