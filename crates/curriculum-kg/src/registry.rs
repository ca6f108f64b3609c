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

//! Per-run identity registry.

use std::collections::HashMap;

/// Maps `(label, business key)` to the identifier generated for it.
///
/// Owned by the node materializer, which registers each key exactly once.
/// The relationship materializer only reads it. A registry lives for one run
/// and is never persisted.
#[derive(Debug, Clone, Default)]
pub struct IdentityRegistry {
    ids: HashMap<(String, String), String>,
}

impl IdentityRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id` for `(label, key)`. Returns `false`, leaving the
    /// existing entry untouched, if the key was already registered.
    pub fn register(&mut self, label: &str, key: &str, id: impl Into<String>) -> bool {
        let slot = (label.to_string(), key.to_string());
        if self.ids.contains_key(&slot) {
            return false;
        }
        self.ids.insert(slot, id.into());
        true
    }

    /// The identifier registered for `(label, key)`.
    pub fn get(&self, label: &str, key: &str) -> Option<&str> {
        self.ids
            .get(&(label.to_string(), key.to_string()))
            .map(String::as_str)
    }

    /// Whether `(label, key)` is registered.
    pub fn contains(&self, label: &str, key: &str) -> bool {
        self.get(label, key).is_some()
    }

    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Forget every registration.
    pub fn clear(&mut self) {
        self.ids.clear();
    }
}
