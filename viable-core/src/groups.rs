//! Group registry for tracking capture groups
//!
//! Captures are registered in the order they appear in the final pattern,
//! after variables have been inlined, so the same `let` used twice registers
//! its captures twice. Names must be unique across the whole pattern.

use std::collections::HashMap;

use crate::error::{CompileError, Diagnostic, Span};

/// Information about a capture group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInfo {
    /// The index of the group (1-based, as regex engines number them)
    pub index: u32,
    /// The name of the group (if it's a named group)
    pub name: Option<String>,
    /// Where the group came from in the source
    pub span: Span,
}

/// Registry for tracking capture groups
#[derive(Debug, Clone)]
pub struct GroupRegistry {
    groups: Vec<GroupInfo>,
    name_to_index: HashMap<String, u32>,
    /// The next group index to assign
    next_index: u32,
}

impl Default for GroupRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupRegistry {
    pub fn new() -> Self {
        GroupRegistry {
            groups: Vec::new(),
            name_to_index: HashMap::new(),
            next_index: 1, // Groups are 1-indexed
        }
    }

    /// Register a new capture group
    ///
    /// A duplicate name still occupies a group index; the returned diagnostic
    /// points back at the first group with that name.
    pub fn register_group(&mut self, name: Option<String>, span: Span) -> Result<u32, Diagnostic> {
        let index = self.next_index;
        self.next_index += 1;

        if let Some(group_name) = &name {
            if let Some(first) = self.get_by_name(group_name).and_then(|i| self.get_by_index(i)) {
                let diagnostic = Diagnostic::new(
                    CompileError::DuplicateCaptureName(group_name.clone()),
                    span,
                )
                .with_related("first used here", first.span);
                self.groups.push(GroupInfo {
                    index,
                    name: None,
                    span,
                });
                return Err(diagnostic);
            }
            self.name_to_index.insert(group_name.clone(), index);
        }

        self.groups.push(GroupInfo { index, name, span });
        Ok(index)
    }

    /// Get group info by index
    pub fn get_by_index(&self, index: u32) -> Option<&GroupInfo> {
        self.groups.iter().find(|g| g.index == index)
    }

    /// Get group index by name
    pub fn get_by_name(&self, name: &str) -> Option<u32> {
        self.name_to_index.get(name).copied()
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.name_to_index.contains_key(name)
    }

    /// Get the total number of capture groups
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn groups(&self) -> &[GroupInfo] {
        &self.groups
    }

    /// Unique group names in order of appearance
    pub fn names(&self) -> Vec<String> {
        self.groups.iter().filter_map(|g| g.name.clone()).collect()
    }
}
