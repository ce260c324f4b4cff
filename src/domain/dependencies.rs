//! Declared dependency groups

use std::collections::BTreeMap;

use super::artifact::Artifact;

/// A named bucket of dependencies (`compile`, `runtime`, `test-compile`, ...)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGroup {
    pub name: String,

    /// Whether consumers of the artifact inherit this group transitively
    pub export: bool,

    pub dependencies: Vec<Artifact>,
}

impl DependencyGroup {
    pub fn new(name: impl Into<String>, export: bool, dependencies: impl IntoIterator<Item = Artifact>) -> Self {
        Self {
            name: name.into(),
            export,
            dependencies: dependencies.into_iter().collect(),
        }
    }
}

/// A project's (or artifact's) declared requirements, keyed by group name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependencies {
    groups: BTreeMap<String, DependencyGroup>,
}

impl Dependencies {
    pub fn new(groups: impl IntoIterator<Item = DependencyGroup>) -> Self {
        let mut dependencies = Self::default();
        for group in groups {
            dependencies.groups.insert(group.name.clone(), group);
        }
        dependencies
    }

    /// Adds a group. Returns false (and keeps the existing one) if a group
    /// with the same name already exists.
    pub fn add_group(&mut self, group: DependencyGroup) -> bool {
        if self.groups.contains_key(&group.name) {
            return false;
        }

        self.groups.insert(group.name.clone(), group);
        true
    }

    pub fn group(&self, name: &str) -> Option<&DependencyGroup> {
        self.groups.get(name)
    }

    pub fn groups(&self) -> impl Iterator<Item = &DependencyGroup> {
        self.groups.values()
    }

    /// Only the groups consumers inherit
    pub fn exported(&self) -> Dependencies {
        Self::new(self.groups.values().filter(|group| group.export).cloned())
    }

    pub fn is_empty(&self) -> bool {
        self.groups.values().all(|group| group.dependencies.is_empty())
    }
}
