//! Per-group traversal rules
//!
//! A rule is keyed by the group a dependency is declared in at the root
//! and says which of the dependency's own groups are followed below it.

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalRule {
    /// Also fetch source archives for artifacts reached through this group
    pub fetch_source: bool,

    /// Follow the dependencies of dependencies
    pub transitive: bool,

    /// Groups followed when transitive. Empty means every exported group.
    pub transitive_groups: Vec<String>,
}

impl TraversalRule {
    /// Transitive rule following the given groups
    pub fn new<I, S>(fetch_source: bool, transitive_groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fetch_source,
            transitive: true,
            transitive_groups: transitive_groups.into_iter().map(Into::into).collect(),
        }
    }

    /// Only the directly declared dependencies
    pub fn direct(fetch_source: bool) -> Self {
        Self {
            fetch_source,
            transitive: false,
            transitive_groups: Vec::new(),
        }
    }

    /// Returns true if `group` of a dependency should be followed
    pub fn follows(&self, group: &str) -> bool {
        self.transitive && (self.transitive_groups.is_empty() || self.transitive_groups.iter().any(|g| g == group))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraversalRules {
    rules: BTreeMap<String, TraversalRule>,
}

impl TraversalRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, group: impl Into<String>, rule: TraversalRule) -> Self {
        self.rules.insert(group.into(), rule);
        self
    }

    pub fn get(&self, group: &str) -> Option<&TraversalRule> {
        self.rules.get(group)
    }

    /// Rules for building a project: every standard group pulls in the
    /// compile and runtime groups of its dependencies
    pub fn project() -> Self {
        let rule = TraversalRule::new(false, ["compile", "runtime"]);
        ["compile", "runtime", "provided", "test-compile", "test-runtime"]
            .into_iter()
            .fold(Self::new(), |rules, group| rules.with(group, rule.clone()))
    }

    /// Rules used to resolve a plugin and its classpath
    pub fn plugin() -> Self {
        Self::new()
            .with("compile", TraversalRule::new(true, ["compile", "runtime"]))
            .with("runtime", TraversalRule::new(true, ["compile", "runtime"]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follows_listed_groups_only() {
        let rule = TraversalRule::new(false, ["compile", "runtime"]);
        assert!(rule.follows("compile"));
        assert!(!rule.follows("test-compile"));
    }

    #[test]
    fn empty_group_list_follows_everything() {
        let rule = TraversalRule::new(false, Vec::<String>::new());
        assert!(rule.follows("anything"));
    }

    #[test]
    fn direct_rule_follows_nothing() {
        assert!(!TraversalRule::direct(true).follows("compile"));
    }

    #[test]
    fn plugin_rules_cover_compile_and_runtime() {
        let rules = TraversalRules::plugin();
        assert!(rules.get("runtime").unwrap().follows("compile"));
        assert!(rules.get("test-compile").is_none());
    }
}
