//! Dependency graph - plans a plugin load order
//!
//! Nodes are candidate plugins, edges their declared dependencies. Planning
//! is Kahn's algorithm: plugins become ready once every dependency has been
//! emitted. Whatever is left when the ready queue drains is either a member
//! of a cycle or depends on one, and is rejected instead of looped on.

use std::collections::{HashMap, HashSet, VecDeque};

use super::error::PluginHostError;

/// Why a candidate was left out of the load order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Dependency is neither a candidate nor already satisfied
    MissingDependency { dependency: String },
    /// Dependency was rejected itself
    DependencyFailed { dependency: String },
    /// Candidate is part of a cycle, listed as `a -> b -> a`
    CyclicDependency { cycle: Vec<String> },
}

/// A candidate left out of the load order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub plugin: String,
    pub reason: RejectReason,
}

impl Rejection {
    pub fn into_error(self) -> PluginHostError {
        let plugin = self.plugin;
        match self.reason {
            RejectReason::MissingDependency { dependency } => {
                PluginHostError::MissingDependency { plugin, dependency }
            }
            RejectReason::DependencyFailed { dependency } => {
                PluginHostError::DependencyFailed { plugin, dependency }
            }
            RejectReason::CyclicDependency { cycle } => {
                PluginHostError::CyclicDependency { plugin, cycle }
            }
        }
    }
}

/// Result of planning: the load order and every rejected candidate
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Candidates in an order where dependencies come first
    pub order: Vec<String>,
    pub rejected: Vec<Rejection>,
}

impl Resolution {
    pub fn rejection(&self, plugin: &str) -> Option<&Rejection> {
        self.rejected.iter().find(|r| r.plugin == plugin)
    }
}

/// Candidate plugins and their declared dependencies
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<String>,
    depends: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a candidate. Returns `false` and changes nothing if the name is
    /// already present. Repeated dependency names are kept once.
    pub fn add<I, S>(&mut self, name: impl Into<String>, depends: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        if self.depends.contains_key(&name) {
            return false;
        }

        let mut unique = Vec::new();
        for dep in depends {
            let dep = dep.into();
            if !unique.contains(&dep) {
                unique.push(dep);
            }
        }

        self.nodes.push(name.clone());
        self.depends.insert(name, unique);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.depends.contains_key(name)
    }

    /// Declared dependencies of a candidate, empty for unknown names
    pub fn dependencies(&self, name: &str) -> &[String] {
        self.depends.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Candidate names in insertion order
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Compute the load order
    ///
    /// `satisfied` reports dependencies that are available without being a
    /// candidate (plugins loaded by an earlier batch). Ties between
    /// independent candidates keep insertion order.
    pub fn plan<F>(&self, satisfied: F) -> Resolution
    where
        F: Fn(&str) -> bool,
    {
        let mut waiting_on: HashMap<&str, HashSet<&str>> = HashMap::new();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut rejected: Vec<Rejection> = Vec::new();
        let mut rejected_names: HashSet<&str> = HashSet::new();
        let mut missing: Vec<&str> = Vec::new();

        for node in &self.nodes {
            let waiting = waiting_on.entry(node.as_str()).or_default();
            for dep in self.dependencies(node) {
                if self.contains(dep) {
                    waiting.insert(dep.as_str());
                    dependents
                        .entry(dep.as_str())
                        .or_default()
                        .push(node.as_str());
                } else if !satisfied(dep) && !rejected_names.contains(node.as_str()) {
                    rejected.push(Rejection {
                        plugin: node.clone(),
                        reason: RejectReason::MissingDependency {
                            dependency: dep.clone(),
                        },
                    });
                    rejected_names.insert(node.as_str());
                    missing.push(node.as_str());
                }
            }
        }

        for node in missing {
            reject_dependents(node, &dependents, &mut rejected, &mut rejected_names);
        }

        let mut order = Vec::new();
        let mut queue: VecDeque<&str> = self
            .nodes
            .iter()
            .map(String::as_str)
            .filter(|n| !rejected_names.contains(n))
            .filter(|n| waiting_on.get(n).is_none_or(HashSet::is_empty))
            .collect();

        while let Some(node) = queue.pop_front() {
            order.push(node.to_string());
            for &dependent in dependents.get(node).into_iter().flatten() {
                if rejected_names.contains(dependent) {
                    continue;
                }
                if let Some(waiting) = waiting_on.get_mut(dependent) {
                    waiting.remove(node);
                    if waiting.is_empty() {
                        queue.push_back(dependent);
                    }
                }
            }
        }

        let emitted: HashSet<&str> = order.iter().map(String::as_str).collect();
        let leftover: HashSet<&str> = self
            .nodes
            .iter()
            .map(String::as_str)
            .filter(|n| !emitted.contains(n) && !rejected_names.contains(n))
            .collect();

        // Cycle members first, so blocked dependents can name one of them
        let mut blocked = Vec::new();
        for node in self.nodes.iter().map(String::as_str) {
            if !leftover.contains(node) {
                continue;
            }
            match self.find_cycle(node, &leftover) {
                Some(cycle) => {
                    rejected.push(Rejection {
                        plugin: node.to_string(),
                        reason: RejectReason::CyclicDependency { cycle },
                    });
                    rejected_names.insert(node);
                }
                None => blocked.push(node),
            }
        }

        for node in blocked {
            let dependency = self
                .dependencies(node)
                .iter()
                .find(|dep| leftover.contains(dep.as_str()))
                .cloned()
                .unwrap_or_default();
            rejected.push(Rejection {
                plugin: node.to_string(),
                reason: RejectReason::DependencyFailed { dependency },
            });
        }

        Resolution { order, rejected }
    }

    /// Shortest dependency path from `start` back to itself within `scope`
    fn find_cycle(&self, start: &str, scope: &HashSet<&str>) -> Option<Vec<String>> {
        let mut parent: HashMap<&str, &str> = HashMap::new();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut queue = VecDeque::from([start]);

        while let Some(current) = queue.pop_front() {
            for dep in self.dependencies(current) {
                let dep = dep.as_str();
                if !scope.contains(dep) {
                    continue;
                }
                if dep == start {
                    let mut path = vec![current];
                    let mut node = current;
                    while node != start {
                        node = parent[node];
                        path.push(node);
                    }
                    path.reverse();
                    path.push(start);
                    return Some(path.into_iter().map(str::to_string).collect());
                }
                if seen.insert(dep) {
                    parent.insert(dep, current);
                    queue.push_back(dep);
                }
            }
        }

        None
    }
}

fn reject_dependents<'a>(
    failed: &'a str,
    dependents: &HashMap<&'a str, Vec<&'a str>>,
    rejected: &mut Vec<Rejection>,
    rejected_names: &mut HashSet<&'a str>,
) {
    let mut queue = VecDeque::from([failed]);
    while let Some(node) = queue.pop_front() {
        for &dependent in dependents.get(node).into_iter().flatten() {
            if rejected_names.insert(dependent) {
                rejected.push(Rejection {
                    plugin: dependent.to_string(),
                    reason: RejectReason::DependencyFailed {
                        dependency: node.to_string(),
                    },
                });
                queue.push_back(dependent);
            }
        }
    }
}
