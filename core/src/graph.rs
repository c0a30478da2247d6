//! Dependency Graph (C8): node storage, validation (missing references,
//! cycles), and deterministic topological sort, per §4.8.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::GraphError;
use crate::resources::Resource;

/// Node storage: a `Vec` indexed by position, plus a side `BTreeMap` id→index
/// map so any incidental iteration over it is already lexicographic (§4.8
/// implementation note) — though only the explicit sort below relies on that
/// for correctness.
pub struct Graph {
    nodes: Vec<Box<dyn Resource>>,
    index: BTreeMap<String, usize>,
}

impl Graph {
    pub fn build(nodes: Vec<Box<dyn Resource>>) -> Graph {
        let index = nodes
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id(), i))
            .collect();
        Graph { nodes, index }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, idx: usize) -> &dyn Resource {
        self.nodes[idx].as_ref()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn node_ids(&self) -> Vec<String> {
        self.nodes.iter().map(|r| r.id()).collect()
    }

    /// Every edge's tail must resolve to a node in the final graph (§4.8).
    pub fn validate(&self) -> Result<(), GraphError> {
        for node in &self.nodes {
            for dep in node.dependencies() {
                if !self.index.contains_key(dep) {
                    return Err(GraphError::UnknownDependency(node.id(), dep.clone()));
                }
            }
        }
        Ok(())
    }

    /// DFS with three-color marking; the first back-edge produces a
    /// diagnostic path `A → B → … → A`. Self-edges are cycles.
    pub fn detect_cycle(&self) -> Option<String> {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        let mut colors = vec![Color::White; self.nodes.len()];
        let mut path = Vec::new();

        fn visit(
            graph: &Graph,
            idx: usize,
            colors: &mut Vec<Color>,
            path: &mut Vec<usize>,
        ) -> Option<String> {
            colors[idx] = Color::Gray;
            path.push(idx);

            for dep in graph.nodes[idx].dependencies() {
                let Some(dep_idx) = graph.index_of(dep) else {
                    continue;
                };
                match colors[dep_idx] {
                    Color::White => {
                        if let Some(cycle) = visit(graph, dep_idx, colors, path) {
                            return Some(cycle);
                        }
                    }
                    Color::Gray => {
                        let start = path.iter().position(|&i| i == dep_idx).unwrap_or(0);
                        let mut names: Vec<String> = path[start..].iter().map(|&i| graph.nodes[i].id()).collect();
                        names.push(graph.nodes[dep_idx].id());
                        return Some(names.join(" → "));
                    }
                    Color::Black => {}
                }
            }

            path.pop();
            colors[idx] = Color::Black;
            None
        }

        for idx in 0..self.nodes.len() {
            if colors[idx] == Color::White {
                if let Some(cycle) = visit(self, idx, &mut colors, &mut path) {
                    return Some(cycle);
                }
            }
        }
        None
    }

    /// Kahn's algorithm keyed by in-degree, with the ready queue kept sorted
    /// lexicographically by id so two runs over the same graph produce
    /// byte-identical orderings (§4.8).
    pub fn topological_order(&self) -> Result<Vec<usize>, GraphError> {
        self.validate()?;

        let mut in_degree = vec![0usize; self.nodes.len()];
        // edges[i] = successors of i (nodes whose dependency is i).
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); self.nodes.len()];
        for (idx, node) in self.nodes.iter().enumerate() {
            for dep in node.dependencies() {
                let dep_idx = self.index[dep];
                successors[dep_idx].push(idx);
                in_degree[idx] += 1;
            }
        }

        let mut ready: BTreeSet<String> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(i, _)| in_degree[*i] == 0)
            .map(|(_, r)| r.id())
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(id) = ready.iter().next().cloned() {
            ready.remove(&id);
            let idx = self.index[&id];
            order.push(idx);
            for &succ in &successors[idx] {
                in_degree[succ] -= 1;
                if in_degree[succ] == 0 {
                    ready.insert(self.nodes[succ].id());
                }
            }
        }

        if order.len() != self.nodes.len() {
            let cycle = self.detect_cycle().unwrap_or_else(|| "<unknown>".to_string());
            return Err(GraphError::Cycle(cycle));
        }

        Ok(order)
    }
}

/// Replaces every `"role.<R>"` entry in each node's dependency list with the
/// full set of resource ids belonging to role `R` (§4.8 role dependency
/// expansion). A reference to a role that does not exist expands to nothing
/// (silent); plain resource ids are left untouched for `validate` to check.
pub fn expand_role_dependencies(
    depends_on: &[String],
    role_members: &BTreeMap<String, Vec<String>>,
) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen = BTreeSet::new();
    for dep in depends_on {
        if let Some(role_name) = dep.strip_prefix("role.") {
            if let Some(members) = role_members.get(role_name) {
                for member in members {
                    if seen.insert(member.clone()) {
                        out.push(member.clone());
                    }
                }
            }
        } else if seen.insert(dep.clone()) {
            out.push(dep.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::EvalContext;
    use crate::resources::{Plan, State};
    use crate::error::ResourceError;

    #[derive(Debug)]
    struct FakeResource {
        type_: &'static str,
        name: String,
        deps: Vec<String>,
    }

    impl FakeResource {
        fn new(id: &str, deps: &[&str]) -> Box<dyn Resource> {
            let (type_, name) = id.split_once('.').unwrap();
            Box::new(FakeResource {
                type_: Box::leak(type_.to_string().into_boxed_str()),
                name: name.to_string(),
                deps: deps.iter().map(|s| s.to_string()).collect(),
            })
        }
    }

    impl Resource for FakeResource {
        fn type_(&self) -> &str {
            self.type_
        }
        fn name(&self) -> &str {
            &self.name
        }
        fn validate(&self) -> Result<(), ResourceError> {
            Ok(())
        }
        fn dependencies(&self) -> &[String] {
            &self.deps
        }
        fn read(&self, _ctx: &EvalContext) -> Result<State, ResourceError> {
            Ok(State::absent())
        }
        fn diff(&self, _ctx: &EvalContext, current: &State) -> Result<Plan, ResourceError> {
            Ok(Plan::noop(current.clone()))
        }
        fn apply(&self, _ctx: &EvalContext, _plan: &Plan, _really_apply: bool) -> Result<(), ResourceError> {
            Ok(())
        }
    }

    #[test]
    fn topological_order_respects_dependencies() {
        let graph = Graph::build(vec![
            FakeResource::new("file.a", &["file.b"]),
            FakeResource::new("file.b", &["file.c"]),
            FakeResource::new("file.c", &[]),
        ]);
        let order = graph.topological_order().unwrap();
        let ids: Vec<String> = order.iter().map(|&i| graph.get(i).id()).collect();
        let pos = |id: &str| ids.iter().position(|x| x == id).unwrap();
        assert!(pos("file.c") < pos("file.b"));
        assert!(pos("file.b") < pos("file.a"));
    }

    #[test]
    fn topological_order_is_lexicographically_deterministic_among_ready_nodes() {
        let graph = Graph::build(vec![
            FakeResource::new("file.z", &[]),
            FakeResource::new("file.a", &[]),
            FakeResource::new("file.m", &[]),
        ]);
        let order = graph.topological_order().unwrap();
        let ids: Vec<String> = order.iter().map(|&i| graph.get(i).id()).collect();
        assert_eq!(ids, vec!["file.a", "file.m", "file.z"]);
    }

    #[test]
    fn validate_rejects_unknown_dependency() {
        let graph = Graph::build(vec![FakeResource::new("file.a", &["file.missing"])]);
        assert!(graph.validate().is_err());
    }

    #[test]
    fn detect_cycle_finds_two_node_cycle() {
        let graph = Graph::build(vec![
            FakeResource::new("file.a", &["file.b"]),
            FakeResource::new("file.b", &["file.a"]),
        ]);
        let cycle = graph.detect_cycle();
        assert!(cycle.is_some());
        let cycle = cycle.unwrap();
        assert!(cycle.contains("file.a"));
        assert!(cycle.contains("file.b"));
    }

    #[test]
    fn topological_order_errors_on_cycle() {
        let graph = Graph::build(vec![
            FakeResource::new("file.a", &["file.b"]),
            FakeResource::new("file.b", &["file.a"]),
        ]);
        assert!(graph.topological_order().is_err());
    }

    #[test]
    fn detect_cycle_none_for_acyclic_graph() {
        let graph = Graph::build(vec![
            FakeResource::new("file.a", &["file.b"]),
            FakeResource::new("file.b", &[]),
        ]);
        assert!(graph.detect_cycle().is_none());
    }

    #[test]
    fn expand_role_dependencies_replaces_role_reference_with_members() {
        let mut role_members = BTreeMap::new();
        role_members.insert(
            "web".to_string(),
            vec!["package.nginx".to_string(), "service.nginx".to_string()],
        );
        let expanded = expand_role_dependencies(
            &["role.web".to_string(), "file.config".to_string()],
            &role_members,
        );
        assert_eq!(
            expanded,
            vec![
                "package.nginx".to_string(),
                "service.nginx".to_string(),
                "file.config".to_string(),
            ]
        );
    }

    #[test]
    fn expand_role_dependencies_unknown_role_expands_to_nothing() {
        let role_members = BTreeMap::new();
        let expanded = expand_role_dependencies(&["role.missing".to_string()], &role_members);
        assert!(expanded.is_empty());
    }

    #[test]
    fn expand_role_dependencies_deduplicates() {
        let mut role_members = BTreeMap::new();
        role_members.insert("web".to_string(), vec!["package.nginx".to_string()]);
        let expanded = expand_role_dependencies(
            &["role.web".to_string(), "package.nginx".to_string()],
            &role_members,
        );
        assert_eq!(expanded, vec!["package.nginx".to_string()]);
    }
}
