//! Container hierarchy validation
//!
//! Containers declared by catalog fields form a tree hanging off the root:
//! every container has exactly one parent, every parent is either the root
//! or another declared container, and there are no cycles. Depth is not
//! limited; paths are resolved by walking parent links.

use petgraph::algo::{is_cyclic_directed, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeMap, HashMap};

/// Parent name meaning "top-level document".
pub const ROOT: &str = "root";

/// Error during container validation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ContainerValidationError {
    #[error("Container '{container}' declared with two parents: '{first}' and '{second}'")]
    ConflictingParents {
        container: String,
        first: String,
        second: String,
    },

    #[error("Container '{container}' has unknown parent '{parent}'")]
    UnknownParent { container: String, parent: String },

    #[error("Container '{0}' cannot be named '{ROOT}'")]
    ReservedName(String),

    #[error("Circular container nesting: {}", .0.join(" -> "))]
    Cycle(Vec<String>),
}

/// Validated container hierarchy.
#[derive(Debug, Clone, Default)]
pub struct ContainerTree {
    /// container -> parent (`ROOT` for top-level containers)
    parents: BTreeMap<String, String>,
    /// declaration order of containers
    order: Vec<String>,
}

impl ContainerTree {
    /// Build the tree from `(container, parent)` declarations in catalog order.
    ///
    /// The same pair may be declared any number of times; a container
    /// declared under two different parents is an error.
    pub fn build<'a, I>(declarations: I) -> Result<Self, ContainerValidationError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut tree = ContainerTree::default();
        for (container, parent) in declarations {
            if container == ROOT {
                return Err(ContainerValidationError::ReservedName(
                    container.to_string(),
                ));
            }
            match tree.parents.get(container) {
                Some(existing) if existing != parent => {
                    return Err(ContainerValidationError::ConflictingParents {
                        container: container.to_string(),
                        first: existing.clone(),
                        second: parent.to_string(),
                    });
                }
                Some(_) => {}
                None => {
                    tree.parents
                        .insert(container.to_string(), parent.to_string());
                    tree.order.push(container.to_string());
                }
            }
        }

        for container in &tree.order {
            let parent = &tree.parents[container];
            if parent != ROOT && !tree.parents.contains_key(parent) {
                return Err(ContainerValidationError::UnknownParent {
                    container: container.clone(),
                    parent: parent.clone(),
                });
            }
        }

        tree.check_acyclic()?;
        Ok(tree)
    }

    /// Check for nesting cycles using petgraph
    fn check_acyclic(&self) -> Result<(), ContainerValidationError> {
        let mut graph = DiGraph::<&str, ()>::new();
        let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();

        let root = graph.add_node(ROOT);
        nodes.insert(ROOT, root);
        for container in &self.order {
            let node = graph.add_node(container.as_str());
            nodes.insert(container.as_str(), node);
        }
        for (container, parent) in &self.parents {
            graph.add_edge(nodes[parent.as_str()], nodes[container.as_str()], ());
        }

        if !is_cyclic_directed(&graph) {
            return Ok(());
        }

        let cycle = tarjan_scc(&graph)
            .into_iter()
            .find(|component| {
                component.len() > 1
                    || component
                        .first()
                        .map(|n| graph.contains_edge(*n, *n))
                        .unwrap_or(false)
            })
            .map(|component| {
                let mut names: Vec<String> =
                    component.iter().map(|n| graph[*n].to_string()).collect();
                names.sort();
                names
            })
            .unwrap_or_default();
        Err(ContainerValidationError::Cycle(cycle))
    }

    /// Parent of a container (`ROOT` for top-level containers).
    pub fn parent(&self, container: &str) -> Option<&str> {
        self.parents.get(container).map(|p| p.as_str())
    }

    pub fn contains(&self, container: &str) -> bool {
        self.parents.contains_key(container)
    }

    /// Containers in declaration order.
    pub fn containers(&self) -> &[String] {
        &self.order
    }

    /// Top-level containers (parent is `ROOT`) in declaration order.
    pub fn top_level(&self) -> Vec<&str> {
        self.order
            .iter()
            .filter(|c| self.parents.get(*c).map(|p| p == ROOT).unwrap_or(false))
            .map(|c| c.as_str())
            .collect()
    }

    /// Chain of containers from the top-level container down to `container`.
    ///
    /// Returns an empty path for unknown containers.
    pub fn path(&self, container: &str) -> Vec<&str> {
        let mut path = Vec::new();
        let mut current = container;
        while let Some((name, parent)) = self.parents.get_key_value(current) {
            path.push(name.as_str());
            if parent == ROOT {
                break;
            }
            current = parent.as_str();
        }
        path.reverse();
        path
    }

    /// Top-level container that `container` belongs to.
    pub fn root_of(&self, container: &str) -> Option<&str> {
        self.path(container).first().copied()
    }

    /// Direct children of `container`, in declaration order.
    pub fn children(&self, container: &str) -> Vec<&str> {
        self.order
            .iter()
            .filter(|c| {
                self.parents
                    .get(*c)
                    .map(|p| p == container)
                    .unwrap_or(false)
            })
            .map(|c| c.as_str())
            .collect()
    }
}
