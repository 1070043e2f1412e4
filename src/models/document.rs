//! Nested documents assembled from records

use serde::Serialize;
use std::collections::BTreeMap;

use super::value::FieldValue;

/// Key of the identifier field in every root document.
pub const ID_KEY: &str = "_id";

/// A node of a document tree: a leaf value or a nested sub-document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Node {
    Value(FieldValue),
    Document(Document),
}

/// A nested mapping of `key -> Node`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Document {
    entries: BTreeMap<String, Node>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries.get(key)
    }

    /// Leaf value at a dotted path such as `patient.name`.
    pub fn value_at(&self, path: &str) -> Option<&FieldValue> {
        let mut current = self;
        let mut segments = path.split('.').peekable();
        while let Some(segment) = segments.next() {
            match current.entries.get(segment)? {
                Node::Value(v) if segments.peek().is_none() => return Some(v),
                Node::Document(d) => current = d,
                Node::Value(_) => return None,
            }
        }
        None
    }

    /// Sub-document directly under `key`.
    pub fn child(&self, key: &str) -> Option<&Document> {
        match self.entries.get(key)? {
            Node::Document(d) => Some(d),
            Node::Value(_) => None,
        }
    }

    /// Insert a leaf value below the container chain `path`, creating
    /// intermediate sub-documents on first use.
    ///
    /// A leaf already sitting where a container is needed is replaced by an
    /// empty container.
    pub fn insert_at(&mut self, path: &[&str], key: impl Into<String>, value: FieldValue) {
        let mut current = self;
        for segment in path {
            let node = current
                .entries
                .entry((*segment).to_string())
                .or_insert_with(|| Node::Document(Document::new()));
            if let Node::Value(_) = node {
                *node = Node::Document(Document::new());
            }
            current = match node {
                Node::Document(d) => d,
                Node::Value(_) => unreachable!("replaced by a container above"),
            };
        }
        current.entries.insert(key.into(), Node::Value(value));
    }

    /// The `_id` value of this document, if it holds a text identifier.
    pub fn id(&self) -> Option<&str> {
        match self.entries.get(ID_KEY)? {
            Node::Value(FieldValue::Text(id)) => Some(id),
            _ => None,
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &Node)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .entries
            .iter()
            .map(|(k, node)| {
                let value = match node {
                    Node::Value(v) => v.to_json(),
                    Node::Document(d) => d.to_json(),
                };
                (k.clone(), value)
            })
            .collect();
        serde_json::Value::Object(map)
    }
}

impl std::fmt::Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_json())
    }
}
