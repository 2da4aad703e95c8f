//! Schema Document
//!
//! Node tree for the schema file. Unlike a plain YAML value, this tree keeps
//! what the resolver needs to see:
//! - anchors attached to mappings (`&corner`)
//! - aliases as their own node kind (`*corner`), never expanded into copies
//! - the full-line comments leading into each mapping
//! - the line every node starts on, for diagnostics

pub mod composer;

pub use composer::compose;

/// Position of a node in the schema text (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mark {
    pub line: usize,
}

impl Mark {
    pub fn new(line: usize) -> Self {
        Self { line }
    }
}

/// A node of the schema document
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Mapping(Mapping),
    Sequence(Sequence),
    Scalar(Scalar),
    Alias(Alias),
}

impl Node {
    /// Human-readable node kind, used in structural errors
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Mapping(_) => "a mapping",
            Node::Sequence(_) => "a sequence",
            Node::Scalar(_) => "a scalar",
            Node::Alias(_) => "an alias",
        }
    }

    pub fn mark(&self) -> Mark {
        match self {
            Node::Mapping(m) => m.mark,
            Node::Sequence(s) => s.mark,
            Node::Scalar(s) => s.mark,
            Node::Alias(a) => a.mark,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Node::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Node::Sequence(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Node::Scalar(s) => Some(s),
            _ => None,
        }
    }
}

/// A block or flow mapping, entries in document order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mapping {
    /// Anchor name (`&name`) attached to this mapping
    pub anchor: Option<String>,
    /// Raw comment lines (including the leading `#`) leading into this mapping
    pub comment: Vec<String>,
    pub entries: Vec<Entry>,
    pub mark: Mark,
}

impl Mapping {
    /// Look up an entry value by key
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries.iter().find(|e| e.key == key).map(|e| &e.value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One `key: value` pair of a mapping
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: String,
    pub value: Node,
    pub mark: Mark,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sequence {
    pub items: Vec<Node>,
    pub mark: Mark,
}

/// A scalar, kept as the text that was written (quotes removed)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scalar {
    pub value: String,
    pub mark: Mark,
}

/// A reference (`*name`) to an anchored node
#[derive(Debug, Clone, PartialEq)]
pub struct Alias {
    pub name: String,
    pub mark: Mark,
}
