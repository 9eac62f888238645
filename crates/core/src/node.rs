//! Serialized parse nodes and their typed form.
//!
//! Wire format: `(<value>@$<name>|<value>@$<name>...#<nonterminal>)`, with
//! nested nodes written inline and `(#<nonterminal>)` for a node without
//! bindings. `(`, `|`, `@$`, `#` and `)` are reserved.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Encode a node. Bindings are written in name order.
pub fn encode(name: &str, bindings: &BTreeMap<String, String>) -> String {
    let mut out = String::from("(");
    for (i, (variable, value)) in bindings.iter().enumerate() {
        if i > 0 {
            out.push('|');
        }
        out.push_str(value);
        out.push_str("@$");
        out.push_str(variable);
    }
    out.push('#');
    out.push_str(name);
    out.push(')');
    out
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NodeError {
    #[error("unexpected end of node text")]
    UnexpectedEnd,
    #[error("expected '{expected}' at offset {offset}")]
    Expected { expected: &'static str, offset: usize },
    #[error("trailing text at offset {offset}")]
    Trailing { offset: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum NodeValue {
    Leaf(String),
    Node(ParseNode),
}

impl NodeValue {
    pub fn as_leaf(&self) -> Option<&str> {
        match self {
            NodeValue::Leaf(text) => Some(text),
            NodeValue::Node(_) => None,
        }
    }

    pub fn as_node(&self) -> Option<&ParseNode> {
        match self {
            NodeValue::Node(node) => Some(node),
            NodeValue::Leaf(_) => None,
        }
    }
}

/// Typed parse node. Each node owns its children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseNode {
    pub name: String,
    pub bindings: BTreeMap<String, NodeValue>,
}

impl ParseNode {
    pub fn get(&self, variable: &str) -> Option<&NodeValue> {
        self.bindings.get(variable)
    }

    pub fn node(&self, variable: &str) -> Option<&ParseNode> {
        self.get(variable)?.as_node()
    }

    pub fn leaf(&self, variable: &str) -> Option<&str> {
        self.get(variable)?.as_leaf()
    }

    /// Every leaf in the subtree, depth first in binding order.
    pub fn leaves(&self) -> Vec<&str> {
        let mut out = Vec::new();
        collect_leaves(self, &mut out);
        out
    }

    pub fn encode(&self) -> String {
        let mut bindings = BTreeMap::new();
        for (variable, value) in &self.bindings {
            let text = match value {
                NodeValue::Leaf(text) => text.clone(),
                NodeValue::Node(node) => node.encode(),
            };
            bindings.insert(variable.clone(), text);
        }
        encode(&self.name, &bindings)
    }
}

impl fmt::Display for ParseNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

fn collect_leaves<'a>(node: &'a ParseNode, out: &mut Vec<&'a str>) {
    for value in node.bindings.values() {
        match value {
            NodeValue::Leaf(text) => out.push(text),
            NodeValue::Node(child) => collect_leaves(child, out),
        }
    }
}

/// Decode a serialized node.
pub fn decode(text: &str) -> Result<ParseNode, NodeError> {
    let mut reader = Reader { text, pos: 0 };
    let node = reader.node()?;
    if reader.pos != text.len() {
        return Err(NodeError::Trailing { offset: reader.pos });
    }
    Ok(node)
}

/// Decode a bound value: a node when it starts with `(`, else a leaf.
pub fn decode_value(text: &str) -> Result<NodeValue, NodeError> {
    if text.starts_with('(') {
        decode(text).map(NodeValue::Node)
    } else {
        Ok(NodeValue::Leaf(text.to_owned()))
    }
}

struct Reader<'a> {
    text: &'a str,
    pos: usize,
}

impl Reader<'_> {
    fn rest(&self) -> &str {
        &self.text[self.pos..]
    }

    fn expect(&mut self, literal: &'static str) -> Result<(), NodeError> {
        if self.rest().starts_with(literal) {
            self.pos += literal.len();
            Ok(())
        } else if self.rest().is_empty() {
            Err(NodeError::UnexpectedEnd)
        } else {
            Err(NodeError::Expected {
                expected: literal,
                offset: self.pos,
            })
        }
    }

    fn node(&mut self) -> Result<ParseNode, NodeError> {
        self.expect("(")?;
        let mut bindings = BTreeMap::new();
        loop {
            if self.rest().starts_with('#') {
                self.pos += 1;
                let end = self.rest().find(')').ok_or(NodeError::UnexpectedEnd)?;
                let name = self.rest()[..end].to_owned();
                self.pos += end + 1;
                return Ok(ParseNode { name, bindings });
            }
            let value = if self.rest().starts_with('(') {
                NodeValue::Node(self.node()?)
            } else {
                let end = self.rest().find("@$").ok_or(NodeError::UnexpectedEnd)?;
                let leaf = self.rest()[..end].to_owned();
                self.pos += end;
                NodeValue::Leaf(leaf)
            };
            self.expect("@$")?;
            let end = self
                .rest()
                .find(['|', '#'])
                .ok_or(NodeError::UnexpectedEnd)?;
            let variable = self.rest()[..end].to_owned();
            self.pos += end;
            if self.rest().starts_with('|') {
                self.pos += 1;
            }
            bindings.insert(variable, value);
        }
    }
}
