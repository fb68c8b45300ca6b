//! Serialization of DOM trees.

use serde::Serialize;
use serde_json::Value;

use super::{Content, Node};

/// A serializable copy of a DOM subtree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeSnapshot {
    Element {
        tag: String,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        properties: Vec<(String, Value)>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        children: Vec<NodeSnapshot>,
    },
    Text {
        data: String,
    },
    Comment {
        data: String,
    },
}

fn escape(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

impl Node {
    /// Serialize this node and its descendants as markup.
    ///
    /// Properties are written as attributes in assignment order. String
    /// values are written verbatim, other JSON values in their JSON form.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    /// Markup of the children only.
    pub fn inner_html(&self) -> String {
        let mut out = String::new();
        for child in self.0.children.borrow().iter() {
            child.write_html(&mut out);
        }
        out
    }

    fn write_html(&self, out: &mut String) {
        match &self.0.content {
            Content::Element { tag, properties, .. } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in properties.borrow().iter() {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    match value {
                        Value::String(s) => escape(s, out),
                        other => escape(&other.to_string(), out),
                    }
                    out.push('"');
                }
                out.push('>');
                for child in self.0.children.borrow().iter() {
                    child.write_html(out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
            Content::Text(text) => escape(&text.borrow(), out),
            Content::Comment(text) => {
                out.push_str("<!--");
                out.push_str(&text.borrow());
                out.push_str("-->");
            }
        }
    }

    /// Copy this subtree into a serializable value.
    pub fn snapshot(&self) -> NodeSnapshot {
        match &self.0.content {
            Content::Element { tag, .. } => NodeSnapshot::Element {
                tag: tag.clone(),
                properties: self.properties(),
                children: self
                    .0
                    .children
                    .borrow()
                    .iter()
                    .map(Node::snapshot)
                    .collect(),
            },
            Content::Text(text) => NodeSnapshot::Text {
                data: text.borrow().clone(),
            },
            Content::Comment(text) => NodeSnapshot::Comment {
                data: text.borrow().clone(),
            },
        }
    }
}
