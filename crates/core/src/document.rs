//! Typed document model produced by the decoders.
//!
//! A decoder yields either ready HTML or a tree of [`AstNode`]s. The node kind
//! set is closed; anything the model does not know is kept as
//! [`NodeKind::Unknown`] so the renderer can degrade to the node's children.

use serde_json::{Map, Value};

/// Output of a decoder.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedDocument {
    /// HTML that only needs sanitizing.
    Html(String),
    /// A document tree that must be rendered first.
    Tree(AstNode),
}

impl DecodedDocument {
    pub fn kind(&self) -> &'static str {
        match self {
            DecodedDocument::Html(_) => "html",
            DecodedDocument::Tree(_) => "tree",
        }
    }
}

/// Style of a list node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListStyle {
    Ordered,
    Bullet,
}

/// Closed set of element kinds understood by the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Doc,
    Heading,
    Paragraph,
    Blockquote,
    Link,
    Image,
    CodeBlock,
    List(ListStyle),
    ListItem,
    /// Any other `type`, kept verbatim for diagnostics.
    Unknown(String),
}

impl NodeKind {
    /// Maps a node `type` name (plus its attributes, for generic lists) to a kind.
    pub fn classify(name: &str, attrs: &Map<String, Value>) -> Self {
        match name {
            "doc" => NodeKind::Doc,
            "heading" => NodeKind::Heading,
            "paragraph" | "p" => NodeKind::Paragraph,
            "blockquote" => NodeKind::Blockquote,
            "link" => NodeKind::Link,
            "image" => NodeKind::Image,
            "codeblock" | "code_block" | "codeBlock" => NodeKind::CodeBlock,
            "ordered_list" | "orderedList" => NodeKind::List(ListStyle::Ordered),
            "bullet_list" | "bulletList" => NodeKind::List(ListStyle::Bullet),
            "list" => NodeKind::List(list_style_from_attrs(attrs)),
            "listItem" | "list_item" | "listitem" => NodeKind::ListItem,
            other => NodeKind::Unknown(other.to_string()),
        }
    }
}

fn list_style_from_attrs(attrs: &Map<String, Value>) -> ListStyle {
    let ordered_flag = attrs.get("ordered").and_then(Value::as_bool).unwrap_or(false);
    let ordered_type = attrs
        .get("type")
        .or_else(|| attrs.get("listType"))
        .and_then(Value::as_str)
        .map(|t| matches!(t, "ordered" | "ol" | "decimal"))
        .unwrap_or(false);

    if ordered_flag || ordered_type { ListStyle::Ordered } else { ListStyle::Bullet }
}

/// Inline formatting attached to a text leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mark {
    Strong,
    Emphasis,
    Code,
    Link { href: String },
    /// Marks without an HTML counterpart are ignored when rendering.
    Other(String),
}

impl Mark {
    /// Builds a mark from its `type` name and attributes.
    pub fn classify(name: &str, attrs: &Map<String, Value>) -> Self {
        match name {
            "bold" | "strong" => Mark::Strong,
            "italic" | "em" => Mark::Emphasis,
            "code" => Mark::Code,
            "link" => Mark::Link { href: attrs.get("href").and_then(Value::as_str).unwrap_or_default().to_string() },
            other => Mark::Other(other.to_string()),
        }
    }
}

/// A leaf of text with optional marks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextLeaf {
    pub text: String,
    pub marks: Vec<Mark>,
}

impl TextLeaf {
    pub fn plain(text: impl Into<String>) -> Self {
        Self { text: text.into(), marks: Vec::new() }
    }
}

/// An element node: kind, attributes and ordered children.
#[derive(Debug, Clone, PartialEq)]
pub struct AstElement {
    pub kind: NodeKind,
    pub attrs: Map<String, Value>,
    pub children: Vec<AstNode>,
}

impl AstElement {
    pub fn new(kind: NodeKind) -> Self {
        Self { kind, attrs: Map::new(), children: Vec::new() }
    }

    /// Adds an attribute, builder style.
    pub fn attr(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.attrs.insert(name.to_string(), value.into());
        self
    }

    /// Adds a child, builder style.
    pub fn child(mut self, child: impl Into<AstNode>) -> Self {
        self.children.push(child.into());
        self
    }

    /// String attribute, ignoring blanks.
    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).and_then(Value::as_str).filter(|s| !s.trim().is_empty())
    }

    /// Integer attribute; numeric strings are accepted.
    pub fn attr_u64(&self, name: &str) -> Option<u64> {
        match self.attrs.get(name)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// A node of the document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum AstNode {
    Text(TextLeaf),
    Element(AstElement),
}

impl AstNode {
    /// Plain text leaf.
    pub fn text(text: impl Into<String>) -> Self {
        AstNode::Text(TextLeaf::plain(text))
    }

    /// Concatenated text of this node and its descendants.
    pub fn text_content(&self) -> String {
        match self {
            AstNode::Text(leaf) => leaf.text.clone(),
            AstNode::Element(el) => el.children.iter().map(AstNode::text_content).collect(),
        }
    }
}

impl From<AstElement> for AstNode {
    fn from(el: AstElement) -> Self {
        AstNode::Element(el)
    }
}

impl From<TextLeaf> for AstNode {
    fn from(leaf: TextLeaf) -> Self {
        AstNode::Text(leaf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_classify_aliases() {
        let none = Map::new();
        assert_eq!(NodeKind::classify("p", &none), NodeKind::Paragraph);
        assert_eq!(NodeKind::classify("code_block", &none), NodeKind::CodeBlock);
        assert_eq!(NodeKind::classify("orderedList", &none), NodeKind::List(ListStyle::Ordered));
        assert_eq!(NodeKind::classify("list_item", &none), NodeKind::ListItem);
        assert_eq!(NodeKind::classify("video", &none), NodeKind::Unknown("video".into()));
    }

    #[test]
    fn test_generic_list_reads_attrs() {
        assert_eq!(
            NodeKind::classify("list", &attrs(json!({"ordered": true}))),
            NodeKind::List(ListStyle::Ordered)
        );
        assert_eq!(
            NodeKind::classify("list", &attrs(json!({"type": "bullet"}))),
            NodeKind::List(ListStyle::Bullet)
        );
        assert_eq!(NodeKind::classify("list", &Map::new()), NodeKind::List(ListStyle::Bullet));
    }

    #[test]
    fn test_attr_accessors() {
        let el = AstElement::new(NodeKind::Heading).attr("level", "2").attr("title", " ");
        assert_eq!(el.attr_u64("level"), Some(2));
        assert_eq!(el.attr_str("title"), None);
    }

    #[test]
    fn test_text_content() {
        let tree: AstNode = AstElement::new(NodeKind::Paragraph)
            .child(AstNode::text("Hello "))
            .child(AstElement::new(NodeKind::Link).child(AstNode::text("world")))
            .into();
        assert_eq!(tree.text_content(), "Hello world");
    }
}
