//! Rendering of document trees into HTML.
//!
//! Rendering is a pure, depth-first walk that preserves child order. Every
//! node kind maps to a fixed wrapper; unknown kinds render their children
//! only. Text and attribute values are escaped, so the output is always
//! balanced markup.
//!
//! # Example
//!
//! ```rust
//! use syndic_core::document::{AstElement, AstNode, NodeKind};
//! use syndic_core::render::{RenderContext, render};
//!
//! let doc: AstNode = AstElement::new(NodeKind::Doc)
//!     .child(AstElement::new(NodeKind::Heading).attr("level", 2).child(AstNode::text("T")))
//!     .child(AstElement::new(NodeKind::Paragraph).child(AstNode::text("Body")))
//!     .into();
//!
//! assert_eq!(render(&doc, &RenderContext::default()), "<h2>T</h2><p>Body</p>");
//! ```

use url::Url;

use crate::article::{escape_attr, escape_text};
use crate::document::{AstElement, AstNode, ListStyle, Mark, NodeKind, TextLeaf};
use crate::media::{MediaProxy, NO_REFERRER, REFERRER_POLICY_ATTR};

/// Heading level used when a heading node carries none.
pub const DEFAULT_HEADING_LEVEL: u64 = 3;

/// Inputs the renderer needs besides the tree itself.
#[derive(Debug, Clone, Default)]
pub struct RenderContext<'a> {
    /// Media proxy applied to image sources.
    pub media: Option<&'a MediaProxy>,
    /// Base URL for relative image sources and links.
    pub base_url: Option<&'a Url>,
}

impl<'a> RenderContext<'a> {
    pub fn new(media: &'a MediaProxy, base_url: Option<&'a Url>) -> Self {
        Self { media: Some(media), base_url }
    }

    fn media_src(&self, src: &str) -> String {
        match self.media {
            Some(media) => media.rewrite(src, self.base_url),
            None => MediaProxy::default().rewrite(src, self.base_url),
        }
    }

    fn href(&self, href: &str) -> String {
        let trimmed = href.trim();
        match self.base_url {
            Some(base) => base.join(trimmed).map(|u| u.to_string()).unwrap_or_else(|_| trimmed.to_string()),
            None => trimmed.to_string(),
        }
    }
}

/// Renders a document tree to HTML.
pub fn render(node: &AstNode, ctx: &RenderContext<'_>) -> String {
    let mut out = String::new();
    render_node(node, ctx, &mut out);
    out
}

fn render_node(node: &AstNode, ctx: &RenderContext<'_>, out: &mut String) {
    match node {
        AstNode::Text(leaf) => render_text(leaf, ctx, out),
        AstNode::Element(el) => render_element(el, ctx, out),
    }
}

fn render_children(el: &AstElement, ctx: &RenderContext<'_>, out: &mut String) {
    for child in &el.children {
        render_node(child, ctx, out);
    }
}

fn wrap(tag: &str, el: &AstElement, ctx: &RenderContext<'_>, out: &mut String) {
    out.push('<');
    out.push_str(tag);
    out.push('>');
    render_children(el, ctx, out);
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

fn render_element(el: &AstElement, ctx: &RenderContext<'_>, out: &mut String) {
    match &el.kind {
        NodeKind::Doc => render_children(el, ctx, out),
        NodeKind::Heading => {
            let level = el.attr_u64("level").unwrap_or(DEFAULT_HEADING_LEVEL).clamp(1, 6);
            wrap(&format!("h{level}"), el, ctx, out);
        }
        NodeKind::Paragraph => wrap("p", el, ctx, out),
        NodeKind::Blockquote => wrap("blockquote", el, ctx, out),
        NodeKind::Link => {
            let href = ctx.href(el.attr_str("href").unwrap_or_default());
            out.push_str(&format!(r#"<a href="{}" target="_blank">"#, escape_attr(&href)));
            render_children(el, ctx, out);
            out.push_str("</a>");
        }
        NodeKind::Image => render_image(el, ctx, out),
        NodeKind::CodeBlock => {
            match el.attr_str("lang").or_else(|| el.attr_str("language")) {
                Some(lang) => out.push_str(&format!(r#"<pre><code class="language-{}">"#, escape_attr(lang.trim()))),
                None => out.push_str("<pre><code>"),
            }
            render_children(el, ctx, out);
            out.push_str("</code></pre>");
        }
        NodeKind::List(ListStyle::Ordered) => wrap("ol", el, ctx, out),
        NodeKind::List(ListStyle::Bullet) => wrap("ul", el, ctx, out),
        NodeKind::ListItem => wrap("li", el, ctx, out),
        NodeKind::Unknown(_) => render_children(el, ctx, out),
    }
}

fn render_image(el: &AstElement, ctx: &RenderContext<'_>, out: &mut String) {
    let Some(src) = el.attr_str("src") else {
        return;
    };
    let src = ctx.media_src(src);

    out.push_str("<figure><img src=\"");
    out.push_str(&escape_attr(&src));
    out.push('"');
    if let Some(alt) = el.attr_str("alt") {
        out.push_str(&format!(r#" alt="{}""#, escape_attr(alt)));
    }
    for dimension in ["width", "height"] {
        if let Some(value) = el.attr_u64(dimension) {
            out.push_str(&format!(r#" {dimension}="{value}""#));
        }
    }
    out.push_str(&format!(r#" {REFERRER_POLICY_ATTR}="{NO_REFERRER}">"#));

    let caption = el.attr_str("caption").or_else(|| el.attr_str("title"));
    if let Some(caption) = caption {
        out.push_str("<figcaption>");
        out.push_str(&escape_text(caption));
        out.push_str("</figcaption>");
    }
    out.push_str("</figure>");
}

fn render_text(leaf: &TextLeaf, ctx: &RenderContext<'_>, out: &mut String) {
    let mut closing = Vec::new();
    for mark in &leaf.marks {
        match mark {
            Mark::Link { href } => {
                out.push_str(&format!(r#"<a href="{}" target="_blank">"#, escape_attr(&ctx.href(href))));
                closing.push("</a>");
            }
            Mark::Strong => {
                out.push_str("<strong>");
                closing.push("</strong>");
            }
            Mark::Emphasis => {
                out.push_str("<em>");
                closing.push("</em>");
            }
            Mark::Code => {
                out.push_str("<code>");
                closing.push("</code>");
            }
            Mark::Other(_) => {}
        }
    }
    out.push_str(&escape_text(&leaf.text));
    for tag in closing.into_iter().rev() {
        out.push_str(tag);
    }
}
