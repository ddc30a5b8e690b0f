//! Rich-text (Portable Text) rendering
//!
//! A post body is a flat list of typed blocks. Each block is mapped to
//! output [`Node`]s by a rule chosen from its type and style; anything the
//! renderer does not know about degrades to a fallback node instead of
//! failing. Nodes serialize to HTML with [`to_html`].

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::model::ImageRef;
use crate::helpers::{escape_html, ImageUrlBuilder};

/// A block of the rich-text tree
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// `_type: "block"`: styled text, headings and list items
    Text(TextBlock),
    /// `_type: "image"`
    Image(ImageRef),
    /// Any other block type, or a block that could not be decoded
    Unknown { block_type: String, raw: Value },
}

impl Block {
    fn from_value(raw: Value) -> Self {
        let block_type = raw
            .get("_type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let decoded = match block_type.as_str() {
            "block" => serde_json::from_value(raw.clone()).map(Block::Text).ok(),
            "image" => serde_json::from_value(raw.clone()).map(Block::Image).ok(),
            _ => None,
        };

        decoded.unwrap_or_else(|| {
            tracing::debug!("Unrecognized rich-text block type {:?}", block_type);
            Block::Unknown { block_type, raw }
        })
    }
}

impl<'de> Deserialize<'de> for Block {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Block::from_value(Value::deserialize(deserializer)?))
    }
}

/// A text block
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct TextBlock {
    #[serde(default)]
    pub style: Option<String>,
    #[serde(rename = "listItem", default)]
    pub list_item: Option<String>,
    #[serde(default)]
    pub level: Option<u8>,
    #[serde(default)]
    pub children: Vec<Span>,
    #[serde(rename = "markDefs", default)]
    pub mark_defs: Vec<MarkDef>,
}

/// An inline run of text with its marks
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Span {
    #[serde(default)]
    pub text: String,
    /// Decorator names or `_key`s of entries in the block's `markDefs`
    #[serde(default)]
    pub marks: Vec<String>,
}

/// Annotation definition referenced from span marks
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MarkDef {
    #[serde(rename = "_key")]
    pub key: String,
    #[serde(rename = "_type")]
    pub kind: String,
    #[serde(default)]
    pub href: Option<String>,
}

/// Inline decorations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decorator {
    Strong,
    Em,
    Code,
    Underline,
    StrikeThrough,
}

impl Decorator {
    fn parse(mark: &str) -> Option<Self> {
        match mark {
            "strong" => Some(Decorator::Strong),
            "em" => Some(Decorator::Em),
            "code" => Some(Decorator::Code),
            "underline" => Some(Decorator::Underline),
            "strike-through" => Some(Decorator::StrikeThrough),
            _ => None,
        }
    }

    fn tag(self) -> &'static str {
        match self {
            Decorator::Strong => "strong",
            Decorator::Em => "em",
            Decorator::Code => "code",
            Decorator::Underline => "u",
            Decorator::StrikeThrough => "del",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Bullet,
    Number,
}

/// Rendered output node
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// `emphasized` marks the h1/h2 override styling
    Heading {
        level: u8,
        emphasized: bool,
        children: Vec<Node>,
    },
    Paragraph(Vec<Node>),
    Blockquote(Vec<Node>),
    ListItem {
        kind: ListKind,
        level: u8,
        children: Vec<Node>,
    },
    Link {
        href: String,
        children: Vec<Node>,
    },
    Mark {
        decorator: Decorator,
        children: Vec<Node>,
    },
    Text(String),
    LineBreak,
    Image {
        url: Option<String>,
        alt: String,
    },
    Fallback {
        block_type: String,
        children: Vec<Node>,
    },
}

impl Node {
    /// Concatenated text of this node and its descendants
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Text(text) => out.push_str(text),
            Node::LineBreak => out.push('\n'),
            Node::Image { .. } => {}
            Node::Heading { children, .. }
            | Node::Paragraph(children)
            | Node::Blockquote(children)
            | Node::ListItem { children, .. }
            | Node::Link { children, .. }
            | Node::Mark { children, .. }
            | Node::Fallback { children, .. } => {
                for child in children {
                    child.collect_text(out);
                }
            }
        }
    }
}

/// Maps block trees to nodes and HTML
#[derive(Debug, Clone)]
pub struct RichTextRenderer {
    images: ImageUrlBuilder,
}

impl RichTextRenderer {
    pub fn new(images: ImageUrlBuilder) -> Self {
        Self { images }
    }

    /// Render blocks to nodes
    pub fn render(&self, blocks: &[Block]) -> Vec<Node> {
        blocks.iter().map(|block| self.render_block(block)).collect()
    }

    /// Render blocks straight to HTML
    pub fn render_html(&self, blocks: &[Block]) -> String {
        to_html(&self.render(blocks))
    }

    fn render_block(&self, block: &Block) -> Node {
        match block {
            Block::Text(text) => render_text_block(text),
            Block::Image(image) => Node::Image {
                url: self.images.url(image),
                alt: image.alt.clone().unwrap_or_default(),
            },
            Block::Unknown { block_type, raw } => Node::Fallback {
                block_type: block_type.clone(),
                children: fallback_children(raw),
            },
        }
    }
}

fn render_text_block(block: &TextBlock) -> Node {
    let children = render_spans(block);

    if let Some(list_item) = &block.list_item {
        let kind = match list_item.as_str() {
            "number" => ListKind::Number,
            _ => ListKind::Bullet,
        };
        return Node::ListItem {
            kind,
            level: block.level.unwrap_or(1).max(1),
            children,
        };
    }

    match block.style.as_deref().unwrap_or("normal") {
        "h1" => Node::Heading {
            level: 1,
            emphasized: true,
            children,
        },
        "h2" => Node::Heading {
            level: 2,
            emphasized: true,
            children,
        },
        "h3" => plain_heading(3, children),
        "h4" => plain_heading(4, children),
        "h5" => plain_heading(5, children),
        "h6" => plain_heading(6, children),
        "blockquote" => Node::Blockquote(children),
        _ => Node::Paragraph(children),
    }
}

fn plain_heading(level: u8, children: Vec<Node>) -> Node {
    Node::Heading {
        level,
        emphasized: false,
        children,
    }
}

fn render_spans(block: &TextBlock) -> Vec<Node> {
    let mut nodes: Vec<Node> = Vec::new();
    // key of the link annotation the last pushed node belongs to
    let mut open_link: Option<&str> = None;

    for span in &block.children {
        let mut inner = text_nodes(&span.text);
        let mut link: Option<&MarkDef> = None;

        for mark in &span.marks {
            if let Some(decorator) = Decorator::parse(mark) {
                inner = vec![Node::Mark {
                    decorator,
                    children: inner,
                }];
            } else if let Some(def) = block.mark_defs.iter().find(|d| &d.key == mark) {
                if def.kind == "link" && link.is_none() {
                    link = Some(def);
                }
            }
        }

        match link {
            Some(def) => {
                if open_link == Some(def.key.as_str()) {
                    if let Some(Node::Link { children, .. }) = nodes.last_mut() {
                        children.extend(inner);
                        continue;
                    }
                }
                nodes.push(Node::Link {
                    href: def.href.clone().unwrap_or_default(),
                    children: inner,
                });
                open_link = Some(def.key.as_str());
            }
            None => {
                nodes.extend(inner);
                open_link = None;
            }
        }
    }

    nodes
}

fn text_nodes(text: &str) -> Vec<Node> {
    let mut nodes = Vec::new();
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            nodes.push(Node::LineBreak);
        }
        if !line.is_empty() {
            nodes.push(Node::Text(line.to_string()));
        }
    }
    nodes
}

/// Best-effort text for blocks of unknown type
fn fallback_children(raw: &Value) -> Vec<Node> {
    if let Some(text) = raw.get("text").and_then(Value::as_str) {
        return text_nodes(text);
    }
    raw.get("children")
        .and_then(Value::as_array)
        .map(|children| {
            children
                .iter()
                .filter_map(|child| child.get("text").and_then(Value::as_str))
                .flat_map(text_nodes)
                .collect()
        })
        .unwrap_or_default()
}

/// Serialize nodes to HTML, wrapping runs of list items in `<ul>`/`<ol>`
/// Relative links and `http`, `https` or `mailto` URLs
///
/// Browsers ignore whitespace and control characters inside a scheme, so
/// they are stripped before the check.
fn is_safe_href(href: &str) -> bool {
    let compact: String = href
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_ascii_control())
        .collect();
    match compact.find([':', '/', '?', '#']) {
        Some(i) if compact[i..].starts_with(':') => {
            let scheme = compact[..i].to_ascii_lowercase();
            matches!(scheme.as_str(), "http" | "https" | "mailto")
        }
        _ => true,
    }
}

pub fn to_html(nodes: &[Node]) -> String {
    let mut out = String::new();
    let mut open_list: Option<ListKind> = None;

    for node in nodes {
        let item_kind = match node {
            Node::ListItem { kind, .. } => Some(*kind),
            _ => None,
        };

        if open_list.is_some() && open_list != item_kind {
            close_list(&mut out, open_list.take());
        }
        if let Some(kind) = item_kind {
            if open_list.is_none() {
                out.push_str(match kind {
                    ListKind::Bullet => "<ul>",
                    ListKind::Number => "<ol>",
                });
                open_list = Some(kind);
            }
        }

        write_node(&mut out, node);
    }

    close_list(&mut out, open_list);
    out
}

fn close_list(out: &mut String, kind: Option<ListKind>) {
    match kind {
        Some(ListKind::Bullet) => out.push_str("</ul>"),
        Some(ListKind::Number) => out.push_str("</ol>"),
        None => {}
    }
}

fn write_children(out: &mut String, children: &[Node]) {
    for child in children {
        write_node(out, child);
    }
}

fn write_node(out: &mut String, node: &Node) {
    match node {
        Node::Heading {
            level,
            emphasized,
            children,
        } => {
            if *emphasized {
                out.push_str(&format!(r#"<h{} class="text-3xl font-bold my-5">"#, level));
            } else {
                out.push_str(&format!("<h{}>", level));
            }
            write_children(out, children);
            out.push_str(&format!("</h{}>", level));
        }
        Node::Paragraph(children) => {
            out.push_str("<p>");
            write_children(out, children);
            out.push_str("</p>");
        }
        Node::Blockquote(children) => {
            out.push_str("<blockquote>");
            write_children(out, children);
            out.push_str("</blockquote>");
        }
        Node::ListItem {
            kind,
            level,
            children,
        } => {
            let style = match kind {
                ListKind::Bullet => "list-disc",
                ListKind::Number => "list-decimal",
            };
            out.push_str(&format!(
                r#"<li class="ml-{} {}">"#,
                u32::from(*level) * 4,
                style
            ));
            write_children(out, children);
            out.push_str("</li>");
        }
        Node::Link { href, children } if is_safe_href(href) => {
            out.push_str(&format!(
                r#"<a href="{}" class="text-blue-600 hover:underline underline-offset-2">"#,
                escape_html(href)
            ));
            write_children(out, children);
            out.push_str("</a>");
        }
        Node::Link { href, children } => {
            tracing::warn!("Dropping link with disallowed scheme: {:?}", href);
            out.push_str("<span>");
            write_children(out, children);
            out.push_str("</span>");
        }
        Node::Mark {
            decorator,
            children,
        } => {
            out.push_str(&format!("<{}>", decorator.tag()));
            write_children(out, children);
            out.push_str(&format!("</{}>", decorator.tag()));
        }
        Node::Text(text) => out.push_str(&escape_html(text)),
        Node::LineBreak => out.push_str("<br/>"),
        Node::Image { url, alt } => {
            if let Some(url) = url {
                out.push_str(&format!(
                    r#"<img src="{}" alt="{}"/>"#,
                    escape_html(url),
                    escape_html(alt)
                ));
            }
        }
        Node::Fallback {
            block_type,
            children,
        } => {
            out.push_str(&format!(
                r#"<div data-block-type="{}">"#,
                escape_html(block_type)
            ));
            write_children(out, children);
            out.push_str("</div>");
        }
    }
}
