use crate::error::ContentError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumString};

/// Closed set of node types the editor produces.
///
/// Serialized with the editor's camelCase tags (`bulletList`, `codeBlock`, ...).
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum NodeKind {
    Doc,
    Paragraph,
    Heading,
    BulletList,
    OrderedList,
    ListItem,
    TaskList,
    TaskItem,
    Blockquote,
    CodeBlock,
    HorizontalRule,
    HardBreak,
    Image,
    Text,
}

impl NodeKind {
    pub fn is_inline(self) -> bool {
        matches!(self, NodeKind::Text | NodeKind::HardBreak)
    }

    pub fn is_block(self) -> bool {
        !self.is_inline()
    }

    /// Blocks whose children are inline runs.
    pub fn is_textblock(self) -> bool {
        matches!(
            self,
            NodeKind::Paragraph | NodeKind::Heading | NodeKind::CodeBlock
        )
    }

    /// Non-text leaves occupy exactly one position.
    pub fn is_atom(self) -> bool {
        matches!(
            self,
            NodeKind::HorizontalRule | NodeKind::HardBreak | NodeKind::Image
        )
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, AsRefStr, Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum MarkKind {
    Bold,
    Italic,
    Underline,
    Strike,
    Code,
    Link,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Mark {
    #[serde(rename = "type")]
    pub kind: MarkKind,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attrs: Map<String, Value>,
}

impl Mark {
    pub fn new(kind: MarkKind) -> Self {
        Self {
            kind,
            attrs: Map::new(),
        }
    }

    pub fn bold() -> Self {
        Self::new(MarkKind::Bold)
    }

    pub fn link(href: &str, target: &str, class: &str) -> Self {
        let mut attrs = Map::new();
        attrs.insert("href".to_string(), Value::from(href));
        attrs.insert("target".to_string(), Value::from(target));
        attrs.insert("class".to_string(), Value::from(class));
        Self {
            kind: MarkKind::Link,
            attrs,
        }
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(Value::as_str)
    }
}

/// One node of a document body.
///
/// Mirrors the editor's JSON shape exactly, so a tree round-trips through
/// persistence without an envelope. Empty `attrs`/`content`/`marks` are
/// omitted on output and default on input.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ContentNode {
    #[serde(rename = "type")]
    pub kind: NodeKind,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attrs: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<ContentNode>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ContentNode {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            attrs: Map::new(),
            content: Vec::new(),
            marks: Vec::new(),
            text: None,
        }
    }

    pub fn with_content(kind: NodeKind, content: Vec<ContentNode>) -> Self {
        Self {
            content,
            ..Self::new(kind)
        }
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.to_string(), value.into());
        self
    }

    pub fn doc(content: Vec<ContentNode>) -> Self {
        Self::with_content(NodeKind::Doc, content)
    }

    /// Body of a freshly created document: a single empty paragraph.
    pub fn empty_doc() -> Self {
        Self::doc(vec![Self::paragraph(vec![])])
    }

    pub fn paragraph(content: Vec<ContentNode>) -> Self {
        Self::with_content(NodeKind::Paragraph, content)
    }

    pub fn heading(level: u8, content: Vec<ContentNode>) -> Self {
        Self::with_content(NodeKind::Heading, content).with_attr("level", level)
    }

    pub fn image(src: &str, alt: Option<&str>) -> Self {
        let node = Self::new(NodeKind::Image).with_attr("src", src);
        match alt {
            Some(alt) => node.with_attr("alt", alt),
            None => node,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::new(NodeKind::Text)
        }
    }

    pub fn marked_text(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Self {
            marks,
            ..Self::text(text)
        }
    }

    pub fn from_json(value: &Value) -> Result<Self, ContentError> {
        let node: ContentNode = serde_json::from_value(value.clone())
            .map_err(|e| ContentError::InvalidShape(e.to_string()))?;
        node.validate()?;
        Ok(node)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ContentError> {
        let node: ContentNode =
            serde_json::from_str(s).map_err(|e| ContentError::InvalidShape(e.to_string()))?;
        node.validate()?;
        Ok(node)
    }

    pub fn to_json(&self) -> Value {
        // Every field is plain data; serialization cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Check the document invariants on a root node.
    pub fn validate(&self) -> Result<(), ContentError> {
        if self.kind != NodeKind::Doc {
            return Err(ContentError::RootNotDoc(self.kind));
        }
        self.validate_subtree()
    }

    fn validate_subtree(&self) -> Result<(), ContentError> {
        match self.kind {
            NodeKind::Text => {
                if !self.content.is_empty() {
                    return Err(ContentError::TextWithChildren);
                }
                if self.text.as_deref().map_or(true, str::is_empty) {
                    return Err(ContentError::EmptyText);
                }
                return Ok(());
            }
            NodeKind::Heading => {
                if let Some(level) = self.attrs.get("level").and_then(Value::as_i64) {
                    if !(1..=6).contains(&level) {
                        return Err(ContentError::InvalidLevel(level));
                    }
                }
            }
            _ => {}
        }

        if self.text.is_some() || !self.marks.is_empty() {
            return Err(ContentError::InlineFieldsOnBlock(self.kind));
        }

        self.content.iter().try_for_each(ContentNode::validate_subtree)
    }

    pub fn is_text(&self) -> bool {
        self.kind == NodeKind::Text
    }

    pub fn is_inline(&self) -> bool {
        self.kind.is_inline()
    }

    pub fn is_textblock(&self) -> bool {
        self.kind.is_textblock()
    }

    pub fn is_leaf(&self) -> bool {
        self.is_text() || self.kind.is_atom()
    }

    pub fn text_str(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    pub fn child(&self, index: usize) -> Option<&ContentNode> {
        self.content.get(index)
    }

    pub fn child_count(&self) -> usize {
        self.content.len()
    }

    /// Number of positions this node spans, including its open/close boundaries.
    ///
    /// Text counts UTF-16 code units so offsets line up with the browser's.
    pub fn node_size(&self) -> usize {
        if self.is_text() {
            utf16_len(self.text_str())
        } else if self.kind.is_atom() {
            1
        } else {
            2 + self.content_size()
        }
    }

    pub fn content_size(&self) -> usize {
        self.content.iter().map(ContentNode::node_size).sum()
    }

    /// Concatenated text of every run in this subtree.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if let Some(t) = &self.text {
            out.push_str(t);
        }
        for c in &self.content {
            c.collect_text(out);
        }
    }

    /// Text of the runs covered by `from..to`, relative to this node's content.
    ///
    /// Runs cut by either bound contribute only their covered part.
    pub fn text_between(&self, from: usize, to: usize) -> String {
        let mut out = String::new();
        if from < to {
            self.collect_text_between(0, from, to, &mut out);
        }
        out
    }

    fn collect_text_between(&self, start: usize, from: usize, to: usize, out: &mut String) {
        let mut pos = start;
        for child in &self.content {
            let end = pos + child.node_size();
            if end > from && pos < to {
                if child.is_text() {
                    let text = child.text_str();
                    let a = utf16_to_byte_idx(text, from.saturating_sub(pos));
                    let b = utf16_to_byte_idx(text, to.min(end) - pos);
                    out.push_str(&text[a..b]);
                } else if !child.kind.is_atom() {
                    child.collect_text_between(pos + 1, from, to, out);
                }
            }
            if end >= to {
                break;
            }
            pos = end;
        }
    }

    pub fn attr_i64(&self, key: &str) -> Option<i64> {
        self.attrs.get(key).and_then(Value::as_i64)
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(Value::as_str)
    }

    /// Node addressed by a chain of child indices from `self`.
    pub fn node_at(&self, path: &[usize]) -> Option<&ContentNode> {
        path.iter().try_fold(self, |node, &i| node.content.get(i))
    }

    pub fn node_at_mut(&mut self, path: &[usize]) -> Option<&mut ContentNode> {
        path.iter()
            .try_fold(self, |node, &i| node.content.get_mut(i))
    }

    /// Whether two text runs would render identically side by side.
    pub(crate) fn same_markup(&self, other: &ContentNode) -> bool {
        self.kind == other.kind && self.marks == other.marks && self.attrs == other.attrs
    }
}

pub(crate) fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}

pub(crate) fn utf16_to_byte_idx(s: &str, pos_utf16: usize) -> usize {
    if pos_utf16 == 0 {
        return 0;
    }
    let mut acc = 0;
    for (i, ch) in s.char_indices() {
        let w = ch.len_utf16();
        if acc + w > pos_utf16 {
            return i;
        }
        acc += w;
        if acc == pos_utf16 {
            return i + ch.len_utf8();
        }
    }
    s.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_editor_json() {
        let v = json!({
            "type": "doc",
            "content": [
                {"type": "heading", "attrs": {"level": 2}, "content": [{"type": "text", "text": "Plan"}]},
                {"type": "bulletList", "content": [
                    {"type": "listItem", "content": [
                        {"type": "paragraph", "content": [
                            {"type": "text", "marks": [{"type": "bold"}], "text": "one"}
                        ]}
                    ]}
                ]},
                {"type": "paragraph"}
            ]
        });
        let doc = ContentNode::from_json(&v).expect("valid doc");
        assert_eq!(doc.child_count(), 3);
        assert_eq!(doc.content[0].attr_i64("level"), Some(2));
        assert_eq!(doc.content[1].kind, NodeKind::BulletList);
        assert_eq!(doc.text_content(), "Planone");
        // Empty fields are omitted again on output.
        assert_eq!(doc.to_json(), v);
    }

    #[test]
    fn test_unknown_node_type_is_rejected() {
        let v = json!({"type": "doc", "content": [{"type": "mermaid"}]});
        let err = ContentNode::from_json(&v).unwrap_err();
        assert!(matches!(err, ContentError::InvalidShape(_)));
    }

    #[test]
    fn test_invariants() {
        let root = ContentNode::paragraph(vec![]);
        assert_eq!(
            root.validate(),
            Err(ContentError::RootNotDoc(NodeKind::Paragraph))
        );

        let empty_text = ContentNode::doc(vec![ContentNode::paragraph(vec![
            ContentNode::text(""),
        ])]);
        assert_eq!(empty_text.validate(), Err(ContentError::EmptyText));

        let mut bad_text = ContentNode::text("x");
        bad_text.content.push(ContentNode::text("y"));
        let doc = ContentNode::doc(vec![ContentNode::paragraph(vec![bad_text])]);
        assert_eq!(doc.validate(), Err(ContentError::TextWithChildren));

        let doc = ContentNode::doc(vec![ContentNode::heading(7, vec![])]);
        assert_eq!(doc.validate(), Err(ContentError::InvalidLevel(7)));

        let mut para = ContentNode::paragraph(vec![]);
        para.marks.push(Mark::bold());
        let doc = ContentNode::doc(vec![para]);
        assert_eq!(
            doc.validate(),
            Err(ContentError::InlineFieldsOnBlock(NodeKind::Paragraph))
        );

        assert_eq!(ContentNode::empty_doc().validate(), Ok(()));
    }

    #[test]
    fn test_node_sizes() {
        let p = ContentNode::paragraph(vec![ContentNode::text("abc")]);
        assert_eq!(p.node_size(), 5);
        assert_eq!(ContentNode::new(NodeKind::HorizontalRule).node_size(), 1);
        assert_eq!(ContentNode::paragraph(vec![]).node_size(), 2);

        let doc = ContentNode::doc(vec![p, ContentNode::new(NodeKind::HorizontalRule)]);
        assert_eq!(doc.content_size(), 6);

        // Astral characters count as two UTF-16 units.
        assert_eq!(ContentNode::text("📄").node_size(), 2);
    }

    #[test]
    fn test_utf16_byte_index() {
        let s = "a📄b";
        assert_eq!(utf16_to_byte_idx(s, 0), 0);
        assert_eq!(utf16_to_byte_idx(s, 1), 1);
        assert_eq!(utf16_to_byte_idx(s, 3), 5);
        assert_eq!(utf16_to_byte_idx(s, 4), 6);
        assert_eq!(utf16_to_byte_idx(s, 99), s.len());
    }

    #[test]
    fn test_text_between_cuts_runs_at_bounds() {
        let doc = ContentNode::doc(vec![
            ContentNode::paragraph(vec![ContentNode::text("hello")]),
            ContentNode::paragraph(vec![
                ContentNode::text("w📄"),
                ContentNode::new(NodeKind::HardBreak),
                ContentNode::text("d"),
            ]),
        ]);
        assert_eq!(doc.text_between(3, 11), "llow📄");
        assert_eq!(doc.text_between(0, doc.content_size()), "hellow📄d");
        assert_eq!(doc.text_between(5, 5), "");
        assert_eq!(doc.text_between(6, 8), "");
    }

    #[test]
    fn test_node_kind_names() {
        assert_eq!(NodeKind::BulletList.as_ref(), "bulletList");
        assert_eq!("codeBlock".parse::<NodeKind>(), Ok(NodeKind::CodeBlock));
        assert!(NodeKind::HardBreak.is_inline());
        assert!(NodeKind::ListItem.is_block());
        assert!(!NodeKind::ListItem.is_textblock());
    }
}
