use crate::content::{ContentNode, NodeKind};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TocEntry {
    pub id: String,
    pub text: String,
    pub level: u8,
}

impl TocEntry {
    /// Nesting depth in the outline (level 1 is flush left).
    pub fn indent(&self) -> usize {
        usize::from(self.level.saturating_sub(1))
    }
}

pub fn heading_anchor_id(ordinal: usize) -> String {
    format!("heading-{ordinal}")
}

/// Outline of every heading in `root`, in document order.
///
/// Ids depend only on traversal order, so re-running on an unchanged tree
/// yields identical entries.
pub fn extract_toc(root: &ContentNode) -> Vec<TocEntry> {
    let mut out = Vec::new();
    collect_headings(root, &mut out);
    out
}

fn collect_headings(node: &ContentNode, out: &mut Vec<TocEntry>) {
    if node.kind == NodeKind::Heading {
        // Only direct runs; marks are irrelevant.
        let text: String = node.content.iter().map(ContentNode::text_str).collect();
        out.push(TocEntry {
            id: heading_anchor_id(out.len() + 1),
            text,
            level: heading_level(node),
        });
    }

    for child in &node.content {
        collect_headings(child, out);
    }
}

fn heading_level(node: &ContentNode) -> u8 {
    match node.attr_i64("level") {
        Some(level) => level.clamp(1, 6) as u8,
        None => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Mark;
    use serde_json::json;

    #[test]
    fn test_single_heading_scenario() {
        let doc = ContentNode::from_json(&json!({
            "type": "doc",
            "content": [
                {"type": "heading", "attrs": {"level": 1}, "content": [{"type": "text", "text": "Intro"}]},
                {"type": "paragraph", "content": [{"type": "text", "text": "body"}]}
            ]
        }))
        .expect("valid doc");

        assert_eq!(
            extract_toc(&doc),
            vec![TocEntry {
                id: "heading-1".into(),
                text: "Intro".into(),
                level: 1,
            }]
        );
    }

    #[test]
    fn test_preorder_ids_and_mark_free_text() {
        let doc = ContentNode::doc(vec![
            ContentNode::heading(2, vec![
                ContentNode::text("Getting "),
                ContentNode::marked_text("started", vec![Mark::bold()]),
            ]),
            ContentNode::with_content(
                NodeKind::Blockquote,
                vec![ContentNode::heading(3, vec![ContentNode::text("Quoted")])],
            ),
            ContentNode::heading(1, vec![ContentNode::text("Last")]),
        ]);

        let toc = extract_toc(&doc);
        let ids: Vec<_> = toc.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["heading-1", "heading-2", "heading-3"]);
        assert_eq!(toc[0].text, "Getting started");
        assert_eq!(toc[1].text, "Quoted");
        assert_eq!(toc[1].indent(), 2);
        assert_eq!(toc[2].level, 1);
    }

    #[test]
    fn test_missing_level_defaults_and_empty_heading_counts() {
        let doc = ContentNode::doc(vec![
            ContentNode::with_content(NodeKind::Heading, vec![ContentNode::text("No level")]),
            ContentNode::heading(4, vec![]),
        ]);
        let toc = extract_toc(&doc);
        assert_eq!(toc.len(), 2);
        assert_eq!(toc[0].level, 1);
        assert_eq!(toc[1].text, "");
        assert_eq!(toc[1].id, "heading-2");
    }

    #[test]
    fn test_empty_and_idempotent() {
        assert!(extract_toc(&ContentNode::doc(vec![])).is_empty());
        assert!(extract_toc(&ContentNode::empty_doc()).is_empty());

        let doc = ContentNode::doc(vec![
            ContentNode::heading(1, vec![ContentNode::text("A")]),
            ContentNode::heading(6, vec![ContentNode::text("B")]),
        ]);
        let first = extract_toc(&doc);
        assert_eq!(first, extract_toc(&doc.clone()));
        assert!(first.iter().all(|e| (1..=6).contains(&e.level)));
    }
}
