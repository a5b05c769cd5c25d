//! Editing session over one document body.
//!
//! [`EditorHandle`] is owned by the page hosting the document and passed to
//! every editing operation; there is no shared editor instance.

mod child_link;
mod commands;
mod reorder;

pub use child_link::{
    child_link_href, child_link_label, child_link_runs, child_link_target, CHILD_LINK_CLASS,
    CHILD_LINK_PREFIX, DEFAULT_DOCUMENT_ICON,
};
pub use reorder::{MoveDirection, MoveOutcome, SkipReason};

use crate::content::{utf16_to_byte_idx, ContentNode, NodeKind};
use crate::error::ContentError;

const MAX_HISTORY: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn caret(pos: usize) -> Self {
        Self {
            anchor: pos,
            head: pos,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.head
    }

    pub fn from(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn to(&self) -> usize {
        self.anchor.max(self.head)
    }

    fn clamped(self, max: usize) -> Self {
        Self {
            anchor: self.anchor.min(max),
            head: self.head.min(max),
        }
    }
}

/// A single structural edit.
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    /// Replace children `from..to` of the node at `parent` with `nodes`.
    ReplaceChildren {
        parent: Vec<usize>,
        from: usize,
        to: usize,
        nodes: Vec<ContentNode>,
    },
}

impl Step {
    /// Apply to `doc`, returning the step that undoes it.
    fn apply(&self, doc: &mut ContentNode) -> Result<Step, ContentError> {
        match self {
            Step::ReplaceChildren {
                parent,
                from,
                to,
                nodes,
            } => {
                let node = doc.node_at_mut(parent).ok_or(ContentError::InvalidPath)?;
                if node.is_text() {
                    return Err(ContentError::InvalidPath);
                }
                let len = node.content.len();
                if from > to || *to > len {
                    return Err(ContentError::InvalidRange {
                        from: *from,
                        to: *to,
                        len,
                    });
                }
                let removed: Vec<ContentNode> =
                    node.content.splice(*from..*to, nodes.iter().cloned()).collect();
                Ok(Step::ReplaceChildren {
                    parent: parent.clone(),
                    from: *from,
                    to: *from + nodes.len(),
                    nodes: removed,
                })
            }
        }
    }
}

/// Steps applied as one unit: all succeed or the document is left untouched,
/// and undo/redo treats them as one entry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Transaction {
    steps: Vec<Step>,
    selection: Option<Selection>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn select(mut self, selection: Selection) -> Self {
        self.selection = Some(selection);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[derive(Clone, Debug)]
struct HistoryEntry {
    steps: Vec<Step>,
    inverse: Vec<Step>,
    selection_before: Selection,
    selection_after: Selection,
}

#[derive(Clone, Debug)]
pub struct EditorHandle {
    doc: ContentNode,
    selection: Selection,
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
}

impl EditorHandle {
    pub fn new(doc: ContentNode) -> Self {
        Self {
            doc,
            selection: Selection::default(),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
        }
    }

    pub fn doc(&self) -> &ContentNode {
        &self.doc
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection.clamped(self.doc.content_size());
    }

    pub fn set_caret(&mut self, pos: usize) {
        self.set_selection(Selection::caret(pos));
    }

    /// Swap in a whole new body (document switch or server snapshot).
    pub fn replace_doc(&mut self, doc: ContentNode) {
        self.doc = doc;
        self.selection = Selection::default();
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    pub fn dispatch(&mut self, tr: Transaction) -> Result<(), ContentError> {
        if tr.is_empty() {
            return Ok(());
        }

        let mut next = self.doc.clone();
        let inverse = apply_steps(&mut next, &tr.steps)?;

        let selection_before = self.selection;
        self.doc = next;
        self.selection = tr
            .selection
            .unwrap_or(selection_before)
            .clamped(self.doc.content_size());

        self.undo_stack.push(HistoryEntry {
            steps: tr.steps,
            inverse,
            selection_before,
            selection_after: self.selection,
        });
        if self.undo_stack.len() > MAX_HISTORY {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo(&mut self) -> Result<bool, ContentError> {
        let Some(entry) = self.undo_stack.pop() else {
            return Ok(false);
        };
        let mut next = self.doc.clone();
        if let Err(e) = apply_steps(&mut next, &entry.inverse) {
            self.undo_stack.push(entry);
            return Err(e);
        }
        self.doc = next;
        self.selection = entry.selection_before;
        self.redo_stack.push(entry);
        Ok(true)
    }

    pub fn redo(&mut self) -> Result<bool, ContentError> {
        let Some(entry) = self.redo_stack.pop() else {
            return Ok(false);
        };
        let mut next = self.doc.clone();
        if let Err(e) = apply_steps(&mut next, &entry.steps) {
            self.redo_stack.push(entry);
            return Err(e);
        }
        self.doc = next;
        self.selection = entry.selection_after;
        self.undo_stack.push(entry);
        Ok(true)
    }

    /// Insert unmarked text at the selection head.
    pub fn insert_text(&mut self, text: &str) -> Result<(), ContentError> {
        if text.is_empty() {
            return Ok(());
        }
        self.insert_inline(vec![ContentNode::text(text)])
    }

    /// Insert inline runs at the selection head without replacing the selection.
    pub(crate) fn insert_inline(&mut self, runs: Vec<ContentNode>) -> Result<(), ContentError> {
        let (step, caret) = inline_insertion(&self.doc, self.selection.head, runs)?;
        self.dispatch(Transaction::new().step(step).select(Selection::caret(caret)))
    }

    /// Insert an image block after the top-level block holding the caret.
    pub fn insert_image(&mut self, src: &str, alt: Option<&str>) -> Result<(), ContentError> {
        let r = self.doc.resolve(self.selection.head)?;
        let (index, at) = if r.depth() == 0 {
            (r.index(0), r.pos())
        } else {
            let after = r.after(1).ok_or(ContentError::InvalidPath)?;
            (r.index(0) + 1, after)
        };

        let step = Step::ReplaceChildren {
            parent: vec![],
            from: index,
            to: index,
            nodes: vec![ContentNode::image(src, alt)],
        };
        self.dispatch(Transaction::new().step(step).select(Selection::caret(at + 1)))
    }
}

fn apply_steps(doc: &mut ContentNode, steps: &[Step]) -> Result<Vec<Step>, ContentError> {
    let mut inverse = Vec::with_capacity(steps.len());
    for step in steps {
        inverse.push(step.apply(doc)?);
    }
    inverse.reverse();
    Ok(inverse)
}

/// Build the step that puts `runs` at `pos`, and the caret offset right after them.
///
/// Inside a textblock the containing run is split and the block's runs are
/// rewritten with adjacent identical-markup runs merged. Between blocks the
/// runs are wrapped in a new paragraph.
fn inline_insertion(
    doc: &ContentNode,
    pos: usize,
    runs: Vec<ContentNode>,
) -> Result<(Step, usize), ContentError> {
    let inserted: usize = runs.iter().map(ContentNode::node_size).sum();
    let r = doc.resolve(pos)?;
    let depth = r.depth();
    let parent = r.parent();
    let index = r.index(depth);

    if parent.is_textblock() {
        let text_offset = r.text_offset();
        let mut children: Vec<ContentNode> = parent.content[..index].to_vec();
        let mut tail: Vec<ContentNode> = parent.content.get(index..).unwrap_or(&[]).to_vec();

        if text_offset > 0 && !tail.is_empty() {
            let (left, right) = split_text(&tail[0], text_offset);
            children.push(left);
            tail[0] = right;
        }
        children.extend(runs);
        children.extend(tail);

        let step = Step::ReplaceChildren {
            parent: r.path_to(depth),
            from: 0,
            to: parent.child_count(),
            nodes: merge_adjacent_text(children),
        };
        return Ok((step, pos + inserted));
    }

    // Lists only hold items, so the new paragraph gets an item of its own.
    let (node, opened) = match parent.kind {
        NodeKind::Doc | NodeKind::Blockquote | NodeKind::ListItem | NodeKind::TaskItem => {
            (ContentNode::paragraph(runs), 1)
        }
        NodeKind::BulletList | NodeKind::OrderedList => (
            ContentNode::with_content(NodeKind::ListItem, vec![ContentNode::paragraph(runs)]),
            2,
        ),
        NodeKind::TaskList => (
            ContentNode::with_content(NodeKind::TaskItem, vec![ContentNode::paragraph(runs)])
                .with_attr("checked", false),
            2,
        ),
        _ => return Err(ContentError::InvalidPath),
    };
    let step = Step::ReplaceChildren {
        parent: r.path_to(depth),
        from: index,
        to: index,
        nodes: vec![node],
    };
    Ok((step, pos + opened + inserted))
}

fn split_text(node: &ContentNode, offset_utf16: usize) -> (ContentNode, ContentNode) {
    let text = node.text_str();
    let at = utf16_to_byte_idx(text, offset_utf16);
    let mut left = node.clone();
    let mut right = node.clone();
    left.text = Some(text[..at].to_string());
    right.text = Some(text[at..].to_string());
    (left, right)
}

fn merge_adjacent_text(nodes: Vec<ContentNode>) -> Vec<ContentNode> {
    let mut out: Vec<ContentNode> = Vec::with_capacity(nodes.len());
    for node in nodes {
        if node.is_text() && node.text_str().is_empty() {
            continue;
        }
        if let Some(last) = out.last_mut() {
            if last.is_text() && node.is_text() && last.same_markup(&node) {
                let mut merged = last.text_str().to_string();
                merged.push_str(node.text_str());
                last.text = Some(merged);
                continue;
            }
        }
        out.push(node);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Mark;

    fn para(text: &str) -> ContentNode {
        ContentNode::paragraph(vec![ContentNode::text(text)])
    }

    #[test]
    fn test_insert_text_splits_and_merges() {
        let mut ed = EditorHandle::new(ContentNode::doc(vec![para("helo")]));
        ed.set_caret(4);
        ed.insert_text("l").expect("insert");
        assert_eq!(ed.doc(), &ContentNode::doc(vec![para("hello")]));
        assert_eq!(ed.selection(), Selection::caret(5));
    }

    #[test]
    fn test_insert_text_keeps_marked_runs_apart() {
        let bold = ContentNode::marked_text("B", vec![Mark::bold()]);
        let mut ed = EditorHandle::new(ContentNode::doc(vec![ContentNode::paragraph(vec![
            bold.clone(),
        ])]));
        ed.set_caret(2);
        ed.insert_text("x").expect("insert");
        assert_eq!(
            ed.doc().content[0].content,
            vec![bold, ContentNode::text("x")]
        );
    }

    #[test]
    fn test_insert_between_blocks_wraps_in_paragraph() {
        let mut ed = EditorHandle::new(ContentNode::doc(vec![
            ContentNode::new(NodeKind::HorizontalRule),
        ]));
        ed.set_caret(1);
        ed.insert_text("after").expect("insert");
        assert_eq!(ed.doc().content[1], para("after"));
        assert_eq!(ed.selection(), Selection::caret(7));
    }

    #[test]
    fn test_insert_between_list_items_adds_item() {
        let item = |text: &str| ContentNode::with_content(NodeKind::ListItem, vec![para(text)]);
        let mut ed = EditorHandle::new(ContentNode::doc(vec![ContentNode::with_content(
            NodeKind::BulletList,
            vec![item("a"), item("b")],
        )]));
        // Between the two items, directly inside the list.
        ed.set_caret(6);
        ed.insert_text("mid").expect("insert");

        let list = &ed.doc().content[0];
        assert_eq!(list.child_count(), 3);
        assert_eq!(list.content[1], item("mid"));
        assert_eq!(ed.selection(), Selection::caret(11));
        assert_eq!(ed.doc().validate(), Ok(()));
    }

    #[test]
    fn test_insert_between_task_items_adds_unchecked_item() {
        let task = |text: &str| {
            ContentNode::with_content(NodeKind::TaskItem, vec![para(text)])
                .with_attr("checked", true)
        };
        let mut ed = EditorHandle::new(ContentNode::doc(vec![ContentNode::with_content(
            NodeKind::TaskList,
            vec![task("a")],
        )]));
        ed.set_caret(6);
        ed.insert_text("next").expect("insert");

        let added = &ed.doc().content[0].content[1];
        assert_eq!(added.kind, NodeKind::TaskItem);
        assert_eq!(added.attrs.get("checked"), Some(&serde_json::Value::Bool(false)));
        assert_eq!(added.content[0], para("next"));
    }

    #[test]
    fn test_undo_redo_restore_doc_and_selection() {
        let original = ContentNode::doc(vec![para("ab")]);
        let mut ed = EditorHandle::new(original.clone());
        ed.set_caret(2);
        ed.insert_text("X").expect("insert");
        let edited = ed.doc().clone();

        assert!(ed.undo().expect("undo"));
        assert_eq!(ed.doc(), &original);
        assert_eq!(ed.selection(), Selection::caret(2));

        assert!(ed.redo().expect("redo"));
        assert_eq!(ed.doc(), &edited);
        assert!(!ed.can_redo());
    }

    #[test]
    fn test_failed_transaction_leaves_doc_untouched() {
        let original = ContentNode::doc(vec![para("a"), para("b")]);
        let mut ed = EditorHandle::new(original.clone());
        let tr = Transaction::new()
            .step(Step::ReplaceChildren {
                parent: vec![],
                from: 0,
                to: 1,
                nodes: vec![],
            })
            .step(Step::ReplaceChildren {
                parent: vec![9],
                from: 0,
                to: 0,
                nodes: vec![],
            });
        assert_eq!(ed.dispatch(tr), Err(ContentError::InvalidPath));
        assert_eq!(ed.doc(), &original);
        assert!(!ed.can_undo());
    }

    #[test]
    fn test_insert_image_after_current_block() {
        let mut ed = EditorHandle::new(ContentNode::doc(vec![para("a"), para("b")]));
        ed.set_caret(2);
        ed.insert_image("/media/x.png", Some("x")).expect("insert");
        assert_eq!(ed.doc().content[1].kind, NodeKind::Image);
        assert_eq!(ed.doc().content[1].attr_str("src"), Some("/media/x.png"));
        assert_eq!(ed.doc().content[2], para("b"));
        assert_eq!(ed.selection(), Selection::caret(4));
    }

    #[test]
    fn test_replace_doc_clears_history() {
        let mut ed = EditorHandle::new(ContentNode::empty_doc());
        ed.set_caret(1);
        ed.insert_text("x").expect("insert");
        ed.replace_doc(ContentNode::doc(vec![para("fresh")]));
        assert!(!ed.can_undo());
        assert_eq!(ed.selection(), Selection::caret(0));
    }
}
