use super::{merge_adjacent_text, split_text, EditorHandle, Selection, Step, Transaction};
use crate::content::{utf16_to_byte_idx, ContentNode, Mark, MarkKind, NodeKind};
use crate::error::ContentError;
use serde_json::{Map, Value};
use tracing::debug;

impl EditorHandle {
    /// Add `kind` to every run in the selection, or remove it when all of
    /// them already carry it. Returns whether the document changed.
    ///
    /// Link marks need attributes, so a link can only be removed this way.
    pub fn toggle_mark(&mut self, kind: MarkKind) -> Result<bool, ContentError> {
        let selection = self.selection;
        if selection.is_collapsed() {
            return Ok(false);
        }
        let (from, to) = (selection.from(), selection.to());

        let mut blocks = Vec::new();
        collect_textblocks(&self.doc, 0, &mut Vec::new(), from, to, &mut blocks);

        let mut has_mark = Vec::new();
        for (path, start) in &blocks {
            let block = self.doc.node_at(path).ok_or(ContentError::InvalidPath)?;
            has_mark.extend(
                runs_between(block, *start, from, to)
                    .map(|run| run.marks.iter().any(|m| m.kind == kind)),
            );
        }
        if has_mark.is_empty() {
            return Ok(false);
        }
        let adding = !has_mark.iter().all(|&marked| marked);
        if adding && kind == MarkKind::Link {
            debug!("link marks cannot be added without attributes");
            return Ok(false);
        }

        let mut tr = Transaction::new();
        for (path, start) in blocks {
            let block = self.doc.node_at(&path).ok_or(ContentError::InvalidPath)?;
            let nodes = map_runs_between(block, start, from, to, |mut run| {
                if run.is_text() {
                    run.marks.retain(|m| m.kind != kind);
                    if adding {
                        run.marks.push(Mark::new(kind));
                        run.marks.sort_by_key(|m| m.kind as u8);
                    }
                }
                Some(run)
            });
            tr = tr.step(Step::ReplaceChildren {
                parent: path,
                from: 0,
                to: block.child_count(),
                nodes,
            });
        }
        self.dispatch(tr.select(selection))?;
        Ok(true)
    }

    /// Turn the textblock holding the caret into `kind` (paragraph, heading or
    /// code block), keeping its text. Code blocks drop marks and hard breaks
    /// become newlines, so every offset stays where it was.
    pub fn set_block_type(
        &mut self,
        kind: NodeKind,
        attrs: Map<String, Value>,
    ) -> Result<bool, ContentError> {
        if !kind.is_textblock() {
            return Err(ContentError::UnsupportedKind(kind));
        }
        if kind == NodeKind::Heading {
            let level = attrs.get("level").and_then(Value::as_i64).unwrap_or(0);
            if !(1..=6).contains(&level) {
                return Err(ContentError::InvalidLevel(level));
            }
        }

        let r = self.doc.resolve(self.selection.head)?;
        let depth = r.depth();
        let block = r.parent();
        if depth == 0 || !block.is_textblock() {
            return Ok(false);
        }

        let content = if kind == NodeKind::CodeBlock {
            merge_adjacent_text(block.content.iter().map(as_code).collect())
        } else {
            block.content.clone()
        };
        let converted = ContentNode {
            attrs,
            ..ContentNode::with_content(kind, content)
        };
        if &converted == block {
            return Ok(false);
        }

        let index = r.index(depth - 1);
        let step = Step::ReplaceChildren {
            parent: r.path_to(depth - 1),
            from: index,
            to: index + 1,
            nodes: vec![converted],
        };
        self.dispatch(Transaction::new().step(step))?;
        Ok(true)
    }

    /// Wrap the textblock holding the caret in a list (with one item) or a
    /// blockquote. Already wrapped the same way is a no-op.
    pub fn wrap_in(&mut self, kind: NodeKind) -> Result<bool, ContentError> {
        let item_kind = match kind {
            NodeKind::BulletList | NodeKind::OrderedList => Some(NodeKind::ListItem),
            NodeKind::TaskList => Some(NodeKind::TaskItem),
            NodeKind::Blockquote => None,
            _ => return Err(ContentError::UnsupportedKind(kind)),
        };

        let head = self.selection.head;
        let r = self.doc.resolve(head)?;
        let depth = r.depth();
        let block = r.parent();
        if depth == 0 || !block.is_textblock() {
            return Ok(false);
        }

        let already = match item_kind {
            Some(item) => {
                depth >= 2 && r.node(depth - 1).kind == item && r.node(depth - 2).kind == kind
            }
            None => r.node(depth - 1).kind == kind,
        };
        if already {
            debug!(%kind, "block already wrapped");
            return Ok(false);
        }

        let (wrapped, opened) = match item_kind {
            Some(item) => {
                let mut item = ContentNode::with_content(item, vec![block.clone()]);
                if kind == NodeKind::TaskList {
                    item = item.with_attr("checked", false);
                }
                (ContentNode::with_content(kind, vec![item]), 2)
            }
            None => (ContentNode::with_content(kind, vec![block.clone()]), 1),
        };

        let index = r.index(depth - 1);
        let step = Step::ReplaceChildren {
            parent: r.path_to(depth - 1),
            from: index,
            to: index + 1,
            nodes: vec![wrapped],
        };
        self.dispatch(
            Transaction::new()
                .step(step)
                .select(Selection::caret(head + opened)),
        )?;
        Ok(true)
    }

    /// Backspace: delete the selection, or the character before the caret.
    /// At the start of a textblock the block is joined onto a preceding
    /// textblock sibling.
    pub fn delete_backward(&mut self) -> Result<bool, ContentError> {
        let selection = self.selection;
        if !selection.is_collapsed() {
            return self.delete_range(selection.from(), selection.to());
        }

        let head = selection.head;
        let r = self.doc.resolve(head)?;
        let depth = r.depth();
        let block = r.parent();
        if depth == 0 || !block.is_textblock() {
            return Ok(false);
        }

        if r.parent_offset() > 0 {
            let index = r.index(depth);
            let width = if r.text_offset() > 0 {
                let run = r.node_after().ok_or(ContentError::InvalidPath)?;
                let text = run.text_str();
                let at = utf16_to_byte_idx(text, r.text_offset());
                text[..at].chars().next_back().map_or(1, char::len_utf16)
            } else {
                match block.child(index.wrapping_sub(1)) {
                    Some(prev) if prev.is_text() => {
                        prev.text_str().chars().next_back().map_or(1, char::len_utf16)
                    }
                    _ => 1,
                }
            };
            return self.delete_range(head - width, head);
        }

        let index = r.index(depth - 1);
        let Some(prev) = index
            .checked_sub(1)
            .and_then(|i| r.node(depth - 1).child(i))
        else {
            return Ok(false);
        };
        if !prev.is_textblock() {
            return Ok(false);
        }

        let mut joined = prev.clone();
        joined.content.extend(block.content.iter().cloned());
        joined.content = merge_adjacent_text(joined.content);
        let step = Step::ReplaceChildren {
            parent: r.path_to(depth - 1),
            from: index - 1,
            to: index + 1,
            nodes: vec![joined],
        };
        // The closing token of `prev` and the opening token of the block go away.
        self.dispatch(
            Transaction::new()
                .step(step)
                .select(Selection::caret(head - 2)),
        )?;
        Ok(true)
    }

    /// Remove the inline content between `from` and `to`, which must lie in
    /// the same textblock. The caret ends up at the start of the range.
    pub fn delete_range(&mut self, from: usize, to: usize) -> Result<bool, ContentError> {
        let (from, to) = (from.min(to), from.max(to));
        if from == to {
            return Ok(false);
        }

        let rf = self.doc.resolve(from)?;
        let rt = self.doc.resolve(to)?;
        let depth = rf.depth();
        let block = rf.parent();
        if !block.is_textblock()
            || rt.depth() != depth
            || rt.path_to(depth) != rf.path_to(depth)
            || rt.start(depth) != rf.start(depth)
        {
            return Err(ContentError::RangeSpansBlocks { from, to });
        }

        let nodes = map_runs_between(block, rf.start(depth), from, to, |_| None);
        let step = Step::ReplaceChildren {
            parent: rf.path_to(depth),
            from: 0,
            to: block.child_count(),
            nodes,
        };
        self.dispatch(Transaction::new().step(step).select(Selection::caret(from)))?;
        Ok(true)
    }
}

/// Every textblock whose content overlaps `from..to`, with its path and the
/// offset where its content starts.
fn collect_textblocks(
    node: &ContentNode,
    start: usize,
    path: &mut Vec<usize>,
    from: usize,
    to: usize,
    out: &mut Vec<(Vec<usize>, usize)>,
) {
    let mut pos = start;
    for (i, child) in node.content.iter().enumerate() {
        let end = pos + child.node_size();
        if end > from && pos < to && !child.is_leaf() {
            path.push(i);
            if child.is_textblock() {
                out.push((path.clone(), pos + 1));
            } else {
                collect_textblocks(child, pos + 1, path, from, to, out);
            }
            path.pop();
        }
        pos = end;
    }
}

/// Text runs of `block` (content starting at `start`) that overlap `from..to`.
fn runs_between(
    block: &ContentNode,
    start: usize,
    from: usize,
    to: usize,
) -> impl Iterator<Item = &ContentNode> {
    let mut pos = start;
    block.content.iter().filter(move |child| {
        let lo = pos;
        pos += child.node_size();
        child.is_text() && from.max(lo) < to.min(pos)
    })
}

/// Rebuild `block`'s children, passing the part of each child that falls in
/// `from..to` through `f`. Runs cut by a bound are split first; a `None` from
/// `f` drops that part.
fn map_runs_between(
    block: &ContentNode,
    start: usize,
    from: usize,
    to: usize,
    mut f: impl FnMut(ContentNode) -> Option<ContentNode>,
) -> Vec<ContentNode> {
    let mut out = Vec::with_capacity(block.child_count() + 2);
    let mut pos = start;
    for child in &block.content {
        let end = pos + child.node_size();
        let (lo, hi) = (from.max(pos), to.min(end));
        if lo >= hi {
            out.push(child.clone());
        } else if child.is_text() {
            let (left, rest) = split_text(child, lo - pos);
            let (mid, right) = split_text(&rest, hi - lo);
            out.push(left);
            out.extend(f(mid));
            out.push(right);
        } else {
            out.extend(f(child.clone()));
        }
        pos = end;
    }
    merge_adjacent_text(out)
}

fn as_code(node: &ContentNode) -> ContentNode {
    if node.kind == NodeKind::HardBreak {
        return ContentNode::text("\n");
    }
    let mut plain = node.clone();
    plain.marks.clear();
    plain
}

#[cfg(test)]
mod tests {
    use super::*;

    fn para(text: &str) -> ContentNode {
        ContentNode::paragraph(vec![ContentNode::text(text)])
    }

    fn bold(text: &str) -> ContentNode {
        ContentNode::marked_text(text, vec![Mark::bold()])
    }

    fn editor(blocks: Vec<ContentNode>) -> EditorHandle {
        EditorHandle::new(ContentNode::doc(blocks))
    }

    #[test]
    fn test_toggle_mark_splits_runs_at_selection() {
        let mut ed = editor(vec![para("hello")]);
        ed.set_selection(Selection { anchor: 5, head: 2 });
        assert_eq!(ed.toggle_mark(MarkKind::Bold), Ok(true));
        assert_eq!(
            ed.doc().content[0].content,
            vec![ContentNode::text("h"), bold("ell"), ContentNode::text("o")]
        );
        assert_eq!(ed.selection(), Selection { anchor: 5, head: 2 });

        // Everything selected is bold now, so the same toggle removes it.
        assert_eq!(ed.toggle_mark(MarkKind::Bold), Ok(true));
        assert_eq!(ed.doc(), &ContentNode::doc(vec![para("hello")]));
    }

    #[test]
    fn test_toggle_mark_across_blocks_is_one_undo_step() {
        let original = ContentNode::doc(vec![para("ab"), para("cd")]);
        let mut ed = EditorHandle::new(original.clone());
        ed.set_selection(Selection { anchor: 2, head: 6 });
        assert_eq!(ed.toggle_mark(MarkKind::Italic), Ok(true));

        let italic = |t: &str| ContentNode::marked_text(t, vec![Mark::new(MarkKind::Italic)]);
        assert_eq!(
            ed.doc().content[0].content,
            vec![ContentNode::text("a"), italic("b")]
        );
        assert_eq!(
            ed.doc().content[1].content,
            vec![italic("c"), ContentNode::text("d")]
        );

        assert!(ed.undo().expect("undo"));
        assert_eq!(ed.doc(), &original);
    }

    #[test]
    fn test_toggle_mark_adds_when_partially_marked() {
        let mut ed = editor(vec![ContentNode::paragraph(vec![
            bold("ab"),
            ContentNode::text("cd"),
        ])]);
        ed.set_selection(Selection { anchor: 1, head: 5 });
        assert_eq!(ed.toggle_mark(MarkKind::Bold), Ok(true));
        assert_eq!(ed.doc().content[0].content, vec![bold("abcd")]);
    }

    #[test]
    fn test_toggle_mark_with_collapsed_caret_is_noop() {
        let mut ed = editor(vec![para("abc")]);
        ed.set_caret(2);
        assert_eq!(ed.toggle_mark(MarkKind::Bold), Ok(false));
        assert!(!ed.can_undo());
    }

    #[test]
    fn test_set_block_type_to_heading_and_code() {
        let mut ed = editor(vec![ContentNode::paragraph(vec![
            bold("a"),
            ContentNode::new(NodeKind::HardBreak),
            ContentNode::text("b"),
        ])]);
        ed.set_caret(1);

        let mut attrs = Map::new();
        attrs.insert("level".to_string(), Value::from(2));
        assert_eq!(ed.set_block_type(NodeKind::Heading, attrs), Ok(true));
        assert_eq!(ed.doc().content[0].kind, NodeKind::Heading);
        assert_eq!(ed.doc().content[0].attr_i64("level"), Some(2));
        assert_eq!(ed.doc().content[0].content[0], bold("a"));

        assert_eq!(ed.set_block_type(NodeKind::CodeBlock, Map::new()), Ok(true));
        let code = &ed.doc().content[0];
        assert_eq!(code.kind, NodeKind::CodeBlock);
        assert_eq!(code.content, vec![ContentNode::text("a\nb")]);
        assert_eq!(code.node_size(), 5);
        assert_eq!(ed.selection(), Selection::caret(1));
    }

    #[test]
    fn test_set_block_type_rejects_bad_targets() {
        let mut ed = editor(vec![para("a")]);
        ed.set_caret(1);
        assert_eq!(
            ed.set_block_type(NodeKind::BulletList, Map::new()),
            Err(ContentError::UnsupportedKind(NodeKind::BulletList))
        );
        assert_eq!(
            ed.set_block_type(NodeKind::Heading, Map::new()),
            Err(ContentError::InvalidLevel(0))
        );
        assert_eq!(ed.set_block_type(NodeKind::Paragraph, Map::new()), Ok(false));
    }

    #[test]
    fn test_wrap_in_list_and_quote() {
        let mut ed = editor(vec![para("a"), para("b")]);
        ed.set_caret(4);
        assert_eq!(ed.wrap_in(NodeKind::BulletList), Ok(true));
        assert_eq!(
            ed.doc().content[1],
            ContentNode::with_content(
                NodeKind::BulletList,
                vec![ContentNode::with_content(NodeKind::ListItem, vec![para("b")])]
            )
        );
        assert_eq!(ed.selection(), Selection::caret(6));
        assert_eq!(ed.wrap_in(NodeKind::BulletList), Ok(false));

        ed.set_caret(1);
        assert_eq!(ed.wrap_in(NodeKind::Blockquote), Ok(true));
        assert_eq!(ed.doc().content[0].kind, NodeKind::Blockquote);
        assert_eq!(ed.doc().content[0].content[0], para("a"));
        assert_eq!(ed.selection(), Selection::caret(2));

        assert_eq!(
            ed.wrap_in(NodeKind::Heading),
            Err(ContentError::UnsupportedKind(NodeKind::Heading))
        );
    }

    #[test]
    fn test_wrap_in_task_list_adds_unchecked_item() {
        let mut ed = editor(vec![para("todo")]);
        ed.set_caret(3);
        assert_eq!(ed.wrap_in(NodeKind::TaskList), Ok(true));
        let item = &ed.doc().content[0].content[0];
        assert_eq!(item.kind, NodeKind::TaskItem);
        assert_eq!(item.attrs.get("checked"), Some(&Value::Bool(false)));
        assert_eq!(ed.selection(), Selection::caret(5));
    }

    #[test]
    fn test_delete_backward_removes_whole_character() {
        let mut ed = editor(vec![para("a📄")]);
        ed.set_caret(4);
        assert_eq!(ed.delete_backward(), Ok(true));
        assert_eq!(ed.doc(), &ContentNode::doc(vec![para("a")]));
        assert_eq!(ed.selection(), Selection::caret(2));
    }

    #[test]
    fn test_delete_backward_across_run_boundary() {
        let mut ed = editor(vec![ContentNode::paragraph(vec![
            bold("ab"),
            ContentNode::text("c"),
        ])]);
        ed.set_caret(3);
        assert_eq!(ed.delete_backward(), Ok(true));
        assert_eq!(
            ed.doc().content[0].content,
            vec![bold("a"), ContentNode::text("c")]
        );
    }

    #[test]
    fn test_delete_backward_joins_with_previous_textblock() {
        let mut ed = editor(vec![para("ab"), para("cd")]);
        ed.set_caret(5);
        assert_eq!(ed.delete_backward(), Ok(true));
        assert_eq!(ed.doc(), &ContentNode::doc(vec![para("abcd")]));
        assert_eq!(ed.selection(), Selection::caret(3));

        // Nothing before the first block.
        ed.set_caret(1);
        assert_eq!(ed.delete_backward(), Ok(false));
    }

    #[test]
    fn test_delete_backward_after_rule_does_not_join() {
        let mut ed = editor(vec![ContentNode::new(NodeKind::HorizontalRule), para("a")]);
        ed.set_caret(2);
        assert_eq!(ed.delete_backward(), Ok(false));
        assert_eq!(ed.doc().child_count(), 2);
    }

    #[test]
    fn test_delete_range_within_block() {
        let mut ed = editor(vec![ContentNode::paragraph(vec![
            ContentNode::text("ab"),
            ContentNode::new(NodeKind::HardBreak),
            ContentNode::text("cd"),
        ])]);
        assert_eq!(ed.delete_range(5, 2), Ok(true));
        assert_eq!(ed.doc(), &ContentNode::doc(vec![para("ad")]));
        assert_eq!(ed.selection(), Selection::caret(2));
        assert_eq!(ed.delete_range(2, 2), Ok(false));
    }

    #[test]
    fn test_delete_range_across_blocks_is_rejected() {
        let original = ContentNode::doc(vec![para("ab"), para("cd")]);
        let mut ed = EditorHandle::new(original.clone());
        assert_eq!(
            ed.delete_range(2, 6),
            Err(ContentError::RangeSpansBlocks { from: 2, to: 6 })
        );
        assert_eq!(ed.doc(), &original);
    }
}
