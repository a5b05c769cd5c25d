use super::ContentNode;
use crate::error::ContentError;

/// A flat document offset resolved against a tree.
///
/// Depth 0 is the root. For every depth `d` the resolved position records
/// the node at that depth, the index of the child the offset falls into,
/// and the offset where that node's content starts.
#[derive(Clone, Debug)]
pub struct ResolvedPos<'a> {
    pos: usize,
    nodes: Vec<&'a ContentNode>,
    indices: Vec<usize>,
    starts: Vec<usize>,
    parent_offset: usize,
    /// Offset of the indexed child inside the innermost parent's content.
    child_offset: usize,
}

impl ContentNode {
    /// Resolve `pos` (0 ..= content size) to its ancestor chain.
    pub fn resolve(&self, pos: usize) -> Result<ResolvedPos<'_>, ContentError> {
        let size = self.content_size();
        if pos > size {
            return Err(ContentError::PositionOutOfRange { pos, size });
        }

        let mut nodes = Vec::new();
        let mut indices = Vec::new();
        let mut starts = Vec::new();

        let mut node = self;
        let mut start = 0;
        let mut rem = pos;

        let child_offset = loop {
            let (index, offset) = find_index(node, rem);
            nodes.push(node);
            indices.push(index);
            starts.push(start);

            let inner = rem - offset;
            if inner == 0 {
                break offset;
            }
            let Some(child) = node.child(index) else {
                break offset;
            };
            if child.is_text() {
                break offset;
            }
            rem = inner - 1;
            start += offset + 1;
            node = child;
        };

        Ok(ResolvedPos {
            pos,
            nodes,
            indices,
            starts,
            parent_offset: rem,
            child_offset,
        })
    }
}

/// Child index containing `pos` (relative to `node`'s content start), and the
/// offset where that child begins. A position on a boundary maps to the child after it.
fn find_index(node: &ContentNode, pos: usize) -> (usize, usize) {
    if pos == 0 {
        return (0, 0);
    }
    let mut cur = 0;
    for (i, child) in node.content.iter().enumerate() {
        let end = cur + child.node_size();
        if end >= pos {
            if end == pos {
                return (i + 1, end);
            }
            return (i, cur);
        }
        cur = end;
    }
    (node.child_count(), cur)
}

impl<'a> ResolvedPos<'a> {
    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn depth(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn node(&self, depth: usize) -> &'a ContentNode {
        self.nodes[depth]
    }

    pub fn parent(&self) -> &'a ContentNode {
        self.node(self.depth())
    }

    pub fn index(&self, depth: usize) -> usize {
        self.indices[depth]
    }

    /// Offset where the content of the node at `depth` starts.
    pub fn start(&self, depth: usize) -> usize {
        self.starts[depth]
    }

    /// Offset directly before the node at `depth`. The root has none.
    pub fn before(&self, depth: usize) -> Option<usize> {
        if depth == 0 {
            None
        } else {
            Some(self.starts[depth] - 1)
        }
    }

    /// Offset directly after the node at `depth`.
    pub fn after(&self, depth: usize) -> Option<usize> {
        self.before(depth)
            .map(|before| before + self.node(depth).node_size())
    }

    pub fn parent_offset(&self) -> usize {
        self.parent_offset
    }

    /// How far into a text run the position falls (0 on a node boundary).
    pub fn text_offset(&self) -> usize {
        self.parent_offset - self.child_offset
    }

    /// The child starting at (or, inside text, containing) this position.
    pub fn node_after(&self) -> Option<&'a ContentNode> {
        self.parent().child(self.index(self.depth()))
    }

    /// Child-index path from the root down to the node at `depth`.
    pub fn path_to(&self, depth: usize) -> Vec<usize> {
        self.indices[..depth].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::NodeKind;

    // <doc> 0 <p> 1 a b 3 </p> 4 <hr> 5 <ul> 6 <li> 7 <p> 8 x 9 </p> 10 </li> 11 </ul> 12
    fn sample() -> ContentNode {
        ContentNode::doc(vec![
            ContentNode::paragraph(vec![ContentNode::text("ab")]),
            ContentNode::new(NodeKind::HorizontalRule),
            ContentNode::with_content(
                NodeKind::BulletList,
                vec![ContentNode::with_content(
                    NodeKind::ListItem,
                    vec![ContentNode::paragraph(vec![ContentNode::text("x")])],
                )],
            ),
        ])
    }

    #[test]
    fn test_resolve_inside_text() {
        let doc = sample();
        let r = doc.resolve(2).expect("in range");
        assert_eq!(r.depth(), 1);
        assert_eq!(r.parent().kind, NodeKind::Paragraph);
        assert_eq!(r.index(0), 0);
        assert_eq!(r.index(1), 0);
        assert_eq!(r.parent_offset(), 1);
        assert_eq!(r.text_offset(), 1);
        assert_eq!(r.before(1), Some(0));
        assert_eq!(r.after(1), Some(4));
        assert_eq!(r.start(1), 1);
    }

    #[test]
    fn test_resolve_block_boundaries() {
        let doc = sample();

        let r = doc.resolve(0).expect("in range");
        assert_eq!(r.depth(), 0);
        assert_eq!(r.index(0), 0);

        let r = doc.resolve(4).expect("in range");
        assert_eq!(r.depth(), 0);
        assert_eq!(r.index(0), 1);
        assert_eq!(r.node_after().map(|n| n.kind), Some(NodeKind::HorizontalRule));

        let r = doc.resolve(12).expect("end of doc");
        assert_eq!(r.depth(), 0);
        assert_eq!(r.index(0), 3);
        assert!(r.node_after().is_none());
    }

    #[test]
    fn test_resolve_nested_list() {
        let doc = sample();
        let r = doc.resolve(8).expect("in range");
        assert_eq!(r.depth(), 3);
        assert_eq!(r.node(1).kind, NodeKind::BulletList);
        assert_eq!(r.node(2).kind, NodeKind::ListItem);
        assert_eq!(r.parent().kind, NodeKind::Paragraph);
        assert_eq!(r.before(3), Some(7));
        assert_eq!(r.path_to(3), vec![2, 0, 0]);
    }

    #[test]
    fn test_resolve_out_of_range() {
        let doc = sample();
        assert_eq!(
            doc.resolve(13).unwrap_err(),
            ContentError::PositionOutOfRange { pos: 13, size: 12 }
        );
    }
}
