use super::{EditorHandle, Selection, Step, Transaction};
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// Block moves only apply to a collapsed caret.
    SelectionNotCollapsed,
    /// The caret offset does not map into the current document.
    NoPosition,
    /// The caret sits directly in the root; there is no block to move.
    AtRoot,
    AlreadyFirst,
    AlreadyLast,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The block now starts at `to` instead of `from`.
    Moved { from: usize, to: usize },
    Skipped(SkipReason),
}

impl EditorHandle {
    pub fn move_block_up(&mut self) -> MoveOutcome {
        self.move_block(MoveDirection::Up)
    }

    pub fn move_block_down(&mut self) -> MoveOutcome {
        self.move_block(MoveDirection::Down)
    }

    /// Swap the block holding the caret with its neighbour in one transaction.
    ///
    /// Never surfaces an error: anything that prevents the move is reported as
    /// [`MoveOutcome::Skipped`] and the document is left as it was.
    pub fn move_block(&mut self, direction: MoveDirection) -> MoveOutcome {
        let outcome = self.try_move_block(direction);
        if let MoveOutcome::Skipped(reason) = outcome {
            debug!(?direction, ?reason, "block move skipped");
        }
        outcome
    }

    fn try_move_block(&mut self, direction: MoveDirection) -> MoveOutcome {
        let selection = self.selection;
        if !selection.is_collapsed() {
            return MoveOutcome::Skipped(SkipReason::SelectionNotCollapsed);
        }

        let Ok(r) = self.doc.resolve(selection.head) else {
            return MoveOutcome::Skipped(SkipReason::NoPosition);
        };

        let mut depth = r.depth();
        while depth > 0 && r.node(depth).is_inline() {
            depth -= 1;
        }
        if depth == 0 {
            return MoveOutcome::Skipped(SkipReason::AtRoot);
        }

        let Some(block_start) = r.before(depth) else {
            return MoveOutcome::Skipped(SkipReason::NoPosition);
        };
        let block = r.node(depth);
        let parent = r.node(depth - 1);
        let parent_path = r.path_to(depth - 1);
        let index = r.index(depth - 1);

        let (from, nodes, caret, to) = match direction {
            MoveDirection::Up => {
                if index == 0 {
                    return MoveOutcome::Skipped(SkipReason::AlreadyFirst);
                }
                let Some(prev) = parent.child(index - 1) else {
                    return MoveOutcome::Skipped(SkipReason::NoPosition);
                };
                let prev_size = prev.node_size();
                (
                    index - 1,
                    vec![block.clone(), prev.clone()],
                    selection.head - prev_size,
                    block_start - prev_size,
                )
            }
            MoveDirection::Down => {
                if index + 1 >= parent.child_count() {
                    return MoveOutcome::Skipped(SkipReason::AlreadyLast);
                }
                let Some(next) = parent.child(index + 1) else {
                    return MoveOutcome::Skipped(SkipReason::NoPosition);
                };
                let next_size = next.node_size();
                (
                    index,
                    vec![next.clone(), block.clone()],
                    selection.head + next_size,
                    block_start + next_size,
                )
            }
        };
        let tr = Transaction::new()
            .step(Step::ReplaceChildren {
                parent: parent_path,
                from,
                to: from + 2,
                nodes,
            })
            .select(Selection::caret(caret));

        match self.dispatch(tr) {
            Ok(()) => MoveOutcome::Moved {
                from: block_start,
                to,
            },
            Err(_) => MoveOutcome::Skipped(SkipReason::NoPosition),
        }
    }
}
