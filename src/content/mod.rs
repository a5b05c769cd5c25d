//! Rich-text document body: a tree of typed nodes plus offset resolution.

mod node;
mod position;

pub use node::{ContentNode, Mark, MarkKind, NodeKind};
pub(crate) use node::utf16_to_byte_idx;
pub use position::ResolvedPos;
