use super::EditorHandle;
use crate::content::{ContentNode, Mark};
use crate::error::ContentError;
use crate::models::DocumentRef;

pub const CHILD_LINK_PREFIX: &str = "#doc-";
pub const CHILD_LINK_CLASS: &str = "child-document-link";
pub const DEFAULT_DOCUMENT_ICON: &str = "📄";

pub fn child_link_href(document_id: &str) -> String {
    format!("{CHILD_LINK_PREFIX}{document_id}")
}

/// `"<icon> <title>"`, falling back to the generic document glyph.
pub fn child_link_label(document: &DocumentRef) -> String {
    let icon = document
        .icon
        .as_deref()
        .filter(|i| !i.trim().is_empty())
        .unwrap_or(DEFAULT_DOCUMENT_ICON);
    format!("{icon} {}", document.title)
}

/// The linked run plus a trailing unmarked space, so typing after the link
/// does not continue the link formatting.
pub fn child_link_runs(document: &DocumentRef) -> Vec<ContentNode> {
    vec![
        ContentNode::marked_text(
            child_link_label(document),
            vec![
                Mark::link(&child_link_href(&document.id), "_self", CHILD_LINK_CLASS),
                Mark::bold(),
            ],
        ),
        ContentNode::text(" "),
    ]
}

/// Document id a clicked anchor points at, if it is a child-document link.
pub fn child_link_target<'a>(href: &'a str, class_list: &str) -> Option<&'a str> {
    if !class_list
        .split_whitespace()
        .any(|c| c == CHILD_LINK_CLASS)
    {
        return None;
    }
    href.strip_prefix(CHILD_LINK_PREFIX)
        .filter(|id| !id.is_empty())
}

impl EditorHandle {
    /// Insert a link to `document` at the caret. Surrounding content is kept as is.
    pub fn insert_child_link(&mut self, document: &DocumentRef) -> Result<(), ContentError> {
        self.insert_inline(child_link_runs(document))
    }
}
