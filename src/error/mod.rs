use thiserror::Error;

use crate::content::NodeKind;

/// Structural problems in a content tree or in an offset/range addressed into one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContentError {
    #[error("malformed content JSON: {0}")]
    InvalidShape(String),

    #[error("root node must be `doc`, got `{0}`")]
    RootNotDoc(NodeKind),

    #[error("text node must carry non-empty text")]
    EmptyText,

    #[error("text node cannot have child content")]
    TextWithChildren,

    /// `text`/`marks` are only meaningful on text nodes.
    #[error("`{0}` node cannot carry text or marks")]
    InlineFieldsOnBlock(NodeKind),

    #[error("heading level {0} is outside 1..=6")]
    InvalidLevel(i64),

    #[error("position {pos} is outside the document (content size {size})")]
    PositionOutOfRange { pos: usize, size: usize },

    #[error("node path does not address a node")]
    InvalidPath,

    #[error("child range {from}..{to} is invalid for a node with {len} children")]
    InvalidRange { from: usize, to: usize, len: usize },

    #[error("`{0}` is not a valid target for this command")]
    UnsupportedKind(NodeKind),

    #[error("range {from}..{to} spans more than one textblock")]
    RangeSpansBlocks { from: usize, to: usize },
}

/// Application level error taxonomy.
///
/// Every failure degrades to a redirect, an inline message, or a log line;
/// see [`AppError::disposition`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("document not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("{context} ({status}): {body}")]
    Http {
        status: u16,
        body: String,
        context: String,
    },

    #[error("unexpected response: {0}")]
    Parse(String),

    #[error(transparent)]
    Content(#[from] ContentError),
}

pub type AppResult<T> = Result<T, AppError>;

/// How the UI reacts to an [`AppError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorDisposition {
    RedirectToSignIn,
    RedirectToListing,
    Inline(String),
    LogOnly,
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn disposition(&self) -> ErrorDisposition {
        match self {
            AppError::Unauthorized => ErrorDisposition::RedirectToSignIn,
            AppError::NotFound(_) => ErrorDisposition::RedirectToListing,
            AppError::Validation(message) => ErrorDisposition::Inline(message.clone()),
            AppError::Network(_)
            | AppError::Http { .. }
            | AppError::Parse(_)
            | AppError::Content(_) => ErrorDisposition::LogOnly,
        }
    }

    /// Failed fetches that a later user action may succeed at.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Network(_) | AppError::Http { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disposition_follows_error_taxonomy() {
        assert_eq!(
            AppError::Unauthorized.disposition(),
            ErrorDisposition::RedirectToSignIn
        );
        assert_eq!(
            AppError::NotFound("d1".into()).disposition(),
            ErrorDisposition::RedirectToListing
        );
        assert_eq!(
            AppError::validation("File too large").disposition(),
            ErrorDisposition::Inline("File too large".into())
        );
        assert_eq!(
            AppError::Network("offline".into()).disposition(),
            ErrorDisposition::LogOnly
        );
    }

    #[test]
    fn test_content_error_converts_and_is_not_transient() {
        let e: AppError = ContentError::EmptyText.into();
        assert!(matches!(e, AppError::Content(ContentError::EmptyText)));
        assert!(!e.is_transient());
        assert!(AppError::Network("x".into()).is_transient());
    }

    #[test]
    fn test_http_error_message_includes_context() {
        let e = AppError::Http {
            status: 500,
            body: "boom".into(),
            context: "Update document".into(),
        };
        assert_eq!(e.to_string(), "Update document (500): boom");
    }
}
