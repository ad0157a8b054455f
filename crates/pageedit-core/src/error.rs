use thiserror::Error;

/// Coarse classification used by callers to decide how to surface an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rejected user action; the session is unchanged.
    UserInput,
    /// The source document could not be opened or parsed.
    SourceFormat,
    /// Rendering or output assembly failed.
    Resource,
    /// A validated plan reached the rebuilder in a broken state. Always a defect.
    InternalInvariant,
    /// The engine was driven out of order, or a background result arrived late.
    Lifecycle,
    /// Engine configuration was rejected.
    Configuration,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditError {
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Invalid page order: {0}")]
    InvalidPermutation(String),

    #[error("Cannot remove the last remaining page")]
    CannotEmptyDocument,

    #[error("Page {index} is out of range (document has {page_count} pages)")]
    PageOutOfRange { index: usize, page_count: usize },

    #[error("Unknown paper size: {0}")]
    UnknownPaperSize(String),

    #[error("Failed to parse PDF: {0}")]
    SourceCorrupt(String),

    #[error("Failed to save PDF: {0}")]
    SerializationFailure(String),

    #[error("Render failed: {0}")]
    RenderFailure(String),

    #[error("Broken build plan: {0}")]
    BrokenPlan(String),

    #[error("Invalid engine state: {0}")]
    InvalidState(String),

    #[error("Result belongs to session {actual}, current session is {expected}")]
    Stale { expected: u64, actual: u64 },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl EditError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EditError::InvalidSelection(_)
            | EditError::InvalidPermutation(_)
            | EditError::CannotEmptyDocument
            | EditError::PageOutOfRange { .. }
            | EditError::UnknownPaperSize(_) => ErrorCategory::UserInput,
            EditError::SourceCorrupt(_) => ErrorCategory::SourceFormat,
            EditError::SerializationFailure(_) | EditError::RenderFailure(_) => {
                ErrorCategory::Resource
            }
            EditError::BrokenPlan(_) => ErrorCategory::InternalInvariant,
            EditError::InvalidState(_) | EditError::Stale { .. } => ErrorCategory::Lifecycle,
            EditError::Config(_) => ErrorCategory::Configuration,
        }
    }

    /// Everything except an invariant breach can be retried or surfaced to the user.
    pub fn is_recoverable(&self) -> bool {
        self.category() != ErrorCategory::InternalInvariant
    }
}

pub type Result<T> = std::result::Result<T, EditError>;
