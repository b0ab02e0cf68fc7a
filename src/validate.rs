use serde::Serialize;
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// INVARIANT CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const INV_NOT_AN_OBJECT: &str = "SIM001";
pub const INV_ALREADY_BOUND: &str = "SIM002";
pub const INV_TOP_LEVEL_NOT_FOUND: &str = "SIM003";
pub const INV_NOT_AN_ELEMENT: &str = "SIM004";
pub const INV_ELEMENT_NOT_FOUND: &str = "SIM005";
pub const INV_NOT_CONTAINED: &str = "SIM006";
pub const INV_OVERLAP: &str = "SIM007";
pub const INV_INVALID_SELECTOR: &str = "SIM008";
pub const INV_PARSE: &str = "SIM009";

// ═══════════════════════════════════════════════════════════════════════════════
// GUARANTEES
// ═══════════════════════════════════════════════════════════════════════════════

pub fn get_guarantee(code: &str) -> &'static str {
    match code {
        INV_NOT_AN_OBJECT => "Only singular objects are bound; arrays and scalars are rejected.",
        INV_ALREADY_BOUND => "A data object is bound at most once for its whole lifetime.",
        INV_TOP_LEVEL_NOT_FOUND => "The top-level node is resolved before any compilation.",
        INV_NOT_AN_ELEMENT => "Every key is bound to exactly one element.",
        INV_ELEMENT_NOT_FOUND => "Every selector resolves to a node at compile time.",
        INV_NOT_CONTAINED => {
            "A bound element is contained in, or equal to, the element of its parent binding."
        }
        INV_OVERLAP => "Sibling keys claim disjoint regions of the document.",
        INV_INVALID_SELECTOR => "Selectors are parsed before they are matched.",
        INV_PARSE => "Documents are parsed with HTML5 error recovery.",
        _ => "Unknown invariant.",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BIND ERROR
// ═══════════════════════════════════════════════════════════════════════════════

/// Which JS error class a failure corresponds to: a malformed call shape
/// (`TypeError`) or a document that does not satisfy the binding (`Error`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCategory {
    Type,
    Resolution,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("First argument must be a singular object.")]
    NotAnObject,

    #[error("Can not bind an object that is already bound.")]
    AlreadyBound,

    #[error("Top-level node \"{selector}\" could not be found in the document.")]
    TopLevelNotFound { selector: String },

    #[error("The first position on key \"{key}\" must be a DOM element or a CSS selector string.")]
    NotAnElement { key: String },

    #[error("The element for selector \"{selector}\" was not found.")]
    ElementNotFound { key: String, selector: String },

    #[error(
        "The bound DOM element for key \"{key}\" must be either contained in or equal to the element in its parent binding."
    )]
    NotContained { key: String },

    #[error("The element for key \"{key}\" is contained in the element for the adjacent key \"{adjacent}\".")]
    Overlap { key: String, adjacent: String },

    #[error("The element for key \"{key}\" is the same element as for the adjacent key \"{adjacent}\".")]
    SharedElement { key: String, adjacent: String },

    #[error("Invalid selector \"{selector}\": {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Failed to parse HTML: {0}")]
    Parse(String),
}

impl BindError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotAnObject => INV_NOT_AN_OBJECT,
            Self::AlreadyBound => INV_ALREADY_BOUND,
            Self::TopLevelNotFound { .. } => INV_TOP_LEVEL_NOT_FOUND,
            Self::NotAnElement { .. } => INV_NOT_AN_ELEMENT,
            Self::ElementNotFound { .. } => INV_ELEMENT_NOT_FOUND,
            Self::NotContained { .. } => INV_NOT_CONTAINED,
            Self::Overlap { .. } | Self::SharedElement { .. } => INV_OVERLAP,
            Self::InvalidSelector { .. } => INV_INVALID_SELECTOR,
            Self::Parse(_) => INV_PARSE,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotAnObject | Self::NotAnElement { .. } => ErrorCategory::Type,
            _ => ErrorCategory::Resolution,
        }
    }

    pub fn guarantee(&self) -> &'static str {
        get_guarantee(self.code())
    }

    /// The key in the definition tree the error is attached to, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::NotAnElement { key }
            | Self::ElementNotFound { key, .. }
            | Self::NotContained { key }
            | Self::Overlap { key, .. }
            | Self::SharedElement { key, .. } => Some(key),
            _ => None,
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            code: self.code().to_string(),
            category: self.category(),
            message: self.to_string(),
            guarantee: self.guarantee().to_string(),
            key: self.key().map(str::to_string),
        }
    }
}

/// Serializable form of a [`BindError`] for hosts that surface diagnostics
/// as JSON.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub code: String,
    pub category: ErrorCategory,
    pub message: String,
    pub guarantee: String,
    pub key: Option<String>,
}
