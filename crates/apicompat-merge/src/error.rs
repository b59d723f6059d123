//! Merge conflicts

/// Why a set of subschemas could not be collapsed into one
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    /// Declared types have no common value
    #[error("unable to resolve type conflict: all types must be equal or numeric, got {0:?}")]
    TypeConflict(Vec<String>),

    /// Declared formats have no common value
    #[error("unable to resolve format conflict: all formats must be equal or numeric, got {0:?}")]
    FormatConflict(Vec<String>),

    /// `enum`/`const` values have an empty intersection
    #[error("unable to resolve enum conflict: intersection of values is empty")]
    EmptyEnum,

    #[error("could not merge items: circular ref {0}")]
    CircularItems(String),

    #[error("could not merge property '{property}': circular ref {reference}")]
    CircularProperty { property: String, reference: String },

    /// A `oneOf`/`anyOf` branch or another keyword group hit a cycle
    #[error("could not merge {keyword}: circular ref {reference}")]
    CircularRef {
        keyword: &'static str,
        reference: String,
    },

    #[error("unresolved reference {0}")]
    UnresolvedRef(String),
}
