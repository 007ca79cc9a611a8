//! Pattern AST node types for bindings

use super::*;

/// A binding pattern: function parameters and for-of loop bindings
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Simple identifier binding
    Identifier(Identifier),
    /// Array destructuring of identifiers, e.g. `[k, v]`
    Array(Vec<Identifier>),
    /// Rest parameter, e.g. `...args` (function parameters only, last position)
    Rest(Identifier),
}

impl Pattern {
    /// Get the span of this pattern
    pub fn span(&self) -> Span {
        match self {
            Pattern::Identifier(id) => id.span,
            Pattern::Array(ids) => ids
                .first()
                .map(|id| id.span)
                .unwrap_or_default(),
            Pattern::Rest(id) => id.span,
        }
    }
}
