use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label};
use thiserror::Error;

/// A schema that cannot be used for validation.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to parse schema: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("root element <{0}> is not declared")]
    UndeclaredRoot(String),
    #[error("element <{parent}> allows undeclared child <{child}>")]
    UndeclaredChild { parent: String, child: String },
}

/// The first place a document departs from its schema.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct SchemaViolation {
    pub message: String,
    /// Element the violation was found on, if any.
    pub element: Option<String>,
    /// Byte span in the validated document.
    pub span: Range<usize>,
    pub notes: Vec<String>,
}

impl SchemaViolation {
    pub fn new(message: impl Into<String>, span: Range<usize>) -> Self {
        SchemaViolation {
            message: message.into(),
            element: None,
            span,
            notes: Vec::new(),
        }
    }

    pub fn on_element(mut self, element: impl Into<String>) -> Self {
        self.element = Some(element.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Convert to a codespan-reporting Diagnostic over the validated document.
    pub fn to_diagnostic(&self, file_id: usize) -> Diagnostic<usize> {
        Diagnostic::error()
            .with_message(&self.message)
            .with_labels(vec![Label::primary(file_id, self.span.clone())])
            .with_notes(self.notes.clone())
    }
}
