mod error;
mod validator;

pub use error::{SchemaError, SchemaViolation};

use std::collections::BTreeMap;

use serde::Deserialize;

const BUILTIN: &str = include_str!("report.toml");

/// Structural rules a serialized document must follow.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Schema {
    pub version: String,
    /// Name of the single root element.
    pub root: String,
    /// Attributes whose values must be unique across the document.
    #[serde(default)]
    pub unique: Vec<String>,
    pub elements: BTreeMap<String, ElementRule>,
}

/// Rules for one element type.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ElementRule {
    pub required: Vec<String>,
    pub optional: Vec<String>,
    /// Element names allowed as children. Empty means childless.
    pub children: Vec<String>,
    /// Whether non-whitespace text content is allowed.
    pub text: bool,
    pub min_children: usize,
    pub max_children: Option<usize>,
}

impl ElementRule {
    pub fn allows_attribute(&self, name: &str) -> bool {
        self.required.iter().chain(&self.optional).any(|a| a == name)
    }

    pub fn allows_child(&self, name: &str) -> bool {
        self.children.iter().any(|c| c == name)
    }
}

impl Schema {
    /// The schema for documents written by this crate's serializer.
    pub fn builtin() -> Self {
        Schema::from_toml(BUILTIN).expect("builtin report schema is well-formed")
    }

    /// Load a schema from TOML and check that it is self-consistent.
    pub fn from_toml(source: &str) -> Result<Self, SchemaError> {
        let schema: Schema = toml::from_str(source)?;
        schema.check()?;
        Ok(schema)
    }

    fn check(&self) -> Result<(), SchemaError> {
        if !self.elements.contains_key(&self.root) {
            return Err(SchemaError::UndeclaredRoot(self.root.clone()));
        }
        for (parent, rule) in &self.elements {
            if let Some(child) = rule
                .children
                .iter()
                .find(|child| !self.elements.contains_key(*child))
            {
                return Err(SchemaError::UndeclaredChild {
                    parent: parent.clone(),
                    child: child.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn element(&self, name: &str) -> Option<&ElementRule> {
        self.elements.get(name)
    }

    /// Validate a document, returning the first violation found.
    pub fn validate(&self, document: &str) -> Result<(), SchemaViolation> {
        validator::validate(self, document)
    }

    pub fn is_valid(&self, document: &str) -> bool {
        self.validate(document).is_ok()
    }
}

impl Default for Schema {
    fn default() -> Self {
        Schema::builtin()
    }
}
