mod writer;

pub use writer::serialize;

use std::fmt;
use std::string::FromUtf8Error;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Version of the document format written by [`serialize`].
pub const FORMAT_VERSION: &str = "1";

pub const ROOT_ELEMENT: &str = "Report";
pub const GROUP_ELEMENT: &str = "Group";

/// How payloads are carried by the compiled document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Every payload is written into the document.
    Embedded,
    /// Externalizable payloads are moved to the attachment list.
    #[default]
    Attached,
}

impl OutputMode {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputMode::Embedded => "embedded",
            OutputMode::Attached => "attached",
        }
    }
}

/// Caller-supplied metadata placed on the root element.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DocumentMeta {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub mode: OutputMode,
}

impl DocumentMeta {
    pub fn new(mode: OutputMode) -> Self {
        DocumentMeta {
            mode,
            ..DocumentMeta::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A serialized document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    xml: String,
}

impl Document {
    pub fn as_str(&self) -> &str {
        &self.xml
    }

    pub fn into_string(self) -> String {
        self.xml
    }

    pub fn len(&self) -> usize {
        self.xml.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xml.is_empty()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.xml)
    }
}

#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("failed to write document: {0}")]
    Write(String),
    #[error("document is not valid UTF-8")]
    Utf8(#[from] FromUtf8Error),
}
