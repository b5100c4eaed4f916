use std::fmt;

use serde::{Deserialize, Serialize};

use crate::block::reference::AttachmentRef;

/// Type tag of a leaf. Attachment policies select leaves by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LeafKind {
    TextMarkup,
    RawMarkup,
    NumericHighlight,
    MediaFile,
    Chart,
    TabularDataSmall,
    TabularDataLarge,
    StructuredFile,
}

impl LeafKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LeafKind::TextMarkup => "text-markup",
            LeafKind::RawMarkup => "raw-markup",
            LeafKind::NumericHighlight => "numeric-highlight",
            LeafKind::MediaFile => "media-file",
            LeafKind::Chart => "chart",
            LeafKind::TabularDataSmall => "tabular-data-small",
            LeafKind::TabularDataLarge => "tabular-data-large",
            LeafKind::StructuredFile => "structured-file",
        }
    }
}

impl fmt::Display for LeafKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The body of a leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Textual body, written as escaped element text.
    Text(String),
    /// Raw bytes, written as a data URI unless externalized.
    Bytes(Vec<u8>),
    /// Body moved to the attachment list.
    Attached(AttachmentRef),
}

impl Payload {
    /// Size of the inline body in bytes. Attached payloads have no inline size.
    pub fn len(&self) -> usize {
        match self {
            Payload::Text(text) => text.len(),
            Payload::Bytes(bytes) => bytes.len(),
            Payload::Attached(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_attached(&self) -> bool {
        matches!(self, Payload::Attached(_))
    }

    /// Raw bytes of an inline body, `None` once attached.
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Payload::Text(text) => Some(text.into_bytes()),
            Payload::Bytes(bytes) => Some(bytes),
            Payload::Attached(_) => None,
        }
    }
}

/// A headline number with an optional change indicator.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BigNumber {
    pub heading: String,
    pub value: String,
    pub change: Option<String>,
    pub prev_value: Option<String>,
    pub is_upward_change: Option<bool>,
    pub is_positive_intent: Option<bool>,
}

/// Typed content of a leaf. The variant decides the element written for it.
#[derive(Debug, Clone, PartialEq)]
pub enum LeafContent {
    Markdown {
        text: Payload,
    },
    Code {
        language: String,
        code: Payload,
    },
    Html {
        html: Payload,
    },
    BigNumber(BigNumber),
    Media {
        name: Option<String>,
        mime: String,
        caption: Option<String>,
        data: Payload,
    },
    /// A chart, carried as its JSON specification.
    Plot {
        caption: Option<String>,
        responsive: bool,
        spec: Payload,
    },
    File {
        name: String,
        mime: String,
        data: Payload,
    },
    /// A small table, carried as rendered HTML.
    Table {
        caption: Option<String>,
        html: Payload,
    },
    /// A large table, carried as CSV.
    DataTable {
        caption: Option<String>,
        can_pivot: bool,
        data: Payload,
    },
}

pub const PLOT_MIME: &str = "application/vnd.vegalite+json";
pub const DATA_TABLE_MIME: &str = "text/csv";

impl LeafContent {
    pub fn kind(&self) -> LeafKind {
        match self {
            LeafContent::Markdown { .. } | LeafContent::Code { .. } => LeafKind::TextMarkup,
            LeafContent::Html { .. } => LeafKind::RawMarkup,
            LeafContent::BigNumber(_) => LeafKind::NumericHighlight,
            LeafContent::Media { .. } => LeafKind::MediaFile,
            LeafContent::Plot { .. } => LeafKind::Chart,
            LeafContent::File { .. } => LeafKind::StructuredFile,
            LeafContent::Table { .. } => LeafKind::TabularDataSmall,
            LeafContent::DataTable { .. } => LeafKind::TabularDataLarge,
        }
    }

    /// Element name used in the serialized document.
    pub fn element_name(&self) -> &'static str {
        match self {
            LeafContent::Markdown { .. } => "Markdown",
            LeafContent::Code { .. } => "Code",
            LeafContent::Html { .. } => "HTML",
            LeafContent::BigNumber(_) => "BigNumber",
            LeafContent::Media { .. } => "Media",
            LeafContent::Plot { .. } => "Plot",
            LeafContent::File { .. } => "File",
            LeafContent::Table { .. } => "Table",
            LeafContent::DataTable { .. } => "DataTable",
        }
    }

    /// MIME type of the payload body.
    pub fn mime(&self) -> &str {
        match self {
            LeafContent::Markdown { .. } => "text/markdown",
            LeafContent::Code { .. } => "text/plain",
            LeafContent::Html { .. } | LeafContent::Table { .. } => "text/html",
            LeafContent::BigNumber(_) => "text/plain",
            LeafContent::Media { mime, .. } | LeafContent::File { mime, .. } => mime,
            LeafContent::Plot { .. } => PLOT_MIME,
            LeafContent::DataTable { .. } => DATA_TABLE_MIME,
        }
    }

    pub fn payload(&self) -> Option<&Payload> {
        match self {
            LeafContent::Markdown { text } => Some(text),
            LeafContent::Code { code, .. } => Some(code),
            LeafContent::Html { html } | LeafContent::Table { html, .. } => Some(html),
            LeafContent::BigNumber(_) => None,
            LeafContent::Media { data, .. }
            | LeafContent::File { data, .. }
            | LeafContent::DataTable { data, .. } => Some(data),
            LeafContent::Plot { spec, .. } => Some(spec),
        }
    }

    pub fn payload_mut(&mut self) -> Option<&mut Payload> {
        match self {
            LeafContent::Markdown { text } => Some(text),
            LeafContent::Code { code, .. } => Some(code),
            LeafContent::Html { html } | LeafContent::Table { html, .. } => Some(html),
            LeafContent::BigNumber(_) => None,
            LeafContent::Media { data, .. }
            | LeafContent::File { data, .. }
            | LeafContent::DataTable { data, .. } => Some(data),
            LeafContent::Plot { spec, .. } => Some(spec),
        }
    }
}
