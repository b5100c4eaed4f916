use crate::block::BlockId;
use crate::block::leaf::{BigNumber, LeafContent, Payload};

/// A value authored by the caller, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// Bare text, coerced into a Markdown leaf.
    Text(String),
    /// A typed leaf.
    Leaf(Block),
    /// An explicit container.
    Group(Blocks),
    /// A value from a loosely-typed source with no block mapping.
    Untyped(Untyped),
}

/// A value that cannot become a block, kept for error reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct Untyped {
    /// Name of the value's type in its source format, e.g. `integer`.
    pub type_name: String,
    /// Rendering of the value.
    pub repr: String,
}

impl Untyped {
    pub fn new(type_name: impl Into<String>, repr: impl Into<String>) -> Self {
        Untyped {
            type_name: type_name.into(),
            repr: repr.into(),
        }
    }
}

/// A typed leaf with an optional caller-supplied identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: Option<BlockId>,
    pub content: LeafContent,
}

impl Block {
    pub fn new(content: LeafContent) -> Self {
        Block { id: None, content }
    }

    pub fn with_id(mut self, id: impl Into<BlockId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn markdown(text: impl Into<String>) -> Self {
        Block::new(LeafContent::Markdown {
            text: Payload::Text(text.into()),
        })
    }

    pub fn code(code: impl Into<String>, language: impl Into<String>) -> Self {
        Block::new(LeafContent::Code {
            language: language.into(),
            code: Payload::Text(code.into()),
        })
    }

    pub fn html(html: impl Into<String>) -> Self {
        Block::new(LeafContent::Html {
            html: Payload::Text(html.into()),
        })
    }

    pub fn big_number(number: BigNumber) -> Self {
        Block::new(LeafContent::BigNumber(number))
    }

    pub fn media(name: Option<String>, mime: impl Into<String>, data: Vec<u8>) -> Self {
        Block::new(LeafContent::Media {
            name,
            mime: mime.into(),
            caption: None,
            data: Payload::Bytes(data),
        })
    }

    /// A chart from its JSON specification.
    pub fn plot(spec: &serde_json::Value, caption: Option<String>) -> Self {
        Block::new(LeafContent::Plot {
            caption,
            responsive: true,
            spec: Payload::Bytes(spec.to_string().into_bytes()),
        })
    }

    pub fn file(name: impl Into<String>, mime: impl Into<String>, data: Vec<u8>) -> Self {
        Block::new(LeafContent::File {
            name: name.into(),
            mime: mime.into(),
            data: Payload::Bytes(data),
        })
    }

    /// A file holding `value` encoded as JSON.
    pub fn json_file(name: impl Into<String>, value: &serde_json::Value) -> Self {
        Block::file(name, "application/json", value.to_string().into_bytes())
    }

    pub fn table(html: impl Into<String>, caption: Option<String>) -> Self {
        Block::new(LeafContent::Table {
            caption,
            html: Payload::Text(html.into()),
        })
    }

    pub fn data_table(csv: Vec<u8>, caption: Option<String>, can_pivot: bool) -> Self {
        Block::new(LeafContent::DataTable {
            caption,
            can_pivot,
            data: Payload::Bytes(csv),
        })
    }
}

/// An explicit container of blocks.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Blocks {
    pub id: Option<BlockId>,
    pub blocks: Vec<Content>,
}

impl Blocks {
    pub fn new<I, C>(blocks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Content>,
    {
        Blocks {
            id: None,
            blocks: blocks.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_id(mut self, id: impl Into<BlockId>) -> Self {
        self.id = Some(id.into());
        self
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

impl From<Block> for Content {
    fn from(block: Block) -> Self {
        Content::Leaf(block)
    }
}

impl From<Blocks> for Content {
    fn from(blocks: Blocks) -> Self {
        Content::Group(blocks)
    }
}

impl From<Untyped> for Content {
    fn from(value: Untyped) -> Self {
        Content::Untyped(value)
    }
}
