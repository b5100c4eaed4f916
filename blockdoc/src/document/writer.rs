use std::borrow::Cow;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use quick_xml::Writer;
use quick_xml::escape::escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::block::leaf::{LeafContent, Payload};
use crate::block::{BlockId, BlockNode, Node};
use crate::document::{
    Document, DocumentMeta, FORMAT_VERSION, GROUP_ELEMENT, ROOT_ELEMENT, SerializeError,
};

/// Serialize a tree into an XML document.
///
/// Output depends only on the tree and the metadata: the same inputs always
/// produce the same bytes.
pub fn serialize(tree: &BlockNode, meta: &DocumentMeta) -> Result<Document, SerializeError> {
    let mut out = DocumentWriter::new();
    out.emit(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new(ROOT_ELEMENT);
    root.push_attribute(("version", FORMAT_VERSION));
    root.push_attribute(("mode", meta.mode.as_str()));
    if let Some(title) = &meta.title {
        push_escaped(&mut root, "title", title);
    }
    if let Some(description) = &meta.description {
        push_escaped(&mut root, "description", description);
    }
    out.emit(Event::Start(root))?;
    out.node(tree)?;
    out.emit(Event::End(BytesEnd::new(ROOT_ELEMENT)))?;

    let xml = String::from_utf8(out.into_inner())?;
    tracing::debug!(bytes = xml.len(), "serialized document");
    Ok(Document { xml })
}

struct DocumentWriter {
    writer: Writer<Vec<u8>>,
}

impl DocumentWriter {
    fn new() -> Self {
        DocumentWriter {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn into_inner(self) -> Vec<u8> {
        self.writer.into_inner()
    }

    fn emit(&mut self, event: Event<'_>) -> Result<(), SerializeError> {
        self.writer
            .write_event(event)
            .map_err(|err| SerializeError::Write(err.to_string()))
    }

    fn node(&mut self, node: &BlockNode) -> Result<(), SerializeError> {
        match node {
            Node::Group { id, children } => {
                let start = element_start(GROUP_ELEMENT, id);
                if children.is_empty() {
                    return self.emit(Event::Empty(start));
                }
                self.emit(Event::Start(start))?;
                for child in children {
                    self.node(child)?;
                }
                self.emit(Event::End(BytesEnd::new(GROUP_ELEMENT)))
            }
            Node::Leaf { id, content } => self.leaf(id, content),
        }
    }

    fn leaf(&mut self, id: &BlockId, content: &LeafContent) -> Result<(), SerializeError> {
        let name = content.element_name();
        let mut start = element_start(name, id);
        for (key, value) in leaf_attributes(content) {
            push_escaped(&mut start, key, &value);
        }

        match content.payload() {
            None => self.emit(Event::Empty(start)),
            Some(Payload::Text(text)) if carries_text(content) && is_xml_text(text) => {
                if text.is_empty() {
                    return self.emit(Event::Empty(start));
                }
                self.emit(Event::Start(start))?;
                self.emit(Event::Text(BytesText::new(text)))?;
                self.emit(Event::End(BytesEnd::new(name)))
            }
            Some(Payload::Text(text)) => {
                start.push_attribute(("src", data_uri(content.mime(), text.as_bytes()).as_str()));
                self.emit(Event::Empty(start))
            }
            Some(Payload::Bytes(bytes)) => {
                start.push_attribute(("src", data_uri(content.mime(), bytes).as_str()));
                self.emit(Event::Empty(start))
            }
            Some(Payload::Attached(reference)) => {
                start.push_attribute(("src", reference.to_string().as_str()));
                self.emit(Event::Empty(start))
            }
        }
    }
}

fn element_start<'a>(name: &'a str, id: &BlockId) -> BytesStart<'a> {
    let mut start = BytesStart::new(name);
    push_escaped(&mut start, "id", id.as_str());
    start
}

/// Type-specific attributes, in output order. `src` is added separately.
fn leaf_attributes(content: &LeafContent) -> Vec<(&'static str, String)> {
    let mut attrs = Vec::new();
    match content {
        LeafContent::Markdown { .. } | LeafContent::Html { .. } => {}
        LeafContent::Code { language, .. } => attrs.push(("language", language.clone())),
        LeafContent::BigNumber(number) => {
            attrs.push(("heading", number.heading.clone()));
            attrs.push(("value", number.value.clone()));
            if let Some(change) = &number.change {
                attrs.push(("change", change.clone()));
            }
            if let Some(prev_value) = &number.prev_value {
                attrs.push(("prev_value", prev_value.clone()));
            }
            if let Some(upward) = number.is_upward_change {
                attrs.push(("is_upward_change", upward.to_string()));
            }
            if let Some(positive) = number.is_positive_intent {
                attrs.push(("is_positive_intent", positive.to_string()));
            }
        }
        LeafContent::Media {
            name,
            mime,
            caption,
            ..
        } => {
            if let Some(name) = name {
                attrs.push(("name", name.clone()));
            }
            attrs.push(("type", mime.clone()));
            if let Some(caption) = caption {
                attrs.push(("caption", caption.clone()));
            }
        }
        LeafContent::Plot {
            caption,
            responsive,
            ..
        } => {
            if let Some(caption) = caption {
                attrs.push(("caption", caption.clone()));
            }
            attrs.push(("responsive", responsive.to_string()));
            attrs.push(("type", content.mime().to_string()));
        }
        LeafContent::File { name, mime, .. } => {
            attrs.push(("name", name.clone()));
            attrs.push(("type", mime.clone()));
        }
        LeafContent::Table { caption, .. } => {
            if let Some(caption) = caption {
                attrs.push(("caption", caption.clone()));
            }
        }
        LeafContent::DataTable {
            caption, can_pivot, ..
        } => {
            if let Some(caption) = caption {
                attrs.push(("caption", caption.clone()));
            }
            attrs.push(("can_pivot", can_pivot.to_string()));
            attrs.push(("type", content.mime().to_string()));
        }
    }
    attrs
}

/// Leaves whose element holds its payload as text.
fn carries_text(content: &LeafContent) -> bool {
    matches!(
        content,
        LeafContent::Markdown { .. }
            | LeafContent::Code { .. }
            | LeafContent::Html { .. }
            | LeafContent::Table { .. }
    )
}

fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Characters allowed by XML 1.0.
fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\u{9}'
            | '\u{A}'
            | '\u{D}'
            | '\u{20}'..='\u{D7FF}'
            | '\u{E000}'..='\u{FFFD}'
            | '\u{10000}'..='\u{10FFFF}'
    )
}

fn is_xml_text(text: &str) -> bool {
    text.chars().all(is_xml_char)
}

/// Push an attribute, escaping markup and whitespace that attribute-value
/// normalization would otherwise fold into spaces. Characters outside XML 1.0
/// are replaced with U+FFFD.
fn push_escaped(start: &mut BytesStart<'_>, key: &str, value: &str) {
    let value: Cow<'_, str> = if is_xml_text(value) {
        Cow::Borrowed(value)
    } else {
        Cow::Owned(
            value
                .chars()
                .map(|c| if is_xml_char(c) { c } else { '\u{FFFD}' })
                .collect(),
        )
    };
    let mut escaped = escape(&*value).into_owned();
    if escaped.contains(['\n', '\r', '\t']) {
        escaped = escaped
            .replace('\n', "&#10;")
            .replace('\r', "&#13;")
            .replace('\t', "&#9;");
    }
    start.push_attribute((key.as_bytes(), escaped.as_bytes()));
}
