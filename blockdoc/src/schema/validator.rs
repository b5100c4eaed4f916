use std::collections::HashSet;
use std::ops::Range;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::schema::{ElementRule, Schema, SchemaViolation};

pub(crate) fn validate(schema: &Schema, document: &str) -> Result<(), SchemaViolation> {
    let mut reader = Reader::from_str(document);
    reader.config_mut().trim_text(true);
    let mut state = ValidationState::new(schema);

    loop {
        let start = reader.buffer_position() as usize;
        let event = reader.read_event().map_err(|err| {
            let at = reader.error_position() as usize;
            SchemaViolation::new(format!("malformed document: {}", err), at..at)
        })?;
        let span = tag_span(document, start, reader.buffer_position() as usize);

        match event {
            Event::Start(tag) => state.open(&tag, span, false)?,
            Event::Empty(tag) => state.open(&tag, span, true)?,
            Event::End(_) => state.close(span)?,
            Event::Text(text) => {
                let text = text.unescape().map_err(|err| {
                    SchemaViolation::new(format!("malformed text: {}", err), span.clone())
                })?;
                if !text.trim().is_empty() {
                    state.text(span)?;
                }
            }
            Event::CData(data) => {
                if data.iter().any(|b| !b.is_ascii_whitespace()) {
                    state.text(span)?;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    state.finish(document.len())
}

/// Narrow an event's byte range to start at its markup.
fn tag_span(document: &str, start: usize, end: usize) -> Range<usize> {
    let offset = document
        .as_bytes()
        .get(start..end)
        .and_then(|bytes| bytes.iter().position(|b| *b == b'<'))
        .unwrap_or(0);
    start + offset..end
}

struct OpenElement<'s> {
    name: String,
    rule: &'s ElementRule,
    children: usize,
    span: Range<usize>,
}

struct ValidationState<'s> {
    schema: &'s Schema,
    stack: Vec<OpenElement<'s>>,
    seen_root: bool,
    /// (attribute, value) pairs of attributes that must be unique.
    unique_values: HashSet<(String, String)>,
}

impl<'s> ValidationState<'s> {
    fn new(schema: &'s Schema) -> Self {
        ValidationState {
            schema,
            stack: Vec::new(),
            seen_root: false,
            unique_values: HashSet::new(),
        }
    }

    fn open(
        &mut self,
        tag: &BytesStart<'_>,
        span: Range<usize>,
        empty: bool,
    ) -> Result<(), SchemaViolation> {
        let schema = self.schema;
        let name = String::from_utf8_lossy(tag.name().as_ref()).into_owned();
        let rule = schema.element(&name).ok_or_else(|| {
            SchemaViolation::new(format!("undeclared element <{}>", name), span.clone())
                .on_element(&name)
        })?;

        match self.stack.last_mut() {
            None if self.seen_root => {
                return Err(SchemaViolation::new(
                    format!("element <{}> after the root element", name),
                    span,
                )
                .on_element(&name));
            }
            None => {
                if name != schema.root {
                    return Err(SchemaViolation::new(
                        format!("root element must be <{}>, found <{}>", schema.root, name),
                        span,
                    )
                    .on_element(&name));
                }
                self.seen_root = true;
            }
            Some(parent) => {
                if !parent.rule.allows_child(&name) {
                    let message = if parent.rule.children.is_empty() {
                        format!("element <{}> cannot contain child elements", parent.name)
                    } else {
                        format!("element <{}> is not allowed inside <{}>", name, parent.name)
                    };
                    return Err(SchemaViolation::new(message, span)
                        .on_element(&name)
                        .with_note(format!("parent <{}> opened here", parent.name)));
                }
                parent.children += 1;
                if let Some(max) = parent.rule.max_children {
                    if parent.children > max {
                        return Err(SchemaViolation::new(
                            format!(
                                "element <{}> allows at most {} child element(s)",
                                parent.name, max
                            ),
                            span,
                        )
                        .on_element(&parent.name));
                    }
                }
            }
        }

        self.check_attributes(tag, &name, rule, &span)?;

        let element = OpenElement {
            name,
            rule,
            children: 0,
            span,
        };
        if empty {
            check_closed(&element)
        } else {
            self.stack.push(element);
            Ok(())
        }
    }

    fn check_attributes(
        &mut self,
        tag: &BytesStart<'_>,
        name: &str,
        rule: &ElementRule,
        span: &Range<usize>,
    ) -> Result<(), SchemaViolation> {
        let mut present = Vec::new();
        for attribute in tag.attributes() {
            let attribute = attribute.map_err(|err| {
                SchemaViolation::new(format!("malformed attribute: {}", err), span.clone())
                    .on_element(name)
            })?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            if !rule.allows_attribute(&key) {
                return Err(SchemaViolation::new(
                    format!("attribute `{}` is not allowed on <{}>", key, name),
                    span.clone(),
                )
                .on_element(name));
            }
            let value = attribute.unescape_value().map_err(|err| {
                SchemaViolation::new(
                    format!("malformed value for attribute `{}`: {}", key, err),
                    span.clone(),
                )
                .on_element(name)
            })?;
            if self.schema.unique.contains(&key)
                && !self
                    .unique_values
                    .insert((key.clone(), value.clone().into_owned()))
            {
                return Err(SchemaViolation::new(
                    format!("duplicate {} `{}` on <{}>", key, value, name),
                    span.clone(),
                )
                .on_element(name));
            }
            present.push(key);
        }

        if let Some(missing) = rule.required.iter().find(|req| !present.contains(*req)) {
            return Err(SchemaViolation::new(
                format!(
                    "element <{}> is missing required attribute `{}`",
                    name, missing
                ),
                span.clone(),
            )
            .on_element(name));
        }
        Ok(())
    }

    fn close(&mut self, span: Range<usize>) -> Result<(), SchemaViolation> {
        let element = self
            .stack
            .pop()
            .ok_or_else(|| SchemaViolation::new("unexpected closing tag", span))?;
        check_closed(&element)
    }

    fn text(&self, span: Range<usize>) -> Result<(), SchemaViolation> {
        match self.stack.last() {
            None => Err(SchemaViolation::new("text outside the root element", span)),
            Some(element) if !element.rule.text => Err(SchemaViolation::new(
                format!("element <{}> does not allow text content", element.name),
                span,
            )
            .on_element(&element.name)),
            Some(_) => Ok(()),
        }
    }

    fn finish(&self, len: usize) -> Result<(), SchemaViolation> {
        if let Some(element) = self.stack.last() {
            return Err(SchemaViolation::new(
                format!("element <{}> is never closed", element.name),
                element.span.clone(),
            )
            .on_element(&element.name));
        }
        if !self.seen_root {
            return Err(SchemaViolation::new("document has no root element", len..len));
        }
        Ok(())
    }
}

fn check_closed(element: &OpenElement<'_>) -> Result<(), SchemaViolation> {
    if element.children < element.rule.min_children {
        return Err(SchemaViolation::new(
            format!(
                "element <{}> requires at least {} child element(s)",
                element.name, element.rule.min_children
            ),
            element.span.clone(),
        )
        .on_element(&element.name));
    }
    Ok(())
}
