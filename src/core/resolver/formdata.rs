//! Form data lookup for data-bound settings
//!
//! Form data elements are stored either as JSON or as XML. Both are read into
//! a JSON value tree so bindings address them the same way: `a.b[0].c`. For
//! XML the root element is dropped, repeated child elements become arrays and
//! attributes become plain keys.

use crate::domain::{ArchiveError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};

/// Parsed form data of one data element
#[derive(Debug, Clone, PartialEq)]
pub struct FormData(Value);

impl FormData {
    /// Parses form data, using the content type when it says JSON or XML
    /// and sniffing the first byte otherwise
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Domain`] if the content cannot be parsed.
    pub fn parse(bytes: &[u8], content_type: Option<&str>) -> Result<Self> {
        let content_type = content_type.unwrap_or_default().to_ascii_lowercase();
        let first = bytes
            .iter()
            .copied()
            .find(|b| !b.is_ascii_whitespace() && *b != 0xEF && *b != 0xBB && *b != 0xBF);

        let is_json = content_type.contains("json")
            || (!content_type.contains("xml") && matches!(first, Some(b'{') | Some(b'[')));
        let is_xml = content_type.contains("xml") || first == Some(b'<');

        if is_json {
            let value = serde_json::from_slice(bytes)
                .map_err(|e| ArchiveError::Domain(format!("Form data is not valid JSON: {e}")))?;
            return Ok(Self(value));
        }
        if is_xml {
            let text = std::str::from_utf8(bytes)
                .map_err(|e| ArchiveError::Domain(format!("Form data is not UTF-8: {e}")))?;
            return Ok(Self(xml_to_value(text)?));
        }

        Err(ArchiveError::Domain(format!(
            "Unsupported form data content type '{content_type}'"
        )))
    }

    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    /// Value at a dotted field path
    pub fn get(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(&self.0, |value, segment| lookup_segment(value, segment))
    }

    /// Scalar at a field path as text; empty strings, objects and arrays
    /// count as absent
    pub fn get_text(&self, path: &str) -> Option<String> {
        match self.get(path)? {
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

fn lookup_segment<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    let (name, indexes) = match segment.find('[') {
        Some(pos) => segment.split_at(pos),
        None => (segment, ""),
    };

    let mut current = value.as_object()?.get(name)?;
    for index in indexes
        .split(']')
        .filter_map(|part| part.strip_prefix('['))
    {
        let index: usize = index.parse().ok()?;
        current = match current {
            Value::Array(items) => items.get(index)?,
            // A single XML element is not wrapped in an array
            other if index == 0 => other,
            _ => return None,
        };
    }
    Some(current)
}

struct Frame {
    name: String,
    fields: Map<String, Value>,
    text: String,
}

impl Frame {
    fn open(element: &BytesStart<'_>) -> Result<Self> {
        let name = String::from_utf8_lossy(element.local_name().as_ref()).into_owned();
        let mut fields = Map::new();
        for attribute in element.attributes() {
            let attribute = attribute
                .map_err(|e| ArchiveError::Domain(format!("Invalid form data attribute: {e}")))?;
            let key = attribute.key.as_ref();
            if key == b"xmlns" || key.starts_with(b"xmlns:") || key.starts_with(b"xsi:") {
                continue;
            }
            let value = attribute
                .unescape_value()
                .map_err(|e| ArchiveError::Domain(format!("Invalid form data attribute: {e}")))?;
            fields.insert(
                String::from_utf8_lossy(attribute.key.local_name().as_ref()).into_owned(),
                Value::String(value.into_owned()),
            );
        }
        Ok(Self {
            name,
            fields,
            text: String::new(),
        })
    }

    fn close(self) -> (String, Value) {
        let value = if self.fields.is_empty() {
            if self.text.is_empty() {
                Value::Null
            } else {
                Value::String(self.text)
            }
        } else {
            Value::Object(self.fields)
        };
        (self.name, value)
    }
}

fn insert_child(parent: &mut Map<String, Value>, name: String, value: Value) {
    match parent.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            parent.insert(name, value);
        }
    }
}

fn xml_to_value(xml: &str) -> Result<Value> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Frame> = Vec::new();
    let mut root = None;

    let mut finish = |stack: &mut Vec<Frame>, frame: Frame| {
        let (name, value) = frame.close();
        match stack.last_mut() {
            Some(parent) => insert_child(&mut parent.fields, name, value),
            None => root = Some(value),
        }
    };

    loop {
        let event = reader
            .read_event()
            .map_err(|e| ArchiveError::Domain(format!("Form data is not valid XML: {e}")))?;
        match event {
            Event::Start(element) => stack.push(Frame::open(&element)?),
            Event::Empty(element) => {
                let frame = Frame::open(&element)?;
                finish(&mut stack, frame);
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| ArchiveError::Domain(format!("Invalid form data text: {e}")))?;
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::End(_) => {
                if let Some(frame) = stack.pop() {
                    finish(&mut stack, frame);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    root.ok_or_else(|| ArchiveError::Domain("Form data XML has no root element".to_string()))
}
