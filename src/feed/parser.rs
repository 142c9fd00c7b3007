//! RSS 2.0 decoding.
//!
//! Only unprefixed RSS elements are read. Namespaced siblings such as
//! `<atom:link>` or `<itunes:title>` are skipped.
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

/// Maximum element nesting accepted before the document is rejected.
const MAX_XML_DEPTH: usize = 64;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Invalid XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Document has no <channel> element")]
    MissingChannel,

    #[error("Document ended before all elements were closed")]
    UnexpectedEof,

    /// SEC-003: Guards against pathologically nested documents
    #[error("XML nesting exceeds maximum depth of {0}")]
    MaxDepthExceeded(usize),
}

/// An RSS 2.0 document as decoded from the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RssFeed {
    pub channel: RssChannel,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RssChannel {
    pub title: String,
    pub link: String,
    pub description: String,
    pub items: Vec<RssItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RssItem {
    pub title: String,
    pub link: String,
    /// `None` when the item has no `<description>` element at all
    pub description: Option<String>,
    /// Raw `<pubDate>` text; see [`super::dates::normalize_date`]
    pub pub_date: Option<String>,
}

#[derive(Clone, Copy)]
enum Field {
    Title,
    Link,
    Description,
    PubDate,
}

impl Field {
    fn for_channel(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Field::Title),
            b"link" => Some(Field::Link),
            b"description" => Some(Field::Description),
            _ => None,
        }
    }

    fn for_item(name: &[u8]) -> Option<Self> {
        match name {
            b"pubDate" => Some(Field::PubDate),
            other => Field::for_channel(other),
        }
    }
}

/// Decode an RSS document and HTML-unescape its text fields.
///
/// Channel title and description and every item title are unescaped
/// unconditionally. An item description is unescaped only when the element
/// is present; an absent description stays `None`.
///
/// A field's value is its own text and CDATA, trimmed at both ends. Markup
/// nested inside a field is skipped along with its text.
///
/// # Errors
///
/// Returns [`ParseError`] for malformed XML, a truncated document, or a
/// document without a `<channel>` directly under the root element.
pub fn parse_feed(bytes: &[u8]) -> Result<RssFeed, ParseError> {
    // SEC-002: XXE protection. quick-xml (0.37) never parses <!ENTITY> declarations;
    // only the five XML builtins and character references are resolved by unescape().
    let mut reader = Reader::from_reader(bytes);

    let mut channel: Option<RssChannel> = None;
    let mut item: Option<RssItem> = None;
    let mut capture: Option<Field> = None;
    let mut text = String::new();
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                stack.push(name);
                if stack.len() > MAX_XML_DEPTH {
                    return Err(ParseError::MaxDepthExceeded(MAX_XML_DEPTH));
                }
                open_element(&stack, &mut channel, &mut item, &mut capture, &mut text);
            }
            Event::Empty(e) => {
                // A self-closing element is an open immediately followed by a close
                stack.push(e.name().as_ref().to_vec());
                open_element(&stack, &mut channel, &mut item, &mut capture, &mut text);
                close_element(&stack, &mut channel, &mut item, &mut capture, &mut text);
                stack.pop();
            }
            // Only the field's own character data; nested markup is skipped
            Event::Text(t) if capture.is_some() && stack.len() == field_depth(&item) => {
                text.push_str(&t.unescape()?);
            }
            Event::CData(c) if capture.is_some() && stack.len() == field_depth(&item) => {
                text.push_str(&c.decode().map_err(quick_xml::Error::from)?);
            }
            Event::End(_) => {
                close_element(&stack, &mut channel, &mut item, &mut capture, &mut text);
                stack.pop();
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(ParseError::UnexpectedEof);
    }

    let mut channel = channel.ok_or(ParseError::MissingChannel)?;
    channel.title = unescape(&channel.title);
    channel.description = unescape(&channel.description);
    for item in &mut channel.items {
        item.title = unescape(&item.title);
        if let Some(description) = item.description.as_mut() {
            *description = unescape(description);
        }
    }

    Ok(RssFeed { channel })
}

/// Depth 2 is `<rss><channel>`, depth 3 a channel child, depth 4 an item child.
fn field_depth(item: &Option<RssItem>) -> usize {
    if item.is_some() {
        4
    } else {
        3
    }
}

fn open_element(
    stack: &[Vec<u8>],
    channel: &mut Option<RssChannel>,
    item: &mut Option<RssItem>,
    capture: &mut Option<Field>,
    text: &mut String,
) {
    let name = match stack.last() {
        Some(name) => name.as_slice(),
        None => return,
    };
    match stack.len() {
        2 if name == b"channel" && channel.is_none() => *channel = Some(RssChannel::default()),
        3 if channel.is_some() && stack[1] == b"channel" => {
            if name == b"item" {
                *item = Some(RssItem::default());
            } else {
                *capture = Field::for_channel(name);
                text.clear();
            }
        }
        4 if item.is_some() => {
            *capture = Field::for_item(name);
            text.clear();
        }
        _ => {}
    }
}

fn close_element(
    stack: &[Vec<u8>],
    channel: &mut Option<RssChannel>,
    item: &mut Option<RssItem>,
    capture: &mut Option<Field>,
    text: &mut String,
) {
    match stack.len() {
        3 => {
            if let Some(ch) = channel.as_mut() {
                if let Some(done) = item.take() {
                    ch.items.push(done);
                } else if let Some(field) = capture.take() {
                    let value = take_trimmed(text);
                    match field {
                        Field::Title => ch.title = value,
                        Field::Link => ch.link = value,
                        Field::Description => ch.description = value,
                        Field::PubDate => {}
                    }
                }
            }
        }
        4 => {
            if let (Some(it), Some(field)) = (item.as_mut(), capture.take()) {
                let value = take_trimmed(text);
                match field {
                    Field::Title => it.title = value,
                    Field::Link => it.link = value,
                    Field::Description => it.description = Some(value),
                    Field::PubDate => it.pub_date = Some(value),
                }
            }
        }
        _ => {}
    }
}

fn take_trimmed(text: &mut String) -> String {
    let value = text.trim().to_string();
    text.clear();
    value
}

fn unescape(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}
