use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

/// Maximum allowed element nesting depth. Podcast feeds are shallow;
/// anything deeper is a malformed or hostile document.
const MAX_XML_DEPTH: usize = 32;

/// Errors that can occur while parsing a podcast feed document.
#[derive(Debug, Error)]
pub enum ParseError {
    /// XML is syntactically invalid.
    #[error("XML parse error: {0}")]
    Xml(String),
    /// Document parsed but contained no RSS `<channel>` element.
    #[error("not an RSS feed (no <channel> element)")]
    NotRss,
    /// Nesting depth exceeds the safety limit.
    #[error("XML nesting depth exceeds maximum of {0} levels")]
    MaxDepthExceeded(usize),
}

/// Channel-level podcast metadata extracted from a feed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedMeta {
    pub title: Option<String>,
    pub description: Option<String>,
    /// `itunes:image href` when present, otherwise `<image><url>`.
    pub image_url: Option<String>,
    pub language: Option<String>,
    /// First iTunes category (`text` attribute), falling back to the
    /// first plain `<category>` element.
    pub category: Option<String>,
}

/// A single feed item, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedItem {
    pub title: Option<String>,
    /// `<description>`, falling back to `itunes:summary`.
    pub description: Option<String>,
    pub enclosure_url: Option<String>,
    pub enclosure_type: Option<String>,
    /// Raw `itunes:duration` string; parsed to seconds by the reconciler.
    pub duration_raw: Option<String>,
    pub episode_number: Option<i64>,
    pub season_number: Option<i64>,
    /// `pubDate` as epoch seconds.
    pub published_at: Option<i64>,
}

/// Result of parsing a feed document.
#[derive(Debug, Default)]
pub struct ParsedFeed {
    pub meta: FeedMeta,
    pub items: Vec<FeedItem>,
    /// Items discarded for having neither a title nor an audio enclosure.
    pub skipped: usize,
}

/// Leaf elements whose text content we collect.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    Title,
    Description,
    Summary,
    Language,
    Category,
    ImageUrl,
    PubDate,
    Duration,
    Episode,
    Season,
}

/// Parses a podcast RSS document into channel metadata and items.
///
/// iTunes namespace extensions are matched by local name, so any prefix
/// binding works. Items lacking both a title and an enclosure URL are
/// discarded here and counted in [`ParsedFeed::skipped`].
///
/// # Errors
///
/// Returns [`ParseError::Xml`] for invalid XML, [`ParseError::NotRss`]
/// when the document has no `<channel>`, and
/// [`ParseError::MaxDepthExceeded`] for pathologically nested input.
///
/// # Security
///
/// XXE is structurally mitigated: quick-xml (0.37) never parses `<!ENTITY>`
/// declarations, and `decode_and_unescape_value()` only resolves the five
/// XML builtins. Custom entities fail with an unescape error.
pub fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed, ParseError> {
    let text = String::from_utf8_lossy(bytes);
    let mut reader = Reader::from_str(&text);
    reader.config_mut().trim_text(true);

    let mut meta = FeedMeta::default();
    let mut items: Vec<FeedItem> = Vec::new();
    let mut skipped = 0usize;

    let mut depth = 0usize;
    let mut seen_channel = false;
    let mut in_channel = false;
    let mut in_image = false;
    let mut current_item: Option<FeedItem> = None;
    // itunes:summary is staged separately so <description> wins when both exist
    let mut channel_summary: Option<String> = None;
    let mut item_summary: Option<String> = None;
    let mut field: Option<Field> = None;
    let mut text_buf = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                depth += 1;
                if depth > MAX_XML_DEPTH {
                    return Err(ParseError::MaxDepthExceeded(MAX_XML_DEPTH));
                }
                field = None;
                match e.local_name().as_ref() {
                    b"channel" => {
                        in_channel = true;
                        seen_channel = true;
                    }
                    b"item" if in_channel => {
                        current_item = Some(FeedItem::default());
                        item_summary = None;
                    }
                    b"image" if in_channel && current_item.is_none() => {
                        // itunes:image carries an href attribute; plain <image>
                        // wraps a <url> child instead
                        match attr_value(&e, &reader, b"href")? {
                            Some(href) => meta.image_url = Some(href),
                            None => in_image = true,
                        }
                    }
                    b"category" => {
                        handle_category(&e, &reader, in_channel, current_item.is_some(), &mut meta)?;
                        if in_channel && current_item.is_none() && meta.category.is_none() {
                            field = Some(Field::Category);
                            text_buf.clear();
                        }
                    }
                    b"enclosure" => {
                        if let Some(item) = current_item.as_mut() {
                            read_enclosure(&e, &reader, item)?;
                        }
                    }
                    other => {
                        if in_channel {
                            field = classify(other, current_item.is_some(), in_image);
                            text_buf.clear();
                        }
                    }
                }
            }
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"enclosure" => {
                    if let Some(item) = current_item.as_mut() {
                        read_enclosure(&e, &reader, item)?;
                    }
                }
                b"image" if in_channel && current_item.is_none() => {
                    if let Some(href) = attr_value(&e, &reader, b"href")? {
                        meta.image_url = Some(href);
                    }
                }
                b"category" => {
                    handle_category(&e, &reader, in_channel, current_item.is_some(), &mut meta)?;
                }
                _ => {}
            },
            Ok(Event::Text(t)) => {
                if field.is_some() {
                    let unescaped = t.unescape().map_err(|e| ParseError::Xml(e.to_string()))?;
                    text_buf.push_str(&unescaped);
                }
            }
            Ok(Event::CData(t)) => {
                if field.is_some() {
                    text_buf.push_str(&String::from_utf8_lossy(t.as_ref()));
                }
            }
            Ok(Event::End(e)) => {
                depth = depth.saturating_sub(1);
                match e.local_name().as_ref() {
                    b"channel" => in_channel = false,
                    b"image" => in_image = false,
                    b"item" => {
                        if let Some(mut item) = current_item.take() {
                            if item.description.is_none() {
                                item.description = item_summary.take();
                            }
                            if item.title.is_none() && item.enclosure_url.is_none() {
                                skipped += 1;
                            } else {
                                items.push(item);
                            }
                        }
                    }
                    _ => {
                        if let Some(f) = field.take() {
                            commit(
                                f,
                                text_buf.trim(),
                                &mut meta,
                                current_item.as_mut(),
                                &mut channel_summary,
                                &mut item_summary,
                            );
                            text_buf.clear();
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ParseError::Xml(e.to_string())),
            _ => {}
        }
    }

    if !seen_channel {
        return Err(ParseError::NotRss);
    }

    if meta.description.is_none() {
        meta.description = channel_summary;
    }

    Ok(ParsedFeed {
        meta,
        items,
        skipped,
    })
}

fn classify(local: &[u8], in_item: bool, in_image: bool) -> Option<Field> {
    // Inside <image> only <url> matters; its <title>/<description>
    // children must not claim the channel's fields.
    if in_image {
        return if local == b"url" {
            Some(Field::ImageUrl)
        } else {
            None
        };
    }
    match local {
        b"title" => Some(Field::Title),
        b"description" => Some(Field::Description),
        b"summary" => Some(Field::Summary),
        b"language" if !in_item => Some(Field::Language),
        b"pubDate" if in_item => Some(Field::PubDate),
        b"duration" if in_item => Some(Field::Duration),
        b"episode" if in_item => Some(Field::Episode),
        b"season" if in_item => Some(Field::Season),
        _ => None,
    }
}

fn commit(
    field: Field,
    text: &str,
    meta: &mut FeedMeta,
    item: Option<&mut FeedItem>,
    channel_summary: &mut Option<String>,
    item_summary: &mut Option<String>,
) {
    if text.is_empty() {
        return;
    }
    let owned = text.to_string();
    match (field, item) {
        (Field::Title, Some(item)) => {
            item.title.get_or_insert(owned);
        }
        (Field::Title, None) => {
            meta.title.get_or_insert(owned);
        }
        (Field::Description, Some(item)) => {
            item.description.get_or_insert(owned);
        }
        (Field::Description, None) => {
            meta.description.get_or_insert(owned);
        }
        (Field::Summary, Some(_)) => {
            item_summary.get_or_insert(owned);
        }
        (Field::Summary, None) => {
            channel_summary.get_or_insert(owned);
        }
        (Field::Language, _) => {
            meta.language.get_or_insert(owned);
        }
        (Field::Category, _) => {
            meta.category.get_or_insert(owned);
        }
        // itunes:image takes precedence, so only fill when still unset
        (Field::ImageUrl, _) => {
            meta.image_url.get_or_insert(owned);
        }
        (Field::PubDate, Some(item)) => {
            if item.published_at.is_none() {
                item.published_at = chrono::DateTime::parse_from_rfc2822(text)
                    .map(|dt| dt.timestamp())
                    .ok();
            }
        }
        (Field::Duration, Some(item)) => {
            item.duration_raw.get_or_insert(owned);
        }
        (Field::Episode, Some(item)) => {
            if item.episode_number.is_none() {
                item.episode_number = text.parse().ok();
            }
        }
        (Field::Season, Some(item)) => {
            if item.season_number.is_none() {
                item.season_number = text.parse().ok();
            }
        }
        _ => {}
    }
}

/// iTunes categories carry the value in a `text` attribute; plain RSS
/// `<category>` elements carry it as text content (handled by the caller
/// via [`Field::Category`]). Item-level categories are ignored.
fn handle_category<R>(
    e: &BytesStart<'_>,
    reader: &Reader<R>,
    in_channel: bool,
    in_item: bool,
    meta: &mut FeedMeta,
) -> Result<(), ParseError> {
    if !in_channel || in_item {
        return Ok(());
    }
    if let Some(text) = attr_value(e, reader, b"text")? {
        meta.category.get_or_insert(text);
    }
    Ok(())
}

fn read_enclosure<R>(
    e: &BytesStart<'_>,
    reader: &Reader<R>,
    item: &mut FeedItem,
) -> Result<(), ParseError> {
    if let Some(url) = attr_value(e, reader, b"url")? {
        item.enclosure_url.get_or_insert(url);
    }
    if let Some(kind) = attr_value(e, reader, b"type")? {
        item.enclosure_type.get_or_insert(kind);
    }
    Ok(())
}

// Generic over the reader source; only the decoder is needed.
fn attr_value<R>(
    e: &BytesStart<'_>,
    reader: &Reader<R>,
    key: &[u8],
) -> Result<Option<String>, ParseError> {
    for attr_result in e.attributes() {
        let attr = match attr_result {
            Ok(attr) => attr,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed feed attribute");
                continue;
            }
        };
        if attr.key.local_name().as_ref() == key {
            let value = attr
                .decode_and_unescape_value(reader.decoder())
                .map_err(|e| ParseError::Xml(e.to_string()))?;
            return Ok(Some(value.to_string()));
        }
    }
    Ok(None)
}
