use anyhow::{Context, Result};
use quick_xml::{events::Event, Reader};

/// One `<item>` of the feed, with text children as published.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
}

/// Parses an RSS document into its items. Elements outside `<item>` are ignored.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<FeedEntry> = None;
    let mut field: Option<Field> = None;

    loop {
        let event = reader
            .read_event()
            .with_context(|| format!("Malformed feed at byte {}", reader.buffer_position()))?;

        match event {
            Event::Eof => break,
            Event::Start(e) => match e.name().as_ref() {
                b"item" => current = Some(FeedEntry::default()),
                b"title" if current.is_some() => field = Some(Field::Title),
                b"link" if current.is_some() => field = Some(Field::Link),
                _ => field = None,
            },
            Event::End(e) => {
                if e.name().as_ref() == b"item" {
                    entries.extend(current.take());
                }
                field = None;
            }
            Event::Text(e) => {
                let text = e.unescape()?;
                append(&mut current, field, &text);
            }
            Event::CData(e) => {
                let bytes = e.into_inner();
                append(&mut current, field, &String::from_utf8_lossy(&bytes));
            }
            _ => {}
        }
    }

    Ok(entries)
}

fn append(current: &mut Option<FeedEntry>, field: Option<Field>, text: &str) {
    let (Some(entry), Some(field)) = (current.as_mut(), field) else {
        return;
    };
    match field {
        Field::Title => entry.title.push_str(text.trim()),
        Field::Link => entry.link.push_str(text.trim()),
    }
}
