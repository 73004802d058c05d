//! RSS 2.0 feeds for sections.

use std::io::Write;

use chrono::{NaiveDate, NaiveTime};
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

/// Errors that can occur while writing a feed.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("writing feed XML failed: {0}")]
    Xml(String),
}

/// Channel-level metadata of a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub title: String,
    pub link: String,
    pub description: String,
    pub author: String,
}

/// A single entry of a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub title: String,
    pub link: String,
    pub author: String,
    /// HTML description, embedded as CDATA.
    pub description: String,
    pub published: Option<NaiveDate>,
}

/// A feed ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    pub channel: Channel,
    pub items: Vec<Item>,
}

impl Feed {
    /// Serialize the feed as RSS 2.0.
    ///
    /// Output only depends on the feed's contents; no build timestamp is
    /// written.
    pub fn write_to<W: Write>(&self, out: W) -> Result<(), FeedError> {
        let mut writer = Writer::new_with_indent(out, b' ', 2);

        event(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        event(
            &mut writer,
            Event::Start(BytesStart::new("rss").with_attributes([("version", "2.0")])),
        )?;
        event(&mut writer, Event::Start(BytesStart::new("channel")))?;

        text_element(&mut writer, "title", &self.channel.title)?;
        text_element(&mut writer, "link", &self.channel.link)?;
        text_element(&mut writer, "description", &self.channel.description)?;
        text_element(&mut writer, "author", &self.channel.author)?;

        for item in &self.items {
            write_item(&mut writer, item)?;
        }

        event(&mut writer, Event::End(BytesEnd::new("channel")))?;
        event(&mut writer, Event::End(BytesEnd::new("rss")))?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, FeedError> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }
}

fn write_item<W: Write>(writer: &mut Writer<W>, item: &Item) -> Result<(), FeedError> {
    event(writer, Event::Start(BytesStart::new("item")))?;

    text_element(writer, "title", &item.title)?;
    text_element(writer, "link", &item.link)?;
    text_element(writer, "guid", &item.link)?;
    text_element(writer, "author", &item.author)?;

    event(writer, Event::Start(BytesStart::new("description")))?;
    // A CDATA section cannot contain its own terminator, so split it.
    let description = item.description.replace("]]>", "]]]]><![CDATA[>");
    event(writer, Event::CData(BytesCData::new(description.as_str())))?;
    event(writer, Event::End(BytesEnd::new("description")))?;

    if let Some(date) = item.published {
        text_element(writer, "pubDate", &pub_date(date))?;
    }

    event(writer, Event::End(BytesEnd::new("item")))
}

/// RFC 2822 timestamp of midnight UTC on `date`.
pub fn pub_date(date: NaiveDate) -> String {
    date.and_time(NaiveTime::MIN).and_utc().to_rfc2822()
}

fn text_element<W: Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<(), FeedError> {
    event(writer, Event::Start(BytesStart::new(name)))?;
    event(writer, Event::Text(BytesText::new(text)))?;
    event(writer, Event::End(BytesEnd::new(name)))
}

fn event<W: Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<(), FeedError> {
    writer
        .write_event(event)
        .map_err(|e| FeedError::Xml(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn feed() -> Feed {
        Feed {
            channel: Channel {
                title: "Blog".to_string(),
                link: "https://example.org/blog/index.html".to_string(),
                description: "List of blog".to_string(),
                author: "John Doe".to_string(),
            },
            items: vec![
                Item {
                    title: "First & Best".to_string(),
                    link: "https://example.org/blog/first-best.html".to_string(),
                    author: "John Doe".to_string(),
                    description: "<p>Hello</p>".to_string(),
                    published: NaiveDate::from_ymd_opt(2021, 7, 11),
                },
                Item {
                    title: "Undated".to_string(),
                    link: "https://example.org/blog/undated.html".to_string(),
                    author: "John Doe".to_string(),
                    description: String::new(),
                    published: None,
                },
            ],
        }
    }

    #[test]
    fn formats_pub_dates() {
        let date = NaiveDate::from_ymd_opt(2021, 7, 11).unwrap();

        assert_eq!(pub_date(date), "Sun, 11 Jul 2021 00:00:00 +0000");
    }

    #[test]
    fn writes_rss() {
        let xml = String::from_utf8(feed().to_bytes().unwrap()).unwrap();

        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains(r#"<rss version="2.0">"#));
        assert!(xml.contains("<title>First &amp; Best</title>"));
        assert!(xml.contains("<guid>https://example.org/blog/first-best.html</guid>"));
        assert!(xml.contains("<![CDATA[<p>Hello</p>]]>"));
        assert!(xml.contains("<pubDate>Sun, 11 Jul 2021 00:00:00 +0000</pubDate>"));
        assert_eq!(xml.matches("<item>").count(), 2);
        assert_eq!(xml.matches("<pubDate>").count(), 1);
    }

    #[test]
    fn keeps_item_order() {
        let xml = String::from_utf8(feed().to_bytes().unwrap()).unwrap();

        let first = xml.find("First &amp; Best").unwrap();
        let undated = xml.find("Undated").unwrap();
        assert!(first < undated);
    }

    #[test]
    fn splits_cdata_terminators() {
        let mut feed = feed();
        feed.items[0].description = "a ]]> b".to_string();

        let xml = String::from_utf8(feed.to_bytes().unwrap()).unwrap();

        assert!(xml.contains("<![CDATA[a ]]]]><![CDATA[> b]]>"));
    }

    #[test]
    fn output_is_deterministic() {
        assert_eq!(feed().to_bytes().unwrap(), feed().to_bytes().unwrap());
    }
}
