use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// A parsed feed, independent of whether it came from RSS, Atom or JSON Feed.
///
/// This is the document cached per source and served to clients as JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FeedDocument {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<FeedImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
    pub categories: Vec<String>,
    pub items: Vec<FeedItem>,
    pub feed_type: FeedType,
    pub feed_version: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FeedType {
    #[default]
    Rss,
    Atom,
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FeedImage {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FeedItem {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    pub categories: Vec<String>,
    pub enclosures: Vec<Enclosure>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Enclosure {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

fn parse_rfc2822(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn to_utc(value: &DateTime<FixedOffset>) -> DateTime<Utc> {
    value.with_timezone(&Utc)
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_owned())
}

impl FeedDocument {
    pub fn from_rss(channel: &rss::Channel) -> Self {
        let feed_link = channel.atom_ext().and_then(|ext| {
            ext.links()
                .iter()
                .find(|link| link.rel() == "self")
                .map(|link| link.href().to_owned())
        });

        Self {
            title: channel.title().to_owned(),
            description: non_empty(channel.description()),
            link: non_empty(channel.link()),
            feed_link,
            updated: channel.last_build_date().and_then(parse_rfc2822),
            published: channel.pub_date().and_then(parse_rfc2822),
            author: channel.managing_editor().map(ToOwned::to_owned),
            language: channel.language().map(ToOwned::to_owned),
            image: channel.image().map(|image| FeedImage {
                url: image.url().to_owned(),
                title: non_empty(image.title()),
            }),
            copyright: channel.copyright().map(ToOwned::to_owned),
            generator: channel.generator().map(ToOwned::to_owned),
            categories: channel
                .categories()
                .iter()
                .map(|cat| cat.name().to_owned())
                .collect(),
            items: channel.items().iter().map(FeedItem::from_rss).collect(),
            feed_type: FeedType::Rss,
            // the channel model drops the root version attribute
            feed_version: String::new(),
        }
    }

    pub fn from_atom(feed: &atom_syndication::Feed) -> Self {
        let link = feed
            .links()
            .iter()
            .find(|link| link.rel() == "alternate")
            .map(|link| link.href().to_owned());
        let feed_link = feed
            .links()
            .iter()
            .find(|link| link.rel() == "self")
            .map(|link| link.href().to_owned());

        Self {
            title: feed.title().value.clone(),
            description: feed.subtitle().map(|text| text.value.clone()),
            link,
            feed_link,
            updated: Some(to_utc(feed.updated())),
            published: None,
            author: feed.authors().first().map(|person| person.name().to_owned()),
            language: None,
            image: feed.logo().or(feed.icon()).map(|url| FeedImage {
                url: url.to_owned(),
                title: None,
            }),
            copyright: feed.rights().map(|text| text.value.clone()),
            generator: feed.generator().map(|generator| generator.value().to_owned()),
            categories: feed
                .categories()
                .iter()
                .map(|cat| cat.term().to_owned())
                .collect(),
            items: feed.entries().iter().map(FeedItem::from_atom).collect(),
            feed_type: FeedType::Atom,
            feed_version: "1.0".to_owned(),
        }
    }
}

impl FeedItem {
    pub fn from_rss(item: &rss::Item) -> Self {
        // Dublin Core creator wins over the plain author field
        let author = item
            .dublin_core_ext()
            .and_then(|dc| dc.creators().first().map(|s| s.to_string()))
            .or_else(|| item.author().map(|s| s.to_string()));

        Self {
            title: item.title().unwrap_or_default().to_owned(),
            description: item.description().map(ToOwned::to_owned),
            content: item.content().map(ToOwned::to_owned),
            link: item.link().map(ToOwned::to_owned),
            updated: None,
            published: item.pub_date().and_then(parse_rfc2822),
            author,
            guid: item.guid().map(|guid| guid.value().to_owned()),
            categories: item
                .categories()
                .iter()
                .map(|cat| cat.name().to_owned())
                .collect(),
            enclosures: item
                .enclosure()
                .map(|enclosure| Enclosure {
                    url: enclosure.url().to_owned(),
                    length: non_empty(enclosure.length()),
                    mime_type: non_empty(enclosure.mime_type()),
                })
                .into_iter()
                .collect(),
        }
    }

    pub fn from_atom(entry: &atom_syndication::Entry) -> Self {
        let link = entry
            .links()
            .iter()
            .find(|link| link.rel() == "alternate")
            .or_else(|| entry.links().first())
            .map(|link| link.href().to_owned());
        let enclosures = entry
            .links()
            .iter()
            .filter(|link| link.rel() == "enclosure")
            .map(|link| Enclosure {
                url: link.href().to_owned(),
                length: link.length().map(ToOwned::to_owned),
                mime_type: link.mime_type().map(ToOwned::to_owned),
            })
            .collect();

        Self {
            title: entry.title().value.clone(),
            description: entry.summary().map(|text| text.value.clone()),
            content: entry
                .content()
                .and_then(|content| content.value())
                .map(ToOwned::to_owned),
            link,
            updated: Some(to_utc(entry.updated())),
            published: entry.published().map(to_utc),
            author: entry.authors().first().map(|person| person.name().to_owned()),
            guid: non_empty(entry.id()),
            categories: entry
                .categories()
                .iter()
                .map(|cat| cat.term().to_owned())
                .collect(),
            enclosures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rss_channel_maps_items_and_dates() {
        let xml = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Example</title>
    <link>http://example.com/</link>
    <description>Things</description>
    <language>en</language>
    <item>
      <title>First</title>
      <link>http://example.com/1</link>
      <guid>1</guid>
      <pubDate>Mon, 21 Oct 2024 07:28:00 GMT</pubDate>
      <enclosure url="http://example.com/1.mp3" length="42" type="audio/mpeg"/>
    </item>
  </channel>
</rss>"#;
        let channel = rss::Channel::read_from(xml.as_bytes()).unwrap();
        let doc = FeedDocument::from_rss(&channel);

        assert_eq!(doc.title, "Example");
        assert_eq!(doc.link.as_deref(), Some("http://example.com/"));
        assert_eq!(doc.language.as_deref(), Some("en"));
        assert_eq!(doc.feed_type, FeedType::Rss);
        assert_eq!(doc.items.len(), 1);

        let item = &doc.items[0];
        assert_eq!(item.title, "First");
        assert_eq!(item.guid.as_deref(), Some("1"));
        assert!(item.published.is_some());
        assert_eq!(item.enclosures.len(), 1);
        assert_eq!(item.enclosures[0].length.as_deref(), Some("42"));
    }

    #[test]
    fn atom_feed_maps_entries() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Example</title>
  <link href="http://example.org/"/>
  <link rel="self" href="http://example.org/feed.xml"/>
  <updated>2024-10-21T07:28:00Z</updated>
  <id>urn:uuid:feed</id>
  <author><name>Jo</name></author>
  <entry>
    <title>Entry</title>
    <link href="http://example.org/entry"/>
    <id>urn:uuid:entry</id>
    <updated>2024-10-21T07:28:00Z</updated>
    <summary>Short</summary>
  </entry>
</feed>"#;
        let feed = atom_syndication::Feed::read_from(xml.as_bytes()).unwrap();
        let doc = FeedDocument::from_atom(&feed);

        assert_eq!(doc.title, "Atom Example");
        assert_eq!(doc.link.as_deref(), Some("http://example.org/"));
        assert_eq!(doc.feed_link.as_deref(), Some("http://example.org/feed.xml"));
        assert_eq!(doc.author.as_deref(), Some("Jo"));
        assert_eq!(doc.feed_type, FeedType::Atom);
        assert_eq!(doc.items.len(), 1);
        assert_eq!(doc.items[0].description.as_deref(), Some("Short"));
        assert_eq!(doc.items[0].guid.as_deref(), Some("urn:uuid:entry"));
    }

    #[test]
    fn json_uses_camel_case_keys() {
        let doc = FeedDocument {
            title: "T".into(),
            feed_link: Some("http://e/feed".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["feedLink"], "http://e/feed");
        assert_eq!(json["feedType"], "rss");
        assert!(json.get("description").is_none());
    }
}
