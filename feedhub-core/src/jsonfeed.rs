//! JSON Feed 1.0 / 1.1 (https://www.jsonfeed.org/version/1.1/)

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::feed::{Enclosure, FeedDocument, FeedImage, FeedItem, FeedType};

const VERSION_PREFIX: &str = "https://jsonfeed.org/version/";

#[derive(Debug, Deserialize)]
pub(crate) struct JsonFeed {
    version: String,
    title: String,
    home_page_url: Option<String>,
    feed_url: Option<String>,
    description: Option<String>,
    icon: Option<String>,
    favicon: Option<String>,
    language: Option<String>,
    author: Option<JsonAuthor>,
    #[serde(default)]
    authors: Vec<JsonAuthor>,
    #[serde(default)]
    items: Vec<JsonItem>,
}

#[derive(Debug, Deserialize)]
struct JsonAuthor {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JsonItem {
    id: serde_json::Value,
    url: Option<String>,
    title: Option<String>,
    content_html: Option<String>,
    content_text: Option<String>,
    summary: Option<String>,
    date_published: Option<String>,
    date_modified: Option<String>,
    author: Option<JsonAuthor>,
    #[serde(default)]
    authors: Vec<JsonAuthor>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    attachments: Vec<JsonAttachment>,
}

#[derive(Debug, Deserialize)]
struct JsonAttachment {
    url: String,
    mime_type: Option<String>,
    size_in_bytes: Option<u64>,
}

fn parse_rfc3339(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

// 1.1 moved the single `author` into an `authors` list
fn first_author(authors: &[JsonAuthor], author: Option<&JsonAuthor>) -> Option<String> {
    authors
        .iter()
        .chain(author)
        .find_map(|a| a.name.clone())
}

impl JsonFeed {
    pub(crate) fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        let feed: JsonFeed = serde_json::from_slice(body)?;
        if !feed.version.starts_with(VERSION_PREFIX) {
            return Err(serde::de::Error::custom(format!(
                "unknown JSON Feed version {}",
                feed.version
            )));
        }
        Ok(feed)
    }

    pub(crate) fn into_document(self) -> FeedDocument {
        let author = first_author(&self.authors, self.author.as_ref());
        let feed_version = self.version[VERSION_PREFIX.len()..].to_owned();

        FeedDocument {
            title: self.title,
            description: self.description,
            link: self.home_page_url,
            feed_link: self.feed_url,
            updated: None,
            published: None,
            author,
            language: self.language,
            image: self.icon.or(self.favicon).map(|url| FeedImage { url, title: None }),
            copyright: None,
            generator: None,
            categories: Vec::new(),
            items: self.items.into_iter().map(JsonItem::into_item).collect(),
            feed_type: FeedType::Json,
            feed_version,
        }
    }
}

impl JsonItem {
    fn into_item(self) -> FeedItem {
        let guid = match self.id {
            serde_json::Value::String(id) => Some(id),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        };
        let author = first_author(&self.authors, self.author.as_ref());

        FeedItem {
            title: self.title.unwrap_or_default(),
            description: self.summary,
            content: self.content_html.or(self.content_text),
            link: self.url,
            updated: self.date_modified.as_deref().and_then(parse_rfc3339),
            published: self.date_published.as_deref().and_then(parse_rfc3339),
            author,
            guid,
            categories: self.tags,
            enclosures: self
                .attachments
                .into_iter()
                .map(|attachment| Enclosure {
                    url: attachment.url,
                    length: attachment.size_in_bytes.map(|size| size.to_string()),
                    mime_type: attachment.mime_type,
                })
                .collect(),
        }
    }
}
