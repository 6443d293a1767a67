use std::time::Duration;

use async_trait::async_trait;
use reqwest::{redirect, Client, ClientBuilder};
use tracing::debug;

use crate::error::FetchError;
use crate::feed::FeedDocument;
use crate::jsonfeed::JsonFeed;

/// Retrieves and parses one feed.
///
/// Implementations must report network failures, timeouts and malformed
/// documents as `Err` rather than panicking.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FeedDocument, FetchError>;
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = ClientBuilder::new()
            .redirect(redirect::Policy::limited(5))
            .user_agent(concat!("feedhub/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FeedFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FeedDocument, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        let bytes = response.bytes().await?;
        debug!(source = %url, bytes = bytes.len(), "fetched feed body");
        parse_feed(&bytes)
    }
}

/// Parses RSS first, then Atom, then JSON Feed.
pub fn parse_feed(body: &[u8]) -> Result<FeedDocument, FetchError> {
    let rss = match rss::Channel::read_from(body) {
        Ok(channel) => {
            let mut doc = FeedDocument::from_rss(&channel);
            doc.feed_version = rss_version(body);
            return Ok(doc);
        }
        Err(err) => err,
    };
    let atom = match atom_syndication::Feed::read_from(body) {
        Ok(feed) => return Ok(FeedDocument::from_atom(&feed)),
        Err(err) => err,
    };
    match JsonFeed::from_slice(body) {
        Ok(feed) => Ok(feed.into_document()),
        Err(json) => Err(FetchError::Parse { rss, atom, json }),
    }
}

/// `version` attribute of the `<rss>` root; RSS 1.0 documents are RDF.
fn rss_version(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let Some(start) = text.find("<rss") else {
        return if text.contains("<rdf:RDF") {
            "1.0".to_owned()
        } else {
            String::new()
        };
    };
    let tag = &text[start..];
    let tag = &tag[..tag.find('>').unwrap_or(tag.len())];
    let Some(pos) = tag.find("version=") else {
        return String::new();
    };
    let value = &tag[pos + "version=".len()..];
    let Some(quote) = value.chars().next().filter(|c| *c == '"' || *c == '\'') else {
        return String::new();
    };
    let value = &value[1..];
    value
        .find(quote)
        .map(|end| value[..end].to_owned())
        .unwrap_or_default()
}
