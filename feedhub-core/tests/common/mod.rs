#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use feedhub_core::{FeedDocument, FeedFetcher, FeedItem, FetchError};

pub fn doc(title: &str) -> FeedDocument {
    FeedDocument {
        title: title.to_owned(),
        items: vec![FeedItem {
            title: format!("{title} item"),
            ..Default::default()
        }],
        ..Default::default()
    }
}

pub fn failure() -> FetchError {
    FetchError::Status(reqwest::StatusCode::BAD_GATEWAY)
}

/// Replays queued results per url; an exhausted or unknown url fails.
#[derive(Default)]
pub struct ScriptedFetcher {
    script: Mutex<HashMap<String, VecDeque<Result<FeedDocument, FetchError>>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn push(&self, url: &str, result: Result<FeedDocument, FetchError>) {
        self.script
            .lock()
            .unwrap()
            .entry(url.to_owned())
            .or_default()
            .push_back(result);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<FeedDocument, FetchError> {
        self.calls.lock().unwrap().push(url.to_owned());
        self.script
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(failure()))
    }
}
