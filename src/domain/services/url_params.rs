#[cfg(test)]
#[path = "url_params_test.rs"]
mod tests;

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use anyhow::Result;
use dashmap::DashMap;
use tokio::sync::mpsc;
use url::Url;

pub const CHAT_ID_PARAM: &str = "id";

/// Sent to subscribers when back/forward moves to another history entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PopState {
    pub url: Url,
}

struct History {
    entries: Vec<Url>,
    index: usize,
}

impl History {
    fn current(&self) -> &Url {
        return &self.entries[self.index];
    }

    fn current_mut(&mut self) -> &mut Url {
        return &mut self.entries[self.index];
    }
}

/// The page location and its session history. Query parameters are the
/// source of truth for which chat is active.
pub struct UrlParams {
    history: Mutex<History>,
    next_id: AtomicU64,
    subscribers: DashMap<u64, mpsc::UnboundedSender<PopState>>,
}

impl UrlParams {
    pub fn new(url: &str) -> Result<UrlParams> {
        let url = Url::parse(url)?;

        return Ok(UrlParams {
            history: Mutex::new(History {
                entries: vec![url],
                index: 0,
            }),
            next_id: AtomicU64::new(0),
            subscribers: DashMap::new(),
        });
    }

    fn history(&self) -> MutexGuard<'_, History> {
        return self.history.lock().unwrap_or_else(PoisonError::into_inner);
    }

    pub fn location(&self) -> Url {
        return self.history().current().clone();
    }

    pub fn get(&self, key: &str) -> Option<String> {
        return self
            .history()
            .current()
            .query_pairs()
            .find(|(name, _)| return name == key)
            .map(|(_, value)| return value.to_string());
    }

    /// Sets `key` on the current history entry without adding a new one.
    pub fn set(&self, key: &str, value: &str) {
        let mut history = self.history();
        set_param(history.current_mut(), key, value);
        tracing::debug!(url = %history.current(), "Replaced location");
    }

    pub fn remove(&self, key: &str) {
        let mut history = self.history();
        remove_param(history.current_mut(), key);
        tracing::debug!(url = %history.current(), "Replaced location");
    }

    /// Adds a history entry, dropping any entries ahead of the current one.
    pub fn push(&self, url: Url) {
        let mut history = self.history();
        let next = history.index + 1;
        history.entries.truncate(next);
        history.entries.push(url);
        history.index = next;
        tracing::debug!(url = %history.current(), "Pushed location");
    }

    pub fn push_param(&self, key: &str, value: &str) {
        let mut url = self.location();
        set_param(&mut url, key, value);
        self.push(url);
    }

    pub fn back(&self) -> bool {
        let url = {
            let mut history = self.history();
            if history.index == 0 {
                return false;
            }
            history.index -= 1;
            history.current().clone()
        };

        self.pop_state(url);
        return true;
    }

    pub fn forward(&self) -> bool {
        let url = {
            let mut history = self.history();
            if history.index + 1 >= history.entries.len() {
                return false;
            }
            history.index += 1;
            history.current().clone()
        };

        self.pop_state(url);
        return true;
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<PopState> {
        let (tx, rx) = mpsc::unbounded_channel::<PopState>();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.insert(id, tx);

        return rx;
    }

    /// The chat named by the `id` parameter. An empty value counts as absent.
    pub fn active_chat_id(&self) -> Option<String> {
        return self.get(CHAT_ID_PARAM).filter(|id| return !id.is_empty());
    }

    fn pop_state(&self, url: Url) {
        tracing::debug!(url = %url, "Pop state");

        let mut closed: Vec<u64> = vec![];
        for entry in self.subscribers.iter() {
            let state = PopState { url: url.clone() };
            if entry.value().send(state).is_err() {
                closed.push(*entry.key());
            }
        }

        for id in closed {
            self.subscribers.remove(&id);
        }
    }
}

fn set_param(url: &mut Url, key: &str, value: &str) {
    let mut found = false;
    let mut pairs: Vec<(String, String)> = vec![];
    for (name, current) in url.query_pairs() {
        if name != key {
            pairs.push((name.to_string(), current.to_string()));
            continue;
        }
        if !found {
            pairs.push((name.to_string(), value.to_string()));
            found = true;
        }
    }
    if !found {
        pairs.push((key.to_string(), value.to_string()));
    }

    write_pairs(url, pairs);
}

fn remove_param(url: &mut Url, key: &str) {
    let pairs = url
        .query_pairs()
        .filter(|(name, _)| return name != key)
        .map(|(name, value)| return (name.to_string(), value.to_string()))
        .collect::<Vec<(String, String)>>();

    write_pairs(url, pairs);
}

fn write_pairs(url: &mut Url, pairs: Vec<(String, String)>) {
    if pairs.is_empty() {
        url.set_query(None);
        return;
    }

    url.query_pairs_mut().clear().extend_pairs(pairs);
}
