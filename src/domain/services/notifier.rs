#[cfg(test)]
#[path = "notifier_test.rs"]
mod tests;

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::domain::models::Chat;
use crate::domain::models::ChatAction;
use crate::domain::models::ChatEvent;

/// In-process broadcast of chat mutations. Every subscription alive at emit
/// time receives each event exactly once; nothing is replayed to
/// subscriptions created afterwards.
#[derive(Default)]
pub struct Notifier {
    next_id: AtomicU64,
    subscribers: DashMap<u64, mpsc::UnboundedSender<ChatEvent>>,
}

impl Notifier {
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel::<ChatEvent>();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.insert(id, tx);

        return Subscription { chat_id: None, rx };
    }

    pub fn emit(&self, chat_id: &str, action: ChatAction) {
        self.publish(ChatEvent::new(chat_id, action));
    }

    pub fn emit_with_chat(&self, chat_id: &str, action: ChatAction, chat: Chat) {
        self.publish(ChatEvent::new(chat_id, action).with_chat(chat));
    }

    pub fn publish(&self, event: ChatEvent) {
        tracing::debug!(chat_id = %event.chat_id, action = %event.action, "Chat event");

        let mut closed: Vec<u64> = vec![];
        for entry in self.subscribers.iter() {
            if entry.value().send(event.clone()).is_err() {
                closed.push(*entry.key());
            }
        }

        for id in closed {
            self.subscribers.remove(&id);
        }
    }

    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        return self
            .subscribers
            .iter()
            .filter(|entry| return !entry.value().is_closed())
            .count();
    }
}

/// Receiving end of a [`Notifier`]. When bound to a chat id, events for any
/// other chat are skipped.
pub struct Subscription {
    chat_id: Option<String>,
    rx: mpsc::UnboundedReceiver<ChatEvent>,
}

impl Subscription {
    #[cfg(test)]
    pub fn for_chat(mut self, chat_id: &str) -> Subscription {
        self.set_chat(chat_id);
        return self;
    }

    pub fn set_chat(&mut self, chat_id: &str) {
        self.chat_id = Some(chat_id.to_string());
    }

    pub fn matches(&self, event: &ChatEvent) -> bool {
        if let Some(chat_id) = &self.chat_id {
            return chat_id == &event.chat_id;
        }

        return true;
    }

    pub async fn next(&mut self) -> Option<ChatEvent> {
        while let Some(event) = self.rx.recv().await {
            if self.matches(&event) {
                return Some(event);
            }
        }

        return None;
    }

    pub fn try_next(&mut self) -> Option<ChatEvent> {
        while let Ok(event) = self.rx.try_recv() {
            if self.matches(&event) {
                return Some(event);
            }
        }

        return None;
    }
}
