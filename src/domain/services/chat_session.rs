#[cfg(test)]
#[path = "chat_session_test.rs"]
mod tests;

use std::sync::Arc;

use anyhow::bail;
use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::ChatStore;
use super::PopState;
use super::Subscription;
use super::UrlParams;
use super::CHAT_ID_PARAM;
use crate::domain::models::Attachment;
use crate::domain::models::Author;
use crate::domain::models::BackendBox;
use crate::domain::models::BackendFailure;
use crate::domain::models::BackendPrompt;
use crate::domain::models::BackendResponse;
use crate::domain::models::Chat;
use crate::domain::models::ChatAction;
use crate::domain::models::ChatEvent;
use crate::domain::models::ChatMessage;
use crate::domain::models::Event;
use crate::domain::models::Toast;

/// Something outside the session changed: another view touched a chat, or
/// the user moved through history.
#[derive(Debug)]
pub enum Signal {
    Chat(ChatEvent),
    PopState(PopState),
}

struct PendingReply {
    generation: u64,
    token: CancellationToken,
}

/// The state behind one mounted chat view. Replies are produced on a
/// background task and delivered back through the `Event` channel; a reply
/// is only applied if it still belongs to the request the session is waiting
/// on.
pub struct ChatSession {
    pub chat: Chat,
    pub waiting_for_backend: bool,
    store: ChatStore,
    params: Arc<UrlParams>,
    backend: BackendBox,
    tx: mpsc::UnboundedSender<Event>,
    chat_events: Subscription,
    pop_states: mpsc::UnboundedReceiver<PopState>,
    pending: Option<PendingReply>,
    generation: u64,
}

impl ChatSession {
    /// Mounts on whatever chat the `id` parameter names. A missing record
    /// becomes an empty chat under that id; no parameter means a transient
    /// chat.
    pub fn mount(
        store: ChatStore,
        params: Arc<UrlParams>,
        backend: BackendBox,
        tx: mpsc::UnboundedSender<Event>,
    ) -> ChatSession {
        let chat_events = store.notifier().subscribe();
        let pop_states = params.subscribe();

        let mut session = ChatSession {
            chat: Chat::transient(),
            waiting_for_backend: false,
            store,
            params,
            backend,
            tx,
            chat_events,
            pop_states,
            pending: None,
            generation: 0,
        };

        session.load_active();
        return session;
    }

    fn load_active(&mut self) {
        self.chat = match self.params.active_chat_id() {
            Some(id) => self.store.load(&id).unwrap_or_else(|| return Chat::new(&id)),
            None => Chat::transient(),
        };
        self.chat_events.set_chat(&self.chat.id);

        tracing::debug!(
            chat_id = %self.chat.id,
            messages = self.chat.len(),
            "Mounted chat"
        );
    }

    /// Appends a user message, persists, and asks the backend for a reply.
    /// Returns false when the input was ignored.
    pub fn send_message(&mut self, text: &str, attachments: Vec<Attachment>) -> Result<bool> {
        if text.trim().is_empty() && attachments.is_empty() {
            return Ok(false);
        }
        if self.waiting_for_backend {
            tracing::debug!(chat_id = %self.chat.id, "Ignoring input while waiting for reply");
            return Ok(false);
        }

        let created = self.chat.is_transient();
        if created {
            self.chat.id = ChatStore::create_id();
            self.params.set(CHAT_ID_PARAM, &self.chat.id);
            self.chat_events.set_chat(&self.chat.id);
        }

        let prompt = BackendPrompt::new(text, &attachments);
        self.chat
            .push(ChatMessage::new(Author::User, text).with_files(attachments));
        self.store.save(&self.chat)?;

        if created {
            self.store
                .notifier()
                .emit_with_chat(&self.chat.id, ChatAction::Create, self.chat.clone());
        }

        self.request_reply(prompt);
        return Ok(true);
    }

    /// Rewrites the user message at `index`, drops everything after it, and
    /// asks for a fresh reply.
    pub fn edit_message(&mut self, index: usize, content: &str) -> Result<()> {
        if content.trim().is_empty() {
            bail!("Edited message can't be empty");
        }

        let edited = self.chat.edit_message(index, content)?;
        let prompt = BackendPrompt::new(&edited.content, edited.attachments());

        self.cancel_pending();
        self.store.save(&self.chat)?;
        self.request_reply(prompt);

        return Ok(());
    }

    /// Opens another chat as a new history entry.
    pub fn navigate(&mut self, chat_id: &str) {
        if chat_id == self.chat.id {
            return;
        }

        self.cancel_pending();
        self.params.push_param(CHAT_ID_PARAM, chat_id);
        self.store.notifier().emit(chat_id, ChatAction::Navigate);
        self.load_active();
    }

    pub fn new_chat(&mut self) {
        self.cancel_pending();
        self.params.remove(CHAT_ID_PARAM);
        self.load_active();
    }

    pub fn handle_event(&mut self, event: Event) -> Result<Option<Toast>> {
        match event {
            Event::BackendPromptResponse(res) => {
                self.apply_reply(res)?;
                return Ok(None);
            }
            Event::BackendFailure(failure) => {
                if !self.is_current(&failure.chat_id, failure.generation) {
                    return Ok(None);
                }

                self.pending = None;
                self.waiting_for_backend = false;
                return Ok(Some(Toast::error(&format!(
                    "The assistant couldn't reply: {}",
                    failure.message
                ))));
            }
        }
    }

    pub async fn next_signal(&mut self) -> Option<Signal> {
        tokio::select! {
            event = self.chat_events.next() => return event.map(Signal::Chat),
            state = self.pop_states.recv() => return state.map(Signal::PopState),
        }
    }

    pub fn handle_signal(&mut self, signal: Signal) -> bool {
        match signal {
            Signal::Chat(event) => return self.on_chat_event(event),
            Signal::PopState(state) => {
                self.on_pop_state(&state);
                return true;
            }
        }
    }

    /// Refreshes from storage when another view changed the displayed chat.
    /// Returns true when the chat was replaced.
    pub fn on_chat_event(&mut self, event: ChatEvent) -> bool {
        if event.chat_id != self.chat.id {
            return false;
        }

        // Storage holds the newest copy; the chat carried by `create` is only
        // a snapshot from when it was emitted.
        let next = self.store.load(&event.chat_id).or(event.new_chat);

        if let Some(chat) = next {
            if chat != self.chat {
                self.chat = chat;
                return true;
            }
        }

        return false;
    }

    pub fn on_pop_state(&mut self, state: &PopState) {
        tracing::debug!(url = %state.url, "Reloading chat after history change");

        if self.params.active_chat_id().unwrap_or_default() != self.chat.id {
            self.cancel_pending();
        }
        self.load_active();
    }

    /// Stops the in-flight reply, if any. Its result is never delivered.
    pub fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            tracing::debug!(generation = pending.generation, "Cancelling pending reply");
            pending.token.cancel();
        }
        self.waiting_for_backend = false;
    }

    fn is_current(&self, chat_id: &str, generation: u64) -> bool {
        if chat_id != self.chat.id {
            return false;
        }

        return self
            .pending
            .as_ref()
            .map(|pending| return pending.generation == generation)
            .unwrap_or(false);
    }

    fn apply_reply(&mut self, res: BackendResponse) -> Result<bool> {
        if !self.is_current(&res.chat_id, res.generation) {
            tracing::debug!(
                chat_id = %res.chat_id,
                generation = res.generation,
                "Dropping stale reply"
            );
            return Ok(false);
        }

        self.pending = None;
        self.waiting_for_backend = false;
        self.chat
            .push(ChatMessage::new(Author::Assistant, &res.text));
        self.store.save(&self.chat)?;

        return Ok(true);
    }

    fn request_reply(&mut self, prompt: BackendPrompt) {
        self.cancel_pending();
        self.generation += 1;

        let generation = self.generation;
        let chat_id = self.chat.id.to_string();
        let token = CancellationToken::new();
        let worker_token = token.clone();
        let backend = self.backend.clone();
        let worker_tx = self.tx.clone();

        tokio::spawn(async move {
            let res = tokio::select! {
                _ = worker_token.cancelled() => {
                    tracing::debug!(chat_id = %chat_id, generation, "Reply cancelled");
                    return;
                }
                res = backend.get_completion(prompt) => res,
            };

            let event = match res {
                Ok(text) => {
                    Event::BackendPromptResponse(BackendResponse {
                        chat_id,
                        generation,
                        text,
                    })
                }
                Err(err) => {
                    tracing::error!(error = ?err, "Backend failed to reply");
                    Event::BackendFailure(BackendFailure {
                        chat_id,
                        generation,
                        message: err.to_string(),
                    })
                }
            };

            if worker_tx.send(event).is_err() {
                tracing::debug!(generation, "Session gone before reply arrived");
            }
        });

        self.pending = Some(PendingReply { generation, token });
        self.waiting_for_backend = true;
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
