use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use super::ChatSession;
use super::Signal;
use crate::domain::models::Attachment;
use crate::domain::models::Author;
use crate::domain::models::Backend;
use crate::domain::models::BackendBox;
use crate::domain::models::BackendPrompt;
use crate::domain::models::BackendResponse;
use crate::domain::models::Chat;
use crate::domain::models::ChatAction;
use crate::domain::models::ChatEvent;
use crate::domain::models::ChatMessage;
use crate::domain::models::Event;
use crate::domain::models::KeyValueStore;
use crate::domain::models::ToastLevel;
use crate::domain::services::ChatStore;
use crate::domain::services::Notifier;
use crate::domain::services::UrlParams;
use crate::domain::services::CHAT_ID_PARAM;
use crate::domain::services::DEFAULT_KEY_PREFIX;
use crate::infrastructure::backends::mock::Mock;
use crate::infrastructure::stores::memory::Memory;

struct Failing {}

#[async_trait]
impl Backend for Failing {
    #[allow(clippy::implicit_return)]
    async fn health_check(&self) -> Result<()> {
        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn get_completion(&self, _prompt: BackendPrompt) -> Result<String> {
        bail!("backend unreachable");
    }
}

struct Harness {
    store: ChatStore,
    memory: Arc<Memory>,
    notifier: Arc<Notifier>,
    params: Arc<UrlParams>,
}

impl Harness {
    fn new(url: &str) -> Harness {
        let memory = Arc::new(Memory::default());
        let notifier = Arc::new(Notifier::default());

        return Harness {
            store: ChatStore::new(memory.clone(), notifier.clone(), DEFAULT_KEY_PREFIX),
            memory,
            notifier,
            params: Arc::new(UrlParams::new(url).unwrap()),
        };
    }

    fn mount(&self, backend: BackendBox) -> (ChatSession, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel::<Event>();
        let session = ChatSession::mount(self.store.clone(), self.params.clone(), backend, tx);

        return (session, rx);
    }

    fn seed(&self, id: &str, texts: &[(Author, &str)]) -> Chat {
        let mut chat = Chat::new(id);
        for (author, text) in texts {
            chat.push(ChatMessage::new(*author, text));
        }
        self.store.save(&chat).unwrap();

        return chat;
    }

    fn stored_len(&self, id: &str) -> usize {
        return self.store.load(id).map(|chat| return chat.len()).unwrap_or(0);
    }
}

fn instant() -> BackendBox {
    return Arc::new(Mock::new(Duration::ZERO));
}

fn slow() -> BackendBox {
    return Arc::new(Mock::new(Duration::from_secs(60)));
}

async fn deliver_reply(
    session: &mut ChatSession,
    rx: &mut mpsc::UnboundedReceiver<Event>,
) -> Result<()> {
    let event = rx.recv().await.unwrap();
    let toast = session.handle_event(event)?;
    assert!(toast.is_none());

    return Ok(());
}

mod mount {
    use super::*;

    #[tokio::test]
    async fn it_mounts_transient_without_id() {
        let harness = Harness::new("http://localhost/chat");
        let (session, _rx) = harness.mount(instant());

        assert!(session.chat.is_transient());
        assert!(session.chat.is_empty());
    }

    #[tokio::test]
    async fn it_mounts_an_unsaved_chat_for_unknown_ids() {
        let harness = Harness::new("http://localhost/chat?id=abc");
        let (session, _rx) = harness.mount(instant());

        assert_eq!(session.chat.id, "abc");
        assert!(session.chat.is_empty());
        assert!(harness.memory.is_empty());
    }

    #[tokio::test]
    async fn it_mounts_stored_chats() {
        let harness = Harness::new("http://localhost/chat?id=abc");
        let stored = harness.seed("abc", &[(Author::User, "Hi"), (Author::Assistant, "Hey")]);
        let (session, _rx) = harness.mount(instant());

        assert_eq!(session.chat, stored);
    }

    #[tokio::test]
    async fn it_mounts_fresh_after_corruption() -> Result<()> {
        let harness = Harness::new("http://localhost/chat?id=abc");
        harness.memory.set("chat_abc", "{ nope")?;
        let (session, _rx) = harness.mount(instant());

        assert_eq!(session.chat.id, "abc");
        assert!(session.chat.is_empty());

        return Ok(());
    }
}

mod send {
    use super::*;

    #[tokio::test]
    async fn it_sends_into_an_empty_chat() -> Result<()> {
        let harness = Harness::new("http://localhost/chat?id=abc");
        let (mut session, mut rx) = harness.mount(instant());
        let mut sub = harness.notifier.subscribe().for_chat("abc");

        assert!(session.send_message("Hello", vec![])?);

        assert_eq!(session.chat.len(), 1);
        assert_eq!(session.chat.title, "Hello");
        assert!(session.waiting_for_backend);
        assert_eq!(harness.stored_len("abc"), 1);

        let event = sub.try_next().unwrap();
        assert_eq!(event.action, ChatAction::Save);
        assert!(sub.try_next().is_none());

        deliver_reply(&mut session, &mut rx).await?;

        assert!(!session.waiting_for_backend);
        assert_eq!(session.chat.len(), 2);
        assert_eq!(session.chat.messages[1].role, Author::Assistant);
        assert_eq!(harness.stored_len("abc"), 2);
        assert_eq!(sub.try_next().unwrap().action, ChatAction::Save);

        return Ok(());
    }

    #[tokio::test]
    async fn it_creates_transient_chats_on_first_message() -> Result<()> {
        let harness = Harness::new("http://localhost/chat");
        let (mut session, _rx) = harness.mount(instant());
        let mut sub = harness.notifier.subscribe();

        session.send_message("Plan my week", vec![])?;

        let id = session.chat.id.to_string();
        assert!(!id.is_empty());
        assert_eq!(harness.params.get(CHAT_ID_PARAM), Some(id.to_string()));
        assert!(!harness.params.back());
        assert_eq!(harness.stored_len(&id), 1);

        let saved = sub.try_next().unwrap();
        assert_eq!(saved.action, ChatAction::Save);
        let created = sub.try_next().unwrap();
        assert_eq!(created.action, ChatAction::Create);
        assert_eq!(created.chat_id, id);
        assert_eq!(created.new_chat.unwrap().len(), 1);

        return Ok(());
    }

    #[tokio::test]
    async fn it_keeps_attachments() -> Result<()> {
        let harness = Harness::new("http://localhost/chat?id=abc");
        let (mut session, mut rx) = harness.mount(instant());

        session.send_message(
            "",
            vec![Attachment::new("q1.csv", 2048, "text/csv")],
        )?;
        assert_eq!(session.chat.messages[0].attachments().len(), 1);

        deliver_reply(&mut session, &mut rx).await?;
        assert!(session.chat.messages[1]
            .content
            .starts_with("I've received 1 file: q1.csv."));

        let stored = harness.store.load("abc").unwrap();
        assert_eq!(stored.messages[0].attachments()[0].name, "q1.csv");

        return Ok(());
    }

    #[tokio::test]
    async fn it_ignores_blank_input() -> Result<()> {
        let harness = Harness::new("http://localhost/chat");
        let (mut session, _rx) = harness.mount(instant());

        assert!(!session.send_message("   ", vec![])?);
        assert!(session.chat.is_transient());
        assert!(harness.memory.is_empty());

        return Ok(());
    }

    #[tokio::test]
    async fn it_ignores_input_while_waiting() -> Result<()> {
        let harness = Harness::new("http://localhost/chat?id=abc");
        let (mut session, _rx) = harness.mount(slow());

        assert!(session.send_message("first", vec![])?);
        assert!(!session.send_message("second", vec![])?);
        assert_eq!(session.chat.len(), 1);

        return Ok(());
    }

    #[tokio::test]
    async fn it_reports_backend_failures() -> Result<()> {
        let harness = Harness::new("http://localhost/chat?id=abc");
        let (mut session, mut rx) = harness.mount(Arc::new(Failing {}));

        session.send_message("Hello", vec![])?;
        let toast = session.handle_event(rx.recv().await.unwrap())?.unwrap();

        assert_eq!(toast.level, ToastLevel::Error);
        assert_eq!(toast.message, "The assistant couldn't reply: backend unreachable");
        assert!(!session.waiting_for_backend);
        assert_eq!(session.chat.len(), 1);

        return Ok(());
    }
}

mod edit {
    use super::*;

    #[tokio::test]
    async fn it_truncates_before_replying() -> Result<()> {
        let harness = Harness::new("http://localhost/chat?id=abc");
        harness.seed(
            "abc",
            &[
                (Author::User, "first"),
                (Author::Assistant, "second"),
                (Author::User, "third"),
            ],
        );
        let (mut session, mut rx) = harness.mount(instant());

        session.edit_message(0, "first, reworded")?;

        assert_eq!(session.chat.len(), 1);
        assert_eq!(harness.stored_len("abc"), 1);
        let stored = harness.store.load("abc").unwrap();
        assert_eq!(stored.messages[0].content, "first, reworded");
        assert!(stored.messages[0].is_edited());

        deliver_reply(&mut session, &mut rx).await?;

        assert_eq!(session.chat.len(), 2);
        assert_eq!(harness.stored_len("abc"), 2);

        return Ok(());
    }

    #[tokio::test]
    async fn it_rejects_invalid_edits() {
        let harness = Harness::new("http://localhost/chat?id=abc");
        harness.seed("abc", &[(Author::User, "hi"), (Author::Assistant, "hello")]);
        let (mut session, _rx) = harness.mount(instant());

        assert!(session.edit_message(1, "rewrite the assistant").is_err());
        assert!(session.edit_message(5, "out of range").is_err());
        assert!(session.edit_message(0, "  ").is_err());
        assert!(!session.waiting_for_backend);
        assert_eq!(harness.stored_len("abc"), 2);
    }
}

mod replies {
    use super::*;

    #[tokio::test]
    async fn it_drops_stale_generations() -> Result<()> {
        let harness = Harness::new("http://localhost/chat?id=abc");
        let (mut session, _rx) = harness.mount(slow());
        session.send_message("Hello", vec![])?;

        session.handle_event(Event::BackendPromptResponse(BackendResponse {
            chat_id: "abc".to_string(),
            generation: 42,
            text: "from an older request".to_string(),
        }))?;

        assert_eq!(session.chat.len(), 1);
        assert!(session.waiting_for_backend);

        return Ok(());
    }

    #[tokio::test]
    async fn it_drops_replies_for_other_chats() -> Result<()> {
        let harness = Harness::new("http://localhost/chat?id=abc");
        let (mut session, _rx) = harness.mount(slow());
        session.send_message("Hello", vec![])?;

        session.handle_event(Event::BackendPromptResponse(BackendResponse {
            chat_id: "xyz".to_string(),
            generation: 1,
            text: "wrong chat".to_string(),
        }))?;

        assert_eq!(session.chat.len(), 1);
        assert_eq!(harness.stored_len("xyz"), 0);

        return Ok(());
    }

    #[tokio::test]
    async fn it_never_delivers_after_unmount() -> Result<()> {
        let harness = Harness::new("http://localhost/chat?id=abc");
        let (mut session, mut rx) = harness.mount(slow());
        session.send_message("Hello", vec![])?;

        drop(session);

        assert!(rx.recv().await.is_none());
        assert_eq!(harness.stored_len("abc"), 1);

        return Ok(());
    }

    #[tokio::test]
    async fn it_cancels_when_navigating_away() -> Result<()> {
        let harness = Harness::new("http://localhost/chat?id=abc");
        let (mut session, _rx) = harness.mount(slow());
        session.send_message("Hello", vec![])?;
        let generation = session.generation;

        session.navigate("xyz");
        assert!(!session.waiting_for_backend);

        session.handle_event(Event::BackendPromptResponse(BackendResponse {
            chat_id: "abc".to_string(),
            generation,
            text: "late".to_string(),
        }))?;
        assert_eq!(harness.stored_len("abc"), 1);

        return Ok(());
    }
}

mod views {
    use super::*;

    #[tokio::test]
    async fn it_navigates_and_goes_back() -> Result<()> {
        let harness = Harness::new("http://localhost/chat?id=abc");
        harness.seed("abc", &[(Author::User, "about abc")]);
        harness.seed("xyz", &[(Author::User, "about xyz")]);
        let (mut session, _rx) = harness.mount(instant());
        let mut sub = harness.notifier.subscribe().for_chat("xyz");

        session.navigate("xyz");

        assert_eq!(session.chat.id, "xyz");
        assert_eq!(harness.params.active_chat_id(), Some("xyz".to_string()));
        assert_eq!(sub.try_next().unwrap().action, ChatAction::Navigate);

        assert!(harness.params.back());
        loop {
            match session.next_signal().await.unwrap() {
                Signal::PopState(state) => {
                    assert_eq!(state.url.as_str(), "http://localhost/chat?id=abc");
                    session.handle_signal(Signal::PopState(state));
                    break;
                }
                other => {
                    session.handle_signal(other);
                }
            }
        }

        assert_eq!(session.chat.id, "abc");
        assert_eq!(session.chat.messages[0].content, "about abc");

        return Ok(());
    }

    #[tokio::test]
    async fn it_ignores_navigating_to_the_open_chat() -> Result<()> {
        let harness = Harness::new("http://localhost/chat?id=abc");
        let (mut session, _rx) = harness.mount(slow());
        session.send_message("Hello", vec![])?;
        let mut sub = harness.notifier.subscribe().for_chat("abc");

        session.navigate("abc");

        assert!(session.waiting_for_backend);
        assert!(sub.try_next().is_none());
        assert!(!harness.params.back());

        return Ok(());
    }

    #[tokio::test]
    async fn it_adopts_created_chats_missing_from_storage() {
        let harness = Harness::new("http://localhost/chat?id=fresh");
        let (mut session, _rx) = harness.mount(instant());

        let mut created = Chat::new("fresh");
        created.push(ChatMessage::new(Author::User, "Made in another view"));
        let changed = session.on_chat_event(
            ChatEvent::new("fresh", ChatAction::Create).with_chat(created.clone()),
        );

        assert!(changed);
        assert_eq!(session.chat, created);
    }

    #[tokio::test]
    async fn it_prefers_storage_over_created_snapshots() {
        let harness = Harness::new("http://localhost/chat?id=fresh");
        let (mut session, _rx) = harness.mount(instant());
        let stored = harness.seed(
            "fresh",
            &[(Author::User, "Made in another view"), (Author::Assistant, "Reply")],
        );

        let mut snapshot = Chat::new("fresh");
        snapshot.push(ChatMessage::new(Author::User, "Made in another view"));
        let changed =
            session.on_chat_event(ChatEvent::new("fresh", ChatAction::Create).with_chat(snapshot));

        assert!(changed);
        assert_eq!(session.chat, stored);
        assert_eq!(session.chat.len(), 2);
    }

    #[tokio::test]
    async fn it_refreshes_when_another_view_saves() -> Result<()> {
        let harness = Harness::new("http://localhost/chat?id=abc");
        let (mut watcher, _watcher_rx) = harness.mount(instant());
        let (mut writer, _writer_rx) = harness.mount(instant());

        writer.send_message("Hello from the other view", vec![])?;

        let signal = watcher.next_signal().await.unwrap();
        assert!(watcher.handle_signal(signal));
        assert_eq!(watcher.chat.len(), 1);
        assert_eq!(watcher.chat.messages[0].content, "Hello from the other view");

        return Ok(());
    }

    #[tokio::test]
    async fn it_ignores_events_for_other_chats() {
        let harness = Harness::new("http://localhost/chat?id=abc");
        let (mut session, _rx) = harness.mount(instant());
        harness.seed("xyz", &[(Author::User, "elsewhere")]);

        let changed = session.on_chat_event(ChatEvent::new(
            "xyz",
            ChatAction::Save,
        ));

        assert!(!changed);
        assert_eq!(session.chat.id, "abc");
        assert!(session.chat.is_empty());
    }

    #[tokio::test]
    async fn it_starts_a_new_chat() -> Result<()> {
        let harness = Harness::new("http://localhost/chat?id=abc");
        harness.seed("abc", &[(Author::User, "about abc")]);
        let (mut session, _rx) = harness.mount(slow());
        session.send_message("more", vec![])?;

        session.new_chat();

        assert!(session.chat.is_transient());
        assert!(!session.waiting_for_backend);
        assert_eq!(harness.params.get(CHAT_ID_PARAM), None);

        return Ok(());
    }
}
