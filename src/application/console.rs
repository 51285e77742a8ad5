#[cfg(test)]
#[path = "console_test.rs"]
mod tests;

use std::path;
use std::sync::Arc;

use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use yansi::Paint;

use crate::domain::models::Attachment;
use crate::domain::models::Author;
use crate::domain::models::Chat;
use crate::domain::models::ChatMessage;
use crate::domain::models::Event;
use crate::domain::models::SlashCommand;
use crate::domain::models::Toast;
use crate::domain::models::ToastLevel;
use crate::domain::services::ChatSession;
use crate::domain::services::UrlParams;

const LINE_WIDTH: usize = 80;

pub fn help_text() -> String {
    let text = r#"
COMMANDS:
- /edit (/e) [MESSAGE_NUMBER] [TEXT] - Replaces one of your messages, drops everything after it, and asks for a new reply.
- /attach (/a) [PATH] - Attaches a file to your next message. Only its name, size, and type are stored.
- /new (/n) - Starts a new chat. It is saved once you send the first message.
- /open (/o) [CHAT_ID] - Opens a stored chat.
- /back (/b) - Returns to the previously opened chat.
- /forward (/f) - Moves forward again after /back.
- /show (/s) - Prints the current chat.
- /quit /exit (/q) - Exit.
- /help (/h) - Provides this help menu.
        "#;

    return text.trim().to_string();
}

enum Flow {
    Continue,
    Quit,
}

fn role_label(role: Author) -> String {
    return match role {
        Author::User => Paint::cyan("You").bold().to_string(),
        Author::Assistant => Paint::green("Assistant").bold().to_string(),
    };
}

pub fn render_message(number: usize, message: &ChatMessage) -> String {
    let mut header = format!("[{number}] {}", role_label(message.role));
    if message.is_edited() {
        header = format!("{header} {}", Paint::new("(edited)").dimmed());
    }

    let mut lines = vec![header];
    for attachment in message.attachments() {
        lines.push(format!(
            "    {}",
            Paint::new(format!(
                "file: {} ({}, {} bytes)",
                attachment.name, attachment.media_type, attachment.size
            ))
            .dimmed()
        ));
    }
    for line in message.as_string_lines(LINE_WIDTH) {
        lines.push(format!("    {line}"));
    }

    return lines.join("\n");
}

pub fn render_chat(chat: &Chat) -> String {
    let mut title = chat.title.to_string();
    if !chat.is_transient() {
        title = format!("{title} ({})", chat.id);
    }

    let mut sections = vec![Paint::new(title).underline().bold().to_string()];
    if chat.is_empty() {
        sections.push(
            Paint::new("No messages yet. Type to start chatting, or /help for commands.")
                .dimmed()
                .to_string(),
        );
    }

    for (idx, message) in chat.messages.iter().enumerate() {
        sections.push(render_message(idx + 1, message));
    }

    return sections.join("\n\n");
}

pub fn render_toast(toast: &Toast) -> String {
    return match toast.level {
        ToastLevel::Info => Paint::yellow(&toast.message).to_string(),
        ToastLevel::Error => Paint::red(&toast.message).bold().to_string(),
    };
}

/// Splits `/edit N TEXT` into a zero based message index and the new text.
pub fn parse_edit(command: &SlashCommand) -> Result<(usize, String)> {
    let Some(number) = command.args.first() else {
        bail!("Usage: /edit [MESSAGE_NUMBER] [TEXT]");
    };

    let number = number
        .parse::<usize>()
        .with_context(|| return format!("{number} is not a message number"))?;
    if number == 0 {
        bail!("Message numbers start at 1");
    }

    return Ok((number - 1, command.rest()));
}

async fn read_attachment(file_path: &str) -> Result<Attachment> {
    let file_path = path::PathBuf::from(file_path);
    let metadata = tokio::fs::metadata(&file_path)
        .await
        .with_context(|| return format!("Failed to read {}", file_path.display()))?;
    if !metadata.is_file() {
        bail!(format!("{} is not a file", file_path.display()));
    }

    let name = file_path
        .file_name()
        .map(|name| return name.to_string_lossy().to_string())
        .unwrap_or_default();

    return Ok(Attachment::new(
        &name,
        metadata.len(),
        &Attachment::media_type_for(&file_path),
    ));
}

async fn handle_command(
    session: &mut ChatSession,
    params: &UrlParams,
    attachments: &mut Vec<Attachment>,
    command: SlashCommand,
) -> Result<Flow> {
    if command.is_quit() {
        return Ok(Flow::Quit);
    }

    if command.is_help() {
        println!("{}", help_text());
    } else if command.is_edit() {
        let (index, text) = parse_edit(&command)?;
        session.edit_message(index, &text)?;
        println!("{}", render_chat(&session.chat));
    } else if command.is_attach() {
        if command.args.is_empty() {
            bail!("Usage: /attach [PATH]");
        }
        let attachment = read_attachment(&command.args.join(" ")).await?;
        println!(
            "{}",
            render_toast(&Toast::info(&format!(
                "Attached {}. It will be sent with your next message.",
                attachment.name
            )))
        );
        attachments.push(attachment);
    } else if command.is_new_chat() {
        attachments.clear();
        session.new_chat();
        println!("{}", render_chat(&session.chat));
    } else if command.is_open() {
        let Some(chat_id) = command.args.first() else {
            bail!("Usage: /open [CHAT_ID]");
        };
        session.navigate(chat_id);
        println!("{}", render_chat(&session.chat));
    } else if command.is_back() {
        if !params.back() {
            println!("{}", render_toast(&Toast::info("Nothing to go back to.")));
        }
    } else if command.is_forward() {
        if !params.forward() {
            println!("{}", render_toast(&Toast::info("Nothing to go forward to.")));
        }
    } else if command.is_show() {
        println!("{}", render_chat(&session.chat));
    }

    return Ok(Flow::Continue);
}

async fn handle_input(
    session: &mut ChatSession,
    params: &UrlParams,
    attachments: &mut Vec<Attachment>,
    input: &str,
) -> Result<Flow> {
    if let Some(command) = SlashCommand::parse(input) {
        return handle_command(session, params, attachments, command).await;
    }

    if session.waiting_for_backend {
        println!(
            "{}",
            render_toast(&Toast::info("Still waiting for the assistant to reply."))
        );
        return Ok(Flow::Continue);
    }

    let files = std::mem::take(attachments);
    let number = session.chat.len() + 1;
    if session.send_message(input, files.clone())? {
        if let Some(message) = session.chat.last_message() {
            println!("{}", render_message(number, message));
        }
        println!("{}", Paint::new("Assistant is typing...").dimmed());
    } else {
        attachments.extend(files);
    }

    return Ok(Flow::Continue);
}

/// Runs the interactive chat until stdin closes or the user quits.
pub async fn start(
    mut session: ChatSession,
    params: Arc<UrlParams>,
    mut rx: mpsc::UnboundedReceiver<Event>,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut attachments: Vec<Attachment> = vec![];

    println!("{}", render_chat(&session.chat));

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };

                match handle_input(&mut session, &params, &mut attachments, line.trim()).await {
                    Ok(Flow::Quit) => break,
                    Ok(Flow::Continue) => {}
                    Err(err) => {
                        println!("{}", render_toast(&Toast::error(&err.to_string())));
                    }
                }
            }
            Some(event) = rx.recv() => {
                let before = session.chat.len();
                match session.handle_event(event) {
                    Ok(Some(toast)) => println!("{}", render_toast(&toast)),
                    Ok(None) => {
                        if session.chat.len() > before {
                            if let Some(message) = session.chat.last_message() {
                                println!("{}", render_message(session.chat.len(), message));
                            }
                        }
                    }
                    Err(err) => {
                        println!("{}", render_toast(&Toast::error(&err.to_string())));
                    }
                }
            }
            Some(signal) = session.next_signal() => {
                if session.handle_signal(signal) {
                    println!("{}", render_chat(&session.chat));
                }
            }
        }
    }

    return Ok(());
}
