#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;

use std::io;
use std::path;
use std::sync::Arc;

use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use clap::builder::PossibleValuesParser;
use clap::value_parser;
use clap::Arg;
use clap::ArgAction;
use clap::Command;
use clap_complete::generate;
use clap_complete::Generator;
use clap_complete::Shell;
use strum::VariantNames;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use yansi::Paint;

use super::console::help_text;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::StorageName;
use crate::domain::services::ChatStore;
use crate::domain::services::Notifier;
use crate::infrastructure::stores::StoreManager;

fn print_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
    std::process::exit(0);
}

/// Builds the chat store described by the loaded configuration.
pub fn chat_store() -> Result<ChatStore> {
    let storage_name = Config::get(ConfigKey::Storage);
    let Some(storage) = StorageName::parse(storage_name.to_string()) else {
        bail!(format!("No storage implemented for {storage_name}"));
    };

    let store = StoreManager::get(storage, &Config::get(ConfigKey::StorageDir));
    return Ok(ChatStore::new(
        store,
        Arc::new(Notifier::default()),
        &Config::get(ConfigKey::KeyPrefix),
    ));
}

fn validate_config() -> Result<()> {
    Config::get(ConfigKey::ReplyDelay)
        .parse::<u64>()
        .with_context(|| {
            return format!(
                "{} must be a whole number of milliseconds",
                ConfigKey::ReplyDelay
            );
        })?;

    url::Url::parse(&Config::get(ConfigKey::Url))
        .with_context(|| return format!("{} must be an absolute URL", ConfigKey::Url))?;

    return Ok(());
}

async fn create_config_file() -> Result<()> {
    let config_file_path_str = Config::default(ConfigKey::ConfigFile);
    let config_file_path = path::PathBuf::from(&config_file_path_str);
    if config_file_path.exists() {
        bail!(format!(
            "Config file already exists at {config_file_path_str}"
        ));
    }

    if let Some(parent) = config_file_path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    let mut file = fs::File::create(&config_file_path).await?;
    file.write_all(Config::serialize_default(build()).as_bytes())
        .await?;

    println!("Created default config file at {config_file_path_str}");
    return Ok(());
}

async fn print_chat(chat_id: &str) -> Result<()> {
    let Some(chat) = chat_store()?.load(chat_id) else {
        bail!(format!("No chat found for id {chat_id}"));
    };

    println!("{}", serde_json::to_string_pretty(&chat)?);
    return Ok(());
}

/// Removes a stored chat. Unlike `ChatStore::delete`, a missing record is an
/// error so the user learns about a mistyped id.
fn delete_chat(store: &ChatStore, chat_id: &str) -> Result<()> {
    if !store.exists(chat_id)? {
        bail!(format!("No chat found for id {chat_id}"));
    }

    store.delete(chat_id)?;
    return Ok(());
}

fn arg_chat_id(required: bool) -> Arg {
    return Arg::new(ConfigKey::ChatID.to_string())
        .short('i')
        .long("id")
        .help("Chat ID")
        .num_args(1)
        .required(required);
}

fn subcommand_chat() -> Command {
    return Command::new("chat")
        .about("Open a chat. Omit the ID to start a new one.")
        .arg(arg_chat_id(false));
}

fn subcommand_completions() -> Command {
    return Command::new("completions")
        .about("Generates shell completions.")
        .arg(
            clap::Arg::new("shell")
                .short('s')
                .long("shell")
                .help("Which shell to generate completions for.")
                .action(ArgAction::Set)
                .value_parser(value_parser!(Shell))
                .required(true),
        );
}

fn subcommand_config() -> Command {
    return Command::new("config")
        .about("Configuration file options.")
        .subcommand(
            Command::new("create").about("Saves the default config file to the configuration file path. This command will fail if the file exists already.")
        )
        .subcommand(
            Command::new("default").about("Outputs the default configuration file to stdout.")
        )
        .subcommand(
            Command::new("path").about("Returns the default path for the configuration file.")
        );
}

fn subcommand_chats() -> Command {
    return Command::new("chats")
        .about("Manage stored chats.")
        .arg_required_else_help(true)
        .subcommand(Command::new("dir").about("Print the chat storage directory path."))
        .subcommand(
            Command::new("show")
                .about("Print a stored chat as JSON.")
                .arg(arg_chat_id(true)),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete a stored chat.")
                .arg(arg_chat_id(true)),
        );
}

pub fn build() -> Command {
    let commands_text = help_text()
        .split('\n')
        .map(|line| {
            if line.starts_with('-') {
                return format!("  {line}");
            }
            if line.starts_with("COMMANDS:") {
                return Paint::new(format!("CHAT {line}"))
                    .underline()
                    .bold()
                    .to_string();
            }
            return line.to_string();
        })
        .collect::<Vec<String>>()
        .join("\n");

    let about = format!(
        "{}\n\nVersion: {}",
        env!("CARGO_PKG_DESCRIPTION"),
        env!("CARGO_PKG_VERSION"),
    );

    return Command::new("chatkeep")
        .about(about)
        .author(env!("CARGO_PKG_AUTHORS"))
        .version(env!("CARGO_PKG_VERSION"))
        .after_help(commands_text)
        .arg_required_else_help(false)
        .subcommand(subcommand_chat())
        .subcommand(subcommand_chats())
        .subcommand(subcommand_completions())
        .subcommand(subcommand_config())
        .arg(
            Arg::new(ConfigKey::ConfigFile.to_string())
                .short('c')
                .long(ConfigKey::ConfigFile.to_string())
                .env("CHATKEEP_CONFIG_FILE")
                .num_args(1)
                .help(format!("Path to configuration file [default: {}]", Config::default(ConfigKey::ConfigFile)))
                .global(true)
        )
        .arg(
            Arg::new(ConfigKey::Storage.to_string())
                .long(ConfigKey::Storage.to_string())
                .env("CHATKEEP_STORAGE")
                .num_args(1)
                .help(format!("Where chats are persisted. [default: {}]", Config::default(ConfigKey::Storage)))
                .value_parser(PossibleValuesParser::new(StorageName::VARIANTS))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::StorageDir.to_string())
                .long(ConfigKey::StorageDir.to_string())
                .env("CHATKEEP_STORAGE_DIR")
                .num_args(1)
                .help(format!("Directory holding one JSON file per chat when using file storage. [default: {}]", Config::default(ConfigKey::StorageDir)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::KeyPrefix.to_string())
                .long(ConfigKey::KeyPrefix.to_string())
                .env("CHATKEEP_KEY_PREFIX")
                .num_args(1)
                .help(format!("Prefix added to chat ids to form storage keys. [default: {}]", Config::default(ConfigKey::KeyPrefix)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::ReplyDelay.to_string())
                .long(ConfigKey::ReplyDelay.to_string())
                .env("CHATKEEP_REPLY_DELAY")
                .num_args(1)
                .help(format!("Milliseconds the mock assistant waits before replying. [default: {}]", Config::default(ConfigKey::ReplyDelay)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::Url.to_string())
                .long(ConfigKey::Url.to_string())
                .env("CHATKEEP_URL")
                .num_args(1)
                .help(format!("Page location the chat view starts on. An `id` query parameter opens that chat. [default: {}]", Config::default(ConfigKey::Url)))
                .global(true),
        );
}

/// Handles every subcommand that doesn't open a chat. Returns true when the
/// caller should go on to start the chat console.
pub async fn parse() -> Result<bool> {
    let matches = build().get_matches();

    match matches.subcommand() {
        Some(("chat", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
        }
        Some(("chats", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
            validate_config()?;

            match subcmd_matches.subcommand() {
                Some(("dir", _)) => {
                    println!("{}", Config::get(ConfigKey::StorageDir));
                }
                Some(("show", show_matches)) => {
                    Config::load(build(), vec![&matches, subcmd_matches, show_matches]).await?;
                    print_chat(&Config::get(ConfigKey::ChatID)).await?;
                }
                Some(("delete", delete_matches)) => {
                    Config::load(build(), vec![&matches, subcmd_matches, delete_matches])
                        .await?;
                    let chat_id = Config::get(ConfigKey::ChatID);
                    delete_chat(&chat_store()?, &chat_id)?;
                    println!("Deleted chat {chat_id}");
                }
                _ => {
                    subcommand_chats().print_long_help()?;
                }
            }

            return Ok(false);
        }
        Some(("completions", subcmd_matches)) => {
            if let Some(completions) = subcmd_matches.get_one::<Shell>("shell").copied() {
                let mut app = build();
                print_completions(completions, &mut app);
            }
            return Ok(false);
        }
        Some(("config", subcmd_matches)) => match subcmd_matches.subcommand() {
            Some(("create", _)) => {
                create_config_file().await?;
                return Ok(false);
            }
            Some(("default", _)) => {
                println!("{}", Config::serialize_default(build()));
                return Ok(false);
            }
            Some(("path", _)) => {
                println!("{}", Config::default(ConfigKey::ConfigFile));
                return Ok(false);
            }
            _ => {
                subcommand_config().print_long_help()?;
                return Ok(false);
            }
        },
        _ => {
            Config::load(build(), vec![&matches]).await?;
        }
    }

    validate_config()?;
    return Ok(true);
}
