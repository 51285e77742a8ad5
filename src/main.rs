#![deny(clippy::implicit_return)]
#![allow(clippy::needless_return)]

mod application;
mod configuration;
mod domain;
mod infrastructure;

use std::env;
use std::process;
use std::sync::Arc;

use anyhow::Error;
use anyhow::Result;
use domain::models::Event;
use domain::services::ChatSession;
use domain::services::UrlParams;
use domain::services::CHAT_ID_PARAM;
use infrastructure::backends::BackendManager;
use tokio::sync::mpsc;
use yansi::Paint;

use crate::application::cli;
use crate::application::console;
use crate::configuration::Config;
use crate::configuration::ConfigKey;

fn handle_error(err: Error) {
    eprintln!(
        "{}",
        Paint::red(format!(
            "Oh no! chatkeep has failed with the following app version and error.\n\nVersion: {}\nError: {:#}",
            env!("CARGO_PKG_VERSION"),
            err
        ))
    );

    let backtrace = err.backtrace();
    if backtrace.to_string() == "disabled backtrace" {
        let args = env::args().collect::<Vec<String>>().join(" ");
        eprintln!("\nRunning the following can help explain further what the issue is:");
        eprintln!("\nRUST_BACKTRACE=1 {args}");
    } else {
        eprintln!("\n{}", backtrace);
    }

    process::exit(1);
}

fn log_dir() -> String {
    if let Ok(dir) = env::var("CHATKEEP_LOG_DIR") {
        return dir;
    }

    return dirs::cache_dir()
        .unwrap_or_else(env::temp_dir)
        .join("chatkeep")
        .to_string_lossy()
        .to_string();
}

async fn run() -> Result<()> {
    let store = cli::chat_store()?;

    let params = Arc::new(UrlParams::new(&Config::get(ConfigKey::Url))?);
    let chat_id = Config::get(ConfigKey::ChatID);
    if !chat_id.is_empty() {
        params.set(CHAT_ID_PARAM, &chat_id);
    }

    let backend = BackendManager::get();
    backend.health_check().await?;

    let (event_tx, event_rx) = mpsc::unbounded_channel::<Event>();
    let session = ChatSession::mount(store, params.clone(), backend, event_tx);

    return console::start(session, params, event_rx).await;
}

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        better_panic::Settings::auto().create_panic_handler()(panic_info);
    }));

    let file_appender = tracing_appender::rolling::never(log_dir(), "debug.log");
    let (writer, _guard) = tracing_appender::non_blocking(file_appender);
    if env::var("RUST_LOG")
        .unwrap_or_else(|_| return "".to_string())
        .contains("chatkeep")
    {
        tracing_subscriber::fmt()
            .json()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(writer)
            .init();
    }

    match cli::parse().await {
        Ok(true) => {}
        Ok(false) => process::exit(0),
        Err(err) => {
            handle_error(err);
            return;
        }
    }

    if let Err(err) = run().await {
        handle_error(err);
    }

    process::exit(0);
}
