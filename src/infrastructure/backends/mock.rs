#[cfg(test)]
#[path = "mock_test.rs"]
mod tests;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use rand::seq::SliceRandom;
use tokio::time;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::Backend;
use crate::domain::models::BackendPrompt;

pub const RESPONSES: [&str; 6] = [
    "I've looked into that. Here's a quick summary of what I found, let me know if you want me to dig deeper into any part.",
    "Good question! The short answer is that it depends on your data. Could you share a bit more context?",
    "Here's what I'd suggest: start small, measure the results, and iterate from there.",
    "I ran a quick analysis. The numbers look consistent with the previous period, with no major outliers.",
    "That makes sense. I'd break it into three steps: gather the inputs, validate them, then generate the report.",
    "Thanks for the details! Based on what you've described, the most likely cause is a configuration mismatch.",
];

/// Stands in for a real assistant: waits, then answers from a fixed pool.
pub struct Mock {
    delay: Duration,
}

impl Default for Mock {
    fn default() -> Mock {
        let delay = Config::get(ConfigKey::ReplyDelay)
            .parse::<u64>()
            .unwrap_or(1500);

        return Mock::new(Duration::from_millis(delay));
    }
}

impl Mock {
    pub fn new(delay: Duration) -> Mock {
        return Mock { delay };
    }
}

#[async_trait]
impl Backend for Mock {
    #[allow(clippy::implicit_return)]
    async fn health_check(&self) -> Result<()> {
        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn get_completion(&self, prompt: BackendPrompt) -> Result<String> {
        time::sleep(self.delay).await;

        let mut reply = RESPONSES
            .choose(&mut rand::thread_rng())
            .unwrap_or(&RESPONSES[0])
            .to_string();

        if let Some(summary) = prompt.attachment_summary() {
            reply = format!("I've received {summary}. {reply}");
        }

        tracing::debug!(prompt = %prompt.text, reply = %reply, "Mock completion");
        return Ok(reply);
    }
}
