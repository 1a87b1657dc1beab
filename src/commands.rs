use anyhow::{bail, Result};

use crate::config::Config;
use crate::conversation::{ConversationController, ExchangeOutcome};
use crate::llm::LlmClient;
use crate::ui::conversation::ConversationManager;

/// Launch the terminal chat widget
pub async fn start_widget(config: Config) -> Result<()> {
    let controller = build_controller(&config)?;
    tracing::info!(session = %controller.session_id(), "chat widget started");

    let manager = ConversationManager::new(controller, config.suggested_questions.clone());
    crate::ui::launch(manager).await
}

/// Ask a single question and print the reply
pub async fn ask(config: Config, question: &str) -> Result<()> {
    if question.trim().is_empty() {
        bail!("Question cannot be empty.");
    }

    let mut controller = build_controller(&config)?;
    let outcome = controller.submit(question).await;

    if let Some(reply) = controller.display_messages().last() {
        println!("🤖 {}", reply.text);
    }

    match outcome {
        Some(ExchangeOutcome::Failed) => bail!("The completion request failed; see the log for details."),
        _ => Ok(()),
    }
}

/// Print the configured quick questions
pub fn list_questions(config: &Config) {
    if config.suggested_questions.is_empty() {
        println!("📭 No suggested questions configured.");
        return;
    }

    println!("💬 Frequently asked questions:\n");
    for question in &config.suggested_questions {
        println!("  • {}", question);
    }
}

fn build_controller(config: &Config) -> Result<ConversationController<LlmClient>> {
    let client = LlmClient::new(config)?;
    if !config.has_api_key() {
        tracing::warn!(
            provider = client.provider_name(),
            env_var = %config.provider.api_key_env,
            "no API key configured; replies will fail until one is set"
        );
    }
    Ok(ConversationController::new(client, config.completion.clone()))
}
