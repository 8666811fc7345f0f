//! One-shot ask command.

use crate::cli::preflight;
use crate::cli::Output;
use crate::config::Settings;
use crate::conversation::ConversationId;
use crate::orchestrator::Orchestrator;
use console::style;

/// Send one message in a throwaway conversation and print the reply.
pub async fn run_ask(message: &str, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(&settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'tolk doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(&settings)?;
    let id = ConversationId::from("ask");

    let spinner = Output::spinner("Thinking...");
    let response = orchestrator.handle_message(&id, message).await;
    spinner.finish_and_clear();

    match response {
        Ok(response) => {
            println!("{}", orchestrator.render(&response.outcome));

            if !response.tool_calls.is_empty() {
                println!();
                println!("{}", style("Tools used:").dim());
                for call in &response.tool_calls {
                    println!("  {} {}", style("*").cyan(), style(call).dim());
                }
            }
            Ok(())
        }
        Err(e) => {
            Output::error(&orchestrator.prompts().failure);
            Err(e.into())
        }
    }
}
