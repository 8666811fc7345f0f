//! Interactive chat command.

use crate::cli::preflight;
use crate::cli::Output;
use crate::config::Settings;
use crate::conversation::ConversationId;
use crate::orchestrator::Orchestrator;
use console::style;
use std::io::{self, BufRead, Write};

/// Conversation id used when none is given on the command line.
const LOCAL_CONVERSATION: &str = "local";

/// REPL input after trimming.
#[derive(Debug, PartialEq, Eq)]
enum ChatInput<'a> {
    Skip,
    Exit,
    Clear,
    Start,
    Message(&'a str),
}

fn classify(line: &str) -> ChatInput<'_> {
    let input = line.trim();
    if input.is_empty() {
        return ChatInput::Skip;
    }
    match input.to_lowercase().as_str() {
        "exit" | "quit" | "/exit" | "/quit" => ChatInput::Exit,
        "clear" | "/clear" => ChatInput::Clear,
        "/start" | "/help" => ChatInput::Start,
        _ => ChatInput::Message(input),
    }
}

/// Run the interactive chat command.
pub async fn run_chat(conversation: Option<String>, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(&settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'tolk doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(&settings)?;
    let id = ConversationId::parse(conversation.as_deref().unwrap_or(LOCAL_CONVERSATION));

    println!("\n{}", style("Tolk Chat").bold().cyan());
    println!(
        "{}\n",
        style("Type a message, or 'exit' to quit. Use /clear to reset the conversation.").dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        match classify(&line) {
            ChatInput::Skip => continue,
            ChatInput::Exit => {
                Output::info("Goodbye!");
                break;
            }
            ChatInput::Clear => {
                orchestrator.reset(&id).await;
                Output::info(&orchestrator.prompts().reset);
            }
            ChatInput::Start => Output::reply(&orchestrator.prompts().greeting),
            ChatInput::Message(text) => {
                let spinner = Output::spinner("Thinking...");
                let reply = orchestrator.reply(&id, text).await;
                spinner.finish_and_clear();
                Output::reply(&reply);
            }
        }
    }

    Ok(())
}
