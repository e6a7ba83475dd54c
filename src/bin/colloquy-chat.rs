//! Interactive chat application for conversing with Claude.
//!
//! This binary provides a streaming REPL interface for chatting with Claude
//! models via the Anthropic API, with optional file attachments.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage with default settings
//! colloquy-chat
//!
//! # Specify a model and temperature
//! colloquy-chat --model claude-3-haiku-20240307 --temperature 0.2
//!
//! # Set a system prompt
//! colloquy-chat --system "You are a helpful coding assistant"
//!
//! # Disable colors (useful for piping output)
//! colloquy-chat --no-color
//! ```
//!
//! The API key is read from `ANTHROPIC_API_KEY` or `KEY`, then from the
//! secrets file (`$COLLOQUY_SECRETS` or `.colloquy/secrets.yaml`), then from
//! `.env`.  Set `RUST_LOG=colloquy=debug` for diagnostics on stderr.

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use colloquy::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, PlainTextRenderer, Renderer, help_text,
    parse_command,
};
use colloquy::Anthropic;

/// Main entry point for the colloquy-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("colloquy=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let (args, _) = ChatArgs::from_command_line_relaxed("colloquy-chat [OPTIONS]");
    let config = match ChatConfig::try_from(args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };
    let use_color = config.use_color;

    let client = match Anthropic::with_options(None, config.base_url.clone(), None) {
        Ok(client) => client,
        Err(err) if err.is_configuration() => {
            eprintln!("⚠️ {err}");
            eprintln!("Set ANTHROPIC_API_KEY or add it to .colloquy/secrets.yaml.");
            std::process::exit(1);
        }
        Err(err) => return Err(err.into()),
    };
    let mut session = ChatSession::new(client, config);
    let mut renderer = PlainTextRenderer::with_color(use_color);
    let mut rl = DefaultEditor::new()?;

    println!("Claude Chat (model: {})", session.model());
    println!("Type /help for commands, /quit to exit\n");

    loop {
        let prompt = if session.pending().is_empty() {
            "You: ".to_string()
        } else {
            format!("You [{} attached]: ", session.pending().len())
        };

        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Clear => {
                            session.clear();
                            renderer.print_info("Conversation cleared.");
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::Model(model_name) => {
                            match session.set_model(model_name.as_str()) {
                                Ok(()) => renderer
                                    .print_info(&format!("Model changed to: {}", model_name)),
                                Err(err) => renderer.print_error(&err.user_message()),
                            }
                        }
                        ChatCommand::Models => {
                            print_models(&session);
                        }
                        ChatCommand::Probe => {
                            renderer.print_info("Probing models...");
                            for (info, ok) in session.probe_models().await {
                                let mark = if ok { "✅" } else { "❌" };
                                println!("    {mark} {} ({})", info.display_name, info.model);
                            }
                        }
                        ChatCommand::System(prompt) => {
                            session.set_system_prompt(prompt.clone());
                            match prompt {
                                Some(p) => {
                                    renderer.print_info(&format!("System prompt set to: {}", p))
                                }
                                None => renderer.print_info("System prompt cleared."),
                            }
                        }
                        ChatCommand::MaxTokens(value) => match session.set_max_tokens(value) {
                            Ok(()) => renderer.print_info(&format!("max_tokens set to {value}")),
                            Err(err) => renderer.print_error(&err.user_message()),
                        },
                        ChatCommand::Temperature(value) => {
                            match session.set_temperature(value) {
                                Ok(()) => renderer
                                    .print_info(&format!("temperature set to {:.2}", value)),
                                Err(err) => renderer.print_error(&err.user_message()),
                            }
                        }
                        ChatCommand::Attach(path) => match session.attach_path(&path) {
                            Ok(attachment) => {
                                let line = format!(
                                    "Attached {} ({} bytes)",
                                    attachment.name, attachment.size_bytes
                                );
                                renderer.print_info(&line);
                            }
                            Err(err) => renderer.print_error(&err.user_message()),
                        },
                        ChatCommand::Detach => {
                            let count = session.detach();
                            renderer.print_info(&format!("Dropped {count} attachment(s)."));
                        }
                        ChatCommand::ShowConfig => {
                            print_config(&session);
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                println!("Claude:");
                if let Err(e) = session.send_with_pending(line, &mut renderer).await {
                    renderer.print_error(&e.user_message());
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

fn print_models(session: &ChatSession<Anthropic>) {
    println!("    Available models:");
    for info in session.catalog().entries() {
        let marker = if &info.model == session.model() { "*" } else { " " };
        println!(
            "    {marker} {} - {} (up to {} tokens)",
            info.model, info.display_name, info.max_output_tokens
        );
    }
}

fn print_config(session: &ChatSession<Anthropic>) {
    let config = session.config();
    println!("    Current Configuration:");
    println!("      Model: {}", config.model);
    println!("      Max tokens: {}", config.max_tokens);
    println!("      Temperature: {:.2}", config.temperature);
    match config.system_prompt.as_deref() {
        Some(prompt) => println!("      System prompt: {}", prompt),
        None => println!("      System prompt: (none)"),
    }
    println!("      Messages: {}", session.message_count());
    if session.pending().is_empty() {
        println!("      Attachments: (none)");
    } else {
        println!("      Attachments:");
        for attachment in session.pending() {
            println!("        - {}", attachment.name);
        }
    }
}
