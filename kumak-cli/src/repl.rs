//! Interactive advisory chat over stdin.

use kumak_core::advisor::{Advisor, AdvisorSession};
use kumak_core::config::KumakConfig;
use kumak_core::error::AdvisorError;
use kumak_core::{create_provider, create_search_provider};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, PartialEq)]
enum SlashCommand {
    Help,
    Profile,
    Plan,
    Reset,
    Quit,
    Unknown(String),
}

fn parse_slash(input: &str) -> Option<SlashCommand> {
    let command = input.strip_prefix('/')?.split_whitespace().next().unwrap_or("");
    Some(match command {
        "help" | "?" => SlashCommand::Help,
        "profile" => SlashCommand::Profile,
        "plan" => SlashCommand::Plan,
        "reset" | "new" => SlashCommand::Reset,
        "quit" | "exit" | "q" => SlashCommand::Quit,
        other => SlashCommand::Unknown(other.to_string()),
    })
}

const HELP: &str = "  /profile  show what Kumak knows about your business
  /plan     show the current action and savings plan
  /reset    start a new conversation
  /quit     exit";

pub async fn run_interactive(config: KumakConfig) -> anyhow::Result<()> {
    let llm = create_provider(&config.llm)?;
    let search = create_search_provider(&config.search)?;
    let advisor = Advisor::from_config(&config, llm, search);
    let mut session = AdvisorSession::new();

    println!("\x1b[1;32m  KUMAK\x1b[0m  your small-business consultant");
    println!(
        "  Model: {} | Search: {}",
        config.llm.model, config.search.backend
    );
    println!("  Tell me about your business. Type /help for commands, /quit to exit\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\x1b[1;34m> \x1b[0m");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        if let Some(command) = parse_slash(input) {
            match command {
                SlashCommand::Help => println!("{}", HELP),
                SlashCommand::Profile => {
                    if session.business_info.is_empty() {
                        println!("  No business details recorded yet.");
                    } else {
                        println!("{}", serde_json::to_string_pretty(&session.business_info)?);
                    }
                    for insight in &session.long_term_memory {
                        println!("  - {}", insight);
                    }
                }
                SlashCommand::Plan => match &session.current_plan {
                    Some(plan) => {
                        println!("{}", serde_json::to_string_pretty(plan)?);
                        if let Some(months) = plan.months_to_fund() {
                            println!(
                                "  Cost ${:.2}, savings ${:.2}/month: funded in {:.1} months",
                                plan.total_action_cost_usd(),
                                plan.total_monthly_savings_usd(),
                                months
                            );
                        }
                    }
                    None => println!("  No plan yet."),
                },
                SlashCommand::Reset => {
                    session = AdvisorSession::new();
                    println!("  Started a new conversation.");
                }
                SlashCommand::Quit => break,
                SlashCommand::Unknown(name) => {
                    println!("  Unknown command: /{}. Type /help for commands.", name)
                }
            }
            continue;
        }

        match advisor.handle_message(&mut session, input).await {
            Ok(reply) => println!("\n{}\n", reply),
            Err(AdvisorError::MaxToolRounds { max }) => {
                eprintln!("  Kumak gave up after {} tool rounds. Try rephrasing.", max)
            }
            Err(e) => eprintln!("  Error: {}", e),
        }
    }
    Ok(())
}
