//! DebateDuel CLI - debate practice in the terminal
//!
//! Enter a topic to get AI-generated pro and con arguments, then ask the
//! analyst for the weaknesses of any of them.

use clap::Parser;
use colored::Colorize;
use debateduel_core::{
    Config, DebateFlows, DebateSession, OpenAIProvider, Outcome, ProviderSettings, SessionEvent,
    SessionState, Stance, config,
};
use std::env;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const WIDTH: usize = 70;

#[derive(Parser)]
#[command(
    name = "debateduel",
    version,
    about = "Debate practice - AI pro and con arguments with weakness analysis",
    long_about = "Generates pro and con arguments for a topic with an OpenAI-compatible model \
                  and analyzes the weaknesses of any argument on request."
)]
struct Cli {
    /// Topic to debate right away
    #[arg(value_name = "TOPIC")]
    topic: Option<String>,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Model name (overrides the config file)
    #[arg(short, long, value_name = "MODEL")]
    model: Option<String>,

    /// Generate arguments for TOPIC, print them and exit
    #[arg(long, requires = "topic")]
    once: bool,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,
}

/// A line typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Submit(String),
    Analyze { stance: Stance, index: usize },
    Args,
    Chat,
    Help,
    Quit,
    Invalid(String),
}

/// Read a line as a command only when it matches a command form exactly.
///
/// Anything else, including a topic that merely starts with a command
/// word ("exit polls should be banned"), is submitted as a topic.
fn parse_command(line: &str) -> Command {
    let line = line.trim();
    let words: Vec<&str> = line.split_whitespace().collect();
    match words.as_slice() {
        ["quit"] | ["exit"] => Command::Quit,
        ["help"] => Command::Help,
        ["args"] => Command::Args,
        ["chat"] => Command::Chat,
        ["analyze", stance, number] => match (stance.parse::<Stance>(), number.parse::<usize>()) {
            (Ok(stance), Ok(n)) if n >= 1 => Command::Analyze {
                stance,
                index: n - 1,
            },
            _ => Command::Submit(line.to_string()),
        },
        ["analyze"] | ["analyze", _] => {
            Command::Invalid("usage: analyze <pro|con> <number>".to_string())
        }
        _ => Command::Submit(line.to_string()),
    }
}

/// The request currently in flight, if any, so Ctrl-C can cancel it.
#[derive(Clone, Default)]
struct PendingRequest {
    slot: Arc<Mutex<Option<CancellationToken>>>,
}

impl PendingRequest {
    fn lock(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn begin(&self) -> CancellationToken {
        let cancel = CancellationToken::new();
        *self.lock() = Some(cancel.clone());
        cancel
    }

    fn finish(&self) {
        self.lock().take();
    }

    /// Cancel the pending request. Returns false when nothing was pending.
    fn interrupt(&self) -> bool {
        match self.lock().take() {
            Some(cancel) => {
                cancel.cancel();
                true
            }
            None => false,
        }
    }
}

/// Exit status for `--once`: a surfaced notice is a failure.
fn once_status(outcome: &Outcome) -> Result<(), String> {
    match outcome.notice() {
        None => Ok(()),
        Some(notice) => Err(format!("{}: {}", notice.title, notice.description)),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => config::default_config(),
    };
    if let Some(model) = &cli.model {
        config.model.name = model.clone();
    }
    config.validate()?;

    // Get API configuration from environment
    let api_base = env::var("OPENAI_API_BASE")
        .or_else(|_| env::var("OPENAI_BASE_URL"))
        .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());

    let api_key = env::var("OPENAI_API_KEY").unwrap_or_else(|_| {
        eprintln!(
            "{}",
            "Warning: OPENAI_API_KEY not set. API calls may fail.".yellow()
        );
        String::new()
    });

    info!(api_base = %api_base, model = %config.model.name, "starting debateduel");
    let provider = OpenAIProvider::new(ProviderSettings::new(
        api_base,
        api_key,
        config.model.clone(),
    ))?;
    print_header(provider.model_name());
    let flows = DebateFlows::new(Arc::new(provider), config.prompts.clone());

    let chat_open = Arc::new(AtomicBool::new(true));
    let mut session = DebateSession::new(config.senders.clone())
        .with_callback(create_console_callback(chat_open.clone()));

    let pending = PendingRequest::default();
    spawn_ctrl_c_watcher(pending.clone());

    if let Some(topic) = &cli.topic {
        let outcome = submit(&mut session, &flows, &pending, topic).await;
        if cli.once {
            return Ok(once_status(&outcome)?);
        }
        fail_unless_recoverable(&outcome)?;
    } else {
        print_help();
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", "debate>".bright_blue().bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let command = parse_command(&line);
        debug!(?command, "command");

        match command {
            Command::Quit => break,
            Command::Help => print_help(),
            Command::Args => print_panels(&session),
            Command::Chat => {
                let open = !chat_open.fetch_xor(true, Ordering::SeqCst);
                if open {
                    print_transcript(&session);
                } else {
                    println!("{}", "Chat hidden. Type `chat` to show it again.".dimmed());
                }
            }
            Command::Invalid(usage) => println!("{}", usage.yellow()),
            Command::Submit(topic) => {
                let outcome = submit(&mut session, &flows, &pending, &topic).await;
                fail_unless_recoverable(&outcome)?;
            }
            Command::Analyze { stance, index } => {
                let cancel = pending.begin();
                let outcome = session
                    .analyze_displayed(&flows, stance, index, &cancel)
                    .await;
                pending.finish();
                fail_unless_recoverable(&outcome)?;
                if outcome.is_completed() && !chat_open.load(Ordering::SeqCst) {
                    println!("{}", "Analysis added to the chat. Type `chat` to show it.".dimmed());
                }
            }
        }
    }

    println!();
    println!("{}", "  Debate closed.".bright_green().bold());
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

async fn submit(
    session: &mut DebateSession,
    flows: &DebateFlows,
    pending: &PendingRequest,
    topic: &str,
) -> Outcome {
    let cancel = pending.begin();
    let outcome = session.submit_topic(flows, topic, &cancel).await;
    pending.finish();
    if outcome.is_completed() || session.state() == SessionState::Ready {
        print_panels(session);
    }
    outcome
}

fn fail_unless_recoverable(outcome: &Outcome) -> Result<(), String> {
    if outcome.is_recoverable() {
        Ok(())
    } else {
        once_status(outcome)
    }
}

/// Ctrl-C cancels the pending request, or leaves when nothing is pending.
fn spawn_ctrl_c_watcher(pending: PendingRequest) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if !pending.interrupt() {
                println!();
                println!("{}", "  Debate closed.".bright_green().bold());
                std::process::exit(130);
            }
        }
    });
}

fn print_header(model: &str) {
    println!();
    println!("{}", "═".repeat(WIDTH).bright_blue());
    println!("{}", format!("  {}", "Debate Duel".bold()).bright_blue().bold());
    println!("{}", "═".repeat(WIDTH).bright_blue());
    println!("  {} {}", "Model:".bold(), model.dimmed());
    println!();
}

fn print_help() {
    println!("{}", "Commands:".bold());
    println!("  {}  start a debate on that topic", "<topic>".bright_cyan());
    println!(
        "  {}  analyze an argument's weaknesses",
        "analyze <pro|con> <n>".bright_cyan()
    );
    println!("  {}  show the argument panels", "args".bright_cyan());
    println!("  {}  show or hide the chat", "chat".bright_cyan());
    println!("  {}  leave", "quit".bright_cyan());
    println!(
        "{}",
        "  Ctrl-C cancels a pending request, or leaves when none is pending.".dimmed()
    );
    println!();
}

fn print_panels(session: &DebateSession) {
    let Some(topic) = session.topic() else {
        println!("{}", "No debate yet. Enter a topic to start.".dimmed());
        return;
    };

    println!();
    println!("{} {}", "Topic:".bold(), topic.bright_white());
    for stance in Stance::ALL {
        let title = format!("{} Arguments", stance.display_name());
        let title = match stance {
            Stance::Pro => title.bright_green().bold(),
            Stance::Con => title.bright_red().bold(),
        };
        println!("{}", "─".repeat(WIDTH).dimmed());
        println!("{}", title);

        let arguments = session.arguments(stance);
        if arguments.is_empty() {
            println!("  {}", "(none)".dimmed());
        }
        for (i, argument) in arguments.iter().enumerate() {
            let prefix = format!("{:>3}. ", i + 1);
            let indent = " ".repeat(prefix.len());
            for (line_no, line) in textwrap(argument, WIDTH - prefix.len()).lines().enumerate() {
                if line_no == 0 {
                    println!("{}{}", prefix.yellow(), line);
                } else {
                    println!("{}{}", indent, line);
                }
            }
        }
    }
    println!("{}", "─".repeat(WIDTH).dimmed());
    println!(
        "{}",
        "Type `analyze pro 1` to probe an argument.".dimmed()
    );
    println!();
}

fn print_transcript(session: &DebateSession) {
    println!("{}", "Chat".bold());
    if session.transcript().is_empty() {
        println!("  {}", "(empty)".dimmed());
    }
    for message in session.transcript() {
        print_chat_message(&message.sender, &message.text);
    }
    println!();
}

fn print_chat_message(sender: &str, text: &str) {
    println!("{}", format!("{}:", sender).bright_cyan().bold());
    for paragraph in text.lines() {
        for line in textwrap(paragraph, WIDTH - 2).lines() {
            println!("  {}", line);
        }
    }
}

/// Create a callback that prints session events to the console.
fn create_console_callback(chat_open: Arc<AtomicBool>) -> Box<dyn Fn(SessionEvent) + Send + Sync> {
    Box::new(move |event| match event {
        SessionEvent::StateChanged(state) => {
            let status = match state {
                SessionState::AwaitingProArguments => "Generating pro arguments...",
                SessionState::AwaitingConArguments => "Generating con arguments...",
                SessionState::AwaitingAnalysis => "Analyzing argument...",
                SessionState::Idle | SessionState::Ready => return,
            };
            println!("{} {}", "▶".bright_cyan(), status.dimmed());
        }
        SessionEvent::MessageAppended(message) => {
            if chat_open.load(Ordering::SeqCst) {
                print_chat_message(&message.sender, &message.text);
            }
        }
        SessionEvent::Notice(notice) => {
            eprintln!("{} {}", notice.title.yellow().bold(), notice.description);
        }
        SessionEvent::ArgumentsReplaced { .. } => {
            // Panels are redrawn once the request resolves
        }
    })
}

/// Simple text wrapping function.
fn textwrap(text: &str, width: usize) -> String {
    let mut result = String::new();
    let mut current_line_len = 0;

    for word in text.split_whitespace() {
        if current_line_len + word.len() + 1 > width && current_line_len > 0 {
            result.push('\n');
            current_line_len = 0;
        }
        if current_line_len > 0 {
            result.push(' ');
            current_line_len += 1;
        }
        result.push_str(word);
        current_line_len += word.len();
    }

    result
}
