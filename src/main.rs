use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use voxchat::{
    AppConfig, BoxedSink, ChatClient, ConversationError, FileSink, JobOutcome, LogSink, Segmenter,
    Session, SessionStore, SpeechSequencer, SpeechSynthesizer, TurnRunner, create_synthesizer,
};

/// voxchat - streaming voice chat with emotion-tagged speech
#[derive(Parser, Debug)]
#[command(name = "voxchat")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive chat over stdin
    Chat {
        /// Write each utterance's audio into DIR instead of logging it
        #[arg(short = 'o', long = "out", value_name = "DIR")]
        out: Option<PathBuf>,
    },

    /// Speak a tagged text once, e.g. "[happy]Hello![sad]Bye."
    Say {
        text: String,

        /// Write each utterance's audio into DIR instead of logging it
        #[arg(short = 'o', long = "out", value_name = "DIR")]
        out: Option<PathBuf>,
    },
}

/// A line typed at the chat prompt.
#[derive(Debug, PartialEq, Eq)]
enum ReplCommand {
    Quit,
    Reset,
    Edit(usize, String),
    Prompt(Option<String>),
    Message(String),
    Empty,
    Unknown(String),
}

fn parse_command(line: &str) -> ReplCommand {
    let line = line.trim();
    if line.is_empty() {
        return ReplCommand::Empty;
    }
    if !line.starts_with('/') {
        return ReplCommand::Message(line.to_string());
    }

    let (command, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    match command {
        "/quit" | "/exit" => ReplCommand::Quit,
        "/reset" => ReplCommand::Reset,
        "/prompt" if rest.is_empty() => ReplCommand::Prompt(None),
        "/prompt" => ReplCommand::Prompt(Some(rest.to_string())),
        "/edit" => {
            let (index, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            match index.parse::<usize>() {
                Ok(index) if !text.trim().is_empty() => {
                    ReplCommand::Edit(index, text.trim().to_string())
                }
                _ => ReplCommand::Unknown(line.to_string()),
            }
        }
        _ => ReplCommand::Unknown(line.to_string()),
    }
}

async fn build_sink(out: Option<PathBuf>) -> anyhow::Result<BoxedSink> {
    Ok(match out {
        Some(dir) => {
            let sink = FileSink::new(&dir)
                .await
                .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
            println!("Writing audio to {}", dir.display());
            Arc::new(sink)
        }
        None => Arc::new(LogSink::new(true)),
    })
}

fn build_sequencer(config: &AppConfig, sink: BoxedSink) -> anyhow::Result<Arc<SpeechSequencer>> {
    let synthesizer = create_synthesizer(config.tts_config(), config.tts_cache_capacity)?;
    if let Err(e) = synthesizer.check_ready() {
        warn!("Speech disabled: {e}");
    }
    Ok(Arc::new(SpeechSequencer::new(
        synthesizer,
        sink,
        config.sequencer_config(),
    )))
}

async fn run_say(config: AppConfig, text: String, out: Option<PathBuf>) -> anyhow::Result<()> {
    let sequencer = build_sequencer(&config, build_sink(out).await?)?;

    let mut segmenter = Segmenter::new(config.segmenter_config());
    let mut utterances = segmenter.push(&text);
    utterances.extend(segmenter.finish());
    if utterances.is_empty() {
        println!("Nothing to say.");
        return Ok(());
    }

    let handles = sequencer.submit_all(utterances.clone())?;
    for (utterance, handle) in utterances.iter().zip(handles) {
        let outcome = handle.outcome().await;
        println!("{} -> {outcome:?}", utterance.tagged_text());
    }
    sequencer.dispose();
    Ok(())
}

async fn run_chat(config: AppConfig, out: Option<PathBuf>) -> anyhow::Result<()> {
    let store = config.session_path.clone().map(SessionStore::new);
    let mut session = match &store {
        Some(store) => store.load().await?,
        None => Session::default(),
    };

    let default_prompt = config.prompt_language().system_prompt();
    let system_prompt = session
        .system_prompt
        .clone()
        .unwrap_or_else(|| default_prompt.to_string());

    let sequencer = build_sequencer(&config, build_sink(out).await?)?;
    let client = ChatClient::new(config.chat_config())?;
    let mut runner = TurnRunner::new(client, config.chat_api_key(), sequencer.clone(), system_prompt)
        .with_segmenter(config.segmenter_config())
        .with_display(Arc::new(|text: &str| {
            print!("\rassistant: {text}");
            let _ = std::io::stdout().flush();
        }));

    println!(
        "voxchat ({}) - /reset, /edit N text, /prompt [text], /quit; Ctrl-C stops a reply",
        config.chat_model
    );
    if !session.chat_log.is_empty() {
        println!("Restored {} messages", session.chat_log.len());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_command(&line) {
            ReplCommand::Empty => continue,
            ReplCommand::Quit => break,
            ReplCommand::Unknown(line) => {
                println!("Unknown command: {line}");
                continue;
            }
            ReplCommand::Reset => {
                session.chat_log.reset();
                sequencer.reset();
                println!("Conversation cleared");
            }
            ReplCommand::Edit(index, text) => match session.chat_log.edit(index, text) {
                Ok(()) => println!("Edited message {index}"),
                Err(e) => {
                    println!("{e}");
                    continue;
                }
            },
            ReplCommand::Prompt(prompt) => {
                let prompt_text = prompt.clone().unwrap_or_else(|| default_prompt.to_string());
                runner.set_system_prompt(prompt_text);
                session.system_prompt = prompt;
                println!("System prompt updated");
            }
            ReplCommand::Message(text) => {
                let cancel = CancellationToken::new();
                let turn = runner.run(&mut session.chat_log, &text, &cancel);
                tokio::pin!(turn);
                let result = loop {
                    tokio::select! {
                        result = &mut turn => break result,
                        _ = tokio::signal::ctrl_c() => cancel.cancel(),
                    }
                };

                match result {
                    Ok(summary) => {
                        println!("\rassistant: {}", summary.display_text);
                        if let Some(e) = &summary.stream_error {
                            println!("(reply interrupted: {e})");
                        }
                        if let Some(e) = &summary.speech_error {
                            println!("(not spoken: {e})");
                        }
                        let skipped = summary
                            .outcomes
                            .iter()
                            .filter(|o| **o != JobOutcome::Played)
                            .count();
                        if skipped > 0 {
                            info!(skipped, "Some sentences were not spoken");
                        }
                    }
                    Err(ConversationError::Cancelled) => {
                        println!("\n(reply cancelled)");
                        continue;
                    }
                    Err(e) => {
                        println!("\nError: {e}");
                    }
                }
            }
        }

        if let Some(store) = &store {
            store.save(&session).await?;
        }
    }

    sequencer.dispose();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    // Initialize tracing; logs go to stderr so the conversation stays readable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("voxchat=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Initialize crypto provider for TLS connections
    // This must be done before any TLS connections are attempted
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration from file or environment
    let config = if let Some(config_path) = cli.config {
        info!("Loading configuration from {}", config_path.display());
        AppConfig::from_file(&config_path)?
    } else {
        AppConfig::from_env()?
    };

    match cli.command {
        Commands::Chat { out } => run_chat(config, out).await,
        Commands::Say { text, out } => run_say(config, text, out).await,
    }
}
