mod relay_client;
mod session;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::relay_client::RelayClient;
use crate::session::{ChatSession, EntryKind, LogEntry, SendOutcome};

/// Terminal client for the job advisor relay.
///
/// Paste a job description, then an empty line to send it.
/// `/reset` starts a new conversation, `/quit` exits.
#[derive(Debug, Parser)]
#[command(name = "advisor-chat", version)]
struct Args {
    /// Base URL of the relay service
    #[arg(long, env = "ADVISOR_API_URL", default_value = "http://localhost:8080")]
    api_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Logs go to stderr so they never interleave with the conversation
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("{}=warn", env!("CARGO_CRATE_NAME")))),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Using relay at {}", args.api_url);
    let session = ChatSession::new(RelayClient::new(&args.api_url));
    let mut printed = render(&session.log(), 0);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut buffer: Vec<String> = Vec::new();

    while let Some(line) = lines.next_line().await? {
        if buffer.is_empty() {
            match line.trim() {
                "/quit" => break,
                "/reset" => {
                    session.reset();
                    printed = render(&session.log(), 0);
                    continue;
                }
                _ => {}
            }
        }

        if line.trim().is_empty() {
            if !buffer.is_empty() {
                printed = submit(&session, &mut buffer, printed).await;
            }
            continue;
        }
        buffer.push(line);
    }

    // EOF with a pending paste still sends it
    if !buffer.is_empty() {
        submit(&session, &mut buffer, printed).await;
    }

    Ok(())
}

async fn submit(session: &ChatSession, buffer: &mut Vec<String>, printed: usize) -> usize {
    let message = buffer.join("\n");
    buffer.clear();

    println!("… thinking");
    match session.send(&message).await {
        SendOutcome::Ignored => return printed,
        SendOutcome::Replied(reply) => debug!("reply received ({} chars)", reply.len()),
        SendOutcome::Failed(message) => debug!("request failed: {message}"),
        SendOutcome::Discarded => {}
    }
    render(&session.log(), printed)
}

/// Prints log entries from `from` onwards and returns the new high-water mark.
/// The user's own turns are not echoed back.
fn render(log: &[LogEntry], from: usize) -> usize {
    for entry in log.iter().skip(from) {
        match entry.kind {
            EntryKind::User => {}
            EntryKind::Greeting | EntryKind::Assistant => println!("\n{}\n", entry.text),
            EntryKind::Error => println!("\n[!] {}\n", entry.text),
        }
    }
    log.len()
}
