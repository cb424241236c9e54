//! Conversation session: the transcript, the displayed log, and the one-request gate.
//!
//! The displayed log is what the user sees (greeting, their messages, replies, errors).
//! The transcript is what goes to the relay: only user/assistant turns from successful
//! exchanges. It is replaced wholesale by the relay's returned history.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use advisor_api::models::chat::Turn;
use tracing::{debug, warn};

use crate::relay_client::{RelayClient, RelayError};

pub const WELCOME: &str = "**Welcome to Job Advisor!**

I'll help you pick the right resume for each job application.

**How to use:**
1. Paste a job description below
2. I'll recommend which of your 4 resumes to use
3. I'll track patterns across jobs to suggest improvements

**Your Resumes:**
- DotNet_FS_Engineer
- FullStack_CloudArch
- Intel_Automation
- LLM_MLOPS_Engineer

Paste a job description to get started!";

pub const RESET_GREETING: &str = "**Conversation Reset!**

Ready to analyze more job postings. Paste a job description below.";

pub const CONNECTION_ERROR: &str = "**Connection Error:** Could not reach the backend.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Greeting,
    User,
    Assistant,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub kind: EntryKind,
    pub text: String,
}

impl LogEntry {
    fn new(kind: EntryKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// What a `send` call ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input, or another request was still pending. Nothing changed.
    Ignored,
    Replied(String),
    /// Error text appended to the log. Transcript untouched.
    Failed(String),
    /// A reset happened while the request was in flight; the reply was dropped.
    Discarded,
}

struct SessionState {
    transcript: Vec<Turn>,
    log: Vec<LogEntry>,
    /// Bumped by `reset` so replies to pre-reset requests can be recognised.
    epoch: u64,
}

/// Single-slot gate: holding the guard means a request is outstanding.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ChatSession {
    relay: RelayClient,
    state: Mutex<SessionState>,
    in_flight: AtomicBool,
}

impl ChatSession {
    pub fn new(relay: RelayClient) -> Self {
        Self {
            relay,
            state: Mutex::new(SessionState {
                transcript: Vec::new(),
                log: vec![LogEntry::new(EntryKind::Greeting, WELCOME)],
                epoch: 0,
            }),
            in_flight: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sends one message. At most one request is outstanding per session; a call
    /// made while one is pending returns `Ignored` without touching anything.
    pub async fn send(&self, text: &str) -> SendOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SendOutcome::Ignored;
        }
        let Some(_gate) = InFlight::acquire(&self.in_flight) else {
            debug!("send ignored: a request is already pending");
            return SendOutcome::Ignored;
        };

        let (history, epoch) = {
            let mut state = self.lock();
            state.log.push(LogEntry::new(EntryKind::User, text));
            (state.transcript.clone(), state.epoch)
        };

        let result = self.relay.chat(text, &history).await;

        let mut state = self.lock();
        if state.epoch != epoch {
            debug!("reply dropped: session was reset while the request was pending");
            return SendOutcome::Discarded;
        }

        match result {
            Ok(reply) => {
                state
                    .log
                    .push(LogEntry::new(EntryKind::Assistant, reply.response.clone()));
                state.transcript = reply.conversation_history;
                SendOutcome::Replied(reply.response)
            }
            Err(err) => {
                warn!("chat request failed: {err}");
                let message = display_error(&err);
                state.log.push(LogEntry::new(EntryKind::Error, message.clone()));
                SendOutcome::Failed(message)
            }
        }
    }

    /// Empties the transcript and leaves only the reset greeting. No network traffic.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.transcript.clear();
        state.log = vec![LogEntry::new(EntryKind::Greeting, RESET_GREETING)];
        state.epoch += 1;
    }

    pub fn transcript(&self) -> Vec<Turn> {
        self.lock().transcript.clone()
    }

    pub fn log(&self) -> Vec<LogEntry> {
        self.lock().log.clone()
    }

    #[cfg(test)]
    pub fn is_pending(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

fn display_error(err: &RelayError) -> String {
    match err {
        RelayError::Transport(_) => CONNECTION_ERROR.to_string(),
        RelayError::Status { message, .. } => format!("**Error:** {message}"),
        RelayError::Malformed(_) => {
            "**Error:** Unexpected response from the advisor service.".to_string()
        }
    }
}
