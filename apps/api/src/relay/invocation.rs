//! Per-call lifecycle of a relay invocation.
//!
//! Received → Validating → (Authenticating) → Forwarding → ExtractingResponse → Completed
//!
//! `Failed` is reachable from any non-terminal phase. `Completed` and `Failed` are terminal.

use std::fmt;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Received,
    Validating,
    Authenticating,
    Forwarding,
    ExtractingResponse,
    Completed,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Failed)
    }

    /// Legal forward transitions. `Authenticating` may be skipped for static keys.
    fn can_advance_to(self, next: Phase) -> bool {
        use Phase::*;
        matches!(
            (self, next),
            (Received, Validating)
                | (Validating, Authenticating)
                | (Validating, Forwarding)
                | (Authenticating, Forwarding)
                | (Forwarding, ExtractingResponse)
                | (ExtractingResponse, Completed)
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Received => "received",
            Phase::Validating => "validating",
            Phase::Authenticating => "authenticating",
            Phase::Forwarding => "forwarding",
            Phase::ExtractingResponse => "extracting_response",
            Phase::Completed => "completed",
            Phase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Tracks one invocation. Owned by the handler task; never shared.
#[derive(Debug)]
pub struct Invocation {
    pub id: Uuid,
    phase: Phase,
}

impl Invocation {
    pub fn start() -> Self {
        let id = Uuid::new_v4();
        debug!(invocation = %id, "chat invocation received");
        Self {
            id,
            phase: Phase::Received,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Moves to `next`. Illegal transitions are a programming error and are
    /// reported as an internal error instead of panicking.
    pub fn advance(&mut self, next: Phase) -> Result<(), AppError> {
        if !self.phase.can_advance_to(next) {
            return Err(AppError::Internal(anyhow::anyhow!(
                "invalid invocation transition {} -> {next}",
                self.phase
            )));
        }
        debug!(invocation = %self.id, "{} -> {next}", self.phase);
        self.phase = next;
        Ok(())
    }

    /// Records a failure and hands the error back for propagation.
    pub fn fail(&mut self, err: AppError) -> AppError {
        if !self.phase.is_terminal() {
            warn!(invocation = %self.id, phase = %self.phase, "chat invocation failed: {err}");
            self.phase = Phase::Failed;
        }
        err
    }
}
