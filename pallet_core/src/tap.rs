//! Tag tap protocol.
//!
//! A tap on an idle pallet opens a load (items leave the pallet for the
//! vehicle), unless it lands within the double-tap window of the previous
//! accepted tap, in which case it opens an unload. The opening tag closes
//! its own session with its next tap; any other tag cancels it.
//!
//! ```text
//! Idle ──tap──────────────────▶ LoadReady ──same tag──▶ LoadComplete ──dwell──▶ Idle
//!  └──tap within window─▶ UnloadReady ──same tag──▶ UnloadComplete ──dwell──▶ Idle
//! ```
use std::collections::HashMap;

use crate::config::TapCfg;
use crate::util::elapsed_ms;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TapState {
    #[default]
    Idle,
    LoadReady,
    LoadComplete,
    UnloadReady,
    UnloadComplete,
}

impl TapState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::LoadReady => "load_ready",
            Self::LoadComplete => "load_complete",
            Self::UnloadReady => "unload_ready",
            Self::UnloadComplete => "unload_complete",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::LoadReady | Self::UnloadReady)
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::LoadComplete | Self::UnloadComplete)
    }
}

/// The pending (or just completed) transaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TapSession {
    pub state: TapState,
    pub tag: Option<String>,
    pub entity: Option<String>,
    pub started_at_ms: u64,
    pub start_unit_count: u32,
    pub completed_at_ms: Option<u64>,
}

/// What an accepted tap did to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum TapOutcome {
    LoadStarted,
    UnloadStarted { double_tap: bool },
    LoadComplete { delta: i32 },
    UnloadComplete { delta: i32 },
    /// Another tag tapped while a session was pending.
    Cancelled { pending: String, entity: Option<String> },
    /// Tap during the completion dwell.
    Ignored,
}

/// Session change caused by time alone.
#[derive(Debug, Clone, PartialEq)]
pub enum Expiry {
    DwellElapsed,
    ReadyExpired {
        state: TapState,
        tag: String,
        entity: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct TapSequencer {
    cfg: TapCfg,
    session: TapSession,
    last_tap_ms: Option<u64>,
    last_read_ms: HashMap<String, u64>,
}

impl TapSequencer {
    pub fn new(cfg: TapCfg) -> Self {
        Self {
            cfg,
            session: TapSession::default(),
            last_tap_ms: None,
            last_read_ms: HashMap::new(),
        }
    }

    pub fn session(&self) -> &TapSession {
        &self.session
    }

    pub fn state(&self) -> TapState {
        self.session.state
    }

    /// Debounce gate. Returns false when the same tag was read less than
    /// `debounce_ms` ago; every read, accepted or not, restarts that tag's timer.
    pub fn accept_read(&mut self, tag: &str, now_ms: u64) -> bool {
        let debounce = self.cfg.debounce_ms;
        self.last_read_ms
            .retain(|_, at| elapsed_ms(*at, now_ms) < debounce);
        let accepted = !self.last_read_ms.contains_key(tag);
        self.last_read_ms.insert(tag.to_string(), now_ms);
        accepted
    }

    /// Feed one debounced tap of a known tag.
    pub fn on_tap(
        &mut self,
        tag: &str,
        entity: &str,
        now_ms: u64,
        current_count: u32,
    ) -> TapOutcome {
        let window = self.cfg.double_tap_window_ms;
        let within_window = self
            .last_tap_ms
            .is_some_and(|t| elapsed_ms(t, now_ms) < window);
        self.last_tap_ms = Some(now_ms);

        let same_tag = self.session.tag.as_deref() == Some(tag);
        match self.session.state {
            TapState::Idle => {
                self.open(tag, entity, now_ms, current_count);
                if within_window {
                    self.session.state = TapState::UnloadReady;
                    TapOutcome::UnloadStarted { double_tap: true }
                } else {
                    self.session.state = TapState::LoadReady;
                    TapOutcome::LoadStarted
                }
            }
            TapState::LoadReady | TapState::UnloadReady if !same_tag => {
                let pending = self.session.tag.clone().unwrap_or_default();
                let entity = self.session.entity.clone();
                self.session = TapSession::default();
                TapOutcome::Cancelled { pending, entity }
            }
            TapState::LoadReady => {
                let delta = signed(self.session.start_unit_count) - signed(current_count);
                self.complete(TapState::LoadComplete, now_ms);
                TapOutcome::LoadComplete { delta }
            }
            TapState::UnloadReady => {
                let delta = signed(current_count) - signed(self.session.start_unit_count);
                self.complete(TapState::UnloadComplete, now_ms);
                TapOutcome::UnloadComplete { delta }
            }
            TapState::LoadComplete | TapState::UnloadComplete => TapOutcome::Ignored,
        }
    }

    /// Time-driven transitions: completion dwell and pending-session timeout.
    pub fn tick(&mut self, now_ms: u64) -> Option<Expiry> {
        match self.session.state {
            TapState::LoadComplete | TapState::UnloadComplete => {
                let done_at = self.session.completed_at_ms.unwrap_or(now_ms);
                if elapsed_ms(done_at, now_ms) >= self.cfg.completion_dwell_ms {
                    self.session = TapSession::default();
                    Some(Expiry::DwellElapsed)
                } else {
                    None
                }
            }
            TapState::LoadReady | TapState::UnloadReady => {
                if elapsed_ms(self.session.started_at_ms, now_ms) >= self.cfg.ready_timeout_ms {
                    let prev = std::mem::take(&mut self.session);
                    Some(Expiry::ReadyExpired {
                        state: prev.state,
                        tag: prev.tag.unwrap_or_default(),
                        entity: prev.entity,
                    })
                } else {
                    None
                }
            }
            TapState::Idle => None,
        }
    }

    fn open(&mut self, tag: &str, entity: &str, now_ms: u64, count: u32) {
        self.session = TapSession {
            state: TapState::Idle,
            tag: Some(tag.to_string()),
            entity: Some(entity.to_string()),
            started_at_ms: now_ms,
            start_unit_count: count,
            completed_at_ms: None,
        };
    }

    fn complete(&mut self, state: TapState, now_ms: u64) {
        self.session.state = state;
        self.session.completed_at_ms = Some(now_ms);
    }
}

fn signed(n: u32) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}
