//! Structured turn events emitted by the controller.
//!
//! The presentation layer drains these to drive animations and toasts; the
//! `kind` is a mechanical descriptor and never carries display text.

use serde::{Deserialize, Serialize};

use crate::turn::TurnPhase;

/// Stable, deterministic identifier for a single event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId {
    /// Roll counter of the turn that produced the event.
    pub turn: u32,
    /// Per-turn sequence number (0-based).
    pub seq: u16,
}

impl EventId {
    #[must_use]
    pub const fn new(turn: u32, seq: u16) -> Self {
        Self { turn, seq }
    }
}

/// Mechanical event kind emitted by the turn engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PhaseChanged { from: TurnPhase, to: TurnPhase },
    DiceRolled,
    TurnSkipped,
    StartBonus,
    CardDrawn,
    Teleported,
    ChallengeIssued,
    PrefetchStarted,
    PrefetchConsumed,
    PrefetchDiscarded,
    AnswerScored,
    OwnershipGranted,
    ImprovementBuilt,
    MonopolyIncomplete,
    TurnEnded,
    GameOver,
}

/// Severity tier for a turn event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSeverity {
    Info,
    Success,
    Warning,
    Error,
}

/// Structured event emitted by the turn engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub kind: EventKind,
    pub severity: EventSeverity,
    /// Optional structured payload for debugging and downstream rendering.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub payload: serde_json::Value,
}

/// Append-only event buffer with per-turn sequence numbering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<Event>,
    #[serde(default)]
    next_seq: u16,
    #[serde(default)]
    turn: u32,
}

impl EventLog {
    /// Restart sequence numbering for a new turn.
    pub fn begin_turn(&mut self, turn: u32) {
        self.turn = turn;
        self.next_seq = 0;
    }

    pub fn push(&mut self, kind: EventKind, severity: EventSeverity, payload: serde_json::Value) {
        let id = EventId::new(self.turn, self.next_seq);
        self.next_seq = self.next_seq.saturating_add(1);
        self.events.push(Event {
            id,
            kind,
            severity,
            payload,
        });
    }

    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Remove and return everything recorded so far.
    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    #[must_use]
    pub fn last(&self) -> Option<&Event> {
        self.events.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_restarts_each_turn() {
        let mut log = EventLog::default();
        log.begin_turn(1);
        log.push(EventKind::DiceRolled, EventSeverity::Info, serde_json::Value::Null);
        log.push(EventKind::TurnEnded, EventSeverity::Info, serde_json::Value::Null);
        log.begin_turn(2);
        log.push(EventKind::DiceRolled, EventSeverity::Info, serde_json::Value::Null);

        let ids: Vec<EventId> = log.events().iter().map(|e| e.id).collect();
        assert_eq!(
            ids,
            vec![EventId::new(1, 0), EventId::new(1, 1), EventId::new(2, 0)]
        );
        assert_eq!(log.drain().len(), 3);
        assert!(log.events().is_empty());
    }

    #[test]
    fn phase_event_serializes_with_snake_case_tag() {
        let mut log = EventLog::default();
        log.push(
            EventKind::PhaseChanged {
                from: TurnPhase::Idle,
                to: TurnPhase::Rolling,
            },
            EventSeverity::Info,
            serde_json::json!({"turns_remaining": 20}),
        );
        let json = serde_json::to_value(log.last().unwrap()).unwrap();
        assert_eq!(json["kind"]["phase_changed"]["to"], "rolling");
        assert_eq!(json["payload"]["turns_remaining"], 20);
    }
}
