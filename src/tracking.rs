//! Append-only session records for the external tracking collaborator.
//!
//! The tracker only builds and holds events; writing them anywhere (JSONL
//! files, a database, a repository) is left to the caller, typically via
//! [`SessionTracker::to_jsonl`].

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::personality::PersonalityVector;
use crate::registry::Preset;

/// Tracking call referenced a session that was never started.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackingError {
    /// No `SessionStart` exists for this id.
    #[error("unknown session {0}")]
    UnknownSession(Uuid),

    /// The session already has a `SessionEnd`.
    #[error("session {0} already ended")]
    AlreadyEnded(Uuid),
}

/// What the participant was shown at session start.
#[derive(Debug, Clone, Default)]
pub struct SessionStart {
    /// External participant identifier (e.g. a panel id), if any.
    pub participant_id: Option<String>,
    /// Experimental condition label, e.g. `"HighA_enabled"`.
    pub condition: String,
    /// Final tone configuration rendered for this session.
    pub preset: Option<Preset>,
    /// Optimizer arm that produced the preset, in adaptive mode.
    pub arm_id: Option<String>,
    /// Personality vector used for personalization.
    pub personality: Option<PersonalityVector>,
}

/// One line of the study log.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TrackingEvent {
    /// A participant session began.
    SessionStart {
        /// Session id.
        session_id: Uuid,
        /// External participant id.
        participant_id: Option<String>,
        /// Condition label.
        condition: String,
        /// Name of the rendered preset.
        preset_name: Option<String>,
        /// Rendered preset.
        preset: Option<Preset>,
        /// Dispensed optimizer arm.
        arm_id: Option<String>,
        /// Personality vector.
        personality: Option<PersonalityVector>,
        /// Event time.
        timestamp: DateTime<Utc>,
    },
    /// Something happened within a session.
    Interaction {
        /// Session id.
        session_id: Uuid,
        /// Interaction kind, e.g. `"explanation_viewed"`.
        kind: String,
        /// Free-form details.
        details: serde_json::Value,
        /// Event time.
        timestamp: DateTime<Utc>,
    },
    /// A session finished with outcome measures.
    SessionEnd {
        /// Session id.
        session_id: Uuid,
        /// Outcome metrics such as `social_presence`, `trust`, `satisfaction`.
        outcomes: BTreeMap<String, f64>,
        /// Seconds between start and end.
        duration_seconds: f64,
        /// Event time.
        timestamp: DateTime<Utc>,
    },
}

impl TrackingEvent {
    /// Session the event belongs to.
    pub fn session_id(&self) -> Uuid {
        match self {
            Self::SessionStart { session_id, .. }
            | Self::Interaction { session_id, .. }
            | Self::SessionEnd { session_id, .. } => *session_id,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct OpenSession {
    started_at: DateTime<Utc>,
    ended: bool,
}

/// In-memory, append-only event log for one process.
#[derive(Debug, Default)]
pub struct SessionTracker {
    events: Vec<TrackingEvent>,
    sessions: HashMap<Uuid, OpenSession>,
}

impl SessionTracker {
    /// Empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a session start and return its fresh id.
    pub fn start_session(&mut self, start: SessionStart) -> Uuid {
        self.start_session_at(start, Utc::now())
    }

    /// Record a session start at an explicit time.
    pub fn start_session_at(&mut self, start: SessionStart, timestamp: DateTime<Utc>) -> Uuid {
        let session_id = Uuid::new_v4();
        let preset_name = start.preset.as_ref().map(|p| p.name().to_owned());
        tracing::info!(
            session = %session_id,
            condition = %start.condition,
            preset = ?preset_name,
            arm = ?start.arm_id,
            "session started"
        );
        self.sessions.insert(
            session_id,
            OpenSession {
                started_at: timestamp,
                ended: false,
            },
        );
        self.events.push(TrackingEvent::SessionStart {
            session_id,
            participant_id: start.participant_id,
            condition: start.condition,
            preset_name,
            preset: start.preset,
            arm_id: start.arm_id,
            personality: start.personality,
            timestamp,
        });
        session_id
    }

    /// Record an interaction within an open session.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError`] if the session is unknown or already ended.
    pub fn track_interaction(
        &mut self,
        session_id: Uuid,
        kind: impl Into<String>,
        details: serde_json::Value,
    ) -> Result<(), TrackingError> {
        self.open(session_id)?;
        self.events.push(TrackingEvent::Interaction {
            session_id,
            kind: kind.into(),
            details,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Close a session with its outcome measures.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError`] if the session is unknown or already ended.
    pub fn end_session(
        &mut self,
        session_id: Uuid,
        outcomes: BTreeMap<String, f64>,
    ) -> Result<(), TrackingError> {
        self.end_session_at(session_id, outcomes, Utc::now())
    }

    /// Close a session at an explicit time.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError`] if the session is unknown or already ended.
    pub fn end_session_at(
        &mut self,
        session_id: Uuid,
        outcomes: BTreeMap<String, f64>,
        timestamp: DateTime<Utc>,
    ) -> Result<(), TrackingError> {
        let started_at = self.open(session_id)?;
        let elapsed = timestamp.signed_duration_since(started_at);
        #[allow(clippy::cast_precision_loss)]
        let duration_seconds = elapsed.num_milliseconds() as f64 / 1000.0;
        if let Some(session) = self.sessions.get_mut(&session_id) {
            session.ended = true;
        }
        tracing::info!(session = %session_id, duration_seconds, "session ended");
        self.events.push(TrackingEvent::SessionEnd {
            session_id,
            outcomes,
            duration_seconds,
            timestamp,
        });
        Ok(())
    }

    /// All events in append order.
    pub fn events(&self) -> &[TrackingEvent] {
        &self.events
    }

    /// Render the log as JSON lines.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if an event cannot be encoded.
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        let mut out = String::new();
        for event in &self.events {
            out.push_str(&serde_json::to_string(event)?);
            out.push('\n');
        }
        Ok(out)
    }

    fn open(&self, session_id: Uuid) -> Result<DateTime<Utc>, TrackingError> {
        match self.sessions.get(&session_id) {
            None => Err(TrackingError::UnknownSession(session_id)),
            Some(s) if s.ended => Err(TrackingError::AlreadyEnded(session_id)),
            Some(s) => Ok(s.started_at),
        }
    }
}

/// Mean and count of one outcome metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeMean {
    /// Arithmetic mean.
    pub mean: f64,
    /// Number of sessions reporting the metric.
    pub count: usize,
}

/// Study-level aggregates over an event log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudySummary {
    /// Sessions started.
    pub total_sessions: usize,
    /// Sessions ended.
    pub completed_sessions: usize,
    /// Sessions per rendered preset name (`"unknown"` when none was recorded).
    pub preset_distribution: BTreeMap<String, usize>,
    /// Per-metric outcome means across ended sessions.
    pub outcome_means: BTreeMap<String, OutcomeMean>,
}

/// Aggregate an event log.
pub fn summarize(events: &[TrackingEvent]) -> StudySummary {
    let mut total_sessions = 0usize;
    let mut completed_sessions = 0usize;
    let mut preset_distribution: BTreeMap<String, usize> = BTreeMap::new();
    let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();

    for event in events {
        match event {
            TrackingEvent::SessionStart { preset_name, .. } => {
                total_sessions = total_sessions.saturating_add(1);
                let key = preset_name.clone().unwrap_or_else(|| "unknown".to_owned());
                let count = preset_distribution.entry(key).or_insert(0);
                *count = count.saturating_add(1);
            }
            TrackingEvent::SessionEnd { outcomes, .. } => {
                completed_sessions = completed_sessions.saturating_add(1);
                for (metric, value) in outcomes {
                    let entry = sums.entry(metric.clone()).or_insert((0.0, 0));
                    entry.0 += value;
                    entry.1 = entry.1.saturating_add(1);
                }
            }
            TrackingEvent::Interaction { .. } => {}
        }
    }

    let outcome_means = sums
        .into_iter()
        .map(|(metric, (sum, count))| {
            #[allow(clippy::cast_precision_loss)]
            let mean = sum / count as f64;
            (metric, OutcomeMean { mean, count })
        })
        .collect();

    StudySummary {
        total_sessions,
        completed_sessions,
        preset_distribution,
        outcome_means,
    }
}
