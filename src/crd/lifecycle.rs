//! Phase lifecycle shared by VerticaBackup and VerticaRestore
//!
//! A job moves `Initialized -> Running -> Succeeded | Failed`. Every phase
//! change appends a condition to an append-only log; the `phase` field is
//! always the phase of the last condition.

use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Coarse lifecycle state of a backup or restore
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
pub enum JobPhase {
    /// All referenced resources were found and the job is ready to start
    Initialized,
    /// The job has been started against the database
    Running,
    /// The job completed
    Succeeded,
    /// The job failed; `reason` says why
    Failed,
}

impl JobPhase {
    /// Succeeded and Failed are terminal
    pub fn is_terminal(self) -> bool {
        matches!(self, JobPhase::Succeeded | JobPhase::Failed)
    }

    /// Phase name as written to the status
    pub fn as_str(self) -> &'static str {
        match self {
            JobPhase::Initialized => "Initialized",
            JobPhase::Running => "Running",
            JobPhase::Succeeded => "Succeeded",
            JobPhase::Failed => "Failed",
        }
    }

    fn may_follow(self, previous: Option<JobPhase>) -> bool {
        matches!(
            (previous, self),
            (None, JobPhase::Initialized)
                | (Some(JobPhase::Initialized), JobPhase::Running)
                | (Some(JobPhase::Initialized), JobPhase::Failed)
                | (Some(JobPhase::Running), JobPhase::Succeeded)
                | (Some(JobPhase::Running), JobPhase::Failed)
        )
    }
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a condition (True, False, Unknown)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum ConditionStatus {
    #[default]
    True,
    False,
    Unknown,
}

/// One recorded phase transition
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobCondition {
    /// Phase entered by this transition
    #[serde(rename = "type")]
    pub type_: JobPhase,

    /// Status of the condition
    pub status: ConditionStatus,

    /// When the transition happened
    pub last_transition_time: DateTime<Utc>,
}

/// A requested phase change
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    phase: JobPhase,
    status: ConditionStatus,
    at: DateTime<Utc>,
    restart: bool,
}

impl Transition {
    /// Move to `phase` at time `at`
    pub fn to(phase: JobPhase, at: DateTime<Utc>) -> Self {
        Self {
            phase,
            status: ConditionStatus::True,
            at,
            restart: false,
        }
    }

    /// Re-enter `Initialized` from a terminal phase after the job was
    /// re-triggered by a spec change
    pub fn reinitialize(at: DateTime<Utc>) -> Self {
        Self {
            restart: true,
            ..Self::to(JobPhase::Initialized, at)
        }
    }

    /// Override the condition status (defaults to True)
    pub fn with_status(mut self, status: ConditionStatus) -> Self {
        self.status = status;
        self
    }

    pub fn phase(&self) -> JobPhase {
        self.phase
    }
}

/// Append-only, chronologically ordered history of phase transitions
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(transparent)]
pub struct ConditionLog(Vec<JobCondition>);

impl ConditionLog {
    /// Record a transition.
    ///
    /// Returns `Ok(false)` without appending when the log already ends in the
    /// requested phase, so repeated reconciles never duplicate entries.
    /// Timestamps earlier than the tail are clamped to the tail's time.
    pub fn append(&mut self, transition: Transition) -> Result<bool> {
        let current = self.current_phase();
        if current == Some(transition.phase) {
            return Ok(false);
        }

        let restarting = transition.restart
            && transition.phase == JobPhase::Initialized
            && current.is_some_and(JobPhase::is_terminal);
        if !restarting && !transition.phase.may_follow(current) {
            return Err(Error::InvalidTransition {
                from: current.map_or_else(|| "<none>".to_string(), |p| p.to_string()),
                to: transition.phase.to_string(),
            });
        }

        let at = match self.0.last() {
            Some(last) if last.last_transition_time > transition.at => last.last_transition_time,
            _ => transition.at,
        };
        self.0.push(JobCondition {
            type_: transition.phase,
            status: transition.status,
            last_transition_time: at,
        });
        Ok(true)
    }

    /// Phase of the most recent condition
    pub fn current_phase(&self) -> Option<JobPhase> {
        self.0.last().map(|c| c.type_)
    }

    pub fn last(&self) -> Option<&JobCondition> {
        self.0.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &JobCondition> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Status shared by VerticaBackup and VerticaRestore.
///
/// Fields are private so the phase can only change through [`JobStatus::transition`].
/// On the wire `phase` is always taken from the condition log, and `reason`
/// is written as `null` once cleared so a merge patch removes it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase", into = "JobStatusBody")]
pub struct JobStatus {
    /// Current phase of the job
    #[serde(default, skip_serializing_if = "Option::is_none")]
    phase: Option<JobPhase>,

    /// Reason for any job related failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<String>,

    /// Name of the VerticaArchive used by the job
    #[serde(default, skip_serializing_if = "Option::is_none")]
    archive: Option<String>,

    /// Phase transitions, oldest first
    #[serde(default, skip_serializing_if = "ConditionLog::is_empty")]
    conditions: ConditionLog,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JobStatusBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    phase: Option<JobPhase>,
    reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    archive: Option<String>,
    #[serde(skip_serializing_if = "ConditionLog::is_empty")]
    conditions: ConditionLog,
}

impl From<JobStatus> for JobStatusBody {
    fn from(status: JobStatus) -> Self {
        Self {
            phase: status.conditions.current_phase(),
            reason: status.reason,
            archive: status.archive,
            conditions: status.conditions,
        }
    }
}

impl JobStatus {
    /// Current phase, derived from the tail of the condition log
    pub fn phase(&self) -> Option<JobPhase> {
        self.conditions.current_phase()
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn archive(&self) -> Option<&str> {
        self.archive.as_deref()
    }

    pub fn conditions(&self) -> &ConditionLog {
        &self.conditions
    }

    /// Apply a transition; returns whether anything was appended
    pub fn transition(&mut self, transition: Transition) -> Result<bool> {
        let appended = self.conditions.append(transition)?;
        self.phase = self.conditions.current_phase();
        if appended && transition.phase != JobPhase::Failed {
            self.reason = None;
        }
        Ok(appended)
    }

    /// Move to Failed and record why
    pub fn fail(&mut self, reason: impl Into<String>, at: DateTime<Utc>) -> Result<bool> {
        let appended = self.transition(Transition::to(JobPhase::Failed, at))?;
        if appended {
            self.reason = Some(reason.into());
        }
        Ok(appended)
    }

    /// Record the archive the job resolved to. Once set it is never replaced.
    pub fn resolve_archive(&mut self, name: &str) -> bool {
        if self.archive.is_some() || name.is_empty() {
            return false;
        }
        self.archive = Some(name.to_string());
        true
    }
}

/// Accessors shared by the job-like resources
pub trait JobResource {
    /// Name of the VerticaDB the job runs against
    fn vertica_db_name(&self) -> &str;

    /// Name of the VerticaArchive the job reads or writes
    fn archive_name(&self) -> &str;

    fn job_status(&self) -> Option<&JobStatus>;

    /// Status, created empty if the object has none yet
    fn job_status_mut(&mut self) -> &mut JobStatus;

    fn phase(&self) -> Option<JobPhase> {
        self.job_status().and_then(JobStatus::phase)
    }
}
