// Core data structures for the posting rotation

use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Pool Entities
// ============================================================================

/// Account used to perform postings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub display_name: String,
    /// Active and not banned
    #[serde(default = "default_true")]
    pub is_eligible: bool,
}

impl Actor {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            is_eligible: true,
        }
    }
}

/// Group that receives postings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub id: String,
    pub display_name: String,
    /// Member count, higher is preferred
    pub audience_size: u64,
    #[serde(default = "default_true")]
    pub is_eligible: bool,
    /// Account linked to (administering) this group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_actor_id: Option<String>,
}

impl Target {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, audience_size: u64) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            audience_size,
            is_eligible: true,
            linked_actor_id: None,
        }
    }

    /// Link this group to an account
    pub fn with_linked_actor(mut self, actor_id: impl Into<String>) -> Self {
        self.linked_actor_id = Some(actor_id.into());
        self
    }
}

/// Text variant for a posting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentText {
    pub id: String,
    pub body: String,
    #[serde(default = "default_true")]
    pub is_eligible: bool,
}

impl ContentText {
    pub fn new(id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            body: body.into(),
            is_eligible: true,
        }
    }
}

/// Image or video attached to a posting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentMedia {
    pub id: String,
    /// Storage URL or path
    pub reference: String,
    #[serde(default = "default_true")]
    pub is_eligible: bool,
}

impl ContentMedia {
    pub fn new(id: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            reference: reference.into(),
            is_eligible: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Snapshot of all pools available to a scheduling run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pools {
    #[serde(default)]
    pub actors: Vec<Actor>,
    #[serde(default)]
    pub targets: Vec<Target>,
    #[serde(default)]
    pub texts: Vec<ContentText>,
    #[serde(default)]
    pub media: Vec<ContentMedia>,
}

impl Pools {
    /// Copy of the pools keeping only eligible members, order preserved
    pub fn eligible(&self) -> Self {
        Self {
            actors: self.actors.iter().filter(|a| a.is_eligible).cloned().collect(),
            targets: self.targets.iter().filter(|t| t.is_eligible).cloned().collect(),
            texts: self.texts.iter().filter(|t| t.is_eligible).cloned().collect(),
            media: self.media.iter().filter(|m| m.is_eligible).cloned().collect(),
        }
    }

    /// Parse a pool snapshot from JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn find_target(&self, id: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.id == id)
    }
}

// ============================================================================
// Assignments
// ============================================================================

/// Real-world result of an assignment, recorded after the fact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentOutcome {
    #[default]
    Pending,
    Posted,
    Skipped,
    Failed,
}

impl AssignmentOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Posted => "posted",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }

    /// Only posted assignments count toward caps and cooldowns
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Posted)
    }
}

impl fmt::Display for AssignmentOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssignmentOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "posted" | "success" | "done" => Ok(Self::Posted),
            "skipped" | "skip" => Ok(Self::Skipped),
            "failed" | "error" => Ok(Self::Failed),
            other => Err(format!(
                "unknown outcome '{other}', expected pending, posted, skipped or failed"
            )),
        }
    }
}

/// One scheduled (actor, target, content, time) tuple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub actor_id: String,
    pub target_id: String,
    pub text_id: String,
    pub media_id: Option<String>,
    pub scheduled_time: NaiveDateTime,
    /// 1-based position in the run
    pub sequence_number: u32,
}

impl Assignment {
    /// Identity used for the no-repeat rule
    pub fn tuple_key(&self) -> TupleKey {
        TupleKey {
            actor_id: self.actor_id.clone(),
            target_id: self.target_id.clone(),
            text_id: self.text_id.clone(),
            media_id: self.media_id.clone(),
        }
    }

    pub fn day(&self) -> NaiveDate {
        self.scheduled_time.date()
    }
}

/// (actor, target, text, media) identity of an assignment
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TupleKey {
    pub actor_id: String,
    pub target_id: String,
    pub text_id: String,
    pub media_id: Option<String>,
}

/// Past assignment fed back into a scheduling run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub actor_id: String,
    pub target_id: String,
    pub text_id: String,
    pub media_id: Option<String>,
    pub occurred_at: NaiveDateTime,
    pub outcome: AssignmentOutcome,
}

impl HistoryEntry {
    /// A successful posting at the given time
    pub fn posted(assignment: &Assignment, occurred_at: NaiveDateTime) -> Self {
        Self {
            actor_id: assignment.actor_id.clone(),
            target_id: assignment.target_id.clone(),
            text_id: assignment.text_id.clone(),
            media_id: assignment.media_id.clone(),
            occurred_at,
            outcome: AssignmentOutcome::Posted,
        }
    }
}

/// Assignment as persisted by the data store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAssignment {
    pub id: String,
    #[serde(flatten)]
    pub assignment: Assignment,
    pub outcome: AssignmentOutcome,
    pub recorded_at: Option<NaiveDateTime>,
}

impl StoredAssignment {
    /// Wrap a freshly generated assignment with a new id
    pub fn new(assignment: Assignment) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            assignment,
            outcome: AssignmentOutcome::Pending,
            recorded_at: None,
        }
    }

    /// Mark the outcome, stamped with the current local time
    pub fn record(&mut self, outcome: AssignmentOutcome) {
        self.record_at(outcome, Local::now().naive_local());
    }

    pub fn record_at(&mut self, outcome: AssignmentOutcome, at: NaiveDateTime) {
        self.outcome = outcome;
        self.recorded_at = Some(at);
    }

    /// History view; postings count from when they were recorded
    pub fn to_history(&self) -> HistoryEntry {
        let a = &self.assignment;
        HistoryEntry {
            actor_id: a.actor_id.clone(),
            target_id: a.target_id.clone(),
            text_id: a.text_id.clone(),
            media_id: a.media_id.clone(),
            occurred_at: self.recorded_at.unwrap_or(a.scheduled_time),
            outcome: self.outcome,
        }
    }
}
