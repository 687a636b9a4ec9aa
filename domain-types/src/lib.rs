//! Domain types for the hackathon collaboration backend.
//!
//! These are plain data structures shared by every registry actor, the
//! façade, and the CLI. No actor or I/O code lives here — just the entities
//! of the domain model and the error taxonomy every registry returns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Generates a random 8-hex-digit identifier by truncating a fresh ULID.
pub fn short_id() -> String {
    let raw: u128 = Ulid::new().into();
    format!("{:08x}", raw as u32)
}

// ============================================================================
// Teams
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub topic: String,
    /// Newest-first.
    pub participants: Vec<Participant>,
    pub created_at: DateTime<Utc>,
}

impl Team {
    pub fn new(name: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            id: short_id(),
            name: name.into(),
            topic: topic.into(),
            participants: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

// ============================================================================
// Projects
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProjectCategory {
    Social,
    Ambiental,
    Educativo,
}

impl ProjectCategory {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "social" => Some(Self::Social),
            "ambiental" => Some(Self::Ambiental),
            "educativo" => Some(Self::Educativo),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProjectState {
    Iniciado,
    EnProgreso,
    Completado,
}

impl ProjectState {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "iniciado" => Some(Self::Iniciado),
            "en_progreso" => Some(Self::EnProgreso),
            "completado" => Some(Self::Completado),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedbackEntry {
    pub mentor_name: String,
    pub content: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: String,
    pub team_name: String,
    pub description: String,
    pub category: ProjectCategory,
    pub state: ProjectState,
    /// Newest-first.
    pub progress: Vec<String>,
    /// Newest-first.
    pub feedback: Vec<FeedbackEntry>,
    pub created_at: DateTime<Utc>,
}

impl Project {
    pub fn new(
        team_name: impl Into<String>,
        description: impl Into<String>,
        category: ProjectCategory,
    ) -> Self {
        Self {
            id: short_id(),
            team_name: team_name.into(),
            description: description.into(),
            category,
            state: ProjectState::Iniciado,
            progress: Vec::new(),
            feedback: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

// ============================================================================
// Mentors
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MentorFeedback {
    pub team_name: String,
    pub content: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Mentor {
    pub id: String,
    pub name: String,
    pub specialty: String,
    /// Newest-first.
    pub feedback_given: Vec<MentorFeedback>,
}

impl Mentor {
    pub fn new(name: impl Into<String>, specialty: impl Into<String>) -> Self {
        Self {
            id: short_id(),
            name: name.into(),
            specialty: specialty.into(),
            feedback_given: Vec::new(),
        }
    }
}

// ============================================================================
// Chat
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: String,
    pub author: String,
    pub content: String,
    pub room: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(
        author: impl Into<String>,
        content: impl Into<String>,
        room: impl Into<String>,
    ) -> Self {
        Self {
            id: short_id(),
            author: author.into(),
            content: content.into(),
            room: room.into(),
            timestamp: Utc::now(),
        }
    }
}

pub const GENERAL_ROOM: &str = "general";

// ============================================================================
// Error taxonomy (spec §7) — shared kinds returned by every registry.
// ============================================================================

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("team already exists")]
    TeamExists,
    #[error("team not found")]
    TeamNotFound,
    #[error("participant already exists")]
    ParticipantDuplicate,
    #[error("project already exists")]
    ProjectExists,
    #[error("project not found")]
    ProjectNotFound,
    #[error("mentor not found")]
    MentorNotFound,
    #[error("room already exists")]
    RoomExists,
    #[error("room not found")]
    RoomNotFound,
    #[error("chat server unavailable")]
    ChatUnavailable,
    #[error("request timed out")]
    Timeout,
    #[error("registry temporarily unavailable")]
    Unavailable,
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_id_is_eight_hex_chars() {
        let id = short_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn short_id_is_random() {
        assert_ne!(short_id(), short_id());
    }

    #[test]
    fn project_category_round_trips() {
        assert_eq!(ProjectCategory::parse("social"), Some(ProjectCategory::Social));
        assert_eq!(ProjectCategory::parse("bogus"), None);
    }

    #[test]
    fn project_state_round_trips() {
        assert_eq!(
            ProjectState::parse("en_progreso"),
            Some(ProjectState::EnProgreso)
        );
        assert_eq!(ProjectState::parse("bogus"), None);
    }

    #[test]
    fn new_team_has_no_participants() {
        let team = Team::new("Alpha", "AI");
        assert_eq!(team.name, "Alpha");
        assert!(team.participants.is_empty());
    }

    #[test]
    fn new_project_starts_iniciado() {
        let project = Project::new("Alpha", "an app", ProjectCategory::Educativo);
        assert_eq!(project.state, ProjectState::Iniciado);
        assert!(project.progress.is_empty());
        assert!(project.feedback.is_empty());
    }
}
