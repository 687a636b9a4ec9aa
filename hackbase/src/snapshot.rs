//! Snapshot Store - atomic whole-file persistence for every registry.
//!
//! Layout under a base directory (created if absent):
//!   teams.etf            mapping Team.name -> Team
//!   projects.etf          mapping team_name -> Project
//!   mentors.etf           mapping mentor_id -> Mentor
//!   chat/index.etf        ordered sequence of room names
//!   chat/<room>.etf       newest-first message sequence
//!
//! Each file is MessagePack (`rmp-serde`) because it is self-describing: a
//! map root and a sequence root decode distinctly, which is what lets
//! bootstrap accept either the canonical mapping or a legacy ordered-list
//! snapshot. Writes go to a `.tmp` sibling, fsync, then rename - crash-safe
//! at whole-file granularity, mirroring the write-temp-then-rename pattern
//! used for on-disk snapshots elsewhere in the durability stack this was
//! grounded on.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use domain_types::{Mentor, Message, Project, Team};

const TEAMS_FILE: &str = "teams.etf";
const PROJECTS_FILE: &str = "projects.etf";
const MENTORS_FILE: &str = "mentors.etf";
const CHAT_DIR: &str = "chat";
const CHAT_INDEX_FILE: &str = "index.etf";

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    base_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PersistInfo {
    pub team_count: usize,
    pub project_count: usize,
    pub mentor_count: usize,
    pub room_count: usize,
    pub generated_at: DateTime<Utc>,
}

impl SnapshotStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let store = Self { base_dir };
        store.ensure_dirs();
        store
    }

    fn ensure_dirs(&self) {
        if let Err(e) = fs::create_dir_all(&self.base_dir) {
            tracing::warn!(error = %e, "failed to create snapshot base directory");
        }
        if let Err(e) = fs::create_dir_all(self.base_dir.join(CHAT_DIR)) {
            tracing::warn!(error = %e, "failed to create chat snapshot directory");
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    // -- teams ---------------------------------------------------------

    pub fn write_teams(&self, teams: &HashMap<String, Team>) -> io::Result<()> {
        write_map(&self.base_dir.join(TEAMS_FILE), teams)
    }

    pub fn load_teams(&self) -> HashMap<String, Team> {
        load_map(&self.base_dir.join(TEAMS_FILE), |t: &Team| t.name.clone())
    }

    // -- projects --------------------------------------------------------

    pub fn write_projects(&self, projects: &HashMap<String, Project>) -> io::Result<()> {
        write_map(&self.base_dir.join(PROJECTS_FILE), projects)
    }

    pub fn load_projects(&self) -> HashMap<String, Project> {
        load_map(&self.base_dir.join(PROJECTS_FILE), |p: &Project| {
            p.team_name.clone()
        })
    }

    // -- mentors ---------------------------------------------------------

    pub fn write_mentors(&self, mentors: &HashMap<String, Mentor>) -> io::Result<()> {
        write_map(&self.base_dir.join(MENTORS_FILE), mentors)
    }

    pub fn load_mentors(&self) -> HashMap<String, Mentor> {
        load_map(&self.base_dir.join(MENTORS_FILE), |m: &Mentor| m.id.clone())
    }

    // -- chat --------------------------------------------------------------

    pub fn write_room_index(&self, rooms: &[String]) -> io::Result<()> {
        write_seq(&self.base_dir.join(CHAT_DIR).join(CHAT_INDEX_FILE), rooms)
    }

    pub fn load_room_index(&self) -> Vec<String> {
        load_seq(&self.base_dir.join(CHAT_DIR).join(CHAT_INDEX_FILE))
    }

    fn room_file(&self, room: &str) -> PathBuf {
        self.base_dir.join(CHAT_DIR).join(format!("{room}.etf"))
    }

    pub fn write_room_messages(&self, room: &str, messages: &[Message]) -> io::Result<()> {
        write_seq(&self.room_file(room), messages)
    }

    pub fn load_room_messages(&self, room: &str) -> Vec<Message> {
        load_seq(&self.room_file(room))
    }

    // -- whole-system operations -----------------------------------------

    /// Recursively deletes and recreates the base directory. Always
    /// "succeeds" from the caller's point of view - a failure here must
    /// never prevent startup or a reset from completing.
    pub fn clear_all(&self) {
        if let Err(e) = fs::remove_dir_all(&self.base_dir) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(error = %e, "failed to remove snapshot directory during clear_all");
            }
        }
        self.ensure_dirs();
    }

    /// Deletes and recreates only the `chat/` subdirectory, leaving
    /// `teams.etf`/`projects.etf`/`mentors.etf` untouched. Those files are
    /// owned by their own registry worker; the chat server must never reach
    /// past its own subtree when resetting.
    pub fn clear_chat(&self) {
        let chat_dir = self.base_dir.join(CHAT_DIR);
        if let Err(e) = fs::remove_dir_all(&chat_dir) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(error = %e, "failed to remove chat snapshot directory during clear_chat");
            }
        }
        if let Err(e) = fs::create_dir_all(&chat_dir) {
            tracing::warn!(error = %e, "failed to recreate chat snapshot directory");
        }
    }

    /// Counts entities directly from the on-disk files, for observability.
    pub fn persist_info(&self) -> PersistInfo {
        let room_count = self.load_room_index().len();
        PersistInfo {
            team_count: self.load_teams().len(),
            project_count: self.load_projects().len(),
            mentor_count: self.load_mentors().len(),
            room_count,
            generated_at: Utc::now(),
        }
    }
}

fn write_map<T: Serialize>(path: &Path, map: &HashMap<String, T>) -> io::Result<()> {
    write_atomic(path, map)
}

fn write_seq<T: Serialize>(path: &Path, seq: &[T]) -> io::Result<()> {
    write_atomic(path, &seq.to_vec())
}

fn write_atomic<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    let bytes = rmp_serde::to_vec_named(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let tmp_path = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&tmp_path)?;
        use std::io::Write;
        file.write_all(&bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Loads a map-shaped snapshot, falling back to a legacy ordered-sequence
/// shape (keyed by `key_of`), and treating a missing or corrupt file as
/// empty state rather than an error - startup must never fail on this.
fn load_map<T, F>(path: &Path, key_of: F) -> HashMap<String, T>
where
    T: DeserializeOwned + Clone,
    F: Fn(&T) -> String,
{
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(_) => return HashMap::new(),
    };

    if let Ok(map) = rmp_serde::from_slice::<HashMap<String, T>>(&bytes) {
        return map;
    }

    if let Ok(list) = rmp_serde::from_slice::<Vec<T>>(&bytes) {
        return list.into_iter().map(|item| (key_of(&item), item)).collect();
    }

    tracing::warn!(path = %path.display(), "snapshot file unreadable, treating as empty");
    HashMap::new()
}

fn load_seq<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(_) => return Vec::new(),
    };
    rmp_serde::from_slice::<Vec<T>>(&bytes).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_types::{ProjectCategory, ProjectState};
    use tempfile::tempdir;

    #[test]
    fn round_trips_teams() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());

        let mut teams = HashMap::new();
        let team = Team::new("Alpha", "AI");
        teams.insert(team.name.clone(), team.clone());

        store.write_teams(&teams).unwrap();
        let loaded = store.load_teams();
        assert_eq!(loaded.get("Alpha").unwrap().topic, "AI");
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        assert!(store.load_teams().is_empty());
        assert!(store.load_projects().is_empty());
        assert!(store.load_mentors().is_empty());
    }

    #[test]
    fn corrupt_file_is_treated_as_empty() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        fs::write(dir.path().join(TEAMS_FILE), b"not valid msgpack").unwrap();
        assert!(store.load_teams().is_empty());
    }

    #[test]
    fn legacy_list_snapshot_loads_into_map() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());

        let legacy = vec![Team::new("Beta", "IoT")];
        let bytes = rmp_serde::to_vec_named(&legacy).unwrap();
        fs::write(dir.path().join(TEAMS_FILE), bytes).unwrap();

        let loaded = store.load_teams();
        assert_eq!(loaded.get("Beta").unwrap().topic, "IoT");
    }

    #[test]
    fn clear_chat_leaves_other_registries_alone() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());

        let mut teams = HashMap::new();
        teams.insert("Alpha".to_string(), Team::new("Alpha", "AI"));
        store.write_teams(&teams).unwrap();

        store
            .write_room_index(&["general".to_string()])
            .unwrap();
        store
            .write_room_messages("general", &[Message::new("A", "hi", "general")])
            .unwrap();

        store.clear_chat();

        assert_eq!(store.persist_info().team_count, 1);
        assert!(store.load_room_index().is_empty());
    }

    #[test]
    fn clear_all_resets_directory() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());

        let mut projects = HashMap::new();
        let project = Project::new("Gamma", "app", ProjectCategory::Social);
        projects.insert(project.team_name.clone(), project);
        store.write_projects(&projects).unwrap();
        assert_eq!(store.persist_info().project_count, 1);

        store.clear_all();
        assert_eq!(store.persist_info().project_count, 0);
        assert!(dir.path().exists());
    }

    #[test]
    fn chat_rooms_round_trip() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());

        store
            .write_room_index(&["general".to_string(), "team-a".to_string()])
            .unwrap();
        assert_eq!(store.load_room_index(), vec!["general", "team-a"]);

        let messages = vec![Message::new("B", "dos", "general"), Message::new("A", "uno", "general")];
        store.write_room_messages("general", &messages).unwrap();
        let loaded = store.load_room_messages("general");
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].content, "dos");
    }

    #[test]
    fn project_state_present_after_round_trip() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let mut projects = HashMap::new();
        let mut project = Project::new("Delta", "app", ProjectCategory::Educativo);
        project.state = ProjectState::Completado;
        projects.insert(project.team_name.clone(), project);
        store.write_projects(&projects).unwrap();

        let loaded = store.load_projects();
        assert_eq!(loaded.get("Delta").unwrap().state, ProjectState::Completado);
    }
}
