//! MentorRegistryActor - single-writer registry keyed by mentor id.
//!
//! `send_feedback` commits the mentor-side append first, then calls into the
//! Project Registry. The two writes are not atomic: if the project call
//! fails, the mentor-side append is not rolled back (documented, not a bug).

use async_trait::async_trait;
use chrono::Utc;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use std::collections::HashMap;

use domain_types::{DomainError, Mentor, MentorFeedback};

use crate::actors::project::ProjectRegistryMsg;
use crate::snapshot::SnapshotStore;

#[derive(Debug)]
pub enum MentorRegistryMsg {
    RegisterMentor {
        name: String,
        specialty: String,
        reply: RpcReplyPort<Mentor>,
    },
    SendFeedback {
        mentor_id: String,
        team_name: String,
        content: String,
        reply: RpcReplyPort<Result<Mentor, DomainError>>,
    },
    GetMentor {
        id: String,
        reply: RpcReplyPort<Option<Mentor>>,
    },
    ListMentors {
        reply: RpcReplyPort<Vec<Mentor>>,
    },
    FindBySpecialty {
        specialty: String,
        reply: RpcReplyPort<Vec<Mentor>>,
    },
    Reset {
        reply: RpcReplyPort<()>,
    },
}

#[derive(Debug, Default)]
pub struct MentorRegistryActor;

pub struct MentorRegistryArguments {
    pub snapshots: SnapshotStore,
    pub project_registry: ActorRef<ProjectRegistryMsg>,
}

pub struct MentorRegistryState {
    mentors: HashMap<String, Mentor>,
    snapshots: SnapshotStore,
    project_registry: ActorRef<ProjectRegistryMsg>,
}

impl MentorRegistryState {
    fn persist(&self) {
        if let Err(e) = self.snapshots.write_mentors(&self.mentors) {
            tracing::warn!(error = %e, "failed to persist mentor snapshot");
        }
    }
}

#[async_trait]
impl Actor for MentorRegistryActor {
    type Msg = MentorRegistryMsg;
    type State = MentorRegistryState;
    type Arguments = MentorRegistryArguments;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let mentors = args.snapshots.load_mentors();
        tracing::info!(
            actor_id = %myself.get_id(),
            count = mentors.len(),
            "MentorRegistryActor starting"
        );
        Ok(MentorRegistryState {
            mentors,
            snapshots: args.snapshots,
            project_registry: args.project_registry,
        })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            MentorRegistryMsg::RegisterMentor {
                name,
                specialty,
                reply,
            } => {
                let mentor = Mentor::new(name, specialty);
                state.mentors.insert(mentor.id.clone(), mentor.clone());
                state.persist();
                let _ = reply.send(mentor);
            }
            MentorRegistryMsg::SendFeedback {
                mentor_id,
                team_name,
                content,
                reply,
            } => {
                let result = self
                    .handle_send_feedback(mentor_id, team_name, content, state)
                    .await;
                let _ = reply.send(result);
            }
            MentorRegistryMsg::GetMentor { id, reply } => {
                let _ = reply.send(state.mentors.get(&id).cloned());
            }
            MentorRegistryMsg::ListMentors { reply } => {
                let _ = reply.send(state.mentors.values().cloned().collect());
            }
            MentorRegistryMsg::FindBySpecialty { specialty, reply } => {
                let needle = specialty.to_lowercase();
                let _ = reply.send(
                    state
                        .mentors
                        .values()
                        .filter(|m| m.specialty.to_lowercase() == needle)
                        .cloned()
                        .collect(),
                );
            }
            MentorRegistryMsg::Reset { reply } => {
                state.mentors.clear();
                state.persist();
                let _ = reply.send(());
            }
        }
        Ok(())
    }

    async fn post_stop(
        &self,
        myself: ActorRef<Self::Msg>,
        _state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        tracing::info!(actor_id = %myself.get_id(), "MentorRegistryActor stopped");
        Ok(())
    }
}

impl MentorRegistryActor {
    async fn handle_send_feedback(
        &self,
        mentor_id: String,
        team_name: String,
        content: String,
        state: &mut MentorRegistryState,
    ) -> Result<Mentor, DomainError> {
        let mentor = state
            .mentors
            .get_mut(&mentor_id)
            .ok_or(DomainError::MentorNotFound)?;

        mentor.feedback_given.insert(
            0,
            MentorFeedback {
                team_name: team_name.clone(),
                content: content.clone(),
                at: Utc::now(),
            },
        );
        let updated = mentor.clone();
        state.persist();

        let project_call = ractor::call!(state.project_registry, |reply| {
            ProjectRegistryMsg::AppendFeedback {
                team_name,
                mentor_name: updated.name.clone(),
                content,
                reply,
            }
        });
        match project_call {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "mentor feedback committed but project append failed");
            }
            Err(e) => {
                tracing::warn!(error = %e, "mentor feedback committed but project registry unreachable");
            }
        }

        Ok(updated)
    }
}

/// Used only by tests and the load harness to make sure ids look right.
pub fn is_short_id(id: &str) -> bool {
    id.len() == 8 && id.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::project::{ProjectRegistryActor, ProjectRegistryArguments};
    use crate::snapshot::SnapshotStore;
    use domain_types::ProjectCategory;
    use tempfile::tempdir;

    async fn spawn_pair() -> (
        ActorRef<MentorRegistryMsg>,
        ActorRef<ProjectRegistryMsg>,
        tempfile::TempDir,
    ) {
        let dir = tempdir().unwrap();
        let snapshots = SnapshotStore::new(dir.path());
        let (project_registry, _h1) = Actor::spawn(
            None,
            ProjectRegistryActor,
            ProjectRegistryArguments {
                snapshots: snapshots.clone(),
            },
        )
        .await
        .unwrap();
        let (mentor_registry, _h2) = Actor::spawn(
            None,
            MentorRegistryActor,
            MentorRegistryArguments {
                snapshots,
                project_registry: project_registry.clone(),
            },
        )
        .await
        .unwrap();
        (mentor_registry, project_registry, dir)
    }

    #[tokio::test]
    async fn feedback_crosses_into_project() {
        let (mentors, projects, _dir) = spawn_pair().await;

        ractor::call!(projects, |reply| ProjectRegistryMsg::CreateProject {
            team_name: "Delta".into(),
            description: "app".into(),
            category: ProjectCategory::Educativo,
            reply,
        })
        .unwrap()
        .unwrap();

        let mentor = ractor::call!(mentors, |reply| MentorRegistryMsg::RegisterMentor {
            name: "Dr S".into(),
            specialty: "IA".into(),
            reply,
        })
        .unwrap();
        assert!(is_short_id(&mentor.id));

        let updated = ractor::call!(mentors, |reply| MentorRegistryMsg::SendFeedback {
            mentor_id: mentor.id.clone(),
            team_name: "Delta".into(),
            content: "good".into(),
            reply,
        })
        .unwrap()
        .unwrap();
        assert_eq!(updated.feedback_given.len(), 1);

        let project = ractor::call!(projects, |reply| ProjectRegistryMsg::GetProject {
            team_name: "Delta".into(),
            reply,
        })
        .unwrap()
        .unwrap();
        assert_eq!(project.feedback.len(), 1);

        mentors.stop(None);
        projects.stop(None);
    }

    #[tokio::test]
    async fn unknown_mentor_fails() {
        let (mentors, projects, _dir) = spawn_pair().await;

        let result = ractor::call!(mentors, |reply| MentorRegistryMsg::SendFeedback {
            mentor_id: "deadbeef".into(),
            team_name: "Delta".into(),
            content: "good".into(),
            reply,
        })
        .unwrap();
        assert_eq!(result.unwrap_err(), DomainError::MentorNotFound);

        mentors.stop(None);
        projects.stop(None);
    }

    #[tokio::test]
    async fn specialty_search_is_case_insensitive() {
        let (mentors, projects, _dir) = spawn_pair().await;

        ractor::call!(mentors, |reply| MentorRegistryMsg::RegisterMentor {
            name: "Dr S".into(),
            specialty: "IA".into(),
            reply,
        })
        .unwrap();

        let found = ractor::call!(mentors, |reply| MentorRegistryMsg::FindBySpecialty {
            specialty: "ia".into(),
            reply,
        })
        .unwrap();
        assert_eq!(found.len(), 1);

        mentors.stop(None);
        projects.stop(None);
    }
}
