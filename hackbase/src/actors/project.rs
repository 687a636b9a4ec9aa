//! ProjectRegistryActor - single-writer registry keyed by team_name.
//!
//! The registry does not verify that team_name refers to an existing team;
//! it is treated as an opaque key (registries are independent).

use async_trait::async_trait;
use chrono::Utc;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use std::collections::HashMap;

use domain_types::{DomainError, FeedbackEntry, Project, ProjectCategory, ProjectState};

use crate::snapshot::SnapshotStore;

#[derive(Debug)]
pub enum ProjectRegistryMsg {
    CreateProject {
        team_name: String,
        description: String,
        category: ProjectCategory,
        reply: RpcReplyPort<Result<Project, DomainError>>,
    },
    UpdateState {
        team_name: String,
        new_state: ProjectState,
        reply: RpcReplyPort<Result<Project, DomainError>>,
    },
    AppendProgress {
        team_name: String,
        text: String,
        reply: RpcReplyPort<Result<Project, DomainError>>,
    },
    AppendFeedback {
        team_name: String,
        mentor_name: String,
        content: String,
        reply: RpcReplyPort<Result<Project, DomainError>>,
    },
    GetProject {
        team_name: String,
        reply: RpcReplyPort<Option<Project>>,
    },
    ListByCategory {
        category: ProjectCategory,
        reply: RpcReplyPort<Vec<Project>>,
    },
    ListByState {
        state: ProjectState,
        reply: RpcReplyPort<Vec<Project>>,
    },
    ListAll {
        reply: RpcReplyPort<Vec<Project>>,
    },
    Reset {
        reply: RpcReplyPort<()>,
    },
}

#[derive(Debug, Default)]
pub struct ProjectRegistryActor;

pub struct ProjectRegistryArguments {
    pub snapshots: SnapshotStore,
}

pub struct ProjectRegistryState {
    projects: HashMap<String, Project>,
    snapshots: SnapshotStore,
}

impl ProjectRegistryState {
    fn persist(&self) {
        if let Err(e) = self.snapshots.write_projects(&self.projects) {
            tracing::warn!(error = %e, "failed to persist project snapshot");
        }
    }
}

#[async_trait]
impl Actor for ProjectRegistryActor {
    type Msg = ProjectRegistryMsg;
    type State = ProjectRegistryState;
    type Arguments = ProjectRegistryArguments;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let projects = args.snapshots.load_projects();
        tracing::info!(
            actor_id = %myself.get_id(),
            count = projects.len(),
            "ProjectRegistryActor starting"
        );
        Ok(ProjectRegistryState {
            projects,
            snapshots: args.snapshots,
        })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            ProjectRegistryMsg::CreateProject {
                team_name,
                description,
                category,
                reply,
            } => {
                let result = if state.projects.contains_key(&team_name) {
                    Err(DomainError::ProjectExists)
                } else {
                    let project = Project::new(team_name.clone(), description, category);
                    state.projects.insert(team_name, project.clone());
                    state.persist();
                    Ok(project)
                };
                let _ = reply.send(result);
            }
            ProjectRegistryMsg::UpdateState {
                team_name,
                new_state,
                reply,
            } => {
                let result = match state.projects.get_mut(&team_name) {
                    None => Err(DomainError::ProjectNotFound),
                    Some(project) => {
                        project.state = new_state;
                        Ok(project.clone())
                    }
                };
                if result.is_ok() {
                    state.persist();
                }
                let _ = reply.send(result);
            }
            ProjectRegistryMsg::AppendProgress {
                team_name,
                text,
                reply,
            } => {
                let result = match state.projects.get_mut(&team_name) {
                    None => Err(DomainError::ProjectNotFound),
                    Some(project) => {
                        project.progress.insert(0, text);
                        Ok(project.clone())
                    }
                };
                if result.is_ok() {
                    state.persist();
                }
                let _ = reply.send(result);
            }
            ProjectRegistryMsg::AppendFeedback {
                team_name,
                mentor_name,
                content,
                reply,
            } => {
                let result = match state.projects.get_mut(&team_name) {
                    None => Err(DomainError::ProjectNotFound),
                    Some(project) => {
                        project.feedback.insert(
                            0,
                            FeedbackEntry {
                                mentor_name,
                                content,
                                at: Utc::now(),
                            },
                        );
                        Ok(project.clone())
                    }
                };
                if result.is_ok() {
                    state.persist();
                }
                let _ = reply.send(result);
            }
            ProjectRegistryMsg::GetProject { team_name, reply } => {
                let _ = reply.send(state.projects.get(&team_name).cloned());
            }
            ProjectRegistryMsg::ListByCategory { category, reply } => {
                let _ = reply.send(
                    state
                        .projects
                        .values()
                        .filter(|p| p.category == category)
                        .cloned()
                        .collect(),
                );
            }
            ProjectRegistryMsg::ListByState { state: st, reply } => {
                let _ = reply.send(
                    state
                        .projects
                        .values()
                        .filter(|p| p.state == st)
                        .cloned()
                        .collect(),
                );
            }
            ProjectRegistryMsg::ListAll { reply } => {
                let _ = reply.send(state.projects.values().cloned().collect());
            }
            ProjectRegistryMsg::Reset { reply } => {
                state.projects.clear();
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
        tracing::info!(actor_id = %myself.get_id(), "ProjectRegistryActor stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SnapshotStore;
    use tempfile::tempdir;

    async fn spawn_registry() -> (ActorRef<ProjectRegistryMsg>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let snapshots = SnapshotStore::new(dir.path());
        let (actor_ref, _handle) = Actor::spawn(
            None,
            ProjectRegistryActor,
            ProjectRegistryArguments { snapshots },
        )
        .await
        .unwrap();
        (actor_ref, dir)
    }

    #[tokio::test]
    async fn project_lifecycle() {
        let (registry, _dir) = spawn_registry().await;

        let created = ractor::call!(registry, |reply| ProjectRegistryMsg::CreateProject {
            team_name: "Gamma".into(),
            description: "app".into(),
            category: ProjectCategory::Educativo,
            reply,
        })
        .unwrap()
        .unwrap();
        assert_eq!(created.state, ProjectState::Iniciado);

        let updated = ractor::call!(registry, |reply| ProjectRegistryMsg::UpdateState {
            team_name: "Gamma".into(),
            new_state: ProjectState::EnProgreso,
            reply,
        })
        .unwrap()
        .unwrap();
        assert_eq!(updated.state, ProjectState::EnProgreso);

        let progressed = ractor::call!(registry, |reply| ProjectRegistryMsg::AppendProgress {
            team_name: "Gamma".into(),
            text: "proto".into(),
            reply,
        })
        .unwrap()
        .unwrap();
        assert_eq!(progressed.progress.len(), 1);

        registry.stop(None);
    }

    #[tokio::test]
    async fn create_project_without_team_still_succeeds() {
        let (registry, _dir) = spawn_registry().await;

        let created = ractor::call!(registry, |reply| ProjectRegistryMsg::CreateProject {
            team_name: "NoSuchTeam".into(),
            description: "app".into(),
            category: ProjectCategory::Social,
            reply,
        })
        .unwrap();
        assert!(created.is_ok());

        registry.stop(None);
    }

    #[tokio::test]
    async fn update_state_on_missing_project_fails() {
        let (registry, _dir) = spawn_registry().await;

        let result = ractor::call!(registry, |reply| ProjectRegistryMsg::UpdateState {
            team_name: "Ghost".into(),
            new_state: ProjectState::Completado,
            reply,
        })
        .unwrap();
        assert_eq!(result.unwrap_err(), DomainError::ProjectNotFound);

        registry.stop(None);
    }
}
