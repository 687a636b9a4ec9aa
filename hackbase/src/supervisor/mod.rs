//! ApplicationSupervisor - root of the supervision tree.
//!
//! Start order (strict, per §4.7): PubSub bus -> Team -> Project ->
//! Chat (only if this node wins the global-name election) -> Mentor.
//! Strategy: on a child crash, restart that child alone; the crashed child
//! rebuilds its state from the snapshot store on re-init. This mirrors
//! `ApplicationSupervisor::handle_supervisor_evt`'s per-child respawn
//! pattern, trimmed to this crate's four registries.

use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort, SupervisionEvent};

use crate::actors::chat::{ChatServerActor, ChatServerArguments, CHAT_SERVER_NAME};
use crate::actors::mentor::{MentorRegistryActor, MentorRegistryArguments, MentorRegistryMsg};
use crate::actors::project::{ProjectRegistryActor, ProjectRegistryArguments, ProjectRegistryMsg};
use crate::actors::pubsub::PubSubActor;
use crate::actors::team::{TeamRegistryActor, TeamRegistryArguments, TeamRegistryMsg};
use crate::snapshot::SnapshotStore;

#[derive(Debug, Default)]
pub struct ApplicationSupervisor;

#[derive(Debug, Clone)]
pub struct ApplicationSupervisorArguments {
    pub snapshots: SnapshotStore,
    pub node_name: String,
}

pub struct ApplicationSupervisorState {
    snapshots: SnapshotStore,
    node_name: String,
    team_registry: ActorRef<TeamRegistryMsg>,
    project_registry: ActorRef<ProjectRegistryMsg>,
    mentor_registry: ActorRef<MentorRegistryMsg>,
    chat_elected: bool,
    counts: SupervisionEventCounts,
    last_failure: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupervisionEventCounts {
    pub actor_started: u64,
    pub actor_failed: u64,
    pub actor_terminated: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SupervisorHealth {
    pub chat_elected: bool,
    pub counts: SupervisionEventCounts,
    pub last_failure: Option<String>,
}

#[derive(Debug)]
pub enum ApplicationSupervisorMsg {
    GetTeamRegistry {
        reply: RpcReplyPort<ActorRef<TeamRegistryMsg>>,
    },
    GetProjectRegistry {
        reply: RpcReplyPort<ActorRef<ProjectRegistryMsg>>,
    },
    GetMentorRegistry {
        reply: RpcReplyPort<ActorRef<MentorRegistryMsg>>,
    },
    GetHealth {
        reply: RpcReplyPort<SupervisorHealth>,
    },
}

#[ractor::async_trait]
impl Actor for ApplicationSupervisor {
    type Msg = ApplicationSupervisorMsg;
    type State = ApplicationSupervisorState;
    type Arguments = ApplicationSupervisorArguments;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!(supervisor = %myself.get_id(), "ApplicationSupervisor starting");

        let (pubsub, _) =
            Actor::spawn_linked(None, PubSubActor, (), myself.get_cell()).await?;

        let (team_registry, _) = Actor::spawn_linked(
            None,
            TeamRegistryActor,
            TeamRegistryArguments {
                snapshots: args.snapshots.clone(),
            },
            myself.get_cell(),
        )
        .await?;

        let (project_registry, _) = Actor::spawn_linked(
            None,
            ProjectRegistryActor,
            ProjectRegistryArguments {
                snapshots: args.snapshots.clone(),
            },
            myself.get_cell(),
        )
        .await?;

        let chat_elected = spawn_chat(&args.snapshots, &pubsub, &args.node_name, myself.get_cell())
            .await
            .is_some();

        let (mentor_registry, _) = Actor::spawn_linked(
            None,
            MentorRegistryActor,
            MentorRegistryArguments {
                snapshots: args.snapshots.clone(),
                project_registry: project_registry.clone(),
            },
            myself.get_cell(),
        )
        .await?;

        Ok(ApplicationSupervisorState {
            snapshots: args.snapshots,
            node_name: args.node_name,
            team_registry,
            project_registry,
            mentor_registry,
            chat_elected,
            counts: SupervisionEventCounts::default(),
            last_failure: None,
        })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            ApplicationSupervisorMsg::GetTeamRegistry { reply } => {
                let _ = reply.send(state.team_registry.clone());
            }
            ApplicationSupervisorMsg::GetProjectRegistry { reply } => {
                let _ = reply.send(state.project_registry.clone());
            }
            ApplicationSupervisorMsg::GetMentorRegistry { reply } => {
                let _ = reply.send(state.mentor_registry.clone());
            }
            ApplicationSupervisorMsg::GetHealth { reply } => {
                let _ = reply.send(SupervisorHealth {
                    chat_elected: state.chat_elected,
                    counts: state.counts.clone(),
                    last_failure: state.last_failure.clone(),
                });
            }
        }
        Ok(())
    }

    async fn handle_supervisor_evt(
        &self,
        myself: ActorRef<Self::Msg>,
        event: SupervisionEvent,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        tracing::info!(supervisor = %myself.get_id(), event = ?event, "supervision event");
        match &event {
            SupervisionEvent::ActorStarted(_) => {
                state.counts.actor_started += 1;
            }
            SupervisionEvent::ActorFailed(cell, err) => {
                state.counts.actor_failed += 1;
                state.last_failure = Some(format!("actor_id={} error={err}", cell.get_id()));
            }
            SupervisionEvent::ActorTerminated(cell, _, _) => {
                state.counts.actor_terminated += 1;

                if cell.get_id() == state.team_registry.get_id() {
                    if let Ok((fresh, _)) = Actor::spawn_linked(
                        None,
                        TeamRegistryActor,
                        TeamRegistryArguments {
                            snapshots: state.snapshots.clone(),
                        },
                        myself.get_cell(),
                    )
                    .await
                    {
                        tracing::info!("respawned TeamRegistryActor after termination");
                        state.team_registry = fresh;
                    }
                } else if cell.get_id() == state.project_registry.get_id() {
                    if let Ok((fresh, _)) = Actor::spawn_linked(
                        None,
                        ProjectRegistryActor,
                        ProjectRegistryArguments {
                            snapshots: state.snapshots.clone(),
                        },
                        myself.get_cell(),
                    )
                    .await
                    {
                        tracing::info!("respawned ProjectRegistryActor after termination");
                        state.project_registry = fresh;
                    }
                } else if cell.get_id() == state.mentor_registry.get_id() {
                    if let Ok((fresh, _)) = Actor::spawn_linked(
                        None,
                        MentorRegistryActor,
                        MentorRegistryArguments {
                            snapshots: state.snapshots.clone(),
                            project_registry: state.project_registry.clone(),
                        },
                        myself.get_cell(),
                    )
                    .await
                    {
                        tracing::info!("respawned MentorRegistryActor after termination");
                        state.mentor_registry = fresh;
                    }
                } else if state.chat_elected {
                    // We cannot cheaply tell "was this the chat actor" apart from an
                    // arbitrary third party without tracking its id, so only attempt
                    // re-election when we believe we held it.
                    tracing::warn!("a supervised child terminated; chat state is lost until re-election on next startup");
                    state.chat_elected = false;
                }
            }
            _ => {}
        }
        Ok(())
    }

    async fn post_stop(
        &self,
        myself: ActorRef<Self::Msg>,
        _state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        tracing::info!(supervisor = %myself.get_id(), "ApplicationSupervisor stopped");
        Ok(())
    }
}

async fn spawn_chat(
    snapshots: &SnapshotStore,
    pubsub: &ActorRef<crate::actors::pubsub::PubSubMsg>,
    node_name: &str,
    supervisor_cell: ractor::ActorCell,
) -> Option<ActorRef<crate::actors::chat::ChatServerMsg>> {
    match Actor::spawn_linked(
        Some(CHAT_SERVER_NAME.to_string()),
        ChatServerActor,
        ChatServerArguments {
            snapshots: snapshots.clone(),
            pubsub: pubsub.clone(),
            node_name: node_name.to_string(),
        },
        supervisor_cell,
    )
    .await
    {
        Ok((chat_ref, _)) => {
            tracing::info!("elected as chat server global holder");
            Some(chat_ref)
        }
        Err(e) => {
            tracing::info!(error = %e, "not elected as chat server holder; deferring to existing one");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::tempdir;

    // Spawning a supervisor here attempts the chat-server singleton
    // election under the fixed global name, which races with any other
    // test in the binary doing the same; serialize against them.
    #[serial]
    #[tokio::test]
    async fn supervisor_starts_all_registries() {
        let dir = tempdir().unwrap();
        let (supervisor, _handle) = Actor::spawn(
            None,
            ApplicationSupervisor,
            ApplicationSupervisorArguments {
                snapshots: SnapshotStore::new(dir.path()),
                node_name: "test-node".to_string(),
            },
        )
        .await
        .unwrap();

        let team_registry = ractor::call!(supervisor, |reply| {
            ApplicationSupervisorMsg::GetTeamRegistry { reply }
        })
        .unwrap();

        let created = ractor::call!(team_registry, |reply| {
            crate::actors::team::TeamRegistryMsg::CreateTeam {
                name: "Alpha".into(),
                topic: "AI".into(),
                reply,
            }
        })
        .unwrap();
        assert!(created.is_ok());

        let health = ractor::call!(supervisor, |reply| {
            ApplicationSupervisorMsg::GetHealth { reply }
        })
        .unwrap();
        assert!(health.chat_elected);

        supervisor.stop(None);
    }
}
