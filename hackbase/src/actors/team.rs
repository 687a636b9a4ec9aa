//! TeamRegistryActor - single-writer registry keyed by team name.

use async_trait::async_trait;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use std::collections::HashMap;

use domain_types::{DomainError, Participant, Team};

use crate::snapshot::SnapshotStore;

#[derive(Debug)]
pub enum TeamRegistryMsg {
    CreateTeam {
        name: String,
        topic: String,
        reply: RpcReplyPort<Result<Team, DomainError>>,
    },
    AddParticipant {
        team_name: String,
        person_name: String,
        email: String,
        reply: RpcReplyPort<Result<Team, DomainError>>,
    },
    GetTeam {
        name: String,
        reply: RpcReplyPort<Option<Team>>,
    },
    ListTeams {
        reply: RpcReplyPort<Vec<Team>>,
    },
    Reset {
        reply: RpcReplyPort<()>,
    },
}

#[derive(Debug, Default)]
pub struct TeamRegistryActor;

pub struct TeamRegistryArguments {
    pub snapshots: SnapshotStore,
}

pub struct TeamRegistryState {
    teams: HashMap<String, Team>,
    snapshots: SnapshotStore,
}

impl TeamRegistryState {
    fn persist(&self) {
        if let Err(e) = self.snapshots.write_teams(&self.teams) {
            tracing::warn!(error = %e, "failed to persist team snapshot");
        }
    }
}

#[async_trait]
impl Actor for TeamRegistryActor {
    type Msg = TeamRegistryMsg;
    type State = TeamRegistryState;
    type Arguments = TeamRegistryArguments;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let teams = args.snapshots.load_teams();
        tracing::info!(
            actor_id = %myself.get_id(),
            count = teams.len(),
            "TeamRegistryActor starting"
        );
        Ok(TeamRegistryState {
            teams,
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
            TeamRegistryMsg::CreateTeam { name, topic, reply } => {
                let result = if state.teams.contains_key(&name) {
                    Err(DomainError::TeamExists)
                } else {
                    let team = Team::new(name.clone(), topic);
                    state.teams.insert(name, team.clone());
                    state.persist();
                    Ok(team)
                };
                let _ = reply.send(result);
            }
            TeamRegistryMsg::AddParticipant {
                team_name,
                person_name,
                email,
                reply,
            } => {
                let result = match state.teams.get_mut(&team_name) {
                    None => Err(DomainError::TeamNotFound),
                    Some(team) => {
                        if team.participants.iter().any(|p| p.email == email) {
                            Err(DomainError::ParticipantDuplicate)
                        } else {
                            team.participants.insert(
                                0,
                                Participant {
                                    name: person_name,
                                    email,
                                },
                            );
                            Ok(team.clone())
                        }
                    }
                };
                if result.is_ok() {
                    state.persist();
                }
                let _ = reply.send(result);
            }
            TeamRegistryMsg::GetTeam { name, reply } => {
                let _ = reply.send(state.teams.get(&name).cloned());
            }
            TeamRegistryMsg::ListTeams { reply } => {
                let _ = reply.send(state.teams.values().cloned().collect());
            }
            TeamRegistryMsg::Reset { reply } => {
                state.teams.clear();
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
        tracing::info!(actor_id = %myself.get_id(), "TeamRegistryActor stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SnapshotStore;
    use tempfile::tempdir;

    async fn spawn_registry() -> (ActorRef<TeamRegistryMsg>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let snapshots = SnapshotStore::new(dir.path());
        let (actor_ref, _handle) = Actor::spawn(
            None,
            TeamRegistryActor,
            TeamRegistryArguments { snapshots },
        )
        .await
        .unwrap();
        (actor_ref, dir)
    }

    #[tokio::test]
    async fn duplicate_team_name_fails() {
        let (registry, _dir) = spawn_registry().await;

        let created = ractor::call!(registry, |reply| TeamRegistryMsg::CreateTeam {
            name: "Alpha".into(),
            topic: "AI".into(),
            reply,
        })
        .unwrap();
        assert!(created.is_ok());

        let duplicate = ractor::call!(registry, |reply| TeamRegistryMsg::CreateTeam {
            name: "Alpha".into(),
            topic: "IoT".into(),
            reply,
        })
        .unwrap();
        assert_eq!(duplicate.unwrap_err(), DomainError::TeamExists);

        let fetched = ractor::call!(registry, |reply| TeamRegistryMsg::GetTeam {
            name: "Alpha".into(),
            reply,
        })
        .unwrap();
        assert_eq!(fetched.unwrap().topic, "AI");

        registry.stop(None);
    }

    #[tokio::test]
    async fn duplicate_participant_email_fails() {
        let (registry, _dir) = spawn_registry().await;

        ractor::call!(registry, |reply| TeamRegistryMsg::CreateTeam {
            name: "Beta".into(),
            topic: "IoT".into(),
            reply,
        })
        .unwrap()
        .unwrap();

        let added = ractor::call!(registry, |reply| TeamRegistryMsg::AddParticipant {
            team_name: "Beta".into(),
            person_name: "Ana".into(),
            email: "a@x".into(),
            reply,
        })
        .unwrap();
        assert!(added.is_ok());

        let dup = ractor::call!(registry, |reply| TeamRegistryMsg::AddParticipant {
            team_name: "Beta".into(),
            person_name: "Ana G".into(),
            email: "a@x".into(),
            reply,
        })
        .unwrap();
        assert_eq!(dup.unwrap_err(), DomainError::ParticipantDuplicate);

        registry.stop(None);
    }

    #[tokio::test]
    async fn reset_empties_registry() {
        let (registry, _dir) = spawn_registry().await;

        ractor::call!(registry, |reply| TeamRegistryMsg::CreateTeam {
            name: "Gamma".into(),
            topic: "IA".into(),
            reply,
        })
        .unwrap()
        .unwrap();

        ractor::call!(registry, |reply| TeamRegistryMsg::Reset { reply }).unwrap();

        let teams = ractor::call!(registry, |reply| TeamRegistryMsg::ListTeams { reply }).unwrap();
        assert!(teams.is_empty());

        registry.stop(None);
    }
}
