//! ChatServerActor - rooms, history, and PubSub broadcast behind a global
//! singleton election.
//!
//! At most one chat server is active per cluster. A node attempts to spawn
//! the actor under the well-known global name `chat_server`; ractor's
//! registry rejects a second registration under that name, so the name
//! collision on spawn IS the "another holder exists" signal (§4.5). Callers
//! never address the actor directly - they go through [`ChatClient`], which
//! resolves the current holder via `ractor::registry::where_is` on every
//! call and forwards to it when this node is not the holder.
//!
//! Cross-node transport for the forwarding case is represented by the
//! [`RemoteDispatch`] trait; only [`LocalOnly`] is implemented here, since
//! real cluster membership and network forwarding are out of scope for the
//! single-host build.

use async_trait::async_trait;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use std::collections::HashMap;

use domain_types::{DomainError, Message, GENERAL_ROOM};

use crate::actors::pubsub::{topic_for_room, PubSubMsg};
use crate::snapshot::SnapshotStore;

pub const CHAT_SERVER_NAME: &str = "chat_server";

#[derive(Debug)]
pub enum ChatServerMsg {
    CreateRoom {
        name: String,
        reply: RpcReplyPort<Result<String, DomainError>>,
    },
    SendMessage {
        room: String,
        author: String,
        content: String,
    },
    History {
        room: String,
        reply: RpcReplyPort<Result<Vec<Message>, DomainError>>,
    },
    ListRooms {
        reply: RpcReplyPort<Vec<String>>,
    },
    Subscribe {
        room: String,
        subscriber: ActorRef<Message>,
        reply: RpcReplyPort<()>,
    },
    Unsubscribe {
        room: String,
        subscriber: ActorRef<Message>,
        reply: RpcReplyPort<()>,
    },
    Reset {
        reply: RpcReplyPort<()>,
    },
    ClusterInfo {
        reply: RpcReplyPort<ClusterInfo>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterInfo {
    pub is_holder: bool,
    pub node_name: String,
    pub room_count: usize,
}

#[derive(Debug, Default)]
pub struct ChatServerActor;

pub struct ChatServerArguments {
    pub snapshots: SnapshotStore,
    pub pubsub: ActorRef<PubSubMsg>,
    pub node_name: String,
}

pub struct ChatServerState {
    rooms: HashMap<String, Vec<Message>>,
    snapshots: SnapshotStore,
    pubsub: ActorRef<PubSubMsg>,
    node_name: String,
}

impl ChatServerState {
    fn persist_room(&self, room: &str) {
        if let Some(messages) = self.rooms.get(room) {
            if let Err(e) = self.snapshots.write_room_messages(room, messages) {
                tracing::warn!(error = %e, %room, "failed to persist room snapshot");
            }
        }
    }

    fn persist_index(&self) {
        let names: Vec<String> = self.rooms.keys().cloned().collect();
        if let Err(e) = self.snapshots.write_room_index(&names) {
            tracing::warn!(error = %e, "failed to persist chat room index");
        }
    }
}

#[async_trait]
impl Actor for ChatServerActor {
    type Msg = ChatServerMsg;
    type State = ChatServerState;
    type Arguments = ChatServerArguments;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let mut rooms: HashMap<String, Vec<Message>> = HashMap::new();
        for room in args.snapshots.load_room_index() {
            let messages = args.snapshots.load_room_messages(&room);
            rooms.insert(room, messages);
        }
        rooms.entry(GENERAL_ROOM.to_string()).or_default();

        tracing::info!(
            actor_id = %myself.get_id(),
            rooms = rooms.len(),
            "ChatServerActor starting as global holder"
        );

        let state = ChatServerState {
            rooms,
            snapshots: args.snapshots,
            pubsub: args.pubsub,
            node_name: args.node_name,
        };
        state.persist_index();
        state.persist_room(GENERAL_ROOM);
        Ok(state)
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            ChatServerMsg::CreateRoom { name, reply } => {
                let result = if state.rooms.contains_key(&name) {
                    Err(DomainError::RoomExists)
                } else {
                    state.rooms.insert(name.clone(), Vec::new());
                    state.persist_index();
                    state.persist_room(&name);
                    Ok(name)
                };
                let _ = reply.send(result);
            }
            ChatServerMsg::SendMessage {
                room,
                author,
                content,
            } => {
                if state.rooms.contains_key(&room) {
                    let message = Message::new(author, content, room.clone());
                    state.rooms.get_mut(&room).unwrap().insert(0, message.clone());
                    state.persist_room(&room);
                    let _ = ractor::cast!(
                        state.pubsub,
                        PubSubMsg::Publish {
                            topic: topic_for_room(&room),
                            message,
                        }
                    );
                } else {
                    tracing::debug!(%room, "dropped message for unknown room");
                }
            }
            ChatServerMsg::History { room, reply } => {
                let result = match state.rooms.get(&room) {
                    None => Err(DomainError::RoomNotFound),
                    Some(messages) => {
                        let mut ordered = messages.clone();
                        ordered.reverse();
                        Ok(ordered)
                    }
                };
                let _ = reply.send(result);
            }
            ChatServerMsg::ListRooms { reply } => {
                let _ = reply.send(state.rooms.keys().cloned().collect());
            }
            ChatServerMsg::Subscribe {
                room,
                subscriber,
                reply,
            } => {
                let _ = ractor::cast!(
                    state.pubsub,
                    PubSubMsg::Subscribe {
                        topic: topic_for_room(&room),
                        subscriber,
                    }
                );
                let _ = reply.send(());
            }
            ChatServerMsg::Unsubscribe {
                room,
                subscriber,
                reply,
            } => {
                let _ = ractor::cast!(
                    state.pubsub,
                    PubSubMsg::Unsubscribe {
                        topic: topic_for_room(&room),
                        subscriber,
                    }
                );
                let _ = reply.send(());
            }
            ChatServerMsg::Reset { reply } => {
                state.rooms.clear();
                state.rooms.insert(GENERAL_ROOM.to_string(), Vec::new());
                state.snapshots.clear_chat();
                state.persist_index();
                state.persist_room(GENERAL_ROOM);
                let _ = reply.send(());
            }
            ChatServerMsg::ClusterInfo { reply } => {
                let _ = reply.send(ClusterInfo {
                    is_holder: true,
                    node_name: state.node_name.clone(),
                    room_count: state.rooms.len(),
                });
            }
        }
        Ok(())
    }

    async fn post_stop(
        &self,
        myself: ActorRef<Self::Msg>,
        _state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        tracing::warn!(
            actor_id = %myself.get_id(),
            "ChatServerActor stopped; chat state is lost until a fresh election"
        );
        Ok(())
    }
}

// ============================================================================
// Remote dispatch seam
// ============================================================================

#[async_trait]
pub trait RemoteDispatch: Send + Sync + 'static {
    async fn forward_create_room(&self, name: String) -> Result<String, DomainError>;
    async fn forward_send_message(
        &self,
        room: String,
        author: String,
        content: String,
    ) -> Result<(), DomainError>;
    async fn forward_history(&self, room: String) -> Result<Vec<Message>, DomainError>;
    async fn forward_list_rooms(&self) -> Result<Vec<String>, DomainError>;
    async fn forward_reset(&self) -> Result<(), DomainError>;
    async fn forward_cluster_info(&self) -> Result<ClusterInfo, DomainError>;
}

/// The only implementation shipped: there is no real cluster transport, so
/// every forward simply reports the holder as unreachable.
#[derive(Debug, Default, Clone)]
pub struct LocalOnly;

#[async_trait]
impl RemoteDispatch for LocalOnly {
    async fn forward_create_room(&self, _name: String) -> Result<String, DomainError> {
        Err(DomainError::ChatUnavailable)
    }

    async fn forward_send_message(
        &self,
        _room: String,
        _author: String,
        _content: String,
    ) -> Result<(), DomainError> {
        Err(DomainError::ChatUnavailable)
    }

    async fn forward_history(&self, _room: String) -> Result<Vec<Message>, DomainError> {
        Err(DomainError::ChatUnavailable)
    }

    async fn forward_list_rooms(&self) -> Result<Vec<String>, DomainError> {
        Err(DomainError::ChatUnavailable)
    }

    async fn forward_reset(&self) -> Result<(), DomainError> {
        Err(DomainError::ChatUnavailable)
    }

    async fn forward_cluster_info(&self) -> Result<ClusterInfo, DomainError> {
        Err(DomainError::ChatUnavailable)
    }
}

/// Transparent-dispatch client: resolves the global holder on every call.
pub struct ChatClient<R: RemoteDispatch = LocalOnly> {
    remote: R,
}

impl<R: RemoteDispatch> ChatClient<R> {
    pub fn new(remote: R) -> Self {
        Self { remote }
    }

    fn resolve() -> Option<ActorRef<ChatServerMsg>> {
        ractor::registry::where_is(CHAT_SERVER_NAME.to_string()).map(ActorRef::from)
    }

    pub async fn create_room(&self, name: String) -> Result<String, DomainError> {
        match Self::resolve() {
            Some(holder) => ractor::call!(holder, |reply| ChatServerMsg::CreateRoom {
                name,
                reply
            })
            .map_err(|_| DomainError::ChatUnavailable)?,
            None => self.remote.forward_create_room(name).await,
        }
    }

    pub async fn send_message(
        &self,
        room: String,
        author: String,
        content: String,
    ) -> Result<(), DomainError> {
        match Self::resolve() {
            Some(holder) => ractor::cast!(
                holder,
                ChatServerMsg::SendMessage {
                    room,
                    author,
                    content,
                }
            )
            .map_err(|_| DomainError::ChatUnavailable),
            None => self.remote.forward_send_message(room, author, content).await,
        }
    }

    pub async fn history(&self, room: String) -> Result<Vec<Message>, DomainError> {
        match Self::resolve() {
            Some(holder) => {
                ractor::call!(holder, |reply| ChatServerMsg::History { room, reply })
                    .map_err(|_| DomainError::ChatUnavailable)?
            }
            None => self.remote.forward_history(room).await,
        }
    }

    pub async fn list_rooms(&self) -> Result<Vec<String>, DomainError> {
        match Self::resolve() {
            Some(holder) => ractor::call!(holder, |reply| ChatServerMsg::ListRooms { reply })
                .map_err(|_| DomainError::ChatUnavailable),
            None => self.remote.forward_list_rooms().await,
        }
    }

    pub async fn subscribe(
        &self,
        room: String,
        subscriber: ActorRef<Message>,
    ) -> Result<(), DomainError> {
        match Self::resolve() {
            Some(holder) => ractor::call!(holder, |reply| ChatServerMsg::Subscribe {
                room,
                subscriber,
                reply,
            })
            .map_err(|_| DomainError::ChatUnavailable),
            None => Err(DomainError::ChatUnavailable),
        }
    }

    pub async fn unsubscribe(
        &self,
        room: String,
        subscriber: ActorRef<Message>,
    ) -> Result<(), DomainError> {
        match Self::resolve() {
            Some(holder) => ractor::call!(holder, |reply| ChatServerMsg::Unsubscribe {
                room,
                subscriber,
                reply,
            })
            .map_err(|_| DomainError::ChatUnavailable),
            None => Err(DomainError::ChatUnavailable),
        }
    }

    pub async fn reset(&self) -> Result<(), DomainError> {
        match Self::resolve() {
            Some(holder) => ractor::call!(holder, |reply| ChatServerMsg::Reset { reply })
                .map_err(|_| DomainError::ChatUnavailable),
            None => self.remote.forward_reset().await,
        }
    }

    pub async fn cluster_info(&self) -> Result<ClusterInfo, DomainError> {
        match Self::resolve() {
            Some(holder) => ractor::call!(holder, |reply| ChatServerMsg::ClusterInfo { reply })
                .map_err(|_| DomainError::ChatUnavailable),
            None => self.remote.forward_cluster_info().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::pubsub::PubSubActor;
    use serial_test::serial;
    use tempfile::tempdir;

    // `ChatServerActor` registers under the fixed global name
    // `CHAT_SERVER_NAME`; every test here competes for that one registry
    // slot, so they must not run concurrently with each other or with the
    // supervisor/app_state tests that also spawn a chat server.
    async fn spawn_chat() -> (ChatClient, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let snapshots = SnapshotStore::new(dir.path());
        let (pubsub, _h1) = Actor::spawn(None, PubSubActor, ()).await.unwrap();
        let (_chat_ref, _h2) = Actor::spawn(
            Some(CHAT_SERVER_NAME.to_string()),
            ChatServerActor,
            ChatServerArguments {
                snapshots,
                pubsub,
                node_name: "test-node".to_string(),
            },
        )
        .await
        .unwrap();
        (ChatClient::new(LocalOnly), dir)
    }

    #[serial]
    #[tokio::test]
    async fn general_room_exists_on_start() {
        let (client, _dir) = spawn_chat().await;
        let rooms = client.list_rooms().await.unwrap();
        assert!(rooms.contains(&GENERAL_ROOM.to_string()));
    }

    #[serial]
    #[tokio::test]
    async fn message_ordering_is_send_order() {
        let (client, _dir) = spawn_chat().await;
        client
            .create_room("Room1".to_string())
            .await
            .unwrap();

        client
            .send_message("Room1".into(), "A".into(), "uno".into())
            .await
            .unwrap();
        client
            .send_message("Room1".into(), "B".into(), "dos".into())
            .await
            .unwrap();
        client
            .send_message("Room1".into(), "C".into(), "tres".into())
            .await
            .unwrap();

        // cast is fire-and-forget; give the actor's mailbox a moment to drain.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let history = client.history("Room1".to_string()).await.unwrap();
        let contents: Vec<&str> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["uno", "dos", "tres"]);
    }

    #[serial]
    #[tokio::test]
    async fn history_on_missing_room_fails() {
        let (client, _dir) = spawn_chat().await;
        let result = client.history("Ghost".to_string()).await;
        assert_eq!(result.unwrap_err(), DomainError::RoomNotFound);
    }

    #[serial]
    #[tokio::test]
    async fn reset_leaves_only_general() {
        let (client, _dir) = spawn_chat().await;
        client.create_room("Extra".to_string()).await.unwrap();
        client.reset().await.unwrap();

        let rooms = client.list_rooms().await.unwrap();
        assert_eq!(rooms, vec![GENERAL_ROOM.to_string()]);

        let history = client.history(GENERAL_ROOM.to_string()).await.unwrap();
        assert!(history.is_empty());
    }
}
