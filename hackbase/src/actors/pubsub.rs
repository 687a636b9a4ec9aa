//! PubSubActor - topic broadcast over ractor Process Groups.
//!
//! Thin wrapper around `ractor::pg` so the Chat Server never touches the
//! global process-group API directly. One topic per room: `chat:<room>`.

use async_trait::async_trait;
use ractor::{Actor, ActorProcessingErr, ActorRef};

use domain_types::Message;

pub fn topic_for_room(room: &str) -> String {
    format!("chat:{room}")
}

#[derive(Debug)]
pub enum PubSubMsg {
    Publish {
        topic: String,
        message: Message,
    },
    Subscribe {
        topic: String,
        subscriber: ActorRef<Message>,
    },
    Unsubscribe {
        topic: String,
        subscriber: ActorRef<Message>,
    },
}

#[derive(Debug, Default)]
pub struct PubSubActor;

pub struct PubSubState;

#[async_trait]
impl Actor for PubSubActor {
    type Msg = PubSubMsg;
    type State = PubSubState;
    type Arguments = ();

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        _args: (),
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!(actor_id = %myself.get_id(), "PubSubActor starting");
        Ok(PubSubState)
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        _state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            PubSubMsg::Publish { topic, message } => {
                let members = ractor::pg::get_members(&topic);
                for member in members {
                    let actor_id = member.get_id();
                    let actor_ref: ActorRef<Message> = member.into();
                    if let Err(e) = ractor::cast!(actor_ref, message.clone()) {
                        tracing::warn!(%topic, %actor_id, error = %e, "failed to deliver message to subscriber");
                    }
                }
            }
            PubSubMsg::Subscribe { topic, subscriber } => {
                ractor::pg::join(topic.clone(), vec![subscriber.get_cell()]);
                tracing::debug!(%topic, subscriber = %subscriber.get_id(), "subscribed");
            }
            PubSubMsg::Unsubscribe { topic, subscriber } => {
                ractor::pg::leave(topic.clone(), vec![subscriber.get_cell()]);
                tracing::debug!(%topic, subscriber = %subscriber.get_id(), "unsubscribed");
            }
        }
        Ok(())
    }

    async fn post_stop(
        &self,
        myself: ActorRef<Self::Msg>,
        _state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        tracing::info!(actor_id = %myself.get_id(), "PubSubActor stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_naming() {
        assert_eq!(topic_for_room("general"), "chat:general");
    }
}
