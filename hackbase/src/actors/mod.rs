pub mod chat;
pub mod mentor;
pub mod project;
pub mod pubsub;
pub mod team;

pub use chat::{
    ChatClient, ChatServerActor, ChatServerArguments, ChatServerMsg, ClusterInfo, LocalOnly,
    RemoteDispatch, CHAT_SERVER_NAME,
};
pub use mentor::{MentorRegistryActor, MentorRegistryArguments, MentorRegistryMsg};
pub use project::{ProjectRegistryActor, ProjectRegistryArguments, ProjectRegistryMsg};
pub use pubsub::{PubSubActor, PubSubMsg};
pub use team::{TeamRegistryActor, TeamRegistryArguments, TeamRegistryMsg};
