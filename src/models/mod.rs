pub mod conversation;
pub mod message;
pub mod user;

pub use conversation::Conversation;
pub use message::{MessageRecord, ReplySnippet, DELETED_PLACEHOLDER};
pub use user::UserProfile;
