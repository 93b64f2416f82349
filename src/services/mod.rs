pub mod conversation;
pub mod message;
pub mod presence;
pub mod profile;
pub mod read;
pub mod sidebar;

pub use conversation::ConversationService;
pub use message::MessageService;
pub use presence::PresenceService;
pub use profile::ProfileService;
pub use read::ReadService;
pub use sidebar::SidebarService;
