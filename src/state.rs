use crate::{
    config::Config,
    services::{
        ConversationService, MessageService, PresenceService, ProfileService, ReadService,
        SidebarService,
    },
    websocket::{router::DeliveryRouter, ConnectionRegistry},
};
use sqlx::{Pool, Postgres};
use std::sync::Arc;

/// Everything a handler needs, constructed once at process start. Services
/// are plain structs over the pool; there are no process-wide singletons
/// beyond the pool itself.
#[derive(Clone)]
pub struct AppState {
    pub db: Pool<Postgres>,
    pub config: Arc<Config>,
    pub registry: ConnectionRegistry,
    pub router: DeliveryRouter,
    pub conversations: ConversationService,
    pub messages: MessageService,
    pub presence: PresenceService,
    pub reads: ReadService,
    pub sidebar: SidebarService,
    pub profiles: ProfileService,
}

impl AppState {
    pub fn new(
        db: Pool<Postgres>,
        config: Arc<Config>,
        registry: ConnectionRegistry,
        router: DeliveryRouter,
    ) -> Self {
        Self {
            conversations: ConversationService::new(db.clone()),
            messages: MessageService::new(db.clone()),
            presence: PresenceService::new(db.clone()),
            reads: ReadService::new(db.clone()),
            sidebar: SidebarService::new(db.clone()),
            profiles: ProfileService::new(db.clone()),
            db,
            config,
            registry,
            router,
        }
    }
}
