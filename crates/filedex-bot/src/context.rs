//! The bot's shared state: every repository, engine and store a command
//! handler might need, assembled once at startup and handed to handlers
//! as a single `Arc<Context>`. Deliberately flat — handlers reach into
//! `ctx.access`, `ctx.delivery`, etc. directly rather than Context
//! exposing its own facade methods, so each component's behavior stays
//! owned by the crate that defines it.

use std::sync::Arc;

use tokio::sync::Mutex;

use filedex_access::{AccessRepository, ConnectionStore, FilterStore, SettingsView};
use filedex_broadcast::BroadcastEngine;
use filedex_cache::{CacheStore, Invalidator};
use filedex_core::config::FiledexConfig;
use filedex_delivery::{BatchLinkStore, DeliveryEngine, PlatformClient};
use filedex_deletion::DeletionQueue;
use filedex_index::{ChannelStore, MediaRepository};
use filedex_ingest::IngestQueue;
use filedex_maintenance::MaintenanceLoop;
use filedex_query::{QueryPipeline, RecommendationProvider, SessionStore};
use filedex_ratelimit::{ActionLimiter, SemaphoreSet};
use filedex_subscription::SubscriptionGate;

pub struct Context {
    pub config: Arc<FiledexConfig>,
    pub platform: Arc<dyn PlatformClient>,

    pub access: Arc<AccessRepository>,
    pub media: Arc<MediaRepository>,
    pub cache: Arc<dyn CacheStore>,
    pub cache_invalidator: Arc<Invalidator>,
    pub filters: Arc<FilterStore>,
    pub connections: Arc<ConnectionStore>,
    pub settings: Arc<SettingsView>,
    pub channels: Arc<ChannelStore>,
    pub ingest_queue: Arc<IngestQueue>,

    pub sessions: Arc<SessionStore>,
    pub query: Arc<QueryPipeline>,
    pub recommendations: Arc<dyn RecommendationProvider>,
    pub delivery: Arc<DeliveryEngine>,
    pub broadcast: Arc<BroadcastEngine>,
    pub batch_links: Arc<BatchLinkStore>,
    pub deletion_queue: Arc<DeletionQueue>,
    pub maintenance: Arc<MaintenanceLoop>,
    pub subscription_gate: Arc<SubscriptionGate>,

    pub rate_limiter: Arc<ActionLimiter>,
    pub semaphores: Arc<SemaphoreSet>,

    /// Holds the cancel sender of whichever broadcast is currently running,
    /// if any, so `/stop_broadcast` can reach it.
    pub broadcast_cancel: Arc<Mutex<Option<tokio::sync::watch::Sender<bool>>>>,
}

impl Context {
    pub fn is_owner(&self, principal_id: i64) -> bool {
        self.config.platform.owner_ids.contains(&principal_id)
    }

    pub fn is_admin(&self, principal_id: i64) -> bool {
        self.is_owner(principal_id) || self.config.platform.admin_ids.contains(&principal_id)
    }

    pub fn is_auth(&self, principal_id: i64) -> bool {
        self.is_admin(principal_id) || self.config.platform.auth_ids.contains(&principal_id)
    }
}
