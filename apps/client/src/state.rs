use std::sync::Arc;
use std::time::Duration;

use crate::api::MatchApi;
use crate::config::Config;
use crate::guard::GuardRegistry;
use crate::models::ids::UserId;
use crate::models::user::UserAccount;

/// Timings and links that shape the workflow, taken from `Config`.
#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    pub guard_cooldown: Duration,
    /// Wait between a successful résumé sync and the re-analysis it triggers,
    /// so the backend's résumé write is committed before analysis reads it.
    pub reanalyze_delay: Duration,
    pub search_base_url: String,
}

impl WorkflowSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            guard_cooldown: config.guard_cooldown,
            reanalyze_delay: config.reanalyze_delay,
            search_base_url: config.search_base_url.clone(),
        }
    }
}

/// Shared handle injected into every workflow component.
#[derive(Clone)]
pub struct ClientState {
    pub api: Arc<dyn MatchApi>,
    pub guards: GuardRegistry,
    pub user: UserAccount,
    pub settings: WorkflowSettings,
}

impl ClientState {
    pub fn new(api: Arc<dyn MatchApi>, user: UserAccount, settings: WorkflowSettings) -> Self {
        Self {
            api,
            guards: GuardRegistry::new(settings.guard_cooldown),
            user,
            settings,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user.id
    }
}
