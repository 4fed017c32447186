use parking_lot::Mutex;
use tracing::{debug, info};

use crate::errors::WorkflowError;
use crate::models::ids::ResumeId;
use crate::models::resume::ResumeProfile;
use crate::state::ClientState;

/// Read-only cached copy of the user's current résumé.
/// Always replaced by a full reload, never patched.
pub struct ProfileCache {
    state: ClientState,
    cached: Mutex<Option<ResumeProfile>>,
}

impl ProfileCache {
    pub fn new(state: ClientState) -> Self {
        Self {
            state,
            cached: Mutex::new(None),
        }
    }

    pub fn current(&self) -> Option<ResumeProfile> {
        self.cached.lock().clone()
    }

    pub fn resume_id(&self) -> Option<ResumeId> {
        self.cached.lock().as_ref().map(|p| p.id)
    }

    /// Reloads from `GET /resumes/{user_id}`. A user without a résumé clears the cache.
    pub async fn reload(&self) -> Result<Option<ResumeProfile>, WorkflowError> {
        let profile = self.state.api.current_resume(self.state.user_id()).await?;

        match &profile {
            Some(p) => info!(
                "Résumé profile {} reloaded ({} skills, {} projects)",
                p.id,
                p.skills.len(),
                p.projects.len()
            ),
            None => debug!("User {} has no stored résumé", self.state.user_id()),
        }

        *self.cached.lock() = profile.clone();
        Ok(profile)
    }
}
