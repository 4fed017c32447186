//! Action Guard Registry: suppresses duplicate concurrent triggers of the
//! same side-effecting action.
//!
//! Keys are scoped by `ActionClass`, so a "start learning" guard on a skill
//! named `"42"` never collides with a task-mutation guard on task `42`.
//! A `GuardPermit` releases its key when dropped, which covers every exit
//! path of the guarded action (success, remote failure, validation failure,
//! early return). Click-triggered actions release after a cool-down so a
//! rapid second click that races the remote response is still rejected.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

/// Namespace of a guard key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionClass {
    /// Submit / re-analyze on the analysis session. Keyed by the session.
    Analysis,
    /// Task creation from a gap item. Keyed by normalized skill name.
    StartLearning,
    /// Complete and résumé-sync share this class: keyed by task id, so a task
    /// can never be completing and syncing at once.
    TaskMutation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReleasePolicy {
    Immediate,
    AfterCooldown,
}

/// Shared set of held keys. Cloning shares the same set.
#[derive(Debug, Clone)]
pub struct GuardRegistry {
    held: Arc<Mutex<HashSet<(ActionClass, String)>>>,
    cooldown: Duration,
}

impl GuardRegistry {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            held: Arc::new(Mutex::new(HashSet::new())),
            cooldown,
        }
    }

    /// Marks `key` held. Returns false if it already was.
    pub fn try_acquire(&self, class: ActionClass, key: &str) -> bool {
        let acquired = self.held.lock().insert((class, key.to_string()));
        if !acquired {
            debug!("Guard {:?}/{} already held", class, key);
        }
        acquired
    }

    /// Releases `key` now. Releasing a key that is not held is a no-op.
    pub fn release(&self, class: ActionClass, key: &str) {
        self.held.lock().remove(&(class, key.to_string()));
    }

    pub fn is_held(&self, class: ActionClass, key: &str) -> bool {
        self.held.lock().contains(&(class, key.to_string()))
    }

    /// Scoped acquisition; the key is released one cool-down after the
    /// permit is dropped.
    pub fn acquire(&self, class: ActionClass, key: &str) -> Option<GuardPermit> {
        self.acquire_with(class, key, ReleasePolicy::AfterCooldown)
    }

    /// Scoped single-flight acquisition; the key is released as soon as the
    /// permit is dropped.
    pub fn acquire_single_flight(&self, class: ActionClass, key: &str) -> Option<GuardPermit> {
        self.acquire_with(class, key, ReleasePolicy::Immediate)
    }

    fn acquire_with(
        &self,
        class: ActionClass,
        key: &str,
        policy: ReleasePolicy,
    ) -> Option<GuardPermit> {
        self.try_acquire(class, key).then(|| GuardPermit {
            registry: self.clone(),
            class,
            key: key.to_string(),
            policy,
        })
    }

    fn release_later(&self, class: ActionClass, key: String) {
        // Outside a runtime there is nothing to race against; release now.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let registry = self.clone();
                let cooldown = self.cooldown;
                handle.spawn(async move {
                    tokio::time::sleep(cooldown).await;
                    registry.release(class, &key);
                    debug!("Guard {:?}/{} released after cool-down", class, key);
                });
            }
            Err(_) => self.release(class, &key),
        }
    }
}

/// Proof that a guarded action holds its key.
#[derive(Debug)]
pub struct GuardPermit {
    registry: GuardRegistry,
    class: ActionClass,
    key: String,
    policy: ReleasePolicy,
}

impl Drop for GuardPermit {
    fn drop(&mut self) {
        match self.policy {
            ReleasePolicy::Immediate => self.registry.release(self.class, &self.key),
            ReleasePolicy::AfterCooldown => self
                .registry
                .release_later(self.class, std::mem::take(&mut self.key)),
        }
    }
}
