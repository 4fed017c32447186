//! Learning Task Lifecycle: `Created → Completed → Verified`.
//!
//! Every mutation runs under a guard permit and is followed by a full reload
//! of the task collection. The cache only ever holds what the backend last
//! reported, so a failed transition leaves the task where it was.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::analysis::report::skill_key;
use crate::errors::WorkflowError;
use crate::guard::ActionClass;
use crate::models::analysis::GapItem;
use crate::models::ids::{ResumeId, TaskId};
use crate::models::task::{LearningTask, NewTask, TaskStatus};
use crate::profile::ProfileCache;
use crate::state::ClientState;
use crate::tasks::resources::{LearningResource, ResourceLauncher};

#[derive(Debug, Clone)]
pub struct StartedTask {
    pub task_id: TaskId,
    pub skill: String,
    pub resource: LearningResource,
    /// Set when the task was created but the follow-up reload failed.
    pub reload_warning: Option<String>,
}

/// What the user may do right after completing a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOffer {
    /// Write the suggestion into this résumé now, or defer.
    SyncOrDefer { resume_id: ResumeId },
    /// No résumé on record; the suggestion is kept for later.
    DeferOnly,
}

#[derive(Debug, Clone)]
pub struct TaskCompletion {
    pub task_id: TaskId,
    pub suggestion: String,
    pub offer: SyncOffer,
    pub reload_warning: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResumeSync {
    pub task_id: TaskId,
    pub resume_id: ResumeId,
    pub message: String,
    pub reload_warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DeferredSync {
    pub task_id: TaskId,
    pub suggestion: Option<String>,
}

pub struct TaskLifecycle {
    state: ClientState,
    profile: Arc<ProfileCache>,
    launcher: Arc<dyn ResourceLauncher>,
    tasks: Mutex<Vec<LearningTask>>,
    // Tasks the backend created that no reload has listed yet.
    unconfirmed: Mutex<Vec<LearningTask>>,
    // Completion suggestions not yet written into a résumé.
    suggestions: Mutex<HashMap<TaskId, String>>,
}

impl TaskLifecycle {
    pub fn new(
        state: ClientState,
        profile: Arc<ProfileCache>,
        launcher: Arc<dyn ResourceLauncher>,
    ) -> Self {
        Self {
            state,
            profile,
            launcher,
            tasks: Mutex::new(Vec::new()),
            unconfirmed: Mutex::new(Vec::new()),
            suggestions: Mutex::new(HashMap::new()),
        }
    }

    pub fn tasks(&self) -> Vec<LearningTask> {
        self.tasks.lock().clone()
    }

    pub fn task(&self, task_id: TaskId) -> Option<LearningTask> {
        self.tasks.lock().iter().find(|t| t.id == task_id).cloned()
    }

    /// A task for `skill` that still blocks creating another one. Tasks that
    /// were created but not yet seen in a reload count as open.
    pub fn find_open_task(&self, skill: &str) -> Option<LearningTask> {
        let wanted = skill_key(skill);
        let blocks = |t: &&LearningTask| !t.status.is_closed() && skill_key(&t.skill) == wanted;
        if let Some(task) = self.tasks.lock().iter().find(blocks) {
            return Some(task.clone());
        }
        self.unconfirmed.lock().iter().find(blocks).cloned()
    }

    pub fn pending_suggestion(&self, task_id: TaskId) -> Option<String> {
        self.suggestions.lock().get(&task_id).cloned()
    }

    /// Replaces the cached collection with `GET /tasks/{user_id}`.
    pub async fn refresh(&self) -> Result<Vec<LearningTask>, WorkflowError> {
        let tasks = self.state.api.list_tasks(self.state.user_id()).await?;
        info!("Task collection reloaded ({} tasks)", tasks.len());
        self.unconfirmed
            .lock()
            .retain(|pending| !tasks.iter().any(|t| t.id == pending.id));
        *self.tasks.lock() = tasks.clone();
        Ok(tasks)
    }

    /// Creates a task for `gap` and opens its learning resource.
    pub async fn start(&self, gap: &GapItem) -> Result<StartedTask, WorkflowError> {
        if gap.is_data_quality_notice() {
            return Err(WorkflowError::Validation(format!(
                "'{}' is a data-quality notice, not a skill to learn",
                gap.missing_skill
            )));
        }
        let skill = gap.missing_skill.trim().to_string();
        let key = skill_key(&skill);
        if key.is_empty() {
            return Err(WorkflowError::Validation(
                "The gap item names no skill".to_string(),
            ));
        }

        // Business rule first, then the concurrency guard.
        if let Some(existing) = self.find_open_task(&skill) {
            info!("Task {} already covers skill {}", existing.id, skill);
            return Err(WorkflowError::DuplicateAction(format!(
                "You are already learning {} (task {}, {})",
                existing.skill, existing.id, existing.status
            )));
        }
        let Some(_permit) = self.state.guards.acquire(ActionClass::StartLearning, &key) else {
            info!("Start learning {} already in flight", skill);
            return Err(WorkflowError::DuplicateAction(format!(
                "A learning task for {skill} is already being created"
            )));
        };

        let resource = LearningResource::for_gap(&self.state.settings.search_base_url, gap);
        self.launcher.open(&resource);

        let created = self
            .state
            .api
            .create_task(&NewTask {
                user_id: self.state.user_id(),
                skill_tag: skill.clone(),
                recommendation: gap.recommendation.clone(),
            })
            .await?;
        info!("Learning task {} created for {}", created.id, skill);
        self.unconfirmed.lock().push(LearningTask {
            id: created.id,
            skill: skill.clone(),
            status: TaskStatus::Created,
            created_at: None,
        });

        Ok(StartedTask {
            task_id: created.id,
            skill,
            resource,
            reload_warning: self.reload_tasks_or_warn().await,
        })
    }

    /// `Created → Completed`. `resume_id` decides which follow-up is offered.
    pub async fn complete(
        &self,
        task_id: TaskId,
        resume_id: Option<ResumeId>,
    ) -> Result<TaskCompletion, WorkflowError> {
        let Some(_permit) = self
            .state
            .guards
            .acquire(ActionClass::TaskMutation, &task_id.to_string())
        else {
            info!("Task {} is already being updated", task_id);
            return Err(WorkflowError::DuplicateAction(format!(
                "Task {task_id} is already being updated"
            )));
        };

        if let Some(task) = self.task(task_id) {
            if task.status != TaskStatus::Created {
                return Err(WorkflowError::Validation(format!(
                    "Task {task_id} is already {}",
                    task.status
                )));
            }
        }

        let receipt = self.state.api.complete_task(task_id).await?;
        info!(
            "Task {} completed (backend résumé update: {}, analysis: {})",
            task_id, receipt.resume_updated, receipt.gap_analysis_performed
        );
        self.suggestions
            .lock()
            .insert(task_id, receipt.resume_suggestion.clone());

        let offer = match resume_id {
            Some(resume_id) => SyncOffer::SyncOrDefer { resume_id },
            None => SyncOffer::DeferOnly,
        };

        Ok(TaskCompletion {
            task_id,
            suggestion: receipt.resume_suggestion,
            offer,
            reload_warning: self.reload_tasks_or_warn().await,
        })
    }

    /// Writes a completed task into the résumé. The backend then reports the
    /// task as `Verified`.
    pub async fn sync_resume(
        &self,
        task_id: TaskId,
        resume_id: Option<ResumeId>,
    ) -> Result<ResumeSync, WorkflowError> {
        let resume_id = resume_id.ok_or_else(|| {
            WorkflowError::Validation(
                "No résumé on record. Upload a résumé before syncing a task into it.".to_string(),
            )
        })?;

        let Some(_permit) = self
            .state
            .guards
            .acquire(ActionClass::TaskMutation, &task_id.to_string())
        else {
            info!("Task {} is already being updated", task_id);
            return Err(WorkflowError::DuplicateAction(format!(
                "Task {task_id} is already being updated"
            )));
        };

        match self.task(task_id).map(|t| t.status) {
            Some(TaskStatus::Created) => {
                return Err(WorkflowError::Validation(format!(
                    "Complete task {task_id} before adding it to your résumé"
                )))
            }
            Some(TaskStatus::Verified) => {
                return Err(WorkflowError::DuplicateAction(format!(
                    "Task {task_id} is already in your résumé"
                )))
            }
            Some(TaskStatus::Completed) | None => {}
        }

        let ack = self
            .state
            .api
            .update_resume_from_task(task_id, resume_id)
            .await?;
        info!("Résumé {} updated from task {}", resume_id, task_id);
        self.suggestions.lock().remove(&task_id);

        let mut reload_warnings = Vec::new();
        if let Err(e) = self.profile.reload().await {
            warn!("Résumé profile reload after sync failed: {e}");
            reload_warnings.push(format!("Résumé reload failed: {e}"));
        }
        reload_warnings.extend(self.reload_tasks_or_warn().await);

        Ok(ResumeSync {
            task_id,
            resume_id,
            message: ack.message,
            reload_warnings,
        })
    }

    /// The "not now" branch after completion. The suggestion stays retrievable.
    pub async fn defer_sync(&self, task_id: TaskId) -> Result<DeferredSync, WorkflowError> {
        self.refresh().await?;
        let suggestion = self.pending_suggestion(task_id);
        info!(
            "Résumé sync for task {} deferred (suggestion kept: {})",
            task_id,
            suggestion.is_some()
        );
        Ok(DeferredSync {
            task_id,
            suggestion,
        })
    }

    async fn reload_tasks_or_warn(&self) -> Option<String> {
        match self.refresh().await {
            Ok(_) => None,
            Err(e) => {
                warn!("Task reload failed: {e}");
                Some(format!("Task list reload failed: {e}"))
            }
        }
    }
}
