//! Closure Workflow Orchestrator: routes user intents to the session and the
//! task lifecycle, and turns their failures into notices.
//!
//! It is the only place where two operations are chained: a successful
//! résumé sync schedules a forced re-analysis after `reanalyze_delay`.

use std::sync::Arc;

use anyhow::anyhow;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::analysis::normalizer::MalformedScoreData;
use crate::analysis::report::AnalysisReport;
use crate::analysis::session::{AnalysisOutcome, AnalysisSession, SubmitRequest};
use crate::api::MatchApi;
use crate::errors::{Notice, WorkflowError};
use crate::models::analysis::HistoryEntry;
use crate::models::ids::{ResumeId, TaskId};
use crate::models::resume::{ResumeProfile, ResumeSummary};
use crate::models::user::UserAccount;
use crate::profile::ProfileCache;
use crate::state::{ClientState, WorkflowSettings};
use crate::tasks::lifecycle::{DeferredSync, ResumeSync, StartedTask, TaskCompletion, TaskLifecycle};
use crate::tasks::resources::ResourceLauncher;

// ────────────────────────────────────────────────────────────────────────────
// Intents and outcomes
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Intent {
    Submit(SubmitRequest),
    /// Start learning the gap item of the current report named `skill`.
    StartLearning { skill: String },
    CompleteTask { task_id: TaskId },
    SyncResume { task_id: TaskId },
    DeferSync { task_id: TaskId },
    ReAnalyze,
}

impl Intent {
    fn label(&self) -> &'static str {
        match self {
            Intent::Submit(_) => "submit",
            Intent::StartLearning { .. } => "start learning",
            Intent::CompleteTask { .. } => "complete task",
            Intent::SyncResume { .. } => "sync résumé",
            Intent::DeferSync { .. } => "defer sync",
            Intent::ReAnalyze => "re-analyze",
        }
    }
}

#[derive(Debug)]
pub enum IntentOutcome {
    Analysis(AnalysisOutcome),
    TaskStarted(StartedTask),
    TaskCompleted(TaskCompletion),
    ResumeSynced {
        sync: ResumeSync,
        /// `None` when no (résumé, JD) pair is active.
        reanalysis: Option<ScheduledReanalysis>,
    },
    SyncDeferred(DeferredSync),
}

/// A re-analysis waiting out the post-sync delay.
#[derive(Debug)]
pub struct ScheduledReanalysis {
    handle: JoinHandle<Result<AnalysisOutcome, WorkflowError>>,
}

impl ScheduledReanalysis {
    pub async fn wait(self) -> Result<AnalysisOutcome, WorkflowError> {
        self.handle
            .await
            .map_err(|e| WorkflowError::Internal(anyhow!("scheduled re-analysis aborted: {e}")))?
    }
}

/// Startup snapshot returned by `bootstrap`.
#[derive(Debug, Clone)]
pub struct Bootstrap {
    pub profile: Option<ResumeProfile>,
    pub task_count: usize,
}

/// A past analysis. Rows whose scores cannot be normalized keep their error.
#[derive(Debug, Clone)]
pub struct HistoryRecord {
    pub entry: HistoryEntry,
    pub report: Result<AnalysisReport, MalformedScoreData>,
}

// ────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ────────────────────────────────────────────────────────────────────────────

struct WorkflowInner {
    state: ClientState,
    profile: Arc<ProfileCache>,
    session: AnalysisSession,
    tasks: TaskLifecycle,
}

#[derive(Clone)]
pub struct ClosureWorkflow {
    inner: Arc<WorkflowInner>,
}

impl ClosureWorkflow {
    pub fn new(state: ClientState, launcher: Arc<dyn ResourceLauncher>) -> Self {
        let profile = Arc::new(ProfileCache::new(state.clone()));
        Self {
            inner: Arc::new(WorkflowInner {
                session: AnalysisSession::new(state.clone()),
                tasks: TaskLifecycle::new(state.clone(), profile.clone(), launcher),
                profile,
                state,
            }),
        }
    }

    /// Resolves the signed-in user; a rejected token is `SessionInvalid`.
    pub async fn connect(
        api: Arc<dyn MatchApi>,
        settings: WorkflowSettings,
        launcher: Arc<dyn ResourceLauncher>,
    ) -> Result<Self, WorkflowError> {
        let user = api.current_user().await?;
        info!("Signed in as {} (user {})", user.username, user.id);
        Ok(Self::new(ClientState::new(api, user, settings), launcher))
    }

    pub fn user(&self) -> &UserAccount {
        &self.inner.state.user
    }

    pub fn session(&self) -> &AnalysisSession {
        &self.inner.session
    }

    pub fn tasks(&self) -> &TaskLifecycle {
        &self.inner.tasks
    }

    /// The session's résumé, else the stored one.
    pub fn known_resume_id(&self) -> Option<ResumeId> {
        self.inner
            .session
            .resume_id()
            .or_else(|| self.inner.profile.resume_id())
    }

    /// Loads the cached résumé profile and the task collection.
    pub async fn bootstrap(&self) -> Result<Bootstrap, WorkflowError> {
        let profile = self.inner.profile.reload().await?;
        if let Some(p) = &profile {
            self.inner.session.adopt_resume(p.id);
        }
        let tasks = self.inner.tasks.refresh().await?;
        Ok(Bootstrap {
            profile,
            task_count: tasks.len(),
        })
    }

    pub async fn history(&self) -> Result<Vec<HistoryRecord>, WorkflowError> {
        let entries = self.inner.state.api.history().await?;
        Ok(entries
            .into_iter()
            .map(|entry| {
                let report = AnalysisReport::from_result(entry.gap_result());
                if let Err(e) = &report {
                    warn!("History entry {} has malformed scores: {e}", entry.id);
                }
                HistoryRecord { entry, report }
            })
            .collect())
    }

    pub async fn resumes(&self) -> Result<Vec<ResumeSummary>, WorkflowError> {
        Ok(self.inner.state.api.list_resumes().await?)
    }

    /// Routes `intent`; any failure comes back as the notice to show.
    pub async fn dispatch(&self, intent: Intent) -> Result<IntentOutcome, Notice> {
        let label = intent.label();
        self.route(intent).await.map_err(|e| {
            info!("Intent '{label}' failed: {e}");
            e.to_notice()
        })
    }

    async fn route(&self, intent: Intent) -> Result<IntentOutcome, WorkflowError> {
        let inner = &self.inner;
        match intent {
            Intent::Submit(request) => Ok(IntentOutcome::Analysis(
                inner.session.submit(request).await?,
            )),
            Intent::ReAnalyze => Ok(IntentOutcome::Analysis(inner.session.reanalyze().await?)),
            Intent::StartLearning { skill } => {
                let report = inner.session.report().ok_or(WorkflowError::NoActiveSession)?;
                let gap = report.find_gap(&skill).ok_or_else(|| {
                    WorkflowError::Validation(format!(
                        "The current report has no gap item named '{}'",
                        skill.trim()
                    ))
                })?;
                Ok(IntentOutcome::TaskStarted(inner.tasks.start(gap).await?))
            }
            Intent::CompleteTask { task_id } => Ok(IntentOutcome::TaskCompleted(
                inner
                    .tasks
                    .complete(task_id, self.known_resume_id())
                    .await?,
            )),
            Intent::SyncResume { task_id } => {
                let sync = inner
                    .tasks
                    .sync_resume(task_id, self.known_resume_id())
                    .await?;
                Ok(IntentOutcome::ResumeSynced {
                    sync,
                    reanalysis: self.schedule_reanalysis(),
                })
            }
            Intent::DeferSync { task_id } => Ok(IntentOutcome::SyncDeferred(
                inner.tasks.defer_sync(task_id).await?,
            )),
        }
    }

    fn schedule_reanalysis(&self) -> Option<ScheduledReanalysis> {
        let (resume_id, jd_id) = self.inner.session.active_pair()?;
        let delay = self.inner.state.settings.reanalyze_delay;
        info!("Re-analysis of résumé {resume_id} / JD {jd_id} scheduled in {delay:?}");

        let inner = self.inner.clone();
        let handle = tokio::spawn(async move {
            // Lets the backend commit the résumé write before analysis reads it.
            tokio::time::sleep(delay).await;
            let outcome = inner.session.reanalyze().await;
            if let Err(e) = &outcome {
                warn!("Scheduled re-analysis failed: {e}");
            }
            outcome
        });
        Some(ScheduledReanalysis { handle })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::session::ResumeSource;
    use crate::models::analysis::GapAnalysisRequest;
    use crate::models::ids::JdId;
    use crate::models::task::TaskStatus;
    use crate::testing::{
        test_settings, test_state, Call, Endpoint, Failure, FakeMatchApi, TracingLauncher,
        REANALYZE_DELAY,
    };
    use serde_json::json;
    use std::time::Duration;

    fn workflow(api: &Arc<FakeMatchApi>) -> ClosureWorkflow {
        ClosureWorkflow::new(test_state(api.clone()), Arc::new(TracingLauncher))
    }

    fn submit_stored(id: i64) -> Intent {
        Intent::Submit(SubmitRequest {
            resume: Some(ResumeSource::Stored(ResumeId(id))),
            jd_text: "Senior backend engineer, Go, Kubernetes".to_string(),
            company: None,
        })
    }

    fn is_forced_analysis(call: &Call) -> bool {
        matches!(
            call,
            Call::GapAnalysis(GapAnalysisRequest {
                force_analyze: true,
                ..
            })
        )
    }

    #[tokio::test]
    async fn test_connect_resolves_user() {
        let api = Arc::new(FakeMatchApi::new());
        let wf = ClosureWorkflow::connect(api.clone(), test_settings(), Arc::new(TracingLauncher))
            .await
            .unwrap();
        assert_eq!(wf.user().username, "lilei");
    }

    #[tokio::test]
    async fn test_connect_with_rejected_token_is_session_invalid() {
        let api = Arc::new(FakeMatchApi::new());
        api.fail_next(Endpoint::CurrentUser, Failure::Unauthorized);
        let result =
            ClosureWorkflow::connect(api.clone(), test_settings(), Arc::new(TracingLauncher)).await;
        assert!(matches!(result, Err(WorkflowError::SessionInvalid)));
    }

    #[tokio::test]
    async fn test_bootstrap_adopts_stored_resume() {
        let api = Arc::new(FakeMatchApi::new());
        api.set_profile(ResumeId(7));
        api.seed_task(11, "Kubernetes", TaskStatus::Created);
        let wf = workflow(&api);

        let boot = wf.bootstrap().await.unwrap();

        assert_eq!(boot.task_count, 1);
        assert_eq!(wf.session().resume_id(), Some(ResumeId(7)));
        assert_eq!(wf.known_resume_id(), Some(ResumeId(7)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_then_start_learning_creates_one_task() {
        let api = Arc::new(FakeMatchApi::new());
        let wf = workflow(&api);

        let IntentOutcome::Analysis(outcome) = wf.dispatch(submit_stored(7)).await.unwrap() else {
            panic!("expected analysis outcome");
        };
        assert_eq!(outcome.report().unwrap().overall_score, 62.0);

        let outcome = wf
            .dispatch(Intent::StartLearning {
                skill: "Kubernetes".to_string(),
            })
            .await
            .unwrap();
        let IntentOutcome::TaskStarted(started) = outcome else {
            panic!("expected task start");
        };
        assert_eq!(
            wf.tasks().task(started.task_id).unwrap().status,
            TaskStatus::Created
        );
        assert_eq!(api.count(|c| matches!(c, Call::CreateTask(_))), 1);
    }

    #[tokio::test]
    async fn test_start_learning_unknown_gap_is_validation_notice() {
        let api = Arc::new(FakeMatchApi::new());
        let wf = workflow(&api);
        wf.dispatch(submit_stored(7)).await.unwrap();

        let notice = wf
            .dispatch(Intent::StartLearning {
                skill: "COBOL".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(notice.code, "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_reanalyze_without_session_notice() {
        let api = Arc::new(FakeMatchApi::new());
        let notice = workflow(&api).dispatch(Intent::ReAnalyze).await.unwrap_err();
        assert_eq!(notice.code, "NO_ACTIVE_SESSION");
        assert!(api.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_refreshes_caches_and_schedules_reanalysis() {
        let api = Arc::new(FakeMatchApi::new());
        api.seed_task(11, "Kubernetes", TaskStatus::Completed);
        let wf = workflow(&api);
        wf.dispatch(submit_stored(7)).await.unwrap();
        assert_eq!(wf.session().active_pair(), Some((ResumeId(7), JdId(3))));
        wf.tasks().refresh().await.unwrap();
        api.clear_calls();

        let outcome = wf
            .dispatch(Intent::SyncResume {
                task_id: TaskId(11),
            })
            .await
            .unwrap();
        let IntentOutcome::ResumeSynced { sync, reanalysis } = outcome else {
            panic!("expected résumé sync");
        };
        assert_eq!(sync.resume_id, ResumeId(7));
        assert_eq!(
            api.calls(),
            vec![
                Call::SyncResume(TaskId(11), ResumeId(7)),
                Call::CurrentResume,
                Call::ListTasks,
            ]
        );
        assert_eq!(
            wf.tasks().task(TaskId(11)).unwrap().status,
            TaskStatus::Verified
        );

        // Nothing before the delay has elapsed.
        tokio::time::sleep(REANALYZE_DELAY - Duration::from_millis(1)).await;
        assert_eq!(api.count(is_forced_analysis), 0);

        let reanalysis = reanalysis.expect("session is active");
        let after = reanalysis.wait().await.unwrap();
        assert_eq!(after.report().unwrap().overall_score, 70.0);
        assert_eq!(api.count(is_forced_analysis), 1);
        assert_eq!(wf.session().report().unwrap().overall_score, 70.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_without_active_pair_schedules_nothing() {
        let api = Arc::new(FakeMatchApi::new());
        api.set_profile(ResumeId(7));
        api.seed_task(11, "Kubernetes", TaskStatus::Completed);
        let wf = workflow(&api);
        wf.bootstrap().await.unwrap();

        let outcome = wf
            .dispatch(Intent::SyncResume {
                task_id: TaskId(11),
            })
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            IntentOutcome::ResumeSynced {
                reanalysis: None,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_sync_without_any_resume_makes_no_call() {
        let api = Arc::new(FakeMatchApi::new());
        api.seed_task(11, "Kubernetes", TaskStatus::Completed);
        let wf = workflow(&api);

        let notice = wf
            .dispatch(Intent::SyncResume {
                task_id: TaskId(11),
            })
            .await
            .unwrap_err();

        assert_eq!(notice.code, "VALIDATION_ERROR");
        assert!(api.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_complete_then_defer_keeps_suggestion() {
        let api = Arc::new(FakeMatchApi::new());
        api.seed_task(11, "Kubernetes", TaskStatus::Created);
        let wf = workflow(&api);
        wf.bootstrap().await.unwrap();

        let outcome = wf
            .dispatch(Intent::CompleteTask {
                task_id: TaskId(11),
            })
            .await
            .unwrap();
        let IntentOutcome::TaskCompleted(completion) = outcome else {
            panic!("expected completion");
        };

        let outcome = wf
            .dispatch(Intent::DeferSync {
                task_id: TaskId(11),
            })
            .await
            .unwrap();
        let IntentOutcome::SyncDeferred(deferred) = outcome else {
            panic!("expected deferral");
        };
        assert_eq!(deferred.suggestion, Some(completion.suggestion));
    }

    #[tokio::test]
    async fn test_history_keeps_malformed_rows_as_errors() {
        let api = Arc::new(FakeMatchApi::new());
        for (id, radar) in [
            (2, json!({"Languages": 80})),
            (1, json!({"Languages": {"user": 80}})),
        ] {
            api.push_history(
                serde_json::from_value(json!({
                    "id": id, "resume_id": 7, "jd_id": 3, "overall_score": 60,
                    "radar_data": radar, "date": "2024-05-01T12:30:00"
                }))
                .unwrap(),
            );
        }

        let history = workflow(&api).history().await.unwrap();

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].report.as_ref().unwrap().radar[0].target_score, 100.0);
        assert!(history[1].report.is_err());
    }

    #[tokio::test]
    async fn test_remote_failure_notice_is_retryable() {
        let api = Arc::new(FakeMatchApi::new());
        api.fail_next(Endpoint::SubmitJd, Failure::Status(502));
        let notice = workflow(&api).dispatch(submit_stored(7)).await.unwrap_err();
        assert_eq!(notice.code, "REMOTE_ERROR");
        assert!(notice.retryable);
    }
}
