//! In-memory `MatchApi` for workflow tests.
//!
//! Records every call, can be scripted to fail the next call to an endpoint,
//! and can stall each call for a fixed latency so concurrent triggers
//! interleave under tokio's paused test clock.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use tracing::info;

use crate::api::{ApiError, MatchApi};
use crate::models::analysis::{
    CreatedJobDescription, GapAnalysisRequest, GapResult, HistoryEntry, NewJobDescription,
};
use crate::models::ids::{JdId, ResumeId, TaskId, UserId};
use crate::models::resume::{ResumeProfile, ResumeSummary, ResumeUpload, SyncAck, UploadedResume};
use crate::models::task::{CompletionReceipt, CreatedTask, LearningTask, NewTask, TaskStatus};
use crate::models::user::UserAccount;
use crate::state::{ClientState, WorkflowSettings};
use crate::tasks::resources::{LearningResource, ResourceLauncher};

pub const TEST_USER: UserId = UserId(1);
pub const COOLDOWN: Duration = Duration::from_millis(1000);
pub const REANALYZE_DELAY: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CurrentUser,
    UploadResume(String),
    ListResumes,
    CurrentResume,
    SubmitJd(String),
    GapAnalysis(GapAnalysisRequest),
    History,
    CreateTask(String),
    ListTasks,
    CompleteTask(TaskId),
    SyncResume(TaskId, ResumeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    CurrentUser,
    UploadResume,
    CurrentResume,
    SubmitJd,
    GapAnalysis,
    CreateTask,
    ListTasks,
    CompleteTask,
    SyncResume,
}

#[derive(Debug, Clone)]
pub enum Failure {
    Status(u16),
    Unauthorized,
}

impl Failure {
    fn into_error(self) -> ApiError {
        match self {
            Failure::Status(status) => ApiError::Status {
                status,
                message: "scripted failure".to_string(),
            },
            Failure::Unauthorized => ApiError::Unauthorized,
        }
    }
}

struct FakeState {
    calls: Vec<Call>,
    next_id: i64,
    tasks: Vec<LearningTask>,
    profile: Option<ResumeProfile>,
    scripted_analyses: VecDeque<GapResult>,
    base_score: f64,
    failures: HashMap<Endpoint, Failure>,
    history: Vec<HistoryEntry>,
}

pub struct FakeMatchApi {
    state: Mutex<FakeState>,
    latency: Duration,
}

impl FakeMatchApi {
    pub fn new() -> Self {
        Self::with_latency(Duration::ZERO)
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            state: Mutex::new(FakeState {
                calls: Vec::new(),
                next_id: 100,
                tasks: Vec::new(),
                profile: None,
                scripted_analyses: VecDeque::new(),
                base_score: 62.0,
                failures: HashMap::new(),
                history: Vec::new(),
            }),
            latency,
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|c| matches(c)).count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn fail_next(&self, endpoint: Endpoint, failure: Failure) {
        self.state.lock().failures.insert(endpoint, failure);
    }

    pub fn push_analysis(&self, result: GapResult) {
        self.state.lock().scripted_analyses.push_back(result);
    }

    pub fn set_profile(&self, resume_id: ResumeId) {
        self.state.lock().profile = Some(profile(resume_id, &[]));
    }

    pub fn seed_task(&self, id: i64, skill: &str, status: TaskStatus) {
        self.state.lock().tasks.push(LearningTask {
            id: TaskId(id),
            skill: skill.to_string(),
            status,
            created_at: None,
        });
    }

    pub fn push_history(&self, entry: HistoryEntry) {
        self.state.lock().history.push(entry);
    }

    fn record(&self, call: Call, endpoint: Option<Endpoint>) -> Result<(), ApiError> {
        let mut state = self.state.lock();
        state.calls.push(call);
        match endpoint.and_then(|e| state.failures.remove(&e)) {
            Some(failure) => Err(failure.into_error()),
            None => Ok(()),
        }
    }

    async fn pause(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn next_id(&self) -> i64 {
        let mut state = self.state.lock();
        state.next_id += 1;
        state.next_id
    }
}

/// The analysis the fake returns unless one was scripted.
pub fn default_analysis(score: f64) -> GapResult {
    serde_json::from_value(json!({
        "overall_score": score,
        "radar_data": {
            "Languages": 80,
            "Frameworks": {"user": 55, "target": 85},
            "Tools": 40
        },
        "gap_details": [
            {"missing_skill": "Kubernetes", "importance": "High",
             "recommendation": "Take a Kubernetes fundamentals course", "recommendation_type": "course"},
            {"missing_skill": "Service Mesh", "importance": "Medium",
             "recommendation": "Deploy a demo app behind Istio", "recommendation_type": "project"}
        ],
        "summary": "Solid Go background, container orchestration missing"
    }))
    .expect("default analysis fixture is valid")
}

pub fn profile(resume_id: ResumeId, projects: &[&str]) -> ResumeProfile {
    serde_json::from_value(json!({
        "id": resume_id,
        "name": "Li Lei",
        "skills": ["Go", "SQL"],
        "projects": projects.iter().map(|p| json!({"name": p})).collect::<Vec<_>>()
    }))
    .expect("profile fixture is valid")
}

pub fn test_user() -> UserAccount {
    UserAccount {
        id: TEST_USER,
        username: "lilei".to_string(),
        email: None,
    }
}

pub fn test_settings() -> WorkflowSettings {
    WorkflowSettings {
        guard_cooldown: COOLDOWN,
        reanalyze_delay: REANALYZE_DELAY,
        search_base_url: "https://search.test/search".to_string(),
    }
}

pub fn test_state(api: Arc<FakeMatchApi>) -> ClientState {
    ClientState::new(api, test_user(), test_settings())
}

#[async_trait]
impl MatchApi for FakeMatchApi {
    async fn current_user(&self) -> Result<UserAccount, ApiError> {
        self.record(Call::CurrentUser, Some(Endpoint::CurrentUser))?;
        self.pause().await;
        Ok(test_user())
    }

    async fn upload_resume(
        &self,
        _user_id: UserId,
        upload: &ResumeUpload,
    ) -> Result<UploadedResume, ApiError> {
        self.record(
            Call::UploadResume(upload.file_name.clone()),
            Some(Endpoint::UploadResume),
        )?;
        self.pause().await;
        let id = ResumeId(self.next_id());
        self.state.lock().profile = Some(profile(id, &[]));
        Ok(UploadedResume {
            id,
            parsed_data: None,
        })
    }

    async fn list_resumes(&self) -> Result<Vec<ResumeSummary>, ApiError> {
        self.record(Call::ListResumes, None)?;
        self.pause().await;
        let state = self.state.lock();
        Ok(state
            .profile
            .iter()
            .map(|p| ResumeSummary {
                id: p.id,
                name: "cv.pdf".to_string(),
                created_at: None,
                updated_at: None,
            })
            .collect())
    }

    async fn current_resume(&self, _user_id: UserId) -> Result<Option<ResumeProfile>, ApiError> {
        self.record(Call::CurrentResume, Some(Endpoint::CurrentResume))?;
        self.pause().await;
        Ok(self.state.lock().profile.clone())
    }

    async fn submit_job_description(
        &self,
        jd: &NewJobDescription,
    ) -> Result<CreatedJobDescription, ApiError> {
        self.record(Call::SubmitJd(jd.description.clone()), Some(Endpoint::SubmitJd))?;
        self.pause().await;
        Ok(CreatedJobDescription {
            id: JdId(3),
            extracted_title: Some(jd.title.clone()),
        })
    }

    async fn gap_analysis(&self, request: &GapAnalysisRequest) -> Result<GapResult, ApiError> {
        self.record(Call::GapAnalysis(*request), Some(Endpoint::GapAnalysis))?;
        self.pause().await;
        let mut state = self.state.lock();
        let base_score = state.base_score;
        Ok(state
            .scripted_analyses
            .pop_front()
            .unwrap_or_else(|| default_analysis(base_score)))
    }

    async fn history(&self) -> Result<Vec<HistoryEntry>, ApiError> {
        self.record(Call::History, None)?;
        self.pause().await;
        Ok(self.state.lock().history.clone())
    }

    async fn create_task(&self, task: &NewTask) -> Result<CreatedTask, ApiError> {
        self.record(Call::CreateTask(task.skill_tag.clone()), Some(Endpoint::CreateTask))?;
        self.pause().await;
        let id = TaskId(self.next_id());
        self.state.lock().tasks.push(LearningTask {
            id,
            skill: task.skill_tag.clone(),
            status: TaskStatus::Created,
            created_at: None,
        });
        Ok(CreatedTask { id })
    }

    async fn list_tasks(&self, _user_id: UserId) -> Result<Vec<LearningTask>, ApiError> {
        self.record(Call::ListTasks, Some(Endpoint::ListTasks))?;
        self.pause().await;
        Ok(self.state.lock().tasks.clone())
    }

    async fn complete_task(&self, task_id: TaskId) -> Result<CompletionReceipt, ApiError> {
        self.record(Call::CompleteTask(task_id), Some(Endpoint::CompleteTask))?;
        self.pause().await;
        let mut state = self.state.lock();
        let task = state
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| ApiError::Status {
                status: 404,
                message: "Task not found".to_string(),
            })?;
        task.status = TaskStatus::Completed;
        Ok(CompletionReceipt {
            resume_suggestion: format!("Completed hands-on training in {}", task.skill),
            resume_updated: false,
            gap_analysis_performed: false,
        })
    }

    async fn update_resume_from_task(
        &self,
        task_id: TaskId,
        resume_id: ResumeId,
    ) -> Result<SyncAck, ApiError> {
        self.record(Call::SyncResume(task_id, resume_id), Some(Endpoint::SyncResume))?;
        self.pause().await;
        let mut state = self.state.lock();
        let skill = {
            let task = state
                .tasks
                .iter_mut()
                .find(|t| t.id == task_id)
                .ok_or_else(|| ApiError::Status {
                    status: 404,
                    message: "Task or Resume not found".to_string(),
                })?;
            task.status = TaskStatus::Verified;
            task.skill.clone()
        };
        let project = format!("Learning Project: {skill}");
        state.profile = Some(profile(resume_id, &[project.as_str()]));
        // A richer résumé scores higher on the next forced analysis.
        state.base_score = (state.base_score + 8.0).min(100.0);
        Ok(SyncAck {
            message: "Resume updated successfully".to_string(),
        })
    }
}

/// Records the link in the log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLauncher;

impl ResourceLauncher for TracingLauncher {
    fn open(&self, resource: &LearningResource) {
        info!(
            "Learning resource for {} ({:?}): {}",
            resource.skill, resource.kind, resource.url
        );
    }
}
