//! Analysis Session: owns the selected (résumé, job description) pair and
//! the latest normalized report for it.
//!
//! `submit` and `reanalyze` are single-flight: while one is running, further
//! requests are coalesced into `AnalysisOutcome::Pending` without a remote call.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::analysis::report::AnalysisReport;
use crate::errors::WorkflowError;
use crate::guard::ActionClass;
use crate::models::analysis::{GapAnalysisRequest, NewJobDescription};
use crate::models::ids::{JdId, ResumeId};
use crate::models::resume::ResumeUpload;
use crate::state::ClientState;

const SESSION_GUARD_KEY: &str = "analysis-session";
/// The backend rejects larger files.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const MAX_TITLE_CHARS: usize = 80;

/// Where the résumé for an analysis comes from. Mutually exclusive.
#[derive(Debug, Clone)]
pub enum ResumeSource {
    Upload(ResumeUpload),
    Stored(ResumeId),
}

#[derive(Debug, Clone)]
pub struct SubmitRequest {
    /// `None` is a caller contract violation, reported as a validation error.
    pub resume: Option<ResumeSource>,
    pub jd_text: String,
    pub company: Option<String>,
}

#[derive(Debug, Clone)]
pub enum AnalysisOutcome {
    Completed(Arc<AnalysisReport>),
    /// Another analysis is in flight; this request was coalesced into it.
    Pending,
}

impl AnalysisOutcome {
    pub fn report(&self) -> Option<&Arc<AnalysisReport>> {
        match self {
            AnalysisOutcome::Completed(report) => Some(report),
            AnalysisOutcome::Pending => None,
        }
    }
}

#[derive(Debug, Default)]
struct SessionState {
    resume_id: Option<ResumeId>,
    jd_id: Option<JdId>,
    report: Option<Arc<AnalysisReport>>,
}

pub struct AnalysisSession {
    state: ClientState,
    inner: Mutex<SessionState>,
}

impl AnalysisSession {
    pub fn new(state: ClientState) -> Self {
        Self {
            state,
            inner: Mutex::new(SessionState::default()),
        }
    }

    pub fn resume_id(&self) -> Option<ResumeId> {
        self.inner.lock().resume_id
    }

    pub fn report(&self) -> Option<Arc<AnalysisReport>> {
        self.inner.lock().report.clone()
    }

    /// Both ids, once a submission has established them.
    pub fn active_pair(&self) -> Option<(ResumeId, JdId)> {
        let inner = self.inner.lock();
        inner.resume_id.zip(inner.jd_id)
    }

    pub fn is_analyzing(&self) -> bool {
        self.state
            .guards
            .is_held(ActionClass::Analysis, SESSION_GUARD_KEY)
    }

    /// Selects `resume_id` unless the user already picked one this session.
    pub fn adopt_resume(&self, resume_id: ResumeId) {
        let mut inner = self.inner.lock();
        if inner.resume_id.is_none() {
            debug!("Adopting stored résumé {resume_id} for the session");
            inner.resume_id = Some(resume_id);
        }
    }

    /// Résumé (uploaded or stored) + JD text → gap report.
    /// Repeated identical submissions may be served from the backend cache.
    pub async fn submit(&self, request: SubmitRequest) -> Result<AnalysisOutcome, WorkflowError> {
        let Some(_permit) = self
            .state
            .guards
            .acquire_single_flight(ActionClass::Analysis, SESSION_GUARD_KEY)
        else {
            info!("Analysis already in flight; submit coalesced");
            return Ok(AnalysisOutcome::Pending);
        };

        let source = request.resume.as_ref().ok_or_else(|| {
            WorkflowError::Validation("Select a stored résumé or upload a new one".to_string())
        })?;
        let description = request.jd_text.trim();
        if description.is_empty() {
            return Err(WorkflowError::Validation(
                "Paste the job description text".to_string(),
            ));
        }
        if let ResumeSource::Upload(upload) = source {
            validate_upload(upload)?;
        }

        // 1. Résumé id
        let resume_id = match source {
            ResumeSource::Stored(id) => *id,
            ResumeSource::Upload(upload) => {
                let uploaded = self
                    .state
                    .api
                    .upload_resume(self.state.user_id(), upload)
                    .await?;
                match uploaded.parsed_skill_count() {
                    Some(skills) => info!(
                        "Uploaded '{}' as résumé {} ({} skills parsed)",
                        upload.file_name, uploaded.id, skills
                    ),
                    None => info!("Uploaded '{}' as résumé {}", upload.file_name, uploaded.id),
                }
                uploaded.id
            }
        };

        // 2. Job description id
        let jd = NewJobDescription {
            title: derive_title(description),
            company: request.company.clone(),
            description: description.to_string(),
        };
        let created = self.state.api.submit_job_description(&jd).await?;
        info!(
            "Job description {} stored (title: {})",
            created.id,
            created.extracted_title.as_deref().unwrap_or(&jd.title)
        );

        // 3. Analysis, cached result welcome. The pair becomes the session
        // pair only together with its report.
        let report = self.run_analysis(resume_id, created.id, false).await?;
        self.commit(resume_id, created.id, report.clone());
        Ok(AnalysisOutcome::Completed(report))
    }

    /// Recomputes the report for the active pair, bypassing the backend cache.
    pub async fn reanalyze(&self) -> Result<AnalysisOutcome, WorkflowError> {
        let (resume_id, jd_id) = self.active_pair().ok_or(WorkflowError::NoActiveSession)?;

        let Some(_permit) = self
            .state
            .guards
            .acquire_single_flight(ActionClass::Analysis, SESSION_GUARD_KEY)
        else {
            info!("Analysis already in flight; re-analysis coalesced");
            return Ok(AnalysisOutcome::Pending);
        };

        let report = self.run_analysis(resume_id, jd_id, true).await?;
        self.commit(resume_id, jd_id, report.clone());
        Ok(AnalysisOutcome::Completed(report))
    }

    fn commit(&self, resume_id: ResumeId, jd_id: JdId, report: Arc<AnalysisReport>) {
        let mut inner = self.inner.lock();
        inner.resume_id = Some(resume_id);
        inner.jd_id = Some(jd_id);
        inner.report = Some(report);
    }

    async fn run_analysis(
        &self,
        resume_id: ResumeId,
        jd_id: JdId,
        force_analyze: bool,
    ) -> Result<Arc<AnalysisReport>, WorkflowError> {
        info!("Requesting gap analysis for résumé {resume_id} / JD {jd_id} (force={force_analyze})");

        let result = self
            .state
            .api
            .gap_analysis(&GapAnalysisRequest {
                resume_id,
                jd_id,
                force_analyze,
            })
            .await?;

        // Only a fully normalized result replaces the report.
        let report = Arc::new(AnalysisReport::from_result(result)?);
        info!(
            "Gap analysis ready: score {:.0}, {} radar categories, {} gaps",
            report.overall_score,
            report.radar.len(),
            report.gaps.len()
        );
        Ok(report)
    }
}

fn validate_upload(upload: &ResumeUpload) -> Result<(), WorkflowError> {
    if !upload.file_name.to_ascii_lowercase().ends_with(".pdf") {
        return Err(WorkflowError::Validation(
            "Only PDF résumés are supported".to_string(),
        ));
    }
    if upload.bytes.is_empty() {
        return Err(WorkflowError::Validation(
            "The selected résumé file is empty".to_string(),
        ));
    }
    if upload.bytes.len() > MAX_UPLOAD_BYTES {
        return Err(WorkflowError::Validation(
            "PDF file too large (max 10MB)".to_string(),
        ));
    }
    Ok(())
}

/// First non-empty line of the JD, capped for the title column.
/// The backend replaces it with the title it extracts.
fn derive_title(description: &str) -> String {
    description
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.chars().take(MAX_TITLE_CHARS).collect())
        .unwrap_or_default()
}
