//! Line-oriented terminal front end over `ClosureWorkflow`.

pub mod commands;
pub mod render;

use std::io::Write;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::analysis::session::{ResumeSource, SubmitRequest};
use crate::errors::{Notice, WorkflowError};
use crate::models::resume::ResumeUpload;
use crate::tasks::resources::{LearningResource, ResourceLauncher};
use crate::workflow::{ClosureWorkflow, Intent, IntentOutcome, ScheduledReanalysis};

use self::commands::{parse_command, Command, CommandError, ResumeArg, HELP};

/// Prints resource links for the user to open.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleLauncher;

impl ResourceLauncher for ConsoleLauncher {
    fn open(&self, resource: &LearningResource) {
        println!("Open to start learning {}: {}", resource.skill, resource.url);
    }
}

/// What the loop does after a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Continue(String),
    /// The session is no longer valid; print and stop.
    Relogin(String),
    Quit,
}

pub async fn run(workflow: ClosureWorkflow) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("Type 'help' for commands.");

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(CommandError::Empty) => continue,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        match execute(&workflow, command).await {
            Step::Continue(text) => println!("{text}"),
            Step::Relogin(text) => {
                println!("{text}");
                break;
            }
            Step::Quit => break,
        }
    }
    Ok(())
}

pub async fn execute(workflow: &ClosureWorkflow, command: Command) -> Step {
    debug!("Executing {:?}", command);
    match command {
        Command::Analyze {
            resume,
            jd_path,
            company,
        } => match load_submit_request(workflow, resume, &jd_path, company).await {
            Ok(request) => dispatch(workflow, Intent::Submit(request)).await,
            Err(e) => notice_step(e.to_notice()),
        },
        Command::Reanalyze => dispatch(workflow, Intent::ReAnalyze).await,
        Command::Learn { skill } => dispatch(workflow, Intent::StartLearning { skill }).await,
        Command::Complete { task_id } => dispatch(workflow, Intent::CompleteTask { task_id }).await,
        Command::Sync { task_id } => dispatch(workflow, Intent::SyncResume { task_id }).await,
        Command::Defer { task_id } => dispatch(workflow, Intent::DeferSync { task_id }).await,
        Command::Report => Step::Continue(match workflow.session().report() {
            Some(report) => render::report(&report),
            None if workflow.session().is_analyzing() => {
                "The first analysis is still running.".to_string()
            }
            None => "No report yet. Run 'analyze' first.".to_string(),
        }),
        Command::Tasks => match workflow.tasks().refresh().await {
            Ok(tasks) => Step::Continue(render::tasks(&tasks)),
            Err(e) => notice_step(e.to_notice()),
        },
        Command::Resumes => match workflow.resumes().await {
            Ok(resumes) => Step::Continue(render::resumes(&resumes)),
            Err(e) => notice_step(e.to_notice()),
        },
        Command::History => match workflow.history().await {
            Ok(records) => Step::Continue(render::history(&records)),
            Err(e) => notice_step(e.to_notice()),
        },
        Command::Help => Step::Continue(HELP.to_string()),
        Command::Quit => Step::Quit,
    }
}

async fn dispatch(workflow: &ClosureWorkflow, intent: Intent) -> Step {
    match workflow.dispatch(intent).await {
        Ok(outcome) => {
            let text = render::outcome(&outcome);
            if let IntentOutcome::ResumeSynced {
                reanalysis: Some(scheduled),
                ..
            } = outcome
            {
                tokio::spawn(print_when_ready(scheduled));
            }
            Step::Continue(text)
        }
        Err(notice) => notice_step(notice),
    }
}

async fn print_when_ready(scheduled: ScheduledReanalysis) {
    match scheduled.wait().await {
        Ok(outcome) => println!("\n{}", render::analysis(&outcome)),
        Err(e) => println!("\n{}", render::notice(&e.to_notice())),
    }
}

fn notice_step(notice: Notice) -> Step {
    let text = render::notice(&notice);
    if notice.requires_login {
        Step::Relogin(text)
    } else {
        Step::Continue(text)
    }
}

async fn load_submit_request(
    workflow: &ClosureWorkflow,
    resume: ResumeArg,
    jd_path: &Path,
    company: Option<String>,
) -> Result<SubmitRequest, WorkflowError> {
    let jd_text = tokio::fs::read_to_string(jd_path)
        .await
        .map_err(|e| unreadable("job description", jd_path, e))?;

    let resume = match resume {
        ResumeArg::File(path) => Some(ResumeSource::Upload(read_upload(path).await?)),
        ResumeArg::Stored(id) => Some(ResumeSource::Stored(id)),
        ResumeArg::Session => workflow.known_resume_id().map(ResumeSource::Stored),
    };

    Ok(SubmitRequest {
        resume,
        jd_text,
        company,
    })
}

async fn read_upload(path: PathBuf) -> Result<ResumeUpload, WorkflowError> {
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| unreadable("résumé", &path, e))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(ResumeUpload {
        file_name,
        bytes: Bytes::from(bytes),
    })
}

fn unreadable(what: &str, path: &Path, err: std::io::Error) -> WorkflowError {
    WorkflowError::Validation(format!("Cannot read {what} {}: {err}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ids::{ResumeId, TaskId};
    use crate::models::task::TaskStatus;
    use crate::testing::{test_state, Call, Endpoint, Failure, FakeMatchApi};
    use std::sync::Arc;
    use tempfile::TempDir;

    const JD: &str = "Senior backend engineer, Go, Kubernetes\nRemote friendly";

    fn setup() -> (Arc<FakeMatchApi>, ClosureWorkflow, TempDir) {
        let api = Arc::new(FakeMatchApi::new());
        let workflow = ClosureWorkflow::new(test_state(api.clone()), Arc::new(ConsoleLauncher));
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("jd.txt"), JD).unwrap();
        (api, workflow, dir)
    }

    fn analyze(dir: &TempDir, resume: ResumeArg) -> Command {
        Command::Analyze {
            resume,
            jd_path: dir.path().join("jd.txt"),
            company: None,
        }
    }

    fn text(step: Step) -> String {
        match step {
            Step::Continue(text) => text,
            other => panic!("expected output, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_analyze_stored_resume_prints_report() {
        let (api, workflow, dir) = setup();

        let out = text(execute(&workflow, analyze(&dir, ResumeArg::Stored(ResumeId(7)))).await);

        assert!(out.starts_with("Match score: 62/100"));
        assert!(out.contains("Kubernetes"));
        assert_eq!(api.calls()[0], Call::SubmitJd(JD.to_string()));
    }

    #[tokio::test]
    async fn test_analyze_uploads_pdf_from_disk() {
        let (api, workflow, dir) = setup();
        let pdf = dir.path().join("cv.pdf");
        std::fs::write(&pdf, b"%PDF-1.7 fake").unwrap();

        text(execute(&workflow, analyze(&dir, ResumeArg::File(pdf))).await);

        assert_eq!(api.calls()[0], Call::UploadResume("cv.pdf".to_string()));
        assert!(workflow.session().resume_id().is_some());
    }

    #[tokio::test]
    async fn test_analyze_session_resume_without_one_is_validation() {
        let (api, workflow, dir) = setup();

        let out = text(execute(&workflow, analyze(&dir, ResumeArg::Session)).await);

        assert!(out.starts_with("[warning]"));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_jd_file_is_reported() {
        let (api, workflow, dir) = setup();
        let command = Command::Analyze {
            resume: ResumeArg::Stored(ResumeId(7)),
            jd_path: dir.path().join("missing.txt"),
            company: None,
        };

        let out = text(execute(&workflow, command).await);

        assert!(out.contains("Cannot read job description"));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unauthorized_stops_the_loop() {
        let (api, workflow, dir) = setup();
        api.fail_next(Endpoint::SubmitJd, Failure::Unauthorized);

        let step = execute(&workflow, analyze(&dir, ResumeArg::Stored(ResumeId(7)))).await;

        assert!(matches!(step, Step::Relogin(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_complete_prints_sync_offer() {
        let (api, workflow, dir) = setup();
        api.seed_task(11, "Kubernetes", TaskStatus::Created);
        text(execute(&workflow, analyze(&dir, ResumeArg::Stored(ResumeId(7)))).await);

        let out = text(
            execute(
                &workflow,
                Command::Complete {
                    task_id: TaskId(11),
                },
            )
            .await,
        );

        assert!(out.contains("Completed hands-on training in Kubernetes"));
        assert!(out.contains("sync 11"));
    }

    #[tokio::test]
    async fn test_report_before_analysis() {
        let (_api, workflow, _dir) = setup();
        let out = text(execute(&workflow, Command::Report).await);
        assert!(out.contains("Run 'analyze' first"));
        assert_eq!(execute(&workflow, Command::Quit).await, Step::Quit);
    }
}
