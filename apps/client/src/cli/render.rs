//! Plain-text renderers. Each returns the full block to print.

use crate::analysis::report::AnalysisReport;
use crate::analysis::session::AnalysisOutcome;
use crate::errors::{Notice, NoticeSeverity};
use crate::models::resume::ResumeSummary;
use crate::models::task::LearningTask;
use crate::tasks::lifecycle::SyncOffer;
use crate::workflow::{HistoryRecord, IntentOutcome};

const BAR_WIDTH: usize = 20;

pub fn notice(notice: &Notice) -> String {
    let tag = match notice.severity {
        NoticeSeverity::Info => "info",
        NoticeSeverity::Warning => "warning",
        NoticeSeverity::Error => "error",
    };
    let mut out = format!("[{tag}] {}", notice.message);
    if notice.retryable {
        out.push_str(" (you can retry)");
    }
    if notice.requires_login {
        out.push_str("\nSign in again and update API_TOKEN to continue.");
    }
    out
}

fn bar(score: f64) -> String {
    let filled = ((score.clamp(0.0, 100.0) / 100.0) * BAR_WIDTH as f64).round() as usize;
    format!("{}{}", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

pub fn report(report: &AnalysisReport) -> String {
    let mut out = format!("Match score: {:.0}/100\n", report.overall_score);
    if !report.summary.is_empty() {
        out.push_str(&format!("{}\n", report.summary));
    }

    if !report.radar.is_empty() {
        out.push_str("\nSkills radar (you / target):\n");
        for point in &report.radar {
            out.push_str(&format!(
                "  {:<22} {} {:>5.1} / {:>5.1}{}\n",
                point.category,
                bar(point.user_score),
                point.user_score,
                point.target_score,
                match point.shortfall() {
                    s if s > 0.0 => format!("  (-{s:.0})"),
                    _ => String::new(),
                }
            ));
        }
    }

    let gaps: Vec<_> = report.actionable_gaps().collect();
    if !gaps.is_empty() {
        out.push_str("\nGaps:\n");
        for gap in gaps {
            out.push_str(&format!(
                "  [{}] {}: {}\n",
                gap.importance, gap.missing_skill, gap.recommendation
            ));
        }
        out.push_str("Use 'learn <skill>' to start a learning task.\n");
    }

    for item in report.data_quality_notices() {
        out.push_str(&format!(
            "\nNote: {} ({})\n",
            item.missing_skill, item.recommendation
        ));
    }
    out.trim_end().to_string()
}

pub fn tasks(tasks: &[LearningTask]) -> String {
    if tasks.is_empty() {
        return "No learning tasks yet.".to_string();
    }
    let mut out = String::from("Learning tasks:\n");
    for task in tasks {
        let created = task
            .created_at
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        out.push_str(&format!(
            "  #{:<5} {:<24} {:<10} {}\n",
            task.id, task.skill, task.status, created
        ));
    }
    out.trim_end().to_string()
}

pub fn resumes(resumes: &[ResumeSummary]) -> String {
    if resumes.is_empty() {
        return "No stored résumés. Use 'analyze <file.pdf> <jd.txt>' to upload one.".to_string();
    }
    let mut out = String::from("Stored résumés:\n");
    for resume in resumes {
        let uploaded = resume
            .created_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        out.push_str(&format!("  #{:<5} {:<32} {}\n", resume.id, resume.name, uploaded));
    }
    out.trim_end().to_string()
}

pub fn history(records: &[HistoryRecord]) -> String {
    if records.is_empty() {
        return "No analyses yet.".to_string();
    }
    let mut out = String::from("Past analyses:\n");
    for record in records {
        let entry = &record.entry;
        let date = entry
            .date
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        let title = entry.job_title.as_deref().unwrap_or("Untitled position");
        let detail = match &record.report {
            Ok(report) => format!(
                "{:.0}/100, {} gaps",
                report.overall_score,
                report.actionable_gaps().count()
            ),
            Err(e) => format!("unreadable scores ({e})"),
        };
        out.push_str(&format!(
            "  {date}  {title} (résumé #{}, JD #{}): {detail}\n",
            entry.resume_id, entry.jd_id
        ));
        if !entry.completed_courses.is_empty() {
            let skills: Vec<&str> = entry
                .completed_courses
                .iter()
                .map(|c| c.skill.as_str())
                .collect();
            out.push_str(&format!("      completed: {}\n", skills.join(", ")));
        }
    }
    out.trim_end().to_string()
}

pub fn analysis(outcome: &AnalysisOutcome) -> String {
    match outcome {
        AnalysisOutcome::Completed(r) => report(r),
        AnalysisOutcome::Pending => {
            "An analysis is already running; its result will replace the current report."
                .to_string()
        }
    }
}

pub fn outcome(outcome: &IntentOutcome) -> String {
    let mut out = match outcome {
        IntentOutcome::Analysis(a) => analysis(a),
        IntentOutcome::TaskStarted(started) => format!(
            "Started learning {} (task #{}).\nResource: {}",
            started.skill, started.task_id, started.resource.url
        ),
        IntentOutcome::TaskCompleted(done) => {
            let next = match done.offer {
                SyncOffer::SyncOrDefer { resume_id } => format!(
                    "Add it to résumé #{resume_id} with 'sync {id}', or keep it for later with 'defer {id}'.",
                    id = done.task_id
                ),
                SyncOffer::DeferOnly => {
                    "No résumé on record yet; the suggestion is kept for later.".to_string()
                }
            };
            format!(
                "Task #{} completed.\nSuggested résumé line: {}\n{next}",
                done.task_id, done.suggestion
            )
        }
        IntentOutcome::ResumeSynced { sync, reanalysis } => {
            let mut text = format!(
                "Résumé #{} updated from task #{}: {}",
                sync.resume_id, sync.task_id, sync.message
            );
            if reanalysis.is_some() {
                text.push_str("\nRe-analyzing with the updated résumé...");
            }
            text
        }
        IntentOutcome::SyncDeferred(deferred) => match &deferred.suggestion {
            Some(s) => format!(
                "Kept for later: {s}\nRun 'sync {}' when you are ready.",
                deferred.task_id
            ),
            None => format!("Task #{} left as is.", deferred.task_id),
        },
    };

    let warnings: Vec<&String> = match outcome {
        IntentOutcome::TaskStarted(s) => s.reload_warning.iter().collect(),
        IntentOutcome::TaskCompleted(c) => c.reload_warning.iter().collect(),
        IntentOutcome::ResumeSynced { sync, .. } => sync.reload_warnings.iter().collect(),
        _ => Vec::new(),
    };
    for warning in warnings {
        out.push_str(&format!("\n[warning] {warning}"));
    }
    out
}
