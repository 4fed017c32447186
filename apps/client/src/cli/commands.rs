use std::path::PathBuf;

use thiserror::Error;

use crate::models::ids::{ResumeId, TaskId};

/// Which résumé an `analyze` command refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeArg {
    /// A PDF on disk, uploaded as a new résumé.
    File(PathBuf),
    /// `#<id>`: a résumé already stored on the backend.
    Stored(ResumeId),
    /// `-`: whatever résumé the session already has, if any.
    Session,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Analyze {
        resume: ResumeArg,
        jd_path: PathBuf,
        company: Option<String>,
    },
    Learn { skill: String },
    Complete { task_id: TaskId },
    Sync { task_id: TaskId },
    Defer { task_id: TaskId },
    Reanalyze,
    Tasks,
    Resumes,
    History,
    Report,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Type a command, or 'help' to list them")]
    Empty,

    #[error("Unknown command '{0}'. Type 'help' to list commands")]
    Unknown(String),

    #[error("'{command}' needs {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("'{0}' is not a valid id")]
    InvalidId(String),
}

pub const HELP: &str = "\
Commands:
  analyze <resume.pdf | #id | -> <jd.txt> [company]   analyze a résumé against a job description
  reanalyze                                           recompute the current analysis
  report                                              show the current report
  learn <skill>                                       start a learning task for a gap
  complete <task-id>                                  mark a task completed
  sync <task-id>                                      add a completed task to your résumé
  defer <task-id>                                     keep the suggestion for later
  tasks                                               list learning tasks
  resumes                                             list stored résumés
  history                                             list past analyses
  help                                                show this help
  quit                                                leave";

pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        return Err(CommandError::Empty);
    };
    let rest: Vec<&str> = words.collect();

    match name.to_ascii_lowercase().as_str() {
        "analyze" | "analyse" => {
            let resume = rest.first().ok_or(CommandError::MissingArgument {
                command: "analyze",
                argument: "a résumé (file, #id or -)",
            })?;
            let jd_path = rest.get(1).ok_or(CommandError::MissingArgument {
                command: "analyze",
                argument: "a job description file",
            })?;
            let company = (rest.len() > 2).then(|| rest[2..].join(" "));
            Ok(Command::Analyze {
                resume: parse_resume_arg(resume)?,
                jd_path: PathBuf::from(jd_path),
                company,
            })
        }
        "learn" => {
            if rest.is_empty() {
                return Err(CommandError::MissingArgument {
                    command: "learn",
                    argument: "a skill name",
                });
            }
            Ok(Command::Learn {
                skill: rest.join(" "),
            })
        }
        "complete" => Ok(Command::Complete {
            task_id: task_id_arg("complete", &rest)?,
        }),
        "sync" => Ok(Command::Sync {
            task_id: task_id_arg("sync", &rest)?,
        }),
        "defer" => Ok(Command::Defer {
            task_id: task_id_arg("defer", &rest)?,
        }),
        "reanalyze" | "reanalyse" => Ok(Command::Reanalyze),
        "tasks" => Ok(Command::Tasks),
        "resumes" => Ok(Command::Resumes),
        "history" => Ok(Command::History),
        "report" => Ok(Command::Report),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

fn parse_resume_arg(raw: &str) -> Result<ResumeArg, CommandError> {
    if raw == "-" {
        return Ok(ResumeArg::Session);
    }
    match raw.strip_prefix('#') {
        Some(id) => Ok(ResumeArg::Stored(ResumeId(parse_id(id)?))),
        None => Ok(ResumeArg::File(PathBuf::from(raw))),
    }
}

fn task_id_arg(command: &'static str, rest: &[&str]) -> Result<TaskId, CommandError> {
    let raw = rest.first().ok_or(CommandError::MissingArgument {
        command,
        argument: "a task id",
    })?;
    Ok(TaskId(parse_id(raw.trim_start_matches('#'))?))
}

fn parse_id(raw: &str) -> Result<i64, CommandError> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| CommandError::InvalidId(raw.to_string()))
}
