//! Run Report - human summary and JSON output

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::hashing::file_sha256;
use crate::pipeline::JobOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Ok,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub name: String,
    pub status: JobStatus,
    pub input: String,
    pub output: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub sha256: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub engine_version: String,
    pub succeeded: usize,
    pub failed: usize,
    pub jobs: Vec<JobReport>,
}

#[derive(Debug)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub outcomes: Vec<JobOutcome>,
}

impl RunReport {
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            outcomes: vec![],
        }
    }

    pub fn push(&mut self, outcome: JobOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }

    pub fn summary_line(&self) -> String {
        if self.outcomes.is_empty() {
            "No jobs configured.".to_string()
        } else if self.all_succeeded() {
            format!("✓ All {} image(s) processed successfully!", self.outcomes.len())
        } else {
            format!(
                "✗ {} of {} job(s) failed ({} succeeded)",
                self.failed(),
                self.outcomes.len(),
                self.succeeded()
            )
        }
    }

    pub fn summarize(&self) -> RunSummary {
        RunSummary {
            started_at: self.started_at,
            engine_version: crate::ENGINE_VERSION.to_string(),
            succeeded: self.succeeded(),
            failed: self.failed(),
            jobs: self.outcomes.iter().map(job_report).collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.summarize())
    }
}

fn job_report(outcome: &JobOutcome) -> JobReport {
    let mut report = JobReport {
        name: outcome.name.clone(),
        status: JobStatus::Failed,
        input: outcome.input.display().to_string(),
        output: outcome.output.display().to_string(),
        width: None,
        height: None,
        x: None,
        y: None,
        sha256: None,
        error: None,
    };

    match &outcome.result {
        Ok(out) => {
            report.status = JobStatus::Ok;
            report.width = Some(out.image_size.0);
            report.height = Some(out.image_size.1);
            report.x = Some(out.origin.0);
            report.y = Some(out.origin.1);
            report.sha256 = match file_sha256(&out.output) {
                Ok(digest) => Some(digest),
                Err(e) => {
                    tracing::warn!(output = %out.output.display(), error = %e, "could not hash output");
                    None
                }
            };
        }
        Err(e) => report.error = Some(e.to_string()),
    }

    report
}
