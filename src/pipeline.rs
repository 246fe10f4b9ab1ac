//! Overlay Pipeline - runs configured jobs in order
//!
//! A job error is captured in its JobOutcome; the next job always runs.

use std::path::PathBuf;

use crate::config::{Job, OverlayConfig};
use crate::render::{render, Caption, RenderError, RenderOutput, RenderRequest};
use crate::report::RunReport;

/// Result of one job attempt.
#[derive(Debug)]
pub struct JobOutcome {
    pub name: String,
    pub input: PathBuf,
    pub output: PathBuf,
    pub result: Result<RenderOutput, RenderError>,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

pub struct OverlayPipeline {
    config: OverlayConfig,
}

impl OverlayPipeline {
    pub fn new(config: OverlayConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn jobs(&self) -> &[Job] {
        &self.config.jobs
    }

    /// Turn a configured job into concrete paths and styling.
    pub fn resolve(&self, job: &Job) -> RenderRequest {
        let spec = &job.spec;
        RenderRequest {
            input: self.config.resolve(&spec.input_image),
            output: self.config.resolve(&spec.output_image),
            font_path: self.config.font_for(spec),
            caption: Caption {
                text: spec.text.clone(),
                font_size: spec.font_size,
                color: spec.color,
                outline_color: spec.outline(),
                outline_width: spec.outline_width,
                anchor: spec.position,
                margin: spec.margin,
            },
            blur: job.blurs().then_some(spec.blur_radius),
        }
    }

    pub fn run_job(&self, job: &Job) -> JobOutcome {
        let request = self.resolve(job);
        let span = tracing::debug_span!("job", name = %job.name);
        let _enter = span.enter();
        tracing::debug!(
            input = %request.input.display(),
            output = %request.output.display(),
            font = %request.font_path.display(),
            "rendering"
        );

        let result = render(&request);
        if let Err(e) = &result {
            tracing::debug!(error = %e, "job failed");
        }

        JobOutcome {
            name: job.name.clone(),
            input: request.input,
            output: request.output,
            result,
        }
    }

    /// Run every job in config order.
    pub fn run(&self) -> RunReport {
        self.run_with(|_| {}, |_| {})
    }

    /// Like `run`, with hooks before and after each job for progress output.
    pub fn run_with(&self, mut before: impl FnMut(&Job), mut after: impl FnMut(&JobOutcome)) -> RunReport {
        let mut report = RunReport::start();
        for job in self.jobs() {
            before(job);
            let outcome = self.run_job(job);
            after(&outcome);
            report.push(outcome);
        }
        report
    }
}
