use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::info;

use crate::batch::processor::{BatchSummary, StepAction, StepResult};
use crate::config::BatchMode;
use crate::error::{BatchError, Result};
use crate::matcher::MatchQuality;

/// Human-readable account of a batch run
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub generated_at: DateTime<Local>,
    pub mode: BatchMode,
    pub steps: Vec<StepResult>,
    pub outputs: Vec<PathBuf>,
}

impl BatchReport {
    pub fn new(summary: &BatchSummary) -> Self {
        Self::at(summary, Local::now())
    }

    pub fn at(summary: &BatchSummary, generated_at: DateTime<Local>) -> Self {
        Self {
            generated_at,
            mode: summary.mode,
            steps: summary.steps.clone(),
            outputs: summary.outputs.clone(),
        }
    }

    pub fn success_count(&self) -> usize {
        self.steps.iter().filter(|s| s.succeeded()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.steps.len() - self.success_count()
    }

    /// Mean SSIM over successful merges; copies and failures are left out
    pub fn average_score(&self) -> Option<f64> {
        let scores: Vec<f64> = self.steps.iter().filter_map(StepResult::score).collect();
        if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<f64>() / scores.len() as f64)
        }
    }

    pub fn render(&self) -> String {
        self.to_string()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            BatchError::ReportFailed { reason: e.to_string() }.into()
        })
    }

    /// Write the text report to `path`
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.render()).map_err(|e| BatchError::ReportFailed {
            reason: format!("{}: {}", path.display(), e),
        })?;

        info!("Report saved: {:?}", path);
        Ok(())
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Frame Bridge - Batch Report")?;
        writeln!(f, "{}", "=".repeat(60))?;
        writeln!(f, "Generated: {}", self.generated_at.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(f, "Mode: {:?}", self.mode)?;
        writeln!(f, "Total steps: {}", self.steps.len())?;
        writeln!(f, "Succeeded: {}", self.success_count())?;
        writeln!(f, "Failed: {}", self.failure_count())?;
        match self.average_score() {
            Some(average) => writeln!(f, "Average SSIM: {:.3} ({})", average, MatchQuality::from_score(average))?,
            None => writeln!(f, "Average SSIM: n/a")?,
        }
        writeln!(f)?;

        for step in &self.steps {
            let first = display_name(&step.first);
            let second = step.second.as_deref().map(display_name).unwrap_or_else(|| "-".to_string());

            match step.action {
                StepAction::Merged => {
                    writeln!(f, "Step {}: merged", step.step)?;
                    writeln!(f, "   First:  {}", first)?;
                    writeln!(f, "   Second: {}", second)?;
                    if let Some(summary) = &step.match_summary {
                        writeln!(f, "   Cut:    frame {} -> frame {}",
                                 summary.frame_index_a, summary.frame_index_b)?;
                        writeln!(f, "   SSIM:   {:.3} ({})", summary.score, summary.quality())?;
                    }
                }
                StepAction::Copied => {
                    writeln!(f, "Step {}: copied", step.step)?;
                    writeln!(f, "   File:   {}", first)?;
                }
                StepAction::Failed => {
                    writeln!(f, "Step {}: FAILED", step.step)?;
                    writeln!(f, "   First:  {}", first)?;
                    writeln!(f, "   Second: {}", second)?;
                    writeln!(f, "   Error:  {}", step.error.as_deref().unwrap_or("unknown error"))?;
                }
            }
            if let Some(output) = &step.output {
                writeln!(f, "   Output: {}", display_name(output))?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
