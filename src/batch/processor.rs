use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::{
    bridge::{BridgeEngine, MatchSummary},
    config::{BatchConfig, BatchMode, Config},
    error::{BatchError, Result},
    video::MediaBackend,
};

/// What happened in one step of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepAction {
    Merged,
    /// Trailing input of an odd pairwise batch, passed through unchanged
    Copied,
    Failed,
}

/// One merge (or copy) of a batch run
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    /// 1-based step (sequential) or pair (pairwise) number
    pub step: usize,
    pub first: PathBuf,
    pub second: Option<PathBuf>,
    pub action: StepAction,
    pub output: Option<PathBuf>,
    pub match_summary: Option<MatchSummary>,
    pub error: Option<String>,
}

impl StepResult {
    fn merged(step: usize, first: &Path, second: &Path, output: PathBuf, summary: MatchSummary) -> Self {
        Self {
            step,
            first: first.to_path_buf(),
            second: Some(second.to_path_buf()),
            action: StepAction::Merged,
            output: Some(output),
            match_summary: Some(summary),
            error: None,
        }
    }

    fn failed(step: usize, first: &Path, second: &Path, error: String) -> Self {
        Self {
            step,
            first: first.to_path_buf(),
            second: Some(second.to_path_buf()),
            action: StepAction::Failed,
            output: None,
            match_summary: None,
            error: Some(error),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.action != StepAction::Failed
    }

    pub fn score(&self) -> Option<f64> {
        self.match_summary.as_ref().map(|s| s.score)
    }
}

/// Result of a whole batch run
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub mode: BatchMode,
    pub inputs: Vec<PathBuf>,
    pub steps: Vec<StepResult>,
    pub outputs: Vec<PathBuf>,
}

impl BatchSummary {
    pub fn succeeded(&self) -> bool {
        !self.outputs.is_empty()
    }
}

/// Merges every video in a directory, either into one chain or pair by pair
pub struct BatchProcessor<B: MediaBackend + 'static> {
    engine: BridgeEngine<B>,
    backend: Arc<B>,
    config: BatchConfig,
}

impl<B: MediaBackend + 'static> BatchProcessor<B> {
    pub fn new(config: Config, backend: B) -> Self {
        let backend = Arc::new(backend);
        let batch = config.batch.clone();
        let engine = BridgeEngine::with_shared_backend(config, Arc::clone(&backend)).with_frame_export(false);

        Self {
            engine,
            backend,
            config: batch,
        }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Videos in `dir` the backend can open, sorted by lowercase file name
    pub fn collect_inputs<P: AsRef<Path>>(&self, dir: P) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(BatchError::InputNotFound { path: dir.display().to_string() }.into());
        }

        let mut inputs = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if self.backend.accepts(&path) {
                inputs.push(path);
            }
        }
        inputs.sort_by_key(|path| sort_key(path));

        info!("Found {} videos in {:?}", inputs.len(), dir);
        for (i, path) in inputs.iter().enumerate() {
            debug!("  {:02}. {}", i + 1, file_name(path));
        }

        Ok(inputs)
    }

    /// Run the configured batch mode
    pub async fn process<P: AsRef<Path>>(&self, dir: P) -> Result<BatchSummary> {
        match self.config.mode {
            BatchMode::Sequential => self.process_sequential(dir).await,
            BatchMode::Pairwise => self.process_pairwise(dir).await,
        }
    }

    /// Chain every input into one video: 1+2, then the result +3, and so on
    pub async fn process_sequential<P: AsRef<Path>>(&self, dir: P) -> Result<BatchSummary> {
        let inputs = self.collect_inputs(dir)?;
        if inputs.len() < 2 {
            return Err(BatchError::NotEnoughInputs { found: inputs.len() }.into());
        }
        tokio::fs::create_dir_all(&self.config.output_dir).await?;

        let total = inputs.len() - 1;
        let final_output = self.output_path(&self.config.output_filename);
        let mut steps = Vec::with_capacity(total);
        let mut current = inputs[0].clone();
        let mut current_is_temp = false;

        info!("Sequential merge of {} videos", inputs.len());

        for (step, next) in (1..=total).zip(&inputs[1..]) {
            let output = if step == total {
                final_output.clone()
            } else {
                self.output_path(&format!("temp_merge_{}.{}", step, self.output_extension()))
            };

            info!("Merge {}/{}: {} + {}", step, total, file_name(&current), file_name(next));

            match self.engine.bridge(current.as_path(), next.as_path(), output.as_path()).await {
                Ok(outcome) => {
                    info!("Merge {}/{} complete: SSIM {:.3}", step, total, outcome.match_summary.score);
                    steps.push(StepResult::merged(step, &current, next, output.clone(), outcome.match_summary));

                    if current_is_temp {
                        self.discard(&current);
                    }
                    current = output;
                    current_is_temp = step != total;
                }
                Err(e) => {
                    error!("Merge {}/{} failed: {}", step, total, e);
                    steps.push(StepResult::failed(step, &current, next, e.to_string()));
                }
            }
        }

        // The last merge failed after earlier ones succeeded; promote what was accumulated
        if current_is_temp {
            self.backend.copy(&current, &final_output)?;
            self.discard(&current);
            current = final_output.clone();
        }

        let outputs = if current == final_output && final_output.exists() {
            info!("Sequential merge complete: {:?}", final_output);
            vec![final_output]
        } else {
            warn!("No merge succeeded, nothing written");
            Vec::new()
        };

        Ok(BatchSummary {
            mode: BatchMode::Sequential,
            inputs,
            steps,
            outputs,
        })
    }

    /// Merge inputs two at a time: (1,2), (3,4), ...
    pub async fn process_pairwise<P: AsRef<Path>>(&self, dir: P) -> Result<BatchSummary> {
        let inputs = self.collect_inputs(dir)?;
        if inputs.len() < 2 {
            return Err(BatchError::NotEnoughInputs { found: inputs.len() }.into());
        }
        tokio::fs::create_dir_all(&self.config.output_dir).await?;

        let mut steps = Vec::new();
        let mut outputs = Vec::new();

        info!("Pairwise merge of {} videos", inputs.len());

        for (index, pair) in inputs.chunks(2).enumerate() {
            let step = index + 1;
            match pair {
                [first, second] => {
                    let name = format!(
                        "merged_pair_{}_{}_{}.{}",
                        step,
                        file_stem(first),
                        file_stem(second),
                        self.output_extension()
                    );
                    let output = self.output_path(&name);

                    info!("Pair {}: {} + {}", step, file_name(first), file_name(second));

                    match self.engine.bridge(first.as_path(), second.as_path(), output.as_path()).await {
                        Ok(outcome) => {
                            info!("Pair {} complete: SSIM {:.3}", step, outcome.match_summary.score);
                            outputs.push(output.clone());
                            steps.push(StepResult::merged(step, first, second, output, outcome.match_summary));
                        }
                        Err(e) => {
                            error!("Pair {} failed: {}", step, e);
                            steps.push(StepResult::failed(step, first, second, e.to_string()));
                        }
                    }
                }
                [single] => {
                    let output = self.output_path(&format!("single_{}", file_name(single)));
                    info!("Pair {}: copying unpaired {}", step, file_name(single));

                    self.backend.copy(single, &output)?;
                    outputs.push(output.clone());
                    steps.push(StepResult {
                        step,
                        first: single.clone(),
                        second: None,
                        action: StepAction::Copied,
                        output: Some(output),
                        match_summary: None,
                        error: None,
                    });
                }
                _ => {}
            }
        }

        info!("Pairwise merge complete: {} outputs", outputs.len());

        Ok(BatchSummary {
            mode: BatchMode::Pairwise,
            inputs,
            steps,
            outputs,
        })
    }

    fn output_path(&self, name: &str) -> PathBuf {
        self.backend.output_path(&self.config.output_dir, name)
    }

    /// Extension of intermediate and pairwise outputs, taken from the final output name
    fn output_extension(&self) -> &str {
        Path::new(&self.config.output_filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("mp4")
    }

    fn discard(&self, path: &Path) {
        match self.backend.remove(path) {
            Ok(()) => debug!("Removed intermediate {:?}", path),
            Err(e) => warn!("Failed to remove intermediate {:?}: {}", path, e),
        }
    }
}

fn sort_key(path: &Path) -> String {
    file_name(path).to_lowercase()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
