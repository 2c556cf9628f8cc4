use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    error::{BridgeError, Result},
    matcher::{FrameMatcher, MatchQuality, MatchResult},
    video::{MediaBackend, SpliceRequest, SpliceSummary, VideoDetails},
};

/// The splice point, without the decoded frames
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchSummary {
    pub frame_index_a: usize,
    pub frame_index_b: usize,
    pub score: f64,
    pub comparisons: usize,
}

impl MatchSummary {
    pub fn quality(&self) -> MatchQuality {
        MatchQuality::from_score(self.score)
    }
}

impl From<&MatchResult> for MatchSummary {
    fn from(result: &MatchResult) -> Self {
        Self {
            frame_index_a: result.frame_index_a,
            frame_index_b: result.frame_index_b,
            score: result.score,
            comparisons: result.comparisons,
        }
    }
}

/// Everything a finished bridge produced
#[derive(Debug, Clone)]
pub struct BridgeOutcome {
    pub match_summary: MatchSummary,
    pub output: SpliceSummary,
    /// The two connection frames, when frame export is enabled
    pub frame_paths: Option<(PathBuf, PathBuf)>,
}

/// Bridges two videos: find the smoothest splice point, then write the spliced result
///
/// Decoding, scoring and encoding are blocking work and run on tokio's
/// blocking pool so the engine can be driven from async code.
pub struct BridgeEngine<B: MediaBackend + 'static> {
    config: Config,
    backend: Arc<B>,
    matcher: FrameMatcher,
    export_frames: bool,
}

impl<B: MediaBackend + 'static> BridgeEngine<B> {
    pub fn new(config: Config, backend: B) -> Self {
        Self::with_shared_backend(config, Arc::new(backend))
    }

    pub fn with_shared_backend(config: Config, backend: Arc<B>) -> Self {
        let matcher = FrameMatcher::from_config(&config.matcher);
        Self {
            config,
            backend,
            matcher,
            export_frames: true,
        }
    }

    /// Save the two connection frames next to the output (on by default)
    pub fn with_frame_export(mut self, enabled: bool) -> Self {
        self.export_frames = enabled;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Find the splice point between `first` and `second` without writing anything
    pub async fn find_connection<P: AsRef<Path>>(&self, first: P, second: P) -> Result<MatchResult> {
        let first = first.as_ref().to_path_buf();
        let second = second.as_ref().to_path_buf();
        let backend = Arc::clone(&self.backend);
        let matcher = self.matcher.clone();

        run_blocking(move || {
            let video_a = backend.open(&first)?;
            let video_b = backend.open(&second)?;

            debug!("First: {} frames at {:.2} fps, {:?}",
                   video_a.frame_count(), video_a.fps(), video_a.dimensions());
            debug!("Second: {} frames at {:.2} fps, {:?}",
                   video_b.frame_count(), video_b.fps(), video_b.dimensions());

            matcher.find_best_connection(&video_a, &video_b)
        })
        .await
    }

    /// Bridge `first` into `second`, writing the spliced video to `output`
    pub async fn bridge<P: AsRef<Path>>(&self, first: P, second: P, output: P) -> Result<BridgeOutcome> {
        let first = first.as_ref();
        let second = second.as_ref();
        let output = output.as_ref();

        info!("Bridging videos with {} backend", self.backend.name());
        info!("   First: {:?}", first);
        info!("   Second: {:?}", second);
        info!("   Output: {:?}", output);

        let result = self.find_connection(first, second).await?;
        let match_summary = MatchSummary::from(&result);

        info!("   Connection: frame {} -> frame {} (SSIM {:.4}, {})",
              match_summary.frame_index_a, match_summary.frame_index_b,
              match_summary.score, match_summary.quality());

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let frame_paths = if self.export_frames {
            Some(self.save_connection_frames(result, output).await?)
        } else {
            None
        };

        let request = SpliceRequest {
            first: first.to_path_buf(),
            second: second.to_path_buf(),
            cut_first: match_summary.frame_index_a,
            cut_second: match_summary.frame_index_b,
            output: output.to_path_buf(),
        };
        let backend = Arc::clone(&self.backend);
        let spliced = run_blocking(move || backend.splice(&request)).await?;

        info!("Bridge complete: {} frames written to {:?}", spliced.total_frames(), spliced.output);

        Ok(BridgeOutcome {
            match_summary,
            output: spliced,
            frame_paths,
        })
    }

    /// Describe a video without decoding it
    pub async fn inspect<P: AsRef<Path>>(&self, path: P) -> Result<VideoDetails> {
        let path = path.as_ref().to_path_buf();
        let backend = Arc::clone(&self.backend);
        run_blocking(move || backend.details(&path)).await
    }

    /// Write `<stem>_connection_a.png` and `<stem>_connection_b.png` beside `output`
    async fn save_connection_frames(&self, result: MatchResult, output: &Path) -> Result<(PathBuf, PathBuf)> {
        let stem = output
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("bridge")
            .to_string();
        let dir = output.parent().map(Path::to_path_buf).unwrap_or_default();
        let path_a = dir.join(format!("{}_connection_a.png", stem));
        let path_b = dir.join(format!("{}_connection_b.png", stem));

        let paths = (path_a.clone(), path_b.clone());
        run_blocking(move || {
            result.frame_a.save(&path_a)?;
            result.frame_b.save(&path_b)?;
            Ok(())
        })
        .await
        .map_err(|e| {
            warn!("Failed to save connection frames: {}", e);
            e
        })?;

        debug!("Saved connection frames to {:?} and {:?}", paths.0, paths.1);
        Ok(paths)
    }
}

async fn run_blocking<T, F>(task: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| BridgeError::generic(format!("blocking task failed: {}", e)))?
}
