use std::path::{Path, PathBuf};

use crate::error::{Result, VideoError};
use crate::video::source::VideoSource;
use crate::video::types::VideoDetails;

/// A splice to perform: first video up to and including `cut_first`,
/// then the second video from `cut_second` to its end.
#[derive(Debug, Clone)]
pub struct SpliceRequest {
    pub first: PathBuf,
    pub second: PathBuf,
    pub cut_first: usize,
    pub cut_second: usize,
    pub output: PathBuf,
}

impl SpliceRequest {
    /// Fail if writing `output` would replace or delete either input
    ///
    /// Paths are compared after resolving symlinks and `..` where they exist.
    /// An output directory that contains an input counts as overlapping.
    pub fn ensure_output_is_separate(&self) -> Result<()> {
        let output = resolve(&self.output);
        for input in [&self.first, &self.second] {
            if resolve(input).starts_with(&output) {
                return Err(VideoError::OutputIsInput {
                    path: self.output.display().to_string(),
                }.into());
            }
        }
        Ok(())
    }
}

fn resolve(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// What a finished splice produced
#[derive(Debug, Clone)]
pub struct SpliceSummary {
    pub output: PathBuf,
    pub frames_from_first: usize,
    pub frames_from_second: usize,
}

impl SpliceSummary {
    pub fn total_frames(&self) -> usize {
        self.frames_from_first + self.frames_from_second
    }
}

/// Opens, inspects and splices videos stored in one particular on-disk form
///
/// The matcher only ever sees the [`VideoSource`] returned by [`open`](Self::open);
/// everything container or codec specific stays behind this trait.
pub trait MediaBackend: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Whether `path` looks like an input this backend can open
    fn accepts(&self, path: &Path) -> bool;

    /// Open a video for frame access
    fn open(&self, path: &Path) -> Result<Box<dyn VideoSource>>;

    /// Describe a video without decoding its frames
    fn details(&self, path: &Path) -> Result<VideoDetails>;

    /// Write the spliced video described by `request`
    fn splice(&self, request: &SpliceRequest) -> Result<SpliceSummary>;

    /// Where an output called `name` is written inside `dir`
    fn output_path(&self, dir: &Path, name: &str) -> PathBuf {
        dir.join(name)
    }

    /// Copy an input through unchanged
    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        std::fs::copy(from, to)?;
        Ok(())
    }

    /// Delete an intermediate output
    fn remove(&self, path: &Path) -> Result<()> {
        std::fs::remove_file(path)?;
        Ok(())
    }
}
