use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use tracing::{debug, info};

use crate::error::{MatchError, Result, VideoError};
use crate::video::backend::{MediaBackend, SpliceRequest, SpliceSummary};
use crate::video::source::VideoSource;
use crate::video::types::{Frame, VideoDetails};

/// Videos stored as a directory of numbered still images (`frame_000000.png`, ...)
///
/// Frames are ordered by file name. Useful for pipelines that already work on
/// extracted frames, and for exercising the whole bridge without ffmpeg.
pub struct ImageSequenceBackend {
    fps: f64,
}

impl ImageSequenceBackend {
    pub fn new(fps: f64) -> Self {
        Self { fps }
    }
}

impl Default for ImageSequenceBackend {
    fn default() -> Self {
        Self::new(30.0)
    }
}

impl MediaBackend for ImageSequenceBackend {
    fn name(&self) -> &str {
        "image-sequence"
    }

    fn accepts(&self, path: &Path) -> bool {
        path.is_dir() && !is_hidden(path)
    }

    fn open(&self, path: &Path) -> Result<Box<dyn VideoSource>> {
        Ok(Box::new(ImageSequenceVideo::open(path, self.fps)?))
    }

    fn details(&self, path: &Path) -> Result<VideoDetails> {
        let video = ImageSequenceVideo::open(path, self.fps)?;
        let file_size = video
            .frame_paths
            .iter()
            .filter_map(|p| std::fs::metadata(p).ok())
            .map(|m| m.len())
            .sum();

        Ok(VideoDetails {
            path: path.to_path_buf(),
            width: video.width,
            height: video.height,
            fps: self.fps,
            frame_count: video.frame_paths.len(),
            file_size,
        })
    }

    fn splice(&self, request: &SpliceRequest) -> Result<SpliceSummary> {
        request.ensure_output_is_separate()?;

        let first = ImageSequenceVideo::open(&request.first, self.fps)?;
        let second = ImageSequenceVideo::open(&request.second, self.fps)?;

        if request.output.exists() {
            std::fs::remove_dir_all(&request.output)?;
        }
        std::fs::create_dir_all(&request.output)?;

        let target = (first.width, first.height);
        let first_end = (request.cut_first + 1).min(first.frame_count());
        let mut written = 0usize;

        for index in 0..first_end {
            let frame = first.frame(index)?;
            write_frame(&request.output, written, &frame)?;
            written += 1;
        }
        let frames_from_first = written;

        for index in request.cut_second..second.frame_count() {
            let frame = second.frame(index)?;
            let frame = if frame.dimensions() != target {
                Frame::new(image::imageops::resize(
                    frame.as_image(),
                    target.0,
                    target.1,
                    FilterType::Lanczos3,
                ))
            } else {
                frame
            };
            write_frame(&request.output, written, &frame)?;
            written += 1;
        }

        info!("Spliced image sequences into {} ({} frames)", request.output.display(), written);

        Ok(SpliceSummary {
            output: request.output.clone(),
            frames_from_first,
            frames_from_second: written - frames_from_first,
        })
    }

    fn output_path(&self, dir: &Path, name: &str) -> PathBuf {
        let stem = Path::new(name).file_stem().unwrap_or(std::ffi::OsStr::new(name));
        dir.join(stem)
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        let video = ImageSequenceVideo::open(from, self.fps)?;
        std::fs::create_dir_all(to)?;
        for path in &video.frame_paths {
            if let Some(name) = path.file_name() {
                std::fs::copy(path, to.join(name))?;
            }
        }
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        std::fs::remove_dir_all(path)?;
        Ok(())
    }
}

/// A directory of still images treated as consecutive frames
pub struct ImageSequenceVideo {
    frame_paths: Vec<PathBuf>,
    fps: f64,
    width: u32,
    height: u32,
}

impl ImageSequenceVideo {
    pub fn open<P: AsRef<Path>>(directory: P, fps: f64) -> Result<Self> {
        let directory = directory.as_ref();
        if !directory.is_dir() {
            return Err(VideoError::LoadFailed { path: directory.display().to_string() }.into());
        }

        let mut frame_paths = Vec::new();
        for entry in std::fs::read_dir(directory)? {
            let path = entry?.path();
            if path.is_file() && !is_hidden(&path) && is_image_file(&path) {
                frame_paths.push(path);
            }
        }
        frame_paths.sort();

        let (width, height) = match frame_paths.first() {
            Some(first) => image::image_dimensions(first).map_err(|e| MatchError::FrameRead {
                index: 0,
                reason: e.to_string(),
            })?,
            None => (0, 0),
        };

        debug!("Opened image sequence {} ({} frames, {}x{})",
               directory.display(), frame_paths.len(), width, height);

        Ok(Self { frame_paths, fps, width, height })
    }
}

impl VideoSource for ImageSequenceVideo {
    fn frame_count(&self) -> usize {
        self.frame_paths.len()
    }

    fn fps(&self) -> f64 {
        self.fps
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn frame(&self, index: usize) -> Result<Frame> {
        let path = self.frame_paths.get(index).ok_or_else(|| MatchError::FrameRead {
            index,
            reason: format!("index out of range (sequence has {} frames)", self.frame_paths.len()),
        })?;

        let image = image::open(path).map_err(|e| MatchError::FrameRead {
            index,
            reason: format!("{}: {}", path.display(), e),
        })?;

        Ok(Frame::new(image.to_rgb8()))
    }
}

/// Write `frame` as the `index`-th image of a sequence directory
pub fn write_frame(directory: &Path, index: usize, frame: &Frame) -> Result<PathBuf> {
    let path = directory.join(format!("frame_{:06}.png", index));
    frame.save(&path)?;
    Ok(path)
}

fn is_image_file(path: &Path) -> bool {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png"
        ),
        None => false,
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Write one solid-colour frame per entry of `colors` into `dir`
#[cfg(test)]
pub(crate) fn write_sequence(dir: &Path, colors: &[[u8; 3]], size: (u32, u32)) {
    std::fs::create_dir_all(dir).unwrap();
    for (i, &color) in colors.iter().enumerate() {
        write_frame(dir, i, &Frame::new_filled(size.0, size.1, color)).unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_orders_frames_by_name() {
        let temp = tempdir().unwrap();
        let clip = temp.path().join("clip");
        write_sequence(&clip, &[[10, 0, 0], [20, 0, 0], [30, 0, 0]], (8, 8));
        std::fs::write(clip.join("notes.txt"), "ignored").unwrap();

        let video = ImageSequenceVideo::open(&clip, 24.0).unwrap();
        assert_eq!(video.frame_count(), 3);
        assert_eq!(video.dimensions(), (8, 8));
        assert_eq!(video.frame(2).unwrap().get_pixel(0, 0), [30, 0, 0]);
    }

    #[test]
    fn test_empty_directory_has_no_frames() {
        let temp = tempdir().unwrap();
        let video = ImageSequenceVideo::open(temp.path(), 30.0).unwrap();
        assert_eq!(video.frame_count(), 0);
        assert_eq!(video.dimensions(), (0, 0));
    }

    #[test]
    fn test_corrupt_frame_reports_index() {
        let temp = tempdir().unwrap();
        let clip = temp.path().join("clip");
        write_sequence(&clip, &[[1, 1, 1]], (4, 4));
        std::fs::write(clip.join("frame_000001.png"), b"not a png").unwrap();

        let video = ImageSequenceVideo::open(&clip, 30.0).unwrap();
        match video.frame(1) {
            Err(crate::error::BridgeError::Match(MatchError::FrameRead { index, .. })) => {
                assert_eq!(index, 1)
            }
            other => panic!("unexpected result: {:?}", other.map(|f| f.dimensions())),
        }
    }

    #[test]
    fn test_splice_keeps_cut_frames_and_resizes_second() {
        let temp = tempdir().unwrap();
        let first = temp.path().join("a");
        let second = temp.path().join("b");
        write_sequence(&first, &[[0, 0, 0], [50, 50, 50], [100, 100, 100], [150, 150, 150]], (8, 6));
        write_sequence(&second, &[[200, 0, 0], [0, 200, 0], [0, 0, 200]], (16, 12));

        let backend = ImageSequenceBackend::default();
        let output = backend.output_path(temp.path(), "merged.mp4");
        let summary = backend
            .splice(&SpliceRequest {
                first,
                second,
                cut_first: 2,
                cut_second: 1,
                output: output.clone(),
            })
            .unwrap();

        assert_eq!(summary.frames_from_first, 3);
        assert_eq!(summary.frames_from_second, 2);
        assert_eq!(output, temp.path().join("merged"));

        let merged = ImageSequenceVideo::open(&output, 30.0).unwrap();
        assert_eq!(merged.frame_count(), 5);
        assert_eq!(merged.dimensions(), (8, 6));
        assert_eq!(merged.frame(2).unwrap().get_pixel(0, 0), [100, 100, 100]);
        assert_eq!(merged.frame(3).unwrap().get_pixel(4, 3), [0, 200, 0]);
    }

    #[test]
    fn test_splice_into_an_input_leaves_it_intact() {
        let temp = tempdir().unwrap();
        let first = temp.path().join("a");
        let second = temp.path().join("b");
        write_sequence(&first, &[[10, 10, 10], [20, 20, 20]], (4, 4));
        write_sequence(&second, &[[30, 30, 30], [40, 40, 40]], (4, 4));

        let backend = ImageSequenceBackend::default();
        for output in [first.clone(), second.clone(), temp.path().to_path_buf()] {
            let result = backend.splice(&SpliceRequest {
                first: first.clone(),
                second: second.clone(),
                cut_first: 1,
                cut_second: 0,
                output,
            });
            assert!(matches!(result, Err(crate::error::BridgeError::Video(VideoError::OutputIsInput { .. }))));
        }

        assert_eq!(ImageSequenceVideo::open(&first, 30.0).unwrap().frame_count(), 2);
        assert_eq!(ImageSequenceVideo::open(&second, 30.0).unwrap().frame_count(), 2);
    }

    #[test]
    fn test_copy_and_remove_sequence() {
        let temp = tempdir().unwrap();
        let clip = temp.path().join("clip");
        let copy = temp.path().join("copy");
        write_sequence(&clip, &[[5, 5, 5], [6, 6, 6]], (4, 4));

        let backend = ImageSequenceBackend::default();
        backend.copy(&clip, &copy).unwrap();
        assert_eq!(ImageSequenceVideo::open(&copy, 30.0).unwrap().frame_count(), 2);

        backend.remove(&copy).unwrap();
        assert!(!copy.exists());
    }
}
