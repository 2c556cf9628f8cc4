use std::ops::Range;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::{BatchConfig, VideoConfig};
use crate::error::{MatchError, Result, VideoError};
use crate::video::backend::{MediaBackend, SpliceRequest, SpliceSummary};
use crate::video::source::VideoSource;
use crate::video::types::{Frame, VideoDetails};

/// Video files decoded and encoded through the external `ffmpeg`/`ffprobe` tools
pub struct FfmpegBackend {
    config: VideoConfig,
    supported_formats: Vec<String>,
}

impl FfmpegBackend {
    /// Create a backend, failing early when ffmpeg is not installed
    pub fn new(config: VideoConfig, batch: &BatchConfig) -> Result<Self> {
        for tool in [&config.ffmpeg_binary, &config.ffprobe_binary] {
            if !Self::tool_available(tool) {
                return Err(VideoError::ToolMissing { tool: tool.clone() }.into());
            }
        }

        info!("Initialized ffmpeg backend ({}, {})", config.ffmpeg_binary, config.ffprobe_binary);
        Ok(Self {
            config,
            supported_formats: batch
                .supported_formats
                .iter()
                .map(|ext| ext.to_lowercase())
                .collect(),
        })
    }

    pub fn tool_available(binary: &str) -> bool {
        Command::new(binary)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    fn probe(&self, path: &Path) -> Result<VideoDetails> {
        let output = Command::new(&self.config.ffprobe_binary)
            .args(["-v", "error", "-select_streams", "v:0", "-count_packets"])
            .args([
                "-show_entries",
                "stream=width,height,avg_frame_rate,r_frame_rate,nb_frames,nb_read_packets",
            ])
            .args(["-of", "json"])
            .arg(path)
            .output()
            .map_err(|_| VideoError::ToolMissing { tool: self.config.ffprobe_binary.clone() })?;

        if !output.status.success() {
            return Err(VideoError::LoadFailed {
                path: format!("{}: {}", path.display(), String::from_utf8_lossy(&output.stderr).trim()),
            }.into());
        }

        let details = parse_probe_output(path, &output.stdout)?;
        let file_size = std::fs::metadata(path)?.len();

        debug!("Probed {}: {}x{} @ {:.2}fps, {} frames",
               path.display(), details.width, details.height, details.fps, details.frame_count);

        Ok(VideoDetails { file_size, ..details })
    }

    fn quality_to_crf(&self) -> u8 {
        (51 - ((self.config.quality as f32 / 100.0) * 51.0) as u8).clamp(0, 51)
    }
}

impl MediaBackend for FfmpegBackend {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn accepts(&self, path: &Path) -> bool {
        path.is_file()
            && path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| self.supported_formats.contains(&ext.to_lowercase()))
                .unwrap_or(false)
    }

    fn open(&self, path: &Path) -> Result<Box<dyn VideoSource>> {
        if !path.is_file() {
            return Err(VideoError::LoadFailed { path: path.display().to_string() }.into());
        }

        let details = self.probe(path)?;
        Ok(Box::new(FfmpegVideo {
            path: path.to_path_buf(),
            details,
            ffmpeg_binary: self.config.ffmpeg_binary.clone(),
        }))
    }

    fn details(&self, path: &Path) -> Result<VideoDetails> {
        self.probe(path)
    }

    fn splice(&self, request: &SpliceRequest) -> Result<SpliceSummary> {
        request.ensure_output_is_separate()?;

        let first = self.probe(&request.first)?;
        let second = self.probe(&request.second)?;

        let frames_from_first = (request.cut_first + 1).min(first.frame_count);
        let frames_from_second = second.frame_count.saturating_sub(request.cut_second);

        let graph = splice_filter_graph(&first, request.cut_first, request.cut_second);
        let crf = self.quality_to_crf().to_string();
        debug!("Splice filter graph: {}", graph);

        let output = Command::new(&self.config.ffmpeg_binary)
            .args(["-v", "error", "-y"])
            .arg("-i")
            .arg(&request.first)
            .arg("-i")
            .arg(&request.second)
            .args(["-filter_complex", graph.as_str(), "-map", "[out]"])
            .args(["-c:v", self.config.codec.as_str()])
            .args(["-crf", crf.as_str()])
            .args(["-pix_fmt", "yuv420p"])
            .arg(&request.output)
            .output()
            .map_err(|e| VideoError::EncodingFailed {
                reason: format!("ffmpeg execution failed: {}", e),
            })?;
        check_status(&output)?;

        info!("Spliced {} + {} -> {} ({} + {} frames)",
              request.first.display(), request.second.display(), request.output.display(),
              frames_from_first, frames_from_second);

        Ok(SpliceSummary {
            output: request.output.clone(),
            frames_from_first,
            frames_from_second,
        })
    }
}

/// An ffmpeg-decoded video file
pub struct FfmpegVideo {
    path: PathBuf,
    details: VideoDetails,
    ffmpeg_binary: String,
}

impl FfmpegVideo {
    pub fn details(&self) -> &VideoDetails {
        &self.details
    }
}

impl VideoSource for FfmpegVideo {
    fn frame_count(&self) -> usize {
        self.details.frame_count
    }

    fn fps(&self) -> f64 {
        self.details.fps
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.details.width, self.details.height)
    }

    fn frame(&self, index: usize) -> Result<Frame> {
        let mut frames = self.frames(index..index + 1)?;
        frames.pop().ok_or_else(|| {
            MatchError::FrameRead { index, reason: "no frame decoded".to_string() }.into()
        })
    }

    /// Decodes the whole range in a single ffmpeg run, streamed as raw RGB
    fn frames(&self, range: Range<usize>) -> Result<Vec<Frame>> {
        if range.is_empty() {
            return Ok(Vec::new());
        }

        let select = format!("select=between(n\\,{}\\,{})", range.start, range.end - 1);
        let output = Command::new(&self.ffmpeg_binary)
            .args(["-v", "error", "-noautorotate"])
            .arg("-i")
            .arg(&self.path)
            .args(["-vf", select.as_str(), "-vsync", "0"])
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
            .output()
            .map_err(|e| MatchError::FrameRead {
                index: range.start,
                reason: format!("ffmpeg execution failed: {}", e),
            })?;

        if !output.status.success() {
            return Err(MatchError::FrameRead {
                index: range.start,
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }.into());
        }

        let frames = split_raw_frames(&output.stdout, self.details.width, self.details.height);
        if frames.len() < range.len() {
            warn!("{}: expected {} frames from {}, decoded {}",
                  self.path.display(), range.len(), range.start, frames.len());
            return Err(MatchError::FrameRead {
                index: range.start + frames.len(),
                reason: "frame missing from decoder output".to_string(),
            }.into());
        }

        Ok(frames)
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
    nb_read_packets: Option<String>,
}

fn parse_probe_output(path: &Path, json: &[u8]) -> Result<VideoDetails> {
    let probe: ProbeOutput = serde_json::from_slice(json).map_err(|e| VideoError::ProbeFailed {
        reason: format!("{}: invalid ffprobe output: {}", path.display(), e),
    })?;

    let stream = probe.streams.into_iter().next().ok_or_else(|| VideoError::ProbeFailed {
        reason: format!("{}: no video stream", path.display()),
    })?;

    let fps = stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_rational)
        .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_rational))
        .filter(|fps| fps.is_finite() && *fps > 0.0)
        .ok_or_else(|| VideoError::ProbeFailed {
            reason: format!("{}: no usable frame rate", path.display()),
        })?;

    let frame_count = stream
        .nb_read_packets
        .as_deref()
        .or(stream.nb_frames.as_deref())
        .and_then(|count| count.parse().ok())
        .unwrap_or(0);

    Ok(VideoDetails {
        path: path.to_path_buf(),
        width: stream.width.unwrap_or(0),
        height: stream.height.unwrap_or(0),
        fps,
        frame_count,
        file_size: 0,
    })
}

/// Parses ffprobe rates such as `30000/1001`
fn parse_rational(rate: &str) -> Option<f64> {
    let (num, den) = rate.split_once('/').unwrap_or((rate, "1"));
    let num: f64 = num.trim().parse().ok()?;
    let den: f64 = den.trim().parse().ok()?;
    (den != 0.0 && num > 0.0).then(|| num / den)
}

fn split_raw_frames(data: &[u8], width: u32, height: u32) -> Vec<Frame> {
    let frame_len = width as usize * height as usize * 3;
    if frame_len == 0 {
        return Vec::new();
    }

    data.chunks_exact(frame_len)
        .filter_map(|chunk| Frame::from_rgb_bytes(width, height, chunk.to_vec()))
        .collect()
}

fn splice_filter_graph(first: &VideoDetails, cut_first: usize, cut_second: usize) -> String {
    format!(
        "[0:v]trim=start_frame=0:end_frame={end},setpts=PTS-STARTPTS,setsar=1[a];\
         [1:v]trim=start_frame={start},setpts=PTS-STARTPTS,scale={w}:{h},setsar=1,fps={fps}[b];\
         [a][b]concat=n=2:v=1:a=0[out]",
        end = cut_first + 1,
        start = cut_second,
        w = first.width,
        h = first.height,
        fps = first.fps,
    )
}

fn check_status(output: &Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    Err(VideoError::EncodingFailed {
        reason: format!("ffmpeg failed: {}", String::from_utf8_lossy(&output.stderr).trim()),
    }.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rational() {
        assert_eq!(parse_rational("30/1"), Some(30.0));
        assert_eq!(parse_rational("25"), Some(25.0));
        assert_eq!(parse_rational("0/0"), None);
        let ntsc = parse_rational("30000/1001").unwrap();
        assert!((ntsc - 29.97).abs() < 0.01);
    }

    #[test]
    fn test_parse_probe_output() {
        let json = br#"{
            "programs": [],
            "streams": [
                {
                    "width": 1280,
                    "height": 720,
                    "r_frame_rate": "25/1",
                    "avg_frame_rate": "25/1",
                    "nb_frames": "250",
                    "nb_read_packets": "249"
                }
            ]
        }"#;

        let details = parse_probe_output(Path::new("clip.mp4"), json).unwrap();
        assert_eq!((details.width, details.height), (1280, 720));
        assert_eq!(details.fps, 25.0);
        assert_eq!(details.frame_count, 249);
    }

    #[test]
    fn test_probe_without_stream_fails() {
        let result = parse_probe_output(Path::new("audio.mp4"), br#"{"streams": []}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_frame_rate_is_rejected() {
        let json = br#"{"streams": [{"width": 640, "height": 360, "avg_frame_rate": "0/0", "r_frame_rate": "0/0"}]}"#;
        match parse_probe_output(Path::new("still.mp4"), json) {
            Err(crate::error::BridgeError::Video(VideoError::ProbeFailed { reason })) => {
                assert!(reason.contains("frame rate"));
            }
            other => panic!("unexpected result: {:?}", other.map(|d| d.fps)),
        }

        let json = br#"{"streams": [{"width": 640, "height": 360}]}"#;
        assert!(parse_probe_output(Path::new("still.mp4"), json).is_err());

        let json = br#"{"streams": [{"width": 640, "height": 360, "avg_frame_rate": "0/0", "r_frame_rate": "24/1"}]}"#;
        assert_eq!(parse_probe_output(Path::new("clip.mp4"), json).unwrap().fps, 24.0);
    }

    #[test]
    fn test_split_raw_frames_drops_partial_tail() {
        let mut data = vec![10u8; 2 * 2 * 3 * 2];
        data.extend_from_slice(&[1, 2, 3]);
        let frames = split_raw_frames(&data, 2, 2);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].get_pixel(1, 1), [10, 10, 10]);
    }

    #[test]
    fn test_filter_graph_keeps_cut_frame() {
        let first = VideoDetails {
            path: PathBuf::from("a.mp4"),
            width: 640,
            height: 360,
            fps: 30.0,
            frame_count: 90,
            file_size: 0,
        };
        let graph = splice_filter_graph(&first, 87, 2);
        assert!(graph.contains("end_frame=88"));
        assert!(graph.contains("start_frame=2"));
        assert!(graph.contains("scale=640:360"));
    }
}
