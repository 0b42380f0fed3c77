//! Voice-tag watermarking through ffmpeg
//!
//! The source duration comes from ffprobe. The tag is attenuated, split
//! once per insertion point, delayed to its offset, and mixed over the
//! source. Both tools are called with argument vectors, never a shell.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use tokio::process::Command;

use super::ProcessingError;
use crate::config::WatermarkConfig;

/// Where and how loud the tag goes into one source
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayPlan {
    /// Insertion points, ascending from zero
    pub offsets: Vec<Duration>,
    /// Gain applied to the tag, in dB
    pub gain_db: f64,
}

impl OverlayPlan {
    /// One insertion at every multiple of `interval` strictly before the
    /// end of the source.
    pub fn new(source_duration: Duration, interval: Duration, gain_db: f64) -> Self {
        let mut offsets = Vec::new();
        if !interval.is_zero() {
            let mut at = Duration::ZERO;
            while at < source_duration {
                offsets.push(at);
                at += interval;
            }
        }
        Self { offsets, gain_db }
    }

    /// ffmpeg `-filter_complex` graph; input 0 is the source, input 1 the tag.
    /// The result is labelled `[out]` and lasts exactly as long as the source.
    pub fn filter_graph(&self) -> String {
        if self.offsets.is_empty() {
            return "[0:a]anull[out]".to_string();
        }

        let count = self.offsets.len();
        let split_labels: String = (0..count).map(|i| format!("[t{i}]")).collect();
        let mut graph = format!("[1:a]volume={}dB,asplit={count}{split_labels}", self.gain_db);

        for (i, offset) in self.offsets.iter().enumerate() {
            graph.push_str(&format!(
                ";[t{i}]adelay=delays={}:all=1[d{i}]",
                offset.as_millis()
            ));
        }

        let mix_inputs: String = (0..count).map(|i| format!("[d{i}]")).collect();
        graph.push_str(&format!(
            ";[0:a]{mix_inputs}amix=inputs={}:duration=first:dropout_transition=0:normalize=0[out]",
            count + 1
        ));
        graph
    }
}

/// Typed binding to ffprobe/ffmpeg plus the mix parameters
#[derive(Debug, Clone)]
pub struct Watermarker {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    interval: Duration,
    gain_db: f64,
}

impl Watermarker {
    pub fn new(config: &WatermarkConfig) -> Self {
        Self {
            ffmpeg: config.ffmpeg.clone(),
            ffprobe: config.ffprobe.clone(),
            interval: config.interval,
            gain_db: config.gain_db,
        }
    }

    pub fn plan(&self, source_duration: Duration) -> OverlayPlan {
        OverlayPlan::new(source_duration, self.interval, self.gain_db)
    }

    /// Mix `tag` into `source` and write an MP3 to `output`
    pub async fn apply(
        &self,
        source: &Path,
        tag: &Path,
        output: &Path,
    ) -> Result<OverlayPlan, ProcessingError> {
        let duration = self.probe_duration(source).await?;
        let plan = self.plan(duration);

        tracing::info!(
            source = %source.display(),
            duration_secs = duration.as_secs_f64(),
            insertions = plan.offsets.len(),
            "Mixing tag into source"
        );

        let args = overlay_args(source, tag, output, &plan);
        run_tool(&self.ffmpeg, &args).await?;
        Ok(plan)
    }

    /// Length of the audio at `path`
    pub async fn probe_duration(&self, path: &Path) -> Result<Duration, ProcessingError> {
        let output = run_tool(&self.ffprobe, &probe_args(path)).await?;
        parse_duration(&tool_name(&self.ffprobe), &String::from_utf8_lossy(&output.stdout))
    }
}

fn probe_args(path: &Path) -> Vec<OsString> {
    vec![
        "-v".into(),
        "error".into(),
        "-show_entries".into(),
        "format=duration".into(),
        "-of".into(),
        "default=noprint_wrappers=1:nokey=1".into(),
        path.into(),
    ]
}

fn overlay_args(source: &Path, tag: &Path, output: &Path, plan: &OverlayPlan) -> Vec<OsString> {
    vec![
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-y".into(),
        "-i".into(),
        source.into(),
        "-i".into(),
        tag.into(),
        "-filter_complex".into(),
        plan.filter_graph().into(),
        "-map".into(),
        "[out]".into(),
        "-codec:a".into(),
        "libmp3lame".into(),
        "-q:a".into(),
        "2".into(),
        output.into(),
    ]
}

fn parse_duration(tool: &str, stdout: &str) -> Result<Duration, ProcessingError> {
    let trimmed = stdout.trim();
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
        .ok_or_else(|| ProcessingError::UnexpectedOutput {
            tool: tool.to_string(),
            output: trimmed.to_string(),
        })
}

fn tool_name(program: &Path) -> String {
    program
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.display().to_string())
}

async fn run_tool(program: &Path, args: &[OsString]) -> Result<Output, ProcessingError> {
    let tool = tool_name(program);
    tracing::debug!(tool = %tool, ?args, "Running external tool");

    let output = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ProcessingError::ToolNotFound(tool.clone()),
            _ => ProcessingError::Io(e),
        })?;

    if !output.status.success() {
        return Err(ProcessingError::ToolFailed {
            tool,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIFTEEN: Duration = Duration::from_secs(15);

    fn secs(values: &[u64]) -> Vec<Duration> {
        values.iter().map(|s| Duration::from_secs(*s)).collect()
    }

    #[test]
    fn test_sixty_second_track_gets_four_insertions() {
        let plan = OverlayPlan::new(Duration::from_secs(60), FIFTEEN, -6.0);
        assert_eq!(plan.offsets, secs(&[0, 15, 30, 45]));
    }

    #[test]
    fn test_partial_last_interval_still_gets_a_tag() {
        let plan = OverlayPlan::new(Duration::from_secs_f64(61.5), FIFTEEN, -6.0);
        assert_eq!(plan.offsets, secs(&[0, 15, 30, 45, 60]));
    }

    #[test]
    fn test_short_track_gets_tag_at_start_only() {
        let plan = OverlayPlan::new(Duration::from_secs(4), FIFTEEN, -6.0);
        assert_eq!(plan.offsets, secs(&[0]));
    }

    #[test]
    fn test_empty_track_has_no_insertions() {
        let plan = OverlayPlan::new(Duration::ZERO, FIFTEEN, -6.0);
        assert!(plan.offsets.is_empty());
        assert_eq!(plan.filter_graph(), "[0:a]anull[out]");
    }

    #[test]
    fn test_filter_graph_for_two_insertions() {
        let plan = OverlayPlan::new(Duration::from_secs(20), FIFTEEN, -6.0);
        assert_eq!(
            plan.filter_graph(),
            "[1:a]volume=-6dB,asplit=2[t0][t1];\
             [t0]adelay=delays=0:all=1[d0];\
             [t1]adelay=delays=15000:all=1[d1];\
             [0:a][d0][d1]amix=inputs=3:duration=first:dropout_transition=0:normalize=0[out]"
        );
    }

    #[test]
    fn test_overlay_args_keep_paths_as_single_arguments() {
        let plan = OverlayPlan::new(Duration::from_secs(30), FIFTEEN, -6.0);
        let source = Path::new("/tmp/my beat; rm -rf ~.mp3");
        let args = overlay_args(source, Path::new("/tmp/tag.wav"), Path::new("/tmp/out.mp3"), &plan);

        assert!(args.contains(&OsString::from("/tmp/my beat; rm -rf ~.mp3")));
        assert_eq!(args.last(), Some(&OsString::from("/tmp/out.mp3")));
        let graph_pos = args.iter().position(|a| a == "-filter_complex").unwrap();
        assert_eq!(args[graph_pos + 1], OsString::from(plan.filter_graph()));
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("ffprobe", "60.000000\n").unwrap(), Duration::from_secs(60));
        assert!(matches!(
            parse_duration("ffprobe", "N/A\n"),
            Err(ProcessingError::UnexpectedOutput { .. })
        ));
        assert!(parse_duration("ffprobe", "-1").is_err());
    }

    #[tokio::test]
    async fn test_missing_binary_is_tool_not_found() {
        let watermarker = Watermarker::new(&WatermarkConfig {
            ffprobe: PathBuf::from("/nonexistent/bin/ffprobe"),
            ..WatermarkConfig::default()
        });
        let err = watermarker
            .probe_duration(Path::new("/tmp/source.mp3"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessingError::ToolNotFound(ref t) if t == "ffprobe"));
    }
}
