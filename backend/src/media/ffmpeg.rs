//! `ffmpeg` child process driven as a byte stream.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::io;
use std::process::Stdio;

use bytes::BytesMut;
use futures::stream::{self, StreamExt};
use reqwest::Url;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::task::JoinHandle;

use super::{ByteStream, MediaError, Transcoder};

pub const WATERMARK_TEXT: &str = "www.doxing.life";

const CHUNK_SIZE: usize = 64 * 1024;
const STDERR_TAIL_LINES: usize = 20;

/// `drawtext` overlay: centered, rotated along the frame diagonal, with a
/// soft shadow.
pub fn watermark_filter(text: &str) -> String {
    format!(
        "drawtext=text='{text}':fontsize=60:fontcolor=white@0.6:\
         x=(w-text_w)/2:y=(h-text_h)/2:rotation=atan2(h\\,w):\
         shadowx=2:shadowy=2:shadowcolor=black@0.5"
    )
}

/// Transcoder backed by the `ffmpeg` binary.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    binary: OsString,
    watermark: String,
}

impl FfmpegTranscoder {
    pub fn new(binary: impl Into<OsString>) -> Self {
        Self {
            binary: binary.into(),
            watermark: WATERMARK_TEXT.to_string(),
        }
    }

    /// Command line for one run; output is fragmented MP4 on stdout.
    pub fn args(&self, source: &Url) -> Vec<String> {
        [
            "-hide_banner",
            "-loglevel",
            "error",
            "-i",
            source.as_str(),
            "-vf",
            &watermark_filter(&self.watermark),
            "-c:a",
            "aac",
            "-c:v",
            "libx264",
            "-movflags",
            "frag_keyframe+empty_moov",
            "-f",
            "mp4",
            "pipe:1",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }
}

impl Transcoder for FfmpegTranscoder {
    fn transcode(&self, source: &Url) -> Result<ByteStream, MediaError> {
        let mut child = Command::new(&self.binary)
            .args(self.args(source))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                MediaError::Processing(format!(
                    "failed to start {}: {e}",
                    self.binary.to_string_lossy()
                ))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::Processing("ffmpeg stdout was not captured".into()))?;
        let stderr = child.stderr.take().map(collect_stderr);

        tracing::debug!("Spawned ffmpeg for {}", source);
        Ok(process_stream(child, stdout, stderr))
    }
}

struct Pipe {
    child: Child,
    stdout: ChildStdout,
    stderr: Option<JoinHandle<VecDeque<String>>>,
}

/// Stream stdout in chunks; a non-zero exit becomes a trailing error item.
fn process_stream(
    child: Child,
    stdout: ChildStdout,
    stderr: Option<JoinHandle<VecDeque<String>>>,
) -> ByteStream {
    let pipe = Pipe {
        child,
        stdout,
        stderr,
    };

    stream::unfold(Some(pipe), |state| async move {
        let Some(mut pipe) = state else {
            return None;
        };
        let mut buf = BytesMut::with_capacity(CHUNK_SIZE);

        match pipe.stdout.read_buf(&mut buf).await {
            Ok(0) => match pipe.child.wait().await {
                Ok(status) if status.success() => {
                    tracing::info!("Video watermarking completed");
                    None
                }
                Ok(status) => {
                    let tail = match pipe.stderr.take() {
                        Some(handle) => handle.await.unwrap_or_default(),
                        None => VecDeque::new(),
                    };
                    let message = format!(
                        "ffmpeg exited with {status}: {}",
                        Vec::from(tail).join(" | ")
                    );
                    Some((Err(io::Error::new(io::ErrorKind::Other, message)), None))
                }
                Err(e) => Some((Err(e), None)),
            },
            Ok(_) => Some((Ok(buf.freeze()), Some(pipe))),
            Err(e) => Some((Err(e), None)),
        }
    })
    .boxed()
}

fn collect_stderr(stderr: ChildStderr) -> JoinHandle<VecDeque<String>> {
    tokio::spawn(async move {
        let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            tracing::debug!(target: "ffmpeg", "{}", line);
            if tail.len() == STDERR_TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(line);
        }
        tail
    })
}
