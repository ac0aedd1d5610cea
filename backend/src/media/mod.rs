//! Watermarking relay: remote video in, watermarked MP4 stream out.

mod ffmpeg;
mod policy;

use std::io;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use reqwest::Url;
use thiserror::Error;

pub use ffmpeg::{watermark_filter, FfmpegTranscoder, WATERMARK_TEXT};
pub use policy::validate_source_url;

pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Invalid video URL: {0}")]
    InvalidInput(String),

    #[error("Video processing failed: {0}")]
    Processing(String),
}

/// Something that turns a source URL into a transcoded byte stream.
///
/// The stream ends with an `Err` item if transcoding fails part way.
pub trait Transcoder: Send + Sync {
    fn transcode(&self, source: &Url) -> Result<ByteStream, MediaError>;
}

pub struct MediaRelay {
    transcoder: Arc<dyn Transcoder>,
    allow_private_hosts: bool,
}

impl MediaRelay {
    pub fn new(transcoder: Arc<dyn Transcoder>, allow_private_hosts: bool) -> Self {
        Self {
            transcoder,
            allow_private_hosts,
        }
    }

    /// Start watermarking `source_url`.
    ///
    /// Waits for the first chunk so that a transcoder failing up front is
    /// reported as an error instead of an empty response.
    pub async fn watermark(&self, source_url: &str) -> Result<ByteStream, MediaError> {
        let url = validate_source_url(source_url, self.allow_private_hosts)?;
        let mut output = self.transcoder.transcode(&url)?;

        let first = match output.next().await {
            Some(Ok(chunk)) => chunk,
            Some(Err(e)) => return Err(MediaError::Processing(e.to_string())),
            None => {
                return Err(MediaError::Processing(
                    "transcoder produced no output".to_string(),
                ))
            }
        };

        let rest = output.inspect_err(|e| tracing::error!("FFmpeg error: {}", e));
        Ok(stream::once(async move { Ok(first) }).chain(rest).boxed())
    }
}
