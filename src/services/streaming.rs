use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::ReceiverStream;

use crate::audio::Surgery;
use crate::chunking::{split_text, ChunkingConfig};
use crate::config::constants::{DEFAULT_CHUNK_BUFFER_SIZE, DEFAULT_CHUNK_CONCURRENCY};
use crate::error::{Result, TtsError};
use crate::models::AudioFormat;
use crate::text_processing::sanitize_text;
use crate::upstream::{SpeechStream, SynthesisRequest, TtsClient};

/// Tuning for the long-text streaming pipeline.
#[derive(Debug, Clone)]
pub struct LongTextStreamConfig {
    /// Parallel chunk fetches within one request (clamped to the chunk
    /// count and the client's global cap)
    pub max_concurrent: usize,
    /// Copy buffer size per chunk pipe, in bytes
    pub chunk_buffer_size: usize,
}

impl Default for LongTextStreamConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_CHUNK_CONCURRENCY,
            chunk_buffer_size: DEFAULT_CHUNK_BUFFER_SIZE,
        }
    }
}

type Frame = Result<Bytes>;

struct ChunkJob {
    request: SynthesisRequest,
    // taken exactly once by the worker that claims the job
    pipe: Mutex<Option<mpsc::Sender<Frame>>>,
}

/// Synthesize long text as one ordered audio stream.
///
/// The text is sanitized and chunked; chunk 0 is fetched synchronously and
/// its observed format fixes the container surgery for the rest. Remaining
/// chunks are fetched by a bounded worker pool, each piped through surgery
/// into its own backpressured channel, while a single writer forwards pipes
/// in ascending index order. Bytes start flowing to the caller as soon as
/// chunk 0 responds; a failed chunk cancels the group and propagates the
/// error downstream.
pub async fn generate_long_text_stream(
    client: Arc<TtsClient>,
    text: &str,
    chunking: &ChunkingConfig,
    template: &SynthesisRequest,
    config: &LongTextStreamConfig,
) -> Result<SpeechStream> {
    let clean = sanitize_text(text)?;
    let chunks = split_text(&clean, chunking);
    if chunks.is_empty() {
        return Err(TtsError::Processing(
            "no valid text chunks found after processing".to_string(),
        ));
    }

    let total = chunks.len();
    let mut requests: Vec<SynthesisRequest> = chunks
        .into_iter()
        .map(|chunk| {
            template
                .clone()
                .with_input(chunk)
                .without_length_validation()
        })
        .collect();

    if total == 1 {
        let mut stream = client.generate_speech_stream(&requests[0]).await?;
        stream
            .metadata
            .insert("chunks_total".to_string(), "1".to_string());
        return Ok(stream);
    }

    // Chunk 0 is fetched before any bytes are promised to the caller; a
    // failure here still surfaces as a clean error response.
    let first = client.generate_speech_stream(&requests[0]).await?;
    let format = first.format;

    tracing::debug!(
        "streaming {} chunks as {} (concurrency {})",
        total,
        format,
        config.max_concurrent
    );

    let rest = requests.split_off(1);
    let buffer_size = config.chunk_buffer_size.max(1);
    let workers = config
        .max_concurrent
        .max(1)
        .min(rest.len())
        .min(client.max_concurrent());

    let mut pipes = Vec::with_capacity(rest.len());
    let mut jobs = Vec::with_capacity(rest.len());
    for request in rest {
        let (tx, rx) = mpsc::channel::<Frame>(1);
        pipes.push(rx);
        jobs.push(ChunkJob {
            request,
            pipe: Mutex::new(Some(tx)),
        });
    }
    let jobs = Arc::new(jobs);

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let cancel_tx = Arc::new(cancel_tx);
    let next_index = Arc::new(AtomicUsize::new(0));

    for _ in 0..workers {
        let client = client.clone();
        let jobs = jobs.clone();
        let next_index = next_index.clone();
        let cancel_tx = cancel_tx.clone();
        let cancel_rx = cancel_rx.clone();

        tokio::spawn(async move {
            loop {
                if *cancel_rx.borrow() {
                    break;
                }

                let i = next_index.fetch_add(1, Ordering::SeqCst);
                if i >= jobs.len() {
                    break;
                }

                let job = &jobs[i];
                let pipe = job
                    .pipe
                    .lock()
                    .expect("pipe mutex poisoned")
                    .take()
                    .expect("chunk job claimed twice");

                if let Err(e) = fetch_chunk_into_pipe(
                    &client,
                    &job.request,
                    &pipe,
                    format,
                    buffer_size,
                    cancel_rx.clone(),
                )
                .await
                {
                    tracing::warn!("chunk {} failed: {}", i + 1, e);
                    let _ = pipe.send(Err(e)).await;
                    let _ = cancel_tx.send(true);
                    break;
                }
            }
        });
    }

    // Single writer: chunk 0 verbatim, then each pipe in ascending order.
    let (out_tx, out_rx) = mpsc::channel::<Frame>(4);
    let content_type = first.content_type.clone();
    let mut metadata = first.metadata.clone();
    let writer_cancel = cancel_tx.clone();

    tokio::spawn(async move {
        let mut first_body = first.body;
        while let Some(frame) = first_body.next().await {
            let failed = frame.is_err();
            if out_tx.send(frame).await.is_err() || failed {
                let _ = writer_cancel.send(true);
                return;
            }
        }
        drop(first_body);

        for (i, mut pipe) in pipes.into_iter().enumerate() {
            while let Some(frame) = pipe.recv().await {
                let failed = frame.is_err();
                if out_tx.send(frame).await.is_err() || failed {
                    let _ = writer_cancel.send(true);
                    return;
                }
            }
            tracing::debug!("chunk {} delivered", i + 1);
        }
        // out_tx drops here, ending the response stream cleanly
    });

    metadata.insert("chunks_total".to_string(), total.to_string());

    Ok(SpeechStream {
        body: ReceiverStream::new(out_rx).boxed(),
        content_type,
        format,
        metadata,
    })
}

/// Fetch one chunk and copy its body through container surgery into the
/// pipe, in frames of at most `buffer_size` bytes.
///
/// Backpressure comes from the bounded pipe: a slow reader blocks the send,
/// which in turn stalls the upstream read. Cancellation is observed between
/// every await.
async fn fetch_chunk_into_pipe(
    client: &TtsClient,
    request: &SynthesisRequest,
    pipe: &mpsc::Sender<Frame>,
    format: AudioFormat,
    buffer_size: usize,
    mut cancel: watch::Receiver<bool>,
) -> Result<()> {
    let stream = tokio::select! {
        result = client.generate_speech_stream(request) => result?,
        _ = cancel.changed() => return Err(cancelled()),
    };

    let mut surgery = Surgery::for_format(format);
    let mut body = stream.body;
    let mut pending = BytesMut::with_capacity(buffer_size);

    loop {
        let item = tokio::select! {
            item = body.next() => item,
            _ = cancel.changed() => return Err(cancelled()),
        };

        match item {
            Some(Ok(chunk)) => {
                let out = surgery.push(chunk);
                pending.extend_from_slice(&out);
                while pending.len() >= buffer_size {
                    let frame = pending.split_to(buffer_size).freeze();
                    if pipe.send(Ok(frame)).await.is_err() {
                        return Err(cancelled());
                    }
                }
            }
            Some(Err(e)) => return Err(e),
            None => {
                let tail = surgery.finish()?;
                pending.extend_from_slice(&tail);
                if !pending.is_empty() {
                    let frame = pending.freeze();
                    if pipe.send(Ok(frame)).await.is_err() {
                        return Err(cancelled());
                    }
                }
                return Ok(());
            }
        }
    }
}

fn cancelled() -> TtsError {
    TtsError::Processing("long text stream cancelled".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LongTextStreamConfig::default();
        assert_eq!(config.max_concurrent, 3);
        assert_eq!(config.chunk_buffer_size, 32 * 1024);
    }

    #[test]
    fn test_worker_clamp() {
        // worker count is min(max_concurrent, remaining chunks, global cap)
        let clamp = |m: usize, rest: usize, global: usize| m.max(1).min(rest).min(global);

        assert_eq!(clamp(3, 10, 10), 3);
        assert_eq!(clamp(3, 1, 10), 1);
        assert_eq!(clamp(16, 10, 10), 10);
        assert_eq!(clamp(0, 10, 10), 1);
    }
}
