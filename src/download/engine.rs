//! Resumable, atomically committed transfer of a resolved target.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use reqwest::Response;
use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};

use crate::resolver::ResolvedTarget;
use crate::session::{SessionClient, SessionError};

use super::constants::CHUNK_SIZE;
use super::filename::{media_file_name, staging_path_for};
use super::progress::{NoopObserver, ProgressObserver, TransferProgress};
use super::TransferError;

/// Book-keeping for one running transfer. Only the engine mutates it.
#[derive(Debug, Clone)]
pub struct TransferState {
    /// Final destination.
    pub target_path: PathBuf,
    /// Sibling path written while incomplete.
    pub staging_path: PathBuf,
    /// Bytes present in the staging file.
    pub bytes_done: u64,
    /// Declared total size, 0 when unknown.
    pub total_bytes: u64,
    /// When this transfer call started.
    pub started_at: Instant,
}

impl TransferState {
    fn new(target_path: PathBuf) -> Self {
        let staging_path = staging_path_for(&target_path);
        Self {
            target_path,
            staging_path,
            bytes_done: 0,
            total_bytes: 0,
            started_at: Instant::now(),
        }
    }
}

/// Result of a committed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    /// Path of the committed file.
    pub path: PathBuf,
    /// Final file size.
    pub bytes_written: u64,
    /// Bytes received during this call.
    pub bytes_transferred: u64,
    /// Bytes reused from an earlier partial transfer.
    pub resumed_from: u64,
    /// Wall time of this call.
    pub elapsed: Duration,
    /// True when a corrupt resume forced a restart from zero.
    pub restarted: bool,
}

impl TransferOutcome {
    /// Average throughput of this call in bytes per second.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average_speed(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.bytes_transferred as f64 / secs
        } else {
            0.0
        }
    }
}

/// Streams resolved targets to disk through a staging file.
///
/// The engine never retries; a failed transfer leaves its staging file for the caller
/// to resume later.
#[derive(Clone)]
pub struct TransferEngine {
    session: SessionClient,
    observer: Arc<dyn ProgressObserver>,
}

impl std::fmt::Debug for TransferEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferEngine")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

enum AttemptError {
    Corrupt(String),
    Fatal(TransferError),
}

impl TransferEngine {
    /// Creates an engine that reports progress nowhere.
    #[must_use]
    pub fn new(session: SessionClient) -> Self {
        Self {
            session,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Reports progress to `observer`.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Transfers `target` to `destination_dir/<sanitized title>.mp4`.
    ///
    /// # Errors
    ///
    /// See [`TransferEngine::transfer_to_path`].
    pub async fn transfer(
        &self,
        target: ResolvedTarget,
        destination_dir: &Path,
        resume: bool,
    ) -> Result<TransferOutcome, TransferError> {
        let target_path = destination_dir.join(media_file_name(target.suggested_name()));
        self.transfer_to_path(target, &target_path, resume).await
    }

    /// Transfers `target` to an explicit path.
    ///
    /// With `resume`, an existing staging file is continued with a `Range` request.
    /// The committed file appears only through the final rename.
    ///
    /// # Errors
    ///
    /// - [`TransferError::Interrupted`] on request, status, body, or length failure;
    ///   the staging file keeps `bytes_secured` bytes.
    /// - [`TransferError::CorruptResumeState`] when even a fresh restart is rejected.
    /// - [`TransferError::Io`] when the destination cannot be created or written.
    #[instrument(skip(self, target), fields(url = %target.url(), quality = %target.quality()))]
    pub async fn transfer_to_path(
        &self,
        target: ResolvedTarget,
        target_path: &Path,
        resume: bool,
    ) -> Result<TransferOutcome, TransferError> {
        let result = self.run(target.url(), target_path, resume).await;
        self.observer.on_finish();
        result
    }

    async fn run(
        &self,
        url: &str,
        target_path: &Path,
        resume: bool,
    ) -> Result<TransferOutcome, TransferError> {
        if let Some(parent) = target_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| TransferError::io(parent, 0, e))?;
        }

        let mut state = TransferState::new(target_path.to_path_buf());
        if resume {
            state.bytes_done = tokio::fs::metadata(&state.staging_path)
                .await
                .map(|meta| meta.len())
                .unwrap_or(0);
        }
        let resumed_from = state.bytes_done;
        if resumed_from > 0 {
            info!(
                path = %state.staging_path.display(),
                bytes = resumed_from,
                "resuming from partial file"
            );
        }

        let mut restarted = false;
        let received = match self.attempt(url, &mut state).await {
            Ok(received) => received,
            Err(AttemptError::Corrupt(detail)) => {
                warn!(
                    path = %state.staging_path.display(),
                    bytes = state.bytes_done,
                    detail = %detail,
                    "partial file does not match the server; restarting from zero"
                );
                truncate(&state.staging_path).await?;
                state.bytes_done = 0;
                state.total_bytes = 0;
                restarted = true;
                match self.attempt(url, &mut state).await {
                    Ok(received) => received,
                    Err(AttemptError::Corrupt(detail)) => {
                        discard_if_empty(&state.staging_path).await;
                        return Err(TransferError::corrupt_resume(
                            &state.staging_path,
                            state.bytes_done,
                            detail,
                        ));
                    }
                    Err(AttemptError::Fatal(err)) => return Err(err),
                }
            }
            Err(AttemptError::Fatal(err)) => return Err(err),
        };

        tokio::fs::rename(&state.staging_path, &state.target_path)
            .await
            .map_err(|e| TransferError::io(&state.target_path, state.bytes_done, e))?;

        let elapsed = state.started_at.elapsed();
        info!(
            path = %state.target_path.display(),
            bytes = state.bytes_done,
            resumed_from = if restarted { 0 } else { resumed_from },
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "transfer committed"
        );

        Ok(TransferOutcome {
            path: state.target_path,
            bytes_written: state.bytes_done,
            bytes_transferred: received,
            resumed_from: if restarted { 0 } else { resumed_from },
            elapsed,
            restarted,
        })
    }

    /// One request/stream cycle. Returns bytes received on success, leaving a fully
    /// written and synced staging file.
    async fn attempt(&self, url: &str, state: &mut TransferState) -> Result<u64, AttemptError> {
        let range_start = (state.bytes_done > 0).then_some(state.bytes_done);
        debug!(range_start = ?range_start, "sending transfer request");

        let response = match self.session.start_transfer(url, range_start).await {
            Ok(response) => response,
            Err(err) => return Err(self.fail(url, state, err).await),
        };

        let status = response.status().as_u16();
        match (status, range_start) {
            (416, Some(start)) => {
                return Err(AttemptError::Corrupt(format!(
                    "server rejected resume at byte {start} (HTTP 416)"
                )));
            }
            (206, _) => {
                state.total_bytes = check_partial_response(&response, state.bytes_done)
                    .map_err(AttemptError::Corrupt)?;
            }
            (200, _) => {
                if state.bytes_done > 0 {
                    info!(
                        bytes = state.bytes_done,
                        "server ignored the range request; restarting from zero"
                    );
                    state.bytes_done = 0;
                }
                state.total_bytes = declared_length(&response).unwrap_or(0);
            }
            _ => {
                let err = SessionError::http_status(url, status);
                return Err(self.fail(url, state, err).await);
            }
        }

        self.observer.on_start(state.bytes_done, state.total_bytes);
        self.stream(url, response, state).await
    }

    async fn stream(
        &self,
        url: &str,
        response: Response,
        state: &mut TransferState,
    ) -> Result<u64, AttemptError> {
        let file = open_staging(&state.staging_path, state.bytes_done > 0)
            .await
            .map_err(|e| AttemptError::Fatal(TransferError::io(&state.staging_path, state.bytes_done, e)))?;
        let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);
        let mut body = response.bytes_stream();
        let mut received: u64 = 0;

        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => {
                    let err = SessionError::from_reqwest(url, err);
                    settle_partial(&mut writer, state).await;
                    return Err(self.fail(url, state, err).await);
                }
            };

            for piece in chunk.chunks(CHUNK_SIZE) {
                if let Err(e) = writer.write_all(piece).await {
                    settle_partial(&mut writer, state).await;
                    discard_if_empty(&state.staging_path).await;
                    return Err(AttemptError::Fatal(TransferError::io(
                        &state.staging_path,
                        state.bytes_done,
                        e,
                    )));
                }
                let len = piece.len() as u64;
                state.bytes_done += len;
                received += len;
                self.observer.on_progress(&TransferProgress::new(
                    state.bytes_done,
                    state.total_bytes,
                    received,
                    state.started_at.elapsed(),
                ));
            }
        }

        if let Err(e) = writer.flush().await {
            settle_partial(&mut writer, state).await;
            return Err(AttemptError::Fatal(TransferError::io(
                &state.staging_path,
                state.bytes_done,
                e,
            )));
        }
        let mut file = writer.into_inner();
        if let Err(e) = finish_file(&mut file).await {
            return Err(AttemptError::Fatal(TransferError::io(
                &state.staging_path,
                state.bytes_done,
                e,
            )));
        }
        drop(file);

        if state.total_bytes > 0 && state.bytes_done != state.total_bytes {
            warn!(
                expected = state.total_bytes,
                received = state.bytes_done,
                "body length does not match the declared size"
            );
            return Err(AttemptError::Fatal(TransferError::length_mismatch(
                url,
                &state.staging_path,
                state.total_bytes,
                state.bytes_done,
            )));
        }

        Ok(received)
    }

    async fn fail(&self, url: &str, state: &TransferState, err: SessionError) -> AttemptError {
        warn!(error = %err, bytes = state.bytes_done, "transfer interrupted");
        discard_if_empty(&state.staging_path).await;
        AttemptError::Fatal(TransferError::interrupted(
            url,
            &state.staging_path,
            state.bytes_done,
            err,
        ))
    }
}

async fn open_staging(path: &Path, append: bool) -> std::io::Result<File> {
    if append {
        OpenOptions::new().append(true).open(path).await
    } else {
        File::create(path).await
    }
}

/// Pushes buffered bytes to the staging file after a failure and re-reads its length,
/// so `bytes_done` reports what a later resume will actually find.
async fn settle_partial(writer: &mut BufWriter<File>, state: &mut TransferState) {
    if let Err(err) = writer.flush().await {
        warn!(path = %state.staging_path.display(), error = %err, "could not flush buffered bytes");
    }
    if let Ok(meta) = tokio::fs::metadata(&state.staging_path).await {
        state.bytes_done = meta.len();
    }
}

async fn finish_file(file: &mut File) -> std::io::Result<()> {
    file.flush().await?;
    file.sync_all().await
}

async fn truncate(path: &Path) -> Result<(), TransferError> {
    File::create(path)
        .await
        .map(drop)
        .map_err(|e| TransferError::io(path, 0, e))
}

async fn discard_if_empty(path: &Path) {
    if let Ok(meta) = tokio::fs::metadata(path).await
        && meta.len() == 0
    {
        debug!(path = %path.display(), "removing empty staging file");
        let _ = tokio::fs::remove_file(path).await;
    }
}

fn declared_length(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}

/// Validates a 206 against the bytes already on disk and returns the total size.
fn check_partial_response(response: &Response, bytes_done: u64) -> Result<u64, String> {
    let content_range = response
        .headers()
        .get(CONTENT_RANGE)
        .and_then(|v| v.to_str().ok());

    let Some(raw) = content_range else {
        // Without Content-Range the offset cannot be verified; trust the length.
        return Ok(declared_length(response).map_or(0, |len| bytes_done.saturating_add(len)));
    };

    let (start, _end, total) =
        parse_content_range(raw).ok_or_else(|| format!("unparseable Content-Range '{raw}'"))?;

    if start != bytes_done {
        return Err(format!(
            "Content-Range starts at {start} but the partial file holds {bytes_done} bytes"
        ));
    }
    match total {
        Some(total) if bytes_done > 0 && total <= bytes_done => Err(format!(
            "Content-Range total {total} is not beyond the {bytes_done} bytes already held"
        )),
        Some(total) => Ok(total),
        None => Ok(declared_length(response).map_or(0, |len| bytes_done.saturating_add(len))),
    }
}

/// Parses `bytes <start>-<end>/<total|*>`.
fn parse_content_range(value: &str) -> Option<(u64, u64, Option<u64>)> {
    let rest = value.trim().strip_prefix("bytes")?.trim_start();
    let (range, total) = rest.split_once('/')?;
    let (start, end) = range.split_once('-')?;
    let start = start.trim().parse().ok()?;
    let end = end.trim().parse().ok()?;
    let total = match total.trim() {
        "*" => None,
        other => Some(other.parse().ok()?),
    };
    Some((start, end, total))
}
