//! The broadcast loop.
//!
//! Pulls records from the input source and runs one send pass per record.
//! A record that reached no client is kept and retried on the next pass
//! that has clients, so a line read while nobody is connected goes to the
//! first client that arrives.

use futures::{Stream, StreamExt};
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use ntty_core::{CodecError, RecordCodec, TextRecord};

use crate::error::RelayResult;
use crate::registry::RegistryHandle;

/// Why the broadcast loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The input source reached end of stream.
    InputExhausted,

    /// The loop was cancelled.
    Cancelled,
}

/// Totals for one run of the broadcast loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastSummary {
    /// Records delivered to at least one client.
    pub records_delivered: u64,

    /// Passes that reached no client, leaving their record pending.
    pub records_retried: u64,

    /// Clients removed after a failed write.
    pub clients_pruned: u64,

    pub stop_reason: StopReason,
}

impl BroadcastSummary {
    fn new() -> Self {
        Self {
            records_delivered: 0,
            records_retried: 0,
            clients_pruned: 0,
            stop_reason: StopReason::InputExhausted,
        }
    }

    fn stopped(mut self, reason: StopReason) -> Self {
        self.stop_reason = reason;
        self
    }
}

/// The only consumer of input records.
pub struct BroadcastLoop<S> {
    /// Source of records, in input order
    source: S,

    /// Handle to the client registry
    registry: RegistryHandle,

    /// Cancellation token for shutdown
    cancel_token: CancellationToken,
}

impl<R> BroadcastLoop<FramedRead<R, RecordCodec>>
where
    R: AsyncRead + Unpin,
{
    /// Creates a loop that splits `reader` into newline-terminated records.
    ///
    /// With `max_line_bytes` set, longer lines are skipped and the loop
    /// carries on with the next one.
    pub fn from_reader(
        reader: R,
        max_line_bytes: Option<usize>,
        registry: RegistryHandle,
        cancel_token: CancellationToken,
    ) -> Self {
        let codec = match max_line_bytes {
            Some(max) => RecordCodec::with_max_length(max),
            None => RecordCodec::new(),
        };
        Self::new(FramedRead::new(reader, codec), registry, cancel_token)
    }
}

impl<S> BroadcastLoop<S>
where
    S: Stream<Item = Result<TextRecord, CodecError>> + Unpin,
{
    /// Creates a loop over an arbitrary record stream.
    pub fn new(source: S, registry: RegistryHandle, cancel_token: CancellationToken) -> Self {
        Self {
            source,
            registry,
            cancel_token,
        }
    }

    /// Runs until the input is exhausted or the loop is cancelled.
    ///
    /// Clients still connected when the input ends are left registered.
    ///
    /// # Errors
    ///
    /// - `RelayError::Input` if reading the input fails
    /// - `RelayError::Registry` if the registry actor stopped
    pub async fn run(self) -> RelayResult<BroadcastSummary> {
        let BroadcastLoop {
            mut source,
            registry,
            cancel_token,
        } = self;

        let mut summary = BroadcastSummary::new();
        let mut pending: Option<TextRecord> = None;

        loop {
            let record = match pending.take() {
                Some(record) => record,
                None => {
                    let next = tokio::select! {
                        _ = cancel_token.cancelled() => {
                            return Ok(summary.stopped(StopReason::Cancelled));
                        }
                        next = source.next() => next,
                    };

                    match next {
                        Some(record) => record?,
                        None => {
                            info!("Input exhausted");
                            return Ok(summary.stopped(StopReason::InputExhausted));
                        }
                    }
                }
            };

            tokio::select! {
                _ = cancel_token.cancelled() => {
                    debug!(bytes = record.len(), "Cancelled with an undelivered record");
                    return Ok(summary.stopped(StopReason::Cancelled));
                }
                ready = registry.wait_until_non_empty() => ready?,
            }

            let outcome = registry.broadcast(record.clone()).await?;
            summary.clients_pruned += outcome.pruned.len() as u64;

            if outcome.is_consumed() {
                summary.records_delivered += 1;
            } else {
                debug!(bytes = record.len(), "No client received record, keeping it");
                summary.records_retried += 1;
                pending = Some(record);
            }
        }
    }
}
