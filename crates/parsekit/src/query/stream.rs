//! Streaming every result of a query.
//!
//! The stream walks the result set in batches ordered by `objectId`, asking
//! each time for ids greater than the last one seen. It is lazy: a batch is
//! requested only when the consumer has taken every object of the previous
//! one.
//!
//! # Example
//!
//! ```no_run
//! use futures_util::StreamExt;
//! use parsekit::{Client, ParseApi, Query, User};
//!
//! # async fn example(client: Client) -> Result<(), parsekit::Error> {
//! let mut users = client.stream(&Query::<User>::new())?;
//! let handle = users.handle();
//!
//! while let Some(user) = users.next().await {
//!     let user = user?;
//!     if user.username.as_deref() == Some("stop-here") {
//!         handle.cancel();
//!     }
//! }
//! handle.done().await?;
//! # Ok(())
//! # }
//! ```

use futures_util::Stream;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use super::{Query, decode_row};
use crate::error::{DecodeError, Error};
use crate::rest::Envelope;
use crate::schema::ParseObject;

#[derive(Debug, Clone)]
enum StreamState {
    Open,
    Exhausted,
    Failed(Error),
    Cancelled(Option<Error>),
}

impl StreamState {
    fn is_open(&self) -> bool {
        matches!(self, StreamState::Open)
    }

    fn error(&self) -> Option<Error> {
        match self {
            StreamState::Failed(err) | StreamState::Cancelled(Some(err)) => Some(err.clone()),
            _ => None,
        }
    }
}

/// Observes and controls an [`ObjectStream`] from anywhere.
///
/// Cloning is cheap; all clones share the same state.
#[derive(Clone)]
pub struct StreamHandle {
    state: Arc<watch::Sender<StreamState>>,
}

impl StreamHandle {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(StreamState::Open);
        Self {
            state: Arc::new(tx),
        }
    }

    /// Stop the stream. Closing an already closed stream does nothing.
    pub fn cancel(&self) {
        self.close(StreamState::Cancelled(None));
    }

    /// Stop the stream and record `err` as its terminal error.
    pub fn cancel_with_error(&self, err: Error) {
        self.close(StreamState::Cancelled(Some(err)));
    }

    /// Returns true until the stream is exhausted, fails or is cancelled.
    pub fn is_open(&self) -> bool {
        self.state.borrow().is_open()
    }

    /// The terminal error, if the stream failed or was cancelled with one.
    pub fn error(&self) -> Option<Error> {
        self.state.borrow().error()
    }

    /// Wait for the stream to close.
    ///
    /// Resolves with the terminal error, if any. Graceful exhaustion and
    /// plain cancellation resolve to `Ok(())`.
    pub async fn done(&self) -> Result<(), Error> {
        let mut rx = self.state.subscribe();
        let state = match rx.wait_for(|state| !state.is_open()).await {
            Ok(state) => state.clone(),
            // The sender lives as long as this handle.
            Err(_) => self.state.borrow().clone(),
        };
        match state.error() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn close(&self, next: StreamState) -> bool {
        self.state.send_if_modified(|state| {
            if state.is_open() {
                *state = next;
                true
            } else {
                false
            }
        })
    }

    fn finish(&self) {
        if self.close(StreamState::Exhausted) {
            debug!("stream exhausted");
        }
    }

    fn fail(&self, err: Error) {
        if self.close(StreamState::Failed(err.clone())) {
            warn!(error = %err, "stream failed");
        }
    }
}

impl fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamHandle")
            .field("state", &*self.state.borrow())
            .finish()
    }
}

/// A lazy stream over every object a query matches.
///
/// Dropping the stream while it is open cancels it.
pub struct ObjectStream<T> {
    inner: Pin<Box<dyn Stream<Item = Result<T, Error>> + Send>>,
    handle: StreamHandle,
}

impl<T> ObjectStream<T> {
    /// A handle for cancelling or awaiting the stream.
    pub fn handle(&self) -> StreamHandle {
        self.handle.clone()
    }

    /// Stop the stream.
    pub fn cancel(&self) {
        self.handle.cancel();
    }
}

impl<T: ParseObject> ObjectStream<T> {
    /// Start streaming `query`, fetching each page through `fetch`.
    ///
    /// `fetch` receives the page's URL query parameters and returns the raw
    /// response body.
    pub(crate) fn new<F, Fut>(query: &Query<T>, fetch: F) -> Self
    where
        F: Fn(Vec<(String, String)>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, Error>> + Send,
    {
        let handle = StreamHandle::new();
        let state = handle.clone();
        let first_page = query.for_stream();
        let batch_size = query.effective_batch_size() as usize;
        let class_name = query.class_name().to_string();

        let stream = async_stream::stream! {
            let mut cursor: Option<String> = None;

            while state.is_open() {
                let page = match cursor {
                    Some(ref last) => first_page.clone().greater_than("objectId", last),
                    None => first_page.clone(),
                };

                let params = match page.params() {
                    Ok(params) => params,
                    Err(err) => {
                        state.fail(err.clone());
                        yield Err(err);
                        break;
                    }
                };

                trace!(cursor = ?cursor, "fetching batch");
                let rows = match fetch(params)
                    .await
                    .and_then(Envelope::parse)
                    .and_then(Envelope::into_results)
                {
                    Ok(rows) => rows,
                    Err(Error::NoRows) => {
                        state.finish();
                        break;
                    }
                    Err(err) => {
                        state.fail(err.clone());
                        yield Err(err);
                        break;
                    }
                };

                let full_batch = rows.len() >= batch_size;
                debug!(count = rows.len(), full_batch, "received batch");

                for row in rows {
                    if !state.is_open() {
                        break;
                    }
                    match decode_row::<T>(row, &class_name) {
                        Ok(object) => {
                            cursor = object.object_id().map(str::to_string);
                            yield Ok(object);
                        }
                        Err(err) => {
                            state.fail(err.clone());
                            yield Err(err);
                            break;
                        }
                    }
                }

                if !state.is_open() {
                    break;
                }

                if !full_batch {
                    state.finish();
                    break;
                }

                if cursor.is_none() {
                    let err: Error = DecodeError::Malformed {
                        kind: "Object".to_string(),
                        reason: "result without objectId".to_string(),
                    }
                    .into();
                    state.fail(err.clone());
                    yield Err(err);
                    break;
                }
            }
        };

        Self {
            inner: Box::pin(stream),
            handle,
        }
    }
}

impl<T> Stream for ObjectStream<T> {
    type Item = Result<T, Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl<T> Drop for ObjectStream<T> {
    fn drop(&mut self) {
        self.handle.cancel();
    }
}

impl<T> fmt::Debug for ObjectStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStream")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}
