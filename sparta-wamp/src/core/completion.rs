//! Single-assignment completion of asynchronous requests.
//!
//! Every request hands a [`PendingResult`] to the caller and keeps the matching [`Completion`] in
//! a pending table until the response arrives. A completion can only be resolved once, since
//! resolving consumes it. Dropping the [`PendingResult`] cancels the request locally: the wire
//! message is not retracted, and the eventual result is discarded.

use std::{
    future::Future,
    pin::Pin,
    task,
};

use log::trace;
use tokio::sync::oneshot::{
    self,
    error::TryRecvError,
};

use crate::core::error::WampError;

/// Creates a linked [`Completion`] and [`PendingResult`].
pub fn completion<T>() -> (Completion<T>, PendingResult<T>) {
    let (tx, rx) = oneshot::channel();
    (Completion { tx }, PendingResult { rx })
}

/// The resolving side of a request.
#[derive(Debug)]
pub struct Completion<T> {
    tx: oneshot::Sender<Result<T, WampError>>,
}

impl<T> Completion<T> {
    /// Resolves the request.
    ///
    /// If the caller canceled the request, the result is discarded.
    pub fn complete(self, result: Result<T, WampError>) {
        if self.tx.send(result).is_err() {
            trace!("Discarding result of canceled request");
        }
    }

    /// Checks if the caller has canceled the request.
    pub fn canceled(&self) -> bool {
        self.tx.is_closed()
    }
}

/// The caller's handle to a pending request.
///
/// Resolves to the request's result. Dropping the handle, or calling [`Self::cancel`], cancels
/// the request.
#[derive(Debug)]
#[must_use = "dropping a pending result cancels the request"]
pub struct PendingResult<T> {
    rx: oneshot::Receiver<Result<T, WampError>>,
}

impl<T> PendingResult<T> {
    /// A pending result that is already resolved.
    pub fn ready(result: Result<T, WampError>) -> Self {
        let (completion, pending) = completion();
        completion.complete(result);
        pending
    }

    /// Cancels the request.
    ///
    /// The result will never be observed, even if it arrives later.
    pub fn cancel(self) {}

    /// Takes the result if the request has been resolved.
    ///
    /// Useful for driving a [`crate::connection::Connection`] without an async runtime. The
    /// result can only be taken once.
    pub fn try_result(&mut self) -> Option<Result<T, WampError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(WampError::ConnectionClosed)),
        }
    }
}

impl<T> Future for PendingResult<T> {
    type Output = Result<T, WampError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut task::Context<'_>) -> task::Poll<Self::Output> {
        match futures_util::ready!(Pin::new(&mut self.rx).poll(cx)) {
            Ok(result) => task::Poll::Ready(result),
            // The completion was dropped without resolving, which only happens when the owning
            // connection is gone.
            Err(_) => task::Poll::Ready(Err(WampError::ConnectionClosed)),
        }
    }
}
