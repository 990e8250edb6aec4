// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Cancellation signal passed to every storage operation.
//!
//! A [`CancellationSource`] owns the signal; any number of cheap
//! [`CancellationToken`] clones observe it. Tokens are built on a
//! `tokio::sync::watch` channel so that waiting for cancellation is a real
//! wakeup, not a poll.
//!
//! # Example
//!
//! ```
//! use tandem_store::cancel::CancellationSource;
//!
//! let source = CancellationSource::new();
//! let token = source.token();
//! assert!(!token.is_cancelled());
//!
//! source.cancel();
//! assert!(token.is_cancelled());
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::storage::traits::{StorageError, StoreResult};

/// Controller side of a cancellation signal.
#[derive(Debug, Clone)]
pub struct CancellationSource {
    tx: Arc<watch::Sender<bool>>,
}

impl CancellationSource {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Get a token observing this source.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        CancellationToken {
            rx: self.tx.subscribe(),
        }
    }

    /// Fire the signal. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Fire the signal once `delay` has elapsed.
    ///
    /// Must be called from within a tokio runtime.
    pub fn cancel_after(&self, delay: Duration) -> tokio::task::JoinHandle<()> {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tx.send_replace(true);
        })
    }
}

impl Default for CancellationSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer side of a cancellation signal.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    rx: watch::Receiver<bool>,
}

impl CancellationToken {
    /// A token that never fires.
    #[must_use]
    pub fn none() -> Self {
        // Sender dropped immediately: the value stays `false` forever.
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    /// A token that fires after `delay`.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn after(delay: Duration) -> Self {
        let source = CancellationSource::new();
        let token = source.token();
        source.cancel_after(delay);
        token
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the signal fires. Never resolves for [`CancellationToken::none`].
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // Source gone without firing.
                std::future::pending::<()>().await;
            }
        }
    }

    /// Run `operation` unless the signal fires first, in which case the
    /// operation is dropped and `StorageError::Cancelled` is returned.
    pub async fn guard<T, F>(&self, operation: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        if self.is_cancelled() {
            return Err(StorageError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(StorageError::Cancelled),
            result = operation => result,
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::none()
    }
}
