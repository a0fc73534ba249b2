//! Cancellation connections
//!
//! A [`Connection`] is the handle a run consults to find out whether it has
//! been canceled. It is cheap to clone and may be shared by several runs at
//! once. Cancellation is cooperative: canceling only flips a flag and runs
//! the registered cancel tokens, it never interrupts code that is already
//! executing.
//!
//! `Connection::uncancelable()` is a connection that can never be canceled.
//! Runs started with `run` use it.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Action registered on a connection, run once when it is canceled
pub type CancelToken = Box<dyn FnOnce() + Send>;

/// Counter for generating unique connection IDs.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Shared state behind a cancelable connection.
struct ConnectionState {
    id: u64,
    canceled: AtomicBool,
    /// Cancel tokens, most recent last.
    tokens: Mutex<Vec<CancelToken>>,
}

/// Cancellation handle for a run
#[derive(Clone)]
pub struct Connection {
    /// `None` is the uncancelable connection.
    state: Option<Arc<ConnectionState>>,
}

impl Connection {
    /// Create a fresh, cancelable connection
    pub fn new() -> Self {
        Self {
            state: Some(Arc::new(ConnectionState {
                id: CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed),
                canceled: AtomicBool::new(false),
                tokens: Mutex::new(Vec::new()),
            })),
        }
    }

    /// The connection that is never canceled
    pub fn uncancelable() -> Self {
        Self { state: None }
    }

    /// Unique ID, `0` for the uncancelable connection
    pub fn id(&self) -> u64 {
        self.state.as_ref().map_or(0, |s| s.id)
    }

    pub fn is_cancelable(&self) -> bool {
        self.state.is_some()
    }

    pub fn is_canceled(&self) -> bool {
        self.state
            .as_ref()
            .is_some_and(|s| s.canceled.load(Ordering::Acquire))
    }

    /// Cancel the connection
    ///
    /// Registered tokens run once, most recent first. Canceling twice, or
    /// canceling the uncancelable connection, does nothing.
    pub fn cancel(&self) {
        let Some(state) = &self.state else {
            return;
        };
        if state.canceled.swap(true, Ordering::AcqRel) {
            return;
        }

        let tokens = std::mem::take(&mut *state.tokens.lock());
        for token in tokens.into_iter().rev() {
            token();
        }
    }

    /// Register a token to run on cancellation
    ///
    /// If the connection is already canceled the token runs immediately.
    pub fn push(&self, token: CancelToken) {
        let Some(state) = &self.state else {
            return;
        };

        {
            let mut tokens = state.tokens.lock();
            if !state.canceled.load(Ordering::Acquire) {
                tokens.push(token);
                return;
            }
        }
        token();
    }

    /// Remove the most recently registered token without running it
    pub fn pop(&self) -> Option<CancelToken> {
        self.state.as_ref()?.tokens.lock().pop()
    }

    /// Whether both handles refer to the same connection
    pub fn same_as(&self, other: &Connection) -> bool {
        match (&self.state, &other.state) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Default for Connection {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            None => f.write_str("Connection(uncancelable)"),
            Some(state) => f
                .debug_struct("Connection")
                .field("id", &state.id)
                .field("canceled", &state.canceled.load(Ordering::Relaxed))
                .finish(),
        }
    }
}
