use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

/// Cooperative cancellation flag shared between the owner of a load and the load itself.
///
/// Clones observe the same flag. Cancellation is one-way.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark every clone as cancelled.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether [`CancelToken::cancel`] has been called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Cancels its token when dropped, unless [`CancelOnDrop::disarm`] was called first.
///
/// Tie one to work that may be abandoned mid-way (a dropped future, an unused job): whoever
/// watches the token then sees the work as dead instead of waiting on it forever.
#[derive(Debug)]
pub struct CancelOnDrop {
    token: Option<CancelToken>,
}

impl CancelOnDrop {
    /// Guard `token`.
    pub fn new(token: CancelToken) -> Self {
        Self { token: Some(token) }
    }

    /// The work finished; leave the token as it is.
    pub fn disarm(mut self) {
        self.token = None;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
    }
}

/// Shared "something is loading" indicator.
///
/// Each batch holds a [`LoadingGuard`]; the flag reads `true` while at least one guard is alive,
/// so it clears on every exit path, including early drops of a cancelled future.
#[derive(Clone, Debug, Default)]
pub struct LoadingFlag {
    active: Arc<AtomicUsize>,
}

impl LoadingFlag {
    /// Flag with no active batches.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any batch is in flight.
    pub fn is_loading(&self) -> bool {
        self.active.load(Ordering::Acquire) > 0
    }

    /// Register an in-flight batch until the guard is dropped.
    pub fn begin(&self) -> LoadingGuard {
        self.active.fetch_add(1, Ordering::AcqRel);
        LoadingGuard {
            active: Arc::clone(&self.active),
        }
    }
}

/// RAII registration returned by [`LoadingFlag::begin`].
#[derive(Debug)]
pub struct LoadingGuard {
    active: Arc<AtomicUsize>,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
    }
}
