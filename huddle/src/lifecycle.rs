//! Screen lifecycle plumbing: focus scopes, the hardware back registry and
//! loading indicators.

use huddle_interface::interface::Navigator;
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, Weak,
    atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
};
use tracing::debug;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Decides whether an async continuation may still touch a screen's state.
///
/// Every focus pass bumps the epoch, so results of an older pass are dropped
/// once a newer one starts or the screen is unmounted.
#[derive(Debug, Default)]
pub struct FocusScope {
    mounted: AtomicBool,
    epoch: AtomicU64,
}

impl FocusScope {
    pub fn mount(&self) {
        self.mounted.store(true, Ordering::SeqCst);
    }
    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::SeqCst);
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }
    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }
    /// Starts a focus pass.
    pub fn focus(&self) -> FocusTicket<'_> {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        FocusTicket { scope: self, epoch }
    }
}

pub struct FocusTicket<'a> {
    scope: &'a FocusScope,
    epoch: u64,
}
impl FocusTicket<'_> {
    pub fn is_current(&self) -> bool {
        self.scope.is_mounted() && self.scope.epoch.load(Ordering::SeqCst) == self.epoch
    }
}

type Listener = Arc<dyn Fn() -> bool + Send + Sync>;
type Listeners = Mutex<Vec<(u64, Listener)>>;

/// Registry of hardware back listeners. The most recently added listener
/// gets the event first.
#[derive(Clone, Default)]
pub struct BackHandler {
    listeners: Arc<Listeners>,
    next_id: Arc<AtomicU64>,
}

impl BackHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The listener stays registered as long as the returned subscription lives.
    pub fn add_listener(
        &self,
        listener: impl Fn() -> bool + Send + Sync + 'static,
    ) -> BackSubscription {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        lock(&*self.listeners).push((id, Arc::new(listener)));
        BackSubscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Dispatches a back press. Returns whether a listener handled it.
    pub fn press(&self) -> bool {
        // Listeners may unsubscribe while running
        let listeners = lock(&*self.listeners)
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect::<Vec<_>>();
        listeners.iter().rev().any(|listener| listener())
    }

    pub fn listener_count(&self) -> usize {
        lock(&*self.listeners).len()
    }
}

#[must_use = "the listener is removed when the subscription is dropped"]
pub struct BackSubscription {
    id: u64,
    listeners: Weak<Listeners>,
}
impl Drop for BackSubscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            lock(&*listeners).retain(|(id, _)| *id != self.id);
            debug!("Back listener {} removed", self.id);
        }
    }
}

/// Mount state of one screen: its focus scope and its back listener.
#[derive(Default)]
pub struct ScreenLifecycle {
    scope: FocusScope,
    back: Mutex<Option<BackSubscription>>,
}

impl ScreenLifecycle {
    pub fn mount(&self, back_handler: &BackHandler, navigator: Arc<dyn Navigator>) {
        self.scope.mount();
        let subscription = back_handler.add_listener(move || {
            navigator.go_back();
            true
        });
        *lock(&self.back) = Some(subscription);
    }

    pub fn unmount(&self) {
        self.scope.unmount();
        lock(&self.back).take();
    }

    pub fn scope(&self) -> &FocusScope {
        &self.scope
    }
}

/// Loading indicator shared by overlapping operations.
#[derive(Debug, Default)]
pub struct Loading {
    active: AtomicUsize,
}

impl Loading {
    pub fn is_loading(&self) -> bool {
        self.active.load(Ordering::SeqCst) > 0
    }
    /// Raises the indicator until the guard is dropped.
    pub fn begin(&self) -> LoadingGuard<'_> {
        self.active.fetch_add(1, Ordering::SeqCst);
        LoadingGuard { loading: self }
    }
}

pub struct LoadingGuard<'a> {
    loading: &'a Loading,
}
impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.loading.active.fetch_sub(1, Ordering::SeqCst);
    }
}
