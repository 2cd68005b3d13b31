//! Online/offline detector over a `tokio::sync::watch` channel

use std::future::Future;

use amfe_domain::Result;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Current reachability of the backend
///
/// Every waiter holds its own receiver; dropping or cancelling it detaches
/// the waiter, so no listener outlives the code that asked for it.
#[derive(Debug)]
pub struct OnlineDetector {
    sender: watch::Sender<bool>,
}

impl Default for OnlineDetector {
    fn default() -> Self {
        Self::new(true)
    }
}

impl OnlineDetector {
    /// Create a detector with the given initial state
    pub fn new(online: bool) -> Self {
        let (sender, _receiver) = watch::channel(online);
        Self { sender }
    }

    /// Whether the backend is currently considered reachable
    pub fn is_online(&self) -> bool {
        *self.sender.borrow()
    }

    /// Record a connectivity signal; only real transitions notify subscribers
    pub fn set_online(&self, online: bool) {
        let changed = self.sender.send_if_modified(|current| {
            if *current == online {
                return false;
            }
            *current = online;
            true
        });
        if changed {
            info!(online, "Connectivity changed");
        }
    }

    /// Subscribe to connectivity transitions
    pub fn subscribe(&self) -> OnlineSubscription {
        OnlineSubscription { receiver: self.sender.subscribe() }
    }

    /// Resolve immediately if online, otherwise on the next transition to
    /// online
    ///
    /// Dropping the returned future detaches the waiter.
    pub fn wait_for_online(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut subscription = self.subscribe();
        async move {
            subscription.wait_for_online().await;
        }
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Run `callback` once connectivity is available
    ///
    /// Runs on a spawned task either way: immediately when online, otherwise
    /// after the next transition to online. Failures are logged, not
    /// returned. Abort the handle to give up waiting.
    pub fn sync_when_online<F, Fut>(&self, callback: F) -> JoinHandle<()>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let mut subscription = self.subscribe();
        tokio::spawn(async move {
            if !subscription.wait_for_online().await {
                debug!("Connectivity source dropped before coming online");
                return;
            }
            if let Err(err) = callback().await {
                warn!(error = %err, "Failed to sync when coming online");
            }
        })
    }
}

/// Handle on connectivity transitions
#[derive(Debug)]
pub struct OnlineSubscription {
    receiver: watch::Receiver<bool>,
}

impl OnlineSubscription {
    /// Wait for the next transition and return the new state
    ///
    /// Returns `None` once the detector has been dropped.
    pub async fn changed(&mut self) -> Option<bool> {
        self.receiver.changed().await.ok()?;
        Some(*self.receiver.borrow_and_update())
    }

    /// Resolve once the state is online; `false` if the detector went away
    pub async fn wait_for_online(&mut self) -> bool {
        self.receiver.wait_for(|online| *online).await.is_ok()
    }

    /// State as last observed
    pub fn is_online(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Stop listening
    pub fn cancel(self) {
        drop(self);
    }
}
