use crate::balance::extract_balance;
use crate::ports::{BalanceRefresh, BalanceSource};
use crate::session::SessionStore;
use serde_json::Value;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

/// Callback invoked with `(new_balance, old_balance)` on every change.
pub type CreditsListener = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Handle for deregistering a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Uninitialized,
    Initializing,
    Ready,
}

struct Inner {
    phase: Phase,
    current: u64,
    listeners: Vec<(ListenerId, CreditsListener)>,
    next_listener_id: u64,
}

/// Single source of truth for the user's credit balance.
///
/// Widgets that display credits register listeners here instead of
/// fetching on their own: one authoritative fetch feeds them all, and
/// optimistic updates keep them responsive between refreshes. Listeners
/// are notified outside the state lock from a snapshot, so a callback may
/// re-enter the synchronizer freely.
pub struct CreditsSynchronizer {
    inner: Mutex<Inner>,
    source: Arc<dyn BalanceSource>,
    session: SessionStore,
}

impl CreditsSynchronizer {
    pub fn new(source: Arc<dyn BalanceSource>, session: SessionStore) -> Self {
        Self {
            inner: Mutex::new(Inner {
                phase: Phase::Uninitialized,
                current: 0,
                listeners: Vec::new(),
                next_listener_id: 0,
            }),
            source,
            session,
        }
    }

    /// One-time startup sync. Calls made while a fetch is outstanding, or
    /// after one has completed, are no-ops; a failed fetch rearms so the
    /// caller can try again.
    pub async fn initialize(&self) -> shared::Result<()> {
        {
            let mut inner = self.inner.lock().unwrap();
            match inner.phase {
                Phase::Uninitialized => inner.phase = Phase::Initializing,
                Phase::Initializing | Phase::Ready => return Ok(()),
            }
        }

        match self.fetch_and_apply().await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.inner.lock().unwrap().phase = Phase::Uninitialized;
                Err(e)
            }
        }
    }

    /// Authoritative re-sync, usable any time.
    pub async fn refresh(&self) -> shared::Result<()> {
        self.fetch_and_apply().await
    }

    async fn fetch_and_apply(&self) -> shared::Result<()> {
        let balance = match self.source.fetch_balance().await? {
            BalanceRefresh::Balance(n) => n,
            BalanceRefresh::Unauthorized => {
                info!("Stored token was rejected, clearing session");
                if let Err(e) = self.session.clear().await {
                    warn!("Failed to clear session: {}", e);
                }
                0
            }
            BalanceRefresh::NoSession => 0,
        };

        self.inner.lock().unwrap().phase = Phase::Ready;
        self.update_credits(balance).await;
        Ok(())
    }

    /// Set the balance and notify every listener with `(new, old)`, then
    /// persist the value into the stored user record, best-effort.
    pub async fn update_credits(&self, new_balance: u64) {
        self.apply_change(|_| Some(new_balance)).await;
    }

    /// Optimistic local deduction; the next refresh is authoritative.
    /// Amounts of zero or beyond the current balance are ignored.
    pub async fn deduct_credits(&self, amount: u64) {
        self.apply_change(|current| {
            if amount == 0 || amount > current {
                warn!(
                    "Ignoring deduction of {} against balance {}",
                    amount, current
                );
                return None;
            }
            Some(current - amount)
        })
        .await;
    }

    /// Optimistic local top-up; zero amounts are ignored.
    pub async fn add_credits(&self, amount: u64) {
        self.apply_change(|current| {
            if amount == 0 {
                return None;
            }
            Some(current.saturating_add(amount))
        })
        .await;
    }

    /// Feed any API response body through. Bodies that carry a balance
    /// (top-level `credits_remaining`, or `user.credits`) update it; all
    /// others are ignored.
    pub async fn handle_api_response(&self, body: &Value) {
        if let Some(balance) = extract_balance(body) {
            self.update_credits(balance).await;
        }
    }

    /// Register a listener. When the balance is already known it fires
    /// immediately with `(current, current)` so late subscribers render
    /// without waiting for the next change.
    pub fn add_listener(&self, listener: impl Fn(u64, u64) + Send + Sync + 'static) -> ListenerId {
        let listener: CreditsListener = Arc::new(listener);

        let (id, immediate) = {
            let mut inner = self.inner.lock().unwrap();
            let id = ListenerId(inner.next_listener_id);
            inner.next_listener_id += 1;
            inner.listeners.push((id, listener.clone()));

            let immediate = (inner.phase == Phase::Ready).then_some(inner.current);
            (id, immediate)
        };

        if let Some(current) = immediate {
            Self::notify(&[(id, listener)], current, current);
        }

        id
    }

    pub fn remove_listener(&self, id: ListenerId) {
        let mut inner = self.inner.lock().unwrap();
        inner.listeners.retain(|(listener_id, _)| *listener_id != id);
    }

    pub fn current_credits(&self) -> u64 {
        self.inner.lock().unwrap().current
    }

    pub fn is_ready(&self) -> bool {
        self.inner.lock().unwrap().phase == Phase::Ready
    }

    /// Forget everything: balance, listeners, initialization state. Used
    /// on logout.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.phase = Phase::Uninitialized;
        inner.current = 0;
        inner.listeners.clear();
    }

    /// Validate and apply a balance change in one critical section, then
    /// notify and persist outside it.
    async fn apply_change(&self, change: impl FnOnce(u64) -> Option<u64>) {
        let applied = {
            let mut inner = self.inner.lock().unwrap();
            match change(inner.current) {
                Some(new_balance) => {
                    let old = inner.current;
                    inner.current = new_balance;
                    Some((new_balance, old, inner.listeners.clone()))
                }
                None => None,
            }
        };

        let Some((new_balance, old, snapshot)) = applied else {
            return;
        };

        info!("Credits updated: {} -> {}", old, new_balance);
        Self::notify(&snapshot, new_balance, old);

        if let Err(e) = self.session.update_credits(new_balance).await {
            warn!("Failed to persist credits to session store: {}", e);
        }
    }

    /// A panicking listener is contained; the rest still run.
    fn notify(listeners: &[(ListenerId, CreditsListener)], new_balance: u64, old_balance: u64) {
        for (id, listener) in listeners {
            let outcome = catch_unwind(AssertUnwindSafe(|| listener(new_balance, old_balance)));
            if outcome.is_err() {
                error!("Credits listener {:?} panicked, skipping it", id);
            }
        }
    }
}
