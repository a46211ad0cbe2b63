//! Save interception: turns the host's raw "about to save" notification into
//! a before-save event carrying the resolved document.

use std::fmt;

use crate::error::{Error, Result};
use crate::host::{DocCookie, Document, DocumentTable, SaveNotifier, SubscriptionHandle};

/// Lifecycle of the subscription to the host's save notifications.
///
/// `Unregistered` → `Registered` → `Released`. `Released` is the terminal
/// unregistered state: registering again is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Unregistered,
    Registered(SubscriptionHandle),
    Released,
}

type BeforeSaveHandler<D> = Box<dyn FnMut(&mut D)>;

/// Owns the host and the single save subscription the core holds on it.
///
/// Dropping the interceptor releases the subscription, so the host is never
/// left calling into a torn-down core.
pub struct SaveInterceptor<H>
where
    H: DocumentTable + SaveNotifier,
{
    host: H,
    state: SubscriptionState,
    handlers: Vec<BeforeSaveHandler<H::Document>>,
}

impl<H> SaveInterceptor<H>
where
    H: DocumentTable + SaveNotifier,
{
    #[must_use]
    pub fn new(host: H) -> Self {
        Self {
            host,
            state: SubscriptionState::Unregistered,
            handlers: Vec::new(),
        }
    }

    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    #[must_use]
    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    #[must_use]
    pub fn is_registered(&self) -> bool {
        matches!(self.state, SubscriptionState::Registered(_))
    }

    /// Add a handler for the before-save event.
    pub fn on_before_save<F>(&mut self, handler: F)
    where
        F: FnMut(&mut H::Document) + 'static,
    {
        self.handlers.push(Box::new(handler));
    }

    /// Subscribe to the host's save notifications. Allowed once.
    pub fn register(&mut self) -> Result<()> {
        match self.state {
            SubscriptionState::Registered(_) => return Err(Error::AlreadyRegistered),
            SubscriptionState::Released => return Err(Error::SubscriptionReleased),
            SubscriptionState::Unregistered => {}
        }
        let handle = self.host.advise()?;
        tracing::debug!(handle = handle.0, "registered for before-save notifications");
        self.state = SubscriptionState::Registered(handle);
        Ok(())
    }

    /// Unsubscribe. A second call is a no-op.
    ///
    /// The subscription counts as released even if the host reports an
    /// error, so the host is never asked twice.
    pub fn release(&mut self) -> Result<()> {
        let SubscriptionState::Registered(handle) = self.state else {
            return Ok(());
        };
        self.state = SubscriptionState::Released;
        tracing::debug!(handle = handle.0, "releasing before-save subscription");
        self.host.unadvise(handle)
    }

    /// Handle one raw notification from the host.
    ///
    /// Returns true if a matching open document was found and the
    /// before-save event raised. A cookie that no longer resolves to an open
    /// document (it may have been closed in between) is ignored.
    pub fn notify_before_save(&mut self, cookie: DocCookie) -> bool {
        if !self.is_registered() {
            tracing::debug!(cookie = cookie.0, "notification while not registered, ignored");
            return false;
        }
        let Some(name) = self.host.moniker(cookie) else {
            tracing::debug!(cookie = cookie.0, "document cookie did not resolve");
            return false;
        };
        let handlers = &mut self.handlers;
        let Some(document) = self.host.documents_mut().find(|d| d.full_name() == name) else {
            tracing::debug!(document = %name, "no open document matches, ignored");
            return false;
        };
        tracing::trace!(document = %name, handlers = handlers.len(), "raising before-save");
        for handler in handlers.iter_mut() {
            handler(document);
        }
        true
    }
}

impl<H> Drop for SaveInterceptor<H>
where
    H: DocumentTable + SaveNotifier,
{
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::warn!(error = %e, "failed to release before-save subscription");
        }
    }
}

impl<H> fmt::Debug for SaveInterceptor<H>
where
    H: DocumentTable + SaveNotifier + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveInterceptor")
            .field("host", &self.host)
            .field("state", &self.state)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
