use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use event_listener::Event;
use tracing::trace;

const DEFAULT_EVENT_ORDERING: Ordering = Ordering::SeqCst;

/// cancellation flag that stays set once raised
#[derive(Debug)]
struct CancelEvent {
    flag: AtomicBool,
    event: Event,
}

#[derive(Debug, Clone)]
pub struct CancelSignal(Arc<CancelEvent>);

impl Default for CancelSignal {
    fn default() -> Self {
        Self(Arc::new(CancelEvent {
            flag: AtomicBool::new(false),
            event: Event::new(),
        }))
    }
}

impl CancelSignal {
    pub fn is_cancelled(&self) -> bool {
        self.0.flag.load(DEFAULT_EVENT_ORDERING)
    }

    pub fn cancel(&self) {
        self.0.flag.store(true, DEFAULT_EVENT_ORDERING);
        self.0.event.notify(usize::MAX);
    }

    /// resolves once cancelled
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            trace!("before, already cancelled");
            return;
        }

        let listener = self.0.event.listen();

        if self.is_cancelled() {
            trace!("after, already cancelled");
            return;
        }

        listener.await
    }
}

/// per request state passed to every store operation
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    namespace: Option<String>,
    cancel: CancelSignal,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// context scoped to namespace
    pub fn with_namespace<S: Into<String>>(namespace: S) -> Self {
        let namespace = namespace.into();
        Self {
            namespace: if namespace.is_empty() {
                None
            } else {
                Some(namespace)
            },
            ..Default::default()
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
