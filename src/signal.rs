use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};

type Slot = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct SignalInner {
    next_id: u64,
    slots: BTreeMap<u64, Slot>,
}

/// Fire-and-forget notification with any number of connected slots.
#[derive(Clone, Default)]
pub struct Signal {
    inner: Arc<Mutex<SignalInner>>,
}

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect<F>(&self, slot: F) -> Connection
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock().expect("signal poisoned");
        inner.next_id += 1;
        let id = inner.next_id;
        inner.slots.insert(id, Arc::new(slot));
        Connection {
            signal: Arc::downgrade(&self.inner),
            id: Some(id),
        }
    }

    /// Calls every slot connected at the time of the call. Slots run without
    /// the signal lock held, so they may connect or disconnect freely.
    pub fn emit(&self) {
        let slots: Vec<Slot> = {
            let inner = self.inner.lock().expect("signal poisoned");
            inner.slots.values().cloned().collect()
        };
        for slot in slots {
            slot();
        }
    }

    pub fn num_slots(&self) -> usize {
        self.inner.lock().expect("signal poisoned").slots.len()
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("slots", &self.num_slots())
            .finish()
    }
}

/// Scoped subscription. Disconnects when dropped; an explicit `disconnect`
/// beforehand makes the drop a no-op.
pub struct Connection {
    signal: Weak<Mutex<SignalInner>>,
    id: Option<u64>,
}

impl Connection {
    pub fn disconnect(&mut self) {
        let Some(id) = self.id.take() else {
            return;
        };
        if let Some(inner) = self.signal.upgrade() {
            if let Ok(mut inner) = inner.lock() {
                inner.slots.remove(&id);
            }
        }
    }

    pub fn connected(&self) -> bool {
        match (self.id, self.signal.upgrade()) {
            (Some(id), Some(inner)) => inner
                .lock()
                .map(|inner| inner.slots.contains_key(&id))
                .unwrap_or(false),
            _ => false,
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("connected", &self.connected())
            .finish()
    }
}
