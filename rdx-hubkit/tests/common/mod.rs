#![allow(dead_code)]

use hubkit::prelude::*;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A component that records its lifecycle calls.
pub struct Probe {
    name: String,
    members: Option<Members>,
    pub configured: AtomicUsize,
    pub started: AtomicUsize,
    pub stopped: AtomicUsize,
    pub hub: Mutex<Option<Hub>>,
    pub config: Mutex<Option<ComponentConfig>>,
}

impl Probe {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self::build(name, None))
    }

    pub fn with_members(name: &str, members: Members) -> Arc<Self> {
        Arc::new(Self::build(name, Some(members)))
    }

    fn build(name: &str, members: Option<Members>) -> Self {
        Self {
            name: name.to_string(),
            members,
            configured: AtomicUsize::new(0),
            started: AtomicUsize::new(0),
            stopped: AtomicUsize::new(0),
            hub: Mutex::new(None),
            config: Mutex::new(None),
        }
    }

    pub fn starts(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn configures(&self) -> usize {
        self.configured.load(Ordering::SeqCst)
    }
}

impl Component for Probe {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn configure(&self, hub: &Hub, config: &ComponentConfig) {
        self.configured.fetch_add(1, Ordering::SeqCst);
        *self.hub.lock() = Some(hub.clone());
        *self.config.lock() = Some(config.clone());
    }

    fn start(&self) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.stopped.fetch_add(1, Ordering::SeqCst);
    }

    fn members(&self) -> Option<&Members> {
        self.members.as_ref()
    }
}

pub fn as_ref(probe: &Arc<Probe>) -> ComponentRef {
    probe.clone()
}

/// A callback that appends every received event to a shared log.
pub fn recorder() -> (Callback, Arc<Mutex<Vec<Event>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    let cb = callback(move |event: &Event| sink.lock().push(event.clone()));
    (cb, log)
}
