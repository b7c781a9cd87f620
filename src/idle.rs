//! Idle inhibition
//!
//! Clients (typically the game while playing video) can ask the session
//! not to go idle. The session is inhibited exactly while at least one
//! inhibitor exists.

use std::collections::BTreeMap;

use log::debug;

use crate::event::{ObjectKey, Signal};
use crate::protocol::SurfaceId;
use crate::server::GameframeServer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InhibitorId(pub u64);

#[derive(Debug, Default)]
pub struct IdleInhibitTracker {
    inhibitors: BTreeMap<InhibitorId, SurfaceId>,
}

impl IdleInhibitTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, id: InhibitorId, surface: SurfaceId) {
        self.inhibitors.insert(id, surface);
    }

    pub fn remove(&mut self, id: InhibitorId) -> bool {
        self.inhibitors.remove(&id).is_some()
    }

    pub fn is_inhibited(&self) -> bool {
        !self.inhibitors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inhibitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inhibitors.is_empty()
    }
}

impl GameframeServer {
    pub(crate) fn handle_new_idle_inhibitor(&mut self, id: InhibitorId, surface: SurfaceId) {
        debug!("New idle inhibitor {:?} on {:?}", id, surface);
        self.idle.add(id, surface);
        self.listeners.subscribe(ObjectKey::Inhibitor(id), Signal::Destroy);
        self.update_idle_inhibit();
    }

    pub(crate) fn handle_idle_inhibitor_destroyed(&mut self, id: InhibitorId) {
        if !self.listeners.accepts(ObjectKey::Inhibitor(id), Signal::Destroy) {
            return;
        }
        self.listeners.release(ObjectKey::Inhibitor(id));
        self.idle.remove(id);
        self.update_idle_inhibit();
    }

    fn update_idle_inhibit(&mut self) {
        let inhibited = self.idle.is_inhibited();
        self.collaborators.idle.set_inhibited(inhibited);
    }

    /// Report user activity to the idle manager.
    pub(crate) fn notify_activity(&mut self) {
        self.collaborators.idle.notify_activity();
    }
}
