// Process-wide slot naming the live bridge instance.
//
// The inbound boundary callback is a bare C function with no context
// pointer, so it needs some process-wide way to find the dispatcher. Rather
// than a nullable global dispatcher, the slot holds an optional `Responder`
// for whichever dispatcher installed itself last:
//
// - `install()` publishes a responder and returns an `ActiveGuard`.
// - Dropping the guard empties the slot, unless a newer instance has
//   replaced it in the meantime, in which case the newer one stays.
// - `active_responder()` returns `None` before init and after teardown, and
//   the callback treats that as "drop the response".
//
// The slot is the only shared state in the crate and the only lock. It is
// held just long enough to clone or swap the responder.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::responder::Responder;

static ACTIVE: Mutex<Option<ActiveEntry>> = Mutex::new(None);
static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

struct ActiveEntry {
    instance: u64,
    responder: Responder,
}

/// Keeps a dispatcher published in the active slot until dropped.
#[must_use = "dropping the guard immediately uninstalls the bridge"]
#[derive(Debug)]
pub struct ActiveGuard {
    instance: u64,
}

impl ActiveGuard {
    /// True while this guard's instance is the one in the slot.
    pub fn is_current(&self) -> bool {
        slot().as_ref().is_some_and(|e| e.instance == self.instance)
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        let mut slot = slot();
        if slot.as_ref().is_some_and(|e| e.instance == self.instance) {
            *slot = None;
            log::debug!("native bridge: instance {} uninstalled", self.instance);
        }
    }
}

/// Publish `responder` as the live bridge instance, replacing any other.
pub fn install(responder: Responder) -> ActiveGuard {
    let instance = NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed);
    let previous = slot().replace(ActiveEntry {
        instance,
        responder,
    });
    if let Some(prev) = previous {
        log::warn!(
            "native bridge: instance {instance} replaced still-installed instance {}",
            prev.instance
        );
    }
    ActiveGuard { instance }
}

/// The live instance's responder, if a bridge is installed.
pub fn active_responder() -> Option<Responder> {
    slot().as_ref().map(|e| e.responder.clone())
}

fn slot() -> MutexGuard<'static, Option<ActiveEntry>> {
    ACTIVE.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Serializes unit tests that install into the process-wide slot.
#[cfg(test)]
pub(crate) fn serial_test_guard() -> MutexGuard<'static, ()> {
    static SERIAL: Mutex<()> = Mutex::new(());
    SERIAL.lock().unwrap_or_else(PoisonError::into_inner)
}
