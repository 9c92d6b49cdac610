// Thread-safe handle for publishing responses into a dispatcher.
//
// Responses produced on the dispatcher's own thread are delivered directly
// by `Dispatcher::respond`. Anything arriving from elsewhere, most notably
// the platform boundary callback, goes through a `Responder`: it pushes the
// response onto an `mpsc` channel, and the owner thread hands queued
// responses to listeners on its next `Dispatcher::pump()`.
//
// A `Responder` outliving its dispatcher is harmless. Sends fail once the
// receiving half is gone and the response is dropped.

use std::sync::mpsc::{self, Receiver, Sender};

use native_bridge_protocol::message::BridgeResponse;

/// Cloneable, `Send` handle that queues responses for a dispatcher.
#[derive(Clone, Debug)]
pub struct Responder {
    tx: Sender<BridgeResponse>,
}

impl Responder {
    /// Queue a response for delivery on the dispatcher's thread. Returns
    /// `false` if the dispatcher no longer exists.
    pub fn respond(&self, response: BridgeResponse) -> bool {
        self.tx.send(response).is_ok()
    }
}

/// Create a responder and the inbox its dispatcher drains.
pub(crate) fn channel() -> (Responder, Receiver<BridgeResponse>) {
    let (tx, rx) = mpsc::channel();
    (Responder { tx }, rx)
}

#[cfg(test)]
mod tests {
    use std::thread;

    use native_bridge_protocol::payload::Payload;

    use super::*;

    #[test]
    fn queued_from_other_thread() {
        let (responder, inbox) = channel();
        let remote = responder.clone();
        thread::spawn(move || {
            assert!(remote.respond(BridgeResponse::new("echo", Payload::new(), "t")));
        })
        .join()
        .unwrap();

        let got = inbox.try_recv().unwrap();
        assert_eq!(got.tag, "t");
        assert!(inbox.try_recv().is_err());
    }

    #[test]
    fn respond_after_inbox_dropped_reports_failure() {
        let (responder, inbox) = channel();
        drop(inbox);
        assert!(!responder.respond(BridgeResponse::new("echo", Payload::new(), "t")));
    }
}
