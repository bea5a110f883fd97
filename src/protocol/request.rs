//! Request/response handling for IQ queries.
//!
//! Handles WhatsApp IQ (Info/Query) protocol messages and the bookkeeping
//! that pairs gateway responses with the requests waiting on them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use log::{debug, warn};
use tokio::sync::oneshot;

use crate::binary::Node;
use crate::types::JID;

/// Namespace of profile-picture queries.
pub const PROFILE_PICTURE_XMLNS: &str = "w:profile:picture";

/// Request tracker pairing request IDs with waiting callers.
pub struct RequestTracker<T> {
    pending: Mutex<Pending<T>>,
    prefix: String,
    counter: AtomicU64,
}

struct Pending<T> {
    waiters: HashMap<String, oneshot::Sender<T>>,
    /// Set by [`RequestTracker::fail_all`]; later registrations fail at once.
    closed: bool,
}

impl<T> RequestTracker<T> {
    /// Create a new request tracker.
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(Pending {
                waiters: HashMap::new(),
                closed: false,
            }),
            prefix: format!("{:X}", rand::random::<u16>()),
            counter: AtomicU64::new(0),
        }
    }

    /// Generate a new unique request ID.
    pub fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}.{}", self.prefix, n)
    }

    /// Register a pending request and get a receiver for the response.
    pub fn register(&self, id: &str) -> oneshot::Receiver<T> {
        let (tx, rx) = oneshot::channel();
        match self.pending.lock() {
            Ok(mut pending) if !pending.closed => {
                pending.waiters.insert(id.to_string(), tx);
            }
            // The sender drops here, so the caller sees a closed channel.
            Ok(_) => debug!("request tracker closed; refusing request {id}"),
            Err(_) => warn!("request tracker lock poisoned; dropping request {id}"),
        }
        rx
    }

    /// Complete a pending request with a response.
    pub fn complete(&self, id: &str, response: T) -> bool {
        let waiter = self.pending.lock().ok().and_then(|mut p| p.waiters.remove(id));
        match waiter {
            Some(tx) => tx.send(response).is_ok(),
            None => false,
        }
    }

    /// Drop every pending request and refuse new ones; their receivers
    /// observe a closed channel.
    pub fn fail_all(&self) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.closed = true;
            pending.waiters.clear();
        }
    }

    /// Get count of pending requests.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().map(|p| p.waiters.len()).unwrap_or_default()
    }
}

impl<T> Default for RequestTracker<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Build an IQ set request.
pub fn build_iq_set(id: &str, xmlns: &str, to: &JID) -> Node {
    Node::new("iq")
        .with_attr("id", id)
        .with_attr("type", "set")
        .with_attr("xmlns", xmlns)
        .with_attr("to", to.clone())
}

/// Build the request replacing `to`'s profile picture with `jpeg`.
pub fn build_set_profile_picture(id: &str, to: &JID, jpeg: Vec<u8>) -> Node {
    let mut picture = Node::new("picture").with_attr("type", "image");
    picture.set_bytes(jpeg);

    let mut iq = build_iq_set(id, PROFILE_PICTURE_XMLNS, to);
    iq.add_child(picture);
    iq
}

/// Check if a node is an IQ error.
pub fn is_iq_error(node: &Node) -> bool {
    node.tag == "iq" && node.get_attr_str("type") == Some("error")
}

/// Extract error message from IQ error node.
pub fn get_iq_error(node: &Node) -> Option<String> {
    if !is_iq_error(node) {
        return None;
    }

    let error = node.get_child_by_tag("error");
    let text = error
        .and_then(|e| e.get_attr_str("text"))
        .map(String::from);
    let code = error.and_then(|e| e.get_attr_str("code")).map(String::from);
    Some(match (code, text) {
        (Some(code), Some(text)) => format!("{code}: {text}"),
        (None, Some(text)) => text,
        (Some(code), None) => code,
        (None, None) => "unspecified error".to_string(),
    })
}
