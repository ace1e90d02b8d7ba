//! Process-wide dispatch diagnostics.
//!
//! Two publish/subscribe channels report what the dispatcher is doing:
//!
//! - [`REQUEST_CHANNEL`] (`router.layer.handle.request`) — published
//!   immediately before a normal layer's handler runs.
//! - [`ERROR_CHANNEL`] (`router.layer.handle.error`) — published
//!   immediately before an error layer receives the in-flight error.
//!
//! Events are purely observational: a router with zero subscribers behaves
//! identically, and nothing a subscriber does can alter dispatch. The
//! subscriber list may be mutated concurrently with active dispatch — the
//! publisher snapshots it before invoking anyone, so a subscriber
//! unsubscribing mid-flight never corrupts an in-progress publication.
//!
//! ```rust
//! use trellis::diagnostics::{self, REQUEST_CHANNEL};
//!
//! let sub = diagnostics::subscribe(REQUEST_CHANNEL, |event| {
//!     eprintln!("about to handle {} {}", event.request.method(), event.layer_path);
//! });
//! // …serve traffic…
//! sub.unsubscribe();
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, RwLock};

use crate::error::RouteError;
use crate::request::Request;
use crate::response::Response;

/// Channel name for "a layer is about to handle this request".
pub const REQUEST_CHANNEL: &str = "router.layer.handle.request";

/// Channel name for "a layer is about to handle this error".
pub const ERROR_CHANNEL: &str = "router.layer.handle.error";

/// One observational dispatch event.
///
/// `error` is `None` on [`REQUEST_CHANNEL`] and always present on
/// [`ERROR_CHANNEL`].
pub struct LayerEvent<'a> {
    pub request: &'a Request,
    pub response: &'a Response,
    /// The matched layer's registered pattern (a route's path for layers
    /// inside a route).
    pub layer_path: &'a str,
    pub error: Option<&'a RouteError>,
}

type Subscriber = Arc<dyn Fn(&LayerEvent<'_>) + Send + Sync>;

struct Registry {
    channels: RwLock<HashMap<&'static str, Vec<(u64, Subscriber)>>>,
    next_id: AtomicU64,
}

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| Registry {
        channels: RwLock::new(HashMap::new()),
        next_id: AtomicU64::new(0),
    })
}

/// A live subscription. Dropping it does *not* unsubscribe — call
/// [`unsubscribe`](Subscription::unsubscribe) explicitly, mirroring the
/// subscribe/unsubscribe pair of the channel contract.
#[must_use = "keep the subscription to be able to unsubscribe"]
pub struct Subscription {
    channel: &'static str,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {
        let reg = registry();
        if let Ok(mut channels) = reg.channels.write()
            && let Some(subs) = channels.get_mut(self.channel)
        {
            subs.retain(|(id, _)| *id != self.id);
        }
    }
}

/// Subscribes `f` to `channel`. Only the two router channels exist today;
/// subscribing to any other name is legal and simply never fires.
pub fn subscribe(
    channel: &'static str,
    f: impl Fn(&LayerEvent<'_>) + Send + Sync + 'static,
) -> Subscription {
    let reg = registry();
    let id = reg.next_id.fetch_add(1, Ordering::Relaxed);
    if let Ok(mut channels) = reg.channels.write() {
        channels.entry(channel).or_default().push((id, Arc::new(f)));
    }
    Subscription { channel, id }
}

/// Publishes an event. The subscriber list is cloned out under the lock and
/// invoked after releasing it, so subscribers may subscribe or unsubscribe
/// freely from inside their callbacks.
pub(crate) fn publish(channel: &'static str, event: &LayerEvent<'_>) {
    let subs: Vec<Subscriber> = {
        let reg = registry();
        match reg.channels.read() {
            Ok(channels) => match channels.get(channel) {
                Some(subs) if !subs.is_empty() => {
                    subs.iter().map(|(_, f)| Arc::clone(f)).collect()
                }
                _ => return,
            },
            Err(_) => return,
        }
    };
    for f in subs {
        f(event);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::{LayerEvent, publish, subscribe};
    use crate::method::Method;
    use crate::request::Request;
    use crate::response::Response;

    #[test]
    fn publish_reaches_subscribers_until_unsubscribed() {
        // A channel name of its own so parallel tests cannot interfere.
        const CHANNEL: &str = "trellis.test.diagnostics.basic";

        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        let sub = subscribe(CHANNEL, move |event| {
            assert_eq!(event.layer_path, "/probe");
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let req = Request::new(Method::Get, "/probe");
        let res = Response::new();
        let event = LayerEvent { request: &req, response: &res, layer_path: "/probe", error: None };

        publish(CHANNEL, &event);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        sub.unsubscribe();
        publish(CHANNEL, &event);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
