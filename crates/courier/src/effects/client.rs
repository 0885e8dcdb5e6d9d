//! Capability wrapper: checks the environment once and forwards each call to
//! a fresh [`HttpWebRequest`].

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use courier_event::EventManager;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::{debug, warn};

use super::request::HttpWebRequest;
use super::transport::TransportFactory;
use crate::data::{HttpEventArgs, HttpResponse, RequestOptions, status};

pub const NOT_SUPPORTED_MESSAGE: &str = "not supported";

/// Whether a transport could be created, per factory type, for the life of
/// the process.
static SUPPORT: Lazy<RwLock<HashMap<TypeId, bool>>> = Lazy::new(|| RwLock::new(HashMap::new()));

/// Forget the cached support check for `F`.
///
/// Only meant for tests that swap the environment between cases.
pub fn reset_support_cache<F: 'static>() {
    SUPPORT.write().remove(&TypeId::of::<F>());
}

fn cached_support<F: 'static>() -> Option<bool> {
    SUPPORT.read().get(&TypeId::of::<F>()).copied()
}

fn store_support<F: 'static>(supported: bool) {
    // Write-once: a concurrent check that got here first keeps its answer.
    SUPPORT.write().entry(TypeId::of::<F>()).or_insert(supported);
}

fn with_options(mut response: HttpResponse, options: Arc<RequestOptions>) -> HttpResponse {
    response.request_options = Some(options);
    response
}

/// Sends requests through transports created by `F`.
///
/// Listeners registered on [`events`](Self::events) are copied onto every
/// engine this client creates.
pub struct HttpClient<F: TransportFactory> {
    factory: F,
    events: EventManager<HttpEventArgs>,
}

impl<F: TransportFactory + 'static> HttpClient<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            events: EventManager::new(),
        }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn events(&self) -> &EventManager<HttpEventArgs> {
        &self.events
    }

    /// Whether `F` can create transports here. Checked once per process.
    pub fn is_supported(&self) -> bool {
        if let Some(supported) = cached_support::<F>() {
            return supported;
        }

        let supported = match self.factory.create() {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "transport is not supported in this environment");
                false
            }
        };
        store_support::<F>(supported);

        supported
    }

    /// Send one request.
    ///
    /// Never fails: an unsupported environment resolves with
    /// [`status::NOT_SUPPORTED`] without attempting any I/O, and transport
    /// failures carry their own negative status.
    pub async fn send_request_async(&self, options: impl Into<RequestOptions>) -> HttpResponse {
        let options = Arc::new(options.into());

        if cached_support::<F>() == Some(false) {
            return HttpResponse::failure(status::NOT_SUPPORTED, NOT_SUPPORTED_MESSAGE, Some(options));
        }

        let mut request = match HttpWebRequest::new((*options).clone(), &self.factory) {
            Ok(request) => {
                store_support::<F>(true);
                request
            }
            Err(crate::Error::UnsupportedEnvironment(reason)) => {
                warn!(%reason, "transport is not supported in this environment");
                store_support::<F>(false);
                return HttpResponse::failure(status::NOT_SUPPORTED, NOT_SUPPORTED_MESSAGE, Some(options));
            }
            Err(e) => {
                debug!(error = %e, "request could not be prepared");
                return with_options(e.to_response(), options);
            }
        };

        request.events().copy_event_listeners(&self.events);

        match request.send_async().await {
            Ok(response) => response,
            Err(e) => with_options(e.to_response(), options),
        }
    }
}
