//! Single-shot HTTP requests with lifecycle events, plus a declarative
//! parameter binder.
//!
//! # Architecture
//!
//! - `data`: immutable types (options, responses, data bags, events, states)
//! - `core`: pure transformations (binding, header folding, body encoding)
//! - `effects`: I/O (transports, the request engine, the client wrapper)
//!
//! # Example
//!
//! ```no_run
//! use courier::{DataBag, HttpClient, HttpMethod, RequestTemplate, ReqwestTransportFactory};
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), courier::Error> {
//! let template = RequestTemplate::new(HttpMethod::Get, "/users/{id}").query(["fields?"]);
//! let data = DataBag::try_from(json!({ "id": 42 })).unwrap();
//! let options = template.bind("https://api.example.com", &data)?;
//!
//! let client = HttpClient::new(ReqwestTransportFactory::default());
//! let response = client.send_request_async(options).await;
//! println!("{} {:?}", response.status, response.json_data);
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod data;
pub mod effects;
mod error;

pub use courier_event as event;
pub use courier_event::{EventDispatcher, EventManager, ListenerId};

pub use crate::core::RequestTemplate;
pub use crate::data::{
    Blob, DataBag, DataValue, ExchangeState, FormData, FormValue, HeaderValue, HttpEvent,
    HttpEventArgs, HttpMethod, HttpResponse, ParameterInfo, ParameterLocation, ProgressState,
    RequestBody, RequestOptions, RequestState, ResponseHeaders, status,
};
pub use crate::effects::{
    AbortHandle, HttpClient, HttpWebRequest, Transport, TransportFactory, reset_support_cache,
};
#[cfg(feature = "reqwest")]
pub use crate::effects::{ClientSettings, ReqwestTransport, ReqwestTransportFactory};
pub use crate::error::{BINDING_ERROR_STATUS, BindingError, Error, Result};
