//! Everything that touches the network: the transport contract, the request
//! lifecycle engine, the capability wrapper and the `reqwest` transport.

mod client;
mod request;
#[cfg(feature = "reqwest")]
mod reqwest_transport;
mod transport;

pub use client::{HttpClient, NOT_SUPPORTED_MESSAGE, reset_support_cache};
pub use request::{ABORTED_MESSAGE, AbortHandle, ERROR_MESSAGE, HttpWebRequest, TIMED_OUT_MESSAGE};
#[cfg(feature = "reqwest")]
pub use reqwest_transport::{ClientSettings, ReqwestTransport, ReqwestTransportFactory};
pub use transport::{
    OpenRequest, ProgressSignal, ResponseType, SignalKind, SignalReceiver, SignalSink, Transport,
    TransportFactory, TransportSignal, signal_channel,
};
