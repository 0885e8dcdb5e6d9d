//! The transport contract the request engine drives.
//!
//! A transport is shaped like a browser `XMLHttpRequest`: it is opened,
//! given headers, sent once, and reports what happens through
//! [`TransportSignal`]s pushed into the [`SignalSink`] it receives on
//! [`send`](Transport::send). Any implementation honoring this contract can
//! stand in for the production one.

use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::core::TransportBody;
use crate::data::HttpMethod;

/// Lifecycle signal kinds reported for each direction of an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    /// `loadstart`
    Start,
    /// `loadend`: fires last, whatever the outcome.
    End,
    /// `load`: finished successfully.
    Success,
    Progress,
    Timeout,
    Abort,
    Error,
}

/// Progress measurement attached to a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSignal {
    pub kind: SignalKind,
    pub length_computable: bool,
    pub loaded: u64,
    pub total: u64,
}

impl ProgressSignal {
    pub fn new(kind: SignalKind, loaded: u64, total: Option<u64>) -> Self {
        Self {
            kind,
            length_computable: total.is_some(),
            loaded,
            total: total.unwrap_or(0),
        }
    }

    /// A signal without any length information.
    pub fn bare(kind: SignalKind) -> Self {
        Self::new(kind, 0, None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportSignal {
    Upload(ProgressSignal),
    Download(ProgressSignal),
    /// The transport's ready state moved to the carried value (0–4).
    ReadyStateChange(u8),
}

/// Sending half of the channel a transport reports signals through.
#[derive(Debug, Clone)]
pub struct SignalSink {
    sender: mpsc::UnboundedSender<TransportSignal>,
}

impl SignalSink {
    /// Returns `false` once the engine has stopped listening.
    pub fn emit(&self, signal: TransportSignal) -> bool {
        self.sender.send(signal).is_ok()
    }

    pub fn upload(&self, signal: ProgressSignal) -> bool {
        self.emit(TransportSignal::Upload(signal))
    }

    pub fn download(&self, signal: ProgressSignal) -> bool {
        self.emit(TransportSignal::Download(signal))
    }

    pub fn ready_state(&self, ready_state: u8) -> bool {
        self.emit(TransportSignal::ReadyStateChange(ready_state))
    }
}

pub type SignalReceiver = mpsc::UnboundedReceiver<TransportSignal>;

pub fn signal_channel() -> (SignalSink, SignalReceiver) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (SignalSink { sender }, receiver)
}

/// How the response body is exposed. The engine always asks for raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseType {
    #[default]
    Bytes,
}

/// Everything [`Transport::open`] needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenRequest {
    pub method: HttpMethod,
    pub url: String,
    /// [`Duration::ZERO`] means unbounded.
    pub timeout: Duration,
    pub with_credentials: bool,
    pub response_type: ResponseType,
}

/// An XHR-shaped transport for exactly one exchange.
///
/// Signals must follow browser ordering: on a network failure the transport
/// reports ready state 4 with [`status`](Self::status) 0 first and the
/// `Error` / `Timeout` download signal after it. After
/// [`abort`](Self::abort) on an exchange in flight it reports a download
/// `Abort` signal and no further success.
pub trait Transport: Send {
    fn open(&mut self, request: OpenRequest);

    fn set_request_header(&mut self, name: &str, value: &str);

    /// Start the exchange. Signals are reported through `signals`.
    fn send(&mut self, body: Option<TransportBody>, signals: SignalSink);

    fn abort(&mut self);

    fn ready_state(&self) -> u8;

    /// HTTP status, 0 until a status line has been received.
    fn status(&self) -> u16;

    fn response(&self) -> Bytes;

    /// Value of one response header; repeated headers are joined with `, `.
    fn response_header(&self, name: &str) -> Option<String>;

    /// All response headers as one `Name: value` block separated by CRLF.
    fn all_response_headers(&self) -> String;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn open(&mut self, request: OpenRequest) {
        (**self).open(request);
    }

    fn set_request_header(&mut self, name: &str, value: &str) {
        (**self).set_request_header(name, value);
    }

    fn send(&mut self, body: Option<TransportBody>, signals: SignalSink) {
        (**self).send(body, signals);
    }

    fn abort(&mut self) {
        (**self).abort();
    }

    fn ready_state(&self) -> u8 {
        (**self).ready_state()
    }

    fn status(&self) -> u16 {
        (**self).status()
    }

    fn response(&self) -> Bytes {
        (**self).response()
    }

    fn response_header(&self, name: &str) -> Option<String> {
        (**self).response_header(name)
    }

    fn all_response_headers(&self) -> String {
        (**self).all_response_headers()
    }
}

/// Creates transports. Failing to create one means the environment cannot
/// perform requests at all.
pub trait TransportFactory: Send + Sync {
    type Transport: Transport + 'static;
    type Error: std::error::Error + Send + Sync + 'static;

    fn create(&self) -> Result<Self::Transport, Self::Error>;
}
