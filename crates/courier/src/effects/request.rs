//! The request lifecycle engine.

use std::sync::Arc;

use bytes::Bytes;
use courier_event::{EventDispatcher, EventManager};
use serde_json::Value;
use tokio::sync::Notify;
use tracing::{debug, trace, warn};

use super::transport::{
    OpenRequest, ProgressSignal, ResponseType, SignalKind, Transport, TransportFactory,
    TransportSignal, signal_channel,
};
use crate::core::{
    CONTENT_TYPE_HEADER, TransportBody, encode_request_body, fold_headers, is_json_content_type,
    is_textual_content_type, lowercase_header_names,
};
use crate::data::{
    ExchangeState, HttpEvent, HttpEventArgs, HttpResponse, ProgressState, RequestOptions,
    RequestState, ResponseHeaders, status,
};
use crate::error::{Error, Result};

pub const ABORTED_MESSAGE: &str = "request aborted";
pub const TIMED_OUT_MESSAGE: &str = "request timed out";
pub const ERROR_MESSAGE: &str = "error occurred";

/// Cancels an exchange from outside the task driving it.
///
/// Aborting before the exchange starts cancels it as soon as it is sent.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    notify: Arc<Notify>,
}

impl AbortHandle {
    pub fn abort(&self) {
        self.notify.notify_one();
    }
}

/// Drives exactly one HTTP exchange over a [`Transport`].
///
/// The engine forwards every transport signal to its listeners as an
/// [`HttpEvent`] and resolves [`send_async`](Self::send_async) exactly once:
/// with the parsed response, or with a synthesized failure carrying one of
/// the negative codes in [`status`].
pub struct HttpWebRequest<T: Transport> {
    options: Arc<RequestOptions>,
    body: Option<TransportBody>,
    transport: T,
    events: EventManager<HttpEventArgs>,
    exchange: ExchangeState,
    state: RequestState,
    upload: ProgressState,
    download: ProgressState,
    response_headers: Option<ResponseHeaders>,
    response: Option<HttpResponse>,
    abort: Arc<Notify>,
}

impl<T: Transport> HttpWebRequest<T> {
    /// Create an engine with a transport from `factory`.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedEnvironment`] when the factory cannot create a
    /// transport, [`Error::Serialize`] when the body cannot be encoded.
    pub fn new<F>(options: impl Into<RequestOptions>, factory: &F) -> Result<Self>
    where
        F: TransportFactory<Transport = T>,
    {
        let transport = factory
            .create()
            .map_err(|e| Error::UnsupportedEnvironment(e.to_string()))?;

        Self::with_transport(options, transport)
    }

    pub fn with_transport(options: impl Into<RequestOptions>, transport: T) -> Result<Self> {
        let mut options = options.into();
        options.headers = lowercase_header_names(&options.headers);

        let body = encode_request_body(
            options.body.clone(),
            options.automatic_json_request_body_parsing,
            &mut options.headers,
        )?;

        Ok(Self {
            options: Arc::new(options),
            body,
            transport,
            events: EventManager::new(),
            exchange: ExchangeState::NotStarted,
            state: RequestState::Unsent,
            upload: ProgressState::default(),
            download: ProgressState::default(),
            response_headers: None,
            response: None,
            abort: Arc::new(Notify::new()),
        })
    }

    /// Options as normalized at construction: header names lower-cased and
    /// `content-type` set for automatically encoded JSON bodies.
    pub fn options(&self) -> &Arc<RequestOptions> {
        &self.options
    }

    pub fn events(&self) -> &EventManager<HttpEventArgs> {
        &self.events
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn state_name(&self) -> &'static str {
        self.state.name()
    }

    pub fn exchange_state(&self) -> ExchangeState {
        self.exchange
    }

    pub fn upload_progress(&self) -> ProgressState {
        self.upload
    }

    pub fn download_progress(&self) -> ProgressState {
        self.download
    }

    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            notify: Arc::clone(&self.abort),
        }
    }

    /// Request cancellation. The pending [`send_async`](Self::send_async)
    /// resolves with [`status::ABORTED`].
    pub fn abort(&self) {
        self.abort.notify_one();
    }

    /// Execute the exchange.
    ///
    /// Transport outcomes never produce `Err`: failures resolve as responses
    /// with a negative status.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadySent`] if this engine has already started an exchange.
    pub async fn send_async(&mut self) -> Result<HttpResponse> {
        if self.exchange != ExchangeState::NotStarted {
            return Err(Error::AlreadySent);
        }
        self.exchange = ExchangeState::InFlight;

        let options = Arc::clone(&self.options);
        debug!(method = %options.method, url = %options.url, "opening request");

        self.transport.open(OpenRequest {
            method: options.method,
            url: options.url.clone(),
            timeout: options.timeout,
            with_credentials: options.allow_credentials_on_cross_site_requests,
            response_type: ResponseType::Bytes,
        });
        for (name, value) in &options.headers {
            self.transport.set_request_header(name, value);
        }

        let (sink, mut signals) = signal_channel();
        debug!(url = %options.url, "sending request");
        self.transport.send(self.body.take(), sink);

        let abort = Arc::clone(&self.abort);
        let mut abort_forwarded = false;
        let mut settled = None;

        while settled.is_none() {
            tokio::select! {
                biased;

                signal = signals.recv() => match signal {
                    Some(signal) => settled = self.handle_signal(signal),
                    None => {
                        warn!(url = %options.url, "transport closed without a terminal signal");
                        settled = Some(self.failure(status::ERROR, ERROR_MESSAGE));
                    }
                },
                () = abort.notified(), if !abort_forwarded => {
                    abort_forwarded = true;
                    debug!(url = %options.url, "aborting request");
                    self.transport.abort();
                }
            }
        }

        // Listeners still see signals that were already queued, but the
        // outcome is fixed.
        while let Ok(signal) = signals.try_recv() {
            let _ = self.handle_signal(signal);
        }

        self.exchange = ExchangeState::Settled;

        let response = settled.unwrap_or_default();
        debug!(url = %options.url, status = response.status, "request settled");

        Ok(response)
    }

    fn handle_signal(&mut self, signal: TransportSignal) -> Option<HttpResponse> {
        trace!(?signal, state = %self.state, "transport signal");

        match signal {
            TransportSignal::Upload(progress) => {
                self.handle_upload(progress);
                None
            }
            TransportSignal::Download(progress) => self.handle_download(progress),
            TransportSignal::ReadyStateChange(ready_state) => {
                self.handle_ready_state_change(ready_state)
            }
        }
    }

    fn handle_upload(&mut self, signal: ProgressSignal) {
        record(&mut self.upload, &signal);

        let event = match signal.kind {
            SignalKind::Start => HttpEvent::UploadStart,
            SignalKind::End => HttpEvent::UploadComplete,
            SignalKind::Success => HttpEvent::UploadSuccess,
            SignalKind::Progress => HttpEvent::UploadProgressChange,
            SignalKind::Timeout => HttpEvent::UploadTimeout,
            SignalKind::Abort => HttpEvent::UploadAbort,
            SignalKind::Error => HttpEvent::UploadError,
        };

        let args = HttpEventArgs {
            event,
            is_progress_computable: self.upload.is_computable,
            bytes_uploaded: Some(self.upload.bytes_transferred),
            bytes_downloaded: None,
            content_length: self.upload.content_length,
            progress: self.upload.percentage,
            state: self.state,
            request_options: Arc::clone(&self.options),
            response: None,
        };
        self.events.dispatch(&args);
    }

    fn handle_download(&mut self, signal: ProgressSignal) -> Option<HttpResponse> {
        record(&mut self.download, &signal);

        let (event, outcome) = match signal.kind {
            SignalKind::Start => (HttpEvent::DownloadStart, None),
            SignalKind::End => (HttpEvent::DownloadComplete, None),
            SignalKind::Success => (HttpEvent::DownloadSuccess, None),
            SignalKind::Progress => (HttpEvent::DownloadProgressChange, None),
            SignalKind::Timeout => (
                HttpEvent::DownloadTimeout,
                Some((status::TIMED_OUT, TIMED_OUT_MESSAGE)),
            ),
            SignalKind::Abort => (HttpEvent::DownloadAbort, Some((status::ABORTED, ABORTED_MESSAGE))),
            SignalKind::Error => (HttpEvent::DownloadError, Some((status::ERROR, ERROR_MESSAGE))),
        };

        self.fire_download(event, None);

        outcome.map(|(status, message)| self.failure(status, message))
    }

    fn handle_ready_state_change(&mut self, ready_state: u8) -> Option<HttpResponse> {
        let next = RequestState::from_ready_state(ready_state);
        if next > self.state {
            self.state = next;
        }

        let response = (self.state == RequestState::Done).then(|| self.parse_response());
        self.fire_download(HttpEvent::StateChange, response.clone());

        // Status 0 at DONE means the exchange failed below HTTP; the
        // error, timeout or abort signal that follows settles it.
        response.filter(|_| self.transport.status() != 0)
    }

    fn fire_download(&self, event: HttpEvent, response: Option<HttpResponse>) {
        let args = HttpEventArgs {
            event,
            is_progress_computable: self.download.is_computable,
            bytes_uploaded: None,
            bytes_downloaded: Some(self.download.bytes_transferred),
            content_length: self.download.content_length,
            progress: self.download.percentage,
            state: self.state,
            request_options: Arc::clone(&self.options),
            response,
        };
        self.events.dispatch(&args);
    }

    /// Parsed response headers, `None` before headers were received.
    pub fn response_headers(&mut self) -> Option<&ResponseHeaders> {
        if self.response_headers.is_none() && self.state >= RequestState::HeadersReceived {
            self.response_headers = Some(fold_headers(&self.transport.all_response_headers()));
        }

        self.response_headers.as_ref()
    }

    fn parse_response(&mut self) -> HttpResponse {
        if let Some(response) = &self.response {
            return response.clone();
        }

        let raw_data: Bytes = self.transport.response();
        let content_type = self
            .transport
            .response_header(CONTENT_TYPE_HEADER)
            .unwrap_or_default();

        let mut text_data = None;
        let mut json_data = None;

        if is_textual_content_type(&content_type) {
            let text = String::from_utf8_lossy(&raw_data).into_owned();

            if is_json_content_type(&content_type) && self.options.automatic_json_response_body_parsing {
                json_data = parse_json(&text);
            }
            text_data = Some(text);
        }

        let response = HttpResponse {
            status: i32::from(self.transport.status()),
            message: None,
            headers: self.response_headers().cloned(),
            raw_data: Some(raw_data),
            text_data,
            json_data,
            request_options: Some(Arc::clone(&self.options)),
        };

        self.response = Some(response.clone());
        response
    }

    fn failure(&self, status: i32, message: &str) -> HttpResponse {
        debug!(url = %self.options.url, status, message, "request failed");
        HttpResponse::failure(status, message, Some(Arc::clone(&self.options)))
    }
}

/// Counters only move on computable progress signals; every other signal
/// just refreshes computability.
fn record(progress: &mut ProgressState, signal: &ProgressSignal) {
    if signal.kind == SignalKind::Progress {
        progress.record(signal.length_computable, signal.loaded, signal.total);
    } else {
        progress.is_computable = signal.length_computable;
    }
}

fn parse_json(text: &str) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }

    match serde_json::from_str(text) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, "response declared JSON but could not be parsed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::transport::SignalSink;
    use parking_lot::Mutex;
    use serde_json::json;

    /// Replays a fixed signal script on send.
    #[derive(Default)]
    struct Scripted {
        script: Vec<TransportSignal>,
        status: u16,
        headers: String,
        body: &'static [u8],
        opened: Arc<Mutex<Option<OpenRequest>>>,
        sent_headers: Arc<Mutex<Vec<(String, String)>>>,
        sink: Option<SignalSink>,
        ready_state: u8,
    }

    impl Transport for Scripted {
        fn open(&mut self, request: OpenRequest) {
            *self.opened.lock() = Some(request);
            self.ready_state = 1;
        }

        fn set_request_header(&mut self, name: &str, value: &str) {
            self.sent_headers.lock().push((name.to_string(), value.to_string()));
        }

        fn send(&mut self, _body: Option<TransportBody>, signals: SignalSink) {
            for signal in &self.script {
                if let TransportSignal::ReadyStateChange(n) = signal {
                    self.ready_state = *n;
                }
                signals.emit(*signal);
            }
            self.sink = Some(signals);
        }

        fn abort(&mut self) {
            if let Some(sink) = &self.sink {
                sink.download(ProgressSignal::bare(SignalKind::Abort));
            }
        }

        fn ready_state(&self) -> u8 {
            self.ready_state
        }

        fn status(&self) -> u16 {
            self.status
        }

        fn response(&self) -> Bytes {
            Bytes::from_static(self.body)
        }

        fn response_header(&self, name: &str) -> Option<String> {
            fold_headers(&self.headers)
                .into_iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .and_then(|(_, value)| value.as_str().map(str::to_string))
        }

        fn all_response_headers(&self) -> String {
            self.headers.clone()
        }
    }

    fn done_script() -> Vec<TransportSignal> {
        vec![
            TransportSignal::ReadyStateChange(2),
            TransportSignal::ReadyStateChange(3),
            TransportSignal::Download(ProgressSignal::new(SignalKind::Progress, 5, Some(10))),
            TransportSignal::ReadyStateChange(4),
        ]
    }

    #[test]
    fn construction_normalizes_headers_and_body() {
        let options = RequestOptions::new("http://localhost/")
            .header("X-Trace", "1")
            .json(json!({ "a": 1 }));
        let request = HttpWebRequest::with_transport(options, Scripted::default()).unwrap();

        let headers = &request.options().headers;
        assert_eq!(headers.get("x-trace").map(String::as_str), Some("1"));
        assert_eq!(headers.get("content-type").map(String::as_str), Some("application/json"));
        assert_eq!(request.body, Some(TransportBody::Text(r#"{"a":1}"#.into())));
        assert_eq!(request.exchange_state(), ExchangeState::NotStarted);
    }

    #[tokio::test]
    async fn opens_transport_with_options() {
        let transport = Scripted {
            script: done_script(),
            status: 204,
            ..Scripted::default()
        };
        let opened = Arc::clone(&transport.opened);
        let sent_headers = Arc::clone(&transport.sent_headers);

        let options = RequestOptions::new("http://localhost/items")
            .method(crate::data::HttpMethod::Delete)
            .header("Accept", "*/*");
        let mut request = HttpWebRequest::with_transport(options, transport).unwrap();
        let response = request.send_async().await.unwrap();

        assert_eq!(response.status, 204);
        let opened = opened.lock().clone().unwrap();
        assert_eq!(opened.method, crate::data::HttpMethod::Delete);
        assert_eq!(opened.response_type, ResponseType::Bytes);
        assert_eq!(*sent_headers.lock(), vec![("accept".to_string(), "*/*".to_string())]);
    }

    #[tokio::test]
    async fn json_response_is_parsed() {
        let transport = Scripted {
            script: done_script(),
            status: 200,
            headers: "Content-Type: application/json\r\nSet-Cookie: a\r\nSet-Cookie: b\r\n".into(),
            body: br#"{"ok":true}"#,
            ..Scripted::default()
        };
        let mut request = HttpWebRequest::with_transport("http://localhost/", transport).unwrap();
        let response = request.send_async().await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.json_data, Some(json!({ "ok": true })));
        assert_eq!(response.text_data.as_deref(), Some(r#"{"ok":true}"#));
        assert_eq!(response.raw_data.as_deref(), Some(&br#"{"ok":true}"#[..]));
        assert_eq!(
            response.header("set-cookie").map(|value| value.values()),
            Some(vec!["a", "b"])
        );
        assert_eq!(request.state(), RequestState::Done);
        assert_eq!(request.download_progress().percentage, 50.0);
        assert_eq!(request.exchange_state(), ExchangeState::Settled);
    }

    #[tokio::test]
    async fn json_parsing_can_be_disabled() {
        let transport = Scripted {
            script: done_script(),
            status: 200,
            headers: "content-type: application/json\r\n".into(),
            body: b"[1]",
            ..Scripted::default()
        };
        let options = RequestOptions::new("http://localhost/").automatic_json_response_body_parsing(false);
        let mut request = HttpWebRequest::with_transport(options, transport).unwrap();
        let response = request.send_async().await.unwrap();

        assert_eq!(response.json_data, None);
        assert_eq!(response.text_data.as_deref(), Some("[1]"));
    }

    #[tokio::test]
    async fn binary_content_only_keeps_raw_data() {
        let transport = Scripted {
            script: done_script(),
            status: 200,
            headers: "content-type: image/png\r\n".into(),
            body: b"\x89PNG",
            ..Scripted::default()
        };
        let mut request = HttpWebRequest::with_transport("http://localhost/", transport).unwrap();
        let response = request.send_async().await.unwrap();

        assert_eq!(response.text_data, None);
        assert_eq!(response.json_data, None);
        assert_eq!(response.raw_data.as_deref(), Some(&b"\x89PNG"[..]));
    }

    #[tokio::test]
    async fn invalid_json_keeps_text() {
        let transport = Scripted {
            script: done_script(),
            status: 200,
            headers: "content-type: application/json\r\n".into(),
            body: b"{oops",
            ..Scripted::default()
        };
        let mut request = HttpWebRequest::with_transport("http://localhost/", transport).unwrap();
        let response = request.send_async().await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.json_data, None);
        assert_eq!(response.text_data.as_deref(), Some("{oops"));
    }

    #[tokio::test]
    async fn zero_status_defers_to_error_signal() {
        let transport = Scripted {
            script: vec![
                TransportSignal::ReadyStateChange(4),
                TransportSignal::Download(ProgressSignal::bare(SignalKind::Error)),
            ],
            status: 0,
            ..Scripted::default()
        };
        let mut request = HttpWebRequest::with_transport("http://localhost/", transport).unwrap();
        let response = request.send_async().await.unwrap();

        assert_eq!(response.status, status::ERROR);
        assert_eq!(response.message.as_deref(), Some(ERROR_MESSAGE));
        assert!(response.request_options.is_some());
    }

    #[tokio::test]
    async fn first_resolution_wins() {
        let transport = Scripted {
            script: vec![
                TransportSignal::ReadyStateChange(4),
                TransportSignal::Download(ProgressSignal::bare(SignalKind::Error)),
            ],
            status: 500,
            ..Scripted::default()
        };
        let mut request = HttpWebRequest::with_transport("http://localhost/", transport).unwrap();

        let errors = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&errors);
        request
            .events()
            .add_event_listener(HttpEvent::DownloadError, move |_| *counter.lock() += 1);

        let response = request.send_async().await.unwrap();

        assert_eq!(response.status, 500);
        assert_eq!(*errors.lock(), 1);
    }

    #[tokio::test]
    async fn abort_before_send_resolves_aborted() {
        let transport = Scripted {
            script: vec![TransportSignal::ReadyStateChange(1)],
            ..Scripted::default()
        };
        let mut request = HttpWebRequest::with_transport("http://localhost/", transport).unwrap();
        request.abort();

        let response = request.send_async().await.unwrap();

        assert_eq!(response.status, status::ABORTED);
        assert_eq!(response.message.as_deref(), Some(ABORTED_MESSAGE));
    }

    #[tokio::test]
    async fn closed_channel_resolves_error() {
        struct Silent;

        impl Transport for Silent {
            fn open(&mut self, _request: OpenRequest) {}
            fn set_request_header(&mut self, _name: &str, _value: &str) {}
            fn send(&mut self, _body: Option<TransportBody>, _signals: SignalSink) {}
            fn abort(&mut self) {}
            fn ready_state(&self) -> u8 {
                0
            }
            fn status(&self) -> u16 {
                0
            }
            fn response(&self) -> Bytes {
                Bytes::new()
            }
            fn response_header(&self, _name: &str) -> Option<String> {
                None
            }
            fn all_response_headers(&self) -> String {
                String::new()
            }
        }

        let mut request = HttpWebRequest::with_transport("http://localhost/", Silent).unwrap();
        let response = request.send_async().await.unwrap();

        assert_eq!(response.status, status::ERROR);
    }

    #[tokio::test]
    async fn second_send_is_rejected() {
        let transport = Scripted {
            script: done_script(),
            status: 200,
            ..Scripted::default()
        };
        let mut request = HttpWebRequest::with_transport("http://localhost/", transport).unwrap();
        request.send_async().await.unwrap();

        assert!(matches!(request.send_async().await, Err(Error::AlreadySent)));
    }

    #[test]
    fn headers_are_unavailable_before_received() {
        let transport = Scripted {
            headers: "a: 1\r\n".into(),
            ..Scripted::default()
        };
        let mut request = HttpWebRequest::with_transport("http://localhost/", transport).unwrap();

        assert!(request.response_headers().is_none());
        request.state = RequestState::HeadersReceived;
        assert_eq!(request.response_headers().map(|headers| headers.len()), Some(1));
    }
}
