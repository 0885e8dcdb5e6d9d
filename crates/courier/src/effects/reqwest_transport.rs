//! [`Transport`] on top of `reqwest`.
//!
//! Each exchange runs on a spawned tokio task that replays what a browser
//! `XMLHttpRequest` would report: ready states 1 through 4, upload
//! start/progress/load/loadend once the request has been written, and
//! download progress per received chunk.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, Proxy, RequestBuilder};
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use super::transport::{
    OpenRequest, ProgressSignal, SignalKind, SignalSink, Transport, TransportFactory,
};
use crate::core::TransportBody;
use crate::data::{FormData, FormValue, HttpMethod};

/// Settings for the shared `reqwest` client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Proxy URLs. `https` proxies serve HTTPS traffic, the rest plain HTTP.
    pub proxies: Vec<String>,
    pub user_agent: Option<String>,
    pub connect_timeout_ms: Option<u64>,
}

impl ClientSettings {
    pub fn build(&self) -> reqwest::Result<Client> {
        let mut cb = Client::builder();

        let (secure, insecure): (Vec<&String>, Vec<&String>) =
            self.proxies.iter().partition(|u| u.starts_with("https://"));

        for u in secure {
            cb = cb.proxy(Proxy::https(u.as_str())?);
        }

        for u in insecure {
            cb = cb.proxy(Proxy::http(u.as_str())?);
        }

        if let Some(user_agent) = &self.user_agent {
            cb = cb.user_agent(user_agent);
        }

        if let Some(ms) = self.connect_timeout_ms {
            cb = cb.connect_timeout(Duration::from_millis(ms));
        }

        cb.build()
    }
}

/// Creates [`ReqwestTransport`]s sharing one lazily built client.
#[derive(Debug, Default)]
pub struct ReqwestTransportFactory {
    settings: ClientSettings,
    client: OnceCell<Client>,
}

impl ReqwestTransportFactory {
    pub fn new(settings: ClientSettings) -> Self {
        Self {
            settings,
            client: OnceCell::new(),
        }
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }
}

impl TransportFactory for ReqwestTransportFactory {
    type Transport = ReqwestTransport;
    type Error = reqwest::Error;

    fn create(&self) -> Result<ReqwestTransport, reqwest::Error> {
        let client = self.client.get_or_try_init(|| self.settings.build())?;
        Ok(ReqwestTransport::new(client.clone()))
    }
}

#[derive(Debug, Default)]
struct Exchange {
    ready_state: u8,
    status: u16,
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl Exchange {
    fn fail(&mut self) {
        self.ready_state = 4;
        self.status = 0;
        self.headers.clear();
        self.body = Bytes::new();
    }
}

pub struct ReqwestTransport {
    client: Client,
    request: Option<OpenRequest>,
    headers: Vec<(String, String)>,
    exchange: Arc<Mutex<Exchange>>,
    task: Option<JoinHandle<()>>,
    signals: Option<SignalSink>,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            request: None,
            headers: Vec::new(),
            exchange: Arc::default(),
            task: None,
            signals: None,
        }
    }

    fn build(&self, request: &OpenRequest, body: Option<TransportBody>) -> reqwest::Result<RequestBuilder> {
        let mut builder = self.client.request(method(request.method), &request.url);

        if !request.timeout.is_zero() {
            builder = builder.timeout(request.timeout);
        }
        if request.with_credentials {
            trace!("credentials flag has no effect outside a browser");
        }

        for (name, value) in &self.headers {
            builder = builder.header(name, value);
        }

        let builder = match body {
            None => builder,
            Some(TransportBody::Text(text)) => builder.body(text),
            Some(TransportBody::Bytes(bytes)) => builder.body(bytes),
            Some(TransportBody::Form(form)) => builder.multipart(multipart(form)?),
            Some(TransportBody::UrlEncoded(pairs)) => builder.form(&pairs),
        };

        Ok(builder)
    }
}

impl Transport for ReqwestTransport {
    fn open(&mut self, request: OpenRequest) {
        self.exchange.lock().ready_state = 1;
        self.request = Some(request);
    }

    fn set_request_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    fn send(&mut self, body: Option<TransportBody>, signals: SignalSink) {
        let upload_total = body.as_ref().and_then(TransportBody::known_length);
        let built = match &self.request {
            Some(request) => self.build(request, body).map_err(|e| e.to_string()),
            None => Err("send before open".to_string()),
        };

        self.signals = Some(signals.clone());
        signals.ready_state(1);

        match built {
            Ok(builder) => {
                let exchange = Arc::clone(&self.exchange);
                self.task = Some(tokio::spawn(run(builder, upload_total, exchange, signals)));
            }
            Err(reason) => {
                debug!(%reason, "request could not be built");
                self.exchange.lock().fail();
                signals.ready_state(4);
                signals.download(ProgressSignal::bare(SignalKind::Error));
                signals.download(ProgressSignal::bare(SignalKind::End));
            }
        }
    }

    fn abort(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        if task.is_finished() {
            return;
        }

        task.abort();
        self.exchange.lock().fail();

        if let Some(signals) = &self.signals {
            signals.ready_state(4);
            signals.download(ProgressSignal::bare(SignalKind::Abort));
            signals.download(ProgressSignal::bare(SignalKind::End));
        }
    }

    fn ready_state(&self) -> u8 {
        self.exchange.lock().ready_state
    }

    fn status(&self) -> u16 {
        self.exchange.lock().status
    }

    fn response(&self) -> Bytes {
        self.exchange.lock().body.clone()
    }

    fn response_header(&self, name: &str) -> Option<String> {
        let exchange = self.exchange.lock();
        let values: Vec<&str> = exchange
            .headers
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
            .collect();

        (!values.is_empty()).then(|| values.join(", "))
    }

    fn all_response_headers(&self) -> String {
        self.exchange
            .lock()
            .headers
            .iter()
            .map(|(name, value)| format!("{name}: {value}\r\n"))
            .collect()
    }
}

impl Drop for ReqwestTransport {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run(
    builder: RequestBuilder,
    upload_total: Option<u64>,
    exchange: Arc<Mutex<Exchange>>,
    signals: SignalSink,
) {
    signals.upload(ProgressSignal::new(SignalKind::Start, 0, upload_total));

    let mut response = match builder.send().await {
        Ok(response) => response,
        Err(e) => return fail(&exchange, &signals, &e),
    };

    let uploaded = upload_total.unwrap_or(0);
    signals.upload(ProgressSignal::new(SignalKind::Progress, uploaded, upload_total));
    signals.upload(ProgressSignal::new(SignalKind::Success, uploaded, upload_total));
    signals.upload(ProgressSignal::new(SignalKind::End, uploaded, upload_total));

    {
        let mut exchange = exchange.lock();
        exchange.status = response.status().as_u16();
        exchange.headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        exchange.ready_state = 2;
    }
    signals.ready_state(2);

    let total = response.content_length();
    signals.download(ProgressSignal::new(SignalKind::Start, 0, total));

    exchange.lock().ready_state = 3;
    signals.ready_state(3);

    let mut body = Vec::with_capacity(total.unwrap_or(0).min(1 << 20) as usize);
    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                body.extend_from_slice(&chunk);
                signals.download(ProgressSignal::new(SignalKind::Progress, body.len() as u64, total));
            }
            Ok(None) => break,
            Err(e) => return fail(&exchange, &signals, &e),
        }
    }

    let loaded = body.len() as u64;
    {
        let mut exchange = exchange.lock();
        exchange.body = Bytes::from(body);
        exchange.ready_state = 4;
    }
    signals.ready_state(4);
    signals.download(ProgressSignal::new(SignalKind::Success, loaded, total));
    signals.download(ProgressSignal::new(SignalKind::End, loaded, total));
}

fn fail(exchange: &Mutex<Exchange>, signals: &SignalSink, error: &reqwest::Error) {
    debug!(%error, timeout = error.is_timeout(), "exchange failed");
    exchange.lock().fail();

    let kind = if error.is_timeout() {
        SignalKind::Timeout
    } else {
        SignalKind::Error
    };

    signals.ready_state(4);
    signals.download(ProgressSignal::bare(kind));
    signals.download(ProgressSignal::bare(SignalKind::End));
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
        HttpMethod::Head => Method::HEAD,
        HttpMethod::Options => Method::OPTIONS,
    }
}

fn multipart(form: FormData) -> reqwest::Result<Form> {
    let mut multipart = Form::new();

    for (name, value) in form {
        multipart = match value {
            FormValue::Text(text) => multipart.text(name, text),
            FormValue::Blob(blob) => {
                let mut part = Part::bytes(blob.data.to_vec());
                if let Some(file_name) = blob.file_name {
                    part = part.file_name(file_name);
                }
                if let Some(content_type) = &blob.content_type {
                    part = part.mime_str(content_type)?;
                }
                multipart.part(name, part)
            }
        };
    }

    Ok(multipart)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_build_default_client() {
        assert!(ClientSettings::default().build().is_ok());
    }

    #[test]
    fn settings_reject_bad_proxy() {
        let settings = ClientSettings {
            proxies: vec!["not a url".into()],
            ..ClientSettings::default()
        };
        assert!(settings.build().is_err());
    }

    #[test]
    fn settings_from_toml_shape() {
        let settings: ClientSettings = serde_json::from_value(serde_json::json!({
            "user_agent": "courier-test",
            "connect_timeout_ms": 500,
        }))
        .unwrap();

        assert_eq!(settings.user_agent.as_deref(), Some("courier-test"));
        assert_eq!(settings.connect_timeout_ms, Some(500));
        assert!(settings.proxies.is_empty());
    }

    #[test]
    fn factory_shares_one_client() {
        let factory = ReqwestTransportFactory::default();
        factory.create().unwrap();
        factory.create().unwrap();
        assert!(factory.client.get().is_some());
    }

    #[test]
    fn header_lookup_joins_repeats() {
        let transport = ReqwestTransport::new(Client::new());
        transport.exchange.lock().headers = vec![
            ("set-cookie".into(), "a".into()),
            ("content-type".into(), "text/plain".into()),
            ("set-cookie".into(), "b".into()),
        ];

        assert_eq!(transport.response_header("Set-Cookie").as_deref(), Some("a, b"));
        assert_eq!(transport.response_header("x-missing"), None);
        assert_eq!(
            transport.all_response_headers(),
            "set-cookie: a\r\ncontent-type: text/plain\r\nset-cookie: b\r\n"
        );
    }
}
