use std::fmt;
use std::sync::Arc;

use courier_event::EventArguments;

use super::options::RequestOptions;
use super::response::HttpResponse;
use super::state::RequestState;

/// Events fired while an exchange runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpEvent {
    /// Uploading has started.
    UploadStart,
    /// Uploading has finished, successfully or not.
    UploadComplete,
    /// Uploading has finished successfully.
    UploadSuccess,
    UploadProgressChange,
    UploadAbort,
    UploadTimeout,
    UploadError,

    /// Downloading has started.
    DownloadStart,
    /// Downloading has finished, successfully or not.
    DownloadComplete,
    /// Downloading has finished successfully.
    DownloadSuccess,
    DownloadProgressChange,
    DownloadAbort,
    DownloadTimeout,
    DownloadError,

    /// The lifecycle state changed.
    StateChange,
}

impl HttpEvent {
    pub const ALL: [HttpEvent; 15] = [
        Self::UploadStart,
        Self::UploadComplete,
        Self::UploadSuccess,
        Self::UploadProgressChange,
        Self::UploadAbort,
        Self::UploadTimeout,
        Self::UploadError,
        Self::DownloadStart,
        Self::DownloadComplete,
        Self::DownloadSuccess,
        Self::DownloadProgressChange,
        Self::DownloadAbort,
        Self::DownloadTimeout,
        Self::DownloadError,
        Self::StateChange,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UploadStart => "UPLOAD_START",
            Self::UploadComplete => "UPLOAD_COMPLETE",
            Self::UploadSuccess => "UPLOAD_SUCCESS",
            Self::UploadProgressChange => "UPLOAD_PROGRESS_CHANGE",
            Self::UploadAbort => "UPLOAD_ABORT",
            Self::UploadTimeout => "UPLOAD_TIMEOUT",
            Self::UploadError => "UPLOAD_ERROR",
            Self::DownloadStart => "DOWNLOAD_START",
            Self::DownloadComplete => "DOWNLOAD_COMPLETE",
            Self::DownloadSuccess => "DOWNLOAD_SUCCESS",
            Self::DownloadProgressChange => "DOWNLOAD_PROGRESS_CHANGE",
            Self::DownloadAbort => "DOWNLOAD_ABORT",
            Self::DownloadTimeout => "DOWNLOAD_TIMEOUT",
            Self::DownloadError => "DOWNLOAD_ERROR",
            Self::StateChange => "STATE_CHANGE",
        }
    }

    pub fn is_upload(&self) -> bool {
        matches!(
            self,
            Self::UploadStart
                | Self::UploadComplete
                | Self::UploadSuccess
                | Self::UploadProgressChange
                | Self::UploadAbort
                | Self::UploadTimeout
                | Self::UploadError
        )
    }
}

impl fmt::Display for HttpEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arguments delivered to event listeners.
#[derive(Debug, Clone)]
pub struct HttpEventArgs {
    pub event: HttpEvent,
    pub is_progress_computable: bool,
    /// Set on upload events.
    pub bytes_uploaded: Option<u64>,
    /// Set on download and state-change events.
    pub bytes_downloaded: Option<u64>,
    pub content_length: u64,
    /// Percentage of the direction the event belongs to (0–100).
    pub progress: f64,
    pub state: RequestState,
    pub request_options: Arc<RequestOptions>,
    /// The parsed response, on the state change that reaches
    /// [`RequestState::Done`].
    pub response: Option<HttpResponse>,
}

impl HttpEventArgs {
    pub fn state_name(&self) -> &'static str {
        self.state.name()
    }
}

impl EventArguments for HttpEventArgs {
    type Event = HttpEvent;

    fn event_type(&self) -> HttpEvent {
        self.event
    }
}
