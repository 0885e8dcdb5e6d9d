//! Progress bars driven by request events.

use courier::{EventManager, HttpEvent, HttpEventArgs};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use once_cell::sync::Lazy;

const PB_STYLE: &str =
    "{prefix:>8} {spinner:.blue} [{elapsed_precise}] {wide_bar:.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";

const TICK: &str = "⠁⠂⠄⡀⢀⠠⠐⠈ ";

const PB_CHARS: &str = "█▓▒░  ";

static PB_TEMPLATE: Lazy<ProgressStyle> = Lazy::new(|| match ProgressStyle::with_template(PB_STYLE) {
    Ok(style) => style.tick_chars(TICK).progress_chars(PB_CHARS),
    Err(_) => ProgressStyle::default_bar(),
});

/// One bar per direction of the exchange.
pub struct TransferTracker {
    _bars: MultiProgress,
    upload: ProgressBar,
    download: ProgressBar,
}

impl TransferTracker {
    pub fn new() -> Self {
        let bars = MultiProgress::new();
        let upload = bars.add(Self::bar("upload"));
        let download = bars.add(Self::bar("download"));

        Self {
            _bars: bars,
            upload,
            download,
        }
    }

    fn bar(prefix: &'static str) -> ProgressBar {
        let pb = ProgressBar::no_length();
        pb.set_style(PB_TEMPLATE.clone());
        pb.set_prefix(prefix);
        pb
    }

    /// Register listeners that move the bars.
    pub fn attach(&self, events: &EventManager<HttpEventArgs>) {
        for event in HttpEvent::ALL {
            let bar = if event.is_upload() {
                self.upload.clone()
            } else {
                self.download.clone()
            };

            events.add_event_listener(event, move |args: &HttpEventArgs| step(&bar, args));
        }
    }

    pub fn finish(&self) {
        self.upload.finish_and_clear();
        self.download.finish_and_clear();
    }
}

fn step(bar: &ProgressBar, args: &HttpEventArgs) {
    if args.is_progress_computable && args.content_length > 0 {
        bar.set_length(args.content_length);
    }

    let transferred = args.bytes_uploaded.or(args.bytes_downloaded).unwrap_or(0);

    match args.event {
        HttpEvent::UploadProgressChange | HttpEvent::DownloadProgressChange => {
            bar.set_position(transferred);
        }
        HttpEvent::UploadComplete | HttpEvent::DownloadComplete => {
            bar.set_position(transferred);
            bar.finish();
        }
        HttpEvent::UploadAbort
        | HttpEvent::UploadTimeout
        | HttpEvent::UploadError
        | HttpEvent::DownloadAbort
        | HttpEvent::DownloadTimeout
        | HttpEvent::DownloadError => bar.abandon_with_message(args.event.as_str()),
        HttpEvent::StateChange => bar.set_message(args.state_name()),
        _ => bar.tick(),
    }
}
