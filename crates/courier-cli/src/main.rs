use std::io::Write;

use anyhow::{Result, bail};
use clap::Parser;
use console::style;
use courier::{HttpClient, HttpResponse, ReqwestTransportFactory};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::tracker::TransferTracker;

mod app;
mod config;
mod tracker;

const LOG_ENV: &str = "COURIER_LOG";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let app = App::parse();
    let config = app.load_config()?;
    let options = app.request_options(&config);
    debug!(?options, "request options");

    let client = HttpClient::new(ReqwestTransportFactory::new(config.client.clone()));
    if !client.is_supported() {
        bail!("no HTTP transport could be created with the given client settings");
    }

    let tracker = (!app.quiet).then(TransferTracker::new);
    if let Some(tracker) = &tracker {
        tracker.attach(client.events());
    }

    let response = client.send_request_async(options).await;

    if let Some(tracker) = &tracker {
        tracker.finish();
    }

    if response.is_client_failure() {
        bail!(
            "{} ({})",
            response.message.as_deref().unwrap_or("request failed"),
            response.status
        );
    }

    print_head(&response);
    write_body(&app, &response)
}

fn print_head(response: &HttpResponse) {
    let status = match response.status {
        200..=299 => style(response.status).green(),
        300..=399 => style(response.status).yellow(),
        _ => style(response.status).red(),
    };
    eprintln!("{} {}", style("HTTP").bold(), status.bold());

    for (name, value) in response.headers.iter().flatten() {
        for value in value.values() {
            eprintln!("{}: {}", style(name).cyan(), style(value).dim());
        }
    }
    eprintln!();
}

fn write_body(app: &App, response: &HttpResponse) -> Result<()> {
    let raw = response.raw_data.as_deref().unwrap_or_default();

    if let Some(path) = &app.output {
        std::fs::write(path, raw)?;
        eprintln!("{} {} bytes to {}", style("wrote").green(), raw.len(), path.display());
        return Ok(());
    }

    let mut stdout = std::io::stdout().lock();
    match &response.json_data {
        Some(json) => writeln!(stdout, "{}", serde_json::to_string_pretty(json)?)?,
        None => stdout.write_all(raw)?,
    }
    stdout.flush()?;

    Ok(())
}
