use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use courier::{HttpMethod, RequestOptions};
use serde_json::Value;

use crate::config::Config;

#[derive(Clone, Debug, Parser)]
#[command(name = "courier", version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
pub struct App {
    /// Target URL.
    pub url: String,

    #[arg(short = 'X', long, default_value = "GET")]
    pub method: HttpMethod,

    /// Request header as `name:value`; repeatable.
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Request body. Valid JSON is sent as JSON, anything else as text.
    #[arg(short = 'd', long)]
    pub data: Option<String>,

    /// Timeout in milliseconds; 0 waits forever.
    #[arg(short = 't', long = "timeout")]
    pub timeout_ms: Option<u64>,

    /// TOML file with client settings and default headers.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write the response body here instead of stdout.
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Hide progress bars.
    #[arg(short, long)]
    pub quiet: bool,
}

impl App {
    /// Merge the arguments over `config`. Arguments win.
    pub fn request_options(&self, config: &Config) -> RequestOptions {
        let timeout_ms = self.timeout_ms.or(config.timeout_ms).unwrap_or(0);
        let mut options = RequestOptions::new(self.url.clone())
            .method(self.method)
            .timeout(Duration::from_millis(timeout_ms));

        for (name, value) in config.headers.iter().chain(self.headers.iter().map(|(n, v)| (n, v))) {
            options = options.header(name.clone(), value.clone());
        }

        if let Some(data) = &self.data {
            options = match serde_json::from_str::<Value>(data) {
                Ok(value) => options.json(value),
                Err(_) => options.body(data.clone()),
            };
        }

        options
    }

    pub fn load_config(&self) -> Result<Config> {
        match &self.config {
            Some(path) => Config::load(path).with_context(|| format!("failed to load {}", path.display())),
            None => Ok(Config::default()),
        }
    }
}

fn parse_header(raw: &str) -> Result<(String, String)> {
    let Some((name, value)) = raw.split_once(':') else {
        bail!("expected `name:value`, got `{raw}`")
    };

    let name = name.trim();
    if name.is_empty() {
        bail!("header name is empty in `{raw}`")
    }

    Ok((name.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier::RequestBody;
    use serde_json::json;

    #[test]
    fn parses_full_command_line() {
        let app = App::try_parse_from([
            "courier",
            "https://api.test/items",
            "-X",
            "POST",
            "-H",
            "Accept: application/json",
            "-H",
            "x-id:7",
            "-d",
            r#"{"a":1}"#,
            "-t",
            "1500",
        ])
        .unwrap();

        assert_eq!(app.method, HttpMethod::Post);
        assert_eq!(
            app.headers,
            vec![
                ("Accept".to_string(), "application/json".to_string()),
                ("x-id".to_string(), "7".to_string()),
            ]
        );

        let options = app.request_options(&Config::default());
        assert_eq!(options.timeout, Duration::from_millis(1500));
        assert_eq!(options.body, Some(RequestBody::Json(json!({ "a": 1 }))));
    }

    #[test]
    fn rejects_malformed_header() {
        assert!(App::try_parse_from(["courier", "http://h", "-H", "no-colon"]).is_err());
        assert!(parse_header(":v").is_err());
    }

    #[test]
    fn non_json_data_is_text() {
        let app = App::try_parse_from(["courier", "http://h", "-d", "plain words"]).unwrap();
        let options = app.request_options(&Config::default());

        assert_eq!(options.body, Some(RequestBody::Text("plain words".into())));
        assert_eq!(options.method, HttpMethod::Get);
        assert!(!options.has_timeout());
    }

    #[test]
    fn arguments_override_config() {
        let config: Config = toml::from_str(
            r#"
            timeout_ms = 200

            [headers]
            accept = "text/plain"
            "#,
        )
        .unwrap();
        let app = App::try_parse_from(["courier", "http://h", "-H", "accept:*/*", "-t", "50"]).unwrap();
        let options = app.request_options(&config);

        assert_eq!(options.timeout, Duration::from_millis(50));
        assert_eq!(options.headers.get("accept").map(String::as_str), Some("*/*"));
    }
}
