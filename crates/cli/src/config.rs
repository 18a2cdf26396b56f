use client::transport::HttpConfig;
use config::ConfigError;
use serde::Deserialize;
use std::{collections::HashMap, time::Duration};

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub http: HttpSettings,
    pub log: LogSettings,
}

#[derive(Deserialize, Clone)]
pub struct ServerSettings {
    pub base_url: String,
}

#[derive(Deserialize, Clone)]
pub struct HttpSettings {
    /// 0 disables the timeout.
    pub timeout_secs: u64,
    pub user_agent: Option<String>,
}

#[derive(Deserialize, Clone)]
pub struct LogSettings {
    /// `tracing_subscriber::EnvFilter` directive, overridden by `RUST_LOG`.
    pub filter: String,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());
        let env_map = collect_env_vars();
        let env_json =
            serde_json::to_string(&env_map).map_err(|e| ConfigError::Message(e.to_string()))?;

        let s = config::Config::builder()
            .set_default("server.base_url", "http://127.0.0.1:8080")?
            .set_default("http.timeout_secs", 10)?
            .set_default("log.filter", "info")?
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::File::with_name(&format!("config.{}", run_mode)).required(false))
            .add_source(config::File::from_str(&env_json, config::FileFormat::Json))
            .build()?;

        s.try_deserialize()
    }

    pub fn http_config(&self) -> HttpConfig {
        let mut http = HttpConfig::new(self.server.base_url.clone());
        if self.http.timeout_secs > 0 {
            http.timeout = Some(Duration::from_secs(self.http.timeout_secs));
        }
        http.user_agent = self.http.user_agent.clone();
        http
    }
}

/// `ISSO_HTTP__TIMEOUT_SECS=5` becomes `http.timeout_secs = "5"`.
fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(k, _)| k.starts_with("ISSO_"))
        .map(|(k, v)| {
            let new_key = k.trim_start_matches("ISSO_").replace("__", ".").to_lowercase();
            (new_key, v)
        })
        .collect()
}
