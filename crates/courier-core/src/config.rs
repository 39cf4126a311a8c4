//! WorkerConfig - 環境変数からの起動設定
//!
//! | 変数 | 既定値 |
//! |------|--------|
//! | `ENABLE_DOMAINS` | なし（空 = ワーカーなし） |
//! | `ENGINE_ENDPOINT` | `localhost:7233` |
//! | `APP_ENV` | `DEV` |
//! | `WORKER_MAX_CONCURRENT_TASKS` | `100` |
//! | `WORKER_SHUTDOWN_GRACE_SECS` | `30` |
//! | `COURIER_RUN_DEMO` | `false` |

use std::env;
use std::fmt;
use std::time::Duration;

pub const ENABLE_DOMAINS: &str = "ENABLE_DOMAINS";
pub const ENGINE_ENDPOINT: &str = "ENGINE_ENDPOINT";
pub const APP_ENV: &str = "APP_ENV";
pub const WORKER_MAX_CONCURRENT_TASKS: &str = "WORKER_MAX_CONCURRENT_TASKS";
pub const WORKER_SHUTDOWN_GRACE_SECS: &str = "WORKER_SHUTDOWN_GRACE_SECS";
pub const COURIER_RUN_DEMO: &str = "COURIER_RUN_DEMO";

pub const DEFAULT_ENGINE_ENDPOINT: &str = "localhost:7233";
pub const DEFAULT_MAX_CONCURRENT_TASKS: usize = 100;
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// 実行環境。ドメインが本物の外部サービスかモックかを選ぶのに使う
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AppEnv {
    #[default]
    Dev,
    Prod,
}

impl AppEnv {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "DEV" => Ok(AppEnv::Dev),
            "PROD" => Ok(AppEnv::Prod),
            other => Err(ConfigError::invalid(
                APP_ENV,
                format!("expected DEV or PROD, got '{other}'"),
            )),
        }
    }
}

impl fmt::Display for AppEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppEnv::Dev => f.write_str("DEV"),
            AppEnv::Prod => f.write_str("PROD"),
        }
    }
}

/// ワーカープロセスの設定
///
/// 起動時に一度だけ読み込み、以後は読み取り専用で共有します。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    enabled_domains: Vec<String>,
    engine_endpoint: String,
    app_env: AppEnv,
    max_concurrent_tasks: usize,
    shutdown_grace: Duration,
    run_demo: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled_domains: Vec::new(),
            engine_endpoint: DEFAULT_ENGINE_ENDPOINT.to_string(),
            app_env: AppEnv::Dev,
            max_concurrent_tasks: DEFAULT_MAX_CONCURRENT_TASKS,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            run_demo: false,
        }
    }
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 任意の lookup 関数から読み込む（テストでは HashMap を渡す）
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENABLE_DOMAINS) {
            config.enabled_domains = parse_domain_list(&raw);
        }

        if let Some(raw) = lookup(ENGINE_ENDPOINT)
            && !raw.trim().is_empty()
        {
            split_endpoint(&raw).map_err(|reason| ConfigError::invalid(ENGINE_ENDPOINT, reason))?;
            config.engine_endpoint = raw.trim().to_string();
        }

        if let Some(raw) = lookup(APP_ENV)
            && !raw.trim().is_empty()
        {
            config.app_env = AppEnv::parse(&raw)?;
        }

        if let Some(raw) = lookup(WORKER_MAX_CONCURRENT_TASKS) {
            config.max_concurrent_tasks = match raw.trim().parse::<usize>() {
                Ok(0) | Err(_) => {
                    return Err(ConfigError::invalid(
                        WORKER_MAX_CONCURRENT_TASKS,
                        format!("expected a positive integer, got '{raw}'"),
                    ));
                }
                Ok(n) => n,
            };
        }

        if let Some(raw) = lookup(WORKER_SHUTDOWN_GRACE_SECS) {
            let secs = raw.trim().parse::<u64>().map_err(|_| {
                ConfigError::invalid(
                    WORKER_SHUTDOWN_GRACE_SECS,
                    format!("expected a number of seconds, got '{raw}'"),
                )
            })?;
            config.shutdown_grace = Duration::from_secs(secs);
        }

        if let Some(raw) = lookup(COURIER_RUN_DEMO) {
            config.run_demo = parse_flag(COURIER_RUN_DEMO, &raw)?;
        }

        Ok(config)
    }

    pub fn with_enabled_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined: Vec<String> = domains.into_iter().map(|d| d.as_ref().to_string()).collect();
        self.enabled_domains = parse_domain_list(&joined.join(","));
        self
    }

    pub fn with_app_env(mut self, app_env: AppEnv) -> Self {
        self.app_env = app_env;
        self
    }

    pub fn with_max_concurrent_tasks(mut self, max_concurrent_tasks: usize) -> Self {
        self.max_concurrent_tasks = max_concurrent_tasks;
        self
    }

    pub fn with_shutdown_grace(mut self, shutdown_grace: Duration) -> Self {
        self.shutdown_grace = shutdown_grace;
        self
    }

    pub fn enabled_domains(&self) -> &[String] {
        &self.enabled_domains
    }

    pub fn engine_endpoint(&self) -> &str {
        &self.engine_endpoint
    }

    pub fn app_env(&self) -> AppEnv {
        self.app_env
    }

    pub fn max_concurrent_tasks(&self) -> usize {
        self.max_concurrent_tasks
    }

    /// shutdown 後、実行中のタスクを待つ上限
    pub fn shutdown_grace(&self) -> Duration {
        self.shutdown_grace
    }

    pub fn run_demo(&self) -> bool {
        self.run_demo
    }
}

/// カンマ区切りのドメイン一覧を解析
///
/// 前後の空白を除き、空要素と重複を捨てます（最初の出現順を保つ）。
pub fn parse_domain_list(raw: &str) -> Vec<String> {
    let mut domains: Vec<String> = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|name| !name.is_empty()) {
        if !domains.iter().any(|seen| seen == name) {
            domains.push(name.to_string());
        }
    }
    domains
}

/// `host:port` を分解
pub fn split_endpoint(endpoint: &str) -> Result<(&str, u16), String> {
    let endpoint = endpoint.trim();
    let (host, port) = endpoint
        .rsplit_once(':')
        .ok_or_else(|| format!("'{endpoint}' is not in host:port form"))?;
    if host.is_empty() {
        return Err(format!("'{endpoint}' has an empty host"));
    }
    let port = port
        .parse::<u16>()
        .map_err(|_| format!("'{port}' is not a valid port"))?;
    Ok((host, port))
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "no" => Ok(false),
        "1" | "true" | "yes" => Ok(true),
        other => Err(ConfigError::invalid(
            key,
            format!("expected true or false, got '{other}'"),
        )),
    }
}
