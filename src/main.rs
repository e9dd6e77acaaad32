mod cli;

use std::env;
use std::sync::Arc;
use std::time::Duration;

use ttsfm_server::auth::ApiKeys;
use ttsfm_server::config::constants::{DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT_SECS};
use ttsfm_server::error::Result;
use ttsfm_server::rate_limit::GatewayRateLimiter;
use ttsfm_server::server::{create_router, AppState};
use ttsfm_server::upstream::{ClientConfig, TtsClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if it doesn't)
    let _ = dotenvy::dotenv();

    // Default log level is INFO for the gateway, WARN for dependencies.
    // Override with RUST_LOG: RUST_LOG=debug for verbose, RUST_LOG=warn for quiet
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("ttsfm_server=info,reqwest=warn,hyper=warn")
            }),
        )
        .with_target(false)
        .compact()
        .init();

    let args: Vec<String> = env::args().collect();

    if args.contains(&"--help".to_string()) || args.contains(&"-h".to_string()) {
        cli::print_help();
        return Ok(());
    }
    if args.contains(&"--version".to_string()) || args.contains(&"-v".to_string()) {
        cli::print_version();
        return Ok(());
    }

    // Flags, then environment overrides
    let mut host = flag_value(&args, "--host").unwrap_or_else(|| "0.0.0.0".to_string());
    let mut port: u16 = flag_value(&args, "--port")
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let mut api_keys_csv = flag_value(&args, "--api-keys").unwrap_or_default();
    let mut enable_auth = args.contains(&"--enable-auth".to_string());
    let mut enable_rate_limit = args.contains(&"--enable-rate-limit".to_string());
    let mut rate_limit: u32 = flag_value(&args, "--rate-limit")
        .and_then(|r| r.parse().ok())
        .unwrap_or(10);
    let timeout_secs: u64 = flag_value(&args, "--timeout")
        .and_then(|t| t.parse().ok())
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
    let mut base_url = flag_value(&args, "--base-url").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    if let Some(env_host) = env_trimmed("TTSFM_HOST") {
        host = env_host;
    }
    if let Some(env_port) = env_trimmed("TTSFM_PORT").and_then(|p| p.parse().ok()) {
        port = env_port;
    }
    if let Some(env_keys) = env_trimmed("TTSFM_API_KEYS") {
        api_keys_csv = env_keys;
    }
    if env_bool("TTSFM_ENABLE_AUTH") {
        enable_auth = true;
    }
    if env_bool("TTSFM_ENABLE_RATE_LIMIT") {
        enable_rate_limit = true;
    }
    if let Some(env_rate) = env_trimmed("TTSFM_RATE_LIMIT").and_then(|r| r.parse().ok()) {
        rate_limit = env_rate;
    }
    if let Some(env_base) = env_trimmed("TTSFM_BASE_URL") {
        base_url = env_base;
    }

    let client = TtsClient::new(
        ClientConfig::default()
            .with_base_url(base_url.clone())
            .with_timeout(Duration::from_secs(timeout_secs)),
    )?;

    let api_keys = if enable_auth {
        let keys = ApiKeys::from_csv(&api_keys_csv);
        if keys.is_enabled() {
            tracing::info!("authentication enabled ({} key(s) configured)", keys.count());
        } else {
            tracing::warn!("authentication requested but no API keys configured; running open");
        }
        keys
    } else {
        ApiKeys::empty()
    };

    let rate_limiter = if enable_rate_limit {
        tracing::info!("rate limiting enabled: {} requests/second", rate_limit);
        Some(GatewayRateLimiter::new(rate_limit))
    } else {
        None
    };

    let state = AppState {
        client: Arc::new(client),
        api_keys,
        rate_limiter,
        auto_combine_default: true,
    };

    let app = create_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!("TTSFM Server v{}", env!("CARGO_PKG_VERSION"));
    println!("Listening on http://{}", addr);
    println!("Upstream: {}", base_url);
    println!("\nAvailable endpoints:");
    println!("  POST   /v1/audio/speech  - Generate speech (OpenAI-compatible)");
    println!("  POST   /api/speech       - Alias of /v1/audio/speech");
    println!("  GET    /v1/voices        - List available voices");
    println!("  GET    /v1/formats       - List supported audio formats");
    println!("  GET    /health           - Health check");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|pos| args.get(pos + 1))
        .cloned()
}

fn env_trimmed(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_bool(name: &str) -> bool {
    env_trimmed(name)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Resolve on SIGINT or SIGTERM to trigger graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_value() {
        let args: Vec<String> = ["bin", "--port", "9090", "--host", "127.0.0.1"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        assert_eq!(flag_value(&args, "--port"), Some("9090".to_string()));
        assert_eq!(flag_value(&args, "--host"), Some("127.0.0.1".to_string()));
        assert_eq!(flag_value(&args, "--base-url"), None);
    }

    #[test]
    fn test_flag_value_missing_operand() {
        let args: Vec<String> = ["bin", "--port"].iter().map(|s| s.to_string()).collect();
        assert_eq!(flag_value(&args, "--port"), None);
    }

    #[test]
    fn test_env_bool() {
        env::remove_var("TTSFM_TEST_BOOL");
        assert!(!env_bool("TTSFM_TEST_BOOL"));

        env::set_var("TTSFM_TEST_BOOL", "TRUE");
        assert!(env_bool("TTSFM_TEST_BOOL"));

        env::set_var("TTSFM_TEST_BOOL", "no");
        assert!(!env_bool("TTSFM_TEST_BOOL"));

        env::remove_var("TTSFM_TEST_BOOL");
    }
}
