use std::time::Duration;

use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

/// Desktop User-Agent pool, one picked at random per request.
pub const USER_AGENTS: [&str; 6] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:122.0) Gecko/20100101 Firefox/122.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
];

const ACCEPT_LANGUAGES: [&str; 3] = ["en-US,en;q=0.9", "en-GB,en;q=0.8", "en-CA,en;q=0.7"];

const CHROME_PLATFORMS: [&str; 3] = ["\"Windows\"", "\"macOS\"", "\"Linux\""];

lazy_static! {
    static ref CHROME_VERSION: Regex = Regex::new(r"Chrome/(\d+)").unwrap();
}

/// Build a realistic browser header set for one upstream request.
///
/// Headers are inserted in the order a browser emits them; hyper preserves
/// insertion order on the wire. Accept-Encoding and Content-Type are owned
/// by reqwest (content decoding and multipart boundary respectively).
pub fn realistic_headers() -> HeaderMap {
    let mut rng = rand::thread_rng();
    let user_agent = USER_AGENTS[rng.gen_range(0..USER_AGENTS.len())];
    let accept_language = ACCEPT_LANGUAGES[rng.gen_range(0..ACCEPT_LANGUAGES.len())];

    let mut headers = HeaderMap::new();
    headers.insert("accept", HeaderValue::from_static("application/json, audio/*"));
    headers.insert("accept-language", HeaderValue::from_static(accept_language));
    headers.insert("cache-control", HeaderValue::from_static("no-cache"));
    headers.insert("dnt", HeaderValue::from_static("1"));
    headers.insert("pragma", HeaderValue::from_static("no-cache"));
    headers.insert("user-agent", HeaderValue::from_static(user_agent));

    if user_agent.to_lowercase().contains("chrome") {
        let version = CHROME_VERSION
            .captures(user_agent)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
            .unwrap_or("121");
        let platform = CHROME_PLATFORMS[rng.gen_range(0..CHROME_PLATFORMS.len())];

        let sec_ch_ua = format!(
            "\"Google Chrome\";v=\"{v}\", \"Chromium\";v=\"{v}\", \"Not A(Brand\";v=\"99\"",
            v = version
        );
        if let Ok(value) = HeaderValue::from_str(&sec_ch_ua) {
            headers.insert("sec-ch-ua", value);
        }
        headers.insert("sec-ch-ua-mobile", HeaderValue::from_static("?0"));
        if let Ok(value) = HeaderValue::from_str(platform) {
            headers.insert("sec-ch-ua-platform", value);
        }
        headers.insert("sec-fetch-dest", HeaderValue::from_static("empty"));
        headers.insert("sec-fetch-mode", HeaderValue::from_static("cors"));
        headers.insert("sec-fetch-site", HeaderValue::from_static("same-origin"));
    }

    if rng.gen_bool(0.5) {
        headers.insert(
            HeaderName::from_static("upgrade-insecure-requests"),
            HeaderValue::from_static("1"),
        );
    }

    headers
}

/// Exponential backoff with jitter for retry attempt `attempt` (0-based).
///
/// delay = base * 2^attempt, jitter in [0.1, 0.3) of the delay, capped at
/// `max_secs`.
pub fn exponential_backoff(attempt: u32, base_secs: f64, max_secs: f64) -> Duration {
    let delay = base_secs * 2f64.powi(attempt.min(16) as i32);
    let jitter = (0.1 + rand::thread_rng().gen::<f64>() * 0.2) * delay;
    Duration::from_secs_f64((delay + jitter).min(max_secs))
}
