/// CLI argument parsing and help text

pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!("TTSFM Server v{}", version);
    println!("OpenAI-compatible TTS gateway with long-text streaming");
    println!();
    println!("USAGE:");
    println!("    ttsfm-server [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --host <HOST>            Server host (default: 0.0.0.0)");
    println!("    --port <PORT>            Server port (default: 8080)");
    println!("    --api-keys <KEYS>        Comma-separated API keys (optional)");
    println!("    --enable-auth            Enable API key authentication");
    println!("    --enable-rate-limit      Enable rate limiting");
    println!("    --rate-limit <N>         Requests per second limit (default: 10)");
    println!("    --timeout <SECONDS>      Request timeout in seconds (default: 60)");
    println!("    --base-url <URL>         TTS service base URL (default: https://www.openai.fm)");
    println!("    -h, --help               Print this help message");
    println!("    -v, --version            Print version information");
    println!();
    println!("SERVER ENDPOINTS:");
    println!("    POST   /v1/audio/speech  - Generate speech (OpenAI-compatible)");
    println!("    POST   /api/speech       - Alias of /v1/audio/speech");
    println!("    GET    /v1/voices        - List available voices");
    println!("    GET    /v1/formats       - List supported audio formats");
    println!("    GET    /health           - Health check");
    println!();
    println!("ENVIRONMENT VARIABLES:");
    println!("    TTSFM_HOST               - Override server host");
    println!("    TTSFM_PORT               - Override server port");
    println!("    TTSFM_API_KEYS           - Override API key list");
    println!("    TTSFM_ENABLE_AUTH        - Enable authentication (true/false)");
    println!("    TTSFM_ENABLE_RATE_LIMIT  - Enable rate limiting (true/false)");
    println!("    TTSFM_RATE_LIMIT         - Requests per second limit");
    println!("    TTSFM_BASE_URL           - Upstream service base URL");
    println!("    RUST_LOG                 - Log level (error/warn/info/debug/trace)");
    println!();
    println!("CONFIGURATION:");
    println!("    Settings can also be provided via a .env file in the working directory.");
}

pub fn print_version() {
    println!("TTSFM Server v{}", env!("CARGO_PKG_VERSION"));
}
