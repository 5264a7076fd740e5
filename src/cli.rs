//! Command-line interface for chatrelay

use clap::{Parser, Subcommand};

/// Chat relay backend for FAQ answers and generated text and images
#[derive(Parser)]
#[command(name = "chatrelay")]
#[command(version)]
#[command(about = "Chat relay backend for FAQ answers and generated text and images")]
#[command(
    long_about = "chatrelay answers chat messages from a fuzzy-matched FAQ table when it \
    can, and otherwise relays them to hosted text or image models with credential rotation \
    and retry."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# chatrelay configuration
#
# Environment overrides (applied after this file is parsed):
#   S3_BUCKET_NAME, S3_REGION, REDIS_URL, GCP_KEY_PATH_<n>

[server]
# IP address to bind to (0.0.0.0 for all interfaces, 127.0.0.1 for localhost only)
host = "0.0.0.0"
port = 8000
# Origins allowed to call the API with cookies
cors_origins = ["https://lilotest.com", "http://localhost:3000", "http://localhost:8000"]

# Credential profiles, tried round-robin. Every failed backend attempt moves
# to the next profile. Key files are read when a profile is first used.
[[credentials]]
project_id = "your-first-project"
location = "us-central1"
key_path = "/run/secrets/first_project_key"

# [[credentials]]
# project_id = "your-second-project"
# location = "us-central1"
# key_path = "/run/secrets/second_project_key"

[retry]
max_attempts = 3
base_delay_ms = 1000     # doubles after each failed attempt
max_delay_ms = 60000
jitter = true            # multiply each delay by a random factor in [0.5, 1.5]

[knowledge_base]
# https URL or local path; .json files hold [{"Question": ..., "Answer": ...}]
source = "https://questions-answers-baboon.s3.eu-north-1.amazonaws.com/questions_and_answers.xlsx"
fetch_timeout_seconds = 30
support_phone = "+355676038187"
support_email = "support@baboon.al"

[text_backend]
model = "gemini-1.5-flash-002"
system_instruction = "Helpful and assisting ai."
max_output_tokens = 8192
temperature = 0.9
top_p = 0.9
request_timeout_seconds = 60
# api_base_url = "http://localhost:9000"

[image_backend]
model = "imagen-3.0-generate-002"
aspect_ratio = "1:1"
request_timeout_seconds = 120

[storage]
bucket = "lilotest-images"
region = "eu-north-1"
# endpoint_url = "http://localhost:9000"   # S3-compatible store
# access_key_file = "/run/secrets/aws_access_key"
# secret_key_file = "/run/secrets/aws_secret_key"

[session]
# Sessions are kept in-process when no Redis URL is set
# redis_url = "redis://localhost:6379/0"
expiry_seconds = 86400

[observability]
# Log level: "trace", "debug", "info", "warn", "error"
log_level = "info"
"#
}
