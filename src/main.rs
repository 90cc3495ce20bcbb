use authclient::client::{RequestOutcome, RequestSpec};
use authclient::config::{config_schema, load_config};
use authclient::startup::build_executor;
use authclient::utils::logger::init_logging;
use clap::Parser;
use reqwest::Method;
use serde_json::Value;
use tracing::error;

/// Sends one authenticated request, refreshing the session if needed.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the YAML configuration
    #[arg(short, long, default_value = "./config.yaml")]
    config: String,

    /// Print the configuration JSON schema and exit
    #[arg(long, conflicts_with_all = ["method", "target", "body", "metrics"])]
    schema: bool,

    /// Print Prometheus metrics to stderr after the call
    #[arg(long)]
    metrics: bool,

    /// HTTP method, e.g. GET or post
    #[arg(required_unless_present = "schema", value_parser = parse_method)]
    method: Option<Method>,

    /// Path relative to the configured base URL, or an absolute URL
    #[arg(required_unless_present = "schema")]
    target: Option<String>,

    /// JSON request body
    #[arg(value_parser = parse_json)]
    body: Option<Value>,
}

fn parse_method(raw: &str) -> Result<Method, String> {
    raw.to_uppercase()
        .parse::<Method>()
        .map_err(|e| format!("Invalid method: {}", e))
}

fn parse_json(raw: &str) -> Result<Value, String> {
    serde_json::from_str(raw).map_err(|e| format!("Invalid JSON body: {}", e))
}

fn exit_code(outcome: &RequestOutcome) -> i32 {
    match outcome {
        RequestOutcome::Success(_) => 0,
        RequestOutcome::ClientFailure { .. } => 1,
        RequestOutcome::NetworkFailure { .. } => 3,
        RequestOutcome::AuthRequired => 4,
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if args.schema {
        match config_schema() {
            Ok(schema) => println!("{}", schema),
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    let config = match load_config(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = init_logging(&config.logging) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    let executor = match build_executor(&config) {
        Ok(executor) => executor,
        Err(e) => {
            error!("Failed to build client: {}", e);
            std::process::exit(1);
        }
    };

    // Both are required unless --schema was given, which returned above.
    let (Some(method), Some(target)) = (args.method, args.target) else {
        eprintln!("A method and a target are required");
        std::process::exit(2);
    };
    let mut spec = RequestSpec::new(method, target);
    if let Some(body) = &args.body {
        spec = match spec.json(body) {
            Ok(spec) => spec,
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(2);
            }
        };
    }

    let outcome = executor.execute(spec).await;
    match &outcome {
        RequestOutcome::Success(payload) => println!("{}", payload.body),
        RequestOutcome::ClientFailure { status, message } => {
            eprintln!("Request failed with {}: {}", status, message)
        }
        RequestOutcome::NetworkFailure { message } => eprintln!("{}", message),
        RequestOutcome::AuthRequired => eprintln!("Session expired; please log in again"),
    }

    if args.metrics {
        match executor.metrics().render() {
            Ok(text) => eprint!("{}", text),
            Err(e) => error!("{}", e),
        }
    }
    std::process::exit(exit_code(&outcome));
}
