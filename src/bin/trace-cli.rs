use clap::{Parser, Subcommand};
use serde_json::{json, Map, Value};

use xray_propagation::health::classify;
use xray_propagation::propagation::header::SAMPLED_NO;
use xray_propagation::propagation::{TraceHeader, X_AMZN_TRACE_ID};

#[derive(Parser)]
#[command(name = "trace-cli")]
#[command(about = "Inspect X-Ray trace headers and probe traced services", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse an x-amzn-trace-id value
    Parse { header: String },
    /// Show the health flags a status code maps to
    Classify { status: i64 },
    /// Send a request and show the trace header that comes back
    Probe {
        #[arg(short, long, default_value = "http://localhost:8080/")]
        url: String,

        /// x-amzn-trace-id value to send
        #[arg(short = 'H', long)]
        header: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Parse { header } => print_json(&describe_header(&TraceHeader::parse(&header)))?,
        Commands::Classify { status } => print_json(&serde_json::to_value(classify(status))?)?,
        Commands::Probe { url, header } => {
            let mut request = reqwest::Client::new().get(&url);
            if let Some(header) = &header {
                request = request.header(X_AMZN_TRACE_ID, header);
            }
            let res = request.send().await?;

            let returned = res
                .headers()
                .get(X_AMZN_TRACE_ID)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let parsed = returned.as_deref().map(|raw| describe_header(&TraceHeader::parse(raw)));

            print_json(&json!({
                "status": res.status().as_u16(),
                "sent": header,
                "returned": returned,
                "parsed": parsed,
            }))?;
        }
    }

    Ok(())
}

fn describe_header(header: &TraceHeader) -> Value {
    let fields: Map<String, Value> = header
        .iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect();
    json!({
        "fields": fields,
        "root": header.root(),
        "parent": header.parent(),
        "sampled": header.sampled().map_or(true, |v| v != SAMPLED_NO),
    })
}

fn print_json(value: &Value) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
