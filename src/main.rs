use std::process::ExitCode;
use std::str::FromStr;

use pitchstats::{AppConfig, Backend, RequestParams, catalog};

const USAGE: &str = "usage: pitchstats <query> <sql|mongo> [key=value ...] [--perf]";

struct Invocation {
    query: String,
    backend: Backend,
    params: RequestParams,
    verbose: bool,
}

fn parse_args(args: &[String]) -> Result<Invocation, String> {
    let verbose = args.iter().any(|arg| arg == "--perf");
    let (pairs, positional): (Vec<&str>, Vec<&str>) = args
        .iter()
        .map(String::as_str)
        .filter(|arg| *arg != "--perf")
        .partition(|arg| arg.contains('='));
    let params: RequestParams = pairs
        .into_iter()
        .filter_map(|arg| arg.split_once('='))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    let [query, backend] = positional[..] else {
        return Err(USAGE.to_string());
    };
    Ok(Invocation {
        query: query.to_string(),
        backend: Backend::from_str(backend)?,
        params,
        verbose,
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    pitchstats::init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let invocation = match parse_args(&args) {
        Ok(invocation) => invocation,
        Err(message) => {
            eprintln!("{}", message);
            eprintln!("queries: {}", catalog::names().join(", "));
            return ExitCode::from(2);
        }
    };

    let result = async {
        let config = AppConfig::load()?;
        let service = pitchstats::connect_service(&config).await?;
        service
            .run(
                &invocation.query,
                invocation.backend,
                &invocation.params,
                invocation.verbose,
            )
            .await
    }
    .await;

    match result {
        Ok(payload) => match serde_json::to_string_pretty(&payload) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("could not serialize response: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            log::error!("{}", e);
            eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
            ExitCode::FAILURE
        }
    }
}
