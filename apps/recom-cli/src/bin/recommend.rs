use clap::Parser;
use serde_json::json;

use recom_cli::init_tracing;
use recom_core::config::Config;
use recom_engine::RecommenderService;

/// Print the products most similar to a free-text query as JSON
#[derive(Parser, Debug)]
#[command(name = "recom-recommend")]
struct Args {
    /// Query words; joined with spaces
    query: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing();

    let query = args.query.join(" ");
    if query.trim().is_empty() {
        println!("{}", json!({ "message": "Query must not be empty", "success": false }));
        return Ok(());
    }

    let settings = Config::load()?.settings()?;
    let service = RecommenderService::initialize(&settings).await;
    match service.recommend(&query).await {
        Ok(results) => {
            let data: Vec<_> = results.iter().map(|r| json!([r.name, r.score])).collect();
            println!("{}", json!({ "data": data, "success": true }));
            Ok(())
        }
        Err(e) => {
            println!("{}", json!({ "message": e.to_string(), "success": false }));
            std::process::exit(1);
        }
    }
}
