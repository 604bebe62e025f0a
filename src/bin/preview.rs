//! Run aggregation + curation once for a category and print the result as JSON.
//! Usage: `preview [ai|global] [--send]`. Without `--send` nothing is delivered.

use news_digest::{build_orchestrator, AppConfig, Category};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let send = args.iter().any(|a| a == "--send");
    let category =
        Category::parse_or_default(args.iter().find(|a| !a.starts_with("--")).map(String::as_str));

    let cfg = AppConfig::from_env()?;
    let orchestrator = build_orchestrator(&cfg)?;

    if send {
        let digest = orchestrator.run_manual(category).await?;
        println!("{}", serde_json::to_string_pretty(&digest)?);
        println!("{}", serde_json::to_string_pretty(&orchestrator.status())?);
    } else {
        let preview = orchestrator.fetch_preview(category).await?;
        println!("{}", serde_json::to_string_pretty(&preview)?);
    }
    Ok(())
}
