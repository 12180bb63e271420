use anyhow::{Context, Result};

use kbminer::config::Config;

use super::{summarizer, MineOptions};

pub async fn mine(config: Config, options: MineOptions) -> Result<()> {
    let summarizer = summarizer(config)?;
    let count = options
        .count
        .unwrap_or(summarizer.config().mining.entity_count);

    let report = summarizer
        .mine_nif(&options.types, count, options.reload)
        .await
        .context("NIF mining failed")?;

    println!("NIF mining finished");
    println!("  Requested: {}", report.requested);
    println!("  Skipped (already mined): {}", report.skipped);
    println!("  Mined: {}", report.mined);
    if !report.not_found.is_empty() {
        println!("  Not found in dataset: {}", report.not_found.len());
        for uri in &report.not_found {
            println!("    - {uri}");
        }
    }

    Ok(())
}

pub async fn complete(config: Config, options: MineOptions, identify_identical: bool) -> Result<()> {
    let summarizer = summarizer(config)?;
    let count = options
        .count
        .unwrap_or(summarizer.config().mining.entity_count);

    summarizer
        .create_complete_knowledge_base(&options.types, count, options.reload, identify_identical)
        .await
        .context("Knowledge base creation failed")?;

    println!(
        "Knowledge base created for {} class(es) in {}",
        options.types.len(),
        summarizer.config().storage.results_dir.display()
    );
    Ok(())
}

pub async fn refresh(config: Config, types: Vec<String>, count: Option<usize>) -> Result<()> {
    let summarizer = summarizer(config)?;
    let count = count.unwrap_or(summarizer.config().mining.entity_count);

    let refreshed = summarizer
        .refresh_results(&types, count)
        .await
        .context("Refreshing results failed")?;

    println!("Refreshed {refreshed} result document(s)");
    Ok(())
}
