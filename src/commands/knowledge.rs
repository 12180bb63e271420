use anyhow::{Context, Result};

use kbminer::config::Config;

use super::summarizer;

pub async fn census(config: Config, types: Vec<String>, count: Option<usize>) -> Result<()> {
    let summarizer = summarizer(config)?;
    let count = count.unwrap_or(summarizer.config().mining.literal_resource_count);

    summarizer
        .generate_literal_census(&types, count)
        .await
        .context("Literal census failed")?;

    println!("Literal census stored for {} class(es)", types.len());
    Ok(())
}

pub async fn build(config: Config, types: Vec<String>, identify_identical: bool) -> Result<()> {
    let summarizer = summarizer(config)?;

    for entity_type in &types {
        let groups = summarizer
            .build_knowledge_base(entity_type, identify_identical)
            .await
            .with_context(|| format!("Building knowledge base for {entity_type} failed"))?;

        println!("{entity_type}: {} ranked predicate group(s)", groups.len());
        for group in groups.iter().take(10) {
            println!("  {:.4}  {}", group.score, group.predicates.join(", "));
        }
    }

    Ok(())
}

pub fn reduce(config: Config) -> Result<()> {
    let summarizer = summarizer(config)?;
    let groups = summarizer
        .reduce_identical()
        .context("Reducing identical predicates failed")?;

    println!("Identical predicates reduced to {groups} group(s)");
    Ok(())
}
