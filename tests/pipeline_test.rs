//! End-to-end mining runs against an in-memory graph and a results directory

mod common;

use std::sync::Arc;
use tempfile::{NamedTempFile, TempDir};

use common::{dbo, dbr, mention, nif_file, FakeGraph};
use kbminer::config::Config;
use kbminer::error::Error;
use kbminer::models::{KnowledgeBase, LiteralCensus, ResourceResult};
use kbminer::pipeline::EntitySummarizer;
use kbminer::relations::RelationEnricher;
use kbminer::predicate::PredicateFilter;
use kbminer::storage::{
    load_required, result_key, DocumentStore, JsonFileStore, GLOBAL_STATISTIC_KEY,
    KNOWLEDGE_BASE_KEY,
};

const SAME_AS: &str = "http://www.w3.org/2002/07/owl#sameAs";
const LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";

fn film_graph() -> FakeGraph {
    let titanic = dbr("Titanic");
    let avatar = dbr("Avatar");
    let cameron = dbr("James_Cameron");
    let dicaprio = dbr("Leonardo_DiCaprio");

    FakeGraph::new()
        .with_ranked("Film", &[(titanic.as_str(), 153.2), (avatar.as_str(), 120.5)])
        .with_between(&titanic, &cameron, &[&dbo("director"), SAME_AS])
        .with_between(&titanic, &dicaprio, &[&dbo("starring")])
        .with_between(&avatar, &cameron, &[&dbo("director"), &dbo("producer")])
        .with_by_object(&cameron, &[&dbo("director"), &dbo("producer"), &dbo("writer")])
        .with_by_object(&dicaprio, &[&dbo("starring")])
        .with_literals(&titanic, &[&dbo("runtime"), &dbo("budget"), LABEL])
        .with_literals(&avatar, &[&dbo("runtime")])
        .with_class_count("Film", &dbo("director"), 900)
        .with_class_count("Film", &dbo("producer"), 400)
        .with_class_count("Film", &dbo("starring"), 800)
}

fn film_dataset() -> NamedTempFile {
    nif_file(&[
        mention("Titanic", "James_Cameron", 40, "paragraph_0_300"),
        mention("Titanic", "Leonardo_DiCaprio", 120, "paragraph_0_300"),
        mention("Brno", "Moravia", 10, "paragraph_0_100"),
        mention("Avatar", "James_Cameron", 25, "paragraph_0_250"),
    ])
}

fn summarizer(graph: Arc<FakeGraph>, results: &TempDir, nif: &NamedTempFile) -> EntitySummarizer {
    let mut config = Config::default();
    config.storage.results_dir = results.path().to_path_buf();
    config.storage.nif_path = Some(nif.path().to_path_buf());

    let store = JsonFileStore::open(results.path()).unwrap();
    EntitySummarizer::new(config, graph, Arc::new(store))
}

fn film() -> Vec<String> {
    vec!["Film".to_string()]
}

fn stored_result(results: &TempDir, resource: &str) -> ResourceResult {
    let store = JsonFileStore::open(results.path()).unwrap();
    load_required(&store, &result_key("Film", &dbr(resource)))
        .unwrap()
        .expect("result document stored")
}

/// Test that mining stores enriched and weighted results
#[tokio::test]
async fn test_mine_stores_results() {
    let graph = Arc::new(film_graph());
    let results = TempDir::new().unwrap();
    let nif = film_dataset();

    let report = summarizer(graph.clone(), &results, &nif)
        .mine_nif(&film(), 10, false)
        .await
        .unwrap();

    assert_eq!(report.requested, 2);
    assert_eq!(report.mined, 2);
    assert_eq!(report.skipped, 0);
    assert!(report.not_found.is_empty());

    let titanic = stored_result(&results, "Titanic");
    assert_eq!(titanic.relations.len(), 2);
    assert_eq!(titanic.sections.len(), 1);

    let cameron = &titanic.relations[0];
    assert!(cameron.strict_properties.contains_key(&dbo("director")));
    assert!(!cameron.strict_properties.contains_key(SAME_AS));
    // a strict predicate is not repeated among the weak ones
    assert!(!cameron.properties.contains_key(&dbo("director")));
    assert_eq!(cameron.properties.get(&dbo("producer")), Some(&400));
    // unused by the class
    assert!(!cameron.properties.contains_key(&dbo("writer")));

    assert!(titanic
        .relations
        .iter()
        .all(|r| r.weight.is_some_and(|w| w > 0.0 && w <= 1.0)));
    assert!(titanic.relations[0].weight > titanic.relations[1].weight);
}

/// Test that a second run skips resources already mined
#[tokio::test]
async fn test_mining_resumes() {
    let graph = Arc::new(film_graph());
    let results = TempDir::new().unwrap();
    let nif = film_dataset();
    let summarizer = summarizer(graph.clone(), &results, &nif);

    summarizer.mine_nif(&film(), 10, false).await.unwrap();
    let calls = FakeGraph::calls(&graph.between_calls);
    assert_eq!(calls, 3);

    let report = summarizer.mine_nif(&film(), 10, false).await.unwrap();
    assert_eq!(report.skipped, 2);
    assert_eq!(report.mined, 0);
    assert_eq!(FakeGraph::calls(&graph.between_calls), calls);

    let report = summarizer.mine_nif(&film(), 10, true).await.unwrap();
    assert_eq!(report.mined, 2);
    assert_eq!(FakeGraph::calls(&graph.between_calls), calls * 2);
}

/// Test that requested resources missing from the dataset are reported
#[tokio::test]
async fn test_missing_resources_reported() {
    let (titanic, gravity) = (dbr("Titanic"), dbr("Gravity"));
    let graph = Arc::new(
        film_graph().with_ranked("Film", &[(titanic.as_str(), 1.0), (gravity.as_str(), 0.5)]),
    );
    let results = TempDir::new().unwrap();
    let nif = film_dataset();

    let report = summarizer(graph, &results, &nif)
        .mine_nif(&film(), 10, false)
        .await
        .unwrap();

    assert_eq!(report.mined, 1);
    assert_eq!(report.not_found, vec![dbr("Gravity")]);
}

/// Test NIF path errors
#[tokio::test]
async fn test_nif_path_errors() {
    let graph = Arc::new(film_graph());
    let results = TempDir::new().unwrap();
    let store: Arc<dyn DocumentStore> = Arc::new(JsonFileStore::open(results.path()).unwrap());

    let mut config = Config::default();
    config.storage.results_dir = results.path().to_path_buf();
    let unset = EntitySummarizer::new(config.clone(), graph.clone(), store.clone());
    assert!(matches!(
        unset.mine_nif(&film(), 10, false).await,
        Err(Error::Config(_))
    ));

    config.storage.nif_path = Some(results.path().join("missing.ttl"));
    let missing = EntitySummarizer::new(config, graph.clone(), store);
    assert!(matches!(
        missing.mine_nif(&film(), 10, false).await,
        Err(Error::InputNotFound { .. })
    ));
    assert_eq!(FakeGraph::calls(&graph.ranked_calls), 0);
}

/// Test the complete run from the NIF dataset to the knowledge base
#[tokio::test]
async fn test_complete_knowledge_base() {
    let graph = Arc::new(film_graph());
    let results = TempDir::new().unwrap();
    let nif = film_dataset();

    summarizer(graph.clone(), &results, &nif)
        .create_complete_knowledge_base(&film(), 10, false, true)
        .await
        .unwrap();

    let store = JsonFileStore::open(results.path()).unwrap();

    let census: LiteralCensus = load_required(&store, GLOBAL_STATISTIC_KEY).unwrap().unwrap();
    assert_eq!(census["Film"].get(&dbo("runtime")), Some(&2));
    assert!(!census["Film"].contains_key(LABEL));

    let knowledge_base: KnowledgeBase = load_required(&store, KNOWLEDGE_BASE_KEY).unwrap().unwrap();
    let groups = &knowledge_base["Film"];
    assert!(!groups.is_empty());
    assert_eq!(groups[0].score, 1.0);
    assert!(groups.windows(2).all(|w| w[0].score >= w[1].score));
    assert!(groups.iter().all(|g| g.score > 0.0));
    assert!(groups.iter().any(|g| g.contains(&dbo("runtime"))));
    assert!(!groups.iter().any(|g| g.contains(SAME_AS)));
}

/// Test that refreshing re-enriches stored results without the dataset
#[tokio::test]
async fn test_refresh_results() {
    let results = TempDir::new().unwrap();
    let nif = film_dataset();

    summarizer(Arc::new(film_graph()), &results, &nif)
        .mine_nif(&film(), 10, false)
        .await
        .unwrap();
    assert!(stored_result(&results, "Avatar").relations[0]
        .strict_properties
        .contains_key(&dbo("producer")));

    // the graph changed: the producer link is gone
    let changed = Arc::new(
        film_graph().with_between(&dbr("Avatar"), &dbr("James_Cameron"), &[&dbo("director")]),
    );
    let refreshed = summarizer(changed, &results, &nif)
        .refresh_results(&film(), 10)
        .await
        .unwrap();

    assert_eq!(refreshed, 2);
    let avatar = stored_result(&results, "Avatar");
    let relation = &avatar.relations[0];
    assert!(!relation.strict_properties.contains_key(&dbo("producer")));
    assert!(relation.properties.contains_key(&dbo("producer")));
    assert!(relation.weight.is_some());
}

/// Test that class frequencies are looked up once per run
#[tokio::test]
async fn test_enricher_caches_frequencies() {
    let graph = Arc::new(film_graph());
    let mut enricher = RelationEnricher::new(graph.clone(), PredicateFilter::default());

    let first = enricher
        .enrich(&dbr("Titanic"), &dbr("James_Cameron"), "Film")
        .await
        .unwrap();
    let calls = FakeGraph::calls(&graph.class_count_calls);
    let second = enricher
        .enrich(&dbr("Avatar"), &dbr("James_Cameron"), "Film")
        .await
        .unwrap();

    assert_eq!(first.strict_properties.len(), 1);
    assert_eq!(second.strict_properties.len(), 2);
    assert_eq!(FakeGraph::calls(&graph.class_count_calls), calls);
}
