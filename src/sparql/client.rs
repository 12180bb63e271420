//! HTTP SPARQL client
//!
//! Queries are POSTed as `application/sparql-query` and answered as
//! `application/sparql-results+json`. Transient failures are retried per the
//! configured [`RetryPolicy`].

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument};

use super::{queries, GraphQueryClient, QueryResult, RankedResource};
use crate::config::SparqlConfig;
use crate::utils::error::QueryError;
use crate::utils::retry::{with_retry_if, RetryPolicy};

/// One value bound in a query solution
#[derive(Debug, Clone, Deserialize)]
pub struct BoundTerm {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    #[serde(default)]
    pub datatype: Option<String>,
}

/// Variable name -> bound value
pub type Solution = HashMap<String, BoundTerm>;

#[derive(Debug, Deserialize)]
struct SparqlResults {
    results: SparqlBindings,
}

#[derive(Debug, Deserialize)]
struct SparqlBindings {
    bindings: Vec<Solution>,
}

fn binding<'a>(solution: &'a Solution, name: &str) -> QueryResult<&'a str> {
    solution
        .get(name)
        .map(|term| term.value.as_str())
        .ok_or_else(|| QueryError::MissingBinding(name.to_string()))
}

fn parse_count(raw: &str) -> QueryResult<u64> {
    raw.parse::<u64>()
        .or_else(|_| raw.parse::<f64>().map(|v| v.max(0.0).round() as u64))
        .map_err(|_| QueryError::Decode(format!("count is not a number: '{raw}'")))
}

/// SPARQL endpoint client
#[derive(Debug, Clone)]
pub struct SparqlClient {
    http: Client,
    endpoint: String,
    retry: RetryPolicy,
}

impl SparqlClient {
    /// Create a client from configuration
    pub fn new(config: &SparqlConfig) -> QueryResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            retry: RetryPolicy::new(config.max_attempts),
        })
    }

    /// Replace the retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Endpoint URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Run a SELECT query and return its solutions
    pub async fn select(&self, query: &str) -> QueryResult<Vec<Solution>> {
        with_retry_if(&self.retry, || self.execute_once(query), QueryError::is_transient)
            .await
            .map_err(|exhausted| {
                if exhausted.permanent {
                    exhausted.last
                } else {
                    QueryError::RetriesExhausted {
                        attempts: exhausted.attempts,
                        last: Box::new(exhausted.last),
                    }
                }
            })
    }

    async fn execute_once(&self, query: &str) -> QueryResult<Vec<Solution>> {
        let response = self
            .http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/sparql-query")
            .header(ACCEPT, "application/sparql-results+json")
            .body(query.to_string())
            .send()
            .await?;

        let status = response.status();
        if status.is_server_error() {
            return Err(QueryError::ServerError(status.as_u16()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QueryError::BadRequest {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let results: SparqlResults =
            serde_json::from_str(&body).map_err(|e| QueryError::Decode(e.to_string()))?;

        debug!(solutions = results.results.bindings.len(), "SPARQL query answered");
        Ok(results.results.bindings)
    }

    async fn select_column(&self, query: &str, name: &str) -> QueryResult<Vec<String>> {
        self.select(query)
            .await?
            .iter()
            .map(|solution| binding(solution, name).map(str::to_string))
            .collect()
    }

    async fn select_count(&self, query: &str) -> QueryResult<u64> {
        let solutions = self.select(query).await?;
        match solutions.first() {
            Some(solution) => parse_count(binding(solution, "count")?),
            None => Ok(0),
        }
    }
}

#[async_trait]
impl GraphQueryClient for SparqlClient {
    #[instrument(skip(self))]
    async fn ranked_resources(&self, entity_type: &str, limit: usize) -> QueryResult<Vec<RankedResource>> {
        let solutions = self
            .select(&queries::ranked_resources(entity_type, limit))
            .await?;

        solutions
            .iter()
            .map(|solution| {
                let uri = binding(solution, "entity")?.to_string();
                let raw_rank = binding(solution, "rank")?;
                let rank = raw_rank
                    .parse::<f64>()
                    .map_err(|_| QueryError::Decode(format!("rank is not a number: '{raw_rank}'")))?;
                Ok(RankedResource { uri, rank })
            })
            .collect()
    }

    async fn predicates_by_object(&self, object: &str) -> QueryResult<Vec<String>> {
        self.select_column(&queries::predicates_by_object(object), "property")
            .await
    }

    async fn predicates_by_subject(&self, subject: &str, literal_only: bool) -> QueryResult<Vec<String>> {
        self.select_column(
            &queries::predicates_by_subject(subject, literal_only),
            "property",
        )
        .await
    }

    async fn predicates_between(&self, subject: &str, object: &str) -> QueryResult<Vec<String>> {
        self.select_column(&queries::predicates_between(subject, object), "property")
            .await
    }

    async fn count_subjects(&self, predicates: &[String]) -> QueryResult<u64> {
        if predicates.is_empty() {
            return Ok(0);
        }
        self.select_count(&queries::count_subjects(predicates)).await
    }

    async fn count_predicate_in_class(&self, entity_type: &str, predicate: &str) -> QueryResult<u64> {
        self.select_count(&queries::count_predicate_in_class(entity_type, predicate))
            .await
    }
}
