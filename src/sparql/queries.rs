//! SPARQL query templates
//!
//! Each function renders the complete query text for one question shape of
//! [`GraphQueryClient`](super::GraphQueryClient).

const PREFIXES: &str = "PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>
PREFIX dbo: <http://dbpedia.org/ontology/>
PREFIX dbp: <http://dbpedia.org/property/>
";

/// Render a term: IRIs are bracketed, bare names use the `dbo:` prefix
pub fn term(value: &str) -> String {
    if value.contains("http") {
        format!("<{value}>")
    } else {
        format!("dbo:{value}")
    }
}

/// Resources of a class ordered by DBpedia PageRank
pub fn ranked_resources(entity_type: &str, limit: usize) -> String {
    format!(
        "{PREFIXES}PREFIX vrank: <http://purl.org/voc/vrank#>

SELECT ?entity ?rank
FROM <http://dbpedia.org>
FROM <http://people.aifb.kit.edu/ath/#DBpedia_PageRank>
WHERE {{
  ?entity rdf:type {class} .
  ?entity vrank:hasRank/vrank:rankValue ?rank .
}}
ORDER BY DESC(?rank) LIMIT {limit}",
        class = term(entity_type),
    )
}

/// Predicates pointing at an object
pub fn predicates_by_object(object: &str) -> String {
    format!(
        "{PREFIXES}
SELECT DISTINCT ?property
WHERE {{
  ?subject ?property {object} .
}}",
        object = term(object),
    )
}

/// Predicates leaving a subject, optionally only literal valued ones
pub fn predicates_by_subject(subject: &str, literal_only: bool) -> String {
    let filter = if literal_only {
        "\n  FILTER(isLiteral(?object))"
    } else {
        ""
    };

    format!(
        "{PREFIXES}
SELECT DISTINCT ?property
WHERE {{
  {subject} ?property ?object .{filter}
}}",
        subject = term(subject),
    )
}

/// Predicates linking a subject and an object in either direction
pub fn predicates_between(subject: &str, object: &str) -> String {
    let subject = term(subject);
    let object = term(object);

    format!(
        "{PREFIXES}
SELECT DISTINCT ?property
WHERE {{
  {{ {subject} ?property {object} . }} UNION {{ {object} ?property {subject} . }}
}}"
    )
}

/// Distinct subjects using all predicates with a shared object
pub fn count_subjects(predicates: &[String]) -> String {
    let patterns = predicates
        .iter()
        .map(|predicate| format!("  ?subject {} ?object .", term(predicate)))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{PREFIXES}
SELECT (COUNT(DISTINCT ?subject) AS ?count)
WHERE {{
{patterns}
}}"
    )
}

/// Class members using a predicate as subject or object
pub fn count_predicate_in_class(entity_type: &str, predicate: &str) -> String {
    let predicate = term(predicate);

    format!(
        "{PREFIXES}
SELECT (COUNT(DISTINCT ?subject) AS ?count)
WHERE {{
  ?subject a {class} .
  {{ ?subject {predicate} ?a . }} UNION {{ ?b {predicate} ?subject . }}
}}",
        class = term(entity_type),
    )
}
