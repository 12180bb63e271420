//! Common utilities and helper functions
//!
//! This module provides shared utilities used across the application.

pub mod error;
pub mod retry;

use regex::Regex;
use std::sync::OnceLock;

/// Replace characters that are unsafe in a file name (`: / . * #`) with `_`
pub fn sanitize_filename(name: &str) -> String {
    static INVALID_CHARS: OnceLock<Regex> = OnceLock::new();

    let re = INVALID_CHARS.get_or_init(|| Regex::new(r"[:/.*#]").expect("Invalid regex pattern"));

    re.replace_all(name, "_").to_string()
}

/// Last path segment of a URI (`http://dbpedia.org/ontology/birthPlace` -> `birthPlace`)
pub fn local_name(uri: &str) -> &str {
    uri.trim_end_matches('/').rsplit('/').next().unwrap_or(uri)
}

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
