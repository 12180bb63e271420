//! NIF annotation parsing
//!
//! The NIF abstract datasets describe every entity mention with a fixed run
//! of seven lines. Each line carries one tagged field:
//!
//! ```text
//! 1  <resource?…&nif=phrase_b_e> rdf:type …          resource URI (query string stripped)
//! 2  …                                               ignored
//! 3  … nif-core#beginIndex "b"^^…                    begin index
//! 4  … nif-core#endIndex "e"^^…                      end index
//! 5  … <resource?…&nif=<type>_<from>_<to>> .          section identifier
//! 6  … its#taIdentRef <link> .                        mention target
//! 7  … nif-core#anchorOf "text" .                     anchor text
//! ```
//!
//! [`NifReader`] streams groups from any reader, [`ResourceBatches`] folds
//! consecutive groups of requested resources into per-resource batches.

use regex::Regex;
use std::collections::HashSet;
use std::io::{BufRead, Lines};
use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::models::{RelationRecord, SectionInfo};

/// Number of lines describing one mention
pub const GROUP_SIZE: usize = 7;

struct Patterns {
    resource: Regex,
    begin_index: Regex,
    end_index: Regex,
    section: Regex,
    link: Regex,
    anchor: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        resource: Regex::new(r"<(https?://[^>\s]*/resource/[^>\s]*)>").expect("Invalid regex pattern"),
        begin_index: Regex::new(r#"beginIndex.*"(\d+)""#).expect("Invalid regex pattern"),
        end_index: Regex::new(r#"endIndex.*"(\d+)""#).expect("Invalid regex pattern"),
        section: Regex::new(r"\s.*nif=([^\s>&?]*\d)").expect("Invalid regex pattern"),
        link: Regex::new(r"taIdentRef.*<([^>]*)>").expect("Invalid regex pattern"),
        anchor: Regex::new(r#"anchorOf.*?"((?:[^"\\]|\\.)*)""#).expect("Invalid regex pattern"),
    })
}

/// A single entity mention extracted from one group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NifMention {
    pub resource_uri: String,
    pub begin_index: u64,
    pub end_index: u64,
    pub section_id: String,
    pub link: String,
    pub anchor: String,
}

impl From<NifMention> for RelationRecord {
    fn from(mention: NifMention) -> Self {
        Self {
            link: mention.link,
            anchor: mention.anchor,
            begin_index: mention.begin_index,
            end_index: mention.end_index,
            section_id: mention.section_id,
            weight: None,
            properties: Default::default(),
            strict_properties: Default::default(),
        }
    }
}

fn capture<'a>(re: &Regex, line: &'a str, line_no: usize, field: &'static str) -> Result<&'a str> {
    re.captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| Error::MalformedGroup {
            line: line_no,
            field,
            content: line.trim_end().to_string(),
        })
}

fn capture_index(re: &Regex, line: &str, line_no: usize, field: &'static str) -> Result<u64> {
    let raw = capture(re, line, line_no, field)?;
    raw.parse::<u64>().map_err(|_| Error::MalformedGroup {
        line: line_no,
        field,
        content: line.trim_end().to_string(),
    })
}

/// Extract the described resource from the first line of a group
pub fn parse_resource_uri(line: &str) -> Result<String> {
    let uri = capture(&patterns().resource, line, 1, "resource URI")?;
    Ok(uri.split('?').next().unwrap_or(uri).to_string())
}

/// Parse a complete group of seven lines
pub fn parse_group<S: AsRef<str>>(lines: &[S]) -> Result<NifMention> {
    if lines.len() != GROUP_SIZE {
        return Err(Error::MalformedGroup {
            line: lines.len(),
            field: "7-line group",
            content: format!("group has {} lines", lines.len()),
        });
    }

    let p = patterns();
    let line = |i: usize| lines[i].as_ref();

    let resource_uri = parse_resource_uri(line(0))?;
    let begin_index = capture_index(&p.begin_index, line(2), 3, "beginIndex")?;
    let end_index = capture_index(&p.end_index, line(3), 4, "endIndex")?;

    let section_id = capture(&p.section, line(4), 5, "section")?;
    if SectionInfo::parse(section_id).is_err() {
        return Err(Error::MalformedGroup {
            line: 5,
            field: "section",
            content: line(4).trim_end().to_string(),
        });
    }

    let link = capture(&p.link, line(5), 6, "taIdentRef")?;
    let anchor = capture(&p.anchor, line(6), 7, "anchorOf")?;

    Ok(NifMention {
        resource_uri,
        begin_index,
        end_index,
        section_id: section_id.to_string(),
        link: link.to_string(),
        anchor: anchor.to_string(),
    })
}

/// Serialize a mention back into the seven-line layout
pub fn render_group(mention: &NifMention) -> Vec<String> {
    let phrase = format!(
        "<{}?dbpv=2016-10&nif=phrase_{}_{}>",
        mention.resource_uri, mention.begin_index, mention.end_index
    );
    let nif = "http://persistence.uni-leipzig.org/nlp2rdf/ontologies/nif-core#";
    let xsd = "http://www.w3.org/2001/XMLSchema#nonNegativeInteger";

    vec![
        format!("{phrase} <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <{nif}Phrase> ."),
        format!("{phrase} <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <{nif}String> ."),
        format!("{phrase} <{nif}beginIndex> \"{}\"^^<{xsd}> .", mention.begin_index),
        format!("{phrase} <{nif}endIndex> \"{}\"^^<{xsd}> .", mention.end_index),
        format!(
            "{phrase} <{nif}superString> <{}?dbpv=2016-10&nif={}> .",
            mention.resource_uri, mention.section_id
        ),
        format!(
            "{phrase} <http://www.w3.org/2005/11/its/rdf#taIdentRef> <{}> .",
            mention.link
        ),
        format!("{phrase} <{nif}anchorOf> \"{}\" .", mention.anchor),
    ]
}

/// Seven raw lines read from the dataset
#[derive(Debug, Clone)]
pub struct NifGroup {
    /// 1-based line number of the first line in the source
    pub start_line: usize,
    pub lines: Vec<String>,
}

impl NifGroup {
    /// Resource described by this group
    pub fn resource_uri(&self) -> Result<String> {
        parse_resource_uri(&self.lines[0]).map_err(|e| self.locate(e))
    }

    /// Fully parse this group
    pub fn parse(&self) -> Result<NifMention> {
        parse_group(&self.lines).map_err(|e| self.locate(e))
    }

    fn locate(&self, err: Error) -> Error {
        match err {
            Error::MalformedGroup {
                line,
                field,
                content,
            } => Error::MalformedGroup {
                line: self.start_line + line - 1,
                field,
                content,
            },
            other => other,
        }
    }
}

/// Streams seven-line groups, skipping blank and `#` comment lines
pub struct NifReader<R> {
    lines: Lines<R>,
    line_no: usize,
}

impl<R: BufRead> NifReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }
}

impl<R: BufRead> Iterator for NifReader<R> {
    type Item = Result<NifGroup>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut lines = Vec::with_capacity(GROUP_SIZE);
        let mut start_line = 0;

        while lines.len() < GROUP_SIZE {
            let line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => return Some(Err(e.into())),
                None if lines.is_empty() => return None,
                None => {
                    return Some(Err(Error::MalformedGroup {
                        line: self.line_no,
                        field: "7-line group",
                        content: format!("input ends after {} lines of a group", lines.len()),
                    }))
                }
            };
            self.line_no += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if lines.is_empty() {
                start_line = self.line_no;
            }
            lines.push(line);
        }

        Some(Ok(NifGroup { start_line, lines }))
    }
}

/// All mentions of one requested resource, in document order
#[derive(Debug, Clone)]
pub struct ResourceBatch {
    pub resource_uri: String,
    pub mentions: Vec<NifMention>,
}

/// Folds consecutive groups of requested resources into batches
///
/// A batch is emitted when the subject resource changes or the input ends.
/// Each requested resource is emitted at most once; iteration stops as soon
/// as nothing is pending.
pub struct ResourceBatches<R> {
    groups: NifReader<R>,
    pending: HashSet<String>,
    current: Option<ResourceBatch>,
    done: bool,
}

impl<R: BufRead> ResourceBatches<R> {
    pub fn new(reader: R, requested: impl IntoIterator<Item = String>) -> Self {
        Self {
            groups: NifReader::new(reader),
            pending: requested.into_iter().collect(),
            current: None,
            done: false,
        }
    }

    /// Resources not yet found
    pub fn pending(&self) -> &HashSet<String> {
        &self.pending
    }

    fn close_current(&mut self) -> Option<ResourceBatch> {
        let batch = self.current.take()?;
        self.pending.remove(&batch.resource_uri);
        Some(batch)
    }
}

impl<R: BufRead> Iterator for ResourceBatches<R> {
    type Item = Result<ResourceBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            if self.pending.is_empty() && self.current.is_none() {
                self.done = true;
                return None;
            }

            let group = match self.groups.next() {
                Some(Ok(group)) => group,
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    return self.close_current().map(Ok);
                }
            };

            let resource_uri = match group.resource_uri() {
                Ok(uri) => uri,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };

            let same_resource = self
                .current
                .as_ref()
                .is_some_and(|batch| batch.resource_uri == resource_uri);

            if same_resource || self.current.is_none() && self.pending.contains(&resource_uri) {
                let mention = match group.parse() {
                    Ok(mention) => mention,
                    Err(e) => {
                        self.done = true;
                        return Some(Err(e));
                    }
                };
                self.current
                    .get_or_insert_with(|| ResourceBatch {
                        resource_uri,
                        mentions: Vec::new(),
                    })
                    .mentions
                    .push(mention);
                continue;
            }

            // Subject changed: emit what we have, then reconsider this group
            if let Some(batch) = self.close_current() {
                if self.pending.contains(&resource_uri) {
                    match group.parse() {
                        Ok(mention) => {
                            self.current = Some(ResourceBatch {
                                resource_uri,
                                mentions: vec![mention],
                            });
                        }
                        Err(e) => {
                            self.done = true;
                            return Some(Err(e));
                        }
                    }
                }
                return Some(Ok(batch));
            }
        }
    }
}
