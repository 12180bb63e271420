//! NIF parsing properties and streaming behavior

mod common;

use proptest::prelude::*;
use std::fs::File;
use std::io::BufReader;

use common::{dbr, mention, nif_file};
use kbminer::error::Error;
use kbminer::nif::{parse_group, render_group, NifMention, NifReader, ResourceBatches};

fn arb_mention() -> impl Strategy<Value = NifMention> {
    (
        "[A-Z][A-Za-z0-9_]{0,20}",
        "[A-Z][A-Za-z0-9_()]{0,20}",
        0u64..100_000,
        0u64..500,
        "[a-z]{1,12}",
        0u64..10_000,
        0u64..10_000,
        "[A-Za-z0-9 ,.'-]{0,40}",
    )
        .prop_map(|(resource, link, begin, len, kind, from, size, anchor)| NifMention {
            resource_uri: dbr(&resource),
            begin_index: begin,
            end_index: begin + len,
            section_id: format!("{kind}_{from}_{}", from + size),
            link: dbr(&link),
            anchor,
        })
}

proptest! {
    #[test]
    fn prop_group_round_trip(original in arb_mention()) {
        let parsed = parse_group(&render_group(&original)).unwrap();
        prop_assert_eq!(parsed.begin_index, original.begin_index);
        prop_assert_eq!(parsed.end_index, original.end_index);
        prop_assert_eq!(&parsed.link, &original.link);
        prop_assert_eq!(&parsed.anchor, &original.anchor);
        prop_assert_eq!(&parsed.section_id, &original.section_id);
        prop_assert_eq!(&parsed.resource_uri, &original.resource_uri);
    }
}

#[test]
fn test_reader_streams_file() {
    let file = nif_file(&[
        mention("Prague", "Czech_Republic", 10, "paragraph_0_200"),
        mention("Prague", "Vltava", 80, "paragraph_0_200"),
        mention("Prague", "Bohemia", 250, "paragraph_200_400"),
    ]);

    let reader = NifReader::new(BufReader::new(File::open(file.path()).unwrap()));
    let mentions: Vec<NifMention> = reader
        .map(|group| group.and_then(|g| g.parse()))
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(mentions.len(), 3);
    assert_eq!(mentions[2].section_id, "paragraph_200_400");
    assert_eq!(mentions[1].link, dbr("Vltava"));
}

#[test]
fn test_malformed_requested_group_is_fatal() {
    let file = nif_file(&[mention("Prague", "Vltava", 80, "paragraph_0_200")]);
    let content = std::fs::read_to_string(file.path())
        .unwrap()
        .replace("anchorOf", "label");

    let mut batches = ResourceBatches::new(content.as_bytes(), vec![dbr("Prague")]);
    match batches.next() {
        Some(Err(Error::MalformedGroup { line, field, .. })) => {
            assert_eq!(field, "anchorOf");
            assert_eq!(line, 8);
        }
        other => panic!("expected MalformedGroup, got {other:?}"),
    }
    assert!(batches.next().is_none());
}

#[test]
fn test_resource_seen_again_later_is_ignored() {
    let content = common::nif_dataset(&[
        mention("Prague", "Vltava", 10, "paragraph_0_200"),
        mention("Brno", "Moravia", 10, "paragraph_0_100"),
        mention("Prague", "Bohemia", 50, "paragraph_0_200"),
    ]);

    let batches: Vec<_> = ResourceBatches::new(content.as_bytes(), vec![dbr("Prague"), dbr("Vienna")])
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].mentions.len(), 1);
}
