//! The enumerating fallback must resolve everything an index would,
//! without one.

mod common;

use common::{build_archive, build_archive_with};
use pretty_assertions::assert_eq;
use tesselle_store::{EnumeratingArchiveReader, StoreError, TilesetReader};

fn entries() -> Vec<(&'static str, &'static [u8])> {
    vec![
        ("tileset.json", br#"{"asset":{"version":"1.1"}}"# as &[u8]),
        ("tiles/0.b3dm", b"payload-0"),
        ("tiles/1.b3dm", b"payload-1"),
    ]
}

#[test]
fn resolves_paths_without_an_index() {
    let fixture = build_archive_with(&entries(), None, false);
    let tmp = fixture.write_to_temp();

    let reader = EnumeratingArchiveReader::open(tmp.path()).unwrap();
    assert_eq!(reader.len(), 3);
    assert_eq!(reader.read_binary("tiles/0.b3dm").unwrap(), b"payload-0");
    assert_eq!(reader.read_binary("/tiles/1.b3dm").unwrap(), b"payload-1");

    let tileset = reader.read_json("tileset.json").unwrap();
    assert_eq!(tileset["asset"]["version"], "1.1");
}

#[test]
fn also_works_on_indexed_containers() {
    // The fallback path when the index exists but failed validation
    let fixture = build_archive(&entries());
    let tmp = fixture.write_to_temp();

    let reader = EnumeratingArchiveReader::open(tmp.path()).unwrap();
    // The reserved index entry is walked like any other
    assert_eq!(reader.len(), 4);
    assert_eq!(reader.read_binary("tiles/1.b3dm").unwrap(), b"payload-1");
}

#[test]
fn absent_paths_fail_with_not_found() {
    let fixture = build_archive_with(&entries(), None, false);
    let tmp = fixture.write_to_temp();

    let reader = EnumeratingArchiveReader::open(tmp.path()).unwrap();
    let err = reader.read_binary("missing.b3dm").unwrap_err();
    assert!(matches!(err, StoreError::NotFound(name) if name == "missing.b3dm"));
}
