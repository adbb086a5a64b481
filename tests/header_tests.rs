use anyhow::Result;
use chrono::{DateTime, Utc};
use diff_core::diff::{CreateOptions, Header, Schema, read_header};
use diff_core::{DiffError, HeaderField, ParseError};
use std::fs;
use tempfile::TempDir;

const FOR_HASH: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";
const FROM_HASH: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

fn header_text(schema: &str, created_at: &str, for_hash: &str) -> String {
    format!(
        "\n Diff Schema: {schema}\n\n Created At: {created_at}\n\n Created For File: tor\n\n Created For Hash: {for_hash}\n\n Created From Hash: {FROM_HASH}\n"
    )
}

fn read_text(text: &str) -> Result<Result<Header, DiffError>> {
    let dir = TempDir::new()?;
    let path = dir.path().join("tor.diff");
    fs::write(&path, text)?;
    Ok(read_header(&path))
}

#[test]
fn schema_latest_is_highest_code() {
    let mut codes: Vec<u32> = Schema::ALL.iter().map(Schema::code).collect();
    codes.sort_unstable();
    codes.dedup();

    assert_eq!(codes.len(), Schema::ALL.len());
    assert_eq!(codes.last().copied(), Some(Schema::latest().code()));
}

#[test]
fn schema_parses_its_own_name() {
    assert_eq!(" v1 ".parse::<Schema>().unwrap(), Schema::V1);
    assert_eq!(Schema::V1.to_string(), "v1");
    assert!("v0".parse::<Schema>().is_err());
}

#[test]
fn header_is_read_without_body() -> Result<()> {
    let mut text = header_text("v1", "1971-08-21T00:01:00Z", FOR_HASH);
    text.push_str("\n i:0\nnot even base64 ~~~\n");

    let header = read_text(&text)??;

    assert_eq!(header.schema, Schema::V1);
    assert_eq!(header.created_at(), CreateOptions::static_time());
    assert_eq!(header.created_for_file, "tor");
    assert_eq!(header.created_for_hash, FOR_HASH);
    assert_eq!(header.created_from_hash, FROM_HASH);
    Ok(())
}

#[test]
fn header_rejects_unknown_schema() -> Result<()> {
    let err = read_text(&header_text("v9", "1971-08-21T00:01:00Z", FOR_HASH))?.unwrap_err();
    assert!(matches!(err, DiffError::Parse(ParseError::UnknownSchema(_))));
    Ok(())
}

#[test]
fn header_rejects_bad_timestamp() -> Result<()> {
    let err = read_text(&header_text("v1", "yesterday", FOR_HASH))?.unwrap_err();
    assert!(matches!(
        err,
        DiffError::Parse(ParseError::InvalidTimestamp { .. })
    ));
    Ok(())
}

#[test]
fn header_rejects_invalid_hash() -> Result<()> {
    let upper = FOR_HASH.to_uppercase();
    let err = read_text(&header_text("v1", "1971-08-21T00:01:00Z", &upper))?.unwrap_err();
    assert!(matches!(
        err,
        DiffError::Parse(ParseError::InvalidHash {
            field: HeaderField::CreatedForHash,
            ..
        })
    ));
    Ok(())
}

#[test]
fn truncated_header_names_missing_field() -> Result<()> {
    let full = header_text("v1", "1971-08-21T00:01:00Z", FOR_HASH);
    let truncated = &full[..full.find("\n Created For Hash").unwrap()];

    let err = read_text(truncated)?.unwrap_err();
    assert!(matches!(
        err,
        DiffError::Parse(ParseError::MissingField(HeaderField::CreatedForHash))
    ));
    Ok(())
}

#[test]
fn header_construction_validates_hashes() {
    let now: DateTime<Utc> = Utc::now();
    assert!(Header::new(Schema::V1, now, "tor", FOR_HASH, FROM_HASH).is_ok());
    assert!(Header::new(Schema::V1, now, "tor", "abc", FROM_HASH).is_err());
    assert!(Header::new(Schema::V1, now, "tor", FOR_HASH, format!("{FROM_HASH}0")).is_err());
}

#[test]
fn header_construction_rejects_line_breaks_in_file_name() {
    let now = Utc::now();
    for name in ["to\nr", "tor\r"] {
        let err = Header::new(Schema::V1, now, name, FOR_HASH, FROM_HASH).unwrap_err();
        assert!(matches!(err, ParseError::InvalidFileName(_)));
    }
}

#[test]
fn header_display_lists_every_field() {
    let header = Header::new(
        Schema::V1,
        CreateOptions::static_time(),
        "tor",
        FOR_HASH,
        FROM_HASH,
    )
    .unwrap();

    let printed = header.to_string();
    assert!(printed.starts_with("DiffHeader ["));
    assert!(printed.contains("schema: v1"));
    assert!(printed.contains("createdAt: 1971-08-21T00:01:00Z"));
    assert!(printed.contains(&format!("createdForHash: {FOR_HASH}")));
    assert!(printed.contains(&format!("createdFromHash: {FROM_HASH}")));
}
