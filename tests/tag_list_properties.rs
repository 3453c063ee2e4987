/// Integration tests for tag list parsing and formatting through the public API.
///
/// Covers the text contract hosts depend on:
/// - Formatting then parsing returns the same set of names for any delimiter
/// - Quoting protects delimiters inside names
/// - Delimiter configuration from the environment reaches the service
use anyhow::Result;
use serial_test::serial;
use taggable::{Database, TagConfig, TagList, TagListHandle, TagParser, TaggableKind, TaggingService};

const NOTE: TaggableKind = TaggableKind::new("Note", "notes");

#[test]
fn format_then_parse_is_set_equal() {
    let lists = [
        TagList::from_names(["Nature", "Very good", "Crazy animal"]),
        TagList::from_names(["with, comma", "plain"]),
        TagList::from_names(["semi;colon", "pipe|d", "a b c"]),
        TagList::new(),
    ];

    for delimiter in [",", " ", ";", "|"] {
        for list in &lists {
            let text = list.to_delimited(delimiter);
            assert_eq!(
                TagList::parse(text.as_str(), delimiter),
                *list,
                "delimiter {delimiter:?} text {text:?}"
            );
        }
    }
}

#[test]
fn parsing_contract() {
    assert!(TagParser::parse("", ",").is_empty());
    assert!(TagParser::parse(None::<&str>, ",").is_empty());
    assert_eq!(TagParser::parse("\"Fun\"", ","), ["Fun"]);
    assert_eq!(TagParser::parse("Fun", ","), ["Fun"]);
    assert_eq!(TagParser::parse("\"with, comma\"", ","), ["with, comma"]);
    assert_eq!(TagParser::parse("A B, C", ","), ["A B", "C"]);
    assert_eq!(TagParser::parse("Alpha, Alpha", ","), ["Alpha"]);
    assert_eq!(
        TagParser::format(["Crazy Animal", "Question"], " "),
        "\"Crazy Animal\" Question"
    );
}

#[test]
fn unterminated_quote_is_plain_text() {
    assert_eq!(TagParser::parse("\"Open, Closed", ","), ["\"Open", "Closed"]);
}

#[test]
fn tag_list_serializes_as_string_array() -> Result<()> {
    let list = TagList::parse("Nature, \"Very good\"", ",");
    let json = serde_json::to_string(&list)?;
    assert_eq!(json, r#"["Nature","Very good"]"#);

    let back: TagList = serde_json::from_str(&json)?;
    assert_eq!(back, list);
    Ok(())
}

#[test]
#[serial]
fn service_uses_delimiter_from_env() -> Result<()> {
    unsafe { std::env::set_var("TAGGABLE_DELIMITER", ";") };
    let config = TagConfig::from_env();
    unsafe { std::env::remove_var("TAGGABLE_DELIMITER") };

    let service = TaggingService::new(Database::in_memory()?).with_config(config);
    service
        .database()
        .connection()
        .execute_batch("CREATE TABLE notes (id INTEGER PRIMARY KEY)")?;

    let mut note = TagListHandle::new(NOTE.entity(1));
    note.set_tag_list(service.parse("Rust; Ownership, borrowing"));
    service.save_tag_list(&mut note, |conn| {
        conn.execute("INSERT INTO notes (id) VALUES (1)", [])?;
        Ok(())
    })?;

    assert_eq!(service.tag_list_text(&mut note)?, "Rust; Ownership, borrowing");
    Ok(())
}
