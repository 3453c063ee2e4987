/// Integration tests for tagging against file-based SQLite databases.
///
/// These tests verify behavior that in-memory unit tests cannot:
/// - Taggings and cached tag lists persist across reopen
/// - Concurrent writers on separate connections serialize reconciliation
/// - Concurrent find-or-create of the same new tag yields one tag row
///
/// To run locally:
/// ```bash
/// cargo test --test tagging_integration
/// ```
use std::path::Path;
use std::thread;

use anyhow::Result;
use taggable::{
    Database, SearchOptions, TagCountOptions, TagList, TagListHandle, TaggableKind,
    TaggingService,
};
use tempfile::tempdir;

const ARTICLE: TaggableKind =
    TaggableKind::new("Article", "articles").with_cached_tag_list("cached_tag_list");

fn open(path: &Path) -> Result<TaggingService> {
    let service = TaggingService::new(Database::open(path)?);
    service.database().connection().execute_batch(
        "CREATE TABLE IF NOT EXISTS articles (
             id INTEGER PRIMARY KEY,
             title TEXT NOT NULL,
             cached_tag_list TEXT
         )",
    )?;
    Ok(service)
}

fn count(service: &TaggingService, sql: &str) -> Result<i64> {
    Ok(service
        .database()
        .connection()
        .query_row(sql, [], |row| row.get(0))?)
}

#[test]
fn tags_persist_across_reopen() -> Result<()> {
    let dir = tempdir()?;
    let db_path = dir.path().join("tags.db");

    {
        let service = open(&db_path)?;
        let mut article = TagListHandle::new(ARTICLE.entity(1));
        article.set_tag_list_text("Rust, \"Systems, programming\"", ",");
        service.save_tag_list(&mut article, |conn| {
            conn.execute("INSERT INTO articles (id, title) VALUES (1, 'Ownership')", [])?;
            Ok(())
        })?;
    }

    let service = open(&db_path)?;
    let mut article = TagListHandle::new(ARTICLE.entity(1));
    assert_eq!(
        service.tag_list(&mut article)?,
        TagList::from_names(["Rust", "Systems, programming"])
    );

    let cached: String = service.database().connection().query_row(
        "SELECT cached_tag_list FROM articles WHERE id = 1",
        [],
        |row| row.get(0),
    )?;
    assert_eq!(cached, "Rust, \"Systems, programming\"");

    let found = service.find_tagged_with(ARTICLE, "rust", SearchOptions::default())?;
    assert_eq!(found.len(), 1);

    Ok(())
}

#[test]
fn failed_save_leaves_file_database_untouched() -> Result<()> {
    let dir = tempdir()?;
    let db_path = dir.path().join("tags.db");
    let service = open(&db_path)?;

    let mut article = TagListHandle::new(ARTICLE.entity(1));
    article.set_tag_list_text("Draft", ",");
    let result = service.save_tag_list(&mut article, |conn| {
        conn.execute("INSERT INTO articles (id, title) VALUES (1, 'Half written')", [])?;
        anyhow::bail!("title rejected")
    });
    assert!(result.is_err());
    drop(service);

    let service = open(&db_path)?;
    assert_eq!(count(&service, "SELECT COUNT(*) FROM articles")?, 0);
    assert_eq!(count(&service, "SELECT COUNT(*) FROM taggings")?, 0);
    assert_eq!(count(&service, "SELECT COUNT(*) FROM tags")?, 0);

    Ok(())
}

#[test]
fn concurrent_reconciliation_creates_each_tag_once() -> Result<()> {
    let dir = tempdir()?;
    let db_path = dir.path().join("tags.db");
    open(&db_path)?.database().connection().execute_batch(
        "INSERT INTO articles (id, title) VALUES (1, 'a'), (2, 'b'), (3, 'c'), (4, 'd')",
    )?;

    let workers: Vec<_> = (1..=4)
        .map(|id| {
            let db_path = db_path.clone();
            thread::spawn(move || -> Result<()> {
                let service = open(&db_path)?;
                for round in 0..10 {
                    let desired = TagList::parse(format!("Shared, Round {round}").as_str(), ",");
                    service.reconcile(ARTICLE.entity(id), Some(&desired))?;
                }
                Ok(())
            })
        })
        .collect();

    for worker in workers {
        worker.join().expect("worker panicked")?;
    }

    let service = open(&db_path)?;
    assert_eq!(count(&service, "SELECT COUNT(*) FROM tags WHERE name = 'Shared'")?, 1);
    assert_eq!(count(&service, "SELECT COUNT(*) FROM tags")?, 11);

    let counts = service.tag_counts(ARTICLE, &TagCountOptions::default().at_least(2))?;
    assert_eq!(counts.len(), 2);
    assert!(counts.iter().any(|c| c.name == "Shared" && c.count == 4));
    assert!(counts.iter().any(|c| c.name == "Round 9" && c.count == 4));

    Ok(())
}

#[test]
fn concurrent_find_or_create_resolves_to_one_tag() -> Result<()> {
    let dir = tempdir()?;
    let db_path = dir.path().join("tags.db");
    open(&db_path)?;

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let db_path = db_path.clone();
            thread::spawn(move || -> Result<i64> {
                let service = open(&db_path)?;
                Ok(service.find_or_create_tag("Contended")?.get())
            })
        })
        .collect();

    let mut ids = Vec::new();
    for worker in workers {
        ids.push(worker.join().expect("worker panicked")?);
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);

    Ok(())
}
