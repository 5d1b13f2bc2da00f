//! Cache-through repository semantics against a real temp SQLite file.
//!
//! Most tests run with the cache disabled, which exercises the
//! degradation path: every collection read must come straight from the
//! database. The cache-policy tests at the bottom run with the in-memory
//! backend and pin the hit-side behavior: incremental user append, full
//! admin rebuild, channel-map invalidation.

use std::sync::Arc;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use sharebox::storage::cache::RedisCache;
use sharebox::storage::db::{self, NewFile};
use sharebox::storage::repository::{ChannelTitleResolver, Repository};
use sharebox::storage::{create_pool, get_connection};
use sharebox::AppError;

fn repo_with(cache: RedisCache) -> (TempDir, Repository) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.db");
    let pool = Arc::new(create_pool(path.to_str().unwrap()).unwrap());
    (dir, Repository::new(pool, cache))
}

fn repo() -> (TempDir, Repository) {
    repo_with(RedisCache::disabled())
}

struct NamesOnlyPublic;

#[async_trait]
impl ChannelTitleResolver for NamesOnlyPublic {
    async fn resolve_title(&self, channel_id: &str) -> Option<String> {
        channel_id.strip_prefix('@').map(|name| format!("{name} channel"))
    }
}

#[tokio::test]
async fn users_are_created_once_and_listed() {
    let (_dir, repo) = repo();
    assert!(repo.ensure_user(10, Some("alice")).await.unwrap());
    assert!(!repo.ensure_user(10, Some("alice")).await.unwrap());
    assert!(repo.ensure_user(20, None).await.unwrap());
    assert_eq!(repo.user_ids().await.unwrap(), vec![10, 20]);
    assert_eq!(repo.count_users().unwrap(), 2);
}

#[tokio::test]
async fn admin_flag_round_trips() {
    let (_dir, repo) = repo();
    assert!(!repo.is_admin(10).await.unwrap());

    // Appointing an unseen user creates their row.
    assert!(repo.set_admin(10, true).await.unwrap());
    assert!(repo.is_admin(10).await.unwrap());
    assert_eq!(repo.admin_ids().await.unwrap(), vec![10]);

    // Repeating the grant changes nothing.
    assert!(!repo.set_admin(10, true).await.unwrap());

    assert!(repo.set_admin(10, false).await.unwrap());
    assert!(repo.admin_ids().await.unwrap().is_empty());
}

#[tokio::test]
async fn channel_map_resolves_titles_and_degrades() {
    let (_dir, repo) = repo();
    assert!(repo.add_channel("@news", "https://t.me/news").await.unwrap());
    assert!(repo.add_channel("-100123", "https://t.me/+inv").await.unwrap());
    // Duplicate registration is refused.
    assert!(!repo.add_channel("@news", "https://t.me/news").await.unwrap());

    let map = repo.channels(&NamesOnlyPublic).await.unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map["@news"].title, "news channel");
    // Unresolvable titles fall back to the raw id.
    assert_eq!(map["-100123"].title, "-100123");
    assert_eq!(map["-100123"].link, "https://t.me/+inv");

    assert!(repo.remove_channel("@news").await.unwrap());
    assert!(!repo.remove_channel("@news").await.unwrap());
    let map = repo.channels(&NamesOnlyPublic).await.unwrap();
    assert_eq!(map.len(), 1);

    // A removed channel can be registered again.
    assert!(repo.add_channel("@news", "https://t.me/news").await.unwrap());
    let map = repo.channels(&NamesOnlyPublic).await.unwrap();
    assert_eq!(map.len(), 2);
}

fn new_file<'a>(code: &'a str, album: Option<(&'a str, i64)>) -> NewFile<'a> {
    NewFile {
        code,
        kind: "photo",
        size: 1_048_576,
        file_id: "fid",
        unique_id: "uid",
        backup_message_id: 77,
        owner_id: 10,
        album_id: album.map(|(id, _)| id),
        album_order: album.map(|(_, order)| order),
    }
}

#[tokio::test]
async fn albums_cascade_and_listings_skip_parts() {
    let (_dir, repo) = repo();
    repo.save_files(&[
        new_file("AAA", Some(("alb1", 0))),
        new_file("AAA_part1", Some(("alb1", 1))),
        new_file("AAA_part2", Some(("alb1", 2))),
        new_file("BBB", None),
    ])
    .unwrap();

    // Listing shows only the primary and the standalone file.
    let listed: Vec<String> = repo.user_files(10).unwrap().into_iter().map(|f| f.code).collect();
    assert_eq!(listed, vec!["BBB".to_string(), "AAA".to_string()]);
    assert_eq!(repo.count_user_files(10).unwrap(), 2);
    assert_eq!(repo.count_files().unwrap(), 4);

    // Retrieval resolves the whole album in order.
    let primary = repo.find_file("AAA").unwrap();
    let batch = repo.resolve_batch(&primary).unwrap();
    let codes: Vec<&str> = batch.iter().map(|f| f.code.as_str()).collect();
    assert_eq!(codes, vec!["AAA", "AAA_part1", "AAA_part2"]);

    // Deleting the primary removes every member.
    let removed = repo.delete_file(&primary).unwrap();
    assert_eq!(removed.len(), 3);
    assert!(matches!(repo.find_file("AAA_part1"), Err(AppError::NotFound(_))));
    assert_eq!(repo.count_files().unwrap(), 1);
}

#[tokio::test]
async fn captions_passwords_and_counters_update_the_row() {
    let (_dir, repo) = repo();
    repo.save_files(&[new_file("CCC", None)]).unwrap();

    repo.set_caption("CCC", Some("holiday pics")).unwrap();
    repo.set_password("CCC", Some("s3cret")).unwrap();
    repo.increment_downloads("CCC").unwrap();
    repo.increment_downloads("CCC").unwrap();

    let record = repo.find_file("CCC").unwrap();
    assert_eq!(record.caption.as_deref(), Some("holiday pics"));
    assert_eq!(record.password.as_deref(), Some("s3cret"));
    assert_eq!(record.downloads, 2);

    repo.set_caption("CCC", None).unwrap();
    repo.set_password("CCC", None).unwrap();
    let record = repo.find_file("CCC").unwrap();
    assert_eq!(record.caption, None);
    assert_eq!(record.password, None);

    // Updates on unknown codes surface as not-found.
    assert!(matches!(repo.set_caption("nope", Some("x")), Err(AppError::NotFound(_))));
    assert!(matches!(repo.set_password("nope", None), Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn duplicate_code_insert_reports_persistence_error() {
    let (_dir, repo) = repo();
    repo.save_files(&[new_file("DDD", None)]).unwrap();
    let err = repo.save_files(&[new_file("DDD", None)]).unwrap_err();
    assert!(matches!(err, AppError::Persistence(_)));
}

// ── cache hit paths (in-memory backend) ─────────────────────────────

#[tokio::test]
async fn cached_user_list_is_patched_not_rebuilt() {
    let (_dir, repo) = repo_with(RedisCache::in_memory());
    repo.ensure_user(10, Some("alice")).await.unwrap();
    assert_eq!(repo.user_ids().await.unwrap(), vec![10]);

    // A row written behind the cache's back is invisible to a hit.
    let conn = get_connection(repo.pool()).unwrap();
    db::create_user(&conn, 99, None).unwrap();
    assert_eq!(repo.user_ids().await.unwrap(), vec![10]);

    // A creation through the repository appends to the cached list in
    // place; the direct row stays missing until an invalidating rebuild.
    repo.ensure_user(20, Some("bob")).await.unwrap();
    assert_eq!(repo.user_ids().await.unwrap(), vec![10, 20]);
}

#[tokio::test]
async fn admin_changes_rebuild_the_cached_list() {
    let (_dir, repo) = repo_with(RedisCache::in_memory());
    repo.set_admin(10, true).await.unwrap();
    assert_eq!(repo.admin_ids().await.unwrap(), vec![10]);

    // A direct grant is not visible while the cached list keeps hitting.
    let conn = get_connection(repo.pool()).unwrap();
    db::set_admin(&conn, 99, true).unwrap();
    assert_eq!(repo.admin_ids().await.unwrap(), vec![10]);

    // Any grant through the repository rebuilds the whole list from the
    // database, which picks the direct row up too.
    repo.set_admin(20, true).await.unwrap();
    assert_eq!(repo.admin_ids().await.unwrap(), vec![10, 99, 20]);
}

#[tokio::test]
async fn channel_mutations_invalidate_the_cached_map() {
    let (_dir, repo) = repo_with(RedisCache::in_memory());
    repo.add_channel("@a", "https://t.me/a").await.unwrap();
    assert_eq!(repo.channels(&NamesOnlyPublic).await.unwrap().len(), 1);

    // The cached map keeps serving over a direct database write.
    let conn = get_connection(repo.pool()).unwrap();
    db::add_channel(&conn, "@direct", "https://t.me/direct").unwrap();
    assert_eq!(repo.channels(&NamesOnlyPublic).await.unwrap().len(), 1);

    // A mutation through the repository drops the key; the next read
    // rebuilds from the database and sees both rows.
    repo.add_channel("@b", "https://t.me/b").await.unwrap();
    let map = repo.channels(&NamesOnlyPublic).await.unwrap();
    assert_eq!(map.len(), 3);
    assert!(map.contains_key("@direct"));
}
