//! Integration tests against live backing services. Each test is gated on
//! its connection URL env var and is a no-op when the service is absent, so
//! the suite stays runnable on a bare checkout:
//!
//!   TEST_DATABASE_URL=postgres://... cargo test
//!   TEST_REDIS_URL=redis://...      cargo test

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::cache::{CounterStore, RedisCache};
use crate::config::{DatabaseConfig, RedisConfig};
use crate::database::{DbPool, MessageRole, NewMessage, Repository, User};

static SEQ: AtomicU64 = AtomicU64::new(0);

/// Unique per process and per run; user emails/usernames persist in a shared
/// test database across runs.
fn unique(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .as_nanos();
    format!("{}-{}-{}", prefix, nanos, SEQ.fetch_add(1, Ordering::Relaxed))
}

async fn test_repository() -> Option<Repository> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let pool = DbPool::new(&DatabaseConfig {
        url,
        pool_max_size: 2,
        pool_timeout_seconds: 5,
    })
    .await
    .expect("test database unreachable");

    let repository = Repository::new(pool);
    repository.ensure_schema().await.expect("ensure schema");
    Some(repository)
}

async fn create_test_user(repository: &Repository) -> User {
    let tag = unique("user");
    repository
        .create_user(&format!("{}@example.com", tag), &tag, "not-a-real-hash", None)
        .await
        .expect("create user")
}

fn new_message(conversation_id: i64, role: MessageRole, content: &str) -> NewMessage {
    NewMessage {
        conversation_id,
        role,
        content: content.to_string(),
        tokens_used: 0,
        model: None,
    }
}

#[tokio::test]
async fn test_delete_conversation_cascades_to_messages() {
    let Some(repository) = test_repository().await else {
        return;
    };

    let user = create_test_user(&repository).await;
    let conversation = repository.create_conversation(user.id).await.unwrap();

    repository
        .insert_message(new_message(conversation.id, MessageRole::User, "hello"))
        .await
        .unwrap();
    repository
        .insert_message(new_message(conversation.id, MessageRole::Assistant, "hi"))
        .await
        .unwrap();
    assert_eq!(
        repository
            .conversation_messages(conversation.id)
            .await
            .unwrap()
            .len(),
        2
    );

    assert!(repository
        .delete_conversation(user.id, conversation.id)
        .await
        .unwrap());

    // Messages go with the conversation; nothing orphaned stays retrievable
    assert!(repository
        .conversation_messages(conversation.id)
        .await
        .unwrap()
        .is_empty());
    assert!(repository
        .get_conversation(user.id, conversation.id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_conversations_are_owner_scoped() {
    let Some(repository) = test_repository().await else {
        return;
    };

    let owner = create_test_user(&repository).await;
    let other = create_test_user(&repository).await;
    let conversation = repository.create_conversation(owner.id).await.unwrap();

    assert!(repository
        .get_conversation(other.id, conversation.id)
        .await
        .unwrap()
        .is_none());
    assert!(!repository
        .delete_conversation(other.id, conversation.id)
        .await
        .unwrap());

    // Unaffected for the owner
    assert!(repository
        .get_conversation(owner.id, conversation.id)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_duplicate_username_rejected_by_storage() {
    let Some(repository) = test_repository().await else {
        return;
    };

    let user = create_test_user(&repository).await;

    // The register handler pre-checks with this lookup
    assert!(repository
        .get_user_by_username(&user.username)
        .await
        .unwrap()
        .is_some());

    let clash = repository
        .create_user(
            &format!("{}@example.com", unique("other")),
            &user.username,
            "not-a-real-hash",
            None,
        )
        .await;
    assert!(clash.is_err());
}

#[tokio::test]
async fn test_rate_limit_counter_carries_ttl_from_creation() {
    let Ok(url) = std::env::var("TEST_REDIS_URL") else {
        return;
    };

    let cache = RedisCache::connect(&RedisConfig { url: url.clone() })
        .await
        .expect("test redis unreachable");
    let key = unique("counter");

    assert_eq!(cache.incr_window(&key, 60).await.unwrap(), 1);

    // The TTL is set by the same atomic call that created the key, so the
    // counter can never outlive its window
    let client = redis::Client::open(url.as_str()).unwrap();
    let mut conn = client.get_multiplexed_async_connection().await.unwrap();
    let ttl: i64 = redis::cmd("TTL")
        .arg(&key)
        .query_async(&mut conn)
        .await
        .unwrap();
    assert!(ttl > 0 && ttl <= 60, "expected a live TTL, got {}", ttl);

    // Later increments count up without restarting the window
    assert_eq!(cache.incr_window(&key, 60).await.unwrap(), 2);
    let ttl_after: i64 = redis::cmd("TTL")
        .arg(&key)
        .query_async(&mut conn)
        .await
        .unwrap();
    assert!(ttl_after > 0 && ttl_after <= ttl);
}
