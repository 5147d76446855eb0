//! Integration tests for the SecureVault vault store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use securevault::crypto::Argon2Params;
use securevault::errors::{Result, VaultError};
use securevault::identity::Principal;
use securevault::storage::{BlobStorage, MemoryStorage};
use securevault::validation::Field;
use securevault::vault::{NewCredential, StoreOptions, VaultStore};
use uuid::Uuid;

const PASSWORD: &str = "correct horse battery";

fn options() -> StoreOptions {
    StoreOptions {
        argon2_params: Argon2Params {
            memory_kib: 8_192,
            iterations: 1,
            parallelism: 1,
        },
        io_timeout: Duration::from_secs(5),
    }
}

fn principal(id: &str) -> Principal {
    Principal {
        id: id.to_string(),
        email: format!("{id}@example.com"),
    }
}

/// Helper: unlock and load a store for `alice` over `storage`.
async fn open(storage: &MemoryStorage, password: &str) -> VaultStore {
    let store = VaultStore::unlock(
        principal("alice"),
        password,
        Arc::new(storage.clone()),
        options(),
    )
    .await
    .expect("unlock");
    store.load().await.expect("load");
    store
}

fn github() -> NewCredential {
    NewCredential::new("https://github.com", "octocat", "hunter2-gh")
}

/// Storage whose writes fail while `fail_writes` is set.
#[derive(Clone, Default)]
struct FlakyStorage {
    inner: MemoryStorage,
    fail_writes: Arc<AtomicBool>,
}

#[async_trait]
impl BlobStorage for FlakyStorage {
    async fn read_blob(&self, principal_id: &str) -> Result<Option<Vec<u8>>> {
        self.inner.read_blob(principal_id).await
    }

    async fn write_blob(&self, principal_id: &str, bytes: &[u8]) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full").into());
        }
        self.inner.write_blob(principal_id, bytes).await
    }
}

/// Storage that never answers a write in time.
struct StalledStorage;

#[async_trait]
impl BlobStorage for StalledStorage {
    async fn read_blob(&self, _principal_id: &str) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    async fn write_blob(&self, _principal_id: &str, _bytes: &[u8]) -> Result<()> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    }
}

/// Rewrite the cleartext header JSON of a sealed blob, keeping the layout
/// valid (magic, version, corrected length, untouched body and tag).
fn rewrite_header(blob: &[u8], edit: impl FnOnce(&mut serde_json::Value)) -> Vec<u8> {
    let header_len = u32::from_le_bytes(blob[5..9].try_into().unwrap()) as usize;
    let header_end = 9 + header_len;
    let mut header: serde_json::Value = serde_json::from_slice(&blob[9..header_end]).unwrap();
    edit(&mut header);
    let header_bytes = serde_json::to_vec(&header).unwrap();

    let mut out = blob[..5].to_vec();
    out.extend_from_slice(&(header_bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(&header_bytes);
    out.extend_from_slice(&blob[header_end..]);
    out
}

/// Seal one record for alice, rewrite the header, and reopen it.
async fn reopen_with_header(edit: impl FnOnce(&mut serde_json::Value)) -> VaultStore {
    let storage = MemoryStorage::new();
    open(&storage, PASSWORD).await.add(github()).await.unwrap();
    storage.put("alice", rewrite_header(&storage.get("alice").unwrap(), edit));

    tokio::time::timeout(
        Duration::from_secs(10),
        VaultStore::unlock(
            principal("alice"),
            PASSWORD,
            Arc::new(storage.clone()),
            options(),
        ),
    )
    .await
    .expect("unlock must not stall on stored KDF parameters")
    .expect("unlock")
}

// ---------------------------------------------------------------------------
// add / list / remove / reveal
// ---------------------------------------------------------------------------

#[tokio::test]
async fn add_then_list_ends_with_the_input() {
    let storage = MemoryStorage::new();
    let store = open(&storage, PASSWORD).await;

    store
        .add(NewCredential::new("https://a.example", "first", "pw-first"))
        .await
        .unwrap();
    let added = store.add(github()).await.unwrap();

    let list = store.list().await.unwrap();
    let last = list.last().unwrap();
    assert_eq!(last, &added);
    assert_eq!(last.website, "https://github.com");
    assert_eq!(last.username, "octocat");
    assert_eq!(last.secret.expose(), "hunter2-gh");
    assert_eq!(store.len().await.unwrap(), 2);
}

#[tokio::test]
async fn website_is_stored_exactly_as_given() {
    let storage = MemoryStorage::new();
    let store = open(&storage, PASSWORD).await;

    let added = store
        .add(NewCredential::new("  https://github.com/login ", "octocat", "pw"))
        .await
        .unwrap();
    assert_eq!(added.website, "  https://github.com/login ");
    assert_eq!(added.host(), "github.com");

    let reopened = open(&storage, PASSWORD).await;
    assert_eq!(reopened.list().await.unwrap(), vec![added]);
}

#[tokio::test]
async fn remove_excludes_id_and_second_remove_is_not_found() {
    let storage = MemoryStorage::new();
    let store = open(&storage, PASSWORD).await;
    let record = store.add(github()).await.unwrap();

    store.remove(record.id).await.unwrap();
    assert!(store.list().await.unwrap().iter().all(|r| r.id != record.id));

    let err = store.remove(record.id).await.unwrap_err();
    assert!(matches!(err, VaultError::NotFound(id) if id == record.id));
}

#[tokio::test]
async fn reveal_after_remove_is_not_found() {
    let storage = MemoryStorage::new();
    let store = open(&storage, PASSWORD).await;
    let record = store.add(github()).await.unwrap();

    assert_eq!(store.reveal(record.id).await.unwrap().expose(), "hunter2-gh");
    store.remove(record.id).await.unwrap();
    assert!(matches!(
        store.reveal(record.id).await,
        Err(VaultError::NotFound(_))
    ));
}

#[tokio::test]
async fn invalid_website_is_rejected_before_anything_is_written() {
    let storage = MemoryStorage::new();
    let store = open(&storage, PASSWORD).await;

    let err = store
        .add(NewCredential::new("not-a-url", "u", "p"))
        .await
        .unwrap_err();
    match err {
        VaultError::Validation(v) => assert_eq!(v.field, Field::Website),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(storage.get("alice").is_none());
    assert!(store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn validation_reports_the_first_invalid_field() {
    let storage = MemoryStorage::new();
    let store = open(&storage, PASSWORD).await;

    let cases = [
        (NewCredential::new("nope", "", ""), Field::Website),
        (NewCredential::new("https://ok.example", "  ", ""), Field::Username),
        (NewCredential::new("https://ok.example", "user", ""), Field::Secret),
    ];
    for (candidate, field) in cases {
        match store.add(candidate).await {
            Err(VaultError::Validation(v)) => assert_eq!(v.field, field),
            other => panic!("expected {field} error, got {other:?}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn records_survive_a_restart_in_insertion_order() {
    let storage = MemoryStorage::new();
    let expected = {
        let store = open(&storage, PASSWORD).await;
        let a = store
            .add(NewCredential::new("https://a.example", "ann", "pw-a"))
            .await
            .unwrap();
        let b = store
            .add(NewCredential::new("https://b.example", "ben", "pw-b"))
            .await
            .unwrap();
        let c = store
            .add(NewCredential::new("https://c.example", "cat", "pw-c"))
            .await
            .unwrap();
        let d = store
            .add(NewCredential::new("https://d.example", "dan", "pw-d"))
            .await
            .unwrap();
        store.remove(b.id).await.unwrap();
        store.close().await;
        vec![a, c, d]
    };

    let reopened = open(&storage, PASSWORD).await;
    assert_eq!(reopened.list().await.unwrap(), expected);
    assert_eq!(reopened.load().await.unwrap(), expected);
}

#[tokio::test]
async fn absent_blob_loads_as_empty_vault() {
    let storage = MemoryStorage::new();
    let store = open(&storage, PASSWORD).await;
    assert!(store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn operations_before_load_fail_with_not_loaded() {
    let store = VaultStore::unlock(
        principal("alice"),
        PASSWORD,
        Arc::new(MemoryStorage::new()),
        options(),
    )
    .await
    .unwrap();

    assert!(matches!(store.list().await, Err(VaultError::VaultNotLoaded)));
    assert!(matches!(
        store.add(github()).await,
        Err(VaultError::VaultNotLoaded)
    ));
    assert!(matches!(
        store.remove(Uuid::new_v4()).await,
        Err(VaultError::VaultNotLoaded)
    ));
}

#[tokio::test]
async fn stored_blob_never_contains_plaintext() {
    let storage = MemoryStorage::new();
    let store = open(&storage, PASSWORD).await;
    store.add(github()).await.unwrap();

    let blob = storage.get("alice").unwrap();
    let haystack = String::from_utf8_lossy(&blob);
    assert!(blob.starts_with(b"SVLT"));
    assert!(!haystack.contains("hunter2-gh"));
    assert!(!haystack.contains("octocat"));
    assert!(!haystack.contains(PASSWORD));
}

#[tokio::test]
async fn failed_write_forces_a_reload() {
    let storage = FlakyStorage::default();
    let store = VaultStore::unlock(
        principal("alice"),
        PASSWORD,
        Arc::new(storage.clone()),
        options(),
    )
    .await
    .unwrap();
    store.load().await.unwrap();
    let kept = store.add(github()).await.unwrap();

    storage.fail_writes.store(true, Ordering::SeqCst);
    let err = store
        .add(NewCredential::new("https://lost.example", "ghost", "pw"))
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::Io(_)));
    assert!(matches!(store.list().await, Err(VaultError::VaultNotLoaded)));

    storage.fail_writes.store(false, Ordering::SeqCst);
    assert_eq!(store.load().await.unwrap(), vec![kept]);
}

#[tokio::test]
async fn stalled_storage_times_out() {
    let store = VaultStore::unlock(
        principal("alice"),
        PASSWORD,
        Arc::new(StalledStorage),
        StoreOptions {
            io_timeout: Duration::from_millis(50),
            ..options()
        },
    )
    .await
    .unwrap();
    store.load().await.unwrap();

    let err = store.add(github()).await.unwrap_err();
    assert!(matches!(err, VaultError::StorageTimeout(_)));
}

#[tokio::test]
async fn concurrent_adds_are_all_persisted() {
    let storage = MemoryStorage::new();
    let store = Arc::new(open(&storage, PASSWORD).await);

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .add(NewCredential::new(
                    format!("https://site{i}.example"),
                    format!("user{i}"),
                    format!("pw-{i}"),
                ))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let reopened = open(&storage, PASSWORD).await;
    assert_eq!(reopened.len().await.unwrap(), 8);
}

// ---------------------------------------------------------------------------
// Corruption and scoping
// ---------------------------------------------------------------------------

#[tokio::test]
async fn tampered_blob_is_corrupt_until_reset() {
    let storage = MemoryStorage::new();
    {
        let store = open(&storage, PASSWORD).await;
        store.add(github()).await.unwrap();
    }

    let mut blob = storage.get("alice").unwrap();
    let idx = blob.len() - 40;
    blob[idx] ^= 0x01;
    storage.put("alice", blob);

    let store = VaultStore::unlock(
        principal("alice"),
        PASSWORD,
        Arc::new(storage.clone()),
        options(),
    )
    .await
    .unwrap();

    assert!(matches!(store.load().await, Err(VaultError::CorruptStore(_))));
    assert!(matches!(store.list().await, Err(VaultError::CorruptStore(_))));
    assert!(matches!(
        store.add(github()).await,
        Err(VaultError::CorruptStore(_))
    ));

    store.reset().await.unwrap();
    assert!(store.list().await.unwrap().is_empty());
    assert!(store.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn oversized_header_memory_cost_is_corrupt_not_fatal() {
    let store = reopen_with_header(|h| {
        h["argon2_params"] = serde_json::json!({
            "memory_kib": u32::MAX,
            "iterations": 1,
            "parallelism": 1,
        });
    })
    .await;

    match store.load().await {
        Err(VaultError::CorruptStore(reason)) => assert!(reason.contains("KDF"), "{reason}"),
        other => panic!("expected corrupt store, got {other:?}"),
    }
    store.reset().await.unwrap();
    assert!(store.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn oversized_header_iteration_count_is_corrupt() {
    let store = reopen_with_header(|h| {
        h["argon2_params"] = serde_json::json!({
            "memory_kib": 65_536,
            "iterations": 300,
            "parallelism": 1,
        });
    })
    .await;

    assert!(matches!(store.load().await, Err(VaultError::CorruptStore(_))));
}

#[tokio::test]
async fn header_memory_cost_below_the_floor_is_corrupt() {
    let store = reopen_with_header(|h| {
        h["argon2_params"]["memory_kib"] = serde_json::json!(1_024);
    })
    .await;

    assert!(matches!(store.load().await, Err(VaultError::CorruptStore(_))));
}

#[tokio::test]
async fn rewritten_header_salt_is_corrupt() {
    // Same length, different bytes: the key derives but the HMAC fails.
    let store = reopen_with_header(|h| {
        h["salt"] = serde_json::json!("AQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQE=");
    })
    .await;
    assert!(matches!(store.load().await, Err(VaultError::CorruptStore(_))));

    // Wrong length: rejected before any derivation.
    let store = reopen_with_header(|h| {
        h["salt"] = serde_json::json!("AAAA");
    })
    .await;
    assert!(matches!(store.load().await, Err(VaultError::CorruptStore(_))));
}

#[tokio::test]
async fn wrong_password_cannot_open_the_blob() {
    let storage = MemoryStorage::new();
    open(&storage, PASSWORD).await.add(github()).await.unwrap();

    let store = VaultStore::unlock(
        principal("alice"),
        "not the password",
        Arc::new(storage.clone()),
        options(),
    )
    .await
    .unwrap();
    assert!(matches!(store.load().await, Err(VaultError::CorruptStore(_))));
}

#[tokio::test]
async fn blobs_are_scoped_per_principal() {
    let storage = MemoryStorage::new();
    open(&storage, PASSWORD).await.add(github()).await.unwrap();

    let bob = VaultStore::unlock(
        principal("bob"),
        PASSWORD,
        Arc::new(storage.clone()),
        options(),
    )
    .await
    .unwrap();
    assert!(bob.load().await.unwrap().is_empty());

    // Alice's blob copied into Bob's slot is rejected, not decrypted.
    storage.put("bob", storage.get("alice").unwrap());
    let bob = VaultStore::unlock(
        principal("bob"),
        PASSWORD,
        Arc::new(storage.clone()),
        options(),
    )
    .await
    .unwrap();
    assert!(matches!(bob.load().await, Err(VaultError::CorruptStore(_))));
}

#[tokio::test]
async fn closed_store_rejects_every_operation() {
    let storage = MemoryStorage::new();
    let store = open(&storage, PASSWORD).await;
    let record = store.add(github()).await.unwrap();

    store.close().await;
    assert!(!store.is_open());
    assert!(matches!(store.list().await, Err(VaultError::SessionClosed)));
    assert!(matches!(store.load().await, Err(VaultError::SessionClosed)));
    assert!(matches!(
        store.reveal(record.id).await,
        Err(VaultError::SessionClosed)
    ));
    assert!(matches!(store.reset().await, Err(VaultError::SessionClosed)));
}
