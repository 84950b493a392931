// Integration tests for the profile service
//
// Tests cover:
// - Full lifecycle for one account
// - Concurrent creation for the same account
// - Picture ingestion limits and cleanup
// - Storage failure injection

use std::sync::Arc;

use axum::body::Bytes;
use futures_util::{StreamExt, stream};
use gitconnect::error::AppError;
use gitconnect::models::account::{Account, AccountRepository};
use gitconnect::models::profile::{NewProfile, ProfileChanges};
use gitconnect::models::profile_repository::{ProfileRepository, create_profile_repository};
use gitconnect::services::{
    IngestionPolicy, Pagination, PictureIngestion, ProfileService, create_profile_service,
};
use gitconnect::storage::{ByteStream, LocalAssetStore, MemoryGateway, StorageGateway};
use tempfile::TempDir;

const MIB: usize = 1024 * 1024;

struct Harness {
    gateway: Arc<MemoryGateway>,
    repository: Arc<dyn ProfileRepository>,
    service: Arc<dyn ProfileService>,
    assets: TempDir,
}

async fn harness(accounts: &[&str]) -> Harness {
    let assets = tempfile::tempdir().unwrap();
    let gateway = Arc::new(MemoryGateway::new());
    let account_repo = AccountRepository::new(gateway.clone());
    for id in accounts {
        account_repo.seed(&Account::new(id, id)).await.unwrap();
    }

    let repository = create_profile_repository(gateway.clone()).await.unwrap();
    let ingestion = PictureIngestion::new(
        repository.clone(),
        Arc::new(LocalAssetStore::new(assets.path())),
        IngestionPolicy::default(),
    );

    Harness {
        gateway,
        service: create_profile_service(repository.clone(), ingestion),
        repository,
        assets,
    }
}

fn named(name: &str) -> NewProfile {
    NewProfile {
        display_name: name.to_string(),
        ..Default::default()
    }
}

fn bytes(len: usize) -> ByteStream<'static> {
    stream::once(async move { Ok(Bytes::from(vec![0x5A; len])) }).boxed()
}

fn stored_files(dir: &TempDir) -> Vec<String> {
    std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

// ============ Lifecycle ============

#[tokio::test]
async fn test_account_seven_lifecycle() {
    let h = harness(&["7"]).await;

    let created = h.service.create_profile("7", None, named("Ada")).await.unwrap();
    assert!(!created.id.is_empty());
    assert_eq!(created.created_at, created.updated_at);

    let err = h
        .service
        .create_profile("7", None, named("Ada again"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let updated = h
        .service
        .update_profile(
            "7",
            &created.id,
            ProfileChanges {
                bio: Some(Some("Poetical science".into())),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(updated.updated_at > created.updated_at);
    assert_eq!(updated.created_at, created.created_at);
    assert_eq!(updated.bio.as_deref(), Some("Poetical science"));

    let locator = h
        .service
        .upload_picture("7", bytes(3 * MIB), "image/jpeg", (3 * MIB) as u64)
        .await
        .unwrap();
    let fetched = h.service.read_profile(&created.id).await.unwrap();
    assert_eq!(fetched.picture, Some(locator.clone()));
    assert_eq!(stored_files(&h.assets), vec![locator.as_str().to_string()]);

    let removed = h.service.delete_profile("7", &created.id).await.unwrap();
    assert_eq!(removed.id, created.id);
    assert!(stored_files(&h.assets).is_empty());

    let err = h.service.read_profile(&created.id).await.unwrap_err();
    assert!(matches!(err, AppError::ProfileNotFound(_)));
}

#[tokio::test]
async fn test_round_trip_preserves_client_fields() {
    let h = harness(&["7"]).await;
    let created = h
        .service
        .create_profile(
            "7",
            None,
            NewProfile {
                display_name: "  Ada  ".into(),
                bio: Some("Notes on the engine".into()),
                github: Some("ada".into()),
            },
        )
        .await
        .unwrap();

    let fetched = h.repository.get_by_id(&created.id).await.unwrap();
    assert_eq!(fetched, created);
    assert_eq!(fetched.display_name, "  Ada  ");
    assert_eq!(fetched.bio.as_deref(), Some("Notes on the engine"));
    assert_eq!(fetched.github.as_deref(), Some("ada"));
    assert_eq!(fetched.account_id, "7");
    assert!(fetched.picture.is_none());
}

#[tokio::test]
async fn test_unknown_account_persists_nothing() {
    let h = harness(&[]).await;
    let err = h
        .service
        .create_profile("404", None, named("Nobody"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::AccountNotFound(_)));
    assert_eq!(h.gateway.count("profile").await.unwrap(), 0);
}

#[tokio::test]
async fn test_clearing_optional_fields() {
    let h = harness(&["7"]).await;
    let created = h
        .service
        .create_profile(
            "7",
            None,
            NewProfile {
                display_name: "Ada".into(),
                bio: Some("temporary".into()),
                github: Some("ada".into()),
            },
        )
        .await
        .unwrap();

    let updated = h
        .service
        .update_profile(
            "7",
            &created.id,
            ProfileChanges {
                bio: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(updated.bio.is_none());
    assert_eq!(updated.github.as_deref(), Some("ada"));

    let err = h
        .service
        .update_profile(
            "7",
            &created.id,
            ProfileChanges {
                display_name: Some(" ".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert!(h.service.read_profile(&created.id).await.unwrap().bio.is_none());
}

// ============ Concurrency ============

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_single_winner() {
    let h = harness(&["7"]).await;

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let service = h.service.clone();
            tokio::spawn(async move {
                service
                    .create_profile("7", None, named(&format!("Ada {i}")))
                    .await
            })
        })
        .collect();

    let mut created = 0;
    let mut conflicts = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => created += 1,
            Err(AppError::Conflict(_)) => conflicts += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(conflicts, 15);
    assert_eq!(h.repository.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_listing_pages() {
    let ids: Vec<String> = (0..25).map(|i| format!("acc{i}")).collect();
    let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let h = harness(&refs).await;
    for id in &refs {
        h.service.create_profile(id, None, named(id)).await.unwrap();
    }

    let first = h
        .service
        .list_profiles(Some(Pagination::new(1, 10)))
        .await
        .unwrap();
    let last = h
        .service
        .list_profiles(Some(Pagination::new(3, 10)))
        .await
        .unwrap();
    assert_eq!(first.profiles.len(), 10);
    assert_eq!(last.profiles.len(), 5);
    assert_eq!(first.total, 25);

    let all = h.service.list_profiles(None).await.unwrap();
    assert_eq!(all.profiles.len(), 25);
}

// ============ Picture ingestion ============

#[tokio::test]
async fn test_picture_size_boundary() {
    let h = harness(&["7"]).await;
    h.service.create_profile("7", None, named("Ada")).await.unwrap();

    let err = h
        .service
        .upload_picture("7", bytes(5 * MIB + 1), "image/png", (5 * MIB + 1) as u64)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PayloadTooLarge { .. }));
    assert!(stored_files(&h.assets).is_empty());

    h.service
        .upload_picture("7", bytes(5 * MIB), "image/png", (5 * MIB) as u64)
        .await
        .unwrap();
    assert_eq!(stored_files(&h.assets).len(), 1);
}

#[tokio::test]
async fn test_pdf_rejected_regardless_of_size() {
    let h = harness(&["7"]).await;
    h.service.create_profile("7", None, named("Ada")).await.unwrap();

    let err = h
        .service
        .upload_picture("7", bytes(4), "application/pdf", 4)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::UnsupportedMediaType(_)));
    assert!(h.service.read_own_profile("7").await.unwrap().picture.is_none());
}

#[tokio::test]
async fn test_failed_stream_leaves_no_partial_file() {
    let h = harness(&["7"]).await;
    h.service.create_profile("7", None, named("Ada")).await.unwrap();

    let broken: ByteStream<'static> = stream::iter(vec![
        Ok(Bytes::from_static(b"\xFF\xD8\xFF")),
        Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "client went away")),
    ])
    .boxed();

    let result = h.service.upload_picture("7", broken, "image/jpeg", 64).await;
    assert!(result.is_err());
    assert!(stored_files(&h.assets).is_empty());
    assert!(h.service.read_own_profile("7").await.unwrap().picture.is_none());
}
