use super::*;

use shared::domain::{CompanyId, ContractType, JobOffer, JobOfferId};

fn sample_profile(id: &str) -> UserProfile {
    let mut profile = UserProfile::new(UserId::new(id), format!("{id}@example.com"));
    profile.first_name = "Ada".into();
    profile.last_name = "Lovelace".into();
    profile
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn missing_profile_loads_as_none() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let loaded = storage
        .load_user_profile(&UserId::new("nobody"))
        .await
        .expect("query");
    assert!(loaded.is_none());
}

#[tokio::test]
async fn saving_profile_overwrites_whole_document() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let mut profile = sample_profile("u1");
    storage.save_user_profile(&profile).await.expect("first save");

    profile.pending_applications.insert(
        "j1".into(),
        JobOffer {
            id: JobOfferId::new("j1"),
            company_id: CompanyId::new("acme"),
            profession: "Backend Engineer".into(),
            description: String::new(),
            contract_type: ContractType::Internship,
            location: "Lyon".into(),
            salary: None,
        },
    );
    profile.bio = "rewritten".into();
    storage.save_user_profile(&profile).await.expect("second save");

    let stored = storage
        .load_user_profile(&UserId::new("u1"))
        .await
        .expect("query")
        .expect("profile exists");
    assert_eq!(stored, profile);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_profiles")
        .fetch_one(storage.pool())
        .await
        .expect("count");
    assert_eq!(count, 1);
}

#[tokio::test]
async fn malformed_profile_document_is_an_error() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    sqlx::query("INSERT INTO user_profiles (user_id, document) VALUES ('broken', '{not json')")
        .execute(storage.pool())
        .await
        .expect("raw insert");

    let err = storage
        .load_user_profile(&UserId::new("broken"))
        .await
        .expect_err("must fail");
    assert!(err.to_string().contains("malformed profile document"));
}

#[tokio::test]
async fn blobs_round_trip_with_normalized_paths() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage
        .store_blob("/profile_images/u1.png", b"png-bytes", Some("image/png"))
        .await
        .expect("store");

    let bytes = storage
        .load_blob("profile_images/u1.png")
        .await
        .expect("query")
        .expect("blob exists");
    assert_eq!(bytes, b"png-bytes");

    let (mime_type, size_bytes): (Option<String>, i64) =
        sqlx::query_as("SELECT mime_type, size_bytes FROM blobs WHERE path = ?")
            .bind("profile_images/u1.png")
            .fetch_one(storage.pool())
            .await
            .expect("metadata");
    assert_eq!(mime_type.as_deref(), Some("image/png"));
    assert_eq!(size_bytes, 9);

    assert!(storage
        .load_blob("profile_images/other.png")
        .await
        .expect("query")
        .is_none());
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("storage.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );
}

#[test]
fn memory_urls_have_no_filesystem_path() {
    assert!(sqlite_path("sqlite::memory:").is_none());
    assert_eq!(
        sqlite_path("sqlite://./data/client.db?mode=rwc"),
        Some(PathBuf::from("./data/client.db"))
    );
}
