//! Behaviour every backend must share, written once against `&dyn Store`.

#![allow(dead_code)]

use tunnel_core::{NewUrl, ShortCode, StorageError, Store};
use tunnel_generator::{generate, Alphabet};
use tunnel_test_infra::fixtures::{new_url, random_code, random_origin, random_uuid};

pub async fn create_is_idempotent_on_origin(store: &dyn Store) {
    let origin = random_origin();
    let first = store.url().create(new_url(&origin)).await.unwrap();

    let err = store.url().create(new_url(&origin)).await.unwrap_err();
    let StorageError::UrlExists(existing) = err else {
        panic!("expected UrlExists, got {err:?}");
    };

    assert_eq!(existing.id, first.id);
    assert_eq!(existing.short_url, first.short_url);
    assert_eq!(existing.original_url, origin);
}

pub async fn create_prefixes_missing_scheme(store: &dyn Store) {
    let origin = random_origin();
    let bare = origin.trim_start_matches("https://").to_string();

    let url = store.url().create(new_url(bare)).await.unwrap();
    assert_eq!(url.original_url, origin);

    let err = store.url().create(new_url(&origin)).await.unwrap_err();
    assert!(matches!(err, StorageError::UrlExists(_)));
}

pub async fn create_rejects_invalid_origin(store: &dyn Store) {
    let err = store
        .url()
        .create(new_url("https://not a host/"))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidUrl(_)));
}

pub async fn create_rejects_taken_short_code(store: &dyn Store) {
    let code = random_code();
    store
        .url()
        .create(NewUrl::new(code.clone(), random_origin()))
        .await
        .unwrap();

    let err = store
        .url()
        .create(NewUrl::new(code.clone(), random_origin()))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::ShortCodeCollision(c) if c == code.as_str()));
}

pub async fn resubmitted_record_is_reported_existing(store: &dyn Store) {
    let request = new_url(random_origin());
    let first = store.url().create(request.clone()).await.unwrap();

    let err = store.url().create(request).await.unwrap_err();
    assert!(matches!(err, StorageError::UrlExists(existing) if existing == first));
}

pub async fn origins_differing_in_case_are_distinct(store: &dyn Store) {
    let origin = random_origin();
    let lower = store
        .url()
        .create(new_url(format!("{origin}/path")))
        .await
        .unwrap();
    let upper = store
        .url()
        .create(new_url(format!("{origin}/PATH")))
        .await
        .unwrap();

    assert_ne!(lower.id, upper.id);
    assert_eq!(upper.original_url, format!("{origin}/PATH"));
}

pub async fn short_codes_are_case_sensitive(store: &dyn Store) {
    let lower = ShortCode::new_unchecked(format!("cs{}", generate(6, Alphabet::Lowercase)));
    let upper = ShortCode::new_unchecked(lower.as_str().to_ascii_uppercase());

    let url = store
        .url()
        .create(NewUrl::new(lower.clone(), random_origin()))
        .await
        .unwrap();
    assert_eq!(store.url().find_by_short_code(&upper).await.unwrap(), None);

    let other = store
        .url()
        .create(NewUrl::new(upper.clone(), random_origin()))
        .await
        .unwrap();
    assert_ne!(other.id, url.id);
    assert_eq!(
        store.url().find_by_short_code(&lower).await.unwrap(),
        Some(url)
    );
    assert_eq!(
        store.url().find_by_short_code(&upper).await.unwrap(),
        Some(other)
    );
}

pub async fn ids_increase(store: &dyn Store) {
    let a = store.url().create(new_url(random_origin())).await.unwrap();
    let b = store.url().create(new_url(random_origin())).await.unwrap();
    assert!(b.id > a.id);
}

pub async fn lookups_find_created_records(store: &dyn Store) {
    let url = store.url().create(new_url(random_origin())).await.unwrap();

    assert_eq!(store.url().find_by_id(url.id).await.unwrap(), Some(url.clone()));
    assert_eq!(
        store.url().find_by_short_code(&url.short_url).await.unwrap(),
        Some(url)
    );
}

pub async fn lookups_miss_without_error(store: &dyn Store) {
    assert_eq!(store.url().find_by_id(999_999).await.unwrap(), None);
    assert_eq!(
        store
            .url()
            .find_by_short_code(&ShortCode::new_unchecked("missing1"))
            .await
            .unwrap(),
        None
    );
    assert!(store.url().find_by_user_id(999_999).await.unwrap().is_empty());
    assert_eq!(store.user().find_by_uuid(&random_uuid()).await.unwrap(), None);
    assert_eq!(store.user().find_by_id(999_999).await.unwrap(), None);
}

pub async fn user_create_is_idempotent(store: &dyn Store) {
    let uuid = random_uuid();
    let first = store.user().create(&uuid).await.unwrap();
    let second = store.user().create(&uuid).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(store.user().find_by_uuid(&uuid).await.unwrap(), Some(first.clone()));
    assert_eq!(store.user().find_by_id(first.id).await.unwrap(), Some(first));

    let other = store.user().create(&random_uuid()).await.unwrap();
    assert_ne!(other.id, second.id);
}

pub async fn owner_attach_is_idempotent(store: &dyn Store) {
    let user = store.user().create(&random_uuid()).await.unwrap();
    let url = store.url().create(new_url(random_origin())).await.unwrap();
    assert_eq!(url.user_id, None);

    let owned = store.url().update_owner(&url, user.id).await.unwrap();
    let again = store.url().update_owner(&owned, user.id).await.unwrap();

    assert_eq!(owned.user_id, Some(user.id));
    assert_eq!(again, owned);
    assert_eq!(store.url().find_by_user_id(user.id).await.unwrap(), vec![owned]);
}

pub async fn existing_record_reports_its_owner(store: &dyn Store) {
    let user = store.user().create(&random_uuid()).await.unwrap();
    let origin = random_origin();
    let url = store.url().create(new_url(&origin)).await.unwrap();
    store.url().update_owner(&url, user.id).await.unwrap();

    let err = store.url().create(new_url(&origin)).await.unwrap_err();
    assert!(matches!(err, StorageError::UrlExists(existing) if existing.user_id == Some(user.id)));
}

pub async fn batch_delete_tombstones_only_requested(store: &dyn Store) {
    let user = store.user().create(&random_uuid()).await.unwrap();
    let mut owned = vec![];
    for _ in 0..3 {
        let url = store.url().create(new_url(random_origin())).await.unwrap();
        owned.push(store.url().update_owner(&url, user.id).await.unwrap());
    }

    store
        .url()
        .batch_delete(&[owned[0].id, owned[2].id])
        .await
        .unwrap();

    let urls = store.url().find_by_user_id(user.id).await.unwrap();
    assert_eq!(urls.len(), 3);
    assert_eq!(urls.iter().filter(|u| u.is_deleted).count(), 2);
    assert!(!urls.iter().find(|u| u.id == owned[1].id).unwrap().is_deleted);
}

pub async fn delete_is_monotonic(store: &dyn Store) {
    let url = store.url().create(new_url(random_origin())).await.unwrap();

    store.url().delete(&url).await.unwrap();
    store.url().delete(&url).await.unwrap();
    store.url().batch_delete(&[url.id, 999_999]).await.unwrap();
    store.url().batch_delete(&[]).await.unwrap();

    let stored = store.url().find_by_id(url.id).await.unwrap().unwrap();
    assert!(stored.is_deleted);

    let user = store.user().create(&random_uuid()).await.unwrap();
    let owned = store.url().update_owner(&stored, user.id).await.unwrap();
    assert!(owned.is_deleted);
}

pub async fn ping_succeeds(store: &dyn Store) {
    store.ping().await.unwrap();
}

/// Runs every shared behaviour against one store.
pub async fn run_all(store: &dyn Store) {
    create_is_idempotent_on_origin(store).await;
    create_prefixes_missing_scheme(store).await;
    create_rejects_invalid_origin(store).await;
    create_rejects_taken_short_code(store).await;
    resubmitted_record_is_reported_existing(store).await;
    origins_differing_in_case_are_distinct(store).await;
    short_codes_are_case_sensitive(store).await;
    ids_increase(store).await;
    lookups_find_created_records(store).await;
    lookups_miss_without_error(store).await;
    user_create_is_idempotent(store).await;
    owner_attach_is_idempotent(store).await;
    existing_record_reports_its_owner(store).await;
    batch_delete_tombstones_only_requested(store).await;
    delete_is_monotonic(store).await;
    ping_succeeds(store).await;
}
