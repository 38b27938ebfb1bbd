//! Storage facade integration tests.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use bytes::Bytes;
    use s3probe_client::{FOLDER_CONTENT_TYPE, PutOptions, VersioningState};
    use s3probe_suite::collect_keys;

    use crate::{cleanup_bucket, create_test_bucket, populate};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_round_trip_object_with_metadata() {
        let store = create_test_bucket("object").await;

        let metadata = HashMap::from([("document-status".to_owned(), "first".to_owned())]);
        let options = PutOptions::builder()
            .content_type("text/plain")
            .content_encoding("UTF-8")
            .content_md5(true)
            .metadata(metadata.clone())
            .build();
        store
            .put_object("test/a.txt", Bytes::from_static(b"hello"), &options)
            .await
            .expect("put");

        let object = store.get_object("test/a.txt", None).await.expect("get");
        assert_eq!(object.body.as_ref(), b"hello");
        assert_eq!(object.content_type.as_deref(), Some("text/plain"));
        assert_eq!(object.metadata, metadata);

        let head = store.head_object("test/a.txt", None).await.expect("head");
        assert_eq!(head.size, 5);

        cleanup_bucket(&store).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_create_folder_object() {
        let store = create_test_bucket("folder").await;

        store
            .put_folder("load/", HashMap::new())
            .await
            .expect("folder");
        let head = store.head_object("load/", None).await.expect("head");
        assert_eq!(head.size, 0);
        assert_eq!(head.content_type.as_deref(), Some(FOLDER_CONTENT_TYPE));

        cleanup_bucket(&store).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_copy_with_replaced_metadata() {
        let store = create_test_bucket("copy").await;
        let options = PutOptions::builder()
            .metadata(HashMap::from([("k".to_owned(), "old".to_owned())]))
            .build();
        store
            .put_object("src.bin", Bytes::from_static(b"data"), &options)
            .await
            .expect("put");

        store
            .copy_object("src.bin", "dst.bin", HashMap::from([("k".to_owned(), "new".to_owned())]))
            .await
            .expect("copy");

        let head = store.head_object("dst.bin", None).await.expect("head");
        assert_eq!(head.metadata.get("k").map(String::as_str), Some("new"));
        assert_eq!(head.size, 4);

        cleanup_bucket(&store).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_toggle_versioning() {
        let store = create_test_bucket("ver").await;

        assert_eq!(store.versioning().await.expect("get"), VersioningState::Unversioned);
        store.set_versioning(true).await.expect("enable");
        assert_eq!(store.versioning().await.expect("get"), VersioningState::Enabled);

        let options = PutOptions::builder().build();
        let first = store
            .put_object("v.txt", Bytes::from_static(b"1"), &options)
            .await
            .expect("put 1");
        let second = store
            .put_object("v.txt", Bytes::from_static(b"2"), &options)
            .await
            .expect("put 2");
        assert_ne!(first.version_id, second.version_id);

        let old = store
            .get_object("v.txt", first.version_id.as_deref())
            .await
            .expect("get old version");
        assert_eq!(old.body.as_ref(), b"1");

        cleanup_bucket(&store).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_report_empty_tags_and_bucket_acl() {
        let store = create_test_bucket("settings").await;

        assert!(store.tags().await.expect("tags").is_empty());
        let acl = store.acl().await.expect("acl");
        assert!(!acl.grants.is_empty());
        assert!(store.bucket_exists().await.expect("exists"));
        assert!(
            !store
                .with_bucket(crate::test_bucket_name("none"))
                .bucket_exists()
                .await
                .expect("exists")
        );

        cleanup_bucket(&store).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_delete_keys_in_batches() {
        let store = create_test_bucket("batch").await;
        populate(&store, "del/", 1005).await;

        let keys = collect_keys(&store, "del/", 1000, None).await.expect("keys");
        assert_eq!(keys.len(), 1005);
        assert_eq!(store.delete_keys(&keys).await.expect("delete"), 1005);
        assert!(collect_keys(&store, "del/", 1000, None).await.expect("keys").is_empty());

        cleanup_bucket(&store).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_serve_presigned_url() {
        let store = create_test_bucket("presign").await;
        store
            .put_object("p.txt", Bytes::from_static(b"signed"), &PutOptions::builder().build())
            .await
            .expect("put");

        let url = store
            .presign_get("p.txt", Duration::from_secs(60))
            .await
            .expect("presign");
        let body = reqwest::get(&url)
            .await
            .expect("get")
            .error_for_status()
            .expect("status")
            .bytes()
            .await
            .expect("body");
        assert_eq!(body.as_ref(), b"signed");

        cleanup_bucket(&store).await;
    }
}
