//! Load generator integration tests.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use s3probe_core::ProbeError;
    use s3probe_loadgen::{GeneratorKind, LoadConfig, LoadTest};
    use s3probe_suite::collect_keys;

    use crate::{cleanup_bucket, create_test_bucket};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_upload_documents_into_containers() {
        let store = create_test_bucket("load").await;
        store.put_folder("load/", HashMap::new()).await.expect("root");

        let config = LoadConfig::builder()
            .threads(2)
            .containers(2)
            .documents_per_container(3)
            .root("load")
            .generator(GeneratorKind::Sequential)
            .json_sidecar(true)
            .build();
        let report = LoadTest::new(store.clone(), config).run().await.expect("run");

        assert_eq!(report.containers_created, 2);
        assert_eq!(report.documents_created, 6);
        assert_eq!(report.documents_failed, 0);

        let keys = collect_keys(&store, "load/", 100, None).await.expect("keys");
        assert_eq!(keys.iter().filter(|k| k.ends_with(".pdf")).count(), 6);
        assert_eq!(keys.iter().filter(|k| k.ends_with(".json")).count(), 6);

        let pdf = keys.iter().find(|k| k.ends_with(".pdf")).expect("pdf key");
        let head = store.head_object(store.path_of(pdf), None).await.expect("head");
        assert_eq!(head.content_type.as_deref(), Some("application/pdf"));
        assert!(head.metadata.contains_key("uuid"));

        cleanup_bucket(&store).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_refuse_missing_root() {
        let store = create_test_bucket("noroot").await;

        let config = LoadConfig::builder().root("absent").build();
        let err = LoadTest::new(store.clone(), config)
            .run()
            .await
            .expect_err("missing root");
        assert!(matches!(err, ProbeError::Config(_)));

        cleanup_bucket(&store).await;
    }
}
