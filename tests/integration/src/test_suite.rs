//! Suite integration tests.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use bytes::Bytes;
    use s3probe_client::PutOptions;
    use s3probe_paginate::Traverser;
    use s3probe_suite::{LimitSuite, MetadataProbe, PresignSuite, SmokeSuite, collect_keys};

    use crate::{cleanup_bucket, create_test_bucket};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_pass_smoke_suite() {
        let store = create_test_bucket("smoke").await;

        let suite = SmokeSuite::new(store.clone(), "test");
        let report = suite.run().await;
        let failed: Vec<_> = report.failures().map(|s| s.name).collect();
        assert!(report.is_success(), "failed steps: {failed:?}");

        let left = collect_keys(&store, &suite.keys().prefix, 100, None)
            .await
            .expect("keys");
        assert!(left.is_empty(), "test objects left behind: {left:?}");

        let request = store.listing(&suite.keys().prefix, 100).expect("listing");
        let versions = Traverser::new(store.version_source().with_delete_markers(true), request)
            .count()
            .await
            .expect("versions");
        assert_eq!(versions.visited, 0, "object versions left behind");

        cleanup_bucket(&store).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_probe_small_metadata() {
        let store = create_test_bucket("limits").await;

        let probe = MetadataProbe::builder().start(1).step(1).max_pairs(3).value_len(20).build();
        let report = LimitSuite::new(store.clone(), "test", probe).run().await;
        assert!(report.is_success(), "{report}");

        cleanup_bucket(&store).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_remove_metadata_object_when_every_size_is_rejected() {
        let store = create_test_bucket("limits-reject").await;

        // 64 KiB of user metadata is beyond every backend's header limit.
        let probe = MetadataProbe::builder().start(64).max_pairs(64).value_len(1000).build();
        let report = LimitSuite::new(store.clone(), "test", probe).run().await;
        let failed: Vec<_> = report.failures().map(|s| s.name).collect();
        assert_eq!(failed, vec!["metadata size"]);

        let err = store.head_object("test/test.txt", None).await.expect_err("removed");
        assert!(err.is_not_found(), "{err}");

        cleanup_bucket(&store).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_presign_only_pdfs() {
        let store = create_test_bucket("presign").await;
        let options = PutOptions::builder().build();
        for path in ["load/a.pdf", "load/b.pdf", "load/a.json", "load/c/d.pdf"] {
            store
                .put_object(path, Bytes::from_static(b"%PDF"), &options)
                .await
                .expect("put");
        }
        store.put_folder("load/c/", HashMap::new()).await.expect("folder");

        let summary = PresignSuite::new(store.clone(), "load")
            .presign_all()
            .await
            .expect("presign");
        assert_eq!(summary.signed, 3);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.signing.count, 3);

        cleanup_bucket(&store).await;
    }
}
