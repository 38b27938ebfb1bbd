//! Listing traversal integration tests.

#[cfg(test)]
mod tests {
    use std::ops::ControlFlow;
    use std::pin::pin;

    use futures::StreamExt;
    use s3probe_paginate::{PageSource, TraversalOutcome, Traverser};
    use s3probe_suite::{ListingScheme, count_objects};

    use crate::{cleanup_bucket, create_test_bucket, populate};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_traverse_250_objects_in_three_pages() {
        let store = create_test_bucket("trav").await;
        populate(&store, "docs/", 250).await;

        for scheme in [ListingScheme::Continuation, ListingScheme::Marker] {
            let result = count_objects(&store, scheme, "docs/", 100, None)
                .await
                .expect("count");
            assert_eq!(result.visited, 250, "{scheme}");
            assert_eq!(result.fetches, 3, "{scheme}");
            assert_eq!(result.outcome, TraversalOutcome::Completed, "{scheme}");
        }

        cleanup_bucket(&store).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_visit_keys_in_backend_order() {
        let store = create_test_bucket("order").await;
        let paths = populate(&store, "docs/", 25).await;
        populate(&store, "other/", 5).await;

        let request = store.listing("docs/", 10).expect("request");
        let mut keys = Vec::new();
        Traverser::new(store.marker_source(), request)
            .run(|item| {
                keys.push(item.key);
                ControlFlow::Continue(())
            })
            .await
            .expect("traverse");

        assert_eq!(keys, paths);

        cleanup_bucket(&store).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_stop_at_cap() {
        let store = create_test_bucket("cap").await;
        populate(&store, "docs/", 30).await;

        let result = count_objects(&store, ListingScheme::Continuation, "docs/", 10, Some(15))
            .await
            .expect("count");
        assert_eq!(result.visited, 15);
        assert_eq!(result.fetches, 2);
        assert_eq!(result.outcome, TraversalOutcome::CapReached);

        cleanup_bucket(&store).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_list_every_version() {
        let store = create_test_bucket("versions").await;
        store.set_versioning(true).await.expect("enable versioning");
        populate(&store, "docs/", 3).await;
        populate(&store, "docs/", 3).await;

        let result = count_objects(&store, ListingScheme::Versions, "docs/", 2, None)
            .await
            .expect("count versions");
        assert_eq!(result.visited, 6);
        assert_eq!(result.fetches, 3);

        cleanup_bucket(&store).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_stream_from_start_after_key() {
        let store = create_test_bucket("stream").await;
        populate(&store, "docs/", 12).await;

        let source = store.continuation_source().start_after(store.key("docs/0007"));
        let request = store.listing("docs/", 2).expect("request");
        let mut items = pin!(Traverser::new(source, request).into_stream());

        let mut keys = Vec::new();
        while let Some(item) = items.next().await {
            keys.push(item.expect("page").key);
        }
        assert_eq!(keys, vec!["docs/0008", "docs/0009", "docs/0010", "docs/0011"]);

        cleanup_bucket(&store).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_fail_on_missing_bucket() {
        let store = create_test_bucket("missing").await;
        let gone = store.with_bucket(crate::test_bucket_name("gone"));

        let request = gone.listing("", 10).expect("request");
        let mut source = gone.continuation_source();
        let direct = source.fetch_page(&request).await.expect_err("no bucket");
        assert!(direct.is_not_found());

        let err = Traverser::new(gone.continuation_source(), request)
            .count()
            .await
            .expect_err("no bucket");
        assert_eq!(err.visited, 0);
        assert_eq!(err.fetches, 0);

        cleanup_bucket(&store).await;
    }
}
