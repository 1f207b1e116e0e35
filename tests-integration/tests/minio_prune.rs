use pruner::Runner;
use tests_integration::{MinioTestContext, init_test_logging};

#[tokio::test]
#[ignore = "Requires Docker for MinIO container"]
async fn test_prune_versioned_buckets_on_minio() {
    init_test_logging();

    let ctx = MinioTestContext::new()
        .await
        .expect("Failed to start MinIO");
    ctx.create_versioned_bucket("logs").await.unwrap();
    ctx.create_versioned_bucket("archive").await.unwrap();

    ctx.put("logs", "report.txt", b"first").await.unwrap();
    ctx.delete("logs", "report.txt").await.unwrap();
    let current = ctx.put("logs", "report.txt", b"second").await.unwrap();

    ctx.put("archive", "gone.txt", b"data").await.unwrap();
    ctx.delete("archive", "gone.txt").await.unwrap();
    let kept = ctx.put("archive", "kept.txt", b"data").await.unwrap();

    let runner = Runner::from_configuration(&ctx.configuration("logs,archive"))
        .await
        .unwrap();
    let summary = runner.run().await.unwrap();

    assert_eq!(summary.reports.len(), 2);
    assert!(!summary.has_failures(), "failures: {summary:?}");
    assert_eq!(summary.reports[0].versions_deleted, 1);
    assert_eq!(summary.reports[0].markers_deleted, 1);
    assert_eq!(summary.reports[1].versions_deleted, 1);
    assert_eq!(summary.reports[1].markers_deleted, 1);

    let logs = ctx.all_records("logs").await.unwrap();
    assert_eq!(
        logs,
        vec![("report.txt".to_string(), current, false, true)]
    );

    let archive = ctx.all_records("archive").await.unwrap();
    assert_eq!(archive, vec![("kept.txt".to_string(), kept, false, true)]);
}

#[tokio::test]
#[ignore = "Requires Docker for MinIO container"]
async fn test_dry_run_and_missing_bucket_on_minio() {
    init_test_logging();

    let ctx = MinioTestContext::new()
        .await
        .expect("Failed to start MinIO");
    ctx.create_versioned_bucket("logs").await.unwrap();
    ctx.put("logs", "a.txt", b"1").await.unwrap();
    ctx.put("logs", "a.txt", b"2").await.unwrap();

    let mut config = ctx.configuration("does-not-exist,logs");
    config.pruner.dry_run = true;
    config.pruner.page_size = 1;

    let summary = Runner::from_configuration(&config)
        .await
        .unwrap()
        .run()
        .await
        .unwrap();

    assert!(summary.reports[0].listing_error.is_some());
    assert_eq!(summary.reports[1].versions_deleted, 1);
    assert_eq!(summary.reports[1].pages_scanned, 2);
    assert!(summary.is_success(false));
    assert!(!summary.is_success(true));

    assert_eq!(ctx.all_records("logs").await.unwrap().len(), 2);
}
