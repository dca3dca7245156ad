mod common;

use common::MemoryClient;
use pgcapture::{CaptureConfig, GenericClient, InefficientQueryAssertion, call_site};
use std::time::Duration;

async fn insert_many<C: GenericClient>(client: &C, n: usize) -> pgcapture::CaptureResult<()> {
    for _ in 0..n {
        client
            .execute("INSERT INTO news (title) VALUES ($1)", &[&"hello"])
            .await?;
    }
    Ok(())
}

#[tokio::test]
async fn two_hundred_duplicates_fail_threshold_199() {
    let assertion = InefficientQueryAssertion::new(Some(199), None).unwrap();
    let client = assertion.instrument(MemoryClient::default());

    let err = assertion
        .run(|| insert_many(&client, 200))
        .await
        .unwrap_err();

    assert!(err.is_inefficient());
    let message = err.to_string();
    assert!(message.contains("Duplicates 200 times: INSERT INTO news (title) ..."), "{message}");
    assert!(!message.contains("Similar"), "{message}");
}

#[tokio::test]
async fn two_hundred_distinct_inserts_are_similar() {
    let assertion = InefficientQueryAssertion::new(Some(199), None).unwrap();
    let client = assertion.instrument(MemoryClient::default());

    let err = assertion
        .run(|| async {
            for i in 0..200 {
                let name = format!("reporter-{i}");
                client
                    .execute("INSERT INTO reporter (full_name) VALUES ($1)", &[&name])
                    .await?;
            }
            pgcapture::CaptureResult::Ok(())
        })
        .await
        .unwrap_err();

    assert!(err.is_inefficient());
    let message = err.to_string();
    assert!(
        message.contains("[-] Similar 200 times: INSERT INTO reporter (ful..."),
        "{message}"
    );
    assert!(!message.contains("Duplicates"), "{message}");
}

#[tokio::test]
async fn at_threshold_passes() {
    let assertion = InefficientQueryAssertion::new(Some(199), None).unwrap();
    let client = assertion.instrument(MemoryClient::default());

    let value = assertion.run(|| insert_many(&client, 199)).await.unwrap();
    assert!(value.is_ok());
}

#[tokio::test]
async fn similar_statements_are_reported_with_call_site() {
    let assertion = InefficientQueryAssertion::new(Some(2), None).unwrap();
    let client = assertion.instrument(MemoryClient::default());
    let site = call_site!();

    let err = assertion
        .run(|| async {
            for id in 0..3_i32 {
                client
                    .at(site.clone())
                    .query("SELECT * FROM news WHERE id = $1", &[&id])
                    .await?;
            }
            pgcapture::CaptureResult::Ok(())
        })
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(
        message.contains(&format!("{site} Similar 3 times: SELECT * FROM news WHERE ...")),
        "{message}"
    );
}

#[tokio::test]
async fn slow_statements_fail_the_assertion() {
    let assertion = InefficientQueryAssertion::new(None, Some(0.0)).unwrap();
    let client = assertion.instrument(MemoryClient::with_delay(Duration::from_millis(2)));

    let err = assertion
        .run(|| async { client.query("SELECT pg_sleep(0.002)", &[]).await })
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("[-] Slow "), "{message}");
    assert!(message.ends_with(" seconds: SELECT pg_sleep(0.002)"), "{message}");
}

#[tokio::test]
async fn disabled_thresholds_never_fail() {
    let assertion = InefficientQueryAssertion::new(None, None).unwrap();
    let client = assertion.instrument(MemoryClient::default());

    assertion
        .run(|| insert_many(&client, 500))
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn ignore_patterns_apply_to_assertions() {
    let assertion = InefficientQueryAssertion::with_config(&CaptureConfig::default(), Some(1), None)
        .unwrap()
        .with_ignore_patterns(["^INSERT INTO news"])
        .unwrap();
    let client = assertion.instrument(MemoryClient::default());

    assertion
        .run(|| insert_many(&client, 10))
        .await
        .unwrap()
        .unwrap();
}
