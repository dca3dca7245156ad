use super::*;
use crate::client::GenericClient;
use crate::error::{CaptureError, CaptureResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

// ── Shared clients for tests ──

struct DummyClient;
impl GenericClient for DummyClient {
    async fn query(&self, _: &str, _: &[&(dyn ToSql + Sync)]) -> CaptureResult<Vec<Row>> {
        Ok(vec![])
    }
    async fn query_one(&self, _: &str, _: &[&(dyn ToSql + Sync)]) -> CaptureResult<Row> {
        Err(CaptureError::not_found("no rows"))
    }
    async fn query_opt(&self, _: &str, _: &[&(dyn ToSql + Sync)]) -> CaptureResult<Option<Row>> {
        Ok(None)
    }
    async fn execute(&self, _: &str, _: &[&(dyn ToSql + Sync)]) -> CaptureResult<u64> {
        Ok(1)
    }
}

/// Fails every `execute` after the first `ok_executes` calls.
#[derive(Default)]
struct FailingClient {
    ok_executes: usize,
    calls: AtomicUsize,
}
impl GenericClient for FailingClient {
    async fn query(&self, _: &str, _: &[&(dyn ToSql + Sync)]) -> CaptureResult<Vec<Row>> {
        Err(CaptureError::Other("relation \"missing\" does not exist".to_string()))
    }
    async fn query_one(&self, _: &str, _: &[&(dyn ToSql + Sync)]) -> CaptureResult<Row> {
        Err(CaptureError::Other("unused".to_string()))
    }
    async fn query_opt(&self, _: &str, _: &[&(dyn ToSql + Sync)]) -> CaptureResult<Option<Row>> {
        Ok(None)
    }
    async fn execute(&self, _: &str, _: &[&(dyn ToSql + Sync)]) -> CaptureResult<u64> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.ok_executes {
            Ok(1)
        } else {
            Err(CaptureError::Other("duplicate key".to_string()))
        }
    }
}

fn recording<C: GenericClient>(client: C) -> (InstrumentedClient<C>, Arc<StatementRecorder>) {
    let recorder = Arc::new(StatementRecorder::new());
    recorder.activate();
    let client = InstrumentedClient::new(client).with_monitor_arc(recorder.clone());
    (client, recorder)
}

#[tokio::test]
async fn records_statements_in_execution_order() {
    let (client, recorder) = recording(DummyClient);

    client.query("SELECT * FROM t", &[]).await.unwrap();
    client
        .execute("INSERT INTO t (name) VALUES ($1)", &[&"a"])
        .await
        .unwrap();
    client
        .execute("UPDATE t SET n = $1 WHERE id = $2", &[&5_i32, &7_i64])
        .await
        .unwrap();

    let statements = recorder.statements();
    assert_eq!(statements.len(), 3);
    assert_eq!(statements[0].raw_sql(), "SELECT * FROM t");
    assert_eq!(statements[1].sql(), "INSERT INTO t (name) VALUES ('a')");
    assert_eq!(statements[1].raw_sql(), "INSERT INTO t (name) VALUES ($1)");
    assert_eq!(
        statements[2].raw_params(),
        &StatementParams::Single(vec!["5".to_string(), "7".to_string()])
    );
    assert_eq!(statements[2].sql(), "UPDATE t SET n = 5 WHERE id = 7");
    assert!(!statements[2].many());
    assert_eq!(statements[2].result(), &QueryResult::Affected(1));
}

#[tokio::test]
async fn inactive_recorder_ignores_statements_and_keeps_history() {
    let (client, recorder) = recording(DummyClient);

    client.execute("DELETE FROM t", &[]).await.unwrap();
    recorder.deactivate();
    client.execute("DELETE FROM u", &[]).await.unwrap();

    assert!(!recorder.is_active());
    assert_eq!(recorder.len(), 1);
    assert_eq!(recorder.statements()[0].raw_sql(), "DELETE FROM t");

    recorder.clear();
    assert!(recorder.is_empty());
}

#[test]
fn activate_reports_previous_state() {
    let recorder = StatementRecorder::new();
    assert!(recorder.activate());
    assert!(!recorder.activate());
    recorder.deactivate();
    assert!(recorder.activate());
}

#[tokio::test]
async fn failed_statement_is_recorded_and_error_propagates() {
    let (client, recorder) = recording(FailingClient::default());

    let err = client
        .query("SELECT * FROM missing", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, CaptureError::Other(ref msg) if msg.contains("missing")));

    let statements = recorder.statements();
    assert_eq!(statements.len(), 1);
    assert!(statements[0].result().is_error());
    assert_eq!(statements[0].raw_sql(), "SELECT * FROM missing");
}

#[tokio::test]
async fn query_one_without_rows_is_recorded_as_empty() {
    let (client, recorder) = recording(DummyClient);

    let err = client.query_one("SELECT 1", &[]).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(
        recorder.statements()[0].result(),
        &QueryResult::OptionalRow(false)
    );
}

#[tokio::test]
async fn execute_many_records_one_batch_statement() {
    let (client, recorder) = recording(DummyClient);

    let a: &[&(dyn ToSql + Sync)] = &[&"a"];
    let b: &[&(dyn ToSql + Sync)] = &[&"b"];
    let c: &[&(dyn ToSql + Sync)] = &[&"c"];
    let affected = client
        .execute_many("INSERT INTO t (name) VALUES ($1)", &[a, b, c])
        .await
        .unwrap();
    assert_eq!(affected, 3);

    let statements = recorder.statements();
    assert_eq!(statements.len(), 1);
    let batch = &statements[0];
    assert!(batch.many());
    assert_eq!(batch.sql(), batch.raw_sql());
    assert_eq!(
        batch.raw_params(),
        &StatementParams::Batch(vec![
            vec!["'a'".to_string()],
            vec!["'b'".to_string()],
            vec!["'c'".to_string()],
        ])
    );
    assert_eq!(batch.result(), &QueryResult::Affected(3));
}

#[tokio::test]
async fn execute_many_stops_at_first_failure() {
    let (client, recorder) = recording(FailingClient {
        ok_executes: 1,
        ..Default::default()
    });

    let first: &[&(dyn ToSql + Sync)] = &[&1_i32];
    let second: &[&(dyn ToSql + Sync)] = &[&2_i32];
    let third: &[&(dyn ToSql + Sync)] = &[&3_i32];
    let err = client
        .execute_many("INSERT INTO t (id) VALUES ($1)", &[first, second, third])
        .await
        .unwrap_err();
    assert!(matches!(err, CaptureError::Other(_)));
    assert_eq!(client.inner().calls.load(Ordering::SeqCst), 2);

    let statements = recorder.statements();
    assert_eq!(statements.len(), 1);
    assert!(statements[0].result().is_error());
}

#[tokio::test]
async fn call_site_is_attached_through_at() {
    let (client, recorder) = recording(DummyClient);

    let site = crate::call_site!();
    client.at(site.clone()).query("SELECT 1", &[]).await.unwrap();
    client.query("SELECT 2", &[]).await.unwrap();

    let statements = recorder.statements();
    assert_eq!(statements[0].call_site(), Some(&site));
    assert!(site.file.ends_with("tests.rs"));
    assert!(site.function.contains("capture"));
    assert_eq!(statements[1].call_site(), None);
    assert_eq!(statements[1].origin(), "[-]");
}

#[test]
fn origin_prefers_call_site_then_tag() {
    let statement = CapturedStatement::new("SELECT 1", vec![], Duration::ZERO)
        .with_tag("users.by_id")
        .with_call_site(CallSite::new("src/users.rs", "find_user", 42));
    assert_eq!(statement.origin(), "[find_user, src/users.rs:42]");

    let tagged = CapturedStatement::new("SELECT 1", vec![], Duration::ZERO).with_tag("users.by_id");
    assert_eq!(tagged.origin(), "[users.by_id]");
}

#[tokio::test]
async fn tagged_queries_propagate_to_recorder() {
    let (client, recorder) = recording(DummyClient);

    client
        .query_tagged("test-tag", "SELECT 1", &[])
        .await
        .unwrap();

    assert_eq!(recorder.statements()[0].tag(), Some("test-tag"));
}

#[tokio::test]
async fn add_monitor_keeps_existing_monitor() {
    #[derive(Default)]
    struct StartCounter(Mutex<Vec<String>>);

    impl QueryMonitor for StartCounter {
        fn on_query_start(&self, ctx: &QueryContext) {
            self.0.lock().unwrap().push(ctx.sql.clone());
        }
        fn on_query_complete(&self, _: &QueryContext, _: Duration, _: &QueryResult) {}
    }

    let counter = Arc::new(StartCounter::default());
    let (client, recorder) = recording(DummyClient);
    let client = client
        .add_monitor_arc(counter.clone())
        .add_monitor(TracingMonitor::new());

    client.execute("DELETE FROM t", &[]).await.unwrap();

    assert_eq!(recorder.len(), 1);
    assert_eq!(*counter.0.lock().unwrap(), vec!["DELETE FROM t".to_string()]);
}

#[test]
fn captured_statement_derives_interpolated_text() {
    let statement = CapturedStatement::new(
        "SELECT * FROM t WHERE id = $1",
        vec!["3".to_string()],
        Duration::from_millis(10),
    );
    assert_eq!(statement.sql(), "SELECT * FROM t WHERE id = 3");
    assert!(statement.is_read());
    assert!((statement.duration_secs() - 0.01).abs() < f64::EPSILON);
}

#[test]
fn lowercase_select_is_not_a_read() {
    let statement = CapturedStatement::new("select 1", vec![], Duration::ZERO);
    assert!(!statement.is_read());
}

#[test]
fn tracing_monitor_truncation() {
    let monitor = TracingMonitor::new().max_sql_length(10);
    assert_eq!(monitor.truncate_sql("SELECT * FROM users"), "SELECT * F...");
    assert_eq!(monitor.truncate_sql("SELECT 1"), "SELECT 1");
    assert_eq!(
        TracingMonitor::new().no_truncate().truncate_sql(&"x".repeat(300)).len(),
        300
    );
}

#[test]
fn query_result_error_is_truncated() {
    let result = QueryResult::error("e".repeat(600));
    match result {
        QueryResult::Error(msg) => {
            assert!(msg.ends_with("..."));
            assert_eq!(msg.len(), 515);
        }
        other => panic!("Expected Error, got {other:?}"),
    }
}
