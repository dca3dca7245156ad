use super::*;
use crate::capture::{CallSite, CapturedStatement};
use crate::classify::Classifier;
use std::time::Duration;

fn plain_config() -> CaptureConfig {
    CaptureConfig::default().with_colorize(false)
}

fn classify(config: &CaptureConfig, statements: &[CapturedStatement]) -> ClassifiedResult {
    Classifier::new(config).unwrap().classify(statements)
}

fn render(name: &str, config: &CaptureConfig, statements: &[CapturedStatement]) -> String {
    let presenter = PresenterRegistry::new().resolve(name, config).unwrap();
    render_to_string(presenter.as_ref(), &classify(config, statements)).unwrap()
}

fn duplicated_inserts(n: usize) -> Vec<CapturedStatement> {
    (0..n)
        .map(|_| {
            CapturedStatement::new(
                "INSERT INTO news (title) VALUES ($1)",
                vec!["'hello'".to_string()],
                Duration::from_millis(1),
            )
        })
        .collect()
}

fn similar_inserts(n: usize) -> Vec<CapturedStatement> {
    (0..n)
        .map(|i| {
            CapturedStatement::new(
                "INSERT INTO news (title) VALUES ($1)",
                vec![format!("'title {i}'")],
                Duration::from_millis(1),
            )
        })
        .collect()
}

#[test]
fn builtin_presenters_are_registered() {
    let registry = PresenterRegistry::new();
    for name in ["pretty", "raw_line", "simple", "only_slow_query"] {
        assert!(registry.contains(name), "missing {name}");
        assert_eq!(
            registry.resolve(name, &CaptureConfig::default()).unwrap().name(),
            name
        );
    }
}

#[test]
fn unknown_presenter_lists_available_names() {
    let Err(err) = PresenterRegistry::new().resolve("fancy", &CaptureConfig::default()) else {
        panic!("Expected an unknown presenter to fail");
    };
    assert!(err.is_presenter_not_found());
    match err {
        CaptureError::PresenterNotFound { name, available } => {
            assert_eq!(name, "fancy");
            assert!(available.contains(&"simple".to_string()));
        }
        other => panic!("Expected PresenterNotFound, got {other:?}"),
    }
}

#[test]
fn runtime_registration_resolves() {
    struct Silent;
    impl Presenter for Silent {
        fn name(&self) -> &str {
            "silent"
        }
        fn render(&self, _: &ClassifiedResult, _: &mut dyn Write) -> CaptureResult<()> {
            Ok(())
        }
    }
    fn build_silent(_: &CaptureConfig) -> Arc<dyn Presenter> {
        Arc::new(Silent)
    }

    let mut registry = PresenterRegistry::empty();
    registry.register("silent", build_silent);
    assert_eq!(registry.names(), vec!["silent".to_string()]);

    let presenter = registry.resolve("silent", &CaptureConfig::default()).unwrap();
    let result = classify(&plain_config(), &duplicated_inserts(3));
    assert_eq!(render_to_string(presenter.as_ref(), &result).unwrap(), "");
}

#[test]
fn base_render_is_not_implemented() {
    struct Unfinished;
    impl Presenter for Unfinished {
        fn name(&self) -> &str {
            "unfinished"
        }
    }

    let result = classify(&plain_config(), &[]);
    let err = render_to_string(&Unfinished, &result).unwrap_err();
    assert!(matches!(err, CaptureError::PresenterNotImplemented(ref n) if n == "unfinished"));
}

#[test]
fn pretty_reports_repeated_but_not_similar() {
    let output = render("pretty", &plain_config(), &duplicated_inserts(11));

    assert!(output.contains("Repeated 11 times"));
    assert!(!output.contains("Similar 11 times"));
    assert!(output.contains("has_over_threshold"));
    assert!(output.contains("INSERT INTO news (title)\nVALUES ('hello')"));
}

#[test]
fn pretty_reports_similar() {
    let output = render("pretty", &plain_config(), &similar_inserts(11));

    assert!(output.contains("Similar 11 times"));
    assert!(!output.contains("Repeated"));
    assert!(output.contains("VALUES ($1)"));
}

#[test]
fn pretty_without_issues_has_only_the_table() {
    let output = render("pretty", &plain_config(), &duplicated_inserts(2));
    assert!(output.contains("total_duration"));
    assert!(!output.contains("Repeated"));
    assert!(!output.contains("Slow"));
}

#[test]
fn pretty_colors_only_when_over_threshold() {
    colored::control::set_override(true);
    let config = CaptureConfig::default().with_sql_color_format("none");

    let quiet = render("pretty", &config, &duplicated_inserts(2));
    let loud = render("pretty", &config, &duplicated_inserts(11));
    colored::control::unset_override();

    assert!(!quiet.contains("\u{1b}[35m"));
    assert!(loud.contains("\u{1b}[35m"));
}

#[test]
fn markdown_table_format() {
    let config = plain_config().with_table_format("markdown");
    let output = render("pretty", &config, &duplicated_inserts(1));
    assert!(output.contains("| total "));
    assert!(output.contains("|---"));
}

#[test]
fn table_presets_resolve_by_name() {
    assert!(pretty::table_preset("pretty").is_some());
    assert!(pretty::table_preset("ASCII").is_some());
    assert!(pretty::table_preset("plain").is_some());
    assert!(pretty::table_preset("fancy_grid").is_none());
}

#[test]
fn raw_line_lists_stats_and_details() {
    let statements = vec![
        CapturedStatement::new("SELECT * FROM news", vec![], Duration::from_millis(1500)),
        CapturedStatement::new("DELETE FROM news", vec![], Duration::from_millis(500)),
    ];
    let output = render("raw_line", &plain_config(), &statements);

    assert!(output.contains("total: 2\n"));
    assert!(output.contains("read: 1\n"));
    assert!(output.contains("writes: 1\n"));
    assert!(output.contains("total_duration: 2.00\n"));
    assert!(output.contains("most_common_duplicates: 1 times: SELECT * FROM news"));
    assert!(output.contains("Slow 1.50 seconds.\nSELECT *\nFROM news"));
    assert!(!output.contains("Slow 0.50"));
}

#[test]
fn raw_line_without_statements() {
    let output = render("raw_line", &plain_config(), &[]);
    assert!(output.contains("most_common_duplicates: None"));
    assert!(output.contains("most_common_similar: None"));
}

#[test]
fn simple_prints_one_line() {
    let statements = vec![
        CapturedStatement::new("SELECT 1", vec![], Duration::from_millis(250)),
        CapturedStatement::new("SELECT 2", vec![], Duration::from_millis(250)),
    ];
    let output = render("simple", &plain_config(), &statements);
    assert_eq!(output, "total: 2 queries in 0.50 seconds\n");
}

#[test]
fn only_slow_query_prints_origin() {
    let statements = vec![
        CapturedStatement::new("SELECT pg_sleep(2)", vec![], Duration::from_secs(2))
            .with_call_site(CallSite::new("src/news.rs", "list_news", 12)),
        CapturedStatement::new("SELECT 1", vec![], Duration::from_millis(1)),
        CapturedStatement::new("SELECT pg_sleep(3)", vec![], Duration::from_secs(3)),
    ];
    let output = render("only_slow_query", &plain_config(), &statements);
    assert_eq!(
        output,
        "[list_news, src/news.rs:12] Slow 2.00 seconds\n[-] Slow 3.00 seconds\n"
    );
}
