use std::path::PathBuf;

use hnrank_core::{ArticleRecord, NewRanking};

use super::*;

fn article(position: u32, time_text: &str) -> ArticleRecord {
    ArticleRecord {
        title: format!("Story {position}"),
        time_text: time_text.to_string(),
        page: 1,
        position,
    }
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["hnrank-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn parses_score_with_default_provider() {
    let cli = Cli::try_parse_from(["hnrank-cli", "score", "--input", "run.json"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Score {
            ref input,
            provider: None,
        }) if input == std::path::Path::new("run.json")
    ));
}

#[test]
fn parses_score_provider_override() {
    let cli = Cli::try_parse_from([
        "hnrank-cli",
        "score",
        "--input",
        "run.json",
        "--provider",
        "openai",
    ])
    .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Score {
            provider: Some(ProviderKind::OpenAi),
            ..
        })
    ));
}

#[test]
fn rejects_unknown_provider() {
    let result = Cli::try_parse_from([
        "hnrank-cli",
        "score",
        "--input",
        "run.json",
        "--provider",
        "oracle",
    ]);
    assert!(result.is_err());
}

#[test]
fn check_requires_input() {
    assert!(Cli::try_parse_from(["hnrank-cli", "check"]).is_err());
}

#[test]
fn check_report_agrees_with_correct_verdict() {
    let ranking = NewRanking {
        source_url: "https://news.ycombinator.com/newest".to_string(),
        is_correctly_sorted: true,
        articles: vec![
            article(1, "1 minute ago"),
            article(2, "5 minutes ago"),
            article(3, "2 hours ago"),
        ],
        ..NewRanking::default()
    };

    let report = commands::build_check_report(&ranking);

    assert!(report.check.is_sorted);
    assert!(report.agrees);
    assert_eq!(report.total_articles, 3);
}

#[test]
fn check_report_flags_disagreement() {
    let ranking = NewRanking {
        source_url: "https://news.ycombinator.com/newest".to_string(),
        is_correctly_sorted: true,
        articles: vec![article(1, "3 hours ago"), article(2, "1 minute ago")],
        ..NewRanking::default()
    };

    let report = commands::build_check_report(&ranking);

    assert!(!report.check.is_sorted);
    assert_eq!(report.check.violations, vec![2]);
    assert!(!report.agrees);
}

#[test]
fn load_ranking_reports_missing_file() {
    let err = commands::load_ranking(std::path::Path::new("/nonexistent/hnrank/run.json"))
        .expect_err("missing file should fail");
    assert!(err.to_string().contains("failed to read"));
}

fn write_ranking_file(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("hnrank-cli-{}-{name}.json", std::process::id()));
    let ranking = NewRanking {
        source_url: "https://news.ycombinator.com/newest".to_string(),
        is_correctly_sorted: true,
        articles: vec![article(1, "1 minute ago"), article(2, "4 minutes ago")],
        ..NewRanking::default()
    };
    std::fs::write(&path, serde_json::to_string(&ranking).expect("serialize")).expect("write");
    path
}

fn broken_config() -> Result<AppConfig, ConfigError> {
    Err(ConfigError::InvalidEnvVar {
        var: "HNRANK_BIND_ADDR".to_string(),
        reason: "not a socket address".to_string(),
    })
}

#[tokio::test]
async fn check_runs_without_app_config() {
    let path = write_ranking_file("check");
    let result = run(Commands::Check { input: path.clone() }, broken_config).await;
    std::fs::remove_file(&path).ok();
    assert!(result.is_ok(), "check must not need app config: {result:?}");
}

#[tokio::test]
async fn score_reports_invalid_app_config() {
    let path = write_ranking_file("score");
    let result = run(
        Commands::Score {
            input: path.clone(),
            provider: None,
        },
        broken_config,
    )
    .await;
    std::fs::remove_file(&path).ok();
    let err = result.expect_err("score needs app config");
    assert!(err.to_string().contains("HNRANK_BIND_ADDR"), "got: {err}");
}
