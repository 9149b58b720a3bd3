//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `tagnote_core` linkage with deterministic output.
//! - Print the composed segments of one stored memo.
//! - Write engine events to rolling files when `--log-dir` is given.

use std::process::ExitCode;
use tagnote_core::{
    compose, default_log_level, init_logging, open_db, AnnotationConfig, EditingSession, Segment,
    SqliteTaggingStore,
};

const USAGE: &str =
    "usage: tagnote [--log-dir <absolute_dir>] [compose <db_path> <memo_id> <author>]";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((log_dir, args)) = split_log_dir(&args) else {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    };
    if let Some(log_dir) = log_dir {
        if let Err(err) = init_logging(default_log_level(), log_dir) {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    }
    match args {
        [] => {
            println!("tagnote_core ping={}", tagnote_core::ping());
            println!("tagnote_core version={}", tagnote_core::core_version());
            ExitCode::SUCCESS
        }
        [command, db_path, memo_id, author] if command == "compose" => {
            match run_compose(db_path, memo_id, author).await {
                Ok(lines) => {
                    for line in lines {
                        println!("{line}");
                    }
                    ExitCode::SUCCESS
                }
                Err(message) => {
                    eprintln!("error: {message}");
                    ExitCode::FAILURE
                }
            }
        }
        _ => {
            eprintln!("{USAGE}");
            ExitCode::from(2)
        }
    }
}

/// Strips a leading `--log-dir <dir>`; `None` when the flag has no value.
fn split_log_dir(args: &[String]) -> Option<(Option<&str>, &[String])> {
    match args {
        [flag, log_dir, rest @ ..] if flag == "--log-dir" => Some((Some(log_dir.as_str()), rest)),
        [flag] if flag == "--log-dir" => None,
        rest => Some((None, rest)),
    }
}

async fn run_compose(db_path: &str, memo_id: &str, author: &str) -> Result<Vec<String>, String> {
    let memo_id: i64 = memo_id
        .parse()
        .map_err(|_| format!("memo id `{memo_id}` is not an integer"))?;
    let config = AnnotationConfig::default();
    let codec = config.category_codec().map_err(|err| err.to_string())?;
    let conn = open_db(db_path).map_err(|err| err.to_string())?;
    let store = SqliteTaggingStore::try_new(&conn, codec, author).map_err(|err| err.to_string())?;
    let session = EditingSession::open(&store, memo_id, &config)
        .await
        .map_err(|err| err.to_string())?;
    let segments = compose(session.text(), session.spans()).map_err(|err| err.to_string())?;
    Ok(segments.iter().map(describe).collect())
}

fn describe(segment: &Segment) -> String {
    let label = segment
        .category()
        .map_or_else(|| "plain".to_string(), |category| category.to_string());
    format!("{label} {} {:?}", segment.range(), segment.text())
}
