//! `zoogent ask`: Single-request mode.

use super::{build_pipeline, print_result, spawn_progress_printer};

pub async fn run(
    text: String,
    prior: Option<String>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if text.trim().is_empty() {
        return Err("Nothing to search for: the request text is empty.".into());
    }

    let (_config, pipeline) = build_pipeline()?;

    let (tx, printer) = spawn_progress_printer();
    let outcome = pipeline
        .run_with_progress(&text, prior.as_deref(), tx)
        .await;
    let _ = printer.await;

    let result = outcome?;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }

    Ok(())
}
