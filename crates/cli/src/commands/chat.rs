//! `zoogent chat`: Interactive mode.
//!
//! Each line is one turn. The previous line is passed as prior-turn context
//! so the pipeline can detect refinements ("cheaper ones", "in black").

use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use zoogent_agent::{TurnHistory, TurnOutcome};

use super::{build_pipeline, print_result, spawn_progress_printer};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (config, pipeline) = build_pipeline()?;

    println!();
    println!("  ZooGent — Shopping Assistant");
    println!();
    println!("  Provider:  {}", pipeline.invoker().provider_name());
    println!("  Model:     {}", pipeline.invoker().model());
    println!("  Variant:   {:?}", config.pipeline.variant);
    println!();
    println!("  Describe what you want to buy and press Enter.");
    println!("  Type 'history' to list turns, 'exit' to quit.");
    println!();

    let mut history = TurnHistory::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    prompt()?;
    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        match text {
            "" => {}
            "exit" | "quit" => break,
            "history" => print_history(&history),
            _ => {
                let id = history.submit(text);
                let prior = history.prior_text(id).map(String::from);

                let (tx, printer) = spawn_progress_printer();
                let outcome = pipeline.run_with_progress(text, prior.as_deref(), tx).await;
                let _ = printer.await;

                match outcome {
                    Ok(result) => {
                        history.complete(id, &result.search_query, result.ranked_products.len());
                        print_result(&result);
                    }
                    Err(e) => {
                        history.fail(id, &e);
                        eprintln!("  [Error] {e}");
                        println!();
                    }
                }
            }
        }
        prompt()?;
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}

fn print_history(history: &TurnHistory) {
    if history.is_empty() {
        println!("  (no turns yet)");
        return;
    }
    for (i, turn) in history.turns().iter().enumerate() {
        let status = match &turn.outcome {
            TurnOutcome::Pending => "pending".to_string(),
            TurnOutcome::Completed { products, .. } => format!("{products} products"),
            TurnOutcome::Failed { error } => format!("failed: {error}"),
        };
        println!(
            "  {:>2}. [{}] {} ({status})",
            i + 1,
            turn.submitted_at.format("%H:%M:%S"),
            turn.text
        );
    }
}
