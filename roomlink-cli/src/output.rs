use room_extractor::{ExtractionOutcome, StreamDescriptor};

use crate::cli::OutputFormat;

pub fn render(outcome: &ExtractionOutcome, format: OutputFormat) {
    match format {
        OutputFormat::Json => render_json(outcome),
        OutputFormat::Pretty => render_pretty(outcome),
    }
}

fn render_json(outcome: &ExtractionOutcome) {
    let value = match outcome {
        ExtractionOutcome::Resolved(descriptor) => serde_json::json!({
            "status": "resolved",
            "descriptor": descriptor,
        }),
        ExtractionOutcome::StillChallenged => serde_json::json!({"status": "still_challenged"}),
        ExtractionOutcome::TimedOut => serde_json::json!({"status": "timed_out"}),
        ExtractionOutcome::BrowserUnavailable => {
            serde_json::json!({"status": "browser_unavailable"})
        }
        ExtractionOutcome::Failed(e) => serde_json::json!({
            "status": "failed",
            "message": e.to_string(),
        }),
    };
    println!("{value}");
}

fn render_pretty(outcome: &ExtractionOutcome) {
    match outcome {
        ExtractionOutcome::Resolved(descriptor) => print_descriptor(descriptor),
        ExtractionOutcome::StillChallenged => {
            println!("The platform challenged the retried fetch as well.");
            println!("Run the command again to retry.");
        }
        ExtractionOutcome::TimedOut => {
            println!("The challenge was not resolved in time.");
            println!("Run the command again to retry.");
        }
        ExtractionOutcome::BrowserUnavailable => {
            println!("No usable browser was found. Install Chrome or Edge and retry.");
        }
        ExtractionOutcome::Failed(e) => {
            println!("Extraction failed: {e}");
        }
    }
}

fn print_descriptor(descriptor: &StreamDescriptor) {
    println!("Title:  {}", descriptor.title);
    println!("Author: {}", descriptor.author);
    println!("Live:   {}", if descriptor.is_live { "yes" } else { "no" });
    if !descriptor.qualities.is_empty() {
        let mut names: Vec<&str> = descriptor.qualities.keys().map(String::as_str).collect();
        names.sort_unstable();
        println!("Qualities: {}", names.join(", "));
    }
    println!("{}", descriptor.stream_url);
}
