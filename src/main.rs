use asymptote::{analyze_full, AnalysisOptions};
use std::env;
use std::fs;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        println!("Usage: asymptote <file.pseudo> [options]");
        println!();
        println!("Options:");
        println!("  --json    Print the full AnalysisResult as JSON");
        return;
    }

    let filename = &args[1];
    let json = args.contains(&"--json".to_string());

    let source = fs::read_to_string(filename).expect("Failed to read file");
    let result = analyze_full(&source, &AnalysisOptions::default());

    if json {
        match serde_json::to_string_pretty(&result) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("failed to serialize result: {}", e),
        }
        return;
    }

    println!("algorithm_kind : {}", result.algorithm_kind);
    println!("big_o          : {}", result.big_o);
    println!("big_omega      : {}", result.big_omega);
    println!("theta          : {}", result.theta.as_deref().unwrap_or("(none)"));
    println!("method_used    : {}", result.method_used);
    if let Some(equation) = &result.recurrence_equation {
        println!("recurrence     : {}", equation);
    }
    if let Some(bounds) = &result.strong_bounds {
        println!("strong_bounds  : {} (dominant {})", bounds.formula, bounds.dominant_term);
    }
    if let Some(trace) = &result.execution_trace {
        println!(
            "execution_trace: {} steps, {} total iterations, max depth {}",
            trace.steps.len(),
            trace.total_iterations,
            trace.max_depth
        );
    }
    if !result.notes.is_empty() {
        println!();
        println!("notes:");
        for note in &result.notes {
            println!("  - {}", note);
        }
    }
}
