//! Saída de terminal do jobkeeper: documento JSON e veredito colorido.
//!
//! O documento de resultado vai para stdout; a linha colorida (crate `console`)
//! vai para stderr, junto com os logs.

use console::Style;
use serde::Serialize;

use jobkeeper::job::Detection;
use jobkeeper::report::RunReport;

/// Imprime um relatório de execução e retorna se foi um sucesso.
pub fn print_report<T: Serialize>(label: &str, report: &RunReport<T>) -> bool {
    print_json(report);
    match report {
        RunReport::Success(_) => {
            eprintln!("  {} {label} completed", Style::new().green().bold().apply_to("✓"));
            true
        }
        RunReport::Error { message, .. } => {
            eprintln!(
                "  {} {label} failed: {message}",
                Style::new().red().bold().apply_to("✗")
            );
            false
        }
    }
}

/// Imprime uma detecção e o evento resultante, se houver.
pub fn print_detection(detection: &Detection) {
    print_json(detection);
    match detection.event() {
        Some(event) => eprintln!(
            "  {} {}: {}",
            Style::new().cyan().bold().apply_to("→"),
            event.event,
            event.message
        ),
        None => eprintln!("  {} no action", Style::new().yellow().apply_to("·")),
    }
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_default()
    );
}
