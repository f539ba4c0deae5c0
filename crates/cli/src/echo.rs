use owo_colors::OwoColorize;
use sitescout_core::{BatchSummary, GenerationReport, Outcome};

use crate::VERSION;

/// Print a styled banner for verbose mode
pub fn print_banner() {
    eprintln!(
        "\n{} {} {}",
        "Sitescout".bold().bright_blue(),
        "v".dimmed(),
        VERSION.dimmed()
    );
    eprintln!("{}", "Generate validated selectors for article sites\n".dimmed());
}

/// Print a styled step message
pub fn print_step(step: usize, total: usize, message: &str) {
    eprintln!("{} {}", format!("[{}/{}]", step, total).dimmed(), message.bright_cyan());
}

/// Print a success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green(), message.bright_green());
}

/// Print an info message
pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message.bright_blue());
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message.bright_yellow());
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message.bright_red());
}

/// Print the details of one site's report
pub fn print_report(report: &GenerationReport) {
    eprintln!("  {} {}", "Termination:".dimmed(), report.termination.to_string().bright_white());
    eprintln!("  {} {}", "Iterations:".dimmed(), report.iterations.to_string().bright_white());
    eprintln!("  {} {}", "Articles:".dimmed(), report.articles.len().to_string().bright_white());
    if let Some(validation) = &report.validation {
        eprintln!(
            "  {} {}",
            "Score:".dimmed(),
            format!("{:.2}", validation.score).bright_white()
        );
    }
    if !report.failing_fields.is_empty() {
        let names: Vec<&str> = report.failing_fields.iter().map(|f| f.name()).collect();
        eprintln!("  {} {}", "Failing:".dimmed(), names.join(", ").bright_yellow());
    }
    eprintln!(
        "  {} {}",
        "Tokens:".dimmed(),
        report.usage.total.to_string().bright_white()
    );
    for warning in &report.warnings {
        print_warning(warning);
    }
}

/// Print the outcome line for one site
pub fn print_outcome(report: &GenerationReport) {
    match report.outcome {
        Outcome::Accepted => print_success(&format!("{} selectors accepted", report.site)),
        Outcome::BestEffort => print_warning(&format!("{} best-effort selectors saved", report.site)),
        Outcome::SpaDetected => print_warning(&format!("{} requires JavaScript rendering", report.site)),
    }
}

/// Print batch summary
pub fn print_batch_summary(summary: &BatchSummary) {
    eprintln!("\n{}", "═".repeat(60).dimmed());
    eprintln!("{}", "Batch Summary".bold().cyan());
    eprintln!("{}", "═".repeat(60).dimmed());
    eprintln!("  {} {}", "Sites:".dimmed(), summary.total().to_string().bright_white());
    eprintln!(
        "  {} {}",
        "Accepted:".dimmed(),
        summary.successful().to_string().bright_green()
    );
    eprintln!(
        "  {} {}",
        "Best effort:".dimmed(),
        summary.count(Outcome::BestEffort).to_string().bright_yellow()
    );
    eprintln!(
        "  {} {}",
        "SPA:".dimmed(),
        summary.count(Outcome::SpaDetected).to_string().bright_yellow()
    );
    eprintln!("  {} {}", "Failed:".dimmed(), summary.failed().to_string().bright_red());
    eprintln!(
        "  {} {}\n",
        "Success rate:".dimmed(),
        format!("{:.0}%", summary.success_rate() * 100.0).bright_white()
    );
}
