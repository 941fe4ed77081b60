//! Terminal output formatting.

use colored::{ColoredString, Colorize};
use unicode_width::UnicodeWidthStr;

use mmkg_core::complexity::level_counts;
use mmkg_core::complexity::model::{ComplexityLevel, ConditionComplexity, SystemDistribution};
use mmkg_core::hypothesis::model::{Conclusion, HypothesisReport};
use mmkg_core::relationship::model::RelationshipKind;
use mmkg_core::validation::{CheckStatus, ValidationReport};
use mmkg_core::Dataset;
use mmkg_graph::queries::{DemoReport, GraphStatistics};
use mmkg_graph::{PopulateResult, StageTally};

use crate::rag::RagAnswer;

const NAME_WIDTH: usize = 40;
const TOP_HUBS: usize = 10;

/// Bold title over a rule.
pub fn heading(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(50));
}

/// Pad a plain string to a given visual width (right-padded).
fn pad_right(s: &str, width: usize) -> String {
    let visual = UnicodeWidthStr::width(s);
    if visual >= width {
        s.to_string()
    } else {
        format!("{}{}", s, " ".repeat(width - visual))
    }
}

/// Truncate a string respecting visual width.
fn truncate_visual(s: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(s) <= max_width {
        return s.to_string();
    }
    if max_width <= 3 {
        return ".".repeat(max_width);
    }
    let mut result = String::new();
    let mut current_width = 0;
    for ch in s.chars() {
        let ch_width = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if current_width + ch_width > max_width - 2 {
            break;
        }
        result.push(ch);
        current_width += ch_width;
    }
    result.push_str("..");
    result
}

fn name_cell(s: &str) -> String {
    pad_right(&truncate_visual(s, NAME_WIDTH), NAME_WIDTH)
}

fn check_marker(status: CheckStatus) -> ColoredString {
    match status {
        CheckStatus::Pass => "✓".green(),
        CheckStatus::Warn => "!".yellow(),
        CheckStatus::Fail => "✗".red().bold(),
    }
}

fn level_colored(level: ComplexityLevel) -> ColoredString {
    match level {
        ComplexityLevel::High => level.as_str().red().bold(),
        ComplexityLevel::Moderate => level.as_str().yellow(),
        ComplexityLevel::Low => level.as_str().cyan(),
        ComplexityLevel::Isolated => level.as_str().dimmed(),
    }
}

fn conclusion_colored(conclusion: Conclusion) -> ColoredString {
    match conclusion {
        Conclusion::Supported => conclusion.as_str().green().bold(),
        Conclusion::Inconclusive => conclusion.as_str().yellow(),
    }
}

/// Print every validation check.
pub fn print_validation(report: &ValidationReport) {
    heading("Data validation");
    for check in &report.checks {
        println!(
            "  {} {} {}",
            check_marker(check.status),
            pad_right(&check.name, 24),
            check.detail.dimmed()
        );
    }
    println!();
    if report.passed() {
        println!("{}", "Core data validated.".green().bold());
    } else {
        println!(
            "{} {} check(s) failed.",
            "Validation failed:".red().bold(),
            report.count(CheckStatus::Fail)
        );
    }
}

/// Print dataset sizes and relationship counts by kind.
pub fn print_dataset_summary(dataset: &Dataset) {
    heading("Dataset");
    println!("  {}: {}", "Conditions".bold(), dataset.records.len());
    println!("  {}: {}", "Body systems".bold(), dataset.systems.len());
    println!(
        "  {}: {} loaded, {} skipped",
        "Codelists".bold(),
        dataset.codelist_tally.loaded,
        dataset.codelist_tally.skipped
    );
    println!(
        "  {}: {} loaded, {} skipped",
        "Test codelists".bold(),
        dataset.test_tally.loaded,
        dataset.test_tally.skipped
    );
    println!("  {}:", "Relationships".bold());
    for kind in [
        RelationshipKind::SameSystem,
        RelationshipKind::MultimorbidityPattern,
        RelationshipKind::SystemInteraction,
    ] {
        println!("    {} {:<24} {}", "→".dimmed(), kind.as_str(), dataset.count_kind(kind));
    }
}

/// Print per-system counts and burden statistics.
pub fn print_distribution(distribution: &SystemDistribution) {
    heading("Body system burden");
    if distribution.systems.is_empty() {
        println!("{}", "No body systems found.".dimmed());
        return;
    }
    for share in &distribution.systems {
        println!(
            "  {} {:>4} {}",
            name_cell(&share.system),
            share.count,
            format!("({:.1}%)", share.percentage).dimmed()
        );
    }
    println!();
    println!("  {}: {}", "Total conditions".bold(), distribution.total_conditions);
    println!(
        "  {}: {} / {}",
        "Max / min per system".bold(),
        distribution.max_count,
        distribution.min_count
    );
    let ratio = if distribution.is_unbounded() {
        "inf".to_string()
    } else {
        format!("{:.2}", distribution.burden_ratio)
    };
    println!("  {}: {}", "Burden ratio".bold(), ratio);
    println!(
        "  {}: {:.1}",
        "Average per system".bold(),
        distribution.avg_conditions_per_system
    );
    println!("  {}: {:.2}", "Diversity".bold(), distribution.diversity);
}

/// Print complexity level counts and the highest-degree conditions.
pub fn print_complexity(scores: &[ConditionComplexity]) {
    heading("Multimorbidity complexity");
    for (level, count) in level_counts(scores).iter().rev() {
        println!("  {} {}", pad_right(level.as_str(), 10), count);
    }

    let mut ranked: Vec<&ConditionComplexity> = scores.iter().filter(|s| s.degree > 0).collect();
    ranked.sort_by(|a, b| b.degree.cmp(&a.degree).then_with(|| a.name.cmp(&b.name)));
    if ranked.is_empty() {
        return;
    }

    println!();
    println!("  {}", "Most connected conditions".bold());
    for score in ranked.into_iter().take(TOP_HUBS) {
        let hub = if score.is_hub { "hub".magenta() } else { "".normal() };
        println!(
            "  {} {} {:>3} {} {}",
            "→".dimmed(),
            name_cell(&score.name),
            score.degree,
            level_colored(score.level),
            hub
        );
    }
}

/// Print each hypothesis with its evidence.
pub fn print_hypotheses(report: &HypothesisReport) {
    heading("Hypotheses");
    for result in &report.results {
        println!(
            "  {} {}",
            result.hypothesis.title().cyan().bold(),
            conclusion_colored(result.conclusion)
        );
        for (key, value) in &result.evidence {
            println!("    {} {}: {}", "·".dimmed(), key, value);
        }
    }
    println!();
    println!(
        "{} {}/{} supported ({:.0}%)",
        "Summary:".bold(),
        report.supported(),
        report.results.len(),
        report.success_rate()
    );
}

fn tally_line(name: &str, tally: &StageTally) {
    let failed = if tally.failed > 0 {
        tally.failed.to_string().red().bold()
    } else {
        tally.failed.to_string().dimmed()
    };
    println!("  {} {:>6} written  {} failed", pad_right(name, 16), tally.written, failed);
}

/// Print per-stage write tallies of a graph build.
pub fn print_populate_result(result: &PopulateResult) {
    heading("Graph build");
    tally_line("Body systems", &result.systems);
    tally_line("Diseases", &result.diseases);
    tally_line("Relationships", &result.relationships);
    tally_line("Complexity", &result.complexity);
    tally_line("Patients", &result.patients);
    println!();
    if result.failed() == 0 {
        println!("{} {} writes", "Build complete:".green().bold(), result.written());
    } else {
        println!(
            "{} {} writes, {} failed",
            "Build finished with errors:".yellow().bold(),
            result.written(),
            result.failed()
        );
    }
}

/// Print graph node and relationship counts.
pub fn print_graph_stats(stats: &GraphStatistics) {
    heading("Knowledge graph");
    println!("  {}: {}", "Diseases".bold(), stats.diseases);
    println!("  {}: {}", "Hub diseases".bold(), stats.hub_diseases);
    println!("  {}: {}", "Body systems".bold(), stats.body_systems);
    println!("  {}: {}", "Patients".bold(), stats.patients);
    println!("  {}:", "Relationships".bold());
    for (name, count) in [
        (RelationshipKind::MultimorbidityPattern.as_str(), stats.multimorbidity_relationships),
        (RelationshipKind::SameSystem.as_str(), stats.same_system_relationships),
        (RelationshipKind::SystemInteraction.as_str(), stats.system_interactions),
        ("AFFECTS_SYSTEM", stats.affects_system),
        ("HAS_CONDITION", stats.has_condition),
    ] {
        println!("    {} {:<24} {}", "→".dimmed(), name, count);
    }
    println!("  {}: {}", "Total relationships".bold(), stats.total_relationships());
}

/// Print the demonstration queries.
pub fn print_demo_report(report: &DemoReport) {
    heading("Hub diseases");
    if report.hub_diseases.is_empty() {
        println!("{}", "No hub diseases.".dimmed());
    }
    for hub in &report.hub_diseases {
        println!("  {} {} {} connections", "→".dimmed(), name_cell(&hub.disease), hub.connections);
    }

    heading("Strongest multimorbidity patterns");
    if report.strong_patterns.is_empty() {
        println!("{}", "No strong patterns.".dimmed());
    }
    for p in &report.strong_patterns {
        println!(
            "  {} {} {} {} {}",
            "→".dimmed(),
            p.source,
            format!("-[{}]->", p.relationship).cyan(),
            p.target,
            format!("({:.2})", p.strength).dimmed()
        );
    }

    heading("Cross-system interactions");
    if report.cross_system.is_empty() {
        println!("{}", "No cross-system patterns.".dimmed());
    }
    for t in &report.cross_system {
        println!("  {} {} ↔ {}: {}", "→".dimmed(), t.system1, t.system2, t.interactions);
    }

    heading("Patient burden");
    if report.patient_burden.is_empty() {
        println!("{}", "No patients.".dimmed());
    }
    for p in &report.patient_burden {
        println!(
            "  {} {} {} conditions: {}",
            "→".dimmed(),
            p.patient.yellow(),
            p.condition_count,
            p.conditions.join(", ").dimmed()
        );
    }

    heading("Likely progressions");
    if report.progressions.is_empty() {
        println!("{}", "No progressions.".dimmed());
    }
    for p in &report.progressions {
        println!(
            "  {} {} → {} {}",
            "→".dimmed(),
            p.primary_condition,
            p.likely_progression,
            format!("({:.2})", p.probability).dimmed()
        );
    }
}

/// Print a GraphRAG answer with its sources.
pub fn print_answer(answer: &RagAnswer) {
    println!("{} {}", "Q:".cyan().bold(), answer.question);
    println!("{} {}", "A:".green().bold(), answer.answer);
    if !answer.chunks.is_empty() {
        println!("  {}", "Sources".dimmed());
        for chunk in &answer.chunks {
            println!(
                "    {} {} {}",
                "·".dimmed(),
                chunk.source,
                format!("({:.3})", chunk.score).dimmed()
            );
        }
    }
    if !answer.facts.is_empty() {
        println!("  {} {}", "Graph facts:".dimmed(), answer.facts.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_visual() {
        assert_eq!(truncate_visual("Hypertension", 20), "Hypertension");
        assert_eq!(truncate_visual("Chronic obstructive pulmonary disease", 10), "Chronic ..");
        assert_eq!(truncate_visual("abc", 2), "..");
    }

    #[test]
    fn test_pad_right_counts_visual_width() {
        assert_eq!(pad_right("ab", 4), "ab  ");
        assert_eq!(pad_right("abcdef", 4), "abcdef");
    }
}
