//! Human-readable cards for analyses, contracts and health output.

use contractlens_core::ContractDocument;
use contractlens_server::{Analysis, Databases, DependencyStatus};
use contractlens_store::SupplierStatistics;
use serde_json::Value;

const MAX_LIST_ITEMS: usize = 10;
const EXCERPT_CHARS: usize = 160;

// ── Section titles, in response order ──

const SECTIONS: &[(&str, &str)] = &[
    ("keyClausesIdentification", "Key Clauses"),
    ("riskAssessmentAndMitigation", "Risk Assessment"),
    ("contractBenchmarkingAndPrecedentBasedInsights", "Benchmarking"),
    ("negotiationLeveragePoints", "Negotiation Leverage"),
    ("complianceCheck", "Compliance"),
    ("summaryAndStrategicRecommendations", "Summary & Recommendations"),
];

// ── Public API ──

/// Print a finished analysis as a vertical card grouped by section.
pub fn print_analysis_card(analysis: &Analysis) {
    let result = &analysis.result;
    let part = &result.part_information;
    let supplier = &result.supplier_overview;

    match &part.part_name {
        Some(name) => println!("=== {} · {} ===", part.part_number, name),
        None => println!("=== {} ===", part.part_number),
    }
    if let Some(reason) = &analysis.degraded {
        println!("(placeholder analysis: {reason})");
    }
    println!();

    println!("Supplier");
    field("name", Some(supplier.supplier_name.as_str()));
    field("number", supplier.supplier_number.as_deref());
    field("contact", supplier.supplier_contact.name.as_deref());
    field("email", supplier.supplier_contact.email.as_deref());
    field("location", supplier.manufacturing_location.as_deref());
    field("contracts found", Some(supplier.number_of_contracts_found.to_string().as_str()));
    for line in value_lines("contract dates", &supplier.date_range_of_contracts) {
        println!("{line}");
    }
    println!();

    println!("Part");
    field("material", part.material.as_deref());
    field("material2", part.material2.as_deref());
    field("currency", part.currency.as_deref());
    println!();

    for (key, title) in SECTIONS {
        if let Some(section) = result.section(key) {
            print_section(title, section);
        }
    }
}

/// Print retrieved contract chunks, one block each.
pub fn print_contracts(docs: &[ContractDocument]) {
    if docs.is_empty() {
        println!("No contract documents found.");
        return;
    }
    println!("{} contract document(s)", docs.len());
    println!();
    for (i, doc) in docs.iter().enumerate() {
        println!(
            "  {:>3}. {:<36} similarity {:.3}  {} chars",
            i + 1,
            doc.id.as_deref().unwrap_or("-"),
            doc.similarity,
            doc.metadata.content_length
        );
        let excerpt = doc.excerpt(EXCERPT_CHARS).replace('\n', " ");
        println!("       {excerpt}");
        if !doc.metadata.dates.is_empty() {
            println!("       dates: {}", doc.metadata.dates.join(", "));
        }
        if let Some(path) = &doc.metadata.file_path {
            println!("       file: {path}");
        }
    }
}

pub fn print_health(databases: &Databases, model: Option<(&str, Result<String, String>)>) {
    println!("Dependencies");
    print_dependency("master file", &databases.supabase);
    print_dependency("vector store", &databases.astra);
    if let Some((name, outcome)) = model {
        match outcome {
            Ok(reply) => println!("  {:<26} connected ({name}: {})", "model", reply.trim()),
            Err(e) => println!("  {:<26} error ({name}): {e}", "model"),
        }
    }
}

pub fn print_supplier_statistics(stats: &SupplierStatistics) {
    println!("=== {} ===", stats.supplier_name);
    println!();
    field("total parts", Some(stats.total_parts.to_string().as_str()));
    field("materials", Some(stats.unique_materials.join(", ").as_str()));
    field("currencies", Some(stats.currencies.join(", ").as_str()));
    for line in list_lines("part numbers", &stats.part_numbers) {
        println!("{line}");
    }
}

// ── Section rendering ──

fn print_section(title: &str, section: &Value) {
    let Value::Object(fields) = section else {
        return;
    };
    if fields.values().all(Value::is_null) {
        return;
    }
    println!("{title}");
    for (key, value) in fields {
        for line in value_lines(key, value) {
            println!("{line}");
        }
    }
    println!();
}

fn print_dependency(label: &str, status: &DependencyStatus) {
    match &status.error {
        None => println!("  {:<26} {}", label, status.status),
        Some(e) => println!("  {:<26} {}: {}", label, status.status, e),
    }
}

fn field(label: &str, value: Option<&str>) {
    if let Some(v) = value
        && !v.is_empty()
    {
        println!("  {:<26} {}", label, v);
    }
}

// ── Helpers ──

/// Lines for one labelled JSON value. Strings print inline; lists print one
/// item per line; anything else prints as compact JSON. Nulls print nothing.
fn value_lines(label: &str, value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::String(s) => vec![format!("  {:<26} {}", label, s)],
        Value::Array(items) => {
            let items: Vec<String> = items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect();
            list_lines(label, &items)
        }
        other => vec![format!("  {:<26} {}", label, other)],
    }
}

fn list_lines(label: &str, items: &[String]) -> Vec<String> {
    if items.is_empty() {
        return Vec::new();
    }
    let mut lines = Vec::with_capacity(items.len().min(MAX_LIST_ITEMS) + 1);
    for (i, item) in items.iter().take(MAX_LIST_ITEMS).enumerate() {
        let label = if i == 0 { label } else { "" };
        lines.push(format!("  {:<26} - {}", label, item));
    }
    if items.len() > MAX_LIST_ITEMS {
        lines.push(format!("  {:<26}   ... and {} more", "", items.len() - MAX_LIST_ITEMS));
    }
    lines
}
