//! Output formatting module

use insight_types::{AnalysisType, BatchResults, OutputFormat, Result};
use insight_vision::response::ACCIDENT_FIELD_LABELS;
use serde_json::json;

pub fn output_analysis(
    output_format: OutputFormat,
    image: &str,
    analysis_type: AnalysisType,
    text: &str,
) -> Result<()> {
    if output_format == OutputFormat::Json {
        let content = serde_json::to_string_pretty(&json!({
            "image": image,
            "analysisType": analysis_type,
            "result": text,
        }))?;
        println!("{}", content);
    } else {
        let title = analysis_type.label();
        println!("\n{}", title);
        println!("{}", "=".repeat(title.len()));
        println!("Image: {}", image);
        println!();
        println!("{}", text.trim());
    }

    Ok(())
}

pub fn output_batch(output_format: OutputFormat, results: &BatchResults) -> Result<()> {
    if output_format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(results)?);
        return Ok(());
    }

    let width = ACCIDENT_FIELD_LABELS.iter().map(|l| l.len()).max().unwrap_or(0) + 1;

    for (i, entry) in results.entries.iter().enumerate() {
        let record = &entry.record;
        println!("\n[{}] {} ({})", i + 1, entry.image, record.status.label());

        let values = [
            &record.vehicles_involved,
            &record.accident_details,
            &record.surroundings,
            &record.condition,
            &record.overall_assessment,
        ];
        for (label, value) in ACCIDENT_FIELD_LABELS.iter().zip(values) {
            println!("  {:<width$} {}", format!("{}:", label), value, width = width);
        }
    }

    println!("\nBatch Analysis Complete");
    println!("=======================");
    println!("Total:      {}", results.total);
    println!("Completed:  {}", results.completed);
    println!("Failed:     {}", results.failed);
    println!("Duration:   {:.1}s", results.duration_secs());

    Ok(())
}
