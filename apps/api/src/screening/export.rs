//! CSV export of a ranked result set, one row per candidate.

use anyhow::{Context, Result};

use crate::screening::models::{CandidateResult, WeightMap};

/// Header: `Candidate`, `Overall Score (%)`, then `<criterion> (Priority: <p>)`
/// in criteria order. Overall scores are written with two decimals.
pub fn write_results_csv(
    criteria: &[String],
    priorities: &WeightMap,
    results: &[CandidateResult],
) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec!["Candidate".to_string(), "Overall Score (%)".to_string()];
    header.extend(criteria.iter().map(|c| {
        let priority = priorities.get(c).copied().unwrap_or_default();
        format!("{c} (Priority: {priority})")
    }));
    writer.write_record(&header).context("failed to write CSV header")?;

    for result in results {
        let mut row = vec![
            result.candidate_name.clone(),
            format!("{:.2}", result.overall_score),
        ];
        row.extend(criteria.iter().map(|c| {
            result
                .criteria_scores
                .get(c)
                .map(|s| s.to_string())
                .unwrap_or_default()
        }));
        writer
            .write_record(&row)
            .with_context(|| format!("failed to write CSV row for {}", result.candidate_name))?;
    }

    let bytes = writer.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output was not valid UTF-8")
}

/// Written when a candidate has no justification for a criterion.
pub const MISSING_JUSTIFICATION: &str = "No justification provided.";

/// Header: `Candidate`, `Overall Score (%)`, then `<criterion> (Score)` and
/// `<criterion> (Justification)` per criterion. Unscored criteria read 0.
pub fn write_detailed_results_csv(criteria: &[String], results: &[CandidateResult]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec!["Candidate".to_string(), "Overall Score (%)".to_string()];
    for criterion in criteria {
        header.push(format!("{criterion} (Score)"));
        header.push(format!("{criterion} (Justification)"));
    }
    writer.write_record(&header).context("failed to write CSV header")?;

    for result in results {
        let mut row = vec![
            result.candidate_name.clone(),
            format!("{:.2}", result.overall_score),
        ];
        for criterion in criteria {
            let score = result.criteria_scores.get(criterion).copied().unwrap_or(0);
            let justification = result
                .justifications
                .get(criterion)
                .map(String::as_str)
                .filter(|j| !j.trim().is_empty())
                .unwrap_or(MISSING_JUSTIFICATION);
            row.push(score.to_string());
            row.push(justification.to_string());
        }
        writer
            .write_record(&row)
            .with_context(|| format!("failed to write CSV row for {}", result.candidate_name))?;
    }

    let bytes = writer.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output was not valid UTF-8")
}
