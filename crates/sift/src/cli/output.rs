//! Terminal styling and rendering of match results.

use std::{process::ExitCode, time::Duration};

use serde::Serialize;
use sift_monitor::{
    ExplanationMatch, HighlightsMatch, InputDocument, Matches, QueryMatch, ScoringMatch,
    UpdateResult,
};

/// ANSI codes for terminal output.
mod colors {
    /// Bold text.
    pub const BOLD: &str = "\x1b[1m";
    /// Cyan text (for headers).
    pub const CYAN: &str = "\x1b[36m";
    /// Yellow text (for warnings).
    pub const YELLOW: &str = "\x1b[33m";
    /// Dim text.
    pub const DIM: &str = "\x1b[2m";
    /// Reset all formatting.
    pub const RESET: &str = "\x1b[0m";
}

/// Formats a header in bold cyan.
pub fn header(text: &str) -> String {
    format!("{}{}{}{}", colors::BOLD, colors::CYAN, text, colors::RESET)
}

/// Formats a subheader in bold.
pub fn subheader(text: &str) -> String {
    format!("{}{}{}", colors::BOLD, text, colors::RESET)
}

/// Formats less important text.
pub fn dim(text: &str) -> String {
    format!("{}{}{}", colors::DIM, text, colors::RESET)
}

/// Formats a warning in yellow.
pub fn warning(text: &str) -> String {
    format!("{}{}{}", colors::YELLOW, text, colors::RESET)
}

/// Formats a duration in milliseconds.
fn millis(duration: Duration) -> String {
    format!("{:.3}ms", duration.as_secs_f64() * 1000.0)
}

/// Renders the detail lines shown under a match.
pub trait RenderMatch {
    /// Returns the detail text, `None` for none.
    fn detail(&self, document: &InputDocument) -> Option<String>;
}

impl RenderMatch for QueryMatch {
    fn detail(&self, _document: &InputDocument) -> Option<String> {
        None
    }
}

impl RenderMatch for ScoringMatch {
    fn detail(&self, _document: &InputDocument) -> Option<String> {
        Some(format!("score {:.4}", self.score))
    }
}

impl RenderMatch for ExplanationMatch {
    fn detail(&self, _document: &InputDocument) -> Option<String> {
        Some(format!("score {:.4}\n{}", self.score, self.explanation))
    }
}

impl RenderMatch for HighlightsMatch {
    fn detail(&self, document: &InputDocument) -> Option<String> {
        let mut lines = Vec::new();
        for field in self.hits.keys() {
            let text = document.fields.get(field).map_or("", String::as_str);
            let spans: Vec<String> = self
                .ranges(field)
                .into_iter()
                .map(|r| {
                    let quoted = text.get(r.start..r.end).unwrap_or("");
                    format!("{}..{} {quoted:?}", r.start, r.end)
                })
                .collect();
            lines.push(format!("{field}: {}", spans.join(", ")));
        }
        Some(lines.join("\n"))
    }
}

/// JSON output for `sift match`.
#[derive(Serialize)]
struct JsonMatchOutput<'a, M> {
    /// Registration errors.
    update_errors: Vec<JsonUpdateError>,
    /// Match results.
    #[serde(flatten)]
    matches: &'a Matches<M>,
}

/// A registration error in JSON output.
#[derive(Serialize)]
struct JsonUpdateError {
    /// Id of the rejected query.
    query_id: String,
    /// Error message.
    message: String,
}

/// Prints match results, as JSON or as text.
pub fn output_matches<M>(
    update: &UpdateResult,
    matches: &Matches<M>,
    document: &InputDocument,
    json: bool,
) -> ExitCode
where
    M: RenderMatch + Serialize,
{
    if json {
        let output = JsonMatchOutput {
            update_errors: update
                .errors
                .iter()
                .map(|e| JsonUpdateError {
                    query_id: e.query_id.clone(),
                    message: e.error.message().to_string(),
                })
                .collect(),
            matches,
        };
        return match serde_json::to_string_pretty(&output) {
            Ok(text) => {
                println!("{text}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: failed to serialize results: {e}");
                ExitCode::FAILURE
            }
        };
    }

    if !update.errors.is_empty() {
        println!("{}", subheader(&format!("Rejected queries ({}):", update.errors.len())));
        for e in &update.errors {
            println!("   {} {}", e.query_id, warning(e.error.message()));
        }
        println!();
    }

    println!(
        "{}",
        header(&format!("Document {}: {} matches", matches.document_id, matches.len()))
    );
    for (id, m) in &matches.matches {
        match m.detail(document) {
            Some(detail) => {
                println!("   {id}");
                for line in detail.lines() {
                    println!("      {}", dim(line));
                }
            }
            None => println!("   {id}"),
        }
    }
    println!();

    if !matches.errors.is_empty() {
        println!("{}", subheader(&format!("Errors ({}):", matches.errors.len())));
        for e in &matches.errors {
            println!("   {} {}", e.query_id, warning(&e.message));
        }
        println!();
    }

    if !matches.slow_log.is_empty() {
        println!("{}", subheader("Slow queries:"));
        for slow in &matches.slow_log {
            println!("   {} {}", slow.query_id, dim(&millis(slow.duration)));
        }
        println!();
    }

    println!(
        "{}",
        dim(&format!(
            "candidates {}, queries run {}, presearch {}, matching {}",
            matches.presearcher_hits,
            matches.queries_run,
            millis(matches.timings.presearch),
            millis(matches.timings.matching),
        ))
    );
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use sift_monitor::Hit;

    use super::*;

    #[test]
    fn highlight_detail_quotes_ranges() {
        let document = InputDocument::new("d").with_field("text", "hello big world");
        let hit = Hit {
            start_position: 2,
            start_offset: 10,
            end_position: 2,
            end_offset: 15,
        };
        let m = HighlightsMatch {
            query_id: "q".into(),
            hits: BTreeMap::from([("text".to_string(), BTreeSet::from([hit]))]),
        };
        assert_eq!(m.detail(&document).unwrap(), "text: 10..15 \"world\"");
    }

    #[test]
    fn millis_formats_fraction() {
        assert_eq!(millis(Duration::from_micros(1500)), "1.500ms");
    }
}
