//! Response sanitizer: strips retrieval provenance the model echoed anyway.
//!
//! This is a best-effort, line-based guard. It catches the usual citation
//! patterns (a trailing "Sources:" block, lines naming PDFs or chunks) but
//! cannot guarantee that no provenance survives in other phrasings.

/// Markers that start a trailing citation block. Everything from the marked line on is dropped.
const CUTOFF_MARKERS: [&str; 2] = ["sources:", "source:"];

/// Markers that drop a single line.
const LINE_MARKERS: [&str; 2] = [".pdf", "chunk"];

/// Remove citation lines from raw model output.
///
/// Matching is case-insensitive. Surviving lines keep their order and are
/// joined with `\n`; surrounding whitespace is trimmed.
pub fn sanitize(raw: &str) -> String {
    let mut kept = Vec::new();
    for line in raw.split('\n') {
        let lower = line.to_lowercase();
        if CUTOFF_MARKERS.iter().any(|m| lower.contains(m)) {
            break;
        }
        if LINE_MARKERS.iter().any(|m| lower.contains(m)) {
            continue;
        }
        kept.push(line);
    }
    kept.join("\n").trim().to_string()
}
