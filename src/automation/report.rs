//! Turns an inspection result into the text shown after "Analyze".

use regex::Regex;
use std::sync::OnceLock;

use crate::dex::{Catalog, CatalogEntry, Effectiveness, PokemonType};
use crate::ocr::InspectionResult;

/// Anything that cannot appear in a Pokemon name.
const NOISE_PATTERN: &str = r"[^\p{L}\p{N} .'\-♀♂]";

static NOISE: OnceLock<Option<Regex>> = OnceLock::new();

/// Strips OCR noise characters and surrounding whitespace.
pub fn clean_ocr_text(raw: &str) -> String {
    let noise = NOISE.get_or_init(|| Regex::new(NOISE_PATTERN).ok());
    match noise {
        Some(re) => re.replace_all(raw, "").trim().to_string(),
        None => raw.trim().to_string(),
    }
}

fn join_types(types: &[PokemonType]) -> String {
    types
        .iter()
        .map(|t| t.name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// The "Basic Information" and "Type Effectiveness" block for one region,
/// followed by a blank line.
fn entry_block(region: &str, observed: &str, entry: &CatalogEntry, confidence: f32) -> String {
    let secondary = entry
        .secondary_type
        .map(|t| t.name())
        .unwrap_or("None");

    let mut lines = vec![
        format!("{}:", region),
        "  ========= Basic Information ===========".to_string(),
        format!(
            "            Name: {} ({} | {:.2})",
            entry.name, observed, confidence
        ),
        format!("          Number: {}", entry.id),
        format!("    Primary Type: {}", entry.primary_type),
        format!("  Secondary Type: {}", secondary),
        String::new(),
        "  ========== Type Effectiveness =========".to_string(),
    ];
    lines.extend(Effectiveness::ALL.into_iter().map(|level| {
        format!(
            "  {:>15}: {}",
            level.label(),
            join_types(entry.effectiveness.get(level))
        )
    }));
    lines.push(String::new());

    lines.join("\n") + "\n"
}

/// One block per region, in region order.
pub fn summarize(catalog: &Catalog, result: &InspectionResult) -> String {
    let mut out = String::new();

    for (region, text) in result.iter() {
        let observed = text.map(clean_ocr_text).filter(|t| !t.is_empty());
        let Some(observed) = observed else {
            out.push_str(&format!("{}: No Pokemon\n\n", region));
            continue;
        };

        match catalog.get_best(&observed) {
            Some(best) => {
                crate::log(&format!(
                    "'{}' resolved to {} ({:.3})",
                    observed, best.value.name, best.confidence
                ));
                out.push_str(&entry_block(region, &observed, best.value, best.confidence));
            }
            None => {
                out.push_str(&format!("{}: Pokedex missing ({})\n\n", region, observed));
            }
        }
    }

    out
}
