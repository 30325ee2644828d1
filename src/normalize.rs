//! Text normalisation: deterministic cleanup of extracted label text.
//!
//! ## Why normalise at all?
//!
//! OCR output for printed labels is noisy in very repeatable ways: stray
//! spaces inside measurement tokens (`75 0 ml`, `12 , 5 % vol`), Windows
//! line endings from the PDF text layer, runs of whitespace where column
//! layout collapsed, and mixed check-mark glyph variants in pre-annotated
//! artwork. The downstream analyser matches on these tokens, so they are
//! canonicalised here once, on the accepted candidate only.
//!
//! This is a fixed rule table, not a general parser: the rules are
//! heuristic and locale-specific (decimal commas, metric volume units) and
//! are kept deliberately dumb so behaviour stays reproducible.
//!
//! ## Contract
//!
//! [`normalize`] is a pure function with no failure mode, and it is
//! idempotent: `normalize(normalize(x)) == normalize(x)` for every input.
//! Every rule rewrites toward a canonical form that is a fixed point of
//! the whole table.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply the full normalisation rule table to extracted text.
///
/// Rules (applied in order):
/// 1. Unify line terminators (CRLF / CR → LF)
/// 2. Repair decimal percentage tokens (`12 , 5 %` → `12,5%`)
/// 3. Repair volume/mass unit tokens (`75 0ML` → `750 ml`)
/// 4. Fix spacing of `% vol`
/// 5. Unify status-marker glyph variants (✔ → ✅, ✖/❎ → ❌, ⚠ → ⚠️)
/// 6. Collapse horizontal whitespace runs, trim line ends
/// 7. Collapse 3+ consecutive newlines down to 2
/// 8. Trim outer whitespace
pub fn normalize(input: &str) -> String {
    let s = unify_line_endings(input);
    let s = repair_percent_tokens(&s);
    let s = repair_unit_tokens(&s);
    let s = fix_percent_vol_spacing(&s);
    let s = unify_status_markers(&s);
    let s = collapse_horizontal_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

// ── Rule 1: line terminators ─────────────────────────────────────────────

fn unify_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: decimal percentages ──────────────────────────────────────────
//
// OCR splits `12,5%` into `12 , 5 %` (or reads the comma as a period), and
// sometimes splits the digit groups themselves. The whole token is matched
// and rebuilt in one pass so the canonical form is reached immediately.
// Canonical form uses the decimal comma of EU label text.

static RE_PERCENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d(?:[\d ]*\d)?)\s*[.,]\s*(\d(?:[\d ]*\d)?)\s*%").unwrap());
static RE_INT_PERCENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d) +%").unwrap());

fn repair_percent_tokens(input: &str) -> String {
    let joined = RE_PERCENT.replace_all(input, |caps: &regex::Captures<'_>| {
        format!(
            "{},{}%",
            caps[1].replace(' ', ""),
            caps[2].replace(' ', "")
        )
    });
    RE_INT_PERCENT.replace_all(&joined, "$1%").to_string()
}

// ── Rule 3: volume/mass units ────────────────────────────────────────────
//
// `750ml`, `75 0 cl`, `750 ML` all become `750 ml`: digit groups joined,
// one space, lowercase unit.

static RE_UNIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d(?:[\d ]*\d)?)\s*(ml|cl|mg|kg|g|l)\b").unwrap());

fn repair_unit_tokens(input: &str) -> String {
    RE_UNIT
        .replace_all(input, |caps: &regex::Captures<'_>| {
            format!(
                "{} {}",
                caps[1].replace(' ', ""),
                caps[2].to_ascii_lowercase()
            )
        })
        .to_string()
}

// ── Rule 4: `% vol` spacing ──────────────────────────────────────────────

static RE_PERCENT_VOL: Lazy<Regex> = Lazy::new(|| Regex::new(r"%\s*(?i:vol)\b").unwrap());

fn fix_percent_vol_spacing(input: &str) -> String {
    RE_PERCENT_VOL.replace_all(input, "% vol").to_string()
}

// ── Rule 5: status markers ───────────────────────────────────────────────
//
// Pre-annotated artwork and OCR confusion produce several check-mark
// variants. The downstream analyser keys on exactly ✅ / ⚠️ / ❌.

fn unify_status_markers(input: &str) -> String {
    let s = input
        .replace("✔\u{FE0F}", "✅")
        .replace('✔', "✅")
        .replace("✖\u{FE0F}", "❌")
        .replace('✖', "❌")
        .replace('❎', "❌");
    // Strip the variation selector first, then re-add it, so bare ⚠ and
    // fully-qualified ⚠️ both land on the same byte sequence.
    s.replace("⚠\u{FE0F}", "⚠").replace('⚠', "⚠\u{FE0F}")
}

// ── Rule 6: horizontal whitespace ────────────────────────────────────────

static RE_HSPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\u{00A0}]+").unwrap());

fn collapse_horizontal_whitespace(input: &str) -> String {
    let collapsed = RE_HSPACE.replace_all(input, " ");
    collapsed
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 7: blank lines ──────────────────────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_idempotent(input: &str) {
        let once = normalize(input);
        let twice = normalize(&once);
        assert_eq!(once, twice, "normalize not idempotent for {input:?}");
    }

    #[test]
    fn line_endings_unified() {
        assert_eq!(normalize("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn percent_token_repaired() {
        assert_eq!(normalize("ALC. 12 , 5 % VOL"), "ALC. 12,5% vol");
        assert_eq!(normalize("12.5%"), "12,5%");
        assert_eq!(normalize("12,5%"), "12,5%");
    }

    #[test]
    fn unit_token_repaired() {
        assert_eq!(normalize("750ml"), "750 ml");
        assert_eq!(normalize("75 0 ML"), "750 ml");
        assert_eq!(normalize("CONTIENE 75 cl"), "CONTIENE 75 cl");
    }

    #[test]
    fn unit_not_joined_inside_words() {
        // `l` must only match as a standalone unit token.
        assert_eq!(normalize("5 litri"), "5 litri");
        assert_eq!(normalize("numero 7 lotto"), "numero 7 lotto");
    }

    #[test]
    fn status_markers_unified() {
        assert_eq!(normalize("✔ ok ✖ no ❎ anche no"), "✅ ok ❌ no ❌ anche no");
        assert_eq!(normalize("⚠ attenzione"), "⚠\u{FE0F} attenzione");
        assert_eq!(normalize("⚠\u{FE0F} attenzione"), "⚠\u{FE0F} attenzione");
    }

    #[test]
    fn whitespace_collapsed() {
        assert_eq!(normalize("a   b\t\tc  "), "a b c");
        assert_eq!(normalize("a\n\n\n\n\nb"), "a\n\nb");
    }

    #[test]
    fn empty_and_blank_inputs() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \n\t \r\n "), "");
    }

    #[test]
    fn idempotent_on_varied_inputs() {
        for input in [
            "",
            "   ",
            "VINO ROSSO 75 0 ml ALC. 12 . 5 %VOL\r\nLotto L2203",
            "✔ conforme\n\n\n\n⚠ parziale ✖ mancante",
            "plain ascii text with no tokens at all",
            "già normalizzato: 750 ml 12,5% vol",
            "tabs\t\tand\u{00A0}nbsp",
        ] {
            assert_idempotent(input);
        }
    }

    #[test]
    fn label_round_trip_realistic() {
        let raw = "  DENOMINAZIONE DI ORIGINE\r\nVol.  75 0 ml\nALC 12 , 5 % vol\n\n\n\nLotto  L1234  ";
        let got = normalize(raw);
        assert!(got.contains("750 ml"));
        assert!(got.contains("12,5% vol"));
        assert!(!got.contains('\r'));
        assert!(!got.contains("\n\n\n"));
        assert!(!got.starts_with(' ') && !got.ends_with(' '));
        assert_idempotent(raw);
    }
}
