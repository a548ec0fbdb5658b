use std::collections::BTreeMap;

use regex::{Regex, RegexBuilder};

use super::FieldValue;

/// One expected marker in free-form model output: a case-insensitive pattern
/// with a single capture group, and the value space a match normalizes into.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    regex: Regex,
    value: ValueKind,
}

#[derive(Debug, Clone)]
enum ValueKind {
    /// Closed label set, encoded in the pattern's alternation; matches
    /// normalize to lowercase.
    Choice { default: &'static str },
    /// Integer percentage normalized into a 0–1 fraction.
    Fraction { default: f64 },
}

impl FieldSpec {
    pub fn choice(
        name: &'static str,
        pattern: &str,
        default: &'static str,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            name,
            regex: case_insensitive(pattern)?,
            value: ValueKind::Choice { default },
        })
    }

    pub fn fraction(
        name: &'static str,
        pattern: &str,
        default: f64,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            name,
            regex: case_insensitive(pattern)?,
            value: ValueKind::Fraction { default },
        })
    }

    fn default_value(&self) -> FieldValue {
        match &self.value {
            ValueKind::Choice { default } => FieldValue::Text((*default).to_string()),
            ValueKind::Fraction { default } => FieldValue::Number(*default),
        }
    }
}

fn case_insensitive(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

/// Recover structured fields from free-form model text.
///
/// Best effort by contract: specs are searched in table order, the first
/// match of each pattern wins, and a miss contributes the declared default
/// instead of an error. Every spec produces exactly one entry, so the
/// mapping is always complete and no input can make this fail.
pub fn extract(text: &str, specs: &[FieldSpec]) -> BTreeMap<String, FieldValue> {
    let mut out = BTreeMap::new();
    for spec in specs {
        let value = spec
            .regex
            .captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| normalize(&spec.value, m.as_str()))
            .unwrap_or_else(|| spec.default_value());
        out.insert(spec.name.to_string(), value);
    }
    out
}

fn normalize(kind: &ValueKind, raw: &str) -> Option<FieldValue> {
    match kind {
        ValueKind::Choice { .. } => Some(FieldValue::Text(raw.to_ascii_lowercase())),
        ValueKind::Fraction { .. } => raw
            .parse::<f64>()
            .ok()
            .map(|pct| FieldValue::Number((pct / 100.0).clamp(0.0, 1.0))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn confidence_spec() -> FieldSpec {
        FieldSpec::fraction("confidence_score", r"confidence[:\s]*(\d+)%", 0.75).unwrap()
    }

    fn alert_spec() -> FieldSpec {
        FieldSpec::choice("alert_level", r"alert level[:\s]*(low|medium|high)", "medium").unwrap()
    }

    #[test]
    fn percentage_becomes_fraction() {
        let out = extract(
            "Diagnosis: leaf blight. Confidence: 82% based on symptoms.",
            &[confidence_spec()],
        );
        assert_eq!(
            out.get("confidence_score"),
            Some(&FieldValue::Number(0.82))
        );
    }

    #[test]
    fn missing_marker_falls_back_to_default() {
        let out = extract("No structured signal here.", &[confidence_spec()]);
        assert_eq!(
            out.get("confidence_score"),
            Some(&FieldValue::Number(0.75))
        );
    }

    #[test]
    fn choice_matches_case_insensitively_and_lowercases() {
        let out = extract("Summary: ALERT LEVEL: High due to storms.", &[alert_spec()]);
        assert_eq!(
            out.get("alert_level"),
            Some(&FieldValue::Text("high".into()))
        );
    }

    #[test]
    fn first_match_wins() {
        let out = extract(
            "Alert level: low today, but alert level: high later in the week.",
            &[alert_spec()],
        );
        assert_eq!(out.get("alert_level"), Some(&FieldValue::Text("low".into())));
    }

    #[test]
    fn oversized_percentage_clamps_to_one() {
        let out = extract("confidence: 250%", &[confidence_spec()]);
        assert_eq!(out.get("confidence_score"), Some(&FieldValue::Number(1.0)));
    }

    #[test]
    fn empty_input_yields_all_defaults() {
        let out = extract("", &[confidence_spec(), alert_spec()]);
        assert_eq!(out.len(), 2);
        assert_eq!(
            out.get("confidence_score"),
            Some(&FieldValue::Number(0.75))
        );
        assert_eq!(
            out.get("alert_level"),
            Some(&FieldValue::Text("medium".into()))
        );
    }

    proptest! {
        #[test]
        fn extraction_is_total_over_arbitrary_text(text in ".*") {
            let specs = [confidence_spec(), alert_spec()];
            let out = extract(&text, &specs);
            prop_assert_eq!(out.len(), specs.len());
            for spec in &specs {
                prop_assert!(out.contains_key(spec.name));
            }
        }
    }
}
