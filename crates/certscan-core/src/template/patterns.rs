//! Built-in field-extractor tables for the Template Extractor (C5),
//! `spec.md` §4.5. One set of field extractors per certificate type, with a
//! certificate-number pattern keyed to that type's prefix convention and a
//! shared base table for the rest of the header fields — the boundary
//! scenarios (`spec.md` §8 S1/S4) only pin down field behaviour for GAS and
//! FRA, so the remaining types share this generic shape rather than each
//! carrying a hand-tuned table (`DESIGN.md` Open Question).

use crate::types::{CertificateType, DefectSeverity};
use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, Copy)]
pub enum Transform {
    None,
    Date,
    Outcome,
}

pub struct FieldExtractor {
    pub field: &'static str,
    pub patterns: Vec<Regex>,
    pub transform: Transform,
    pub required: bool,
}

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in pattern must compile")
}

/// Certificate-number prefix conventions per type, `spec.md` §4.2 fallback
/// keyword table mirrors the same prefixes (LGSR, EICR, ...).
fn certificate_number_patterns(cert_type: &CertificateType) -> Vec<Regex> {
    let prefix = match cert_type {
        CertificateType::Gas => Some("LGSR"),
        CertificateType::Eicr => Some("EICR"),
        CertificateType::Epc => Some("RRN"),
        CertificateType::Pat => Some("PAT"),
        CertificateType::Lift => Some("LOLER"),
        CertificateType::Emlt => Some("EMLT"),
        CertificateType::FireAlarm => Some("FA"),
        CertificateType::SmokeCo => Some("SCO"),
        _ => None,
    };

    let mut patterns = Vec::new();
    if let Some(prefix) = prefix {
        patterns.push(re(&format!(
            r"(?i)certificate\s*(?:no\.?|number)\s*[:#]?\s*({prefix}-?[A-Z0-9-]+)"
        )));
    }
    patterns.push(re(r"(?i)certificate\s*(?:no\.?|number)\s*[:#]?\s*([A-Z0-9][A-Z0-9-]{3,})"));
    patterns.push(re(r"(?i)ref(?:erence)?\s*(?:no\.?)?\s*[:#]?\s*([A-Z0-9][A-Z0-9-]{3,})"));
    patterns
}

/// Field extractors for a certificate type, custom patterns prepended so
/// they take priority (`spec.md` §4.5: "so they take priority").
pub fn field_extractors(cert_type: &CertificateType, custom: &[(&str, Vec<Regex>)]) -> Vec<FieldExtractor> {
    let mut extractors = Vec::new();

    for (field, patterns) in custom {
        if !patterns.is_empty() {
            extractors.push(FieldExtractor {
                field,
                patterns: patterns.clone(),
                transform: transform_for_field(field),
                required: false,
            });
        }
    }

    extractors.push(FieldExtractor {
        field: "certificateNumber",
        patterns: certificate_number_patterns(cert_type),
        transform: Transform::None,
        required: true,
    });
    extractors.push(FieldExtractor {
        field: "propertyAddress",
        patterns: vec![re(r"(?i)(?:property|site|address)\s*[:#]\s*(.+)")],
        transform: Transform::None,
        required: false,
    });
    extractors.push(FieldExtractor {
        field: "uprn",
        patterns: vec![re(r"(?i)UPRN\s*[:#]?\s*(\d{6,14})")],
        transform: Transform::None,
        required: false,
    });
    extractors.push(FieldExtractor {
        field: "inspectionDate",
        patterns: vec![
            re(r"(?i)inspection\s*date\s*[:#]?\s*([0-9]{1,2}[/-][0-9]{1,2}[/-][0-9]{4}|[0-9]{4}[/-][0-9]{1,2}[/-][0-9]{1,2})"),
            re(r"(?i)date\s*of\s*inspection\s*[:#]?\s*([0-9]{1,2}(?:st|nd|rd|th)?\s+[A-Za-z]+\s+[0-9]{4})"),
        ],
        transform: Transform::Date,
        required: true,
    });
    extractors.push(FieldExtractor {
        field: "expiryDate",
        patterns: vec![re(
            r"(?i)expir(?:y|es?)\s*(?:date)?\s*[:#]?\s*([0-9]{1,2}[/-][0-9]{1,2}[/-][0-9]{4}|[0-9]{4}[/-][0-9]{1,2}[/-][0-9]{1,2})",
        )],
        transform: Transform::Date,
        required: false,
    });
    extractors.push(FieldExtractor {
        field: "nextInspectionDate",
        patterns: vec![re(
            r"(?i)next\s*inspection\s*(?:date)?\s*[:#]?\s*([0-9]{1,2}[/-][0-9]{1,2}[/-][0-9]{4}|[0-9]{4}[/-][0-9]{1,2}[/-][0-9]{1,2})",
        )],
        transform: Transform::Date,
        required: false,
    });
    extractors.push(FieldExtractor {
        field: "outcome",
        patterns: vec![re(
            r"(?i)(?:overall|result|outcome)\s*[:#]?\s*(SATISFACTORY|UNSATISFACTORY|PASS(?:ED)?|FAIL(?:ED)?|INTOLERABLE|N/?A|[A-G])\b",
        )],
        transform: Transform::Outcome,
        required: true,
    });
    extractors.push(FieldExtractor {
        field: "engineerName",
        patterns: vec![re(r"(?i)engineer(?:'s)?\s*name\s*[:#]\s*(.+)")],
        transform: Transform::None,
        required: false,
    });
    extractors.push(FieldExtractor {
        field: "engineerRegistration",
        patterns: vec![re(r"(?i)gas\s*safe\s*(?:reg(?:istration)?(?:\s*no\.?)?|id)\s*[:#]?\s*(\d{5,7})")],
        transform: Transform::None,
        required: false,
    });
    extractors.push(FieldExtractor {
        field: "contractorName",
        patterns: vec![re(r"(?i)contractor\s*(?:name)?\s*[:#]\s*(.+)")],
        transform: Transform::None,
        required: false,
    });
    extractors.push(FieldExtractor {
        field: "contractorRegistration",
        patterns: vec![re(r"(?i)contractor\s*(?:reg(?:istration)?(?:\s*no\.?)?)\s*[:#]?\s*([A-Z0-9-]{3,})")],
        transform: Transform::None,
        required: false,
    });

    extractors
}

fn transform_for_field(field: &str) -> Transform {
    match field {
        "inspectionDate" | "expiryDate" | "nextInspectionDate" => Transform::Date,
        "outcome" => Transform::Outcome,
        _ => Transform::None,
    }
}

static DEFECT_CODE_RE: Lazy<Regex> =
    Lazy::new(|| re(r"(?i)\b(C1|C2|C3|FI|AR|ID|NCS|P1|P2|P3|P4|HIGH|MEDIUM|LOW)\b[:\s-]*(.*)"));

/// Mines defects line-by-line by classification-code regex, `spec.md` §4.5.
pub fn mine_defects(text: &str) -> Vec<crate::types::Defect> {
    text.lines()
        .filter_map(|line| {
            let captures = DEFECT_CODE_RE.captures(line)?;
            let code = captures[1].to_uppercase();
            let severity = DefectSeverity::from_code(&code);
            let description = captures.get(2).map(|m| m.as_str().trim().to_string()).unwrap_or_default();
            Some(crate::types::Defect { code, severity, description, location: None })
        })
        .collect()
}

static APPLIANCE_RE: Lazy<Regex> = Lazy::new(|| {
    re(r"(?i)appliance\s*[:#]\s*(?:make\s*[:#]?\s*(?P<make>[^,;/]+))?[,;/]?\s*(?:model\s*[:#]?\s*(?P<model>[^,;/]+))?[,;/]?\s*(?:(?P<outcome>PASS(?:ED)?|FAIL(?:ED)?))?")
});

/// Mines appliance rows from `appliance:` pattern repetitions, `spec.md`
/// §4.5: "make/model/outcome sub-extraction (PASS/FAIL)".
pub fn mine_appliances(text: &str) -> Vec<crate::types::Appliance> {
    text.lines()
        .filter_map(|line| {
            let captures = APPLIANCE_RE.captures(line)?;
            let make = captures.name("make").map(|m| m.as_str().trim().to_string());
            let model = captures.name("model").map(|m| m.as_str().trim().to_string());
            let outcome = captures
                .name("outcome")
                .and_then(|m| crate::types::Outcome::normalize(m.as_str()));
            if make.is_none() && model.is_none() && outcome.is_none() {
                return None;
            }
            Some(crate::types::Appliance { make, model, location: None, outcome })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mines_defect_with_classification_code() {
        let defects = mine_defects("C1: Exposed live conductor in consumer unit");
        assert_eq!(defects.len(), 1);
        assert_eq!(defects[0].code, "C1");
        assert_eq!(defects[0].severity, Some(DefectSeverity::Immediate));
    }

    #[test]
    fn mines_appliance_row() {
        let appliances = mine_appliances("Appliance: Make: Worcester, Model: Greenstar, PASS");
        assert_eq!(appliances.len(), 1);
        assert_eq!(appliances[0].make.as_deref(), Some("Worcester"));
    }
}
