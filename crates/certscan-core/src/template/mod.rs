//! C5 — Template Extractor (Tier 1).
//!
//! Per certificate type, tries a prioritised set of field extractors against
//! the document's text content, mines defects and appliances, and scores
//! the overall confidence (`spec.md` §4.5).

pub mod patterns;
pub mod transforms;

use crate::types::{CertificateType, ExtractedRecord, Outcome};
use patterns::{field_extractors, mine_appliances, mine_defects, Transform};
use regex::Regex;
use std::collections::HashMap;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct TemplateExtractionResult {
    pub success: bool,
    pub data: ExtractedRecord,
    pub confidence: f64,
    pub matched_fields: usize,
    pub total_expected_fields: usize,
}

/// Runs Tier 1 against `text`. `custom_patterns` is the settings-sourced
/// `{fieldName: [regexString]}` map for this certificate type; invalid
/// regexes are dropped silently (`spec.md` §4.5).
pub fn extract(
    cert_type: &CertificateType,
    text: &str,
    custom_patterns: Option<&HashMap<String, Vec<String>>>,
) -> TemplateExtractionResult {
    let compiled_custom = compile_custom_patterns(custom_patterns);
    let custom_refs: Vec<(&str, Vec<Regex>)> =
        compiled_custom.iter().map(|(name, regexes)| (name.as_str(), regexes.clone())).collect();

    let extractors = field_extractors(cert_type, &custom_refs);
    let total_expected_fields =
        extractors.iter().map(|e| e.field).collect::<std::collections::HashSet<_>>().len();

    let mut record = ExtractedRecord::default();
    let mut matched_fields = 0usize;
    let mut any_required_missed = false;
    let mut seen_fields = std::collections::HashSet::new();

    for extractor in &extractors {
        if seen_fields.contains(extractor.field) {
            continue;
        }
        let mut matched_value = None;
        for pattern in &extractor.patterns {
            if let Some(captures) = pattern.captures(text) {
                if let Some(group) = captures.get(1) {
                    matched_value = Some(group.as_str().trim().to_string());
                    break;
                }
            }
        }

        match matched_value {
            Some(raw) => {
                matched_fields += 1;
                seen_fields.insert(extractor.field);
                assign_field(&mut record, extractor.field, &raw, extractor.transform);
            }
            None if extractor.required => any_required_missed = true,
            None => {}
        }
    }

    record.defects = mine_defects(text);
    record.appliances = mine_appliances(text);

    let mut confidence = matched_fields as f64 / total_expected_fields.max(1) as f64;
    if any_required_missed {
        confidence /= 2.0;
    }
    if !record.defects.is_empty() {
        confidence += 0.10;
    }
    if !record.appliances.is_empty() {
        confidence += 0.05;
    }
    confidence = confidence.min(1.0);

    TemplateExtractionResult {
        success: matched_fields >= 2,
        data: record,
        confidence,
        matched_fields,
        total_expected_fields,
    }
}

fn compile_custom_patterns(custom: Option<&HashMap<String, Vec<String>>>) -> Vec<(String, Vec<Regex>)> {
    let Some(custom) = custom else { return Vec::new() };
    custom
        .iter()
        .map(|(field, patterns)| {
            let compiled: Vec<Regex> = patterns
                .iter()
                .filter_map(|pattern| match Regex::new(pattern) {
                    Ok(re) => Some(re),
                    Err(err) => {
                        warn!(field, pattern, error = %err, "invalid custom extraction pattern, dropping");
                        None
                    }
                })
                .collect();
            (field.clone(), compiled)
        })
        .collect()
}

fn assign_field(record: &mut ExtractedRecord, field: &str, raw: &str, transform: Transform) {
    let transformed = match transform {
        Transform::None => Some(raw.to_string()),
        Transform::Date => transforms::normalize_date(raw).or_else(|| Some(raw.to_string())),
        Transform::Outcome => None,
    };

    match field {
        "certificateNumber" => record.certificate_number = transformed,
        "propertyAddress" => record.property_address = transformed,
        "uprn" => record.uprn = transformed,
        "inspectionDate" => record.inspection_date = transformed,
        "expiryDate" => record.expiry_date = transformed,
        "nextInspectionDate" => record.next_inspection_date = transformed,
        "outcome" => record.outcome = Outcome::normalize(raw),
        "engineerName" => record.engineer_name = transformed,
        "engineerRegistration" => record.engineer_registration = transformed,
        "contractorName" => record.contractor_name = transformed,
        "contractorRegistration" => record.contractor_registration = transformed,
        other => {
            if let Some(value) = transformed {
                record.additional_fields.insert(other.to_string(), value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GAS_CERT_TEXT: &str = "Certificate No: LGSR-12345\nGas Safe Reg: 1234567\nInspection Date: 03/07/2024\nOverall: Satisfactory\n";

    #[test]
    fn extracts_gas_certificate_fields() {
        let result = extract(&CertificateType::Gas, GAS_CERT_TEXT, None);
        assert_eq!(result.data.certificate_number.as_deref(), Some("LGSR-12345"));
        assert_eq!(result.data.engineer_registration.as_deref(), Some("1234567"));
        assert_eq!(result.data.inspection_date.as_deref(), Some("2024-07-03"));
        assert_eq!(result.data.outcome, Some(Outcome::Pass));
        assert!(result.success);
    }

    #[test]
    fn success_requires_at_least_two_matches() {
        let result = extract(&CertificateType::Gas, "nothing useful here", None);
        assert!(!result.success);
        assert_eq!(result.matched_fields, 0);
    }

    #[test]
    fn custom_pattern_takes_priority_over_builtin() {
        let mut custom = HashMap::new();
        custom.insert("certificateNumber".to_string(), vec![r"REF-(\w+)".to_string()]);
        let result = extract(&CertificateType::Gas, "REF-XYZ99 is the number", Some(&custom));
        assert_eq!(result.data.certificate_number.as_deref(), Some("XYZ99"));
    }

    #[test]
    fn invalid_custom_pattern_is_dropped_without_error() {
        let mut custom = HashMap::new();
        custom.insert("certificateNumber".to_string(), vec!["(unterminated".to_string()]);
        let result = extract(&CertificateType::Gas, GAS_CERT_TEXT, Some(&custom));
        assert_eq!(result.data.certificate_number.as_deref(), Some("LGSR-12345"));
    }
}
