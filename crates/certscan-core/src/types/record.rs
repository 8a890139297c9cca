//! The structured extraction output: header + repeated sub-records.
//! `spec.md` §3 "Extracted Record".

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Pass,
    Fail,
    Satisfactory,
    Unsatisfactory,
    #[serde(rename = "N/A")]
    NotApplicable,
    /// EPC band, `A..G`.
    EpcBand(char),
}

impl Outcome {
    /// Normalises a raw outcome token per `spec.md` §4.5: `SATISFACTORY|PASS
    /// → PASS`, `UNSATISFACTORY|FAIL|INTOLERABLE → FAIL`, EPC letters
    /// upper-cased.
    pub fn normalize(raw: &str) -> Option<Self> {
        let upper = raw.trim().to_uppercase();
        match upper.as_str() {
            "SATISFACTORY" | "PASS" | "PASSED" => Some(Self::Pass),
            "UNSATISFACTORY" | "FAIL" | "FAILED" | "INTOLERABLE" => Some(Self::Fail),
            "N/A" | "NA" | "NOT APPLICABLE" => Some(Self::NotApplicable),
            band if band.len() == 1 && ("A".."H").contains(&band) => {
                band.chars().next().map(Self::EpcBand)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DefectSeverity {
    Immediate,
    Urgent,
    Routine,
    Advisory,
}

impl DefectSeverity {
    /// Maps a classification-code token to severity, per `spec.md` §4.5.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_uppercase().as_str() {
            "C1" | "HIGH" => Some(Self::Immediate),
            "C2" | "FI" | "MEDIUM" => Some(Self::Urgent),
            "C3" | "AR" | "LOW" => Some(Self::Routine),
            "ID" | "NCS" | "P1" | "P2" | "P3" | "P4" => Some(Self::Advisory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Defect {
    pub code: String,
    pub severity: Option<DefectSeverity>,
    pub description: String,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Appliance {
    pub make: Option<String>,
    pub model: Option<String>,
    pub location: Option<String>,
    pub outcome: Option<Outcome>,
}

/// The fixed-shape header plus repeated sub-records, `spec.md` §3. Wire
/// format is camelCase (`certificateNumber`, ...) to match the JSON schema
/// handed to AI providers (`orchestrator::extraction_schema`) and the field
/// names `spec.md` §8's boundary scenarios assert on directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedRecord {
    pub certificate_number: Option<String>,
    pub property_address: Option<String>,
    pub uprn: Option<String>,
    pub inspection_date: Option<String>,
    pub expiry_date: Option<String>,
    pub next_inspection_date: Option<String>,
    pub outcome: Option<Outcome>,
    pub engineer_name: Option<String>,
    pub engineer_registration: Option<String>,
    pub contractor_name: Option<String>,
    pub contractor_registration: Option<String>,
    pub appliances: Vec<Appliance>,
    pub defects: Vec<Defect>,
    pub additional_fields: BTreeMap<String, String>,
}

impl ExtractedRecord {
    /// `spec.md` §4.10 "Field counting": populated scalar header fields plus
    /// +1 if appliances non-empty and +1 if defects non-empty.
    pub fn populated_field_count(&self) -> usize {
        let scalars = [
            self.certificate_number.is_some(),
            self.property_address.is_some(),
            self.uprn.is_some(),
            self.inspection_date.is_some(),
            self.expiry_date.is_some(),
            self.next_inspection_date.is_some(),
            self.outcome.is_some(),
            self.engineer_name.is_some(),
            self.engineer_registration.is_some(),
            self.contractor_name.is_some(),
            self.contractor_registration.is_some(),
        ];
        let mut count = scalars.iter().filter(|set| **set).count();
        if !self.appliances.is_empty() {
            count += 1;
        }
        if !self.defects.is_empty() {
            count += 1;
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_normalizes_satisfactory_to_pass() {
        assert_eq!(Outcome::normalize("Satisfactory"), Some(Outcome::Pass));
        assert_eq!(Outcome::normalize("INTOLERABLE"), Some(Outcome::Fail));
    }

    #[test]
    fn outcome_normalizes_epc_band() {
        assert_eq!(Outcome::normalize("c"), Some(Outcome::EpcBand('C')));
    }

    #[test]
    fn defect_severity_maps_classification_codes() {
        assert_eq!(DefectSeverity::from_code("C1"), Some(DefectSeverity::Immediate));
        assert_eq!(DefectSeverity::from_code("P2"), Some(DefectSeverity::Advisory));
        assert_eq!(DefectSeverity::from_code("ZZ"), None);
    }

    #[test]
    fn field_count_includes_appliances_and_defects() {
        let mut record = ExtractedRecord {
            certificate_number: Some("X".into()),
            ..Default::default()
        };
        assert_eq!(record.populated_field_count(), 1);
        record.defects.push(Defect::default());
        assert_eq!(record.populated_field_count(), 2);
        record.appliances.push(Appliance::default());
        assert_eq!(record.populated_field_count(), 3);
    }
}
