//! QR code and EXIF metadata shapes, `spec.md` §3 "QR+Metadata Result".

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QrProvider {
    GasSafe,
    GasTag,
    Niceic,
    Corgi,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrCode {
    pub provider: QrProvider,
    pub url: Option<String>,
    pub verification_code: Option<String>,
    pub raw_payload: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExifData {
    pub date_taken: Option<String>,
    pub gps_lat: Option<f64>,
    pub gps_lng: Option<f64>,
    pub device: Option<String>,
    pub software: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QrMetadataResult {
    pub qr_codes: Vec<QrCode>,
    pub exif: Option<ExifData>,
    pub has_verification_data: bool,
    /// Flat pre-extracted fields: `gasSafeId`, `gasTagRef`, `niceicRef`,
    /// `verificationUrl`, `photoDate`, `latitude`, `longitude`,
    /// `generatingSoftware` (`spec.md` §4.4).
    pub fields: BTreeMap<String, String>,
}

impl QrMetadataResult {
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}
