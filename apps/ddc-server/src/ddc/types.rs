//! Document card descriptor types
//!
//! JSON field names follow the document descriptor format used by DDC
//! clients (camelCase, with `ID` spelled in capitals where it appears).

use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// A card always carries the original document plus at least one signature
pub const MIN_ATTACHMENTS: usize = 2;

// ============================================================================
// Descriptor Types
// ============================================================================

/// Information about the digital document and its signatures
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentInfo {
    /// Title of the document
    pub title: String,

    /// Optional description of the document
    pub description: String,

    /// Optional external id of the document
    pub id: String,

    /// Optional QR code (PNG) carrying the document id
    #[serde(rename = "idQRCode", with = "super::b64")]
    pub id_qr_code: Vec<u8>,

    /// Optional QR code (PNG) linking to the document online
    #[serde(rename = "linkQRCode", with = "super::b64")]
    pub link_qr_code: Vec<u8>,

    /// Optional builder logo (PNG)
    #[serde(rename = "builderLogo", with = "super::b64")]
    pub builder_logo: Vec<u8>,

    /// Optional text printed under the builder logo
    #[serde(rename = "subBuilderLogoString")]
    pub sub_builder_logo_string: String,

    /// Signatures in attachment order
    pub signatures: Vec<SignatureInfo>,

    /// Card language: "ru" (default), "kk" or "kk/ru"
    pub language: String,
}

/// A signature to embed into the card
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SignatureInfo {
    /// Signature body bytes
    #[serde(with = "super::b64")]
    pub body: Vec<u8>,

    /// File name for the attachment
    #[serde(rename = "fileName")]
    pub file_name: String,

    /// Signer name for the attachment description, required when no
    /// visualization is given
    #[serde(rename = "signerName")]
    pub signer_name: String,

    /// Details for the signature visualization page
    #[serde(rename = "signatureVisualization")]
    pub signature_visualization: Option<SignatureVisualization>,
}

impl SignatureInfo {
    /// Display identity of the signer.
    ///
    /// The visualization subject name wins over the plain signer name; the
    /// subject id is the last resort. Returns `None` when nothing is set.
    pub fn signer_identity(&self) -> Option<SignerIdentity<'_>> {
        if let Some(vis) = &self.signature_visualization {
            if !vis.subject_name.is_empty() {
                return Some(SignerIdentity::Name(&vis.subject_name));
            }
            if !self.signer_name.is_empty() {
                return Some(SignerIdentity::Name(&self.signer_name));
            }
            if !vis.subject_id.is_empty() {
                return Some(SignerIdentity::SubjectId(&vis.subject_id));
            }
            return None;
        }

        if self.signer_name.is_empty() {
            None
        } else {
            Some(SignerIdentity::Name(&self.signer_name))
        }
    }
}

/// How a signer is named on the card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerIdentity<'a> {
    Name(&'a str),
    SubjectId(&'a str),
}

/// Certificate and revocation details shown on a signature page
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SignatureVisualization {
    #[serde(rename = "subjectName")]
    pub subject_name: String,

    /// Personal identification number (IIN) or passport number
    #[serde(rename = "subjectID")]
    pub subject_id: String,

    #[serde(rename = "subjectOrgName")]
    pub subject_org_name: String,

    /// Employer identification number (BIN)
    #[serde(rename = "subjectOrgID")]
    pub subject_org_id: String,

    /// Full subject RDN (RFC 4514)
    pub subject: String,

    #[serde(rename = "subjectAltName")]
    pub subject_alt_name: String,

    #[serde(rename = "serialNumber")]
    pub serial_number: String,

    pub from: String,

    pub until: String,

    /// "Human readable name (OID)"
    pub policies: Vec<String>,

    #[serde(rename = "keyUsage")]
    pub key_usage: Vec<String>,

    #[serde(rename = "extKeyUsage")]
    pub ext_key_usage: Vec<String>,

    pub issuer: String,

    #[serde(rename = "signatureAlgorithm")]
    pub signature_algorithm: String,

    pub tsp: TspInfo,

    pub ocsp: OcspInfo,

    /// Signature body as a set of QR code images (PNG)
    #[serde(rename = "qrCodes", with = "super::b64::list")]
    pub qr_codes: Vec<Vec<u8>>,
}

/// Time stamp information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TspInfo {
    #[serde(rename = "generatedAt")]
    pub generated_at: String,

    #[serde(rename = "serialNumber")]
    pub serial_number: String,

    pub subject: String,

    pub issuer: String,
}

/// OCSP response information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OcspInfo {
    #[serde(rename = "generatedAt")]
    pub generated_at: String,

    /// "good", "revoked" or "unknown"
    #[serde(rename = "certStatus")]
    pub cert_status: String,

    #[serde(rename = "serialNumber")]
    pub serial_number: String,

    pub subject: String,

    pub issuer: String,
}

// ============================================================================
// Build / Extract Types
// ============================================================================

/// Options for a single card build
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Creation date printed on the info block, e.g. "2021.01.31 13:45:00 UTC+6"
    pub creation_date: String,

    /// Name of the system that built the card
    pub builder_name: String,

    /// Instructions on how to verify the card
    pub how_to_verify: String,

    /// Render the pages of the embedded document (PDF only)
    pub visualize_document: bool,

    /// Render one page per signature
    pub visualize_signatures: bool,
}

/// A named file attached to a card
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttachedFile {
    pub name: String,

    #[serde(with = "super::b64")]
    pub bytes: Vec<u8>,
}

impl AttachedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}
