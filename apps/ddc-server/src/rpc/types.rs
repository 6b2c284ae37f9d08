//! RPC argument and result types
//!
//! Field names are PascalCase; byte fields are base64 strings. Every result
//! carries an `Error` string that is empty on success.

use serde::{Deserialize, Serialize};

use crate::ddc::{b64, AttachedFile, SignatureInfo};

// ============================================================================
// Shared
// ============================================================================

/// Arguments that only name a session
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionArgs {
    #[serde(rename = "ID")]
    pub id: String,
}

/// Arguments of calls that take nothing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoArgs {}

/// Result of calls that return nothing but an error
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EmptyReply {
    pub error: String,
}

/// Result of a session registration
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RegisterReply {
    #[serde(rename = "ID")]
    pub id: String,
    pub error: String,
}

/// One part of a chunked download
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PartReply {
    #[serde(with = "b64")]
    pub part: Vec<u8>,
    pub is_final: bool,
    pub error: String,
}

// ============================================================================
// Builder
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct BuilderRegisterArgs {
    pub title: String,
    pub description: String,
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "IDQRCode", with = "b64")]
    pub id_qr_code: Vec<u8>,
    pub file_name: String,
    pub language: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct AppendDocumentPartArgs {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(with = "b64")]
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct AppendSignatureArgs {
    #[serde(rename = "ID")]
    pub id: String,
    pub signature_info: SignatureInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct BuildArgs {
    #[serde(rename = "ID")]
    pub id: String,
    /// e.g. "2021.01.31 13:45:00 UTC+6"
    pub creation_date: String,
    pub builder_name: String,
    pub how_to_verify: String,
    pub without_document_visualization: bool,
    pub without_signatures_visualization: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct GetPartArgs {
    #[serde(rename = "ID")]
    pub id: String,
    pub max_part_size: i64,
    /// Only meaningful for `Extractor.GetDocumentPart`
    pub rewind: bool,
}

// ============================================================================
// Extractor
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct AppendDdcPartArgs {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(with = "b64")]
    pub part: Vec<u8>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ParseReply {
    pub document_file_name: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SignatureReply {
    pub signature: AttachedFile,
    pub is_final: bool,
    pub error: String,
}
