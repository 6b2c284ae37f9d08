//! Attachment extraction from a card
//!
//! Walks the `EmbeddedFiles` name tree of the catalog (including `Kids`
//! subtrees) in key order and returns every embedded file with its name.

use lopdf::{Dictionary, Document, Object};

use super::error::{DdcError, Result};
use super::types::AttachedFile;
use super::AttachmentExtractor;

/// Name trees deeper than this are treated as malformed
const MAX_TREE_DEPTH: usize = 32;

/// lopdf-backed [`AttachmentExtractor`]
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfAttachmentExtractor;

impl AttachmentExtractor for PdfAttachmentExtractor {
    fn extract(&self, pdf: &[u8]) -> Result<Vec<AttachedFile>> {
        let doc = Document::load_mem(pdf)?;

        let root = doc.trailer.get(b"Root").and_then(Object::as_reference)?;
        let catalog = doc.get_dictionary(root)?;

        let names = match catalog.get(b"Names") {
            Ok(obj) => resolve_dict(&doc, obj)?,
            Err(_) => return Ok(Vec::new()),
        };
        let tree = match names.get(b"EmbeddedFiles") {
            Ok(obj) => resolve_dict(&doc, obj)?,
            Err(_) => return Ok(Vec::new()),
        };

        let mut entries = Vec::new();
        collect_entries(&doc, tree, 0, &mut entries)?;
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let files = entries
            .into_iter()
            .map(|(_, spec)| read_filespec(&doc, spec))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(attachments = files.len(), "Extracted card attachments");
        Ok(files)
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Result<&'a Object> {
    Ok(doc.dereference(obj)?.1)
}

fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Result<&'a Dictionary> {
    Ok(resolve(doc, obj)?.as_dict()?)
}

fn collect_entries<'a>(
    doc: &'a Document,
    node: &'a Dictionary,
    depth: usize,
    out: &mut Vec<(Vec<u8>, &'a Dictionary)>,
) -> Result<()> {
    if depth > MAX_TREE_DEPTH {
        return Err(DdcError::Malformed("embedded files tree is too deep".to_string()));
    }

    if let Ok(names) = node.get(b"Names") {
        let names = resolve(doc, names)?.as_array()?;
        for pair in names.chunks(2) {
            let [key, value] = pair else {
                return Err(DdcError::Malformed(
                    "embedded files tree has an odd number of entries".to_string(),
                ));
            };
            let key = resolve(doc, key)?.as_str()?.to_vec();
            out.push((key, resolve_dict(doc, value)?));
        }
    }

    if let Ok(kids) = node.get(b"Kids") {
        for kid in resolve(doc, kids)?.as_array()? {
            collect_entries(doc, resolve_dict(doc, kid)?, depth + 1, out)?;
        }
    }

    Ok(())
}

fn read_filespec(doc: &Document, spec: &Dictionary) -> Result<AttachedFile> {
    let name = [b"UF".as_slice(), b"F".as_slice()]
        .iter()
        .find_map(|key| spec.get(key).ok())
        .and_then(|obj| resolve(doc, obj).ok())
        .and_then(|obj| obj.as_str().ok())
        .map(decode_text_string)
        .unwrap_or_default();

    let ef = spec
        .get(b"EF")
        .map_err(|_| DdcError::Malformed(format!("attachment '{}' has no file stream", name)))?;
    let ef = resolve_dict(doc, ef)?;
    let stream_ref = ef
        .get(b"UF")
        .or_else(|_| ef.get(b"F"))
        .map_err(|_| DdcError::Malformed(format!("attachment '{}' has no file stream", name)))?;
    let stream = resolve(doc, stream_ref)?.as_stream()?;

    let bytes = if stream.dict.has(b"Filter") {
        stream.decompressed_content()?
    } else {
        stream.content.clone()
    };

    Ok(AttachedFile { name, bytes })
}

/// Decode a PDF text string: UTF-16BE when it carries a byte order mark,
/// single-byte otherwise
pub(crate) fn decode_text_string(bytes: &[u8]) -> String {
    match bytes {
        [0xfe, 0xff, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => bytes.iter().map(|&b| b as char).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream};

    fn card_with_tree(tree: Dictionary, extra: Vec<(u32, Object)>) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        for (id, obj) in extra {
            doc.objects.insert((id, 0), obj);
        }
        doc.max_id = 100;
        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => Vec::<Object>::new(),
            "Count" => 0i64,
        });
        let tree_id = doc.add_object(tree);
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
            "Names" => dictionary! { "EmbeddedFiles" => tree_id },
        });
        doc.trailer.set("Root", catalog_id);
        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    fn filespec(name: &str, stream_id: u32) -> Object {
        Object::Dictionary(dictionary! {
            "Type" => "Filespec",
            "F" => Object::string_literal(name),
            "EF" => dictionary! { "F" => (stream_id, 0) },
        })
    }

    fn file(bytes: &[u8]) -> Object {
        Object::Stream(Stream::new(dictionary! { "Type" => "EmbeddedFile" }, bytes.to_vec()))
    }

    #[test]
    fn test_extracts_in_key_order_across_kids() {
        let tree = dictionary! {
            "Kids" => vec![Object::Reference((10, 0)), Object::Reference((11, 0))],
        };
        let extra = vec![
            (1, file(b"document")),
            (2, file(b"sig-a")),
            (3, file(b"sig-b")),
            (4, filespec("doc.txt", 1)),
            (5, filespec("a.cms", 2)),
            (6, filespec("b.cms", 3)),
            (
                10,
                Object::Dictionary(dictionary! {
                    "Names" => vec![
                        Object::string_literal("0002"),
                        Object::Reference((5, 0)),
                        Object::string_literal("0003"),
                        Object::Reference((6, 0)),
                    ],
                }),
            ),
            (
                11,
                Object::Dictionary(dictionary! {
                    "Names" => vec![Object::string_literal("0001"), Object::Reference((4, 0))],
                }),
            ),
        ];

        let pdf = card_with_tree(tree, extra);
        let files = PdfAttachmentExtractor.extract(&pdf).unwrap();

        assert_eq!(
            files,
            vec![
                AttachedFile::new("doc.txt", b"document".to_vec()),
                AttachedFile::new("a.cms", b"sig-a".to_vec()),
                AttachedFile::new("b.cms", b"sig-b".to_vec()),
            ]
        );
    }

    #[test]
    fn test_missing_tree_yields_no_attachments() {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => Vec::<Object>::new(),
            "Count" => 0i64,
        });
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);
        let mut pdf = Vec::new();
        doc.save_to(&mut pdf).unwrap();

        assert!(PdfAttachmentExtractor.extract(&pdf).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_non_pdf() {
        assert!(PdfAttachmentExtractor.extract(b"not a pdf").is_err());
    }

    #[test]
    fn test_decode_text_string() {
        assert_eq!(decode_text_string(b"plain"), "plain");
        assert_eq!(decode_text_string(&[0xfe, 0xff, 0x04, 0x16, 0x00, 0x41]), "ЖA");
    }
}
