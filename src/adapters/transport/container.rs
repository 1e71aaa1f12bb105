//! Payload container packing
//!
//! Message payloads travel as a single zip container, one entry per
//! payload, in payload order.

use super::ReceivedPayload;
use crate::domain::{MessagePayload, Result, TransportError};
use std::io::{Cursor, Read, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Packs payloads into a container
///
/// # Errors
///
/// Returns [`TransportError::Container`] if the container cannot be written.
pub fn pack(payloads: &[MessagePayload]) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for payload in payloads {
        writer
            .start_file(payload.filename.as_str(), options)
            .map_err(|e| {
                TransportError::Container(format!("Cannot add '{}': {e}", payload.filename))
            })?;
        writer.write_all(&payload.content).map_err(|e| {
            TransportError::Container(format!("Cannot write '{}': {e}", payload.filename))
        })?;
    }

    let cursor = writer
        .finish()
        .map_err(|e| TransportError::Container(format!("Cannot finish container: {e}")))?;
    Ok(cursor.into_inner())
}

/// Unpacks a container into its entries, skipping directories
///
/// # Errors
///
/// Returns [`TransportError::Container`] if the bytes are not a readable
/// container.
pub fn unpack(bytes: &[u8]) -> Result<Vec<ReceivedPayload>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| TransportError::Container(format!("Cannot open container: {e}")))?;

    let mut entries = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let mut file = archive
            .by_index(index)
            .map_err(|e| TransportError::Container(format!("Cannot read entry {index}: {e}")))?;
        if file.is_dir() {
            continue;
        }

        let mut content = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut content).map_err(|e| {
            TransportError::Container(format!("Cannot read entry '{}': {e}", file.name()))
        })?;
        entries.push(ReceivedPayload {
            filename: file.name().to_string(),
            content,
        });
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DocumentRole;

    #[test]
    fn test_pack_preserves_order_and_content() {
        let payloads = vec![
            MessagePayload::new("arkivmelding.xml", b"<arkivmelding/>".to_vec(), DocumentRole::Primary),
            MessagePayload::new("skjema.xml", b"<skjema/>".to_vec(), DocumentRole::Primary),
            MessagePayload::new("vedlegg.pdf", vec![0x25, 0x50, 0x44, 0x46], DocumentRole::Attachment),
        ];

        let entries = unpack(&pack(&payloads).unwrap()).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.filename.as_str()).collect();
        assert_eq!(names, ["arkivmelding.xml", "skjema.xml", "vedlegg.pdf"]);
        assert_eq!(entries[2].content, vec![0x25, 0x50, 0x44, 0x46]);
    }

    #[test]
    fn test_unpack_garbage() {
        let err = unpack(b"definitely not a zip").unwrap_err();
        assert!(err.to_string().contains("container"));
    }
}
