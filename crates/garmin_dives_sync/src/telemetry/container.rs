use std::borrow::Cow;
use std::io::{Cursor, Read};

use zip::ZipArchive;

use super::TelemetryError;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const MAX_ENTRY_BYTES: u64 = 64 * 1024 * 1024;

/// The FIT payload of a download: the blob itself, or the first `.fit`
/// entry when it is a ZIP archive.
pub(super) fn unpack(blob: &[u8]) -> Result<Cow<'_, [u8]>, TelemetryError> {
    if !blob.starts_with(ZIP_MAGIC) {
        return Ok(Cow::Borrowed(blob));
    }

    let zip_err = |e: zip::result::ZipError| TelemetryError::Decode(format!("zip: {e}"));
    let mut archive = ZipArchive::new(Cursor::new(blob)).map_err(zip_err)?;
    for index in 0..archive.len() {
        let entry = archive.by_index(index).map_err(zip_err)?;
        if entry.is_dir() || !entry.name().to_ascii_lowercase().ends_with(".fit") {
            continue;
        }
        let mut out = Vec::with_capacity(entry.size().min(MAX_ENTRY_BYTES) as usize);
        entry
            .take(MAX_ENTRY_BYTES)
            .read_to_end(&mut out)
            .map_err(|e| TelemetryError::Decode(format!("zip entry: {e}")))?;
        return Ok(Cow::Owned(out));
    }
    Err(TelemetryError::Decode("archive holds no .fit entry".into()))
}
