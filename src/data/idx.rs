use std::fs::File;
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;

use crate::error::{Error, Result};

/// One split of an IDX image/label pair, still as raw bytes.
#[derive(Debug, Clone)]
pub struct IdxSplit {
    pub rows: usize,
    pub cols: usize,
    /// `len * rows * cols` row-major pixels.
    pub pixels: Vec<u8>,
    pub labels: Vec<u8>,
}

impl IdxSplit {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn image(&self, i: usize) -> &[u8] {
        let n = self.rows * self.cols;
        &self.pixels[i * n..(i + 1) * n]
    }
}

/// Reads a whole IDX file into memory, gunzipping it when the name ends in `.gz`.
pub fn read_idx_file(path: &Path) -> Result<Vec<u8>> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut bytes = Vec::new();
    let read = if path.extension().is_some_and(|ext| ext == "gz") {
        GzDecoder::new(file).read_to_end(&mut bytes)
    } else {
        let mut file = file;
        file.read_to_end(&mut bytes)
    };
    read.map_err(|e| Error::io(path, e))?;
    Ok(bytes)
}

fn be_u32(bytes: &[u8], offset: usize) -> usize {
    u32::from_be_bytes([
        bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3],
    ]) as usize
}

/// Validates the fixed 4-byte IDX magic: two reserved zero bytes, dtype
/// `0x08` (uint8) and the expected number of dimensions.
fn check_magic(bytes: &[u8], dims: u8, what: &str) -> Result<()> {
    if bytes[0] != 0x00 || bytes[1] != 0x00 {
        return Err(Error::Dataset(format!(
            "IDX {} file: bytes 0-1 must be 0x00 0x00 (reserved), got 0x{:02X} 0x{:02X}.",
            what, bytes[0], bytes[1]
        )));
    }
    if bytes[2] != 0x08 {
        return Err(Error::Dataset(format!(
            "IDX {} file: byte 2 (dtype) must be 0x08 (uint8), got 0x{:02X}.",
            what, bytes[2]
        )));
    }
    if bytes[3] != dims {
        return Err(Error::Dataset(format!(
            "IDX {} file: byte 3 (dimensions) must be {}, got {}.",
            what, dims, bytes[3]
        )));
    }
    Ok(())
}

/// Parse a pair of IDX binary files (image + label) as used by MNIST.
///
/// # IDX3 image file layout
/// ```text
/// bytes  0-1:   0x00 0x00   (reserved, must be zero)
/// byte   2:     0x08        (dtype = uint8)
/// byte   3:     0x03        (number of dimensions = 3)
/// bytes  4-7:   N           (number of images, big-endian u32)
/// bytes  8-11:  rows        (image height in pixels, big-endian u32)
/// bytes 12-15:  cols        (image width in pixels, big-endian u32)
/// bytes 16..:   N * rows * cols bytes, row-major, uint8
/// ```
///
/// # IDX1 label file layout
/// ```text
/// bytes  0-1:   0x00 0x00   (reserved, must be zero)
/// byte   2:     0x08        (dtype = uint8)
/// byte   3:     0x01        (number of dimensions = 1)
/// bytes  4-7:   N           (number of labels, big-endian u32)
/// bytes  8..:   N bytes, each a class index in [0, n_classes)
/// ```
pub fn parse_idx_pair(image_bytes: &[u8], label_bytes: &[u8], n_classes: usize) -> Result<IdxSplit> {
    // ── Image file validation ───────────────────────────────────────────────

    if image_bytes.len() < 16 {
        return Err(Error::Dataset(format!(
            "IDX image file too short: expected at least 16 header bytes, got {}.",
            image_bytes.len()
        )));
    }
    check_magic(image_bytes, 0x03, "image")?;

    let n_items = be_u32(image_bytes, 4);
    let rows = be_u32(image_bytes, 8);
    let cols = be_u32(image_bytes, 12);

    let n_pixels = rows.checked_mul(cols).ok_or_else(|| {
        Error::Dataset(format!("IDX image file: rows * cols overflows usize (rows={}, cols={}).", rows, cols))
    })?;
    let data_len = n_items.checked_mul(n_pixels).ok_or_else(|| {
        Error::Dataset(format!(
            "IDX image file: n_items * n_pixels overflows usize (n_items={}, n_pixels={}).",
            n_items, n_pixels
        ))
    })?;

    if image_bytes.len() - 16 < data_len {
        return Err(Error::Dataset(format!(
            "IDX image file too short: header declares {} items of {}×{} pixels \
             ({} data bytes needed after header), but file is only {} bytes total.",
            n_items, rows, cols, data_len, image_bytes.len()
        )));
    }

    // ── Label file validation ───────────────────────────────────────────────

    if label_bytes.len() < 8 {
        return Err(Error::Dataset(format!(
            "IDX label file too short: expected at least 8 header bytes, got {}.",
            label_bytes.len()
        )));
    }
    check_magic(label_bytes, 0x01, "label")?;

    let label_count = be_u32(label_bytes, 4);
    if label_count != n_items {
        return Err(Error::Dataset(format!(
            "IDX file mismatch: image file declares {} items but label file declares {}.",
            n_items, label_count
        )));
    }
    if label_bytes.len() - 8 < n_items {
        return Err(Error::Dataset(format!(
            "IDX label file too short: header declares {} labels but file is only {} bytes.",
            n_items, label_bytes.len()
        )));
    }

    let labels = label_bytes[8..8 + n_items].to_vec();
    if let Some((i, &class)) = labels.iter().enumerate().find(|(_, &c)| c as usize >= n_classes) {
        return Err(Error::Dataset(format!(
            "IDX label at index {}: class index {} is out of range for n_classes={}.",
            i, class, n_classes
        )));
    }

    Ok(IdxSplit {
        rows,
        cols,
        pixels: image_bytes[16..16 + data_len].to_vec(),
        labels,
    })
}

/// Encodes images and labels back into IDX3/IDX1 byte buffers.
///
/// Only used to fabricate fixture files.
#[cfg(test)]
pub(crate) fn encode_idx_pair(rows: usize, cols: usize, pixels: &[u8], labels: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let mut images = vec![0x00, 0x00, 0x08, 0x03];
    for v in [labels.len(), rows, cols] {
        images.extend_from_slice(&(v as u32).to_be_bytes());
    }
    images.extend_from_slice(pixels);

    let mut lbls = vec![0x00, 0x00, 0x08, 0x01];
    lbls.extend_from_slice(&(labels.len() as u32).to_be_bytes());
    lbls.extend_from_slice(labels);
    (images, lbls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use flate2::{write::GzEncoder, Compression};

    fn fixture() -> (Vec<u8>, Vec<u8>) {
        encode_idx_pair(2, 2, &[0, 64, 128, 255, 10, 20, 30, 40], &[3, 7])
    }

    #[test]
    fn parses_a_well_formed_pair() {
        let (images, labels) = fixture();
        let split = parse_idx_pair(&images, &labels, 10).unwrap();
        assert_eq!((split.rows, split.cols, split.len()), (2, 2, 2));
        assert_eq!(split.image(1), &[10, 20, 30, 40]);
        assert_eq!(split.labels, vec![3, 7]);
    }

    #[test]
    fn rejects_wrong_dimension_byte() {
        let (mut images, labels) = fixture();
        images[3] = 0x02;
        let err = parse_idx_pair(&images, &labels, 10).unwrap_err();
        assert!(err.to_string().contains("dimensions"));
    }

    #[test]
    fn rejects_truncated_pixels_and_count_mismatch() {
        let (images, labels) = fixture();
        assert!(matches!(parse_idx_pair(&images[..20], &labels, 10), Err(Error::Dataset(_))));

        let (_, short_labels) = encode_idx_pair(2, 2, &[], &[1]);
        assert!(matches!(parse_idx_pair(&images, &short_labels, 10), Err(Error::Dataset(_))));
    }

    #[test]
    fn rejects_out_of_range_labels() {
        let (images, labels) = fixture();
        let err = parse_idx_pair(&images, &labels, 5).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn reads_plain_and_gzipped_files() {
        let dir = tempfile::tempdir().unwrap();
        let (images, _) = fixture();

        let plain = dir.path().join("imgs-idx3-ubyte");
        std::fs::write(&plain, &images).unwrap();

        let gz = dir.path().join("imgs-idx3-ubyte.gz");
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(&images).unwrap();
        std::fs::write(&gz, enc.finish().unwrap()).unwrap();

        assert_eq!(read_idx_file(&plain).unwrap(), images);
        assert_eq!(read_idx_file(&gz).unwrap(), images);
    }

    #[test]
    fn missing_file_reports_its_path() {
        let err = read_idx_file(Path::new("/nonexistent/train-images-idx3-ubyte")).unwrap_err();
        assert!(err.to_string().contains("train-images-idx3-ubyte"));
    }
}
