//! Binary netpbm images: 16-bit PGM for depth, 8-bit PPM for color.
//!
//! Depth samples are millimeters, big-endian, with `65535` meaning no
//! return (the same sentinel as [`crate::core::NO_DEPTH`]).

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::core::{ColorImage, DepthImage, Rgb};
use crate::error::{Error, Result};

struct Header {
    width: usize,
    height: usize,
    max_value: u32,
    data_offset: usize,
}

/// Parse `magic width height maxval` followed by one whitespace byte.
fn parse_header(bytes: &[u8], magic: &[u8; 2]) -> Result<Header> {
    if bytes.len() < 2 || &bytes[..2] != magic {
        return Err(Error::InvalidImage(format!(
            "expected {} header",
            String::from_utf8_lossy(magic)
        )));
    }
    let mut pos = 2;
    let mut fields = [0u32; 3];
    for field in &mut fields {
        // Whitespace and comments
        loop {
            match bytes.get(pos) {
                Some(b) if b.is_ascii_whitespace() => pos += 1,
                Some(b'#') => {
                    while bytes.get(pos).is_some_and(|&b| b != b'\n') {
                        pos += 1;
                    }
                }
                _ => break,
            }
        }
        let start = pos;
        while bytes.get(pos).is_some_and(u8::is_ascii_digit) {
            pos += 1;
        }
        *field = std::str::from_utf8(&bytes[start..pos])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| Error::InvalidImage("malformed header".to_string()))?;
    }
    if !bytes.get(pos).is_some_and(u8::is_ascii_whitespace) {
        return Err(Error::InvalidImage("malformed header".to_string()));
    }
    Ok(Header {
        width: fields[0] as usize,
        height: fields[1] as usize,
        max_value: fields[2],
        data_offset: pos + 1,
    })
}

fn raster<'a>(bytes: &'a [u8], header: &Header, sample_bytes: usize) -> Result<&'a [u8]> {
    let len = header.width * header.height * sample_bytes;
    bytes
        .get(header.data_offset..header.data_offset + len)
        .ok_or_else(|| Error::InvalidImage(format!("raster truncated, expected {len} bytes")))
}

/// Read a 16-bit binary PGM depth image.
pub fn read_depth_pgm(path: &Path) -> Result<DepthImage> {
    let bytes = fs::read(path)?;
    let header = parse_header(&bytes, b"P5")?;
    if header.max_value <= 255 {
        return Err(Error::InvalidImage(format!(
            "{}: depth images must be 16-bit",
            path.display()
        )));
    }
    let data = raster(&bytes, &header, 2)?
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect();
    DepthImage::from_raw(header.width, header.height, data)
        .ok_or_else(|| Error::InvalidImage(format!("{}: bad dimensions", path.display())))
}

/// Write a depth image as 16-bit binary PGM.
pub fn write_depth_pgm(path: &Path, image: &DepthImage) -> Result<()> {
    let mut out = BufWriter::new(fs::File::create(path)?);
    write!(out, "P5\n{} {}\n65535\n", image.width(), image.height())?;
    for &d in image.data() {
        out.write_all(&d.to_be_bytes())?;
    }
    out.flush()?;
    Ok(())
}

/// Read an 8-bit binary PPM color image.
pub fn read_color_ppm(path: &Path) -> Result<ColorImage> {
    let bytes = fs::read(path)?;
    let header = parse_header(&bytes, b"P6")?;
    if header.max_value != 255 {
        return Err(Error::InvalidImage(format!(
            "{}: color images must be 8-bit",
            path.display()
        )));
    }
    let data: Vec<Rgb> = raster(&bytes, &header, 3)?
        .chunks_exact(3)
        .map(|c| [c[0], c[1], c[2]])
        .collect();
    ColorImage::from_raw(header.width, header.height, data)
        .ok_or_else(|| Error::InvalidImage(format!("{}: bad dimensions", path.display())))
}

/// Write a color image as 8-bit binary PPM.
pub fn write_color_ppm(path: &Path, image: &ColorImage) -> Result<()> {
    let mut out = BufWriter::new(fs::File::create(path)?);
    write!(out, "P6\n{} {}\n255\n", image.width(), image.height())?;
    for rgb in image.data() {
        out.write_all(rgb)?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::NO_DEPTH;
    use tempfile::tempdir;

    #[test]
    fn test_depth_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("depth.pgm");
        let image = DepthImage::from_raw(3, 2, vec![1, 800, NO_DEPTH, 1200, 0x0102, 9]).unwrap();
        write_depth_pgm(&path, &image).unwrap();
        assert_eq!(read_depth_pgm(&path).unwrap(), image);
    }

    #[test]
    fn test_header_comments() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("color.ppm");
        let mut bytes = b"P6\n# written by hand\n2 1\n255\n".to_vec();
        bytes.extend_from_slice(&[1, 2, 3, 4, 5, 6]);
        fs::write(&path, bytes).unwrap();
        let image = read_color_ppm(&path).unwrap();
        assert_eq!(image.get(1), [4, 5, 6]);
    }

    #[test]
    fn test_rejects_truncated_and_8bit_depth() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.pgm");
        fs::write(&path, b"P5\n2 2\n65535\n\x00\x01").unwrap();
        assert!(matches!(read_depth_pgm(&path), Err(Error::InvalidImage(_))));
        fs::write(&path, b"P5\n1 1\n255\n\x07").unwrap();
        assert!(matches!(read_depth_pgm(&path), Err(Error::InvalidImage(_))));
        fs::write(&path, b"P6\n1 1\n255\n\x07\x07\x07").unwrap();
        assert!(matches!(read_depth_pgm(&path), Err(Error::InvalidImage(_))));
    }
}
