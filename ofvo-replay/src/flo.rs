//! Middlebury `.flo` motion field files.
//!
//! Layout: the `PIEH` tag, width and height as little-endian `i32`, then interleaved `u, v`
//! little-endian `f32` values in row-major order.

use anyhow::{anyhow, Result};
use ofvo::prelude::v1::MotionField;
#[cfg(test)]
use std::io::Read;
use std::io::Write;
use std::path::Path;

pub const TAG: &[u8; 4] = b"PIEH";

pub fn write(mut writer: impl Write, field: &MotionField) -> Result<()> {
    let (width, height) = field.dim();

    writer.write_all(TAG)?;
    writer.write_all(&i32::try_from(width)?.to_le_bytes())?;
    writer.write_all(&i32::try_from(height)?.to_le_bytes())?;

    if cfg!(target_endian = "little") {
        writer.write_all(bytemuck::cast_slice(field.as_slice()))?;
    } else {
        for v in field.as_slice() {
            writer.write_all(&v.to_le_bytes())?;
        }
    }

    Ok(())
}

#[cfg(test)]
pub fn read(mut reader: impl Read) -> Result<MotionField> {
    let mut header = [0u8; 12];
    reader.read_exact(&mut header)?;

    if &header[..4] != TAG {
        return Err(anyhow!("not a .flo file"));
    }

    let dim = |b: &[u8]| -> Result<usize> {
        let v = i32::from_le_bytes([b[0], b[1], b[2], b[3]]);
        Ok(usize::try_from(v)?)
    };

    let width = dim(&header[4..8])?;
    let height = dim(&header[8..12])?;

    let len = width
        .checked_mul(height)
        .and_then(|v| v.checked_mul(8))
        .ok_or_else(|| anyhow!("{width}x{height} field is too large"))?;

    // Grows with the data actually present, not with the declared size.
    let mut data = vec![];
    reader.take(len as u64).read_to_end(&mut data)?;

    if data.len() != len {
        return Err(anyhow!("truncated .flo file: {} of {len} bytes", data.len()));
    }

    let flow = data
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect::<Vec<_>>();

    Ok(MotionField::from_interleaved(width, height, &flow)?)
}

pub fn save(path: impl AsRef<Path>, field: &MotionField) -> Result<()> {
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    write(&mut writer, field)?;
    writer.flush()?;
    Ok(())
}
