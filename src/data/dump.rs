//! Raw binary array dumps for offline (C/C++) solvers.
//!
//! Each array goes to `<dir>/<name>.bin`: its shape as native-endian `i32`s
//! followed by the row-major `f64` payload. The file carries no rank, so
//! readers must know it.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use ndarray::{ArrayD, ArrayViewD, IxDyn};
use tracing::debug;

use crate::error::{Error, Result};

/// Write one array to `<dir>/<name>.bin`, returning the file path.
pub fn save_array(dir: &Path, name: &str, array: ArrayViewD<'_, f64>) -> Result<PathBuf> {
    let path = dir.join(format!("{name}.bin"));
    let shape = array
        .shape()
        .iter()
        .map(|&n| {
            i32::try_from(n)
                .map_err(|_| Error::Parse(format!("{name}: dimension {n} overflows i32")))
        })
        .collect::<Result<Vec<i32>>>()?;
    let payload = array.as_standard_layout();
    let payload = payload
        .as_slice()
        .ok_or_else(|| Error::Parse(format!("{name}: array is not contiguous")))?;

    let mut out = BufWriter::new(File::create(&path)?);
    out.write_all(bytemuck::cast_slice(shape.as_slice()))?;
    out.write_all(bytemuck::cast_slice(payload))?;
    out.flush()?;

    debug!(path = %path.display(), shape = ?array.shape(), "saved binary array");
    Ok(path)
}

/// Write every named array into `dir`, creating it if needed.
pub fn save_arrays<'a, I>(dir: &Path, arrays: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator<Item = (&'a str, ArrayViewD<'a, f64>)>,
{
    fs::create_dir_all(dir)?;
    arrays
        .into_iter()
        .map(|(name, array)| save_array(dir, name, array))
        .collect()
}

/// Read back an array of known rank written by [`save_array`].
pub fn load_array(path: &Path, rank: usize) -> Result<ArrayD<f64>> {
    let mut bytes = Vec::new();
    File::open(path)?.read_to_end(&mut bytes)?;

    let header = rank * std::mem::size_of::<i32>();
    if bytes.len() < header {
        return Err(Error::Parse(format!("{}: truncated header", path.display())));
    }
    let shape: Vec<usize> = bytes[..header]
        .chunks_exact(4)
        .map(|c| i32::from_ne_bytes([c[0], c[1], c[2], c[3]]) as usize)
        .collect();
    let payload: Vec<f64> = bytes[header..]
        .chunks_exact(8)
        .map(bytemuck::pod_read_unaligned::<f64>)
        .collect();

    ArrayD::from_shape_vec(IxDyn(&shape), payload)
        .map_err(|e| Error::Parse(format!("{}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_layout_is_shape_then_payload() {
        let dir = tempfile::tempdir().unwrap();
        let a = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let path = save_array(dir.path(), "rr", a.view().into_dyn()).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 2 * 4 + 6 * 8);
        assert_eq!(&bytes[0..4], &2i32.to_ne_bytes());
        assert_eq!(&bytes[4..8], &3i32.to_ne_bytes());
        assert_eq!(&bytes[8..16], &1.0f64.to_ne_bytes());
        assert_eq!(&bytes[48..56], &6.0f64.to_ne_bytes());
    }

    #[test]
    fn test_transposed_views_are_written_row_major() {
        let dir = tempfile::tempdir().unwrap();
        let a = array![[1.0, 2.0], [3.0, 4.0]];
        let path = save_array(dir.path(), "t", a.t().into_dyn()).unwrap();

        let back = load_array(&path, 2).unwrap();
        assert_eq!(back, array![[1.0, 3.0], [2.0, 4.0]].into_dyn());
    }

    #[test]
    fn test_save_arrays_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested");
        let gr = array![0.1, 0.2];
        let paths = save_arrays(&out, [("gr", gr.view().into_dyn())]).unwrap();

        assert_eq!(paths, vec![out.join("gr.bin")]);
        assert_eq!(load_array(&paths[0], 1).unwrap(), gr.into_dyn());
    }
}
