// src/image_io.rs - Loading shoe masks from contacts files and PNG directories

use std::fs;
use std::path::{Path, PathBuf};
use image::ImageFormat;

use crate::errors::{Result, ShoeContourError};
use crate::image_utils::{gray_to_mask, mask_to_gray};
use crate::mask::Mask;

/// Load one mask per non-empty line of a contacts text file.
///
/// Each line holds `height * width` characters `0`/`1` in row-major order.
/// Shoes listed in `mirrored` are flipped left-right.
pub fn load_contacts_file<P: AsRef<Path>>(
    path: P,
    height: usize,
    width: usize,
    mirrored: &[usize],
) -> Result<Vec<Mask>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;

    let mut masks = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        let mask = parse_contacts_line(line, height, width).map_err(|e| {
            ShoeContourError::InvalidMaskData(format!(
                "{}:{}: {}",
                path.display(),
                line_no + 1,
                e
            ))
        })?;
        let shoe = masks.len();
        masks.push(if mirrored.contains(&shoe) {
            mask.flip_horizontal()
        } else {
            mask
        });
    }

    Ok(masks)
}

/// Parse a single contacts line into a mask
pub fn parse_contacts_line(line: &str, height: usize, width: usize) -> std::result::Result<Mask, String> {
    let data = line
        .chars()
        .map(|c| match c {
            '0' => Ok(false),
            '1' => Ok(true),
            other => Err(format!("unexpected character {:?}", other)),
        })
        .collect::<std::result::Result<Vec<bool>, String>>()?;

    let len = data.len();
    Mask::from_vec(height, width, data)
        .ok_or_else(|| format!("expected {} pixels, found {}", height * width, len))
}

/// Get all PNG files of a directory, ordered by the number in their stem
pub fn get_png_files_in_dir<P: AsRef<Path>>(dir_path: P) -> Result<Vec<PathBuf>> {
    let dir_path = dir_path.as_ref();

    if !dir_path.is_dir() {
        return Err(ShoeContourError::InvalidPath(dir_path.to_path_buf()));
    }

    let mut png_files = Vec::new();
    for entry in fs::read_dir(dir_path)? {
        let path = entry?.path();
        if path.is_file()
            && path
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("png"))
                .unwrap_or(false)
        {
            png_files.push(path);
        }
    }

    png_files.sort_by_key(|p| (shoe_number(p), p.clone()));
    Ok(png_files)
}

/// Trailing number of a file stem, e.g. `im_12` -> 12
fn shoe_number(path: &Path) -> Option<usize> {
    let stem = path.file_stem()?.to_str()?;
    let digits: String = stem
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    digits.parse().ok()
}

/// Load a PNG as a mask; any non-zero luma is foreground
pub fn load_mask<P: AsRef<Path>>(path: P) -> Result<Mask> {
    let image = image::open(path.as_ref())?;
    Ok(gray_to_mask(&image.to_luma8()))
}

/// Load masks from a contacts file or a directory of PNGs
pub fn load_masks<P: AsRef<Path>>(
    input: P,
    height: usize,
    width: usize,
    mirrored: &[usize],
) -> Result<Vec<Mask>> {
    let input = input.as_ref();
    if input.is_file() {
        load_contacts_file(input, height, width, mirrored)
    } else if input.is_dir() {
        get_png_files_in_dir(input)?
            .iter()
            .enumerate()
            .map(|(shoe, path)| -> Result<Mask> {
                let mask = load_mask(path)?;
                Ok(if mirrored.contains(&shoe) {
                    mask.flip_horizontal()
                } else {
                    mask
                })
            })
            .collect()
    } else {
        Err(ShoeContourError::InvalidPath(input.to_path_buf()))
    }
}

/// Save a mask as a 0/255 grayscale PNG
pub fn save_mask<P: AsRef<Path>>(mask: &Mask, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    mask_to_gray(mask).save_with_format(path, ImageFormat::Png)?;
    Ok(())
}
