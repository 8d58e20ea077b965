use std::collections::HashMap;

use rm_image::Image;

use crate::chain::{ChainCode, Code, Connectivity};
use crate::error::{GeometryError, Result};

fn check_label_image(label: &Image) -> Result<()> {
    if label.dimensionality() != 2 {
        return Err(GeometryError::WrongDimensionality("chain code extraction", 2));
    }
    if !label.is_scalar() || !label.data_type().is_unsigned_int() {
        return Err(GeometryError::Image(rm_image::ImageError::DTypeMismatch {
            expected: "scalar unsigned integer".to_string(),
            got: label.data_type().to_string(),
        }));
    }
    Ok(())
}

/// Walk the boundary of the object under `start` with the left-wall rule.
///
/// `start` must be the first pixel of its boundary in raster order (nothing
/// of the same object above it, nor to its left on the same row), which is
/// what the raster search naturally yields.
fn trace(label: &Image, start: (i64, i64), id: u32, connectivity: Connectivity) -> ChainCode {
    let (n_dirs, turn) = match connectivity {
        Connectivity::Four => (4u8, 1u8),
        Connectivity::Eight => (8u8, 2u8),
    };
    let width = label.sizes()[1] as i64;
    let height = label.sizes()[0] as i64;
    let delta = |d: u8| match connectivity {
        Connectivity::Four => crate::chain::DELTAS4[d as usize],
        Connectivity::Eight => crate::chain::DELTAS8[d as usize],
    };
    let probe = |x: i64, y: i64, d: u8| {
        let (dx, dy) = delta(d);
        label.label_at_signed(&[y + dy, x + dx]) == Some(id)
    };
    let is_border = |x: i64, y: i64| x == 0 || y == 0 || x == width - 1 || y == height - 1;

    let mut codes = Vec::new();
    let mut dir = 0u8;
    let mut tries = 0;
    while tries < n_dirs && !probe(start.0, start.1, dir) {
        dir = (dir + n_dirs - 1) % n_dirs;
        tries += 1;
    }
    if tries == n_dirs {
        // Isolated pixel.
        return ChainCode {
            start,
            codes,
            connectivity,
            object_id: id,
        };
    }
    let first_dir = dir;
    let (mut x, mut y) = start;
    loop {
        let (dx, dy) = delta(dir);
        x += dx;
        y += dy;
        codes.push(Code::new(dir, is_border(x, y)));
        dir = (dir + turn) % n_dirs;
        while !probe(x, y, dir) {
            dir = (dir + n_dirs - 1) % n_dirs;
        }
        if (x, y) == start && dir == first_dir {
            break;
        }
    }
    ChainCode {
        start,
        codes,
        connectivity,
        object_id: id,
    }
}

/// Extract one chain code per requested object, in request order.
///
/// An object id with no pixel in the image yields `None`. The boundary
/// traced is that of the first (raster-order) connected component carrying
/// the label.
pub fn get_image_chain_codes(
    label: &Image,
    object_ids: &[u32],
    connectivity: Connectivity,
) -> Result<Vec<Option<ChainCode>>> {
    check_label_image(label)?;
    let mut wanted: HashMap<u32, Option<(i64, i64)>> = object_ids
        .iter()
        .filter(|&&id| id != 0)
        .map(|&id| (id, None))
        .collect();
    let height = label.sizes()[0];
    let width = label.sizes()[1];
    let mut remaining = wanted.len();
    'scan: for yy in 0..height {
        for xx in 0..width {
            let id = label.label_at(&[yy, xx]).expect("coords in range");
            if let Some(entry) = wanted.get_mut(&id) {
                if entry.is_none() {
                    *entry = Some((xx as i64, yy as i64));
                    remaining -= 1;
                    if remaining == 0 {
                        break 'scan;
                    }
                }
            }
        }
    }
    Ok(object_ids
        .iter()
        .map(|&id| {
            wanted
                .get(&id)
                .copied()
                .flatten()
                .map(|start| trace(label, start, id, connectivity))
        })
        .collect())
}

/// Extract the chain code of the object under `start_coord` (x, y).
///
/// `start_coord` must be the object's first boundary pixel in raster order.
pub fn get_single_chain_code(
    label: &Image,
    start_coord: (i64, i64),
    connectivity: Connectivity,
) -> Result<ChainCode> {
    check_label_image(label)?;
    let id = label
        .label_at_signed(&[start_coord.1, start_coord.0])
        .ok_or_else(|| {
            GeometryError::Image(rm_image::ImageError::CoordsOutOfBounds {
                coords: vec![start_coord.1 as usize, start_coord.0 as usize],
                sizes: label.sizes().to_vec(),
            })
        })?;
    if id == 0 {
        return Err(GeometryError::MalformedChainCode(
            "start coordinate lies on background".to_string(),
        ));
    }
    Ok(trace(label, start_coord, id, connectivity))
}
