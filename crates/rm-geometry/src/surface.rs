use std::collections::HashMap;

use rm_image::Image;

use crate::error::{GeometryError, Result};

const SQRT_2: f64 = std::f64::consts::SQRT_2;
const SQRT_3: f64 = 1.732_050_807_568_877_2;

/// Area contribution per local surface type.
///
/// Types classify the exposed faces of a voxel: flat faces count 1, a pair
/// of adjacent exposed faces approximates a 45° surface element (√2), three
/// mutually adjacent faces a corner element (√3), and configurations that
/// contain a fully exposed opposite pair are thin structures whose faces
/// count at full value.
const WEIGHTS: [f64; 10] = [
    0.0,           // 0: interior voxel
    1.0,           // 1: one face
    2.0,           // 2: two opposite faces (thin plate)
    SQRT_2,        // 3: two adjacent faces (45° edge)
    SQRT_3,        // 4: three faces around a corner
    3.0,           // 5: three faces containing an opposite pair (plate edge)
    4.0,           // 6: four faces, two opposite pairs (unit rod)
    2.0 + SQRT_2,  // 7: four faces, one pair plus a 45° edge
    5.0,           // 8: five faces (rod end)
    6.0,           // 9: all faces (isolated voxel)
];

/// Classify a 6-bit exposed-face mask into one of the 10 surface types.
///
/// Bits 0..2 are the +x, +y, +z neighbours and bits 3..5 the -x, -y, -z
/// neighbours, so bit `i` and bit `i+3` form an opposite pair.
const fn classify(exposed: u8) -> u8 {
    let count = exposed.count_ones() as u8;
    let mut pairs = 0u8;
    let mut i = 0;
    while i < 3 {
        if exposed & (1 << i) != 0 && exposed & (1 << (i + 3)) != 0 {
            pairs += 1;
        }
        i += 1;
    }
    match (count, pairs) {
        (0, _) => 0,
        (1, _) => 1,
        (2, 1) => 2,
        (2, 0) => 3,
        (3, 0) => 4,
        (3, _) => 5,
        (4, 2) => 6,
        (4, _) => 7,
        (5, _) => 8,
        _ => 9,
    }
}

/// The 64-entry classification table over exposed-face masks.
const fn build_class_table() -> [u8; 64] {
    let mut table = [0u8; 64];
    let mut mask = 0usize;
    while mask < 64 {
        table[mask] = classify(mask as u8);
        mask += 1;
    }
    table
}

const CLASS: [u8; 64] = build_class_table();

const NEIGHBOURS: [(i64, i64, i64); 6] = [
    (1, 0, 0),
    (0, 1, 0),
    (0, 0, 1),
    (-1, 0, 0),
    (0, -1, 0),
    (0, 0, -1),
];

/// Estimate the surface area of each requested object in a 3-D label image.
///
/// Every voxel contributes half the weight of its exposed-face
/// configuration; background voxels adjacent to a requested object
/// contribute the dual half, per distinct neighbouring label, so the two
/// sides of every surface are averaged. Neighbours beyond the image edge
/// are skipped (treated as same-label).
pub fn surface_area(label: &Image, object_ids: &[u32]) -> Result<Vec<f64>> {
    if label.dimensionality() != 3 {
        return Err(GeometryError::WrongDimensionality("surface area", 3));
    }
    if !label.is_scalar() || !label.data_type().is_unsigned_int() {
        return Err(GeometryError::Image(rm_image::ImageError::DTypeMismatch {
            expected: "scalar unsigned integer".to_string(),
            got: label.data_type().to_string(),
        }));
    }
    let index: HashMap<u32, usize> = object_ids
        .iter()
        .enumerate()
        .map(|(i, &id)| (id, i))
        .collect();
    let mut out = vec![0.0; object_ids.len()];
    let sizes = label.sizes().to_vec();
    let at = |x: i64, y: i64, z: i64| -> Option<u32> {
        label.label_at_signed(&[z, y, x])
    };
    for z in 0..sizes[0] as i64 {
        for y in 0..sizes[1] as i64 {
            for x in 0..sizes[2] as i64 {
                let l = at(x, y, z).expect("coords in range");
                if let Some(&row) = index.get(&l) {
                    // Object side: faces toward a different label.
                    let mut exposed = 0u8;
                    for (bit, &(dx, dy, dz)) in NEIGHBOURS.iter().enumerate() {
                        if let Some(n) = at(x + dx, y + dy, z + dz) {
                            if n != l {
                                exposed |= 1 << bit;
                            }
                        }
                    }
                    out[row] += 0.5 * WEIGHTS[CLASS[exposed as usize] as usize];
                } else {
                    // Background side: one dual contribution per distinct
                    // neighbouring requested label.
                    let mut neighbours: [(u32, u8); 6] = [(0, 0); 6];
                    let mut n_distinct = 0usize;
                    for (bit, &(dx, dy, dz)) in NEIGHBOURS.iter().enumerate() {
                        if let Some(n) = at(x + dx, y + dy, z + dz) {
                            if n != l && index.contains_key(&n) {
                                let mut found = false;
                                for entry in neighbours.iter_mut().take(n_distinct) {
                                    if entry.0 == n {
                                        entry.1 |= 1 << bit;
                                        found = true;
                                    }
                                }
                                if !found {
                                    neighbours[n_distinct] = (n, 1 << bit);
                                    n_distinct += 1;
                                }
                            }
                        }
                    }
                    for &(id, mask) in neighbours.iter().take(n_distinct) {
                        let row = index[&id];
                        out[row] += 0.5 * WEIGHTS[CLASS[mask as usize] as usize];
                    }
                }
            }
        }
    }
    Ok(out)
}
