//! Physical length conversion.

/// Millimeters to PDF points. Kept bit-exact: it fixes the physical page size.
pub const MM_TO_PT: f64 = 2.83465;

pub fn mm_to_pt(mm: f64) -> f64 {
    mm * MM_TO_PT
}
