use phf::{Map, phf_map};

/// `(atomic number, atomic mass, van der Waals radius in Angstroms)` keyed by
/// the upper-case element symbol. Covers the elements that occur in
/// macromolecular structures; anything else falls back to
/// [`UNKNOWN_ELEMENT`].
static ELEMENT_DATA: Map<&'static str, (u8, f64, f64)> = phf_map! {
    "H" => (1, 1.008, 1.10),
    "D" => (1, 2.014, 1.10),
    "C" => (6, 12.011, 1.70),
    "N" => (7, 14.007, 1.55),
    "O" => (8, 15.999, 1.52),
    "F" => (9, 18.998, 1.47),
    "NA" => (11, 22.990, 2.27),
    "MG" => (12, 24.305, 1.73),
    "P" => (15, 30.974, 1.80),
    "S" => (16, 32.06, 1.80),
    "CL" => (17, 35.45, 1.75),
    "K" => (19, 39.098, 2.75),
    "CA" => (20, 40.078, 2.31),
    "MN" => (25, 54.938, 2.05),
    "FE" => (26, 55.845, 2.04),
    "CO" => (27, 58.933, 2.00),
    "NI" => (28, 58.693, 1.63),
    "CU" => (29, 63.546, 1.40),
    "ZN" => (30, 65.38, 1.39),
    "SE" => (34, 78.971, 1.90),
    "BR" => (35, 79.904, 1.85),
    "I" => (53, 126.904, 1.98),
};

pub const UNKNOWN_ELEMENT: (u8, f64, f64) = (0, 0.0, 2.0);

fn lookup(symbol: &str) -> (u8, f64, f64) {
    let key = symbol.trim().to_ascii_uppercase();
    ELEMENT_DATA
        .get(key.as_str())
        .copied()
        .unwrap_or(UNKNOWN_ELEMENT)
}

pub fn atomic_number(symbol: &str) -> u8 {
    lookup(symbol).0
}

pub fn atomic_mass(symbol: &str) -> f64 {
    lookup(symbol).1
}

pub fn vdw_radius(symbol: &str) -> f64 {
    lookup(symbol).2
}
