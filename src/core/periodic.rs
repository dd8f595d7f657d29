//! Static periodic table
//!
//! Atomic data is looked up by atom type. Radii are in Angstroms, masses
//! in atomic mass units; radii are optional because they are not known
//! for every element.

/// Static data about one element
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementData {
    /// Element symbol, e.g. "Fe"
    pub symbol: &'static str,
    /// Full element name, e.g. "Iron"
    pub name: &'static str,
    /// Atomic number
    pub number: u64,
    /// Atomic mass in atomic mass units
    pub mass: f64,
    /// Covalent radius in Angstroms
    pub covalent_radius: Option<f64>,
    /// Van der Waals radius in Angstroms
    pub vdw_radius: Option<f64>,
}

const fn el(
    symbol: &'static str,
    name: &'static str,
    number: u64,
    mass: f64,
    covalent_radius: Option<f64>,
    vdw_radius: Option<f64>,
) -> ElementData {
    ElementData { symbol, name, number, mass, covalent_radius, vdw_radius }
}

#[rustfmt::skip]
const PERIODIC_TABLE: &[ElementData] = &[
    el("H",  "Hydrogen",      1,  1.008,   Some(0.31), Some(1.20)),
    el("He", "Helium",        2,  4.003,   Some(0.28), Some(1.40)),
    el("Li", "Lithium",       3,  6.941,   Some(1.28), Some(1.82)),
    el("Be", "Beryllium",     4,  9.012,   Some(0.96), Some(1.53)),
    el("B",  "Boron",         5,  10.811,  Some(0.84), Some(1.92)),
    el("C",  "Carbon",        6,  12.011,  Some(0.76), Some(1.70)),
    el("N",  "Nitrogen",      7,  14.007,  Some(0.71), Some(1.55)),
    el("O",  "Oxygen",        8,  15.999,  Some(0.66), Some(1.52)),
    el("F",  "Fluorine",      9,  18.998,  Some(0.57), Some(1.47)),
    el("Ne", "Neon",          10, 20.180,  Some(0.58), Some(1.54)),
    el("Na", "Sodium",        11, 22.990,  Some(1.66), Some(2.27)),
    el("Mg", "Magnesium",     12, 24.305,  Some(1.41), Some(1.73)),
    el("Al", "Aluminium",     13, 26.982,  Some(1.21), Some(1.84)),
    el("Si", "Silicon",       14, 28.086,  Some(1.11), Some(2.10)),
    el("P",  "Phosphorus",    15, 30.974,  Some(1.07), Some(1.80)),
    el("S",  "Sulfur",        16, 32.065,  Some(1.05), Some(1.80)),
    el("Cl", "Chlorine",      17, 35.453,  Some(1.02), Some(1.75)),
    el("Ar", "Argon",         18, 39.948,  Some(1.06), Some(1.88)),
    el("K",  "Potassium",     19, 39.098,  Some(2.03), Some(2.75)),
    el("Ca", "Calcium",       20, 40.078,  Some(1.76), Some(2.31)),
    el("Sc", "Scandium",      21, 44.956,  Some(1.70), Some(2.15)),
    el("Ti", "Titanium",      22, 47.867,  Some(1.60), Some(2.11)),
    el("V",  "Vanadium",      23, 50.942,  Some(1.53), Some(2.07)),
    el("Cr", "Chromium",      24, 51.996,  Some(1.39), Some(2.06)),
    el("Mn", "Manganese",     25, 54.938,  Some(1.39), Some(2.05)),
    el("Fe", "Iron",          26, 55.845,  Some(1.32), Some(2.04)),
    el("Co", "Cobalt",        27, 58.933,  Some(1.26), Some(2.00)),
    el("Ni", "Nickel",        28, 58.693,  Some(1.24), Some(1.97)),
    el("Cu", "Copper",        29, 63.546,  Some(1.32), Some(1.96)),
    el("Zn", "Zinc",          30, 65.409,  Some(1.22), Some(2.01)),
    el("Ga", "Gallium",       31, 69.723,  Some(1.22), Some(1.87)),
    el("Ge", "Germanium",     32, 72.64,   Some(1.20), Some(2.11)),
    el("As", "Arsenic",       33, 74.922,  Some(1.19), Some(1.85)),
    el("Se", "Selenium",      34, 78.96,   Some(1.20), Some(1.90)),
    el("Br", "Bromine",       35, 79.904,  Some(1.20), Some(1.85)),
    el("Kr", "Krypton",       36, 83.798,  Some(1.16), Some(2.02)),
    el("Rb", "Rubidium",      37, 85.468,  Some(2.20), Some(3.03)),
    el("Sr", "Strontium",     38, 87.62,   Some(1.95), Some(2.49)),
    el("Y",  "Yttrium",       39, 88.906,  Some(1.90), Some(2.32)),
    el("Zr", "Zirconium",     40, 91.224,  Some(1.75), Some(2.23)),
    el("Nb", "Niobium",       41, 92.906,  Some(1.64), Some(2.18)),
    el("Mo", "Molybdenum",    42, 95.94,   Some(1.54), Some(2.17)),
    el("Tc", "Technetium",    43, 98.0,    Some(1.47), Some(2.16)),
    el("Ru", "Ruthenium",     44, 101.07,  Some(1.46), Some(2.13)),
    el("Rh", "Rhodium",       45, 102.91,  Some(1.42), Some(2.10)),
    el("Pd", "Palladium",     46, 106.42,  Some(1.39), Some(2.10)),
    el("Ag", "Silver",        47, 107.87,  Some(1.45), Some(2.11)),
    el("Cd", "Cadmium",       48, 112.41,  Some(1.44), Some(2.18)),
    el("In", "Indium",        49, 114.82,  Some(1.42), Some(2.20)),
    el("Sn", "Tin",           50, 118.71,  Some(1.39), Some(2.17)),
    el("Sb", "Antimony",      51, 121.76,  Some(1.39), Some(2.06)),
    el("Te", "Tellurium",     52, 127.60,  Some(1.38), Some(2.06)),
    el("I",  "Iodine",        53, 126.90,  Some(1.39), Some(1.98)),
    el("Xe", "Xenon",         54, 131.29,  Some(1.40), Some(2.16)),
    el("Cs", "Caesium",       55, 132.91,  Some(2.44), Some(3.43)),
    el("Ba", "Barium",        56, 137.33,  Some(2.15), Some(2.68)),
    el("La", "Lanthanum",     57, 138.91,  Some(2.07), None),
    el("Ce", "Cerium",        58, 140.12,  Some(2.04), None),
    el("Pr", "Praseodymium",  59, 140.91,  Some(2.03), None),
    el("Nd", "Neodymium",     60, 144.24,  Some(2.01), None),
    el("Pm", "Promethium",    61, 145.0,   Some(1.99), None),
    el("Sm", "Samarium",      62, 150.36,  Some(1.98), None),
    el("Eu", "Europium",      63, 151.96,  Some(1.98), None),
    el("Gd", "Gadolinium",    64, 157.25,  Some(1.96), None),
    el("Tb", "Terbium",       65, 158.93,  Some(1.94), None),
    el("Dy", "Dysprosium",    66, 162.50,  Some(1.92), None),
    el("Ho", "Holmium",       67, 164.93,  Some(1.92), None),
    el("Er", "Erbium",        68, 167.26,  Some(1.89), None),
    el("Tm", "Thulium",       69, 168.93,  Some(1.90), None),
    el("Yb", "Ytterbium",     70, 173.04,  Some(1.87), None),
    el("Lu", "Lutetium",      71, 174.97,  Some(1.87), None),
    el("Hf", "Hafnium",       72, 178.49,  Some(1.75), None),
    el("Ta", "Tantalum",      73, 180.95,  Some(1.70), None),
    el("W",  "Tungsten",      74, 183.84,  Some(1.62), None),
    el("Re", "Rhenium",       75, 186.21,  Some(1.51), None),
    el("Os", "Osmium",        76, 190.23,  Some(1.44), None),
    el("Ir", "Iridium",       77, 192.22,  Some(1.41), None),
    el("Pt", "Platinum",      78, 195.08,  Some(1.36), Some(1.75)),
    el("Au", "Gold",          79, 196.97,  Some(1.36), Some(1.66)),
    el("Hg", "Mercury",       80, 200.59,  Some(1.32), Some(1.55)),
    el("Tl", "Thallium",      81, 204.38,  Some(1.45), Some(1.96)),
    el("Pb", "Lead",          82, 207.2,   Some(1.46), Some(2.02)),
    el("Bi", "Bismuth",       83, 208.98,  Some(1.48), Some(2.07)),
    el("Po", "Polonium",      84, 209.0,   Some(1.40), None),
    el("At", "Astatine",      85, 210.0,   Some(1.50), None),
    el("Rn", "Radon",         86, 222.0,   Some(1.50), None),
    el("Fr", "Francium",      87, 223.0,   Some(2.60), None),
    el("Ra", "Radium",        88, 226.0,   Some(2.21), None),
    el("Ac", "Actinium",      89, 227.0,   Some(2.15), None),
    el("Th", "Thorium",       90, 232.04,  Some(2.06), None),
    el("Pa", "Protactinium",  91, 231.04,  Some(2.00), None),
    el("U",  "Uranium",       92, 238.03,  Some(1.96), Some(1.86)),
];

/// Look up the element data for an atom type
///
/// Inputs of at most two characters are case-normalised first ("FE" and
/// "fe" both resolve to iron); longer inputs must match exactly.
pub fn lookup(atom_type: &str) -> Option<&'static ElementData> {
    let found = PERIODIC_TABLE.iter().find(|e| e.symbol == atom_type);
    if found.is_some() || atom_type.len() > 2 {
        return found;
    }

    let mut normalized = String::with_capacity(2);
    let mut chars = atom_type.chars();
    normalized.extend(chars.next().map(|c| c.to_ascii_uppercase()));
    normalized.extend(chars.next().map(|c| c.to_ascii_lowercase()));
    PERIODIC_TABLE.iter().find(|e| e.symbol == normalized)
}
