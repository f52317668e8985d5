use faer::{Mat, MatRef};
use num_traits::Float;
use rayon::prelude::*;

use super::{add3, row3, scale3, sub3, unit3};

/// Amide N-H bond length in Angstrom
const AMIDE_H_BOND: f64 = 1.01;

/// Carbonyl C=O bond length in Angstrom
const CARBONYL_O_BOND: f64 = 1.24;

////////////////////
// Implicit atoms //
////////////////////

/// Reconstruct amide hydrogen positions from backbone coordinates
///
/// For every backbone nitrogen that is preceded by a carbonyl carbon, the
/// hydrogen is placed on the bisector of the `C -> N` and `CA -> N`
/// directions at the amide bond length, which puts it trans to the carbonyl
/// oxygen. The nitrogen of the first residue has no preceding carbon and is
/// skipped.
///
/// ### Params
///
/// * `coords` - Backbone coordinates of shape (n_atoms, 3)
/// * `atom_names` - Backbone atom names, e.g. `["N", "CA", "C", "N", ...]`
///
/// ### Returns
///
/// Tuple of the hydrogen coordinates (one row per placed atom) and the
/// indices of the nitrogens they attach to.
pub fn guess_amide_h<T>(coords: MatRef<T>, atom_names: &[&str]) -> (Mat<T>, Vec<usize>)
where
    T: Float,
{
    crate::assert_same_len!(atom_names, (0..coords.nrows()));
    let bond = T::from(AMIDE_H_BOND).unwrap();

    let mut positions = Vec::new();
    let mut attached = Vec::new();

    for i in 0..atom_names.len() {
        if atom_names[i] != "N" || i == 0 || atom_names[i - 1] != "C" {
            continue;
        }
        if i + 1 >= atom_names.len() || atom_names[i + 1] != "CA" {
            continue;
        }
        let ca = i + 1;

        let n = row3(coords, i);
        let to_c = unit3(sub3(n, row3(coords, i - 1)));
        let to_ca = unit3(sub3(n, row3(coords, ca)));
        let direction = unit3(add3(to_c, to_ca));

        positions.push(add3(n, scale3(direction, bond)));
        attached.push(i);
    }

    (rows_to_mat(&positions), attached)
}

/// Reconstruct carbonyl oxygen positions from backbone coordinates
///
/// For every carbonyl carbon that is followed by the next residue's
/// nitrogen, the oxygen is placed on the bisector of the `CA -> C` and
/// `N -> C` directions at the carbonyl bond length. The C-terminal carbon
/// has no following nitrogen and is skipped.
///
/// ### Params
///
/// * `coords` - Backbone coordinates of shape (n_atoms, 3)
/// * `atom_names` - Backbone atom names, e.g. `["N", "CA", "C", "N", ...]`
///
/// ### Returns
///
/// Tuple of the oxygen coordinates (one row per placed atom) and the
/// indices of the carbons they attach to.
pub fn guess_amide_o<T>(coords: MatRef<T>, atom_names: &[&str]) -> (Mat<T>, Vec<usize>)
where
    T: Float,
{
    crate::assert_same_len!(atom_names, (0..coords.nrows()));
    let bond = T::from(CARBONYL_O_BOND).unwrap();

    let mut positions = Vec::new();
    let mut attached = Vec::new();

    for i in 0..atom_names.len() {
        if atom_names[i] != "C" || i + 1 >= atom_names.len() || atom_names[i + 1] != "N" {
            continue;
        }
        if i == 0 || atom_names[i - 1] != "CA" {
            continue;
        }
        let ca = i - 1;

        let c = row3(coords, i);
        let to_ca = unit3(sub3(c, row3(coords, ca)));
        let to_n = unit3(sub3(c, row3(coords, i + 1)));
        let direction = unit3(add3(to_ca, to_n));

        positions.push(add3(c, scale3(direction, bond)));
        attached.push(i);
    }

    (rows_to_mat(&positions), attached)
}

/// Amide hydrogens for a batch of conformations
pub fn batch_guess_amide_h<T>(batch: &[Mat<T>], atom_names: &[&str]) -> Vec<(Mat<T>, Vec<usize>)>
where
    T: Float + Send + Sync,
{
    batch
        .par_iter()
        .map(|m| guess_amide_h(m.as_ref(), atom_names))
        .collect()
}

/// Carbonyl oxygens for a batch of conformations
pub fn batch_guess_amide_o<T>(batch: &[Mat<T>], atom_names: &[&str]) -> Vec<(Mat<T>, Vec<usize>)>
where
    T: Float + Send + Sync,
{
    batch
        .par_iter()
        .map(|m| guess_amide_o(m.as_ref(), atom_names))
        .collect()
}

fn rows_to_mat<T: Float>(rows: &[[T; 3]]) -> Mat<T> {
    Mat::from_fn(rows.len(), 3, |i, j| rows[i][j])
}

///////////
// Tests //
///////////

#[cfg(test)]
mod backbone_tests {
    use super::*;
    use faer::Mat;

    // Planar zigzag backbone: (0,0,0), (1,1,0), (2,0,0), ...
    fn backbone(n: usize) -> Mat<f64> {
        Mat::from_fn(n, 3, |i, j| match j {
            0 => i as f64,
            1 => (i % 2) as f64,
            _ => 0.0,
        })
    }

    const NAMES: [&str; 6] = ["N", "CA", "C", "N", "CA", "C"];

    #[test]
    fn test_guess_amide_h_positions() {
        let coords = backbone(6);
        let (h, attached) = guess_amide_h(coords.as_ref(), &NAMES);

        // Only the second residue's N has a preceding C
        assert_eq!(attached, vec![3]);
        assert_eq!(h.nrows(), 1);

        // N = (3,1,0), C = (2,0,0), CA = (4,0,0): the bisector points along
        // +y, so H = (3, 1 + 1.01, 0)
        assert!((h[(0, 0)] - 3.0).abs() < 1e-12);
        assert!((h[(0, 1)] - (1.0 + 1.01)).abs() < 1e-12);
        assert!(h[(0, 2)].abs() < 1e-12);
    }

    #[test]
    fn test_guess_amide_o_positions() {
        let coords = backbone(6);
        let (o, attached) = guess_amide_o(coords.as_ref(), &NAMES);

        // Only the first residue's C is followed by an N
        assert_eq!(attached, vec![2]);
        assert_eq!(o.nrows(), 1);

        // C = (2,0,0), CA = (1,1,0), N = (3,1,0): the bisector points along
        // -y, so O = (2, -1.24, 0)
        assert!((o[(0, 0)] - 2.0).abs() < 1e-12);
        assert!((o[(0, 1)] + 1.24).abs() < 1e-12);
        assert!(o[(0, 2)].abs() < 1e-12);
    }

    #[test]
    fn test_guessed_atoms_bond_lengths() {
        let coords = backbone(9);
        let names = ["N", "CA", "C", "N", "CA", "C", "N", "CA", "C"];

        let (h, h_attached) = guess_amide_h(coords.as_ref(), &names);
        let (o, o_attached) = guess_amide_o(coords.as_ref(), &names);

        assert_eq!(h_attached, vec![3, 6]);
        assert_eq!(o_attached, vec![2, 5]);

        for (row, &atom) in h_attached.iter().enumerate() {
            let d = ((h[(row, 0)] - coords[(atom, 0)]).powi(2)
                + (h[(row, 1)] - coords[(atom, 1)]).powi(2)
                + (h[(row, 2)] - coords[(atom, 2)]).powi(2))
            .sqrt();
            assert!((d - 1.01).abs() < 1e-12, "N-H bond length was {}", d);
        }

        for (row, &atom) in o_attached.iter().enumerate() {
            let d = ((o[(row, 0)] - coords[(atom, 0)]).powi(2)
                + (o[(row, 1)] - coords[(atom, 1)]).powi(2)
                + (o[(row, 2)] - coords[(atom, 2)]).powi(2))
            .sqrt();
            assert!((d - 1.24).abs() < 1e-12, "C=O bond length was {}", d);
        }
    }

    #[test]
    fn test_planar_backbone_keeps_guessed_atoms_in_plane() {
        let coords = backbone(9);
        let names = ["N", "CA", "C", "N", "CA", "C", "N", "CA", "C"];

        let (h, _) = guess_amide_h(coords.as_ref(), &names);
        let (o, _) = guess_amide_o(coords.as_ref(), &names);

        for row in 0..h.nrows() {
            assert!(h[(row, 2)].abs() < 1e-12);
        }
        for row in 0..o.nrows() {
            assert!(o[(row, 2)].abs() < 1e-12);
        }
    }

    #[test]
    fn test_h_and_o_sit_on_opposite_sides() {
        // Trans peptide geometry: around one peptide bond the H (on N) and
        // the O (on the preceding C) point in opposite y directions.
        let coords = backbone(6);
        let (h, _) = guess_amide_h(coords.as_ref(), &NAMES);
        let (o, _) = guess_amide_o(coords.as_ref(), &NAMES);

        let h_offset = h[(0, 1)] - coords[(3, 1)];
        let o_offset = o[(0, 1)] - coords[(2, 1)];
        assert!(h_offset * o_offset < 0.0);
    }
}
