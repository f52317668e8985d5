pub mod backbone;

use faer::{Mat, MatRef};
use num_traits::Float;
use rayon::prelude::*;

//////////////////////
// Vector helpers   //
//////////////////////

#[inline]
fn row3<T: Float>(m: MatRef<T>, i: usize) -> [T; 3] {
    [m[(i, 0)], m[(i, 1)], m[(i, 2)]]
}

#[inline]
fn sub3<T: Float>(a: [T; 3], b: [T; 3]) -> [T; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
fn add3<T: Float>(a: [T; 3], b: [T; 3]) -> [T; 3] {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

#[inline]
fn dot3<T: Float>(a: [T; 3], b: [T; 3]) -> T {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
fn cross3<T: Float>(a: [T; 3], b: [T; 3]) -> [T; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[inline]
fn norm3<T: Float>(a: [T; 3]) -> T {
    dot3(a, a).sqrt()
}

#[inline]
fn unit3<T: Float>(a: [T; 3]) -> [T; 3] {
    let n = norm3(a);
    [a[0] / n, a[1] / n, a[2] / n]
}

#[inline]
fn scale3<T: Float>(a: [T; 3], s: T) -> [T; 3] {
    [a[0] * s, a[1] * s, a[2] * s]
}

//////////////////////////
// Internal coordinates //
//////////////////////////

/// Bond lengths along a chain
///
/// ### Params
///
/// * `chain` - Coordinate matrix of shape (n_atoms, 3)
///
/// ### Returns
///
/// The `n_atoms - 1` consecutive bond lengths
pub fn bond_lengths<T>(chain: MatRef<T>) -> Vec<T>
where
    T: Float,
{
    let n = chain.nrows();
    (1..n)
        .map(|i| norm3(sub3(row3(chain, i), row3(chain, i - 1))))
        .collect()
}

/// Bond angles along a chain
///
/// The angle at atom `i` is the angle between the bonds to atoms `i - 1`
/// and `i + 1`, in radians within `[0, π]`.
///
/// ### Params
///
/// * `chain` - Coordinate matrix of shape (n_atoms, 3)
///
/// ### Returns
///
/// The `n_atoms - 2` bond angles
pub fn bond_angles<T>(chain: MatRef<T>) -> Vec<T>
where
    T: Float,
{
    let n = chain.nrows();
    (1..n - 1)
        .map(|i| {
            let centre = row3(chain, i);
            let u = unit3(sub3(row3(chain, i - 1), centre));
            let v = unit3(sub3(row3(chain, i + 1), centre));
            dot3(u, v).max(-T::one()).min(T::one()).acos()
        })
        .collect()
}

/// Dihedral angles along a chain
///
/// Uses the atan2 formulation, so the result carries the torsion sign and
/// lives in `(-π, π]`.
///
/// ### Params
///
/// * `chain` - Coordinate matrix of shape (n_atoms, 3)
///
/// ### Returns
///
/// The `n_atoms - 3` torsions, one per consecutive atom quadruple
pub fn dihedrals<T>(chain: MatRef<T>) -> Vec<T>
where
    T: Float,
{
    let n = chain.nrows();
    (0..n - 3)
        .map(|i| {
            let b1 = sub3(row3(chain, i + 1), row3(chain, i));
            let b2 = sub3(row3(chain, i + 2), row3(chain, i + 1));
            let b3 = sub3(row3(chain, i + 3), row3(chain, i + 2));

            let n1 = cross3(b1, b2);
            let n2 = cross3(b2, b3);
            let m1 = cross3(n1, unit3(b2));

            let x = dot3(n1, n2);
            let y = dot3(m1, n2);
            y.atan2(x)
        })
        .collect()
}

////////////////////////
// Pairwise distances //
////////////////////////

/// Resolve the `start/stop/step` atom selection against a chain length
///
/// ### Params
///
/// * `n_atoms` - Number of atoms in the chain
/// * `start` - First atom index (defaults to 0)
/// * `stop` - One past the last atom index (defaults to `n_atoms`)
/// * `step` - Stride (defaults to 1)
///
/// ### Returns
///
/// The selected atom indices
pub fn select_atoms(
    n_atoms: usize,
    start: Option<usize>,
    stop: Option<usize>,
    step: Option<usize>,
) -> Vec<usize> {
    let start = start.unwrap_or(0);
    let stop = stop.unwrap_or(n_atoms).min(n_atoms);
    let step = step.unwrap_or(1).max(1);

    (start..stop).step_by(step).collect()
}

/// Condensed pairwise distances over a selection of atoms
///
/// ### Params
///
/// * `coords` - Coordinate matrix of shape (n_atoms, 3)
/// * `selection` - Atom indices to include
///
/// ### Returns
///
/// The upper-triangle distances in row-major pair order, length
/// `m * (m - 1) / 2` for `m` selected atoms
pub fn pairwise_distances<T>(coords: MatRef<T>, selection: &[usize]) -> Vec<T>
where
    T: Float,
{
    let m = selection.len();
    let mut out = Vec::with_capacity(m * (m.max(1) - 1) / 2);

    for i in 0..m {
        for j in (i + 1)..m {
            let d = sub3(row3(coords, selection[i]), row3(coords, selection[j]));
            out.push(norm3(d));
        }
    }

    out
}

///////////////////
// Periodic math //
///////////////////

/// Minimum-image difference of two periodic scalars
///
/// ### Params
///
/// * `a` - First value
/// * `b` - Second value
/// * `periodicity` - Distance between periodic walls; infinite for
///   non-periodic values
///
/// ### Returns
///
/// `a - b` wrapped into `[-periodicity / 2, periodicity / 2)`
pub fn periodic_diff<T>(a: T, b: T, periodicity: T) -> T
where
    T: Float,
{
    let d = a - b;
    if !periodicity.is_finite() {
        return d;
    }
    let half = T::from(0.5).unwrap();
    d - (d / periodicity + half).floor() * periodicity
}

/////////////////////
// Batched helpers //
/////////////////////

/// Dihedrals for a batch of conformations
pub fn batch_dihedrals<T>(batch: &[Mat<T>]) -> Vec<Vec<T>>
where
    T: Float + Send + Sync,
{
    batch.par_iter().map(|m| dihedrals(m.as_ref())).collect()
}

/// Bond angles for a batch of conformations
pub fn batch_bond_angles<T>(batch: &[Mat<T>]) -> Vec<Vec<T>>
where
    T: Float + Send + Sync,
{
    batch.par_iter().map(|m| bond_angles(m.as_ref())).collect()
}

/// Condensed pairwise distances for a batch of conformations
pub fn batch_pairwise_distances<T>(batch: &[Mat<T>], selection: &[usize]) -> Vec<Vec<T>>
where
    T: Float + Send + Sync,
{
    batch
        .par_iter()
        .map(|m| pairwise_distances(m.as_ref(), selection))
        .collect()
}

/// Mean bond lengths over a batch of conformations
///
/// ### Params
///
/// * `batch` - Conformations, all with the same number of atoms
///
/// ### Returns
///
/// The per-bond mean length, length `n_atoms - 1`
pub fn mean_bond_lengths<T>(batch: &[Mat<T>]) -> Vec<T>
where
    T: Float + Send + Sync,
{
    mean_internal(batch, |m| bond_lengths(m.as_ref()))
}

/// Mean bond angles over a batch of conformations
pub fn mean_bond_angles<T>(batch: &[Mat<T>]) -> Vec<T>
where
    T: Float + Send + Sync,
{
    mean_internal(batch, |m| bond_angles(m.as_ref()))
}

fn mean_internal<T, F>(batch: &[Mat<T>], f: F) -> Vec<T>
where
    T: Float + Send + Sync,
    F: Fn(&Mat<T>) -> Vec<T> + Send + Sync,
{
    let per_conf: Vec<Vec<T>> = batch.par_iter().map(f).collect();
    let n = per_conf.first().map(|v| v.len()).unwrap_or(0);
    let count = T::from(per_conf.len().max(1)).unwrap();

    let mut mean = vec![T::zero(); n];
    for values in &per_conf {
        crate::assert_same_len!(values, mean);
        for (acc, &v) in mean.iter_mut().zip(values) {
            *acc = *acc + v;
        }
    }
    for acc in &mut mean {
        *acc = *acc / count;
    }

    mean
}

///////////
// Tests //
///////////

#[cfg(test)]
mod geometry_math_tests {
    use super::*;
    use faer::Mat;

    fn zigzag_chain(n: usize) -> Mat<f64> {
        // Planar zigzag: (0,0,0), (1,1,0), (2,0,0), ...
        Mat::from_fn(n, 3, |i, j| match j {
            0 => i as f64,
            1 => (i % 2) as f64,
            _ => 0.0,
        })
    }

    #[test]
    fn test_bond_lengths_zigzag() {
        let chain = zigzag_chain(5);
        let lengths = bond_lengths(chain.as_ref());

        assert_eq!(lengths.len(), 4);
        for l in lengths {
            assert!((l - 2.0f64.sqrt()).abs() < 1e-12);
        }
    }

    #[test]
    fn test_bond_angles_zigzag() {
        let chain = zigzag_chain(5);
        let angles = bond_angles(chain.as_ref());

        assert_eq!(angles.len(), 3);
        // Interior angle of the zigzag is 90 degrees
        for a in angles {
            assert!((a - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        }
    }

    #[test]
    fn test_dihedrals_planar_chain_are_trans() {
        let chain = zigzag_chain(6);
        let torsions = dihedrals(chain.as_ref());

        assert_eq!(torsions.len(), 3);
        for t in torsions {
            assert!(
                (t.abs() - std::f64::consts::PI).abs() < 1e-12,
                "planar zigzag torsion should be ±π, got {}",
                t
            );
        }
    }

    #[test]
    fn test_dihedral_sign() {
        // Quadruple with the last atom lifted out of the plane: torsion
        // rotates away from ±π with a definite sign.
        let mut chain = zigzag_chain(4);
        chain[(3, 2)] = 0.5;

        let torsions = dihedrals(chain.as_ref());
        assert_eq!(torsions.len(), 1);
        assert!(torsions[0].abs() < std::f64::consts::PI);

        // Mirroring through the plane flips the sign
        chain[(3, 2)] = -0.5;
        let mirrored = dihedrals(chain.as_ref());
        assert!((torsions[0] + mirrored[0]).abs() < 1e-12);
    }

    #[test]
    fn test_select_atoms_stride() {
        // N-CA-C backbone: start 1, step 3 selects the CA atoms
        let selection = select_atoms(9, Some(1), None, Some(3));
        assert_eq!(selection, vec![1, 4, 7]);

        let all = select_atoms(4, None, None, None);
        assert_eq!(all, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_pairwise_distances_condensed() {
        let chain = zigzag_chain(4);
        let selection = select_atoms(4, None, None, None);
        let dists = pairwise_distances(chain.as_ref(), &selection);

        // 4 atoms -> 6 pairs
        assert_eq!(dists.len(), 6);
        // First pair (0,1)
        assert!((dists[0] - 2.0f64.sqrt()).abs() < 1e-12);
        // Pair (0,2) is two steps along x
        assert!((dists[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_periodic_diff_wraps() {
        let p = 2.0 * std::f64::consts::PI;

        // Values just across the periodic wall are close
        let d = periodic_diff(3.1, -3.1, p);
        assert!(d.abs() < 0.2, "expected wrapped difference, got {}", d);

        // Non-periodic values pass through
        let d = periodic_diff(3.1, -3.1, f64::INFINITY);
        assert!((d - 6.2).abs() < 1e-12);

        // Invariant under adding full periods
        let a = 1.2;
        let b = -0.7;
        let d0 = periodic_diff(a, b, p);
        let d1 = periodic_diff(a + p, b, p);
        assert!((d0 - d1).abs() < 1e-12);
    }

    #[test]
    fn test_mean_bond_lengths() {
        let batch = vec![zigzag_chain(4), zigzag_chain(4)];
        let mean = mean_bond_lengths(&batch);

        assert_eq!(mean.len(), 3);
        for l in mean {
            assert!((l - 2.0f64.sqrt()).abs() < 1e-12);
        }
    }
}
