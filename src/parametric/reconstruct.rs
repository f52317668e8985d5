use burn::prelude::*;
use burn::tensor::TensorData;
use std::f64::consts::PI;

//////////////////////////
// Chain reconstruction //
//////////////////////////

/// Lay out a chain in the xy-plane from bond lengths and bond angles
///
/// The first atom sits at the origin and the first bond runs along +x.
/// Bond-angle turns alternate sign so the chain extends as a planar zigzag;
/// every torsion of the result is ±π.
///
/// ### Params
///
/// * `lengths` - Bond lengths, [batch_size, n_atoms - 1]
/// * `angles` - Bond angles in radians, [batch_size, n_atoms - 2]
///
/// ### Returns
///
/// Atom positions, [batch_size, n_atoms, 3]
pub fn chain_in_plane<B: Backend>(lengths: Tensor<B, 2>, angles: Tensor<B, 2>) -> Tensor<B, 3> {
    let [b, n_bonds] = lengths.dims();
    let device = lengths.device();

    let mut abs_angle: Tensor<B, 2> = Tensor::zeros([b, 1], &device);
    let mut pos: Tensor<B, 2> = Tensor::zeros([b, 3], &device);
    let mut points: Vec<Tensor<B, 2>> = Vec::with_capacity(n_bonds + 1);
    points.push(pos.clone());

    for i in 0..n_bonds {
        if i > 0 {
            // interior angle -> direction change, alternating side
            let sign = if (i - 1) % 2 == 0 { 1.0 } else { -1.0 };
            let turn = angles
                .clone()
                .slice([0..b, (i - 1)..i])
                .neg()
                .add_scalar(PI)
                .mul_scalar(sign);
            abs_angle = abs_angle + turn;
        }

        let l = lengths.clone().slice([0..b, i..(i + 1)]);
        let step = Tensor::cat(
            vec![
                l.clone() * abs_angle.clone().cos(),
                l * abs_angle.clone().sin(),
                Tensor::zeros([b, 1], &device),
            ],
            1,
        );

        pos = pos + step;
        points.push(pos.clone());
    }

    Tensor::stack(points, 1)
}

/// Apply torsions to a planar chain
///
/// Rotates the chain tail around each bond axis in turn until the torsion
/// over atoms `(i, i+1, i+2, i+3)` matches `dihedrals[:, i]`. The input
/// chain is expected to come from [`chain_in_plane`], where every torsion
/// is π.
///
/// ### Params
///
/// * `positions` - Planar chain, [batch_size, n_atoms, 3]
/// * `dihedrals` - Target torsions in `(-π, π]`, [batch_size, n_atoms - 3]
///
/// ### Returns
///
/// Atom positions with the requested torsions, [batch_size, n_atoms, 3]
pub fn dihedrals_to_cartesian<B: Backend>(
    positions: Tensor<B, 3>,
    dihedrals: Tensor<B, 2>,
) -> Tensor<B, 3> {
    let [b, n, _] = positions.dims();
    let n_dihedrals = dihedrals.dims()[1];

    let mut positions = positions;
    for i in 0..n_dihedrals {
        let p1 = positions
            .clone()
            .slice([0..b, (i + 1)..(i + 2), 0..3])
            .reshape([b, 3]);
        let p2 = positions
            .clone()
            .slice([0..b, (i + 2)..(i + 3), 0..3])
            .reshape([b, 3]);

        let bond = p2.clone() - p1;
        let norm = bond.clone().powf_scalar(2.0).sum_dim(1).sqrt();
        let axis = bond / norm;

        // right-hand rotation by δ about the bond takes the planar torsion
        // π to π - δ, so the rotation angle is π - dihedral
        let theta = dihedrals
            .clone()
            .slice([0..b, i..(i + 1)])
            .neg()
            .add_scalar(PI);
        let rot = rotation_matrices(axis, theta);

        let pivot = p2.reshape([b, 1, 3]);
        let tail = positions.clone().slice([0..b, (i + 3)..n, 0..3]) - pivot.clone();
        let rotated = tail.matmul(rot.swap_dims(1, 2)) + pivot;

        let head = positions.slice([0..b, 0..(i + 3), 0..3]);
        positions = Tensor::cat(vec![head, rotated], 1);
    }

    positions
}

/// Reconstruct cartesians from internal coordinates
///
/// ### Params
///
/// * `lengths` - Bond lengths, [batch_size, n_atoms - 1]
/// * `angles` - Bond angles, [batch_size, n_atoms - 2]
/// * `dihedrals` - Torsions, [batch_size, n_atoms - 3]
///
/// ### Returns
///
/// Atom positions, [batch_size, n_atoms, 3]
pub fn reconstruct_cartesians<B: Backend>(
    lengths: Tensor<B, 2>,
    angles: Tensor<B, 2>,
    dihedrals: Tensor<B, 2>,
) -> Tensor<B, 3> {
    dihedrals_to_cartesian(chain_in_plane(lengths, angles), dihedrals)
}

/// Condensed pairwise distances over selected atoms of a batch of chains
///
/// Squared distances are gathered for the `i < j` pairs before the square
/// root, so the zero diagonal never enters the backward pass.
///
/// ### Params
///
/// * `cartesians` - Atom positions, [batch_size, n_atoms, 3]
/// * `selection` - Atom indices to include
///
/// ### Returns
///
/// Distances in row-major pair order, [batch_size, m * (m - 1) / 2]
pub fn selected_pairwise_dists<B: Backend>(
    cartesians: Tensor<B, 3>,
    selection: &[usize],
) -> Tensor<B, 2> {
    let [b, _, _] = cartesians.dims();
    let m = selection.len();
    let device = cartesians.device();

    let atom_idx: Vec<i64> = selection.iter().map(|&i| i as i64).collect();
    let atom_idx = Tensor::<B, 1, Int>::from_data(
        TensorData::new(atom_idx, [m]).convert::<B::IntElem>(),
        &device,
    );
    let selected = cartesians.select(1, atom_idx);

    let lhs = selected.clone().reshape([b, m, 1, 3]);
    let rhs = selected.reshape([b, 1, m, 3]);
    let sq_dists = (lhs - rhs).powf_scalar(2.0).sum_dim(3).reshape([b, m * m]);

    let mut pair_idx: Vec<i64> = Vec::with_capacity(m * (m - 1) / 2);
    for i in 0..m {
        for j in (i + 1)..m {
            pair_idx.push((i * m + j) as i64);
        }
    }
    let n_pairs = pair_idx.len();
    let pair_idx = Tensor::<B, 1, Int>::from_data(
        TensorData::new(pair_idx, [n_pairs]).convert::<B::IntElem>(),
        &device,
    );

    sq_dists.select(1, pair_idx).sqrt()
}

/////////////
// Helpers //
/////////////

/// Rodrigues rotation matrices around unit axes
///
/// ### Params
///
/// * `axis` - Unit rotation axes, [batch_size, 3]
/// * `theta` - Rotation angles, [batch_size, 1]
///
/// ### Returns
///
/// Row-major rotation matrices, [batch_size, 3, 3]
fn rotation_matrices<B: Backend>(axis: Tensor<B, 2>, theta: Tensor<B, 2>) -> Tensor<B, 3> {
    let [b, _] = axis.dims();

    let ax = axis.clone().slice([0..b, 0..1]);
    let ay = axis.clone().slice([0..b, 1..2]);
    let az = axis.slice([0..b, 2..3]);

    let cos_t = theta.clone().cos();
    let sin_t = theta.sin();
    let omc = cos_t.clone().neg().add_scalar(1.0);

    let r00 = cos_t.clone() + ax.clone() * ax.clone() * omc.clone();
    let r01 = ax.clone() * ay.clone() * omc.clone() - az.clone() * sin_t.clone();
    let r02 = ax.clone() * az.clone() * omc.clone() + ay.clone() * sin_t.clone();

    let r10 = ay.clone() * ax.clone() * omc.clone() + az.clone() * sin_t.clone();
    let r11 = cos_t.clone() + ay.clone() * ay.clone() * omc.clone();
    let r12 = ay.clone() * az.clone() * omc.clone() - ax.clone() * sin_t.clone();

    let r20 = az.clone() * ax.clone() * omc.clone() - ay.clone() * sin_t.clone();
    let r21 = az.clone() * ay.clone() * omc.clone() + ax.clone() * sin_t.clone();
    let r22 = cos_t + az.clone() * az * omc;

    Tensor::cat(vec![r00, r01, r02, r10, r11, r12, r20, r21, r22], 1).reshape([b, 3, 3])
}

///////////
// Tests //
///////////

#[cfg(test)]
mod reconstruct_tests {
    use super::*;
    use crate::geometry;
    use burn::backend::ndarray::NdArrayDevice;
    use burn::backend::NdArray;
    use faer::Mat;
    use std::f64::consts::{FRAC_PI_2, PI};

    type TestBackend = NdArray<f64>;

    fn to_mats(positions: Tensor<TestBackend, 3>) -> Vec<Mat<f64>> {
        let [b, n, _] = positions.dims();
        let flat: Vec<f64> = positions.into_data().to_vec().unwrap();

        (0..b)
            .map(|s| Mat::from_fn(n, 3, |i, j| flat[s * n * 3 + i * 3 + j]))
            .collect()
    }

    #[test]
    fn test_chain_in_plane_reproduces_internals() {
        let device = NdArrayDevice::Cpu;
        let lengths =
            Tensor::<TestBackend, 2>::from_floats([[1.5, 1.4, 1.5, 1.4]], &device);
        let angles = Tensor::<TestBackend, 2>::from_floats([[1.9, 2.0, 1.9]], &device);

        let positions = chain_in_plane(lengths, angles);
        assert_eq!(positions.dims(), [1, 5, 3]);

        let chain = &to_mats(positions)[0];
        let got_lengths = geometry::bond_lengths(chain.as_ref());
        let got_angles = geometry::bond_angles(chain.as_ref());

        for (got, want) in got_lengths.iter().zip([1.5, 1.4, 1.5, 1.4]) {
            assert!((got - want).abs() < 1e-9, "length {} != {}", got, want);
        }
        for (got, want) in got_angles.iter().zip([1.9, 2.0, 1.9]) {
            assert!((got - want).abs() < 1e-9, "angle {} != {}", got, want);
        }
        // Planar chain
        for i in 0..5 {
            assert!(chain[(i, 2)].abs() < 1e-12);
        }
    }

    #[test]
    fn test_trans_torsions_leave_chain_planar() {
        let device = NdArrayDevice::Cpu;
        let lengths = Tensor::<TestBackend, 2>::from_floats([[1.5, 1.5, 1.5, 1.5]], &device);
        let angles = Tensor::<TestBackend, 2>::from_floats([[2.0, 2.0, 2.0]], &device);
        let dihedrals = Tensor::<TestBackend, 2>::from_floats([[PI, PI]], &device);

        let flat = chain_in_plane(lengths, angles);
        let rotated = dihedrals_to_cartesian(flat.clone(), dihedrals);

        let flat = &to_mats(flat)[0];
        let rotated = &to_mats(rotated)[0];
        for i in 0..5 {
            for j in 0..3 {
                assert!(
                    (flat[(i, j)] - rotated[(i, j)]).abs() < 1e-9,
                    "torsion π should be the identity on a planar chain"
                );
            }
        }
    }

    #[test]
    fn test_dihedrals_round_trip() {
        let device = NdArrayDevice::Cpu;
        let lengths = Tensor::<TestBackend, 2>::from_floats([[1.5, 1.4, 1.5, 1.4, 1.5]], &device);
        let angles = Tensor::<TestBackend, 2>::from_floats([[1.9, 2.0, 1.9, 2.0]], &device);
        let targets = [FRAC_PI_2, -2.1, 0.4];
        let dihedrals = Tensor::<TestBackend, 2>::from_floats([targets], &device);

        let positions = reconstruct_cartesians(lengths, angles, dihedrals);
        let chain = &to_mats(positions)[0];

        let got = geometry::dihedrals(chain.as_ref());
        for (g, want) in got.iter().zip(targets) {
            assert!(
                (g - want).abs() < 1e-9,
                "reconstructed torsion {} != target {}",
                g,
                want
            );
        }

        // Rotations must not disturb lengths or angles
        for l in geometry::bond_lengths(chain.as_ref()) {
            assert!((l - 1.5).abs() < 0.11);
        }
    }

    #[test]
    fn test_selected_pairwise_dists() {
        let device = NdArrayDevice::Cpu;
        // Two atoms 1 apart, third 2 along y from the first
        let positions = Tensor::<TestBackend, 3>::from_floats(
            [[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 2.0, 0.0]]],
            &device,
        );

        let dists = selected_pairwise_dists(positions.clone(), &[0, 1, 2]);
        assert_eq!(dists.dims(), [1, 3]);

        let values: Vec<f64> = dists.into_data().to_vec().unwrap();
        assert!((values[0] - 1.0).abs() < 1e-12); // (0,1)
        assert!((values[1] - 2.0).abs() < 1e-12); // (0,2)
        assert!((values[2] - 5.0f64.sqrt()).abs() < 1e-12); // (1,2)

        let subset = selected_pairwise_dists(positions, &[0, 2]);
        assert_eq!(subset.dims(), [1, 1]);
        let values: Vec<f64> = subset.into_data().to_vec().unwrap();
        assert!((values[0] - 2.0).abs() < 1e-12);
    }
}
