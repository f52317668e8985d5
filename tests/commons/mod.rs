use faer::Mat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

/// Wrap a value into the periodic window (-π, π]
#[allow(dead_code)]
pub fn wrap_angle(x: f64) -> f64 {
    let wrapped = (x + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped == -PI {
        PI
    } else {
        wrapped
    }
}

/// Create synthetic torsion data with clustered conformational states
///
/// Three clusters of torsion vectors around well-separated centres, wrapped
/// to one periodic window.
#[allow(dead_code)]
pub fn create_torsion_data(
    n_per_cluster: usize,
    n_features: usize,
    seed: u64,
) -> (Mat<f64>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let centres = [-2.0, 0.5, 2.5];
    let n_total = n_per_cluster * centres.len();

    let mut data_vec = Vec::with_capacity(n_total * n_features);
    let mut labels = Vec::with_capacity(n_total);

    for (cluster_id, &centre) in centres.iter().enumerate() {
        for _ in 0..n_per_cluster {
            for _ in 0..n_features {
                let noise: f64 = rng.random::<f64>() * 0.4 - 0.2;
                data_vec.push(wrap_angle(centre + noise));
            }
            labels.push(cluster_id);
        }
    }

    let data = Mat::from_fn(n_total, n_features, |i, j| data_vec[i * n_features + j]);
    (data, labels)
}

/// Create synthetic backbone conformations around a planar zigzag chain
///
/// Each conformation perturbs the base chain with Gaussian-ish noise in all
/// three coordinates, so bond lengths, angles and torsions all fluctuate.
#[allow(dead_code)]
pub fn create_backbone_conformations(
    n_samples: usize,
    n_atoms: usize,
    noise: f64,
    seed: u64,
) -> Vec<Mat<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);

    (0..n_samples)
        .map(|_| {
            let mut coords = Vec::with_capacity(n_atoms * 3);
            for i in 0..n_atoms {
                for j in 0..3 {
                    let base = match j {
                        0 => 1.23 * i as f64,
                        1 => 0.8 * (i % 2) as f64,
                        _ => 0.0,
                    };
                    coords.push(base + rng.random::<f64>() * 2.0 * noise - noise);
                }
            }
            Mat::from_fn(n_atoms, 3, |i, j| coords[i * 3 + j])
        })
        .collect()
}
