pub mod adc_train;
pub mod train;

use burn::prelude::*;
use burn::tensor::TensorData;

use crate::params::{CostVariant, SigmoidParams};

////////////
// Losses //
////////////

/// Wrap tensor values into `[-periodicity / 2, periodicity / 2)`
///
/// ### Params
///
/// * `values` - Differences to wrap
/// * `periodicity` - Distance between periodic walls (must be finite)
///
/// ### Returns
///
/// The minimum-image differences
pub fn periodic_wrap<B: Backend, const D: usize>(
    values: Tensor<B, D>,
    periodicity: f64,
) -> Tensor<B, D> {
    let wraps = values
        .clone()
        .div_scalar(periodicity)
        .add_scalar(0.5)
        .floor()
        .mul_scalar(periodicity);
    values - wraps
}

/// Sketch-map sigmoid applied elementwise
///
/// Computes `1 - (1 + (2^(a/b) - 1) * (r / sig)^a)^(-b/a)`. The function
/// maps 0 to 0, `sig` to 1/2 and saturates at 1 for large distances.
///
/// ### Params
///
/// * `r` - Non-negative distances
/// * `sig` - Midpoint of the sigmoid
/// * `a` - Steepness on the near side
/// * `b` - Steepness on the far side
///
/// ### Returns
///
/// The transformed distances
pub fn sketchmap_sigmoid<B: Backend, const D: usize>(
    r: Tensor<B, D>,
    sig: f64,
    a: f64,
    b: f64,
) -> Tensor<B, D> {
    let c = 2f64.powf(a / b) - 1.0;
    r.div_scalar(sig)
        .powf_scalar(a)
        .mul_scalar(c)
        .add_scalar(1.0)
        .powf_scalar(-b / a)
        .neg()
        .add_scalar(1.0)
}

/// Condensed pairwise distances between the rows of a batch
///
/// Squared distances are gathered for the `i < j` pairs before the square
/// root and clamped away from zero, keeping the backward pass finite.
///
/// ### Params
///
/// * `x` - Batch of points, [batch_size, n_features]
/// * `periodicity` - Feature periodicity; infinite for plain Euclidean
///   distances
///
/// ### Returns
///
/// Distances in row-major pair order, length `n * (n - 1) / 2`
pub fn pairwise_dists<B: Backend>(x: Tensor<B, 2>, periodicity: f64) -> Tensor<B, 1> {
    let [n, d] = x.dims();
    let device = x.device();

    let lhs = x.clone().reshape([n, 1, d]).expand([n, n, d]);
    let rhs = x.reshape([1, n, d]).expand([n, n, d]);
    let mut diff = lhs - rhs;
    if periodicity.is_finite() {
        diff = periodic_wrap(diff, periodicity);
    }
    let sq_dists = diff.powf_scalar(2.0).sum_dim(2).reshape([n * n]);

    let mut pair_idx: Vec<i64> = Vec::with_capacity(n * (n.max(1) - 1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            pair_idx.push((i * n + j) as i64);
        }
    }
    let n_pairs = pair_idx.len();
    let pair_idx = Tensor::<B, 1, Int>::from_data(
        TensorData::new(pair_idx, [n_pairs]).convert::<B::IntElem>(),
        &device,
    );

    sq_dists.select(0, pair_idx).clamp_min(1e-12).sqrt()
}

/// Sketch-map distance matching cost
///
/// Transforms the pairwise distances of the high-dimensional inputs and the
/// low-dimensional latent points with their respective sigmoids and returns
/// the mean squared mismatch.
///
/// ### Params
///
/// * `high` - High-dimensional batch, [batch_size, n_features]
/// * `low` - Latent batch, [batch_size, n_latent]
/// * `sig` - The sigmoid constants for both spaces
/// * `periodicity` - Periodicity of the high-dimensional features
///
/// ### Returns
///
/// Scalar loss tensor
pub fn distance_cost<B: Backend>(
    high: Tensor<B, 2>,
    low: Tensor<B, 2>,
    sig: &SigmoidParams,
    periodicity: f64,
) -> Tensor<B, 1> {
    let [n, _] = high.dims();
    if n < 2 {
        return Tensor::zeros([1], &high.device());
    }

    let (sig_h, a_h, b_h) = sig.high();
    let (sig_l, a_l, b_l) = sig.low();

    let s_h = sketchmap_sigmoid(pairwise_dists(high, periodicity), sig_h, a_h, b_h);
    let s_l = sketchmap_sigmoid(pairwise_dists(low, f64::INFINITY), sig_l, a_l, b_l);

    (s_h - s_l).powf_scalar(2.0).mean()
}

/// Reconstruction cost between inputs and decoder outputs
///
/// ### Params
///
/// * `input` - Network inputs, [batch_size, n_features]
/// * `output` - Decoder outputs, [batch_size, n_features]
/// * `variant` - Reduction over the (periodic) differences
/// * `periodicity` - Feature periodicity; infinite for plain differences
///
/// ### Returns
///
/// Scalar loss tensor
pub fn reconstruction_cost<B: Backend>(
    input: Tensor<B, 2>,
    output: Tensor<B, 2>,
    variant: CostVariant,
    periodicity: f64,
) -> Tensor<B, 1> {
    let mut diff = input - output;
    if periodicity.is_finite() {
        diff = periodic_wrap(diff, periodicity);
    }

    match variant {
        CostVariant::MeanSquare => diff.powf_scalar(2.0).mean(),
        CostVariant::MeanAbs => diff.abs().mean(),
        CostVariant::MeanNorm => diff
            .powf_scalar(2.0)
            .sum_dim(1)
            .clamp_min(1e-12)
            .sqrt()
            .mean(),
    }
}

/// Latent centering cost: mean squared latent coordinate
///
/// Keeps the embedding centred around the origin.
pub fn center_cost<B: Backend>(latent: Tensor<B, 2>) -> Tensor<B, 1> {
    latent.powf_scalar(2.0).mean()
}

/// Soft-start scaling of a cost term
///
/// ### Params
///
/// * `scale` - Full weight of the term
/// * `ramp` - Optional `(begin, end)` step range of the linear ramp
/// * `step` - Current training step
///
/// ### Returns
///
/// 0 before `begin`, `scale` from `end` on, linear in between. Without a
/// ramp the full scale applies from the first step.
pub fn soft_start_scale(scale: f64, ramp: Option<(usize, usize)>, step: usize) -> f64 {
    match ramp {
        None => scale,
        Some((begin, end)) => {
            if step <= begin {
                0.0
            } else if step >= end {
                scale
            } else {
                scale * (step - begin) as f64 / (end - begin) as f64
            }
        }
    }
}

///////////
// Tests //
///////////
