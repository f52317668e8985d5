pub mod io;

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::path::{Path, PathBuf};

use crate::params::io::ParamsIo;

///////////////////
// Field types   //
///////////////////

/// Sketch-map sigmoid constants `(sig_h, a_h, b_h, sig_l, a_l, b_l)`
///
/// The first three entries shape the sigmoid applied to high-dimensional
/// pairwise distances, the last three the one applied to low-dimensional
/// (latent) pairwise distances. Serialised as a plain JSON array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SigmoidParams(pub f64, pub f64, pub f64, pub f64, pub f64, pub f64);

impl SigmoidParams {
    /// The `(sig, a, b)` triple for high-dimensional distances
    pub fn high(&self) -> (f64, f64, f64) {
        (self.0, self.1, self.2)
    }

    /// The `(sig, a, b)` triple for low-dimensional distances
    pub fn low(&self) -> (f64, f64, f64) {
        (self.3, self.4, self.5)
    }
}

/// How a reconstruction cost term is reduced over a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostVariant {
    /// Mean of squared elementwise differences
    MeanSquare,
    /// Mean of absolute elementwise differences
    MeanAbs,
    /// Mean of per-sample Euclidean norms of the difference
    MeanNorm,
}

/// Parse a cost variant name
///
/// ### Params
///
/// * `s` - One of `"mean_square"`, `"mean_abs"`, `"mean_norm"`
///   (case-insensitive)
///
/// ### Returns
///
/// The parsed variant, or `None` for unknown names
pub fn parse_cost_variant(s: &str) -> Option<CostVariant> {
    match s.to_lowercase().as_str() {
        "mean_square" => Some(CostVariant::MeanSquare),
        "mean_abs" => Some(CostVariant::MeanAbs),
        "mean_norm" => Some(CostVariant::MeanNorm),
        _ => None,
    }
}

/// Serialises an `f64` periodicity where infinity maps to JSON `null`
///
/// JSON has no infinity literal, so non-periodic inputs are stored as `null`
/// and read back as `f64::INFINITY`.
mod periodicity_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value: Option<f64> = Option::deserialize(deserializer)?;
        Ok(value.unwrap_or(f64::INFINITY))
    }
}

////////////////
// Parameters //
////////////////

/// Configuration for the plain autoencoder
///
/// ### Fields
///
/// * `main_path` - Run directory. The parameter file and checkpoints are
///   stored under it.
/// * `n_neurons` - Number of neurons for each layer up to and including the
///   bottleneck. `[128, 128, 2]` gives the architecture
///   `{i, 128, 128, 2, 128, 128, i}` where `i` is the input dimensionality.
/// * `activation_functions` - One name per layer boundary: `""` (none),
///   `"relu"`, `"tanh"` or `"sigmoid"`. The encoder uses the entries starting
///   with the second element; the decoder uses the reversed list starting
///   with the second element from the back. `["", "relu", "tanh", ""]` yields
///   the sequence `{relu, tanh, "", tanh, relu, ""}`.
/// * `periodicity` - Distance between periodic walls of the input space,
///   e.g. `2π` for angular values in radians. All periodic data must be
///   wrapped to one periodic window. `f64::INFINITY` for non-periodic inputs.
/// * `learning_rate` - Learning rate used by the optimiser.
/// * `n_steps` - Number of optimiser steps to train for.
/// * `batch_size` - Number of training points per step (clamped to the
///   dataset size).
/// * `summary_step` - A loss summary is logged every `summary_step` steps.
/// * `checkpoint_step` - A checkpoint is written every `checkpoint_step`
///   steps.
/// * `dist_sig_parameters` - Sketch-map sigmoid constants, see
///   [`SigmoidParams`].
/// * `distance_cost_scale` - Weight of the sigmoid distance matching term.
///   `None` disables the term.
/// * `auto_cost_scale` - Weight of the autoencoding reconstruction term.
///   `None` disables the term.
/// * `auto_cost_variant` - Reduction used for the autoencoding term.
/// * `center_cost_scale` - Weight of the latent centering term.
/// * `l2_reg_constant` - L2 weight regularisation, applied as optimiser
///   weight decay.
/// * `analysis_path` - Optional path for storing analysis output.
/// * `id` - Free-form name for the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    pub main_path: PathBuf,
    pub n_neurons: Vec<usize>,
    pub activation_functions: Vec<String>,
    #[serde(with = "periodicity_serde")]
    pub periodicity: f64,

    pub learning_rate: f64,
    pub n_steps: usize,
    pub batch_size: usize,
    pub summary_step: usize,
    pub checkpoint_step: usize,

    pub dist_sig_parameters: SigmoidParams,
    pub distance_cost_scale: Option<f64>,
    pub auto_cost_scale: Option<f64>,
    pub auto_cost_variant: CostVariant,
    pub center_cost_scale: f64,
    pub l2_reg_constant: f64,

    pub analysis_path: String,
    pub id: String,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            main_path: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            n_neurons: vec![128, 128, 2],
            activation_functions: vec![
                String::new(),
                "tanh".to_string(),
                "tanh".to_string(),
                String::new(),
            ],
            periodicity: 2.0 * PI,

            learning_rate: 0.001,
            n_steps: 100_000,
            batch_size: 256,
            summary_step: 100,
            checkpoint_step: 5000,

            dist_sig_parameters: SigmoidParams(4.5, 12.0, 6.0, 1.0, 2.0, 6.0),
            distance_cost_scale: Some(500.0),
            auto_cost_scale: Some(1.0),
            auto_cost_variant: CostVariant::MeanAbs,
            center_cost_scale: 0.0001,
            l2_reg_constant: 0.001,

            analysis_path: String::new(),
            id: String::new(),
        }
    }
}

impl ParamsIo for Parameters {
    fn main_path(&self) -> &Path {
        &self.main_path
    }
}

impl Parameters {
    /// Number of latent dimensions (the bottleneck width)
    pub fn n_latent(&self) -> usize {
        self.n_neurons.last().copied().unwrap_or(0)
    }
}

///////////////////////
// ADC parameters    //
///////////////////////

/// Configuration for the angle/dihedral/cartesian autoencoder
///
/// Embeds [`Parameters`] and adds the molecular-geometry terms. Construction
/// via `Default` disables the plain autoencoding and distance terms
/// (`auto_cost_scale` and `distance_cost_scale` are set to `None`); the
/// training loop only adds a term whose scale is present.
///
/// ### Fields
///
/// * `core` - The embedded base parameters (flattened into the same JSON
///   object on disk).
/// * `cartesian_pwd_start` - Index of the first atom used for the pairwise
///   distance selection.
/// * `cartesian_pwd_stop` - Index one past the last atom used for the
///   pairwise distance selection.
/// * `cartesian_pwd_step` - Stride over the selected atoms. For a backbone
///   `N-CA-C-N-CA-C...`, `start = 1` and `step = 3` selects all C-alpha
///   atoms.
/// * `use_backbone_angles` - Learn backbone bond angles (`true`) or
///   reconstruct conformations from their mean values (`false`).
/// * `angle_cost_scale` / `angle_cost_variant` / `angle_cost_reference` -
///   Weight, reduction and normalisation reference of the bond-angle term.
/// * `dihedral_cost_scale` / `dihedral_cost_variant` /
///   `dihedral_cost_reference` - Weight, reduction and normalisation
///   reference of the dihedral term.
/// * `cartesian_cost_scale` - Weight of the cartesian pairwise-distance
///   reconstruction term.
/// * `cartesian_cost_scale_soft_start` - Optional `(begin, end)` step range
///   across which the cartesian term is ramped up linearly from zero.
/// * `cartesian_cost_variant` / `cartesian_cost_reference` - Reduction and
///   normalisation reference of the cartesian term.
/// * `cartesian_dist_sig_parameters` - Sigmoid constants for the cartesian
///   distance matching term.
/// * `cartesian_distance_cost_scale` - Weight of the cartesian distance
///   matching term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdcParameters {
    #[serde(flatten)]
    pub core: Parameters,

    pub cartesian_pwd_start: Option<usize>,
    pub cartesian_pwd_stop: Option<usize>,
    pub cartesian_pwd_step: Option<usize>,

    pub use_backbone_angles: bool,
    pub angle_cost_scale: f64,
    pub angle_cost_variant: CostVariant,
    pub angle_cost_reference: f64,

    pub dihedral_cost_scale: f64,
    pub dihedral_cost_variant: CostVariant,
    pub dihedral_cost_reference: f64,

    pub cartesian_cost_scale: f64,
    pub cartesian_cost_scale_soft_start: Option<(usize, usize)>,
    pub cartesian_cost_variant: CostVariant,
    pub cartesian_cost_reference: f64,

    pub cartesian_dist_sig_parameters: SigmoidParams,
    pub cartesian_distance_cost_scale: f64,
}

impl Default for AdcParameters {
    fn default() -> Self {
        let core = Parameters {
            auto_cost_scale: None,
            distance_cost_scale: None,
            ..Parameters::default()
        };
        let cartesian_dist_sig_parameters = core.dist_sig_parameters;

        Self {
            core,

            cartesian_pwd_start: None,
            cartesian_pwd_stop: None,
            cartesian_pwd_step: None,

            use_backbone_angles: false,
            angle_cost_scale: 0.0,
            angle_cost_variant: CostVariant::MeanAbs,
            angle_cost_reference: 1.0,

            dihedral_cost_scale: 1.0,
            dihedral_cost_variant: CostVariant::MeanAbs,
            dihedral_cost_reference: 1.0,

            cartesian_cost_scale: 1.0,
            cartesian_cost_scale_soft_start: None,
            cartesian_cost_variant: CostVariant::MeanAbs,
            cartesian_cost_reference: 1.0,

            cartesian_dist_sig_parameters,
            cartesian_distance_cost_scale: 1.0,
        }
    }
}

impl ParamsIo for AdcParameters {
    fn main_path(&self) -> &Path {
        &self.core.main_path
    }
}

///////////
// Tests //
///////////

#[cfg(test)]
mod params_struct_tests {
    use super::*;

    #[test]
    fn test_default_parameters() {
        let p = Parameters::default();

        assert_eq!(p.n_neurons, vec![128, 128, 2]);
        assert_eq!(p.activation_functions.len(), p.n_neurons.len() + 1);
        assert_eq!(p.n_latent(), 2);
        assert!((p.periodicity - 2.0 * PI).abs() < 1e-12);
        assert_eq!(p.distance_cost_scale, Some(500.0));
        assert_eq!(p.auto_cost_scale, Some(1.0));
        assert_eq!(p.auto_cost_variant, CostVariant::MeanAbs);
    }

    #[test]
    fn test_adc_defaults_disable_base_terms() {
        let p = AdcParameters::default();

        assert_eq!(p.core.auto_cost_scale, None);
        assert_eq!(p.core.distance_cost_scale, None);
        assert_eq!(
            p.cartesian_dist_sig_parameters,
            p.core.dist_sig_parameters
        );
        assert_eq!(p.cartesian_cost_scale_soft_start, None);
    }

    #[test]
    fn test_parse_cost_variant() {
        assert!(matches!(
            parse_cost_variant("mean_square"),
            Some(CostVariant::MeanSquare)
        ));
        assert!(matches!(
            parse_cost_variant("MEAN_ABS"),
            Some(CostVariant::MeanAbs)
        ));
        assert!(matches!(
            parse_cost_variant("mean_norm"),
            Some(CostVariant::MeanNorm)
        ));
        assert!(parse_cost_variant("median").is_none());
    }

    #[test]
    fn test_sigmoid_params_split() {
        let sig = SigmoidParams(4.5, 12.0, 6.0, 1.0, 2.0, 6.0);
        assert_eq!(sig.high(), (4.5, 12.0, 6.0));
        assert_eq!(sig.low(), (1.0, 2.0, 6.0));
    }

    #[test]
    fn test_periodicity_serialises_infinity_as_null() {
        let p = Parameters {
            periodicity: f64::INFINITY,
            ..Parameters::default()
        };
        let value = serde_json::to_value(&p).unwrap();
        assert!(value["periodicity"].is_null());

        let back: Parameters = serde_json::from_value(value).unwrap();
        assert!(back.periodicity.is_infinite());
    }
}
