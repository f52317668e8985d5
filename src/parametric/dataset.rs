use burn::data::dataset::Dataset;
use burn::prelude::*;
use burn::tensor::Element;
use faer::Mat;
use num_traits::Float;

use crate::error::EncoderMapError;
use crate::geometry::{
    batch_bond_angles, batch_dihedrals, batch_pairwise_distances, mean_bond_angles,
    mean_bond_lengths, select_atoms,
};
use crate::params::AdcParameters;

//////////////
// Data set //
//////////////

/// Dataset over conformation indices
///
/// The feature tensors live on the device; the dataset only enumerates row
/// indices for the dataloader to shuffle.
pub struct ConformationDataset {
    n_samples: usize,
}

impl ConformationDataset {
    pub fn new(n_samples: usize) -> Self {
        Self { n_samples }
    }
}

impl Dataset<usize> for ConformationDataset {
    fn get(&self, index: usize) -> Option<usize> {
        (index < self.n_samples).then_some(index)
    }

    fn len(&self) -> usize {
        self.n_samples
    }
}

///////////////////////
// Molecular tensors //
///////////////////////

/// Feature tensors derived from a batch of backbone conformations
///
/// ### Fields
///
/// * `dihedrals` - Backbone torsions, [n_samples, n_atoms - 3]
/// * `angles` - Backbone bond angles, [n_samples, n_atoms - 2]
/// * `cartesian_pwd` - Condensed pairwise distances over the selected
///   atoms, [n_samples, n_pairs]
/// * `mean_lengths` - Per-bond mean length, [n_atoms - 1]
/// * `mean_angles` - Per-angle mean value, [n_atoms - 2]
/// * `pwd_selection` - Atom indices behind the pairwise distance columns
/// * `n_samples` - Number of conformations
/// * `n_atoms` - Atoms per conformation
pub struct MolecularTrainingData<B: Backend> {
    pub dihedrals: Tensor<B, 2>,
    pub angles: Tensor<B, 2>,
    pub cartesian_pwd: Tensor<B, 2>,
    pub mean_lengths: Tensor<B, 1>,
    pub mean_angles: Tensor<B, 1>,
    pub pwd_selection: Vec<usize>,
    pub n_samples: usize,
    pub n_atoms: usize,
}

impl<B: Backend> MolecularTrainingData<B> {
    /// Extract training tensors from backbone cartesians
    ///
    /// ### Params
    ///
    /// * `cartesians` - One (n_atoms, 3) coordinate matrix per conformation
    /// * `params` - ADC parameters holding the pairwise distance selection
    /// * `device` - Device for the tensors
    ///
    /// ### Returns
    ///
    /// The assembled feature tensors, or an error for an empty batch,
    /// mismatched atom counts or a chain too short for torsions.
    pub fn from_cartesians<T>(
        cartesians: &[Mat<T>],
        params: &AdcParameters,
        device: &B::Device,
    ) -> Result<Self, EncoderMapError>
    where
        T: Float + Element + Send + Sync,
    {
        let n_samples = cartesians.len();
        if n_samples == 0 {
            return Err(EncoderMapError::InvalidParameter(
                "need at least one conformation".to_string(),
            ));
        }

        let n_atoms = cartesians[0].nrows();
        if n_atoms < 4 {
            return Err(EncoderMapError::InvalidParameter(format!(
                "need at least 4 backbone atoms for torsions, got {}",
                n_atoms
            )));
        }
        if cartesians.iter().any(|m| m.nrows() != n_atoms) {
            return Err(EncoderMapError::InvalidParameter(
                "all conformations must have the same number of atoms".to_string(),
            ));
        }

        let pwd_selection = select_atoms(
            n_atoms,
            params.cartesian_pwd_start,
            params.cartesian_pwd_stop,
            params.cartesian_pwd_step,
        );
        if pwd_selection.len() < 2 {
            return Err(EncoderMapError::InvalidParameter(
                "pairwise distance selection needs at least 2 atoms".to_string(),
            ));
        }

        let dihedrals = rows_to_tensor(&batch_dihedrals(cartesians), device);
        let angles = rows_to_tensor(&batch_bond_angles(cartesians), device);
        let cartesian_pwd =
            rows_to_tensor(&batch_pairwise_distances(cartesians, &pwd_selection), device);

        let mean_lengths = vec_to_tensor(&mean_bond_lengths(cartesians), device);
        let mean_angles = vec_to_tensor(&mean_bond_angles(cartesians), device);

        Ok(Self {
            dihedrals,
            angles,
            cartesian_pwd,
            mean_lengths,
            mean_angles,
            pwd_selection,
            n_samples,
            n_atoms,
        })
    }

    /// Network input tensor
    ///
    /// ### Params
    ///
    /// * `use_backbone_angles` - Concatenate angles in front of the
    ///   dihedrals (`true`) or feed dihedrals only (`false`)
    ///
    /// ### Returns
    ///
    /// Tensor of [n_samples, n_inputs]
    pub fn inputs(&self, use_backbone_angles: bool) -> Tensor<B, 2> {
        if use_backbone_angles {
            Tensor::cat(vec![self.angles.clone(), self.dihedrals.clone()], 1)
        } else {
            self.dihedrals.clone()
        }
    }

    /// Number of bond angles per conformation
    pub fn n_angles(&self) -> usize {
        self.n_atoms - 2
    }

    /// Number of torsions per conformation
    pub fn n_dihedrals(&self) -> usize {
        self.n_atoms - 3
    }
}

/////////////
// Helpers //
/////////////

/// Stack per-conformation rows into a [n_samples, n_features] tensor
fn rows_to_tensor<T, B>(rows: &[Vec<T>], device: &B::Device) -> Tensor<B, 2>
where
    T: Element,
    B: Backend,
{
    let n_rows = rows.len();
    let n_cols = rows.first().map(|r| r.len()).unwrap_or(0);
    let flat: Vec<T> = rows.iter().flat_map(|r| r.iter().copied()).collect();

    Tensor::<B, 1>::from_floats(&flat[..], device).reshape([n_rows, n_cols])
}

/// Lift a vector onto the device
fn vec_to_tensor<T, B>(values: &[T], device: &B::Device) -> Tensor<B, 1>
where
    T: Element,
    B: Backend,
{
    Tensor::<B, 1>::from_floats(values, device)
}

///////////
// Tests //
///////////
