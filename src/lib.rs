#![allow(clippy::needless_range_loop)]

pub mod error;
pub mod geometry;
mod macros;
pub mod params;
pub mod parametric;
pub mod prelude;
pub mod training;

use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::Element;
use faer::{Mat, MatRef};
use num_traits::Float;

use crate::error::EncoderMapError;
use crate::params::{AdcParameters, Parameters};
use crate::parametric::dataset::MolecularTrainingData;
use crate::parametric::model::Autoencoder;
use crate::parametric::reconstruct::reconstruct_cartesians;
use crate::training::adc_train::train_adc_autoencoder;
use crate::training::train::{data_to_tensor, train_autoencoder};

/////////////
// Helpers //
/////////////

/// Convert a [n_samples, n_dims] tensor into per-dimension columns
///
/// ### Params
///
/// * `tensor` - The tensor to convert
///
/// ### Returns
///
/// `Vec<Vec<f32>>` where the outer vector has length `n_dims` and each
/// inner vector holds one coordinate for all samples.
fn tensor_to_columns<B: Backend>(tensor: Tensor<B, 2>) -> Vec<Vec<f32>> {
    let [n_samples, n_dims] = tensor.dims();
    let flat: Vec<f32> = tensor.into_data().convert::<f32>().to_vec().unwrap();

    let mut result = vec![vec![0.0f32; n_samples]; n_dims];
    for i in 0..n_samples {
        for j in 0..n_dims {
            result[j][i] = flat[i * n_dims + j];
        }
    }

    result
}

/// Convert a [n_samples, n_atoms, 3] tensor into per-sample coordinate
/// matrices
fn tensor_to_mats<B: Backend>(tensor: Tensor<B, 3>) -> Vec<Mat<f32>> {
    let [n_samples, n_atoms, _] = tensor.dims();
    let flat: Vec<f32> = tensor.into_data().convert::<f32>().to_vec().unwrap();

    (0..n_samples)
        .map(|s| Mat::from_fn(n_atoms, 3, |i, j| flat[s * n_atoms * 3 + i * 3 + j]))
        .collect()
}

////////////////
// EncoderMap //
////////////////

/// A trained autoencoder for fixed-size conformational features
///
/// Obtained from [`train_encodermap`]. Wraps the model together with its
/// parameters so projections and generation use consistent settings.
pub struct EncoderMap<B: AutodiffBackend> {
    model: Autoencoder<B>,
    params: Parameters,
    device: B::Device,
}

impl<B: AutodiffBackend> EncoderMap<B> {
    /// Project data into the latent space
    ///
    /// ### Params
    ///
    /// * `data` - Input data matrix (samples × features)
    ///
    /// ### Returns
    ///
    /// Latent coordinates as `Vec<Vec<f32>>` where the outer vector has
    /// length `n_latent` and inner vectors have length `n_samples`.
    pub fn encode<T: Element>(&self, data: MatRef<T>) -> Vec<Vec<f32>> {
        let tensor: Tensor<B, 2> = data_to_tensor(data, &self.device);
        tensor_to_columns(self.model.encode(tensor))
    }

    /// Decode latent points back into the input space
    ///
    /// ### Params
    ///
    /// * `latent` - Latent coordinates (samples × n_latent)
    ///
    /// ### Returns
    ///
    /// Generated feature values, `[n_features][n_samples]`
    pub fn generate<T: Element>(&self, latent: MatRef<T>) -> Vec<Vec<f32>> {
        let tensor: Tensor<B, 2> = data_to_tensor(latent, &self.device);
        tensor_to_columns(self.model.decode(tensor))
    }

    /// The parameters the model was trained with
    pub fn params(&self) -> &Parameters {
        &self.params
    }

    /// The underlying model
    pub fn model(&self) -> &Autoencoder<B> {
        &self.model
    }
}

/// Train an autoencoder on conformational feature vectors
///
/// The loss combines a sketch-map style sigmoid distance matching term, a
/// (periodic) reconstruction term and a latent centering term, weighted by
/// the parameter scales.
///
/// ### Params
///
/// * `data` - Input data matrix (samples × features). Periodic data must be
///   wrapped to one periodic window.
/// * `params` - Training parameters.
/// * `device` - The device on which to train.
/// * `seed` - Seed for batch shuffling.
///
/// ### Returns
///
/// The trained [`EncoderMap`].
///
/// ### Example
///
/// ```ignore
/// use burn::backend::ndarray::{NdArray, NdArrayDevice};
/// use burn::backend::Autodiff;
/// use faer::Mat;
///
/// let data = Mat::from_fn(1000, 24, |_, _| rand::random::<f64>());
/// let params = Parameters::default();
/// let em = train_encodermap::<f64, Autodiff<NdArray<f64>>>(
///     data.as_ref(),
///     &params,
///     &NdArrayDevice::Cpu,
///     42,
/// )?;
/// let latent = em.encode(data.as_ref());
/// ```
pub fn train_encodermap<T, B>(
    data: MatRef<T>,
    params: &Parameters,
    device: &B::Device,
    seed: u64,
) -> Result<EncoderMap<B>, EncoderMapError>
where
    T: Element,
    B: AutodiffBackend,
{
    let model = train_autoencoder::<B, T>(data, params, device, seed)?;

    Ok(EncoderMap {
        model,
        params: params.clone(),
        device: device.clone(),
    })
}

////////////////////
// ADC EncoderMap //
////////////////////

/// A trained angle/dihedral/cartesian autoencoder
///
/// Obtained from [`train_adc`]. Keeps the batch-mean bond geometry so new
/// conformations can be generated from latent points.
pub struct AdcEncoderMap<B: AutodiffBackend> {
    model: Autoencoder<B>,
    params: AdcParameters,
    mean_lengths: Tensor<B, 1>,
    mean_angles: Tensor<B, 1>,
    n_atoms: usize,
    device: B::Device,
}

impl<B: AutodiffBackend> AdcEncoderMap<B> {
    /// Project conformations into the latent space
    ///
    /// Extracts torsions (and bond angles when they are learned) from the
    /// cartesians and encodes them.
    ///
    /// ### Params
    ///
    /// * `cartesians` - One (n_atoms, 3) coordinate matrix per conformation
    ///
    /// ### Returns
    ///
    /// Latent coordinates, `[n_latent][n_samples]`
    pub fn encode<T>(&self, cartesians: &[Mat<T>]) -> Result<Vec<Vec<f32>>, EncoderMapError>
    where
        T: Float + Element + Send + Sync,
    {
        let moldata: MolecularTrainingData<B> =
            MolecularTrainingData::from_cartesians(cartesians, &self.params, &self.device)?;
        let latent = self
            .model
            .encode(moldata.inputs(self.params.use_backbone_angles));

        Ok(tensor_to_columns(latent))
    }

    /// Generate backbone conformations from latent points
    ///
    /// Decodes the latent points into torsions (and bond angles when they
    /// are learned) and rebuilds cartesians with the training-set mean bond
    /// geometry.
    ///
    /// ### Params
    ///
    /// * `latent` - Latent coordinates (samples × n_latent)
    ///
    /// ### Returns
    ///
    /// One (n_atoms, 3) coordinate matrix per latent point
    pub fn generate<T: Element>(&self, latent: MatRef<T>) -> Vec<Mat<f32>> {
        let n_angles = self.n_atoms - 2;

        let tensor: Tensor<B, 2> = data_to_tensor(latent, &self.device);
        let output = self.model.decode(tensor);
        let [b, n_outputs] = output.dims();

        let (angles, dihedrals) = if self.params.use_backbone_angles {
            (
                output.clone().slice([0..b, 0..n_angles]),
                output.slice([0..b, n_angles..n_outputs]),
            )
        } else {
            (
                self.mean_angles.clone().unsqueeze::<2>().repeat_dim(0, b),
                output,
            )
        };
        let lengths = self.mean_lengths.clone().unsqueeze::<2>().repeat_dim(0, b);

        tensor_to_mats(reconstruct_cartesians(lengths, angles, dihedrals))
    }

    /// The parameters the model was trained with
    pub fn params(&self) -> &AdcParameters {
        &self.params
    }

    /// The underlying model
    pub fn model(&self) -> &Autoencoder<B> {
        &self.model
    }
}

/// Train an angle/dihedral/cartesian autoencoder on backbone conformations
///
/// Extracts backbone internal coordinates and pairwise distances from the
/// cartesians, trains the autoencoder on torsions (plus bond angles when
/// `use_backbone_angles` is set) and scores the decoder through the
/// differentiable chain reconstruction.
///
/// ### Params
///
/// * `cartesians` - One (n_atoms, 3) coordinate matrix per conformation
/// * `params` - ADC training parameters
/// * `device` - The device on which to train
/// * `seed` - Seed for batch shuffling
///
/// ### Returns
///
/// The trained [`AdcEncoderMap`].
pub fn train_adc<T, B>(
    cartesians: &[Mat<T>],
    params: &AdcParameters,
    device: &B::Device,
    seed: u64,
) -> Result<AdcEncoderMap<B>, EncoderMapError>
where
    T: Float + Element + Send + Sync,
    B: AutodiffBackend,
{
    let moldata: MolecularTrainingData<B> =
        MolecularTrainingData::from_cartesians(cartesians, params, device)?;
    let model = train_adc_autoencoder(&moldata, params, device, seed)?;

    Ok(AdcEncoderMap {
        model,
        params: params.clone(),
        mean_lengths: moldata.mean_lengths,
        mean_angles: moldata.mean_angles,
        n_atoms: moldata.n_atoms,
        device: device.clone(),
    })
}
