use burn::data::dataloader::DataLoaderBuilder;
use burn::optim::decay::WeightDecayConfig;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::record::CompactRecorder;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::Element;
use faer::MatRef;
use std::path::Path;
use thousands::Separable;

use crate::error::EncoderMapError;
use crate::params::Parameters;
use crate::parametric::batch::IndexBatcher;
use crate::parametric::dataset::ConformationDataset;
use crate::parametric::model::{Autoencoder, AutoencoderConfig};
use crate::training::{center_cost, distance_cost, reconstruction_cost};

/////////////
// Helpers //
/////////////

/// Data to tensor
///
/// ### Params
///
/// * `data` - The data to transform to the tensor
/// * `device` - The device on which to store the tensor
///
/// ### Returns
///
/// Tensor of the data
pub fn data_to_tensor<T, B>(data: MatRef<T>, device: &B::Device) -> Tensor<B, 2>
where
    T: Element,
    B: Backend,
{
    let n_samples = data.nrows();
    let n_features = data.ncols();
    let data_flat: Vec<T> = (0..n_samples)
        .flat_map(|i| (0..n_features).map(move |j| data[(i, j)]))
        .collect();

    Tensor::<B, 1>::from_floats(&data_flat[..], device).reshape([n_samples, n_features])
}

/// Write a model checkpoint under `main_path/checkpoints`
pub(crate) fn save_checkpoint<B: Backend>(
    model: &Autoencoder<B>,
    main_path: &Path,
    step: usize,
) -> Result<(), EncoderMapError> {
    let dir = main_path.join("checkpoints");
    std::fs::create_dir_all(&dir)?;

    model
        .clone()
        .save_file(dir.join(format!("step{}", step)), &CompactRecorder::new())
        .map_err(|e| EncoderMapError::Checkpoint(e.to_string()))?;

    Ok(())
}

//////////////
// Training //
//////////////

/// Train the plain autoencoder
///
/// Runs exactly `n_steps` optimiser steps over shuffled batches. The loss
/// combines the autoencoding, sketch-map distance and centering terms
/// according to the parameter scales; L2 regularisation enters through the
/// optimiser's weight decay.
///
/// ### Params
///
/// * `data` - Input data matrix (samples × features), wrapped to one
///   periodic window for periodic inputs
/// * `params` - Training parameters
/// * `device` - The device on which to train
/// * `seed` - Seed for batch shuffling
///
/// ### Returns
///
/// The trained model.
pub fn train_autoencoder<B, T>(
    data: MatRef<T>,
    params: &Parameters,
    device: &B::Device,
    seed: u64,
) -> Result<Autoencoder<B>, EncoderMapError>
where
    T: Element,
    B: AutodiffBackend,
{
    let n_samples = data.nrows();
    let n_features = data.ncols();
    if n_samples == 0 {
        return Err(EncoderMapError::InvalidParameter(
            "need at least one training sample".to_string(),
        ));
    }

    let config = AutoencoderConfig::from_params(n_features, params)?;
    let mut model: Autoencoder<B> = config.init(device);
    let mut optim = AdamConfig::new()
        .with_weight_decay(Some(WeightDecayConfig::new(params.l2_reg_constant as f32)))
        .init();

    let tensor_data: Tensor<B, 2> = data_to_tensor(data, device);

    let batch_size = params.batch_size.min(n_samples).max(1);
    let dataloader = DataLoaderBuilder::new(IndexBatcher)
        .batch_size(batch_size)
        .shuffle(seed)
        .num_workers(4)
        .build(ConformationDataset::new(n_samples));

    tracing::info!(
        samples = n_samples,
        features = n_features,
        "training autoencoder for {} steps",
        params.n_steps.separate_with_commas()
    );

    let mut step = 0;
    'training: while step < params.n_steps {
        for batch in dataloader.iter() {
            if step >= params.n_steps {
                break 'training;
            }
            step += 1;

            let feats = tensor_data.clone().select(0, batch.indices.clone());
            let latent = model.encode(feats.clone());
            let output = model.decode(latent.clone());

            let mut loss = center_cost(latent.clone()).mul_scalar(params.center_cost_scale);
            if let Some(scale) = params.auto_cost_scale {
                loss = loss
                    + reconstruction_cost(
                        feats.clone(),
                        output,
                        params.auto_cost_variant,
                        params.periodicity,
                    )
                    .mul_scalar(scale);
            }
            if let Some(scale) = params.distance_cost_scale {
                loss = loss
                    + distance_cost(
                        feats,
                        latent,
                        &params.dist_sig_parameters,
                        params.periodicity,
                    )
                    .mul_scalar(scale);
            }

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(params.learning_rate, model, grads);

            if params.summary_step > 0 && step % params.summary_step == 0 {
                tracing::info!(
                    step,
                    loss = loss.clone().into_scalar().elem::<f64>(),
                    "training summary"
                );
            }
            if params.checkpoint_step > 0 && step % params.checkpoint_step == 0 {
                save_checkpoint(&model, &params.main_path, step)?;
            }
        }
    }

    Ok(model)
}
