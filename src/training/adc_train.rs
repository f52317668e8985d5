use burn::data::dataloader::DataLoaderBuilder;
use burn::optim::decay::WeightDecayConfig;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use thousands::Separable;

use crate::error::EncoderMapError;
use crate::params::AdcParameters;
use crate::parametric::batch::IndexBatcher;
use crate::parametric::dataset::{ConformationDataset, MolecularTrainingData};
use crate::parametric::model::{Autoencoder, AutoencoderConfig};
use crate::parametric::reconstruct::{reconstruct_cartesians, selected_pairwise_dists};
use crate::training::train::save_checkpoint;
use crate::training::{center_cost, distance_cost, reconstruction_cost, soft_start_scale};

//////////////
// Training //
//////////////

/// Train the angle/dihedral/cartesian autoencoder
///
/// The network autoencodes backbone torsions (plus bond angles when
/// `use_backbone_angles` is set). Cartesian terms are computed on chains
/// rebuilt from the decoder outputs with the batch-mean bond geometry, so
/// their gradients flow through the chain reconstruction.
///
/// ### Params
///
/// * `moldata` - Feature tensors extracted from the conformations
/// * `params` - ADC training parameters
/// * `device` - The device on which to train
/// * `seed` - Seed for batch shuffling
///
/// ### Returns
///
/// The trained model.
pub fn train_adc_autoencoder<B>(
    moldata: &MolecularTrainingData<B>,
    params: &AdcParameters,
    device: &B::Device,
    seed: u64,
) -> Result<Autoencoder<B>, EncoderMapError>
where
    B: AutodiffBackend,
{
    let inputs = moldata.inputs(params.use_backbone_angles);
    let [n_samples, n_inputs] = inputs.dims();
    let n_angles = moldata.n_angles();
    let periodicity = params.core.periodicity;

    let config = AutoencoderConfig::from_params(n_inputs, &params.core)?;
    let mut model: Autoencoder<B> = config.init(device);
    let mut optim = AdamConfig::new()
        .with_weight_decay(Some(WeightDecayConfig::new(
            params.core.l2_reg_constant as f32,
        )))
        .init();

    let batch_size = params.core.batch_size.min(n_samples).max(1);
    let dataloader = DataLoaderBuilder::new(IndexBatcher)
        .batch_size(batch_size)
        .shuffle(seed)
        .num_workers(4)
        .build(ConformationDataset::new(n_samples));

    tracing::info!(
        samples = n_samples,
        atoms = moldata.n_atoms,
        backbone_angles = params.use_backbone_angles,
        "training ADC autoencoder for {} steps",
        params.core.n_steps.separate_with_commas()
    );

    let mut step = 0;
    'training: while step < params.core.n_steps {
        for batch in dataloader.iter() {
            if step >= params.core.n_steps {
                break 'training;
            }
            step += 1;

            let in_batch = inputs.clone().select(0, batch.indices.clone());
            let pwd_batch = moldata
                .cartesian_pwd
                .clone()
                .select(0, batch.indices.clone());
            let b = in_batch.dims()[0];

            let latent = model.encode(in_batch.clone());
            let output = model.decode(latent.clone());

            // decoder output layout matches the input layout
            let (out_angles, out_dihedrals) = if params.use_backbone_angles {
                (
                    Some(output.clone().slice([0..b, 0..n_angles])),
                    output.clone().slice([0..b, n_angles..n_inputs]),
                )
            } else {
                (None, output.clone())
            };

            let mut loss = center_cost(latent.clone()).mul_scalar(params.core.center_cost_scale);

            if params.dihedral_cost_scale != 0.0 {
                let in_dihedrals = if params.use_backbone_angles {
                    in_batch.clone().slice([0..b, n_angles..n_inputs])
                } else {
                    in_batch.clone()
                };
                loss = loss
                    + reconstruction_cost(
                        in_dihedrals,
                        out_dihedrals.clone(),
                        params.dihedral_cost_variant,
                        periodicity,
                    )
                    .mul_scalar(params.dihedral_cost_scale / params.dihedral_cost_reference);
            }

            if let Some(ref angles) = out_angles {
                if params.angle_cost_scale != 0.0 {
                    let in_angles = in_batch.clone().slice([0..b, 0..n_angles]);
                    // bond angles live in [0, π] and are not periodic
                    loss = loss
                        + reconstruction_cost(
                            in_angles,
                            angles.clone(),
                            params.angle_cost_variant,
                            f64::INFINITY,
                        )
                        .mul_scalar(params.angle_cost_scale / params.angle_cost_reference);
                }
            }

            let cartesian_scale = soft_start_scale(
                params.cartesian_cost_scale,
                params.cartesian_cost_scale_soft_start,
                step,
            );
            if cartesian_scale != 0.0 {
                let lengths = moldata
                    .mean_lengths
                    .clone()
                    .unsqueeze::<2>()
                    .repeat_dim(0, b);
                let recon_angles = match &out_angles {
                    Some(angles) => angles.clone(),
                    None => moldata.mean_angles.clone().unsqueeze::<2>().repeat_dim(0, b),
                };
                let cartesians =
                    reconstruct_cartesians(lengths, recon_angles, out_dihedrals.clone());
                let recon_pwd = selected_pairwise_dists(cartesians, &moldata.pwd_selection);

                loss = loss
                    + reconstruction_cost(
                        pwd_batch.clone(),
                        recon_pwd,
                        params.cartesian_cost_variant,
                        f64::INFINITY,
                    )
                    .mul_scalar(cartesian_scale / params.cartesian_cost_reference);
            }

            if params.cartesian_distance_cost_scale != 0.0 {
                loss = loss
                    + distance_cost(
                        pwd_batch,
                        latent.clone(),
                        &params.cartesian_dist_sig_parameters,
                        f64::INFINITY,
                    )
                    .mul_scalar(params.cartesian_distance_cost_scale);
            }

            if let Some(scale) = params.core.auto_cost_scale {
                loss = loss
                    + reconstruction_cost(
                        in_batch.clone(),
                        output.clone(),
                        params.core.auto_cost_variant,
                        periodicity,
                    )
                    .mul_scalar(scale);
            }
            if let Some(scale) = params.core.distance_cost_scale {
                loss = loss
                    + distance_cost(
                        in_batch.clone(),
                        latent.clone(),
                        &params.core.dist_sig_parameters,
                        periodicity,
                    )
                    .mul_scalar(scale);
            }

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(params.core.learning_rate, model, grads);

            if params.core.summary_step > 0 && step % params.core.summary_step == 0 {
                tracing::info!(
                    step,
                    loss = loss.clone().into_scalar().elem::<f64>(),
                    cartesian_scale,
                    "training summary"
                );
            }
            if params.core.checkpoint_step > 0 && step % params.core.checkpoint_step == 0 {
                save_checkpoint(&model, &params.core.main_path, step)?;
            }
        }
    }

    Ok(model)
}
