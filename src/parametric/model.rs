use burn::module::Ignored;
use burn::prelude::*;
use burn::tensor::activation;
use nn::{Linear, LinearConfig};
use serde::{Deserialize, Serialize};

use crate::error::EncoderMapError;
use crate::params::Parameters;

/////////////////
// Activations //
/////////////////

/// Per-layer activation function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    /// No activation
    Linear,
    Relu,
    Tanh,
    Sigmoid,
}

/// Parse an activation function name
///
/// ### Params
///
/// * `s` - One of `""`, `"relu"`, `"tanh"`, `"sigmoid"` (case-insensitive)
///
/// ### Returns
///
/// The parsed activation, or `None` for unknown names
pub fn parse_activation(s: &str) -> Option<Activation> {
    match s.to_lowercase().as_str() {
        "" => Some(Activation::Linear),
        "relu" => Some(Activation::Relu),
        "tanh" => Some(Activation::Tanh),
        "sigmoid" => Some(Activation::Sigmoid),
        _ => None,
    }
}

impl Activation {
    /// Apply the activation to a tensor
    pub fn forward<B: Backend>(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        match self {
            Activation::Linear => x,
            Activation::Relu => activation::relu(x),
            Activation::Tanh => x.tanh(),
            Activation::Sigmoid => activation::sigmoid(x),
        }
    }
}

//////////////////
// Model config //
//////////////////

/// Configuration structure for creating an `Autoencoder`.
///
/// ### Fields
///
/// * `input_size` - Number of input features.
/// * `n_neurons` - Encoder layer widths up to and including the bottleneck.
/// * `encoder_activations` - One activation per encoder layer.
/// * `decoder_activations` - One activation per decoder layer.
#[derive(Config, Debug)]
pub struct AutoencoderConfig {
    pub input_size: usize,
    pub n_neurons: Vec<usize>,
    pub encoder_activations: Vec<Activation>,
    pub decoder_activations: Vec<Activation>,
}

impl AutoencoderConfig {
    /// Build a configuration from a parameter object
    ///
    /// Splits `activation_functions` into the encoder part (entries starting
    /// with the second element) and the decoder part (the reversed list
    /// starting with the second element from the back), as documented on
    /// [`Parameters::activation_functions`].
    ///
    /// ### Params
    ///
    /// * `input_size` - Number of input features.
    /// * `params` - The parameter object holding `n_neurons` and
    ///   `activation_functions`.
    ///
    /// ### Returns
    ///
    /// A validated configuration, or an error for an empty layer list,
    /// mismatched list lengths or unknown activation names.
    pub fn from_params(input_size: usize, params: &Parameters) -> Result<Self, EncoderMapError> {
        if params.n_neurons.is_empty() {
            return Err(EncoderMapError::InvalidParameter(
                "n_neurons must name at least the bottleneck layer".to_string(),
            ));
        }
        if params.activation_functions.len() != params.n_neurons.len() + 1 {
            return Err(EncoderMapError::InvalidParameter(format!(
                "expected {} activation functions for {} layers, got {}",
                params.n_neurons.len() + 1,
                params.n_neurons.len(),
                params.activation_functions.len()
            )));
        }

        let parsed: Vec<Activation> = params
            .activation_functions
            .iter()
            .map(|name| {
                parse_activation(name).ok_or_else(|| {
                    EncoderMapError::InvalidParameter(format!(
                        "unknown activation function \"{}\"",
                        name
                    ))
                })
            })
            .collect::<Result<_, _>>()?;

        let n_layers = params.n_neurons.len();
        let encoder_activations = parsed[1..].to_vec();
        let decoder_activations: Vec<Activation> =
            parsed[..n_layers].iter().rev().copied().collect();

        Ok(Self {
            input_size,
            n_neurons: params.n_neurons.clone(),
            encoder_activations,
            decoder_activations,
        })
    }

    /// Initialise the model
    ///
    /// ### Params
    ///
    /// * `device` - The device on which to run the model
    ///
    /// ### Returns
    ///
    /// Initialised model
    pub fn init<B: Backend>(&self, device: &B::Device) -> Autoencoder<B> {
        Autoencoder::new(self, device)
    }
}

///////////
// Model //
///////////

/// Mirrored encoder/decoder MLP
///
/// The encoder runs `input_size -> n_neurons[0] -> ... -> bottleneck`, the
/// decoder mirrors the hidden widths back out to `input_size`.
///
/// ### Fields
///
/// * `encoder` - Encoder linear layers
/// * `decoder` - Decoder linear layers
/// * `encoder_acts` - Activation applied after each encoder layer
/// * `decoder_acts` - Activation applied after each decoder layer
#[derive(Module, Debug)]
pub struct Autoencoder<B: Backend> {
    encoder: Vec<Linear<B>>,
    decoder: Vec<Linear<B>>,
    encoder_acts: Ignored<Vec<Activation>>,
    decoder_acts: Ignored<Vec<Activation>>,
}

impl<B: Backend> Autoencoder<B> {
    /// Generate a new model based on an AutoencoderConfig
    ///
    /// ### Params
    ///
    /// * `config` - The configuration with the model specifications
    /// * `device` - The device on which to put the model
    ///
    /// ### Returns
    ///
    /// Initialised Autoencoder model.
    pub fn new(config: &AutoencoderConfig, device: &Device<B>) -> Autoencoder<B> {
        let mut encoder = Vec::with_capacity(config.n_neurons.len());
        let mut input_size = config.input_size;

        for &width in &config.n_neurons {
            encoder.push(
                LinearConfig::new(input_size, width)
                    .with_bias(true)
                    .init(device),
            );
            input_size = width;
        }

        // decoder mirrors the hidden widths and ends at the input size
        let mut decoder = Vec::with_capacity(config.n_neurons.len());
        let mut widths: Vec<usize> = config.n_neurons[..config.n_neurons.len() - 1]
            .iter()
            .rev()
            .copied()
            .collect();
        widths.push(config.input_size);

        for &width in &widths {
            decoder.push(
                LinearConfig::new(input_size, width)
                    .with_bias(true)
                    .init(device),
            );
            input_size = width;
        }

        Self {
            encoder,
            decoder,
            encoder_acts: Ignored(config.encoder_activations.clone()),
            decoder_acts: Ignored(config.decoder_activations.clone()),
        }
    }

    /// Encode inputs into the latent space
    ///
    /// ### Params
    ///
    /// * `input` - Tensor of [batch_size, input_size]
    ///
    /// ### Returns
    ///
    /// Tensor of [batch_size, n_latent]
    pub fn encode(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut x = input;
        for (layer, act) in self.encoder.iter().zip(self.encoder_acts.iter()) {
            x = act.forward(layer.forward(x));
        }
        x
    }

    /// Decode latent points back into the input space
    ///
    /// ### Params
    ///
    /// * `latent` - Tensor of [batch_size, n_latent]
    ///
    /// ### Returns
    ///
    /// Tensor of [batch_size, input_size]
    pub fn decode(&self, latent: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut x = latent;
        for (layer, act) in self.decoder.iter().zip(self.decoder_acts.iter()) {
            x = act.forward(layer.forward(x));
        }
        x
    }

    /// Full forward pass: encode then decode
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        self.decode(self.encode(input))
    }
}

///////////
// Tests //
///////////
