pub use crate::error::{EmResult, EncoderMapError};
pub use crate::geometry::backbone::{guess_amide_h, guess_amide_o};
pub use crate::params::io::{run_path, ParamsIo};
pub use crate::params::{AdcParameters, CostVariant, Parameters, SigmoidParams};
pub use crate::{train_adc, train_encodermap, AdcEncoderMap, EncoderMap};
