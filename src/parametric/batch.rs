use burn::{data::dataloader::batcher::Batcher, prelude::*, tensor::TensorData};

/// Batcher that turns sample indices into an int tensor
///
/// The dataloader handles shuffling; the batcher only lifts the indices
/// onto the device so the training loop can `select` the matching rows
/// from the pre-built feature tensors.
#[derive(Clone, Default)]
pub struct IndexBatcher;

/// Batch of sample indices
///
/// ### Fields
///
/// * `indices` - Row indices into the feature tensors
#[derive(Clone, Debug)]
pub struct IndexBatch<B: Backend> {
    pub indices: Tensor<B, 1, Int>,
}

impl<B: Backend> Batcher<B, usize, IndexBatch<B>> for IndexBatcher {
    /// Generate a batch
    ///
    /// ### Params
    ///
    /// * `items` - Sample indices picked by the dataloader
    /// * `device` - Device for the index tensor
    ///
    /// ### Returns
    ///
    /// The indices as an int tensor
    fn batch(&self, items: Vec<usize>, device: &B::Device) -> IndexBatch<B> {
        let indices: Vec<i64> = items.iter().map(|&i| i as i64).collect();
        let n = indices.len();

        IndexBatch {
            indices: Tensor::from_data(
                TensorData::new(indices, [n]).convert::<B::IntElem>(),
                device,
            ),
        }
    }
}

///////////
// Tests //
///////////

#[cfg(test)]
mod batch_tests {
    use super::*;
    use burn::backend::ndarray::NdArrayDevice;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_batcher_keeps_order_and_size() {
        let batcher = IndexBatcher;
        let device = NdArrayDevice::Cpu;

        let batch: IndexBatch<TestBackend> = batcher.batch(vec![5, 0, 3], &device);

        assert_eq!(batch.indices.dims()[0], 3);
        let values: Vec<i64> = batch.indices.to_data().to_vec().unwrap();
        assert_eq!(values, vec![5, 0, 3]);
    }

    #[test]
    fn test_batcher_empty_batch() {
        let batcher = IndexBatcher;
        let device = NdArrayDevice::Cpu;

        let batch: IndexBatch<TestBackend> = batcher.batch(vec![], &device);
        assert_eq!(batch.indices.dims()[0], 0);
    }
}
