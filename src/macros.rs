///////////////////
// Vector macros //
///////////////////

/// Assertion that all slice-like arguments have the same length.
///
/// Used to catch mismatched atom-name lists and coordinate matrices before
/// any geometry is computed.
#[macro_export]
macro_rules! assert_same_len {
    ($($vec:expr),+ $(,)?) => {
        {
            let lengths: Vec<usize> = vec![$($vec.len()),+];
            let first_len = lengths[0];

            if !lengths.iter().all(|&len| len == first_len) {
                panic!(
                    "Length mismatch between inputs: {:?}",
                    lengths
                );
            }
        }
    };
}
