use crate::storage::Result;

/// Turns a gradient into a parameter update.
///
/// Implementors keep their state per parameter; one instance lives next to every tensor of the
/// global store and is shared by all the workers' updates.
pub trait Optimizer {
    /// Updates `params` in place following `grad`.
    ///
    /// # Arguments
    /// * `grad` - The gradient of the loss with respect to `params`.
    /// * `params` - The parameters to update.
    ///
    /// # Returns
    /// An error if `grad` and `params` differ in length.
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()>;

    /// The mean of the squared gradient average, for optimizers that keep one.
    fn mean_square(&self) -> Option<f32> {
        None
    }
}
