use crate::error::Result;

/// The worker's side of the parameter synchronization protocol.
///
/// Every update cycle performs exactly one `pull` before the rollout and exactly one `push`
/// after the returns are computed.
#[trait_variant::make(SyncClient: Send)]
pub trait SyncClientTemplate {
    /// Overwrites every local parameter with the current global value.
    ///
    /// # Arguments
    /// * `local` - The worker's private parameter buffer.
    ///
    /// # Returns
    /// An error if the global parameters can't be fetched or their size differs from `local`.
    async fn pull(&mut self, local: &mut [f32]) -> Result<()>;

    /// Forwards a locally computed gradient to the global store.
    ///
    /// # Arguments
    /// * `grad` - The gradient, laid out as the global parameters.
    async fn push(&mut self, grad: &[f32]) -> Result<()>;

    /// Requests a copy of the global parameters for checkpointing.
    ///
    /// # Returns
    /// The global update count together with the parameters.
    async fn snapshot(&mut self) -> Result<(u64, Vec<f32>)>;

    /// Requests the shared optimizer's statistics for monitoring.
    ///
    /// # Returns
    /// Every tensor name paired with the mean of its squared gradient average, empty when the
    /// optimizer keeps none.
    async fn optimizer_stats(&mut self) -> Result<Vec<(String, f32)>>;

    /// Ends the session with the global store.
    async fn disconnect(&mut self) -> Result<()>;
}
