//! Block source trait definition.

use async_trait::async_trait;
use pulse_core::BlockRecord;

use crate::error::SampleError;

/// A source of recent block records.
///
/// The sampler calls [`recent_blocks`](BlockSource::recent_blocks) once per
/// period and treats the returned records as one observation window.
///
/// # Implementors
///
/// - `MultiversxClient` (in `pulse-sources`) - reads `/blocks` from the
///   MultiversX API
///
/// # Example
///
/// ```ignore
/// use pulse_sampler::{BlockSource, SampleError};
/// use pulse_core::BlockRecord;
///
/// struct FixedSource(Vec<BlockRecord>);
///
/// #[async_trait]
/// impl BlockSource for FixedSource {
///     async fn recent_blocks(&self) -> Result<Vec<BlockRecord>, SampleError> {
///         Ok(self.0.clone())
///     }
///
///     fn name(&self) -> &str {
///         "fixed"
///     }
/// }
/// ```
#[async_trait]
pub trait BlockSource: Send + Sync {
    /// Returns the most recent block records, in any order.
    async fn recent_blocks(&self) -> Result<Vec<BlockRecord>, SampleError>;

    /// Returns the name of this source, used in logs.
    fn name(&self) -> &str;
}
