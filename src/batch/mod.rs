/*!
 * Background batch support.
 *
 * - `failure`: classified chunk failures and the retry policy
 * - `state`: the chunk lifecycle an external scheduler enacts
 * - `processor`: translates a chunk and classifies its first failure
 */

pub use self::failure::{ChunkFailure, FailureKind, RetryDecision, RetryPolicy};
pub use self::processor::{ChunkReport, MtChunkProcessor};
pub use self::state::ChunkState;

pub mod failure;
pub mod processor;
pub mod state;
