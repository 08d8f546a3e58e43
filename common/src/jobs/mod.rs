use serde::{Deserialize, Serialize};

/// Lifecycle of a single batch run over an uploaded file.
///
/// A processor starts `Idle`, moves to `Processing` when `run` is called and
/// ends in either `Completed` or `Failed`. It never leaves a terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchState {
    Idle,
    Processing,
    Completed,
    Failed,
}
