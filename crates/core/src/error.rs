use thiserror::Error;

use crate::analysis::CalcError;
use crate::model::PhaseError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Phase(#[from] PhaseError),
    #[error(transparent)]
    Calc(#[from] CalcError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
