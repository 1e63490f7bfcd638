//! Crate-level error for callers that mix modules.

use thiserror::Error;

use crate::cancel::CancelError;
use crate::config::ConfigError;
use crate::reconcile::ReconcileError;
use crate::remote::RemoteError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Cancel(#[from] CancelError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    fn reconcile() -> Result<()> {
        Err(ReconcileError::IdentityCollision {
            identity: "7".to_string(),
        })?;
        Ok(())
    }

    #[test]
    fn module_errors_convert_with_question_mark() {
        let err = reconcile().unwrap_err();
        assert!(matches!(err, Error::Reconcile(_)));
        assert!(err.to_string().contains('7'));
    }
}
