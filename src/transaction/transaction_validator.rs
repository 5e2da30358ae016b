use thiserror::Error;

use super::Transaction;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidateError {
    #[error("transfer amount cannot be negative, got {0}")]
    NegativeAmount(f64),
    #[error("sender {0} cannot transfer to themself")]
    SelfTransfer(u32),
}

/// Structural and semantic checks a transaction must pass before it is
/// admitted into a peer's queues, i.e. before any clock or queue mutation
/// happens (validate, then mutate). Covers exactly a negative amount or
/// a self-transfer — an amount of zero is a legal no-op transfer, not an
/// error.
pub struct TransactionValidator;

impl TransactionValidator {
    pub fn validate(tx: &Transaction) -> Result<(), ValidateError> {
        Self::validate_structure(tx)?;
        Self::validate_semantics(tx)
    }

    fn validate_structure(tx: &Transaction) -> Result<(), ValidateError> {
        if tx.amount() < 0.0 {
            return Err(ValidateError::NegativeAmount(tx.amount()));
        }
        Ok(())
    }

    fn validate_semantics(tx: &Transaction) -> Result<(), ValidateError> {
        if tx.sender_id() == tx.recipient_id() {
            return Err(ValidateError::SelfTransfer(tx.sender_id()));
        }
        Ok(())
    }
}
