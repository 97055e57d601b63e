//! # Service Module
//!
//! Operations exposed to the presentation layer and the replenishment
//! notifier.
//!
//! - [`order::OrderService`] - Transactional order operations
//! - [`replenishment::ReplenishmentQuery`] - Low stock and supplier coverage

use tracing::{error, warn};

use crate::error::{ServiceError, ServiceResult};

pub mod order;
pub mod replenishment;

/// Logs a failed operation at the level its kind deserves and passes the
/// result through.
fn logged<T>(operation: &'static str, result: ServiceResult<T>) -> ServiceResult<T> {
    match &result {
        Err(ServiceError::Rule(rule)) => warn!(operation, error = %rule, "Operation rejected"),
        Err(ServiceError::Storage(storage)) => error!(operation, error = %storage, "Operation failed"),
        Ok(_) => {}
    }
    result
}
