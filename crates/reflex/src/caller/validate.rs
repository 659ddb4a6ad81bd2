//! Signature checks run before a callable executes

use reflex_types::{Type, Value};

use crate::error::{ConventionViolation, Result};

/// A check on a callable's signature, run before the callable executes.
///
/// A rejected callable is never invoked.
pub trait FuncValidator: Sync {
    /// Accept or reject `func`, a non-nil function value
    fn validate(&self, func: &Value) -> Result<()>;
}

/// A single signature check
pub type ValidateFn = fn(&Value) -> Result<()>;

/// Runs each check in order and stops at the first rejection
#[derive(Clone, Copy)]
pub struct ChainValidator(pub &'static [ValidateFn]);

impl FuncValidator for ChainValidator {
    fn validate(&self, func: &Value) -> Result<()> {
        self.0.iter().try_for_each(|check| check(func))
    }
}

/// Accepts every callable
pub const DONT_VALIDATE: ChainValidator = ChainValidator(&[]);

/// Accepts callables returning `T` or `(T, error)`
pub const VALIDATE_PROVIDER: ChainValidator = ChainValidator(&[validate_provider as ValidateFn]);

/// Accepts callables returning exactly one value
pub const VALIDATE_WITHER: ChainValidator = ChainValidator(&[validate_wither as ValidateFn]);

fn validate_provider(func: &Value) -> Result<()> {
    let results = results_of(func);
    match results {
        [_] => Ok(()),
        [_, second] if second.implements(&Type::error()) => Ok(()),
        [_, second] => Err(ConventionViolation::ProviderSecondResult(second.to_string()).into()),
        _ => Err(ConventionViolation::ProviderArity(results.len()).into()),
    }
}

fn validate_wither(func: &Value) -> Result<()> {
    match results_of(func).len() {
        1 => Ok(()),
        n => Err(ConventionViolation::WitherArity(n).into()),
    }
}

fn results_of(func: &Value) -> &[Type] {
    func.ty().signature().map(|sig| sig.results()).unwrap_or(&[])
}
