//! The fixed-point driver (§4.5): alternates `eval`/`quote` until a pass
//! produces no new rewrite, or gives up after a configurable iteration
//! cap and reports it as a recoverable `OptimizeError` — mirroring the
//! teacher's own `Error::ExecFuelExhausted` for its own open-ended pass
//! (see `DESIGN.md`).

use std::rc::Rc;

use backend_ir::BackendExpr;

use crate::env::Env;
use crate::eval::eval;
use crate::quote::{quote, Ctx};

/// The one tunable knob the core's fixed-point loop needs (§10.3). The
/// floor of 16 matches §5's "hard iteration cap (≥ 16 suggested)".
#[derive(Clone, Copy, Debug)]
pub struct OptimizeConfig {
    max_iterations: u32,
}

impl OptimizeConfig {
    pub const MIN_ITERATIONS: u32 = 16;
    const DEFAULT_ITERATIONS: u32 = 100;

    /// Constructs a config, raising `max_iterations` to `MIN_ITERATIONS`
    /// if given a smaller value.
    pub fn new(max_iterations: u32) -> Self {
        OptimizeConfig {
            max_iterations: max_iterations.max(Self::MIN_ITERATIONS),
        }
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }
}

impl Default for OptimizeConfig {
    fn default() -> Self {
        OptimizeConfig {
            max_iterations: Self::DEFAULT_ITERATIONS,
        }
    }
}

/// Recoverable errors the core itself can raise (§7, §10.1). Every other
/// degenerate input is preserved as a neutral and emitted verbatim; this
/// is the one condition where a well-formed-but-pathological input can
/// make the core decline to finish.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OptimizeError {
    #[error("optimizing `{binding}` did not reach a fixed point within {limit} iterations")]
    IterationLimitExceeded { binding: String, limit: u32 },
}

/// Runs `eval`/`quote` to a fixed point (§4.5): `expr' = quote(ctx, eval(env, expr))`,
/// repeated until the top-level node is an `ExprSyntax` whose analysis's
/// `rewrite` flag is clear. Every pass re-interprets `current` against the
/// same zero-local `env` from scratch, so `ctx`'s level counter is reset to
/// zero at the start of each pass too — otherwise the level numbers `quote`
/// allocates would drift out of sync with `env.next_level()`'s expectations
/// on the second and subsequent passes.
///
/// `binding` names the binding being optimized, purely for diagnostics
/// (the iteration-cap error message and `tracing` events).
pub fn optimize(
    config: OptimizeConfig,
    env: &Env,
    binding: &str,
    expr: &Rc<BackendExpr>,
) -> Result<Rc<BackendExpr>, OptimizeError> {
    let mut current = expr.clone();

    for iteration in 0..config.max_iterations {
        // A fresh `Ctx` every pass: `eval` always re-interprets `current`
        // against `env` from the same zero-local starting point, so the
        // levels `quote` allocates must restart from 0 too, or the next
        // pass's lookups would walk off the end of `env`'s locals.
        let mut ctx = Ctx::new();
        let sem = eval(env, &current);
        let quoted = quote(&mut ctx, &sem);
        let rewrite_pending = quoted.is_rewrite_pending();
        tracing::trace!(binding, iteration, rewrite_pending, "optimize pass");
        if !rewrite_pending {
            tracing::debug!(binding, iterations = iteration + 1, "optimize reached fixed point");
            return Ok(quoted);
        }
        current = quoted;
    }

    tracing::debug!(binding, limit = config.max_iterations, "optimize iteration cap exceeded");
    Err(OptimizeError::IterationLimitExceeded {
        binding: binding.to_string(),
        limit: config.max_iterations,
    })
}

#[cfg(test)]
mod optimize_tests;
