//! Bound tightening: auxiliary optimization of a target expression over the
//! model as currently constructed.

use crate::backend::{Backend, BackendError};
use crate::model::{ConstraintModel, LinearExpr, ObjSense, Objective};

/// Returns the tight `(lb, ub)` range of `expr` subject to the model's
/// current constraints.
///
/// Two scoped solves (maximize, then minimize); the transient objective is
/// attached, solved and detached on every path, so the model's variable and
/// constraint content is identical before and after the call. Calling this
/// twice on the same model state returns identical bounds.
///
/// # Errors
/// `BackendError::Infeasible` / `BackendError::Unbounded` when a relaxation
/// has no optimum; the caller decides which neuron that condemns.
pub fn query_bounds<B: Backend>(
    model: &mut ConstraintModel,
    backend: &B,
    expr: &LinearExpr,
) -> Result<(f64, f64), BackendError> {
    let ub = solve_scoped(model, backend, expr, ObjSense::Maximize)?;
    let lb = solve_scoped(model, backend, expr, ObjSense::Minimize)?;
    Ok((lb, ub))
}

fn solve_scoped<B: Backend>(
    model: &mut ConstraintModel,
    backend: &B,
    expr: &LinearExpr,
    sense: ObjSense,
) -> Result<f64, BackendError> {
    model.set_objective(Objective {
        expr: expr.clone(),
        sense,
    });
    let result = backend.optimize(model);
    model.clear_objective();
    result
}
