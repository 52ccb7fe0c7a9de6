//! Network-to-MILP encoder.
//!
//! One encoder walks the layers in order and emits variables and
//! constraints into a [`ConstraintModel`]; the per-neuron constraint shape
//! is chosen by the [`EncodingStrategy`].

use crate::backend::Backend;
use crate::bounds::query_bounds;
use crate::error::{EncodeError, Result};
use crate::model::{
    Constraint, ConstraintModel, Indicator, LinearExpr, Sense, VarId, VarKind, VarRole, Variable,
};
use log::{debug, info};
use net_core::{FeatureDomain, Layer, NetError, Network};

/// How each ReLU neuron is modeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingStrategy {
    /// Binary indicator plus complementary slack/activation pair, enforced
    /// through true indicator constraints. No auxiliary solves.
    IndicatorBased,

    /// Big-M inequalities whose constants come from per-neuron bound
    /// tightening over the accumulated LP relaxation.
    BigMWithTightening,
}

/// A fully encoded network: the populated model plus the handles an
/// external query layer needs.
#[derive(Debug, Clone)]
pub struct Encoding {
    pub model: ConstraintModel,
    /// Input variables, one per feature, in feature order.
    pub inputs: Vec<VarId>,
    /// Output variables, one per output neuron, in neuron order.
    pub outputs: Vec<VarId>,
    /// Tightened `[lb, ub]` per output neuron (Big-M strategy only).
    pub output_bounds: Option<Vec<(f64, f64)>>,
}

/// Encodes a [`Network`] into an equivalent MILP.
#[derive(Debug, Clone)]
pub struct NetworkEncoder {
    strategy: EncodingStrategy,
}

impl NetworkEncoder {
    pub fn new(strategy: EncodingStrategy) -> Self {
        Self { strategy }
    }

    #[inline]
    pub fn strategy(&self) -> EncodingStrategy {
        self.strategy
    }

    /// Encodes the network over inputs typed by `domains` (one per input
    /// feature, in order).
    ///
    /// The backend is consulted only by the Big-M strategy, for the
    /// per-neuron bound-tightening solves.
    ///
    /// # Errors
    /// Returns a fully valid [`Encoding`] or fails; a partially built model
    /// is never returned.
    pub fn encode<B: Backend>(
        &self,
        network: &Network,
        domains: &[FeatureDomain],
        backend: &B,
    ) -> Result<Encoding> {
        if domains.len() != network.input_dim() {
            return Err(EncodeError::Shape(NetError::ShapeMismatch {
                what: "input domains".to_string(),
                got: domains.len(),
                expected: network.input_dim(),
            }));
        }
        info!(
            "encoding network: {} layers, {} inputs, strategy {:?}",
            network.num_layers(),
            network.input_dim(),
            self.strategy
        );
        match self.strategy {
            EncodingStrategy::IndicatorBased => encode_indicator(network, domains),
            EncodingStrategy::BigMWithTightening => encode_bigm(network, domains, backend),
        }
    }
}

fn domain_kind(domain: &FeatureDomain) -> VarKind {
    match domain {
        FeatureDomain::Binary => VarKind::Binary,
        FeatureDomain::Integer { .. } => VarKind::Integer,
        FeatureDomain::Continuous { .. } => VarKind::Continuous,
    }
}

/// The affine row `(A . prev)_j`, without the bias: the bias lands on the
/// constraint's right-hand side.
fn affine_row(layer: &Layer, prev: &[VarId], j: usize) -> LinearExpr {
    let mut expr = LinearExpr::zero();
    for (k, &xk) in prev.iter().enumerate() {
        expr.add_term(xk, layer.weights()[[j, k]]);
    }
    expr
}

fn encode_indicator(network: &Network, domains: &[FeatureDomain]) -> Result<Encoding> {
    let mut model = ConstraintModel::new();

    let inputs = add_input_vars(&mut model, domains, true)?;

    let last = network.num_layers() - 1;
    let mut prev = inputs.clone();
    let mut outputs = Vec::with_capacity(network.output_dim());
    for (i, layer) in network.layers().iter().enumerate() {
        if i != last {
            let mut next = Vec::with_capacity(layer.out_dim());
            for j in 0..layer.out_dim() {
                let y = model.add_var(Variable {
                    name: format!("y_{i}_{j}"),
                    kind: VarKind::Continuous,
                    lb: 0.0,
                    ub: f64::INFINITY,
                    role: VarRole::PostActivation,
                    coords: Some((i, j)),
                })?;
                let s = model.add_var(Variable {
                    name: format!("s_{i}_{j}"),
                    kind: VarKind::Continuous,
                    lb: 0.0,
                    ub: f64::INFINITY,
                    role: VarRole::Slack,
                    coords: Some((i, j)),
                })?;
                let z = model.add_var(Variable {
                    name: format!("z_{i}_{j}"),
                    kind: VarKind::Binary,
                    lb: 0.0,
                    ub: 1.0,
                    role: VarRole::Indicator,
                    coords: Some((i, j)),
                })?;

                // (A x + b)_j = y_j - s_j
                let mut expr = affine_row(layer, &prev, j);
                expr.add_term(y, -1.0);
                expr.add_term(s, 1.0);
                model.add_constraint(Constraint {
                    name: format!("c_{i}_{j}"),
                    expr,
                    sense: Sense::Eq,
                    rhs: -layer.biases()[j],
                });
                // z = 1  =>  y <= 0 (neuron inactive)
                model.add_indicator(Indicator {
                    name: format!("inact_{i}_{j}"),
                    trigger: z,
                    active_when: true,
                    expr: LinearExpr::from_var(y, 1.0),
                    sense: Sense::Le,
                    rhs: 0.0,
                });
                // z = 0  =>  s <= 0 (neuron active)
                model.add_indicator(Indicator {
                    name: format!("act_{i}_{j}"),
                    trigger: z,
                    active_when: false,
                    expr: LinearExpr::from_var(s, 1.0),
                    sense: Sense::Le,
                    rhs: 0.0,
                });
                next.push(y);
            }
            prev = next;
        } else {
            for j in 0..layer.out_dim() {
                let o = model.add_var(Variable {
                    name: format!("o_{j}"),
                    kind: VarKind::Continuous,
                    lb: f64::NEG_INFINITY,
                    ub: f64::INFINITY,
                    role: VarRole::Output,
                    coords: Some((i, j)),
                })?;
                let mut expr = affine_row(layer, &prev, j);
                expr.add_term(o, -1.0);
                model.add_constraint(Constraint {
                    name: format!("c_{i}_{j}"),
                    expr,
                    sense: Sense::Eq,
                    rhs: -layer.biases()[j],
                });
                outputs.push(o);
            }
        }
    }

    info!("indicator encoding complete: {model}");
    Ok(Encoding {
        model,
        inputs,
        outputs,
        output_bounds: None,
    })
}

fn encode_bigm<B: Backend>(
    network: &Network,
    domains: &[FeatureDomain],
    backend: &B,
) -> Result<Encoding> {
    let mut model = ConstraintModel::new();

    // Inputs stay continuous during construction: every tightening solve
    // runs over the continuous relaxation of the input domain. The
    // classified kinds are cast in at the end.
    let inputs = add_input_vars(&mut model, domains, false)?;

    let last = network.num_layers() - 1;
    let mut prev = inputs.clone();
    let mut outputs = Vec::with_capacity(network.output_dim());
    let mut output_bounds = Vec::with_capacity(network.output_dim());
    let mut decisions = Vec::new();
    for (i, layer) in network.layers().iter().enumerate() {
        let is_last = i == last;
        let mut next = Vec::with_capacity(layer.out_dim());
        for j in 0..layer.out_dim() {
            let s = model.add_var(Variable {
                name: if is_last {
                    format!("o_{j}")
                } else {
                    format!("s_{i}_{j}")
                },
                kind: VarKind::Continuous,
                lb: f64::NEG_INFINITY,
                ub: f64::INFINITY,
                role: if is_last {
                    VarRole::Output
                } else {
                    VarRole::PreActivation
                },
                coords: Some((i, j)),
            })?;
            // (A x + b)_j = s_j
            let mut expr = affine_row(layer, &prev, j);
            expr.add_term(s, -1.0);
            model.add_constraint(Constraint {
                name: format!("c_{i}_{j}"),
                expr,
                sense: Sense::Eq,
                rhs: -layer.biases()[j],
            });

            // With the equality registered, tighten this neuron over the
            // accumulated constraint set.
            let target = LinearExpr::from_var(s, 1.0);
            let (lb, ub) = query_bounds(&mut model, backend, &target).map_err(|source| {
                EncodeError::BoundTightening {
                    layer: i,
                    neuron: j,
                    source,
                }
            })?;
            debug!("layer {i} neuron {j}: pre-activation in [{lb}, {ub}]");
            model.set_bounds(s, lb, ub)?;

            if is_last {
                output_bounds.push((lb, ub));
                outputs.push(s);
            } else {
                let a = model.add_var(Variable {
                    name: format!("a_{i}_{j}"),
                    kind: VarKind::Continuous,
                    lb: 0.0,
                    ub: 1.0,
                    role: VarRole::Decision,
                    coords: Some((i, j)),
                })?;
                let y = model.add_var(Variable {
                    name: format!("y_{i}_{j}"),
                    kind: VarKind::Continuous,
                    lb: 0.0,
                    ub: f64::INFINITY,
                    role: VarRole::PostActivation,
                    coords: Some((i, j)),
                })?;

                // y <= s - lb (1 - a)
                let mut upper_off = LinearExpr::from_var(y, 1.0);
                upper_off.add_term(s, -1.0);
                upper_off.add_term(a, -lb);
                model.add_constraint(Constraint {
                    name: format!("relu_off_{i}_{j}"),
                    expr: upper_off,
                    sense: Sense::Le,
                    rhs: -lb,
                });
                // y >= s
                let mut lower = LinearExpr::from_var(y, 1.0);
                lower.add_term(s, -1.0);
                model.add_constraint(Constraint {
                    name: format!("relu_lb_{i}_{j}"),
                    expr: lower,
                    sense: Sense::Ge,
                    rhs: 0.0,
                });
                // y <= ub a
                let mut upper_on = LinearExpr::from_var(y, 1.0);
                upper_on.add_term(a, -ub);
                model.add_constraint(Constraint {
                    name: format!("relu_on_{i}_{j}"),
                    expr: upper_on,
                    sense: Sense::Le,
                    rhs: 0.0,
                });

                decisions.push(a);
                next.push(y);
            }
        }
        if !is_last {
            prev = next;
        }
    }

    // Finalization casts: decision variables become binary, inputs take
    // their classified domain kinds.
    for a in decisions {
        model.set_kind(a, VarKind::Binary);
    }
    for (x, domain) in inputs.iter().zip(domains) {
        model.set_kind(*x, domain_kind(domain));
    }

    info!("big-M encoding complete: {model}");
    Ok(Encoding {
        model,
        inputs,
        outputs,
        output_bounds: Some(output_bounds),
    })
}

/// Creates one input variable per feature domain. With `typed` the
/// classified kind is applied immediately; otherwise the variables start
/// continuous (Big-M construction).
fn add_input_vars(
    model: &mut ConstraintModel,
    domains: &[FeatureDomain],
    typed: bool,
) -> Result<Vec<VarId>> {
    let mut inputs = Vec::with_capacity(domains.len());
    for (i, domain) in domains.iter().enumerate() {
        let (lb, ub) = domain.bounds();
        let id = model.add_var(Variable {
            name: format!("x_{i}"),
            kind: if typed {
                domain_kind(domain)
            } else {
                VarKind::Continuous
            },
            lb,
            ub,
            role: VarRole::Input,
            coords: None,
        })?;
        inputs.push(id);
    }
    Ok(inputs)
}
