//! End-to-end checks: encoded models must agree exactly with the network's
//! floating-point forward pass, under both formulations.

use milp_encoder::{Encoding, EncodingStrategy, NetworkEncoder, SimplexBackend, VarRole};
use ndarray::{arr1, arr2, Array1, ArrayView1};
use net_core::{infer_domains, Column, FeatureDomain, Layer, Network, TabularDataset};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const TOL: f64 = 1e-6;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn small_network() -> Network {
    // 2 inputs -> 2 ReLU neurons -> 1 linear output
    let hidden = Layer::new(arr2(&[[1.0, -1.0], [0.5, 0.5]]), arr1(&[0.0, -0.25])).unwrap();
    let out = Layer::new(arr2(&[[1.0, 2.0]]), arr1(&[0.5])).unwrap();
    Network::new(vec![hidden, out]).unwrap()
}

fn deep_network() -> Network {
    // 2 -> 2 -> 2 -> 1, so the second hidden layer's tightening solves run
    // over already-emitted big-M rows.
    let h0 = Layer::new(arr2(&[[1.0, -2.0], [-0.5, 1.0]]), arr1(&[0.1, -0.2])).unwrap();
    let h1 = Layer::new(arr2(&[[2.0, 1.0], [-1.0, 0.5]]), arr1(&[-0.3, 0.4])).unwrap();
    let out = Layer::new(arr2(&[[1.0, -1.0]]), arr1(&[0.0])).unwrap();
    Network::new(vec![h0, h1, out]).unwrap()
}

fn unit_domains(n: usize) -> Vec<FeatureDomain> {
    vec![FeatureDomain::Continuous { lb: 0.0, ub: 1.0 }; n]
}

/// Pre- and post-activation values per layer for one input.
fn layer_traces(net: &Network, x: ArrayView1<f64>) -> (Vec<Array1<f64>>, Vec<Array1<f64>>) {
    let mut pres = Vec::new();
    let mut posts = Vec::new();
    let mut acts = x.to_owned();
    let last = net.num_layers() - 1;
    for (i, layer) in net.layers().iter().enumerate() {
        let pre = layer.affine(acts.view());
        let post = if i == last {
            pre.clone()
        } else {
            pre.mapv(|v| v.max(0.0))
        };
        pres.push(pre);
        posts.push(post.clone());
        acts = post;
    }
    (pres, posts)
}

/// The assignment a concrete forward pass induces on the encoded model:
/// inputs fixed to `x`, every intermediate variable resolved from the
/// network's own activations.
fn induced_assignment(enc: &Encoding, net: &Network, x: &[f64]) -> Vec<f64> {
    let (pres, posts) = layer_traces(net, ArrayView1::from(x));
    let mut values = vec![0.0; enc.model.num_vars()];
    for (id, var) in enc.model.vars() {
        let value = match var.role {
            VarRole::Input => {
                let pos = enc.inputs.iter().position(|i| *i == id).unwrap();
                x[pos]
            }
            VarRole::PreActivation => {
                let (i, j) = var.coords.unwrap();
                pres[i][j]
            }
            VarRole::PostActivation => {
                let (i, j) = var.coords.unwrap();
                posts[i][j]
            }
            VarRole::Slack => {
                let (i, j) = var.coords.unwrap();
                (-pres[i][j]).max(0.0)
            }
            VarRole::Indicator => {
                let (i, j) = var.coords.unwrap();
                if pres[i][j] > 0.0 {
                    0.0
                } else {
                    1.0
                }
            }
            VarRole::Decision => {
                let (i, j) = var.coords.unwrap();
                if pres[i][j] >= 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            VarRole::Output => {
                let (i, j) = var.coords.unwrap();
                pres[i][j]
            }
        };
        values[id.index()] = value;
    }
    values
}

fn sample_unit_inputs(n: usize, dim: usize, seed: u64) -> Vec<Vec<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut points: Vec<Vec<f64>> = (0..n)
        .map(|_| (0..dim).map(|_| rng.random_range(0.0..=1.0)).collect())
        .collect();
    // corners too, where ReLU phase flips live
    points.push(vec![0.0; dim]);
    points.push(vec![1.0; dim]);
    points
}

fn assert_forward_equivalence(enc: &Encoding, net: &Network, points: &[Vec<f64>]) {
    for x in points {
        let values = induced_assignment(enc, net, x);
        assert!(
            enc.model.satisfied(&values, TOL),
            "forward-pass assignment rejected for x = {x:?}"
        );
        let expected = net.forward(ArrayView1::from(x.as_slice())).unwrap();
        for (k, &o) in enc.outputs.iter().enumerate() {
            assert!(
                (values[o.index()] - expected[k]).abs() < TOL,
                "output {k} diverged for x = {x:?}"
            );
        }
    }
}

#[test]
fn indicator_encoding_matches_forward_pass() {
    init_logging();
    let net = small_network();
    let enc = NetworkEncoder::new(EncodingStrategy::IndicatorBased)
        .encode(&net, &unit_domains(2), &SimplexBackend::new())
        .unwrap();
    assert_forward_equivalence(&enc, &net, &sample_unit_inputs(25, 2, 11));
}

#[test]
fn bigm_encoding_matches_forward_pass() {
    init_logging();
    let net = small_network();
    let enc = NetworkEncoder::new(EncodingStrategy::BigMWithTightening)
        .encode(&net, &unit_domains(2), &SimplexBackend::new())
        .unwrap();
    assert_forward_equivalence(&enc, &net, &sample_unit_inputs(25, 2, 13));
}

#[test]
fn both_strategies_match_on_deeper_network() {
    let net = deep_network();
    let points = sample_unit_inputs(25, 2, 17);
    for strategy in [
        EncodingStrategy::IndicatorBased,
        EncodingStrategy::BigMWithTightening,
    ] {
        let enc = NetworkEncoder::new(strategy)
            .encode(&net, &unit_domains(2), &SimplexBackend::new())
            .unwrap();
        assert_forward_equivalence(&enc, &net, &points);
    }
}

#[test]
fn tightened_bounds_are_exact() {
    // pre-activation of the only hidden neuron is 8x - 3 over x in [0, 1],
    // so its provable range is exactly [-3, 5].
    let hidden = Layer::new(arr2(&[[8.0]]), arr1(&[-3.0])).unwrap();
    let out = Layer::new(arr2(&[[1.0]]), arr1(&[0.0])).unwrap();
    let net = Network::new(vec![hidden, out]).unwrap();
    let enc = NetworkEncoder::new(EncodingStrategy::BigMWithTightening)
        .encode(&net, &unit_domains(1), &SimplexBackend::new())
        .unwrap();

    let (_, pre) = enc
        .model
        .vars()
        .find(|(_, v)| v.role == VarRole::PreActivation && v.coords == Some((0, 0)))
        .unwrap();
    assert!((pre.lb + 3.0).abs() < 1e-9);
    assert!((pre.ub - 5.0).abs() < 1e-9);

    // output is relu(8x - 3), so [0, 5]
    let bounds = enc.output_bounds.as_ref().unwrap();
    assert!((bounds[0].0 - 0.0).abs() < 1e-9);
    assert!((bounds[0].1 - 5.0).abs() < 1e-9);

    // No in-range input is excluded from producing y = max(0, pre) exactly.
    assert_forward_equivalence(&enc, &net, &sample_unit_inputs(25, 1, 19));
}

#[test]
fn output_bounds_contain_all_forward_outputs() {
    let net = small_network();
    let enc = NetworkEncoder::new(EncodingStrategy::BigMWithTightening)
        .encode(&net, &unit_domains(2), &SimplexBackend::new())
        .unwrap();
    let bounds = enc.output_bounds.as_ref().unwrap();
    for x in sample_unit_inputs(50, 2, 23) {
        let out = net.forward(ArrayView1::from(x.as_slice())).unwrap();
        for (k, &(lb, ub)) in bounds.iter().enumerate() {
            assert!(out[k] >= lb - TOL && out[k] <= ub + TOL);
        }
    }
}

#[test]
fn provably_inactive_and_active_neurons_stay_sound() {
    // one hidden neuron always active (pre in [5, 6]), one always inactive
    // (pre in [-6, -5]); neither is special-cased by the encoder.
    let hidden = Layer::new(arr2(&[[1.0], [-1.0]]), arr1(&[5.0, -5.0])).unwrap();
    let out = Layer::new(arr2(&[[1.0, 1.0]]), arr1(&[0.0])).unwrap();
    let net = Network::new(vec![hidden, out]).unwrap();
    let enc = NetworkEncoder::new(EncodingStrategy::BigMWithTightening)
        .encode(&net, &unit_domains(1), &SimplexBackend::new())
        .unwrap();
    assert_forward_equivalence(&enc, &net, &sample_unit_inputs(20, 1, 29));
}

#[test]
fn corrupted_assignments_are_rejected() {
    let net = small_network();
    let x = vec![0.75, 0.25];
    for strategy in [
        EncodingStrategy::IndicatorBased,
        EncodingStrategy::BigMWithTightening,
    ] {
        let enc = NetworkEncoder::new(strategy)
            .encode(&net, &unit_domains(2), &SimplexBackend::new())
            .unwrap();
        let good = induced_assignment(&enc, &net, &x);
        assert!(enc.model.satisfied(&good, TOL));

        // nudging the output away from the true forward value must violate
        // some constraint
        let mut bad = good.clone();
        bad[enc.outputs[0].index()] += 0.1;
        assert!(!enc.model.satisfied(&bad, TOL));

        // so must inflating a hidden activation
        let (hidden_y, _) = enc
            .model
            .vars()
            .find(|(_, v)| v.role == VarRole::PostActivation && v.coords == Some((0, 0)))
            .unwrap();
        let mut bad = good;
        bad[hidden_y.index()] += 0.5;
        assert!(!enc.model.satisfied(&bad, TOL));
    }
}

#[test]
fn encoding_is_deterministic() {
    let net = small_network();
    let encoder = NetworkEncoder::new(EncodingStrategy::BigMWithTightening);
    let a = encoder
        .encode(&net, &unit_domains(2), &SimplexBackend::new())
        .unwrap();
    let b = encoder
        .encode(&net, &unit_domains(2), &SimplexBackend::new())
        .unwrap();
    assert_eq!(a.model.num_vars(), b.model.num_vars());
    assert_eq!(a.model.num_constraints(), b.model.num_constraints());
    assert_eq!(a.output_bounds, b.output_bounds);
}

#[test]
fn classified_dataset_drives_both_encodings() {
    // binary feature {2, 5}, integer feature [1, 7]
    let data = TabularDataset::new(vec![
        Column::new("switch", vec![2.0, 2.0, 5.0, 5.0]),
        Column::new("count", vec![1.0, 3.0, 3.0, 7.0]),
        Column::new("label", vec![0.0, 1.0, 1.0, 0.0]),
    ]);
    let domains = infer_domains(&data).unwrap();
    assert_eq!(
        domains,
        vec![FeatureDomain::Binary, FeatureDomain::Integer { lb: 1, ub: 7 }]
    );

    let net = small_network();
    let mut rng = StdRng::seed_from_u64(31);
    let points: Vec<Vec<f64>> = (0..20)
        .map(|_| {
            vec![
                f64::from(rng.random_range(0..=1)),
                f64::from(rng.random_range(1..=7)),
            ]
        })
        .collect();

    for strategy in [
        EncodingStrategy::IndicatorBased,
        EncodingStrategy::BigMWithTightening,
    ] {
        let enc = NetworkEncoder::new(strategy)
            .encode(&net, &domains, &SimplexBackend::new())
            .unwrap();
        assert_forward_equivalence(&enc, &net, &points);
    }
}

#[test]
fn lp_export_covers_the_whole_encoding() {
    let net = small_network();
    let enc = NetworkEncoder::new(EncodingStrategy::IndicatorBased)
        .encode(&net, &unit_domains(2), &SimplexBackend::new())
        .unwrap();
    let lp = enc.model.to_lp_string();
    assert!(lp.contains("Subject To"));
    assert!(lp.contains("z_0_0 = 1 ->"));
    assert!(lp.contains("z_0_1 = 0 ->"));
    assert!(lp.contains("Binary"));
    assert!(lp.contains(" o_0 free"));
    assert!(lp.ends_with("End\n"));
}
