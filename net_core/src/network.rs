use crate::error::NetError;
use ndarray::{Array1, Array2, ArrayView1};

/// One densely-connected layer: `z = A x + b`.
///
/// `weights` has shape (out_dim, in_dim); `biases` has length out_dim.
#[derive(Debug, Clone)]
pub struct Layer {
    weights: Array2<f64>,
    biases: Array1<f64>,
}

impl Layer {
    /// Creates a layer from its weight matrix and bias vector.
    ///
    /// # Errors
    /// Returns `NetError::ShapeMismatch` if the bias length does not match
    /// the weight matrix's output dimension.
    pub fn new(weights: Array2<f64>, biases: Array1<f64>) -> Result<Self, NetError> {
        if biases.len() != weights.nrows() {
            return Err(NetError::ShapeMismatch {
                what: "bias".to_string(),
                got: biases.len(),
                expected: weights.nrows(),
            });
        }
        Ok(Self { weights, biases })
    }

    #[inline]
    pub fn in_dim(&self) -> usize {
        self.weights.ncols()
    }

    #[inline]
    pub fn out_dim(&self) -> usize {
        self.weights.nrows()
    }

    #[inline]
    pub fn weights(&self) -> &Array2<f64> {
        &self.weights
    }

    #[inline]
    pub fn biases(&self) -> &Array1<f64> {
        &self.biases
    }

    /// Affine part only: `A x + b`.
    pub fn affine(&self, x: ArrayView1<f64>) -> Array1<f64> {
        self.weights.dot(&x) + &self.biases
    }
}

/// An explicit, immutable sequence of dense layers.
///
/// Every layer except the last is followed by ReLU; the last is linear.
/// Consecutive dimensions are validated once, on construction.
#[derive(Debug, Clone)]
pub struct Network {
    layers: Vec<Layer>,
}

impl Network {
    /// Builds a network, checking that layer i's input dimension equals
    /// layer i-1's output dimension.
    ///
    /// # Errors
    /// - `NetError::EmptyNetwork` if `layers` is empty.
    /// - `NetError::ShapeMismatch` on the first incompatible pair.
    pub fn new(layers: Vec<Layer>) -> Result<Self, NetError> {
        if layers.is_empty() {
            return Err(NetError::EmptyNetwork);
        }
        for (i, pair) in layers.windows(2).enumerate() {
            if pair[1].in_dim() != pair[0].out_dim() {
                return Err(NetError::ShapeMismatch {
                    what: format!("layer {} input", i + 1),
                    got: pair[1].in_dim(),
                    expected: pair[0].out_dim(),
                });
            }
        }
        Ok(Self { layers })
    }

    #[inline]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    #[inline]
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.layers[0].in_dim()
    }

    #[inline]
    pub fn output_dim(&self) -> usize {
        self.layers[self.layers.len() - 1].out_dim()
    }

    /// Exact floating-point forward pass: ReLU after every layer except
    /// the last, which stays linear.
    ///
    /// # Errors
    /// Returns `NetError::ShapeMismatch` if `x` does not match the input
    /// dimension.
    pub fn forward(&self, x: ArrayView1<f64>) -> Result<Array1<f64>, NetError> {
        if x.len() != self.input_dim() {
            return Err(NetError::ShapeMismatch {
                what: "input".to_string(),
                got: x.len(),
                expected: self.input_dim(),
            });
        }
        let mut acts = x.to_owned();
        let last = self.layers.len() - 1;
        for (i, layer) in self.layers.iter().enumerate() {
            let mut z = layer.affine(acts.view());
            if i != last {
                z.mapv_inplace(|v| v.max(0.0));
            }
            acts = z;
        }
        Ok(acts)
    }
}
