//! Single-layer LSTM amp model with a dense output head.
//!
//! Weights use PyTorch's layout: `weight_ih` is `[4*hidden, input]` and
//! `weight_hh` is `[4*hidden, hidden]`, row-major, gates stacked `i, f, g, o`.
//! The output is residual: `y = dense · h + bias + x`.

use crate::error::{Error, Result};
use crate::model::AmpModel;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct LstmWeights {
    pub weight_ih: Vec<f32>,
    pub weight_hh: Vec<f32>,
    pub bias_ih: Vec<f32>,
    pub bias_hh: Vec<f32>,
    pub dense_weight: Vec<f32>,
    pub dense_bias: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LstmSpec {
    /// 1 for a plain model, 2 when the gain control is fed in alongside the sample.
    pub input_size: usize,
    pub hidden_size: usize,
    pub weights: LstmWeights,
}

pub struct LstmModel {
    input_size: usize,
    hidden: usize,
    w_ih: Vec<f32>,
    w_hh: Vec<f32>,
    /// `bias_ih + bias_hh`, folded at load time.
    bias: Vec<f32>,
    dense: Vec<f32>,
    dense_bias: f32,

    gates: Vec<f32>,
    h: Vec<f32>,
    c: Vec<f32>,
}

fn check_len(name: &str, actual: usize, expected: usize) -> Result<()> {
    if actual != expected {
        return Err(Error::InvalidModel(format!(
            "{name} has {actual} values, expected {expected}"
        )));
    }
    Ok(())
}

#[inline]
fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

impl LstmModel {
    pub fn new(spec: LstmSpec) -> Result<Self> {
        let LstmSpec {
            input_size,
            hidden_size: hidden,
            weights: w,
        } = spec;
        if !(1..=2).contains(&input_size) {
            return Err(Error::InvalidModel(format!(
                "input_size must be 1 or 2, got {input_size}"
            )));
        }
        if hidden == 0 {
            return Err(Error::InvalidModel("hidden_size must be non-zero".into()));
        }
        let rows = 4 * hidden;
        check_len("weight_ih", w.weight_ih.len(), rows * input_size)?;
        check_len("weight_hh", w.weight_hh.len(), rows * hidden)?;
        check_len("bias_ih", w.bias_ih.len(), rows)?;
        check_len("bias_hh", w.bias_hh.len(), rows)?;
        check_len("dense_weight", w.dense_weight.len(), hidden)?;

        let bias = w.bias_ih.iter().zip(&w.bias_hh).map(|(a, b)| a + b).collect();
        Ok(Self {
            input_size,
            hidden,
            w_ih: w.weight_ih,
            w_hh: w.weight_hh,
            bias,
            dense: w.dense_weight,
            dense_bias: w.dense_bias,
            gates: vec![0.0; rows],
            h: vec![0.0; hidden],
            c: vec![0.0; hidden],
        })
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden
    }

    #[inline]
    fn step(&mut self, x: f32, gain: f32) -> f32 {
        let n = self.hidden;
        let input = [x, gain];
        let input = &input[..self.input_size];

        for (row, gate) in self.gates.iter_mut().enumerate() {
            let ih = &self.w_ih[row * self.input_size..(row + 1) * self.input_size];
            let hh = &self.w_hh[row * n..(row + 1) * n];
            let mut acc = self.bias[row];
            for (w, u) in ih.iter().zip(input) {
                acc += w * u;
            }
            for (w, h) in hh.iter().zip(&self.h) {
                acc += w * h;
            }
            *gate = acc;
        }

        let mut y = self.dense_bias;
        for k in 0..n {
            let i = sigmoid(self.gates[k]);
            let f = sigmoid(self.gates[n + k]);
            let g = self.gates[2 * n + k].tanh();
            let o = sigmoid(self.gates[3 * n + k]);
            self.c[k] = f * self.c[k] + i * g;
            self.h[k] = o * self.c[k].tanh();
            y += self.dense[k] * self.h[k];
        }
        y + x
    }
}

impl AmpModel for LstmModel {
    fn reset(&mut self) {
        self.h.fill(0.0);
        self.c.fill(0.0);
    }

    fn process(&mut self, buffer: &mut [f32], gain: f32) {
        for x in buffer.iter_mut() {
            *x = self.step(*x, gain);
        }
    }

    fn is_gain_enabled(&self) -> bool {
        self.input_size == 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(input_size: usize, hidden: usize, fill: f32) -> LstmSpec {
        let rows = 4 * hidden;
        LstmSpec {
            input_size,
            hidden_size: hidden,
            weights: LstmWeights {
                weight_ih: vec![fill; rows * input_size],
                weight_hh: vec![fill; rows * hidden],
                bias_ih: vec![0.0; rows],
                bias_hh: vec![0.0; rows],
                dense_weight: vec![fill; hidden],
                dense_bias: 0.0,
            },
        }
    }

    #[test]
    fn test_zero_weights_is_identity() {
        let mut model = LstmModel::new(spec(1, 4, 0.0)).unwrap();
        let mut buf = [0.1, -0.2, 0.3];
        model.process(&mut buf, 0.5);
        assert_eq!(buf, [0.1, -0.2, 0.3]);
    }

    #[test]
    fn test_state_persists_and_resets() {
        let mut model = LstmModel::new(spec(1, 3, 0.5)).unwrap();
        let mut first = [0.5f32];
        model.process(&mut first, 0.0);
        let mut second = [0.5f32];
        model.process(&mut second, 0.0);
        assert_ne!(first, second, "recurrent state should carry over");

        model.reset();
        let mut again = [0.5f32];
        model.process(&mut again, 0.0);
        assert_eq!(first, again);
    }

    #[test]
    fn test_gain_input() {
        let mut model = LstmModel::new(spec(2, 2, 0.3)).unwrap();
        assert!(model.is_gain_enabled());
        let mut lo = [0.2f32];
        model.process(&mut lo, 0.0);
        model.reset();
        let mut hi = [0.2f32];
        model.process(&mut hi, 1.0);
        assert_ne!(lo, hi);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut bad = spec(1, 4, 0.1);
        bad.weights.weight_hh.pop();
        assert!(matches!(LstmModel::new(bad), Err(Error::InvalidModel(_))));
        assert!(LstmModel::new(spec(3, 4, 0.1)).is_err());
    }
}
