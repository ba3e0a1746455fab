use burn::{
    nn::{
        BatchNorm, BatchNormConfig,
        Dropout, DropoutConfig,
        Linear, LinearConfig,
        Relu,
    },
    prelude::*,
    tensor::{activation::softmax, backend::AutodiffBackend},
};

/// Widths of the four hidden blocks, input side first.
pub const HIDDEN_WIDTHS: [usize; 4] = [128, 64, 32, 16];

// Keras-style batch norm: running stats keep 99% per update.
const BATCH_NORM_EPSILON:  f64 = 1e-3;
const BATCH_NORM_MOMENTUM: f64 = 0.01;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct ClassifierConfig {
    /// Flat feature count seen by the first dense layer. With a
    /// reshape input this is the padded size (a multiple of 4).
    pub input_size:  usize,
    pub num_classes: usize,
    /// Accept `[batch, 2, 2, input_size / 4]` inputs
    #[config(default = true)]
    pub reshape_input: bool,
    #[config(default = 0.5)]
    pub dropout: f64,
}

impl ClassifierConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ClassifierModel<B> {
        let mut blocks = Vec::with_capacity(HIDDEN_WIDTHS.len());
        let mut width  = self.input_size;
        for &out in &HIDDEN_WIDTHS {
            blocks.push(self.build_block(width, out, device));
            width = out;
        }
        let output = LinearConfig::new(width, self.num_classes).init(device);

        ClassifierModel {
            blocks,
            output,
            input_size:    self.input_size,
            reshape_input: self.reshape_input,
        }
    }

    /// Rank of the input tensors the model expects.
    pub fn input_rank(&self) -> usize {
        if self.reshape_input { 4 } else { 2 }
    }

    fn build_block<B: Backend>(&self, d_in: usize, d_out: usize, device: &B::Device) -> DenseBlock<B> {
        DenseBlock {
            linear:     LinearConfig::new(d_in, d_out).init(device),
            norm:       BatchNormConfig::new(d_out)
                            .with_epsilon(BATCH_NORM_EPSILON)
                            .with_momentum(BATCH_NORM_MOMENTUM)
                            .init(device),
            activation: Relu::new(),
            dropout:    DropoutConfig::new(self.dropout).init(),
        }
    }
}

/// Dense → BatchNorm → ReLU → Dropout
#[derive(Module, Debug)]
pub struct DenseBlock<B: Backend> {
    pub linear:     Linear<B>,
    pub norm:       BatchNorm<B, 0>,
    pub activation: Relu,
    pub dropout:    Dropout,
}

impl<B: Backend> DenseBlock<B> {
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.linear.forward(x);
        let x = self.norm.forward(x);
        let x = self.activation.forward(x);
        self.dropout.forward(x)
    }
}

#[derive(Module, Debug)]
pub struct ClassifierModel<B: Backend> {
    pub blocks:        Vec<DenseBlock<B>>,
    pub output:        Linear<B>,
    pub input_size:    usize,
    pub reshape_input: bool,
}

impl<B: Backend> ClassifierModel<B> {
    /// inputs: [batch, input_size] or [batch, 2, 2, input_size / 4]
    /// → logits: [batch, num_classes]
    pub fn forward_logits<const D: usize>(&self, inputs: Tensor<B, D>) -> Tensor<B, 2> {
        // Reshape layer: every non-batch dimension collapses into one.
        let dims  = inputs.dims();
        let width = dims[1..].iter().product::<usize>();
        let mut x: Tensor<B, 2> = inputs.reshape([dims[0], width]);
        for block in &self.blocks {
            x = block.forward(x);
        }
        self.output.forward(x)
    }

    /// Class probabilities: [batch, num_classes], rows sum to 1.
    pub fn forward<const D: usize>(&self, inputs: Tensor<B, D>) -> Tensor<B, 2> {
        softmax(self.forward_logits(inputs), 1)
    }

    /// Rank of the input tensors this model expects.
    pub fn input_rank(&self) -> usize {
        if self.reshape_input { 4 } else { 2 }
    }

    pub fn num_classes(&self) -> usize {
        self.output.weight.dims()[1]
    }

    pub fn forward_loss<const D: usize>(
        &self,
        inputs:  Tensor<B, D>,
        targets: Tensor<B, 1, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>)
    where
        B: AutodiffBackend,
    {
        let logits = self.forward_logits(inputs);
        let ce = burn::nn::loss::CrossEntropyLossConfig::new()
            .init(&logits.device());
        let loss = ce.forward(logits.clone(), targets);
        (loss, logits)
    }
}
