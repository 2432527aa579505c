use std::{fmt::Write, path::Path};

use anyhow::{Context, Result};
use log::{debug, warn};
use tract_onnx::prelude::{
    Datum, Framework, Graph, InferenceFact, InferenceModelExt, IntoTensor, SimplePlan, Tensor,
    TypedFact, TypedOp, tvec,
};

use crate::preprocess::InputSize;

type RunnableModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Wrapper around a runnable MobileNet-SSD ONNX graph.
///
/// The graph is loaded once and pinned to a `[1, 3, H, W]` input so every frame reuses the
/// same optimized plan.
#[derive(Debug)]
pub struct SsdModel {
    runnable: RunnableModel,
    input_size: InputSize,
}

impl SsdModel {
    /// Load and optimize the ONNX graph for a specific input size.
    pub fn load<P: AsRef<Path>>(model_path: P, input_size: InputSize) -> Result<Self> {
        let path = model_path.as_ref();
        anyhow::ensure!(path.exists(), "model file not found: {}", path.display());

        let runnable = match load_runnable_model(path, input_size, true) {
            Ok(model) => {
                debug!(
                    "SSD model {} optimized successfully ({}x{})",
                    path.display(),
                    input_size.width,
                    input_size.height
                );
                model
            }
            Err(opt_err) => {
                let optimize_msg = format!("{opt_err}");
                let mut chain_msg = String::new();
                for cause in opt_err.chain() {
                    let _ = writeln!(&mut chain_msg, "  - {cause}");
                }
                warn!(
                    "SSD model {} failed optimized load ({}); falling back to decluttered graph.\nError chain:\n{}",
                    path.display(),
                    optimize_msg,
                    chain_msg.trim_end()
                );
                load_runnable_model(path, input_size, false).with_context(|| {
                    format!(
                        "fallback to decluttered SSD graph failed after optimize error: {optimize_msg}"
                    )
                })?
            }
        };

        Ok(Self {
            runnable,
            input_size,
        })
    }

    /// Execute the network and return its detection tensor.
    ///
    /// For a Caffe-derived MobileNet-SSD export this is `[1, 1, N, 7]`, each row being
    /// `[image_id, class_id, score, x1, y1, x2, y2]` with corners normalised to `0..=1`.
    pub fn run(&self, input: Tensor) -> Result<Tensor> {
        let outputs = self
            .runnable
            .run(tvec![input.into()])
            .map_err(|e| anyhow::anyhow!("SSD execution failed: {e}"))?;

        outputs
            .into_iter()
            .next()
            .map(|value| value.into_tensor())
            .ok_or_else(|| anyhow::anyhow!("SSD model produced no outputs"))
    }

    pub fn input_size(&self) -> InputSize {
        self.input_size
    }
}

fn load_runnable_model(path: &Path, input_size: InputSize, optimized: bool) -> Result<RunnableModel> {
    let input_fact = InferenceFact::dt_shape(
        f32::datum_type(),
        tvec![
            1usize,
            3,
            input_size.height as usize,
            input_size.width as usize
        ],
    );
    let model = tract_onnx::onnx()
        .model_for_path(path)
        .with_context(|| format!("failed to parse ONNX graph from {}", path.display()))?
        .with_input_fact(0, input_fact)
        .map_err(|e| anyhow::anyhow!("unable to pin SSD input shape: {e}"))?;

    if optimized {
        model
            .into_optimized()
            .map_err(|e| anyhow::anyhow!("unable to optimize SSD graph: {e}"))?
            .into_runnable()
            .map_err(|e| anyhow::anyhow!("unable to make SSD graph runnable: {e}"))
    } else {
        model
            .into_typed()
            .map_err(|e| anyhow::anyhow!("unable to type-check SSD graph: {e}"))?
            .into_decluttered()
            .map_err(|e| anyhow::anyhow!("unable to declutter SSD graph: {e}"))?
            .into_runnable()
            .map_err(|e| anyhow::anyhow!("unable to make SSD graph runnable: {e}"))
    }
}
