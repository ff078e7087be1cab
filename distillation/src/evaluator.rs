use machine_learning::{
    arch::{Mode, Model},
    dataloader::DataLoader,
    metrics,
};

use crate::Result;

/// Computes the top-1 accuracy of `model` over one in-order pass of `data`.
///
/// The model runs in eval mode, so nothing is cached and no parameter changes. Whatever mode the
/// caller had set is restored afterwards, even if the pass fails.
///
/// # Returns
/// `correct / total`, or `0.0` for an empty set.
pub fn evaluate(model: &mut dyn Model, data: &DataLoader) -> Result<f32> {
    let prior = model.mode();
    model.set_mode(Mode::Eval);
    let accuracy = accuracy(model, data);
    model.set_mode(prior);
    accuracy
}

fn accuracy(model: &mut dyn Model, data: &DataLoader) -> Result<f32> {
    if data.is_empty() {
        return Ok(0.);
    }

    let mut correct = 0;
    for batch in data.batches(0) {
        let logits = model.forward(batch.x.view())?;
        correct += metrics::count_correct(logits.view(), &batch.labels);
    }

    Ok(correct as f32 / data.len() as f32)
}
