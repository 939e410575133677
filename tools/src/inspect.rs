use std::path::Path;

use anyhow::{Context, Result};
use charsoup::Model;

pub fn run(model_path: &Path) -> Result<()> {
    let model = Model::load_mapped_owned(model_path)
        .with_context(|| format!("loading model from {}", model_path.display()))?;

    println!("num_buckets:      {}", model.num_buckets());
    println!("num_classes:      {}", model.num_classes());
    println!("include_trigrams: {}", model.include_trigrams());
    println!("weight blob size: {} bytes", model.weights().len());
    println!("labels:");
    for (i, label) in model.labels().iter().enumerate() {
        let scale = model.scales()[i];
        let bias = model.biases()[i];
        println!("  [{i:>4}] {label:<8} scale={scale:>10.6} bias={bias:>10.6}");
    }

    Ok(())
}
