use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use charsoup::Model;

pub fn to_split(input: &Path, weights_out: &Path, meta_out: &Path) -> Result<()> {
    let model = Model::load_mapped_owned(input)
        .with_context(|| format!("loading model from {}", input.display()))?;
    model
        .save_split(weights_out, meta_out)
        .with_context(|| format!("writing split artifact to {}, {}", weights_out.display(), meta_out.display()))?;

    println!(
        "wrote {} ({} bytes) and {}",
        weights_out.display(),
        model.weights().len(),
        meta_out.display()
    );
    Ok(())
}

pub fn to_single(weights: &Path, meta: &Path, out: &Path) -> Result<()> {
    let model = Model::load_split(weights, meta)
        .with_context(|| format!("loading split artifact {}, {}", weights.display(), meta.display()))?;

    let mut file = File::create(out).with_context(|| format!("creating {}", out.display()))?;
    model.save(&mut file)?;

    println!("wrote {}", out.display());
    Ok(())
}
