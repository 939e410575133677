use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use charsoup::{Detector, Model};

pub fn run(model_path: &Path, file_path: &Path) -> Result<()> {
    let model = Model::load_mapped_owned(model_path)
        .with_context(|| format!("loading model from {}", model_path.display()))?;
    let text = fs::read_to_string(file_path)
        .with_context(|| format!("reading {}", file_path.display()))?;

    let mut detector = Detector::new(&model)?;
    detector.add_text(&text);
    let results = detector.detect_all();

    println!("entropy: {:.3} bits", detector.distribution_entropy());
    for result in results.iter().take(10) {
        match &result.label {
            Some(label) => println!(
                "{label:<8} raw={:.4} band={:?} confidence={:.4}",
                result.raw_prob, result.band, result.confidence_score
            ),
            None => println!(
                "(no confident label) confidence={:.4}",
                result.confidence_score
            ),
        }
    }

    Ok(())
}
