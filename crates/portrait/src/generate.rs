// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `portrait generate`: one batch of variations without starting the server.

use std::path::Path;
use std::sync::Arc;

use portrait_config::PortraitConfig;
use portrait_config::model::GenerationMode;
use portrait_core::PortraitError;
use portrait_gateway::{BaseSource, GenerationOutcome, GenerationService};
use portrait_imaging::VariationProducer;
use portrait_storage::{BaseFolder, ImageStore};
use tracing::info;

/// Generates `count` variations into the configured image directory.
///
/// `base` overrides the photo in the base folder; `local` forces local
/// filters even when a provider key is configured.
pub async fn run_generate(
    config: &PortraitConfig,
    count: u32,
    local: bool,
    base: Option<&Path>,
) -> Result<GenerationOutcome, PortraitError> {
    let mut config = config.clone();
    if local {
        config.generation.mode = GenerationMode::Local;
    }
    let producer = Arc::new(VariationProducer::from_config(&config)?);
    let store = Arc::new(ImageStore::new(&config.storage.image_dir));
    let folder = BaseFolder::new(&config.storage.base_dir, &config.storage.base_filename);
    let service = GenerationService::new(producer.clone(), store, folder);

    let source = match base {
        Some(path) => {
            let data = tokio::fs::read(path).await.map_err(|e| {
                PortraitError::InvalidArgument(format!("cannot read {}: {e}", path.display()))
            })?;
            let extension = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(str::to_ascii_lowercase)
                .unwrap_or_else(|| "jpg".to_string());
            BaseSource::Bytes { data, extension }
        }
        None => BaseSource::Folder,
    };

    info!(
        count,
        strategy = producer.primary_strategy().as_str(),
        "generating variations"
    );
    service.generate(source, count).await
}

pub fn print_outcome(outcome: &GenerationOutcome, image_dir: &str) {
    println!(
        "generated {} variation(s) in {image_dir}",
        outcome.filenames.len()
    );
    for name in &outcome.filenames {
        println!("  {name}");
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn png() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(24, 24, image::Rgb([200, 120, 40]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn config_in(dir: &Path) -> PortraitConfig {
        let mut config = PortraitConfig::default();
        config.storage.image_dir = dir.join("images").display().to_string();
        config.storage.base_dir = dir.join("base").display().to_string();
        config.generation.api_key = Some("unused".into());
        config
    }

    #[tokio::test]
    async fn generates_from_the_base_folder() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        BaseFolder::new(&config.storage.base_dir, &config.storage.base_filename)
            .replace(&png())
            .await
            .unwrap();

        let outcome = run_generate(&config, 3, true, None).await.unwrap();
        assert_eq!(outcome.filenames.len(), 3);
        for name in &outcome.filenames {
            assert!(dir.path().join("images").join(name).is_file());
        }
    }

    #[tokio::test]
    async fn explicit_base_path_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let photo = dir.path().join("me.PNG");
        std::fs::write(&photo, png()).unwrap();

        let outcome = run_generate(&config, 1, true, Some(&photo)).await.unwrap();
        assert_eq!(outcome.filenames.len(), 1);
    }

    #[tokio::test]
    async fn missing_inputs_are_invalid_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        let err = run_generate(&config, 2, true, None).await.unwrap_err();
        assert!(matches!(err, PortraitError::InvalidArgument(_)), "{err}");

        let missing = dir.path().join("nope.jpg");
        let err = run_generate(&config, 2, true, Some(&missing)).await.unwrap_err();
        assert!(err.to_string().contains("nope.jpg"));

        let err = run_generate(&config, 0, true, None).await.unwrap_err();
        assert!(matches!(err, PortraitError::InvalidArgument(_)));
    }
}
