//! `gemi models`: the model catalog as a Markdown document.

use crate::backend::GenerativeBackend;
use crate::catalog::catalog_document_markdown;
use crate::cli::config::GlobalConfig;
use crate::cli::spinner;
use crate::render::Renderer;
use crate::types::Model;
use crate::Result;

pub async fn run(global: &GlobalConfig) -> Result<()> {
    let client = global.client(Model::default())?;
    let mut renderer = global.renderer();
    print_catalog(&client, &mut renderer).await
}

/// Fetches the catalog from `backend` and prints it.
pub async fn print_catalog<B: GenerativeBackend>(
    backend: &B,
    renderer: &mut dyn Renderer,
) -> Result<()> {
    let progress = spinner("Fetching available models ");
    let models = backend.list_models().await;
    progress.finish_and_clear();
    let models = models?;
    tracing::debug!(count = models.len(), "fetched model catalog");

    renderer.print_title("Available Gemini Models");
    renderer.print_markdown(&catalog_document_markdown(&models));
    Ok(())
}
