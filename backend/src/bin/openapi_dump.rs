//! Print the OpenAPI document as JSON.

use boardsync::ApiDoc;
use color_eyre::eyre::{Context, Result};
use utoipa::OpenApi;

fn main() -> Result<()> {
    color_eyre::install()?;
    let document = ApiDoc::openapi()
        .to_pretty_json()
        .context("failed to serialize the OpenAPI document")?;
    println!("{document}");
    Ok(())
}
