use std::io::Cursor;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use promptdeck_contracts::models::DRYRUN_PROVIDER;
use promptdeck_contracts::request::GenerationRequest;
use promptdeck_contracts::response::{GenerationResponse, Part};
use sha2::{Digest, Sha256};

use crate::client::GenerationApi;
use crate::error::ActionError;

const DRYRUN_IMAGE_SIDE: u32 = 256;

/// Offline stand-in for the remote API. Answers deterministically from the
/// prompt so sessions can be exercised without a key or network.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryrunApi;

impl GenerationApi for DryrunApi {
    fn name(&self) -> &str {
        DRYRUN_PROVIDER
    }

    fn generate(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, ActionError> {
        let mut summary = format!("[{model}] dry run for: {}", request.prompt());
        if let Some(options) = request.options() {
            summary.push_str(&format!(
                " (max_output_tokens={}, temperature={})",
                options.max_output_tokens(),
                options.temperature()
            ));
        }
        let mut parts = vec![Part::text(summary)];
        if request.expects_image() {
            let png = solid_png(request.prompt()).map_err(|err| ActionError::NetworkOrApi {
                status: None,
                message: format!("dryrun image encode failed: {err}"),
            })?;
            parts.push(Part::inline_image("image/png", BASE64.encode(png)));
        }
        Ok(GenerationResponse::from_parts(parts))
    }
}

fn solid_png(prompt: &str) -> image::ImageResult<Vec<u8>> {
    let (r, g, b) = color_from_prompt(prompt);
    let image = RgbImage::from_pixel(DRYRUN_IMAGE_SIDE, DRYRUN_IMAGE_SIDE, Rgb([r, g, b]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image).write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

fn color_from_prompt(prompt: &str) -> (u8, u8, u8) {
    let digest = Sha256::digest(prompt.as_bytes());
    (digest[0], digest[1], digest[2])
}
