//! Image generation placeholder. Returns a description, no pixels.

use crate::agent::capability::{
    Capability, CapabilityInput, CapabilityParam, CapabilityResult, CapabilitySignature,
};
use crate::agent::error::AgentResult;

pub struct ImageGenTool;

impl Capability for ImageGenTool {
    fn signature(&self) -> CapabilitySignature {
        CapabilitySignature {
            name: "image_gen".into(),
            description: "Produce an image placeholder for a prompt.".into(),
            parameters: vec![
                CapabilityParam::required("prompt", "What the image should show."),
                CapabilityParam::optional("size", "WIDTHxHEIGHT (default: 512x512)."),
            ],
        }
    }

    fn run(&self, input: &CapabilityInput) -> AgentResult<CapabilityResult> {
        let prompt = input.require_str("prompt", "image_gen")?;
        let size = input.get_str("size").unwrap_or("512x512");

        let Some((w, h)) = parse_size(size) else {
            return Ok(CapabilityResult::failure(format!(
                "Invalid size \"{size}\": expected WIDTHxHEIGHT, e.g. 512x512."
            )));
        };

        Ok(
            CapabilityResult::ok(format!("Generated image placeholder for: '{prompt}' ({size})"))
                .with_metadata("width", w)
                .with_metadata("height", h),
        )
    }
}

fn parse_size(size: &str) -> Option<(u32, u32)> {
    let (w, h) = size.split_once(['x', 'X'])?;
    let w: u32 = w.trim().parse().ok()?;
    let h: u32 = h.trim().parse().ok()?;
    (w > 0 && h > 0).then_some((w, h))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_mentions_prompt_and_size() {
        let out = ImageGenTool
            .run(&CapabilityInput::new().with_param("prompt", "a lighthouse"))
            .unwrap();
        assert_eq!(
            out.output_text(),
            "Generated image placeholder for: 'a lighthouse' (512x512)"
        );
    }

    #[test]
    fn size_parsing() {
        assert_eq!(parse_size("1024x768"), Some((1024, 768)));
        assert_eq!(parse_size("0x10"), None);
        assert_eq!(parse_size("big"), None);
    }
}
