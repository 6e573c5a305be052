// Provider prompts for each shoot configuration

use serde::Serialize;
use validator::Validate;

use crate::models::generation::ReferenceImage;
use crate::models::shoot::{JewelryShootConfig, ModelShootConfig, TemplateShootConfig};
use crate::services::orchestrator::CallSite;

/// A call-site configuration the orchestrator can turn into a provider job
pub trait ShootPrompt: Validate + Serialize + Send + Sync + 'static {
    const CALL_SITE: CallSite;

    fn prompt(&self) -> String;

    /// Images that go ahead of the user's references, in order
    fn leading_images(&self) -> Vec<ReferenceImage> {
        Vec::new()
    }
}

/// Human-readable form of an allow-listed option ("east_asian" -> "east asian")
pub fn describe<T: Serialize>(option: &T) -> String {
    match serde_json::to_value(option) {
        Ok(serde_json::Value::String(s)) => s.replace('_', " "),
        _ => String::new(),
    }
}

impl ShootPrompt for ModelShootConfig {
    const CALL_SITE: CallSite = CallSite::Model;

    fn prompt(&self) -> String {
        format!(
            "Professional fashion photograph of a {age} {ethnicity} {gender} model with a {body} build, \
             {pose} pose, {background} background. The model wears exactly the garments shown in the \
             reference images, preserving their color, fabric, pattern and fit. Full body, 9:16 framing, \
             natural lighting, photorealistic.",
            age = describe(&self.age_range),
            ethnicity = describe(&self.ethnicity),
            gender = describe(&self.gender),
            body = describe(&self.body_type),
            pose = describe(&self.pose),
            background = describe(&self.background),
        )
    }
}

impl ShootPrompt for JewelryShootConfig {
    const CALL_SITE: CallSite = CallSite::JewelryPreset;

    fn prompt(&self) -> String {
        format!(
            "Luxury product photograph, {preset} framing of a {jewelry} worn on {skin} skin, \
             {background} background. Reproduce the piece from the reference images exactly, \
             including metal tone, stones and proportions. Square composition, macro detail, \
             soft studio lighting, photorealistic.",
            preset = describe(&self.preset),
            jewelry = describe(&self.jewelry_type),
            skin = describe(&self.skin_tone),
            background = describe(&self.background),
        )
    }
}

impl ShootPrompt for TemplateShootConfig {
    const CALL_SITE: CallSite = CallSite::Template;

    fn prompt(&self) -> String {
        let subject = match &self.gender {
            Some(gender) => format!("the {} model", describe(gender)),
            None => "the model".to_string(),
        };

        format!(
            "Recreate the first reference image as the scene: keep its composition, pose, lighting \
             and background. Dress {} in the garments shown in the remaining reference images, \
             preserving their color, fabric and fit. 9:16 framing, photorealistic.",
            subject
        )
    }

    fn leading_images(&self) -> Vec<ReferenceImage> {
        vec![ReferenceImage::from_url("template", &self.template_image_url)]
    }
}
