use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::wizard::WizardError;

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 60;
pub const MIN_TIMEOUT_SECONDS: u64 = 10;
pub const MAX_TIMEOUT_SECONDS: u64 = 180;
pub const IMAGE_COUNT_OPTIONS: [u8; 8] = [1, 2, 3, 4, 5, 6, 7, 8];

/// Quality preset, mapped to the square base resolution the aspect ratio
/// is applied against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quality {
    Standard,
    High,
    Ultra,
}

impl Quality {
    pub const ALL: [Quality; 3] = [Quality::Standard, Quality::High, Quality::Ultra];

    pub fn base_size(self) -> (u32, u32) {
        match self {
            Quality::Standard => (768, 768),
            Quality::High => (1024, 1024),
            Quality::Ultra => (1440, 1440),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Quality::Standard => "Standard",
            Quality::High => "High",
            Quality::Ultra => "Ultra",
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Quality::Standard => "standard",
            Quality::High => "high",
            Quality::Ultra => "ultra",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|q| q.token() == token)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    Square,
    Landscape,
    Portrait,
    Classic,
    ClassicPortrait,
    Cinematic,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 6] = [
        AspectRatio::Square,
        AspectRatio::Landscape,
        AspectRatio::Portrait,
        AspectRatio::Classic,
        AspectRatio::ClassicPortrait,
        AspectRatio::Cinematic,
    ];

    pub fn ratio(self) -> (u32, u32) {
        match self {
            AspectRatio::Square => (1, 1),
            AspectRatio::Landscape => (16, 9),
            AspectRatio::Portrait => (9, 16),
            AspectRatio::Classic => (4, 3),
            AspectRatio::ClassicPortrait => (3, 4),
            AspectRatio::Cinematic => (21, 9),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1 (Square)",
            AspectRatio::Landscape => "16:9 (Landscape)",
            AspectRatio::Portrait => "9:16 (Portrait)",
            AspectRatio::Classic => "4:3 (Classic)",
            AspectRatio::ClassicPortrait => "3:4 (Classic Portrait)",
            AspectRatio::Cinematic => "21:9 (Cinematic)",
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            AspectRatio::Square => "square",
            AspectRatio::Landscape => "landscape",
            AspectRatio::Portrait => "portrait",
            AspectRatio::Classic => "classic",
            AspectRatio::ClassicPortrait => "classic_portrait",
            AspectRatio::Cinematic => "cinematic",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.token() == token)
    }

    /// Picks one concrete preset. Callers store the result; the choice is
    /// never re-rolled for the same session.
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        *Self::ALL.choose(rng).unwrap_or(&AspectRatio::Square)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StylePreset {
    Realistic,
    Anime,
    DigitalArt,
    OilPainting,
    Watercolor,
    Cyberpunk,
    Fantasy,
    PencilSketch,
    Render3d,
}

impl StylePreset {
    pub const ALL: [StylePreset; 9] = [
        StylePreset::Realistic,
        StylePreset::Anime,
        StylePreset::DigitalArt,
        StylePreset::OilPainting,
        StylePreset::Watercolor,
        StylePreset::Cyberpunk,
        StylePreset::Fantasy,
        StylePreset::PencilSketch,
        StylePreset::Render3d,
    ];

    /// Text appended to the generation prompt as "<label> style".
    pub fn label(self) -> &'static str {
        match self {
            StylePreset::Realistic => "realistic",
            StylePreset::Anime => "anime",
            StylePreset::DigitalArt => "digital art",
            StylePreset::OilPainting => "oil painting",
            StylePreset::Watercolor => "watercolor",
            StylePreset::Cyberpunk => "cyberpunk",
            StylePreset::Fantasy => "fantasy",
            StylePreset::PencilSketch => "pencil sketch",
            StylePreset::Render3d => "3D render",
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            StylePreset::Realistic => "realistic",
            StylePreset::Anime => "anime",
            StylePreset::DigitalArt => "digital_art",
            StylePreset::OilPainting => "oil_painting",
            StylePreset::Watercolor => "watercolor",
            StylePreset::Cyberpunk => "cyberpunk",
            StylePreset::Fantasy => "fantasy",
            StylePreset::PencilSketch => "pencil_sketch",
            StylePreset::Render3d => "render3d",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.token() == token)
    }

    pub fn random<R: Rng>(rng: &mut R) -> Self {
        *Self::ALL.choose(rng).unwrap_or(&StylePreset::Realistic)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputType {
    Images,
    Urls,
}

impl OutputType {
    pub fn label(self) -> &'static str {
        match self {
            OutputType::Images => "Images",
            OutputType::Urls => "URLs",
        }
    }
}

/// A fully collected generation request. Only concrete values appear here:
/// "surprise me" ratio/style picks are resolved before they are stored, so
/// replaying a session is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub prompt: String,
    pub negative_prompt: String,
    pub timeout_seconds: u64,
    pub num_images: u8,
    pub quality: Quality,
    pub ratio: AspectRatio,
    pub style: StylePreset,
    pub output_type: OutputType,
}

/// Working set while the wizard is still collecting fields. Populated
/// strictly in wizard order; `complete` turns it into a `Session` once the
/// output type lands.
#[derive(Debug, Clone, Default)]
pub struct Draft {
    pub prompt: String,
    pub negative_prompt: String,
    pub timeout_seconds: u64,
    pub num_images: Option<u8>,
    pub quality: Option<Quality>,
    pub ratio: Option<AspectRatio>,
    pub style: Option<StylePreset>,
}

impl Draft {
    pub fn new(prompt: String) -> Self {
        Draft {
            prompt,
            negative_prompt: String::new(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            num_images: None,
            quality: None,
            ratio: None,
            style: None,
        }
    }

    pub fn complete(self, output_type: OutputType) -> Option<Session> {
        Some(Session {
            prompt: self.prompt,
            negative_prompt: self.negative_prompt,
            timeout_seconds: self.timeout_seconds,
            num_images: self.num_images?,
            quality: self.quality?,
            ratio: self.ratio?,
            style: self.style?,
            output_type,
        })
    }
}

/// Output dimensions: the shorter ratio component scales down from the
/// quality's base square, the longer one keeps the base edge.
pub fn target_dimensions(quality: Quality, ratio: AspectRatio) -> (u32, u32) {
    let (base_w, base_h) = quality.base_size();
    let (ratio_w, ratio_h) = ratio.ratio();
    if ratio_w >= ratio_h {
        (base_w, base_w * ratio_h / ratio_w)
    } else {
        (base_h * ratio_w / ratio_h, base_h)
    }
}

pub fn parse_timeout_seconds(text: &str) -> Result<u64, WizardError> {
    let value = text
        .trim()
        .parse::<u64>()
        .map_err(|_| WizardError::InvalidInput(format!("'{}' is not a number", text.trim())))?;
    if !(MIN_TIMEOUT_SECONDS..=MAX_TIMEOUT_SECONDS).contains(&value) {
        return Err(WizardError::InvalidInput(format!(
            "timeout must be between {MIN_TIMEOUT_SECONDS} and {MAX_TIMEOUT_SECONDS} seconds"
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn landscape_scales_height_down_from_base_width() {
        assert_eq!(
            target_dimensions(Quality::High, AspectRatio::Landscape),
            (1024, 576)
        );
    }

    #[test]
    fn portrait_scales_width_down_from_base_height() {
        assert_eq!(
            target_dimensions(Quality::Standard, AspectRatio::Portrait),
            (432, 768)
        );
    }

    #[test]
    fn square_keeps_the_base_resolution() {
        assert_eq!(
            target_dimensions(Quality::Ultra, AspectRatio::Square),
            (1440, 1440)
        );
    }

    #[test]
    fn cinematic_floors_the_division() {
        // 768 * 9 / 21 = 329.14..., floored.
        assert_eq!(
            target_dimensions(Quality::Standard, AspectRatio::Cinematic),
            (768, 329)
        );
    }

    #[test]
    fn random_ratio_is_a_member_of_the_preset_set() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let ratio = AspectRatio::random(&mut rng);
            assert!(AspectRatio::ALL.contains(&ratio));
        }
    }

    #[test]
    fn random_style_is_a_member_of_the_preset_set() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let style = StylePreset::random(&mut rng);
            assert!(StylePreset::ALL.contains(&style));
        }
    }

    #[test]
    fn timeout_bounds_are_enforced() {
        assert!(parse_timeout_seconds("10").is_ok());
        assert!(parse_timeout_seconds("180").is_ok());
        assert!(parse_timeout_seconds(" 60 ").is_ok());
        assert!(parse_timeout_seconds("9").is_err());
        assert!(parse_timeout_seconds("181").is_err());
        assert!(parse_timeout_seconds("fast").is_err());
    }

    #[test]
    fn draft_completes_only_when_every_field_is_set() {
        let mut draft = Draft::new("a red fox".to_string());
        assert!(draft.clone().complete(OutputType::Images).is_none());

        draft.num_images = Some(3);
        draft.quality = Some(Quality::Standard);
        draft.ratio = Some(AspectRatio::Square);
        draft.style = Some(StylePreset::Realistic);
        let session = draft.complete(OutputType::Images).unwrap();
        assert_eq!(session.timeout_seconds, DEFAULT_TIMEOUT_SECONDS);
        assert_eq!(session.num_images, 3);
    }
}
