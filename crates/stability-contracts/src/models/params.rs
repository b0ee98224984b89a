use super::registry::StabilityModel;

pub const DEFAULT_MODEL: StabilityModel = StabilityModel::Core;
pub const DEFAULT_ASPECT_RATIO: AspectRatio = AspectRatio::Square;
pub const DEFAULT_OUTPUT_FORMAT: OutputFormat = OutputFormat::Png;
pub const DEFAULT_SEED: i64 = 0;
pub const DEFAULT_STRENGTH: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectRatio {
    Square,
    Landscape16x9,
    Portrait9x16,
    Landscape21x9,
    Portrait9x21,
    Landscape3x2,
    Portrait2x3,
    Landscape5x4,
    Portrait4x5,
    Landscape4x3,
    Portrait3x4,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 11] = [
        AspectRatio::Square,
        AspectRatio::Landscape16x9,
        AspectRatio::Portrait9x16,
        AspectRatio::Landscape21x9,
        AspectRatio::Portrait9x21,
        AspectRatio::Landscape3x2,
        AspectRatio::Portrait2x3,
        AspectRatio::Landscape5x4,
        AspectRatio::Portrait4x5,
        AspectRatio::Landscape4x3,
        AspectRatio::Portrait3x4,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape16x9 => "16:9",
            AspectRatio::Portrait9x16 => "9:16",
            AspectRatio::Landscape21x9 => "21:9",
            AspectRatio::Portrait9x21 => "9:21",
            AspectRatio::Landscape3x2 => "3:2",
            AspectRatio::Portrait2x3 => "2:3",
            AspectRatio::Landscape5x4 => "5:4",
            AspectRatio::Portrait4x5 => "4:5",
            AspectRatio::Landscape4x3 => "4:3",
            AspectRatio::Portrait3x4 => "3:4",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ratio| ratio.as_str() == raw)
    }

    pub fn tokens() -> Vec<&'static str> {
        Self::ALL.iter().map(|ratio| ratio.as_str()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 2] = [OutputFormat::Jpeg, OutputFormat::Png];

    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|format| format.as_str() == raw)
    }

    pub fn tokens() -> Vec<&'static str> {
        Self::ALL.iter().map(|format| format.as_str()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    TextToImage,
    ImageToImage,
}

impl GenerationMode {
    pub fn as_str(self) -> &'static str {
        match self {
            GenerationMode::TextToImage => "text-to-image",
            GenerationMode::ImageToImage => "image-to-image",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GenerationMode::TextToImage => "Text-to-image",
            GenerationMode::ImageToImage => "Image-to-image",
        }
    }
}
