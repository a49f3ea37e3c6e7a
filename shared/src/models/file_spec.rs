//! Print specification of one uploaded document

use serde::{Deserialize, Serialize};

/// Normalize a free-form option token: lowercase, alphanumerics only.
fn option_token(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// 打印模式
///
/// Unknown strings deserialize to [`PrintMode::BlackAndWhite`], the cheapest mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum PrintMode {
    /// 黑白
    #[default]
    BlackAndWhite,
    /// 彩色
    Color,
    /// 混合 (部分页彩色, 由 color_page_spec 指定)
    Mixed,
}

impl PrintMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BlackAndWhite => "blackAndWhite",
            Self::Color => "color",
            Self::Mixed => "mixed",
        }
    }
}

impl From<&str> for PrintMode {
    fn from(raw: &str) -> Self {
        match option_token(raw).as_str() {
            "color" | "colour" => Self::Color,
            "mixed" => Self::Mixed,
            "blackandwhite" | "bw" | "mono" | "grayscale" => Self::BlackAndWhite,
            other => {
                tracing::debug!(value = other, "Unknown print mode, using blackAndWhite");
                Self::BlackAndWhite
            }
        }
    }
}

impl From<String> for PrintMode {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<PrintMode> for &'static str {
    fn from(mode: PrintMode) -> Self {
        mode.as_str()
    }
}

/// 特殊纸张
///
/// Unknown strings deserialize to [`SpecialPaper::None`] (no surcharge).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum SpecialPaper {
    #[default]
    None,
    Glossy,
    Matte,
    Transparent,
}

impl SpecialPaper {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Glossy => "glossy",
            Self::Matte => "matte",
            Self::Transparent => "transparent",
        }
    }
}

impl From<&str> for SpecialPaper {
    fn from(raw: &str) -> Self {
        match option_token(raw).as_str() {
            "glossy" => Self::Glossy,
            "matte" => Self::Matte,
            "transparent" => Self::Transparent,
            _ => Self::None,
        }
    }
}

impl From<String> for SpecialPaper {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<SpecialPaper> for &'static str {
    fn from(paper: SpecialPaper) -> Self {
        paper.as_str()
    }
}

/// 装订方式
///
/// Unknown strings deserialize to [`BindingType::None`] (no surcharge).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum BindingType {
    #[default]
    None,
    Spiral,
    Staple,
    Hardcover,
}

impl BindingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Spiral => "spiral",
            Self::Staple => "staple",
            Self::Hardcover => "hardcover",
        }
    }
}

impl From<&str> for BindingType {
    fn from(raw: &str) -> Self {
        match option_token(raw).as_str() {
            "spiral" => Self::Spiral,
            "staple" | "stapled" => Self::Staple,
            "hardcover" => Self::Hardcover,
            _ => Self::None,
        }
    }
}

impl From<String> for BindingType {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<BindingType> for &'static str {
    fn from(binding: BindingType) -> Self {
        binding.as_str()
    }
}

/// Binding request for a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Binding {
    #[serde(default)]
    pub needed: bool,
    #[serde(default, rename = "type")]
    pub binding_type: BindingType,
}

impl Binding {
    pub fn new(binding_type: BindingType) -> Self {
        Self {
            needed: binding_type != BindingType::None,
            binding_type,
        }
    }

    /// The binding actually charged, `None` when not requested.
    pub fn effective(&self) -> BindingType {
        if self.needed {
            self.binding_type
        } else {
            BindingType::None
        }
    }
}

/// Uploaded document metadata, used to estimate page counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSource {
    pub file_name: String,
    pub size_bytes: u64,
    /// MIME type reported by the upload widget; guessed from the file name when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// One uploaded document's print configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSpec {
    /// Number of copies (0 is treated as 1)
    #[serde(default = "default_copies")]
    pub copies: u32,
    #[serde(default)]
    pub print_mode: PrintMode,
    /// Page-range string, only interpreted when `print_mode == Mixed`
    #[serde(default)]
    pub color_page_spec: String,
    /// Known page count; estimated from `source` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    #[serde(default)]
    pub duplex: bool,
    #[serde(default)]
    pub special_paper: SpecialPaper,
    #[serde(default)]
    pub binding: Binding,
    #[serde(default)]
    pub specific_requirements: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<FileSource>,
}

fn default_copies() -> u32 {
    1
}

impl Default for FileSpec {
    fn default() -> Self {
        Self {
            copies: 1,
            print_mode: PrintMode::BlackAndWhite,
            color_page_spec: String::new(),
            page_count: None,
            duplex: false,
            special_paper: SpecialPaper::None,
            binding: Binding::default(),
            specific_requirements: String::new(),
            source: None,
        }
    }
}

impl FileSpec {
    /// Copies actually printed (at least one)
    pub fn effective_copies(&self) -> u32 {
        self.copies.max(1)
    }

    /// The color page spec, `None` unless the file is in mixed mode
    pub fn mixed_color_spec(&self) -> Option<&str> {
        match self.print_mode {
            PrintMode::Mixed => Some(self.color_page_spec.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_full_spec() {
        let json = r#"{
            "copies": 2,
            "printMode": "mixed",
            "colorPageSpec": "1,3,5-6",
            "pageCount": 6,
            "duplex": false,
            "specialPaper": "glossy",
            "binding": { "needed": true, "type": "spiral" },
            "specificRequirements": "staple top-left"
        }"#;
        let spec: FileSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.copies, 2);
        assert_eq!(spec.print_mode, PrintMode::Mixed);
        assert_eq!(spec.mixed_color_spec(), Some("1,3,5-6"));
        assert_eq!(spec.page_count, Some(6));
        assert_eq!(spec.special_paper, SpecialPaper::Glossy);
        assert_eq!(spec.binding.effective(), BindingType::Spiral);
    }

    #[test]
    fn test_unknown_options_fall_back_to_cheapest() {
        let json = r#"{
            "printMode": "sepia",
            "specialPaper": "gold-leaf",
            "binding": { "needed": true, "type": "leather" }
        }"#;
        let spec: FileSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.print_mode, PrintMode::BlackAndWhite);
        assert_eq!(spec.special_paper, SpecialPaper::None);
        assert_eq!(spec.binding.effective(), BindingType::None);
        assert_eq!(spec.copies, 1);
    }

    #[test]
    fn test_option_aliases_are_case_insensitive() {
        assert_eq!(PrintMode::from("Black and White"), PrintMode::BlackAndWhite);
        assert_eq!(PrintMode::from("COLOUR"), PrintMode::Color);
        assert_eq!(BindingType::from("Hard-Cover"), BindingType::Hardcover);
        assert_eq!(SpecialPaper::from(" Matte "), SpecialPaper::Matte);
    }

    #[test]
    fn test_serialize_canonical_names() {
        let spec = FileSpec {
            print_mode: PrintMode::BlackAndWhite,
            binding: Binding::new(BindingType::Staple),
            ..Default::default()
        };
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value["printMode"], "blackAndWhite");
        assert_eq!(value["specialPaper"], "none");
        assert_eq!(value["binding"]["type"], "staple");
        assert_eq!(value["binding"]["needed"], true);
        assert!(value.get("pageCount").is_none());
    }

    #[test]
    fn test_binding_not_needed_is_not_charged() {
        let binding = Binding {
            needed: false,
            binding_type: BindingType::Hardcover,
        };
        assert_eq!(binding.effective(), BindingType::None);
    }

    #[test]
    fn test_color_spec_ignored_outside_mixed() {
        let spec = FileSpec {
            print_mode: PrintMode::Color,
            color_page_spec: "1-3".into(),
            ..Default::default()
        };
        assert_eq!(spec.mixed_color_spec(), None);
        assert_eq!(
            FileSpec {
                copies: 0,
                ..Default::default()
            }
            .effective_copies(),
            1
        );
    }
}
