use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Selection id reserved for the free-text prompt.
pub const CUSTOM_STYLE_ID: &str = "custom";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StyleCategory {
    Natural,
    Color,
    Creative,
    Short,
}

impl StyleCategory {
    /// Display order for listings.
    pub const ALL: [StyleCategory; 4] = [Self::Natural, Self::Color, Self::Creative, Self::Short];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Natural => "Natural",
            Self::Color => "Color",
            Self::Creative => "Creative",
            Self::Short => "Short",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StylePreset {
    pub id: String,
    pub name: String,
    pub prompt: String,
    pub category: StyleCategory,
}

#[derive(Debug, Clone)]
pub struct StyleCatalog {
    presets: IndexMap<String, StylePreset>,
}

impl Default for StyleCatalog {
    fn default() -> Self {
        Self::new(None)
    }
}

impl StyleCatalog {
    pub fn new(presets: Option<IndexMap<String, StylePreset>>) -> Self {
        Self {
            presets: presets.unwrap_or_else(default_presets),
        }
    }

    pub fn get(&self, id: &str) -> Option<&StylePreset> {
        self.presets.get(id)
    }

    pub fn list(&self) -> impl Iterator<Item = &StylePreset> {
        self.presets.values()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.presets.keys().map(String::as_str).collect()
    }

    pub fn by_category(&self, category: StyleCategory) -> Vec<StylePreset> {
        self.presets
            .values()
            .filter(|preset| preset.category == category)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}

fn default_presets() -> IndexMap<String, StylePreset> {
    let mut map = IndexMap::new();

    let mut insert = |id: &str, name: &str, prompt: &str, category: StyleCategory| {
        map.insert(
            id.to_string(),
            StylePreset {
                id: id.to_string(),
                name: name.to_string(),
                prompt: prompt.to_string(),
                category,
            },
        );
    };

    insert(
        "blonde-bob",
        "Platinum Bob",
        "change the hair to a sleek platinum blonde bob cut, photorealistic",
        StyleCategory::Natural,
    );
    insert(
        "long-wavy-brunette",
        "Wavy Brunette",
        "change the hair to long, voluminous wavy dark brown hair, luxury style",
        StyleCategory::Natural,
    );
    insert(
        "pixie-pink",
        "Neon Pink Pixie",
        "change the hair to a short textured pixie cut dyed vibrant neon pink",
        StyleCategory::Color,
    );
    insert(
        "silver-fox",
        "Silver Fox",
        "change the hair to sophisticated silver grey hair, messy undercut style",
        StyleCategory::Color,
    );
    insert(
        "cyber-dreads",
        "Cyber Dreads",
        "change the hair to futuristic cybernetic dreadlocks with blue LED glowing tips",
        StyleCategory::Creative,
    );
    insert(
        "rainbow-braids",
        "Rainbow Braids",
        "change the hair to long box braids with a rainbow color gradient",
        StyleCategory::Creative,
    );
    insert(
        "buzz-cut",
        "Clean Buzz",
        "change the hair to a very short military buzz cut",
        StyleCategory::Short,
    );
    insert(
        "afro-volume",
        "Mega Afro",
        "change the hair to a large, perfectly shaped natural afro",
        StyleCategory::Natural,
    );

    map
}
