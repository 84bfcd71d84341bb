//! Theme registry: every theme is the shared base stylesheet plus its own fragment
//!
//! Built once at startup and handed to the pipeline behind an `Arc`. Nothing
//! here is mutable after construction, so concurrent renders share the
//! stylesheet text freely.

use std::sync::Arc;

use crate::render::RenderError;

/// Layout and pagination rules common to every theme
pub const BASE_CSS: &str = include_str!("styles/base.css");

/// Theme used when none (or an unknown one) is requested
pub const DEFAULT_THEME: &str = "gaming";

/// (id, icon, label, description, fragment) in declaration order
const BUILTIN: &[(&str, &str, &str, &str, &str)] = &[
    ("gaming", "🎮", "Gaming", "Cyberpunk HUD - green/red", include_str!("styles/gaming.css")),
    ("corporate", "🏢", "Corporate", "Professional - blue/white", include_str!("styles/corporate.css")),
    ("zen", "🧘", "Zen", "Minimalist - earth tones", include_str!("styles/zen.css")),
    ("neon", "💜", "Neon", "Cyberpunk - pink/purple/cyan", include_str!("styles/neon.css")),
    ("minimal", "⬜", "Minimal", "Ultra clean - black/white", include_str!("styles/minimal.css")),
    ("luxury", "👑", "Luxury", "Elegant - gold/black", include_str!("styles/luxury.css")),
    ("nature", "🌿", "Nature", "Organic - forest green", include_str!("styles/nature.css")),
    ("tech", "🔷", "Tech", "Futuristic - tech blue", include_str!("styles/tech.css")),
    ("classic", "📜", "Classic", "Traditional - serif/paper", include_str!("styles/classic.css")),
];

/// A named, immutable stylesheet bundle
#[derive(Debug, Clone)]
pub struct Theme {
    pub id: &'static str,
    pub icon: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Base stylesheet followed by the theme fragment
    pub stylesheet: Arc<str>,
}

impl Theme {
    fn compose(
        id: &'static str,
        icon: &'static str,
        name: &'static str,
        description: &'static str,
        fragment: &str,
    ) -> Self {
        let mut css = String::with_capacity(BASE_CSS.len() + fragment.len() + 1);
        css.push_str(BASE_CSS);
        css.push('\n');
        css.push_str(fragment);
        Self {
            id,
            icon,
            name,
            description,
            stylesheet: Arc::from(css),
        }
    }

    /// Label shown in theme pickers, e.g. `🎮 Gaming`
    pub fn label(&self) -> String {
        format!("{} {}", self.icon, self.name)
    }
}

/// Read-only lookup from theme id to theme
#[derive(Debug)]
pub struct ThemeRegistry {
    themes: Vec<Theme>,
    default_index: usize,
}

impl Default for ThemeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ThemeRegistry {
    /// Compose all built-in themes
    pub fn new() -> Self {
        let themes: Vec<Theme> = BUILTIN
            .iter()
            .map(|&(id, icon, name, desc, fragment)| Theme::compose(id, icon, name, desc, fragment))
            .collect();
        let default_index = themes
            .iter()
            .position(|t| t.id == DEFAULT_THEME)
            .unwrap_or(0);
        tracing::debug!("Composed {} themes", themes.len());
        Self {
            themes,
            default_index,
        }
    }

    /// Theme ids in declaration order
    pub fn list_ids(&self) -> Vec<&'static str> {
        self.themes.iter().map(|t| t.id).collect()
    }

    pub fn get(&self, id: &str) -> Result<&Theme, RenderError> {
        self.themes
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| RenderError::UnknownTheme(id.to_string()))
    }

    pub fn stylesheet(&self, id: &str) -> Result<Arc<str>, RenderError> {
        self.get(id).map(|t| Arc::clone(&t.stylesheet))
    }

    pub fn description(&self, id: &str) -> Result<&'static str, RenderError> {
        self.get(id).map(|t| t.description)
    }

    pub fn default_theme(&self) -> &Theme {
        &self.themes[self.default_index]
    }

    /// Look up a theme, falling back to the default one
    pub fn get_or_default(&self, id: &str) -> &Theme {
        self.get(id).unwrap_or_else(|_| {
            tracing::warn!("Unknown theme '{}', using '{}'", id, self.default_theme().id);
            self.default_theme()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_theme_extends_base() {
        let registry = ThemeRegistry::new();
        for id in registry.list_ids() {
            let css = registry.stylesheet(id).unwrap();
            assert!(css.starts_with(BASE_CSS), "{id} misses base stylesheet");
            assert!(css.len() > BASE_CSS.len(), "{id} has no fragment");
            assert!(!registry.description(id).unwrap().is_empty());
        }
    }

    #[test]
    fn test_ids_are_stable() {
        let registry = ThemeRegistry::new();
        let first = registry.list_ids();
        assert_eq!(first, registry.list_ids());
        assert_eq!(first, ThemeRegistry::new().list_ids());
        assert_eq!(first.len(), 9);
        assert_eq!(first[0], "gaming");
        assert_eq!(first[8], "classic");
    }

    #[test]
    fn test_unknown_theme() {
        let registry = ThemeRegistry::new();
        assert!(matches!(
            registry.stylesheet("vaporwave"),
            Err(RenderError::UnknownTheme(id)) if id == "vaporwave"
        ));
        assert!(registry.description("vaporwave").is_err());
        assert_eq!(registry.get_or_default("vaporwave").id, DEFAULT_THEME);
    }

    #[test]
    fn test_label() {
        let registry = ThemeRegistry::new();
        assert_eq!(registry.get("zen").unwrap().label(), "🧘 Zen");
    }
}
