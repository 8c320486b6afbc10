//! Colour palettes, contrast and font scale, written out as CSS variables.

use wasm_bindgen::JsCast;
use web_sys::HtmlElement;

use crate::error::{AppError, Result};

use super::storage::{Contrast, FontSize, Settings, ThemeName};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Palette {
    pub background: &'static str,
    pub surface: &'static str,
    pub text: &'static str,
    pub text_secondary: &'static str,
    pub border: &'static str,
    pub primary: &'static str,
    pub primary_hover: &'static str,
    pub success: &'static str,
    pub warning: &'static str,
    pub error: &'static str,
}

pub const WHITE: Palette = Palette {
    background: "#ffffff",
    surface: "#f5f5f5",
    text: "#333333",
    text_secondary: "#666666",
    border: "#e0e0e0",
    primary: "#4a90d9",
    primary_hover: "#3a7bc8",
    success: "#4caf50",
    warning: "#ff9800",
    error: "#f44336",
};

pub const BLACK: Palette = Palette {
    background: "#1a1a1a",
    surface: "#2d2d2d",
    text: "#e0e0e0",
    text_secondary: "#a0a0a0",
    border: "#404040",
    primary: "#5a9fe9",
    primary_hover: "#4a8fd9",
    success: "#66bb6a",
    warning: "#ffb74d",
    error: "#ef5350",
};

pub const SEPIA: Palette = Palette {
    background: "#f4ecd8",
    surface: "#ebe3cf",
    text: "#5b4636",
    text_secondary: "#7a6a5a",
    border: "#d4c9b5",
    primary: "#8b7355",
    primary_hover: "#7a6245",
    success: "#6b8e23",
    warning: "#cd853f",
    error: "#cd5c5c",
};

pub const GRAY: Palette = Palette {
    background: "#e8e8e8",
    surface: "#d8d8d8",
    text: "#404040",
    text_secondary: "#606060",
    border: "#c0c0c0",
    primary: "#607d8b",
    primary_hover: "#546e7a",
    success: "#66bb6a",
    warning: "#ffa726",
    error: "#ef5350",
};

impl ThemeName {
    pub fn palette(self) -> &'static Palette {
        match self {
            ThemeName::White => &WHITE,
            ThemeName::Black => &BLACK,
            ThemeName::Sepia => &SEPIA,
            ThemeName::Gray => &GRAY,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContrastLevel {
    pub text_opacity: f64,
    pub border_opacity: f64,
    pub shadow_opacity: f64,
    pub bold: bool,
}

impl Contrast {
    pub fn level(self) -> ContrastLevel {
        match self {
            Contrast::Low => ContrastLevel {
                text_opacity: 0.7,
                border_opacity: 0.5,
                shadow_opacity: 0.05,
                bold: false,
            },
            Contrast::Medium => ContrastLevel {
                text_opacity: 1.0,
                border_opacity: 1.0,
                shadow_opacity: 0.1,
                bold: false,
            },
            Contrast::High => ContrastLevel {
                text_opacity: 1.0,
                border_opacity: 1.0,
                shadow_opacity: 0.2,
                bold: true,
            },
        }
    }
}

/// Pixel sizes: base, small, large, xlarge, xxlarge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FontScale {
    pub base: u32,
    pub small: u32,
    pub large: u32,
    pub xlarge: u32,
    pub xxlarge: u32,
}

impl FontSize {
    pub fn scale(self) -> FontScale {
        match self {
            FontSize::Medium => FontScale {
                base: 16,
                small: 14,
                large: 20,
                xlarge: 24,
                xxlarge: 32,
            },
            FontSize::Large => FontScale {
                base: 20,
                small: 18,
                large: 26,
                xlarge: 32,
                xxlarge: 42,
            },
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Theme {
    pub name: ThemeName,
    pub contrast: Contrast,
    pub font_size: FontSize,
}

impl Theme {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            name: settings.theme,
            contrast: settings.contrast,
            font_size: settings.font_size,
        }
    }

    pub fn palette(&self) -> &'static Palette {
        self.name.palette()
    }

    pub fn body_class(&self) -> String {
        format!(
            "theme-{} contrast-{} font-{}",
            self.name.key(),
            self.contrast.key(),
            self.font_size.key()
        )
    }

    pub fn css_vars(&self) -> Vec<(&'static str, String)> {
        let p = self.palette();
        let c = self.contrast.level();
        let f = self.font_size.scale();
        let px = |v: u32| format!("{}px", v);
        vec![
            ("--color-background", p.background.to_string()),
            ("--color-surface", p.surface.to_string()),
            ("--color-text", p.text.to_string()),
            ("--color-text-secondary", p.text_secondary.to_string()),
            ("--color-border", p.border.to_string()),
            ("--color-primary", p.primary.to_string()),
            ("--color-primary-hover", p.primary_hover.to_string()),
            ("--color-success", p.success.to_string()),
            ("--color-warning", p.warning.to_string()),
            ("--color-error", p.error.to_string()),
            ("--text-opacity", c.text_opacity.to_string()),
            ("--border-opacity", c.border_opacity.to_string()),
            ("--shadow-opacity", c.shadow_opacity.to_string()),
            ("--text-weight", if c.bold { "bold" } else { "normal" }.to_string()),
            ("--font-size-base", px(f.base)),
            ("--font-size-small", px(f.small)),
            ("--font-size-large", px(f.large)),
            ("--font-size-xlarge", px(f.xlarge)),
            ("--font-size-xxlarge", px(f.xxlarge)),
        ]
    }

    /// Writes the variables on `<html>` and the class list on `<body>`.
    pub fn apply(&self) -> Result<()> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or(AppError::Missing("document"))?;
        let root = document
            .document_element()
            .and_then(|el| el.dyn_into::<HtmlElement>().ok())
            .ok_or(AppError::Missing("document element"))?;
        let style = root.style();
        for (name, value) in self.css_vars() {
            style.set_property(name, &value)?;
        }
        if let Some(body) = document.body() {
            body.set_class_name(&self.body_class());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palettes_by_name() {
        assert_eq!(ThemeName::White.palette().background, "#ffffff");
        assert_eq!(ThemeName::Black.palette().primary, "#5a9fe9");
        assert_eq!(ThemeName::Sepia.palette().text, "#5b4636");
        assert_eq!(ThemeName::Gray.palette().error, "#ef5350");
    }

    #[test]
    fn settings_drive_class_and_variables() {
        let settings = Settings {
            theme: ThemeName::Sepia,
            contrast: Contrast::High,
            font_size: FontSize::Large,
            ..Settings::default()
        };
        let theme = Theme::from_settings(&settings);
        assert_eq!(theme.body_class(), "theme-sepia contrast-high font-large");

        let vars = theme.css_vars();
        let get = |name: &str| {
            vars.iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| v.clone())
                .unwrap()
        };
        assert_eq!(get("--color-background"), "#f4ecd8");
        assert_eq!(get("--text-weight"), "bold");
        assert_eq!(get("--shadow-opacity"), "0.2");
        assert_eq!(get("--font-size-xxlarge"), "42px");
        assert_eq!(vars.len(), 19);
    }

    #[test]
    fn low_contrast_softens_text() {
        let level = Contrast::Low.level();
        assert_eq!(level.text_opacity, 0.7);
        assert!(!level.bold);
        assert_eq!(FontSize::Medium.scale().base, 16);
    }
}
