//! Theme colours used by markers, circles and the trip path.

use serde::{Deserialize, Serialize};

use crate::{MapConfig, MapError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

/// Palette consumed by the renderer. Colours are hex strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapTheme {
    pub mode: ThemeMode,
    /// Trip path colour
    pub primary: String,
    /// Place pins and their circles
    pub secondary: String,
    /// Latest location and added contents
    pub success: String,
    /// Removed contents
    pub danger: String,
}

impl Default for MapTheme {
    fn default() -> Self {
        Self {
            mode: ThemeMode::Light,
            primary: "#2f6fde".to_string(),
            secondary: "#7a4fd6".to_string(),
            success: "#2e9e5b".to_string(),
            danger: "#d64545".to_string(),
        }
    }
}

impl MapTheme {
    pub fn dark() -> Self {
        Self {
            mode: ThemeMode::Dark,
            ..Self::default()
        }
    }

    /// Base map style id for this theme's mode.
    pub fn map_id<'a>(&self, config: &'a MapConfig) -> &'a str {
        match self.mode {
            ThemeMode::Light => &config.map_id_light,
            ThemeMode::Dark => &config.map_id_dark,
        }
    }

    /// Primary colour as RGBA; falls back to opaque black when malformed.
    pub fn primary_rgba(&self) -> [u8; 4] {
        parse_hex_colour(&self.primary).unwrap_or_else(|e| {
            log::warn!("[ManifestMap] {}, using black for the trip path", e);
            [0, 0, 0, 255]
        })
    }
}

/// Parse `#rgb`, `#rrggbb` or `#rrggbbaa` into RGBA bytes.
pub fn parse_hex_colour(value: &str) -> Result<[u8; 4]> {
    let invalid = || MapError::InvalidColour {
        value: value.to_string(),
    };
    let hex = value.trim().strip_prefix('#').ok_or_else(invalid)?;
    if !hex.is_ascii() {
        return Err(invalid());
    }

    let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());

    match hex.len() {
        3 => {
            let mut rgba = [255u8; 4];
            for (i, c) in hex.chars().enumerate() {
                let v = c.to_digit(16).ok_or_else(invalid)? as u8;
                rgba[i] = v * 17;
            }
            Ok(rgba)
        }
        6 => Ok([
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
            255,
        ]),
        8 => Ok([
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
            channel(&hex[6..8])?,
        ]),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_colour() {
        assert_eq!(parse_hex_colour("#ff8000").unwrap(), [255, 128, 0, 255]);
        assert_eq!(parse_hex_colour("#fff").unwrap(), [255, 255, 255, 255]);
        assert_eq!(parse_hex_colour("#00000080").unwrap(), [0, 0, 0, 128]);
        assert!(parse_hex_colour("ff8000").is_err());
        assert!(parse_hex_colour("#ff80").is_err());
        assert!(parse_hex_colour("#gg8000").is_err());
    }

    #[test]
    fn test_map_id_follows_mode() {
        let config = MapConfig::default();
        assert_eq!(MapTheme::default().map_id(&config), config.map_id_light);
        assert_eq!(MapTheme::dark().map_id(&config), config.map_id_dark);
    }

    #[test]
    fn test_malformed_primary_falls_back() {
        let theme = MapTheme {
            primary: "blue".to_string(),
            ..MapTheme::default()
        };
        assert_eq!(theme.primary_rgba(), [0, 0, 0, 255]);
    }
}
