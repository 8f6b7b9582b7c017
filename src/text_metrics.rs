//! Font-backed text measurement used to size exported nodes. Falls back to
//! `None` when no matching system font is installed.

use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use ttf_parser::Face;

static MEASURER: Lazy<Mutex<Measurer>> = Lazy::new(|| Mutex::new(Measurer::default()));

pub fn measure_text_width(text: &str, font_size: f32, font_family: &str) -> Option<f32> {
    if text.is_empty() || font_size <= 0.0 {
        return Some(0.0);
    }
    let mut guard = MEASURER.lock().ok()?;
    let advances = guard.advances(font_family)?;
    Some(advances.width(text, font_size))
}

#[derive(Default)]
struct Measurer {
    db: Option<Database>,
    by_family: HashMap<String, Option<Advances>>,
}

impl Measurer {
    fn advances(&mut self, font_family: &str) -> Option<&Advances> {
        let key = font_family.trim().to_string();
        if !self.by_family.contains_key(&key) {
            let loaded = self.load(&key);
            self.by_family.insert(key.clone(), loaded);
        }
        self.by_family.get(&key).and_then(Option::as_ref)
    }

    fn load(&mut self, font_family: &str) -> Option<Advances> {
        let db = self.db.get_or_insert_with(|| {
            let mut db = Database::new();
            db.load_system_fonts();
            db
        });

        let names: Vec<&str> = font_family
            .split(',')
            .map(|part| part.trim().trim_matches('"').trim_matches('\''))
            .filter(|part| !part.is_empty())
            .collect();
        let mut families: Vec<Family<'_>> = names
            .iter()
            .map(|&name| match name.to_ascii_lowercase().as_str() {
                "serif" => Family::Serif,
                "monospace" | "ui-monospace" => Family::Monospace,
                "sans-serif" | "system-ui" | "-apple-system" => Family::SansSerif,
                _ => Family::Name(name),
            })
            .collect();
        families.push(Family::SansSerif);

        let id = db.query(&Query {
            families: &families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        })?;
        db.with_face_data(id, |data, index| {
            Face::parse(data, index).ok().map(|face| Advances::from_face(&face))
        })
        .flatten()
    }
}

/// Horizontal advances for printable ASCII plus an average for everything
/// else, in font units.
struct Advances {
    units_per_em: f32,
    ascii: [u16; 128],
    fallback: f32,
}

impl Advances {
    fn from_face(face: &Face<'_>) -> Self {
        let mut ascii = [0u16; 128];
        let mut total = 0u32;
        let mut count = 0u32;
        for byte in 0x20u8..0x7f {
            let advance = face
                .glyph_index(byte as char)
                .and_then(|glyph| face.glyph_hor_advance(glyph))
                .unwrap_or(0);
            ascii[byte as usize] = advance;
            if advance > 0 {
                total += advance as u32;
                count += 1;
            }
        }
        let units_per_em = face.units_per_em().max(1) as f32;
        let fallback = if count > 0 {
            total as f32 / count as f32
        } else {
            units_per_em * 0.56
        };
        Self {
            units_per_em,
            ascii,
            fallback,
        }
    }

    fn width(&self, text: &str, font_size: f32) -> f32 {
        let units: f32 = text
            .chars()
            .filter(|ch| *ch != '\n')
            .map(|ch| {
                let advance = if ch.is_ascii() {
                    self.ascii[ch as usize]
                } else {
                    0
                };
                if advance == 0 {
                    self.fallback
                } else {
                    advance as f32
                }
            })
            .sum();
        units * font_size / self.units_per_em
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_has_zero_width() {
        assert_eq!(measure_text_width("", 16.0, "Arial"), Some(0.0));
        assert_eq!(measure_text_width("abc", 0.0, "Arial"), Some(0.0));
    }

    #[test]
    fn width_scales_when_a_font_is_available() {
        // Machines without system fonts return None; nothing to compare then.
        let (Some(small), Some(large)) = (
            measure_text_width("Inventory", 10.0, "sans-serif"),
            measure_text_width("Inventory", 20.0, "sans-serif"),
        ) else {
            return;
        };
        assert!((large - small * 2.0).abs() < 0.01);
    }
}
