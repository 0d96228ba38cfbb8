//! Preset Table for WaveScope
//! Fixed set of visual styles selected by free-text keyword matching

/// Available visual presets
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresetKey {
    /// Vertical frequency bars
    SpectrumBars,
    /// Time-domain polyline
    Oscilloscope,
    /// Radial spectrum with fading trail
    CircularSpectrum,
    /// 64 fat bars with boosted bass
    ChunkyBass,
    /// Audio-driven particle field
    Particles,
}

impl Default for PresetKey {
    fn default() -> Self {
        Self::SpectrumBars
    }
}

impl PresetKey {
    /// All presets in table order. Matching scans this order, so the first
    /// preset owning a matched keyword wins.
    pub fn all() -> [PresetKey; 5] {
        [
            Self::SpectrumBars,
            Self::Oscilloscope,
            Self::CircularSpectrum,
            Self::ChunkyBass,
            Self::Particles,
        ]
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::SpectrumBars => "spectrum-bars",
            Self::Oscilloscope => "oscilloscope",
            Self::CircularSpectrum => "circular-spectrum",
            Self::ChunkyBass => "chunky-bass",
            Self::Particles => "particles",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SpectrumBars => "Spectrum Bars",
            Self::Oscilloscope => "Oscilloscope",
            Self::CircularSpectrum => "Circular Spectrum",
            Self::ChunkyBass => "Chunky Bass",
            Self::Particles => "Particles",
        }
    }

    /// Keywords that select this preset when present in the style text.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Self::SpectrumBars => &["bars", "spectrum", "frequency", "vertical", "columns"],
            Self::Oscilloscope => &["wave", "waveform", "oscilloscope", "line", "wavy"],
            Self::CircularSpectrum => &["circular", "circle", "radial", "round", "spiral"],
            Self::ChunkyBass => &["chunky", "thick", "bass", "heavy", "thonky", "fat", "bold"],
            Self::Particles => &["particles", "dots", "points", "scatter", "sparkle"],
        }
    }
}

/// Match a free-text style description to a preset.
///
/// Case-insensitive substring search over each preset's keyword list, in
/// table order. Anything that matches nothing (including the empty string)
/// falls back to spectrum bars.
pub fn match_preset(input: &str) -> PresetKey {
    let lower = input.to_lowercase();

    for preset in PresetKey::all() {
        for &keyword in preset.keywords() {
            if lower.contains(keyword) {
                return preset;
            }
        }
    }

    PresetKey::SpectrumBars
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_keyword_selects_its_owner() {
        // Keywords owned by earlier presets win on ambiguity, so only check
        // keywords whose first table-order owner is the preset itself.
        for preset in PresetKey::all() {
            for &keyword in preset.keywords() {
                let matched = match_preset(keyword);
                let first_owner = PresetKey::all()
                    .into_iter()
                    .find(|p| p.keywords().iter().any(|&k| keyword.contains(k)))
                    .unwrap();
                assert_eq!(matched, first_owner, "keyword {keyword:?}");
            }
        }
    }

    #[test]
    fn test_match_is_case_insensitive() {
        assert_eq!(match_preset("BARS"), PresetKey::SpectrumBars);
        assert_eq!(match_preset("bars"), PresetKey::SpectrumBars);
        assert_eq!(match_preset("OsCiLlOsCoPe"), PresetKey::Oscilloscope);
    }

    #[test]
    fn test_keyword_matches_as_substring() {
        assert_eq!(
            match_preset("give me something circular and spiraling"),
            PresetKey::CircularSpectrum
        );
        assert_eq!(match_preset("thonky bass drop"), PresetKey::ChunkyBass);
        assert_eq!(match_preset("sparkles everywhere"), PresetKey::Particles);
    }

    #[test]
    fn test_first_preset_in_table_order_wins() {
        // "spectrum" belongs to spectrum-bars even though circular-spectrum
        // sits later in the table, and "wave" beats "bass".
        assert_eq!(match_preset("spectrum circle"), PresetKey::SpectrumBars);
        assert_eq!(match_preset("wavy bass"), PresetKey::Oscilloscope);
    }

    #[test]
    fn test_no_match_falls_back_to_default() {
        assert_eq!(match_preset("asdfqwerty"), PresetKey::SpectrumBars);
        assert_eq!(match_preset(""), PresetKey::SpectrumBars);
        assert_eq!(match_preset("   "), PresetKey::SpectrumBars);
    }

    #[test]
    fn test_table_is_complete() {
        for preset in PresetKey::all() {
            assert!(!preset.key().is_empty());
            assert!(!preset.name().is_empty());
            assert!(!preset.keywords().is_empty());
        }
    }
}
