//! Conversion settings and the confirm/cancel editor around them.
//!
//! The store is only changed by committing a [`SettingsDraft`]. Dropping a
//! draft without committing it is the "cancel" path and leaves every stored
//! value untouched.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::Path;

use crate::dispatcher::Conversion;
use crate::format::MediaFormat;

/// Slider range for the GIF -> video bitrate, in kbps
pub const BITRATE_RANGE: RangeInclusive<u32> = 100..=1000;
/// Slider range for every frame-rate setting
pub const FPS_RANGE: RangeInclusive<u32> = 1..=60;

pub const DEFAULT_BITRATE_KBPS: u32 = 500;
pub const DEFAULT_FPS: u32 = 30;

fn clamp(value: u32, range: &RangeInclusive<u32>) -> u32 {
    value.clamp(*range.start(), *range.end())
}

/// Frame rate for each conversion pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameRates {
    pub mp4_to_gif: u32,
    pub webm_to_gif: u32,
    pub mov_to_gif: u32,
    pub avi_to_gif: u32,
    pub gif_to_mp4: u32,
    pub gif_to_webm: u32,
    pub gif_to_mov: u32,
    pub gif_to_avi: u32,
}

impl Default for FrameRates {
    fn default() -> Self {
        Self {
            mp4_to_gif: DEFAULT_FPS,
            webm_to_gif: DEFAULT_FPS,
            mov_to_gif: DEFAULT_FPS,
            avi_to_gif: DEFAULT_FPS,
            gif_to_mp4: DEFAULT_FPS,
            gif_to_webm: DEFAULT_FPS,
            gif_to_mov: DEFAULT_FPS,
            gif_to_avi: DEFAULT_FPS,
        }
    }
}

impl FrameRates {
    pub fn get(&self, conversion: Conversion) -> u32 {
        match conversion {
            Conversion::Mp4ToGif => self.mp4_to_gif,
            Conversion::WebmToGif => self.webm_to_gif,
            Conversion::MovToGif => self.mov_to_gif,
            Conversion::AviToGif => self.avi_to_gif,
            Conversion::GifToMp4 => self.gif_to_mp4,
            Conversion::GifToWebm => self.gif_to_webm,
            Conversion::GifToMov => self.gif_to_mov,
            Conversion::GifToAvi => self.gif_to_avi,
        }
    }

    fn slot(&mut self, conversion: Conversion) -> &mut u32 {
        match conversion {
            Conversion::Mp4ToGif => &mut self.mp4_to_gif,
            Conversion::WebmToGif => &mut self.webm_to_gif,
            Conversion::MovToGif => &mut self.mov_to_gif,
            Conversion::AviToGif => &mut self.avi_to_gif,
            Conversion::GifToMp4 => &mut self.gif_to_mp4,
            Conversion::GifToWebm => &mut self.gif_to_webm,
            Conversion::GifToMov => &mut self.gif_to_mov,
            Conversion::GifToAvi => &mut self.gif_to_avi,
        }
    }
}

/// Values read by every conversion operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionSettings {
    /// Shared bitrate for GIF -> video encodes, in kbps
    pub bitrate_kbps: u32,
    pub frame_rates: FrameRates,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            bitrate_kbps: DEFAULT_BITRATE_KBPS,
            frame_rates: FrameRates::default(),
        }
    }
}

impl ConversionSettings {
    pub fn fps(&self, conversion: Conversion) -> u32 {
        self.frame_rates.get(conversion)
    }

    /// Pull every value back inside its slider range
    pub fn clamped(mut self) -> Self {
        self.bitrate_kbps = clamp(self.bitrate_kbps, &BITRATE_RANGE);
        for conversion in Conversion::ALL {
            let slot = self.frame_rates.slot(conversion);
            *slot = clamp(*slot, &FPS_RANGE);
        }
        self
    }

    /// Load settings from a JSON file; missing fields take their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {:?}", path))?;
        let settings: ConversionSettings = serde_json::from_str(&text)
            .with_context(|| format!("Invalid settings file {:?}", path))?;
        let clamped = settings.clamped();
        if clamped != settings {
            log::warn!(
                "Settings in {:?} were outside the allowed ranges and have been clamped",
                path
            );
        }
        Ok(clamped)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write settings file {:?}", path))?;
        log::info!("Settings saved to {:?}", path);
        Ok(())
    }
}

/// Owns the current settings and the chosen GIF export format
#[derive(Debug, Clone)]
pub struct SettingsStore {
    settings: ConversionSettings,
    gif_target: MediaFormat,
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(ConversionSettings::default())
    }
}

impl SettingsStore {
    pub fn new(settings: ConversionSettings) -> Self {
        Self {
            settings: settings.clamped(),
            gif_target: MediaFormat::Mp4,
        }
    }

    /// Snapshot handed to a conversion job
    pub fn current(&self) -> ConversionSettings {
        self.settings
    }

    pub fn gif_target(&self) -> MediaFormat {
        self.gif_target
    }

    /// Open the editor pre-filled with the current values
    pub fn edit(&self) -> SettingsDraft {
        SettingsDraft {
            settings: self.settings,
            gif_target: self.gif_target,
        }
    }

    /// Confirm: overwrite every field from the draft at once
    pub fn commit(&mut self, draft: SettingsDraft) {
        log::debug!("Settings confirmed: {:?}, gif target {}", draft.settings, draft.gif_target);
        self.settings = draft.settings;
        self.gif_target = draft.gif_target;
    }
}

/// Pending edits. Setters behave like sliders and clamp into range.
#[derive(Debug, Clone)]
#[must_use = "a draft only takes effect once committed to the store"]
pub struct SettingsDraft {
    settings: ConversionSettings,
    gif_target: MediaFormat,
}

impl SettingsDraft {
    pub fn bitrate(mut self, kbps: u32) -> Self {
        self.settings.bitrate_kbps = clamp(kbps, &BITRATE_RANGE);
        self
    }

    pub fn fps(mut self, conversion: Conversion, fps: u32) -> Self {
        *self.settings.frame_rates.slot(conversion) = clamp(fps, &FPS_RANGE);
        self
    }

    /// Replace every value, e.g. from a settings file
    pub fn all(mut self, settings: ConversionSettings) -> Self {
        self.settings = settings.clamped();
        self
    }

    /// Radio-button choice of the GIF export format. Non-video formats are ignored.
    pub fn gif_target(mut self, format: MediaFormat) -> Self {
        if format.is_video() {
            self.gif_target = format;
        } else {
            log::warn!("Ignoring GIF export format '{}'", format);
        }
        self
    }

    pub fn values(&self) -> &ConversionSettings {
        &self.settings
    }
}
