//! crates/podcast_core/src/catalog.rs
//!
//! Static choices offered to the user: narrator voices and Hoot packs.

/// A named narrator voice and the provider voice id behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoicePreset {
    pub name: &'static str,
    pub voice_id: &'static str,
}

pub const VOICES: [VoicePreset; 6] = [
    VoicePreset { name: "Friendly Male", voice_id: "pNInz6obpgDQGcFmaJgB" },
    VoicePreset { name: "Calm Female", voice_id: "21m00Tcm4TlvDq8ikWAM" },
    VoicePreset { name: "Energetic Narrator", voice_id: "ErXwobaYiN019PkySvjV" },
    VoicePreset { name: "Female Villain", voice_id: "flHkNRp1BlvT73UL6gyz" },
    VoicePreset { name: "American Grandpa", voice_id: "NOpBlnGInO9m6vDvFkFC" },
    VoicePreset { name: "Texan Boy", voice_id: "Bj9UqZbhQsanLzgalpEG" },
];

pub fn default_voice() -> VoicePreset {
    VOICES[0]
}

/// Looks a voice up by display name (case-insensitive) or by raw voice id.
pub fn find_voice(name_or_id: &str) -> Option<VoicePreset> {
    let wanted = name_or_id.trim();
    VOICES
        .iter()
        .copied()
        .find(|v| v.name.eq_ignore_ascii_case(wanted) || v.voice_id == wanted)
}

/// A purchasable bundle of Hoots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HootPack {
    pub hoots: u32,
    pub price_cents: u32,
    pub price_id: &'static str,
}

impl HootPack {
    pub fn price_label(&self) -> String {
        format!("${}.{:02}", self.price_cents / 100, self.price_cents % 100)
    }
}

pub const HOOT_PACKS: [HootPack; 4] = [
    HootPack { hoots: 5, price_cents: 250, price_id: "price_1Rr8iCBKrdK3UUm6xoWijZW5" },
    HootPack { hoots: 15, price_cents: 500, price_id: "price_1Rr6t2BKrdK3UUm6aOfwDN1C" },
    HootPack { hoots: 20, price_cents: 1000, price_id: "price_1Rr8iwBKrdK3UUm6Gb5NBhWq" },
    HootPack { hoots: 30, price_cents: 2500, price_id: "price_1Rr8jUBKrdK3UUm6Re99Vycl" },
];

pub fn find_pack(hoots: u32) -> Option<HootPack> {
    HOOT_PACKS.iter().copied().find(|p| p.hoots == hoots)
}
