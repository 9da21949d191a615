//! Preset tables
//!
//! Equalizer presets (5-band and 10-band high-quality), their band centre
//! frequencies, and the environmental reverb room presets selectable by
//! index.

use crate::audiofx::settings::{
    check_range, EnvironmentalReverbSettings, BAND_LEVEL_RANGE, EQUALIZER_NUM_BANDS,
    HQ_EQUALIZER_NUM_BANDS,
};

/// One equalizer preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EqualizerPreset<const N: usize> {
    pub name: &'static str,
    pub band_levels: [i16; N],
}

pub const EQUALIZER_PRESET_NORMAL: u16 = 0;
pub const EQUALIZER_PRESET_FLAT: u16 = 3;

/// Band centre frequencies of the 5-band equalizer, in milliHertz.
pub const EQUALIZER_CENTER_FREQS: [i32; EQUALIZER_NUM_BANDS as usize] =
    [60_000, 230_000, 910_000, 3_600_000, 14_000_000];

/// Band centre frequencies of the 10-band equalizer, in milliHertz.
pub const HQ_EQUALIZER_CENTER_FREQS: [i32; HQ_EQUALIZER_NUM_BANDS as usize] = [
    31_250, 62_500, 125_000, 250_000, 500_000, 1_000_000, 2_000_000, 4_000_000, 8_000_000,
    16_000_000,
];

pub static EQUALIZER_PRESETS: [EqualizerPreset<5>; 10] = [
    EqualizerPreset { name: "Normal", band_levels: [300, 0, 0, 0, 300] },
    EqualizerPreset { name: "Classical", band_levels: [500, 300, -200, 400, 400] },
    EqualizerPreset { name: "Dance", band_levels: [600, 0, 200, 400, 100] },
    EqualizerPreset { name: "Flat", band_levels: [0, 0, 0, 0, 0] },
    EqualizerPreset { name: "Folk", band_levels: [300, 0, 0, 200, -100] },
    EqualizerPreset { name: "Heavy Metal", band_levels: [400, 100, 900, 300, 0] },
    EqualizerPreset { name: "Hip Hop", band_levels: [500, 300, 0, 100, 300] },
    EqualizerPreset { name: "Jazz", band_levels: [400, 200, -200, 200, 500] },
    EqualizerPreset { name: "Pop", band_levels: [-100, 200, 500, 100, -200] },
    EqualizerPreset { name: "Rock", band_levels: [500, 300, -100, 300, 50] },
];

pub static HQ_EQUALIZER_PRESETS: [EqualizerPreset<10>; 10] = [
    EqualizerPreset { name: "Normal", band_levels: [300, 300, 200, 0, 0, 0, 0, 100, 300, 300] },
    EqualizerPreset { name: "Classical", band_levels: [0, 0, 0, 0, 0, 0, -100, -100, -200, -300] },
    EqualizerPreset { name: "Dance", band_levels: [500, 400, 300, 0, 0, -100, 0, 100, 100, 100] },
    EqualizerPreset { name: "Flat", band_levels: [0; 10] },
    EqualizerPreset { name: "Folk", band_levels: [200, 300, 300, 100, 0, 0, 0, 200, -100, -100] },
    EqualizerPreset { name: "Heavy Metal", band_levels: [400, 400, 200, 100, 0, 300, 500, 100, 200, 400] },
    EqualizerPreset { name: "Hip Hop", band_levels: [400, 500, 400, 300, 0, 0, 100, 100, 200, 300] },
    EqualizerPreset { name: "Jazz", band_levels: [300, 400, 400, 200, 0, -200, 0, 200, 300, 500] },
    EqualizerPreset { name: "Pop", band_levels: [-100, -100, 0, 200, 300, 500, 200, 100, -100, -200] },
    EqualizerPreset { name: "Rock", band_levels: [400, 500, 400, 300, 0, -100, 0, 300, 400, 500] },
];

pub fn equalizer_preset(preset: u16) -> Option<&'static EqualizerPreset<5>> {
    EQUALIZER_PRESETS.get(usize::from(preset))
}

pub fn hq_equalizer_preset(preset: u16) -> Option<&'static EqualizerPreset<10>> {
    HQ_EQUALIZER_PRESETS.get(usize::from(preset))
}

/// Band whose centre is nearest to `freq_mhz`.
pub fn band_for_frequency(center_freqs: &[i32], freq_mhz: i32) -> Option<usize> {
    center_freqs
        .iter()
        .enumerate()
        .min_by_key(|(_, center)| (i64::from(**center) - i64::from(freq_mhz)).abs())
        .map(|(band, _)| band)
}

/// Whether `level` is a valid equalizer band level.
pub fn is_valid_band_level(level: i16) -> bool {
    check_range("band_level", level, &BAND_LEVEL_RANGE).is_ok()
}

// ============================================================================
// Environmental Reverb
// ============================================================================

/// One environmental reverb room preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvReverbPreset {
    pub name: &'static str,
    pub settings: EnvironmentalReverbSettings,
}

/// Raw room parameters in table order: room level, room HF level, decay
/// time, decay HF ratio, reflections level, reflections delay, reverb level,
/// reverb delay, diffusion, density.
type RoomParams = [i32; 10];

pub const NUM_ENV_REVERB_PRESETS: usize = 30;

static ENV_REVERB_TABLE: [(&str, RoomParams); NUM_ENV_REVERB_PRESETS] = [
    ("Default", [-32768, 0, 1000, 500, -32768, 20, -32768, 40, 1000, 1000]),
    ("Generic", [-1000, -100, 1490, 830, -2602, 7, 200, 11, 1000, 1000]),
    ("Padded cell", [-1000, -6000, 170, 100, -1204, 1, 207, 2, 1000, 1000]),
    ("Room", [-1000, -454, 400, 830, -1646, 2, 53, 3, 1000, 1000]),
    ("Bathroom", [-1000, -1200, 1490, 540, -370, 7, 1030, 11, 1000, 600]),
    ("Living room", [-1000, -6000, 500, 100, -1376, 3, -1104, 4, 1000, 1000]),
    ("Stone room", [-1000, -300, 2310, 640, -711, 12, 83, 17, 1000, 1000]),
    ("Auditorium", [-1000, -476, 4320, 590, -789, 20, -289, 30, 1000, 1000]),
    ("Concert hall", [-1000, -500, 3920, 700, -1230, 20, -2, 29, 1000, 1000]),
    ("Cave", [-1000, 0, 2910, 1300, -602, 15, -302, 22, 1000, 1000]),
    ("Arena", [-1000, -698, 7240, 330, -1166, 20, 16, 30, 1000, 1000]),
    ("Hangar", [-1000, -1000, 10050, 230, -602, 20, 198, 30, 1000, 1000]),
    ("Carpeted hallway", [-1000, -4000, 300, 100, -1831, 2, -1630, 30, 1000, 1000]),
    ("Hallway", [-1000, -300, 1490, 590, -1219, 7, 441, 11, 1000, 1000]),
    ("Stone corridor", [-1000, -237, 2700, 790, -1214, 13, 395, 20, 1000, 1000]),
    ("Alley", [-1000, -270, 1490, 860, -1204, 7, -4, 11, 1000, 1000]),
    ("Forest", [-1000, -3300, 1490, 540, -2560, 162, -613, 88, 790, 1000]),
    ("City", [-1000, -800, 1490, 670, -2273, 7, -2217, 11, 500, 1000]),
    ("Mountains", [-1000, -2500, 1490, 210, -2780, 300, -2014, 100, 270, 1000]),
    ("Quarry", [-1000, -1000, 1490, 830, -32768, 61, 500, 25, 1000, 1000]),
    ("Plain", [-1000, -2000, 1490, 500, -2466, 179, -2514, 100, 210, 1000]),
    ("Parking lot", [-1000, 0, 1650, 1500, -1363, 8, -1153, 12, 1000, 1000]),
    ("Sewer pipe", [-1000, -1000, 2810, 140, 429, 14, 648, 21, 800, 600]),
    ("Underwater", [-1000, -4000, 1490, 100, -449, 7, 1700, 11, 1000, 1000]),
    ("Small room", [-1000, -600, 1100, 830, -400, 5, 500, 10, 1000, 1000]),
    ("Medium room", [-1000, -600, 1300, 830, -1000, 20, -200, 20, 1000, 1000]),
    ("Large room", [-1000, -600, 1500, 830, -1600, 5, -1000, 40, 1000, 1000]),
    ("Medium hall", [-1000, -600, 1800, 700, -1300, 15, -800, 30, 1000, 1000]),
    ("Large hall", [-1000, -600, 1800, 700, -2000, 30, -1400, 60, 1000, 1000]),
    ("Plate", [-1000, -200, 1300, 900, 0, 2, 0, 10, 1000, 750]),
];

fn clip16(value: i32, min: i16, max: i16) -> i16 {
    value.clamp(i32::from(min), i32::from(max)) as i16
}

/// Room parameters clipped to what the reverb accepts.
fn clipped(p: &RoomParams) -> EnvironmentalReverbSettings {
    use crate::audiofx::settings::{
        DECAY_HF_RATIO_RANGE as HF, DECAY_TIME_RANGE as DT, DENSITY_RANGE as DE,
        DIFFUSION_RANGE as DI, REFLECTIONS_DELAY_RANGE as RD, REFLECTIONS_LEVEL_RANGE as RL,
        REVERB_DELAY_RANGE as VD, REVERB_LEVEL_RANGE as VL, ROOM_HF_LEVEL_RANGE as RH,
        ROOM_LEVEL_RANGE as RM,
    };

    EnvironmentalReverbSettings {
        room_level: clip16(p[0], *RM.start(), *RM.end()),
        room_hf_level: clip16(p[1], *RH.start(), *RH.end()),
        decay_time: p[2].clamp(*DT.start(), *DT.end()),
        decay_hf_ratio: clip16(p[3], *HF.start(), *HF.end()),
        reflections_level: clip16(p[4], *RL.start(), *RL.end()),
        reflections_delay: p[5].clamp(*RD.start(), *RD.end()),
        reverb_level: clip16(p[6], *VL.start(), *VL.end()),
        reverb_delay: p[7].clamp(*VD.start(), *VD.end()),
        diffusion: clip16(p[8], *DI.start(), *DI.end()),
        density: clip16(p[9], *DE.start(), *DE.end()),
    }
}

/// Room preset by index; `None` for indices outside the table.
pub fn env_reverb_preset(index: i32) -> Option<EnvReverbPreset> {
    let index = usize::try_from(index).ok()?;
    ENV_REVERB_TABLE.get(index).map(|(name, params)| EnvReverbPreset {
        name: *name,
        settings: clipped(params),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equalizer_tables_are_valid() {
        for preset in EQUALIZER_PRESETS.iter() {
            assert!(preset.band_levels.iter().all(|l| is_valid_band_level(*l)));
        }
        for preset in HQ_EQUALIZER_PRESETS.iter() {
            assert!(preset.band_levels.iter().all(|l| is_valid_band_level(*l)));
        }
        assert_eq!(equalizer_preset(EQUALIZER_PRESET_FLAT).unwrap().name, "Flat");
        assert!(equalizer_preset(10).is_none());
    }

    #[test]
    fn test_band_for_frequency() {
        assert_eq!(band_for_frequency(&EQUALIZER_CENTER_FREQS, 1_000_000), Some(2));
        assert_eq!(band_for_frequency(&EQUALIZER_CENTER_FREQS, 0), Some(0));
        assert_eq!(band_for_frequency(&HQ_EQUALIZER_CENTER_FREQS, 20_000_000), Some(9));
    }

    #[test]
    fn test_env_reverb_presets_are_clipped() {
        for index in 0..NUM_ENV_REVERB_PRESETS as i32 {
            let preset = env_reverb_preset(index).unwrap();
            assert!(preset.settings.validate().is_ok(), "{} invalid", preset.name);
        }

        let default = env_reverb_preset(0).unwrap().settings;
        assert_eq!(default.room_level, -9000);
        assert_eq!(default.reverb_level, -9000);
        assert_eq!(default.reflections_delay, 0);

        let hangar = env_reverb_preset(11).unwrap().settings;
        assert_eq!(hangar.decay_time, 7000);
    }

    #[test]
    fn test_env_reverb_preset_out_of_range() {
        assert!(env_reverb_preset(-1).is_none());
        assert!(env_reverb_preset(NUM_ENV_REVERB_PRESETS as i32).is_none());
    }
}
