//! Effect Arbitration Tests
//!
//! Several handles on the same effect and session share one state; only the
//! most recently created live handle may change it.

use pretty_assertions::assert_eq;
use test_case::test_case;

use segue::audiofx::{
    BassBoost, BassBoostSettings, EffectFactory, EffectStatus, EnvReverbParam,
    EnvironmentalReverb, Equalizer, HQEqualizer, LoudnessEnhancer, PreAmp, PresetReverb,
    ReverbPreset, Virtualizer,
};
use segue::player::PlayerImplType;

const SESSION: i32 = 7;

fn bass_boost(factory: &EffectFactory) -> BassBoost {
    factory.create(SESSION).unwrap().unwrap()
}

// === Soft Failures ===

#[test]
fn test_set_enabled_without_control_is_soft_failure() {
    let factory = EffectFactory::new(PlayerImplType::Standard);
    let h1 = bass_boost(&factory);
    let h2 = bass_boost(&factory);
    let before = h1.enabled().unwrap();

    assert_eq!(h1.set_enabled(!before).unwrap(), EffectStatus::InvalidOperation);
    assert_eq!(h1.enabled().unwrap(), before);
    assert_eq!(h2.enabled().unwrap(), before);
}

#[test]
fn test_write_without_control_leaves_settings_identical() {
    let factory = EffectFactory::new(PlayerImplType::Standard);
    let h1 = bass_boost(&factory);
    let h2 = bass_boost(&factory);
    h2.set_strength(300).unwrap();
    let before = h2.properties().unwrap();

    let err = h1.set_strength(900).unwrap_err();
    assert_eq!(err.error_code(), "UNSUPPORTED_OPERATION");
    let err = h1
        .set_properties(&BassBoostSettings { strength: 10 })
        .unwrap_err();
    assert_eq!(err.error_code(), "UNSUPPORTED_OPERATION");

    assert_eq!(h1.properties().unwrap(), before);
    assert_eq!(h2.properties().unwrap(), before);
}

// === Control Transfer ===

#[test]
fn test_release_hands_control_back_with_shared_settings() {
    let factory = EffectFactory::new(PlayerImplType::Standard);
    let h1 = bass_boost(&factory);
    let mut h2 = bass_boost(&factory);
    assert!(!h1.has_control().unwrap());

    h2.set_strength(500).unwrap();
    h2.release();

    assert!(h1.has_control().unwrap());
    assert_eq!(h1.rounded_strength().unwrap(), 500);
}

#[test]
fn test_newer_handle_takes_control_from_all_older() {
    let factory = EffectFactory::new(PlayerImplType::Hybrid);
    let h1 = bass_boost(&factory);
    let h2 = bass_boost(&factory);
    assert!(h2.has_control().unwrap());

    let h3 = bass_boost(&factory);
    assert!(!h1.has_control().unwrap());
    assert!(!h2.has_control().unwrap());
    assert!(h3.has_control().unwrap());
}

#[test]
fn test_releasing_older_handle_keeps_controller() {
    let factory = EffectFactory::new(PlayerImplType::Standard);
    let mut h1 = bass_boost(&factory);
    let h2 = bass_boost(&factory);
    let h3 = bass_boost(&factory);

    h1.release();
    assert!(h3.has_control().unwrap());
    assert!(!h2.has_control().unwrap());
}

#[test]
fn test_control_falls_to_most_recent_survivor() {
    let factory = EffectFactory::new(PlayerImplType::Standard);
    let h1 = bass_boost(&factory);
    let h2 = bass_boost(&factory);
    let h3 = bass_boost(&factory);

    drop(h3);
    assert!(h2.has_control().unwrap());
    assert!(!h1.has_control().unwrap());

    drop(h2);
    assert!(h1.has_control().unwrap());
}

#[test]
fn test_binding_is_dropped_with_last_handle() {
    let factory = EffectFactory::new(PlayerImplType::Standard);
    let mut h1 = bass_boost(&factory);
    h1.set_strength(800).unwrap();
    assert_eq!(h1.set_enabled(true).unwrap(), EffectStatus::Success);
    h1.release();
    assert_eq!(factory.registry().binding_count(), 0);

    let fresh = bass_boost(&factory);
    assert_eq!(fresh.rounded_strength().unwrap(), 0);
    assert!(!fresh.enabled().unwrap());
}

#[test]
fn test_sessions_are_independent() {
    let factory = EffectFactory::new(PlayerImplType::Standard);
    let here = bass_boost(&factory);
    let elsewhere: BassBoost = factory.create(SESSION + 1).unwrap().unwrap();

    here.set_strength(250).unwrap();
    assert!(elsewhere.has_control().unwrap());
    assert_eq!(elsewhere.rounded_strength().unwrap(), 0);
    assert_ne!(here.id().unwrap(), elsewhere.id().unwrap());
}

#[test]
fn test_released_handle_rejects_access() {
    let factory = EffectFactory::new(PlayerImplType::Standard);
    let mut h = bass_boost(&factory);
    h.release();
    h.release();

    assert!(h.strength_supported());
    assert_eq!(h.enabled().unwrap_err().error_code(), "ILLEGAL_STATE");
    assert_eq!(h.has_control().unwrap_err().error_code(), "ILLEGAL_STATE");
}

// === Property Round Trips ===

#[test]
fn test_properties_round_trip_bass_boost() {
    let factory = EffectFactory::new(PlayerImplType::Standard);
    let h = bass_boost(&factory);
    h.set_strength(640).unwrap();
    let p = h.properties().unwrap();
    h.set_properties(&p).unwrap();
    assert_eq!(h.properties().unwrap(), p);
}

#[test]
fn test_properties_round_trip_virtualizer() {
    let factory = EffectFactory::new(PlayerImplType::OpenSl);
    let h: Virtualizer = factory.create(SESSION).unwrap().unwrap();
    h.set_strength(1000).unwrap();
    let p = h.properties().unwrap();
    h.set_properties(&p).unwrap();
    assert_eq!(h.properties().unwrap(), p);
}

#[test]
fn test_properties_round_trip_equalizer() {
    let factory = EffectFactory::new(PlayerImplType::Standard);
    let h: Equalizer = factory.create(SESSION).unwrap().unwrap();
    h.use_preset(3).unwrap();
    h.set_band_level(1, 0).unwrap();
    let p = h.properties().unwrap();
    h.set_properties(&p).unwrap();
    assert_eq!(h.properties().unwrap(), p);
}

#[test]
fn test_properties_round_trip_hq_equalizer() {
    let factory = EffectFactory::new(PlayerImplType::Hybrid);
    let h: HQEqualizer = factory.create(SESSION).unwrap().unwrap();
    h.use_preset(1).unwrap();
    let p = h.properties().unwrap();
    h.set_properties(&p).unwrap();
    assert_eq!(h.properties().unwrap(), p);
}

#[test]
fn test_properties_round_trip_environmental_reverb() {
    let factory = EffectFactory::new(PlayerImplType::Standard);
    let h: EnvironmentalReverb = factory.create(0).unwrap().unwrap();
    h.set_decay_time(2_500).unwrap();
    h.set_parameter(EnvReverbParam::Density, 500).unwrap();
    let p = h.properties().unwrap();
    h.set_properties(&p).unwrap();
    assert_eq!(h.properties().unwrap(), p);
    assert_eq!(h.decay_time().unwrap(), 2_500);
}

#[test]
fn test_properties_round_trip_preset_reverb() {
    let factory = EffectFactory::new(PlayerImplType::OpenSl);
    let h: PresetReverb = factory.create(0).unwrap().unwrap();
    h.set_preset(ReverbPreset::LargeHall).unwrap();
    let p = h.properties().unwrap();
    h.set_properties(&p).unwrap();
    assert_eq!(h.preset().unwrap(), ReverbPreset::LargeHall);
}

#[test]
fn test_properties_round_trip_preamp() {
    let factory = EffectFactory::new(PlayerImplType::Hybrid);
    let h: PreAmp = factory.create(0).unwrap().unwrap();
    h.set_level(0.5).unwrap();
    let p = h.properties().unwrap();
    h.set_properties(&p).unwrap();
    assert_eq!(h.properties().unwrap(), p);
}

// === Capabilities ===

#[test_case(PlayerImplType::Standard, false, true, false ; "standard")]
#[test_case(PlayerImplType::OpenSl, true, false, true ; "opensl")]
#[test_case(PlayerImplType::Hybrid, true, true, true ; "hybrid")]
fn test_effect_availability(
    impl_type: PlayerImplType,
    has_preamp: bool,
    has_loudness: bool,
    has_hq_equalizer: bool,
) {
    let factory = EffectFactory::new(impl_type);

    let preamp: Option<PreAmp> = factory.create(0).unwrap();
    let loudness: Option<LoudnessEnhancer> = factory.create(SESSION).unwrap();
    let hq: Option<HQEqualizer> = factory.create(SESSION).unwrap();

    assert_eq!(preamp.is_some(), has_preamp);
    assert_eq!(loudness.is_some(), has_loudness);
    assert_eq!(hq.is_some(), has_hq_equalizer);
}

#[test]
fn test_out_of_range_value_is_rejected_with_control() {
    let factory = EffectFactory::new(PlayerImplType::Standard);
    let h = bass_boost(&factory);
    h.set_strength(120).unwrap();

    let err = h.set_strength(1001).unwrap_err();
    assert_eq!(err.error_code(), "INVALID_ARGUMENT");
    assert_eq!(h.rounded_strength().unwrap(), 120);
}
