//! Effect factory
//!
//! Creates effect handles for one player implementation type. Capabilities
//! differ per implementation; asking for an effect the implementation does
//! not provide yields `Ok(None)` rather than an error.

use std::collections::BTreeSet;

use log::debug;

use crate::audiofx::binding::{EffectRegistry, SessionId};
use crate::audiofx::handle::EffectHandle;
use crate::audiofx::settings::{EffectParams, EffectType};
use crate::error::Result;
use crate::player::PlayerImplType;

/// Effects an implementation type does not provide.
fn unsupported_effects(impl_type: PlayerImplType) -> BTreeSet<EffectType> {
    match impl_type {
        PlayerImplType::Standard => [
            EffectType::HQEqualizer,
            EffectType::PreAmp,
            EffectType::HQVisualizer,
        ]
        .into_iter()
        .collect(),
        PlayerImplType::OpenSl => [EffectType::LoudnessEnhancer].into_iter().collect(),
        PlayerImplType::Hybrid => BTreeSet::new(),
    }
}

/// Creates effect handles sharing one registry.
#[derive(Debug, Clone)]
pub struct EffectFactory {
    impl_type: PlayerImplType,
    registry: EffectRegistry,
    unsupported: BTreeSet<EffectType>,
}

impl EffectFactory {
    /// Factory with the capabilities of `impl_type` and a fresh registry.
    pub fn new(impl_type: PlayerImplType) -> Self {
        Self::with_registry(impl_type, EffectRegistry::new())
    }

    /// Factory sharing an existing registry.
    pub fn with_registry(impl_type: PlayerImplType, registry: EffectRegistry) -> Self {
        Self {
            impl_type,
            registry,
            unsupported: unsupported_effects(impl_type),
        }
    }

    /// Additionally mark `effect_type` as unavailable.
    pub fn with_unsupported(mut self, effect_type: EffectType) -> Self {
        self.unsupported.insert(effect_type);
        self
    }

    pub fn impl_type(&self) -> PlayerImplType {
        self.impl_type
    }

    pub fn registry(&self) -> &EffectRegistry {
        &self.registry
    }

    pub fn is_supported(&self, effect_type: EffectType) -> bool {
        !self.unsupported.contains(&effect_type)
    }

    pub fn supported_types(&self) -> Vec<EffectType> {
        EffectType::ALL
            .iter()
            .copied()
            .filter(|t| self.is_supported(*t))
            .collect()
    }

    /// Attach a new handle of effect `S` to `session`. The new handle takes
    /// control of the binding.
    pub fn create<S: EffectParams>(&self, session: SessionId) -> Result<Option<EffectHandle<S>>> {
        if !self.is_supported(S::TYPE) {
            debug!("{} not available on {} players", S::TYPE, self.impl_type);
            return Ok(None);
        }
        Ok(Some(EffectHandle::attach(&self.registry, session)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audiofx::handle::{HQEqualizer, LoudnessEnhancer, PreAmp};
    use crate::audiofx::settings::BassBoostSettings;

    #[test]
    fn test_standard_capabilities() {
        let factory = EffectFactory::new(PlayerImplType::Standard);
        assert!(factory.is_supported(EffectType::LoudnessEnhancer));
        assert!(!factory.is_supported(EffectType::PreAmp));

        let preamp: Option<PreAmp> = factory.create(0).unwrap();
        assert!(preamp.is_none());
        let hq: Option<HQEqualizer> = factory.create(0).unwrap();
        assert!(hq.is_none());
        assert_eq!(factory.supported_types().len(), 7);
    }

    #[test]
    fn test_opensl_lacks_loudness_enhancer() {
        let factory = EffectFactory::new(PlayerImplType::OpenSl);
        let le: Option<LoudnessEnhancer> = factory.create(1).unwrap();
        assert!(le.is_none());
        let preamp: Option<PreAmp> = factory.create(0).unwrap();
        assert!(preamp.is_some());
    }

    #[test]
    fn test_hybrid_supports_everything() {
        let factory = EffectFactory::new(PlayerImplType::Hybrid);
        assert_eq!(factory.supported_types(), EffectType::ALL.to_vec());
    }

    #[test]
    fn test_with_unsupported() {
        let factory =
            EffectFactory::new(PlayerImplType::Hybrid).with_unsupported(EffectType::BassBoost);
        let bb = factory.create::<BassBoostSettings>(1).unwrap();
        assert!(bb.is_none());
        assert_eq!(factory.registry().binding_count(), 0);
    }

    #[test]
    fn test_handles_share_factory_registry() {
        let factory = EffectFactory::new(PlayerImplType::Standard);
        let h1 = factory.create::<BassBoostSettings>(7).unwrap().unwrap();
        let h2 = factory.create::<BassBoostSettings>(7).unwrap().unwrap();
        assert!(!h1.has_control().unwrap());
        assert!(h2.has_control().unwrap());
        assert_eq!(factory.registry().binding_count(), 1);
    }
}
