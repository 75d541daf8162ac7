//! Built-in native rituals.

use codex_sandbox::{HostCapabilities, HostTrap, NativeRitual, RitualParameters};
use codex_state::RitualDefinition;

pub const SHADOW_INTEGRATION: &str = "shadow_integration";
pub const ENERGY_ATTUNEMENT: &str = "energy_attunement";
pub const VOID_CONTEMPLATION: &str = "void_contemplation";
pub const ARCHETYPE_INVOCATION: &str = "archetype_invocation";

const ELEMENTS: [&str; 4] = ["Fire", "Water", "Earth", "Air"];

const MAJOR_ARCHETYPES: [&str; 8] = [
    "Sage", "Creator", "Shadow", "Light", "Warrior", "Lover", "Ruler", "Magician",
];

/// Integrates the shadow, pulling Light along at a third of the rate.
///
/// ```text
/// factor = (0.2 + r * 0.3) * (1 + |Shadow - Light|)
/// Shadow += factor
/// Light  += 0.3 * factor
/// ```
///
/// Emits `◯●◯` and `🌑`, and `⚡` when `factor > 0.4`.
#[derive(Debug, Default)]
pub struct ShadowIntegration;

impl NativeRitual for ShadowIntegration {
    fn execute(
        &self,
        host: &mut dyn HostCapabilities,
        _parameters: &RitualParameters,
    ) -> Result<i32, HostTrap> {
        let shadow = host.get_archetype_activation("Shadow")?;
        let light = host.get_archetype_activation("Light")?;
        host.log(&format!("shadow {:.2}, light {:.2}", shadow, light))?;

        let imbalance = (shadow - light).abs();
        let factor = (0.2 + host.get_random()? * 0.3) * (1.0 + imbalance);

        host.set_archetype_activation("Shadow", shadow + factor)?;
        host.set_archetype_activation("Light", light + factor * 0.3)?;

        host.add_symbol("◯●◯")?;
        host.add_symbol("🌑")?;
        if factor > 0.4 {
            host.add_symbol("⚡")?;
        }
        Ok(0)
    }

    fn resonance(&self, host: &mut dyn HostCapabilities) -> Result<Option<f64>, HostTrap> {
        let shadow = host.get_archetype_activation("Shadow")?;
        let light = host.get_archetype_activation("Light")?;
        let balance = 1.0 - (shadow - light).abs();
        Ok(Some((shadow + balance) * 0.5))
    }
}

/// Moves each element 30% of the way toward a shared target level.
#[derive(Debug, Default)]
pub struct EnergyAttunement;

impl NativeRitual for EnergyAttunement {
    fn execute(
        &self,
        host: &mut dyn HostCapabilities,
        _parameters: &RitualParameters,
    ) -> Result<i32, HostTrap> {
        let mut levels = [0.0; 4];
        for (level, element) in levels.iter_mut().zip(ELEMENTS) {
            *level = host.get_energy_amplitude(element)?;
        }
        let total: f64 = levels.iter().sum();
        let target = total / 4.0 + host.get_random()? * 0.1;

        for (level, element) in levels.iter().zip(ELEMENTS) {
            host.set_energy_amplitude(element, level + (target - level) * 0.3)?;
        }

        host.add_symbol("∿∿∿")?;
        host.add_symbol("⚡")?;
        if total > 2.0 {
            host.add_symbol("🔥")?;
            host.add_symbol("💧")?;
        }
        Ok(0)
    }

    fn resonance(&self, host: &mut dyn HostCapabilities) -> Result<Option<f64>, HostTrap> {
        let mut levels = [0.0; 4];
        for (level, element) in levels.iter_mut().zip(ELEMENTS) {
            *level = host.get_energy_amplitude(element)?;
        }
        let mean = levels.iter().sum::<f64>() / 4.0;
        let variance: f64 = levels.iter().map(|l| (l - mean).abs()).sum();
        Ok(Some((1.0 - variance.min(0.8)).max(0.2)))
    }
}

/// Deepens the Void and wakes the Sage and the Mystic.
#[derive(Debug, Default)]
pub struct VoidContemplation;

impl NativeRitual for VoidContemplation {
    fn execute(
        &self,
        host: &mut dyn HostCapabilities,
        _parameters: &RitualParameters,
    ) -> Result<i32, HostTrap> {
        let void = host.get_energy_amplitude("Void")?;
        let increase = 0.3 + host.get_random()? * 0.2;
        host.set_energy_amplitude("Void", void + increase)?;

        let sage = host.get_archetype_activation("Sage")?;
        let mystic = host.get_archetype_activation("Mystic")?;
        host.set_archetype_activation("Sage", sage + 0.15)?;
        host.set_archetype_activation("Mystic", mystic + 0.2)?;

        host.add_symbol("○")?;
        host.add_symbol("∞")?;
        // read back: the buffer holds the clamped value
        if host.get_energy_amplitude("Void")? > 0.7 {
            host.add_symbol("◯")?;
            host.add_symbol("⚬")?;
        }
        Ok(0)
    }

    fn resonance(&self, host: &mut dyn HostCapabilities) -> Result<Option<f64>, HostTrap> {
        let void = host.get_energy_amplitude("Void")?;
        Ok(Some(void * 0.8 + host.get_random()? * 0.2))
    }
}

/// Lifts the eight major archetypes by a shared random boost.
#[derive(Debug, Default)]
pub struct ArchetypeInvocation;

impl NativeRitual for ArchetypeInvocation {
    fn execute(
        &self,
        host: &mut dyn HostCapabilities,
        _parameters: &RitualParameters,
    ) -> Result<i32, HostTrap> {
        let boost = 0.1 + host.get_random()? * 0.1;
        for archetype in MAJOR_ARCHETYPES {
            let current = host.get_archetype_activation(archetype)?;
            host.set_archetype_activation(archetype, current + boost)?;
        }
        host.add_symbol("🔮")?;
        host.add_symbol("∆∇∆")?;
        Ok(0)
    }

    fn resonance(&self, host: &mut dyn HostCapabilities) -> Result<Option<f64>, HostTrap> {
        let mut total = 0.0;
        for archetype in MAJOR_ARCHETYPES {
            total += host.get_archetype_activation(archetype)?;
        }
        Ok(Some(total / MAJOR_ARCHETYPES.len() as f64 * 0.9))
    }
}

/// Catalog entries for the built-in rituals.
pub fn definitions() -> Vec<RitualDefinition> {
    vec![
        RitualDefinition::native(
            SHADOW_INTEGRATION,
            "To embrace and transform shadow elements into conscious wisdom",
        )
        .with_description("A ritual to integrate rejected aspects of the self")
        .with_tradition("Jungian")
        .with_difficulty(3)
        .requiring_archetype("Shadow")
        .requiring_archetype("Sage")
        .requiring_energy("Fire", 0.6)
        .requiring_energy("Void", 0.3),
        RitualDefinition::native(
            ENERGY_ATTUNEMENT,
            "To align personal energy with natural harmonic resonance",
        )
        .with_description("A ritual to harmonize energetic frequencies")
        .with_tradition("Elemental")
        .with_difficulty(1)
        .requiring_archetype("Sage")
        .requiring_energy("Earth", 0.4),
        RitualDefinition::native(
            ARCHETYPE_INVOCATION,
            "To awaken dormant archetypal forces within consciousness",
        )
        .with_description("A ritual to invoke and activate archetypal energies")
        .with_tradition("Hermetic")
        .with_difficulty(2)
        .requiring_archetype("Creator")
        .requiring_archetype("Anima")
        .requiring_energy("Fire", 0.7),
        RitualDefinition::native(
            VOID_CONTEMPLATION,
            "To enter the void space where all transformation becomes possible",
        )
        .with_description("A ritual of emptiness and infinite potential")
        .with_tradition("Contemplative")
        .with_difficulty(2)
        .requiring_archetype("Sage")
        .requiring_energy("Void", 0.8),
    ]
}
