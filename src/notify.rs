// src/notify.rs

//! Occasional promotional messaging
//!
//! Roughly one run in ten, an unlicensed run with regular output gets one
//! line about commercial options. Both random draws (the trigger and the
//! message choice) go through an injected [`Randomizer`] so tests can
//! force either outcome.

use rand::Rng;
use tracing::info;

use crate::config::Configuration;

/// Source of bounded random draws
pub trait Randomizer {
    /// Uniform draw in `1..=sides`
    fn roll(&mut self, sides: u32) -> u32;
}

/// Production randomness over the thread RNG
#[derive(Default)]
pub struct ThreadRandomizer;

impl Randomizer for ThreadRandomizer {
    fn roll(&mut self, sides: u32) -> u32 {
        rand::thread_rng().gen_range(1..=sides.max(1))
    }
}

const MESSAGES: &[&str] = &[
    "Did you know the business editions bundle a GUI and centralized reporting?",
    "Organizations deploying at scale get priority support with a business license.",
    "Package internalizing keeps your builds off the public feed. Licensed feature.",
    "Self-service installs for non-admin users are available in the business editions.",
];

/// Emit a promotional line on roughly one run in ten.
///
/// A caller-supplied message wins over the fixed list; the list index is
/// clamped so an over-long draw cannot panic.
pub fn maybe_notify(config: &Configuration, rng: &mut dyn Randomizer, custom: Option<&str>) {
    if config.licensed || !config.regular_output {
        return;
    }
    if rng.roll(10) != 3 {
        return;
    }

    let message = match custom {
        Some(text) => text,
        None => {
            let index = (rng.roll(MESSAGES.len() as u32) as usize - 1).min(MESSAGES.len() - 1);
            MESSAGES[index]
        }
    };
    info!("{}", message);
}
