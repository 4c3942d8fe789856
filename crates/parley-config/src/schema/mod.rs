//! Configuration schema types for Parley.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod ice;
mod quality;
mod screen_share;
mod system;
mod voice;

pub use ice::*;
pub use quality::*;
pub use screen_share::*;
pub use system::*;
pub use voice::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration for Parley.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParleyConfig {
    pub voice: VoiceConfig,
    pub screen_share: ScreenShareConfig,
    pub quality: QualityConfig,
    pub ice: IceConfig,
    pub logging: LoggingConfig,
}
