//! Traditional-to-Simplified Chinese conversion.

use ferrous_opencc::config::BuiltinConfig;
use ferrous_opencc::OpenCC;
use once_cell::sync::Lazy;
use tracing::error;

static TW2S: Lazy<Option<OpenCC>> = Lazy::new(|| {
    match OpenCC::from_config(BuiltinConfig::Tw2sp) {
        Ok(converter) => Some(converter),
        Err(e) => {
            error!(error = %e, "failed to load tw2sp conversion tables");
            None
        }
    }
});

/// Convert Traditional Chinese text to Simplified. Returns the input
/// unchanged if the conversion tables failed to load.
pub fn to_simplified(text: &str) -> String {
    match TW2S.as_ref() {
        Some(converter) => converter.convert(text),
        None => text.to_string(),
    }
}
