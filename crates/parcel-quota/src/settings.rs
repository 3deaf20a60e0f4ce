use parcel_core::Limits;
use typed_builder::TypedBuilder;

const GIB: u64 = 1024 * 1024 * 1024;
const MIB: u64 = 1024 * 1024;

/// System-wide quota defaults. Per-owner overrides on the usage counters
/// take precedence over the first two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TypedBuilder)]
pub struct QuotaSettings {
    /// Storage limit for owners without an override.
    #[builder(default = 10 * GIB)]
    pub default_storage_bytes: u64,
    /// File count limit for owners without an override.
    #[builder(default = 10_000)]
    pub default_max_files: u64,
    /// Largest single upload accepted, regardless of remaining quota.
    #[builder(default = 100 * MIB)]
    pub max_upload_bytes: u64,
}

impl Default for QuotaSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl QuotaSettings {
    pub fn default_limits(&self) -> Limits {
        Limits {
            storage_bytes: self.default_storage_bytes,
            files: self.default_max_files,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = QuotaSettings::default();
        assert_eq!(settings.default_storage_bytes, 10_737_418_240);
        assert_eq!(settings.default_max_files, 10_000);
        assert_eq!(settings.max_upload_bytes, 104_857_600);
    }
}
