/// Limits a zipmap owner uses to decide when to switch to another
/// representation, plus loading behaviour.
///
/// The map itself never enforces the limits; see [`crate::ZipMap::exceeds`]
/// and [`ZipMapConfig::accepts`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZipMapConfig {
    /// Most entries a map should hold.
    pub max_entries: usize,
    /// Longest key or value a map should hold.
    pub max_value_len: usize,
    /// Walk every entry when adopting a persisted blob.
    pub validate_on_load: bool,
}

impl Default for ZipMapConfig {
    fn default() -> Self {
        Self {
            max_entries: 512,
            max_value_len: 64,
            validate_on_load: true,
        }
    }
}

impl ZipMapConfig {
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn with_max_value_len(mut self, max_value_len: usize) -> Self {
        self.max_value_len = max_value_len;
        self
    }

    pub fn with_validation(mut self, validate_on_load: bool) -> Self {
        self.validate_on_load = validate_on_load;
        self
    }

    /// True when both `key` and `value` are within `max_value_len`.
    pub fn accepts(&self, key: &[u8], value: &[u8]) -> bool {
        key.len() <= self.max_value_len && value.len() <= self.max_value_len
    }
}
