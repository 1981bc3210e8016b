/// The three user-facing SSAO switches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SsaoToggle {
    Enabled,
    Only,
    Blur,
}

impl SsaoToggle {
    /// Decode the integer used on the C ABI (0 = enabled, 1 = only, 2 = blur).
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(SsaoToggle::Enabled),
            1 => Some(SsaoToggle::Only),
            2 => Some(SsaoToggle::Blur),
            _ => None,
        }
    }
}

/// User-controlled render settings, produced by the UI layer and consumed by
/// `UniformBlockManager::update_ssao`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderSettings {
    pub ssao_enabled: bool,
    pub ssao_only: bool,
    pub ssao_blur_enabled: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            ssao_enabled: true,
            ssao_only: false,
            ssao_blur_enabled: true,
        }
    }
}

impl RenderSettings {
    pub fn get(&self, toggle: SsaoToggle) -> bool {
        match toggle {
            SsaoToggle::Enabled => self.ssao_enabled,
            SsaoToggle::Only => self.ssao_only,
            SsaoToggle::Blur => self.ssao_blur_enabled,
        }
    }

    /// Set a toggle. Returns true when the value actually changed.
    pub fn set(&mut self, toggle: SsaoToggle, value: bool) -> bool {
        let slot = match toggle {
            SsaoToggle::Enabled => &mut self.ssao_enabled,
            SsaoToggle::Only => &mut self.ssao_only,
            SsaoToggle::Blur => &mut self.ssao_blur_enabled,
        };
        let changed = *slot != value;
        *slot = value;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_sample() {
        let s = RenderSettings::default();
        assert!(s.get(SsaoToggle::Enabled));
        assert!(!s.get(SsaoToggle::Only));
        assert!(s.get(SsaoToggle::Blur));
    }

    #[test]
    fn test_set_reports_changes() {
        let mut s = RenderSettings::default();
        assert!(!s.set(SsaoToggle::Enabled, true));
        assert!(s.set(SsaoToggle::Only, true));
        assert!(s.ssao_only);
        assert!(!s.set(SsaoToggle::Only, true));
    }

    #[test]
    fn test_raw_toggle_decoding() {
        assert_eq!(SsaoToggle::from_raw(2), Some(SsaoToggle::Blur));
        assert_eq!(SsaoToggle::from_raw(3), None);
    }
}
