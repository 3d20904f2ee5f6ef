use core_affinity;

pub struct RuntimeConfig;

impl RuntimeConfig {
    /// Pin current thread to a specific core index, so timing runs are not
    /// migrated mid-measurement.
    pub fn pin_thread(core_id: usize) -> bool {
        let core_ids = core_affinity::get_core_ids();
        if let Some(ids) = core_ids {
            if core_id < ids.len() {
                let pinned = core_affinity::set_for_current(ids[core_id]);
                tracing::debug!(core_id, pinned, "pin benchmark thread");
                return pinned;
            }
        }
        tracing::warn!(core_id, "core index not available, thread left unpinned");
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_out_of_range_core_fails() {
        assert!(!RuntimeConfig::pin_thread(usize::MAX));
    }
}
