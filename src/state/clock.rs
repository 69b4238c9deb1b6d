//! Mapping wall-clock time onto the interpolation fraction.

use std::time::Instant;

use super::Snapshot;

/// Decides which tick fraction a renderer should sample at a given instant.
///
/// With `render_delay_ticks = 1` the renderer shows the start of the latest
/// committed tick at commit time and reaches its end exactly one tick later,
/// so it only extrapolates when a commit is late.
#[derive(Debug, Clone, Copy)]
pub struct RenderClock {
    /// How far behind the latest commit to render. Default: 1.
    pub render_delay_ticks: f32,
    /// Largest fraction past the second keyframe ever returned. Default: 0.25.
    pub max_extrapolation: f32,
}

impl Default for RenderClock {
    fn default() -> Self {
        Self {
            render_delay_ticks: 1.0,
            max_extrapolation: 0.25,
        }
    }
}

impl RenderClock {
    pub fn fraction(&self, snapshot: &Snapshot, now: Instant) -> f32 {
        let tick = snapshot.tick_duration().as_secs_f32();
        if tick <= 0.0 {
            return 1.0;
        }
        let elapsed = now
            .saturating_duration_since(snapshot.committed_at())
            .as_secs_f32();
        (elapsed / tick + 1.0 - self.render_delay_ticks).clamp(0.0, 1.0 + self.max_extrapolation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn snapshot_at(committed_at: Instant) -> Snapshot {
        Snapshot::new(1, Duration::from_millis(50), committed_at, Vec::new())
    }

    #[test]
    fn test_fraction_tracks_elapsed_time() {
        let start = Instant::now();
        let snapshot = snapshot_at(start);
        let clock = RenderClock::default();

        assert_eq!(clock.fraction(&snapshot, start), 0.0);
        let half = clock.fraction(&snapshot, start + Duration::from_millis(25));
        assert!((half - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_fraction_extrapolation_is_clamped() {
        let start = Instant::now();
        let snapshot = snapshot_at(start);
        let clock = RenderClock::default();
        let late = clock.fraction(&snapshot, start + Duration::from_secs(2));
        assert_eq!(late, 1.25);
    }

    #[test]
    fn test_zero_delay_starts_at_second_keyframe() {
        let start = Instant::now();
        let snapshot = snapshot_at(start);
        let clock = RenderClock {
            render_delay_ticks: 0.0,
            max_extrapolation: 0.5,
        };
        assert_eq!(clock.fraction(&snapshot, start), 1.0);
        // Before the commit instant counts as the commit instant.
        if let Some(earlier) = start.checked_sub(Duration::from_millis(10)) {
            assert_eq!(clock.fraction(&snapshot, earlier), 1.0);
        }
    }
}
