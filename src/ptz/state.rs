use anyhow::{anyhow, Result};

pub const MIN_ZOOM: f64 = 1.0;
pub const DEFAULT_MAX_ZOOM: f64 = 4.0;
pub const DEFAULT_ZOOM_STEP: f64 = 0.2;

/// Validated zoom bounds: `max_zoom >= 1.0`, `zoom_step > 0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomLimits {
    max_zoom: f64,
    zoom_step: f64,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            max_zoom: DEFAULT_MAX_ZOOM,
            zoom_step: DEFAULT_ZOOM_STEP,
        }
    }
}

impl ZoomLimits {
    pub fn new(max_zoom: f64, zoom_step: f64) -> Result<Self> {
        if !max_zoom.is_finite() || max_zoom < MIN_ZOOM {
            return Err(anyhow!(
                "max_zoom must be a finite value >= {}, got {}",
                MIN_ZOOM,
                max_zoom
            ));
        }
        if !zoom_step.is_finite() || zoom_step <= 0.0 {
            return Err(anyhow!(
                "zoom_step must be a finite value > 0, got {}",
                zoom_step
            ));
        }
        Ok(Self {
            max_zoom,
            zoom_step,
        })
    }

    pub fn max_zoom(&self) -> f64 {
        self.max_zoom
    }

    pub fn zoom_step(&self) -> f64 {
        self.zoom_step
    }

    fn clamp(&self, zoom: f64) -> f64 {
        zoom.clamp(MIN_ZOOM, self.max_zoom)
    }
}

/// Process-wide PTZ state for one camera session.
///
/// `zoom` stays within `[1.0, max_zoom]`; every setter clamps. `target_id`
/// may name a track that is not in the current frame.
#[derive(Clone, Debug, PartialEq)]
pub struct PtzState {
    target_id: Option<i64>,
    zoom: f64,
    limits: ZoomLimits,
}

impl Default for PtzState {
    fn default() -> Self {
        Self::new(ZoomLimits::default())
    }
}

impl PtzState {
    pub fn new(limits: ZoomLimits) -> Self {
        Self {
            target_id: None,
            zoom: MIN_ZOOM,
            limits,
        }
    }

    pub fn target_id(&self) -> Option<i64> {
        self.target_id
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn limits(&self) -> ZoomLimits {
        self.limits
    }

    pub fn set_target(&mut self, target_id: Option<i64>) {
        self.target_id = target_id;
    }

    /// Set zoom, clamped to the limits. NaN is ignored.
    pub fn set_zoom(&mut self, zoom: f64) {
        if zoom.is_nan() {
            return;
        }
        self.zoom = self.limits.clamp(zoom);
    }

    /// Move zoom by `steps` zoom steps (negative zooms out).
    pub fn zoom_by(&mut self, steps: f64) {
        self.set_zoom(self.zoom + steps * self.limits.zoom_step);
    }

    /// `zoom = 1.0`, no target.
    pub fn reset(&mut self) {
        self.zoom = MIN_ZOOM;
        self.target_id = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_reject_invalid_values() {
        assert!(ZoomLimits::new(0.5, 0.2).is_err());
        assert!(ZoomLimits::new(f64::NAN, 0.2).is_err());
        assert!(ZoomLimits::new(4.0, 0.0).is_err());
        assert!(ZoomLimits::new(4.0, -1.0).is_err());
        assert!(ZoomLimits::new(1.0, 0.5).is_ok());
    }

    #[test]
    fn zoom_is_clamped() {
        let mut state = PtzState::new(ZoomLimits::new(2.0, 0.5).unwrap());
        state.set_zoom(10.0);
        assert_eq!(state.zoom(), 2.0);
        state.set_zoom(0.1);
        assert_eq!(state.zoom(), 1.0);
        state.set_zoom(f64::NAN);
        assert_eq!(state.zoom(), 1.0);
        state.set_zoom(f64::INFINITY);
        assert_eq!(state.zoom(), 2.0);
    }

    #[test]
    fn zoom_by_uses_configured_step() {
        let mut state = PtzState::default();
        state.zoom_by(1.0);
        assert!((state.zoom() - 1.2).abs() < 1e-9);
        state.zoom_by(-3.0);
        assert_eq!(state.zoom(), 1.0);
    }

    #[test]
    fn reset_is_idempotent() {
        let mut state = PtzState::default();
        state.set_target(Some(3));
        state.set_zoom(3.0);
        state.reset();
        let once = state.clone();
        state.reset();
        assert_eq!(state, once);
        assert_eq!(state.zoom(), 1.0);
        assert_eq!(state.target_id(), None);
    }
}
