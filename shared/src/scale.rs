/// Uniform scale factor and offsets fitting the fixed-resolution video
/// canvas into the viewport. Rendering and pointer-to-block mapping for a
/// given paint/click cycle must read the same snapshot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScalingState {
    pub scale_factor: f64,
    pub left_offset: f64,
    pub top_offset: f64,
}

impl Default for ScalingState {
    fn default() -> Self {
        Self {
            scale_factor: 1.0,
            left_offset: 0.0,
            top_offset: 0.0,
        }
    }
}

impl ScalingState {
    /// Converts a viewport-space pointer position to canvas space by
    /// dividing out the active scale factor.
    pub fn to_canvas(
        &self,
        client_x: f64,
        client_y: f64,
        rect_left: f64,
        rect_top: f64,
    ) -> (f64, f64) {
        (
            (client_x - rect_left) / self.scale_factor,
            (client_y - rect_top) / self.scale_factor,
        )
    }
}

/// Shrink-to-fit: scales the canvas down so it fits the viewport below
/// `top_inset`, never up, centered horizontally. Idempotent; recomputed on
/// every resize and every stream-init.
pub fn fit(
    viewport_w: f64,
    viewport_h: f64,
    canvas_w: f64,
    canvas_h: f64,
    top_inset: f64,
) -> ScalingState {
    if canvas_w <= 0.0 || canvas_h <= 0.0 {
        return ScalingState {
            top_offset: top_inset,
            ..ScalingState::default()
        };
    }
    let available_h = (viewport_h - top_inset).max(0.0);
    let mut scale_factor = (viewport_w / canvas_w)
        .min(available_h / canvas_h)
        .min(1.0);
    // A collapsed viewport would otherwise produce a zero or NaN factor the
    // inverse mapping can't divide by.
    if !(scale_factor > 0.0) {
        scale_factor = 1.0;
    }
    ScalingState {
        scale_factor,
        left_offset: ((viewport_w - canvas_w * scale_factor) / 2.0).max(0.0),
        top_offset: top_inset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrow_viewport_shrinks() {
        let scaling = fit(160.0, 1000.0, 320.0, 240.0, 0.0);
        assert!(scaling.scale_factor < 1.0);
        assert_eq!(scaling.scale_factor, 0.5);
    }

    #[test]
    fn wide_viewport_never_upscales() {
        let scaling = fit(1920.0, 1080.0, 320.0, 240.0, 32.0);
        assert_eq!(scaling.scale_factor, 1.0);
        assert_eq!(scaling.top_offset, 32.0);
        // Centered: (1920 - 320) / 2.
        assert_eq!(scaling.left_offset, 800.0);
    }

    #[test]
    fn short_viewport_limits_by_height() {
        let scaling = fit(1000.0, 152.0, 320.0, 240.0, 32.0);
        assert_eq!(scaling.scale_factor, 0.5);
    }

    #[test]
    fn fit_is_idempotent() {
        let a = fit(500.0, 400.0, 320.0, 240.0, 32.0);
        let b = fit(500.0, 400.0, 320.0, 240.0, 32.0);
        assert_eq!(a, b);
    }

    #[test]
    fn collapsed_viewport_keeps_a_usable_factor() {
        let scaling = fit(0.0, 0.0, 320.0, 240.0, 32.0);
        assert!(scaling.scale_factor > 0.0);
    }

    #[test]
    fn pointer_mapping_divides_out_scale() {
        let scaling = fit(160.0, 1000.0, 320.0, 240.0, 0.0);
        let (x, y) = scaling.to_canvas(50.0, 40.0, 10.0, 20.0);
        assert_eq!((x, y), (80.0, 40.0));
    }
}
