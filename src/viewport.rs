// ============================================================================
// VIEWPORT — pan / zoom state and the per-frame projection matrix
// ============================================================================
//
// `center` is in image pixels, `zoom` is screen pixels per image pixel.
// Every mutator is total: no input can make `zoom` zero, negative or NaN.
// ============================================================================

/// Scroll-speed constant of the zoom response curve.
pub const SCROLL_SPEED: f32 = 40.0;

/// Column-major 4×4 matrix, the layout a WGSL `mat4x4<f32>` uniform expects.
///
/// `cols[c][r]` is row `r` of column `c`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mat4 {
    pub cols: [[f32; 4]; 4],
}

impl Mat4 {
    pub const IDENTITY: Mat4 = Mat4 {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    pub fn identity() -> Self {
        Self::IDENTITY
    }

    /// OpenGL-style orthographic projection onto clip space `[-1, 1]³`.
    pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        let rl = right - left;
        let tb = top - bottom;
        let fnr = far - near;
        Self {
            cols: [
                [2.0 / rl, 0.0, 0.0, 0.0],
                [0.0, 2.0 / tb, 0.0, 0.0],
                [0.0, 0.0, -2.0 / fnr, 0.0],
                [
                    -(right + left) / rl,
                    -(top + bottom) / tb,
                    -(far + near) / fnr,
                    1.0,
                ],
            ],
        }
    }

    pub fn scale(x: f32, y: f32, z: f32) -> Self {
        let mut m = Self::IDENTITY;
        m.cols[0][0] = x;
        m.cols[1][1] = y;
        m.cols[2][2] = z;
        m
    }

    pub fn translation(x: f32, y: f32, z: f32) -> Self {
        let mut m = Self::IDENTITY;
        m.cols[3][0] = x;
        m.cols[3][1] = y;
        m.cols[3][2] = z;
        m
    }

    /// `self * rhs`: `rhs` is applied to a point first.
    pub fn multiply(&self, rhs: &Mat4) -> Mat4 {
        let mut out = [[0.0f32; 4]; 4];
        for (c, col) in out.iter_mut().enumerate() {
            for (r, cell) in col.iter_mut().enumerate() {
                *cell = (0..4).map(|k| self.cols[k][r] * rhs.cols[c][k]).sum();
            }
        }
        Mat4 { cols: out }
    }

    /// Transform the point `(x, y, z, 1)` and return the homogeneous result.
    pub fn transform_point(&self, p: [f32; 3]) -> [f32; 4] {
        let v = [p[0], p[1], p[2], 1.0];
        let mut out = [0.0f32; 4];
        for (r, cell) in out.iter_mut().enumerate() {
            *cell = (0..4).map(|k| self.cols[k][r] * v[k]).sum();
        }
        out
    }

    pub fn to_cols_array(&self) -> [[f32; 4]; 4] {
        self.cols
    }
}

impl std::ops::Mul for Mat4 {
    type Output = Mat4;

    fn mul(self, rhs: Mat4) -> Mat4 {
        self.multiply(&rhs)
    }
}

/// Pan offset and zoom factor of one viewer session.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportState {
    center: [f32; 2],
    zoom: f32,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewportState {
    pub fn new() -> Self {
        Self {
            center: [0.0, 0.0],
            zoom: 1.0,
        }
    }

    pub fn center(&self) -> [f32; 2] {
        self.center
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Move the view by a screen-space drag of `(dx, dy)` pixels.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.center[0] += dx / self.zoom;
        self.center[1] += dy / self.zoom;
    }

    /// Apply a scroll delta through the hyperbolic zoom curve.
    ///
    /// With `y` the current zoom: `x = k(y - 1/y) + scroll`, `x' = x / 2k`,
    /// `y' = x' + sqrt(x'² + 1)`. The curve is monotonic in `scroll`, has
    /// `scroll = 0` as a fixed point and is positive for every finite input.
    pub fn zoom_by(&mut self, scroll: f32) {
        if !scroll.is_finite() {
            return;
        }
        let y = self.zoom as f64;
        let k = SCROLL_SPEED as f64;
        let x = k * (y - 1.0 / y) + scroll as f64;
        let xp = x / (2.0 * k);
        // For very negative x' the direct form cancels to zero; use the
        // conjugate 1 / (sqrt(x'²+1) - x') which is the same root.
        let root = (xp * xp + 1.0).sqrt();
        let next = if xp >= 0.0 { xp + root } else { 1.0 / (root - xp) };
        let next = next as f32;
        if next.is_finite() && next > 0.0 {
            self.zoom = next;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// `ortho(-w/2, w/2, -h/2, h/2, -1, 1) * scale(zoom) * translate(cx, -cy)`.
    ///
    /// Image Y grows downward while clip-space Y grows upward, hence `-cy`.
    pub fn projection_matrix(&self, width: f32, height: f32) -> Mat4 {
        let ortho = Mat4::orthographic(
            -width / 2.0,
            width / 2.0,
            -height / 2.0,
            height / 2.0,
            -1.0,
            1.0,
        );
        let scale = Mat4::scale(self.zoom, self.zoom, 1.0);
        let translate = Mat4::translation(self.center[0], -self.center[1], 0.0);
        ortho * scale * translate
    }

    /// Map a point given in pixels relative to the viewport centre (y down)
    /// back to image-space coordinates relative to the image centre (y down).
    pub fn screen_to_image(&self, sx: f32, sy: f32) -> [f32; 2] {
        [sx / self.zoom - self.center[0], sy / self.zoom - self.center[1]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn approx(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() <= eps * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn zoom_stays_positive() {
        let scrolls = [-1e9, -1e5, -4000.0, -120.0, -1.0, -1e-3, 0.0, 1e-3, 1.0, 120.0, 4000.0, 1e5];
        for &start_scroll in &scrolls {
            let mut view = ViewportState::new();
            view.zoom_by(start_scroll);
            for &s in &scrolls {
                let mut v = view;
                v.zoom_by(s);
                assert!(v.zoom() > 0.0, "zoom {} after {}", v.zoom(), s);
                assert!(v.zoom().is_finite());
            }
        }
    }

    #[test]
    fn zero_scroll_is_a_fixed_point() {
        for start in [-300.0, -40.0, -1.0, 0.0, 2.5, 40.0, 300.0] {
            let mut view = ViewportState::new();
            view.zoom_by(start);
            let before = view.zoom();
            view.zoom_by(0.0);
            assert!(approx(view.zoom(), before, EPS), "{} -> {}", before, view.zoom());
        }
    }

    #[test]
    fn zoom_is_monotonic_in_scroll() {
        let mut last = 0.0;
        for s in (-20..=20).map(|i| i as f32 * 15.0) {
            let mut view = ViewportState::new();
            view.zoom_by(s);
            assert!(view.zoom() > last);
            last = view.zoom();
        }
    }

    #[test]
    fn zoom_matches_reference_curve() {
        let mut view = ViewportState::new();
        // y = 1: x = 80, x' = 1, y' = 1 + sqrt(2)
        view.zoom_by(80.0);
        assert!(approx(view.zoom(), 1.0 + 2.0f32.sqrt(), EPS));
        // and back again
        view.zoom_by(-80.0);
        assert!(approx(view.zoom(), 1.0, EPS));
    }

    #[test]
    fn non_finite_scroll_is_ignored() {
        let mut view = ViewportState::new();
        view.zoom_by(f32::NAN);
        view.zoom_by(f32::INFINITY);
        view.zoom_by(f32::NEG_INFINITY);
        assert_eq!(view.zoom(), 1.0);
    }

    #[test]
    fn pan_is_scaled_by_zoom_and_reversible() {
        let mut view = ViewportState::new();
        view.zoom_by(80.0);
        view.pan(10.0, -4.0);
        let c = view.center();
        assert!(approx(c[0], 10.0 / view.zoom(), EPS));

        // Dyadic deltas at a dyadic zoom round-trip bit for bit.
        let mut view = ViewportState::new();
        view.pan(0.5, 0.25);
        let before = view.center();
        view.pan(3.0, -7.0);
        view.pan(-3.0, 7.0);
        assert_eq!(view.center(), before);

        let mut view = ViewportState::new();
        view.pan(0.5, 0.25);
        view.zoom_by(33.0);
        let before = view.center();
        view.pan(3.0, -7.0);
        view.pan(-3.0, 7.0);
        let after = view.center();
        assert!(approx(after[0], before[0], EPS));
        assert!(approx(after[1], before[1], EPS));
    }

    #[test]
    fn reset_restores_identity() {
        let mut view = ViewportState::new();
        view.pan(123.0, -55.0);
        view.zoom_by(-500.0);
        view.reset();
        assert_eq!(view.center(), [0.0, 0.0]);
        assert_eq!(view.zoom(), 1.0);
        assert_eq!(view, ViewportState::default());
    }

    #[test]
    fn identity_view_is_pure_orthographic() {
        let view = ViewportState::new();
        let m = view.projection_matrix(800.0, 600.0);
        let ortho = Mat4::orthographic(-400.0, 400.0, -300.0, 300.0, -1.0, 1.0);
        assert_eq!(m, ortho);
        assert_eq!(m.cols[0][0], 2.0 / 800.0);
        assert_eq!(m.cols[1][1], 2.0 / 600.0);
        assert_eq!(m.cols[2][2], -1.0);
        assert_eq!(m.cols[3], [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn projection_translates_before_scaling() {
        let mut view = ViewportState::new();
        view.zoom_by(80.0);
        view.pan(20.0, 10.0);
        let z = view.zoom();
        let [cx, cy] = view.center();
        let m = view.projection_matrix(200.0, 100.0);
        // Image point (-cx, cy) in model space lands on the viewport centre.
        let p = m.transform_point([-cx, cy, 0.0]);
        assert!(p[0].abs() < 1e-5 && p[1].abs() < 1e-5);
        // One model unit right of that is `zoom` pixels right on screen.
        let q = m.transform_point([-cx + 1.0, cy, 0.0]);
        assert!(approx(q[0], z * 2.0 / 200.0, EPS));
    }

    #[test]
    fn matrix_product_order() {
        let t = Mat4::translation(1.0, 2.0, 0.0);
        let s = Mat4::scale(3.0, 3.0, 1.0);
        let p = (s * t).transform_point([0.0, 0.0, 0.0]);
        assert_eq!(p, [3.0, 6.0, 0.0, 1.0]);
        assert_eq!(Mat4::identity() * t, t);
    }

    #[test]
    fn screen_to_image_inverts_projection() {
        let mut view = ViewportState::new();
        view.zoom_by(-25.0);
        view.pan(40.0, -12.0);
        let [ix, iy] = view.screen_to_image(30.0, 20.0);
        let m = view.projection_matrix(400.0, 400.0);
        // Model space has y up, so image y maps to -y.
        let p = m.transform_point([ix, -iy, 0.0]);
        assert!(approx(p[0] * 200.0, 30.0, 1e-4));
        assert!(approx(-p[1] * 200.0, 20.0, 1e-4));
    }
}
