use mediabay_core::ScaleBasis;

/// Thumbnail dimension arithmetic
pub struct ImageResize;

impl ImageResize {
    /// Output dimensions for a thumbnail of `target` pixels.
    ///
    /// Inputs are the *displayed* dimensions (orientation already accounted
    /// for). The edge selected by `basis` becomes exactly `target`; the other
    /// edge keeps the aspect ratio, rounded, and never drops below 1.
    /// Sources smaller than the target are scaled up.
    pub fn scaled_dimensions(width: u32, height: u32, target: u32, basis: ScaleBasis) -> (u32, u32) {
        let width = width.max(1);
        let height = height.max(1);

        let scale_width = match basis {
            ScaleBasis::Width => true,
            ScaleBasis::LongestEdge => width >= height,
        };

        if scale_width {
            let aspect_ratio = height as f64 / width as f64;
            let h = (target as f64 * aspect_ratio).round() as u32;
            (target, h.max(1))
        } else {
            let aspect_ratio = width as f64 / height as f64;
            let w = (target as f64 * aspect_ratio).round() as u32;
            (w.max(1), target)
        }
    }
}
