//! The chunk compute unit: fills one band's pixel buffer by mapping
//! every pixel through the viewport to the complex plane, running the
//! escape-time kernel, and shading the result.  Bands share no
//! mutable state, so any number of them can run on disjoint workers.

use itertools::iproduct;
use num::Complex;

use bands::Band;
use color::colormap;
use escape::escape_time;
use planes::Viewport;

/// Renders one band into a fresh row-major RGB buffer of exactly
/// `band.rows() × viewport.width()` pixels.
pub fn render_band(viewport: &Viewport, band: &Band) -> Vec<u8> {
    render_band_with(viewport, band, escape_time)
}

/// Same as `render_band`, but with the caller's kernel.  Anything
/// honoring the escape-time contract — same inputs, an iteration
/// count in `[0, max_iter]` — slots in here, which is how an
/// optimized kernel build substitutes for the reference one.
pub fn render_band_with<K>(viewport: &Viewport, band: &Band, kernel: K) -> Vec<u8>
where
    K: Fn(Complex<f64>, u32) -> u32,
{
    let width = viewport.width();
    let max_iter = viewport.max_iter();
    let mut pixels = vec![0 as u8; band.rows() * width * 3];
    for (y, x) in iproduct!(band.y_start..band.y_end, 0..width) {
        let c = viewport.pixel_to_point(x, y);
        let value = kernel(c, max_iter);
        let shade = colormap(f64::from(value) / f64::from(max_iter));
        let offset = ((y - band.y_start) * width + x) * 3;
        pixels[offset..offset + 3].copy_from_slice(&shade);
    }
    pixels
}
