// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The escape-time kernel.  A pure function with no shared state, so
//! any number of workers may call it without synchronization.  The
//! band renderer in `chunk` accepts any function with this signature;
//! a hand-optimized drop-in only has to honor the same contract.

use num::Complex;

/// Counts the iterations the orbit of `c` takes to leave the circle
/// of radius 2, up to `max_iter`.  The orbit starts at `c` itself, so
/// a point already outside the circle escapes at iteration 0, and the
/// origin (which never escapes) comes back as `max_iter`.
pub fn escape_time(c: Complex<f64>, max_iter: u32) -> u32 {
    let mut z = c;
    for n in 0..max_iter {
        if z.norm_sqr() > 4.0 {
            return n;
        }
        z = z * z + c;
    }
    max_iter
}
