
use std::f64::consts;

use num_complex::Complex;

/// Two-quadrant atan PLL discriminator, in radians.  Insensitive to the 180
/// degree phase flips of the navigation data bits.  A prompt on the imaginary
/// axis saturates to a quarter cycle with the sign of the quadrature part.
pub fn pll_two_quadrant_atan(prompt:Complex<f64>) -> f64 {
	if prompt.re == 0.0 {
		if      prompt.im > 0.0 {  consts::FRAC_PI_2 }
		else if prompt.im < 0.0 { -consts::FRAC_PI_2 }
		else                    {  0.0 }
	} else {
		(prompt.im / prompt.re).atan()
	}
}

/// Normalized non-coherent early-minus-late power DLL discriminator, in chips
pub fn dll_nc_e_minus_l_normalized(early:Complex<f64>, late:Complex<f64>) -> f64 {
	let e = early.norm();
	let l = late.norm();
	if e + l == 0.0 { 0.0 } else { (e - l) / (e + l) }
}
