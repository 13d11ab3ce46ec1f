
use num_complex::Complex;

/// Signal-to-noise-variance C/N0 estimator over a window of prompt
/// correlations, in dB-Hz.  Signal power comes from the second and fourth
/// moments of the prompt magnitude; a degenerate window (no signal at all)
/// reports 0 rather than NaN so the failure counter keeps advancing.
pub fn cn0_svn_estimator(prompt_buffer:&[Complex<f64>], coh_integration_time_s:f64) -> f64 {
	let n = prompt_buffer.len() as f64;
	let m2:f64 = prompt_buffer.iter().map(|p| p.norm_sqr()).sum::<f64>() / n;
	let m4:f64 = prompt_buffer.iter().map(|p| p.norm_sqr().powi(2)).sum::<f64>() / n;

	let p_sig = (2.0 * m2 * m2 - m4).max(0.0).sqrt();
	let p_noise = m2 - p_sig;
	if p_sig <= 0.0 || p_noise <= 0.0 {
		0.0
	} else {
		10.0 * (p_sig / (p_noise * coh_integration_time_s)).log10()
	}
}

/// Normalized-variance carrier lock test over the same window; near 1 when
/// the prompt energy sits in the in-phase arm, near -1 when the PLL has
/// slipped a quarter cycle, 0 for an empty window.
pub fn carrier_lock_detector(prompt_buffer:&[Complex<f64>]) -> f64 {
	let sum_i:f64 = prompt_buffer.iter().map(|p| p.re).sum();
	let sum_q:f64 = prompt_buffer.iter().map(|p| p.im).sum();
	let nbd = sum_i * sum_i - sum_q * sum_q;
	let nbp = sum_i * sum_i + sum_q * sum_q;
	if nbp == 0.0 { 0.0 } else { nbd / nbp }
}

#[cfg(test)]
mod tests {

	use num_complex::Complex;
	use super::*;

	#[test]
	fn carrier_lock_test_is_one_for_in_phase_prompts() {
		let window:Vec<Complex<f64>> = (0..20).map(|i| Complex{ re: 4.0e3 + (i as f64), im: 0.0 }).collect();
		assert!((carrier_lock_detector(&window) - 1.0).abs() < 1.0e-12);
	}

	#[test]
	fn carrier_lock_test_is_minus_one_for_quadrature_prompts() {
		let window:Vec<Complex<f64>> = (0..20).map(|_| Complex{ re: 0.0, im: 4.0e3 }).collect();
		assert!((carrier_lock_detector(&window) + 1.0).abs() < 1.0e-12);
	}

	#[test]
	fn detectors_handle_an_all_zero_window() {
		let window = vec![Complex{ re: 0.0, im: 0.0 }; 20];
		assert_eq!(carrier_lock_detector(&window), 0.0);
		assert_eq!(cn0_svn_estimator(&window, 1.0e-3), 0.0);
	}

	#[test]
	fn cn0_estimate_matches_a_known_signal_and_noise_mix() {
		// Constant prompt amplitude a with a small deterministic magnitude
		// ripple standing in for noise: M2 and M4 then give back the ripple
		// power as the noise estimate.
		let a = 4.0e3;
		let ripple = 250.0;
		let window:Vec<Complex<f64>> = (0..20)
			.map(|i| {
				let noise_i = if i % 2 == 0 { ripple } else { -ripple };
				Complex{ re: a + noise_i, im: noise_i }
			})
			.collect();
		let cn0 = cn0_svn_estimator(&window, 1.0e-3);

		// C/N0 = a^2 / (2 ripple^2 T): 10*log10(16e6 / (125e3 * 1e-3))
		let expected = 10.0 * (a * a / (2.0 * ripple * ripple * 1.0e-3)).log10();
		assert!((cn0 - expected).abs() < 0.5, "cn0 = {}, expected about {}", cn0, expected);
	}

}
