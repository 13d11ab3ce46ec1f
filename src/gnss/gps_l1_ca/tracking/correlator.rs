
use num_complex::Complex;

const ZERO:Complex<f64> = Complex{ re: 0.0, im: 0.0 };

// 32.32 fixed-point chip phase: upper 32 bits are the signed chip index,
// lower 32 bits the sub-chip fraction.  The arithmetic right shift floors
// negative phases, which is exactly what the sentinel at table index 0 needs.
const FXP_FRAC_BITS:u32 = 32;

pub fn double_to_fxp64(x:f64) -> i64 {
	(x * (1u64 << FXP_FRAC_BITS) as f64) as i64
}

#[inline]
fn fxp_chip_index(phase:i64) -> usize {
	(1 + (phase >> FXP_FRAC_BITS)) as usize
}

/// Resample the early, prompt and late code replicas for one PRN block.
///
/// `ca_code` is the chip table with wrap sentinels at both ends, so the
/// residual code phase and the early/late offsets may each overrun the PRN
/// boundary by up to one chip without any branching in the loop.
pub fn update_local_code(ca_code:&[Complex<f64>],
		code_phase_step_chips:f64, rem_code_phase_chips:f64, early_late_space_chips:f64,
		early:&mut [Complex<f64>], prompt:&mut [Complex<f64>], late:&mut [Complex<f64>]) {

	let tcode_chips = -rem_code_phase_chips;

	let mut early_phase_fxp  = double_to_fxp64(tcode_chips + early_late_space_chips);
	let mut prompt_phase_fxp = double_to_fxp64(tcode_chips);
	let mut late_phase_fxp   = double_to_fxp64(tcode_chips - early_late_space_chips);
	let code_phase_step_fxp  = double_to_fxp64(code_phase_step_chips);

	for i in 0..prompt.len() {
		early[i]  = ca_code[fxp_chip_index(early_phase_fxp)];
		prompt[i] = ca_code[fxp_chip_index(prompt_phase_fxp)];
		late[i]   = ca_code[fxp_chip_index(late_phase_fxp)];

		early_phase_fxp  += code_phase_step_fxp;
		prompt_phase_fxp += code_phase_step_fxp;
		late_phase_fxp   += code_phase_step_fxp;
	}
}

/// Carrier wipe-off by a running complex phasor fused with the three code
/// correlations.  The phasor is re-seeded from the residual carrier phase at
/// every block, which bounds its magnitude drift without a renormalization
/// inside the loop.
pub fn carrier_rotate_and_epl(input:&[Complex<f64>],
		mut phase:Complex<f64>, phase_inc:Complex<f64>,
		early:&[Complex<f64>], prompt:&[Complex<f64>], late:&[Complex<f64>])
		-> (Complex<f64>, Complex<f64>, Complex<f64>) {

	let mut sum_early  = ZERO;
	let mut sum_prompt = ZERO;
	let mut sum_late   = ZERO;

	for i in 0..input.len() {
		let rotated = input[i] * phase;
		sum_early  += rotated * early[i];
		sum_prompt += rotated * prompt[i];
		sum_late   += rotated * late[i];
		phase = phase * phase_inc;
	}

	(sum_early, sum_prompt, sum_late)
}
