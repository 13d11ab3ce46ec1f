
use num_complex::Complex;

pub const CODE_LENGTH_CHIPS:usize = 1023;

// G2 delay in chips for PRN 1 through 32, per the IS-GPS-200 code phase assignments
const CA_G2_DELAY_CHIPS:[usize; 32] = [
	  5,   6,   7,   8,  17,  18, 139, 140, 141, 251,
	252, 254, 255, 256, 257, 258, 469, 470, 471, 472,
	473, 474, 509, 512, 513, 514, 515, 516, 859, 860,
	861, 862];

/// C/A Gold code for one PRN period as bits.  The code is the XOR of the G1
/// sequence with a PRN-specific delayed copy of the G2 sequence; both
/// generators are 10-stage LFSRs seeded with all ones.
pub fn ca_code_bits(prn:usize) -> Result<[bool; CODE_LENGTH_CHIPS], &'static str> {
	if prn < 1 || prn > CA_G2_DELAY_CHIPS.len() {
		return Err("PRN out of range for L1 C/A code generation");
	}

	let mut g1 = [true; 10];
	let mut g2 = [true; 10];
	let mut g1_seq = [false; CODE_LENGTH_CHIPS];
	let mut g2_seq = [false; CODE_LENGTH_CHIPS];

	for i in 0..CODE_LENGTH_CHIPS {
		g1_seq[i] = g1[9];
		g2_seq[i] = g2[9];

		// G1 feedback taps 3,10; G2 feedback taps 2,3,6,8,9,10
		let f1 = g1[2] ^ g1[9];
		let f2 = g2[1] ^ g2[2] ^ g2[5] ^ g2[7] ^ g2[8] ^ g2[9];

		for j in (1..10).rev() {
			g1[j] = g1[j-1];
			g2[j] = g2[j-1];
		}
		g1[0] = f1;
		g2[0] = f2;
	}

	let delay = CA_G2_DELAY_CHIPS[prn-1];
	let mut chips = [false; CODE_LENGTH_CHIPS];
	for i in 0..CODE_LENGTH_CHIPS {
		chips[i] = g1_seq[i] ^ g2_seq[(i + CODE_LENGTH_CHIPS - delay) % CODE_LENGTH_CHIPS];
	}

	Ok(chips)
}

fn chip_as_complex(bit:bool) -> Complex<f64> {
	Complex{ re: if bit { -1.0 } else { 1.0 }, im: 0.0 }
}

/// One PRN period as BPSK chips, one complex sample per chip
pub fn prn_complex(prn:usize) -> Result<Vec<Complex<f64>>, &'static str> {
	Ok(ca_code_bits(prn)?.iter().map(|&b| chip_as_complex(b)).collect())
}

/// Writes one PRN period of BPSK chips into a preallocated table of
/// `CODE_LENGTH_CHIPS + 2` entries with wrap sentinels: index 0 holds chip
/// 1023 and index 1024 holds chip 1, so a replica generator reading at
/// `1 + chip_index` never needs a modulo for a one-chip overrun on either end.
pub fn fill_prn_complex_with_sentinels(prn:usize, table:&mut [Complex<f64>]) -> Result<(), &'static str> {
	if table.len() != CODE_LENGTH_CHIPS + 2 {
		return Err("Code table must hold the PRN period plus two wrap sentinels");
	}
	let chips = ca_code_bits(prn)?;
	for (i, &b) in chips.iter().enumerate() {
		table[1 + i] = chip_as_complex(b);
	}
	table[0] = table[CODE_LENGTH_CHIPS];
	table[CODE_LENGTH_CHIPS + 1] = table[1];
	Ok(())
}

/// Allocating convenience wrapper around `fill_prn_complex_with_sentinels`
pub fn prn_complex_with_sentinels(prn:usize) -> Result<Vec<Complex<f64>>, &'static str> {
	let mut table = vec![Complex{ re: 0.0, im: 0.0 }; CODE_LENGTH_CHIPS + 2];
	fill_prn_complex_with_sentinels(prn, &mut table)?;
	Ok(table)
}
