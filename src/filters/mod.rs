
pub trait ScalarFilter {

	fn apply(&mut self, x:f64) -> f64;
	fn initialize(&mut self, x0:f64);

}

/* Second-order loop filter used for both the carrier PLL and the code DLL.  The
coefficients are derived from the one-sided noise bandwidth and a fixed damping
ratio; the PLL and DLL differ only in the gain factor used for tau1.  The filter
holds the NCO command between updates, so initialize() seeds it with the absolute
rate estimate (Doppler for the carrier loop) and apply() returns the new command
given the latest discriminator output. */

pub const DAMPING_RATIO:f64 = 0.7;

pub struct SecondOrderLoopFilter {
	tau1: f64,
	tau2: f64,
	pdi:  f64,
	last_error: f64,
	last_nco:   f64,
}

impl SecondOrderLoopFilter {

	pub fn new(bw_hz:f64, gain:f64, pdi:f64) -> Self {
		let zeta = DAMPING_RATIO;
		let wn = (bw_hz * 8.0 * zeta) / (4.0 * zeta * zeta + 1.0);
		Self { tau1: gain / (wn * wn), tau2: (2.0 * zeta) / wn, pdi, last_error: 0.0, last_nco: 0.0 }
	}

	/// Carrier loop filter; bandwidth in Hz, update interval in seconds
	pub fn pll(bw_hz:f64, pdi:f64) -> Self { Self::new(bw_hz, 0.25, pdi) }

	/// Code loop filter; bandwidth in Hz, update interval in seconds
	pub fn dll(bw_hz:f64, pdi:f64) -> Self { Self::new(bw_hz, 1.0,  pdi) }

}

impl ScalarFilter for SecondOrderLoopFilter {

	fn apply(&mut self, x:f64) -> f64 {
		let nco = self.last_nco
			+ (self.tau2 / self.tau1) * (x - self.last_error)
			+ (x + self.last_error) * (self.pdi / (2.0 * self.tau1));
		self.last_error = x;
		self.last_nco = nco;
		nco
	}

	fn initialize(&mut self, x0:f64) {
		self.last_error = 0.0;
		self.last_nco = x0;
	}

}

#[test]
fn zero_error_holds_the_nco_command() {
	let mut f = SecondOrderLoopFilter::pll(50.0, 1.0e-3);
	f.initialize(2400.0);
	for _ in 0..100 {
		assert_eq!(f.apply(0.0), 2400.0);
	}
}

#[test]
fn constant_error_ramps_the_nco_command() {
	let mut f = SecondOrderLoopFilter::dll(2.0, 1.0e-3);
	f.initialize(0.0);
	let mut last = f.apply(0.01);
	assert!(last > 0.0);
	for _ in 0..20 {
		let next = f.apply(0.01);
		assert!(next > last);
		last = next;
	}
}
