
pub mod signal_modulation;
pub mod tracking;

pub const GPS_L1_FREQ_HZ:f64 = 1.57542e9;
pub const GPS_L1_CA_CODE_RATE_HZ:f64 = 1.023e6;
pub const GPS_L1_CA_CODE_LENGTH_CHIPS:f64 = 1023.0;
pub const GPS_L1_CA_CODE_PERIOD_S:f64 = 1.0e-3;

pub fn system_name(system:char) -> &'static str {
	match system {
		'G' => "GPS",
		'S' => "SBAS",
		_   => "Unknown",
	}
}

#[test]
fn system_names() {
	assert_eq!(system_name('G'), "GPS");
	assert_eq!(system_name('S'), "SBAS");
	assert_eq!(system_name('X'), "Unknown");
}
