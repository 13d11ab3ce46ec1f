
use serde::{Serialize, Deserialize};

/// Control message code reported to the host queue when a channel loses lock
pub const LOSS_OF_LOCK_EVENT_CODE:u8 = 2;

/// One tracking observable per PRN period, handed to telemetry decoding and
/// pseudorange computation downstream.  Exactly one of these is produced per
/// `process()` call, valid or not, so consumers see a constant-rate stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GnssSynchro {
	pub system: char,
	pub prn: u8,
	pub prompt_i: f64,
	pub prompt_q: f64,
	/// Receive time of the current PRN start, in seconds of consumed input
	pub tracking_timestamp_s: f64,
	/// Always zero; the timestamp above is aligned to the current PRN start
	pub code_phase_s: f64,
	pub carrier_phase_rad: f64,
	pub carrier_doppler_hz: f64,
	pub cn0_db_hz: f64,
	pub flag_valid_tracking: bool,
	/// Never set by tracking; the PVT stage takes ownership of this flag
	pub flag_valid_pseudorange: bool,
}

impl GnssSynchro {

	pub fn invalid(system:char, prn:u8, tracking_timestamp_s:f64) -> Self {
		Self { system, prn, prompt_i: 0.0, prompt_q: 0.0, tracking_timestamp_s,
			code_phase_s: 0.0, carrier_phase_rad: 0.0, carrier_doppler_hz: 0.0,
			cn0_db_hz: 0.0, flag_valid_tracking: false, flag_valid_pseudorange: false }
	}

}

/// Acquisition-to-tracking handoff.  The host writes one of these via
/// `set_acquisition()` before calling `start()`; the tracker keeps its own
/// copy, so later host-side updates are only seen through another call to
/// the setter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionHandoff {
	pub system: char,
	pub prn: u8,
	pub code_phase_samples: f64,
	pub doppler_hz: f64,
	/// Absolute sample index at which the acquisition estimates were valid
	pub sample_stamp: u64,
}

/// Channel control event enqueued to the host; delivery is the host's problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelEvent {
	pub channel: usize,
	pub code: u8,
}
