
use std::f64::consts;
use std::sync::mpsc;

use num_complex::Complex;
use serde::{Serialize, Deserialize};

use crate::DigSigProcErr;
use crate::filters::{ScalarFilter, SecondOrderLoopFilter};
use crate::io::{FileDumpSink, TrackingDumpRecord, TrackingDumpSink};
use crate::gnss::synchro::{AcquisitionHandoff, ChannelEvent, GnssSynchro, LOSS_OF_LOCK_EVENT_CODE};

use super::{GPS_L1_FREQ_HZ, GPS_L1_CA_CODE_RATE_HZ, GPS_L1_CA_CODE_LENGTH_CHIPS, GPS_L1_CA_CODE_PERIOD_S};
use super::{signal_modulation, system_name};

pub mod correlator;
pub mod discriminators;
pub mod lock_detectors;


pub const CN0_ESTIMATION_SAMPLES:usize = 20;
pub const MINIMUM_VALID_CN0_DB_HZ:f64 = 25.0;
pub const MAXIMUM_LOCK_FAIL_COUNTER:usize = 50;
pub const CARRIER_LOCK_THRESHOLD:f64 = 0.85;

const TWO_PI:f64 = 2.0 * consts::PI;
const ZERO:Complex<f64> = Complex{ re: 0.0, im: 0.0 };

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
	pub if_freq_hz: f64,
	pub fs_in_hz: f64,
	/// Nominal samples per PRN period at the nominal code rate
	pub vector_length: usize,
	pub pll_bw_hz: f64,
	pub dll_bw_hz: f64,
	pub early_late_space_chips: f64,
	pub carrier_aiding: bool,
	pub dump: bool,
	pub dump_filename: String,
}

impl Default for TrackingConfig {

	fn default() -> Self {
		Self { if_freq_hz: 0.0, fs_in_hz: 4.0e6, vector_length: 4000,
			pll_bw_hz: 50.0, dll_bw_hz: 2.0, early_late_space_chips: 0.5,
			carrier_aiding: true, dump: false, dump_filename: "trk_ch_".to_string() }
	}

}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum TrackingState {
	Idle,
	PullIn,
	Tracking,
}

#[derive(Debug)]
pub enum TrackingResult {
	/// Not enough input was available; no samples were consumed and no state changed
	NotReady,
	Ready{ consumed:usize, synchro:GnssSynchro },
}

pub struct Tracking<A: ScalarFilter, B: ScalarFilter> {
	// Immutable configuration
	if_freq: f64,
	fs_in: f64,
	vector_length: usize,
	early_late_space_chips: f64,
	carrier_aiding: bool,
	dump: bool,
	dump_filename: String,

	channel: usize,
	channel_queue: Option<mpsc::Sender<ChannelEvent>>,
	dump_sink: Option<Box<dyn TrackingDumpSink>>,

	carrier_filter: A,
	code_filter: B,

	// Local C/A code with wrap sentinels plus the resampled EPL scratch,
	// all sized once at construction
	ca_code: Vec<Complex<f64>>,
	early_code: Vec<Complex<f64>>,
	prompt_code: Vec<Complex<f64>>,
	late_code: Vec<Complex<f64>>,

	state: TrackingState,
	acq: Option<AcquisitionHandoff>,
	acq_code_phase_samples: f64,
	acq_sample_stamp: u64,
	system: char,
	prn: u8,

	sample_counter: u64,
	current_prn_length_samples: usize,
	code_freq_chips: f64,
	carrier_doppler_hz: f64,
	rem_code_phase_samples: f64,
	rem_carr_phase_rad: f64,
	acc_carrier_phase_rad: f64,
	code_phase_chips: f64,

	cn0_window: Vec<Complex<f64>>,
	cn0_idx: usize,
	cn0_db_hz: f64,
	carrier_lock_test: f64,
	lock_fail_count: usize,
}

impl<A: ScalarFilter, B: ScalarFilter> Tracking<A, B> {

	// Read-only getter methods
	pub fn state(&self) -> TrackingState { self.state }
	pub fn sample_counter(&self) -> u64 { self.sample_counter }
	pub fn current_prn_length_samples(&self) -> usize { self.current_prn_length_samples }
	pub fn carrier_doppler_hz(&self) -> f64 { self.carrier_doppler_hz }
	pub fn code_freq_chips(&self) -> f64 { self.code_freq_chips }
	pub fn code_phase_chips(&self) -> f64 { self.code_phase_chips }
	pub fn rem_code_phase_samples(&self) -> f64 { self.rem_code_phase_samples }
	pub fn acc_carrier_phase_rad(&self) -> f64 { self.acc_carrier_phase_rad }
	pub fn cn0_db_hz(&self) -> f64 { self.cn0_db_hz }
	pub fn carrier_lock_test(&self) -> f64 { self.carrier_lock_test }

	/// Minimum number of samples the host should make available per call
	pub fn samples_needed(&self) -> usize { 2 * self.vector_length }

	pub fn set_channel(&mut self, channel:usize) {
		self.channel = channel;
		if self.dump && self.dump_sink.is_none() {
			let filename = format!("{}{}.dat", self.dump_filename, channel);
			match FileDumpSink::new(&filename) {
				Ok(sink) => self.dump_sink = Some(Box::new(sink)),
				Err(e)   => eprintln!("Channel {}: unable to open track dump file {}: {}", channel, filename, e),
			}
		}
	}

	pub fn set_channel_queue(&mut self, queue:mpsc::Sender<ChannelEvent>) {
		self.channel_queue = Some(queue);
	}

	pub fn set_dump_sink(&mut self, sink:Box<dyn TrackingDumpSink>) {
		self.dump_sink = Some(sink);
	}

	/// Stores a copy of the acquisition handoff; no state change until `start()`
	pub fn set_acquisition(&mut self, acq:AcquisitionHandoff) {
		self.acq = Some(acq);
	}

	/// Consumes the acquisition handoff and arms the pull-in alignment.  The code
	/// phase reported by acquisition is corrected for the Doppler-induced code
	/// stretching over the samples elapsed since the acquisition stamp.
	pub fn start(&mut self) -> Result<(), DigSigProcErr> {
		let acq = self.acq.ok_or(DigSigProcErr::Other("tracking started without an acquisition handoff"))?;

		signal_modulation::fill_prn_complex_with_sentinels(acq.prn as usize, &mut self.ca_code)
			.map_err(DigSigProcErr::Other)?;

		let radial_velocity = (GPS_L1_FREQ_HZ + acq.doppler_hz) / GPS_L1_FREQ_HZ;
		self.code_freq_chips = radial_velocity * GPS_L1_CA_CODE_RATE_HZ;
		let t_prn_mod_s = GPS_L1_CA_CODE_LENGTH_CHIPS / self.code_freq_chips;
		let t_prn_mod_samples = t_prn_mod_s * self.fs_in;
		self.current_prn_length_samples = t_prn_mod_samples.round() as usize;

		let t_prn_true_s = GPS_L1_CA_CODE_LENGTH_CHIPS / GPS_L1_CA_CODE_RATE_HZ;
		let t_prn_true_samples = t_prn_true_s * self.fs_in;
		let acq_trk_diff_samples = self.sample_counter as i64 - acq.sample_stamp as i64;
		let acq_trk_diff_seconds = acq_trk_diff_samples as f64 / self.fs_in;
		let n_prn_diff = acq_trk_diff_seconds / t_prn_true_s;
		let mut corrected_acq_phase_samples =
			(acq.code_phase_samples + (t_prn_true_s - t_prn_mod_s) * n_prn_diff * self.fs_in) % t_prn_true_samples;
		if corrected_acq_phase_samples < 0.0 {
			corrected_acq_phase_samples += t_prn_mod_samples;
		}
		self.acq_code_phase_samples = corrected_acq_phase_samples;
		self.acq_sample_stamp = acq.sample_stamp;

		self.carrier_doppler_hz = acq.doppler_hz;
		self.code_freq_chips = GPS_L1_CA_CODE_RATE_HZ
			+ (self.carrier_doppler_hz * GPS_L1_CA_CODE_RATE_HZ) / GPS_L1_FREQ_HZ;

		self.carrier_filter.initialize(self.carrier_doppler_hz);
		if self.carrier_aiding {
			// The carrier aiding term carries the bulk of the code dynamics
			self.code_filter.initialize(0.0);
		} else {
			self.code_filter.initialize(self.carrier_doppler_hz * GPS_L1_CA_CODE_RATE_HZ / GPS_L1_FREQ_HZ);
		}

		self.rem_code_phase_samples = 0.0;
		self.rem_carr_phase_rad = 0.0;
		self.acc_carrier_phase_rad = 0.0;
		self.code_phase_chips = 0.0;
		self.lock_fail_count = 0;
		for p in self.cn0_window.iter_mut() { *p = ZERO; }
		self.cn0_idx = 0;
		self.cn0_db_hz = 0.0;
		self.carrier_lock_test = 1.0;

		self.system = acq.system;
		self.prn = acq.prn;

		eprintln!("Tracking start on channel {} for {} PRN {:02}",
			self.channel, system_name(self.system), self.prn);

		self.state = TrackingState::PullIn;
		Ok(())
	}

	/// Runs one tracking step over a prefix of `input` and reports how many
	/// samples it consumed.  One output record is produced per call in every
	/// state; only an input underrun returns `NotReady`.
	pub fn process(&mut self, input:&[Complex<f64>]) -> TrackingResult {
		match self.state {
			TrackingState::Idle     => self.process_idle(input),
			TrackingState::PullIn   => self.process_pull_in(input),
			TrackingState::Tracking => self.process_tracking(input),
		}
	}

	fn process_idle(&mut self, input:&[Complex<f64>]) -> TrackingResult {
		let n = self.current_prn_length_samples;
		if input.len() < n { return TrackingResult::NotReady; }

		self.sample_counter += n as u64;
		self.write_dump(ZERO, ZERO, ZERO, 0.0, 0.0, 0.0);

		TrackingResult::Ready{ consumed: n, synchro: GnssSynchro::invalid('G', 0, 0.0) }
	}

	fn process_pull_in(&mut self, input:&[Complex<f64>]) -> TrackingResult {
		let n = self.current_prn_length_samples as f64;
		let acq_to_trk_delay_samples = (self.sample_counter as i64 - self.acq_sample_stamp as i64) as f64;
		let acq_trk_shif_correction_samples = n - (acq_to_trk_delay_samples % n);
		let samples_offset = (self.acq_code_phase_samples + acq_trk_shif_correction_samples).round() as usize;
		if input.len() < samples_offset { return TrackingResult::NotReady; }

		self.sample_counter += samples_offset as u64;
		self.code_phase_chips = 0.0;
		self.rem_code_phase_samples = 0.0;
		self.state = TrackingState::Tracking;

		// The acquisition estimates go out as the first record of this channel
		let mut synchro = GnssSynchro::invalid(self.system, self.prn, 0.0);
		synchro.carrier_doppler_hz = self.carrier_doppler_hz;

		TrackingResult::Ready{ consumed: samples_offset, synchro }
	}

	fn process_tracking(&mut self, input:&[Complex<f64>]) -> TrackingResult {
		let n = self.current_prn_length_samples;
		if input.len() < n { return TrackingResult::NotReady; }

		// Local code and carrier replicas for this block, using the rate
		// estimates from the previous block
		let code_phase_step_chips = self.code_freq_chips / self.fs_in;
		let rem_code_phase_chips = self.rem_code_phase_samples * code_phase_step_chips;
		correlator::update_local_code(&self.ca_code,
			code_phase_step_chips, rem_code_phase_chips, self.early_late_space_chips,
			&mut self.early_code[..n], &mut self.prompt_code[..n], &mut self.late_code[..n]);

		let phase = Complex{ re: self.rem_carr_phase_rad.cos(), im: -self.rem_carr_phase_rad.sin() };
		let carrier_inc_rad = TWO_PI * (self.if_freq + self.carrier_doppler_hz) / self.fs_in;
		let phase_inc = Complex{ re: carrier_inc_rad.cos(), im: -carrier_inc_rad.sin() };

		let (early, prompt, late) = correlator::carrier_rotate_and_epl(&input[..n],
			phase, phase_inc, &self.early_code[..n], &self.prompt_code[..n], &self.late_code[..n]);

		// Advance the code phase integrator and recompute the residual carried
		// into the next block
		let t_blk_s = n as f64 / self.fs_in;
		self.code_phase_chips = (self.code_phase_chips + t_blk_s * self.code_freq_chips) % GPS_L1_CA_CODE_LENGTH_CHIPS;
		let mut rem_code_phase_chips = GPS_L1_CA_CODE_LENGTH_CHIPS - self.code_phase_chips;
		if rem_code_phase_chips > GPS_L1_CA_CODE_LENGTH_CHIPS / 2.0 {
			rem_code_phase_chips -= GPS_L1_CA_CODE_LENGTH_CHIPS;
		}
		self.rem_code_phase_samples = rem_code_phase_chips * self.fs_in / GPS_L1_CA_CODE_RATE_HZ;

		// Samples consistency check; corrupt input drains everything available
		// so the stream keeps moving
		if prompt.re.is_nan() || prompt.im.is_nan() {
			let samples_available = input.len();
			self.sample_counter += samples_available as u64;
			eprintln!("Channel {}: detected NaN samples at sample number {}", self.channel, self.sample_counter);
			let timestamp_s = self.sample_counter as f64 / self.fs_in;
			return TrackingResult::Ready{ consumed: samples_available,
				synchro: GnssSynchro::invalid(self.system, self.prn, timestamp_s) };
		}

		self.sample_counter += n as u64;

		// PLL: prompt phase discriminator, loop filter, new Doppler estimate,
		// carrier-aided code frequency basis
		let carr_error_hz = discriminators::pll_two_quadrant_atan(prompt) / TWO_PI;
		self.carrier_doppler_hz = self.carrier_filter.apply(carr_error_hz);
		if self.carrier_aiding {
			self.code_freq_chips = GPS_L1_CA_CODE_RATE_HZ
				+ (self.carrier_doppler_hz * GPS_L1_CA_CODE_RATE_HZ) / GPS_L1_FREQ_HZ;
		} else {
			self.code_freq_chips = GPS_L1_CA_CODE_RATE_HZ;
		}

		// Increasing measured carrier phase corresponds to decreasing range
		self.acc_carrier_phase_rad -= TWO_PI * self.carrier_doppler_hz * GPS_L1_CA_CODE_PERIOD_S;
		self.rem_carr_phase_rad = (self.rem_carr_phase_rad
			+ TWO_PI * (self.if_freq + self.carrier_doppler_hz) * GPS_L1_CA_CODE_PERIOD_S) % TWO_PI;

		// DLL
		let code_error_chips = discriminators::dll_nc_e_minus_l_normalized(early, late)
			* (1.0 - self.early_late_space_chips);
		let code_error_filt_chips = self.code_filter.apply(code_error_chips);
		self.code_freq_chips += code_error_filt_chips;

		// Next block length from the updated PRN period and the residual code
		// phase; the rounding error stays below one sample
		let t_prn_samples = (GPS_L1_CA_CODE_LENGTH_CHIPS / self.code_freq_chips) * self.fs_in;
		let k_blk_samples = t_prn_samples + self.rem_code_phase_samples;
		let next_prn_length_samples = (k_blk_samples.round().max(1.0) as usize).min(self.early_code.len());

		// C/N0 estimation and lock detection over the prompt window
		self.cn0_window[self.cn0_idx] = prompt;
		self.cn0_idx += 1;
		let mut lock_lost = false;
		if self.cn0_idx == CN0_ESTIMATION_SAMPLES {
			self.cn0_idx = 0;
			self.cn0_db_hz = lock_detectors::cn0_svn_estimator(&self.cn0_window, GPS_L1_CA_CODE_PERIOD_S);
			self.carrier_lock_test = lock_detectors::carrier_lock_detector(&self.cn0_window);
			if self.carrier_lock_test < CARRIER_LOCK_THRESHOLD || self.cn0_db_hz < MINIMUM_VALID_CN0_DB_HZ {
				self.lock_fail_count += 1;
			} else if self.lock_fail_count > 0 {
				self.lock_fail_count -= 1;
			}
			lock_lost = self.lock_fail_count > MAXIMUM_LOCK_FAIL_COUNTER;
		}

		// The timestamp is aligned with the current PRN start sample, so the
		// code phase reported alongside it is zero by construction
		let synchro = GnssSynchro {
			system: self.system,
			prn: self.prn,
			prompt_i: prompt.re,
			prompt_q: prompt.im,
			tracking_timestamp_s: (self.sample_counter as f64 + self.rem_code_phase_samples) / self.fs_in,
			code_phase_s: 0.0,
			carrier_phase_rad: self.acc_carrier_phase_rad,
			carrier_doppler_hz: self.carrier_doppler_hz,
			cn0_db_hz: self.cn0_db_hz,
			flag_valid_tracking: true,
			flag_valid_pseudorange: false,
		};

		self.write_dump(early, prompt, late, carr_error_hz, code_error_chips, code_error_filt_chips);

		// The loss-of-lock event follows the output record of the block that
		// detected it
		if lock_lost {
			eprintln!("Loss of lock in channel {}", self.channel);
			if let Some(queue) = &self.channel_queue {
				let _ = queue.send(ChannelEvent{ channel: self.channel, code: LOSS_OF_LOCK_EVENT_CODE });
			}
			self.lock_fail_count = 0;
			self.state = TrackingState::Idle;
		}

		self.current_prn_length_samples = next_prn_length_samples;

		TrackingResult::Ready{ consumed: n, synchro }
	}

	fn write_dump(&mut self, early:Complex<f64>, prompt:Complex<f64>, late:Complex<f64>,
			carr_error_hz:f64, code_error_chips:f64, code_error_filt_chips:f64) {
		if let Some(sink) = &mut self.dump_sink {
			let record = TrackingDumpRecord {
				abs_early: early.norm() as f32,
				abs_prompt: prompt.norm() as f32,
				abs_late: late.norm() as f32,
				prompt_i: prompt.re as f32,
				prompt_q: prompt.im as f32,
				sample_counter: self.sample_counter,
				acc_carrier_phase_rad: self.acc_carrier_phase_rad,
				carrier_doppler_hz: self.carrier_doppler_hz,
				code_freq_chips: self.code_freq_chips,
				carr_error_hz,
				carr_error_filt_hz: self.carrier_doppler_hz,
				code_error_chips,
				code_error_filt_chips,
				cn0_db_hz: self.cn0_db_hz,
				carrier_lock_test: self.carrier_lock_test,
				rem_code_phase_samples: self.rem_code_phase_samples,
				sample_counter_plus_block: (self.sample_counter + self.current_prn_length_samples as u64) as f64,
			};
			if let Err(e) = sink.write_record(&record) {
				eprintln!("Channel {}: error writing track dump: {}", self.channel, e);
			}
		}
	}

}

pub fn new_tracker(cfg:&TrackingConfig)
		-> Result<Tracking<SecondOrderLoopFilter, SecondOrderLoopFilter>, &'static str> {

	if !(cfg.fs_in_hz > 0.0)                   { return Err("sample rate must be positive"); }
	if cfg.vector_length == 0                  { return Err("vector length must be positive"); }
	if !(cfg.pll_bw_hz > 0.0 && cfg.dll_bw_hz > 0.0) { return Err("loop bandwidths must be positive"); }
	if !(cfg.early_late_space_chips > 0.0 && cfg.early_late_space_chips < 1.0) {
		return Err("early-late spacing must be between zero and one chip");
	}

	let carrier_filter = SecondOrderLoopFilter::pll(cfg.pll_bw_hz, GPS_L1_CA_CODE_PERIOD_S);
	let code_filter    = SecondOrderLoopFilter::dll(cfg.dll_bw_hz, GPS_L1_CA_CODE_PERIOD_S);

	Ok(Tracking {
		if_freq: cfg.if_freq_hz,
		fs_in: cfg.fs_in_hz,
		vector_length: cfg.vector_length,
		early_late_space_chips: cfg.early_late_space_chips,
		carrier_aiding: cfg.carrier_aiding,
		dump: cfg.dump,
		dump_filename: cfg.dump_filename.clone(),
		channel: 0,
		channel_queue: None,
		dump_sink: None,
		carrier_filter, code_filter,
		ca_code: vec![ZERO; signal_modulation::CODE_LENGTH_CHIPS + 2],
		early_code:  vec![ZERO; 2 * cfg.vector_length],
		prompt_code: vec![ZERO; 2 * cfg.vector_length],
		late_code:   vec![ZERO; 2 * cfg.vector_length],
		state: TrackingState::Idle,
		acq: None,
		acq_code_phase_samples: 0.0,
		acq_sample_stamp: 0,
		system: 'G',
		prn: 0,
		sample_counter: 0,
		current_prn_length_samples: cfg.vector_length,
		code_freq_chips: GPS_L1_CA_CODE_RATE_HZ,
		carrier_doppler_hz: 0.0,
		rem_code_phase_samples: 0.0,
		rem_carr_phase_rad: 0.0,
		acc_carrier_phase_rad: 0.0,
		code_phase_chips: 0.0,
		cn0_window: vec![ZERO; CN0_ESTIMATION_SAMPLES],
		cn0_idx: 0,
		cn0_db_hz: 0.0,
		carrier_lock_test: 1.0,
		lock_fail_count: 0,
	})
}
