
use std::sync::mpsc;

use clap::{Arg, App};
use colored::*;

use l1_ca_dll_pll::io;
use l1_ca_dll_pll::gnss::synchro::{AcquisitionHandoff, GnssSynchro};
use l1_ca_dll_pll::gnss::gps_l1_ca::tracking::{new_tracker, TrackingConfig, TrackingResult, TrackingState};

pub fn main() -> Result<(), &'static str> {

	let matches = App::new("GPS L1 CA DLL+PLL Tracking")
		.version("0.1.0")
		.about("Tracks one L1 CA signal in baseband IQ samples, starting from externally-provided acquisition estimates")
		.arg(Arg::with_name("filename")
			.long("filename")
			.help("Input file with little-endian f32 IQ pairs")
			.required(true)
			.takes_value(true))
		.arg(Arg::with_name("sample_rate_sps")
			.short("s").long("sample_rate_sps")
			.takes_value(true))
		.arg(Arg::with_name("if_freq_hz")
			.long("if_freq_hz")
			.takes_value(true))
		.arg(Arg::with_name("prn")
			.long("prn")
			.help("Satellite PRN number, 1 through 32")
			.required(true)
			.takes_value(true))
		.arg(Arg::with_name("acq_doppler_hz")
			.long("acq_doppler_hz")
			.help("Coarse Doppler estimate from acquisition")
			.takes_value(true))
		.arg(Arg::with_name("acq_code_phase_samples")
			.long("acq_code_phase_samples")
			.help("Coarse code phase estimate from acquisition")
			.takes_value(true))
		.arg(Arg::with_name("pll_bw_hz")
			.long("pll_bw_hz")
			.takes_value(true))
		.arg(Arg::with_name("dll_bw_hz")
			.long("dll_bw_hz")
			.takes_value(true))
		.arg(Arg::with_name("dump")
			.long("dump")
			.help("Append per-block telemetry to a binary dump file"))
		.arg(Arg::with_name("dump_filename")
			.long("dump_filename")
			.takes_value(true))
		.get_matches();

	let fname = matches.value_of("filename").ok_or("No input filename")?;
	let fs:f64 = matches.value_of("sample_rate_sps").unwrap_or("4e6").parse().map_err(|_| "Unable to parse sample rate")?;
	let if_freq_hz:f64 = matches.value_of("if_freq_hz").unwrap_or("0").parse().map_err(|_| "Unable to parse IF")?;
	let prn:u8 = matches.value_of("prn").ok_or("No PRN")?.parse().map_err(|_| "Unable to parse PRN")?;
	let acq_doppler_hz:f64 = matches.value_of("acq_doppler_hz").unwrap_or("0").parse().map_err(|_| "Unable to parse Doppler")?;
	let acq_code_phase_samples:f64 = matches.value_of("acq_code_phase_samples").unwrap_or("0").parse().map_err(|_| "Unable to parse code phase")?;
	let pll_bw_hz:f64 = matches.value_of("pll_bw_hz").unwrap_or("50").parse().map_err(|_| "Unable to parse PLL bandwidth")?;
	let dll_bw_hz:f64 = matches.value_of("dll_bw_hz").unwrap_or("2").parse().map_err(|_| "Unable to parse DLL bandwidth")?;

	let cfg = TrackingConfig {
		if_freq_hz,
		fs_in_hz: fs,
		vector_length: (fs * 1.0e-3).round() as usize,
		pll_bw_hz,
		dll_bw_hz,
		dump: matches.is_present("dump"),
		dump_filename: matches.value_of("dump_filename").unwrap_or("trk_ch_").to_string(),
		..TrackingConfig::default()
	};

	eprintln!("Decoding {} at {} [samples/sec]", &fname, &fs);

	let mut trk = new_tracker(&cfg)?;
	let (tx, rx) = mpsc::channel();
	trk.set_channel_queue(tx);
	trk.set_channel(0);
	trk.set_acquisition(AcquisitionHandoff{ system: 'G', prn,
		code_phase_samples: acq_code_phase_samples, doppler_hz: acq_doppler_hz, sample_stamp: 0 });
	trk.start().map_err(|_| "Unable to start tracking")?;

	let mut src = io::file_source_f32_complex(&fname)?;
	let mut buffer = vec![];
	let mut all_records:Vec<GnssSynchro> = vec![];
	let mut last_seg:u64 = 0;

	'outer: loop {
		while buffer.len() < trk.samples_needed() {
			match src.next() {
				Some((sample, _)) => buffer.push(sample),
				None => break,
			}
		}

		match trk.process(&buffer) {
			TrackingResult::Ready{ consumed, synchro } => {
				buffer.drain(..consumed);
				all_records.push(synchro);
			},
			// The source is dry and what's left is less than one block
			TrackingResult::NotReady => break 'outer,
		}

		let seg = trk.sample_counter() / fs as u64;
		if seg != last_seg {
			last_seg = seg;
			let s = format!("{:4} [sec]: PRN {:02}, {:8.1} [Hz] doppler, {:5.1} [dB-Hz] C/N0",
				seg, prn, trk.carrier_doppler_hz(), trk.cn0_db_hz());
			if      trk.cn0_db_hz() > 40.0 { eprintln!("{}", s.green());  }
			else if trk.cn0_db_hz() > 30.0 { eprintln!("{}", s.yellow()); }
			else                           { eprintln!("{}", s.red());    }
		}

		if let Ok(event) = rx.try_recv() {
			eprintln!("{}", format!("Channel {} lost lock (code {})", event.channel, event.code).red());
			break 'outer;
		}

		if trk.state() == TrackingState::Idle { break 'outer; }
	}

	// Output data in JSON format
	println!("{}", serde_json::to_string_pretty(&all_records).map_err(|_| "Unable to serialize records")?);

	Ok(())

}
