
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use num_complex::Complex;

/// Streams little-endian f32 IQ pairs from a file as complex samples paired
/// with their absolute sample index
pub struct FileSourceLEf32Complex {
	f: BufReader<File>,
	idx: usize,
}

pub fn file_source_f32_complex(filename:&str) -> Result<FileSourceLEf32Complex, &'static str> {
	let f = File::open(filename).map_err(|_| "Unable to open source file")?;
	Ok(FileSourceLEf32Complex{ f: BufReader::new(f), idx: 0 })
}

impl Iterator for FileSourceLEf32Complex {
	type Item = (Complex<f64>, usize);

	fn next(&mut self) -> Option<(Complex<f64>, usize)> {
		match (self.f.read_f32::<LittleEndian>(), self.f.read_f32::<LittleEndian>()) {
			(Ok(re), Ok(im)) => {
				let i = self.idx;
				self.idx += 1;
				Some((Complex{ re: re as f64, im: im as f64 }, i))
			},
			(_, _) => None,
		}
	}
}

/// One per-block telemetry record appended to the track dump when enabled.
/// The filtered carrier error is the Doppler estimate itself, so the Doppler
/// appears twice in the serialized layout; the duplication is kept for
/// compatibility with existing dump readers.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingDumpRecord {
	pub abs_early: f32,
	pub abs_prompt: f32,
	pub abs_late: f32,
	pub prompt_i: f32,
	pub prompt_q: f32,
	pub sample_counter: u64,
	pub acc_carrier_phase_rad: f64,
	pub carrier_doppler_hz: f64,
	pub code_freq_chips: f64,
	pub carr_error_hz: f64,
	pub carr_error_filt_hz: f64,
	pub code_error_chips: f64,
	pub code_error_filt_chips: f64,
	pub cn0_db_hz: f64,
	pub carrier_lock_test: f64,
	pub rem_code_phase_samples: f64,
	pub sample_counter_plus_block: f64,
}

/// Serialized size of one dump record: five f32, one u64, eleven f64
pub const DUMP_RECORD_SIZE_BYTES:usize = 5 * 4 + 8 + 11 * 8;

fn write_record_le<W: Write>(w:&mut W, record:&TrackingDumpRecord) -> std::io::Result<()> {
	w.write_f32::<LittleEndian>(record.abs_early)?;
	w.write_f32::<LittleEndian>(record.abs_prompt)?;
	w.write_f32::<LittleEndian>(record.abs_late)?;
	w.write_f32::<LittleEndian>(record.prompt_i)?;
	w.write_f32::<LittleEndian>(record.prompt_q)?;
	w.write_u64::<LittleEndian>(record.sample_counter)?;
	w.write_f64::<LittleEndian>(record.acc_carrier_phase_rad)?;
	w.write_f64::<LittleEndian>(record.carrier_doppler_hz)?;
	w.write_f64::<LittleEndian>(record.code_freq_chips)?;
	w.write_f64::<LittleEndian>(record.carr_error_hz)?;
	w.write_f64::<LittleEndian>(record.carr_error_filt_hz)?;
	w.write_f64::<LittleEndian>(record.code_error_chips)?;
	w.write_f64::<LittleEndian>(record.code_error_filt_chips)?;
	w.write_f64::<LittleEndian>(record.cn0_db_hz)?;
	w.write_f64::<LittleEndian>(record.carrier_lock_test)?;
	w.write_f64::<LittleEndian>(record.rem_code_phase_samples)?;
	w.write_f64::<LittleEndian>(record.sample_counter_plus_block)?;
	Ok(())
}

pub trait TrackingDumpSink {
	fn write_record(&mut self, record:&TrackingDumpRecord) -> Result<(), &'static str>;
}

/// Binary little-endian file sink with the fixed record layout above
pub struct FileDumpSink {
	w: BufWriter<File>,
}

impl FileDumpSink {

	pub fn new(filename:&str) -> Result<Self, &'static str> {
		let f = File::create(filename).map_err(|_| "Unable to create track dump file")?;
		Ok(Self{ w: BufWriter::new(f) })
	}

}

impl TrackingDumpSink for FileDumpSink {

	fn write_record(&mut self, record:&TrackingDumpRecord) -> Result<(), &'static str> {
		write_record_le(&mut self.w, record).map_err(|_| "Unable to write to track dump file")
	}

}

#[cfg(test)]
mod tests {

	use byteorder::{LittleEndian, ReadBytesExt};
	use super::*;

	#[test]
	fn dump_record_layout_is_stable() {
		let record = TrackingDumpRecord {
			abs_early: 1.5, abs_prompt: 2.5, abs_late: 3.5,
			prompt_i: -2.5, prompt_q: 0.25,
			sample_counter: 123_456_789,
			acc_carrier_phase_rad: -6.28,
			carrier_doppler_hz: 2500.0,
			code_freq_chips: 1.023e6,
			carr_error_hz: 0.01,
			carr_error_filt_hz: 2500.0,
			code_error_chips: -0.002,
			code_error_filt_chips: 0.001,
			cn0_db_hz: 44.0,
			carrier_lock_test: 0.99,
			rem_code_phase_samples: 0.4,
			sample_counter_plus_block: 123_460_789.0,
		};

		let mut buf:Vec<u8> = vec![];
		write_record_le(&mut buf, &record).unwrap();
		assert_eq!(buf.len(), DUMP_RECORD_SIZE_BYTES);

		let mut r = &buf[..];
		assert_eq!(r.read_f32::<LittleEndian>().unwrap(), 1.5);
		assert_eq!(r.read_f32::<LittleEndian>().unwrap(), 2.5);
		assert_eq!(r.read_f32::<LittleEndian>().unwrap(), 3.5);
		assert_eq!(r.read_f32::<LittleEndian>().unwrap(), -2.5);
		assert_eq!(r.read_f32::<LittleEndian>().unwrap(), 0.25);
		assert_eq!(r.read_u64::<LittleEndian>().unwrap(), 123_456_789);
		assert_eq!(r.read_f64::<LittleEndian>().unwrap(), -6.28);
		assert_eq!(r.read_f64::<LittleEndian>().unwrap(), 2500.0);

		// The Doppler shows up a second time in the PLL command slot
		let mut r2 = &buf[5 * 4 + 8 + 3 * 8..];
		assert_eq!(r2.read_f64::<LittleEndian>().unwrap(), 0.01);
		assert_eq!(r2.read_f64::<LittleEndian>().unwrap(), 2500.0);
	}

}
