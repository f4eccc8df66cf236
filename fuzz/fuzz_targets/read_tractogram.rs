#![no_main]
use libfuzzer_sys::fuzz_target;
use tractset::Tractogram;

fuzz_target!(|data: &[u8]| {
    let _ = Tractogram::from_reader(data);
});
