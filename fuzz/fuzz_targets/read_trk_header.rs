#![no_main]
use libfuzzer_sys::fuzz_target;
use tractset::TrkHeader;

fuzz_target!(|data: &[u8]| {
    if let Ok(header) = TrkHeader::from_reader(data) {
        let _ = header.dimensions();
        let _ = header.voxel_order_str();
        let _ = header.scalar_names();
        let _ = header.property_names();
        let _ = header.voxmm_to_rasmm();
    }
});
