#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut reader = fastinfoset::octets::OctetReader::new(data);
    let _ = fastinfoset::header::decode(&mut reader);
});
