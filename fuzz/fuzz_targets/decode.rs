#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let opts = fastinfoset::DecoderOptions::default().with_octets_for_unknown_algorithms();
    let mut decoder = fastinfoset::Decoder::new(data, opts);
    while let Ok(Some(_)) = decoder.next_event() {}
    let _ = fastinfoset::fi_to_xml(data, &fastinfoset::DecoderOptions::default());
});
