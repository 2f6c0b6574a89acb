#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(xml) = std::str::from_utf8(data) {
        if let Ok(events) = fastinfoset::parse_str(xml) {
            let opts = fastinfoset::EncoderOptions::default();
            if let Ok(fi) = fastinfoset::encoder::encode(&events, &opts) {
                let decoded = fastinfoset::decode(&fi).expect("encoder output must decode");
                assert_eq!(decoded, events);
            }
        }
    }
});
