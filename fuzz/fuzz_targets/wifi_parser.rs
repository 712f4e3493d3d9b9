#![no_main]

use libfuzzer_sys::fuzz_target;

use alertik_relay::rule::wifi::{parse_login_attempt, MAX_FIELD_LEN};

fuzz_target!(|data: &[u8]| {
    let line = String::from_utf8_lossy(data);

    // Ok or Err, never a panic on slicing
    if let Ok(attempt) = parse_login_attempt(&line) {
        assert!(attempt.mac_address.len() <= MAX_FIELD_LEN);
        assert!(attempt.interface.len() <= MAX_FIELD_LEN);
        assert!(!attempt.interface.contains(':'));
    }
});
