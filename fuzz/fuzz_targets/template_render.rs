#![no_main]

use std::time::SystemTime;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use alertik_relay::rule::template::render;
use alertik_relay::rule::MAX_MESSAGE_LEN;

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    template: String,
    /// capture groups (at most 99 are addressable)
    groups: Vec<String>,
}

fuzz_target!(|input: FuzzInput| {
    let groups: Vec<&str> = input.groups.iter().take(99).map(String::as_str).collect();

    let rendered = render(&input.template, &groups, SystemTime::UNIX_EPOCH);

    // output never exceeds the cap, even when truncated mid-template
    assert!(rendered.text.len() <= MAX_MESSAGE_LEN);
    if rendered.is_complete() {
        assert!(rendered.text.contains(", at: "));
    }
});
