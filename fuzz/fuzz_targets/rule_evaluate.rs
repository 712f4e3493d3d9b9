#![no_main]

use std::time::SystemTime;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use alertik_core::config::{
    DynamicEventConfig, EventsConfig, MatchType, NotifierKind, StaticEventConfig,
};
use alertik_core::LogEvent;
use alertik_relay::RuleTable;

/// Structured input: one dynamic rule plus a datagram
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    regex: bool,
    with_wifi: bool,
    match_str: String,
    mask_msg: String,
    datagram: Vec<u8>,
}

fuzz_target!(|input: FuzzInput| {
    let events = EventsConfig {
        static_events: if input.with_wifi {
            vec![StaticEventConfig {
                id: 0,
                notifier: NotifierKind::Telegram,
            }]
        } else {
            Vec::new()
        },
        dynamic_events: vec![DynamicEventConfig {
            match_type: if input.regex {
                MatchType::Regex
            } else {
                MatchType::Substring
            },
            match_str: input.match_str,
            notifier: NotifierKind::Slack,
            mask_msg: input.mask_msg,
        }],
    };

    // invalid regexes and empty patterns are rejected, not panics
    let Ok(table) = RuleTable::build(&events) else {
        return;
    };

    let event = LogEvent::from_datagram(&input.datagram, SystemTime::now());
    let evaluation = table.evaluate(&event);
    assert!(evaluation.dispatches.len() <= evaluation.matched);
});
