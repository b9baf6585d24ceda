#![no_main]
use libfuzzer_sys::fuzz_target;
use voicegate::config::VoiceConfig;
use voicegate::fulfillment::optimize_for_voice;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let config = VoiceConfig {
            max_response_chars: 64,
            ..VoiceConfig::default()
        };
        let out = optimize_for_voice(text, &config);
        assert!(out.chars().count() <= 64 + 3);
    }
});
