//! Alert sound playback.
//!
//! On web this uses the Web Audio API to synthesize a short two-tone chirp,
//! with an audio-file fast path when the bundled asset is available. Playback
//! failures (autoplay policy, suspended context) are swallowed: an alert that
//! cannot sound must never break the inbox write that triggered it.

#[cfg(target_arch = "wasm32")]
mod wasm {
    use wasm_bindgen::JsCast;

    /// Play the alert chirp for a newly admitted notification.
    pub fn play_alert() {
        if try_play_audio_file() {
            return;
        }
        play_generated_tone();
    }

    /// Try to play the alert from the bundled audio asset.
    fn try_play_audio_file() -> bool {
        let Some(window) = web_sys::window() else {
            return false;
        };
        let Some(document) = window.document() else {
            return false;
        };

        // Reuse one audio element across alerts
        let audio: web_sys::HtmlAudioElement = match document
            .get_element_by_id("alert-audio")
            .and_then(|el| el.dyn_into::<web_sys::HtmlAudioElement>().ok())
        {
            Some(existing) => existing,
            None => match web_sys::HtmlAudioElement::new_with_src("/assets/sounds/alert.mp3") {
                Ok(audio) => {
                    audio.set_id("alert-audio");
                    audio.set_volume(0.4);
                    audio
                }
                Err(_) => return false,
            },
        };

        // network_state 3 = NETWORK_NO_SOURCE, the asset is not loadable
        if audio.network_state() == 3 {
            return false;
        }

        audio.set_current_time(0.0);
        audio.play().is_ok()
    }

    /// Synthesize a short rising two-tone chirp with the Web Audio API.
    fn play_generated_tone() {
        let audio_context = match web_sys::AudioContext::new() {
            Ok(ctx) => ctx,
            Err(e) => {
                crate::log_debug!("Failed to create AudioContext: {:?}", e);
                return;
            }
        };

        // Browsers suspend contexts created outside a user gesture
        if audio_context.state() == web_sys::AudioContextState::Suspended {
            let _ = audio_context.resume();
        }

        let now = audio_context.current_time();

        let gain = match audio_context.create_gain() {
            Ok(g) => g,
            Err(_) => return,
        };

        // Quick attack, short decay
        let gain_param = gain.gain();
        gain_param.set_value_at_time(0.0, now).ok();
        gain_param.linear_ramp_to_value_at_time(0.25, now + 0.01).ok();
        gain_param
            .exponential_ramp_to_value_at_time(0.01, now + 0.18)
            .ok();

        gain.connect_with_audio_node(&audio_context.destination())
            .ok();

        if let Ok(osc1) = audio_context.create_oscillator() {
            osc1.set_type(web_sys::OscillatorType::Sine);
            osc1.frequency().set_value(587.33); // D5
            osc1.connect_with_audio_node(&gain).ok();
            osc1.start_with_when(now).ok();
            osc1.stop_with_when(now + 0.09).ok();
        }

        if let Ok(osc2) = audio_context.create_oscillator() {
            osc2.set_type(web_sys::OscillatorType::Sine);
            osc2.frequency().set_value(783.99); // G5
            osc2.connect_with_audio_node(&gain).ok();
            osc2.start_with_when(now + 0.09).ok();
            osc2.stop_with_when(now + 0.18).ok();
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    /// Desktop stub. Audio playback would need something like rodio.
    pub fn play_alert() {}
}

#[cfg(target_arch = "wasm32")]
pub use wasm::play_alert;

#[cfg(not(target_arch = "wasm32"))]
pub use native::play_alert;
