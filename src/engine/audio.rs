//! Quiet synthesized feedback tones through Web Audio.

use log::{debug, warn};
use web_sys::{AudioContext, AudioContextState, GainNode, OscillatorType};

use crate::error::{AppError, Result};

pub const DEFAULT_VOLUME: f64 = 0.3;
const ENVELOPE_START: f32 = 0.5;
const ENVELOPE_END: f32 = 0.01;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sound {
    Success,
    Click,
    Error,
    Start,
    Complete,
    Tick,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wave {
    Sine,
    Triangle,
    Square,
}

impl Wave {
    fn oscillator_type(self) -> OscillatorType {
        match self {
            Wave::Sine => OscillatorType::Sine,
            Wave::Triangle => OscillatorType::Triangle,
            Wave::Square => OscillatorType::Square,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tone {
    pub frequency: f32,
    pub duration: f64,
    pub wave: Wave,
    /// Offset from the moment the sound is requested, in seconds.
    pub delay: f64,
}

const fn tone(frequency: f32, duration: f64, wave: Wave, delay: f64) -> Tone {
    Tone {
        frequency,
        duration,
        wave,
        delay,
    }
}

impl Sound {
    pub fn tones(self) -> &'static [Tone] {
        const SUCCESS: [Tone; 1] = [tone(880.0, 0.1, Wave::Sine, 0.0)];
        const CLICK: [Tone; 1] = [tone(600.0, 0.05, Wave::Sine, 0.0)];
        const ERROR: [Tone; 1] = [tone(220.0, 0.15, Wave::Triangle, 0.0)];
        const START: [Tone; 1] = [tone(440.0, 0.1, Wave::Sine, 0.0)];
        // C5 then E5
        const COMPLETE: [Tone; 2] = [
            tone(523.0, 0.1, Wave::Sine, 0.0),
            tone(659.0, 0.15, Wave::Sine, 0.1),
        ];
        const TICK: [Tone; 1] = [tone(1000.0, 0.03, Wave::Square, 0.0)];
        match self {
            Sound::Success => &SUCCESS,
            Sound::Click => &CLICK,
            Sound::Error => &ERROR,
            Sound::Start => &START,
            Sound::Complete => &COMPLETE,
            Sound::Tick => &TICK,
        }
    }
}

struct Output {
    ctx: AudioContext,
    master: GainNode,
}

impl Output {
    fn open(volume: f64) -> Result<Self> {
        let ctx = AudioContext::new().map_err(|e| AppError::Audio(format!("{:?}", e)))?;
        let master = ctx.create_gain()?;
        master.gain().set_value(volume as f32);
        master.connect_with_audio_node(&ctx.destination())?;
        Ok(Self { ctx, master })
    }

    fn schedule(&self, t: &Tone) -> Result<()> {
        let osc = self.ctx.create_oscillator()?;
        let gain = self.ctx.create_gain()?;
        osc.set_type(t.wave.oscillator_type());
        osc.frequency().set_value(t.frequency);

        let start = self.ctx.current_time() + t.delay;
        let end = start + t.duration;
        gain.gain().set_value_at_time(ENVELOPE_START, start)?;
        gain.gain().exponential_ramp_to_value_at_time(ENVELOPE_END, end)?;

        osc.connect_with_audio_node(&gain)?;
        gain.connect_with_audio_node(&self.master)?;
        osc.start_with_when(start)?;
        osc.stop_with_when(end)?;
        Ok(())
    }
}

/// Sound output, off unless the player turns it on.
pub struct GentleAudio {
    enabled: bool,
    volume: f64,
    output: Option<Output>,
    init_failed: bool,
}

impl Default for GentleAudio {
    fn default() -> Self {
        Self {
            enabled: false,
            volume: DEFAULT_VOLUME,
            output: None,
            init_failed: false,
        }
    }
}

impl GentleAudio {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_output(&mut self) -> Option<&Output> {
        if self.output.is_none() && !self.init_failed {
            match Output::open(self.volume) {
                Ok(out) => self.output = Some(out),
                Err(e) => {
                    warn!("audio disabled: {}", e);
                    self.init_failed = true;
                }
            }
        }
        self.output.as_ref()
    }

    pub fn play(&mut self, sound: Sound) {
        if !self.enabled {
            return;
        }
        let Some(out) = self.ensure_output() else {
            return;
        };
        if out.ctx.state() == AudioContextState::Suspended {
            let _ = out.ctx.resume();
        }
        for t in sound.tones() {
            if let Err(e) = out.schedule(t) {
                debug!("tone {:?} failed: {}", sound, e);
            }
        }
    }

    pub fn enable(&mut self) {
        self.enabled = true;
        self.ensure_output();
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_volume(&mut self, value: f64) {
        self.volume = value.clamp(0.0, 1.0);
        if let Some(out) = &self.output {
            out.master.gain().set_value(self.volume as f32);
        }
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn apply_from_settings(&mut self, sound_on: bool) {
        if sound_on {
            self.enable();
        } else {
            self.disable();
        }
    }

    pub fn destroy(&mut self) {
        if let Some(out) = self.output.take() {
            let _ = out.ctx.close();
        }
        self.init_failed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets() {
        assert_eq!(Sound::Success.tones()[0].frequency, 880.0);
        assert_eq!(Sound::Error.tones()[0].wave, Wave::Triangle);
        assert_eq!(Sound::Tick.tones()[0].wave, Wave::Square);

        let complete = Sound::Complete.tones();
        assert_eq!(complete.len(), 2);
        assert_eq!(complete[1].frequency, 659.0);
        assert_eq!(complete[1].delay, 0.1);
    }

    #[test]
    fn starts_silent_and_clamps_volume() {
        let mut audio = GentleAudio::new();
        assert!(!audio.is_enabled());
        assert_eq!(audio.volume(), DEFAULT_VOLUME);
        // no output is opened while disabled
        audio.play(Sound::Click);
        audio.set_volume(3.0);
        assert_eq!(audio.volume(), 1.0);
        audio.set_volume(-1.0);
        assert_eq!(audio.volume(), 0.0);
        audio.disable();
        assert!(!audio.is_enabled());
    }
}
