//! Scripted playback device for unit tests

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::error::{DeviceError, DeviceResult, EffectError};
use crate::transport::device::{DeviceEvent, PitchEffect, PlaybackDevice};

#[derive(Debug, Default)]
pub(crate) struct MockEffectState {
    pub semitones: f64,
    pub wet: f64,
    pub disposals: u32,
}

pub(crate) struct MockEffect {
    state: Rc<RefCell<MockEffectState>>,
}

impl PitchEffect for MockEffect {
    fn set_semitones(&mut self, semitones: f64) {
        self.state.borrow_mut().semitones = semitones;
    }

    fn set_wet(&mut self, wet: f64) {
        self.state.borrow_mut().wet = wet;
    }

    fn dispose(&mut self) {
        self.state.borrow_mut().disposals += 1;
    }
}

pub(crate) struct MockDevice {
    pub time: f64,
    pub rate: f64,
    pub preserves_pitch: bool,
    pub playing: bool,
    pub loaded: Option<String>,
    pub seeks: Vec<f64>,
    pub pending: VecDeque<DeviceEvent>,
    pub effect_creations: u32,
    pub direct_connections: u32,
    pub resumes: u32,
    pub fail_effect: bool,
    pub fail_play: bool,
    pub fail_resume: bool,
    pub effect: Rc<RefCell<MockEffectState>>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self {
            time: 0.0,
            rate: 1.0,
            preserves_pitch: true,
            playing: false,
            loaded: None,
            seeks: Vec::new(),
            pending: VecDeque::new(),
            effect_creations: 0,
            direct_connections: 0,
            resumes: 0,
            fail_effect: false,
            fail_play: false,
            fail_resume: false,
            effect: Rc::new(RefCell::new(MockEffectState::default())),
        }
    }

    pub fn push(&mut self, event: DeviceEvent) {
        self.pending.push_back(event);
    }

    pub fn effect_wet(&self) -> f64 {
        self.effect.borrow().wet
    }

    pub fn effect_semitones(&self) -> f64 {
        self.effect.borrow().semitones
    }

    pub fn effect_disposals(&self) -> u32 {
        self.effect.borrow().disposals
    }
}

impl PlaybackDevice for MockDevice {
    fn load(&mut self, source_url: &str) -> DeviceResult<()> {
        self.loaded = Some(source_url.to_string());
        self.time = 0.0;
        self.playing = false;
        Ok(())
    }

    fn unload(&mut self) {
        self.loaded = None;
        self.playing = false;
    }

    fn current_time(&self) -> f64 {
        self.time
    }

    fn seek(&mut self, seconds: f64) {
        self.seeks.push(seconds);
        self.time = seconds;
    }

    fn play(&mut self) -> DeviceResult<()> {
        if self.fail_play {
            return Err(DeviceError::PlaybackRejected("autoplay blocked".into()));
        }
        self.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn resume_context(&mut self) -> DeviceResult<()> {
        self.resumes += 1;
        if self.fail_resume {
            return Err(DeviceError::StreamPlay("context suspended".into()));
        }
        Ok(())
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.rate = rate;
    }

    fn set_preserves_pitch(&mut self, preserve: bool) {
        self.preserves_pitch = preserve;
    }

    fn create_pitch_effect(&mut self) -> Result<Box<dyn PitchEffect>, EffectError> {
        if self.fail_effect {
            return Err(EffectError::Unsupported("no audio graph".into()));
        }
        self.effect_creations += 1;
        Ok(Box::new(MockEffect {
            state: Rc::clone(&self.effect),
        }))
    }

    fn connect_direct(&mut self) -> DeviceResult<()> {
        self.direct_connections += 1;
        Ok(())
    }

    fn drain_events(&mut self) -> Vec<DeviceEvent> {
        self.pending.drain(..).collect()
    }
}
