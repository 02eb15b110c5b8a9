use crate::oscillator::{note_to_frequency, Oscillator, WaveShape};
use simplelog::info;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Amplitude change for one `+a`/`-a` step.
pub const AMPLITUDE_STEP: f64 = 0.05;
/// Duty cycle change for one `+d`/`-d` step.
pub const DUTY_STEP: f64 = 0.05;

/// Which voice a command is meant for. The input side resolves this (modifier keys, UI
/// focus, ...) before the command reaches the synthesizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelSelector {
    Left,
    Right,
    Both,
}

impl ChannelSelector {
    pub fn includes_left(&self) -> bool {
        matches!(self, Self::Left | Self::Both)
    }

    pub fn includes_right(&self) -> bool {
        matches!(self, Self::Right | Self::Both)
    }
}

impl fmt::Display for ChannelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Both => "both",
        })
    }
}

/// Discrete parameter changes issued by the input side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Adds `delta` to the amplitude, clamped to [0, 1].
    ChangeAmplitude { target: ChannelSelector, delta: f64 },
    /// Moves the note by `semitones`. The frequency follows the note.
    ShiftNote { target: ChannelSelector, semitones: i32 },
    /// Switches to the next wave shape.
    CycleWave { target: ChannelSelector },
    /// Adds `delta` to the duty cycle, clamped to [0, 1].
    ChangeDutyCycle { target: ChannelSelector, delta: f64 },
    /// Starts or pauses the output device.
    TogglePlayback,
}

impl Command {
    pub fn target(&self) -> Option<ChannelSelector> {
        match self {
            Self::ChangeAmplitude { target, .. }
            | Self::ShiftNote { target, .. }
            | Self::CycleWave { target }
            | Self::ChangeDutyCycle { target, .. } => Some(*target),
            Self::TogglePlayback => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unrecognized command '{0}'")]
pub struct ParseCommandError(String);

/// Compact text form used by the terminal host.
///
/// * `p` toggles playback.
/// * Otherwise three characters: target (`l`, `r`, `b`), direction (`+`, `-`) and parameter
///   (`a` amplitude, `n` note, `d` duty cycle, `w` wave). The direction is ignored for `w`.
///
/// ```rust
/// use dual_scope::control::{ChannelSelector, Command};
///
/// let command: Command = "r-n".parse().unwrap();
/// assert_eq!(
///     command,
///     Command::ShiftNote { target: ChannelSelector::Right, semitones: -1 }
/// );
/// ```
impl FromStr for Command {
    type Err = ParseCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim().to_ascii_lowercase();
        let error = || ParseCommandError(s.trim().to_string());

        if text == "p" {
            return Ok(Self::TogglePlayback);
        }

        let chars: Vec<char> = text.chars().collect();
        let &[target, direction, parameter] = chars.as_slice() else {
            return Err(error());
        };

        let target = match target {
            'l' => ChannelSelector::Left,
            'r' => ChannelSelector::Right,
            'b' => ChannelSelector::Both,
            _ => return Err(error()),
        };

        let sign = match direction {
            '+' => 1,
            '-' => -1,
            '~' if parameter == 'w' => 1,
            _ => return Err(error()),
        };

        match parameter {
            'a' => Ok(Self::ChangeAmplitude {
                target,
                delta: sign as f64 * AMPLITUDE_STEP,
            }),
            'n' => Ok(Self::ShiftNote {
                target,
                semitones: sign,
            }),
            'd' => Ok(Self::ChangeDutyCycle {
                target,
                delta: sign as f64 * DUTY_STEP,
            }),
            'w' => Ok(Self::CycleWave { target }),
            _ => Err(error()),
        }
    }
}

/// One channel: its oscillator and the note that drives its frequency.
pub struct Voice {
    oscillator: Oscillator,
    note: i32,
}

impl Voice {
    /// Wraps `oscillator` and tunes it to `note`.
    pub fn new(mut oscillator: Oscillator, note: i32) -> Self {
        oscillator.set_frequency(note_to_frequency(note));
        Self { oscillator, note }
    }

    pub fn oscillator(&self) -> &Oscillator {
        &self.oscillator
    }

    pub fn oscillator_mut(&mut self) -> &mut Oscillator {
        &mut self.oscillator
    }

    pub fn get_note(&self) -> i32 {
        self.note
    }

    /// Applies a voice-level command. Playback commands are ignored here.
    pub fn apply(&mut self, command: &Command) {
        let name = self.oscillator.get_name().to_string();
        match *command {
            Command::ChangeAmplitude { delta, .. } => {
                let amplitude = (self.oscillator.get_amplitude() + delta).clamp(0.0, 1.0);
                self.oscillator.set_amplitude(amplitude);
                info!("<b>{}</> amplitude: <cyan>{:.2}</>", name, amplitude);
            }
            Command::ShiftNote { semitones, .. } => {
                self.note += semitones;
                let frequency = note_to_frequency(self.note);
                self.oscillator.set_frequency(frequency);
                info!(
                    "<b>{}</> note: <cyan>{}</> ({:.2} Hz)",
                    name, self.note, frequency
                );
            }
            Command::CycleWave { .. } => {
                let wave: WaveShape = self.oscillator.next_wave();
                info!("<b>{}</> wave: <cyan>{}</>", name, wave);
            }
            Command::ChangeDutyCycle { delta, .. } => {
                let duty = (self.oscillator.get_duty_cycle() + delta).clamp(0.0, 1.0);
                self.oscillator.set_duty_cycle(duty);
                info!("<b>{}</> duty cycle: <cyan>{:.2}</>", name, duty);
            }
            Command::TogglePlayback => {}
        }
    }
}

/// Sends a command to the voices its target selects.
pub fn route(command: &Command, left: &mut Voice, right: &mut Voice) {
    if let Some(target) = command.target() {
        if target.includes_left() {
            left.apply(command);
        }
        if target.includes_right() {
            right.apply(command);
        }
    }
}
