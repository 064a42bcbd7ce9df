//! Keyboard events as the switcher sees them, and how they turn into commands.

use std::rc::Rc;

use crate::common::hotkey::{Hotkey, KeyCode, Modifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    KeyDown { key: KeyCode, modifiers: Modifiers, is_repeat: bool },
    FlagsChanged { modifiers: Modifiers },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    PassThrough,
    Consume,
}

pub type InputHandler = Box<dyn FnMut(&InputEvent) -> Disposition>;

/// A system-level event hook. Installed with `start`, removed with `stop`.
pub trait InputSource {
    /// Returns false if the hook could not be installed.
    fn start(&self, handler: InputHandler) -> bool;
    fn stop(&self);
    fn is_running(&self) -> bool;
}

pub type InputSourceRef = Rc<dyn InputSource>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ShowOrNext,
    Next,
    Previous,
    NextPage,
    PreviousPage,
    Commit,
    Cancel,
    MinimizeFrontmost,
}

pub type CommandSink = Rc<dyn Fn(Command)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interpreter {
    pub trigger: Hotkey,
    pub minimize: Hotkey,
}

impl Interpreter {
    pub fn new(trigger: Hotkey, minimize: Hotkey) -> Self { Self { trigger, minimize } }

    fn is_trigger(&self, key: KeyCode, modifiers: Modifiers) -> bool {
        self.trigger.matches(key, modifiers) || self.is_reverse_trigger(key, modifiers)
    }

    fn is_reverse_trigger(&self, key: KeyCode, modifiers: Modifiers) -> bool {
        !self.trigger.modifiers.contains(Modifiers::SHIFT)
            && self.trigger.matches(key, modifiers - Modifiers::SHIFT)
            && modifiers.contains(Modifiers::SHIFT)
    }

    /// Interprets an event seen by the always-on listener.
    pub fn global(&self, event: &InputEvent, showing: bool) -> (Option<Command>, Disposition) {
        match *event {
            InputEvent::KeyDown { key, modifiers, .. } => {
                if self.trigger.matches(key, modifiers) {
                    (Some(Command::ShowOrNext), Disposition::Consume)
                } else if showing && self.is_reverse_trigger(key, modifiers) {
                    (Some(Command::Previous), Disposition::Consume)
                } else if !showing && self.minimize.matches(key, modifiers) {
                    (Some(Command::MinimizeFrontmost), Disposition::Consume)
                } else {
                    (None, Disposition::PassThrough)
                }
            }
            InputEvent::FlagsChanged { modifiers } => {
                if showing && !self.trigger.modifiers_held(modifiers) {
                    (Some(Command::Commit), Disposition::PassThrough)
                } else {
                    (None, Disposition::PassThrough)
                }
            }
        }
    }

    /// Interprets an event seen by the capture installed while the overlay is up.
    pub fn session(&self, event: &InputEvent) -> (Option<Command>, Disposition) {
        let InputEvent::KeyDown { key, modifiers, .. } = *event else {
            return (None, Disposition::PassThrough);
        };
        if self.is_trigger(key, modifiers) {
            return (None, Disposition::PassThrough);
        }
        let command = match key {
            KeyCode::Escape => Some(Command::Cancel),
            KeyCode::Enter | KeyCode::NumpadEnter => Some(Command::Commit),
            KeyCode::ArrowRight => Some(Command::Next),
            KeyCode::ArrowLeft => Some(Command::Previous),
            KeyCode::ArrowDown => Some(Command::NextPage),
            KeyCode::ArrowUp => Some(Command::PreviousPage),
            _ => None,
        };
        (command, Disposition::Consume)
    }
}
