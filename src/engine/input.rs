use crate::browser;
use anyhow::Result;
use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use std::cell::Cell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use web_sys::{KeyboardEvent, TouchEvent};

/// Raw inputs already folded down to the two shapes the Director cares about.
///
/// `Trigger` is the context-sensitive press (Space / W / a tap): the Director
/// resolves it to Reset, Start or Jump depending on game phase. `Jump` is the
/// unconditional jump gesture (ArrowUp / an upward swipe).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Trigger,
    Jump,
}

pub struct Input {
    receiver: UnboundedReceiver<InputEvent>,
}

impl Input {
    /// Take every event that arrived since the last frame.
    pub fn drain(&mut self) -> Vec<InputEvent> {
        let mut events = Vec::new();
        while let Ok(Some(event)) = self.receiver.try_next() {
            events.push(event);
        }
        events
    }
}

/// Wire keyboard and touch listeners into an event queue drained once per
/// frame. The closures are forgotten; they live for the whole session.
pub fn prepare_input() -> Result<Input> {
    let (sender, receiver) = unbounded();

    attach_keyboard(sender.clone())?;
    attach_touch(sender)?;

    Ok(Input { receiver })
}

fn attach_keyboard(sender: UnboundedSender<InputEvent>) -> Result<()> {
    let onkeydown = browser::closure_wrap(Box::new(move |event: KeyboardEvent| {
        let intent = match event.code().as_str() {
            "ArrowUp" => Some(InputEvent::Jump),
            "Space" | "KeyW" => Some(InputEvent::Trigger),
            _ => None,
        };
        if let Some(intent) = intent {
            let _ = sender.unbounded_send(intent);
        }
    }) as Box<dyn FnMut(KeyboardEvent)>);

    browser::window()?.set_onkeydown(Some(onkeydown.as_ref().unchecked_ref()));
    onkeydown.forget();
    Ok(())
}

fn attach_touch(sender: UnboundedSender<InputEvent>) -> Result<()> {
    let canvas = browser::canvas()?;
    // Press Y shared between the start and end closures so a release above the
    // press point reads as an upward swipe.
    let press_y = Rc::new(Cell::new(0.0_f64));

    let start_y = press_y.clone();
    let start_sender = sender.clone();
    let ontouchstart = browser::closure_wrap(Box::new(move |event: TouchEvent| {
        if let Some(touch) = event.touches().get(0) {
            start_y.set(touch.client_y() as f64);
        }
        let _ = start_sender.unbounded_send(InputEvent::Trigger);
    }) as Box<dyn FnMut(TouchEvent)>);
    canvas.set_ontouchstart(Some(ontouchstart.as_ref().unchecked_ref()));
    ontouchstart.forget();

    let ontouchend = browser::closure_wrap(Box::new(move |event: TouchEvent| {
        if let Some(touch) = event.changed_touches().get(0) {
            if (touch.client_y() as f64) < press_y.get() {
                let _ = sender.unbounded_send(InputEvent::Jump);
            }
        }
    }) as Box<dyn FnMut(TouchEvent)>);
    canvas.set_ontouchend(Some(ontouchend.as_ref().unchecked_ref()));
    ontouchend.forget();

    Ok(())
}
