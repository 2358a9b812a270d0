use super::{PlayerState, FRAME_STEP};
use crate::browser;
use crate::engine::{Point, Rect, Renderer, Size};
use std::cell::RefCell;
use std::rc::Rc;
use web_sys::HtmlImageElement;

// physics consts
const GRAVITY: f64 = 1.3;
const JUMP_VELOCITY: f64 = -35.0; // negative because top left is origin
const SCALE: f64 = 2.0;
const SPAWN_X: f64 = 150.0;

/// Fractional cursor into an ordered frame sequence, truncated for display.
/// Looping cursors wrap to 0 at the frame count; a terminal cursor clamps at
/// the last frame and never advances past it.
#[derive(Debug, Clone, Copy)]
pub struct FrameCursor {
    index: f64,
    frame_count: usize,
    hold_last: bool,
}

impl FrameCursor {
    pub fn new(state: PlayerState) -> Self {
        FrameCursor {
            index: 0.0,
            frame_count: state.frame_count(),
            hold_last: state.is_terminal(),
        }
    }

    pub fn advance(&mut self, step: f64) {
        if self.finished() {
            return;
        }
        self.index += step;
        if self.index >= self.frame_count as f64 {
            self.index = if self.hold_last {
                (self.frame_count - 1) as f64
            } else {
                0.0
            };
        }
    }

    pub fn display_frame(&self) -> usize {
        (self.index as usize).min(self.frame_count - 1)
    }

    pub fn finished(&self) -> bool {
        self.hold_last && self.index >= (self.frame_count - 1) as f64
    }
}

/// Vertical physics state, resolved against the ground line every tick.
#[derive(Debug, Clone, Copy)]
pub struct Body {
    pub position: Point,
    pub velocity: f64,
    pub size: Size,
}

impl Body {
    pub fn apply_gravity(&mut self, ground: f64) {
        self.velocity += GRAVITY;
        self.position.y += self.velocity;
        if self.position.y + self.size.height > ground {
            self.position.y = ground - self.size.height;
            self.velocity = 0.0;
        }
    }

    pub fn on_ground(&self, ground: f64) -> bool {
        self.position.y + self.size.height >= ground
    }
}

/// Frame images for the current state, tagged with the generation of the
/// `set_state` request that asked for them. A completing load whose generation
/// no longer matches is stale and gets dropped.
struct FrameSlot {
    generation: u32,
    frames: Option<Vec<HtmlImageElement>>,
}

pub struct Player {
    body: Body,
    state: PlayerState,
    cursor: FrameCursor,
    slot: Rc<RefCell<FrameSlot>>,
}

impl Player {
    /// The initial idle frame set is loaded by the caller before construction
    /// so a missing asset fails game initialization instead of leaving the
    /// player invisible forever.
    pub fn new(idle_frames: Vec<HtmlImageElement>, viewport: Size) -> Self {
        let size = scaled_size(PlayerState::Idle);
        Player {
            body: Body {
                position: Point {
                    x: SPAWN_X,
                    y: viewport.height - size.height,
                },
                velocity: 0.0,
                size,
            },
            state: PlayerState::Idle,
            cursor: FrameCursor::new(PlayerState::Idle),
            slot: Rc::new(RefCell::new(FrameSlot {
                generation: 0,
                frames: Some(idle_frames),
            })),
        }
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    /// Swap behavioral state. Size and ground position update synchronously;
    /// the new frame set arrives asynchronously and `draw` stays a no-op until
    /// it does.
    pub fn set_state(&mut self, state: PlayerState, viewport: Size) {
        self.state = state;
        self.body.size = scaled_size(state);
        // keep the feet on the ground line across sprite size changes
        self.body.position.y = viewport.height - self.body.size.height;
        self.cursor = FrameCursor::new(state);

        let generation = {
            let mut slot = self.slot.borrow_mut();
            slot.generation += 1;
            slot.frames = None;
            slot.generation
        };
        let slot = Rc::clone(&self.slot);
        browser::spawn_local(async move {
            match super::load_frames(state).await {
                Ok(frames) => {
                    let mut slot = slot.borrow_mut();
                    if slot.generation == generation {
                        slot.frames = Some(frames);
                    } else {
                        log!(
                            "Ignoring stale '{}' frame set (generation {})",
                            state.name(),
                            generation
                        );
                    }
                }
                Err(err) => error!("{:#?}", err),
            }
        });
    }

    pub fn apply_physics(&mut self, viewport: Size) {
        self.body.apply_gravity(viewport.height);
    }

    pub fn animate(&mut self, speed_factor: f64) {
        self.cursor.advance(FRAME_STEP * speed_factor);
    }

    /// Only effective with feet on the ground line. Jumping out of idle also
    /// starts the run animation.
    pub fn jump(&mut self, viewport: Size) {
        if self.body.on_ground(viewport.height) {
            self.body.velocity = JUMP_VELOCITY;
            if self.state == PlayerState::Idle {
                self.set_state(PlayerState::Run, viewport);
            }
        }
    }

    pub fn reset(&mut self, viewport: Size) {
        self.body.velocity = 0.0;
        self.body.position.x = SPAWN_X;
        self.set_state(PlayerState::Idle, viewport);
    }

    pub fn bounding_box(&self) -> Rect {
        Rect::new(self.body.position, self.body.size)
    }

    pub fn death_animation_finished(&self) -> bool {
        self.state.is_terminal() && self.cursor.finished()
    }

    pub fn draw(&self, renderer: &Renderer) {
        let slot = self.slot.borrow();
        // frames for the current state may still be in flight
        if let Some(frames) = slot.frames.as_ref() {
            let image = &frames[self.cursor.display_frame()];
            renderer.draw_sprite(
                image,
                &Rect::new(Point { x: 0.0, y: 0.0 }, self.state.sprite_size()),
                &self.bounding_box(),
            );
        }
    }
}

fn scaled_size(state: PlayerState) -> Size {
    let base = state.sprite_size();
    Size {
        width: base.width * SCALE,
        height: base.height * SCALE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn looping_cursor_wraps_to_first_frame() {
        let mut cursor = FrameCursor::new(PlayerState::Run);
        for _ in 0..61 {
            // 61 * 0.13 = 7.93, one step short of the 8-frame count
            cursor.advance(0.13);
        }
        assert_eq!(cursor.display_frame(), 7);
        cursor.advance(0.13);
        assert_eq!(cursor.display_frame(), 0);
    }

    #[test]
    fn terminal_cursor_holds_the_last_frame() {
        let mut cursor = FrameCursor::new(PlayerState::Dead);
        for _ in 0..100 {
            cursor.advance(0.13);
        }
        assert!(cursor.finished());
        assert_eq!(cursor.display_frame(), 4);

        let held = cursor.index;
        cursor.advance(0.13);
        assert_relative_eq!(cursor.index, held);
    }

    #[test]
    fn display_frame_truncates_the_fractional_index() {
        let mut cursor = FrameCursor::new(PlayerState::Idle);
        cursor.advance(2.9);
        assert_eq!(cursor.display_frame(), 2);
    }

    #[test]
    fn gravity_pulls_the_body_down() {
        let mut body = Body {
            position: Point { x: 150.0, y: 100.0 },
            velocity: 0.0,
            size: Size {
                width: 96.0,
                height: 136.0,
            },
        };
        body.apply_gravity(600.0);
        assert_relative_eq!(body.velocity, GRAVITY);
        assert_relative_eq!(body.position.y, 100.0 + GRAVITY);
        assert!(!body.on_ground(600.0));
    }

    #[test]
    fn ground_clamp_stops_the_fall() {
        let mut body = Body {
            position: Point { x: 150.0, y: 460.0 },
            velocity: 10.0,
            size: Size {
                width: 96.0,
                height: 136.0,
            },
        };
        body.apply_gravity(600.0);
        assert_relative_eq!(body.position.y, 600.0 - 136.0);
        assert_relative_eq!(body.velocity, 0.0);
        assert!(body.on_ground(600.0));
    }

    #[test]
    fn grounded_body_stays_exactly_on_the_ground() {
        let mut body = Body {
            position: Point { x: 150.0, y: 464.0 },
            velocity: 0.0,
            size: Size {
                width: 96.0,
                height: 136.0,
            },
        };
        for _ in 0..10 {
            body.apply_gravity(600.0);
            assert_relative_eq!(body.position.y + body.size.height, 600.0);
        }
    }

    #[test]
    fn state_size_scales_the_base_sprite() {
        let size = scaled_size(PlayerState::Idle);
        assert_relative_eq!(size.width, 106.0);
        assert_relative_eq!(size.height, 140.0);
    }
}
