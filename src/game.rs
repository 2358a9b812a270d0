use crate::background::ParallaxLayer;
use crate::browser;
use crate::engine::input::InputEvent;
use crate::engine::{self, Game, Point, Rect, Renderer, Size};
use crate::sprite::{self, player::Player, PlayerState};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::future::try_join_all;
use futures::join;
use rand::rngs::ThreadRng;
use rand::Rng;
use web_sys::HtmlImageElement;

// progression consts
const SPEED_INCREMENT: f64 = 0.0001;
const BASE_OBSTACLE_SPEED: f64 = 5.0;
const MIN_OBSTACLE_DISTANCE: i32 = 500;
const MAX_OBSTACLE_DISTANCE: i32 = 1000;

// background slices, back to front, with their per-layer scroll speeds
const BACKGROUND_LAYERS: [(&str, f64); 4] = [
    ("background/sky.png", 0.2),
    ("background/clouds.png", 0.4),
    ("background/background.png", 0.6),
    ("background/foreground.png", 0.8),
];

/// Global progression state, owned by the Director and reset wholesale on
/// restart.
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    started: bool,
    over: bool,
    speed_factor: f64,
    distance_covered: f64,
    next_obstacle_distance: f64,
}

impl GameState {
    fn new(rng: &mut impl Rng) -> Self {
        GameState {
            started: false,
            over: false,
            speed_factor: 1.0,
            distance_covered: 0.0,
            next_obstacle_distance: spawn_gap(rng),
        }
    }

    fn reset(&mut self, rng: &mut impl Rng) {
        *self = GameState::new(rng);
    }

    /// Per-tick progression: raise the global speed factor, accumulate the
    /// distance covered, and report whether an obstacle spawn is due. On a
    /// spawn the next threshold is resampled relative to the distance already
    /// covered.
    fn advance(&mut self, rng: &mut impl Rng) -> bool {
        self.speed_factor += SPEED_INCREMENT;
        self.distance_covered += BASE_OBSTACLE_SPEED * self.speed_factor;
        if self.distance_covered >= self.next_obstacle_distance {
            self.next_obstacle_distance = self.distance_covered + spawn_gap(rng);
            true
        } else {
            false
        }
    }
}

fn spawn_gap(rng: &mut impl Rng) -> f64 {
    rng.gen_range(MIN_OBSTACLE_DISTANCE..=MAX_OBSTACLE_DISTANCE) as f64
}

/// An obstacle is culled once it has fully scrolled past the left edge.
fn should_cull(bounds: &Rect) -> bool {
    bounds.right() < 0.0
}

pub struct Obstacle {
    bounds: Rect,
    image: HtmlImageElement,
}

impl Obstacle {
    fn update(&mut self, global_speed_factor: f64) {
        self.bounds.position.x -= BASE_OBSTACLE_SPEED * global_speed_factor;
    }

    fn is_off_screen(&self) -> bool {
        should_cull(&self.bounds)
    }

    fn draw(&self, renderer: &Renderer) {
        renderer.draw_image(&self.image, &self.bounds);
    }
}

/// Obstacle art loaded once at initialization; spawning clones a handle
/// instead of decoding a fresh image per obstacle.
struct ObstacleCatalog {
    images: Vec<HtmlImageElement>,
}

impl ObstacleCatalog {
    const IMAGE_COUNT: usize = 7;

    async fn load() -> Result<Self> {
        let loads = (1..=Self::IMAGE_COUNT).map(|index| {
            let source = format!("obstacles/obstacle_{}.png", index);
            async move { engine::load_image(&source).await }
        });
        let images = try_join_all(loads)
            .await
            .context("Failed to load obstacle catalog")?;
        Ok(ObstacleCatalog { images })
    }

    fn spawn(&self, rng: &mut impl Rng, viewport: Size) -> Obstacle {
        let width = rng.gen_range(50..=100) as f64;
        let height = rng.gen_range(70..=100) as f64;
        let image = self.images[rng.gen_range(0..self.images.len())].clone();
        Obstacle {
            bounds: Rect::new(
                Point {
                    x: viewport.width,
                    y: viewport.height - height,
                },
                Size { width, height },
            ),
            image,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intent {
    Start,
    Jump,
    Reset,
}

/// Context-sensitive mapping from a raw input event to what it means right
/// now: the trigger resets a finished game, starts a fresh one, and jumps
/// otherwise. The dedicated jump gesture only ever jumps.
fn resolve_intent(state: &GameState, event: InputEvent) -> Option<Intent> {
    match event {
        InputEvent::Jump if state.over => None,
        InputEvent::Jump => Some(Intent::Jump),
        InputEvent::Trigger if state.over => Some(Intent::Reset),
        InputEvent::Trigger if !state.started => Some(Intent::Start),
        InputEvent::Trigger => Some(Intent::Jump),
    }
}

pub struct World {
    state: GameState,
    player: Player,
    layers: Vec<ParallaxLayer>,
    obstacles: Vec<Obstacle>,
    catalog: ObstacleCatalog,
    rng: ThreadRng,
}

impl World {
    fn handle_input(&mut self, events: &[InputEvent], viewport: Size) {
        for event in events {
            match resolve_intent(&self.state, *event) {
                Some(Intent::Start) => self.start(viewport),
                Some(Intent::Jump) => self.player.jump(viewport),
                Some(Intent::Reset) => self.reset(viewport),
                None => {}
            }
        }
    }

    fn start(&mut self, viewport: Size) {
        self.state.started = true;
        self.player.set_state(PlayerState::Run, viewport);
    }

    fn reset(&mut self, viewport: Size) {
        self.state.reset(&mut self.rng);
        self.obstacles.clear();
        self.player.reset(viewport);
    }

    fn tick(&mut self, viewport: Size) {
        if self.state.over {
            // only the death animation advances; once it reaches its terminal
            // frame the tick is a no-op until a reset
            if !self.player.death_animation_finished() {
                self.player.animate(self.state.speed_factor);
            }
            return;
        }

        if !self.state.started {
            // idle on the start screen, backdrop frozen
            self.player.animate(self.state.speed_factor);
            return;
        }

        for layer in &mut self.layers {
            layer.update(self.state.speed_factor, viewport);
        }

        self.player.apply_physics(viewport);
        self.player.animate(self.state.speed_factor);

        if self.state.advance(&mut self.rng) {
            self.obstacles
                .push(self.catalog.spawn(&mut self.rng, viewport));
        }

        for obstacle in &mut self.obstacles {
            obstacle.update(self.state.speed_factor);
        }
        self.obstacles.retain(|obstacle| !obstacle.is_off_screen());

        let player_box = self.player.bounding_box();
        if self
            .obstacles
            .iter()
            .any(|obstacle| player_box.intersects(&obstacle.bounds))
        {
            self.state.over = true;
            self.player.set_state(PlayerState::Dead, viewport);
        }
    }

    fn draw(&self, renderer: &Renderer, viewport: Size) {
        renderer.clear(&Rect::new(Point { x: 0.0, y: 0.0 }, viewport));
        // Draw order matters : background -> player -> obstacles
        for layer in &self.layers {
            layer.draw(renderer, viewport);
        }
        self.player.draw(renderer);
        for obstacle in &self.obstacles {
            obstacle.draw(renderer);
        }
    }
}

pub enum PixelRush {
    /// Initial state while resources are being loaded
    /// Transition to `Loaded` once initialization is complete
    Loading,

    /// Active game state with all assets resolved
    Loaded(World),
}

impl PixelRush {
    pub fn new() -> Self {
        PixelRush::Loading
    }
}

impl Default for PixelRush {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl Game for PixelRush {
    async fn initialize(&self) -> Result<Box<dyn Game>> {
        match self {
            PixelRush::Loading => {
                let viewport = browser::viewport()?;
                // independent asset groups load simultaneously; a missing
                // asset fails initialization instead of stalling the game
                let (layer_images, catalog, idle_frames) = join!(
                    try_join_all(
                        BACKGROUND_LAYERS
                            .iter()
                            .map(|(source, _)| engine::load_image(source)),
                    ),
                    ObstacleCatalog::load(),
                    sprite::load_frames(PlayerState::Idle),
                );

                let layers = layer_images
                    .context("Failed to load background layers")?
                    .into_iter()
                    .zip(BACKGROUND_LAYERS.iter())
                    .map(|(image, (_, speed_factor))| ParallaxLayer::new(image, *speed_factor))
                    .collect();

                let mut rng = rand::thread_rng();
                let world = World {
                    state: GameState::new(&mut rng),
                    player: Player::new(idle_frames?, viewport),
                    layers,
                    obstacles: Vec::new(),
                    catalog: catalog?,
                    rng,
                };
                Ok(Box::new(PixelRush::Loaded(world)))
            }
            PixelRush::Loaded(_) => Err(anyhow!("Game is already initialized")),
        }
    }

    fn update(&mut self, events: &[InputEvent]) {
        if let PixelRush::Loaded(world) = self {
            let viewport = match browser::viewport() {
                Ok(viewport) => viewport,
                Err(err) => {
                    error!("Could not read viewport : {:#?}", err);
                    return;
                }
            };
            world.handle_input(events, viewport);
            world.tick(viewport);
        }
    }

    fn draw(&self, renderer: &Renderer) {
        if let PixelRush::Loaded(world) = self {
            match browser::viewport() {
                Ok(viewport) => world.draw(renderer, viewport),
                Err(err) => error!("Could not read viewport : {:#?}", err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn seeded() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn speed_factor_rises_by_exactly_the_increment() {
        let mut rng = seeded();
        let mut state = GameState::new(&mut rng);
        let mut previous = state.speed_factor;
        for _ in 0..1000 {
            state.advance(&mut rng);
            assert_relative_eq!(
                state.speed_factor,
                previous + SPEED_INCREMENT,
                epsilon = 1e-12
            );
            assert!(state.speed_factor > previous);
            previous = state.speed_factor;
        }
    }

    #[test]
    fn distance_accumulates_with_the_current_speed() {
        let mut rng = seeded();
        let mut state = GameState::new(&mut rng);
        state.advance(&mut rng);
        assert_relative_eq!(
            state.distance_covered,
            BASE_OBSTACLE_SPEED * state.speed_factor,
            epsilon = 1e-12
        );
    }

    #[test]
    fn spawn_fires_at_the_threshold_and_resamples() {
        let mut rng = seeded();
        let mut state = GameState::new(&mut rng);
        state.next_obstacle_distance = 10.0;

        assert!(!state.advance(&mut rng)); // ~5 covered, below threshold
        assert!(state.advance(&mut rng)); // ~10 covered, spawn due

        let gap = state.next_obstacle_distance - state.distance_covered;
        assert!((MIN_OBSTACLE_DISTANCE as f64..=MAX_OBSTACLE_DISTANCE as f64).contains(&gap));
    }

    #[test]
    fn no_spawn_below_the_threshold() {
        let mut rng = seeded();
        let mut state = GameState::new(&mut rng);
        let threshold = state.next_obstacle_distance;
        assert!(!state.advance(&mut rng));
        assert_relative_eq!(state.next_obstacle_distance, threshold);
    }

    #[test]
    fn reset_restores_the_initial_state() {
        let mut rng = seeded();
        let mut state = GameState::new(&mut rng);
        for _ in 0..500 {
            state.advance(&mut rng);
        }
        state.started = true;
        state.over = true;

        state.reset(&mut rng);
        assert!(!state.started);
        assert!(!state.over);
        assert_relative_eq!(state.speed_factor, 1.0);
        assert_relative_eq!(state.distance_covered, 0.0);
        let gap = state.next_obstacle_distance;
        assert!((MIN_OBSTACLE_DISTANCE as f64..=MAX_OBSTACLE_DISTANCE as f64).contains(&gap));
    }

    #[test]
    fn fully_off_screen_bounds_are_culled() {
        let size = Size {
            width: 60.0,
            height: 80.0,
        };
        let gone = Rect::new(Point { x: -61.0, y: 0.0 }, size);
        let lingering = Rect::new(Point { x: -59.0, y: 0.0 }, size);
        assert!(should_cull(&gone));
        assert!(!should_cull(&lingering));
    }

    #[test]
    fn trigger_resolves_by_game_phase() {
        let mut rng = seeded();
        let mut state = GameState::new(&mut rng);
        assert_eq!(
            resolve_intent(&state, InputEvent::Trigger),
            Some(Intent::Start)
        );

        state.started = true;
        assert_eq!(
            resolve_intent(&state, InputEvent::Trigger),
            Some(Intent::Jump)
        );

        state.over = true;
        assert_eq!(
            resolve_intent(&state, InputEvent::Trigger),
            Some(Intent::Reset)
        );
    }

    #[test]
    fn jump_gesture_is_unconditional_until_game_over() {
        let mut rng = seeded();
        let mut state = GameState::new(&mut rng);
        assert_eq!(resolve_intent(&state, InputEvent::Jump), Some(Intent::Jump));

        state.started = true;
        assert_eq!(resolve_intent(&state, InputEvent::Jump), Some(Intent::Jump));

        state.over = true;
        assert_eq!(resolve_intent(&state, InputEvent::Jump), None);
    }
}
