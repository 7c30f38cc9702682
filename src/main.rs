//! Chrono-Platformer entry point
//!
//! Browser build: input listeners, level fetch, frame loop, canvas drawing
//! and HUD. Native build: a headless runner that plays a level file with a
//! fixed set of held keys and prints a summary.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;

    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::JsFuture;
    use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, KeyboardEvent, Response};

    use chrono_platformer::audio::{AudioManager, cue_for};
    use chrono_platformer::sim::{
        Aabb, GameEvent, GamePhase, GameState, InputState, KeyCode, LevelData, SpecialBlockKind,
        TileKind, tick,
    };
    use chrono_platformer::sim::level::CrumbleState;
    use chrono_platformer::{PlayerProgress, Settings, format_time};

    /// Levels shipped under `assets/levels/level{n}.json`
    const LEVEL_COUNT: u32 = 12;
    /// Longest frame delta fed to the simulation (tab switches)
    const MAX_FRAME_MS: f32 = 100.0;
    const TEST_LEVEL_KEY: &str = "testLevel";

    /// Game instance holding all state
    struct Game {
        state: GameState,
        input: InputState,
        settings: Settings,
        progress: PlayerProgress,
        audio: AudioManager,
        ctx: CanvasRenderingContext2d,
        view: (f64, f64),
        last_time: f64,
        /// Enter was held last frame
        enter_latch: bool,
        /// Run score when the current level started
        level_start_score: u64,
        /// Every level has been completed
        won: bool,
        test_level: Option<String>,
        // FPS tracking
        frame_times: [f64; 60],
        frame_index: usize,
        fps: u32,
    }

    impl Game {
        fn new(seed: u64, ctx: CanvasRenderingContext2d, view: (f64, f64)) -> Self {
            let settings = Settings::load();
            let mut state = GameState::new(seed);
            state.slow_motion_scale = settings.effective_slow_motion_scale();
            Self {
                state,
                input: InputState::new(),
                settings,
                progress: PlayerProgress::load(),
                audio: AudioManager::new(),
                ctx,
                view,
                last_time: 0.0,
                enter_latch: false,
                level_start_score: 0,
                won: false,
                test_level: None,
                frame_times: [0.0; 60],
                frame_index: 0,
                fps: 0,
            }
        }

        fn update(&mut self, dt_ms: f32, time: f64) -> Option<MenuAction> {
            tick(&mut self.state, &self.input, dt_ms.min(MAX_FRAME_MS));

            let events = std::mem::take(&mut self.state.frame_events);
            for event in &events {
                self.progress.apply_event(event);
                if let Some(cue) = cue_for(event, self.state.time_scale, &self.settings) {
                    self.audio.play(&cue);
                }
                if let GameEvent::LevelCompleted { time_ms } = event {
                    self.record_completion(*time_ms);
                }
            }
            self.state.frame_events = events;

            // Track frame times for FPS
            self.frame_times[self.frame_index] = time;
            self.frame_index = (self.frame_index + 1) % 60;
            let oldest_time = self.frame_times[self.frame_index];
            if oldest_time > 0.0 {
                let elapsed = time - oldest_time;
                if elapsed > 0.0 {
                    self.fps = (60000.0 / elapsed).round() as u32;
                }
            }

            // Enter advances menus on the press edge
            let enter = self.input.is_held(KeyCode::Enter);
            let pressed = enter && !self.enter_latch;
            self.enter_latch = enter;
            if !pressed {
                return None;
            }
            match self.state.phase {
                GamePhase::GameOver => Some(MenuAction::Restart),
                GamePhase::LevelComplete if self.won => Some(MenuAction::NewRun),
                GamePhase::LevelComplete => Some(MenuAction::NextLevel),
                GamePhase::Error => Some(MenuAction::NewRun),
                _ => None,
            }
        }

        fn record_completion(&mut self, time_ms: u64) {
            let objectives = &self.state.objectives;
            let level_score =
                self.state.score.saturating_sub(self.level_start_score) + objectives.final_score();
            let improved = self.progress.record_level_complete(
                self.state.level_index,
                time_ms,
                level_score,
                &objectives.earned_badges(),
            );
            if improved {
                log::info!(
                    "New best time on level {}: {}",
                    self.state.level_index,
                    format_time(time_ms)
                );
            }
            self.progress.save();
            if self.state.level_index + 1 >= LEVEL_COUNT || self.test_level.is_some() {
                self.won = true;
            }
        }

        /// Draw the current frame
        fn render(&self) {
            let ctx = &self.ctx;
            let (vw, vh) = self.view;
            let data = self.state.level_data();

            let sky = data
                .and_then(|d| d.background_layers.first())
                .map(|l| l.color.as_str())
                .unwrap_or("#87CEEB");
            ctx.set_fill_style_str(sky);
            ctx.fill_rect(0.0, 0.0, vw, vh);

            if data.is_none() {
                self.draw_banner("Loading...", None);
                return;
            }

            let world = &self.state.world;
            let player = &self.state.player;
            let level = &world.level;

            // Camera follows the player, clamped to the level
            let center = player.center();
            let max_x = (level.pixel_width() as f64 - vw).max(0.0);
            let max_y = (level.pixel_height() as f64 - vh).max(0.0);
            let cam_x = (center.x as f64 - vw / 2.0).clamp(0.0, max_x);
            let cam_y = (center.y as f64 - vh / 2.0).clamp(0.0, max_y);

            ctx.save();
            let _ = ctx.translate(-cam_x.round(), -cam_y.round());

            for tile in &level.tiles {
                let color = match tile.kind {
                    TileKind::Crumbling if tile.crumble != CrumbleState::Intact => "#a0522d",
                    TileKind::Crumbling => "#cd853f",
                    TileKind::Ice => "#b0e0ff",
                    TileKind::ConveyorLeft | TileKind::ConveyorRight => "#555555",
                    _ => "#4a4a4a",
                };
                fill(ctx, &tile.bounds, color);
            }

            for block in &level.special_blocks {
                let color = match &block.kind {
                    SpecialBlockKind::Spring { .. } => "#ff6b35",
                    SpecialBlockKind::Ice { .. } => "#b0e0ff",
                    SpecialBlockKind::Conveyor { .. } => "#555555",
                    SpecialBlockKind::Switch { activated: true, .. } => "#00cc66",
                    SpecialBlockKind::Switch { .. } => "#cc3333",
                    SpecialBlockKind::Teleport { .. } => "#9b59b6",
                };
                let mut bounds = block.bounds;
                let squash = block.spring_compression() * bounds.height * 0.5;
                bounds.y += squash;
                bounds.height -= squash;
                fill(ctx, &bounds, color);
            }

            for area in &level.secret_areas {
                if area.is_discovered {
                    ctx.set_global_alpha(0.25);
                    fill(ctx, &area.bounds, "#ffd700");
                    ctx.set_global_alpha(1.0);
                } else {
                    fill(ctx, &area.bounds, "#4a4a4a");
                }
            }

            for platform in &world.platforms {
                fill(ctx, &platform.bounds(), "#8b5a2b");
            }
            for block in world.falling_blocks.values() {
                let mut bounds = block.bounds();
                bounds.x += block.shake_offset.x;
                bounds.y += block.shake_offset.y;
                fill(ctx, &bounds, if block.is_triggered() { "#b8860b" } else { "#8b7355" });
            }
            for door in &world.doors {
                if door.is_locked {
                    fill(ctx, &door.bounds(), "#654321");
                }
            }
            for key in world.keys.iter().filter(|k| k.is_active) {
                fill(ctx, &key.bounds(), "#ffd700");
            }
            if let Some(goal) = &world.goal {
                fill(ctx, &goal.bounds(), "#00ff7f");
            }

            for crystal in world.crystals.values() {
                ctx.set_global_alpha(crystal.opacity.clamp(0.0, 1.0) as f64);
                let b = Aabb::centered(crystal.position, crystal.size * crystal.scale.max(0.0));
                let color = match crystal.kind {
                    chrono_platformer::sim::CrystalKind::Normal => "#00bfff",
                    chrono_platformer::sim::CrystalKind::Rare => "#da70d6",
                    chrono_platformer::sim::CrystalKind::Legendary => "#ffa500",
                };
                fill(ctx, &b, color);
            }
            ctx.set_global_alpha(1.0);
            for power_up in world.power_ups.values() {
                let b = Aabb::centered(power_up.position, power_up.size * power_up.scale.max(0.0));
                fill(ctx, &b, "#ff1493");
            }

            for enemy in world.enemies.values() {
                fill(ctx, &enemy.bounds(), "#b22222");
            }

            let body = if player.modifiers.invulnerable { "#ffffff" } else { "#1e90ff" };
            fill(ctx, &player.bounds(), body);

            ctx.restore();

            if self.state.time_scale < 1.0 && !self.settings.reduced_motion {
                ctx.set_global_alpha(0.15);
                ctx.set_fill_style_str("#4169e1");
                ctx.fill_rect(0.0, 0.0, vw, vh);
                ctx.set_global_alpha(1.0);
            }

            self.draw_hud();

            match self.state.phase {
                GamePhase::Paused => self.draw_banner("Paused", Some("Esc to resume")),
                GamePhase::GameOver => self.draw_banner("Game Over", Some("Enter to retry")),
                GamePhase::LevelComplete if self.won => {
                    self.draw_banner("You Win!", Some("Enter for a new run"))
                }
                GamePhase::LevelComplete => {
                    self.draw_banner("Level Complete", Some("Enter for the next level"))
                }
                GamePhase::Error => self.draw_banner(
                    self.state.error.as_deref().unwrap_or("Level failed to load"),
                    Some("Enter to start over"),
                ),
                GamePhase::LoadingLevel => self.draw_banner("Loading...", None),
                GamePhase::Playing => {}
            }
        }

        fn draw_hud(&self) {
            let ctx = &self.ctx;
            let state = &self.state;
            let stats = state.objectives.stats();
            ctx.set_fill_style_str("#ffffff");
            ctx.set_font("16px monospace");

            let mut lines = vec![
                format!("Level {}   Score {}", state.level_index + 1, state.score),
                format!("Time {}", format_time(state.level_time_ms as u64)),
                format!("Crystals {}/{}", stats.crystals_collected, stats.total_crystals),
            ];
            if state.player.has_key {
                lines.push("Key".to_string());
            }
            for effect in state.player.effects.active() {
                let secs = effect.remaining_ms(state.clock_ms) / 1000.0;
                lines.push(format!("{} {:.1}s", effect.kind.display_name(), secs));
            }
            if self.settings.show_fps {
                lines.push(format!("FPS {}", self.fps));
            }
            for (i, line) in lines.iter().enumerate() {
                let _ = ctx.fill_text(line, 12.0, 24.0 + i as f64 * 20.0);
            }

            let done = state.objectives.completed().count();
            let total = state.objectives.objectives().len();
            let _ = ctx.fill_text(
                &format!("Objectives {}/{}", done, total),
                self.view.0 - 180.0,
                24.0,
            );
        }

        fn draw_banner(&self, title: &str, hint: Option<&str>) {
            let ctx = &self.ctx;
            let (vw, vh) = self.view;
            ctx.set_global_alpha(0.6);
            ctx.set_fill_style_str("#000000");
            ctx.fill_rect(0.0, vh / 2.0 - 60.0, vw, 110.0);
            ctx.set_global_alpha(1.0);
            ctx.set_fill_style_str("#ffffff");
            ctx.set_text_align("center");
            ctx.set_font("36px sans-serif");
            let _ = ctx.fill_text(title, vw / 2.0, vh / 2.0);
            if let Some(hint) = hint {
                ctx.set_font("16px sans-serif");
                let _ = ctx.fill_text(hint, vw / 2.0, vh / 2.0 + 32.0);
            }
            ctx.set_text_align("start");
        }
    }

    fn fill(ctx: &CanvasRenderingContext2d, b: &Aabb, color: &str) {
        ctx.set_fill_style_str(color);
        ctx.fill_rect(b.x as f64, b.y as f64, b.width as f64, b.height as f64);
    }

    enum MenuAction {
        Restart,
        NextLevel,
        NewRun,
    }

    fn local_storage() -> Option<web_sys::Storage> {
        web_sys::window()?.local_storage().ok()?
    }

    /// `?testLevel=true` plays the editor's level from LocalStorage
    fn take_test_level() -> Option<String> {
        let search = web_sys::window()?.location().search().ok()?;
        if !search.contains("testLevel=true") {
            return None;
        }
        local_storage()?.get_item(TEST_LEVEL_KEY).ok()?
    }

    async fn fetch_text(url: &str) -> Result<String, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let resp: Response = JsFuture::from(window.fetch_with_str(url)).await?.dyn_into()?;
        if !resp.ok() {
            return Err(JsValue::from_str(&format!("HTTP {} for {}", resp.status(), url)));
        }
        let text = JsFuture::from(resp.text()?).await?;
        text.as_string()
            .ok_or_else(|| JsValue::from_str("response body is not text"))
    }

    /// Fetch and enter a level. The frame loop skips ticks until this resolves.
    async fn load_level(game: Rc<RefCell<Game>>, index: u32) {
        let test_level = {
            let mut g = game.borrow_mut();
            g.state.begin_loading();
            g.input.clear();
            g.test_level.clone()
        };

        let json = match test_level {
            Some(json) => Ok(json),
            None => fetch_text(&format!("./assets/levels/level{}.json", index + 1)).await,
        };

        let mut g = game.borrow_mut();
        match json {
            Ok(json) => match LevelData::from_json(&json) {
                Ok(data) => {
                    g.level_start_score = g.state.score;
                    if let Err(e) = g.state.load_level(index, data) {
                        log::error!("Level {} rejected: {}", index + 1, e);
                    }
                }
                Err(e) => {
                    log::error!("Level {} is malformed: {}", index + 1, e);
                    // Routes through the same error phase as other load failures
                    let _ = g.state.load_level_json(index, &json);
                }
            },
            Err(e) => {
                log::error!("Failed to fetch level {}: {:?}", index + 1, e);
                g.state.phase = GamePhase::Error;
                g.state.error = Some(format!("Could not load level {}", index + 1));
            }
        }
    }

    fn apply_menu_action(game: &Rc<RefCell<Game>>, action: MenuAction) {
        let index = {
            let mut g = game.borrow_mut();
            match action {
                MenuAction::Restart => {
                    if let Err(e) = g.state.restart_level() {
                        log::error!("Restart failed: {}", e);
                    }
                    let score = g.state.score;
                    g.level_start_score = score;
                    return;
                }
                MenuAction::NextLevel => g.state.level_index + 1,
                MenuAction::NewRun => {
                    g.state.new_run();
                    g.won = false;
                    0
                }
            }
        };
        wasm_bindgen_futures::spawn_local(load_level(game.clone(), index));
    }

    pub async fn run() {
        console_error_panic_hook::set_once();
        if console_log::init_with_level(log::Level::Info).is_err() {
            web_sys::console::warn_1(&"Logger already initialized".into());
        }

        log::info!("Chrono-Platformer starting...");

        let Some(window) = web_sys::window() else { return };
        let Some(document) = window.document() else { return };

        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let Some(canvas) = document
            .get_element_by_id("canvas")
            .and_then(|el| el.dyn_into::<HtmlCanvasElement>().ok())
        else {
            log::error!("No #canvas element");
            return;
        };
        let width = canvas.client_width().max(1) as u32;
        let height = canvas.client_height().max(1) as u32;
        canvas.set_width(width);
        canvas.set_height(height);

        let Some(ctx) = canvas
            .get_context("2d")
            .ok()
            .flatten()
            .and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
        else {
            log::error!("2D canvas context unavailable");
            return;
        };

        let seed = js_sys::Date::now() as u64;
        let game = Rc::new(RefCell::new(Game::new(seed, ctx, (width as f64, height as f64))));
        game.borrow_mut().test_level = take_test_level();
        log::info!("Game initialized with seed: {}", seed);

        setup_input_handlers(game.clone());

        let first = {
            let g = game.borrow();
            g.progress
                .unlocked_levels
                .iter()
                .copied()
                .filter(|&l| l < LEVEL_COUNT && !g.progress.is_completed(l))
                .min()
                .unwrap_or(0)
        };
        load_level(game.clone(), first).await;

        request_animation_frame(game);

        log::info!("Chrono-Platformer running!");
    }

    fn setup_input_handlers(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else { return };

        // Key down
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let mut g = game.borrow_mut();
                g.audio.resume();
                let code = event.code();
                if let Some(key) = KeyCode::from_code(&code) {
                    event.prevent_default();
                    g.input.press(key);
                    return;
                }
                match code.as_str() {
                    "KeyM" => {
                        g.settings.muted = !g.settings.muted;
                        g.settings.save();
                        log::info!("Muted: {}", g.settings.muted);
                    }
                    "KeyF" => {
                        g.settings.show_fps = !g.settings.show_fps;
                        g.settings.save();
                    }
                    _ => {}
                }
            });
            let _ = window
                .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Key up
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                if let Some(key) = KeyCode::from_code(&event.code()) {
                    game.borrow_mut().input.release(key);
                }
            });
            let _ = window
                .add_event_listener_with_callback("keyup", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Window blur: drop held keys and pause
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                let mut g = game.borrow_mut();
                g.input.clear();
                if g.state.phase == GamePhase::Playing {
                    g.state.phase = GamePhase::Paused;
                    log::info!("Auto-paused (window blur)");
                }
            });
            let _ =
                window.add_event_listener_with_callback("blur", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else { return };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        let action = {
            let mut g = game.borrow_mut();

            let dt_ms = if g.last_time > 0.0 {
                (time - g.last_time) as f32
            } else {
                0.0
            };
            g.last_time = time;

            let action = g.update(dt_ms, time);
            g.render();
            action
        };

        if let Some(action) = action {
            apply_menu_action(&game, action);
        }

        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_game::run().await;
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::fs;
    use std::path::PathBuf;

    use anyhow::{Context, Result, bail};
    use clap::Parser;

    use chrono_platformer::sim::{GameEvent, GamePhase, GameState, InputState, KeyCode, tick};
    use chrono_platformer::{PlayerProgress, Tuning, format_time};

    #[derive(Parser, Debug)]
    #[command(name = "chrono-platformer")]
    #[command(about = "Play a level file headlessly with a fixed set of held keys")]
    struct Args {
        /// Level JSON file
        level: PathBuf,
        /// Frames to simulate
        #[arg(long, default_value_t = 600)]
        frames: u32,
        /// Comma-separated key codes held for the whole run (e.g. ArrowRight,Space)
        #[arg(long, value_delimiter = ',')]
        hold: Vec<String>,
        /// Wall-clock milliseconds per frame
        #[arg(long, default_value_t = 16.0)]
        frame_ms: f32,
        /// Physics tuning JSON (missing fields keep their defaults)
        #[arg(long)]
        tuning: Option<PathBuf>,
        /// RNG seed for enemy start directions
        #[arg(long, default_value_t = 0)]
        seed: u64,
    }

    pub fn run() -> Result<()> {
        let args = Args::parse();

        let tuning = match &args.tuning {
            Some(path) => {
                let json = fs::read_to_string(path)
                    .with_context(|| format!("reading tuning {}", path.display()))?;
                Tuning::from_json(&json)
                    .with_context(|| format!("parsing tuning {}", path.display()))?
            }
            None => Tuning::default(),
        };

        let mut keys = Vec::new();
        for code in &args.hold {
            match KeyCode::from_code(code.trim()) {
                Some(key) => keys.push(key),
                None => bail!("unknown key code '{}'", code),
            }
        }
        let input = InputState::holding(&keys);

        let json = fs::read_to_string(&args.level)
            .with_context(|| format!("reading level {}", args.level.display()))?;
        let mut state = GameState::with_tuning(args.seed, tuning);
        state
            .load_level_json(0, &json)
            .with_context(|| format!("loading level {}", args.level.display()))?;

        let mut progress = PlayerProgress::new();
        let mut frames_run = 0;
        for _ in 0..args.frames {
            tick(&mut state, &input, args.frame_ms);
            frames_run += 1;
            for event in &state.frame_events {
                progress.apply_event(event);
                if let GameEvent::LevelCompleted { time_ms } = event {
                    progress.record_level_complete(
                        0,
                        *time_ms,
                        state.score + state.objectives.final_score(),
                        &state.objectives.earned_badges(),
                    );
                }
            }
            if state.phase != GamePhase::Playing {
                break;
            }
        }

        let player = &state.player;
        let stats = state.objectives.stats();
        println!("=== RUN SUMMARY ===");
        println!("  Level:      {}", args.level.display());
        println!("  Frames:     {} x {}ms", frames_run, args.frame_ms);
        println!("  Phase:      {:?}", state.phase);
        if let Some(cause) = state.last_death {
            println!("  Death:      {:?}", cause);
        }
        println!("  Time:       {}", format_time(state.level_time_ms as u64));
        println!(
            "  Player:     ({:.1}, {:.1}) vel ({:.1}, {:.1}) grounded={}",
            player.position.x,
            player.position.y,
            player.velocity.x,
            player.velocity.y,
            player.grounded
        );
        println!("  Score:      {}", state.score);
        println!(
            "  Crystals:   {}/{}",
            stats.crystals_collected, stats.total_crystals
        );
        println!("  Secrets:    {}/{}", stats.secrets_found, stats.total_secrets);
        println!(
            "  Jumps:      {}   Stomps: {}",
            progress.statistics.jumps, progress.statistics.enemies_stomped
        );

        println!();
        println!("Objectives ({:.0}%):", state.objectives.overall_progress());
        for objective in state.objectives.objectives() {
            println!(
                "  [{}] {:<24} {:>5.0}%",
                if objective.is_completed { "x" } else { " " },
                objective.title,
                objective.progress() * 100.0
            );
        }
        if state.phase == GamePhase::LevelComplete {
            println!();
            println!("Final score: {}", state.score + state.objectives.final_score());
            if let Some(best) = progress.best_time(0) {
                println!("Best time:   {}", format_time(best));
            }
        }

        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    env_logger::init();
    native::run()
}
