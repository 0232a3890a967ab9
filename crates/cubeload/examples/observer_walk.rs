//! Walk one observer across the grid and report what the manager did.
//!
//! ```text
//! RUST_LOG=cubeload_ticket=debug cargo run --example observer_walk
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use cubeload::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Holders are plain levels; a section counts as ready once it has been
/// finalized.
#[derive(Default)]
struct Grid {
    levels: HashMap<Position, Level>,
    finalized: HashMap<Position, bool>,
}

impl HolderProvider for Grid {
    type Holder = Position;

    fn is_unloading(&self, _pos: Position) -> bool {
        false
    }

    fn holder(&self, pos: Position) -> Option<Position> {
        self.levels.contains_key(&pos).then_some(pos)
    }

    fn holder_level(&self, holder: &Position) -> Level {
        self.levels.get(holder).copied().unwrap_or(UNLOADED_LEVEL)
    }

    fn set_level(
        &mut self,
        pos: Position,
        level: Level,
        _holder: Option<Position>,
        _old_level: Level,
    ) -> Option<Position> {
        if level >= UNLOADED_LEVEL {
            self.levels.remove(&pos);
            self.finalized.remove(&pos);
            return None;
        }
        self.levels.insert(pos, level);
        self.finalized.insert(pos, false);
        Some(pos)
    }

    fn finalize(&mut self, holder: &Position) {
        if let Some(done) = self.finalized.get_mut(holder) {
            *done = true;
        }
    }

    fn is_ready(&self, holder: &Position) -> bool {
        self.finalized.get(holder).copied().unwrap_or(false)
    }
}

fn main() -> Result<(), ManagerError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ManagerConfig {
        view_range: 8,
        view_distance: 6,
        scheduler: SchedulerConfig {
            max_concurrent_loads: 4,
            ..SchedulerConfig::default()
        },
        ..ManagerConfig::default()
    };
    // Stand-in for disk or generator work.
    let runner: Runner<ViewRequest> = Arc::new(|req: &ViewRequest| {
        if req.transition == Transition::Load {
            thread::sleep(Duration::from_micros(200));
        }
    });

    let mut grid = Grid::default();
    let mut manager = TicketManager::with_runner(config, runner)?;
    let observer = ObserverId(1);

    let started = Instant::now();
    for step in 0..8 {
        let pos = Position::new(step * 2, 0, step);
        manager.update_observer_position(observer, pos);
        let idle = manager.run_until_idle(&mut grid, Duration::from_secs(30));
        info!(
            step,
            %pos,
            idle,
            holders = grid.levels.len(),
            spawn_columns = manager.spawn_eligible_count(),
            scheduler = %manager.scheduler_summary(),
            "observer moved"
        );
    }

    manager.set_view_distance(4);
    manager.run_until_idle(&mut grid, Duration::from_secs(30));
    manager.remove_observer(observer);
    manager.run_until_idle(&mut grid, Duration::from_secs(30));
    manager.shutdown();

    let m = manager.metrics();
    info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        loads = m.load_requests,
        unloads = m.unload_requests,
        superseded = m.superseded_requests,
        graph_steps = m.graph_steps,
        holders_left = grid.levels.len(),
        "walk finished"
    );
    Ok(())
}
