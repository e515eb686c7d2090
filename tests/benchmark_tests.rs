//! Performance benchmarks for critical game systems

use server::actor::Actor;
use server::collision;
use server::config::GameConfig;
use server::game::Game;
use server::obstacles::ObstacleField;
use server::world::World;
use shared::{ClientEvent, PlayerId, WireFormat};
use std::collections::HashSet;
use std::time::Instant;

fn seeded_config() -> GameConfig {
    GameConfig {
        seed: Some(99),
        ..GameConfig::default()
    }
}

/// Benchmarks collision detection against a full pipe field
#[test]
fn benchmark_collision_detection() {
    let config = seeded_config();
    let field = ObstacleField::new(&config);
    let mut actor = Actor::new(1, "bench", &config);

    let iterations = 100_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let _ = collision::detect(&mut actor, &field, &config);
    }

    let duration = start.elapsed();
    println!(
        "Collision detection: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 500);
}

/// Benchmarks world steps with a full lobby of birds
#[test]
fn benchmark_world_step() {
    let config = seeded_config();
    let mut world = World::new(&config);
    world.begin_round(&config);
    let mut actors: Vec<Actor> = (1..=32)
        .map(|id| Actor::new(id, format!("bird{}", id), &config))
        .collect();

    let iterations = 10_000u32;
    let start = Instant::now();

    for i in 0..iterations {
        let flaps: HashSet<PlayerId> = actors
            .iter()
            .filter(|actor| (i + actor.id) % 12 == 0)
            .map(|actor| actor.id)
            .collect();
        world.step(actors.iter_mut(), &flaps, true, &config);
    }

    let duration = start.elapsed();
    println!(
        "World step (32 birds): {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(actors.iter().all(|actor| actor.alive));
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks full game ticks, including snapshot projection, for 32 players
#[test]
fn benchmark_game_tick() {
    let mut game = Game::new(seeded_config()).unwrap();
    for id in 1..=32 {
        game.enqueue(
            id,
            ClientEvent::JoinGame {
                username: format!("player{}", id),
                is_admin: false,
            },
        )
        .unwrap();
    }
    game.tick();
    game.enqueue(1, ClientEvent::ToggleTestMode { enabled: true })
        .unwrap();
    game.enqueue(1, ClientEvent::StartGame).unwrap();

    let iterations = 2_000u32;
    let start = Instant::now();

    for i in 0..iterations {
        let flapper = i % 32 + 1;
        game.enqueue(
            flapper,
            ClientEvent::UpdatePosition {
                player_id: flapper,
                action: 1,
            },
        )
        .unwrap();
        let out = game.tick();
        assert!(!out.is_empty());
    }

    let duration = start.elapsed();
    println!(
        "Game tick (32 players): {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // A tick must fit comfortably inside the 25ms step at 40 Hz
    assert!(duration.as_millis() < 5000);
}

/// Benchmarks snapshot encoding in both wire formats
#[test]
fn benchmark_snapshot_encoding() {
    let mut game = Game::new(seeded_config()).unwrap();
    for id in 1..=32 {
        game.enqueue(
            id,
            ClientEvent::JoinGame {
                username: format!("player{}", id),
                is_admin: false,
            },
        )
        .unwrap();
    }
    game.tick();
    game.enqueue(1, ClientEvent::StartGame).unwrap();
    game.tick();

    let event = game.session().game_state();
    let iterations = 5_000;

    for wire in [WireFormat::Json, WireFormat::Bincode] {
        let start = Instant::now();
        let mut bytes = 0;
        for _ in 0..iterations {
            bytes = wire.encode(&event).unwrap().len();
        }
        let duration = start.elapsed();
        println!(
            "Snapshot encoding ({:?}, {} bytes): {} iterations in {:?} ({:.2} μs/iter)",
            wire,
            bytes,
            iterations,
            duration,
            duration.as_micros() as f64 / iterations as f64
        );

        assert!(bytes > 0);
        assert!(duration.as_millis() < 5000);
    }
}
