//! Common test utilities

use chrono::NaiveDate;
use rotapost::models::{Actor, ContentMedia, ContentText, Pools, Target};
use rotapost::scheduler::{SafetyConfig, TimeWindow};
use rotapost::storage::{create_mock_repository, SharedRepository};

/// Monday 2024-03-04
pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
}

/// Working hours 09:00-17:00 with a 12:00-13:00 break
pub fn safety(actor_cap: u32, target_cap: u32, target_cooldown: u32, interval: u32) -> SafetyConfig {
    SafetyConfig::builder()
        .max_per_actor_per_day(actor_cap)
        .max_per_target_per_day(target_cap)
        .target_cooldown_days(target_cooldown)
        .content_reuse_cooldown_days(0)
        .working_hours(TimeWindow::parse("09:00", "17:00").unwrap())
        .break_window(TimeWindow::parse("12:00", "13:00").unwrap())
        .slot_interval_minutes(interval)
        .build()
        .unwrap()
}

/// Pools with ids A1.., T1.., X1.., M1..; targets get the given audiences
pub fn pools(actors: usize, audiences: &[u64], texts: usize, media: usize) -> Pools {
    Pools {
        actors: (1..=actors)
            .map(|i| Actor::new(format!("A{i}"), format!("Account {i}")))
            .collect(),
        targets: audiences
            .iter()
            .enumerate()
            .map(|(i, size)| Target::new(format!("T{}", i + 1), format!("Group {}", i + 1), *size))
            .collect(),
        texts: (1..=texts)
            .map(|i| ContentText::new(format!("X{i}"), format!("Text {i}")))
            .collect(),
        media: (1..=media)
            .map(|i| ContentMedia::new(format!("M{i}"), format!("media/{i}.jpg")))
            .collect(),
    }
}

/// `n` targets with strictly decreasing audiences
#[allow(dead_code)]
pub fn audiences(n: usize) -> Vec<u64> {
    (0..n as u64).map(|i| 10_000 - i * 100).collect()
}

/// In-memory repository preloaded with `pools`
#[allow(dead_code)]
pub fn seeded_repository(pools: &Pools) -> SharedRepository {
    let repo = create_mock_repository();
    repo.import_pools(pools).unwrap();
    repo
}
