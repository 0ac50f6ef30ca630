#[path = "integration/mission.rs"]
mod mission;
