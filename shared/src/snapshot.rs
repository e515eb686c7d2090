//! Read-only world projections published once per tick.
//!
//! Renderers index the multiplayer snapshot by player id, with the world
//! geometry stored under the reserved `_metadata` key. That key layout is
//! part of the client contract, so `Snapshot` serializes itself as a flat map
//! rather than as a struct.

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Reserved snapshot key holding the world geometry.
pub const METADATA_KEY: &str = "_metadata";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
}

/// One bird as seen by renderers.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ActorView {
    pub position: Position,
    pub alive: bool,
    pub score: f32,
    pub username: String,
}

/// One upper/lower pipe pair. `upper_y` is the bottom edge of the upper pipe,
/// `lower_y` the top edge of the lower one.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct PipeView {
    pub x: f32,
    pub upper_y: f32,
    pub lower_y: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Countdown {
    pub active: bool,
    pub remaining: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct GameData {
    pub screen_width: f32,
    pub screen_height: f32,
    pub pipe_width: f32,
    pub ground_y: f32,
    pub pipes: Vec<PipeView>,
    pub countdown: Countdown,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Metadata {
    pub game_data: GameData,
}

/// Multiplayer snapshot: `{ "_metadata": {...}, "<playerId>": {...}, ... }`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub metadata: Metadata,
    pub actors: BTreeMap<String, ActorView>,
}

impl Snapshot {
    pub fn actor(&self, id: u32) -> Option<&ActorView> {
        self.actors.get(&id.to_string())
    }

    pub fn alive_count(&self) -> usize {
        self.actors.values().filter(|actor| actor.alive).count()
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.actors.len() + 1))?;
        map.serialize_entry(METADATA_KEY, &self.metadata)?;
        for (id, actor) in &self.actors {
            map.serialize_entry(id, actor)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Snapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SnapshotVisitor;

        impl<'de> Visitor<'de> for SnapshotVisitor {
            type Value = Snapshot;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a snapshot map with a `_metadata` entry")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Snapshot, A::Error> {
                let mut metadata = None;
                let mut actors = BTreeMap::new();

                while let Some(key) = access.next_key::<String>()? {
                    if key == METADATA_KEY {
                        if metadata.is_some() {
                            return Err(de::Error::duplicate_field(METADATA_KEY));
                        }
                        metadata = Some(access.next_value()?);
                    } else {
                        let actor: ActorView = access.next_value()?;
                        actors.insert(key, actor);
                    }
                }

                let metadata = metadata.ok_or_else(|| de::Error::missing_field(METADATA_KEY))?;
                Ok(Snapshot { metadata, actors })
            }
        }

        deserializer.deserialize_map(SnapshotVisitor)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct AiMetadata {
    pub game_over: bool,
    /// `"player"`, `"ai"`, or null while undecided or tied.
    pub winner: Option<String>,
    pub game_data: GameData,
}

/// Single-player snapshot: `{ "player": {...}, "ai": {...}, "_metadata": {...} }`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AiSnapshot {
    pub player: ActorView,
    pub ai: ActorView,
    #[serde(rename = "_metadata")]
    pub metadata: AiMetadata,
}
