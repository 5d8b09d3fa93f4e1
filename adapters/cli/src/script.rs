//! Scripted command timelines replayed against a headless session.
//!
//! A script is a TOML document holding an array of `[[commands]]` tables.
//! Every entry names the wall-clock millisecond at which it fires and the
//! command to submit, for example:
//!
//! ```toml
//! [[commands]]
//! at_ms = 1500
//! command = "place_unit"
//! lane = 1
//! unit = "swordsman"
//! ```

use std::time::Duration;

use lane_defence_core::{ActionKind, BuildingKind, GridCoord, LaneId, UnitKind};
use lane_defence_session::Session;
use serde::Deserialize;

/// Ordered timeline of player commands.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Script {
    #[serde(default)]
    commands: Vec<ScriptedCommand>,
}

/// Command scheduled at a wall-clock offset from the start of the replay.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub(crate) struct ScriptedCommand {
    /// Milliseconds after the session starts.
    pub(crate) at_ms: u64,
    /// Player input submitted once the offset is reached.
    #[serde(flatten)]
    pub(crate) input: PlayerInput,
}

/// Player inputs that can be scripted.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub(crate) enum PlayerInput {
    BuildAt {
        x: u32,
        y: u32,
        building: BuildingKind,
    },
    DestroyBuilding {
        x: u32,
        y: u32,
    },
    PlaceUnit {
        lane: u32,
        unit: UnitKind,
    },
    RunAction {
        action: ActionKind,
        lane: u32,
    },
    TogglePause,
    Restart,
}

impl PlayerInput {
    /// Submits the input through the session's command surface.
    pub(crate) fn submit(self, session: &mut Session) {
        match self {
            Self::BuildAt { x, y, building } => session.build_at(GridCoord::new(x, y), building),
            Self::DestroyBuilding { x, y } => session.destroy_building(GridCoord::new(x, y)),
            Self::PlaceUnit { lane, unit } => session.place_unit(LaneId::new(lane), unit),
            Self::RunAction { action, lane } => session.run_action(action, LaneId::new(lane)),
            Self::TogglePause => session.toggle_pause(),
            Self::Restart => session.restart(),
        }
    }
}

impl Script {
    /// Parses a TOML timeline, ordering entries by their offset.
    ///
    /// Entries sharing an offset keep their document order.
    pub(crate) fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        let mut script: Self = toml::from_str(contents)?;
        script.commands.sort_by_key(|command| command.at_ms);
        Ok(script)
    }

    /// Number of scheduled commands.
    pub(crate) fn len(&self) -> usize {
        self.commands.len()
    }

    /// Cursor handing out commands as the replay clock advances.
    pub(crate) fn cursor(&self) -> ScriptCursor<'_> {
        ScriptCursor {
            commands: &self.commands,
            next: 0,
        }
    }
}

/// Walks a script in timeline order.
#[derive(Debug)]
pub(crate) struct ScriptCursor<'a> {
    commands: &'a [ScriptedCommand],
    next: usize,
}

impl<'a> ScriptCursor<'a> {
    /// Returns every not yet issued input scheduled at or before `now`.
    pub(crate) fn due(&mut self, now: Duration) -> &'a [ScriptedCommand] {
        let start = self.next;
        let now_ms = u64::try_from(now.as_millis()).unwrap_or(u64::MAX);
        while self
            .commands
            .get(self.next)
            .is_some_and(|command| command.at_ms <= now_ms)
        {
            self.next += 1;
        }
        &self.commands[start..self.next]
    }

    /// Reports whether every command has been issued.
    pub(crate) fn is_finished(&self) -> bool {
        self.next >= self.commands.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMELINE: &str = r#"
        [[commands]]
        at_ms = 2000
        command = "place_unit"
        lane = 1
        unit = "archer"

        [[commands]]
        at_ms = 0
        command = "build_at"
        x = 0
        y = 2
        building = "market"

        [[commands]]
        at_ms = 2000
        command = "toggle_pause"
    "#;

    #[test]
    fn parses_and_orders_the_timeline() {
        let script = Script::from_toml_str(TIMELINE).expect("valid script");
        assert_eq!(script.len(), 3);
        assert_eq!(
            script.commands[0].input,
            PlayerInput::BuildAt {
                x: 0,
                y: 2,
                building: BuildingKind::Market,
            }
        );
        assert_eq!(
            script.commands[1].input,
            PlayerInput::PlaceUnit {
                lane: 1,
                unit: UnitKind::Archer,
            }
        );
        assert_eq!(script.commands[2].input, PlayerInput::TogglePause);
    }

    #[test]
    fn cursor_releases_commands_once() {
        let script = Script::from_toml_str(TIMELINE).expect("valid script");
        let mut cursor = script.cursor();

        assert_eq!(cursor.due(Duration::ZERO).len(), 1);
        assert!(cursor.due(Duration::from_millis(1999)).is_empty());
        assert_eq!(cursor.due(Duration::from_secs(5)).len(), 2);
        assert!(cursor.due(Duration::from_secs(6)).is_empty());
        assert!(cursor.is_finished());
    }

    #[test]
    fn unknown_commands_are_rejected() {
        let error = Script::from_toml_str(
            r#"
            [[commands]]
            at_ms = 0
            command = "summon_dragon"
            "#,
        );
        assert!(error.is_err());
    }

    #[test]
    fn empty_documents_yield_empty_scripts() {
        let script = Script::from_toml_str("").expect("empty script");
        assert_eq!(script, Script::default());
        assert!(script.cursor().is_finished());
    }
}
