//! Operator and builtin ids
//!
//! Ids below `SLEEP_UNTIL` are the structural operators both evaluators
//! implement in-process. Everything else is dispatched to the host surface
//! by name; the ids listed here are only the ones the VM or its tests need
//! to recognize directly.

pub const BEGIN: u16 = 0;
pub const BEGIN_RANDOM: u16 = 1;
pub const IF: u16 = 2;
pub const SET: u16 = 4;
pub const AND: u16 = 5;
pub const OR: u16 = 6;
pub const ADD: u16 = 7;
pub const SUBTRACT: u16 = 8;
pub const MULTIPLY: u16 = 9;
pub const DIVIDE: u16 = 10;
pub const MIN: u16 = 11;
pub const MAX: u16 = 12;
pub const EQUALS: u16 = 13;
pub const GREATER_THAN: u16 = 15;
pub const LESS_THAN: u16 = 16;
pub const GREATER_THAN_OR_EQUAL: u16 = 17;
pub const LESS_THAN_OR_EQUAL: u16 = 18;
pub const SLEEP: u16 = 19;
pub const SLEEP_UNTIL: u16 = 20;
pub const WAKE: u16 = 21;
pub const NOT: u16 = 24;

pub const PRINT: u16 = 26;
pub const GAME_IS_PLAYTEST: u16 = 358;

/// Human-readable name for an operator id, for logs and errors.
pub fn name(op: u16) -> &'static str {
    match op {
        BEGIN => "begin",
        BEGIN_RANDOM => "begin_random",
        IF => "if",
        SET => "set",
        AND => "and",
        OR => "or",
        ADD => "+",
        SUBTRACT => "-",
        MULTIPLY => "*",
        DIVIDE => "/",
        MIN => "min",
        MAX => "max",
        EQUALS => "=",
        GREATER_THAN => ">",
        LESS_THAN => "<",
        GREATER_THAN_OR_EQUAL => ">=",
        LESS_THAN_OR_EQUAL => "<=",
        SLEEP => "sleep",
        SLEEP_UNTIL => "sleep_until",
        WAKE => "wake",
        NOT => "not",
        PRINT => "print",
        GAME_IS_PLAYTEST => "game_is_playtest",
        _ => "<builtin>",
    }
}
