//! Console command interpreter.
//!
//! Commands update the "next" sequence values in place and report what kind
//! of command was typed; the controller decides what to run.
//!
//! Grammar, first match wins:
//!
//! | input                          | outcome              |
//! |--------------------------------|----------------------|
//! | `{delay}">{v1}:{v2}[dir]`      | `NewRecord`          |
//! | `{delay}">{v}[dir]`            | `NewRecord`          |
//! | `{delay}">{dir}`               | `NewRecord`          |
//! | `{delay}"` / `{delay}">`       | `NewRecord`          |
//! | `(` `)` `!` `!!` `!?` `?` `??` | list / help commands |
//! | `{teeth},{dia_mm}[,{ratio}]`   | `NewSpeedDefinition` |
//! | `{v1}:{v2}[dir]`               | `NewValue`           |
//! | `{v}[dir]`                     | `NewValue`           |
//! | `{dir}`                        | `NewValue`           |

use crate::state::{Direction, SequenceValues, SpeedDefinition};

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome {
    Empty,
    Help,
    ExtendedHelp,
    ExecuteList,
    LoopList,
    PrintList,
    InitList,
    CloseList,
    /// Values to apply now.
    NewValue,
    /// Values to record, or to ramp to when not recording.
    NewRecord,
    NewSpeedDefinition(SpeedDefinition),
    SyntaxError,
    RangeError,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    Syntax,
    Range,
}

impl From<CommandError> for Outcome {
    fn from(e: CommandError) -> Self {
        match e {
            CommandError::Syntax => Outcome::SyntaxError,
            CommandError::Range => Outcome::RangeError,
        }
    }
}

/// Interprets one trimmed line. `next` is only modified when the command is
/// valid.
pub fn interpret(line: &str, next: &mut SequenceValues) -> Outcome {
    match parse(line, next) {
        Ok(outcome) => outcome,
        Err(e) => {
            debug!("command rejected: {}", e);
            e.into()
        }
    }
}

fn parse(line: &str, next: &mut SequenceValues) -> Result<Outcome, CommandError> {
    if line.is_empty() {
        return Ok(Outcome::Empty);
    }
    if let Some(outcome) = parse_record(line, next)? {
        return Ok(outcome);
    }
    match line {
        "(" => return Ok(Outcome::InitList),
        ")" => return Ok(Outcome::CloseList),
        "!" => return Ok(Outcome::ExecuteList),
        "!!" => return Ok(Outcome::LoopList),
        "!?" => return Ok(Outcome::PrintList),
        "?" => return Ok(Outcome::Help),
        "??" => return Ok(Outcome::ExtendedHelp),
        _ => {}
    }
    if let Some(definition) = parse_speed_definition(line)? {
        return Ok(Outcome::NewSpeedDefinition(definition));
    }
    parse_value(line, next)
}

/// `{delay}"` followed by an optional `>` and target.
fn parse_record(line: &str, next: &mut SequenceValues) -> Result<Option<Outcome>, CommandError> {
    let mut scan = Scanner::new(line);
    let Some(delay) = scan.int() else { return Ok(None) };
    if !scan.literal('"') {
        return Ok(None);
    }
    let delay_s = u16::try_from(delay).map_err(|_| CommandError::Range)?;

    let mut updated = *next;
    updated.delay_s = delay_s;
    if scan.literal('>') {
        if let Some(first) = scan.float() {
            let second = if scan.literal(':') { scan.float().ok_or(CommandError::Syntax)? } else { first };
            updated.first_value = first;
            updated.second_value = second;
        }
        apply_direction(&mut updated, scan.word())?;
    } else if !scan.word().is_empty() {
        return Err(CommandError::Syntax);
    }
    *next = updated;
    Ok(Some(Outcome::NewRecord))
}

/// `{teeth},{diameter}[,{ratio}]`; a zero in either integer cancels the
/// definition.
fn parse_speed_definition(line: &str) -> Result<Option<SpeedDefinition>, CommandError> {
    let mut scan = Scanner::new(line);
    let Some(n_teeth) = scan.int() else { return Ok(None) };
    if !scan.literal(',') {
        return Ok(None);
    }
    let Some(diameter_mm) = scan.int() else { return Ok(None) };
    let gear_ratio = if scan.literal(',') { scan.float().unwrap_or(1.0) } else { 1.0 };

    if n_teeth == 0 || diameter_mm == 0 {
        return Ok(Some(SpeedDefinition::NONE));
    }
    let definition = SpeedDefinition {
        n_teeth: u16::try_from(n_teeth).map_err(|_| CommandError::Range)?,
        diameter_mm: u16::try_from(diameter_mm).map_err(|_| CommandError::Range)?,
        gear_ratio,
    };
    if !definition.in_range() {
        return Err(CommandError::Range);
    }
    Ok(Some(definition))
}

/// `{v1}[:{v2}][dir]` or a lone direction.
fn parse_value(line: &str, next: &mut SequenceValues) -> Result<Outcome, CommandError> {
    let mut scan = Scanner::new(line);
    let mut updated = *next;
    match scan.float() {
        Some(first) => {
            let second = if scan.literal(':') { scan.float().ok_or(CommandError::Syntax)? } else { first };
            updated.first_value = first;
            updated.second_value = second;
            apply_direction(&mut updated, scan.word())?;
        }
        None => {
            let direction = Direction::parse(line).ok_or(CommandError::Syntax)?;
            updated.set_direction(direction);
        }
    }
    *next = updated;
    Ok(Outcome::NewValue)
}

/// An empty token keeps the current directions.
fn apply_direction(values: &mut SequenceValues, token: &str) -> Result<(), CommandError> {
    if token.is_empty() {
        return Ok(());
    }
    let direction = Direction::parse(token).ok_or(CommandError::Syntax)?;
    values.set_direction(direction);
    Ok(())
}

// ── Scanner ───────────────────────────────────────────────────────────────────

/// Minimal scanf: numbers skip leading blanks, literals must match exactly.
struct Scanner<'a> {
    rest: &'a str,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Self { rest: input }
    }

    fn skip_blanks(&mut self) {
        self.rest = self.rest.trim_start();
    }

    fn literal(&mut self, c: char) -> bool {
        match self.rest.strip_prefix(c) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    /// Length of an optional sign followed by digits at `from`.
    fn digits_len(s: &str, from: usize, signed: bool) -> usize {
        let bytes = s.as_bytes();
        let mut i = from;
        if signed && matches!(bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let start = i;
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        if i == start {
            from
        } else {
            i
        }
    }

    fn int(&mut self) -> Option<i32> {
        self.skip_blanks();
        let end = Self::digits_len(self.rest, 0, true);
        let value = self.rest[..end].parse().ok()?;
        self.rest = &self.rest[end..];
        Some(value)
    }

    fn float(&mut self) -> Option<f32> {
        self.skip_blanks();
        let s = self.rest;
        let bytes = s.as_bytes();
        let mut end = 0;
        if matches!(bytes.first(), Some(b'+' | b'-')) {
            end = 1;
        }
        let int_start = end;
        while bytes.get(end).is_some_and(u8::is_ascii_digit) {
            end += 1;
        }
        let mut has_digits = end > int_start;
        if bytes.get(end) == Some(&b'.') {
            let frac_start = end + 1;
            let mut frac_end = frac_start;
            while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
                frac_end += 1;
            }
            if has_digits || frac_end > frac_start {
                has_digits = true;
                end = frac_end;
            }
        }
        if !has_digits {
            return None;
        }
        if matches!(bytes.get(end), Some(b'e' | b'E')) {
            let exp_end = Self::digits_len(s, end + 1, true);
            if exp_end > end + 1 {
                end = exp_end;
            }
        }
        let value = s[..end].parse().ok()?;
        self.rest = &s[end..];
        Some(value)
    }

    /// Next blank-delimited word, empty at end of input.
    fn word(&mut self) -> &'a str {
        self.skip_blanks();
        let end = self.rest.find(char::is_whitespace).unwrap_or(self.rest.len());
        let (word, rest) = self.rest.split_at(end);
        self.rest = rest;
        word
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(line: &str) -> (Outcome, SequenceValues) {
        let mut next = SequenceValues::ZERO;
        let outcome = interpret(line, &mut next);
        (outcome, next)
    }

    #[test]
    fn list_and_help_commands() {
        assert_eq!(run("").0, Outcome::Empty);
        assert_eq!(run("(").0, Outcome::InitList);
        assert_eq!(run(")").0, Outcome::CloseList);
        assert_eq!(run("!").0, Outcome::ExecuteList);
        assert_eq!(run("!!").0, Outcome::LoopList);
        assert_eq!(run("!?").0, Outcome::PrintList);
        assert_eq!(run("?").0, Outcome::Help);
        assert_eq!(run("??").0, Outcome::ExtendedHelp);
        assert_eq!(run("!!!").0, Outcome::SyntaxError);
    }

    #[test]
    fn immediate_values() {
        let (outcome, next) = run("120.5");
        assert_eq!(outcome, Outcome::NewValue);
        assert_eq!((next.first_value, next.second_value), (120.5, 120.5));

        let (outcome, next) = run("10:20 +-");
        assert_eq!(outcome, Outcome::NewValue);
        assert_eq!((next.first_value, next.second_value), (10.0, 20.0));
        assert_eq!(next.direction(), Direction::SecondReversed);

        let (_, next) = run("3.5e2-");
        assert_eq!(next.first_value, 350.0);
        assert_eq!(next.direction(), Direction::Reverse);

        let (_, next) = run(".5:7.");
        assert_eq!((next.first_value, next.second_value), (0.5, 7.0));
    }

    #[test]
    fn direction_alone_keeps_values() {
        let mut next = SequenceValues { first_value: 42.0, second_value: 21.0, ..SequenceValues::ZERO };
        assert_eq!(interpret("-+", &mut next), Outcome::NewValue);
        assert_eq!(next.direction(), Direction::FirstReversed);
        assert_eq!((next.first_value, next.second_value), (42.0, 21.0));
        assert_eq!(interpret("++", &mut next), Outcome::NewValue);
        assert_eq!(next.direction(), Direction::Forward);
    }

    #[test]
    fn records() {
        let (outcome, next) = run("5\">100:50 -");
        assert_eq!(outcome, Outcome::NewRecord);
        assert_eq!(next.delay_s, 5);
        assert_eq!((next.first_value, next.second_value), (100.0, 50.0));
        assert_eq!(next.direction(), Direction::Reverse);

        let (_, next) = run("3\">80");
        assert_eq!((next.delay_s, next.first_value, next.second_value), (3, 80.0, 80.0));

        let mut next = SequenceValues { first_value: 9.0, second_value: 9.0, ..SequenceValues::ZERO };
        assert_eq!(interpret("2\">+-", &mut next), Outcome::NewRecord);
        assert_eq!((next.delay_s, next.first_value), (2, 9.0));
        assert_eq!(next.direction(), Direction::SecondReversed);

        assert_eq!(interpret("7\"", &mut next), Outcome::NewRecord);
        assert_eq!(next.delay_s, 7);
        assert_eq!(interpret("8\">", &mut next), Outcome::NewRecord);
        assert_eq!(next.delay_s, 8);
        assert_eq!(next.direction(), Direction::SecondReversed);
    }

    #[test]
    fn speed_definitions() {
        assert_eq!(
            run("100,920").0,
            Outcome::NewSpeedDefinition(SpeedDefinition { n_teeth: 100, diameter_mm: 920, gear_ratio: 1.0 })
        );
        assert_eq!(
            run("60,700,2.5").0,
            Outcome::NewSpeedDefinition(SpeedDefinition { n_teeth: 60, diameter_mm: 700, gear_ratio: 2.5 })
        );
        assert_eq!(run("0,0").0, Outcome::NewSpeedDefinition(SpeedDefinition::NONE));
        assert_eq!(run("0,5000").0, Outcome::NewSpeedDefinition(SpeedDefinition::NONE));
        assert_eq!(run("10,920").0, Outcome::RangeError);
        assert_eq!(run("100,2000").0, Outcome::RangeError);
        assert_eq!(run("100,920,5").0, Outcome::RangeError);
        assert_eq!(run("70000,920").0, Outcome::RangeError);
    }

    #[test]
    fn errors_leave_next_untouched() {
        let before = SequenceValues { first_value: 1.0, second_value: 2.0, delay_s: 3, ..SequenceValues::ZERO };
        for line in ["abc", "12 x", "5\">10 *", "4\" 6", "1:", "-1\">5", "70000\">5"] {
            let mut next = before;
            let outcome = interpret(line, &mut next);
            assert!(matches!(outcome, Outcome::SyntaxError | Outcome::RangeError), "{line}: {outcome:?}");
            assert_eq!(next, before, "{line}");
        }
        assert_eq!(run("-1\">5").0, Outcome::RangeError);
        assert_eq!(run("abc").0, Outcome::SyntaxError);
    }
}
