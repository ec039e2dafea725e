//! Human readable output: numbers, status lines and help.

use core::fmt::{self, Display, Write};
#[allow(unused_imports)]
use micromath::F32Ext;

use crate::drivers::float_eq::FloatEq;
use crate::drivers::units::{UnitConverter, MAX_FREQUENCY, MIN_FREQUENCY};
use crate::state::{
    ConfigSnapshot, SequenceValues, MAX_DIA_MM, MAX_N_TEETH, MAX_RATIO, MIN_DIA_MM, MIN_N_TEETH,
    MIN_RATIO,
};

/// Value printed with fewer decimals as it grows: 4 below 10, 2 below 100,
/// 1 below 1000, none above.
#[derive(Clone, Copy, Debug)]
pub struct Adaptive(pub f32);

impl Display for Adaptive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.0;
        let magnitude = value.abs();
        if magnitude < 10.0 {
            write!(f, "{:.4}", value)
        } else if magnitude < 100.0 {
            write!(f, "{:.2}", value)
        } else if magnitude < 1000.0 {
            write!(f, "{:.1}", value)
        } else {
            write!(f, "{:.0}", value)
        }
    }
}

/// Magnitude with an explicit `+`/`-` taken from the direction flag.
#[derive(Clone, Copy, Debug)]
pub struct Signed {
    pub value: f32,
    pub reverse: bool,
}

impl Display for Signed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.reverse { '-' } else { '+' };
        write!(f, "{}{}", sign, Adaptive(self.value.abs()))
    }
}

// ── Status lines ──────────────────────────────────────────────────────────────

/// How many channels a status line shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channels {
    One,
    Both,
}

/// Progress line rewritten in place (`\r`) while a ramp runs. Values are
/// computed back from the emitted periods.
pub fn write_status<W: Write>(
    w: &mut W,
    snapshot: &ConfigSnapshot,
    units: &UnitConverter,
    channels: Channels,
    elapsed_s: Option<u32>,
) -> fmt::Result {
    match elapsed_s {
        Some(elapsed) => write!(w, "\r{}\" - ", elapsed)?,
        None => w.write_str("\r")?,
    }
    let all = snapshot.channels();
    let shown = match channels {
        Channels::One => 1,
        Channels::Both => all.len(),
    };
    for (i, channel) in all[..shown].iter().enumerate() {
        let value = units.value_of(channel.period_ticks);
        let signed = Signed { value, reverse: channel.reverse };
        match (i, units.is_speed_mode()) {
            (0, true) => write!(w, "Actual speed {} km/h ({} Hz)", signed, Adaptive(units.frequency_of(value)))?,
            (0, false) => write!(w, "Actual frequency {} Hz", signed)?,
            (_, true) => write!(w, " : {} km/h ({} Hz)", signed, Adaptive(units.frequency_of(value)))?,
            (_, false) => write!(w, " : {} Hz", signed)?,
        }
    }
    w.write_str("     ")
}

/// Idle report of what the pulse engine is currently emitting.
pub fn write_current<W: Write>(w: &mut W, snapshot: &ConfigSnapshot, units: &UnitConverter) -> fmt::Result {
    let definition = units.definition();
    let all = snapshot.channels();
    let shown = if snapshot.channels_equal() { 1 } else { all.len() };
    if units.is_speed_mode() {
        write!(w, "{} teeth, wheel diameter: {} mm", definition.n_teeth, definition.diameter_mm)?;
        if !FloatEq::default().equal(definition.gear_ratio, 1.0) {
            write!(w, ", gear ratio: {:.6}", definition.gear_ratio)?;
        }
        w.write_str("\n")?;
        for (i, channel) in all[..shown].iter().enumerate() {
            let value = units.value_of(channel.period_ticks);
            if i > 0 {
                w.write_str(" : ")?;
            }
            write!(
                w,
                "{} km/h ({} Hz)",
                Signed { value, reverse: channel.reverse },
                Adaptive(units.frequency_of(value))
            )?;
        }
    } else {
        w.write_str("No speed defined: only deals with frequencies\n")?;
        for (i, channel) in all[..shown].iter().enumerate() {
            if i > 0 {
                w.write_str(" : ")?;
            }
            let direction = if channel.reverse { "reversed" } else { "forward" };
            write!(w, "{} Hz, {}", Adaptive(units.value_of(channel.period_ticks)), direction)?;
        }
    }
    w.write_str("\n")
}

// ── Sequence lists ────────────────────────────────────────────────────────────

/// One line announcing a list item before it plays:
/// `Step n [d"] a > b unit [x m/s2] [: c > d unit [y m/s2]] dir [> dir]`.
pub fn write_step<W: Write>(
    w: &mut W,
    number: usize,
    from: &SequenceValues,
    to: &SequenceValues,
    units: &UnitConverter,
    float_eq: &FloatEq,
) -> fmt::Result {
    write!(w, "Step {}", number)?;
    if to.delay_s != 0 {
        write!(w, " {}\"", to.delay_s)?;
    }
    write_transition(w, from.first_value, to.first_value, to.delay_s, units)?;
    let same_values = float_eq.equal(from.first_value, from.second_value)
        && float_eq.equal(to.first_value, to.second_value);
    if !same_values {
        w.write_str(" :")?;
        write_transition(w, from.second_value, to.second_value, to.delay_s, units)?;
    }
    let (before, after) = (from.direction(), to.direction());
    write!(w, " {}", before.as_str())?;
    if before != after {
        write!(w, " > {}", after.as_str())?;
    }
    writeln!(w)
}

fn write_transition<W: Write>(w: &mut W, from: f32, to: f32, delay_s: u16, units: &UnitConverter) -> fmt::Result {
    if !units.is_speed_mode() {
        return write!(w, " {} > {} Hz", Adaptive(from), Adaptive(to));
    }
    write!(w, " {} > {} km/h", Adaptive(from), Adaptive(to))?;
    if delay_s != 0 {
        // km/h per second to m/s2
        let acceleration = (to - from) / (3.6 * f32::from(delay_s));
        write!(w, " {} m/s2", Adaptive(acceleration))?;
    }
    Ok(())
}

/// Numbered dump of a recorded list.
pub fn write_list<'a, W: Write>(
    w: &mut W,
    items: impl IntoIterator<Item = &'a SequenceValues>,
    units: &UnitConverter,
) -> fmt::Result {
    let mut count = 0;
    for (i, item) in items.into_iter().enumerate() {
        writeln!(
            w,
            "{}- {}\"> {} : {}",
            i + 1,
            item.delay_s,
            Signed { value: item.first_value, reverse: item.first_reverse },
            Signed { value: item.second_value, reverse: item.second_reverse },
        )?;
        count += 1;
    }
    if count == 0 {
        return w.write_str("Sequence list is empty\n");
    }
    writeln!(w, "Values are in {}", if units.is_speed_mode() { "km/h" } else { "Hz" })
}

// ── Help ──────────────────────────────────────────────────────────────────────

const SHORT_HELP: &str = concat!(
    " {value1}[:{value2}][{rev_defs}] define immediate values\n",
    " {rev_defs} defines moving directions (forward/reverse)\n",
    " {delay}\"[>{value1}[:{value2}][{rev_defs}]] new sequence item\n",
    " ( start sequence\n",
    " ) end sequence\n",
    " ![!] execute sequence, infinite loop\n",
    " !? print sequence\n",
    " {n_teeth},{dia_mm}[,{ratio}] define speed to frequency parameters\n",
    " ?[?] help, extended help\n",
);

pub fn write_help<W: Write>(w: &mut W, extended: bool) -> fmt::Result {
    if !extended {
        return w.write_str(SHORT_HELP);
    }
    w.write_str("Syntax of commands for speed sensor simulator:\n")?;
    w.write_str(SHORT_HELP)?;
    w.write_str(concat!(
        "  with {value1}, {value2} define speed (or frequency)\n",
        "       If only one defined, define both as equal\n",
        "       {rev_defs} + (both forward), -+ (first reverse only),\n",
        "        +- (second reverse only), - (both reversed)\n",
        "       {delay} timer value in seconds\n",
    ))?;
    writeln!(w, "       {{n_teeth}} number of teeth [{}, {}], 0 to disable frequency", MIN_N_TEETH, MAX_N_TEETH)?;
    w.write_str("       Calculations done according to speed:\n")?;
    writeln!(w, "        {{diam_mm}} diameter in millimeters [{} mm, {} mm]", MIN_DIA_MM, MAX_DIA_MM)?;
    writeln!(w, "        {{ratio}} gear ratio [{:.4}, {:.1}], defaults to 1.0", MIN_RATIO, MAX_RATIO)?;
    w.write_str("Notes:\n")?;
    writeln!(
        w,
        " no limit on values imposed, frequencies are clamped to [{:.1} Hz, {:.0} Hz]",
        MIN_FREQUENCY, MAX_FREQUENCY
    )?;
    w.write_str(concat!(
        " value of zero always indicates frequency and speed are null\n",
        " when speeds are considered, they are in km/h (and frequencies are in Hz)\n",
        " ^c: cancels current sequence, ^e: toggles character echo,\n",
        " empty command: details of current state\n",
    ))
}
