//! Snapshot encoding of per-state values.
//!
//! Every tracked combination with at least one non-zero value becomes one
//! `stats` element. Tracked axes with a non-default value are written as
//! `axis-name="label"`; non-zero values as `_<dimension>="value"`.
//!
//! ```text
//! <stats battery="on" procstate="fg" _0="1200" _2="7" />
//! ```

use crate::counter::StateCounter;
use crate::error::{Result, StatsError};
use crate::state::StateSpaceFactory;
use crate::tags::{TagEventKind, TagReader, TagWriter};
use crate::types::CompositeState;
use std::io;
use tracing::{debug, error};

/// Element name of one per-state record.
pub const STATS_TAG: &str = "stats";

/// Prefix marking value attributes, followed by the dimension index.
const DIMENSION_PREFIX: char = '_';

/// Tracked combinations whose accumulated values are not all zero.
fn non_zero_rows<'a, C: StateCounter>(
    factory: &'a StateSpaceFactory,
    counter: &'a C,
) -> impl Iterator<Item = (Vec<u32>, Vec<i64>)> + 'a {
    factory.combinations().filter_map(move |states| {
        let serial = factory.serial_state_for(&states).ok()?;
        let mut values = vec![0; factory.dimension_count()];
        counter.get_counts(&mut values, serial.index());
        values.iter().any(|&v| v != 0).then_some((states, values))
    })
}

/// Write one `stats` element per non-zero tracked combination. Returns the
/// number of elements written.
pub fn write_states<C, W>(factory: &StateSpaceFactory, counter: &C, writer: &mut W) -> Result<usize>
where
    C: StateCounter,
    W: TagWriter + ?Sized,
{
    let mut written = 0;
    for (states, values) in non_zero_rows(factory, counter) {
        writer.start_tag(STATS_TAG)?;
        for (axis, &value) in factory.axes().iter().zip(&states) {
            if axis.is_tracked() && value != 0 {
                writer.attribute(axis.name(), &axis.labels()[value as usize])?;
            }
        }
        for (dimension, &value) in values.iter().enumerate() {
            if value != 0 {
                writer.attribute_long(&format!("{}{}", DIMENSION_PREFIX, dimension), value)?;
            }
        }
        writer.end_tag(STATS_TAG)?;
        written += 1;
    }
    debug!(records = written, "Wrote multi-state stats");
    Ok(written)
}

/// Restore values from `stats` elements.
///
/// The reader is expected on the start tag of the enclosing element;
/// reading stops at its end tag or at the end of the document. Other
/// elements are ignored. Values are assigned, not added. On error, records
/// restored before the failure stay applied.
pub fn read_states<C, R>(factory: &StateSpaceFactory, counter: &mut C, reader: &mut R) -> Result<usize>
where
    C: StateCounter,
    R: TagReader + ?Sized,
{
    let outer = reader.name().map(str::to_string);
    let mut values = vec![0; factory.dimension_count()];
    let mut restored = 0;

    let mut event = reader.event();
    loop {
        match event {
            TagEventKind::EndDocument => break,
            TagEventKind::EndTag if reader.name() == outer.as_deref() => break,
            TagEventKind::StartTag if reader.name() == Some(STATS_TAG) => {
                values.fill(0);
                let mut composite = CompositeState::default();
                for attribute in reader.attributes() {
                    if let Some(index) = attribute.name.strip_prefix(DIMENSION_PREFIX) {
                        let index: usize = index.parse().map_err(|_| {
                            StatsError::MalformedData(format!(
                                "Unexpected index syntax: {}",
                                attribute.name
                            ))
                        })?;
                        if index >= values.len() {
                            error!(index, length = values.len(), "State index out of bounds");
                            return Err(StatsError::MalformedData(format!(
                                "State index out of bounds: {} length: {}",
                                index,
                                values.len()
                            )));
                        }
                        values[index] = attribute.value.as_long()?;
                    } else {
                        composite = factory.set_axis_value_by_label(
                            composite,
                            &attribute.name,
                            &attribute.value.as_str(),
                        )?;
                    }
                }
                let serial = factory.serial_state_of(composite).ok_or_else(|| {
                    StatsError::MalformedData(format!("Invalid composite state: {:?}", composite))
                })?;
                counter.set_values(serial.index(), &values);
                restored += 1;
            }
            _ => {}
        }
        event = reader.next()?;
    }

    debug!(records = restored, "Read multi-state stats");
    Ok(restored)
}

/// Print one line per non-zero tracked combination: the tracked labels,
/// then the values.
pub fn dump_states<C, W>(factory: &StateSpaceFactory, counter: &C, out: &mut W) -> io::Result<()>
where
    C: StateCounter,
    W: io::Write + ?Sized,
{
    for (states, values) in non_zero_rows(factory, counter) {
        let labels: Vec<&str> = factory
            .axes()
            .iter()
            .zip(&states)
            .filter(|(axis, _)| axis.is_tracked())
            .map(|(axis, &value)| axis.labels()[value as usize].as_str())
            .collect();
        writeln!(out, "{} {:?}", labels.join(" "), values)?;
    }
    Ok(())
}
