//! Streaming snapshot reader

use super::{SampleSource, SnapshotSlot};
use crate::codec;
use crate::core::types::{Address, MemoryError, MemoryResult, NumericType, Sample};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};

/// Reads a persisted snapshot line by line without loading it into memory
pub struct SampleReader {
    slot: SnapshotSlot,
    lines: Lines<BufReader<File>>,
    value_type: NumericType,
    line_number: u64,
    last_address: Option<Address>,
}

impl SampleReader {
    pub(crate) fn new(slot: SnapshotSlot, file: File, value_type: NumericType) -> Self {
        SampleReader {
            slot,
            lines: BufReader::new(file).lines(),
            value_type,
            line_number: 0,
            last_address: None,
        }
    }

    pub fn value_type(&self) -> NumericType {
        self.value_type
    }

    pub fn slot(&self) -> SnapshotSlot {
        self.slot
    }
}

impl SampleSource for SampleReader {
    async fn next_sample(&mut self) -> MemoryResult<Option<Sample>> {
        let Some(line) = self.lines.next_line().await? else {
            return Ok(None);
        };
        self.line_number += 1;

        let sample = parse_line(&line, self.value_type)
            .map_err(|reason| MemoryError::corrupt_snapshot(self.slot, self.line_number, reason))?;

        if let Some(last) = self.last_address {
            if sample.address <= last {
                return Err(MemoryError::corrupt_snapshot(
                    self.slot,
                    self.line_number,
                    format!("address {} does not follow {}", sample.address, last),
                ));
            }
        }
        self.last_address = Some(sample.address);

        Ok(Some(sample))
    }
}

/// Parses one persisted line (`0x<address-hex> <value-decimal>`)
pub fn parse_line(line: &str, value_type: NumericType) -> Result<Sample, String> {
    let (address, value) = line
        .split_once(' ')
        .ok_or_else(|| format!("expected '<address> <value>', got {:?}", line))?;

    if !address.starts_with("0x") {
        return Err(format!("address {:?} lacks 0x prefix", address));
    }
    let address: Address = address.parse().map_err(|e: MemoryError| e.to_string())?;
    let value = codec::validate(value, value_type).map_err(|e| e.to_string())?;

    Ok(Sample::new(address, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Value;

    #[test]
    fn test_parse_line() {
        let sample = parse_line("0x1004 2", NumericType::Unsigned32).unwrap();
        assert_eq!(sample, Sample::new(Address::new(0x1004), Value::U32(2)));

        let sample = parse_line("0x7ffc10 -15", NumericType::Signed32).unwrap();
        assert_eq!(sample.value, Value::I32(-15));

        let sample = parse_line("0x20 -inf", NumericType::Float32).unwrap();
        assert_eq!(sample.value, Value::F32(f32::NEG_INFINITY));
    }

    #[test]
    fn test_parse_line_float_display_roundtrip() {
        for v in [0.1f32, -3.5, 1e-40, f32::MAX, -0.0] {
            let line = Sample::new(Address::new(0x40), Value::F32(v)).to_string();
            let parsed = parse_line(&line, NumericType::Float32).unwrap();
            match parsed.value {
                Value::F32(p) => assert_eq!(p.to_bits(), v.to_bits()),
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn test_parse_line_rejects_garbage() {
        assert!(parse_line("", NumericType::Unsigned32).is_err());
        assert!(parse_line("0x10", NumericType::Unsigned32).is_err());
        assert!(parse_line("1000 5", NumericType::Unsigned32).is_err());
        assert!(parse_line("0x10 five", NumericType::Unsigned32).is_err());
        assert!(parse_line("0x10 -1", NumericType::Unsigned32).is_err());
    }
}
