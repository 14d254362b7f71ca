use crate::domain::model::OcrReading;
use crate::utils::error::Result;
use std::collections::HashMap;

pub const CSV_HEADER: [&str; 3] = ["Image Stem", "Ref X", "Ref Y"];

/// Later readings for the same stem replace earlier ones but keep the first position.
pub fn merge_readings(readings: Vec<OcrReading>) -> Vec<OcrReading> {
    let mut merged: Vec<OcrReading> = Vec::with_capacity(readings.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for reading in readings {
        match index.get(&reading.stem) {
            Some(&position) => {
                tracing::warn!("⚠️ Duplicate image stem '{}', keeping the later reading", reading.stem);
                merged[position] = reading;
            }
            None => {
                index.insert(reading.stem.clone(), merged.len());
                merged.push(reading);
            }
        }
    }

    merged
}

/// Side-by-side layout: one row per Ref X / Ref Y pair, the shorter list
/// padded with empty cells, and a blank row after every image.
pub fn write_side_by_side_csv(readings: &[OcrReading]) -> Result<Vec<u8>> {
    let builder = {
        let mut builder = csv::WriterBuilder::new();
        builder.terminator(csv::Terminator::CRLF);
        builder
    };
    let mut output = Vec::new();

    {
        let mut writer = builder.from_writer(&mut output);
        writer.write_record(CSV_HEADER)?;
        writer.flush()?;
    }

    for reading in readings {
        {
            let mut writer = builder.from_writer(&mut output);
            let rows = reading.ref_x.len().max(reading.ref_y.len());
            for i in 0..rows {
                let x = reading.ref_x.get(i).map(String::as_str).unwrap_or("");
                let y = reading.ref_y.get(i).map(String::as_str).unwrap_or("");
                writer.write_record([reading.stem.as_str(), x, y])?;
            }
            writer.flush()?;
        }
        // 空紀錄會被 csv 寫成 `""`，空白列直接寫入輸出
        output.extend_from_slice(b"\r\n");
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(stem: &str, x: &[&str], y: &[&str]) -> OcrReading {
        OcrReading {
            stem: stem.to_string(),
            ref_x: x.iter().map(|s| s.to_string()).collect(),
            ref_y: y.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_side_by_side_pads_shorter_column() {
        let readings = vec![
            reading("rfi_001", &["125", "1500"], &["-0.25"]),
            reading("rfi_002", &[], &["0.40", "2.50"]),
        ];

        let csv = String::from_utf8(write_side_by_side_csv(&readings).unwrap()).unwrap();

        assert_eq!(
            csv,
            "Image Stem,Ref X,Ref Y\r\n\
             rfi_001,125,-0.25\r\n\
             rfi_001,1500,\r\n\
             \r\n\
             rfi_002,,0.40\r\n\
             rfi_002,,2.50\r\n\
             \r\n"
        );
    }

    #[test]
    fn test_side_by_side_empty_reading_only_spacer() {
        let csv = write_side_by_side_csv(&[reading("blank", &[], &[])]).unwrap();
        assert_eq!(String::from_utf8(csv).unwrap(), "Image Stem,Ref X,Ref Y\r\n\r\n");
    }

    #[test]
    fn test_side_by_side_quotes_stems_with_commas() {
        let csv = write_side_by_side_csv(&[reading("site 4, north", &["5"], &["0.5"])]).unwrap();
        let text = String::from_utf8(csv).unwrap();
        assert!(text.contains("\"site 4, north\",5,0.5\r\n"));
    }

    #[test]
    fn test_merge_readings_later_wins_first_position() {
        let merged = merge_readings(vec![
            reading("a", &["1"], &[]),
            reading("b", &["2"], &[]),
            reading("a", &["3"], &[]),
        ]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].stem, "a");
        assert_eq!(merged[0].ref_x, vec!["3"]);
        assert_eq!(merged[1].stem, "b");
    }
}
