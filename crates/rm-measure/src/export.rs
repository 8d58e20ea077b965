use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{MeasureError, Result};
use crate::measurement::Measurement;

const MIN_COLUMN_WIDTH: usize = 10;

/// Recognised `write_csv` options.
#[derive(Debug, Clone, Copy, Default)]
struct CsvOptions {
    simple: bool,
    unicode: bool,
}

fn parse_options(flags: &[&str]) -> Result<CsvOptions> {
    let mut options = CsvOptions::default();
    for &flag in flags {
        match flag {
            "simple" => options.simple = true,
            "unicode" => options.unicode = true,
            other => return Err(MeasureError::InvalidFlag(other.to_string())),
        }
    }
    Ok(options)
}

fn units_string(units: &rm_image::Units, unicode: bool) -> String {
    if unicode {
        units.to_string()
    } else {
        units.to_ascii_string()
    }
}

fn centred(text: &str, width: usize) -> String {
    let chars = text.chars().count();
    if chars >= width {
        return text.to_string();
    }
    let pad = width - chars;
    let left = pad / 2;
    format!("{}{}{}", " ".repeat(left), text, " ".repeat(pad - left))
}

/// Per-value column widths: max of value-name length, units length + 2, and
/// the minimum column width; a long feature name widens its first column.
fn column_widths(m: &Measurement, unicode: bool) -> Vec<usize> {
    let mut widths: Vec<usize> = m
        .values()
        .iter()
        .map(|v| {
            v.name
                .len()
                .max(units_string(&v.units, unicode).chars().count() + 2)
                .max(MIN_COLUMN_WIDTH)
        })
        .collect();
    for f in m.features() {
        let span: usize = widths[f.start_column..f.start_column + f.number_values]
            .iter()
            .sum::<usize>()
            + (f.number_values - 1);
        if f.name.len() > span {
            widths[f.start_column] += f.name.len() - span;
        }
    }
    widths
}

impl fmt::Display for Measurement {
    /// Fixed-width table: object ids down the first column, features centred
    /// over their value spans, value names and units as sub-headers.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths = column_widths(self, true);
        let id_width = MIN_COLUMN_WIDTH;

        write!(f, "{}", centred("ObjectID", id_width))?;
        for info in self.features() {
            let span: usize = widths[info.start_column..info.start_column + info.number_values]
                .iter()
                .sum::<usize>()
                + (info.number_values - 1);
            write!(f, " | {}", centred(&info.name, span))?;
        }
        writeln!(f)?;

        write!(f, "{}", " ".repeat(id_width))?;
        for info in self.features() {
            for (k, w) in widths[info.start_column..info.start_column + info.number_values]
                .iter()
                .enumerate()
            {
                let sep = if k == 0 { " | " } else { " " };
                let name = &self.values()[info.start_column + k].name;
                write!(f, "{sep}{}", centred(name, *w))?;
            }
        }
        writeln!(f)?;

        write!(f, "{}", " ".repeat(id_width))?;
        for info in self.features() {
            for (k, w) in widths[info.start_column..info.start_column + info.number_values]
                .iter()
                .enumerate()
            {
                let sep = if k == 0 { " | " } else { " " };
                let units = units_string(&self.values()[info.start_column + k].units, true);
                let text = if units.is_empty() {
                    String::new()
                } else {
                    format!("({units})")
                };
                write!(f, "{sep}{}", centred(&text, *w))?;
            }
        }
        writeln!(f)?;

        let total: usize =
            id_width + widths.iter().sum::<usize>() + 3 * self.number_of_features()
                + self.number_of_values().saturating_sub(self.number_of_features());
        writeln!(f, "{}", "-".repeat(total))?;

        for row in self.rows() {
            write!(f, "{:>id_width$}", row.object_id())?;
            for info in self.features() {
                for (k, &w) in widths[info.start_column..info.start_column + info.number_values]
                    .iter()
                    .enumerate()
                {
                    let sep = if k == 0 { " | " } else { " " };
                    let v = row.all_values()[info.start_column + k];
                    write!(f, "{sep}{:>w$.4e}", v)?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl Measurement {
    /// Write comma-separated records.
    ///
    /// The default dialect has three header rows (feature names, value
    /// names, units); the `simple` option collapses them into one
    /// `Feature ValueName (units)` row. `unicode` switches µ-sign and
    /// superscript rendering; any other option fails with `InvalidFlag`.
    pub fn write_csv(&self, path: &Path, flags: &[&str]) -> Result<()> {
        let options = parse_options(flags)?;
        let file = File::create(path)?;
        let mut w = BufWriter::new(file);
        if options.simple {
            write!(w, "ObjectID")?;
            for info in self.features() {
                for v in self.values_of(&info.name).unwrap() {
                    let units = units_string(&v.units, options.unicode);
                    write!(w, ", {}", info.name)?;
                    if !v.name.is_empty() {
                        write!(w, " {}", v.name)?;
                    }
                    if !units.is_empty() {
                        write!(w, " ({units})")?;
                    }
                }
            }
            writeln!(w)?;
        } else {
            write!(w, "ObjectID")?;
            for info in self.features() {
                write!(w, ", {}", info.name)?;
                for _ in 1..info.number_values {
                    write!(w, ", ")?;
                }
            }
            writeln!(w)?;
            write!(w, " ")?;
            for v in self.values() {
                write!(w, ", {}", v.name)?;
            }
            writeln!(w)?;
            write!(w, " ")?;
            for v in self.values() {
                write!(w, ", {}", units_string(&v.units, options.unicode))?;
            }
            writeln!(w)?;
        }
        for row in self.rows() {
            write!(w, "{}", row.object_id())?;
            for v in row.all_values() {
                write!(w, ", {}", v)?;
            }
            writeln!(w)?;
        }
        w.flush()?;
        Ok(())
    }
}
